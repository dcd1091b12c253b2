//! Post-encode inspection of a slideshow with ffprobe.
//!
//! Only the properties the slideshow promises are read: duration, canvas,
//! frame rate and pixel format of the first video stream.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use warchive_models::SlideshowSpec;

use crate::error::{MediaError, MediaResult};

/// Allowed drift between the encoded and the expected duration
const DURATION_TOLERANCE_SECS: f64 = 0.5;

/// Properties of an encoded slideshow.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pix_fmt: String,
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    streams: Vec<StreamEntry>,
    format: Option<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    avg_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    duration: Option<String>,
}

/// Read the first video stream of `path`.
pub async fn inspect_video(path: &Path) -> MediaResult<VideoInfo> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let ffprobe = which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,pix_fmt,avg_frame_rate:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::inspect(
            path,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    parse_report(path, &output.stdout)
}

/// Check an encoded slideshow of `images` pictures against `spec`.
pub async fn verify_slideshow(
    path: &Path,
    spec: &SlideshowSpec,
    images: usize,
) -> MediaResult<VideoInfo> {
    let info = inspect_video(path).await?;
    check_against(&info, spec, images)?;
    Ok(info)
}

fn check_against(info: &VideoInfo, spec: &SlideshowSpec, images: usize) -> MediaResult<()> {
    let expected = spec.expected_duration_secs(images);
    if (info.duration - expected).abs() > DURATION_TOLERANCE_SECS {
        return Err(MediaError::InvalidVideo(format!(
            "duration {:.2}s, expected {:.0}s",
            info.duration, expected
        )));
    }
    if (info.width, info.height) != (spec.width, spec.height) {
        return Err(MediaError::InvalidVideo(format!(
            "canvas {}x{}, expected {}x{}",
            info.width, info.height, spec.width, spec.height
        )));
    }
    if info.pix_fmt != spec.pixel_format {
        return Err(MediaError::InvalidVideo(format!(
            "pixel format {}, expected {}",
            info.pix_fmt, spec.pixel_format
        )));
    }
    Ok(())
}

fn parse_report(path: &Path, stdout: &[u8]) -> MediaResult<VideoInfo> {
    let report: Report = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::inspect(path, format!("unreadable ffprobe output: {}", e)))?;

    let stream = report
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::InvalidVideo(format!("{} has no video stream", path.display())))?;
    let duration = report
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::inspect(path, "no duration reported"))?;

    Ok(VideoInfo {
        duration,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps: stream
            .avg_frame_rate
            .as_deref()
            .and_then(frame_rate)
            .unwrap_or(0.0),
        pix_fmt: stream.pix_fmt.unwrap_or_default(),
    })
}

/// `30/1` style rational rate.
fn frame_rate(rational: &str) -> Option<f64> {
    let (num, den) = rational.split_once('/')?;
    let (num, den): (f64, f64) = (num.parse().ok()?, den.parse().ok()?);
    (den > 0.0).then(|| num / den)
}
