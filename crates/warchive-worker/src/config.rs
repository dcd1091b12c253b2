//! Worker configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use warchive_models::encoding::{DEFAULT_SECONDS_PER_PHOTO, MAX_PHOTOS_PER_VIDEO};
use warchive_models::window::DEFAULT_WINDOW_MINUTES;

/// FFmpeg shipped alongside the worker in deployment images.
pub const BUNDLED_FFMPEG: &str = "/opt/bin/ffmpeg";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Length of the trailing selection window
    pub window: Duration,
    /// Most recent photos kept per location group
    pub max_photos_per_video: usize,
    /// Display time of each photo in the slideshow
    pub seconds_per_photo: u32,
    /// Groups processed concurrently
    pub max_parallel_groups: usize,
    /// Concurrent FFmpeg processes
    pub max_ffmpeg_processes: usize,
    /// Per-encode timeout
    pub encode_timeout: Duration,
    /// Per-object fetch timeout
    pub fetch_timeout: Duration,
    /// Deadline for a whole run
    pub run_timeout: Duration,
    /// Parent of per-group staging directories (system temp dir if unset)
    pub work_dir: Option<PathBuf>,
    /// Repeat runs on this interval; a single run if unset
    pub interval: Option<Duration>,
    /// Explicit FFmpeg binary, e.g. a bundled `/opt/bin/ffmpeg`
    pub ffmpeg_path: Option<PathBuf>,
    /// Create tables on startup
    pub ensure_schema: bool,
    /// Prometheus listener address
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(DEFAULT_WINDOW_MINUTES as u64 * 60),
            max_photos_per_video: MAX_PHOTOS_PER_VIDEO,
            seconds_per_photo: DEFAULT_SECONDS_PER_PHOTO,
            max_parallel_groups: 1,
            max_ffmpeg_processes: 2,
            encode_timeout: Duration::from_secs(120),
            fetch_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(600),
            work_dir: None,
            interval: None,
            ffmpeg_path: None,
            ensure_schema: false,
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            window: Duration::from_secs(
                env_or("WORKER_WINDOW_MINUTES", DEFAULT_WINDOW_MINUTES as u64).saturating_mul(60),
            ),
            max_photos_per_video: env_or(
                "WORKER_MAX_PHOTOS_PER_VIDEO",
                defaults.max_photos_per_video,
            )
            .max(1),
            seconds_per_photo: env_or("WORKER_SECONDS_PER_PHOTO", defaults.seconds_per_photo)
                .max(1),
            max_parallel_groups: env_or("WORKER_MAX_PARALLEL_GROUPS", defaults.max_parallel_groups)
                .max(1),
            max_ffmpeg_processes: env_or("WORKER_MAX_FFMPEG", defaults.max_ffmpeg_processes)
                .max(1),
            encode_timeout: Duration::from_secs(env_or("WORKER_ENCODE_TIMEOUT", 120)),
            fetch_timeout: Duration::from_secs(env_or("WORKER_FETCH_TIMEOUT", 30)),
            run_timeout: Duration::from_secs(env_or("WORKER_RUN_TIMEOUT", 600)),
            work_dir: std::env::var("WORKER_WORK_DIR").ok().map(PathBuf::from),
            interval: std::env::var("WORKER_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            ffmpeg_path: std::env::var("FFMPEG_PATH").ok().map(PathBuf::from),
            ensure_schema: std::env::var("DATABASE_ENSURE_SCHEMA")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            metrics_addr: std::env::var("METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Configured FFmpeg, else the bundled binary when present.
    pub fn ffmpeg_binary(&self) -> Option<PathBuf> {
        self.ffmpeg_path.clone().or_else(|| {
            let bundled = Path::new(BUNDLED_FFMPEG);
            bundled.is_file().then(|| bundled.to_path_buf())
        })
    }

    /// Selection window length as a chrono duration.
    pub fn window_length(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.window)
            .unwrap_or_else(|_| chrono::Duration::minutes(DEFAULT_WINDOW_MINUTES))
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
