use std::path::Path;

use warchive_media::{
    resolve_binary, verify_slideshow, FfmpegCommand, FfmpegRunner, FfmpegSlideshow,
    SlideshowEncoder,
};
use warchive_models::SlideshowSpec;
use warchive_storage::{ObjectStore, S3Client};
use warchive_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();
    let work_dir = config
        .work_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);

    println!(
        "worker-selfcheck: starting with work_dir={}",
        work_dir.display()
    );
    ensure_workdir(&work_dir).await?;
    ensure_env_present(&["DATABASE_URL"])?;
    ensure_any_env_present(&["S3_BUCKET_NAME", "BUCKET_NAME"])?;
    ensure_bucket().await?;
    ensure_encoder(&config, &work_dir).await?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

async fn ensure_bucket() -> anyhow::Result<()> {
    let client = S3Client::from_env().await?;
    client.check_connectivity().await?;
    println!("worker-selfcheck: bucket {} reachable", client.bucket());
    Ok(())
}

/// Encode a two-frame slideshow and verify the artifact.
async fn ensure_encoder(config: &WorkerConfig, work_dir: &Path) -> anyhow::Result<()> {
    let binary = resolve_binary(config.ffmpeg_binary().as_deref(), "ffmpeg")
        .ok_or_else(|| anyhow::anyhow!("ffmpeg not available"))?;
    println!("worker-selfcheck: using {}", binary.display());

    let runner = FfmpegRunner::new()
        .with_binary(&binary)
        .with_timeout(config.encode_timeout);
    let dir = tempfile::Builder::new()
        .prefix("warchive_selfcheck_")
        .tempdir_in(work_dir)?;

    let mut images = Vec::new();
    for (i, color) in ["red", "blue"].into_iter().enumerate() {
        let path = dir.path().join(format!("img_{}.jpg", i));
        let cmd = FfmpegCommand::new(format!("color=c={}:s=640x480", color), &path)
            .input_args(["-f", "lavfi"])
            .output_args(["-frames:v", "1"]);
        runner.run(&cmd).await?;
        images.push(path);
    }

    let spec = SlideshowSpec::default().with_seconds_per_photo(config.seconds_per_photo);
    let output = dir.path().join("selfcheck.mp4");
    FfmpegSlideshow::new(spec.clone(), runner)
        .encode(&images, &output)
        .await?;

    let info = verify_slideshow(&output, &spec, images.len()).await?;
    println!(
        "worker-selfcheck: encoded {}x{} {:.2}s",
        info.width, info.height, info.duration
    );
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}

fn ensure_any_env_present(vars: &[&str]) -> anyhow::Result<()> {
    if vars.iter().any(|var| std::env::var(var).is_ok()) {
        return Ok(());
    }
    Err(anyhow::anyhow!(
        "missing required env var, one of {}",
        vars.join(", ")
    ))
}
