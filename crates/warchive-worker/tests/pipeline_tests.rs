//! End-to-end pipeline behaviour against in-memory collaborators.

mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::{at_minute, photo, window, Harness};
use warchive_models::{FailureStage, GroupOutcome, LocationId, PhotoId, TimeRange};
use warchive_worker::WorkerError;

fn file_names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn test_seven_photos_publish_five_most_recent() {
    let photos = (1..=7).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.groups_selected, 1);
    assert_eq!(summary.published, 1);

    let videos = h.videos.all();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].location_id, LocationId(42));
    assert_eq!(videos[0].time_range_start, at_minute(15));
    assert_eq!(videos[0].time_range_end, at_minute(35));
    assert!(videos[0].video_url.contains("/videos/video_42_"));

    assert_eq!(h.photos.consumed(), vec![3, 4, 5, 6, 7]);
    assert!(!h.photos.get(1).in_video);
    assert!(!h.photos.get(2).in_video);

    let calls = h.encoder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        file_names(&calls[0]),
        vec!["img_7.jpg", "img_6.jpg", "img_5.jpg", "img_4.jpg", "img_3.jpg"]
    );

    let keys = h.store.video_keys();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("videos/video_42_") && keys[0].ends_with(".mp4"));
}

#[tokio::test]
async fn test_rerun_creates_no_additional_video() {
    let photos = (1..=5).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    let pipeline = h.pipeline();

    let first = pipeline.run(window()).await.unwrap();
    let second = pipeline.run(window()).await.unwrap();

    assert_eq!(first.published, 1);
    assert_eq!(second.groups_selected, 0);
    assert_eq!(second.published, 0);
    assert_eq!(h.videos.all().len(), 1);
    assert_eq!(h.encoder.calls().len(), 1);
}

#[tokio::test]
async fn test_consumed_photos_are_never_reselected() {
    let photos = (1..=7).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    let pipeline = h.pipeline();

    pipeline.run(window()).await.unwrap();
    pipeline.run(window()).await.unwrap();

    let calls = h.encoder.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(file_names(&calls[1]), vec!["img_2.jpg", "img_1.jpg"]);

    // The leftover pair forms its own, non-overlapping range
    let videos = h.videos.all();
    assert_eq!(videos.len(), 2);
    assert!(!videos[0].time_range().overlaps(&videos[1].time_range()));
    assert_eq!(h.photos.consumed(), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn test_covered_range_is_consumed_without_encoding() {
    let photos: Vec<_> = (1..=5).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    // A video recorded by an earlier run whose consumption marking was lost
    h.videos
        .seed(42, TimeRange::new(at_minute(5), at_minute(25)));

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.published, 0);
    assert_eq!(h.videos.all().len(), 1);
    assert!(h.encoder.calls().is_empty());
    assert_eq!(h.photos.consumed(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_partial_overlap_counts_as_covered() {
    let photos: Vec<_> = (1..=3).map(|i| photo(i, 42, i * 10)).collect();
    let h = Harness::new(photos);
    h.videos
        .seed(42, TimeRange::new(at_minute(0), at_minute(10)));

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(h.encoder.calls().is_empty());
}

#[tokio::test]
async fn test_other_location_video_does_not_cover() {
    let photos: Vec<_> = (1..=3).map(|i| photo(i, 42, i * 10)).collect();
    let h = Harness::new(photos);
    h.videos
        .seed(7, TimeRange::new(at_minute(0), at_minute(59)));

    let summary = h.pipeline().run(window()).await.unwrap();
    assert_eq!(summary.published, 1);
}

#[tokio::test]
async fn test_single_photo_group_is_abandoned_untouched() {
    let h = Harness::new(vec![photo(1, 42, 10)]);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.abandoned, 1);
    assert!(h.videos.all().is_empty());
    assert!(h.photos.consumed().is_empty());
    assert!(h.photos.failed().is_empty());
    assert!(h.encoder.calls().is_empty());
    assert!(h.photos.get(1).is_eligible(&window()));
}

#[tokio::test]
async fn test_abandoned_group_keeps_retrieval_failures() {
    let h = Harness::new(vec![photo(1, 42, 10), photo(2, 42, 20)]);
    h.store.make_unavailable(2);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.photos_marked_failed, 1);
    assert_eq!(h.photos.failed(), vec![2]);
    assert!(h.photos.consumed().is_empty());
    assert!(h.videos.all().is_empty());
}

#[tokio::test]
async fn test_one_fetch_failure_still_publishes() {
    let photos = (1..=5).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.store.make_unavailable(5);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.published, 1);
    assert_eq!(h.photos.failed(), vec![5]);
    assert_eq!(h.photos.consumed(), vec![1, 2, 3, 4]);

    // Range covers staged photos only
    let video = &h.videos.all()[0];
    assert_eq!(video.time_range_start, at_minute(5));
    assert_eq!(video.time_range_end, at_minute(20));
}

#[tokio::test]
async fn test_slow_fetch_times_out_and_is_marked_failed() {
    let photos = (1..=3).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.store.make_slow(3);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.published, 1);
    assert_eq!(h.photos.failed(), vec![3]);
    assert_eq!(h.photos.consumed(), vec![1, 2]);
}

#[tokio::test]
async fn test_malformed_url_is_skipped_not_failed() {
    let mut odd = photo(3, 42, 15);
    odd.image_url = format!(
        "https://{}.s3.eu-central-1.amazonaws.com/raw/processed/cam_3.jpg",
        common::BUCKET
    );
    let h = Harness::new(vec![photo(1, 42, 5), photo(2, 42, 10), odd]);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.published, 1);
    assert_eq!(summary.photos_skipped_malformed, 1);
    assert!(h.photos.failed().is_empty());
    assert_eq!(h.photos.consumed(), vec![1, 2]);
    assert!(h.photos.get(3).is_eligible(&window()));
}

#[tokio::test]
async fn test_encoder_failure_mutates_nothing() {
    let photos = (1..=4).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.store.make_unavailable(4);
    h.encoder.fail_for(42);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].stage, FailureStage::Assembly);
    assert!(summary.failures[0].cause.contains("FFmpeg"));
    assert!(h.videos.all().is_empty());
    assert!(h.photos.consumed().is_empty());
    // Marked during retrieval, before the encoder ran
    assert_eq!(h.photos.failed(), vec![4]);
}

#[tokio::test]
async fn test_insert_failure_leaves_photos_unconsumed() {
    let photos = (1..=3).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.videos.fail_insert.store(true, Ordering::SeqCst);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.failures[0].stage, FailureStage::Publish);
    assert!(h.photos.consumed().is_empty());
    // The uploaded object is left orphaned
    assert_eq!(h.store.video_keys().len(), 1);

    // The next run retries the same group
    h.videos.fail_insert.store(false, Ordering::SeqCst);
    let retry = h.pipeline().run(window()).await.unwrap();
    assert_eq!(retry.published, 1);
    assert_eq!(h.photos.consumed(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_upload_failure_records_nothing() {
    let photos = (1..=3).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.store.fail_put.store(true, Ordering::SeqCst);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.failures[0].stage, FailureStage::Publish);
    assert!(h.videos.all().is_empty());
    assert!(h.photos.consumed().is_empty());
}

#[tokio::test]
async fn test_groups_fail_independently() {
    let mut photos = Vec::new();
    for location in 1..=3 {
        for i in 0..3 {
            let id = location * 10 + i;
            photos.push(photo(id, location, id % 60));
        }
    }
    let mut h = Harness::new(photos);
    h.config.max_parallel_groups = 3;
    h.encoder.fail_for(2);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.groups_selected, 3);
    assert_eq!(summary.published, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].location_id, LocationId(2));
    assert_eq!(h.photos.consumed(), vec![10, 11, 12, 30, 31, 32]);

    let mut located: Vec<_> = h.videos.all().iter().map(|v| v.location_id).collect();
    located.sort();
    assert_eq!(located, vec![LocationId(1), LocationId(3)]);
}

#[tokio::test]
async fn test_staging_dirs_removed_on_every_path() {
    let mut photos = vec![photo(1, 1, 5), photo(2, 1, 10)];
    photos.push(photo(3, 2, 5));
    photos.extend([photo(4, 3, 5), photo(5, 3, 10)]);
    let h = Harness::new(photos);
    h.encoder.fail_for(3);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.published, 1);
    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(h.leftovers(), 0);
}

#[tokio::test]
async fn test_run_deadline_fails_unfinished_groups() {
    let photos = (1..=3).map(|i| photo(i, 42, i * 5)).collect();
    let mut h = Harness::new(photos);
    h.config.run_timeout = Duration::from_millis(200);
    h.encoder.set_delay(Duration::from_secs(2));

    let summary = h.pipeline().run(window()).await.unwrap();

    assert!(summary.timed_out);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].stage, FailureStage::Timeout);
    assert!(h.videos.all().is_empty());
    assert!(h.photos.consumed().is_empty());
    assert_eq!(h.leftovers(), 0);
}

#[tokio::test]
async fn test_selection_failure_fails_the_run() {
    let h = Harness::new(vec![photo(1, 42, 5), photo(2, 42, 10)]);
    h.photos.fail_select.store(true, Ordering::SeqCst);

    assert!(h.pipeline().run(window()).await.is_err());
    assert!(h.encoder.calls().is_empty());
}

#[tokio::test]
async fn test_slow_selection_is_bounded_by_run_deadline() {
    let mut h = Harness::new(vec![photo(1, 42, 5), photo(2, 42, 10)]);
    h.config.run_timeout = Duration::from_millis(200);
    h.photos.set_select_delay(Duration::from_secs(3));

    let started = Instant::now();
    let err = h.pipeline().run(window()).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(err, WorkerError::SelectionTimeout(_)));
    assert!(err.is_retryable());
    assert!(h.encoder.calls().is_empty());
}

#[tokio::test]
async fn test_range_covered_between_guard_and_insert() {
    let photos = (1..=3).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.videos.competing_insert.store(true, Ordering::SeqCst);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.published, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(h.encoder.calls().len(), 1);
    assert_eq!(h.photos.consumed(), vec![1, 2, 3]);
    // Only the competitor's row exists; our upload stays orphaned
    let videos = h.videos.all();
    assert_eq!(videos.len(), 1);
    assert!(videos[0].video_url.contains("seed_"));
    assert_eq!(h.store.video_keys().len(), 1);
}

#[tokio::test]
async fn test_consume_failure_after_insert_is_skipped_on_rerun() {
    let photos = (1..=3).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.photos.fail_mark_in_video.store(true, Ordering::SeqCst);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].stage, FailureStage::Publish);
    assert_eq!(h.videos.all().len(), 1);
    assert!(h.photos.consumed().is_empty());

    h.photos.fail_mark_in_video.store(false, Ordering::SeqCst);
    let retry = h.pipeline().run(window()).await.unwrap();

    assert_eq!(retry.published, 0);
    assert_eq!(retry.skipped, 1);
    assert_eq!(h.encoder.calls().len(), 1);
    assert_eq!(h.videos.all().len(), 1);
    assert_eq!(h.photos.consumed(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_concurrent_runs_publish_one_video() {
    let photos = (1..=3).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos);
    h.encoder.set_delay(Duration::from_millis(100));
    let (first, second) = (h.pipeline(), h.pipeline());

    let (a, b) = tokio::join!(first.run(window()), second.run(window()));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.published + b.published, 1);
    assert_eq!(a.skipped + b.skipped, 1);
    assert_eq!(a.failed + b.failed, 0);
    assert_eq!(h.videos.all().len(), 1);
    assert_eq!(h.photos.consumed(), vec![1, 2, 3]);
    assert_eq!(h.leftovers(), 0);
}

#[tokio::test]
async fn test_empty_window_short_circuits() {
    let h = Harness::new(vec![photo(1, 42, 90)]);

    let summary = h.pipeline().run(window()).await.unwrap();

    assert_eq!(summary.groups_selected, 0);
    assert_eq!(summary.groups_finished(), 0);
    assert!(!summary.timed_out);
}

#[tokio::test]
async fn test_process_group_reports_published_ids() {
    let photos: Vec<_> = (1..=2).map(|i| photo(i, 42, i * 5)).collect();
    let h = Harness::new(photos.clone());
    let group = warchive_worker::Group {
        location_id: LocationId(42),
        photos: photos.into_iter().rev().collect(),
    };

    let report = h.pipeline().process_group(group).await;

    match report.outcome {
        GroupOutcome::Published {
            photo_ids, range, ..
        } => {
            assert_eq!(photo_ids, vec![PhotoId(2), PhotoId(1)]);
            assert_eq!(range, TimeRange::new(at_minute(5), at_minute(10)));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_summary_serializes_for_scheduler() {
    let h = Harness::new(vec![photo(1, 42, 5), photo(2, 42, 10)]);
    let summary = h.pipeline().run(window()).await.unwrap();

    let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["published"], 1);
    assert_eq!(json["timed_out"], false);
    assert_eq!(json["videos"].as_array().unwrap().len(), 1);
}
