//! Pipeline orchestration.
//!
//! A run selects groups for a window and drives each through
//! staging -> guard -> assembly -> publish. Every group ends in exactly one
//! [`GroupOutcome`]; a failing group never aborts its siblings. Only a
//! selection failure fails the run itself. One deadline bounds the whole
//! run, selection included.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{info, warn, Instrument};
use warchive_db::{PhotoRepository, VideoRepository};
use warchive_media::SlideshowEncoder;
use warchive_models::{
    FailureStage, GroupOutcome, GroupReport, LocationId, PhotoId, RunSummary, SelectionWindow,
    TimeRange,
};
use warchive_storage::ObjectStore;

use crate::assembly::AssemblyStage;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::guard::{GuardDecision, IdempotencyGuard};
use crate::logging::GroupLogger;
use crate::metrics;
use crate::publish::{PublishOutcome, PublishStage};
use crate::retrieval::{Retriever, StagedGroup};
use crate::selection::{Group, SelectionEngine};

/// The slideshow pipeline with its injected collaborators.
pub struct Pipeline {
    selection: SelectionEngine,
    retriever: Retriever,
    guard: IdempotencyGuard,
    assembly: AssemblyStage,
    publish: PublishStage,
    max_parallel_groups: usize,
    run_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        config: &WorkerConfig,
        photos: Arc<dyn PhotoRepository>,
        videos: Arc<dyn VideoRepository>,
        store: Arc<dyn ObjectStore>,
        encoder: Arc<dyn SlideshowEncoder>,
    ) -> Self {
        Self {
            selection: SelectionEngine::new(photos.clone(), config.max_photos_per_video),
            retriever: Retriever::new(
                store.clone(),
                photos.clone(),
                config.fetch_timeout,
                config.work_dir.clone(),
            ),
            guard: IdempotencyGuard::new(videos.clone(), photos.clone()),
            assembly: AssemblyStage::new(encoder, config.max_ffmpeg_processes),
            publish: PublishStage::new(store, videos, photos),
            max_parallel_groups: config.max_parallel_groups.max(1),
            run_timeout: config.run_timeout,
        }
    }

    /// Run the pipeline once over `window`.
    pub async fn run(&self, window: SelectionWindow) -> WorkerResult<RunSummary> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.run_timeout;
        info!("Starting run over {}", window);

        let groups = tokio::time::timeout_at(deadline, self.selection.select(&window))
            .await
            .map_err(|_| WorkerError::SelectionTimeout(self.run_timeout))??;
        let mut summary = RunSummary::new(window, groups.len());

        if groups.is_empty() {
            info!("No eligible photos in {}", window);
            metrics::record_run_duration(started.elapsed().as_secs_f64());
            return Ok(summary);
        }

        let mut pending: BTreeSet<LocationId> = groups.iter().map(|g| g.location_id).collect();
        let mut reports = stream::iter(groups)
            .map(|group| self.process_group(group))
            .buffer_unordered(self.max_parallel_groups);

        let deadline = tokio::time::sleep_until(deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                next = reports.next() => match next {
                    Some(report) => {
                        pending.remove(&report.location_id);
                        metrics::record_group(&report);
                        summary.record(&report);
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        "Run deadline of {:?} reached with {} groups unfinished",
                        self.run_timeout,
                        pending.len()
                    );
                    summary.timed_out = true;
                    break;
                }
            }
        }
        // In-flight groups are cancelled here, their staging dirs dropped
        drop(reports);

        for location_id in pending {
            let report = GroupReport::new(
                location_id,
                GroupOutcome::failed(FailureStage::Timeout, "run deadline reached"),
            );
            metrics::record_group(&report);
            summary.record(&report);
        }

        metrics::record_run_duration(started.elapsed().as_secs_f64());
        info!(
            "Run finished: {} published, {} skipped, {} abandoned, {} failed in {:.1}s",
            summary.published,
            summary.skipped,
            summary.abandoned,
            summary.failed,
            started.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    /// Drive one group to a terminal outcome.
    pub async fn process_group(&self, group: Group) -> GroupReport {
        let log = GroupLogger::new(group.location_id, "slideshow");
        let span = log.create_span();
        async move {
            log.log_start(&format!("{} photos", group.len()));
            let report = self.drive(&group, &log).await;
            match &report.outcome {
                GroupOutcome::Failed { stage, cause } => {
                    log.log_error(&format!("{} failed: {}", stage, cause))
                }
                outcome => log.log_completion(outcome.label()),
            }
            report
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, group: &Group, log: &GroupLogger) -> GroupReport {
        let location_id = group.location_id;

        let staged = match self.retriever.stage(group, log).await {
            Ok(staged) => staged,
            Err(e) => {
                return GroupReport::new(
                    location_id,
                    GroupOutcome::failed(FailureStage::Staging, e.to_string()),
                )
            }
        };

        let mut report = GroupReport::new(location_id, GroupOutcome::Abandoned { staged: 0 });
        report.photos_marked_failed = staged.failed.clone();
        report.photos_skipped_malformed = staged.skipped.clone();

        let range = match staged.range {
            Some(range) if staged.is_viable() => range,
            _ => {
                log.log_progress(&format!(
                    "only {} photos staged, abandoning",
                    staged.images.len()
                ));
                report.outcome = GroupOutcome::Abandoned {
                    staged: staged.images.len(),
                };
                return report;
            }
        };
        let photo_ids = staged.photo_ids();

        report.outcome = match self.guard.check(location_id, range, &photo_ids).await {
            Ok(GuardDecision::AlreadyCovered) => {
                log.log_progress(&format!("range {} already covered", range));
                GroupOutcome::IdempotentSkip { photo_ids }
            }
            Ok(GuardDecision::Proceed) => self.assemble_and_publish(&staged, range, photo_ids).await,
            Err(e) => GroupOutcome::failed(FailureStage::Guard, e.to_string()),
        };
        report
    }

    async fn assemble_and_publish(
        &self,
        staged: &StagedGroup,
        range: TimeRange,
        photo_ids: Vec<PhotoId>,
    ) -> GroupOutcome {
        let artifact = match self.assembly.assemble(staged).await {
            Ok(path) => path,
            Err(e) => return GroupOutcome::failed(FailureStage::Assembly, e.to_string()),
        };

        match self
            .publish
            .publish(staged.location_id, range, &photo_ids, &artifact)
            .await
        {
            Ok(PublishOutcome::Published {
                video_id,
                video_url,
            }) => GroupOutcome::Published {
                video_id,
                video_url,
                photo_ids,
                range,
            },
            Ok(PublishOutcome::Covered) => GroupOutcome::IdempotentSkip { photo_ids },
            Err(e) => GroupOutcome::failed(FailureStage::Publish, e.to_string()),
        }
    }
}
