//! Per-group outcomes and run summaries.
//!
//! A run produces one [`GroupReport`] per location group. The orchestrator
//! folds them into a [`RunSummary`] for the invoking scheduler.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::photo::{LocationId, PhotoId};
use crate::video::{TimeRange, VideoRecordId};
use crate::window::SelectionWindow;

/// Stage a group failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Staging directory or failure marking
    Staging,
    /// Idempotency lookup or consumption marking of a covered group
    Guard,
    /// Encoder invocation
    Assembly,
    /// Upload, insert, or consumption marking after insert
    Publish,
    /// Run deadline reached before the group finished
    Timeout,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Staging => "staging",
            FailureStage::Guard => "guard",
            FailureStage::Assembly => "assembly",
            FailureStage::Publish => "publish",
            FailureStage::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal state of a group within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupOutcome {
    /// A video was uploaded and recorded; its photos are consumed.
    Published {
        video_id: VideoRecordId,
        video_url: String,
        photo_ids: Vec<PhotoId>,
        range: TimeRange,
    },
    /// An existing video already covers the staged range; photos consumed.
    IdempotentSkip { photo_ids: Vec<PhotoId> },
    /// Too few photos staged; nothing mutated beyond failure marking.
    Abandoned { staged: usize },
    /// The group failed; photos stay eligible for a later run.
    Failed { stage: FailureStage, cause: String },
}

impl GroupOutcome {
    pub fn failed(stage: FailureStage, cause: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            cause: cause.into(),
        }
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GroupOutcome::Published { .. } => "published",
            GroupOutcome::IdempotentSkip { .. } => "skipped",
            GroupOutcome::Abandoned { .. } => "abandoned",
            GroupOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, GroupOutcome::Published { .. })
    }
}

/// Everything a single group run reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GroupReport {
    pub location_id: LocationId,
    pub outcome: GroupOutcome,
    /// Photos marked `is_failed` during retrieval
    #[serde(default)]
    pub photos_marked_failed: Vec<PhotoId>,
    /// Photos skipped because their URL was not a processed-image location
    #[serde(default)]
    pub photos_skipped_malformed: Vec<PhotoId>,
}

impl GroupReport {
    pub fn new(location_id: LocationId, outcome: GroupOutcome) -> Self {
        Self {
            location_id,
            outcome,
            photos_marked_failed: Vec::new(),
            photos_skipped_malformed: Vec::new(),
        }
    }
}

/// Cause of a failed group, for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GroupFailure {
    pub location_id: LocationId,
    pub stage: FailureStage,
    pub cause: String,
}

/// Result of one pipeline run, handed back to the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub window: SelectionWindow,
    pub groups_selected: usize,
    pub published: usize,
    pub skipped: usize,
    pub abandoned: usize,
    pub failed: usize,
    pub failures: Vec<GroupFailure>,
    pub videos: Vec<VideoRecordId>,
    pub photos_marked_failed: usize,
    pub photos_skipped_malformed: usize,
    pub timed_out: bool,
}

impl RunSummary {
    pub fn new(window: SelectionWindow, groups_selected: usize) -> Self {
        Self {
            window,
            groups_selected,
            published: 0,
            skipped: 0,
            abandoned: 0,
            failed: 0,
            failures: Vec::new(),
            videos: Vec::new(),
            photos_marked_failed: 0,
            photos_skipped_malformed: 0,
            timed_out: false,
        }
    }

    /// Fold a group report into the summary.
    pub fn record(&mut self, report: &GroupReport) {
        self.photos_marked_failed += report.photos_marked_failed.len();
        self.photos_skipped_malformed += report.photos_skipped_malformed.len();

        match &report.outcome {
            GroupOutcome::Published { video_id, .. } => {
                self.published += 1;
                self.videos.push(*video_id);
            }
            GroupOutcome::IdempotentSkip { .. } => self.skipped += 1,
            GroupOutcome::Abandoned { .. } => self.abandoned += 1,
            GroupOutcome::Failed { stage, cause } => {
                self.failed += 1;
                self.failures.push(GroupFailure {
                    location_id: report.location_id,
                    stage: *stage,
                    cause: cause.clone(),
                });
            }
        }
    }

    /// Groups that reached a terminal state.
    pub fn groups_finished(&self) -> usize {
        self.published + self.skipped + self.abandoned + self.failed
    }
}
