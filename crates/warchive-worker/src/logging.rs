//! Structured per-group logging.

use tracing::{error, info, warn, Span};
use warchive_models::LocationId;

/// Logger carrying the location and stage of a group through its run.
#[derive(Debug, Clone)]
pub struct GroupLogger {
    location_id: LocationId,
    operation: String,
}

impl GroupLogger {
    pub fn new(location_id: LocationId, operation: &str) -> Self {
        Self {
            location_id,
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            location_id = %self.location_id,
            operation = %self.operation,
            "Group started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            location_id = %self.location_id,
            operation = %self.operation,
            "Group progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            location_id = %self.location_id,
            operation = %self.operation,
            "Group warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            location_id = %self.location_id,
            operation = %self.operation,
            "Group error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            location_id = %self.location_id,
            operation = %self.operation,
            "Group completed: {}", message
        );
    }

    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    /// Span covering every stage of this group.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "group",
            location_id = %self.location_id,
            operation = %self.operation
        )
    }
}
