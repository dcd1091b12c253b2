//! Windowed selection and per-location grouping.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};
use warchive_db::PhotoRepository;
use warchive_models::{LocationId, Photo, SelectionWindow};

use crate::error::WorkerResult;

/// Eligible photos of one location, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub location_id: LocationId,
    pub photos: Vec<Photo>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// Partition photos by location, keeping the `max_per_group` most recent.
///
/// Photos failing the eligibility predicate for `window` are dropped, so a
/// repository returning extra rows cannot widen the selection. Groups come
/// back in ascending location order; ties on `created_at` keep the higher id.
pub fn select_groups(
    photos: Vec<Photo>,
    window: &SelectionWindow,
    max_per_group: usize,
) -> Vec<Group> {
    let mut by_location: BTreeMap<LocationId, Vec<Photo>> = BTreeMap::new();
    for photo in photos.into_iter().filter(|p| p.is_eligible(window)) {
        by_location.entry(photo.location_id).or_default().push(photo);
    }

    by_location
        .into_iter()
        .filter_map(|(location_id, mut photos)| {
            photos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            photos.dedup_by_key(|p| p.id);
            photos.truncate(max_per_group);
            (!photos.is_empty()).then_some(Group {
                location_id,
                photos,
            })
        })
        .collect()
}

/// Reads eligible photos for a window and groups them.
pub struct SelectionEngine {
    photos: Arc<dyn PhotoRepository>,
    max_per_group: usize,
}

impl SelectionEngine {
    pub fn new(photos: Arc<dyn PhotoRepository>, max_per_group: usize) -> Self {
        Self {
            photos,
            max_per_group: max_per_group.max(1),
        }
    }

    /// Select this run's groups. A repository error aborts the run.
    pub async fn select(&self, window: &SelectionWindow) -> WorkerResult<Vec<Group>> {
        let photos = self.photos.select_eligible(window.start, window.end).await?;
        let fetched = photos.len();
        let groups = select_groups(photos, window, self.max_per_group);

        for group in &groups {
            debug!(
                location_id = %group.location_id,
                "Selected {} photos",
                group.len()
            );
        }
        info!(
            "Selected {} groups from {} eligible photos in {}",
            groups.len(),
            fetched,
            window
        );
        Ok(groups)
    }
}
