//! In-memory stand-ins for the database, object store and encoder.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tempfile::TempDir;

use warchive_db::{DbError, DbResult, PhotoRepository, VideoRepository};
use warchive_media::{MediaError, MediaResult, SlideshowEncoder};
use warchive_models::{
    LocationId, NewVideo, Photo, PhotoId, SelectionWindow, TimeRange, Video, VideoRecordId,
};
use warchive_storage::{ObjectStore, StorageError, StorageResult};
use warchive_worker::{Pipeline, WorkerConfig};

pub const BUCKET: &str = "webcam-archive";

/// Window every fixture photo falls into.
pub fn window() -> SelectionWindow {
    let end = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
    SelectionWindow::trailing(end, ChronoDuration::hours(1))
}

pub fn at_minute(minute: i64) -> DateTime<Utc> {
    window().start + ChronoDuration::minutes(minute)
}

pub fn image_key(id: i64) -> String {
    format!("processed/cam_{}.jpg", id)
}

pub fn photo(id: i64, location: i64, minute: i64) -> Photo {
    Photo {
        id: PhotoId(id),
        location_id: LocationId(location),
        image_url: format!(
            "https://{}.s3.eu-central-1.amazonaws.com/{}",
            BUCKET,
            image_key(id)
        ),
        created_at: at_minute(minute),
        is_processed: true,
        is_failed: false,
        in_video: false,
    }
}

// =============================================================================
// Photos
// =============================================================================

#[derive(Default)]
pub struct MemoryPhotos {
    rows: Mutex<BTreeMap<PhotoId, Photo>>,
    pub fail_select: AtomicBool,
    pub fail_mark_in_video: AtomicBool,
    select_delay: Mutex<Option<Duration>>,
}

impl MemoryPhotos {
    pub fn with(photos: impl IntoIterator<Item = Photo>) -> Self {
        let repo = Self::default();
        {
            let mut rows = repo.rows.lock().unwrap();
            for p in photos {
                rows.insert(p.id, p);
            }
        }
        repo
    }

    pub fn set_select_delay(&self, delay: Duration) {
        *self.select_delay.lock().unwrap() = Some(delay);
    }

    pub fn get(&self, id: i64) -> Photo {
        self.rows.lock().unwrap()[&PhotoId(id)].clone()
    }

    pub fn all(&self) -> Vec<Photo> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn consumed(&self) -> Vec<i64> {
        self.ids_where(|p| p.in_video)
    }

    pub fn failed(&self) -> Vec<i64> {
        self.ids_where(|p| p.is_failed)
    }

    fn ids_where(&self, pred: impl Fn(&Photo) -> bool) -> Vec<i64> {
        self.rows
            .lock()
            .unwrap()
            .values()
            .filter(|p| pred(p))
            .map(|p| p.id.as_i64())
            .collect()
    }
}

#[async_trait]
impl PhotoRepository for MemoryPhotos {
    async fn select_eligible(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Photo>> {
        let delay = *self.select_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_select.load(Ordering::SeqCst) {
            return Err(DbError::config_error("database unreachable"));
        }
        let window = SelectionWindow::new(start, end);
        let mut photos: Vec<Photo> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.is_eligible(&window))
            .cloned()
            .collect();
        photos.sort_by(|a, b| {
            a.location_id
                .cmp(&b.location_id)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(photos)
    }

    async fn mark_failed(&self, ids: &[PhotoId]) -> DbResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut changed = 0;
        for id in ids {
            if let Some(p) = rows.get_mut(id).filter(|p| !p.in_video) {
                p.is_failed = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn mark_in_video(&self, ids: &[PhotoId]) -> DbResult<u64> {
        if self.fail_mark_in_video.load(Ordering::SeqCst) {
            return Err(DbError::config_error("update rejected"));
        }
        let mut rows = self.rows.lock().unwrap();
        let mut changed = 0;
        for id in ids {
            if let Some(p) = rows.get_mut(id).filter(|p| !p.in_video) {
                p.in_video = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// =============================================================================
// Videos
// =============================================================================

#[derive(Default)]
pub struct MemoryVideos {
    rows: Mutex<Vec<Video>>,
    pub fail_insert: AtomicBool,
    /// Lets a competing publisher record the same range just before the next insert
    pub competing_insert: AtomicBool,
}

impl MemoryVideos {
    pub fn all(&self) -> Vec<Video> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, location: i64, range: TimeRange) {
        push_seeded(&mut self.rows.lock().unwrap(), LocationId(location), range);
    }
}

fn push_seeded(rows: &mut Vec<Video>, location_id: LocationId, range: TimeRange) {
    let id = rows.len() as i64 + 1;
    rows.push(Video {
        id: VideoRecordId(id),
        location_id,
        time_range_start: range.start,
        time_range_end: range.end,
        video_url: format!("https://{}.s3.eu-central-1.amazonaws.com/videos/seed_{}.mp4", BUCKET, id),
        created_at: Utc::now(),
    });
}

fn push_new(rows: &mut Vec<Video>, video: &NewVideo) -> VideoRecordId {
    let id = VideoRecordId(rows.len() as i64 + 1);
    rows.push(Video {
        id,
        location_id: video.location_id,
        time_range_start: video.range.start,
        time_range_end: video.range.end,
        video_url: video.video_url.clone(),
        created_at: Utc::now(),
    });
    id
}

fn covers(rows: &[Video], location_id: LocationId, range: &TimeRange) -> bool {
    rows.iter()
        .any(|v| v.location_id == location_id && v.time_range().overlaps(range))
}

#[async_trait]
impl VideoRepository for MemoryVideos {
    async fn exists_overlapping(
        &self,
        location_id: LocationId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<bool> {
        let range = TimeRange::new(start, end);
        Ok(covers(&self.rows.lock().unwrap(), location_id, &range))
    }

    async fn insert(&self, video: &NewVideo) -> DbResult<VideoRecordId> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(DbError::config_error("insert rejected"));
        }
        Ok(push_new(&mut self.rows.lock().unwrap(), video))
    }

    /// Check and insert under one lock, like the advisory lock in Postgres.
    async fn insert_if_uncovered(&self, video: &NewVideo) -> DbResult<Option<VideoRecordId>> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(DbError::config_error("insert rejected"));
        }
        let mut rows = self.rows.lock().unwrap();
        if self.competing_insert.swap(false, Ordering::SeqCst) {
            push_seeded(&mut rows, video.location_id, video.range);
        }
        if covers(&rows, video.location_id, &video.range) {
            return Ok(None);
        }
        Ok(Some(push_new(&mut rows, video)))
    }
}

// =============================================================================
// Object store
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: Mutex<HashSet<String>>,
    slow: Mutex<HashSet<String>>,
    pub fail_put: AtomicBool,
}

impl MemoryStore {
    /// A store holding content for every photo in `photos`.
    pub fn with_images<'a>(photos: impl IntoIterator<Item = &'a Photo>) -> Self {
        let store = Self::default();
        {
            let mut objects = store.objects.lock().unwrap();
            for p in photos {
                objects.insert(
                    image_key(p.id.as_i64()),
                    format!("jpeg-{}", p.id).into_bytes(),
                );
            }
        }
        store
    }

    pub fn make_unavailable(&self, id: i64) {
        self.unavailable.lock().unwrap().insert(image_key(id));
    }

    pub fn make_slow(&self, id: i64) {
        self.slow.lock().unwrap().insert(image_key(id));
    }

    pub fn video_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with("videos/"))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        if self.slow.lock().unwrap().contains(key) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.unavailable.lock().unwrap().contains(key) {
            return Err(StorageError::download_failed(format!("{}: connection reset", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StorageError::upload_failed("bucket unavailable"));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    fn bucket(&self) -> &str {
        BUCKET
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://{}.s3.eu-central-1.amazonaws.com/{}", BUCKET, key)
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Writes the list of its inputs to the output instead of encoding.
pub struct FakeEncoder {
    calls: Mutex<Vec<Vec<PathBuf>>>,
    failing: Mutex<HashSet<LocationId>>,
    delay: Mutex<Option<Duration>>,
}

impl Default for FakeEncoder {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            delay: Mutex::new(None),
        }
    }
}

impl FakeEncoder {
    pub fn fail_for(&self, location: i64) {
        self.failing.lock().unwrap().insert(LocationId(location));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Vec<PathBuf>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SlideshowEncoder for FakeEncoder {
    async fn encode(&self, images: &[PathBuf], output: &Path) -> MediaResult<()> {
        self.calls.lock().unwrap().push(images.to_vec());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let failing = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|loc| name == format!("video_{}.mp4", loc));
        if failing {
            return Err(MediaError::encode("exited with status 1")
                .with_stderr("Invalid data found when processing input".into()));
        }

        let mut listing = String::new();
        for image in images {
            if !image.is_file() {
                return Err(MediaError::FileNotFound(image.clone()));
            }
            listing.push_str(&format!("{}\n", image.display()));
        }
        tokio::fs::write(output, listing).await?;
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub photos: Arc<MemoryPhotos>,
    pub videos: Arc<MemoryVideos>,
    pub store: Arc<MemoryStore>,
    pub encoder: Arc<FakeEncoder>,
    pub work_dir: TempDir,
    pub config: WorkerConfig,
}

impl Harness {
    pub fn new(photos: Vec<Photo>) -> Self {
        let store = MemoryStore::with_images(&photos);
        let work_dir = TempDir::new().unwrap();
        let config = WorkerConfig {
            work_dir: Some(work_dir.path().to_path_buf()),
            fetch_timeout: Duration::from_millis(200),
            ..WorkerConfig::default()
        };
        Self {
            photos: Arc::new(MemoryPhotos::with(photos)),
            videos: Arc::new(MemoryVideos::default()),
            store: Arc::new(store),
            encoder: Arc::new(FakeEncoder::default()),
            work_dir,
            config,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            &self.config,
            self.photos.clone(),
            self.videos.clone(),
            self.store.clone(),
            self.encoder.clone(),
        )
    }

    /// Entries left behind in the work dir.
    pub fn leftovers(&self) -> usize {
        std::fs::read_dir(self.work_dir.path()).unwrap().count()
    }
}
