//! Sequential photo upload pipeline for the site diary.
//!
//! A batch of locally-picked images is processed strictly in selection
//! order, one at a time: compress, upload to blob storage, insert one
//! metadata row. A failure on one image never aborts the batch and never
//! rolls back earlier successes; the outcome enumerates failed positions
//! by 1-based index. A fixed delay separates iterations to avoid hammering
//! the backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use tracing::{info, warn};

use crate::db::Database;
use crate::models::{NewSitePhoto, Visibility};

/// Hard cap on images per batch, enforced at selection time.
pub const MAX_PHOTOS: usize = 3;

/// Bounded width for the transmitted encoding.
const MAX_WIDTH: u32 = 800;
const JPEG_QUALITY: u8 = 60;

/// Storage bucket holding all diary photos.
const BUCKET: &str = "site-photos";

/// Pause between iterations; a crude substitute for real flow control.
pub const INTER_ITEM_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, thiserror::Error)]
#[error("no more than {MAX_PHOTOS} photos per batch")]
pub struct SelectionFull;

/// The picked-but-not-yet-uploaded image set, capped at [`MAX_PHOTOS`].
#[derive(Debug, Default)]
pub struct PhotoSelection {
    paths: Vec<PathBuf>,
}

impl PhotoSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a picked image. Once the cap is reached further picks are
    /// rejected without touching the current selection.
    pub fn add(&mut self, path: PathBuf) -> Result<(), SelectionFull> {
        if self.paths.len() >= MAX_PHOTOS {
            return Err(SelectionFull);
        }
        self.paths.push(path);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.paths.len() {
            self.paths.remove(index);
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.paths.len() >= MAX_PHOTOS
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// One submitted batch: the ordered images plus the fields shared by every
/// metadata row in the batch.
#[derive(Debug)]
pub struct PhotoBatch {
    pub project_id: String,
    pub photo_date: NaiveDate,
    pub comment: Option<String>,
    pub visibility: Visibility,
    pub images: Vec<PathBuf>,
}

/// Where the pipeline persists each image: blob bytes first, then one
/// metadata row. Production uses [`Database`]; tests use a recording mock.
#[async_trait]
pub trait PhotoSink {
    /// Store the encoded bytes under `path` and return the public URL.
    async fn store_photo(&self, path: &str, bytes: Vec<u8>) -> Result<String>;

    /// Insert one metadata row referencing a stored photo.
    async fn save_photo_row(&self, row: &NewSitePhoto) -> Result<()>;
}

#[async_trait]
impl PhotoSink for Database {
    async fn store_photo(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        self.remote()
            .storage_upload(BUCKET, path, bytes, mime::IMAGE_JPEG.as_ref())
            .await?;
        Ok(self.remote().storage_public_url(BUCKET, path))
    }

    async fn save_photo_row(&self, row: &NewSitePhoto) -> Result<()> {
        self.remote()
            .insert("site_photos", &json!(row))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Every image failed.
    TotalFailure,
    /// Some images made it, the rest are enumerated by position.
    PartialSuccess,
    /// Every image made it.
    FullSuccess,
}

/// End-of-batch report: one metadata row exists per succeeded image and
/// none for failed ones.
#[derive(Debug)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    /// 1-based positions, in submission order.
    pub failed_positions: Vec<usize>,
}

impl BatchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        if self.succeeded == 0 {
            OutcomeKind::TotalFailure
        } else if self.succeeded == self.total {
            OutcomeKind::FullSuccess
        } else {
            OutcomeKind::PartialSuccess
        }
    }

    /// Single end-of-batch summary in domain terms.
    pub fn summary(&self) -> String {
        match self.kind() {
            OutcomeKind::TotalFailure => {
                "all photo uploads failed; check the network connection".to_string()
            }
            OutcomeKind::FullSuccess => {
                format!("{} photo(s) registered", self.succeeded)
            }
            OutcomeKind::PartialSuccess => {
                let positions: Vec<String> = self
                    .failed_positions
                    .iter()
                    .map(usize::to_string)
                    .collect();
                format!(
                    "{} succeeded, {} failed (failed photos: {})",
                    self.succeeded,
                    self.failed_positions.len(),
                    positions.join(", ")
                )
            }
        }
    }
}

/// Process a batch strictly in order, never concurrently, continuing past
/// per-image failures. `delay` separates iterations (pass zero in tests);
/// `progress` receives per-step messages for the submit button label.
pub async fn upload_batch<S: PhotoSink>(
    sink: &S,
    batch: &PhotoBatch,
    delay: Duration,
    mut progress: impl FnMut(&str),
) -> BatchOutcome {
    let total = batch.images.len();
    let mut succeeded = 0;
    let mut failed_positions = Vec::new();

    for (index, image) in batch.images.iter().enumerate() {
        let position = index + 1;

        match upload_one(sink, batch, image, position, total, &mut progress).await {
            Ok(()) => {
                succeeded += 1;
                info!(position, total, "photo registered");
            }
            Err(err) => {
                warn!(position, total, error = %err, "photo upload failed");
                failed_positions.push(position);
            }
        }

        if position < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    BatchOutcome {
        total,
        succeeded,
        failed_positions,
    }
}

async fn upload_one<S: PhotoSink>(
    sink: &S,
    batch: &PhotoBatch,
    image: &Path,
    position: usize,
    total: usize,
    progress: &mut impl FnMut(&str),
) -> Result<()> {
    progress(&format!("[{position}/{total}] compressing..."));
    let bytes = prepare_jpeg(image)?;

    progress(&format!("[{position}/{total}] uploading..."));
    let path = object_path(&batch.project_id, batch.photo_date);
    let url = sink.store_photo(&path, bytes).await?;

    progress(&format!("[{position}/{total}] saving..."));
    sink.save_photo_row(&NewSitePhoto {
        project_id: batch.project_id.clone(),
        photo_date: batch.photo_date,
        photo_url: url,
        comment: batch.comment.clone(),
        visibility: batch.visibility,
    })
    .await
}

/// Resize to the bounded width (aspect preserved) and re-encode as JPEG.
pub fn prepare_jpeg(path: &Path) -> Result<Vec<u8>> {
    let img = image::open(path)?;
    let img = if img.width() > MAX_WIDTH {
        let height =
            ((img.height() as f64 * MAX_WIDTH as f64 / img.width() as f64).round() as u32).max(1);
        img.resize_exact(MAX_WIDTH, height, FilterType::Triangle)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder.encode_image(&rgb)?;
    Ok(buf)
}

/// Object path keyed by project, date, timestamp and a random suffix. The
/// suffix is collision avoidance, not cryptography.
fn object_path(project_id: &str, photo_date: NaiveDate) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{project_id}/{project_id}_{photo_date}_{timestamp}_{suffix}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Recording sink: every call is logged, selected upload positions
    /// fail, and a watermark proves two uploads never overlap.
    #[derive(Default)]
    struct MockSink {
        fail_uploads: Vec<usize>,
        stored_paths: Mutex<Vec<String>>,
        rows: Mutex<Vec<NewSitePhoto>>,
        upload_calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl MockSink {
        fn failing(positions: &[usize]) -> Self {
            Self {
                fail_uploads: positions.to_vec(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl PhotoSink for MockSink {
        async fn store_photo(&self, path: &str, _bytes: Vec<u8>) -> Result<String> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let call = self.upload_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_uploads.contains(&call) {
                anyhow::bail!("storage rejected photo {call}");
            }
            self.stored_paths.lock().unwrap().push(path.to_string());
            Ok(format!("https://cdn.example/{path}"))
        }

        async fn save_photo_row(&self, row: &NewSitePhoto) -> Result<()> {
            self.rows.lock().unwrap().push(row.clone());
            Ok(())
        }
    }

    fn temp_image(name: &str, width: u32, height: u32) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sitedesk-test-{}-{}-{name}.png",
            std::process::id(),
            width
        ));
        image::RgbImage::from_pixel(width, height, image::Rgb([90, 120, 30]))
            .save(&path)
            .unwrap();
        path
    }

    fn batch(images: Vec<PathBuf>) -> PhotoBatch {
        PhotoBatch {
            project_id: "proj1".to_string(),
            photo_date: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
            comment: Some("demolition day".to_string()),
            visibility: Visibility::Internal,
            images,
        }
    }

    #[tokio::test]
    async fn processes_images_in_order_and_never_concurrently() {
        let sink = MockSink::default();
        let images = vec![
            temp_image("a", 20, 10),
            temp_image("b", 30, 10),
            temp_image("c", 40, 10),
        ];
        let mut steps = Vec::new();
        let outcome = upload_batch(&sink, &batch(images), Duration::ZERO, |msg| {
            steps.push(msg.to_string())
        })
        .await;

        assert_eq!(outcome.kind(), OutcomeKind::FullSuccess);
        assert_eq!(outcome.succeeded, 3);
        assert_eq!(sink.rows.lock().unwrap().len(), 3);
        assert_eq!(sink.max_active.load(Ordering::SeqCst), 1);
        // per-image steps arrive in strict submission order
        assert_eq!(steps[0], "[1/3] compressing...");
        assert_eq!(steps[1], "[1/3] uploading...");
        assert_eq!(steps[2], "[1/3] saving...");
        assert_eq!(steps[3], "[2/3] compressing...");
        assert_eq!(steps[8], "[3/3] saving...");
        for path in sink.stored_paths.lock().unwrap().iter() {
            assert!(path.starts_with("proj1/proj1_2025-07-14_"));
            assert!(path.ends_with(".jpg"));
        }
    }

    #[tokio::test]
    async fn partial_failure_reports_one_based_positions_and_keeps_going() {
        let sink = MockSink::failing(&[2]);
        let images = vec![
            temp_image("d", 20, 10),
            temp_image("e", 30, 10),
            temp_image("f", 40, 10),
        ];
        let outcome = upload_batch(&sink, &batch(images), Duration::ZERO, |_| {}).await;

        assert_eq!(outcome.kind(), OutcomeKind::PartialSuccess);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed_positions, vec![2]);
        // exactly one metadata row per succeeded image, none for the failure
        assert_eq!(sink.rows.lock().unwrap().len(), 2);
        assert_eq!(
            outcome.summary(),
            "2 succeeded, 1 failed (failed photos: 2)"
        );
    }

    #[tokio::test]
    async fn all_failed_is_a_total_failure() {
        let sink = MockSink::failing(&[1, 2]);
        let images = vec![temp_image("g", 20, 10), temp_image("h", 30, 10)];
        let outcome = upload_batch(&sink, &batch(images), Duration::ZERO, |_| {}).await;

        assert_eq!(outcome.kind(), OutcomeKind::TotalFailure);
        assert_eq!(outcome.failed_positions, vec![1, 2]);
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_image_fails_its_position_only() {
        let sink = MockSink::default();
        let images = vec![
            temp_image("i", 20, 10),
            PathBuf::from("/nonexistent/photo.jpg"),
        ];
        let outcome = upload_batch(&sink, &batch(images), Duration::ZERO, |_| {}).await;

        assert_eq!(outcome.kind(), OutcomeKind::PartialSuccess);
        assert_eq!(outcome.failed_positions, vec![2]);
        assert_eq!(sink.rows.lock().unwrap().len(), 1);
    }

    #[test]
    fn selection_rejects_picks_past_the_cap_without_mutating() {
        let mut selection = PhotoSelection::new();
        for i in 0..MAX_PHOTOS {
            selection.add(PathBuf::from(format!("{i}.jpg"))).unwrap();
        }
        assert!(selection.is_full());

        let before: Vec<PathBuf> = selection.paths().to_vec();
        assert!(selection.add(PathBuf::from("extra.jpg")).is_err());
        assert_eq!(selection.paths(), before.as_slice());

        selection.remove(1);
        assert_eq!(selection.len(), MAX_PHOTOS - 1);
        assert!(selection.add(PathBuf::from("extra.jpg")).is_ok());
    }

    #[test]
    fn outcome_message_classes_are_exclusive_and_exhaustive() {
        let classify = |total, succeeded, failed: Vec<usize>| {
            BatchOutcome {
                total,
                succeeded,
                failed_positions: failed,
            }
            .kind()
        };
        assert_eq!(classify(3, 0, vec![1, 2, 3]), OutcomeKind::TotalFailure);
        assert_eq!(classify(3, 3, vec![]), OutcomeKind::FullSuccess);
        for k in 1..3 {
            let failed: Vec<usize> = (k + 1..=3).collect();
            assert_eq!(classify(3, k, failed), OutcomeKind::PartialSuccess);
        }
    }

    #[test]
    fn prepare_jpeg_bounds_the_width() {
        let wide = temp_image("wide", 1600, 400);
        let bytes = prepare_jpeg(&wide).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 800);
        assert_eq!(decoded.height(), 200);

        let small = temp_image("small", 200, 100);
        let bytes = prepare_jpeg(&small).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 200);
    }
}
