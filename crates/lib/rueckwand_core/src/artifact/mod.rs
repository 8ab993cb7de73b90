//! Item artifacts: a crop of the catalog source image stamped with the render time.

mod font;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use image::{Rgb, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};

/// Gap between the timestamp box and the image edges.
const MARGIN: u32 = 2;

/// Gap between the timestamp text and the box border.
const PADDING: u32 = 2;

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y @ %H:%M:%S";

/// Artifact rendering errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Invalid width or height values: {width}x{height}")]
    InvalidSize { width: i32, height: i32 },

    #[error("Source image not found at {}", .0.display())]
    SourceMissing(PathBuf),

    #[error(
        "Requested crop {width}x{height} exceeds source image size {source_width}x{source_height}"
    )]
    ExceedsSource {
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
    },

    #[error(
        "Cropped size {width}x{height} too small for timestamp box! Need at least {needed_width}x{needed_height}"
    )]
    TooSmall {
        width: u32,
        height: u32,
        needed_width: u32,
        needed_height: u32,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render task failed: {0}")]
    Task(String),
}

impl ArtifactError {
    /// Whether the error stems from the requested dimensions or setup rather
    /// than an internal failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ArtifactError::InvalidSize { .. }
                | ArtifactError::SourceMissing(_)
                | ArtifactError::ExceedsSource { .. }
                | ArtifactError::TooSmall { .. }
        )
    }
}

/// Produces the artifact for an item.
///
/// The result is staged: stores publish it only once the item row is
/// committed, so a failed write never replaces the previous artifact.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(
        &self,
        item_id: i64,
        width: i32,
        height: i32,
    ) -> Result<StagedArtifact, ArtifactError>;
}

/// A rendered artifact that is not yet visible under its final name.
///
/// Dropping it unpublished deletes the staged file.
#[derive(Debug)]
pub struct StagedArtifact {
    staged: Option<PathBuf>,
    target: PathBuf,
}

impl StagedArtifact {
    pub fn new(staged: PathBuf, target: PathBuf) -> Self {
        Self {
            staged: Some(staged),
            target,
        }
    }

    /// An artifact that already sits at its final location.
    pub fn in_place(target: impl Into<PathBuf>) -> Self {
        Self {
            staged: None,
            target: target.into(),
        }
    }

    /// Path recorded on the item, valid once published.
    pub fn stored_path(&self) -> String {
        to_stored_path(&self.target)
    }

    /// Move the staged file over the final name and return the stored path.
    pub fn publish(mut self) -> Result<String, ArtifactError> {
        if let Some(staged) = self.staged.take() {
            if let Err(e) = std::fs::rename(&staged, &self.target) {
                let _ = std::fs::remove_file(&staged);
                return Err(e.into());
            }
        }
        Ok(self.stored_path())
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if let Some(staged) = self.staged.take()
            && let Err(e) = std::fs::remove_file(&staged)
        {
            warn!(path = %staged.display(), "failed to discard staged artifact: {e}");
        }
    }
}

/// Where artifacts are read from and written to.
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub source_image: PathBuf,
    pub output_dir: PathBuf,
}

impl ArtifactConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                | Default                              |
    /// |-------------------------|--------------------------------------|
    /// | `ARTIFACT_SOURCE_IMAGE` | `resources/images/calm_kitchen.jpg`  |
    /// | `ARTIFACT_OUTPUT_DIR`   | `resources/cropped_images`           |
    pub fn from_env() -> Self {
        Self {
            source_image: std::env::var("ARTIFACT_SOURCE_IMAGE")
                .unwrap_or_else(|_| "resources/images/calm_kitchen.jpg".into())
                .into(),
            output_dir: std::env::var("ARTIFACT_OUTPUT_DIR")
                .unwrap_or_else(|_| "resources/cropped_images".into())
                .into(),
        }
    }
}

/// Crops the top-left `width x height` region of the source image and stamps
/// the local render time into a white box in the bottom-left corner. Output
/// is staged next to `item_{id}.png` in the output directory.
#[derive(Debug, Clone)]
pub struct TimestampCropRenderer {
    config: ArtifactConfig,
}

impl TimestampCropRenderer {
    pub fn new(config: ArtifactConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ArtifactRenderer for TimestampCropRenderer {
    async fn render(
        &self,
        item_id: i64,
        width: i32,
        height: i32,
    ) -> Result<StagedArtifact, ArtifactError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || render_blocking(&config, item_id, width, height))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))?
    }
}

fn render_blocking(
    config: &ArtifactConfig,
    item_id: i64,
    width: i32,
    height: i32,
) -> Result<StagedArtifact, ArtifactError> {
    if width <= 0 || height <= 0 {
        return Err(ArtifactError::InvalidSize { width, height });
    }
    let (width, height) = (width as u32, height as u32);
    if !config.source_image.exists() {
        return Err(ArtifactError::SourceMissing(config.source_image.clone()));
    }

    let source = image::open(&config.source_image)?.to_rgb8();
    if width > source.width() || height > source.height() {
        return Err(ArtifactError::ExceedsSource {
            width,
            height,
            source_width: source.width(),
            source_height: source.height(),
        });
    }

    let mut cropped = image::imageops::crop_imm(&source, 0, 0, width, height).to_image();
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    stamp(&mut cropped, &timestamp)?;

    std::fs::create_dir_all(&config.output_dir)?;
    let target = config.output_dir.join(format!("item_{item_id}.png"));
    let staged = config.output_dir.join(format!(".item_{item_id}.staged.png"));
    let artifact = StagedArtifact::new(staged.clone(), target);
    cropped.save(&staged)?;
    debug!(item_id, path = %staged.display(), "rendered item artifact");
    Ok(artifact)
}

/// Paint the timestamp box. Fails when the image cannot hold it.
fn stamp(img: &mut RgbImage, text: &str) -> Result<(), ArtifactError> {
    let (text_w, text_h) = font::measure(text);
    let needed_width = MARGIN + text_w + 2 * PADDING;
    let needed_height = text_h + 2 * PADDING + MARGIN;
    let (width, height) = img.dimensions();
    if width < needed_width || height < needed_height {
        return Err(ArtifactError::TooSmall {
            width,
            height,
            needed_width,
            needed_height,
        });
    }

    let x0 = MARGIN;
    let x1 = (x0 + text_w + 2 * PADDING).min(width - 1);
    let y1 = height - MARGIN;
    let y0 = y1 - text_h - 2 * PADDING;
    for y in y0..=y1.min(height - 1) {
        for x in x0..=x1 {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    font::draw_text(img, x0 + PADDING, y0 + PADDING, text, Rgb([0, 0, 0]));
    Ok(())
}

fn to_stored_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
