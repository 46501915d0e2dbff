/// Photo preparation for story uploads
///
/// The API rejects files over 1MB, so photos are shrunk before upload:
/// - images wider than 1800px are scaled down to 1800px wide, keeping the ratio
/// - the result is encoded as JPEG at quality 85, then re-encoded 5 steps lower
///   until it fits in 1MB or quality 60 has been tried
///
/// Decoding and encoding are CPU-heavy, so the async entry point runs them on
/// the blocking pool.

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{debug, info};

use crate::error::PhotoError;

/// Widest photo we upload
pub const MAX_WIDTH: u32 = 1800;
/// Upload limit enforced by the API
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

const START_QUALITY: u8 = 85;
const QUALITY_STEP: u8 = 5;
const MIN_QUALITY: u8 = 60;

/// A photo ready for the multipart upload
#[derive(Debug, Clone)]
pub struct CompressedPhoto {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// JPEG quality of the final encode
    pub quality: u8,
    /// Where the JPEG was written, when a cache directory was given
    pub path: Option<PathBuf>,
}

impl CompressedPhoto {
    pub fn file_name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "photo.jpg".to_string())
    }
}

/// Read, shrink and re-encode the photo at `path`.
/// If `cache_dir` is set the resulting JPEG is also written there.
pub async fn prepare_upload(path: PathBuf, cache_dir: Option<PathBuf>) -> Result<CompressedPhoto, PhotoError> {
    let bytes = tokio::fs::read(&path).await?;
    debug!(path = %path.display(), size = bytes.len(), "Photo read");

    task::spawn_blocking(move || {
        let mut photo = compress_photo(&bytes)?;
        if let Some(dir) = cache_dir {
            photo.path = Some(write_to_cache(&dir, &photo.data)?);
        }
        Ok::<_, PhotoError>(photo)
    })
    .await
    .map_err(|e| PhotoError::Join(e.to_string()))?
}

/// Shrink and encode raw image bytes for upload
pub fn compress_photo(bytes: &[u8]) -> Result<CompressedPhoto, PhotoError> {
    let img = image::load_from_memory(bytes).map_err(|e| PhotoError::Decode(e.to_string()))?;
    compress_image(&img, MAX_UPLOAD_BYTES)
}

fn compress_image(img: &DynamicImage, max_bytes: usize) -> Result<CompressedPhoto, PhotoError> {
    let resized = resize_keep_ratio(img, MAX_WIDTH);
    let (width, height) = resized.dimensions();

    let mut quality = START_QUALITY;
    let mut data = encode_jpeg(&resized, quality)?;
    while data.len() > max_bytes && quality >= MIN_QUALITY + QUALITY_STEP {
        quality -= QUALITY_STEP;
        data = encode_jpeg(&resized, quality)?;
        debug!(quality, size = data.len(), "Re-encoded photo");
    }

    info!(width, height, quality, size = data.len(), "Photo compressed");

    Ok(CompressedPhoto {
        data,
        width,
        height,
        quality,
        path: None,
    })
}

/// Scale down to `max_width` wide if needed, keeping the aspect ratio
fn resize_keep_ratio(img: &DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_width {
        return img.clone();
    }

    let ratio = height as f32 / width as f32;
    let new_height = ((max_width as f32) * ratio) as u32;
    img.resize_exact(max_width, new_height.max(1), FilterType::Triangle)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .map_err(|e| PhotoError::Encode(e.to_string()))?;
    Ok(buf)
}

fn write_to_cache(dir: &Path, data: &[u8]) -> Result<PathBuf, PhotoError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("story_{}.jpg", Utc::now().timestamp_millis()));
    fs::write(&path, data)?;
    debug!(path = %path.display(), "Compressed photo cached");
    Ok(path)
}
