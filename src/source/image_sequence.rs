use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::DynamicImage;
use tracing::{debug, info};

use super::{FrameSource, SourceHandle};
use crate::error::SourceError;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// A directory of still images played back in file-name order.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    rate: Option<f64>,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rate: None,
        }
    }

    /// A still-image directory carries no timing, so the rate is supplied here.
    pub fn with_rate(mut self, rate: Option<f64>) -> Self {
        self.rate = rate;
        self
    }

    fn is_frame_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    async fn list_frames(&self) -> Result<Vec<PathBuf>, SourceError> {
        let metadata = tokio::fs::metadata(&self.dir)
            .await
            .map_err(|e| SourceError::Open {
                path: self.dir.clone(),
                reason: e.to_string(),
            })?;
        if !metadata.is_dir() {
            return Err(SourceError::NotADirectory(self.dir.clone()));
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| SourceError::Open {
                path: self.dir.clone(),
                reason: e.to_string(),
            })?;

        let mut frames = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| SourceError::Io {
            path: self.dir.clone(),
            source: e,
        })? {
            let path = entry.path();
            if Self::is_frame_file(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    async fn open(&self) -> Result<Box<dyn SourceHandle>, SourceError> {
        let frames = self.list_frames().await?;
        info!(
            "Opened image sequence '{}' with {} frames",
            self.dir.display(),
            frames.len()
        );
        Ok(Box::new(ImageSequenceHandle {
            dir: self.dir.clone(),
            pending: frames.into(),
            rate: self.rate,
        }))
    }
}

struct ImageSequenceHandle {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    rate: Option<f64>,
}

#[async_trait]
impl SourceHandle for ImageSequenceHandle {
    fn rate(&self) -> Option<f64> {
        self.rate
    }

    async fn read_next(&mut self) -> Result<Option<DynamicImage>, SourceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path).await.map_err(|e| SourceError::Io {
            path: path.clone(),
            source: e,
        })?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| SourceError::Decode { path, source: e })?;
        Ok(Some(image))
    }
}

impl Drop for ImageSequenceHandle {
    fn drop(&mut self) {
        debug!(
            "Released image sequence '{}' ({} frames unread)",
            self.dir.display(),
            self.pending.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("motion-pipeline-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn frames_are_read_in_file_name_order() {
        let dir = scratch_dir();
        for (name, shade) in [("frame_002.png", 20u8), ("frame_001.png", 10), ("frame_003.PNG", 30)] {
            GrayImage::from_pixel(8, 6, Luma([shade]))
                .save_with_format(dir.join(name), image::ImageFormat::Png)
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let source = ImageSequenceSource::new(&dir).with_rate(Some(12.5));
        let mut handle = source.open().await.unwrap();
        assert_eq!(handle.rate(), Some(12.5));

        let mut shades = Vec::new();
        while let Some(image) = handle.read_next().await.unwrap() {
            assert_eq!((image.width(), image.height()), (8, 6));
            shades.push(image.to_luma8().get_pixel(0, 0)[0]);
        }
        assert_eq!(shades, vec![10, 20, 30]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn missing_directory_fails_to_open() {
        let source = ImageSequenceSource::new("/definitely/not/here");
        let err = source.open().await.err().unwrap();
        assert!(matches!(err, SourceError::Open { .. }));
    }

    #[tokio::test]
    async fn plain_file_is_not_a_sequence() {
        let dir = scratch_dir();
        let file = dir.join("clip.mp4");
        std::fs::write(&file, b"\x00\x00").unwrap();

        let err = ImageSequenceSource::new(&file).open().await.err().unwrap();
        assert!(matches!(err, SourceError::NotADirectory(_)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn corrupt_frame_is_a_decode_error() {
        let dir = scratch_dir();
        std::fs::write(dir.join("frame_000.png"), b"not really a png").unwrap();

        let mut handle = ImageSequenceSource::new(&dir).open().await.unwrap();
        let err = handle.read_next().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
