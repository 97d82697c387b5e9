use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use image::ImageFormat;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{PresentationTarget, Surface};
use crate::common::Frame;
use crate::error::PresentationError;

/// Headless presentation: logs every frame and, when an output directory is
/// set, writes the annotated frames there as PNG files.
///
/// Cancellation comes from the supplied token; the binary cancels it on ctrl-c.
#[derive(Debug, Clone)]
pub struct FrameDumpTarget {
    output_dir: Option<PathBuf>,
    cancel_token: CancellationToken,
    pace: bool,
}

impl FrameDumpTarget {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            output_dir: None,
            cancel_token,
            pace: true,
        }
    }

    pub fn output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    /// When disabled, the inter-frame budget is not waited out.
    pub fn pace(mut self, pace: bool) -> Self {
        self.pace = pace;
        self
    }
}

#[async_trait]
impl PresentationTarget for FrameDumpTarget {
    async fn open(&self, name: &str) -> Result<Box<dyn Surface>, PresentationError> {
        if let Some(dir) = &self.output_dir {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| PresentationError::Open {
                    name: name.to_string(),
                    reason: format!("cannot create '{}': {}", dir.display(), e),
                })?;
        }
        info!(
            "Presentation surface '{}' opened ({})",
            name,
            self.output_dir
                .as_ref()
                .map(|d| format!("writing to {}", d.display()))
                .unwrap_or_else(|| "headless".to_string())
        );
        Ok(Box::new(FrameDumpSurface {
            name: name.to_string(),
            output_dir: self.output_dir.clone(),
            cancel_token: self.cancel_token.clone(),
            pace: self.pace,
            shown: 0,
        }))
    }
}

struct FrameDumpSurface {
    name: String,
    output_dir: Option<PathBuf>,
    cancel_token: CancellationToken,
    pace: bool,
    shown: u64,
}

#[async_trait]
impl Surface for FrameDumpSurface {
    async fn show(&mut self, frame: &Frame) -> Result<(), PresentationError> {
        if let Some(dir) = &self.output_dir {
            let sequence = frame.sequence();
            let path = dir.join(format!("frame_{:06}.png", sequence));
            let render_error = |reason: String| PresentationError::Render { sequence, reason };

            let image = frame.image().clone();
            let encoded = tokio::task::spawn_blocking(move || {
                let mut bytes = Vec::new();
                image
                    .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                    .map(|_| bytes)
            })
            .await
            .map_err(|e| render_error(e.to_string()))?
            .map_err(|e| render_error(e.to_string()))?;

            tokio::fs::write(&path, encoded).await.map_err(|e| {
                render_error(format!("cannot write '{}': {}", path.display(), e))
            })?;
            debug!("Wrote {}", path.display());
        }
        self.shown += 1;
        Ok(())
    }

    async fn poll_cancel(&mut self, budget: Duration) -> bool {
        if !self.pace {
            return self.cancel_token.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel_token.cancelled() => true,
            _ = tokio::time::sleep(budget) => self.cancel_token.is_cancelled(),
        }
    }
}

impl Drop for FrameDumpSurface {
    fn drop(&mut self) {
        info!(
            "Presentation surface '{}' closed after {} frames",
            self.name, self.shown
        );
    }
}
