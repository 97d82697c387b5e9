pub mod annotation;
pub mod frame_dump;

pub use annotation::annotate;
pub use frame_dump::FrameDumpTarget;

use std::time::Duration;

use async_trait::async_trait;

use crate::common::Frame;
use crate::error::PresentationError;

/// Where the consumer presents frames.
#[async_trait]
pub trait PresentationTarget: Send + Sync {
    async fn open(&self, name: &str) -> Result<Box<dyn Surface>, PresentationError>;
}

/// An opened presentation surface; dropping it closes the surface.
#[async_trait]
pub trait Surface: Send {
    async fn show(&mut self, frame: &Frame) -> Result<(), PresentationError>;

    /// Waits up to `budget` for a cancel request and reports whether one arrived.
    async fn poll_cancel(&mut self, budget: Duration) -> bool;
}
