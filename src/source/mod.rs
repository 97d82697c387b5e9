pub mod image_sequence;
pub mod memory;

pub use image_sequence::ImageSequenceSource;
pub use memory::MemorySource;

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::SourceError;

/// Something the producer can open into a stream of frames.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Human-readable location, used in diagnostics.
    fn describe(&self) -> String;

    async fn open(&self) -> Result<Box<dyn SourceHandle>, SourceError>;
}

/// An opened source.
///
/// Dropping the handle releases whatever it holds, which makes release happen
/// exactly once on every exit path, including a forced abort of the producer.
#[async_trait]
pub trait SourceHandle: Send {
    /// Nominal frames per second, if the source knows it.
    fn rate(&self) -> Option<f64>;

    /// Next image in source order, or `None` once the source is exhausted.
    async fn read_next(&mut self) -> Result<Option<DynamicImage>, SourceError>;
}
