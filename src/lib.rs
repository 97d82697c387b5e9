pub mod analysis;
pub mod common;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod presentation;
pub mod source;

#[cfg(test)]
mod test_support;

pub use analysis::{AnalysisResult, FrameAnalyzer, MotionDetector, MotionDetectorConfig, Region};
pub use common::Frame;
pub use config::Configuration;
pub use error::{AppError, ChannelError, ConversionError, PresentationError, SourceError, StageError};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, PipelineReport};
pub use presentation::{FrameDumpTarget, PresentationTarget, Surface};
pub use source::{FrameSource, ImageSequenceSource, MemorySource, SourceHandle};
