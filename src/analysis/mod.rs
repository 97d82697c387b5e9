pub mod motion_detector;
pub mod result;

pub use motion_detector::{MotionDetector, MotionDetectorConfig};
pub use result::{AnalysisResult, Region};

use crate::common::Frame;
use crate::error::ConversionError;

/// Pairwise frame analysis used by the transformer stage.
///
/// The analyzer is stateless: the transformer owns the carried-forward
/// representation and hands both sides of every comparison back in.
pub trait FrameAnalyzer: Send + 'static {
    /// The comparison form of a frame (for motion detection, its luminance plane).
    type Repr: Send + 'static;

    fn name(&self) -> &'static str;

    fn derive(&self, frame: &Frame) -> Result<Self::Repr, ConversionError>;

    /// Compares two representations of consecutive frames; `sequence` is the
    /// current frame's, for error reporting.
    fn compare(
        &self,
        previous: &Self::Repr,
        current: &Self::Repr,
        sequence: u64,
    ) -> Result<AnalysisResult, ConversionError>;
}
