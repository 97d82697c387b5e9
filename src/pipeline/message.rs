use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::common::Frame;

pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// Everything that travels on a pipeline channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<T> {
    Data(T),
    Config(StreamConfig),
    /// Last message on a channel; nothing follows it.
    Shutdown,
}

impl<T> Message<T> {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Message::Shutdown)
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Message::Data(_))
    }
}

/// Stream-wide options announced by the producer before any data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Nominal frames per second.
    pub rate: f64,
}

impl StreamConfig {
    /// Builds the config from whatever rate the source reported, falling back
    /// to [`DEFAULT_FRAME_RATE`] for a missing, non-positive or non-finite value.
    pub fn from_reported(rate: Option<f64>) -> Self {
        Self {
            rate: rate.filter(|r| valid_rate(*r)).unwrap_or(DEFAULT_FRAME_RATE),
        }
    }

    pub fn effective_rate(&self) -> f64 {
        if valid_rate(self.rate) {
            self.rate
        } else {
            DEFAULT_FRAME_RATE
        }
    }

    /// Time budget for presenting one frame.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.effective_rate())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_FRAME_RATE,
        }
    }
}

fn valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// A frame paired with the analysis computed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedFrame {
    pub frame: Frame,
    pub result: AnalysisResult,
}
