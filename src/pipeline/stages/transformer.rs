use tracing::{debug, error, info};

use crate::analysis::{AnalysisResult, FrameAnalyzer};
use crate::common::Frame;
use crate::error::{ConversionError, StageError};
use crate::pipeline::channel::{MessageReceiver, MessageSender};
use crate::pipeline::message::{AnalyzedFrame, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformerStats {
    pub frames_analyzed: u64,
    pub frames_with_activity: u64,
    pub configs_forwarded: u64,
}

/// Enriches each frame with an analysis of how it differs from the one before.
///
/// The only state is the previous frame's derived representation. It starts
/// empty, is replaced after every analyzed frame and is dropped when the
/// stage ends.
pub struct Transformer<A: FrameAnalyzer> {
    analyzer: A,
    previous: Option<A::Repr>,
    stats: TransformerStats,
}

impl<A: FrameAnalyzer> Transformer<A> {
    pub fn new(analyzer: A) -> Self {
        Self {
            analyzer,
            previous: None,
            stats: TransformerStats::default(),
        }
    }

    pub fn stats(&self) -> TransformerStats {
        self.stats
    }

    /// Analyzes `frame` against the frame passed to the previous call.
    ///
    /// History is replaced only after the comparison, so a frame is never
    /// compared with itself. The first frame has nothing to compare against
    /// and yields an empty result.
    pub fn advance(&mut self, frame: &Frame) -> Result<AnalysisResult, ConversionError> {
        let current = self.analyzer.derive(frame)?;
        let result = match self.previous.as_ref() {
            None => AnalysisResult::empty(),
            Some(previous) => self.analyzer.compare(previous, &current, frame.sequence())?,
        };
        self.previous = Some(current);

        self.stats.frames_analyzed += 1;
        if result.has_activity {
            self.stats.frames_with_activity += 1;
        }
        Ok(result)
    }

    pub async fn run(
        mut self,
        mut input: MessageReceiver<Frame>,
        output: MessageSender<AnalyzedFrame>,
    ) -> Result<TransformerStats, StageError> {
        info!("Transformer starting with {}", self.analyzer.name());

        let outcome = self.pump(&mut input, &output).await;
        if let Err(e) = &outcome {
            error!("Transformer stopping early: {}", e);
        }

        // Shutdown goes out on every exit path; a closed output just fails again here.
        let shutdown = output.shutdown().await;
        self.previous = None;

        outcome?;
        shutdown?;
        info!(
            "Transformer finished: {} frames analyzed, {} with activity",
            self.stats.frames_analyzed, self.stats.frames_with_activity
        );
        Ok(self.stats)
    }

    async fn pump(
        &mut self,
        input: &mut MessageReceiver<Frame>,
        output: &MessageSender<AnalyzedFrame>,
    ) -> Result<(), StageError> {
        while let Some(message) = input.recv().await {
            match message {
                Message::Config(config) => {
                    debug!("Forwarding config {:?}", config);
                    output.send_config(config).await?;
                    self.stats.configs_forwarded += 1;
                }
                Message::Data(frame) => {
                    let result = self.advance(&frame)?;
                    debug!(
                        "Frame {} analyzed: activity={} objects={}",
                        frame.sequence(),
                        result.has_activity,
                        result.object_count
                    );
                    output.send_data(AnalyzedFrame { frame, result }).await?;
                }
                Message::Shutdown => {
                    debug!("Transformer received shutdown");
                    break;
                }
            }
        }
        Ok(())
    }
}
