use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::StageError;
use crate::pipeline::channel::MessageReceiver;
use crate::pipeline::message::{AnalyzedFrame, Message, StreamConfig};
use crate::presentation::{annotate, PresentationTarget, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConsumerStats {
    pub rendered: u64,
    pub cancelled: bool,
    pub rate: f64,
}

/// Terminal stage: applies stream config, overlays analysis results and
/// presents frames until shutdown or a cancel request from the surface.
///
/// A cancel stops this stage only; upstream stages are not told.
pub struct Consumer {
    target: Box<dyn PresentationTarget>,
    window_name: String,
    config: StreamConfig,
    stats: ConsumerStats,
}

impl Consumer {
    pub fn new(target: Box<dyn PresentationTarget>, window_name: impl Into<String>) -> Self {
        let config = StreamConfig::default();
        Self {
            target,
            window_name: window_name.into(),
            config,
            stats: ConsumerStats {
                rate: config.rate,
                ..ConsumerStats::default()
            },
        }
    }

    pub async fn run(
        mut self,
        mut input: MessageReceiver<AnalyzedFrame>,
    ) -> Result<ConsumerStats, StageError> {
        let mut surface = self.target.open(&self.window_name).await?;
        info!("Consumer presenting on '{}'", self.window_name);

        let outcome = self.pump(&mut input, surface.as_mut()).await;
        drop(surface);

        outcome?;
        info!(
            "Consumer finished: {} frames rendered{}",
            self.stats.rendered,
            if self.stats.cancelled { ", cancelled" } else { "" }
        );
        Ok(self.stats)
    }

    async fn pump(
        &mut self,
        input: &mut MessageReceiver<AnalyzedFrame>,
        surface: &mut dyn Surface,
    ) -> Result<(), StageError> {
        while let Some(message) = input.recv().await {
            match message {
                Message::Config(config) => {
                    // a cancel already requested wins over any pacing change
                    if surface.poll_cancel(Duration::ZERO).await {
                        self.cancel();
                        return Ok(());
                    }
                    self.apply_config(config);
                }
                Message::Data(AnalyzedFrame { mut frame, result }) => {
                    annotate(&mut frame, &result);
                    info!(
                        timestamp = %frame.captured_at().format("%Y-%m-%d %H:%M:%S"),
                        "frame {} motion: {} count: {}",
                        frame.sequence(),
                        result.has_activity,
                        result.object_count
                    );
                    surface.show(&frame).await?;
                    self.stats.rendered += 1;

                    if surface.poll_cancel(self.config.frame_interval()).await {
                        self.cancel();
                        return Ok(());
                    }
                }
                Message::Shutdown => {
                    debug!("Consumer received shutdown");
                    break;
                }
            }
        }
        Ok(())
    }

    fn apply_config(&mut self, config: StreamConfig) {
        let rate = config.effective_rate();
        if rate != config.rate {
            warn!(
                "Ignoring invalid rate {} in stream config, using {}",
                config.rate, rate
            );
        }
        self.config = StreamConfig { rate };
        self.stats.rate = rate;
        info!("Consumer pacing at {} fps", rate);
    }

    fn cancel(&mut self) {
        info!("Consumer cancelled after {} frames", self.stats.rendered);
        self.stats.cancelled = true;
    }
}
