use tracing::{debug, error, info};

use crate::common::Frame;
use crate::error::StageError;
use crate::pipeline::channel::MessageSender;
use crate::pipeline::message::StreamConfig;
use crate::source::{FrameSource, SourceHandle};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProducerStats {
    pub frames_sent: u64,
    pub rate: f64,
}

/// Turns a frame source into an ordered message stream:
/// `Config`, then one `Data` per frame, then `Shutdown`.
pub struct Producer {
    source: Box<dyn FrameSource>,
}

impl Producer {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self { source }
    }

    pub async fn run(self, output: MessageSender<Frame>) -> Result<ProducerStats, StageError> {
        info!("Producer starting on '{}'", self.source.describe());

        let mut handle = match self.source.open().await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Producer failed to open '{}': {}", self.source.describe(), e);
                // downstream still gets a clean end of stream
                if let Err(shutdown) = output.shutdown().await {
                    debug!("Shutdown after failed open not delivered: {}", shutdown);
                }
                return Err(StageError::SourceOpen(e));
            }
        };

        let config = StreamConfig::from_reported(handle.rate());
        let outcome = Self::pump(handle.as_mut(), &output, config).await;

        let shutdown = output.shutdown().await;
        drop(handle);

        let stats = outcome?;
        shutdown?;
        info!(
            "Producer finished after {} frames at {} fps",
            stats.frames_sent, stats.rate
        );
        Ok(stats)
    }

    async fn pump(
        handle: &mut dyn SourceHandle,
        output: &MessageSender<Frame>,
        config: StreamConfig,
    ) -> Result<ProducerStats, StageError> {
        output.send_config(config).await?;

        let mut stats = ProducerStats {
            frames_sent: 0,
            rate: config.rate,
        };
        loop {
            let image = match handle.read_next().await {
                Ok(Some(image)) => image,
                Ok(None) => {
                    debug!("Source exhausted after {} frames", stats.frames_sent);
                    return Ok(stats);
                }
                Err(e) => {
                    error!("Producer failed reading frame {}: {}", stats.frames_sent, e);
                    return Err(StageError::SourceRead(e));
                }
            };

            output
                .send_data(Frame::new(stats.frames_sent, image))
                .await?;
            stats.frames_sent += 1;
        }
    }
}
