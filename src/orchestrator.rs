use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::analysis::{FrameAnalyzer, MotionDetector};
use crate::config::Configuration;
use crate::error::{AppError, StageError};
use crate::pipeline::{
    bounded, Consumer, ConsumerStats, Producer, ProducerStats, Transformer, TransformerStats,
};
use crate::presentation::PresentationTarget;
use crate::source::FrameSource;

/// Runs the three stages as independent tasks and reaps them.
///
/// Shutdown flows downstream through the channels. The orchestrator only
/// waits on the consumer; once it is done the other stages get a shared grace
/// period and are aborted if they are still running.
pub struct Orchestrator<A: FrameAnalyzer = MotionDetector> {
    source: Box<dyn FrameSource>,
    analyzer: A,
    target: Box<dyn PresentationTarget>,
    channel_capacity: usize,
    grace_period: Duration,
    window_name: String,
}

/// How each stage ended.
#[derive(Debug)]
pub struct PipelineReport {
    pub producer: Result<ProducerStats, StageError>,
    pub transformer: Result<TransformerStats, StageError>,
    pub consumer: Result<ConsumerStats, StageError>,
}

impl PipelineReport {
    fn stage_errors(&self) -> impl Iterator<Item = (&'static str, &StageError)> {
        [
            ("producer", self.producer.as_ref().err()),
            ("transformer", self.transformer.as_ref().err()),
            ("consumer", self.consumer.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(stage, err)| err.map(|e| (stage, e)))
    }

    /// True when no stage ended abnormally. A user cancel and the reaping
    /// that follows it still count as success.
    pub fn is_success(&self) -> bool {
        self.stage_errors().all(|(_, e)| !e.is_abnormal())
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn log_summary(&self) {
        if let Ok(stats) = &self.consumer {
            info!(
                "Pipeline finished: {} frames rendered{}",
                stats.rendered,
                if stats.cancelled { " (cancelled)" } else { "" }
            );
        }
        for (stage, err) in self.stage_errors() {
            if err.is_abnormal() {
                error!("The {} stage failed: {}", stage, err);
            } else {
                info!("The {} stage stopped early: {}", stage, err);
            }
        }
    }
}

impl<A: FrameAnalyzer> Orchestrator<A> {
    pub async fn run(self) -> PipelineReport {
        let (frame_tx, frame_rx) = bounded("frames", self.channel_capacity);
        let (result_tx, result_rx) = bounded("results", self.channel_capacity);

        info!(
            "Starting pipeline with channel capacity {} and a {:?} grace period",
            self.channel_capacity, self.grace_period
        );
        let producer_task = tokio::spawn(Producer::new(self.source).run(frame_tx));
        let transformer_task =
            tokio::spawn(Transformer::new(self.analyzer).run(frame_rx, result_tx));
        let consumer_task =
            tokio::spawn(Consumer::new(self.target, self.window_name).run(result_rx));

        let consumer = Self::flatten(consumer_task.await);

        let deadline = Instant::now() + self.grace_period;
        let transformer =
            Self::reap("transformer", transformer_task, deadline, self.grace_period).await;
        let producer = Self::reap("producer", producer_task, deadline, self.grace_period).await;

        PipelineReport {
            producer,
            transformer,
            consumer,
        }
    }

    /// Waits for a stage until `deadline`, then aborts it. The abort is
    /// awaited without a timeout so the task's resources are dropped before
    /// this returns.
    async fn reap<T>(
        stage: &'static str,
        mut handle: JoinHandle<Result<T, StageError>>,
        deadline: Instant,
        grace: Duration,
    ) -> Result<T, StageError> {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(joined) => Self::flatten(joined),
            Err(_) => {
                warn!(
                    "The {} stage is still running after the {:?} grace period, aborting it",
                    stage, grace
                );
                handle.abort();
                match handle.await {
                    Err(e) if e.is_cancelled() => Err(StageError::StragglerTimeout { grace }),
                    // finished on its own between the deadline and the abort
                    joined => Self::flatten(joined),
                }
            }
        }
    }

    fn flatten<T>(joined: Result<Result<T, StageError>, JoinError>) -> Result<T, StageError> {
        match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(StageError::Panicked(e.to_string())),
            Err(e) => Err(StageError::Panicked(format!("task did not complete: {}", e))),
        }
    }
}

pub struct OrchestratorBuilder<A: FrameAnalyzer = MotionDetector> {
    configuration: Configuration,
    source: Option<Box<dyn FrameSource>>,
    target: Option<Box<dyn PresentationTarget>>,
    analyzer: A,
}

impl OrchestratorBuilder<MotionDetector> {
    pub fn new(configuration: Configuration) -> Self {
        let analyzer = MotionDetector::new(configuration.analysis.clone());
        Self {
            configuration,
            source: None,
            target: None,
            analyzer,
        }
    }
}

impl<A: FrameAnalyzer> OrchestratorBuilder<A> {
    pub fn source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn target(mut self, target: Box<dyn PresentationTarget>) -> Self {
        self.target = Some(target);
        self
    }

    // Replaces the motion detector built from the configuration.
    pub fn analyzer<B: FrameAnalyzer>(self, analyzer: B) -> OrchestratorBuilder<B> {
        OrchestratorBuilder {
            configuration: self.configuration,
            source: self.source,
            target: self.target,
            analyzer,
        }
    }

    // Overrides the configured channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.configuration.pipeline.channel_capacity = capacity;
        self
    }

    // Overrides the configured grace period.
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.configuration.pipeline.grace_period_ms = grace_period.as_millis() as u64;
        self
    }

    pub fn build(self) -> Result<Orchestrator<A>, AppError> {
        self.configuration.validate()?;
        let source = self
            .source
            .ok_or(AppError::Pipeline("Source not set".to_string()))?;
        let target = self
            .target
            .ok_or(AppError::Pipeline("Presentation target not set".to_string()))?;

        Ok(Orchestrator {
            source,
            analyzer: self.analyzer,
            target,
            channel_capacity: self.configuration.pipeline.channel_capacity,
            grace_period: self.configuration.pipeline.grace_period(),
            window_name: self.configuration.presentation.window_name,
        })
    }
}
