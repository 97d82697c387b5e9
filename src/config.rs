use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::analysis::MotionDetectorConfig;
use crate::error::AppError;
use crate::pipeline::DEFAULT_CHANNEL_CAPACITY;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub analysis: MotionDetectorConfig,
    pub presentation: PresentationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Nominal rate to report for sources that carry no timing of their own.
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub channel_capacity: usize,
    /// How long upstream stages may keep running after the consumer stops.
    pub grace_period_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            grace_period_ms: 3000,
        }
    }
}

impl PipelineConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub window_name: String,
    /// Annotated frames are written here when set.
    pub output_dir: Option<PathBuf>,
    /// Wait out the inter-frame budget between frames.
    pub pace: bool,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            window_name: "Video".to_string(),
            output_dir: None,
            pace: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<Level, AppError> {
        self.level
            .parse::<Level>()
            .map_err(|_| AppError::InvalidConfig(format!("Unknown log level '{}'", self.level)))
    }
}

impl Configuration {
    /// Loads the configuration file if one is given; every missing key keeps its default.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let configuration: Configuration = builder.build()?.try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.pipeline.channel_capacity == 0 {
            return Err(AppError::InvalidConfig(
                "Channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.grace_period_ms == 0 {
            return Err(AppError::InvalidConfig(
                "Grace period must be greater than 0".to_string(),
            ));
        }

        if self.analysis.min_area == 0 {
            return Err(AppError::InvalidConfig(
                "Minimum region area must be greater than 0".to_string(),
            ));
        }

        if let Some(rate) = self.source.rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(AppError::InvalidConfig(format!(
                    "Source rate must be a positive number, got {}",
                    rate
                )));
            }
        }

        self.logging.max_level()?;
        Ok(())
    }
}
