use std::collections::VecDeque;

use async_trait::async_trait;
use image::DynamicImage;

use super::{FrameSource, SourceHandle};
use crate::error::SourceError;

/// Frames held in memory, replayed in order on every open.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    images: Vec<DynamicImage>,
    rate: Option<f64>,
}

impl MemorySource {
    pub fn new(images: Vec<DynamicImage>) -> Self {
        Self { images, rate: None }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }
}

#[async_trait]
impl FrameSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} frames)", self.images.len())
    }

    async fn open(&self) -> Result<Box<dyn SourceHandle>, SourceError> {
        Ok(Box::new(MemoryHandle {
            pending: self.images.iter().cloned().collect(),
            rate: self.rate,
        }))
    }
}

struct MemoryHandle {
    pending: VecDeque<DynamicImage>,
    rate: Option<f64>,
}

#[async_trait]
impl SourceHandle for MemoryHandle {
    fn rate(&self) -> Option<f64> {
        self.rate
    }

    async fn read_next(&mut self) -> Result<Option<DynamicImage>, SourceError> {
        Ok(self.pending.pop_front())
    }
}
