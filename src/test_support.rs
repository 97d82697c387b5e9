//! Fakes and frame builders shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

use crate::common::Frame;
use crate::error::{PresentationError, SourceError};
use crate::pipeline::{Message, MessageReceiver};
use crate::presentation::{PresentationTarget, Surface};
use crate::source::{FrameSource, SourceHandle};

pub fn solid_image(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

pub fn solid_frame(sequence: u64, width: u32, height: u32, value: u8) -> Frame {
    Frame::new(sequence, solid_image(width, height, value))
}

/// White rectangles `(x, y, width, height)` on a black frame.
pub fn rects_image(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> DynamicImage {
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    for &(x0, y0, w, h) in rects {
        for y in y0..(y0 + h).min(height) {
            for x in x0..(x0 + w).min(width) {
                canvas.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
    }
    DynamicImage::ImageRgb8(canvas)
}

/// White squares `(x, y, size)` on a black frame.
pub fn squares_image(width: u32, height: u32, squares: &[(u32, u32, u32)]) -> DynamicImage {
    let rects: Vec<_> = squares.iter().map(|&(x, y, size)| (x, y, size, size)).collect();
    rects_image(width, height, &rects)
}

pub fn frame_with_squares(sequence: u64, width: u32, height: u32, squares: &[(u32, u32, u32)]) -> Frame {
    Frame::new(sequence, squares_image(width, height, squares))
}

pub fn frame_with_rects(sequence: u64, width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> Frame {
    Frame::new(sequence, rects_image(width, height, rects))
}

pub fn gray_images(count: usize, width: u32, height: u32) -> Vec<DynamicImage> {
    (0..count).map(|_| solid_image(width, height, 128)).collect()
}

/// Reads a channel until it reports closed.
pub async fn drain<T>(rx: &mut MessageReceiver<T>) -> Vec<Message<T>> {
    let mut messages = Vec::new();
    while let Some(message) = rx.recv().await {
        messages.push(message);
    }
    messages
}

pub struct UnopenableSource;

#[async_trait]
impl FrameSource for UnopenableSource {
    fn describe(&self) -> String {
        "People - 6387.mp4".to_string()
    }

    async fn open(&self) -> Result<Box<dyn SourceHandle>, SourceError> {
        Err(SourceError::Open {
            path: self.describe().into(),
            reason: "no such file".to_string(),
        })
    }
}

/// In-memory source that counts handle releases and can fail or hang mid-stream.
pub struct CountingSource {
    images: Vec<DynamicImage>,
    rate: Option<f64>,
    releases: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    hang_after: Option<usize>,
}

impl CountingSource {
    pub fn new(images: Vec<DynamicImage>) -> Self {
        Self {
            images,
            rate: None,
            releases: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
            hang_after: None,
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn fail_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Blocks forever once `frames` images have been read.
    pub fn hang_after(mut self, frames: usize) -> Self {
        self.hang_after = Some(frames);
        self
    }

    pub fn releases(&self) -> Arc<AtomicUsize> {
        self.releases.clone()
    }
}

#[async_trait]
impl FrameSource for CountingSource {
    fn describe(&self) -> String {
        "counting".to_string()
    }

    async fn open(&self) -> Result<Box<dyn SourceHandle>, SourceError> {
        Ok(Box::new(CountingHandle {
            images: self.images.clone(),
            read: 0,
            rate: self.rate,
            releases: self.releases.clone(),
            fail_after: self.fail_after,
            hang_after: self.hang_after,
        }))
    }
}

struct CountingHandle {
    images: Vec<DynamicImage>,
    read: usize,
    rate: Option<f64>,
    releases: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    hang_after: Option<usize>,
}

#[async_trait]
impl SourceHandle for CountingHandle {
    fn rate(&self) -> Option<f64> {
        self.rate
    }

    async fn read_next(&mut self) -> Result<Option<DynamicImage>, SourceError> {
        if self.hang_after == Some(self.read) {
            std::future::pending::<()>().await;
        }
        if self.fail_after == Some(self.read) {
            return Err(SourceError::Io {
                path: "counting".into(),
                source: std::io::Error::other("device unplugged"),
            });
        }
        let next = self.images.get(self.read).cloned();
        if next.is_some() {
            self.read += 1;
        }
        Ok(next)
    }
}

impl Drop for CountingHandle {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct SurfaceRecord {
    pub opened: Vec<String>,
    pub shown: Vec<u64>,
    pub budgets: Vec<Duration>,
    pub polls: usize,
    pub closed: usize,
    pub last_frame: Option<Frame>,
}

/// Presentation target that records everything and never waits.
#[derive(Clone, Default)]
pub struct RecordingTarget {
    record: Arc<Mutex<SurfaceRecord>>,
    cancel_on_poll: Option<usize>,
    fail_show: bool,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `poll`-th cancel poll (1-based) and every later one report a cancel.
    pub fn cancel_on_poll(mut self, poll: usize) -> Self {
        self.cancel_on_poll = Some(poll);
        self
    }

    pub fn fail_show(mut self) -> Self {
        self.fail_show = true;
        self
    }

    pub fn record(&self) -> Arc<Mutex<SurfaceRecord>> {
        self.record.clone()
    }
}

#[async_trait]
impl PresentationTarget for RecordingTarget {
    async fn open(&self, name: &str) -> Result<Box<dyn Surface>, PresentationError> {
        self.record.lock().unwrap().opened.push(name.to_string());
        Ok(Box::new(RecordingSurface {
            record: self.record.clone(),
            cancel_on_poll: self.cancel_on_poll,
            fail_show: self.fail_show,
        }))
    }
}

struct RecordingSurface {
    record: Arc<Mutex<SurfaceRecord>>,
    cancel_on_poll: Option<usize>,
    fail_show: bool,
}

#[async_trait]
impl Surface for RecordingSurface {
    async fn show(&mut self, frame: &Frame) -> Result<(), PresentationError> {
        if self.fail_show {
            return Err(PresentationError::Render {
                sequence: frame.sequence(),
                reason: "surface lost".to_string(),
            });
        }
        let mut record = self.record.lock().unwrap();
        record.shown.push(frame.sequence());
        record.last_frame = Some(frame.clone());
        Ok(())
    }

    async fn poll_cancel(&mut self, budget: Duration) -> bool {
        let mut record = self.record.lock().unwrap();
        record.polls += 1;
        record.budgets.push(budget);
        self.cancel_on_poll
            .map(|poll| record.polls >= poll)
            .unwrap_or(false)
    }
}

impl Drop for RecordingSurface {
    fn drop(&mut self) {
        if let Ok(mut record) = self.record.lock() {
            record.closed += 1;
        }
    }
}
