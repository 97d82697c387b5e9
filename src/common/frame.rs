use chrono::{DateTime, Utc};
use image::DynamicImage;
use uuid::Uuid;

/// One decoded unit of the stream.
///
/// A frame is owned by exactly one stage at a time: it moves through the
/// channels and is never shared, so the stage holding it may mutate it freely.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    sequence: u64,
    frame_id: Uuid,
    captured_at: DateTime<Utc>,
    image: DynamicImage,
}

impl Frame {
    pub fn new(sequence: u64, image: DynamicImage) -> Self {
        Self {
            sequence,
            frame_id: Uuid::new_v4(),
            captured_at: Utc::now(),
            image,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut DynamicImage {
        &mut self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}
