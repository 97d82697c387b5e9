use image::{DynamicImage, Rgb, RgbImage};

use crate::analysis::{AnalysisResult, Region};
use crate::common::Frame;

const REGION_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const IDLE_COLOUR: Rgb<u8> = Rgb([128, 128, 128]);
const OUTLINE_THICKNESS: u32 = 2;

const BADGE_ORIGIN: u32 = 4;
const BADGE_SIZE: u32 = 12;
const TICK_WIDTH: u32 = 3;
const TICK_GAP: u32 = 2;
const MAX_TICKS: usize = 32;

/// Draws the analysis overlay onto the consumer's own copy of the frame.
///
/// Non-RGB frames are converted to RGB first.
pub fn annotate(frame: &mut Frame, result: &AnalysisResult) {
    let image = frame.image_mut();
    if image.as_rgb8().is_none() {
        *image = DynamicImage::ImageRgb8(image.to_rgb8());
    }
    let Some(canvas) = image.as_mut_rgb8() else {
        return;
    };

    for region in &result.regions {
        draw_outline(canvas, region, REGION_COLOUR);
    }
    draw_status(canvas, result);
}

fn draw_outline(canvas: &mut RgbImage, region: &Region, colour: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let right = region.right().min(width);
    let bottom = region.bottom().min(height);

    for y in region.y..bottom {
        for x in region.x..right {
            let on_edge = x < region.x + OUTLINE_THICKNESS
                || y < region.y + OUTLINE_THICKNESS
                || x + OUTLINE_THICKNESS >= region.right()
                || y + OUTLINE_THICKNESS >= region.bottom();
            if on_edge {
                canvas.put_pixel(x, y, colour);
            }
        }
    }
}

fn fill(canvas: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, colour: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    for y in y0..(y0 + h).min(height) {
        for x in x0..(x0 + w).min(width) {
            canvas.put_pixel(x, y, colour);
        }
    }
}

// Badge in the top-left corner followed by one tick per object.
fn draw_status(canvas: &mut RgbImage, result: &AnalysisResult) {
    let colour = if result.has_activity {
        REGION_COLOUR
    } else {
        IDLE_COLOUR
    };
    fill(canvas, BADGE_ORIGIN, BADGE_ORIGIN, BADGE_SIZE, BADGE_SIZE, colour);

    let mut x = BADGE_ORIGIN + BADGE_SIZE + TICK_GAP * 2;
    for _ in 0..result.object_count.min(MAX_TICKS) {
        fill(canvas, x, BADGE_ORIGIN, TICK_WIDTH, BADGE_SIZE, REGION_COLOUR);
        x += TICK_WIDTH + TICK_GAP;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::solid_frame;
    use image::{GrayImage, Luma};

    #[test]
    fn region_outline_is_drawn_and_interior_left_alone() {
        let mut frame = solid_frame(0, 200, 200, 0);
        let result = AnalysisResult::from_regions(vec![Region::new(100, 100, 30, 30)]);
        annotate(&mut frame, &result);

        let canvas = frame.image().as_rgb8().unwrap();
        assert_eq!(canvas.get_pixel(100, 100), &REGION_COLOUR);
        assert_eq!(canvas.get_pixel(101, 115), &REGION_COLOUR);
        assert_eq!(canvas.get_pixel(129, 129), &REGION_COLOUR);
        assert_eq!(canvas.get_pixel(115, 115), &Rgb([0, 0, 0]));
        assert_eq!(canvas.get_pixel(131, 131), &Rgb([0, 0, 0]));
    }

    #[test]
    fn status_badge_reflects_activity_and_count() {
        let mut idle = solid_frame(0, 100, 40, 0);
        annotate(&mut idle, &AnalysisResult::empty());
        let canvas = idle.image().as_rgb8().unwrap();
        assert_eq!(canvas.get_pixel(BADGE_ORIGIN, BADGE_ORIGIN), &IDLE_COLOUR);
        assert_eq!(canvas.get_pixel(22, BADGE_ORIGIN), &Rgb([0, 0, 0]));

        let mut busy = solid_frame(1, 100, 40, 0);
        let result = AnalysisResult::from_regions(vec![
            Region::new(60, 20, 5, 5),
            Region::new(80, 20, 5, 5),
        ]);
        annotate(&mut busy, &result);
        let canvas = busy.image().as_rgb8().unwrap();
        assert_eq!(canvas.get_pixel(BADGE_ORIGIN, BADGE_ORIGIN), &REGION_COLOUR);
        // first tick starts right after the badge
        assert_eq!(canvas.get_pixel(20, BADGE_ORIGIN), &REGION_COLOUR);
        assert_eq!(canvas.get_pixel(25, BADGE_ORIGIN), &REGION_COLOUR);
        assert_eq!(canvas.get_pixel(30, BADGE_ORIGIN), &Rgb([0, 0, 0]));
    }

    #[test]
    fn regions_past_the_frame_edge_are_clipped() {
        let mut frame = solid_frame(0, 50, 50, 0);
        let result = AnalysisResult::from_regions(vec![Region::new(40, 40, 30, 30)]);
        annotate(&mut frame, &result);
        assert_eq!(frame.image().as_rgb8().unwrap().get_pixel(40, 49), &REGION_COLOUR);
    }

    #[test]
    fn grayscale_frames_are_promoted_to_rgb() {
        let mut frame = Frame::new(0, DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([7]))));
        annotate(&mut frame, &AnalysisResult::empty());
        let canvas = frame.image().as_rgb8().unwrap();
        assert_eq!(canvas.get_pixel(31, 31), &Rgb([7, 7, 7]));
    }
}
