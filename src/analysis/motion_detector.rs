use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AnalysisResult, FrameAnalyzer, Region};
use crate::common::Frame;
use crate::error::ConversionError;

pub const DEFAULT_DIFF_THRESHOLD: u8 = 25;
pub const DEFAULT_DILATE_ITERATIONS: u32 = 2;
pub const DEFAULT_MIN_AREA: u32 = 400;

/// Tunables for [`MotionDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionDetectorConfig {
    /// Luminance difference a pixel must exceed to count as changed.
    pub diff_threshold: u8,
    /// Passes of a 3x3 dilation over the change mask.
    pub dilate_iterations: u32,
    /// Regions whose outer contour encloses less than this many square pixels
    /// are treated as noise. The contour runs through boundary pixel centres,
    /// so a solid `w` x `h` block measures `(w - 1) * (h - 1)`.
    pub min_area: u32,
}

impl Default for MotionDetectorConfig {
    fn default() -> Self {
        Self {
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

/// Frame-differencing motion detector.
///
/// Two luminance planes are differenced, thresholded into a change mask,
/// dilated to merge nearby fragments, and split into 8-connected regions.
/// Regions lying in a hole of another region are dropped, as are regions
/// whose contour area is below `min_area`. The rest are reported by their
/// bounding boxes, top-to-bottom then left-to-right.
#[derive(Debug, Clone, Default)]
pub struct MotionDetector {
    config: MotionDetectorConfig,
}

impl MotionDetector {
    pub fn new(config: MotionDetectorConfig) -> Self {
        Self { config }
    }

    pub fn with_min_area(mut self, min_area: u32) -> Self {
        self.config.min_area = min_area;
        self
    }

    pub fn with_dilate_iterations(mut self, iterations: u32) -> Self {
        self.config.dilate_iterations = iterations;
        self
    }

    fn difference_mask(&self, previous: &GrayImage, current: &GrayImage) -> Mask {
        let threshold = self.config.diff_threshold;
        let cells = previous
            .as_raw()
            .iter()
            .zip(current.as_raw())
            .map(|(before, after)| before.abs_diff(*after) > threshold)
            .collect();
        Mask {
            width: current.width(),
            height: current.height(),
            cells,
        }
    }

    fn regions(&self, mask: &Mask) -> Vec<Region> {
        let blobs = mask.blobs();
        let total = blobs.len();

        let mut regions: Vec<Region> = blobs
            .iter()
            .filter(|blob| blob.external && blob.contour_area >= self.config.min_area as f64)
            .map(|blob| blob.bounds)
            .collect();
        regions.sort_by_key(|region| (region.y, region.x));

        debug!(
            "Motion mask produced {} blobs, {} kept as regions",
            total,
            regions.len()
        );
        regions
    }
}

impl FrameAnalyzer for MotionDetector {
    type Repr = GrayImage;

    fn name(&self) -> &'static str {
        "MotionDetector"
    }

    fn derive(&self, frame: &Frame) -> Result<GrayImage, ConversionError> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(ConversionError::EmptyFrame {
                sequence: frame.sequence(),
            });
        }
        Ok(frame.image().to_luma8())
    }

    fn compare(
        &self,
        previous: &GrayImage,
        current: &GrayImage,
        sequence: u64,
    ) -> Result<AnalysisResult, ConversionError> {
        if previous.dimensions() != current.dimensions() {
            return Err(ConversionError::ShapeMismatch {
                sequence,
                expected: previous.dimensions(),
                actual: current.dimensions(),
            });
        }

        let mut mask = self.difference_mask(previous, current);
        for _ in 0..self.config.dilate_iterations {
            mask = mask.dilate();
        }
        Ok(AnalysisResult::from_regions(self.regions(&mask)))
    }
}

/// Binary change mask, row-major.
#[derive(Debug, Clone)]
struct Mask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

#[derive(Debug, Clone)]
struct Blob {
    bounds: Region,
    contour_area: f64,
    /// False when the blob sits in a hole of another blob.
    external: bool,
}

// Clockwise from west, with y pointing down.
const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

impl Mask {
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn get(&self, x: u32, y: u32) -> bool {
        self.cells[self.index(x, y)]
    }

    // Pixels outside the frame read as clear.
    fn is_set(&self, (x, y): (i64, i64)) -> bool {
        x >= 0
            && y >= 0
            && x < self.width as i64
            && y < self.height as i64
            && self.get(x as u32, y as u32)
    }

    fn on_border(&self, x: u32, y: u32) -> bool {
        x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
    }

    fn four_neighbours(&self, x: u32, y: u32) -> impl Iterator<Item = (u32, u32)> {
        let (w, h) = (self.width, self.height);
        [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ]
        .into_iter()
        .filter(move |&(nx, ny)| nx < w && ny < h)
    }

    /// One pass of a 3x3 square dilation, done as a horizontal then a vertical sweep.
    fn dilate(&self) -> Mask {
        let (w, h) = (self.width, self.height);
        let mut horizontal = vec![false; self.cells.len()];
        for y in 0..h {
            for x in 0..w {
                let lo = x.saturating_sub(1);
                let hi = (x + 1).min(w - 1);
                horizontal[self.index(x, y)] = (lo..=hi).any(|nx| self.get(nx, y));
            }
        }

        let mut cells = vec![false; self.cells.len()];
        for y in 0..h {
            let lo = y.saturating_sub(1);
            let hi = (y + 1).min(h - 1);
            for x in 0..w {
                cells[self.index(x, y)] = (lo..=hi).any(|ny| horizontal[self.index(x, ny)]);
            }
        }

        Mask {
            width: w,
            height: h,
            cells,
        }
    }

    /// Clear pixels connected to the outside of the frame through 4-connected
    /// clear steps. Everything else that is clear is a hole.
    fn exterior(&self) -> Vec<bool> {
        let mut exterior = vec![false; self.cells.len()];
        let mut stack = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = self.index(x, y);
                if self.on_border(x, y) && !self.cells[idx] && !exterior[idx] {
                    exterior[idx] = true;
                    stack.push((x, y));
                }
            }
        }

        while let Some((x, y)) = stack.pop() {
            for (nx, ny) in self.four_neighbours(x, y) {
                let idx = self.index(nx, ny);
                if !self.cells[idx] && !exterior[idx] {
                    exterior[idx] = true;
                    stack.push((nx, ny));
                }
            }
        }
        exterior
    }

    /// 8-connected components in scan order of their first pixel.
    fn blobs(&self) -> Vec<Blob> {
        let exterior = self.exterior();
        let mut visited = vec![false; self.cells.len()];
        let mut blobs = Vec::new();
        let mut stack = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let start = self.index(x, y);
                if !self.cells[start] || visited[start] {
                    continue;
                }

                visited[start] = true;
                stack.push((x, y));
                let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
                let mut external = false;

                while let Some((cx, cy)) = stack.pop() {
                    min_x = min_x.min(cx);
                    min_y = min_y.min(cy);
                    max_x = max_x.max(cx);
                    max_y = max_y.max(cy);
                    if !external {
                        external = self.on_border(cx, cy)
                            || self
                                .four_neighbours(cx, cy)
                                .any(|(nx, ny)| exterior[self.index(nx, ny)]);
                    }

                    for ny in cy.saturating_sub(1)..=(cy + 1).min(self.height - 1) {
                        for nx in cx.saturating_sub(1)..=(cx + 1).min(self.width - 1) {
                            let idx = self.index(nx, ny);
                            if self.cells[idx] && !visited[idx] {
                                visited[idx] = true;
                                stack.push((nx, ny));
                            }
                        }
                    }
                }

                blobs.push(Blob {
                    bounds: Region::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1),
                    contour_area: self.contour_area((x as i64, y as i64)),
                    external,
                });
            }
        }
        blobs
    }

    /// Area inside the outer border of the component whose first pixel in
    /// scan order is `start`.
    ///
    /// The border is followed through 8-connected boundary pixels and the
    /// polygon through their centres is measured with the shoelace formula.
    fn contour_area(&self, start: (i64, i64)) -> f64 {
        let step = |(x, y): (i64, i64), dir: usize| (x + NEIGHBOURS[dir].0, y + NEIGHBOURS[dir].1);
        let direction = |from: (i64, i64), to: (i64, i64)| {
            (0..8).find(|&dir| step(from, dir) == to).unwrap_or(0)
        };

        // The west neighbour of a first pixel is clear, so the clockwise
        // search from there finds the pixel the border closes on.
        let Some(closing) = (0..8)
            .map(|dir| step(start, dir))
            .find(|&pixel| self.is_set(pixel))
        else {
            return 0.0;
        };

        let mut points = Vec::new();
        let (mut previous, mut current) = (closing, start);
        loop {
            let back = direction(current, previous);
            let next = (1..=8)
                .map(|k| step(current, (back + 8 - k) % 8))
                .find(|&pixel| self.is_set(pixel))
                .unwrap_or(previous);
            points.push(current);
            if current == closing && next == start {
                break;
            }
            previous = current;
            current = next;
        }

        let doubled: i64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.0 * b.1 - b.0 * a.1)
            .sum();
        doubled.abs() as f64 / 2.0
    }
}
