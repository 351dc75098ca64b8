// Decides, once per tick, which grid cells currently "see" the target color.
// Reads the raw camera frame: never the mirrored or desaturated render.

use tracing::trace;

use crate::color::Rgb;
use crate::config::Config;
use crate::error::Result;
use crate::grid::PresenceGrid;
use crate::types::FrameBuffer;

pub struct ColorSampler {
    target: Rgb,
    threshold: f32,
    cell_size: usize,
    frame_width: usize,
    frame_height: usize,
}

impl ColorSampler {
    pub fn new(config: &Config) -> Self {
        Self {
            target: config.target_color,
            threshold: config.threshold,
            cell_size: config.cell_size as usize,
            frame_width: config.frame_width as usize,
            frame_height: config.frame_height as usize,
        }
    }

    /// Pixel sampled for the cell whose top-left corner is (x,y): its center, clamped.
    #[inline]
    pub fn sample_point(&self, x: usize, y: usize) -> (usize, usize) {
        let half = self.cell_size / 2;
        (
            (x + half).min(self.frame_width - 1),
            (y + half).min(self.frame_height - 1),
        )
    }

    /// True when `color` is strictly closer than the threshold to the target.
    #[inline]
    pub fn matches(&self, color: Rgb) -> bool {
        color.distance(self.target) < self.threshold
    }

    /// Scan every cell and grow the matched ones. Returns how many matched.
    /// Fails without touching the grid if the frame has the wrong size.
    pub fn sample(&self, frame: &FrameBuffer, grid: &mut PresenceGrid) -> Result<usize> {
        frame.ensure_size(self.frame_width, self.frame_height)?;

        let mut matched = 0;
        for x in (0..self.frame_width).step_by(self.cell_size) {
            for y in (0..self.frame_height).step_by(self.cell_size) {
                // one pixel per cell: a thin red line can slip between sample points
                let (sx, sy) = self.sample_point(x, y);
                if self.matches(frame.rgb_clamped(sx, sy)) {
                    grid.grow(x / self.cell_size, y / self.cell_size);
                    matched += 1;
                }
            }
        }
        trace!(matched, "sampled frame");
        Ok(matched)
    }
}
