//! Builds the output image for one tick.
//!
//! Order: clear to black; if the camera is not active, a status message and
//! nothing else; otherwise the frame as mirrored grayscale, then one glyph per
//! overlay point whose cell has presence, tinted with the target color and
//! faded by that presence.
//!
//! Video and overlay go through the same [`Viewport`], and both mirror about
//! the frame's vertical center, so glyphs land on the region that lit them.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::color::{Rgb, gray};
use crate::config::{Config, ScaleMode};
use crate::draw::{draw_label, draw_text_centered, is_drawable, text_size};
use crate::grid::PresenceGrid;
use crate::types::{FrameBuffer, Surface};

/// Presence is read on the 8-bit alpha scale.
const ALPHA_SCALE: f32 = 255.0;

/// Reflect a frame x-coordinate about the vertical center line.
#[inline]
pub fn mirror_x(x: f32, width: f32) -> f32 {
    width - x
}

/// What the compositor is asked to show this tick.
pub enum View<'a> {
    Live { frame: &'a FrameBuffer, mirror: bool },
    Waiting,
    Failed(&'a str),
}

/// Affine map from frame coordinates to surface coordinates:
/// `surface = frame * scale + offset`, per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Viewport {
    pub fn new(frame: (u32, u32), surface: (u32, u32), mode: ScaleMode) -> Self {
        let sx = surface.0 as f32 / frame.0 as f32;
        let sy = surface.1 as f32 / frame.1 as f32;
        match mode {
            ScaleMode::Stretch => Self {
                scale_x: sx,
                scale_y: sy,
                offset_x: 0.0,
                offset_y: 0.0,
            },
            ScaleMode::Letterbox => {
                let s = sx.min(sy);
                Self {
                    scale_x: s,
                    scale_y: s,
                    offset_x: (surface.0 as f32 - frame.0 as f32 * s) / 2.0,
                    offset_y: (surface.1 as f32 - frame.1 as f32 * s) / 2.0,
                }
            }
        }
    }

    #[inline]
    pub fn to_surface(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale_x + self.offset_x, y * self.scale_y + self.offset_y)
    }

    /// Inverse map for one axis, sampling at pixel centers. None in the bars.
    fn source_index(dst: usize, scale: f32, offset: f32, len: usize) -> Option<usize> {
        let f = (dst as f32 + 0.5 - offset) / scale;
        (f >= 0.0 && f < len as f32).then(|| (f as usize).min(len - 1))
    }
}

pub struct Compositor {
    frame_width: usize,
    frame_height: usize,
    cell_size: usize,
    overlay_step: usize,
    glyph: String,
    glyph_scale: u32,
    status_scale: u32,
    color: Rgb,
    viewport: Viewport,
    // per surface column/row: the frame column/row it shows (unmirrored)
    src_x: Vec<Option<usize>>,
    src_y: Vec<Option<usize>>,
    rng: SmallRng,
}

impl Compositor {
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Fixed jitter sequence, for reproducible output.
    #[cfg(test)]
    pub fn with_seed(config: &Config, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: &Config, rng: SmallRng) -> Self {
        let (fw, fh) = (config.frame_width as usize, config.frame_height as usize);
        let (sw, sh) = (config.surface_width as usize, config.surface_height as usize);
        let viewport = Viewport::new(
            (config.frame_width, config.frame_height),
            (config.surface_width, config.surface_height),
            config.scale_mode,
        );
        let src_x = (0..sw)
            .map(|dx| Viewport::source_index(dx, viewport.scale_x, viewport.offset_x, fw))
            .collect();
        let src_y = (0..sh)
            .map(|dy| Viewport::source_index(dy, viewport.scale_y, viewport.offset_y, fh))
            .collect();

        if !is_drawable(&config.glyph) {
            warn!(glyph = %config.glyph, "glyph has no drawable characters; overlay will be invisible");
        }

        Self {
            frame_width: fw,
            frame_height: fh,
            cell_size: config.cell_size as usize,
            overlay_step: config.overlay_step as usize,
            glyph: config.glyph.clone(),
            glyph_scale: config.glyph_scale,
            status_scale: config.status_scale,
            color: config.target_color,
            viewport,
            src_x,
            src_y,
            rng,
        }
    }

    pub fn render(&mut self, surface: &mut Surface, view: View<'_>, grid: &PresenceGrid) {
        surface.fill(0);
        match view {
            View::Waiting => self.draw_status(surface, &["WAITING FOR CAMERA..."], Rgb::YELLOW),
            View::Failed(reason) => self.draw_status(
                surface,
                &["CAMERA ERROR", reason, "SPACE: SWITCH   R: RETRY"],
                Rgb::RED,
            ),
            View::Live { frame, mirror } => {
                self.draw_video(surface, frame, mirror);
                self.draw_overlay(surface, grid, mirror);
            }
        }
    }

    /// Frame scaled to the surface, grayscale, reflected when `mirror`.
    fn draw_video(&self, surface: &mut Surface, frame: &FrameBuffer, mirror: bool) {
        let last = self.frame_width - 1;
        for (dy, sy) in self.src_y.iter().enumerate().take(surface.height) {
            let Some(fy) = *sy else { continue };
            let row = &mut surface.pixels[dy * surface.width..(dy + 1) * surface.width];
            for (px, sx) in row.iter_mut().zip(&self.src_x) {
                let Some(fx) = *sx else { continue };
                let fx = if mirror { last - fx } else { fx };
                *px = gray(frame.rgb_clamped(fx, fy).luma());
            }
        }
    }

    fn draw_overlay(&mut self, surface: &mut Surface, grid: &PresenceGrid, mirror: bool) {
        let half = self.overlay_step as f32 / 2.0;
        let width = self.frame_width as f32;
        for x in (0..self.frame_width).step_by(self.overlay_step) {
            for y in (0..self.frame_height).step_by(self.overlay_step) {
                let (i, j) = (x / self.cell_size, y / self.cell_size);
                if i >= grid.cols() || j >= grid.rows() {
                    continue;
                }
                let p = grid.value_at(i, j);
                if p <= 0.0 {
                    continue;
                }
                let draw_x = if mirror { mirror_x(x as f32, width) } else { x as f32 };
                let jitter_x = self.rng.gen_range(-half..=half);
                let jitter_y = self.rng.gen_range(-half..=half);
                let (sx, sy) = self.viewport.to_surface(draw_x + jitter_x, y as f32 + jitter_y);
                let alpha = (p / ALPHA_SCALE).min(1.0);
                draw_text_centered(
                    surface,
                    sx.round() as i32,
                    sy.round() as i32,
                    &self.glyph,
                    self.color,
                    self.glyph_scale,
                    alpha,
                );
            }
        }
    }

    /// Centered lines of status text.
    fn draw_status(&self, surface: &mut Surface, lines: &[&str], color: Rgb) {
        let scale = self.status_scale;
        let line_h = text_size("", scale).1 * 2;
        let block_h = line_h * lines.len() as i32;
        let mut y = surface.height as i32 / 2 - block_h / 2;
        for (n, line) in lines.iter().enumerate() {
            // detail lines are smaller so long error strings still fit
            let s = if n == 0 { scale } else { scale.div_ceil(2) };
            let line = fit_to_width(line, s, surface.width as i32);
            let (w, _) = text_size(&line, s);
            draw_label(surface, surface.width as i32 / 2 - w / 2, y, &line, color, s);
            y += line_h;
        }
    }

    /// Small white text in the top-left corner.
    pub fn draw_hud(&self, surface: &mut Surface, text: &str) {
        draw_label(surface, 8, 8, text, Rgb::WHITE, 1);
    }
}

/// Truncate `text` with "..." so it fits in `max_w` pixels at `scale`.
fn fit_to_width(text: &str, scale: u32, max_w: i32) -> String {
    if text_size(text, scale).0 <= max_w {
        return text.to_string();
    }
    let mut out: String = text.chars().collect();
    while !out.is_empty() && text_size(&format!("{out}..."), scale).0 > max_w {
        out.pop();
    }
    format!("{out}...")
}
