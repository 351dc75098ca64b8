// Core buffers shared by the sampler, the compositor and the window.

use crate::color::Rgb;
use crate::error::{Error, Result};

/// One camera frame: RGBA8, row-major, top-left origin.
/// Read-only once built; the sampler and compositor borrow it.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    rgba: Vec<u8>, // length = width * height * 4
}

impl FrameBuffer {
    /// Wrap raw RGBA bytes. Fails when the length does not match the size.
    pub fn from_rgba(width: usize, height: usize, rgba: Vec<u8>) -> Result<Self> {
        let expected = width * height * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(Error::MalformedFrame(format!(
                "{width}x{height} frame needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }

    /// A frame filled with one opaque color.
    #[cfg(test)]
    pub fn solid(width: usize, height: usize, color: Rgb) -> Self {
        let mut rgba = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            rgba.extend_from_slice(&[color.r, color.g, color.b, 255]);
        }
        Self { width, height, rgba }
    }

    /// Color at (x,y), clamped to the frame edges.
    #[inline]
    pub fn rgb_clamped(&self, x: usize, y: usize) -> Rgb {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let idx = 4 * (y * self.width + x);
        Rgb::new(self.rgba[idx], self.rgba[idx + 1], self.rgba[idx + 2])
    }

    /// Overwrite one pixel.
    #[cfg(test)]
    pub fn set_rgb(&mut self, x: usize, y: usize, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = 4 * (y * self.width + x);
        self.rgba[idx] = color.r;
        self.rgba[idx + 1] = color.g;
        self.rgba[idx + 2] = color.b;
        self.rgba[idx + 3] = 255;
    }

    /// Paint an axis-aligned rectangle, clipped to the frame.
    #[cfg(test)]
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgb) {
        for yy in y..(y + h).min(self.height) {
            for xx in x..(x + w).min(self.width) {
                self.set_rgb(xx, yy, color);
            }
        }
    }

    /// Error unless the frame has exactly the expected size.
    pub fn ensure_size(&self, width: usize, height: usize) -> Result<()> {
        if self.width != width || self.height != height {
            return Err(Error::MalformedFrame(format!(
                "expected {width}x{height}, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// The render target pushed to the window: each entry is 0x00RRGGBB for minifb.
#[derive(Clone, Debug)]
pub struct Surface {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u32; width * height],
        }
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    #[cfg(test)]
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }
}
