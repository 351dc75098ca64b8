// Window + software drawing utilities.
// 1) A window that shows the composited surface and reports key presses.
// 2) Alpha-blended pixel blocks.
// 3) A tiny 5x7 bitmap font, scalable, for overlay glyphs, status text and the HUD.

use crate::color::{Rgb, blend_over};
use crate::config::MAX_TEXT_SCALE;
use crate::error::Error;
use crate::types::Surface;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

/// Glyph cell advance in font units (5 columns + 1 spacing).
const ADVANCE: i32 = 6;
const GLYPH_H: i32 = 7;

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Create a window sized to the render surface.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push this tick's pixels to the screen. Also pumps window events.
    pub fn present(&mut self, surface: &Surface) -> Result<(), Error> {
        self.window
            .update_with_buffer(&surface.pixels, surface.width, surface.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// False once the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Space or S: switch between front and back camera.
    pub fn switch_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::Space, KeyRepeat::No)
            || self.window.is_key_pressed(Key::S, KeyRepeat::No)
    }

    /// R: request the current camera again (recovers from an error state).
    pub fn restart_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::R, KeyRepeat::No)
    }
}

/* ---------- Software drawing ---------- */

/// Blend one pixel if (x,y) is inside bounds.
#[inline]
pub fn blend_pixel(fb: &mut Surface, x: i32, y: i32, color: Rgb, alpha: f32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = blend_over(fb.pixels[idx], color, alpha);
}

/// A `size` x `size` block with its top-left corner at (x,y).
fn blend_block(fb: &mut Surface, x: i32, y: i32, size: i32, color: Rgb, alpha: f32) {
    for dy in 0..size {
        for dx in 0..size {
            blend_pixel(fb, x + dx, y + dy, color, alpha);
        }
    }
}

/* ---------- 5x7 bitmap font ---------- */

/// Return a 5x7 glyph bitmap. Lowercase letters use the uppercase shapes.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),
        '*' => g!(0b00000,0b00100,0b10101,0b01110,0b10101,0b00100,0b00000),
        '+' => g!(0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '=' => g!(0b00000,0b00000,0b11111,0b00000,0b11111,0b00000,0b00000),
        '#' => g!(0b01010,0b01010,0b11111,0b01010,0b11111,0b01010,0b01010),
        '!' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100),
        '?' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b00000,0b00100),
        '/' => g!(0b00000,0b00001,0b00010,0b00100,0b01000,0b10000,0b00000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),

        _ => None,
    }
}

/// Font pixel size in screen pixels, kept in 1..=MAX_TEXT_SCALE.
fn block_size(scale: u32) -> i32 {
    scale.clamp(1, MAX_TEXT_SCALE) as i32
}

/// True if at least one character of `text` has a glyph.
pub fn is_drawable(text: &str) -> bool {
    text.chars().any(|c| c != ' ' && glyph5x7(c).is_some())
}

/// Width and height in pixels of `text` at `scale`.
pub fn text_size(text: &str, scale: u32) -> (i32, i32) {
    let s = block_size(scale);
    let n = text.chars().count().min(i32::MAX as usize) as i32;
    let w = if n == 0 { 0 } else { n.saturating_mul(ADVANCE).saturating_sub(1).saturating_mul(s) };
    (w, GLYPH_H * s)
}

/// Draw a single 5x7 character at (x,y); each font pixel is a `scale` block.
fn draw_char_5x7(fb: &mut Surface, x: i32, y: i32, ch: char, color: Rgb, scale: i32, alpha: f32) {
    if let Some(rows) = glyph5x7(ch) {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    blend_block(fb, x + rx * scale, y + ry as i32 * scale, scale, color, alpha);
                }
            }
        }
    }
}

/// Draw `text` with its top-left corner at (x,y).
pub fn draw_text_5x7(fb: &mut Surface, x: i32, y: i32, text: &str, color: Rgb, scale: u32, alpha: f32) {
    let s = block_size(scale);
    let mut cx = x;
    for ch in text.chars() {
        draw_char_5x7(fb, cx, y, ch, color, s, alpha);
        cx = cx.saturating_add(ADVANCE * s);
    }
}

/// Draw `text` centered on (cx,cy).
pub fn draw_text_centered(fb: &mut Surface, cx: i32, cy: i32, text: &str, color: Rgb, scale: u32, alpha: f32) {
    let (w, h) = text_size(text, scale);
    draw_text_5x7(fb, cx - w / 2, cy - h / 2, text, color, scale, alpha);
}

/// Opaque text with a 1-block black shadow, for status lines and the HUD.
pub fn draw_label(fb: &mut Surface, x: i32, y: i32, text: &str, color: Rgb, scale: u32) {
    let s = block_size(scale);
    draw_text_5x7(fb, x + s, y + s, text, Rgb::BLACK, scale, 1.0);
    draw_text_5x7(fb, x, y, text, color, scale, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(fb: &Surface) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for y in 0..fb.height {
            for x in 0..fb.width {
                if fb.pixels[y * fb.width + x] != 0 {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn text_size_counts_advance_without_trailing_gap() {
        assert_eq!(text_size("", 2), (0, 14));
        assert_eq!(text_size("*", 1), (5, 7));
        assert_eq!(text_size("AB", 3), (33, 21));
    }

    #[test]
    fn oversized_scale_is_capped() {
        let capped = text_size("HELLO", MAX_TEXT_SCALE);
        assert_eq!(text_size("HELLO", u32::MAX), capped);
        assert_eq!(text_size("HELLO", 0), text_size("HELLO", 1));
        assert!(capped.0 > 0 && capped.1 > 0);

        let mut fb = Surface::new(16, 16);
        draw_label(&mut fb, 0, 0, "X", Rgb::WHITE, u32::MAX);
        assert!(!lit(&fb).is_empty());
    }

    #[test]
    fn star_glyph_centered_at_scale_one() {
        let mut fb = Surface::new(11, 11);
        draw_text_centered(&mut fb, 5, 5, "*", Rgb::RED, 1, 1.0);
        let px = lit(&fb);
        // 5x7 box spans x 3..=7, y 2..=8; the star's center dot is at its middle
        assert!(px.iter().all(|&(x, y)| (3..=7).contains(&x) && (2..=8).contains(&y)));
        assert!(px.contains(&(5, 5)));
        assert_eq!(px.len(), 11);
        assert_eq!(fb.get(5, 5), Some(Rgb::RED.pack()));
    }

    #[test]
    fn scale_multiplies_lit_area() {
        let mut one = Surface::new(40, 40);
        let mut three = Surface::new(40, 40);
        draw_text_5x7(&mut one, 0, 0, "+", Rgb::WHITE, 1, 1.0);
        draw_text_5x7(&mut three, 0, 0, "+", Rgb::WHITE, 3, 1.0);
        assert_eq!(lit(&three).len(), lit(&one).len() * 9);
    }

    #[test]
    fn drawing_is_clipped_and_alpha_blended() {
        let mut fb = Surface::new(4, 4);
        draw_text_5x7(&mut fb, -2, -3, "#", Rgb::RED, 1, 0.5);
        for px in &fb.pixels {
            assert!(*px == 0 || *px == Rgb::new(128, 0, 0).pack());
        }
        blend_pixel(&mut fb, 99, 99, Rgb::RED, 1.0);
    }

    #[test]
    fn lowercase_maps_to_uppercase_and_unknown_is_skipped() {
        assert_eq!(glyph5x7('a'), glyph5x7('A'));
        assert!(glyph5x7('\u{25CF}').is_none());
        assert!(is_drawable("*"));
        assert!(!is_drawable("\u{25CF}"));
        assert!(!is_drawable(" "));
    }
}
