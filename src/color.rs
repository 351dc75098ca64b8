// Small color helpers: RGB triplets, packed 0x00RRGGBB pixels, luma and alpha blending.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// 8-bit RGB color. Written as `#rrggbb` in config files and on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean distance in RGB space.
    pub fn distance(self, other: Rgb) -> f32 {
        let dr = self.r as f32 - other.r as f32;
        let dg = self.g as f32 - other.g as f32;
        let db = self.b as f32 - other.b as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Rec. 709 luma, rounded to 0..255.
    #[inline]
    pub fn luma(self) -> u8 {
        let y = 0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32;
        y.round().clamp(0.0, 255.0) as u8
    }

    /// Pack as 0x00RRGGBB for minifb.
    #[inline]
    pub fn pack(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    #[inline]
    pub fn unpack(px: u32) -> Self {
        Self::new(((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
    }
}

/// Gray pixel packed as 0x00YYYYYY.
#[inline]
pub fn gray(y: u8) -> u32 {
    let y = y as u32;
    (y << 16) | (y << 8) | y
}

/// Source-over blend of `color` onto packed pixel `dst` with `alpha` in [0,1].
#[inline]
pub fn blend_over(dst: u32, color: Rgb, alpha: f32) -> u32 {
    let a = alpha.clamp(0.0, 1.0);
    if a <= 0.0 {
        return dst;
    }
    if a >= 1.0 {
        return color.pack();
    }
    let old = Rgb::unpack(dst);
    let mix = |o: u8, c: u8| (o as f32 * (1.0 - a) + c as f32 * a).round().clamp(0.0, 255.0) as u8;
    Rgb::new(mix(old.r, color.r), mix(old.g, color.g), mix(old.b, color.b)).pack()
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidConfig(format!("color must be #rrggbb, got {s:?}")));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| Error::InvalidConfig(format!("color {s:?}: {e}")))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
