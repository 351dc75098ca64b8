//! Tunable parameters.
//!
//! A [`Config`] is built once at startup from a preset, an optional TOML
//! file and command-line overrides (in that order), validated, and then
//! only ever borrowed.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::color::Rgb;
use crate::error::{Error, Result};
use crate::lifecycle::Facing;

/// Tick rates outside this range are refused, so the tick interval is always a
/// representable `Duration`.
pub const TICK_RATE_RANGE: std::ops::RangeInclusive<f32> = 0.01..=1000.0;

/// Upper bound for `glyph_scale` and `status_scale`.
pub const MAX_TEXT_SCALE: u32 = 32;

/// Named parameter sets. Each one is a complete config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// 640x480, fine 20px cells, 10 ticks/s.
    #[default]
    Classic,
    /// 1280x720, 40px cells, 15 ticks/s.
    Hd,
}

/// How the frame is fitted onto a render surface of a different size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Fill the whole surface, ignoring aspect ratio.
    #[default]
    Stretch,
    /// Uniform scale, centered, black bars on the short axis.
    Letterbox,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub target_color: Rgb,
    /// Maximum RGB distance that still counts as a match.
    pub threshold: f32,
    /// Sampling cell edge in frame pixels.
    pub cell_size: u32,
    /// Overlay glyph spacing in frame pixels.
    pub overlay_step: u32,
    pub max_presence: f32,
    pub grow_rate: f32,
    pub fade_rate: f32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub ticks_per_second: f32,
    pub glyph: String,

    pub glyph_scale: u32,
    pub status_scale: u32,
    pub surface_width: u32,
    pub surface_height: u32,
    pub scale_mode: ScaleMode,
    pub initial_facing: Facing,
    pub front_camera: u32,
    pub back_camera: u32,
    pub allow_switch: bool,
    pub exact_resolution: bool,
    pub show_hud: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

impl Config {
    pub fn preset(preset: Preset) -> Self {
        let (frame_width, frame_height, cell_size, overlay_step, threshold, ticks_per_second) =
            match preset {
                Preset::Classic => (640, 480, 20, 10, 173.0, 10.0),
                Preset::Hd => (1280, 720, 40, 20, 170.0, 15.0),
            };
        Self {
            target_color: Rgb::RED,
            threshold,
            cell_size,
            overlay_step,
            max_presence: 255.0,
            grow_rate: 60.0,
            fade_rate: 40.0,
            frame_width,
            frame_height,
            ticks_per_second,
            glyph: "*".to_string(),
            glyph_scale: 3,
            status_scale: 2,
            surface_width: frame_width,
            surface_height: frame_height,
            scale_mode: ScaleMode::Stretch,
            initial_facing: Facing::Front,
            front_camera: 0,
            back_camera: 1,
            allow_switch: true,
            exact_resolution: true,
            show_hud: true,
        }
    }

    /// Merge preset, file and command-line layers, then validate.
    pub fn resolve(file: Option<&Overrides>, cli: &Overrides) -> Result<Self> {
        let preset = cli
            .preset
            .or_else(|| file.and_then(|f| f.preset))
            .unwrap_or_default();
        let mut cfg = Self::preset(preset);
        if let Some(file) = file {
            file.apply(&mut cfg);
        }
        cli.apply(&mut cfg);
        cfg.validate()?;
        info!(?preset, "config resolved");
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        fn bad(msg: impl Into<String>) -> Result<()> {
            Err(Error::InvalidConfig(msg.into()))
        }
        if self.cell_size == 0 {
            return bad("cell_size must be > 0");
        }
        if self.overlay_step == 0 {
            return bad("overlay_step must be > 0");
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return bad(format!("threshold must be >= 0, got {}", self.threshold));
        }
        if !self.max_presence.is_finite() || self.max_presence <= 0.0 {
            return bad(format!("max_presence must be > 0, got {}", self.max_presence));
        }
        for (name, v) in [("grow_rate", self.grow_rate), ("fade_rate", self.fade_rate)] {
            if !v.is_finite() || v < 0.0 {
                return bad(format!("{name} must be a finite value >= 0, got {v}"));
            }
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return bad("frame size must be non-zero");
        }
        if self.surface_width == 0 || self.surface_height == 0 {
            return bad("surface size must be non-zero");
        }
        if !TICK_RATE_RANGE.contains(&self.ticks_per_second) {
            return bad(format!(
                "ticks_per_second must be in {}..={}, got {}",
                TICK_RATE_RANGE.start(),
                TICK_RATE_RANGE.end(),
                self.ticks_per_second
            ));
        }
        if self.glyph.is_empty() {
            return bad("glyph must not be empty");
        }
        for (name, v) in [("glyph_scale", self.glyph_scale), ("status_scale", self.status_scale)] {
            if !(1..=MAX_TEXT_SCALE).contains(&v) {
                return bad(format!("{name} must be in 1..={MAX_TEXT_SCALE}, got {v}"));
            }
        }
        if self.overlay_step > self.cell_size {
            warn!(
                overlay_step = self.overlay_step,
                cell_size = self.cell_size,
                "overlay_step is coarser than cell_size; some cells will never show a glyph"
            );
        }
        Ok(())
    }

    /// Grid columns: ceil(frame_width / cell_size).
    pub fn cols(&self) -> usize {
        self.frame_width.div_ceil(self.cell_size) as usize
    }

    /// Grid rows: ceil(frame_height / cell_size).
    pub fn rows(&self) -> usize {
        self.frame_height.div_ceil(self.cell_size) as usize
    }

    /// Time between ticks. Only meaningful on a validated config.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.ticks_per_second)
    }
}

/// A partial config. Used for both the TOML file and the command line;
/// every `Some` field replaces the value underneath it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    pub preset: Option<Preset>,
    pub target_color: Option<Rgb>,
    pub threshold: Option<f32>,
    pub cell_size: Option<u32>,
    pub overlay_step: Option<u32>,
    pub max_presence: Option<f32>,
    pub grow_rate: Option<f32>,
    pub fade_rate: Option<f32>,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub ticks_per_second: Option<f32>,
    pub glyph: Option<String>,
    pub glyph_scale: Option<u32>,
    pub status_scale: Option<u32>,
    pub surface_width: Option<u32>,
    pub surface_height: Option<u32>,
    pub scale_mode: Option<ScaleMode>,
    pub initial_facing: Option<Facing>,
    pub front_camera: Option<u32>,
    pub back_camera: Option<u32>,
    pub allow_switch: Option<bool>,
    pub exact_resolution: Option<bool>,
    pub show_hud: Option<bool>,
}

impl Overrides {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| Error::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn apply(&self, cfg: &mut Config) {
        macro_rules! take {
            ($src:ident, $dst:ident; $($field:ident),* $(,)?) => {
                $( if let Some(v) = &$src.$field { $dst.$field = v.clone(); } )*
            };
        }
        let src = self;
        take!(
            src, cfg;
            target_color, threshold, cell_size, overlay_step, max_presence, grow_rate,
            fade_rate, ticks_per_second, glyph, glyph_scale, status_scale, scale_mode,
            initial_facing, front_camera, back_camera, allow_switch, exact_resolution, show_hud,
        );

        // The surface follows the frame unless it is set explicitly.
        let surface_tracks_frame =
            cfg.surface_width == cfg.frame_width && cfg.surface_height == cfg.frame_height;
        take!(src, cfg; frame_width, frame_height);
        if surface_tracks_frame {
            cfg.surface_width = cfg.frame_width;
            cfg.surface_height = cfg.frame_height;
        }
        take!(src, cfg; surface_width, surface_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid_and_match_classic_preset() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg, Config::preset(Preset::Classic));
        assert_eq!(cfg.target_color, Rgb::RED);
        assert_eq!(cfg.glyph, "*");
        assert_eq!((cfg.grow_rate, cfg.fade_rate, cfg.max_presence), (60.0, 40.0, 255.0));
    }

    #[test]
    fn grid_dimensions_round_up() {
        let cfg = Config::default();
        assert_eq!(cfg.cols(), 32);
        assert_eq!(cfg.rows(), 24);

        let mut odd = Config::default();
        odd.frame_width = 650;
        odd.frame_height = 481;
        assert_eq!(odd.cols(), 33);
        assert_eq!(odd.rows(), 25);

        let hd = Config::preset(Preset::Hd);
        assert_eq!((hd.cols(), hd.rows()), (32, 18));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases: [fn(&mut Config); 15] = [
            |c| c.cell_size = 0,
            |c| c.overlay_step = 0,
            |c| c.threshold = -1.0,
            |c| c.max_presence = 0.0,
            |c| c.grow_rate = f32::NAN,
            |c| c.fade_rate = -3.0,
            |c| c.frame_width = 0,
            |c| c.ticks_per_second = 0.0,
            |c| c.ticks_per_second = 1e-20,
            |c| c.ticks_per_second = f32::INFINITY,
            |c| c.ticks_per_second = 5000.0,
            |c| c.glyph.clear(),
            |c| c.glyph_scale = 0,
            |c| c.glyph_scale = u32::MAX,
            |c| c.status_scale = MAX_TEXT_SCALE + 1,
        ];
        for mutate in cases {
            let mut cfg = Config::default();
            mutate(&mut cfg);
            assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[test]
    fn toml_overrides_layer_on_top_of_preset() {
        let file = Overrides::from_toml_str(
            r##"
            preset = "hd"
            target_color = "#00ff00"
            threshold = 90.5
            glyph = "#"
            scale_mode = "letterbox"
            initial_facing = "back"
            "##,
        )
        .unwrap();
        let cli = Overrides {
            threshold: Some(120.0),
            ..Default::default()
        };
        let cfg = Config::resolve(Some(&file), &cli).unwrap();
        assert_eq!(cfg.frame_width, 1280);
        assert_eq!(cfg.cell_size, 40);
        assert_eq!(cfg.target_color, Rgb::new(0, 255, 0));
        assert_eq!(cfg.threshold, 120.0); // command line wins
        assert_eq!(cfg.glyph, "#");
        assert_eq!(cfg.scale_mode, ScaleMode::Letterbox);
        assert_eq!(cfg.initial_facing, Facing::Back);
    }

    #[test]
    fn cli_preset_beats_file_preset() {
        let file = Overrides {
            preset: Some(Preset::Hd),
            ..Default::default()
        };
        let cli = Overrides {
            preset: Some(Preset::Classic),
            ..Default::default()
        };
        let cfg = Config::resolve(Some(&file), &cli).unwrap();
        assert_eq!(cfg.frame_width, 640);
    }

    #[test]
    fn surface_follows_frame_size_unless_set() {
        let mut cfg = Config::default();
        Overrides {
            frame_width: Some(320),
            frame_height: Some(240),
            ..Default::default()
        }
        .apply(&mut cfg);
        assert_eq!((cfg.surface_width, cfg.surface_height), (320, 240));

        let mut cfg = Config::default();
        Overrides {
            frame_width: Some(320),
            frame_height: Some(240),
            surface_width: Some(800),
            surface_height: Some(600),
            ..Default::default()
        }
        .apply(&mut cfg);
        assert_eq!((cfg.frame_width, cfg.surface_width), (320, 800));
    }

    #[test]
    fn unknown_keys_and_bad_colors_are_rejected() {
        assert!(Overrides::from_toml_str("thresh = 3.0").is_err());
        assert!(Overrides::from_toml_str("target_color = \"red\"").is_err());
    }

    #[test]
    fn resolve_fails_on_invalid_merge() {
        let cli = Overrides {
            cell_size: Some(0),
            ..Default::default()
        };
        assert!(Config::resolve(None, &cli).is_err());
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cell_size = 32\noverlay_step = 16").unwrap();
        let o = Overrides::load(file.path()).unwrap();
        assert_eq!(o.cell_size, Some(32));
        assert_eq!(o.overlay_step, Some(16));

        let missing = file.path().with_extension("does-not-exist");
        assert!(matches!(Overrides::load(&missing), Err(Error::ConfigRead { .. })));
    }

    #[test]
    fn tick_interval_from_rate() {
        let mut cfg = Config::default();
        cfg.ticks_per_second = 4.0;
        assert_eq!(cfg.tick_interval(), Duration::from_millis(250));
    }

    #[test]
    fn tick_rate_limits_keep_the_interval_representable() {
        let cli = Overrides {
            ticks_per_second: Some(1e-20),
            ..Default::default()
        };
        assert!(matches!(Config::resolve(None, &cli), Err(Error::InvalidConfig(_))));

        for rate in [*TICK_RATE_RANGE.start(), *TICK_RATE_RANGE.end()] {
            let cli = Overrides {
                ticks_per_second: Some(rate),
                ..Default::default()
            };
            let cfg = Config::resolve(None, &cli).unwrap();
            assert!(cfg.tick_interval() > Duration::ZERO);
        }
    }
}
