// Command-line flags. Everything except --config and --list-cameras is an
// override on top of the preset and the config file.

use clap::Parser;
use std::path::PathBuf;

use crate::color::Rgb;
use crate::config::{Overrides, Preset, ScaleMode};
use crate::lifecycle::Facing;

/// Live camera mirror that marks where a target color has been seen.
///
/// Keys: Space/S switch camera, R retry, Esc quit.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// TOML file with any subset of the settings below
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the attached cameras and exit
    #[arg(long)]
    pub list_cameras: bool,

    /// Base parameter set
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Color to track, as #rrggbb
    #[arg(long)]
    pub target_color: Option<Rgb>,

    /// Maximum RGB distance that counts as a match
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Sampling cell size in frame pixels
    #[arg(long)]
    pub cell_size: Option<u32>,

    /// Spacing between overlay glyphs in frame pixels
    #[arg(long)]
    pub overlay_step: Option<u32>,

    #[arg(long)]
    pub max_presence: Option<f32>,

    /// Presence added per matched tick
    #[arg(long)]
    pub grow_rate: Option<f32>,

    /// Presence removed from every cell per tick
    #[arg(long)]
    pub fade_rate: Option<f32>,

    /// Requested frame width
    #[arg(long)]
    pub width: Option<u32>,

    /// Requested frame height
    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long)]
    pub ticks_per_second: Option<f32>,

    /// Overlay text
    #[arg(long)]
    pub glyph: Option<String>,

    #[arg(long)]
    pub glyph_scale: Option<u32>,

    /// Window width (defaults to the frame width)
    #[arg(long)]
    pub surface_width: Option<u32>,

    /// Window height (defaults to the frame height)
    #[arg(long)]
    pub surface_height: Option<u32>,

    #[arg(long, value_enum)]
    pub scale_mode: Option<ScaleMode>,

    /// Camera to start with
    #[arg(long, value_enum)]
    pub facing: Option<Facing>,

    /// Device index used as the front camera
    #[arg(long)]
    pub front_camera: Option<u32>,

    /// Device index used as the back camera
    #[arg(long)]
    pub back_camera: Option<u32>,

    /// Disable camera switching
    #[arg(long)]
    pub no_switch: bool,

    /// Accept any camera resolution and resize frames
    #[arg(long)]
    pub allow_resize: bool,

    /// Hide the status line
    #[arg(long)]
    pub no_hud: bool,
}

impl Args {
    /// The command-line layer of the config. Unset flags stay `None`.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            preset: self.preset,
            target_color: self.target_color,
            threshold: self.threshold,
            cell_size: self.cell_size,
            overlay_step: self.overlay_step,
            max_presence: self.max_presence,
            grow_rate: self.grow_rate,
            fade_rate: self.fade_rate,
            frame_width: self.width,
            frame_height: self.height,
            ticks_per_second: self.ticks_per_second,
            glyph: self.glyph.clone(),
            glyph_scale: self.glyph_scale,
            status_scale: None,
            surface_width: self.surface_width,
            surface_height: self.surface_height,
            scale_mode: self.scale_mode,
            initial_facing: self.facing,
            front_camera: self.front_camera,
            back_camera: self.back_camera,
            allow_switch: self.no_switch.then_some(false),
            exact_resolution: self.allow_resize.then_some(false),
            show_hud: self.no_hud.then_some(false),
        }
    }
}
