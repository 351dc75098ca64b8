// Presence mirror: a live, grayscale camera view where every spot that has
// recently shown the target color gets covered in tinted glyphs. They build up
// while the color stays in view and fade out once it leaves.
//
// Keys: Space/S switch front/back camera, R retry the camera, Esc quit.

mod camera;
mod cli;
mod clock;
mod color;
mod compositor;
mod config;
mod draw;
mod engine;
mod error;
mod grid;
mod lifecycle;
mod logger;
mod sampler;
mod types;

use anyhow::Context;
use clap::Parser;
use std::time::Instant;
use tracing::{info, warn};

use camera::{DeviceOpener, probe_devices};
use cli::Args;
use clock::{FpsCounter, TickClock};
use config::{Config, Overrides};
use draw::Drawer;
use engine::{Engine, TickOutcome};
use types::Surface;

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    if args.list_cameras {
        for line in probe_devices()? {
            println!("{line}");
        }
        return Ok(());
    }

    let file = match &args.config {
        Some(path) => Some(Overrides::load(path)?),
        None => None,
    };
    let config = Config::resolve(file.as_ref(), &args.overrides()).context("Invalid configuration")?;

    // No device at all is fatal; a device that later fails is not.
    let devices = probe_devices().context("Looking for cameras")?;
    for line in &devices {
        info!(device = %line, "found camera");
    }
    if config.allow_switch && devices.len() < 2 {
        warn!("only one camera found; switching will fail until another is attached");
    }

    /* --- Window + render surface ---
       Visual: a black window the size of the surface; it shows "waiting" until a camera delivers. */
    let (sw, sh) = (config.surface_width as usize, config.surface_height as usize);
    let mut drawer = Drawer::new("Presence Mirror", sw, sh)?;
    let mut surface = Surface::new(sw, sh);

    let opener = DeviceOpener {
        front_index: config.front_camera,
        back_index: config.back_camera,
    };
    /* --- Engine ---
       Visual: the first camera opens in the background; the loop keeps ticking meanwhile. */
    let mut clock = TickClock::new(config.tick_interval());
    let mut engine = Engine::new(config, opener);
    engine.start();

    let mut fps = FpsCounter::new();

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        // Visual: Space/S flips the view to the other camera (and the mirroring with it).
        if drawer.switch_pressed_once() {
            engine.switch_camera();
            info!(facing = ?engine.camera().requested_facing(), "switch requested");
        }
        if drawer.restart_pressed_once() {
            engine.restart_camera();
            info!(facing = ?engine.camera().requested_facing(), "restart requested");
        }

        // an aborted tick leaves the previous image on the surface
        let outcome = engine.tick(&mut surface);
        if outcome != TickOutcome::Aborted && engine.config().show_hud {
            engine.draw_hud(&mut surface, fps.fps());
        }
        drawer.present(&surface)?; // visual: this is when the on-screen image updates

        if let Some(rate) = fps.tick(Instant::now()) {
            info!(fps = %format!("{rate:.1}"), lit = engine.grid().lit_cells(), "frame rate");
        }
        clock.wait();
    }

    info!("bye");
    Ok(())
}
