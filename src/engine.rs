//! The frame loop's context object.
//!
//! [`Engine`] owns the grid, sampler, camera lifecycle and compositor and runs
//! exactly one pass per [`Engine::tick`]: poll the camera, then either
//! decay -> sample/grow -> composite (camera active) or draw a status screen
//! (anything else). The grid is only touched while a valid frame is in hand.

use tracing::{debug, error};

use crate::compositor::{Compositor, View};
use crate::config::Config;
use crate::grid::PresenceGrid;
use crate::lifecycle::{CameraLifecycle, CameraState, SourceOpener};
use crate::sampler::ColorSampler;
use crate::types::Surface;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Full pass; `matched` cells grew this tick.
    Rendered { matched: usize },
    /// No usable source yet; a waiting message was drawn.
    Waiting,
    /// The source failed; an error message was drawn.
    Failed,
    /// The frame was malformed; nothing was updated or drawn.
    Aborted,
}

pub struct Engine<O: SourceOpener> {
    config: Config,
    grid: PresenceGrid,
    sampler: ColorSampler,
    camera: CameraLifecycle<O>,
    compositor: Compositor,
    ticks: u64,
    last_matched: usize,
}

impl<O: SourceOpener> Engine<O> {
    pub fn new(config: Config, opener: O) -> Self {
        let compositor = Compositor::new(&config);
        Self::with_compositor(config, opener, compositor)
    }

    pub fn with_compositor(config: Config, opener: O, compositor: Compositor) -> Self {
        Self {
            grid: PresenceGrid::new(&config),
            sampler: ColorSampler::new(&config),
            camera: CameraLifecycle::new(opener, &config),
            compositor,
            config,
            ticks: 0,
            last_matched: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grid(&self) -> &PresenceGrid {
        &self.grid
    }

    pub fn camera(&self) -> &CameraLifecycle<O> {
        &self.camera
    }

    pub fn start(&mut self) {
        self.camera.start();
    }

    pub fn switch_camera(&mut self) {
        self.camera.switch();
    }

    pub fn restart_camera(&mut self) {
        self.camera.restart();
    }

    pub fn tick(&mut self, surface: &mut Surface) -> TickOutcome {
        self.ticks += 1;
        self.camera.poll();

        match self.camera.state() {
            CameraState::Active => {}
            CameraState::Uninitialized | CameraState::Requesting => {
                // Visual: yellow "waiting" text; glyphs neither grow nor fade meanwhile.
                self.compositor.render(surface, View::Waiting, &self.grid);
                return TickOutcome::Waiting;
            }
            CameraState::Error => {
                // Visual: red error text with the reason, until the user switches or retries.
                let reason = self
                    .camera
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                self.compositor.render(surface, View::Failed(&reason), &self.grid);
                return TickOutcome::Failed;
            }
        }

        let Some(frame) = self.camera.active_frame() else {
            self.compositor.render(surface, View::Waiting, &self.grid);
            return TickOutcome::Waiting;
        };
        let (fw, fh) = (self.config.frame_width as usize, self.config.frame_height as usize);
        if let Err(e) = frame.ensure_size(fw, fh) {
            error!(tick = self.ticks, error = %e, "aborting tick");
            return TickOutcome::Aborted;
        }

        // Visual: glyphs that are not fed this tick get fainter, fed ones get stronger.
        self.grid.decay_all();
        let matched = match self.sampler.sample(frame, &mut self.grid) {
            Ok(n) => n,
            Err(e) => {
                error!(tick = self.ticks, error = %e, "aborting tick");
                return TickOutcome::Aborted;
            }
        };
        let mirror = self.camera.mirror();
        self.compositor
            .render(surface, View::Live { frame, mirror }, &self.grid);

        self.last_matched = matched;
        debug!(tick = self.ticks, matched, lit = self.grid.lit_cells(), "tick");
        TickOutcome::Rendered { matched }
    }

    /// One-line status for the corner of the screen.
    pub fn hud_text(&self, fps: f32) -> String {
        let state = match self.camera.state() {
            CameraState::Uninitialized => "IDLE",
            CameraState::Requesting => "WAITING",
            CameraState::Active => "LIVE",
            CameraState::Error => "ERROR",
        };
        format!(
            "{state} | {:?} | CELLS {}/{} | FPS {fps:.1}",
            self.camera.facing(),
            self.last_matched,
            self.grid.cols() * self.grid.rows()
        )
    }

    pub fn draw_hud(&self, surface: &mut Surface, fps: f32) {
        self.compositor.draw_hud(surface, &self.hud_text(fps));
    }
}
