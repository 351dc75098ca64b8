//! Video source ownership and switching.
//!
//! Acquisition runs on a worker thread per request so the tick loop never
//! blocks on a device. Each request gets an id; the worker opens the source,
//! then keeps overwriting a single latest-frame slot tagged with that id, so a
//! slow tick always picks up the newest frame and never a backlog. Failures
//! travel over a channel, also tagged. Anything tagged with an older id is
//! dropped on arrival, so a superseded request can never race into `Active`.
//!
//! Before opening its device a worker joins the worker it replaced, which
//! means the previous source is always released first.

use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::FrameBuffer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// User-facing camera. Shown mirrored.
    #[default]
    Front,
    Back,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }

    pub fn mirrored(self) -> bool {
        self == Facing::Front
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraState {
    Uninitialized,
    /// A request is in flight; no frame from it yet.
    Requesting,
    Active,
    /// The last request failed. Only an explicit switch or restart leaves this state.
    Error,
}

/// What a worker asks its opener for.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRequest {
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
    /// Refuse sources that cannot deliver exactly `width` x `height`.
    pub exact: bool,
}

/// An open stream. Lives on its worker thread and is dropped there.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<FrameBuffer>;
}

/// Opens sources on behalf of the worker threads.
pub trait SourceOpener: Send + Sync + 'static {
    type Source: FrameSource;

    fn open(&self, request: &SourceRequest) -> Result<Self::Source>;
}

/// Newest frame from the worker, tagged with its request id. Overwritten, never queued.
type LatestFrame = Arc<Mutex<Option<(u64, FrameBuffer)>>>;

struct Failure {
    id: u64,
    error: Error,
}

struct Worker {
    id: u64,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct CameraLifecycle<O: SourceOpener> {
    opener: Arc<O>,
    width: u32,
    height: u32,
    exact: bool,
    allow_switch: bool,
    initial_facing: Facing,

    state: CameraState,
    facing: Facing,    // facing of the source that last became active
    requested: Facing, // facing of the most recent request
    next_id: u64,
    worker: Option<Worker>,
    latest: LatestFrame,
    failures_tx: Sender<Failure>,
    failures_rx: Receiver<Failure>,

    frame: Option<FrameBuffer>,
    last_error: Option<Error>,
}

impl<O: SourceOpener> CameraLifecycle<O> {
    pub fn new(opener: O, config: &Config) -> Self {
        let (failures_tx, failures_rx) = mpsc::channel();
        Self {
            opener: Arc::new(opener),
            width: config.frame_width,
            height: config.frame_height,
            exact: config.exact_resolution,
            allow_switch: config.allow_switch,
            initial_facing: config.initial_facing,
            state: CameraState::Uninitialized,
            facing: config.initial_facing,
            requested: config.initial_facing,
            next_id: 0,
            worker: None,
            latest: Arc::new(Mutex::new(None)),
            failures_tx,
            failures_rx,
            frame: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    /// Facing of the active source (or the initial facing before any source was active).
    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn requested_facing(&self) -> Facing {
        self.requested
    }

    pub fn mirror(&self) -> bool {
        self.facing.mirrored()
    }

    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// The newest frame while `Active`. Nothing is handed out in any other state,
    /// even though the previous frame is still held.
    pub fn active_frame(&self) -> Option<&FrameBuffer> {
        match self.state {
            CameraState::Active => self.frame.as_ref(),
            _ => None,
        }
    }

    /// First acquisition. Ignored once the lifecycle has left `Uninitialized`.
    /// Visual: the window says "waiting" until the first frame arrives.
    pub fn start(&mut self) {
        if self.state != CameraState::Uninitialized {
            debug!(state = ?self.state, "start ignored; camera already started");
            return;
        }
        self.request(self.initial_facing);
    }

    /// Toggle front/back. Supersedes any pending request. Returns false when
    /// switching is disabled.
    /// Visual: the old picture disappears at once; the new one comes up unmirrored for Back.
    pub fn switch(&mut self) -> bool {
        if !self.allow_switch {
            info!("camera switching is disabled");
            return false;
        }
        self.request(self.requested.toggled());
        true
    }

    /// Request the most recently requested facing again (e.g. after an error).
    pub fn restart(&mut self) {
        self.request(self.requested);
    }

    fn request(&mut self, facing: Facing) {
        self.next_id += 1;
        let id = self.next_id;

        let previous = self.worker.take().map(|w| {
            w.cancel.store(true, Ordering::Release);
            debug!(superseded = w.id, by = id, "cancelling previous camera worker");
            w.handle
        });

        let request = SourceRequest {
            facing,
            width: self.width,
            height: self.height,
            exact: self.exact,
        };
        let cancel = Arc::new(AtomicBool::new(false));
        let channels = WorkerChannels {
            latest: Arc::clone(&self.latest),
            failures: self.failures_tx.clone(),
        };
        let opener = Arc::clone(&self.opener);
        let worker_cancel = Arc::clone(&cancel);

        let spawned = thread::Builder::new()
            .name(format!("camera-{id}"))
            .spawn(move || run_worker(id, opener, request, worker_cancel, previous, channels));

        self.requested = facing;
        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { id, cancel, handle });
                self.state = CameraState::Requesting;
                info!(id, ?facing, "requesting video source");
            }
            Err(e) => {
                let err = Error::SourceRequestFailed(format!("spawn camera worker: {e}"));
                error!(id, error = %err, "camera request failed");
                self.last_error = Some(err);
                self.state = CameraState::Error;
            }
        }
    }

    /// Take the newest frame and any failures reported since the last call.
    /// Never blocks for longer than the worker holds the frame slot.
    pub fn poll(&mut self) {
        let current = self.worker.as_ref().map(|w| w.id);

        // Frames first: a worker always publishes its last frame before it reports a failure.
        let newest = self.latest.lock().unwrap_or_else(PoisonError::into_inner).take();
        match newest {
            Some((id, frame)) if Some(id) == current => {
                self.frame = Some(frame);
                if self.state == CameraState::Requesting {
                    self.state = CameraState::Active;
                    self.facing = self.requested;
                    self.last_error = None;
                    info!(facing = ?self.facing, mirror = self.mirror(), "video source active");
                }
            }
            Some((id, _)) => debug!(stale = id, ?current, "discarding stale camera frame"),
            None => {}
        }

        while let Ok(Failure { id, error }) = self.failures_rx.try_recv() {
            if Some(id) != current {
                debug!(stale = id, ?current, "discarding stale camera failure");
                continue;
            }
            warn!(error = %error, facing = ?self.requested, "video source failed");
            self.state = CameraState::Error;
            self.last_error = Some(error);
        }
    }
}

impl<O: SourceOpener> Drop for CameraLifecycle<O> {
    fn drop(&mut self) {
        if let Some(w) = self.worker.take() {
            w.cancel.store(true, Ordering::Release);
            let _ = w.handle.join();
            debug!(id = w.id, "camera worker stopped");
        }
    }
}

/// Where a worker reports back to the lifecycle.
struct WorkerChannels {
    latest: LatestFrame,
    failures: Sender<Failure>,
}

fn run_worker<O: SourceOpener>(
    id: u64,
    opener: Arc<O>,
    request: SourceRequest,
    cancel: Arc<AtomicBool>,
    previous: Option<JoinHandle<()>>,
    channels: WorkerChannels,
) {
    if let Some(prev) = previous {
        let _ = prev.join();
    }
    if cancel.load(Ordering::Acquire) {
        return;
    }

    let mut source = match opener.open(&request) {
        Ok(source) => source,
        Err(error) => {
            let _ = channels.failures.send(Failure { id, error });
            return;
        }
    };
    debug!(id, facing = ?request.facing, "video source opened");

    while !cancel.load(Ordering::Acquire) {
        match source.next_frame() {
            // An unread frame is simply replaced; the tick loop only wants the newest.
            Ok(frame) => {
                *channels.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some((id, frame));
            }
            Err(error) => {
                let _ = channels.failures.send(Failure { id, error });
                break;
            }
        }
    }
    debug!(id, "releasing video source");
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted sources for exercising the lifecycle without a camera.

    use super::*;
    use crate::color::Rgb;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[derive(Clone)]
    pub struct Script {
        pub color: Rgb,
        pub open_delay: Duration,
        pub fail: Option<Error>,
        pub fail_after_frames: Option<usize>,
        /// Deliver frames of this size instead of the requested one.
        pub frame_size: Option<(usize, usize)>,
        /// A rectangle `(x, y, w, h, color)` painted over the solid color.
        pub patch: Option<(usize, usize, usize, usize, Rgb)>,
        /// Write the running frame number into pixel (0,0), see [`frame_number`].
        pub stamp_frames: bool,
    }

    impl Script {
        pub fn solid(color: Rgb) -> Self {
            Self {
                color,
                open_delay: Duration::ZERO,
                fail: None,
                fail_after_frames: None,
                frame_size: None,
                patch: None,
                stamp_frames: false,
            }
        }
    }

    #[derive(Default)]
    pub struct Counters {
        pub live: AtomicUsize,
        pub max_live: AtomicUsize,
        pub opened: AtomicUsize,
        /// Frames produced by all sources so far.
        pub frames: AtomicUsize,
    }

    /// The number a stamping source wrote into this frame.
    pub fn frame_number(frame: &FrameBuffer) -> usize {
        let c = frame.rgb_clamped(0, 0);
        ((c.r as usize) << 16) | ((c.g as usize) << 8) | c.b as usize
    }

    pub struct ScriptedOpener {
        pub scripts: Mutex<HashMap<Facing, Script>>,
        pub counters: Arc<Counters>,
    }

    impl ScriptedOpener {
        pub fn new(front: Script, back: Script) -> Self {
            let scripts = HashMap::from([(Facing::Front, front), (Facing::Back, back)]);
            Self {
                scripts: Mutex::new(scripts),
                counters: Arc::new(Counters::default()),
            }
        }
    }

    pub struct ScriptedSource {
        frame: FrameBuffer,
        remaining: Option<usize>,
        stamp: bool,
        counters: Arc<Counters>,
    }

    impl SourceOpener for ScriptedOpener {
        type Source = ScriptedSource;

        fn open(&self, request: &SourceRequest) -> Result<ScriptedSource> {
            let script = self.scripts.lock().unwrap()[&request.facing].clone();
            thread::sleep(script.open_delay);
            if let Some(err) = script.fail {
                return Err(err);
            }
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_live.fetch_max(live, Ordering::SeqCst);
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let (w, h) = script
                .frame_size
                .unwrap_or((request.width as usize, request.height as usize));
            let mut frame = FrameBuffer::solid(w, h, script.color);
            if let Some((x, y, pw, ph, color)) = script.patch {
                frame.fill_rect(x, y, pw, ph, color);
            }
            Ok(ScriptedSource {
                frame,
                remaining: script.fail_after_frames,
                stamp: script.stamp_frames,
                counters: Arc::clone(&self.counters),
            })
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<FrameBuffer> {
            thread::sleep(Duration::from_millis(2));
            if let Some(n) = &mut self.remaining {
                if *n == 0 {
                    return Err(Error::CameraFrame("device unplugged".into()));
                }
                *n -= 1;
            }
            let n = self.counters.frames.fetch_add(1, Ordering::SeqCst) + 1;
            let mut frame = self.frame.clone();
            if self.stamp {
                frame.set_rgb(0, 0, Rgb::new((n >> 16) as u8, (n >> 8) as u8, n as u8));
            }
            Ok(frame)
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Poll until `done` holds or two seconds pass.
    pub fn poll_until<O: SourceOpener>(
        cam: &mut CameraLifecycle<O>,
        done: impl Fn(&CameraLifecycle<O>) -> bool,
    ) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            cam.poll();
            if done(cam) {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }
}
