// Tick pacing and the once-per-second FPS readout.

use std::thread;
use std::time::{Duration, Instant};

/// Fixed-rate tick schedule. An overrun tick starts the next one right away;
/// missed ticks are dropped, not replayed.
pub struct TickClock {
    interval: Duration,
    next: Instant,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    fn starting_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now + interval,
        }
    }

    /// Time left until the next tick is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Move the deadline forward by one interval, without catching up on a backlog.
    pub fn advance(&mut self, now: Instant) {
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
    }

    /// Sleep until the next tick is due.
    pub fn wait(&mut self) {
        let left = self.remaining(Instant::now());
        if !left.is_zero() {
            thread::sleep(left);
        }
        self.advance(Instant::now());
    }
}

pub struct FpsCounter {
    since: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            since: now,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one frame. Returns the new rate once per second.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.since);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.since = now;
        Some(self.fps)
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn on_time_ticks_keep_a_fixed_cadence() {
        let t0 = Instant::now();
        let mut clock = TickClock::starting_at(100 * MS, t0);
        assert_eq!(clock.remaining(t0), 100 * MS);
        assert_eq!(clock.remaining(t0 + 30 * MS), 70 * MS);

        // woke up slightly late; the schedule does not drift
        clock.advance(t0 + 103 * MS);
        assert_eq!(clock.remaining(t0 + 103 * MS), 97 * MS);
    }

    #[test]
    fn overrun_does_not_replay_missed_ticks() {
        let t0 = Instant::now();
        let mut clock = TickClock::starting_at(100 * MS, t0);
        assert_eq!(clock.remaining(t0 + 350 * MS), Duration::ZERO);
        clock.advance(t0 + 350 * MS);
        assert_eq!(clock.remaining(t0 + 350 * MS), 100 * MS);
    }

    #[test]
    fn fps_reports_once_per_second() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::starting_at(t0);
        for n in 1..10 {
            assert_eq!(fps.tick(t0 + n * 100 * MS), None);
        }
        let rate = fps.tick(t0 + 1000 * MS).unwrap();
        assert!((rate - 10.0).abs() < 1e-3);
        assert_eq!(fps.fps(), rate);
        assert_eq!(fps.tick(t0 + 1100 * MS), None);
    }
}
