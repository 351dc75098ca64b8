// Per-cell "presence": evidence that a cell has recently seen the target color.
// Every tick all cells fade first, then matched cells grow. Both steps clamp,
// so values always stay in [0, max_presence].

use crate::config::Config;

pub struct PresenceGrid {
    cols: usize,
    rows: usize,
    max_presence: f32,
    grow_rate: f32,
    fade_rate: f32,
    cells: Vec<f32>, // row-major: cells[j * cols + i]
}

impl PresenceGrid {
    /// Size the grid from the frame and cell size. The shape never changes afterwards.
    pub fn new(config: &Config) -> Self {
        let cols = config.cols();
        let rows = config.rows();
        Self {
            cols,
            rows,
            max_presence: config.max_presence,
            grow_rate: config.grow_rate,
            fade_rate: config.fade_rate,
            cells: vec![0.0; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> Option<usize> {
        (i < self.cols && j < self.rows).then(|| j * self.cols + i)
    }

    /// presence = max(0, presence - fade_rate), for every cell.
    pub fn decay_all(&mut self) {
        let fade = self.fade_rate;
        for p in &mut self.cells {
            *p = (*p - fade).max(0.0);
        }
    }

    /// presence = min(max_presence, presence + grow_rate). Out of range: no-op.
    pub fn grow(&mut self, i: usize, j: usize) {
        let (grow, max) = (self.grow_rate, self.max_presence);
        if let Some(idx) = self.index(i, j) {
            let p = &mut self.cells[idx];
            *p = (*p + grow).min(max);
        }
    }

    /// Current presence, or 0 outside the grid.
    #[inline]
    pub fn value_at(&self, i: usize, j: usize) -> f32 {
        self.index(i, j).map_or(0.0, |idx| self.cells[idx])
    }

    /// Number of cells with any presence left.
    pub fn lit_cells(&self) -> usize {
        self.cells.iter().filter(|p| **p > 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(grow: f32, fade: f32, max: f32) -> PresenceGrid {
        let mut cfg = Config::default();
        cfg.grow_rate = grow;
        cfg.fade_rate = fade;
        cfg.max_presence = max;
        PresenceGrid::new(&cfg)
    }

    fn matched_tick(g: &mut PresenceGrid, i: usize, j: usize) -> f32 {
        g.decay_all();
        g.grow(i, j);
        g.value_at(i, j)
    }

    #[test]
    fn shape_comes_from_config() {
        let g = grid(60.0, 40.0, 255.0);
        assert_eq!((g.cols(), g.rows()), (32, 24));
        assert_eq!(g.lit_cells(), 0);
    }

    #[test]
    fn decay_then_grow_sequence() {
        let mut g = grid(60.0, 40.0, 255.0);
        let seen: Vec<f32> = (0..4).map(|_| matched_tick(&mut g, 3, 4)).collect();
        assert_eq!(seen, vec![60.0, 80.0, 100.0, 120.0]);
    }

    #[test]
    fn matched_cell_converges_monotonically_and_clamps() {
        let mut g = grid(60.0, 40.0, 255.0);
        // ceil(255 / (60 - 40)) = 13
        let bound = (255.0f32 / 20.0).ceil() as usize;
        let mut prev = 0.0;
        for _ in 0..bound {
            let v = matched_tick(&mut g, 0, 0);
            assert!(v >= prev);
            assert!(v <= 255.0);
            prev = v;
        }
        assert_eq!(prev, 255.0);
        // stays saturated: decay to 215, grow back to 255
        assert_eq!(matched_tick(&mut g, 0, 0), 255.0);
    }

    #[test]
    fn grow_not_above_fade_never_exceeds_grow_rate() {
        for (grow, fade) in [(40.0, 60.0), (50.0, 50.0)] {
            let mut g = grid(grow, fade, 255.0);
            for _ in 0..50 {
                let v = matched_tick(&mut g, 1, 1);
                assert!(v <= grow, "grow={grow} fade={fade} v={v}");
            }
            assert_eq!(g.value_at(1, 1), grow);
        }
    }

    #[test]
    fn unmatched_cell_reaches_zero_and_stays() {
        let mut g = grid(100.0, 40.0, 255.0);
        g.grow(5, 5);
        g.grow(5, 5);
        let initial = g.value_at(5, 5);
        assert_eq!(initial, 200.0);
        let bound = (initial / 40.0).ceil() as usize;
        for _ in 0..bound {
            g.decay_all();
            assert!(g.value_at(5, 5) >= 0.0);
        }
        assert_eq!(g.value_at(5, 5), 0.0);
        for _ in 0..10 {
            g.decay_all();
            assert_eq!(g.value_at(5, 5), 0.0);
        }
    }

    #[test]
    fn out_of_range_is_a_noop() {
        let mut g = grid(60.0, 40.0, 255.0);
        g.grow(32, 0);
        g.grow(0, 24);
        g.grow(usize::MAX, usize::MAX);
        assert_eq!(g.value_at(32, 0), 0.0);
        assert_eq!(g.value_at(usize::MAX, 3), 0.0);
        assert_eq!(g.lit_cells(), 0);
        assert_eq!((g.cols(), g.rows()), (32, 24));
    }

    #[test]
    fn grow_clamps_at_max_presence() {
        let mut g = grid(60.0, 40.0, 100.0);
        for _ in 0..5 {
            g.grow(2, 2);
        }
        assert_eq!(g.value_at(2, 2), 100.0);
    }
}
