//! Fixed-timestep game clock using an accumulator pattern.
//!
//! `draw_web()` calls at ~60fps with variable delta. GameTime converts
//! this into a fixed number of discrete ticks per second, so the
//! simulation advances in equal steps and stays testable.
//!
//! Wall-clock access goes through the [`Clock`] trait so tests can drive
//! time by hand instead of sleeping.

use std::cell::Cell;

/// Source of wall-clock milliseconds (epoch based in the browser).
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Browser clock backed by `Date.now()`.
pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

/// Hand-driven clock for tests and offline simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

pub struct GameTime {
    /// Milliseconds per tick (e.g. 16.67ms = 60 ticks/sec)
    ms_per_tick: f64,
    /// Largest frame delta fed into the accumulator
    max_delta_ms: f64,
    /// Accumulated milliseconds not yet consumed as ticks
    accumulator: f64,
    /// Total elapsed ticks since creation
    pub total_ticks: u64,
    /// Timestamp of the last update (ms), None if first frame
    last_timestamp: Option<f64>,
    /// Raw (unclamped) gap between the last two frames
    pub last_gap_ms: f64,
}

impl GameTime {
    /// Create a new GameTime with the given tick rate.
    /// `ticks_per_sec`: how many game ticks per real-time second (e.g. 60).
    pub fn new(ticks_per_sec: u32) -> Self {
        Self {
            ms_per_tick: 1000.0 / ticks_per_sec.max(1) as f64,
            max_delta_ms: 500.0,
            accumulator: 0.0,
            total_ticks: 0,
            last_timestamp: None,
            last_gap_ms: 0.0,
        }
    }

    pub fn ms_per_tick(&self) -> f64 {
        self.ms_per_tick
    }

    /// Feed wall-clock timestamp (from `Date.now()` or similar).
    /// Returns the number of discrete ticks to process this frame.
    pub fn update(&mut self, now_ms: f64) -> u32 {
        let delta = match self.last_timestamp {
            Some(prev) => {
                let d = now_ms - prev;
                self.last_gap_ms = d.max(0.0);
                // Clamp to avoid spiral-of-death if tab was backgrounded
                d.clamp(0.0, self.max_delta_ms)
            }
            None => {
                self.last_gap_ms = 0.0;
                0.0 // First frame: no delta
            }
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += delta;
        let ticks = (self.accumulator / self.ms_per_tick) as u32;
        self.accumulator -= ticks as f64 * self.ms_per_tick;
        self.total_ticks += ticks as u64;
        ticks
    }
}

/// Detects a frame driver that stopped ticking (backgrounded tab) and
/// converts the missed wall time into a one-time idle reward window.
#[derive(Debug, Clone)]
pub struct Watchdog {
    stall_threshold_ms: f64,
    max_idle_ms: f64,
    /// Number of stalls detected since creation.
    pub stalls: u32,
}

impl Watchdog {
    pub fn new(stall_threshold_ms: f64, max_idle_hours: f64) -> Self {
        Self {
            stall_threshold_ms,
            max_idle_ms: max_idle_hours * 3_600_000.0,
            stalls: 0,
        }
    }

    /// Inspect the gap before the current frame. Returns the capped idle
    /// duration to reward, or `None` when the driver kept ticking.
    pub fn check_gap(&mut self, gap_ms: f64) -> Option<f64> {
        if !gap_ms.is_finite() || gap_ms <= self.stall_threshold_ms {
            return None;
        }
        self.stalls += 1;
        Some(gap_ms.min(self.max_idle_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_returns_zero_ticks() {
        let mut gt = GameTime::new(10);
        assert_eq!(gt.update(0.0), 0);
    }

    #[test]
    fn one_tick_at_100ms() {
        let mut gt = GameTime::new(10); // 100ms per tick
        gt.update(0.0);
        assert_eq!(gt.update(100.0), 1);
        assert_eq!(gt.total_ticks, 1);
    }

    #[test]
    fn multiple_ticks_accumulated() {
        let mut gt = GameTime::new(10);
        gt.update(0.0);
        assert_eq!(gt.update(350.0), 3); // 350ms = 3 ticks + 50ms remainder
        assert_eq!(gt.total_ticks, 3);
    }

    #[test]
    fn remainder_carried_over() {
        let mut gt = GameTime::new(10);
        gt.update(0.0);
        gt.update(150.0); // 1 tick, 50ms remainder
        assert_eq!(gt.update(200.0), 1); // 50ms delta + 50ms carried
        assert_eq!(gt.total_ticks, 2);
    }

    #[test]
    fn clamp_large_delta_but_report_raw_gap() {
        let mut gt = GameTime::new(10);
        gt.update(0.0);
        // 10 second gap (tab backgrounded) → clamped to 500ms = 5 ticks
        assert_eq!(gt.update(10_000.0), 5);
        assert!((gt.last_gap_ms - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn steady_60fps() {
        let mut gt = GameTime::new(60);
        gt.update(0.0);
        let mut total = 0u32;
        for i in 1..=60 {
            total += gt.update(i as f64 * 16.667);
        }
        assert!((59..=61).contains(&total), "expected ~60 ticks, got {}", total);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000.0);
        clock.advance(250.0);
        assert!((clock.now_ms() - 1_250.0).abs() < 1e-9);
        clock.set(10.0);
        assert!((clock.now_ms() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn watchdog_ignores_normal_frames() {
        let mut wd = Watchdog::new(2_000.0, 8.0);
        assert_eq!(wd.check_gap(16.0), None);
        assert_eq!(wd.stalls, 0);
    }

    #[test]
    fn watchdog_caps_idle_window() {
        let mut wd = Watchdog::new(2_000.0, 8.0);
        let day = 24.0 * 3_600_000.0;
        assert_eq!(wd.check_gap(day), Some(8.0 * 3_600_000.0));
        assert_eq!(wd.check_gap(5_000.0), Some(5_000.0));
        assert_eq!(wd.stalls, 2);
    }
}
