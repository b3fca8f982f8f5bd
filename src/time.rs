//! Tick timing.
//!
//! [`TickClock`] turns wall-clock frames into the `delta_time` each flock
//! tick consumes.
//!
//! # Example
//!
//! ```ignore
//! use shoal::time::TickClock;
//!
//! let mut clock = TickClock::new().with_max_delta(0.1);
//!
//! // In your game loop:
//! let dt = clock.advance();
//! controller.tick(dt)?;
//! ```

use std::time::{Duration, Instant};

/// Longest step a single tick may take by default, in seconds.
///
/// A stalled frame (debugger, window drag) would otherwise throw every agent
/// straight through the bounds.
pub const DEFAULT_MAX_DELTA: f32 = 0.1;

/// Delta-time source for the tick loop.
#[derive(Debug)]
pub struct TickClock {
    /// When the last tick occurred.
    last_tick: Instant,
    /// Seconds handed out by the last `advance`.
    delta_secs: f32,
    /// Simulated seconds since creation, after scaling and clamping.
    simulated_secs: f64,
    /// Ticks since creation.
    tick_count: u64,
    paused: bool,
    /// Fixed delta time for deterministic updates (optional).
    fixed_delta: Option<f32>,
    /// Time scale multiplier (1.0 = normal speed).
    time_scale: f32,
    max_delta: f32,
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta_secs: 0.0,
            simulated_secs: 0.0,
            tick_count: 0,
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }

    /// Always hand out `dt`, regardless of wall time.
    pub fn with_fixed_delta(mut self, dt: f32) -> Self {
        self.fixed_delta = Some(dt.max(0.0));
        self
    }

    pub fn with_max_delta(mut self, max: f32) -> Self {
        self.max_delta = max.max(0.0);
        self
    }

    /// Measure the time since the previous call and return the delta for
    /// this tick. Returns 0 while paused.
    pub fn advance(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        if self.paused {
            self.delta_secs = 0.0;
            return 0.0;
        }

        let dt = self.fixed_delta.unwrap_or(raw) * self.time_scale;
        self.delta_secs = dt.min(self.max_delta);
        self.simulated_secs += self.delta_secs as f64;
        self.tick_count += 1;
        self.delta_secs
    }

    /// Delta returned by the last `advance`.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn delta_duration(&self) -> Duration {
        Duration::from_secs_f32(self.delta_secs)
    }

    /// Total simulated seconds.
    #[inline]
    pub fn simulated(&self) -> f64 {
        self.simulated_secs
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.tick_count
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.last_tick = Instant::now();
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Pass `None` to go back to real frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta.map(|d| d.max(0.0));
    }

    /// Set time scale multiplier.
    ///
    /// - `1.0` = normal speed
    /// - `0.5` = half speed (slow motion)
    /// - `2.0` = double speed
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = TickClock::new();
        assert_eq!(clock.ticks(), 0);
        assert!(!clock.is_paused());
        assert_eq!(clock.time_scale(), 1.0);
    }

    #[test]
    fn test_advance_measures_time() {
        let mut clock = TickClock::new();
        thread::sleep(Duration::from_millis(10));
        let dt = clock.advance();
        assert!(dt > 0.0);
        assert_eq!(clock.ticks(), 1);
    }

    #[test]
    fn test_pause_gives_zero_delta() {
        let mut clock = TickClock::new().with_fixed_delta(0.02);
        clock.advance();
        clock.pause();
        let simulated = clock.simulated();
        assert_eq!(clock.advance(), 0.0);
        assert_eq!(clock.simulated(), simulated);
        assert_eq!(clock.ticks(), 1);
    }

    #[test]
    fn test_fixed_delta() {
        let mut clock = TickClock::new().with_fixed_delta(1.0 / 60.0);
        thread::sleep(Duration::from_millis(20));
        assert!((clock.advance() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_max_delta_clamps_stalls() {
        let mut clock = TickClock::new().with_fixed_delta(5.0).with_max_delta(0.05);
        assert_eq!(clock.advance(), 0.05);
    }

    #[test]
    fn test_time_scale() {
        let mut clock = TickClock::new().with_fixed_delta(0.01);
        clock.set_time_scale(2.0);
        assert!((clock.advance() - 0.02).abs() < 1e-6);

        // Negative scale should clamp to 0
        clock.set_time_scale(-1.0);
        assert_eq!(clock.time_scale(), 0.0);
        assert_eq!(clock.advance(), 0.0);
    }
}
