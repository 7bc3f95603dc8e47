//! Fixed-timestep clock for driving a flock from a frame loop.
//!
//! Frame times vary; flocking results depend on `dt`. [`SimClock`] turns
//! variable frame deltas into a whole number of fixed ticks, carrying the
//! remainder over to the next frame.
//!
//! # Example
//!
//! ```
//! use octoflock::time::SimClock;
//!
//! let mut clock = SimClock::new(1.0 / 60.0);
//!
//! // A 50 ms frame covers three 60 Hz ticks.
//! assert_eq!(clock.advance(0.05), 3);
//! assert!(clock.alpha() < 1.0);
//! ```

use std::time::Instant;

/// Default cap on ticks per frame.
pub const DEFAULT_MAX_SUBSTEPS: u32 = 8;

/// Accumulates frame time and hands out fixed ticks.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Length of one tick in seconds.
    fixed_delta: f32,
    /// Scaled frame time not yet consumed by a tick.
    accumulator: f32,
    /// Time scale multiplier (1.0 = normal speed).
    time_scale: f32,
    /// Upper bound on ticks handed out by one `advance` call.
    max_substeps: u32,
    paused: bool,
    /// Simulated seconds covered by all ticks so far.
    elapsed: f64,
    /// Wall-clock instant of the last `advance_real` call.
    last_frame: Option<Instant>,
}

impl SimClock {
    /// Create a clock ticking every `fixed_delta` seconds.
    ///
    /// Non-positive or non-finite deltas fall back to 60 Hz.
    pub fn new(fixed_delta: f32) -> Self {
        Self {
            fixed_delta: sanitize_delta(fixed_delta),
            accumulator: 0.0,
            time_scale: 1.0,
            max_substeps: DEFAULT_MAX_SUBSTEPS,
            paused: false,
            elapsed: 0.0,
            last_frame: None,
        }
    }

    /// Feed one frame's duration and return how many fixed ticks to run.
    ///
    /// When the backlog exceeds `max_substeps` ticks the excess is dropped,
    /// so a long stall slows the simulation down instead of freezing the
    /// caller in a catch-up spiral.
    pub fn advance(&mut self, frame_delta: f32) -> u32 {
        if self.paused || !frame_delta.is_finite() {
            return 0;
        }
        self.accumulator += frame_delta.max(0.0) * self.time_scale;

        // Frames that are whole multiples of the tick must not lose one to rounding
        let slack = self.fixed_delta * 1e-4;
        let mut ticks = 0;
        while self.accumulator + slack >= self.fixed_delta && ticks < self.max_substeps {
            self.accumulator -= self.fixed_delta;
            ticks += 1;
        }
        if self.accumulator + slack >= self.fixed_delta {
            self.accumulator %= self.fixed_delta;
        }
        self.accumulator = self.accumulator.max(0.0);

        self.elapsed += f64::from(ticks) * f64::from(self.fixed_delta);
        ticks
    }

    /// Like [`advance`](Self::advance), measuring the frame with the wall clock.
    ///
    /// The first call only starts the measurement and returns 0.
    pub fn advance_real(&mut self) -> u32 {
        let now = Instant::now();
        let frame_delta = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        self.advance(frame_delta)
    }

    /// Length of one tick in seconds.
    #[inline]
    pub fn fixed_delta(&self) -> f32 {
        self.fixed_delta
    }

    pub fn set_fixed_delta(&mut self, delta: f32) {
        self.fixed_delta = sanitize_delta(delta);
    }

    /// How far the accumulator is into the next tick (0.0 to 1.0).
    ///
    /// Renderers can use this to interpolate between the last two states.
    #[inline]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.fixed_delta).clamp(0.0, 1.0)
    }

    /// Simulated seconds covered by ticks so far.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set time scale multiplier.
    ///
    /// - `1.0` = normal speed
    /// - `0.5` = half speed (slow motion)
    /// - `2.0` = double speed
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    }

    #[inline]
    pub fn max_substeps(&self) -> u32 {
        self.max_substeps
    }

    pub fn set_max_substeps(&mut self, max: u32) {
        self.max_substeps = max.max(1);
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stop handing out ticks. Frame time fed while paused is discarded.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // Don't count the paused interval as one huge frame
            self.last_frame = None;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Drop any accumulated time and restart the elapsed counter.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.elapsed = 0.0;
        self.last_frame = None;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

fn sanitize_delta(delta: f32) -> f32 {
    if delta.is_finite() && delta > 0.0 {
        delta
    } else {
        1.0 / 60.0
    }
}
