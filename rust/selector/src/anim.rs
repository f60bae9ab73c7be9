// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tick-driven value animations.
//!
//! A [`ValueAnimation`] linearly moves a value from `from` to `to` over a
//! fixed duration. It holds no callbacks: the owner advances it once per
//! rendered frame and applies the returned [`AnimationStep`] itself, which
//! keeps the interpolation free of any borrow on the owner's state.

use std::time::Duration;

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Quintic ease-in/ease-out with zero first and second derivatives at both
/// ends.
#[inline]
pub fn smoother_step(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Result of advancing an animation by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStep {
    /// Interpolated value after the tick.
    pub value: f64,
    /// Normalized time in `[0, 1]`.
    pub unit_time: f64,
    /// Set on the tick that reached the end value.
    pub finished: bool,
}

/// Linear fade of a scalar over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueAnimation {
    from: f64,
    to: f64,
    duration: Duration,
    elapsed: Duration,
    running: bool,
}

impl ValueAnimation {
    pub fn new(from: f64, to: f64, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            running: true,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn target(&self) -> f64 {
        self.to
    }

    pub fn unit_time(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn value(&self) -> f64 {
        lerp(self.from, self.to, self.unit_time())
    }

    /// Moves the animation forward by `dt`. A stopped animation stays put.
    pub fn advance(&mut self, dt: Duration) -> AnimationStep {
        if !self.running {
            return self.step(false);
        }

        self.elapsed = (self.elapsed + dt).min(self.duration);
        let finished = self.elapsed >= self.duration;
        if finished {
            self.running = false;
        }
        self.step(finished)
    }

    /// Aborts mid-flight; the last applied value stays as it is.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Jumps to the end value.
    pub fn skip(&mut self) -> AnimationStep {
        self.elapsed = self.duration;
        self.running = false;
        self.step(true)
    }

    fn step(&self, finished: bool) -> AnimationStep {
        AnimationStep {
            value: self.value(),
            unit_time: self.unit_time(),
            finished,
        }
    }
}
