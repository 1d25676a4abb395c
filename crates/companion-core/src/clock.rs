//! Simulation clock.
//!
//! The clock is the single source of truth for simulation time. It counts
//! ticks with checked arithmetic and derives the elapsed simulation time
//! from the tick counter and the fixed tick length; time is never stored
//! independently.

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration (e.g. a zero tick length).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Fixed-step simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    /// Ticks completed so far.
    tick: u64,

    /// Length of one tick in milliseconds.
    tick_ms: u64,
}

impl SimClock {
    /// Create a clock at tick 0 with a tick length of `tick_ms`
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `tick_ms` is 0.
    pub fn new(tick_ms: u64) -> Result<Self, ClockError> {
        Self::from_parts(0, tick_ms)
    }

    /// Create a clock from explicit parameters (useful for testing and
    /// state restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `tick_ms` is 0.
    pub fn from_parts(tick: u64, tick_ms: u64) -> Result<Self, ClockError> {
        if tick_ms == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "tick length must be at least 1 ms".to_owned(),
            });
        }
        Ok(Self { tick, tick_ms })
    }

    /// Advance by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Tick length in milliseconds.
    pub const fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    /// Tick length in seconds.
    pub const fn dt(&self) -> f32 {
        self.tick_ms as f32 / 1000.0
    }

    /// Simulation seconds elapsed at the current tick.
    pub const fn now(&self) -> f64 {
        self.tick as f64 * self.tick_ms as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_length_is_rejected() {
        assert!(matches!(SimClock::new(0), Err(ClockError::InvalidConfig { .. })));
    }

    #[test]
    fn advance_derives_time() {
        let mut clock = SimClock::new(100).unwrap_or_else(|_| SimClock { tick: 0, tick_ms: 100 });
        for _ in 0..25 {
            assert!(clock.advance().is_ok());
        }
        assert_eq!(clock.tick(), 25);
        assert!((clock.now() - 2.5).abs() < 1e-9);
        assert!((clock.dt() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut clock = SimClock { tick: u64::MAX, tick_ms: 100 };
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
    }
}
