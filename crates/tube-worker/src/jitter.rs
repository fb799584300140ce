use crate::{Result, WorkerError};
use rand::Rng;
use std::time::Duration;

/// Randomized pause taken after every acknowledged job
///
/// Each sample is `unit * n` with `n` drawn uniformly from `min..=max`.
/// The default is 1 to 5 whole seconds, which spreads competing consumers
/// of the same tube apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleJitter {
    min: u32,
    max: u32,
    unit: Duration,
}

impl Default for IdleJitter {
    fn default() -> Self {
        IdleJitter {
            min: 1,
            max: 5,
            unit: Duration::from_secs(1),
        }
    }
}

impl IdleJitter {
    pub fn new(min: u32, max: u32, unit: Duration) -> Result<Self> {
        if min == 0 {
            return Err(WorkerError::Config("idle minimum must be at least 1".to_string()));
        }
        if min > max {
            return Err(WorkerError::Config(format!(
                "idle minimum {} exceeds maximum {}",
                min, max
            )));
        }
        if unit.is_zero() {
            return Err(WorkerError::Config("idle unit must be non-zero".to_string()));
        }
        // Every sample is at most `unit * max`
        if unit.checked_mul(max).is_none() {
            return Err(WorkerError::Config(format!(
                "idle pause of {} x {:?} is too long",
                max, unit
            )));
        }

        Ok(IdleJitter { min, max, unit })
    }

    /// Draw the next pause
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.unit * rng.gen_range(self.min..=self.max)
    }

    /// Shortest and longest possible pause
    pub fn bounds(&self) -> (Duration, Duration) {
        (self.unit * self.min, self.unit * self.max)
    }
}
