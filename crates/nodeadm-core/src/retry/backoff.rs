//! Exponential backoff with symmetric jitter.

use std::time::Duration;

use rand::Rng;

/// Delay policy between retry attempts.
///
/// `steps == 0` means "no step limit": the loop is bounded only by its
/// timeout, the caller's context, or an error handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the second attempt.
    pub duration: Duration,
    /// Multiplier applied to the delay after every step.
    pub factor: f64,
    /// Fraction of each delay to randomly add or subtract.
    pub jitter: f64,
    /// Maximum number of attempts (0 = unlimited).
    pub steps: usize,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(1),
            factor: 1.0,
            jitter: 0.0,
            steps: 0,
        }
    }
}

impl Backoff {
    pub fn exponential(duration: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            duration,
            factor,
            jitter,
            steps: 0,
        }
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Attempt limit with the zero sentinel normalized to "unbounded".
    pub fn max_steps(&self) -> usize {
        if self.steps == 0 {
            usize::MAX
        } else {
            self.steps
        }
    }

    /// Next delay to wait, then advance the base delay by `factor`.
    pub fn step(&mut self) -> Duration {
        let current = self.duration;
        if self.factor > 0.0 {
            self.duration = Duration::try_from_secs_f64(current.as_secs_f64() * self.factor)
                .unwrap_or(Duration::MAX);
        }
        jittered(current, self.jitter)
    }
}

fn jittered(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 || delay.is_zero() {
        return delay;
    }
    let offset = rand::thread_rng().gen_range(-jitter..=jitter);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + offset).max(0.0)).unwrap_or(delay)
}
