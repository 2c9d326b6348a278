//! Bounded retry with an injectable sleep.

use std::fmt::Display;
use std::time::Duration;

use tracing::warn;

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

/// Retries a failing operation up to `max_retries` extra times, waiting
/// `delay` between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy<S = ThreadSleeper> {
    pub max_retries: u32,
    pub delay: Duration,
    sleeper: S,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            sleeper: ThreadSleeper,
        }
    }

    /// A single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(5))
    }
}

impl<S: Sleeper> RetryPolicy<S> {
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> RetryPolicy<T> {
        RetryPolicy {
            max_retries: self.max_retries,
            delay: self.delay,
            sleeper,
        }
    }

    /// Runs `op` until it succeeds or the retries are used up, returning the
    /// last error in that case.
    pub fn run<T, E: Display>(&self, mut op: impl FnMut() -> Result<T, E>) -> Result<T, E> {
        let mut retries = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    warn!(
                        retry = retries,
                        max_retries = self.max_retries,
                        delay_secs = self.delay.as_secs_f64(),
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    self.sleeper.sleep(self.delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSleeper(RefCell<Vec<Duration>>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    #[test]
    fn returns_last_error_after_exhausting_retries() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new(3, Duration::from_secs(5)).with_sleeper(&sleeper);
        let mut attempts = 0;

        let result: Result<(), String> = policy.run(|| {
            attempts += 1;
            Err(format!("failure {attempts}"))
        });

        assert_eq!(result, Err("failure 4".to_string()));
        assert_eq!(attempts, 4);
        assert_eq!(*sleeper.0.borrow(), vec![Duration::from_secs(5); 3]);
    }

    #[test]
    fn stops_at_first_success() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new(5, Duration::from_millis(10)).with_sleeper(&sleeper);
        let mut attempts = 0;

        let result = policy.run(|| {
            attempts += 1;
            if attempts < 3 { Err("flaky") } else { Ok(attempts) }
        });

        assert_eq!(result, Ok(3));
        assert_eq!(sleeper.0.borrow().len(), 2);
    }

    #[test]
    fn no_retries_means_single_attempt() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::none().with_sleeper(&sleeper);
        let mut attempts = 0;

        let result: Result<(), &str> = policy.run(|| {
            attempts += 1;
            Err("down")
        });

        assert!(result.is_err());
        assert_eq!(attempts, 1);
        assert!(sleeper.0.borrow().is_empty());
    }
}
