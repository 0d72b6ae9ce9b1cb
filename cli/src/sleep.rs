use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::{event, Level};

/// Sleep debt.  It goes negative when a sleep overruns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignedDuration {
    negative: bool,
    magnitude: Duration,
}

impl SignedDuration {
    const ZERO: SignedDuration = SignedDuration {
        negative: false,
        magnitude: Duration::ZERO,
    };

    fn positive(magnitude: Duration) -> SignedDuration {
        SignedDuration {
            negative: false,
            magnitude,
        }
    }

    fn negative(magnitude: Duration) -> SignedDuration {
        SignedDuration {
            negative: magnitude != Duration::ZERO,
            magnitude,
        }
    }

    fn add(self, d: Duration) -> SignedDuration {
        if !self.negative {
            SignedDuration::positive(self.magnitude.saturating_add(d))
        } else if d >= self.magnitude {
            SignedDuration::positive(d - self.magnitude)
        } else {
            SignedDuration::negative(self.magnitude - d)
        }
    }

    fn sub(self, d: Duration) -> SignedDuration {
        if self.negative {
            SignedDuration::negative(self.magnitude.saturating_add(d))
        } else if self.magnitude >= d {
            SignedDuration::positive(self.magnitude - d)
        } else {
            SignedDuration::negative(d - self.magnitude)
        }
    }
}

/// MinimalSleeper provides a facility for periodically sleeping such
/// that on average we sleep for the requested amount of time, even
/// though we don't necessarily sleep on every call.  Each emulated
/// instruction takes well under a microsecond, so sleeping after
/// every one would be dominated by system call overhead.
#[derive(Debug)]
pub struct MinimalSleeper {
    /// Minimum period for which we will try to sleep.
    min_sleep: Duration,
    owed: SignedDuration,
    total_slept: Duration,
}

impl MinimalSleeper {
    pub fn new(min_sleep: Duration) -> MinimalSleeper {
        MinimalSleeper {
            min_sleep,
            owed: SignedDuration::ZERO,
            total_slept: Duration::ZERO,
        }
    }

    fn really_sleep(&mut self, amount: Duration) {
        let then = Instant::now();
        sleep(amount);
        let slept_for = then.elapsed();
        self.total_slept = self.total_slept.saturating_add(slept_for);
        self.owed = self.owed.sub(slept_for);
        event!(
            Level::TRACE,
            "asked to sleep for {amount:?}, slept for {slept_for:?}; debt is now {:?}",
            self.owed
        );
    }

    /// Adds `duration` to the sleep debt, sleeping if the debt has
    /// grown past the minimum.
    pub fn sleep(&mut self, duration: Duration) {
        self.owed = self.owed.add(duration);
        match self.owed {
            SignedDuration {
                negative: false,
                magnitude,
            } if magnitude > self.min_sleep => self.really_sleep(magnitude),
            _ => (),
        }
    }

    pub fn total_slept(&self) -> Duration {
        self.total_slept
    }
}

impl Drop for MinimalSleeper {
    fn drop(&mut self) {
        event!(
            Level::DEBUG,
            "total time spent pacing execution: {:?}",
            self.total_slept
        );
    }
}

/// Sleeps as needed so that `simulated` time passes no faster than
/// `multiplier` times real time.  A multiplier of `None` means run
/// as fast as possible.
pub fn pace(sleeper: &mut MinimalSleeper, simulated: Duration, multiplier: Option<f64>) {
    if let Some(m) = multiplier {
        if m > 0.0 {
            sleeper.sleep(simulated.div_f64(m));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_duration_arithmetic() {
        let ms = Duration::from_millis;
        let d = SignedDuration::ZERO.add(ms(3));
        assert_eq!(d, SignedDuration::positive(ms(3)));
        let d = d.sub(ms(5));
        assert_eq!(d, SignedDuration::negative(ms(2)));
        let d = d.add(ms(2));
        assert_eq!(d, SignedDuration::ZERO);
        let d = d.sub(ms(1)).sub(ms(1));
        assert_eq!(d, SignedDuration::negative(ms(2)));
    }

    #[test]
    fn test_small_debts_do_not_sleep() {
        let mut sleeper = MinimalSleeper::new(Duration::from_secs(3600));
        for _ in 0..1000 {
            sleeper.sleep(Duration::from_micros(1));
        }
        assert_eq!(sleeper.total_slept(), Duration::ZERO);
        assert_eq!(sleeper.owed, SignedDuration::positive(Duration::from_millis(1)));
    }

    #[test]
    fn test_debt_is_paid_off() {
        let mut sleeper = MinimalSleeper::new(Duration::from_micros(100));
        sleeper.sleep(Duration::from_millis(1));
        assert!(sleeper.total_slept() >= Duration::from_millis(1));
        // Oversleeping leaves a credit, never a debt.
        assert!(sleeper.owed.negative || sleeper.owed.magnitude == Duration::ZERO);
    }

    #[test]
    fn test_pace_without_multiplier_never_sleeps() {
        let mut sleeper = MinimalSleeper::new(Duration::ZERO);
        pace(&mut sleeper, Duration::from_secs(10), None);
        assert_eq!(sleeper.total_slept(), Duration::ZERO);
    }
}
