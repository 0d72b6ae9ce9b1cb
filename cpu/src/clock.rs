//! Simulation of elapsed time in the simulated system.

use std::time::Duration;

use conv::*;

/// Clock is a simulated system clock.  Its run rate may be real-time
/// (i.e. one simulated second per actual wall-clock second) or it may
/// run faster or slower than real-time.
///
/// The clock keeps track of how much simulated time has been
/// "consumed" by the instructions executed so far.
pub trait Clock {
    /// Retrieves the current (simulated) time.
    fn now(&self) -> Duration;

    /// The caller calls `consume` to simulate the passing of a
    /// duration `interval`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use cpu::Clock;
    ///
    /// fn g<C: Clock>(clk: &mut C) {
    ///   // We just performed an action which would have taken
    ///   // one millisecond on the simulated machine.
    ///   clk.consume(&Duration::from_millis(1));
    /// }
    /// ```
    fn consume(&mut self, interval: &Duration);
}

/// BasicClock provides a simulated clock driven by a fixed
/// oscillator frequency.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use cpu::{BasicClock, Clock};
/// let mut clk = BasicClock::new(4_770_000);
/// clk.consume_cycles(3);
/// assert!(clk.now() > Duration::ZERO);
/// ```
#[derive(Debug)]
pub struct BasicClock {
    /// Oscillator frequency in Hz.
    frequency: u64,
    cycles: u64,
    /// Elapsed time as measured by the simulated clock.
    simulator_elapsed: Duration,
}

impl BasicClock {
    pub fn new(frequency: u64) -> BasicClock {
        BasicClock {
            frequency: frequency.max(1),
            cycles: 0,
            simulator_elapsed: Duration::new(0, 0),
        }
    }

    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[must_use]
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    /// The simulated duration of `cycles` clock cycles.
    #[must_use]
    pub fn cycles_to_duration(&self, cycles: u64) -> Duration {
        let cycles = f64::value_from(cycles).unwrap_or(f64::MAX);
        let hz = f64::value_from(self.frequency).unwrap_or(f64::MAX);
        Duration::from_secs_f64(cycles / hz)
    }

    pub fn consume_cycles(&mut self, cycles: u32) {
        let cycles = u64::from(cycles);
        self.cycles += cycles;
        let interval = self.cycles_to_duration(cycles);
        self.consume(&interval);
    }
}

impl Clock for BasicClock {
    fn now(&self) -> Duration {
        self.simulator_elapsed
    }

    fn consume(&mut self, interval: &Duration) {
        self.simulator_elapsed += *interval;
    }
}

#[test]
fn test_cycles_to_duration() {
    let clk = BasicClock::new(1_000_000);
    assert_eq!(clk.cycles_to_duration(1_000_000), Duration::from_secs(1));
    assert_eq!(clk.cycles_to_duration(0), Duration::ZERO);
}

#[test]
fn test_consume_cycles_accumulates() {
    let mut clk = BasicClock::new(1_000);
    clk.consume_cycles(500);
    clk.consume_cycles(500);
    assert_eq!(clk.cycles(), 1000);
    assert_eq!(clk.now(), Duration::from_secs(1));
}
