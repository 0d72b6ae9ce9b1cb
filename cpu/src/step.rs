//! Single-step control, shared between the thread running the CPU
//! and a controlling (debugger) thread.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tracing::{event, Level};

use crate::registers::RegisterSnapshot;

/// What the step listener is told about the instruction which is
/// about to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    /// Linear address of the instruction.
    pub address: u32,
    pub length: usize,
    pub disassembly: String,
    /// Register state after decoding, before the instruction
    /// executes.  The instruction pointer has already moved past the
    /// instruction, so `snapshot.program_counter` is `address +
    /// length`; use `address` for the instruction itself.
    pub snapshot: RegisterSnapshot,
}

pub type StepListener = Box<dyn FnMut(&StepEvent) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Resumed,
    Stopped,
}

#[derive(Debug, Default)]
struct StepState {
    armed: bool,
    /// At most one step can be granted ahead of time.
    granted: bool,
    waiting: bool,
}

/// Cloning a `StepControl` gives another handle on the same state.
#[derive(Debug, Clone, Default)]
pub struct StepControl {
    shared: Arc<(Mutex<StepState>, Condvar)>,
    stop: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new() -> StepControl {
        StepControl::default()
    }

    fn lock(&self) -> MutexGuard<'_, StepState> {
        self.shared.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turns step mode on or off.  Turning it off releases a waiting
    /// CPU.
    pub fn set_armed(&self, armed: bool) {
        let mut state = self.lock();
        if state.armed != armed {
            event!(
                Level::INFO,
                "single-step mode {}",
                if armed { "on" } else { "off" }
            );
        }
        state.armed = armed;
        if !armed {
            state.granted = false;
        }
        self.shared.1.notify_all();
    }

    /// Flips step mode, returning the new setting.
    pub fn toggle(&self) -> bool {
        let armed = !self.is_armed();
        self.set_armed(armed);
        armed
    }

    pub fn is_armed(&self) -> bool {
        self.lock().armed
    }

    /// Indicates that the CPU is blocked waiting for [`resume`].
    ///
    /// [`resume`]: StepControl::resume
    pub fn is_waiting(&self) -> bool {
        self.lock().waiting
    }

    /// Allows one instruction to execute.  Repeated calls before the
    /// CPU takes the step grant only one step.
    pub fn resume(&self) {
        let mut state = self.lock();
        state.granted = true;
        self.shared.1.notify_all();
    }

    /// Blocks the calling (CPU) thread until a step is granted, step
    /// mode is turned off, or a stop is requested.
    pub fn wait_for_resume(&self) -> Wake {
        let mut state = self.lock();
        state.waiting = true;
        let wake = loop {
            if self.stop_requested() {
                break Wake::Stopped;
            }
            if state.granted {
                state.granted = false;
                break Wake::Resumed;
            }
            if !state.armed {
                break Wake::Resumed;
            }
            state = self
                .shared
                .1
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        };
        state.waiting = false;
        wake
    }

    /// Asks the CPU to stop at the next instruction boundary, waking
    /// it if it is waiting for a step.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _state = self.lock();
        self.shared.1.notify_all();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }
}
