//! External interrupt sources: the maskable request line (driven by
//! an [`InterruptController`]) and the non-maskable latch.
use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

/// Something which drives the maskable interrupt line, such as a
/// model of a programmable interrupt controller.
pub trait InterruptController: Send {
    /// Indicates that an interrupt is being requested.  Queried once
    /// per tick.
    fn pending(&self) -> bool;

    /// Called when the CPU accepts the request; returns the vector
    /// number.
    fn acknowledge(&mut self) -> u8;
}

/// Shared handle on the non-maskable interrupt input.  Raising it
/// latches a request which the CPU takes at the next instruction
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct NmiLatch {
    raised: Arc<AtomicBool>,
}

impl NmiLatch {
    pub fn new() -> NmiLatch {
        NmiLatch::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Clears the latch, returning whether it was set.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }
}

/// A single interrupt request line carrying one vector number at a
/// time.  Clones share the line, so one clone can be given to the
/// CPU and another kept by whatever raises requests.  A new request
/// replaces one which has not yet been acknowledged.
#[derive(Clone, Default)]
pub struct InterruptLine {
    /// Zero when idle, otherwise 0x100 | vector.
    request: Arc<AtomicU16>,
}

const REQUESTED: u16 = 0x100;

impl Debug for InterruptLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("InterruptLine")
            .field("request", &self.request.load(Ordering::SeqCst))
            .finish()
    }
}

impl InterruptLine {
    pub fn new() -> InterruptLine {
        InterruptLine::default()
    }

    pub fn request(&self, vector: u8) {
        self.request
            .store(REQUESTED | u16::from(vector), Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.request.store(0, Ordering::SeqCst);
    }
}

impl InterruptController for InterruptLine {
    fn pending(&self) -> bool {
        self.request.load(Ordering::SeqCst) & REQUESTED != 0
    }

    fn acknowledge(&mut self) -> u8 {
        let [vector, _] = self.request.swap(0, Ordering::SeqCst).to_le_bytes();
        vector
    }
}

/// The interrupt inputs of a CPU.
#[derive(Default)]
pub struct InterruptInputs {
    pub controller: Option<Box<dyn InterruptController>>,
    pub nmi: NmiLatch,
}

impl Debug for InterruptInputs {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("InterruptInputs")
            .field("controller", &self.controller.is_some())
            .field("nmi", &self.nmi)
            .finish()
    }
}

impl InterruptInputs {
    /// Indicates a maskable request is waiting.
    pub fn intr_pending(&self) -> bool {
        self.controller.as_ref().is_some_and(|c| c.pending())
    }

    pub fn acknowledge_intr(&mut self) -> Option<u8> {
        match self.controller.as_mut() {
            Some(c) if c.pending() => Some(c.acknowledge()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_shared_between_clones() {
        let line = InterruptLine::new();
        let mut inputs = InterruptInputs {
            controller: Some(Box::new(line.clone())),
            nmi: NmiLatch::new(),
        };
        assert!(!inputs.intr_pending());
        line.request(0x08);
        assert!(inputs.intr_pending());
        assert_eq!(inputs.acknowledge_intr(), Some(0x08));
        assert!(!inputs.intr_pending());
        assert_eq!(inputs.acknowledge_intr(), None);
    }

    #[test]
    fn test_vector_zero_can_be_requested() {
        let mut line = InterruptLine::new();
        line.request(0);
        assert!(line.pending());
        assert_eq!(line.acknowledge(), 0);
    }

    #[test]
    fn test_nmi_latch() {
        let nmi = NmiLatch::new();
        let handle = nmi.clone();
        handle.raise();
        assert!(nmi.is_raised());
        assert!(nmi.take());
        assert!(!nmi.take());
    }
}
