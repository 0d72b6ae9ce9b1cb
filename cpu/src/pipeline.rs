//! The CPU pipeline: fetch, decode and execute, with interrupts and
//! single-step control interposed between instructions.
use std::time::Duration;

use tracing::{event, span, Level};

use base::instruction::Inst;

use crate::arch::{ArchitectureDescription, Core};
use crate::biu::BusInterfaceUnit;
use crate::clock::{BasicClock, Clock};
use crate::decoded::{DecodedQueue, QueueError};
use crate::fault::{Fault, FaultDetails};
use crate::faultunit::FaultUnit;
use crate::interrupt::{InterruptController, InterruptInputs, NmiLatch};
use crate::io::DeviceManager;
use crate::memory::MemoryUnit;
use crate::registers::RegisterSnapshot;
use crate::step::{StepControl, StepEvent, StepListener, Wake};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Fetching,
    Decoding,
    /// Waiting for the step controller to allow the decoded
    /// instruction to execute.
    StepWait,
    Executing,
    Halted,
}

/// The result of a single [`Cpu::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// An instruction executed.
    Continue,
    /// The core is waiting for an interrupt.
    Halted,
    /// There are no more instruction bytes to decode.
    EndOfStream,
    /// A stop was requested.
    Stopped,
}

pub struct Cpu<C: Core> {
    description: ArchitectureDescription<C::Instruction>,
    core: C,
    bus: BusInterfaceUnit,
    faults: FaultUnit,
    interrupts: InterruptInputs,
    /// Each entry holds the instruction's linear address.
    decoded: DecodedQueue<(u32, C::Instruction)>,
    clock: BasicClock,
    step: StepControl,
    listener: Option<StepListener>,
    state: PipelineState,
    executed: u64,
}

fn queue_fault(address: u32, error: QueueError, activity: &'static str) -> Fault {
    Fault {
        address: Some(address),
        details: FaultDetails::Queue { error, activity },
    }
}

impl<C: Core> Cpu<C> {
    pub fn new(
        description: ArchitectureDescription<C::Instruction>,
        core: C,
        memory: MemoryUnit,
        devices: DeviceManager,
    ) -> Cpu<C> {
        event!(
            Level::DEBUG,
            "creating {} pipeline with a {}-byte prefetch queue",
            description.name,
            description.prefetch_capacity
        );
        Cpu {
            bus: BusInterfaceUnit::new(
                memory,
                devices,
                description.prefetch_capacity,
                description.fetch_chunk,
            ),
            decoded: DecodedQueue::new(description.decoded_queue_depth),
            clock: BasicClock::new(description.clock_hz),
            description,
            core,
            faults: FaultUnit::new(),
            interrupts: InterruptInputs::default(),
            step: StepControl::new(),
            listener: None,
            state: PipelineState::Fetching,
            executed: 0,
        }
    }

    pub fn description(&self) -> &ArchitectureDescription<C::Instruction> {
        &self.description
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut C {
        &mut self.core
    }

    pub fn bus(&self) -> &BusInterfaceUnit {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut BusInterfaceUnit {
        &mut self.bus
    }

    pub fn faults(&self) -> &FaultUnit {
        &self.faults
    }

    pub fn faults_mut(&mut self) -> &mut FaultUnit {
        &mut self.faults
    }

    pub fn set_interrupt_controller(&mut self, controller: Box<dyn InterruptController>) {
        self.interrupts.controller = Some(controller);
    }

    /// A handle on the non-maskable interrupt input.
    pub fn nmi(&self) -> NmiLatch {
        self.interrupts.nmi.clone()
    }

    /// A handle through which another thread can single-step or stop
    /// this CPU.
    pub fn step_control(&self) -> StepControl {
        self.step.clone()
    }

    /// Sets the function called with each decoded instruction while
    /// single-step mode is armed.
    pub fn set_step_listener(&mut self, listener: StepListener) {
        self.listener = Some(listener);
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    pub fn clock(&self) -> &BasicClock {
        &self.clock
    }

    /// Simulated time elapsed so far.
    pub fn elapsed(&self) -> Duration {
        self.clock.now()
    }

    pub fn snapshot(&self) -> RegisterSnapshot {
        self.description.snapshot(&self.core)
    }

    /// Brings the next instruction into the decoded queue.  Returns
    /// `None` if there is nothing to execute this tick.
    fn fetch_and_decode(&mut self) -> Result<Option<TickOutcome>, Fault> {
        self.core
            .service_interrupts(&mut self.bus, &mut self.interrupts);
        if self.core.is_halted() {
            self.state = PipelineState::Halted;
            return Ok(Some(TickOutcome::Halted));
        }

        self.state = PipelineState::Fetching;
        let at = self.core.code_address();
        let address = at.address();
        if let Err(error) = self.bus.fetch_instructions(at) {
            return Err(self
                .faults
                .always_fire(queue_fault(address, error, "prefetch")));
        }

        self.state = PipelineState::Decoding;
        let instruction = match (self.description.decode)(&mut self.bus, 0) {
            Ok(instruction) => instruction,
            Err(e) => {
                event!(Level::INFO, "end of instruction stream at {address:#X}: {e}");
                self.state = PipelineState::Fetching;
                return Ok(Some(TickOutcome::EndOfStream));
            }
        };
        let length = instruction.length();
        event!(Level::DEBUG, "decoded {instruction} ({length} bytes) at {address:#X}");
        if let Err(error) = self.decoded.push((address, instruction)) {
            return Err(self
                .faults
                .always_fire(queue_fault(address, error, "decode")));
        }
        self.bus.consume(length);
        self.core.advance(length);
        Ok(None)
    }

    /// Tells the listener about the instruction at the head of the
    /// decoded queue and waits to be allowed to execute it.
    fn step_wait(&mut self) -> Wake {
        self.state = PipelineState::StepWait;
        if let (Some(listener), Some((address, instruction))) =
            (self.listener.as_mut(), self.decoded.front())
        {
            listener(&StepEvent {
                address: *address,
                length: instruction.length(),
                disassembly: instruction.to_string(),
                snapshot: self.description.snapshot(&self.core),
            });
        }
        self.step.wait_for_resume()
    }

    /// Runs the pipeline for one instruction.
    ///
    /// An instruction left in the decoded queue by a stop during a
    /// step wait is executed by the next tick, before any interrupt
    /// is serviced.
    pub fn tick(&mut self) -> Result<TickOutcome, Fault> {
        if self.step.stop_requested() {
            return Ok(TickOutcome::Stopped);
        }
        if self.decoded.is_empty() {
            if let Some(outcome) = self.fetch_and_decode()? {
                return Ok(outcome);
            }
        }
        if self.step.is_armed() && self.step_wait() == Wake::Stopped {
            return Ok(TickOutcome::Stopped);
        }

        self.state = PipelineState::Executing;
        let (address, instruction) = match self.decoded.pop() {
            Ok(entry) => entry,
            Err(error) => {
                let address = self.core.fetch_address();
                return Err(self
                    .faults
                    .always_fire(queue_fault(address, error, "execute")));
            }
        };
        let span = span!(Level::INFO, "tick", address);
        let _enter = span.enter();
        let result = self
            .core
            .execute(&instruction, address, &mut self.bus, &mut self.faults);
        self.clock.consume_cycles(instruction.clocks());
        self.executed += 1;
        let length = u32::try_from(instruction.length()).unwrap_or(u32::MAX);
        if self.core.fetch_address() != address.wrapping_add(length) {
            // Control transfer: the prefetched bytes are stale.
            self.bus.reset_queue();
        }
        result?;
        if self.core.is_halted() {
            self.state = PipelineState::Halted;
            Ok(TickOutcome::Halted)
        } else {
            self.state = PipelineState::Fetching;
            Ok(TickOutcome::Continue)
        }
    }

    /// Runs until something other than [`TickOutcome::Continue`]
    /// happens.
    pub fn run(&mut self) -> Result<TickOutcome, Fault> {
        self.run_until(|_| false)
    }

    /// Runs at most `limit` instructions.  Returns
    /// [`TickOutcome::Continue`] if the limit was reached.
    pub fn run_for(&mut self, limit: u64) -> Result<TickOutcome, Fault> {
        let stop_at = self.executed.saturating_add(limit);
        self.run_until(|cpu| cpu.executed >= stop_at)
    }

    fn run_until<F>(&mut self, mut done: F) -> Result<TickOutcome, Fault>
    where
        F: FnMut(&Cpu<C>) -> bool,
    {
        event!(
            Level::INFO,
            "{} run starting at {:#X}",
            self.description.name,
            self.core.fetch_address()
        );
        let outcome = loop {
            if done(self) {
                break Ok(TickOutcome::Continue);
            }
            match self.tick() {
                Ok(TickOutcome::Continue) => (),
                other => break other,
            }
        };
        match &outcome {
            Ok(outcome) => event!(
                Level::INFO,
                "run finished ({outcome:?}) after {} instructions",
                self.executed
            ),
            Err(fault) => event!(Level::ERROR, "run stopped by fault: {fault}"),
        }
        outcome
    }
}
