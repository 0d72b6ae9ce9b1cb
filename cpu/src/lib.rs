//! This crate emulates an 8086-family CPU: its registers and flags,
//! the ALU, the bus interface with its prefetch queue, and the
//! pipeline which fetches, decodes and executes instructions.  A
//! partial ARM execution core shares the same pipeline.
//!
//! Instruction decoding itself lives in the `base` crate.
#![crate_name = "cpu"]

pub mod alu;
mod arch;
pub mod arm;
mod biu;
mod clock;
mod decoded;
mod fault;
mod faultunit;
mod flags;
mod interrupt;
mod io;
mod locator;
mod memory;
mod pipeline;
mod registers;
mod step;
pub mod x86;

pub use arch::{ArchitectureDescription, Core, DecodeFn, ARM, X86_REAL_MODE};
pub use arm::ArmCore;
pub use biu::{BusInterfaceUnit, PrefetchQueue};
pub use clock::{BasicClock, Clock};
pub use decoded::{DecodedQueue, QueueError};
pub use fault::{Fault, FaultDetails, FaultKind, FaultMaskability, UnknownFaultName};
pub use faultunit::{FaultStatus, FaultUnit};
pub use flags::{Flag, Flags};
pub use interrupt::{InterruptController, InterruptInputs, InterruptLine, NmiLatch};
pub use io::{AttachError, DeviceManager, PortDevice, UnattachedPort};
pub use locator::{get_address, CodeAddress, MemoryLocator, ADDRESS_MASK};
pub use memory::{
    MemoryConfiguration, MemoryOpFailure, MemoryUnit, DEFAULT_ROM_START, UNPOPULATED,
};
pub use pipeline::{Cpu, PipelineState, TickOutcome};
pub use registers::{DividableRegister, NamedValue, RegisterFile, RegisterSnapshot};
pub use step::{StepControl, StepEvent, StepListener, Wake};
pub use x86::ExecutionUnit;
