//! Descriptions of the architectures the pipeline can run, and the
//! interface between the pipeline and an architecture's execution
//! core.
use std::fmt::Display;

use base::instruction::{DecodeFailure, Inst};
use base::source::ByteSource;
use base::{arm, x86};

use crate::biu::BusInterfaceUnit;
use crate::fault::Fault;
use crate::faultunit::FaultUnit;
use crate::interrupt::InterruptInputs;
use crate::locator::CodeAddress;
use crate::registers::{NamedValue, RegisterSnapshot};

pub type DecodeFn<I> = fn(&mut dyn ByteSource, usize) -> Result<I, DecodeFailure>;

/// The parameters of an architecture which the pipeline needs.
pub struct ArchitectureDescription<I> {
    pub name: &'static str,
    /// Capacity of the prefetch queue, in bytes.
    pub prefetch_capacity: usize,
    /// Number of bytes the bus interface fetches at a time.
    pub fetch_chunk: usize,
    pub decoded_queue_depth: usize,
    /// Register names, in the order they appear in a snapshot.
    pub registers: &'static [&'static str],
    /// The default clock frequency, in Hz.
    pub clock_hz: u64,
    pub decode: DecodeFn<I>,
}

impl<I> Clone for ArchitectureDescription<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for ArchitectureDescription<I> {}

impl<I> ArchitectureDescription<I> {
    /// Copies `core`'s registers, in the order given by
    /// `self.registers`.  Names the core does not recognise are
    /// left out.
    pub fn snapshot<C: Core<Instruction = I>>(&self, core: &C) -> RegisterSnapshot {
        RegisterSnapshot {
            architecture: self.name,
            program_counter: core.fetch_address(),
            registers: self
                .registers
                .iter()
                .filter_map(|&name| {
                    core.register_value(name)
                        .map(|value| NamedValue { name, value })
                })
                .collect(),
            flags: core.flags_summary(),
        }
    }
}

/// The 8086 in real mode: a 6-byte prefetch queue filled a word at a
/// time.
pub const X86_REAL_MODE: ArchitectureDescription<x86::Instruction> = ArchitectureDescription {
    name: "8086",
    prefetch_capacity: 6,
    fetch_chunk: 2,
    decoded_queue_depth: 1,
    registers: &[
        "AX", "BX", "CX", "DX", "SP", "BP", "SI", "DI", "CS", "DS", "ES", "SS", "IP", "FLAGS",
    ],
    clock_hz: 4_770_000,
    decode: x86::decode,
};

/// A32 instructions, fetched a word at a time.
pub const ARM: ArchitectureDescription<arm::Instruction> = ArchitectureDescription {
    name: "arm",
    prefetch_capacity: 8,
    fetch_chunk: 4,
    decoded_queue_depth: 1,
    registers: &[
        "R0", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12", "SP",
        "LR", "PC", "CPSR",
    ],
    clock_hz: 16_000_000,
    decode: arm::decode,
};

/// An execution core: the architecture-specific part of a CPU.
pub trait Core: Send {
    type Instruction: Inst + Display + Clone + Send;

    /// Where the next instruction will be decoded from.
    fn code_address(&self) -> CodeAddress;

    /// The linear address of the next instruction to decode.
    fn fetch_address(&self) -> u32 {
        self.code_address().address()
    }

    /// Moves the instruction pointer past an instruction of `length`
    /// bytes which has just been decoded.
    fn advance(&mut self, length: usize);

    /// Executes `instruction`, which was decoded at linear address
    /// `address` (the instruction pointer has already been
    /// advanced past it).  Masked faults are recorded in `faults`
    /// and execution continues; unmasked faults are returned.
    fn execute(
        &mut self,
        instruction: &Self::Instruction,
        address: u32,
        bus: &mut BusInterfaceUnit,
        faults: &mut FaultUnit,
    ) -> Result<(), Fault>;

    /// Takes at most one pending interrupt (internal traps first,
    /// then the non-maskable input, then the maskable line).
    /// Returns true if a handler was entered.
    fn service_interrupts(&mut self, bus: &mut BusInterfaceUnit, inputs: &mut InterruptInputs)
        -> bool;

    /// The value of the register called `name`, if there is one.
    fn register_value(&self, name: &str) -> Option<u32>;

    /// The flags in a short human-readable form.
    fn flags_summary(&self) -> String;

    /// Indicates that the core is waiting for an interrupt.
    fn is_halted(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::ArmCore;
    use crate::x86::ExecutionUnit;

    #[test]
    fn test_descriptions_decode_their_own_encodings() {
        let mut nop: &[u8] = &[0x90];
        let inst = (X86_REAL_MODE.decode)(&mut nop, 0).expect("NOP decodes");
        assert_eq!(inst.length(), 1);
        let mut mov: &[u8] = &[0x05, 0x10, 0xA0, 0xE3];
        let inst = (ARM.decode)(&mut mov, 0).expect("MOV decodes");
        assert_eq!(inst.length(), 4);
        assert_eq!(inst.to_string(), "MOV R1, #0x5");
    }

    #[test]
    fn test_every_described_register_is_in_the_snapshot() {
        let x86 = X86_REAL_MODE.snapshot(&ExecutionUnit::new());
        let names: Vec<&str> = x86.registers.iter().map(|r| r.name).collect();
        assert_eq!(names, X86_REAL_MODE.registers);
        assert_eq!(x86.architecture, "8086");

        let arm = ARM.snapshot(&ArmCore::new());
        let names: Vec<&str> = arm.registers.iter().map(|r| r.name).collect();
        assert_eq!(names, ARM.registers);
        assert_eq!(arm.architecture, "arm");
    }

    #[test]
    fn test_unknown_register_names() {
        assert_eq!(ExecutionUnit::new().register_value("R0"), None);
        assert_eq!(ArmCore::new().register_value("AX"), None);
        assert_eq!(ArmCore::new().register_value("R13"), None);
    }

    #[test]
    fn test_queue_holds_whole_chunks() {
        for (capacity, chunk) in [
            (X86_REAL_MODE.prefetch_capacity, X86_REAL_MODE.fetch_chunk),
            (ARM.prefetch_capacity, ARM.fetch_chunk),
        ] {
            assert_eq!(capacity % chunk, 0);
        }
    }
}
