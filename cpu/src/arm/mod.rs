//! A partial ARM (A32) execution core.
//!
//! The core models the sixteen general registers, the CPSR, and the
//! stack pointer, link register and SPSR banked per exception mode
//! (the FIQ bank of R8-R12 is not modeled).  Thumb state is not
//! supported: an instruction which would enter it raises the
//! undefined-instruction fault.  So do coprocessor and media
//! instructions.  BKPT halts the core.
use tracing::{event, Level};

use base::arm::{
    Condition, DataOp, Instruction, Operation, Register, ShiftAmount, ShifterOperand,
};

use crate::arch::Core;
use crate::biu::BusInterfaceUnit;
use crate::fault::{Fault, FaultDetails};
use crate::faultunit::FaultUnit;
use crate::interrupt::InterruptInputs;
use crate::locator::CodeAddress;

mod op_transfer;
mod shifter;

#[cfg(test)]
mod tests;

use shifter::{add_with_carry, shift_immediate, shift_register};

pub mod psr {
    pub const N: u32 = 1 << 31;
    pub const Z: u32 = 1 << 30;
    pub const C: u32 = 1 << 29;
    pub const V: u32 = 1 << 28;
    pub const FLAGS: u32 = N | Z | C | V;
    /// IRQ disable.
    pub const I: u32 = 1 << 7;
    /// FIQ disable.
    pub const F: u32 = 1 << 6;
    pub const T: u32 = 1 << 5;
    pub const MODE: u32 = 0x1F;

    pub const USER: u32 = 0x10;
    pub const FIQ: u32 = 0x11;
    pub const IRQ: u32 = 0x12;
    pub const SUPERVISOR: u32 = 0x13;
    pub const ABORT: u32 = 0x17;
    pub const UNDEFINED: u32 = 0x1B;
    pub const SYSTEM: u32 = 0x1F;
}

pub mod vectors {
    pub const RESET: u32 = 0x00;
    pub const SUPERVISOR_CALL: u32 = 0x08;
    pub const IRQ: u32 = 0x18;
    pub const FIQ: u32 = 0x1C;
}

/// The registers which each exception mode has its own copy of.
#[derive(Debug, Clone, Copy, Default)]
struct Bank {
    sp: u32,
    lr: u32,
    spsr: u32,
}

/// User and System modes share bank 0, which has no SPSR.
const fn bank_index(cpsr: u32) -> usize {
    match cpsr & psr::MODE {
        psr::FIQ => 1,
        psr::IRQ => 2,
        psr::SUPERVISOR => 3,
        psr::ABORT => 4,
        psr::UNDEFINED => 5,
        _ => 0,
    }
}

fn mode_name(cpsr: u32) -> &'static str {
    match cpsr & psr::MODE {
        psr::USER => "usr",
        psr::FIQ => "fiq",
        psr::IRQ => "irq",
        psr::SUPERVISOR => "svc",
        psr::ABORT => "abt",
        psr::UNDEFINED => "und",
        psr::SYSTEM => "sys",
        _ => "???",
    }
}

#[derive(Debug)]
pub struct ArmCore {
    /// R15 holds the address of the next instruction to fetch.
    regs: [u32; 16],
    cpsr: u32,
    banks: [Bank; 6],
    /// The value reads of PC see while an instruction executes (its
    /// address plus 8).
    pc_read: u32,
    halted: bool,
}

impl Default for ArmCore {
    fn default() -> ArmCore {
        ArmCore {
            regs: [0; 16],
            // Reset state: Supervisor mode with interrupts disabled.
            cpsr: psr::SUPERVISOR | psr::I | psr::F,
            banks: [Bank::default(); 6],
            pc_read: 0,
            halted: false,
        }
    }
}

impl ArmCore {
    pub fn new() -> ArmCore {
        ArmCore::default()
    }

    pub fn set_entry_point(&mut self, pc: u32) {
        self.regs[15] = pc & !3;
        self.halted = false;
    }

    /// The current value of a register.  For PC this is the address
    /// of the next instruction.
    pub fn register(&self, r: Register) -> u32 {
        self.regs[r.number()]
    }

    pub fn set_register(&mut self, r: Register, value: u32) {
        if r.is_pc() {
            self.set_entry_point(value);
        } else {
            self.regs[r.number()] = value;
        }
    }

    pub fn cpsr(&self) -> u32 {
        self.cpsr
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn flag(&self, mask: u32) -> bool {
        self.cpsr & mask != 0
    }

    fn carry(&self) -> bool {
        self.flag(psr::C)
    }

    fn condition_passes(&self, condition: Condition) -> bool {
        condition.holds(
            self.flag(psr::N),
            self.flag(psr::Z),
            self.flag(psr::C),
            self.flag(psr::V),
        )
    }

    /// Reads a register as an operand of the executing instruction.
    pub(crate) fn read(&self, r: Register) -> u32 {
        if r.is_pc() {
            self.pc_read
        } else {
            self.regs[r.number()]
        }
    }

    /// Writes a register; writing PC is a branch.
    pub(crate) fn write(&mut self, r: Register, value: u32) {
        if r.is_pc() {
            self.regs[15] = value & !3;
        } else {
            self.regs[r.number()] = value;
        }
    }

    /// Changes the CPSR, swapping banked registers if the mode
    /// changes.
    fn set_cpsr(&mut self, value: u32) {
        let old = bank_index(self.cpsr);
        let new = bank_index(value);
        if old != new {
            self.banks[old].sp = self.regs[13];
            self.banks[old].lr = self.regs[14];
            self.regs[13] = self.banks[new].sp;
            self.regs[14] = self.banks[new].lr;
            event!(
                Level::TRACE,
                "mode change {} -> {}",
                mode_name(self.cpsr),
                mode_name(value)
            );
        }
        self.cpsr = value;
    }

    /// The SPSR of the current mode.  User and System modes have
    /// none; reads give the CPSR and writes are ignored.
    fn spsr(&self) -> u32 {
        match bank_index(self.cpsr) {
            0 => self.cpsr,
            n => self.banks[n].spsr,
        }
    }

    fn set_spsr(&mut self, value: u32) {
        match bank_index(self.cpsr) {
            0 => (),
            n => self.banks[n].spsr = value,
        }
    }

    fn set_nz(&mut self, result: u32) {
        let mut cpsr = self.cpsr & !(psr::N | psr::Z);
        if result & 0x8000_0000 != 0 {
            cpsr |= psr::N;
        }
        if result == 0 {
            cpsr |= psr::Z;
        }
        self.cpsr = cpsr;
    }

    fn set_flag(&mut self, mask: u32, value: bool) {
        if value {
            self.cpsr |= mask;
        } else {
            self.cpsr &= !mask;
        }
    }

    /// Enters an exception handler: saves the CPSR into the new
    /// mode's SPSR, sets its LR to `return_address` and jumps to
    /// `vector`.
    fn enter_exception(&mut self, mode: u32, vector: u32, return_address: u32) {
        let old = self.cpsr;
        let mut new = (old & !(psr::MODE | psr::T)) | mode | psr::I;
        if mode == psr::FIQ {
            new |= psr::F;
        }
        self.set_cpsr(new);
        self.set_spsr(old);
        self.regs[14] = return_address;
        self.regs[15] = vector;
        self.halted = false;
        event!(
            Level::DEBUG,
            "exception entry to {} mode at vector {vector:#04X}",
            mode_name(mode)
        );
    }

    /// An operation which returns to the mode saved in the SPSR
    /// (data processing with S set and PC as destination, or LDM
    /// with the S bit and PC in the list).
    fn return_from_exception(&mut self) {
        let spsr = self.spsr();
        self.set_cpsr(spsr);
    }

    fn shifter_operand(&self, operand: &ShifterOperand) -> (u32, bool) {
        let carry = self.carry();
        match *operand {
            ShifterOperand::Immediate { imm8, rotate } => {
                let value = u32::from(imm8).rotate_right(2 * u32::from(rotate));
                let carry_out = if rotate == 0 {
                    carry
                } else {
                    value & 0x8000_0000 != 0
                };
                (value, carry_out)
            }
            ShifterOperand::Register { rm, shift, amount } => {
                let value = self.read(rm);
                match amount {
                    ShiftAmount::Immediate(n) => shift_immediate(shift, value, u32::from(n), carry),
                    ShiftAmount::Register(rs) => {
                        shift_register(shift, value, self.read(rs) & 0xFF, carry)
                    }
                }
            }
        }
    }

    fn data_processing(
        &mut self,
        op: DataOp,
        set_flags: bool,
        rn: Register,
        rd: Register,
        operand: &ShifterOperand,
    ) {
        let (b, shifter_carry) = self.shifter_operand(operand);
        let a = self.read(rn);
        let c = self.carry();
        // (result, carry, overflow) for the arithmetic operations.
        let arith = match op {
            DataOp::Sub | DataOp::Cmp => Some(add_with_carry(a, !b, true)),
            DataOp::Rsb => Some(add_with_carry(b, !a, true)),
            DataOp::Add | DataOp::Cmn => Some(add_with_carry(a, b, false)),
            DataOp::Adc => Some(add_with_carry(a, b, c)),
            DataOp::Sbc => Some(add_with_carry(a, !b, c)),
            DataOp::Rsc => Some(add_with_carry(b, !a, c)),
            _ => None,
        };
        let result = match (op, arith) {
            (_, Some((result, _, _))) => result,
            (DataOp::And | DataOp::Tst, None) => a & b,
            (DataOp::Eor | DataOp::Teq, None) => a ^ b,
            (DataOp::Orr, None) => a | b,
            (DataOp::Bic, None) => a & !b,
            (DataOp::Mvn, None) => !b,
            (_, None) => b,
        };
        if !op.is_comparison() {
            self.write(rd, result);
        }
        if set_flags && rd.is_pc() && !op.is_comparison() {
            self.return_from_exception();
        } else if set_flags || op.is_comparison() {
            self.set_nz(result);
            match arith {
                Some((_, carry, overflow)) => {
                    self.set_flag(psr::C, carry);
                    self.set_flag(psr::V, overflow);
                }
                None => self.set_flag(psr::C, shifter_carry),
            }
        }
    }

    fn multiply(
        &mut self,
        accumulate: bool,
        set_flags: bool,
        rd: Register,
        rn: Register,
        rs: Register,
        rm: Register,
    ) {
        let mut result = self.read(rm).wrapping_mul(self.read(rs));
        if accumulate {
            result = result.wrapping_add(self.read(rn));
        }
        self.write(rd, result);
        if set_flags {
            self.set_nz(result);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn multiply_long(
        &mut self,
        signed: bool,
        accumulate: bool,
        set_flags: bool,
        rd_hi: Register,
        rd_lo: Register,
        rs: Register,
        rm: Register,
    ) {
        let (m, s) = (self.read(rm), self.read(rs));
        let mut product = if signed {
            (i64::from(m as i32) * i64::from(s as i32)) as u64
        } else {
            u64::from(m) * u64::from(s)
        };
        if accumulate {
            let existing = (u64::from(self.read(rd_hi)) << 32) | u64::from(self.read(rd_lo));
            product = product.wrapping_add(existing);
        }
        let hi = (product >> 32) as u32;
        self.write(rd_lo, product as u32);
        self.write(rd_hi, hi);
        if set_flags {
            self.set_flag(psr::N, hi & 0x8000_0000 != 0);
            self.set_flag(psr::Z, product == 0);
        }
    }

    /// MSR.  Outside User mode the mask selects which bytes of the
    /// PSR are written; in User mode only the flags can change.
    fn write_status(&mut self, saved: bool, mask: u8, operand: &ShifterOperand) {
        let (value, _) = self.shifter_operand(operand);
        let mut byte_mask = 0u32;
        for i in 0..4 {
            if mask & (1 << i) != 0 {
                byte_mask |= 0xFF << (8 * i);
            }
        }
        if saved {
            let spsr = self.spsr();
            self.set_spsr((spsr & !byte_mask) | (value & byte_mask));
        } else {
            if self.cpsr & psr::MODE == psr::USER {
                byte_mask &= psr::FLAGS;
            }
            // The T bit cannot be changed by MSR.
            byte_mask &= !psr::T;
            self.set_cpsr((self.cpsr & !byte_mask) | (value & byte_mask));
        }
    }

    fn not_modeled(
        &mut self,
        inst: &Instruction,
        address: u32,
        faults: &mut FaultUnit,
    ) -> Result<(), Fault> {
        faults.fire_if_not_masked(Fault {
            address: Some(address),
            details: FaultDetails::UndefinedInstruction {
                opcode: inst.word(),
                disassembly: inst.to_string(),
            },
        })
    }

    pub fn execute_instruction(
        &mut self,
        inst: &Instruction,
        address: u32,
        bus: &mut BusInterfaceUnit,
        faults: &mut FaultUnit,
    ) -> Result<(), Fault> {
        event!(Level::DEBUG, "{address:#010X}: {inst}");
        if !self.condition_passes(inst.condition()) {
            return Ok(());
        }
        self.pc_read = address.wrapping_add(8);
        let next = address.wrapping_add(4);
        match *inst.operation() {
            Operation::DataProcessing {
                op,
                set_flags,
                rn,
                rd,
                operand,
            } => self.data_processing(op, set_flags, rn, rd, &operand),
            Operation::MoveWide { top, rd, imm16 } => {
                let value = if top {
                    (self.read(rd) & 0xFFFF) | (u32::from(imm16) << 16)
                } else {
                    u32::from(imm16)
                };
                self.write(rd, value);
            }
            Operation::Multiply {
                accumulate,
                set_flags,
                rd,
                rn,
                rs,
                rm,
            } => self.multiply(accumulate, set_flags, rd, rn, rs, rm),
            Operation::MultiplyLong {
                signed,
                accumulate,
                set_flags,
                rd_hi,
                rd_lo,
                rs,
                rm,
            } => self.multiply_long(signed, accumulate, set_flags, rd_hi, rd_lo, rs, rm),
            Operation::Swap { byte, rn, rd, rm } => self.swap(bus, byte, rn, rd, rm),
            Operation::StatusToRegister { saved, rd } => {
                let value = if saved { self.spsr() } else { self.cpsr };
                self.write(rd, value);
            }
            Operation::RegisterToStatus {
                saved,
                mask,
                operand,
            } => self.write_status(saved, mask, &operand),
            Operation::BranchExchange { link, rm } => {
                let target = self.read(rm);
                if target & 1 != 0 {
                    // Thumb state.  When masked, execution carries on
                    // in ARM state at the halfword-aligned target.
                    self.not_modeled(inst, address, faults)?;
                }
                if link {
                    self.regs[14] = next;
                }
                self.write(Register::PC, target & !1);
            }
            Operation::CountLeadingZeros { rd, rm } => {
                let value = self.read(rm).leading_zeros();
                self.write(rd, value);
            }
            Operation::SingleTransfer {
                load,
                byte,
                indexing,
                rn,
                rd,
                offset,
            } => self.single_transfer(bus, load, byte, indexing, rn, rd, &offset),
            Operation::HalfwordTransfer {
                load,
                kind,
                indexing,
                rn,
                rd,
                offset,
            } => self.halfword_transfer(bus, load, kind, indexing, rn, rd, &offset),
            Operation::BlockTransfer {
                load,
                indexing,
                user_bank,
                rn,
                registers,
            } => self.block_transfer(bus, load, indexing, user_bank, rn, registers),
            Operation::Branch { link, offset } => {
                if link {
                    self.regs[14] = next;
                }
                self.write(Register::PC, self.pc_read.wrapping_add_signed(offset));
            }
            Operation::SupervisorCall { comment } => {
                event!(Level::DEBUG, "SVC {comment:#X}");
                self.enter_exception(psr::SUPERVISOR, vectors::SUPERVISOR_CALL, next);
            }
            Operation::Breakpoint { comment } => {
                event!(Level::INFO, "breakpoint {comment:#X} at {address:#010X}");
                self.halted = true;
            }
            Operation::BranchLinkExchange { .. }
            | Operation::Coprocessor { .. }
            | Operation::Media { .. }
            | Operation::Unconditional { .. }
            | Operation::Undefined { .. } => self.not_modeled(inst, address, faults)?,
        }
        Ok(())
    }
}

impl Core for ArmCore {
    type Instruction = Instruction;

    fn code_address(&self) -> CodeAddress {
        CodeAddress::Flat(self.regs[15])
    }

    fn advance(&mut self, length: usize) {
        let length = u32::try_from(length).unwrap_or(u32::MAX);
        self.regs[15] = self.regs[15].wrapping_add(length);
    }

    fn execute(
        &mut self,
        instruction: &Instruction,
        address: u32,
        bus: &mut BusInterfaceUnit,
        faults: &mut FaultUnit,
    ) -> Result<(), Fault> {
        self.execute_instruction(instruction, address, bus, faults)
    }

    /// The non-maskable input is delivered as FIQ, and the maskable
    /// line as IRQ.  The return address saved in LR is the next
    /// instruction plus 4, as for hardware interrupts.
    fn service_interrupts(
        &mut self,
        _bus: &mut BusInterfaceUnit,
        inputs: &mut InterruptInputs,
    ) -> bool {
        let return_address = self.regs[15].wrapping_add(4);
        if !self.flag(psr::F) && inputs.nmi.take() {
            self.enter_exception(psr::FIQ, vectors::FIQ, return_address);
            return true;
        }
        if !self.flag(psr::I) {
            if let Some(number) = inputs.acknowledge_intr() {
                event!(Level::DEBUG, "IRQ {number:#04X}");
                self.enter_exception(psr::IRQ, vectors::IRQ, return_address);
                return true;
            }
        }
        false
    }

    fn register_value(&self, name: &str) -> Option<u32> {
        match name {
            "SP" => Some(self.regs[13]),
            "LR" => Some(self.regs[14]),
            "PC" => Some(self.regs[15]),
            "CPSR" => Some(self.cpsr),
            _ => {
                let n: usize = name.strip_prefix('R')?.parse().ok()?;
                (n < 13).then(|| self.regs[n])
            }
        }
    }

    fn flags_summary(&self) -> String {
        let letter = |mask: u32, c: char| if self.flag(mask) { c } else { '-' };
        format!(
            "{}{}{}{} {}{} {}",
            letter(psr::N, 'N'),
            letter(psr::Z, 'Z'),
            letter(psr::C, 'C'),
            letter(psr::V, 'V'),
            letter(psr::I, 'I'),
            letter(psr::F, 'F'),
            mode_name(self.cpsr)
        )
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}
