//! The 8086 execution unit.
//!
//! The execution unit holds the register file and carries out
//! decoded instructions.  Memory and port accesses go through the
//! [`BusInterfaceUnit`].  The implementations of the various groups
//! of instructions are split across the `op_*` modules:
//!
//! - arithmetic and logic: `op_arith`
//! - data transfer and the stack: `op_transfer`
//! - jumps, calls, loops and interrupts: `op_control`
//! - string instructions: `op_string`
//! - IN and OUT: `op_io`
//! - flag manipulation and processor control: `op_misc`
use tracing::{event, Level};

use base::prelude::*;
use base::x86::{
    EffectiveAddress, Instruction, Operand, Operation, Register, SegmentRegister, WordRegister,
};

use crate::arch::Core;
use crate::biu::BusInterfaceUnit;
use crate::fault::{Fault, FaultDetails};
use crate::faultunit::FaultUnit;
use crate::flags::Flag;
use crate::interrupt::InterruptInputs;
use crate::locator::{CodeAddress, MemoryLocator};
use crate::registers::RegisterFile;

mod op_arith;
mod op_control;
mod op_io;
mod op_misc;
mod op_string;
mod op_transfer;


/// Interrupt vectors the processor itself uses.
pub mod vectors {
    pub const DIVIDE_ERROR: u8 = 0;
    pub const SINGLE_STEP: u8 = 1;
    pub const NMI: u8 = 2;
    pub const BREAKPOINT: u8 = 3;
    pub const OVERFLOW: u8 = 4;
}

#[derive(Debug, Default)]
pub struct ExecutionUnit {
    pub regs: RegisterFile,
    halted: bool,
    /// Set by MOV SS, POP SS and STI.  The maskable interrupt line
    /// is ignored at the boundary which follows.
    interrupt_shadow: bool,
    /// An exception raised during execution (divide error), taken
    /// at the next instruction boundary.
    pending_exception: Option<u8>,
    /// The previous instruction was executed with TF set.
    trap_pending: bool,
}

impl ExecutionUnit {
    pub fn new() -> ExecutionUnit {
        ExecutionUnit::default()
    }

    /// Sets CS:IP, as at reset or after loading a program.
    pub fn set_entry_point(&mut self, cs: u16, ip: u16) {
        self.regs.set_segment(SegmentRegister::CS, cs);
        self.regs.ip = ip;
        self.halted = false;
    }

    pub fn set_stack(&mut self, ss: u16, sp: u16) {
        self.regs.set_segment(SegmentRegister::SS, ss);
        self.regs.set_word(WordRegister::SP, sp);
    }

    /// Points DS and ES at `segment`.
    pub fn set_data_segments(&mut self, segment: u16) {
        self.regs.set_segment(SegmentRegister::DS, segment);
        self.regs.set_segment(SegmentRegister::ES, segment);
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    fn stack(&self) -> MemoryLocator {
        MemoryLocator::new(
            self.regs.segment(SegmentRegister::SS),
            self.regs.word(WordRegister::SP),
        )
    }

    pub(crate) fn push(&mut self, bus: &mut BusInterfaceUnit, value: u16) {
        let mut stack = self.stack();
        bus.push(&mut stack, value);
        self.regs.set_word(WordRegister::SP, stack.offset);
    }

    pub(crate) fn pop(&mut self, bus: &mut BusInterfaceUnit) -> u16 {
        let mut stack = self.stack();
        let value = bus.pop(&mut stack);
        self.regs.set_word(WordRegister::SP, stack.offset);
        value
    }

    /// The offset part of a memory operand's address.
    pub(crate) fn effective_offset(&self, address: &EffectiveAddress) -> u16 {
        let (base, index) = address.base.registers();
        let reg = |r: Option<WordRegister>| r.map_or(0, |r| self.regs.word(r));
        reg(base)
            .wrapping_add(reg(index))
            .wrapping_add(address.displacement)
    }

    pub(crate) fn locate(&self, inst: &Instruction, address: &EffectiveAddress) -> MemoryLocator {
        MemoryLocator::new(
            self.regs.segment(inst.segment_for(address)),
            self.effective_offset(address),
        )
    }

    pub(crate) fn read_operand(
        &self,
        inst: &Instruction,
        bus: &BusInterfaceUnit,
        width: Width,
        operand: &Operand,
    ) -> u16 {
        match operand {
            Operand::Register(r) => self.regs.read(*r),
            Operand::Segment(s) => self.regs.segment(*s),
            Operand::Memory(ea) => bus.read(width, self.locate(inst, ea)),
            Operand::Immediate(value) => value & width.mask(),
        }
    }

    pub(crate) fn write_operand(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        width: Width,
        operand: &Operand,
        value: u16,
    ) -> Result<(), Fault> {
        match operand {
            Operand::Register(r) => {
                self.regs.write(*r, value);
                Ok(())
            }
            Operand::Segment(s) => {
                self.regs.set_segment(*s, value);
                if *s == SegmentRegister::SS {
                    self.interrupt_shadow = true;
                }
                Ok(())
            }
            Operand::Memory(ea) => {
                let at = self.locate(inst, ea);
                bus.write(width, at, value & width.mask());
                Ok(())
            }
            Operand::Immediate(_) => Err(Fault::bug(format!(
                "instruction {inst} has an immediate destination"
            ))),
        }
    }

    pub(crate) fn accumulator(&self, width: Width) -> u16 {
        self.regs.read(accumulator(width))
    }

    pub(crate) fn set_accumulator(&mut self, width: Width, value: u16) {
        self.regs.write(accumulator(width), value);
    }

    pub(crate) fn add_to_ip(&mut self, displacement: i16) {
        self.regs.ip = self.regs.ip.wrapping_add_signed(displacement);
    }

    /// Saves FLAGS, CS and IP on the stack and transfers control to
    /// the handler for `vector`.  Software interrupts, exceptions
    /// and external interrupts all come here.
    pub(crate) fn enter_interrupt(&mut self, bus: &mut BusInterfaceUnit, vector: u8) {
        let flags = self.regs.flags.bits();
        self.push(bus, flags);
        self.regs.flags.set(Flag::InterruptEnable, false);
        self.regs.flags.set(Flag::Trap, false);
        let cs = self.regs.segment(SegmentRegister::CS);
        self.push(bus, cs);
        let ip = self.regs.ip;
        self.push(bus, ip);
        let entry = u32::from(vector) * 4;
        let new_ip = bus.memory.get_mem(Width::Word, entry);
        let new_cs = bus.memory.get_mem(Width::Word, entry + 2);
        event!(
            Level::DEBUG,
            "interrupt {vector:#04X}: {cs:04X}:{ip:04X} -> {new_cs:04X}:{new_ip:04X}"
        );
        self.regs.set_segment(SegmentRegister::CS, new_cs);
        self.regs.ip = new_ip;
        self.halted = false;
    }

    pub(crate) fn raise_exception(&mut self, vector: u8) {
        event!(Level::DEBUG, "exception {vector:#04X} raised");
        self.pending_exception = Some(vector);
    }

    fn undefined(
        &mut self,
        inst: &Instruction,
        address: u32,
        faults: &mut FaultUnit,
    ) -> Result<(), Fault> {
        faults.fire_if_not_masked(Fault {
            address: Some(address),
            details: FaultDetails::UndefinedInstruction {
                opcode: u32::from(inst.opcode()),
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
        let trap_armed = self.regs.flags.get(Flag::Trap);
        self.interrupt_shadow = false;
        event!(Level::DEBUG, "{address:#07X}: {inst}");
        match *inst.operation() {
            Operation::Arith {
                op,
                width,
                dst,
                src,
            } => self.op_arith(inst, bus, op, width, &dst, &src)?,
            Operation::Test { width, dst, src } => self.op_test(inst, bus, width, &dst, &src),
            Operation::IncDec { op, width, target } => {
                self.op_inc_dec(inst, bus, op, width, &target)?;
            }
            Operation::Unary { op, width, target } => {
                self.op_unary(inst, bus, op, width, &target)?;
            }
            Operation::MulDiv { op, width, source } => {
                self.op_mul_div(inst, bus, op, width, &source);
            }
            Operation::Shift {
                op,
                width,
                target,
                count,
            } => self.op_shift(inst, bus, op, width, &target, count)?,
            Operation::Adjust(op) => self.op_adjust(op),
            Operation::AsciiAdjustMultiply { base } => self.op_aam(base),
            Operation::AsciiAdjustDivide { base } => self.op_aad(base),
            Operation::Mov { width, dst, src } => {
                let value = self.read_operand(inst, bus, width, &src);
                self.write_operand(inst, bus, width, &dst, value)?;
            }
            Operation::Xchg { width, a, b } => self.op_xchg(inst, bus, width, &a, &b)?,
            Operation::Lea { dst, address } => {
                let offset = self.effective_offset(&address);
                self.regs.set_word(dst, offset);
            }
            Operation::LoadFarPointer {
                segment,
                dst,
                address,
            } => self.op_load_far_pointer(inst, bus, segment, dst, &address),
            Operation::Push(operand) => self.op_push(inst, bus, &operand),
            Operation::Pop(operand) => self.op_pop(inst, bus, &operand)?,
            Operation::PushFlags => {
                let flags = self.regs.flags.bits();
                self.push(bus, flags);
            }
            Operation::PopFlags => {
                let flags = self.pop(bus);
                self.regs.flags.restore(flags);
            }
            Operation::StoreAhIntoFlags => self.op_sahf(),
            Operation::LoadAhFromFlags => self.op_lahf(),
            Operation::ConvertByteToWord => self.op_cbw(),
            Operation::ConvertWordToDouble => self.op_cwd(),
            Operation::Translate => self.op_xlat(inst, bus),
            Operation::JumpConditional {
                condition,
                displacement,
            } => self.op_jcc(condition, displacement),
            Operation::JumpRelative { displacement } => self.add_to_ip(displacement),
            Operation::JumpFar { segment, offset } => self.far_jump(segment, offset),
            Operation::JumpIndirect { target } => {
                self.regs.ip = self.read_operand(inst, bus, Width::Word, &target);
            }
            Operation::JumpFarIndirect { address } => {
                let (segment, offset) = self.read_far_pointer(inst, bus, &address);
                self.far_jump(segment, offset);
            }
            Operation::CallRelative { displacement } => self.op_call_relative(bus, displacement),
            Operation::CallFar { segment, offset } => self.op_call_far(bus, segment, offset),
            Operation::CallIndirect { target } => self.op_call_indirect(inst, bus, &target),
            Operation::CallFarIndirect { address } => {
                let (segment, offset) = self.read_far_pointer(inst, bus, &address);
                self.op_call_far(bus, segment, offset);
            }
            Operation::Return { pop } => self.op_ret(bus, pop),
            Operation::ReturnFar { pop } => self.op_retf(bus, pop),
            Operation::Loop { op, displacement } => self.op_loop(op, displacement),
            Operation::Interrupt { vector } => self.enter_interrupt(bus, vector),
            Operation::InterruptOnOverflow => {
                if self.regs.flags.get(Flag::Overflow) {
                    self.enter_interrupt(bus, vectors::OVERFLOW);
                }
            }
            Operation::InterruptReturn => self.op_iret(bus),
            Operation::String { op, width } => self.op_string(inst, bus, op, width),
            Operation::In { width, port } => self.op_in(bus, faults, address, width, port)?,
            Operation::Out { width, port } => self.op_out(bus, faults, address, width, port)?,
            Operation::Flag(op) => self.op_flag(op),
            Operation::Halt => {
                event!(Level::DEBUG, "halted at {address:#07X}");
                self.halted = true;
            }
            Operation::Wait | Operation::Escape { .. } => (),
            Operation::Unknown => self.undefined(inst, address, faults)?,
        }
        if trap_armed {
            self.trap_pending = true;
        }
        Ok(())
    }

    fn far_jump(&mut self, segment: u16, offset: u16) {
        self.regs.set_segment(SegmentRegister::CS, segment);
        self.regs.ip = offset;
    }

    /// Reads an offset and then a segment from consecutive words.
    fn read_far_pointer(
        &self,
        inst: &Instruction,
        bus: &BusInterfaceUnit,
        address: &EffectiveAddress,
    ) -> (u16, u16) {
        let at = self.locate(inst, address);
        let offset = bus.read(Width::Word, at);
        let segment = bus.read(Width::Word, at.offset_by(2));
        (segment, offset)
    }
}

pub(crate) const fn accumulator(width: Width) -> Register {
    match width {
        Width::Byte => Register::Byte(base::x86::ByteRegister::AL),
        Width::Word => Register::Word(WordRegister::AX),
    }
}

impl Core for ExecutionUnit {
    type Instruction = Instruction;

    fn code_address(&self) -> CodeAddress {
        CodeAddress::Segmented(MemoryLocator::new(
            self.regs.segment(SegmentRegister::CS),
            self.regs.ip,
        ))
    }

    fn advance(&mut self, length: usize) {
        // Instructions are at most a handful of bytes long.
        let length = u16::try_from(length).unwrap_or(u16::MAX);
        self.regs.ip = self.regs.ip.wrapping_add(length);
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

    fn service_interrupts(
        &mut self,
        bus: &mut BusInterfaceUnit,
        inputs: &mut InterruptInputs,
    ) -> bool {
        if let Some(vector) = self.pending_exception.take() {
            self.enter_interrupt(bus, vector);
            return true;
        }
        if self.trap_pending {
            self.trap_pending = false;
            self.enter_interrupt(bus, vectors::SINGLE_STEP);
            return true;
        }
        if inputs.nmi.take() {
            self.enter_interrupt(bus, vectors::NMI);
            return true;
        }
        if self.regs.flags.get(Flag::InterruptEnable) && !self.interrupt_shadow {
            if let Some(vector) = inputs.acknowledge_intr() {
                self.enter_interrupt(bus, vector);
                return true;
            }
        }
        false
    }

    fn register_value(&self, name: &str) -> Option<u32> {
        use SegmentRegister::*;
        use WordRegister::*;
        let value = match name {
            "AX" => self.regs.word(AX),
            "BX" => self.regs.word(BX),
            "CX" => self.regs.word(CX),
            "DX" => self.regs.word(DX),
            "SP" => self.regs.word(SP),
            "BP" => self.regs.word(BP),
            "SI" => self.regs.word(SI),
            "DI" => self.regs.word(DI),
            "CS" => self.regs.segment(CS),
            "DS" => self.regs.segment(DS),
            "ES" => self.regs.segment(ES),
            "SS" => self.regs.segment(SS),
            "IP" => self.regs.ip,
            "FLAGS" => self.regs.flags.bits(),
            _ => return None,
        };
        Some(u32::from(value))
    }

    fn flags_summary(&self) -> String {
        self.regs.flags.to_string()
    }

    fn is_halted(&self) -> bool {
        self.halted
    }
}
