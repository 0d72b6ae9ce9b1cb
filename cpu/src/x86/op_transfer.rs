use base::prelude::*;
use base::x86::{
    ByteRegister, EffectiveAddress, Instruction, Operand, Register, SegmentRegister, WordRegister,
};

use crate::biu::BusInterfaceUnit;
use crate::fault::Fault;
use crate::locator::MemoryLocator;

use super::ExecutionUnit;

/// ## Data transfer
///
/// MOV and LEA are simple enough to be handled in
/// [`ExecutionUnit::execute_instruction`] itself.
impl ExecutionUnit {
    pub(super) fn op_xchg(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        width: Width,
        a: &Operand,
        b: &Operand,
    ) -> Result<(), Fault> {
        let va = self.read_operand(inst, bus, width, a);
        let vb = self.read_operand(inst, bus, width, b);
        self.write_operand(inst, bus, width, a, vb)?;
        self.write_operand(inst, bus, width, b, va)
    }

    /// LDS and LES.
    pub(super) fn op_load_far_pointer(
        &mut self,
        inst: &Instruction,
        bus: &BusInterfaceUnit,
        segment: SegmentRegister,
        dst: WordRegister,
        address: &EffectiveAddress,
    ) {
        let (seg_value, offset) = self.read_far_pointer(inst, bus, address);
        self.regs.set_word(dst, offset);
        self.regs.set_segment(segment, seg_value);
    }

    pub(super) fn op_push(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        operand: &Operand,
    ) {
        let value = match operand {
            // The 8086 pushes the value SP has after the decrement.
            Operand::Register(Register::Word(WordRegister::SP)) => {
                self.regs.word(WordRegister::SP).wrapping_sub(2)
            }
            _ => self.read_operand(inst, bus, Width::Word, operand),
        };
        self.push(bus, value);
    }

    pub(super) fn op_pop(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        operand: &Operand,
    ) -> Result<(), Fault> {
        let value = self.pop(bus);
        self.write_operand(inst, bus, Width::Word, operand, value)
    }

    pub(super) fn op_sahf(&mut self) {
        let ah = self.regs.byte(ByteRegister::AH);
        self.regs.flags.restore_low_byte(ah);
    }

    pub(super) fn op_lahf(&mut self) {
        let low = self.regs.flags.low_byte();
        self.regs.set_byte(ByteRegister::AH, low);
    }

    pub(super) fn op_cbw(&mut self) {
        let al = self.regs.byte(ByteRegister::AL);
        self.regs.set_word(WordRegister::AX, sign_extend_byte(al));
    }

    pub(super) fn op_cwd(&mut self) {
        let dx = if Width::Word.is_negative(self.regs.word(WordRegister::AX)) {
            0xFFFF
        } else {
            0x0000
        };
        self.regs.set_word(WordRegister::DX, dx);
    }

    /// AL is replaced by the byte at BX+AL in the data segment (or
    /// the override segment).
    pub(super) fn op_xlat(&mut self, inst: &Instruction, bus: &BusInterfaceUnit) {
        let segment = inst.prefixes().segment.unwrap_or(SegmentRegister::DS);
        let offset = self
            .regs
            .word(WordRegister::BX)
            .wrapping_add(u16::from(self.regs.byte(ByteRegister::AL)));
        let at = MemoryLocator::new(self.regs.segment(segment), offset);
        let value = bus.read(Width::Byte, at);
        self.regs.write(Register::Byte(ByteRegister::AL), value);
    }
}
