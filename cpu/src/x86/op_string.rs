use base::prelude::*;
use base::x86::{Instruction, Repeat, SegmentRegister, StringOp, WordRegister};

use crate::alu;
use crate::biu::BusInterfaceUnit;
use crate::flags::Flag;
use crate::locator::MemoryLocator;

use super::ExecutionUnit;

/// ## String instructions
///
/// The source is DS:SI (the segment can be overridden) and the
/// destination is ES:DI (it cannot).  SI and DI move by the operand
/// size, downwards when DF is set.
///
/// With a REP prefix the operation repeats CX times.  For CMPS and
/// SCAS, REPE also stops when ZF is clear and REPNE when ZF is set.
/// The whole repetition happens within one call; it is not
/// interruptible.
impl ExecutionUnit {
    pub(super) fn op_string(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        op: StringOp,
        width: Width,
    ) {
        let Some(repeat) = inst.prefixes().repeat else {
            self.string_step(inst, bus, op, width);
            return;
        };
        loop {
            let cx = self.regs.word(WordRegister::CX);
            if cx == 0 {
                break;
            }
            self.string_step(inst, bus, op, width);
            self.regs.set_word(WordRegister::CX, cx - 1);
            if op.compares() {
                let zf = self.regs.flags.get(Flag::Zero);
                let stop = match repeat {
                    Repeat::Equal => !zf,
                    Repeat::NotEqual => zf,
                };
                if stop {
                    break;
                }
            }
        }
    }

    fn string_source(&self, inst: &Instruction) -> MemoryLocator {
        let segment = inst.prefixes().segment.unwrap_or(SegmentRegister::DS);
        MemoryLocator::new(self.regs.segment(segment), self.regs.word(WordRegister::SI))
    }

    fn string_destination(&self) -> MemoryLocator {
        MemoryLocator::new(
            self.regs.segment(SegmentRegister::ES),
            self.regs.word(WordRegister::DI),
        )
    }

    fn step_index(&mut self, reg: WordRegister, width: Width) {
        let value = self.regs.word(reg);
        let value = if self.regs.flags.get(Flag::Direction) {
            value.wrapping_sub(width.bytes())
        } else {
            value.wrapping_add(width.bytes())
        };
        self.regs.set_word(reg, value);
    }

    fn string_step(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        op: StringOp,
        width: Width,
    ) {
        match op {
            StringOp::Movs => {
                let value = bus.read(width, self.string_source(inst));
                bus.write(width, self.string_destination(), value);
                self.step_index(WordRegister::SI, width);
                self.step_index(WordRegister::DI, width);
            }
            StringOp::Cmps => {
                let a = bus.read(width, self.string_source(inst));
                let b = bus.read(width, self.string_destination());
                alu::cmp(&mut self.regs.flags, width, a, b);
                self.step_index(WordRegister::SI, width);
                self.step_index(WordRegister::DI, width);
            }
            StringOp::Stos => {
                let value = self.accumulator(width);
                bus.write(width, self.string_destination(), value);
                self.step_index(WordRegister::DI, width);
            }
            StringOp::Lods => {
                let value = bus.read(width, self.string_source(inst));
                self.set_accumulator(width, value);
                self.step_index(WordRegister::SI, width);
            }
            StringOp::Scas => {
                let a = self.accumulator(width);
                let b = bus.read(width, self.string_destination());
                alu::cmp(&mut self.regs.flags, width, a, b);
                self.step_index(WordRegister::DI, width);
            }
        }
    }
}
