use base::prelude::*;
use base::x86::{Condition, Instruction, LoopOp, Operand, SegmentRegister, WordRegister};

use crate::biu::BusInterfaceUnit;
use crate::flags::{Flag, Flags};

use super::ExecutionUnit;

/// Evaluates a Jcc condition.  Each odd-numbered condition is the
/// negation of the even-numbered one before it.
pub(crate) fn condition_holds(flags: &Flags, condition: Condition) -> bool {
    let of = flags.get(Flag::Overflow);
    let cf = flags.get(Flag::Carry);
    let zf = flags.get(Flag::Zero);
    let sf = flags.get(Flag::Sign);
    let pf = flags.get(Flag::Parity);
    let positive = match condition {
        Condition::Overflow | Condition::NotOverflow => of,
        Condition::Below | Condition::AboveOrEqual => cf,
        Condition::Equal | Condition::NotEqual => zf,
        Condition::BelowOrEqual | Condition::Above => cf || zf,
        Condition::Sign | Condition::NotSign => sf,
        Condition::Parity | Condition::NotParity => pf,
        Condition::Less | Condition::GreaterOrEqual => sf != of,
        Condition::LessOrEqual | Condition::Greater => zf || sf != of,
    };
    positive != condition.is_negated()
}

/// ## Control transfer
///
/// Relative displacements are added to IP after it has been advanced
/// past the instruction, so they are relative to the following
/// instruction.
impl ExecutionUnit {
    pub(super) fn op_jcc(&mut self, condition: Condition, displacement: i8) {
        if condition_holds(&self.regs.flags, condition) {
            self.add_to_ip(i16::from(displacement));
        }
    }

    pub(super) fn op_call_relative(&mut self, bus: &mut BusInterfaceUnit, displacement: i16) {
        let ip = self.regs.ip;
        self.push(bus, ip);
        self.add_to_ip(displacement);
    }

    pub(super) fn op_call_far(&mut self, bus: &mut BusInterfaceUnit, segment: u16, offset: u16) {
        let cs = self.regs.segment(SegmentRegister::CS);
        self.push(bus, cs);
        let ip = self.regs.ip;
        self.push(bus, ip);
        self.far_jump(segment, offset);
    }

    pub(super) fn op_call_indirect(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        target: &Operand,
    ) {
        // The target is read before the return address is pushed,
        // since it may itself be on the stack.
        let target = self.read_operand(inst, bus, Width::Word, target);
        let ip = self.regs.ip;
        self.push(bus, ip);
        self.regs.ip = target;
    }

    fn release_stack(&mut self, bytes: u16) {
        let sp = self.regs.word(WordRegister::SP).wrapping_add(bytes);
        self.regs.set_word(WordRegister::SP, sp);
    }

    pub(super) fn op_ret(&mut self, bus: &mut BusInterfaceUnit, pop: u16) {
        self.regs.ip = self.pop(bus);
        self.release_stack(pop);
    }

    pub(super) fn op_retf(&mut self, bus: &mut BusInterfaceUnit, pop: u16) {
        self.regs.ip = self.pop(bus);
        let cs = self.pop(bus);
        self.regs.set_segment(SegmentRegister::CS, cs);
        self.release_stack(pop);
    }

    pub(super) fn op_iret(&mut self, bus: &mut BusInterfaceUnit) {
        self.regs.ip = self.pop(bus);
        let cs = self.pop(bus);
        self.regs.set_segment(SegmentRegister::CS, cs);
        let flags = self.pop(bus);
        self.regs.flags.restore(flags);
    }

    /// LOOP, LOOPE and LOOPNE decrement CX (without changing the
    /// flags) before testing it; JCXZ only tests it.
    pub(super) fn op_loop(&mut self, op: LoopOp, displacement: i8) {
        let cx = match op {
            LoopOp::Jcxz => self.regs.word(WordRegister::CX),
            _ => {
                let cx = self.regs.word(WordRegister::CX).wrapping_sub(1);
                self.regs.set_word(WordRegister::CX, cx);
                cx
            }
        };
        let zf = self.regs.flags.get(Flag::Zero);
        let taken = match op {
            LoopOp::Loop => cx != 0,
            LoopOp::Loope => cx != 0 && zf,
            LoopOp::Loopne => cx != 0 && !zf,
            LoopOp::Jcxz => cx == 0,
        };
        if taken {
            self.add_to_ip(i16::from(displacement));
        }
    }
}
