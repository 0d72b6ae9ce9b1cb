use base::x86::FlagOp;

use crate::flags::Flag;

use super::ExecutionUnit;

impl ExecutionUnit {
    pub(super) fn op_flag(&mut self, op: FlagOp) {
        let flags = &mut self.regs.flags;
        match op {
            FlagOp::Clc => flags.set(Flag::Carry, false),
            FlagOp::Stc => flags.set(Flag::Carry, true),
            FlagOp::Cmc => {
                let carry = flags.get(Flag::Carry);
                flags.set(Flag::Carry, !carry);
            }
            FlagOp::Cli => flags.set(Flag::InterruptEnable, false),
            FlagOp::Sti => {
                flags.set(Flag::InterruptEnable, true);
                // Interrupts are recognised only after the next
                // instruction.
                self.interrupt_shadow = true;
            }
            FlagOp::Cld => flags.set(Flag::Direction, false),
            FlagOp::Std => flags.set(Flag::Direction, true),
        }
    }
}
