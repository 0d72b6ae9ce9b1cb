use base::prelude::*;
use base::x86::{
    AdjustOp, ArithOp, ByteRegister, IncDecOp, Instruction, MulDivOp, Operand, ShiftCount,
    ShiftOp, UnaryOp, WordRegister,
};

use crate::alu;
use crate::biu::BusInterfaceUnit;
use crate::fault::Fault;

use super::{vectors, ExecutionUnit};

/// ## Arithmetic and logic
///
/// - ADD, OR, ADC, SBB, AND, SUB, XOR, CMP: [`ExecutionUnit::op_arith`]
/// - TEST: [`ExecutionUnit::op_test`]
/// - INC, DEC: [`ExecutionUnit::op_inc_dec`]
/// - NOT, NEG: [`ExecutionUnit::op_unary`]
/// - MUL, IMUL, DIV, IDIV: [`ExecutionUnit::op_mul_div`]
/// - shifts and rotates: [`ExecutionUnit::op_shift`]
/// - DAA, DAS, AAA, AAS, AAM, AAD
impl ExecutionUnit {
    pub(super) fn op_arith(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        op: ArithOp,
        width: Width,
        dst: &Operand,
        src: &Operand,
    ) -> Result<(), Fault> {
        let a = self.read_operand(inst, bus, width, dst);
        let b = self.read_operand(inst, bus, width, src);
        let flags = &mut self.regs.flags;
        let result = match op {
            ArithOp::Add => alu::add(flags, width, a, b),
            ArithOp::Or => alu::or(flags, width, a, b),
            ArithOp::Adc => alu::adc(flags, width, a, b),
            ArithOp::Sbb => alu::sbb(flags, width, a, b),
            ArithOp::And => alu::and(flags, width, a, b),
            ArithOp::Sub => alu::sub(flags, width, a, b),
            ArithOp::Xor => alu::xor(flags, width, a, b),
            ArithOp::Cmp => {
                alu::cmp(flags, width, a, b);
                return Ok(());
            }
        };
        self.write_operand(inst, bus, width, dst, result)
    }

    pub(super) fn op_test(
        &mut self,
        inst: &Instruction,
        bus: &BusInterfaceUnit,
        width: Width,
        dst: &Operand,
        src: &Operand,
    ) {
        let a = self.read_operand(inst, bus, width, dst);
        let b = self.read_operand(inst, bus, width, src);
        alu::test(&mut self.regs.flags, width, a, b);
    }

    pub(super) fn op_inc_dec(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        op: IncDecOp,
        width: Width,
        target: &Operand,
    ) -> Result<(), Fault> {
        let a = self.read_operand(inst, bus, width, target);
        let result = match op {
            IncDecOp::Inc => alu::inc(&mut self.regs.flags, width, a),
            IncDecOp::Dec => alu::dec(&mut self.regs.flags, width, a),
        };
        self.write_operand(inst, bus, width, target, result)
    }

    pub(super) fn op_unary(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        op: UnaryOp,
        width: Width,
        target: &Operand,
    ) -> Result<(), Fault> {
        let a = self.read_operand(inst, bus, width, target);
        let result = match op {
            UnaryOp::Not => alu::not(width, a),
            UnaryOp::Neg => alu::neg(&mut self.regs.flags, width, a),
        };
        self.write_operand(inst, bus, width, target, result)
    }

    /// The byte forms operate on AL and leave their result in AX (or
    /// AL and AH); the word forms use AX and DX.  A quotient which
    /// does not fit raises the divide error exception and leaves the
    /// registers alone.
    pub(super) fn op_mul_div(
        &mut self,
        inst: &Instruction,
        bus: &BusInterfaceUnit,
        op: MulDivOp,
        width: Width,
        source: &Operand,
    ) {
        let operand = self.read_operand(inst, bus, width, source);
        let signed = matches!(op, MulDivOp::Imul | MulDivOp::Idiv);
        match op {
            MulDivOp::Mul | MulDivOp::Imul => {
                let a = self.accumulator(width);
                let product = alu::multiply(&mut self.regs.flags, width, signed, a, operand);
                let [lo, hi] = split(product);
                match width {
                    Width::Byte => self.regs.set_word(WordRegister::AX, lo),
                    Width::Word => {
                        self.regs.set_word(WordRegister::AX, lo);
                        self.regs.set_word(WordRegister::DX, hi);
                    }
                }
            }
            MulDivOp::Div | MulDivOp::Idiv => {
                let dividend = match width {
                    Width::Byte => u32::from(self.regs.word(WordRegister::AX)),
                    Width::Word => {
                        u32::from(self.regs.word(WordRegister::DX)) << 16
                            | u32::from(self.regs.word(WordRegister::AX))
                    }
                };
                match alu::divide(width, signed, dividend, operand) {
                    Ok((quotient, remainder)) => match width {
                        Width::Byte => {
                            self.regs.set_byte(ByteRegister::AL, low_byte(quotient));
                            self.regs.set_byte(ByteRegister::AH, low_byte(remainder));
                        }
                        Width::Word => {
                            self.regs.set_word(WordRegister::AX, quotient);
                            self.regs.set_word(WordRegister::DX, remainder);
                        }
                    },
                    Err(_) => self.raise_exception(vectors::DIVIDE_ERROR),
                }
            }
        }
    }

    pub(super) fn op_shift(
        &mut self,
        inst: &Instruction,
        bus: &mut BusInterfaceUnit,
        op: ShiftOp,
        width: Width,
        target: &Operand,
        count: ShiftCount,
    ) -> Result<(), Fault> {
        let count = match count {
            ShiftCount::One => 1,
            ShiftCount::Cl => self.regs.byte(ByteRegister::CL),
        };
        let value = self.read_operand(inst, bus, width, target);
        let result = alu::shift(&mut self.regs.flags, op, width, value, count);
        self.write_operand(inst, bus, width, target, result)
    }

    pub(super) fn op_adjust(&mut self, op: AdjustOp) {
        match op {
            AdjustOp::Daa | AdjustOp::Das => {
                let al = self.regs.byte(ByteRegister::AL);
                let flags = &mut self.regs.flags;
                let adjusted = if op == AdjustOp::Daa {
                    alu::daa(flags, al)
                } else {
                    alu::das(flags, al)
                };
                self.regs.set_byte(ByteRegister::AL, adjusted);
            }
            AdjustOp::Aaa | AdjustOp::Aas => {
                let ax = self.regs.word(WordRegister::AX);
                let flags = &mut self.regs.flags;
                let adjusted = if op == AdjustOp::Aaa {
                    alu::aaa(flags, ax)
                } else {
                    alu::aas(flags, ax)
                };
                self.regs.set_word(WordRegister::AX, adjusted);
            }
        }
    }

    pub(super) fn op_aam(&mut self, base: u8) {
        let al = self.regs.byte(ByteRegister::AL);
        match alu::aam(&mut self.regs.flags, al, base) {
            Ok(ax) => self.regs.set_word(WordRegister::AX, ax),
            Err(_) => self.raise_exception(vectors::DIVIDE_ERROR),
        }
    }

    pub(super) fn op_aad(&mut self, base: u8) {
        let ax = self.regs.word(WordRegister::AX);
        let adjusted = alu::aad(&mut self.regs.flags, ax, base);
        self.regs.set_word(WordRegister::AX, adjusted);
    }
}

fn split(value: u32) -> [u16; 2] {
    [(value & 0xFFFF) as u16, (value >> 16) as u16]
}

fn low_byte(value: u16) -> u8 {
    (value & 0xFF) as u8
}
