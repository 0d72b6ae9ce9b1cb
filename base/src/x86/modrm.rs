//! Decoding of the ModRM byte and the displacement which may follow
//! it.
//!
//! ```text
//!   7   6 5     3 2     0
//! +------+-------+-------+
//! | mod  |  reg  |  r/m  |
//! +------+-------+-------+
//! ```
//!
//! `mod` = 11 selects a register operand named by `r/m`.  The other
//! values of `mod` select a memory operand whose address is formed
//! from the registers named by `r/m` plus no displacement (00), a
//! sign-extended 8-bit displacement (01) or a 16-bit displacement
//! (10).  The combination `mod` = 00, `r/m` = 110 (which would be
//! "[BP]" with no displacement) instead selects a direct 16-bit
//! address.
use crate::bitfield::sign_extend_byte;
use crate::instruction::DecodeFailure;
use crate::source::Cursor;
use crate::width::Width;

use super::operand::{AddressBase, EffectiveAddress, Operand};
use super::registers::Register;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModRm {
    pub mode: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRm {
    #[must_use]
    pub const fn from_byte(b: u8) -> ModRm {
        ModRm {
            mode: b >> 6,
            reg: (b >> 3) & 7,
            rm: b & 7,
        }
    }

    #[must_use]
    pub const fn is_register(&self) -> bool {
        self.mode == 0b11
    }

    pub(crate) fn read(cursor: &mut Cursor) -> Result<ModRm, DecodeFailure> {
        cursor.next_byte().map(ModRm::from_byte)
    }
}

/// Reads the displacement (if any) selected by `modrm` and returns
/// the memory operand it describes.  Must not be called for
/// register-direct (`mod` = 11) encodings.
pub(crate) fn read_effective_address(
    cursor: &mut Cursor,
    modrm: ModRm,
) -> Result<EffectiveAddress, DecodeFailure> {
    match (modrm.mode, modrm.rm) {
        (0b00, 0b110) => Ok(EffectiveAddress::direct(cursor.next_word()?)),
        (0b00, rm) => Ok(EffectiveAddress {
            base: AddressBase::from_rm(rm),
            displacement: 0,
            displacement_bytes: 0,
        }),
        (0b01, rm) => Ok(EffectiveAddress {
            base: AddressBase::from_rm(rm),
            displacement: sign_extend_byte(cursor.next_byte()?),
            displacement_bytes: 1,
        }),
        (_, rm) => Ok(EffectiveAddress {
            base: AddressBase::from_rm(rm),
            displacement: cursor.next_word()?,
            displacement_bytes: 2,
        }),
    }
}

/// Decodes the `r/m` operand of `modrm`, reading any displacement.
pub(crate) fn read_rm_operand(
    cursor: &mut Cursor,
    modrm: ModRm,
    width: Width,
) -> Result<Operand, DecodeFailure> {
    if modrm.is_register() {
        Ok(Operand::Register(Register::from_index(width, modrm.rm)))
    } else {
        read_effective_address(cursor, modrm).map(Operand::Memory)
    }
}

/// Decodes the `reg` field of `modrm` as a general register.
#[must_use]
pub(crate) fn reg_operand(modrm: ModRm, width: Width) -> Operand {
    Operand::Register(Register::from_index(width, modrm.reg))
}

/// Reads an immediate operand of the given width.
pub(crate) fn read_immediate(cursor: &mut Cursor, width: Width) -> Result<u16, DecodeFailure> {
    match width {
        Width::Byte => cursor.next_byte().map(u16::from),
        Width::Word => cursor.next_word(),
    }
}

/// Number of displacement bytes implied by a ModRM byte.
#[must_use]
pub const fn displacement_length(modrm: ModRm) -> usize {
    match (modrm.mode, modrm.rm) {
        (0b00, 0b110) => 2,
        (0b00, _) | (0b11, _) => 0,
        (0b01, _) => 1,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86::registers::{ByteRegister, WordRegister};

    fn decode_rm(bytes: &[u8], width: Width) -> (Operand, usize) {
        let mut source: &[u8] = bytes;
        let mut cursor = Cursor::new(&mut source, 0);
        let modrm = ModRm::read(&mut cursor).expect("test data has a ModRM byte");
        let operand = read_rm_operand(&mut cursor, modrm, width).expect("test data is complete");
        (operand, cursor.consumed())
    }

    #[test]
    fn test_fields() {
        let m = ModRm::from_byte(0b10_011_101);
        assert_eq!(m.mode, 2);
        assert_eq!(m.reg, 3);
        assert_eq!(m.rm, 5);
    }

    #[test]
    fn test_register_direct() {
        assert_eq!(
            decode_rm(&[0b11_000_011], Width::Byte),
            (Operand::Register(Register::Byte(ByteRegister::BL)), 1)
        );
        assert_eq!(
            decode_rm(&[0b11_000_100], Width::Word),
            (Operand::Register(Register::Word(WordRegister::SP)), 1)
        );
    }

    #[test]
    fn test_direct_address() {
        assert_eq!(
            decode_rm(&[0b00_000_110, 0x34, 0x12], Width::Word),
            (Operand::Memory(EffectiveAddress::direct(0x1234)), 3)
        );
    }

    #[test]
    fn test_negative_disp8_is_sign_extended() {
        let (operand, len) = decode_rm(&[0b01_000_110, 0xFE], Width::Word);
        assert_eq!(len, 2);
        assert_eq!(
            operand,
            Operand::Memory(EffectiveAddress {
                base: AddressBase::Bp,
                displacement: 0xFFFE,
                displacement_bytes: 1,
            })
        );
    }

    #[test]
    fn test_disp16_is_verbatim() {
        let (operand, len) = decode_rm(&[0b10_000_000, 0x80, 0xFF], Width::Byte);
        assert_eq!(len, 3);
        assert_eq!(
            operand,
            Operand::Memory(EffectiveAddress {
                base: AddressBase::BxSi,
                displacement: 0xFF80,
                displacement_bytes: 2,
            })
        );
    }

    #[test]
    fn test_displacement_length_agrees_with_decode() {
        for b in 0..=255_u8 {
            let modrm = ModRm::from_byte(b);
            let (_, len) = decode_rm(&[b, 0, 0], Width::Word);
            assert_eq!(len, 1 + displacement_length(modrm), "ModRM {b:#04x}");
        }
    }
}
