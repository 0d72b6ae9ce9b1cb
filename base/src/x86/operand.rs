//! Operands of decoded 8086 instructions.
use serde::Serialize;

use super::registers::{Register, SegmentRegister, WordRegister};

/// The register combination selected by the `rm` field of a ModRM
/// byte in one of the memory addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AddressBase {
    BxSi,
    BxDi,
    BpSi,
    BpDi,
    Si,
    Di,
    Bp,
    Bx,
    /// No registers; the displacement is the whole address.
    Direct,
}

impl AddressBase {
    #[must_use]
    pub const fn from_rm(rm: u8) -> AddressBase {
        match rm & 7 {
            0 => AddressBase::BxSi,
            1 => AddressBase::BxDi,
            2 => AddressBase::BpSi,
            3 => AddressBase::BpDi,
            4 => AddressBase::Si,
            5 => AddressBase::Di,
            6 => AddressBase::Bp,
            _ => AddressBase::Bx,
        }
    }

    /// The (base, index) registers which are summed to form the
    /// effective address.
    #[must_use]
    pub const fn registers(self) -> (Option<WordRegister>, Option<WordRegister>) {
        use WordRegister::*;
        match self {
            AddressBase::BxSi => (Some(BX), Some(SI)),
            AddressBase::BxDi => (Some(BX), Some(DI)),
            AddressBase::BpSi => (Some(BP), Some(SI)),
            AddressBase::BpDi => (Some(BP), Some(DI)),
            AddressBase::Si => (None, Some(SI)),
            AddressBase::Di => (None, Some(DI)),
            AddressBase::Bp => (Some(BP), None),
            AddressBase::Bx => (Some(BX), None),
            AddressBase::Direct => (None, None),
        }
    }

    /// Addresses formed from BP are relative to the stack segment.
    #[must_use]
    pub const fn default_segment(self) -> SegmentRegister {
        match self {
            AddressBase::BpSi | AddressBase::BpDi | AddressBase::Bp => SegmentRegister::SS,
            _ => SegmentRegister::DS,
        }
    }
}

/// A memory operand: the sum of some registers and a displacement,
/// taken modulo 2^16, within some segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EffectiveAddress {
    pub base: AddressBase,
    /// The displacement.  8-bit displacements have already been sign
    /// extended; direct addresses are stored here verbatim.
    pub displacement: u16,
    /// The number of displacement bytes present in the encoding.
    pub displacement_bytes: u8,
}

impl EffectiveAddress {
    #[must_use]
    pub const fn direct(address: u16) -> EffectiveAddress {
        EffectiveAddress {
            base: AddressBase::Direct,
            displacement: address,
            displacement_bytes: 2,
        }
    }

    #[must_use]
    pub const fn default_segment(&self) -> SegmentRegister {
        self.base.default_segment()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operand {
    Register(Register),
    Segment(SegmentRegister),
    Memory(EffectiveAddress),
    /// An immediate value, already sign-extended where the encoding
    /// calls for it.
    Immediate(u16),
}

impl Operand {
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Operand::Memory(_))
    }

    #[must_use]
    pub const fn is_register(&self) -> bool {
        matches!(self, Operand::Register(_))
    }
}

/// Port selection for IN and OUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Port {
    Immediate(u8),
    Dx,
}
