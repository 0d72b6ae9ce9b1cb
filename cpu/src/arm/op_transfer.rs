use base::arm::{HalfwordKind, HalfwordOffset, Indexing, Register, TransferOffset};

use crate::biu::BusInterfaceUnit;

use super::shifter::shift_immediate;
use super::{bank_index, ArmCore};

/// Computes (transfer address, written-back address).
fn addresses(base: u32, offset: u32, indexing: Indexing) -> (u32, u32) {
    let indexed = if indexing.add {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    };
    if indexing.pre_index {
        (indexed, indexed)
    } else {
        (base, indexed)
    }
}

/// A word read at an unaligned address returns the aligned word
/// rotated so that the addressed byte is in the low byte.
fn read_word_rotated(bus: &BusInterfaceUnit, address: u32) -> u32 {
    bus.memory
        .read_u32(address & !3)
        .rotate_right(8 * (address & 3))
}

/// ## Loads and stores
///
/// LDR, STR, LDRB, STRB, LDRH, STRH, LDRSB, LDRSH, LDRD, STRD,
/// LDM, STM, SWP, SWPB.
impl ArmCore {
    fn write_back(&mut self, rn: Register, address: u32) {
        if !rn.is_pc() {
            self.write(rn, address);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn single_transfer(
        &mut self,
        bus: &mut BusInterfaceUnit,
        load: bool,
        byte: bool,
        indexing: Indexing,
        rn: Register,
        rd: Register,
        offset: &TransferOffset,
    ) {
        let offset = match *offset {
            TransferOffset::Immediate(n) => u32::from(n),
            TransferOffset::Register { rm, shift, amount } => {
                shift_immediate(shift, self.read(rm), u32::from(amount), self.carry()).0
            }
        };
        let (address, updated) = addresses(self.read(rn), offset, indexing);
        if load {
            let value = if byte {
                u32::from(bus.memory.read_byte(address))
            } else {
                read_word_rotated(bus, address)
            };
            if indexing.writes_back() {
                self.write_back(rn, updated);
            }
            self.write(rd, value);
        } else {
            let value = self.read(rd);
            if byte {
                bus.memory.write_byte(address, value as u8);
            } else {
                bus.memory.write_u32(address & !3, value);
            }
            if indexing.writes_back() {
                self.write_back(rn, updated);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn halfword_transfer(
        &mut self,
        bus: &mut BusInterfaceUnit,
        load: bool,
        kind: HalfwordKind,
        indexing: Indexing,
        rn: Register,
        rd: Register,
        offset: &HalfwordOffset,
    ) {
        let offset = match *offset {
            HalfwordOffset::Immediate(n) => u32::from(n),
            HalfwordOffset::Register(rm) => self.read(rm),
        };
        let (address, updated) = addresses(self.read(rn), offset, indexing);
        let half = |bus: &BusInterfaceUnit| {
            let lo = bus.memory.read_byte(address & !1);
            let hi = bus.memory.read_byte((address & !1).wrapping_add(1));
            u16::from_le_bytes([lo, hi])
        };
        // The second register of a doubleword pair.
        let rd2 = Register::new((rd.number() as u32) | 1);
        let mut loaded: Vec<(Register, u32)> = Vec::with_capacity(2);
        match (kind, load) {
            (HalfwordKind::UnsignedHalf, true) => loaded.push((rd, u32::from(half(bus)))),
            (HalfwordKind::SignedHalf, _) => loaded.push((rd, half(bus) as i16 as i32 as u32)),
            (HalfwordKind::SignedByte, _) => {
                loaded.push((rd, bus.memory.read_byte(address) as i8 as i32 as u32));
            }
            (HalfwordKind::UnsignedHalf, false) => {
                let [lo, hi] = (self.read(rd) as u16).to_le_bytes();
                bus.memory.write_byte(address & !1, lo);
                bus.memory.write_byte((address & !1).wrapping_add(1), hi);
            }
            (HalfwordKind::Double, true) => {
                let aligned = address & !3;
                loaded.push((rd, bus.memory.read_u32(aligned)));
                loaded.push((rd2, bus.memory.read_u32(aligned.wrapping_add(4))));
            }
            (HalfwordKind::Double, false) => {
                let aligned = address & !3;
                bus.memory.write_u32(aligned, self.read(rd));
                bus.memory.write_u32(aligned.wrapping_add(4), self.read(rd2));
            }
        }
        if indexing.writes_back() {
            self.write_back(rn, updated);
        }
        for (r, value) in loaded {
            self.write(r, value);
        }
    }

    /// Reads register `n` of the User mode bank (for LDM/STM with the
    /// S bit).
    fn user_register(&self, n: usize) -> u32 {
        match n {
            13 if bank_index(self.cpsr) != 0 => self.banks[0].sp,
            14 if bank_index(self.cpsr) != 0 => self.banks[0].lr,
            _ => self.read(Register::new(n as u32)),
        }
    }

    fn set_user_register(&mut self, n: usize, value: u32) {
        match n {
            13 if bank_index(self.cpsr) != 0 => self.banks[0].sp = value,
            14 if bank_index(self.cpsr) != 0 => self.banks[0].lr = value,
            _ => self.write(Register::new(n as u32), value),
        }
    }

    pub(super) fn block_transfer(
        &mut self,
        bus: &mut BusInterfaceUnit,
        load: bool,
        indexing: Indexing,
        user_bank: bool,
        rn: Register,
        registers: u16,
    ) {
        let count = registers.count_ones();
        if count == 0 {
            return;
        }
        let base = self.read(rn);
        let span = 4 * count;
        let mut address = match (indexing.add, indexing.pre_index) {
            (true, false) => base,
            (true, true) => base.wrapping_add(4),
            (false, false) => base.wrapping_sub(span).wrapping_add(4),
            (false, true) => base.wrapping_sub(span),
        };
        let updated = if indexing.add {
            base.wrapping_add(span)
        } else {
            base.wrapping_sub(span)
        };
        let includes_pc = registers & 0x8000 != 0;
        // With the S bit, LDM including PC is an exception return;
        // otherwise S selects the User mode registers.
        let user_registers = user_bank && !(load && includes_pc);
        let listed = (0..16).filter(|n| registers & (1 << n) != 0);

        if load {
            let values: Vec<(usize, u32)> = listed
                .map(|n| {
                    let value = bus.memory.read_u32(address);
                    address = address.wrapping_add(4);
                    (n, value)
                })
                .collect();
            if indexing.write_back && registers & (1 << rn.number()) == 0 {
                self.write_back(rn, updated);
            }
            for (n, value) in values {
                if user_registers {
                    self.set_user_register(n, value);
                } else {
                    self.write(Register::new(n as u32), value);
                }
            }
            if user_bank && includes_pc {
                self.return_from_exception();
            }
        } else {
            for n in listed {
                let value = if user_registers {
                    self.user_register(n)
                } else {
                    self.read(Register::new(n as u32))
                };
                bus.memory.write_u32(address, value);
                address = address.wrapping_add(4);
            }
            if indexing.write_back {
                self.write_back(rn, updated);
            }
        }
    }

    pub(super) fn swap(
        &mut self,
        bus: &mut BusInterfaceUnit,
        byte: bool,
        rn: Register,
        rd: Register,
        rm: Register,
    ) {
        let address = self.read(rn);
        let incoming = self.read(rm);
        let old = if byte {
            let old = u32::from(bus.memory.read_byte(address));
            bus.memory.write_byte(address, incoming as u8);
            old
        } else {
            let old = read_word_rotated(bus, address);
            bus.memory.write_u32(address & !3, incoming);
            old
        };
        self.write(rd, old);
    }
}
