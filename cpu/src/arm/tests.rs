use base::arm::Instruction;

use super::*;
use crate::fault::FaultKind;
use crate::interrupt::InterruptLine;
use crate::io::DeviceManager;
use crate::memory::{MemoryConfiguration, MemoryUnit};

const ORIGIN: u32 = 0x100;
const DATA: u32 = 0x800;

struct Machine {
    core: ArmCore,
    bus: BusInterfaceUnit,
    faults: FaultUnit,
    inputs: InterruptInputs,
}

/// Loads `code` at `ORIGIN` and starts the core there, in the reset
/// state (Supervisor mode, IRQ and FIQ disabled).
fn setup(code: &[u32]) -> Machine {
    let mut memory = MemoryUnit::new(&MemoryConfiguration {
        size: 0x1_0000,
        rom_start: None,
    });
    let bytes: Vec<u8> = code.iter().flat_map(|w| w.to_le_bytes()).collect();
    memory
        .load_image(ORIGIN, &bytes)
        .expect("test code should fit");
    let mut core = ArmCore::new();
    core.set_entry_point(ORIGIN);
    Machine {
        core,
        bus: BusInterfaceUnit::new(memory, DeviceManager::new(), 8, 4),
        faults: FaultUnit::new(),
        inputs: InterruptInputs::default(),
    }
}

impl Machine {
    fn step(&mut self) -> Result<(), Fault> {
        let address = self.core.fetch_address();
        let inst = Instruction::from_word(self.bus.memory.read_u32(address));
        self.core.advance(4);
        self.core
            .execute_instruction(&inst, address, &mut self.bus, &mut self.faults)
    }

    fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step().expect("instruction should not fault");
        }
    }

    fn reg(&self, n: u32) -> u32 {
        self.core.register(Register::new(n))
    }

    fn set_reg(&mut self, n: u32, value: u32) {
        self.core.set_register(Register::new(n), value);
    }

    fn flag(&self, mask: u32) -> bool {
        self.core.cpsr() & mask != 0
    }

    fn mode(&self) -> u32 {
        self.core.cpsr() & psr::MODE
    }

    fn word_at(&self, address: u32) -> u32 {
        self.bus.memory.read_u32(address)
    }
}

#[test]
fn test_arithmetic_and_conditions() {
    let mut m = setup(&[
        0xE3A0_0005, // MOV R0, #5
        0xE3A0_1003, // MOV R1, #3
        0xE080_2001, // ADD R2, R0, R1
        0xE051_3000, // SUBS R3, R1, R0
        0xE150_0000, // CMP R0, R0
        0x03A0_4001, // MOVEQ R4, #1
        0x13A0_5001, // MOVNE R5, #1
    ]);
    m.steps(4);
    assert_eq!(m.reg(2), 8);
    assert_eq!(m.reg(3), 0xFFFF_FFFE);
    assert!(m.flag(psr::N));
    // 3 - 5 borrows, so C is clear.
    assert!(!m.flag(psr::C));
    m.steps(3);
    assert!(m.flag(psr::Z));
    assert!(m.flag(psr::C));
    assert!(!m.flag(psr::N));
    assert_eq!(m.reg(4), 1);
    assert_eq!(m.reg(5), 0);
    assert_eq!(m.core.fetch_address(), ORIGIN + 7 * 4);
}

#[test]
fn test_shifter_operands() {
    let mut m = setup(&[
        0xE3A0_1003, // MOV R1, #3
        0xE1B0_00A1, // MOVS R0, R1, LSR #1
        0xE1A0_0101, // MOV R0, R1, LSL #2
        0xE3A0_0C01, // MOV R0, #0x100
        0xE3E0_2000, // MVN R2, #0
    ]);
    m.steps(2);
    assert_eq!(m.reg(0), 1);
    assert!(m.flag(psr::C));
    m.step().expect("MOV should not fault");
    assert_eq!(m.reg(0), 12);
    m.steps(2);
    assert_eq!(m.reg(0), 0x100);
    assert_eq!(m.reg(2), 0xFFFF_FFFF);
}

#[test]
fn test_pc_reads_as_address_plus_eight() {
    let mut m = setup(&[
        0xE1A0_000F, // MOV R0, PC
    ]);
    m.steps(1);
    assert_eq!(m.reg(0), ORIGIN + 8);
}

#[test]
fn test_multiply() {
    let mut m = setup(&[
        0xE3A0_0006, // MOV R0, #6
        0xE3A0_1007, // MOV R1, #7
        0xE002_0190, // MUL R2, R0, R1
        0xE3E0_0000, // MVN R0, #0
        0xE3A0_1002, // MOV R1, #2
        0xE083_2190, // UMULL R2, R3, R0, R1
        0xE0C5_4190, // SMULL R4, R5, R0, R1
    ]);
    m.steps(3);
    assert_eq!(m.reg(2), 42);
    m.steps(3);
    assert_eq!(m.reg(2), 0xFFFF_FFFE);
    assert_eq!(m.reg(3), 1);
    m.steps(1);
    // -1 * 2
    assert_eq!(m.reg(4), 0xFFFF_FFFE);
    assert_eq!(m.reg(5), 0xFFFF_FFFF);
}

#[test]
fn test_branch_link_and_return() {
    let mut m = setup(&[
        0xEB00_0002, // BL ORIGIN+0x10
        0xE3A0_2002, // MOV R2, #2
        0xEAFF_FFFE, // B .
        0x0000_0000,
        0xE3A0_0001, // MOV R0, #1
        0xE12F_FF1E, // BX LR
    ]);
    m.steps(1);
    assert_eq!(m.core.fetch_address(), ORIGIN + 0x10);
    assert_eq!(m.reg(14), ORIGIN + 4);
    m.steps(3);
    assert_eq!(m.reg(0), 1);
    assert_eq!(m.reg(2), 2);
    assert_eq!(m.core.fetch_address(), ORIGIN + 8);
    // B . branches to itself.
    m.steps(1);
    assert_eq!(m.core.fetch_address(), ORIGIN + 8);
}

#[test]
fn test_single_transfers() {
    let mut m = setup(&[
        0xE590_1000, // LDR R1, [R0]
        0xE5A0_1004, // STR R1, [R0, #4]!
        0xE5D0_2001, // LDRB R2, [R0, #1]
        0xE490_3004, // LDR R3, [R0], #4
    ]);
    m.bus.memory.write_u32(DATA, 0x1122_3344);
    m.set_reg(0, DATA);
    m.steps(2);
    assert_eq!(m.reg(1), 0x1122_3344);
    assert_eq!(m.word_at(DATA + 4), 0x1122_3344);
    assert_eq!(m.reg(0), DATA + 4);
    m.steps(1);
    assert_eq!(m.reg(2), 0x33);
    assert_eq!(m.reg(0), DATA + 4);
    m.steps(1);
    assert_eq!(m.reg(3), 0x1122_3344);
    assert_eq!(m.reg(0), DATA + 8);
}

#[test]
fn test_unaligned_load_rotates() {
    let mut m = setup(&[
        0xE590_1000, // LDR R1, [R0]
    ]);
    m.bus.memory.write_u32(DATA, 0x1122_3344);
    m.set_reg(0, DATA + 1);
    m.steps(1);
    assert_eq!(m.reg(1), 0x4411_2233);
}

#[test]
fn test_halfword_and_signed_loads() {
    let mut m = setup(&[
        0xE1D0_10B0, // LDRH R1, [R0]
        0xE1D0_20D0, // LDRSB R2, [R0]
        0xE1D0_30F0, // LDRSH R3, [R0]
        0xE1C0_10B4, // STRH R1, [R0, #4]
    ]);
    m.bus.memory.write_u32(DATA, 0x0000_80F0);
    m.set_reg(0, DATA);
    m.steps(4);
    assert_eq!(m.reg(1), 0x80F0);
    assert_eq!(m.reg(2), 0xFFFF_FFF0);
    assert_eq!(m.reg(3), 0xFFFF_80F0);
    assert_eq!(m.word_at(DATA + 4), 0x80F0);
}

#[test]
fn test_block_transfer_round_trip() {
    let mut m = setup(&[
        0xE3A0_DA01, // MOV SP, #0x1000
        0xE3A0_0001, // MOV R0, #1
        0xE3A0_1002, // MOV R1, #2
        0xE3A0_E040, // MOV LR, #0x40
        0xE92D_4003, // STMDB SP!, {R0, R1, LR}
        0xE8BD_800C, // LDMIA SP!, {R2, R3, PC}
    ]);
    m.steps(5);
    assert_eq!(m.reg(13), 0x0FF4);
    assert_eq!(m.word_at(0x0FF4), 1);
    assert_eq!(m.word_at(0x0FF8), 2);
    assert_eq!(m.word_at(0x0FFC), 0x40);
    m.steps(1);
    assert_eq!(m.reg(2), 1);
    assert_eq!(m.reg(3), 2);
    assert_eq!(m.reg(13), 0x1000);
    assert_eq!(m.core.fetch_address(), 0x40);
}

#[test]
fn test_swap() {
    let mut m = setup(&[
        0xE100_1092, // SWP R1, R2, [R0]
    ]);
    m.bus.memory.write_u32(DATA, 0xAABB_CCDD);
    m.set_reg(0, DATA);
    m.set_reg(2, 5);
    m.steps(1);
    assert_eq!(m.reg(1), 0xAABB_CCDD);
    assert_eq!(m.word_at(DATA), 5);
}

#[test]
fn test_count_leading_zeros() {
    let mut m = setup(&[
        0xE16F_1F10, // CLZ R1, R0
    ]);
    m.set_reg(0, 0x100);
    m.steps(1);
    assert_eq!(m.reg(1), 23);
}

#[test]
fn test_status_register_transfers() {
    let mut m = setup(&[
        0xE3A0_14F0, // MOV R1, #0xF0000000
        0xE128_F001, // MSR CPSR_f, R1
        0xE10F_0000, // MRS R0, CPSR
    ]);
    m.steps(3);
    assert_eq!(m.reg(0), 0xF000_00D3);
    assert_eq!(m.core.flags_summary(), "NZCV IF svc");
}

#[test]
fn test_supervisor_call_banks_registers() {
    let mut m = setup(&[
        0xE321_F010, // MSR CPSR_c, #0x10 (User mode)
        0xE3A0_DA02, // MOV SP, #0x2000
        0xEF00_0012, // SVC #0x12
    ]);
    // The handler returns straight away.
    m.bus.memory.write_u32(vectors::SUPERVISOR_CALL, 0xE1B0_F00E); // MOVS PC, LR
    m.steps(2);
    assert_eq!(m.mode(), psr::USER);
    assert!(!m.flag(psr::I));
    m.steps(1);
    assert_eq!(m.mode(), psr::SUPERVISOR);
    assert!(m.flag(psr::I));
    assert_eq!(m.core.fetch_address(), vectors::SUPERVISOR_CALL);
    assert_eq!(m.reg(14), ORIGIN + 12);
    // The Supervisor stack pointer was never set.
    assert_eq!(m.reg(13), 0);
    m.steps(1);
    assert_eq!(m.mode(), psr::USER);
    assert_eq!(m.core.fetch_address(), ORIGIN + 12);
    assert_eq!(m.reg(13), 0x2000);
}

#[test]
fn test_user_mode_cannot_change_control_bits() {
    let mut m = setup(&[
        0xE321_F010, // MSR CPSR_c, #0x10
        0xE321_F0D3, // MSR CPSR_c, #0xD3
    ]);
    m.steps(2);
    assert_eq!(m.mode(), psr::USER);
    assert!(!m.flag(psr::I));
}

#[test]
fn test_irq_entry() {
    let mut m = setup(&[
        0xE321_F010, // MSR CPSR_c, #0x10
    ]);
    let line = InterruptLine::new();
    m.inputs.controller = Some(Box::new(line.clone()));
    line.request(0x20);
    // Masked in the reset state.
    assert!(!m.core.service_interrupts(&mut m.bus, &mut m.inputs));
    m.steps(1);
    assert!(m.core.service_interrupts(&mut m.bus, &mut m.inputs));
    assert_eq!(m.mode(), psr::IRQ);
    assert!(m.flag(psr::I));
    assert_eq!(m.core.fetch_address(), vectors::IRQ);
    assert_eq!(m.reg(14), ORIGIN + 8);
    assert_eq!(m.core.spsr(), psr::USER);
}

#[test]
fn test_nmi_waits_while_fiq_disabled() {
    let mut m = setup(&[
        0xE321_F010, // MSR CPSR_c, #0x10
    ]);
    m.inputs.nmi.raise();
    assert!(!m.core.service_interrupts(&mut m.bus, &mut m.inputs));
    assert!(m.inputs.nmi.is_raised());
    m.steps(1);
    assert!(m.core.service_interrupts(&mut m.bus, &mut m.inputs));
    assert!(!m.inputs.nmi.is_raised());
    assert_eq!(m.mode(), psr::FIQ);
    assert!(m.flag(psr::I));
    assert!(m.flag(psr::F));
    assert_eq!(m.core.fetch_address(), vectors::FIQ);
}

#[test]
fn test_condition_failure_skips() {
    let mut m = setup(&[
        0x03A0_0001, // MOVEQ R0, #1
    ]);
    m.steps(1);
    assert_eq!(m.reg(0), 0);
    assert_eq!(m.core.fetch_address(), ORIGIN + 4);
}

#[test]
fn test_coprocessor_is_undefined() {
    let mut m = setup(&[
        0xEE00_0010, // MCR p0, 0, R0, c0, c0, 0
        0xEE00_0010,
    ]);
    // Masked: execution continues.
    m.steps(1);
    assert_eq!(m.core.fetch_address(), ORIGIN + 4);
    m.faults.unmask(FaultKind::UndefinedInstruction);
    let fault = m.step().expect_err("unmasked fault should stop execution");
    assert_eq!(fault.kind(), FaultKind::UndefinedInstruction);
    assert_eq!(fault.address, Some(ORIGIN + 4));
}

#[test]
fn test_branch_to_thumb_address() {
    let mut m = setup(&[
        0xE12F_FF10, // BX R0
    ]);
    m.set_reg(0, DATA + 1);
    m.steps(1);
    assert_eq!(m.core.fetch_address(), DATA);
    assert!(!m.flag(psr::T));
}

#[test]
fn test_breakpoint_halts() {
    let mut m = setup(&[
        0xE120_0070, // BKPT #0
    ]);
    m.steps(1);
    assert!(m.core.is_halted());
}

#[test]
fn test_snapshot() {
    let mut m = setup(&[0xE3A0_0005]);
    m.steps(1);
    let snapshot = crate::arch::ARM.snapshot(&m.core);
    assert_eq!(snapshot.architecture, "arm");
    assert_eq!(snapshot.registers.len(), 17);
    assert_eq!(snapshot.get("R0"), Some(5));
    assert_eq!(snapshot.get("PC"), Some(ORIGIN + 4));
    assert_eq!(snapshot.get("CPSR"), Some(0xD3));
    assert_eq!(snapshot.flags, "---- IF svc");
}
