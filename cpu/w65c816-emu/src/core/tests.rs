use super::*;
use supernova_common::num::U16Ext;
use test_log::test;

const ADDRESS_SPACE_LEN: usize = 1 << 24;

struct TestBus {
    memory: Vec<u8>,
    nmi_line: bool,
    irq_line: bool,
}

impl TestBus {
    fn new() -> Self {
        Self { memory: vec![0; ADDRESS_SPACE_LEN], nmi_line: false, irq_line: false }
    }

    fn load(&mut self, address: u32, bytes: &[u8]) {
        let address = address as usize;
        self.memory[address..address + bytes.len()].copy_from_slice(bytes);
    }
}

impl BusInterface for TestBus {
    fn read(&mut self, address: u32) -> u8 {
        self.memory[(address & 0xFFFFFF) as usize]
    }

    fn write(&mut self, address: u32, value: u8) {
        self.memory[(address & 0xFFFFFF) as usize] = value;
    }

    fn nmi(&self) -> bool {
        self.nmi_line
    }

    fn acknowledge_nmi(&mut self) {
        self.nmi_line = false;
    }

    fn irq(&self) -> bool {
        self.irq_line
    }
}

/// Reset a fresh CPU with the given program placed at `$00:8000`.
fn boot_with_program(program: &[u8]) -> (W65c816, TestBus) {
    let mut bus = TestBus::new();
    bus.load(0xFFFC, &[0x00, 0x80]);
    bus.load(0x8000, program);

    let mut cpu = W65c816::new();
    cpu.reset(&mut bus);

    (cpu, bus)
}

fn enter_native_mode(cpu: &mut W65c816) {
    let mut registers = cpu.registers().clone();
    registers.emulation_mode = false;
    cpu.set_registers(registers);
}

#[test]
fn reset_vector_boot() {
    let (cpu, _bus) = boot_with_program(&[]);

    let registers = cpu.registers();
    assert_eq!(registers.pc, 0x8000);
    assert_eq!(registers.pbr, 0);
    assert_eq!(registers.s, 0x01FF);
    assert_eq!(u8::from(registers.p), 0x34);
    assert!(registers.emulation_mode);
    assert_eq!(registers.a, 0);
    assert_eq!(registers.x, 0);
    assert_eq!(registers.y, 0);
}

#[test]
fn lda_immediate_8_bit() {
    let (mut cpu, mut bus) = boot_with_program(&[0xA9, 0x42, 0xA9, 0x00, 0xA9, 0x80]);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a.lsb(), 0x42);
    assert!(!cpu.registers().p.zero);
    assert!(!cpu.registers().p.negative);

    cpu.step(&mut bus);
    assert!(cpu.registers().p.zero);
    assert!(!cpu.registers().p.negative);

    cpu.step(&mut bus);
    assert!(!cpu.registers().p.zero);
    assert!(cpu.registers().p.negative);
}

#[test]
fn width_switch_to_16_bit_accumulator() {
    // CLC; XCE; REP #$20; LDA #$1234
    let (mut cpu, mut bus) =
        boot_with_program(&[0x18, 0xFB, 0xC2, 0x20, 0xA9, 0x34, 0x12]);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    // XCE swapped the old emulation flag into carry
    assert!(cpu.registers().p.carry);
    assert!(!cpu.registers().emulation_mode);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().p.accumulator_size, SizeBits::Sixteen);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a, 0x1234);
    assert!(!cpu.registers().p.zero);
    assert!(!cpu.registers().p.negative);
}

#[test]
fn stack_word_round_trip() {
    // PEA #$ABCD; PLA; PLA (M=1)
    let (mut cpu, mut bus) = boot_with_program(&[0xF4, 0xCD, 0xAB, 0x68, 0x68]);
    enter_native_mode(&mut cpu);
    let mut registers = cpu.registers().clone();
    registers.s = 0x1FFF;
    cpu.set_registers(registers);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().s, 0x1FFD);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a.lsb(), 0xCD);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a.lsb(), 0xAB);
    assert_eq!(cpu.registers().s, 0x1FFF);
}

#[test]
fn taken_branch_page_cross_costs_one_extra_cycle() {
    // In-page taken branch
    let (mut cpu, mut bus) = boot_with_program(&[0x90, 0x04]);
    enter_native_mode(&mut cpu);
    let in_page_cycles = cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8006);

    // Branch from the end of a page
    let mut bus = TestBus::new();
    bus.load(0xFFFC, &[0x00, 0x80]);
    bus.load(0x80FE, &[0x90, 0x04]);
    let mut cpu = W65c816::new();
    cpu.reset(&mut bus);
    enter_native_mode(&mut cpu);
    let mut registers = cpu.registers().clone();
    registers.pc = 0x80FE;
    cpu.set_registers(registers);

    let cross_page_cycles = cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8104);
    assert_eq!(cross_page_cycles, in_page_cycles + 1);
}

#[test]
fn branch_not_taken_falls_through() {
    let (mut cpu, mut bus) = boot_with_program(&[0xB0, 0x04]);

    // Carry is clear, so BCS falls through
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8002);
}

#[test]
fn adc_sets_overflow_and_carry_flags() {
    // LDA #$7F; ADC #$01
    let (mut cpu, mut bus) = boot_with_program(&[0xA9, 0x7F, 0x69, 0x01]);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a.lsb(), 0x80);
    assert!(cpu.registers().p.overflow);
    assert!(cpu.registers().p.negative);
    assert!(!cpu.registers().p.carry);

    // LDA #$FF; ADC #$01
    let (mut cpu, mut bus) = boot_with_program(&[0xA9, 0xFF, 0x69, 0x01]);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.registers().p.carry);
    assert!(cpu.registers().p.zero);
}

#[test]
fn jsr_rts_round_trip_with_intermediate_pushes() {
    // JSR $8010; subroutine: PHA; LDA #$55; PLA; RTS
    let (mut cpu, mut bus) = boot_with_program(&[0x20, 0x10, 0x80]);
    bus.load(0x8010, &[0x48, 0xA9, 0x55, 0x68, 0x60]);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0x8010);

    for _ in 0..4 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.registers().pc, 0x8003);
    assert_eq!(cpu.registers().s, 0x01FF);
}

#[test]
fn mvn_moves_block_and_updates_data_bank() {
    // MVN #$20,#$10
    let (mut cpu, mut bus) = boot_with_program(&[0x54, 0x20, 0x10]);
    enter_native_mode(&mut cpu);
    let mut registers = cpu.registers().clone();
    registers.p.index_size = SizeBits::Sixteen;
    registers.a = 3;
    registers.x = 0x0000;
    registers.y = 0x0100;
    cpu.set_registers(registers);

    bus.load(0x100000, &[0xDE, 0xAD, 0xBE, 0xEF]);

    // One byte per execution; PC rewinds until A underflows
    for _ in 0..4 {
        cpu.step(&mut bus);
    }

    assert_eq!(cpu.registers().a, 0xFFFF);
    assert_eq!(cpu.registers().pc, 0x8003);
    assert_eq!(cpu.registers().dbr, 0x20);
    assert_eq!(cpu.registers().x, 0x0004);
    assert_eq!(cpu.registers().y, 0x0104);
    assert_eq!(
        &bus.memory[0x200100..0x200104],
        &[0xDE, 0xAD, 0xBE, 0xEF]
    );
}

#[test]
fn xce_twice_restores_mode_and_carry() {
    let (mut cpu, mut bus) = boot_with_program(&[0x18, 0xFB, 0xFB]);

    cpu.step(&mut bus);
    let original_carry = cpu.registers().p.carry;

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.registers().emulation_mode);
    assert_eq!(cpu.registers().p.carry, original_carry);
}

#[test]
fn rep_cannot_clear_m_and_x_in_emulation_mode() {
    // REP #$FF in emulation mode
    let (mut cpu, mut bus) = boot_with_program(&[0xC2, 0xFF]);

    cpu.step(&mut bus);
    let p = cpu.registers().p;
    assert_eq!(p.accumulator_size, SizeBits::Eight);
    assert_eq!(p.index_size, SizeBits::Eight);
    assert!(!p.carry);
    assert!(!p.irq_disabled);

    // REP #$FF in native mode clears every flag
    let (mut cpu, mut bus) = boot_with_program(&[0xC2, 0xFF]);
    enter_native_mode(&mut cpu);

    cpu.step(&mut bus);
    assert_eq!(u8::from(cpu.registers().p), 0x00);
    assert_eq!(cpu.registers().p.accumulator_size, SizeBits::Sixteen);
    assert_eq!(cpu.registers().p.index_size, SizeBits::Sixteen);
}

#[test]
fn emulation_mode_stack_wraps_within_page_1() {
    // LDA #$42; PHA with S at the bottom of page 1
    let (mut cpu, mut bus) = boot_with_program(&[0xA9, 0x42, 0x48]);
    let mut registers = cpu.registers().clone();
    registers.s = 0x0100;
    cpu.set_registers(registers);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().s, 0x01FF);
    assert_eq!(bus.memory[0x0100], 0x42);
}

#[test]
fn emulation_mode_invariants_hold_after_every_step() {
    // A mix of width and index operations under emulation mode
    let (mut cpu, mut bus) =
        boot_with_program(&[0xA2, 0xFF, 0xE8, 0xC8, 0x88, 0x9A, 0xA9, 0x10, 0x48, 0x68]);

    for _ in 0..8 {
        cpu.step(&mut bus);

        let registers = cpu.registers();
        assert!(registers.emulation_mode);
        assert_eq!(registers.p.accumulator_size, SizeBits::Eight);
        assert_eq!(registers.p.index_size, SizeBits::Eight);
        assert_eq!(registers.s & 0xFF00, 0x0100);
        assert_eq!(registers.x & 0xFF00, 0);
        assert_eq!(registers.y & 0xFF00, 0);
    }
}

#[test]
fn index_registers_wrap_at_8_bits_when_narrow() {
    // LDX #$FF; INX
    let (mut cpu, mut bus) = boot_with_program(&[0xA2, 0xFF, 0xE8]);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().x, 0);
    assert!(cpu.registers().p.zero);
}

#[test]
fn brk_in_emulation_mode_uses_fffe_vector() {
    let (mut cpu, mut bus) = boot_with_program(&[0x00, 0x00]);
    bus.load(0xFFFE, &[0x00, 0x90]);

    cpu.step(&mut bus);

    let registers = cpu.registers();
    assert_eq!(registers.pc, 0x9000);
    assert_eq!(registers.pbr, 0);
    assert!(registers.p.irq_disabled);
    // Stack: PC ($8002) then P with the B flag set
    assert_eq!(bus.memory[0x01FF], 0x80);
    assert_eq!(bus.memory[0x01FE], 0x02);
    assert_eq!(bus.memory[0x01FD] & 0x10, 0x10);
}

#[test]
fn brk_in_native_mode_pushes_pbr_and_uses_ffe6_vector() {
    let (mut cpu, mut bus) = boot_with_program(&[0x00, 0x00]);
    enter_native_mode(&mut cpu);
    bus.load(0xFFE6, &[0x00, 0xA0]);

    cpu.step(&mut bus);

    let registers = cpu.registers();
    assert_eq!(registers.pc, 0xA000);
    assert_eq!(registers.pbr, 0);
    // Stack: PBR, PC, P
    assert_eq!(bus.memory[0x01FF], 0x00);
    assert_eq!(bus.memory[0x01FE], 0x80);
    assert_eq!(bus.memory[0x01FD], 0x02);
}

#[test]
fn nmi_is_serviced_through_the_emulation_vector() {
    let (mut cpu, mut bus) = boot_with_program(&[0xEA, 0xEA]);
    bus.load(0xFFFA, &[0x00, 0xB0]);

    cpu.step(&mut bus);
    bus.nmi_line = true;

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().pc, 0xB000);
    assert!(!bus.nmi_line);
    assert!(cpu.registers().p.irq_disabled);
}

#[test]
fn direct_page_addressing_uses_d_register() {
    // LDA $10 with D = $0200
    let (mut cpu, mut bus) = boot_with_program(&[0xA5, 0x10]);
    let mut registers = cpu.registers().clone();
    registers.d = 0x0200;
    cpu.set_registers(registers);
    bus.memory[0x0210] = 0x77;

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a.lsb(), 0x77);
}

#[test]
fn sixteen_bit_stores_preserve_little_endian_order() {
    // REP #$20 then LDA #$BEEF; STA $2000 (native mode)
    let (mut cpu, mut bus) =
        boot_with_program(&[0xC2, 0x20, 0xA9, 0xEF, 0xBE, 0x8D, 0x00, 0x20]);
    enter_native_mode(&mut cpu);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(bus.memory[0x2000], 0xEF);
    assert_eq!(bus.memory[0x2001], 0xBE);
}

#[test]
fn eight_bit_accumulator_writes_preserve_high_byte() {
    // High byte of A (the B accumulator) survives 8-bit loads
    let (mut cpu, mut bus) = boot_with_program(&[0xA9, 0x12]);
    let mut registers = cpu.registers().clone();
    registers.a = 0xAB00;
    cpu.set_registers(registers);

    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a, 0xAB12);
}

#[test]
fn wai_and_stp_consume_cycles_without_halting() {
    // WAI; STP; LDA #$42
    let (mut cpu, mut bus) = boot_with_program(&[0xCB, 0xDB, 0xA9, 0x42]);

    let wai_cycles = cpu.step(&mut bus);
    assert!(wai_cycles > 0);
    assert_eq!(cpu.registers().pc, 0x8001);

    let stp_cycles = cpu.step(&mut bus);
    assert!(stp_cycles > 0);
    assert_eq!(cpu.registers().pc, 0x8002);

    // Execution falls through to the next instruction
    cpu.step(&mut bus);
    assert_eq!(cpu.registers().a.lsb(), 0x42);
}
