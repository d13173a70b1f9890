mod alu;
mod flow;
mod load;

use crate::core::{Registers, SizeBits, W65c816};
use crate::traits::BusInterface;
use supernova_common::num::{SignBit, U16Ext};

pub(crate) use flow::service_interrupt;

/// The full addressing-mode set consumed by the decoder. Immediate operand
/// sizing is handled by the width-specific operand readers; every other mode
/// resolves to a 24-bit effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddressingMode {
    Immediate,
    DirectPage,
    DirectPageX,
    DirectPageY,
    DirectPageIndirect,
    DirectPageIndexedIndirect,
    DirectPageIndirectIndexed,
    DirectPageIndirectLong,
    DirectPageIndirectLongIndexed,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteLong,
    AbsoluteLongX,
    StackRelative,
    StackRelativeIndirectIndexed,
}

impl AddressingMode {
    /// Approximate cycle cost of an 8-bit data access through this mode,
    /// including the opcode fetch. From the W65C816 datasheet base counts;
    /// variable D-register and page-cross adjustments are not modeled.
    const fn base_cycles(self) -> u8 {
        match self {
            Self::Immediate => 2,
            Self::DirectPage => 3,
            Self::DirectPageX | Self::DirectPageY | Self::StackRelative => 4,
            Self::DirectPageIndirect | Self::DirectPageIndirectIndexed => 5,
            Self::DirectPageIndexedIndirect
            | Self::DirectPageIndirectLong
            | Self::DirectPageIndirectLongIndexed => 6,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY => 4,
            Self::AbsoluteLong | Self::AbsoluteLongX => 5,
            Self::StackRelativeIndirectIndexed => 7,
        }
    }
}

#[inline]
pub(crate) fn u24_address(bank: u8, address: u16) -> u32 {
    (u32::from(bank) << 16) | u32::from(address)
}

#[inline]
fn bank0(address: u16) -> u32 {
    address.into()
}

fn fetch_operand<B: BusInterface>(cpu: &mut W65c816, bus: &mut B) -> u8 {
    let operand = bus.read(u24_address(cpu.registers.pbr, cpu.registers.pc));
    cpu.registers.pc = cpu.registers.pc.wrapping_add(1);
    operand
}

fn fetch_operand_u16<B: BusInterface>(cpu: &mut W65c816, bus: &mut B) -> u16 {
    let lsb = fetch_operand(cpu, bus);
    let msb = fetch_operand(cpu, bus);
    u16::from_le_bytes([lsb, msb])
}

fn fetch_operand_u24<B: BusInterface>(cpu: &mut W65c816, bus: &mut B) -> u32 {
    let low = fetch_operand(cpu, bus);
    let mid = fetch_operand(cpu, bus);
    let high = fetch_operand(cpu, bus);
    u32::from_le_bytes([low, mid, high, 0])
}

/// Resolve a non-immediate addressing mode to a 24-bit effective address.
///
/// Direct page, stack relative, and their pointer fetches live in bank 0 and
/// wrap at 16 bits; data-bank modes wrap their 16-bit offset within DBR; long
/// modes add across the full 24-bit space.
fn effective_address<B: BusInterface>(cpu: &mut W65c816, bus: &mut B, mode: AddressingMode) -> u32 {
    match mode {
        AddressingMode::Immediate => {
            panic!("immediate operands are fetched from the instruction stream")
        }
        AddressingMode::DirectPage => {
            let operand = fetch_operand(cpu, bus);
            bank0(cpu.registers.d.wrapping_add(operand.into()))
        }
        AddressingMode::DirectPageX => {
            let operand = fetch_operand(cpu, bus);
            bank0(cpu.registers.d.wrapping_add(operand.into()).wrapping_add(cpu.registers.x))
        }
        AddressingMode::DirectPageY => {
            let operand = fetch_operand(cpu, bus);
            bank0(cpu.registers.d.wrapping_add(operand.into()).wrapping_add(cpu.registers.y))
        }
        AddressingMode::DirectPageIndirect => {
            let operand = fetch_operand(cpu, bus);
            let pointer = bus.read_u16(bank0(cpu.registers.d.wrapping_add(operand.into())));
            u24_address(cpu.registers.dbr, pointer)
        }
        AddressingMode::DirectPageIndexedIndirect => {
            let operand = fetch_operand(cpu, bus);
            let pointer_address =
                cpu.registers.d.wrapping_add(operand.into()).wrapping_add(cpu.registers.x);
            let pointer = bus.read_u16(bank0(pointer_address));
            u24_address(cpu.registers.dbr, pointer)
        }
        AddressingMode::DirectPageIndirectIndexed => {
            let operand = fetch_operand(cpu, bus);
            let pointer = bus.read_u16(bank0(cpu.registers.d.wrapping_add(operand.into())));
            u24_address(cpu.registers.dbr, pointer.wrapping_add(cpu.registers.y))
        }
        AddressingMode::DirectPageIndirectLong => {
            let operand = fetch_operand(cpu, bus);
            bus.read_u24(bank0(cpu.registers.d.wrapping_add(operand.into())))
        }
        AddressingMode::DirectPageIndirectLongIndexed => {
            let operand = fetch_operand(cpu, bus);
            let pointer = bus.read_u24(bank0(cpu.registers.d.wrapping_add(operand.into())));
            pointer.wrapping_add(cpu.registers.y.into()) & 0xFFFFFF
        }
        AddressingMode::Absolute => {
            let operand = fetch_operand_u16(cpu, bus);
            u24_address(cpu.registers.dbr, operand)
        }
        AddressingMode::AbsoluteX => {
            let operand = fetch_operand_u16(cpu, bus);
            u24_address(cpu.registers.dbr, operand.wrapping_add(cpu.registers.x))
        }
        AddressingMode::AbsoluteY => {
            let operand = fetch_operand_u16(cpu, bus);
            u24_address(cpu.registers.dbr, operand.wrapping_add(cpu.registers.y))
        }
        AddressingMode::AbsoluteLong => fetch_operand_u24(cpu, bus),
        AddressingMode::AbsoluteLongX => {
            let operand = fetch_operand_u24(cpu, bus);
            operand.wrapping_add(cpu.registers.x.into()) & 0xFFFFFF
        }
        AddressingMode::StackRelative => {
            let operand = fetch_operand(cpu, bus);
            bank0(cpu.registers.s.wrapping_add(operand.into()))
        }
        AddressingMode::StackRelativeIndirectIndexed => {
            let operand = fetch_operand(cpu, bus);
            let pointer = bus.read_u16(bank0(cpu.registers.s.wrapping_add(operand.into())));
            u24_address(cpu.registers.dbr, pointer.wrapping_add(cpu.registers.y))
        }
    }
}

fn read_operand_u8<B: BusInterface>(cpu: &mut W65c816, bus: &mut B, mode: AddressingMode) -> u8 {
    match mode {
        AddressingMode::Immediate => fetch_operand(cpu, bus),
        _ => {
            let address = effective_address(cpu, bus, mode);
            bus.read(address)
        }
    }
}

fn read_operand_u16<B: BusInterface>(cpu: &mut W65c816, bus: &mut B, mode: AddressingMode) -> u16 {
    match mode {
        AddressingMode::Immediate => fetch_operand_u16(cpu, bus),
        _ => {
            let address = effective_address(cpu, bus, mode);
            bus.read_u16(address)
        }
    }
}

/// Read-modify-write an 8-bit memory operand; returns the cycle count.
fn modify_operand_u8<B: BusInterface>(
    cpu: &mut W65c816,
    bus: &mut B,
    mode: AddressingMode,
    op: impl FnOnce(&mut Registers, u8) -> u8,
) -> u8 {
    let address = effective_address(cpu, bus, mode);
    let value = bus.read(address);
    let result = op(&mut cpu.registers, value);
    bus.write(address, result);

    mode.base_cycles() + 2
}

/// Read-modify-write a 16-bit memory operand; returns the cycle count.
fn modify_operand_u16<B: BusInterface>(
    cpu: &mut W65c816,
    bus: &mut B,
    mode: AddressingMode,
    op: impl FnOnce(&mut Registers, u16) -> u16,
) -> u8 {
    let address = effective_address(cpu, bus, mode);
    let value = bus.read_u16(address);
    let result = op(&mut cpu.registers, value);
    bus.write_u16(address, result);

    mode.base_cycles() + 4
}

fn update_nz_u8(registers: &mut Registers, value: u8) {
    registers.p.zero = value == 0;
    registers.p.negative = value.sign_bit();
}

fn update_nz_u16(registers: &mut Registers, value: u16) {
    registers.p.zero = value == 0;
    registers.p.negative = value.sign_bit();
}

// Pushes write at S then decrement; pulls increment then read. In emulation
// mode the stack pointer's high byte is re-forced to $01 after every access.
fn push_u8<B: BusInterface>(cpu: &mut W65c816, bus: &mut B, value: u8) {
    bus.write(cpu.registers.s.into(), value);
    cpu.registers.s = cpu.registers.s.wrapping_sub(1);

    if cpu.registers.emulation_mode {
        cpu.registers.s = 0x0100 | (cpu.registers.s & 0x00FF);
    }
}

fn push_u16<B: BusInterface>(cpu: &mut W65c816, bus: &mut B, value: u16) {
    push_u8(cpu, bus, value.msb());
    push_u8(cpu, bus, value.lsb());
}

fn pull_u8<B: BusInterface>(cpu: &mut W65c816, bus: &mut B) -> u8 {
    cpu.registers.s = cpu.registers.s.wrapping_add(1);

    if cpu.registers.emulation_mode {
        cpu.registers.s = 0x0100 | (cpu.registers.s & 0x00FF);
    }

    bus.read(cpu.registers.s.into())
}

fn pull_u16<B: BusInterface>(cpu: &mut W65c816, bus: &mut B) -> u16 {
    let lsb = pull_u8(cpu, bus);
    let msb = pull_u8(cpu, bus);
    u16::from_le_bytes([lsb, msb])
}

/// Wrap an index value to the current index register width.
fn wrap_index(registers: &Registers, value: u16) -> u16 {
    match registers.p.index_size {
        SizeBits::Eight => value & 0x00FF,
        SizeBits::Sixteen => value,
    }
}

pub(crate) fn execute<B: BusInterface>(cpu: &mut W65c816, bus: &mut B, opcode: u8) -> u8 {
    use AddressingMode::*;

    match opcode {
        0x00 => flow::brk(cpu, bus),
        0x01 => alu::ora(cpu, bus, DirectPageIndexedIndirect),
        0x02 => flow::cop(cpu, bus),
        0x03 => alu::ora(cpu, bus, StackRelative),
        0x04 => alu::tsb(cpu, bus, DirectPage),
        0x05 => alu::ora(cpu, bus, DirectPage),
        0x06 => alu::asl(cpu, bus, DirectPage),
        0x07 => alu::ora(cpu, bus, DirectPageIndirectLong),
        0x08 => load::php(cpu, bus),
        0x09 => alu::ora(cpu, bus, Immediate),
        0x0A => alu::asl_accumulator(cpu),
        0x0B => load::phd(cpu, bus),
        0x0C => alu::tsb(cpu, bus, Absolute),
        0x0D => alu::ora(cpu, bus, Absolute),
        0x0E => alu::asl(cpu, bus, Absolute),
        0x0F => alu::ora(cpu, bus, AbsoluteLong),
        0x10 => flow::branch(cpu, bus, |p| !p.negative),
        0x11 => alu::ora(cpu, bus, DirectPageIndirectIndexed),
        0x12 => alu::ora(cpu, bus, DirectPageIndirect),
        0x13 => alu::ora(cpu, bus, StackRelativeIndirectIndexed),
        0x14 => alu::trb(cpu, bus, DirectPage),
        0x15 => alu::ora(cpu, bus, DirectPageX),
        0x16 => alu::asl(cpu, bus, DirectPageX),
        0x17 => alu::ora(cpu, bus, DirectPageIndirectLongIndexed),
        0x18 => flow::clc(cpu),
        0x19 => alu::ora(cpu, bus, AbsoluteY),
        0x1A => alu::inc_accumulator(cpu),
        0x1B => load::tcs(cpu),
        0x1C => alu::trb(cpu, bus, Absolute),
        0x1D => alu::ora(cpu, bus, AbsoluteX),
        0x1E => alu::asl(cpu, bus, AbsoluteX),
        0x1F => alu::ora(cpu, bus, AbsoluteLongX),
        0x20 => flow::jsr_absolute(cpu, bus),
        0x21 => alu::and(cpu, bus, DirectPageIndexedIndirect),
        0x22 => flow::jsl(cpu, bus),
        0x23 => alu::and(cpu, bus, StackRelative),
        0x24 => alu::bit(cpu, bus, DirectPage),
        0x25 => alu::and(cpu, bus, DirectPage),
        0x26 => alu::rol(cpu, bus, DirectPage),
        0x27 => alu::and(cpu, bus, DirectPageIndirectLong),
        0x28 => load::plp(cpu, bus),
        0x29 => alu::and(cpu, bus, Immediate),
        0x2A => alu::rol_accumulator(cpu),
        0x2B => load::pld(cpu, bus),
        0x2C => alu::bit(cpu, bus, Absolute),
        0x2D => alu::and(cpu, bus, Absolute),
        0x2E => alu::rol(cpu, bus, Absolute),
        0x2F => alu::and(cpu, bus, AbsoluteLong),
        0x30 => flow::branch(cpu, bus, |p| p.negative),
        0x31 => alu::and(cpu, bus, DirectPageIndirectIndexed),
        0x32 => alu::and(cpu, bus, DirectPageIndirect),
        0x33 => alu::and(cpu, bus, StackRelativeIndirectIndexed),
        0x34 => alu::bit(cpu, bus, DirectPageX),
        0x35 => alu::and(cpu, bus, DirectPageX),
        0x36 => alu::rol(cpu, bus, DirectPageX),
        0x37 => alu::and(cpu, bus, DirectPageIndirectLongIndexed),
        0x38 => flow::sec(cpu),
        0x39 => alu::and(cpu, bus, AbsoluteY),
        0x3A => alu::dec_accumulator(cpu),
        0x3B => load::tsc(cpu),
        0x3C => alu::bit(cpu, bus, AbsoluteX),
        0x3D => alu::and(cpu, bus, AbsoluteX),
        0x3E => alu::rol(cpu, bus, AbsoluteX),
        0x3F => alu::and(cpu, bus, AbsoluteLongX),
        0x40 => flow::rti(cpu, bus),
        0x41 => alu::eor(cpu, bus, DirectPageIndexedIndirect),
        0x42 => flow::wdm(cpu, bus),
        0x43 => alu::eor(cpu, bus, StackRelative),
        0x44 => flow::mvp(cpu, bus),
        0x45 => alu::eor(cpu, bus, DirectPage),
        0x46 => alu::lsr(cpu, bus, DirectPage),
        0x47 => alu::eor(cpu, bus, DirectPageIndirectLong),
        0x48 => load::pha(cpu, bus),
        0x49 => alu::eor(cpu, bus, Immediate),
        0x4A => alu::lsr_accumulator(cpu),
        0x4B => load::phk(cpu, bus),
        0x4C => flow::jmp_absolute(cpu, bus),
        0x4D => alu::eor(cpu, bus, Absolute),
        0x4E => alu::lsr(cpu, bus, Absolute),
        0x4F => alu::eor(cpu, bus, AbsoluteLong),
        0x50 => flow::branch(cpu, bus, |p| !p.overflow),
        0x51 => alu::eor(cpu, bus, DirectPageIndirectIndexed),
        0x52 => alu::eor(cpu, bus, DirectPageIndirect),
        0x53 => alu::eor(cpu, bus, StackRelativeIndirectIndexed),
        0x54 => flow::mvn(cpu, bus),
        0x55 => alu::eor(cpu, bus, DirectPageX),
        0x56 => alu::lsr(cpu, bus, DirectPageX),
        0x57 => alu::eor(cpu, bus, DirectPageIndirectLongIndexed),
        0x58 => flow::cli(cpu),
        0x59 => alu::eor(cpu, bus, AbsoluteY),
        0x5A => load::phy(cpu, bus),
        0x5B => load::tcd(cpu),
        0x5C => flow::jmp_absolute_long(cpu, bus),
        0x5D => alu::eor(cpu, bus, AbsoluteX),
        0x5E => alu::lsr(cpu, bus, AbsoluteX),
        0x5F => alu::eor(cpu, bus, AbsoluteLongX),
        0x60 => flow::rts(cpu, bus),
        0x61 => alu::adc(cpu, bus, DirectPageIndexedIndirect),
        0x62 => flow::per(cpu, bus),
        0x63 => alu::adc(cpu, bus, StackRelative),
        0x64 => load::stz(cpu, bus, DirectPage),
        0x65 => alu::adc(cpu, bus, DirectPage),
        0x66 => alu::ror(cpu, bus, DirectPage),
        0x67 => alu::adc(cpu, bus, DirectPageIndirectLong),
        0x68 => load::pla(cpu, bus),
        0x69 => alu::adc(cpu, bus, Immediate),
        0x6A => alu::ror_accumulator(cpu),
        0x6B => flow::rtl(cpu, bus),
        0x6C => flow::jmp_indirect(cpu, bus),
        0x6D => alu::adc(cpu, bus, Absolute),
        0x6E => alu::ror(cpu, bus, Absolute),
        0x6F => alu::adc(cpu, bus, AbsoluteLong),
        0x70 => flow::branch(cpu, bus, |p| p.overflow),
        0x71 => alu::adc(cpu, bus, DirectPageIndirectIndexed),
        0x72 => alu::adc(cpu, bus, DirectPageIndirect),
        0x73 => alu::adc(cpu, bus, StackRelativeIndirectIndexed),
        0x74 => load::stz(cpu, bus, DirectPageX),
        0x75 => alu::adc(cpu, bus, DirectPageX),
        0x76 => alu::ror(cpu, bus, DirectPageX),
        0x77 => alu::adc(cpu, bus, DirectPageIndirectLongIndexed),
        0x78 => flow::sei(cpu),
        0x79 => alu::adc(cpu, bus, AbsoluteY),
        0x7A => load::ply(cpu, bus),
        0x7B => load::tdc(cpu),
        0x7C => flow::jmp_indexed_indirect(cpu, bus),
        0x7D => alu::adc(cpu, bus, AbsoluteX),
        0x7E => alu::ror(cpu, bus, AbsoluteX),
        0x7F => alu::adc(cpu, bus, AbsoluteLongX),
        0x80 => flow::branch(cpu, bus, |_| true),
        0x81 => load::sta(cpu, bus, DirectPageIndexedIndirect),
        0x82 => flow::brl(cpu, bus),
        0x83 => load::sta(cpu, bus, StackRelative),
        0x84 => load::sty(cpu, bus, DirectPage),
        0x85 => load::sta(cpu, bus, DirectPage),
        0x86 => load::stx(cpu, bus, DirectPage),
        0x87 => load::sta(cpu, bus, DirectPageIndirectLong),
        0x88 => alu::dey(cpu),
        0x89 => alu::bit(cpu, bus, Immediate),
        0x8A => load::txa(cpu),
        0x8B => load::phb(cpu, bus),
        0x8C => load::sty(cpu, bus, Absolute),
        0x8D => load::sta(cpu, bus, Absolute),
        0x8E => load::stx(cpu, bus, Absolute),
        0x8F => load::sta(cpu, bus, AbsoluteLong),
        0x90 => flow::branch(cpu, bus, |p| !p.carry),
        0x91 => load::sta(cpu, bus, DirectPageIndirectIndexed),
        0x92 => load::sta(cpu, bus, DirectPageIndirect),
        0x93 => load::sta(cpu, bus, StackRelativeIndirectIndexed),
        0x94 => load::sty(cpu, bus, DirectPageX),
        0x95 => load::sta(cpu, bus, DirectPageX),
        0x96 => load::stx(cpu, bus, DirectPageY),
        0x97 => load::sta(cpu, bus, DirectPageIndirectLongIndexed),
        0x98 => load::tya(cpu),
        0x99 => load::sta(cpu, bus, AbsoluteY),
        0x9A => load::txs(cpu),
        0x9B => load::txy(cpu),
        0x9C => load::stz(cpu, bus, Absolute),
        0x9D => load::sta(cpu, bus, AbsoluteX),
        0x9E => load::stz(cpu, bus, AbsoluteX),
        0x9F => load::sta(cpu, bus, AbsoluteLongX),
        0xA0 => load::ldy(cpu, bus, Immediate),
        0xA1 => load::lda(cpu, bus, DirectPageIndexedIndirect),
        0xA2 => load::ldx(cpu, bus, Immediate),
        0xA3 => load::lda(cpu, bus, StackRelative),
        0xA4 => load::ldy(cpu, bus, DirectPage),
        0xA5 => load::lda(cpu, bus, DirectPage),
        0xA6 => load::ldx(cpu, bus, DirectPage),
        0xA7 => load::lda(cpu, bus, DirectPageIndirectLong),
        0xA8 => load::tay(cpu),
        0xA9 => load::lda(cpu, bus, Immediate),
        0xAA => load::tax(cpu),
        0xAB => load::plb(cpu, bus),
        0xAC => load::ldy(cpu, bus, Absolute),
        0xAD => load::lda(cpu, bus, Absolute),
        0xAE => load::ldx(cpu, bus, Absolute),
        0xAF => load::lda(cpu, bus, AbsoluteLong),
        0xB0 => flow::branch(cpu, bus, |p| p.carry),
        0xB1 => load::lda(cpu, bus, DirectPageIndirectIndexed),
        0xB2 => load::lda(cpu, bus, DirectPageIndirect),
        0xB3 => load::lda(cpu, bus, StackRelativeIndirectIndexed),
        0xB4 => load::ldy(cpu, bus, DirectPageX),
        0xB5 => load::lda(cpu, bus, DirectPageX),
        0xB6 => load::ldx(cpu, bus, DirectPageY),
        0xB7 => load::lda(cpu, bus, DirectPageIndirectLongIndexed),
        0xB8 => flow::clv(cpu),
        0xB9 => load::lda(cpu, bus, AbsoluteY),
        0xBA => load::tsx(cpu),
        0xBB => load::tyx(cpu),
        0xBC => load::ldy(cpu, bus, AbsoluteX),
        0xBD => load::lda(cpu, bus, AbsoluteX),
        0xBE => load::ldx(cpu, bus, AbsoluteY),
        0xBF => load::lda(cpu, bus, AbsoluteLongX),
        0xC0 => alu::cpy(cpu, bus, Immediate),
        0xC1 => alu::cmp(cpu, bus, DirectPageIndexedIndirect),
        0xC2 => flow::rep(cpu, bus),
        0xC3 => alu::cmp(cpu, bus, StackRelative),
        0xC4 => alu::cpy(cpu, bus, DirectPage),
        0xC5 => alu::cmp(cpu, bus, DirectPage),
        0xC6 => alu::dec(cpu, bus, DirectPage),
        0xC7 => alu::cmp(cpu, bus, DirectPageIndirectLong),
        0xC8 => alu::iny(cpu),
        0xC9 => alu::cmp(cpu, bus, Immediate),
        0xCA => alu::dex(cpu),
        0xCB => flow::wai(cpu),
        0xCC => alu::cpy(cpu, bus, Absolute),
        0xCD => alu::cmp(cpu, bus, Absolute),
        0xCE => alu::dec(cpu, bus, Absolute),
        0xCF => alu::cmp(cpu, bus, AbsoluteLong),
        0xD0 => flow::branch(cpu, bus, |p| !p.zero),
        0xD1 => alu::cmp(cpu, bus, DirectPageIndirectIndexed),
        0xD2 => alu::cmp(cpu, bus, DirectPageIndirect),
        0xD3 => alu::cmp(cpu, bus, StackRelativeIndirectIndexed),
        0xD4 => flow::pei(cpu, bus),
        0xD5 => alu::cmp(cpu, bus, DirectPageX),
        0xD6 => alu::dec(cpu, bus, DirectPageX),
        0xD7 => alu::cmp(cpu, bus, DirectPageIndirectLongIndexed),
        0xD8 => flow::cld(cpu),
        0xD9 => alu::cmp(cpu, bus, AbsoluteY),
        0xDA => load::phx(cpu, bus),
        0xDB => flow::stp(cpu),
        0xDC => flow::jmp_indirect_long(cpu, bus),
        0xDD => alu::cmp(cpu, bus, AbsoluteX),
        0xDE => alu::dec(cpu, bus, AbsoluteX),
        0xDF => alu::cmp(cpu, bus, AbsoluteLongX),
        0xE0 => alu::cpx(cpu, bus, Immediate),
        0xE1 => alu::sbc(cpu, bus, DirectPageIndexedIndirect),
        0xE2 => flow::sep(cpu, bus),
        0xE3 => alu::sbc(cpu, bus, StackRelative),
        0xE4 => alu::cpx(cpu, bus, DirectPage),
        0xE5 => alu::sbc(cpu, bus, DirectPage),
        0xE6 => alu::inc(cpu, bus, DirectPage),
        0xE7 => alu::sbc(cpu, bus, DirectPageIndirectLong),
        0xE8 => alu::inx(cpu),
        0xE9 => alu::sbc(cpu, bus, Immediate),
        0xEA => flow::nop(cpu),
        0xEB => load::xba(cpu),
        0xEC => alu::cpx(cpu, bus, Absolute),
        0xED => alu::sbc(cpu, bus, Absolute),
        0xEE => alu::inc(cpu, bus, Absolute),
        0xEF => alu::sbc(cpu, bus, AbsoluteLong),
        0xF0 => flow::branch(cpu, bus, |p| p.zero),
        0xF1 => alu::sbc(cpu, bus, DirectPageIndirectIndexed),
        0xF2 => alu::sbc(cpu, bus, DirectPageIndirect),
        0xF3 => alu::sbc(cpu, bus, StackRelativeIndirectIndexed),
        0xF4 => flow::pea(cpu, bus),
        0xF5 => alu::sbc(cpu, bus, DirectPageX),
        0xF6 => alu::inc(cpu, bus, DirectPageX),
        0xF7 => alu::sbc(cpu, bus, DirectPageIndirectLongIndexed),
        0xF8 => flow::sed(cpu),
        0xF9 => alu::sbc(cpu, bus, AbsoluteY),
        0xFA => load::plx(cpu, bus),
        0xFB => flow::xce(cpu),
        0xFC => flow::jsr_indexed_indirect(cpu, bus),
        0xFD => alu::sbc(cpu, bus, AbsoluteX),
        0xFE => alu::inc(cpu, bus, AbsoluteX),
        0xFF => alu::sbc(cpu, bus, AbsoluteLongX),
    }
}
