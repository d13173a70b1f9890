use crate::apu::Apu;
use crate::memory::Memory;
use crate::ppu::Ppu;
use supernova_common::num::U24Ext;
use w65c816_emu::traits::BusInterface;

/// Short-lived borrowing view over the system components, constructed for
/// each CPU step. The system owns all components; the bus holds no state of
/// its own beyond these handles.
pub(crate) struct Bus<'a> {
    pub memory: &'a mut Memory,
    pub ppu: &'a mut Ppu,
    pub apu: &'a mut Apu,
}

impl Bus<'_> {
    fn read_system_area(&mut self, address: u32) -> u8 {
        let offset = address.bank_offset();
        match offset {
            0x0000..=0x1FFF => {
                // Low 8KB WRAM mirror
                self.memory.read_wram(offset.into())
            }
            0x2100..=0x21FF => {
                // PPU register file, mirrored through the low 6 address bits
                self.ppu.read_port(offset)
            }
            0x4000..=0x4003 => {
                // APU mailbox ports
                self.apu.read_port(offset)
            }
            0x2000..=0x20FF | 0x2200..=0x3FFF | 0x4004..=0x5FFF => {
                self.memory.read_io_shadow(offset)
            }
            0x6000..=0x7FFF => self.memory.cartridge().read_sram(address),
            _ => unreachable!("system area offsets are always <= $7FFF"),
        }
    }

    fn write_system_area(&mut self, address: u32, value: u8) {
        let offset = address.bank_offset();
        match offset {
            0x0000..=0x1FFF => {
                self.memory.write_wram(offset.into(), value);
            }
            0x2100..=0x21FF => {
                self.ppu.write_port(offset, value);
            }
            0x4000..=0x4003 => {
                self.apu.write_port(offset, value);
            }
            0x4300..=0x43FF => {
                // DMA channel registers are recognised but DMA execution is
                // not implemented; the write is only shadowed
                log::debug!("DMA register write {offset:04X} {value:02X}; DMA not implemented");
                self.memory.write_io_shadow(offset, value);
            }
            0x2000..=0x20FF | 0x2200..=0x3FFF | 0x4004..=0x5FFF => {
                self.memory.write_io_shadow(offset, value);
            }
            0x6000..=0x7FFF => {
                self.memory.cartridge_mut().write_sram(address, value);
            }
            _ => unreachable!("system area offsets are always <= $7FFF"),
        }
    }
}

impl BusInterface for Bus<'_> {
    #[inline]
    fn read(&mut self, address: u32) -> u8 {
        log::trace!("Bus read {address:06X}");

        let bank = address.bank();
        let offset = address.bank_offset();
        match (bank, offset) {
            (0x00..=0x3F | 0x80..=0xBF, 0x0000..=0x7FFF) => self.read_system_area(address),
            (0x00..=0x3F | 0x80..=0xBF, 0x8000..=0xFFFF) | (0x40..=0x7D | 0xC0..=0xFF, _) => {
                self.memory.cartridge().read_rom(address)
            }
            (0x7E..=0x7F, _) => self.memory.read_wram(address - 0x7E0000),
        }
    }

    #[inline]
    fn write(&mut self, address: u32, value: u8) {
        log::trace!("Bus write {address:06X} {value:02X}");

        let bank = address.bank();
        let offset = address.bank_offset();
        match (bank, offset) {
            (0x00..=0x3F | 0x80..=0xBF, 0x0000..=0x7FFF) => {
                self.write_system_area(address, value);
            }
            (0x00..=0x3F | 0x80..=0xBF, 0x8000..=0xFFFF) | (0x40..=0x7D | 0xC0..=0xFF, _) => {
                // ROM; writes are dropped
                log::trace!("Ignoring write to ROM address {address:06X}");
            }
            (0x7E..=0x7F, _) => {
                self.memory.write_wram(address - 0x7E0000, value);
            }
        }
    }

    #[inline]
    fn nmi(&self) -> bool {
        self.ppu.nmi_pending()
    }

    #[inline]
    fn acknowledge_nmi(&mut self) {
        self.ppu.acknowledge_nmi();
    }

    #[inline]
    fn irq(&self) -> bool {
        // No IRQ source is wired; H/V timer IRQs are out of scope
        false
    }
}
