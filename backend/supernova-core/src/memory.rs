pub(crate) mod cartridge;

use crate::memory::cartridge::Cartridge;
use bincode::{Decode, Encode};
use rand::Rng;
use supernova_common::boxedarray::BoxedByteArray;

pub(crate) const WRAM_LEN: usize = 128 * 1024;

// Shadow storage for the unmapped I/O register space at system-area offsets
// $2000-$7FFF; the PPU, APU, and SRAM windows are delegated before it is hit
const IO_SHADOW_BASE: u16 = 0x2000;
const IO_SHADOW_LEN: usize = 24 * 1024;

#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct Memory {
    wram: BoxedByteArray<WRAM_LEN>,
    io_shadow: BoxedByteArray<IO_SHADOW_LEN>,
    cartridge: Cartridge,
}

impl Memory {
    pub fn new(cartridge: Cartridge) -> Self {
        Self { wram: BoxedByteArray::new(), io_shadow: BoxedByteArray::new(), cartridge }
    }

    pub fn read_wram(&self, address: u32) -> u8 {
        self.wram[(address as usize) & (WRAM_LEN - 1)]
    }

    pub fn write_wram(&mut self, address: u32, value: u8) {
        self.wram[(address as usize) & (WRAM_LEN - 1)] = value;
    }

    pub fn read_io_shadow(&self, offset: u16) -> u8 {
        self.io_shadow[usize::from(offset - IO_SHADOW_BASE)]
    }

    pub fn write_io_shadow(&mut self, offset: u16, value: u8) {
        self.io_shadow[usize::from(offset - IO_SHADOW_BASE)] = value;
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    pub fn rom_len(&self) -> usize {
        self.cartridge.rom_len()
    }

    pub fn cartridge_mut(&mut self) -> &mut Cartridge {
        &mut self.cartridge
    }

    /// Zero WRAM, SRAM, and the I/O shadow.
    pub fn reset(&mut self) {
        self.wram.fill(0);
        self.io_shadow.fill(0);
        self.cartridge.reset_sram();
    }

    /// Fill WRAM with random bytes, approximating uninitialized DRAM contents
    /// at power-on.
    pub fn scramble_wram(&mut self) {
        rand::rng().fill_bytes(self.wram.as_mut_slice());
    }
}
