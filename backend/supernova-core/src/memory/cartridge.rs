use crate::api::LoadError;
use bincode::{Decode, Encode};
use crc::Crc;
use std::ops::Deref;
use supernova_common::boxedarray::BoxedByteArray;
use supernova_common::num::U24Ext;

pub(crate) const MIN_ROM_LEN: usize = 0x8000;
const COPIER_HEADER_LEN: usize = 512;
const SRAM_LEN: usize = 32 * 1024;

const LOROM_HEADER_ADDR: usize = 0x7FC0;
const HEADER_TITLE_LEN: usize = 21;

// The last 32 bytes of the ROM hold the interrupt vector table
const VECTOR_TABLE_LEN: usize = 32;
const COP_VECTOR_OFFSET: usize = 0x14;
const BRK_VECTOR_OFFSET: usize = 0x16;
const NMI_VECTOR_OFFSET: usize = 0x1A;
const RESET_VECTOR_OFFSET: usize = 0x1C;
const IRQ_VECTOR_OFFSET: usize = 0x1E;

const CRC32: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct Rom(Box<[u8]>);

impl Deref for Rom {
    type Target = Box<[u8]>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct Cartridge {
    rom: Rom,
    sram: BoxedByteArray<SRAM_LEN>,
}

impl Cartridge {
    /// Take ownership of a raw ROM image, stripping a 512-byte copier header
    /// if one is present. Fails only when the remaining image is smaller than
    /// one 32KB bank.
    pub fn create(mut rom: Vec<u8>) -> Result<Self, LoadError> {
        if rom.len() % MIN_ROM_LEN == COPIER_HEADER_LEN {
            log::info!("Stripping {COPIER_HEADER_LEN}-byte copier header");
            rom.drain(..COPIER_HEADER_LEN);
        }

        if rom.len() < MIN_ROM_LEN {
            return Err(LoadError::RomTooSmall { len: rom.len() });
        }

        log::info!("ROM size: {} bytes, CRC32 {:08X}", rom.len(), CRC32.checksum(&rom));
        if let Some(title) = header_title(&rom) {
            log::info!("Cartridge title: {title}");
        }
        log_vector_table(&rom);

        Ok(Self { rom: Rom(rom.into_boxed_slice()), sram: BoxedByteArray::new() })
    }

    /// Resolve a cartridge-range bus address to a ROM byte. System-area banks
    /// map LoROM-style with the `$FFE0-$FFFF` window redirected to the vector
    /// table at the end of the image; the upper bank halves map linearly.
    /// Addresses beyond the image read as open bus.
    pub fn read_rom(&self, address: u32) -> u8 {
        let bank = address.bank();
        let offset = address.bank_offset();

        let rom_addr = match (bank, offset) {
            (0x00..=0x3F | 0x80..=0xBF, 0xFFE0..=0xFFFF) => {
                (self.rom.len() - VECTOR_TABLE_LEN) as u32 + u32::from(offset - 0xFFE0)
            }
            (0x00..=0x3F | 0x80..=0xBF, 0x8000..=0xFFFF) => {
                u32::from(bank & 0x7F) * 0x8000 + u32::from(offset - 0x8000)
            }
            (0x40..=0x7D | 0xC0..=0xFF, _) => u32::from(bank) * 0x10000 + u32::from(offset),
            _ => return 0xFF,
        };

        self.rom.get(rom_addr as usize).copied().unwrap_or(0xFF)
    }

    pub fn rom_len(&self) -> usize {
        self.rom.len()
    }

    pub fn read_sram(&self, address: u32) -> u8 {
        self.sram[sram_index(address)]
    }

    pub fn write_sram(&mut self, address: u32, value: u8) {
        self.sram[sram_index(address)] = value;
    }

    pub fn reset_sram(&mut self) {
        self.sram.fill(0);
    }
}

fn sram_index(address: u32) -> usize {
    let bank = address.bank();
    let offset = address.bank_offset();
    ((usize::from(bank) << 13) | usize::from(offset & 0x1FFF)) & (SRAM_LEN - 1)
}

fn header_title(rom: &[u8]) -> Option<String> {
    let title_bytes = rom.get(LOROM_HEADER_ADDR..LOROM_HEADER_ADDR + HEADER_TITLE_LEN)?;
    if !title_bytes.iter().all(|&b| b == 0 || (0x20..0x7F).contains(&b)) {
        return None;
    }

    let title: String =
        title_bytes.iter().take_while(|&&b| b != 0).map(|&b| char::from(b)).collect();
    let title = title.trim().to_owned();
    (!title.is_empty()).then_some(title)
}

fn log_vector_table(rom: &[u8]) {
    let tail = rom.len() - VECTOR_TABLE_LEN;
    let vector =
        |offset: usize| u16::from_le_bytes([rom[tail + offset], rom[tail + offset + 1]]);

    log::info!(
        "Interrupt vectors: COP={:04X} BRK={:04X} NMI={:04X} RESET={:04X} IRQ={:04X}",
        vector(COP_VECTOR_OFFSET),
        vector(BRK_VECTOR_OFFSET),
        vector(NMI_VECTOR_OFFSET),
        vector(RESET_VECTOR_OFFSET),
        vector(IRQ_VECTOR_OFFSET),
    );
}
