//! Public emulator interface: construction, the frame loop, and save states.

use crate::apu::Apu;
use crate::bus::Bus;
use crate::constants::{
    CPU_MCLK_DIVIDER, MCLKS_PER_FRAME, MCLKS_PER_SCANLINE, PPU_MCLK_DIVIDER, SCANLINES_PER_FRAME,
};
use crate::memory::cartridge::{Cartridge, MIN_ROM_LEN};
use crate::memory::Memory;
use crate::ppu::Ppu;
use bincode::{Decode, Encode};
use supernova_common::video::{Color, FrameSize};
use thiserror::Error;
use w65c816_emu::core::{Registers, W65c816};

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct EmulatorConfig {
    /// Fill WRAM with random bytes at power-on instead of zeros,
    /// approximating real uninitialized DRAM.
    pub randomize_wram: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("ROM is {len} bytes; at least 32KB is required after any copier header is stripped")]
    RomTooSmall { len: usize },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot holds an invalid ROM image of {len} bytes")]
    InvalidRom { len: usize },
    #[error("error encoding snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("malformed snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// A self-contained record of every component's state plus the master cycle
/// counter. Apply it to any emulator instance to resume execution exactly
/// where the snapshot was taken.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Snapshot {
    cpu: W65c816,
    memory: Memory,
    ppu: Ppu,
    apu: Apu,
    total_cycles: u64,
}

impl Snapshot {
    /// # Errors
    ///
    /// Propagates bincode serialization failures.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::encode_to_vec(self, bincode_config())?)
    }

    /// # Errors
    ///
    /// Returns an error if the bytes do not decode as a snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (snapshot, _) = bincode::decode_from_slice(bytes, bincode_config())?;
        Ok(snapshot)
    }
}

fn bincode_config() -> bincode::config::Configuration {
    bincode::config::standard()
}

macro_rules! new_bus {
    ($self:expr) => {
        Bus { memory: &mut $self.memory, ppu: &mut $self.ppu, apu: &mut $self.apu }
    };
}

#[derive(Debug, Encode, Decode)]
pub struct Emulator {
    cpu: W65c816,
    memory: Memory,
    ppu: Ppu,
    apu: Apu,
    total_cycles: u64,
    running: bool,
    config: EmulatorConfig,
}

impl Emulator {
    /// Build a powered-on system around the given ROM image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is smaller than one 32KB ROM bank after
    /// any copier header is stripped.
    pub fn create(rom: Vec<u8>, config: EmulatorConfig) -> Result<Self, LoadError> {
        let cartridge = Cartridge::create(rom)?;

        let mut emulator = Self {
            cpu: W65c816::new(),
            memory: Memory::new(cartridge),
            ppu: Ppu::new(),
            apu: Apu::new(),
            total_cycles: 0,
            running: false,
            config,
        };
        emulator.power_on();

        Ok(emulator)
    }

    /// Reset every component and start running. The CPU boots through the
    /// RESET vector read from the ROM tail.
    pub fn power_on(&mut self) {
        self.memory.reset();
        if self.config.randomize_wram {
            self.memory.scramble_wram();
        }
        self.ppu.reset();
        self.apu.reset();
        self.cpu.reset(&mut new_bus!(self));

        self.total_cycles = 0;
        self.running = true;
    }

    /// Stop running without touching component state.
    pub fn power_off(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run one full frame: 262 scanlines of 1364 master cycles, stepping the
    /// CPU every 12 master cycles, the PPU dot clock every 4, and the APU
    /// every cycle. Returns whether a frame was produced (false while
    /// powered off).
    pub fn run_frame(&mut self) -> bool {
        if !self.running {
            return false;
        }

        for line in 0..SCANLINES_PER_FRAME {
            for _ in 0..MCLKS_PER_SCANLINE {
                if self.total_cycles % CPU_MCLK_DIVIDER == 0 {
                    self.cpu.step(&mut new_bus!(self));
                }
                if self.total_cycles % PPU_MCLK_DIVIDER == 0 {
                    self.ppu.step();
                }
                self.apu.step();

                self.total_cycles += 1;
            }

            // The PPU dot clock stays in lockstep with the scanline loop
            debug_assert_eq!(self.ppu.scanline(), (line + 1) % SCANLINES_PER_FRAME);

            self.ppu.end_scanline(line);
        }

        debug_assert_eq!(self.total_cycles % MCLKS_PER_FRAME, 0);

        self.ppu.end_frame();
        self.ppu.take_frame_ready()
    }

    #[must_use]
    pub fn frame_buffer(&self) -> &[Color] {
        self.ppu.frame_buffer()
    }

    /// The framebuffer as raw RGBA8 bytes, row-major with no padding.
    #[must_use]
    pub fn frame_buffer_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.ppu.frame_buffer())
    }

    #[must_use]
    pub fn frame_size(&self) -> FrameSize {
        self.ppu.frame_size()
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.ppu.frame_count()
    }

    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    #[must_use]
    pub fn cpu_registers(&self) -> &Registers {
        self.cpu.registers()
    }

    /// Drain the APU's queued stereo output samples.
    pub fn take_audio_samples(&mut self) -> Vec<i16> {
        self.apu.take_audio_samples()
    }

    /// Capture the complete system state. Must only be called between
    /// `run_frame` calls.
    #[must_use]
    pub fn save_state(&self) -> Snapshot {
        Snapshot {
            cpu: self.cpu.clone(),
            memory: self.memory.clone(),
            ppu: self.ppu.clone(),
            apu: self.apu.clone(),
            total_cycles: self.total_cycles,
        }
    }

    /// Replace the system state with a previously captured snapshot. The
    /// emulator is left unchanged if the snapshot is refused.
    ///
    /// # Errors
    ///
    /// Refuses a snapshot whose ROM image is not a plausible cartridge.
    pub fn load_state(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        let rom_len = snapshot.memory.rom_len();
        if rom_len < MIN_ROM_LEN {
            return Err(SnapshotError::InvalidRom { len: rom_len });
        }

        self.cpu = snapshot.cpu;
        self.memory = snapshot.memory;
        self.ppu = snapshot.ppu;
        self.apu = snapshot.apu;
        self.total_cycles = snapshot.total_cycles;

        Ok(())
    }
}
