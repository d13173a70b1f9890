//! Master clock subdivision. The master clock ticks at ~21.477 MHz; the CPU
//! is stepped every 12 ticks and the PPU dot clock every 4.

pub const MCLKS_PER_SCANLINE: u64 = 1364;
pub const SCANLINES_PER_FRAME: u16 = 262;

pub const CPU_MCLK_DIVIDER: u64 = 12;
pub const PPU_MCLK_DIVIDER: u64 = 4;

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const VBLANK_START_SCANLINE: u16 = 225;
pub const HBLANK_START_DOT: u16 = 274;

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 224;

pub const MCLKS_PER_FRAME: u64 = MCLKS_PER_SCANLINE * SCANLINES_PER_FRAME as u64;
