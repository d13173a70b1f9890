//! PPU register/timing surface and the scanline renderer.

mod registers;

use crate::constants::{
    DOTS_PER_SCANLINE, HBLANK_START_DOT, SCANLINES_PER_FRAME, SCREEN_HEIGHT, SCREEN_WIDTH,
    VBLANK_START_SCANLINE,
};
use crate::ppu::registers::{AccessFlipflop, Registers};
use bincode::de::read::Reader;
use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::write::Writer;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Decode, Encode};
use std::ops::{Deref, DerefMut};
use supernova_common::boxedarray::{BoxedByteArray, BoxedWordArray};
use supernova_common::num::GetBit;
use supernova_common::video::{Color, FrameSize};

const VRAM_LEN_WORDS: usize = 32 * 1024;
const VRAM_ADDRESS_MASK: u16 = (VRAM_LEN_WORDS - 1) as u16;
const CGRAM_LEN_WORDS: usize = 256;
const OAM_LEN: usize = 512 + 32;
const OAM_ADDRESS_MASK: u16 = (1 << 10) - 1;

const FRAME_BUFFER_LEN: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

type SnesColorRow = [u16; SCREEN_WIDTH];

// Small/large sprite dimensions per OBSEL size index
const OBJ_SIZES: [[(u16, u16); 2]; 8] = [
    [(8, 8), (16, 16)],
    [(8, 8), (32, 32)],
    [(8, 8), (64, 64)],
    [(16, 16), (32, 32)],
    [(16, 16), (64, 64)],
    [(32, 32), (64, 64)],
    [(16, 32), (32, 64)],
    [(16, 32), (32, 32)],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BitsPerPixel {
    Two,
    Four,
    Eight,
}

impl BitsPerPixel {
    const fn plane_pairs(self) -> u8 {
        match self {
            Self::Two => 1,
            Self::Four => 2,
            Self::Eight => 4,
        }
    }

    const fn words_per_tile(self) -> u16 {
        match self {
            Self::Two => 8,
            Self::Four => 16,
            Self::Eight => 32,
        }
    }
}

/// Backgrounds composited per mode, back to front. Modes 2-6 are approximated
/// as two 4bpp layers; their per-mode bit depths and offset-per-tile behavior
/// are beyond the scanline contract here.
fn bg_layers(mode: u8) -> &'static [(usize, BitsPerPixel)] {
    match mode {
        0 => &[
            (3, BitsPerPixel::Two),
            (2, BitsPerPixel::Two),
            (1, BitsPerPixel::Two),
            (0, BitsPerPixel::Two),
        ],
        1 => &[(2, BitsPerPixel::Two), (1, BitsPerPixel::Four), (0, BitsPerPixel::Four)],
        _ => &[(1, BitsPerPixel::Four), (0, BitsPerPixel::Four)],
    }
}

#[derive(Debug, Clone, Encode, Decode)]
struct State {
    scanline: u16,
    dot: u16,
    frame_count: u64,
    odd_frame: bool,
    in_vblank: bool,
    in_hblank: bool,
    nmi_flag: bool,
    frame_ready: bool,
    ppu1_open_bus: u8,
    ppu2_open_bus: u8,
}

impl State {
    fn new() -> Self {
        Self {
            scanline: 0,
            dot: 0,
            frame_count: 0,
            odd_frame: false,
            in_vblank: false,
            in_hblank: false,
            nmi_flag: false,
            frame_ready: false,
            ppu1_open_bus: 0,
            ppu2_open_bus: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct FrameBuffer(Box<[Color; FRAME_BUFFER_LEN]>);

impl FrameBuffer {
    fn new() -> Self {
        Self(vec![Color::BLACK; FRAME_BUFFER_LEN].into_boxed_slice().try_into().unwrap())
    }
}

impl Deref for FrameBuffer {
    type Target = Box<[Color; FRAME_BUFFER_LEN]>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for FrameBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

// Encoded as raw RGBA bytes so the 224KB buffer never round-trips through
// the stack
impl Encode for FrameBuffer {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        encoder.writer().write(bytemuck::cast_slice(self.0.as_slice()))
    }
}

impl<Context> Decode<Context> for FrameBuffer {
    fn decode<D: Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let mut frame_buffer = Self::new();
        decoder.reader().read(bytemuck::cast_slice_mut(frame_buffer.0.as_mut_slice()))?;
        Ok(frame_buffer)
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for FrameBuffer {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, DecodeError> {
        let mut frame_buffer = Self::new();
        decoder.reader().read(bytemuck::cast_slice_mut(frame_buffer.0.as_mut_slice()))?;
        Ok(frame_buffer)
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct Ppu {
    registers: Registers,
    state: State,
    vram: BoxedWordArray<VRAM_LEN_WORDS>,
    cgram: BoxedWordArray<CGRAM_LEN_WORDS>,
    oam: BoxedByteArray<OAM_LEN>,
    frame_buffer: FrameBuffer,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            registers: Registers::new(),
            state: State::new(),
            vram: BoxedWordArray::new(),
            cgram: BoxedWordArray::new(),
            oam: BoxedByteArray::new(),
            frame_buffer: FrameBuffer::new(),
        }
    }

    pub fn reset(&mut self) {
        self.registers = Registers::new();
        self.state = State::new();
        // Display comes up force-blanked
        self.registers.write_inidisp(0x80);
    }

    /// Advance one dot. 341 dots per scanline, 262 scanlines per frame;
    /// VBlank (and the NMI flag) asserts entering scanline 225.
    pub fn step(&mut self) {
        self.state.dot += 1;
        if self.state.dot == DOTS_PER_SCANLINE {
            self.state.dot = 0;
            self.state.scanline += 1;

            if self.state.scanline == VBLANK_START_SCANLINE {
                self.state.in_vblank = true;
                self.state.nmi_flag = true;
            }

            if self.state.scanline == SCANLINES_PER_FRAME {
                self.state.scanline = 0;
                self.state.in_vblank = false;
                self.state.frame_count += 1;
                self.state.odd_frame = !self.state.odd_frame;
            }
        }

        self.state.in_hblank = self.state.dot >= HBLANK_START_DOT;
    }

    /// Render one framebuffer row; lines at or below the visible region are
    /// ignored.
    pub fn end_scanline(&mut self, line: u16) {
        if usize::from(line) < SCREEN_HEIGHT {
            self.render_line(line);
        }
    }

    pub fn end_frame(&mut self) {
        self.state.frame_ready = true;
        log::trace!("Frame {} complete", self.state.frame_count);
    }

    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.state.frame_ready)
    }

    pub fn nmi_pending(&self) -> bool {
        self.state.nmi_flag
    }

    pub fn acknowledge_nmi(&mut self) {
        self.state.nmi_flag = false;
    }

    pub fn scanline(&self) -> u16 {
        self.state.scanline
    }

    pub fn frame_count(&self) -> u64 {
        self.state.frame_count
    }

    pub fn frame_buffer(&self) -> &[Color] {
        self.frame_buffer.as_slice()
    }

    pub fn frame_size(&self) -> FrameSize {
        FrameSize { width: SCREEN_WIDTH as u32, height: SCREEN_HEIGHT as u32 }
    }

    /// Register file read, keyed on the low 6 address bits.
    pub fn read_port(&mut self, address: u16) -> u8 {
        let value = match address & 0x3F {
            0x34 => self.registers.read_mpyl(),
            0x35 => self.registers.read_mpym(),
            0x36 => self.registers.read_mpyh(),
            0x37 => {
                // SLHV: latch the H/V counters; the data bus itself is open
                let (h, v) = (self.state.dot, self.state.scanline);
                self.registers.latch_hv_counters(h, v);
                return self.state.ppu1_open_bus;
            }
            0x38 => self.read_oam_data_port(),
            0x39 => self.read_vram_data_port_low(),
            0x3A => self.read_vram_data_port_high(),
            0x3B => self.read_cgram_data_port(),
            0x3C => {
                self.latch_hv_if_unlatched();
                self.registers.latched_h_counter as u8
            }
            0x3D => {
                self.latch_hv_if_unlatched();
                self.registers.latched_v_counter as u8
            }
            0x3E => {
                // STAT77
                let value = (u8::from(self.state.odd_frame) << 4)
                    | (u8::from(self.state.ppu1_open_bus != 0) << 6);
                self.registers.hv_latched = false;
                value
            }
            0x3F => {
                // STAT78: PPU1 version in the low bits, H/V counter MSBs on top
                let value = 0x03
                    | (u8::from(self.registers.setini.bit(0)) << 5)
                    | (u8::from(self.registers.latched_h_counter.bit(8)) << 6)
                    | (u8::from(self.registers.latched_v_counter.bit(8)) << 7);
                self.registers.hv_latched = false;
                value
            }
            _ => {
                // Write-only or unmapped; open bus
                return 0xFF;
            }
        };

        match address & 0x3F {
            0x34..=0x3A => self.state.ppu1_open_bus = value,
            0x3B..=0x3F => self.state.ppu2_open_bus = value,
            _ => {}
        }

        value
    }

    /// Register file write, keyed on the low 6 address bits.
    pub fn write_port(&mut self, address: u16, value: u8) {
        match address & 0x3F {
            0x00 => self.registers.write_inidisp(value),
            0x01 => self.registers.write_obsel(value),
            0x02 => self.registers.write_oamaddl(value),
            0x03 => self.registers.write_oamaddh(value),
            0x04 => self.write_oam_data_port(value),
            0x05 => self.registers.write_bgmode(value),
            0x06 => self.registers.write_mosaic(value),
            offset @ 0x07..=0x0A => self.registers.write_bg_sc((offset - 0x07) as usize, value),
            0x0B => self.registers.write_bg_nba(0, value),
            0x0C => self.registers.write_bg_nba(2, value),
            offset @ (0x0D | 0x0F | 0x11 | 0x13) => {
                self.registers.write_bg_h_scroll(((offset - 0x0D) / 2) as usize, value);
            }
            offset @ (0x0E | 0x10 | 0x12 | 0x14) => {
                self.registers.write_bg_v_scroll(((offset - 0x0E) / 2) as usize, value);
            }
            0x15 => self.registers.write_vmain(value),
            0x16 => {
                self.registers.vram_address =
                    (self.registers.vram_address & 0xFF00) | u16::from(value);
                self.fill_vram_prefetch();
            }
            0x17 => {
                self.registers.vram_address =
                    (self.registers.vram_address & 0x00FF) | (u16::from(value) << 8);
                self.fill_vram_prefetch();
            }
            0x18 => self.write_vram_data_port_low(value),
            0x19 => self.write_vram_data_port_high(value),
            0x1A => self.registers.write_m7sel(value),
            0x1B => self.registers.write_m7a(value),
            0x1C => self.registers.write_m7b(value),
            0x1D => self.registers.write_m7c(value),
            0x1E => self.registers.write_m7d(value),
            0x1F => self.registers.write_m7x(value),
            0x20 => self.registers.write_m7y(value),
            0x21 => self.registers.write_cgadd(value),
            0x22 => self.write_cgram_data_port(value),
            0x23 => self.registers.w12sel = value,
            0x24 => self.registers.w34sel = value,
            0x25 => self.registers.wobjsel = value,
            0x26 => self.registers.wh0 = value,
            0x27 => self.registers.wh1 = value,
            0x28 => self.registers.wh2 = value,
            0x29 => self.registers.wh3 = value,
            0x2A => self.registers.wbglog = value,
            0x2B => self.registers.wobjlog = value,
            0x2C => self.registers.write_tm(value),
            0x2D => self.registers.write_ts(value),
            0x2E => self.registers.window_main_mask = value,
            0x2F => self.registers.window_sub_mask = value,
            0x30 => self.registers.color_math_control_a = value,
            0x31 => self.registers.color_math_control_b = value,
            0x32 => self.registers.fixed_color = value,
            0x33 => self.registers.setini = value,
            _ => {
                log::trace!("Write to unmapped PPU register 21{:02X}: {value:02X}", address & 0x3F);
            }
        }
    }

    fn latch_hv_if_unlatched(&mut self) {
        if !self.registers.hv_latched {
            let (h, v) = (self.state.dot, self.state.scanline);
            self.registers.latch_hv_counters(h, v);
        }
    }

    // VMAIN bits 2-3 rotate the word address so sequential port writes lay
    // out bitplane data column-first
    fn translated_vram_address(&self) -> u16 {
        let address = self.registers.vram_address;
        let translated = match self.registers.vram_remap_mode {
            0 => address,
            1 => (address & 0xFF00) | ((address & 0x001F) << 3) | ((address >> 5) & 0x0007),
            2 => (address & 0xFE00) | ((address & 0x003F) << 3) | ((address >> 6) & 0x0007),
            3 => (address & 0xFC00) | ((address & 0x007F) << 3) | ((address >> 7) & 0x0007),
            _ => unreachable!("remap mode is two bits"),
        };
        translated & VRAM_ADDRESS_MASK
    }

    fn increment_vram_address(&mut self) {
        self.registers.vram_address =
            self.registers.vram_address.wrapping_add(self.registers.vram_increment_step);
    }

    fn fill_vram_prefetch(&mut self) {
        self.registers.vram_prefetch = self.vram[usize::from(self.translated_vram_address())];
    }

    fn write_vram_data_port_low(&mut self, value: u8) {
        let address = usize::from(self.translated_vram_address());
        self.vram[address] = (self.vram[address] & 0xFF00) | u16::from(value);

        if !self.registers.vram_increment_on_high {
            self.increment_vram_address();
        }
    }

    fn write_vram_data_port_high(&mut self, value: u8) {
        let address = usize::from(self.translated_vram_address());
        self.vram[address] = (self.vram[address] & 0x00FF) | (u16::from(value) << 8);

        if self.registers.vram_increment_on_high {
            self.increment_vram_address();
        }
    }

    fn read_vram_data_port_low(&mut self) -> u8 {
        let value = self.registers.vram_prefetch as u8;

        if !self.registers.vram_increment_on_high {
            // Refill the prefetch buffer before the address moves
            self.fill_vram_prefetch();
            self.increment_vram_address();
        }

        value
    }

    fn read_vram_data_port_high(&mut self) -> u8 {
        let value = (self.registers.vram_prefetch >> 8) as u8;

        if self.registers.vram_increment_on_high {
            self.fill_vram_prefetch();
            self.increment_vram_address();
        }

        value
    }

    fn write_oam_data_port(&mut self, value: u8) {
        let oam_address = self.registers.oam_address;
        if oam_address >= 0x200 {
            // High table bytes are written directly; $220-$3FF mirrors $200-$21F
            self.oam[usize::from(0x200 | (oam_address & 0x1F))] = value;
        } else if !oam_address.bit(0) {
            // Even address: buffer the low byte
            self.registers.oam_write_buffer = value;
        } else {
            // Odd address: commit the buffered word
            self.oam[usize::from(oam_address & !1)] = self.registers.oam_write_buffer;
            self.oam[usize::from(oam_address)] = value;
        }

        self.registers.oam_address = (oam_address + 1) & OAM_ADDRESS_MASK;
    }

    fn read_oam_data_port(&mut self) -> u8 {
        let oam_address = self.registers.oam_address;
        let value = if oam_address >= 0x200 {
            self.oam[usize::from(0x200 | (oam_address & 0x1F))]
        } else {
            self.oam[usize::from(oam_address)]
        };

        self.registers.oam_address = (oam_address + 1) & OAM_ADDRESS_MASK;

        value
    }

    fn write_cgram_data_port(&mut self, value: u8) {
        match self.registers.cgram_flipflop {
            AccessFlipflop::First => {
                self.registers.cgram_write_buffer = value;
                self.registers.cgram_flipflop = AccessFlipflop::Second;
            }
            AccessFlipflop::Second => {
                // Bit 7 of the high byte is not stored
                self.cgram[usize::from(self.registers.cgram_address)] =
                    u16::from_le_bytes([self.registers.cgram_write_buffer, value & 0x7F]);
                self.registers.cgram_flipflop = AccessFlipflop::First;
                self.registers.cgram_address = self.registers.cgram_address.wrapping_add(1);
            }
        }
    }

    fn read_cgram_data_port(&mut self) -> u8 {
        let word = self.cgram[usize::from(self.registers.cgram_address)];

        match self.registers.cgram_flipflop {
            AccessFlipflop::First => {
                self.registers.cgram_flipflop = AccessFlipflop::Second;
                word as u8
            }
            AccessFlipflop::Second => {
                self.registers.cgram_flipflop = AccessFlipflop::First;
                self.registers.cgram_address = self.registers.cgram_address.wrapping_add(1);
                (word >> 8) as u8 & 0x7F
            }
        }
    }

    fn render_line(&mut self, line: u16) {
        let row_base = usize::from(line) * SCREEN_WIDTH;

        if self.registers.force_blank {
            self.frame_buffer[row_base..row_base + SCREEN_WIDTH].fill(Color::BLACK);
            return;
        }

        // Backdrop, then backgrounds back-to-front, then sprites on top
        let mut row: SnesColorRow = [self.cgram[0]; SCREEN_WIDTH];

        if self.registers.bg_mode == 7 {
            if self.registers.bg_enabled[0] {
                self.render_mode_7_row(line, &mut row);
            }
        } else {
            for &(bg, bpp) in bg_layers(self.registers.bg_mode) {
                if self.registers.bg_enabled[bg] {
                    self.render_bg_row(bg, bpp, line, &mut row);
                }
            }
        }

        if self.registers.obj_enabled {
            self.render_sprite_row(line, &mut row);
        }

        let brightness = self.registers.brightness;
        for (x, &snes_color) in row.iter().enumerate() {
            self.frame_buffer[row_base + x] = convert_snes_color(snes_color, brightness);
        }
    }

    fn render_bg_row(&self, bg: usize, bpp: BitsPerPixel, line: u16, row: &mut SnesColorRow) {
        // In mode 0 each background uses its own quarter of CGRAM
        let two_bpp_palette_base =
            if self.registers.bg_mode == 0 { 0x20 * bg as u8 } else { 0 };

        let y = line.wrapping_add(self.registers.bg_v_scroll[bg]);
        let h_scroll = self.registers.bg_h_scroll[bg];

        for (pixel, out) in row.iter_mut().enumerate() {
            let x = (pixel as u16).wrapping_add(h_scroll);
            if let Some(color) = self.bg_pixel_color(bg, bpp, x, y, two_bpp_palette_base) {
                *out = color;
            }
        }
    }

    fn bg_map_entry(&self, bg: usize, x: u16, y: u16) -> u16 {
        let tile_dim: u16 = if self.registers.bg_tile_large[bg] { 16 } else { 8 };
        let screen_dim_pixels = 32 * tile_dim;

        let (width_screens, height_screens) = match self.registers.bg_tilemap_size[bg] {
            0 => (1, 1),
            1 => (2, 1),
            2 => (1, 2),
            _ => (2, 2),
        };

        let x = x & (width_screens * screen_dim_pixels - 1);
        let y = y & (height_screens * screen_dim_pixels - 1);

        // The full map is built from 32x32-entry screens
        let mut base = self.registers.bg_tilemap_base[bg];
        if x >= screen_dim_pixels {
            base = base.wrapping_add(32 * 32);
        }
        if y >= screen_dim_pixels {
            base = base.wrapping_add(if width_screens == 2 { 2 * 32 * 32 } else { 32 * 32 });
        }

        let tile_row = (y & (screen_dim_pixels - 1)) / tile_dim;
        let tile_col = (x & (screen_dim_pixels - 1)) / tile_dim;
        self.vram[usize::from(base.wrapping_add(32 * tile_row + tile_col) & VRAM_ADDRESS_MASK)]
    }

    fn bg_pixel_color(
        &self,
        bg: usize,
        bpp: BitsPerPixel,
        x: u16,
        y: u16,
        two_bpp_palette_base: u8,
    ) -> Option<u16> {
        let tile_dim: u16 = if self.registers.bg_tile_large[bg] { 16 } else { 8 };

        let entry = self.bg_map_entry(bg, x, y);
        let mut tile_number = entry & 0x3FF;
        let palette = ((entry >> 10) & 0x07) as u8;
        let x_flip = entry.bit(14);
        let y_flip = entry.bit(15);

        let mut fine_x = x % tile_dim;
        let mut fine_y = y % tile_dim;
        if x_flip {
            fine_x = tile_dim - 1 - fine_x;
        }
        if y_flip {
            fine_y = tile_dim - 1 - fine_y;
        }

        // 16x16 tiles are four adjacent 8x8 cells in the tile data area
        if fine_x >= 8 {
            tile_number = (tile_number + 1) & 0x3FF;
            fine_x -= 8;
        }
        if fine_y >= 8 {
            tile_number = (tile_number + 16) & 0x3FF;
            fine_y -= 8;
        }

        let tile_addr = self.registers.bg_tile_base[bg]
            .wrapping_add(tile_number * bpp.words_per_tile())
            & VRAM_ADDRESS_MASK;

        let color = self.decode_tile_pixel(tile_addr, bpp, fine_x as u8, fine_y);
        if color == 0 {
            return None;
        }

        let cgram_index = match bpp {
            BitsPerPixel::Two => two_bpp_palette_base + (palette << 2) + color,
            BitsPerPixel::Four => (palette << 4) + color,
            BitsPerPixel::Eight => color,
        };
        Some(self.cgram[usize::from(cgram_index)])
    }

    // Planar tile format: bitplane pairs interleaved every 8 words
    fn decode_tile_pixel(&self, tile_addr: u16, bpp: BitsPerPixel, fine_x: u8, fine_y: u16) -> u8 {
        let bit_index = 7 - fine_x;

        let mut color = 0_u8;
        for pair in 0..bpp.plane_pairs() {
            let word = self.vram
                [usize::from(tile_addr.wrapping_add(fine_y + 8 * u16::from(pair)) & VRAM_ADDRESS_MASK)];
            color |= u8::from(word.bit(bit_index)) << (2 * pair);
            color |= u8::from(word.bit(bit_index + 8)) << (2 * pair + 1);
        }

        color
    }

    fn render_mode_7_row(&self, line: u16, row: &mut SnesColorRow) {
        // The Mode 7 playfield is a fixed 128x128 tile map at VRAM $0000
        const PLAYFIELD_SIZE_PIXELS: i32 = 128 * 8;

        let m7a = i32::from(self.registers.mode_7_matrix_a);
        let m7b = i32::from(self.registers.mode_7_matrix_b);
        let m7c = i32::from(self.registers.mode_7_matrix_c);
        let m7d = i32::from(self.registers.mode_7_matrix_d);

        let center_x = extend_signed_13_bit(self.registers.mode_7_center_x as u16);
        let center_y = extend_signed_13_bit(self.registers.mode_7_center_y as u16);
        let h_scroll = extend_signed_13_bit(self.registers.mode_7_h_scroll as u16);
        let v_scroll = extend_signed_13_bit(self.registers.mode_7_v_scroll as u16);

        let screen_y = if self.registers.mode_7_v_flip { 255 - line } else { line };
        let shifted_y = i32::from(screen_y) + v_scroll - center_y;

        for (pixel, out) in row.iter_mut().enumerate() {
            let screen_x =
                if self.registers.mode_7_h_flip { 255 - pixel as u16 } else { pixel as u16 };
            let shifted_x = i32::from(screen_x) + h_scroll - center_x;

            let mut field_x =
                m7a.wrapping_mul(shifted_x).wrapping_add(m7b.wrapping_mul(shifted_y)) >> 8;
            let mut field_y =
                m7c.wrapping_mul(shifted_x).wrapping_add(m7d.wrapping_mul(shifted_y)) >> 8;
            field_x = field_x.wrapping_add(center_x);
            field_y = field_y.wrapping_add(center_y);

            let mut force_tile_0 = false;
            if field_x < 0
                || field_y < 0
                || field_x >= PLAYFIELD_SIZE_PIXELS
                || field_y >= PLAYFIELD_SIZE_PIXELS
            {
                match self.registers.mode_7_oob {
                    0 | 1 => {
                        field_x &= PLAYFIELD_SIZE_PIXELS - 1;
                        field_y &= PLAYFIELD_SIZE_PIXELS - 1;
                    }
                    2 => continue,
                    _ => {
                        field_x &= 0x07;
                        field_y &= 0x07;
                        force_tile_0 = true;
                    }
                }
            }

            let tile_number = if force_tile_0 {
                0
            } else {
                let map_index = (field_y / 8) * (PLAYFIELD_SIZE_PIXELS / 8) + field_x / 8;
                self.vram[map_index as usize] & 0x00FF
            };

            // Tile data is the high byte of each playfield word
            let pixel_addr = 64 * tile_number + 8 * (field_y % 8) as u16 + (field_x % 8) as u16;
            let color = (self.vram[usize::from(pixel_addr)] >> 8) as u8;
            if color != 0 {
                *out = self.cgram[usize::from(color)];
            }
        }
    }

    fn render_sprite_row(&self, line: u16, row: &mut SnesColorRow) {
        let [small_size, large_size] = OBJ_SIZES[usize::from(self.registers.obj_size_index)];
        let name_gap = u16::from(self.registers.obj_name_select) << 12;

        // Lower OAM indices win overlaps
        let mut drawn = [false; SCREEN_WIDTH];

        for index in 0..128_usize {
            let oam_addr = index << 2;
            let x_lsb = self.oam[oam_addr];
            // A sprite at Y=0 first appears on scanline 1
            let y = self.oam[oam_addr + 1].wrapping_add(1);
            let tile_lsb = self.oam[oam_addr + 2];
            let attributes = self.oam[oam_addr + 3];

            let extra_bits = self.oam[512 + (index >> 2)] >> (2 * (index & 0x03));
            let (width, height) =
                if extra_bits.bit(1) { large_size } else { small_size };

            if !line_overlaps_sprite(y, height, line) {
                continue;
            }

            let x = u16::from_le_bytes([x_lsb, u8::from(extra_bits.bit(0))]);
            let palette = (attributes >> 1) & 0x07;
            let x_flip = attributes.bit(6);
            let y_flip = attributes.bit(7);
            let base_tile = u16::from_le_bytes([tile_lsb, u8::from(attributes.bit(0))]);

            let mut sprite_line = (line as u8).wrapping_sub(y) & (height - 1) as u8;
            if y_flip {
                sprite_line = (height - 1) as u8 - sprite_line;
            }

            for i in 0..width {
                let screen_x = usize::from(x.wrapping_add(i) & 0x1FF);
                if screen_x >= SCREEN_WIDTH || drawn[screen_x] {
                    continue;
                }

                let sprite_pixel = if x_flip { width - 1 - i } else { i };

                // Large sprites step tile columns in the low nibble and rows
                // in the high nibble, without carrying between them
                let mut tile_number = base_tile;
                tile_number = (tile_number & !0x0F)
                    | (tile_number.wrapping_add(sprite_pixel / 8) & 0x0F);
                tile_number = (tile_number & !0xF0)
                    | (tile_number.wrapping_add(u16::from(sprite_line / 8) << 4) & 0xF0);

                let tile_base = self.registers.obj_tile_base
                    + u16::from(tile_number.bit(8)) * (256 * 16 + name_gap);
                let tile_addr = tile_base.wrapping_add((tile_number & 0x00FF) * 16)
                    & VRAM_ADDRESS_MASK;

                let color = self.decode_tile_pixel(
                    tile_addr,
                    BitsPerPixel::Four,
                    (sprite_pixel % 8) as u8,
                    u16::from(sprite_line % 8),
                );
                if color != 0 {
                    // OBJ palettes occupy the second half of CGRAM
                    row[screen_x] = self.cgram[usize::from(0x80 + (palette << 4) + color)];
                    drawn[screen_x] = true;
                }
            }
        }
    }
}

fn line_overlaps_sprite(sprite_y: u8, sprite_height: u16, line: u16) -> bool {
    let line = line as u8;
    let sprite_bottom = sprite_y.wrapping_add(sprite_height as u8);
    if sprite_bottom > sprite_y {
        (sprite_y..sprite_bottom).contains(&line)
    } else {
        line >= sprite_y || line < sprite_bottom
    }
}

// Center/scroll registers hold signed 13-bit values
fn extend_signed_13_bit(value: u16) -> i32 {
    i32::from((value << 3) as i16) >> 3
}

fn convert_snes_color(snes_color: u16, brightness: u8) -> Color {
    let expand = |component: u16| -> u8 {
        let component = (component & 0x1F) as u8;
        let full = (component << 3) | (component >> 2);
        (u16::from(full) * u16::from(brightness) / 15) as u8
    };

    Color::rgb(expand(snes_color), expand(snes_color >> 5), expand(snes_color >> 10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn vram_word_round_trips_through_data_ports() {
        let mut ppu = Ppu::new();

        // VMAIN: increment on high byte write/read
        ppu.write_port(0x2115, 0x80);
        // VMADD = $0123
        ppu.write_port(0x2116, 0x23);
        ppu.write_port(0x2117, 0x01);
        ppu.write_port(0x2118, 0xCD);
        ppu.write_port(0x2119, 0xAB);

        assert_eq!(ppu.vram[0x0123], 0xABCD);

        // Read back through the prefetched data port
        ppu.write_port(0x2116, 0x23);
        ppu.write_port(0x2117, 0x01);
        assert_eq!(ppu.read_port(0x2139), 0xCD);
        assert_eq!(ppu.read_port(0x213A), 0xAB);
    }

    #[test]
    fn vmain_trigger_selects_incrementing_port() {
        let mut ppu = Ppu::new();

        // Increment on low byte write: high-byte writes do not move the address
        ppu.write_port(0x2115, 0x00);
        ppu.write_port(0x2116, 0x00);
        ppu.write_port(0x2117, 0x00);
        ppu.write_port(0x2119, 0xAB);
        ppu.write_port(0x2119, 0xCD);
        assert_eq!(ppu.vram[0], 0xCD00);

        ppu.write_port(0x2118, 0x11);
        assert_eq!(ppu.vram[0], 0xCD11);
        // The low-byte write advanced the address
        ppu.write_port(0x2118, 0x22);
        assert_eq!(ppu.vram[1] & 0x00FF, 0x22);
    }

    #[test]
    fn cgram_round_trips_and_masks_high_bit() {
        let mut ppu = Ppu::new();

        ppu.write_port(0x2121, 0x10);
        ppu.write_port(0x2122, 0x34);
        ppu.write_port(0x2122, 0xF2);

        // Bit 7 of the high byte is dropped
        assert_eq!(ppu.cgram[0x10], 0x7234);

        ppu.write_port(0x2121, 0x10);
        assert_eq!(ppu.read_port(0x213B), 0x34);
        assert_eq!(ppu.read_port(0x213B), 0x72);
    }

    #[test]
    fn oam_words_commit_on_second_write() {
        let mut ppu = Ppu::new();

        ppu.write_port(0x2102, 0x00);
        ppu.write_port(0x2103, 0x00);
        ppu.write_port(0x2104, 0x11);
        // Nothing lands until the odd-address write
        assert_eq!(ppu.oam[0], 0x00);
        ppu.write_port(0x2104, 0x22);
        assert_eq!(ppu.oam[0], 0x11);
        assert_eq!(ppu.oam[1], 0x22);

        ppu.write_port(0x2102, 0x00);
        ppu.write_port(0x2103, 0x00);
        assert_eq!(ppu.read_port(0x2138), 0x11);
        assert_eq!(ppu.read_port(0x2138), 0x22);
    }

    #[test]
    fn vblank_and_frame_flags_follow_the_dot_clock() {
        let mut ppu = Ppu::new();

        // Run up to the end of scanline 224
        for _ in 0..u32::from(DOTS_PER_SCANLINE) * 225 {
            assert!(!ppu.state.in_vblank);
            ppu.step();
        }
        assert!(ppu.state.in_vblank);
        assert!(ppu.nmi_pending());
        assert_eq!(ppu.scanline(), 225);

        // Finish the frame
        for _ in 0..u32::from(DOTS_PER_SCANLINE) * 37 {
            ppu.step();
        }
        assert_eq!(ppu.scanline(), 0);
        assert!(!ppu.state.in_vblank);
        assert_eq!(ppu.frame_count(), 1);
        assert!(ppu.state.odd_frame);
    }

    #[test]
    fn hblank_tracks_the_dot_position() {
        let mut ppu = Ppu::new();

        for _ in 0..u32::from(HBLANK_START_DOT) {
            ppu.step();
        }
        assert!(ppu.state.in_hblank);

        for _ in 0..u32::from(DOTS_PER_SCANLINE - HBLANK_START_DOT) {
            ppu.step();
        }
        assert!(!ppu.state.in_hblank);
    }

    #[test]
    fn slhv_latches_counters_for_ophct_opvct() {
        let mut ppu = Ppu::new();

        for _ in 0..500 {
            ppu.step();
        }
        // dot 159 of scanline 1
        ppu.read_port(0x2137);
        assert_eq!(ppu.read_port(0x213C), 159);
        assert_eq!(ppu.read_port(0x213D), 1);

        // STAT78 carries the counter MSBs and clears the latch
        let stat78 = ppu.read_port(0x213F);
        assert_eq!(stat78 & 0x03, 0x03);
        assert_eq!(stat78 & 0xC0, 0x00);
        assert!(!ppu.registers.hv_latched);
    }

    #[test]
    fn force_blank_renders_black() {
        let mut ppu = Ppu::new();
        ppu.write_port(0x2100, 0x80);
        // Palette entry 0 is white
        ppu.cgram[0] = 0x7FFF;

        ppu.end_scanline(10);
        assert_eq!(ppu.frame_buffer()[10 * SCREEN_WIDTH], Color::BLACK);
    }

    #[test]
    fn backdrop_fills_visible_lines_at_full_brightness() {
        let mut ppu = Ppu::new();
        // Display on, full brightness
        ppu.write_port(0x2100, 0x0F);
        // Backdrop color: pure red
        ppu.cgram[0] = 0x001F;

        ppu.end_scanline(0);
        let pixel = ppu.frame_buffer()[0];
        assert_eq!(pixel, Color::rgb(255, 0, 0));
    }

    #[test]
    fn brightness_scales_output_channels() {
        let mut ppu = Ppu::new();
        ppu.write_port(0x2100, 0x07);
        ppu.cgram[0] = 0x001F;

        ppu.end_scanline(0);
        let pixel = ppu.frame_buffer()[0];
        assert_eq!(pixel.r, (255 * 7 / 15) as u8);
        assert_eq!(pixel.g, 0);
    }

    #[test]
    fn enabled_background_tile_overrides_backdrop() {
        let mut ppu = Ppu::new();
        ppu.write_port(0x2100, 0x0F);
        // Mode 1, BG1 enabled on the main screen
        ppu.write_port(0x2105, 0x01);
        ppu.write_port(0x212C, 0x01);
        // BG1 tilemap at $0400 (words), tile data at $1000 (words)
        ppu.write_port(0x2107, 0x04);
        ppu.write_port(0x210B, 0x01);

        // Tilemap entry (0,0): tile 1, palette 2
        ppu.vram[0x0400] = (2 << 10) | 1;
        // Tile 1, row 0: leftmost pixel color 1 (4bpp)
        ppu.vram[0x1000 + 16] = 0x0080;
        // Palette 2, color 1 (4bpp palettes are 16 entries)
        ppu.cgram[2 * 16 + 1] = 0x03E0;

        ppu.end_scanline(0);
        assert_eq!(ppu.frame_buffer()[0], Color::rgb(0, 255, 0));
        // Pixel 1 is still backdrop
        assert_eq!(ppu.frame_buffer()[1], Color::BLACK);
    }

    #[test]
    fn sprite_pixels_overlay_backgrounds() {
        let mut ppu = Ppu::new();
        ppu.write_port(0x2100, 0x0F);
        // OBJ enabled on the main screen, 8x8 sprites, tile data at $0000
        ppu.write_port(0x212C, 0x10);
        ppu.write_port(0x2101, 0x00);

        // Sprite 0: X=4, Y=9 (displays starting line 10), tile 2, palette 0
        ppu.oam[0] = 4;
        ppu.oam[1] = 9;
        ppu.oam[2] = 2;
        ppu.oam[3] = 0;

        // Tile 2, row 0: leftmost pixel color 1
        ppu.vram[2 * 16] = 0x0080;
        // OBJ palette 0, color 1
        ppu.cgram[0x81] = 0x7C00;

        ppu.end_scanline(10);
        assert_eq!(ppu.frame_buffer()[10 * SCREEN_WIDTH + 4], Color::rgb(0, 0, 255));
    }

    #[test]
    fn mode_7_identity_matrix_maps_playfield_directly() {
        let mut ppu = Ppu::new();
        ppu.write_port(0x2100, 0x0F);
        // Mode 7, BG1 enabled
        ppu.write_port(0x2105, 0x07);
        ppu.write_port(0x212C, 0x01);
        // Identity matrix: A = D = $0100 (1.0 in 8.8 fixed point)
        ppu.write_port(0x211B, 0x00);
        ppu.write_port(0x211B, 0x01);
        ppu.write_port(0x211E, 0x00);
        ppu.write_port(0x211E, 0x01);

        // Playfield entry (0,0) = tile 3; tile 3 pixel (0,0) = color $42
        ppu.vram[0] = 3;
        ppu.vram[64 * 3] = 0x4200;
        ppu.cgram[0x42] = 0x001F;

        ppu.end_scanline(0);
        assert_eq!(ppu.frame_buffer()[0], Color::rgb(255, 0, 0));
    }
}
