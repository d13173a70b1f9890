use bincode::{Decode, Encode};
use supernova_common::num::GetBit;

/// Two-write data port phase (CGRAM and the OAM word buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub(crate) enum AccessFlipflop {
    First,
    Second,
}

/// Decoded CPU-visible register state. Write-only registers whose behavior is
/// out of scope (windows, color math, SETINI) are retained as raw bytes so no
/// state is lost across save states.
#[derive(Debug, Clone, Encode, Decode)]
pub(crate) struct Registers {
    // INIDISP
    pub force_blank: bool,
    pub brightness: u8,
    // OBSEL
    pub obj_size_index: u8,
    pub obj_name_select: u8,
    pub obj_tile_base: u16,
    // OAMADDL/OAMADDH + data port latches
    pub oam_address_reload: u16,
    pub oam_address: u16,
    pub oam_write_buffer: u8,
    // BGMODE
    pub bg_mode: u8,
    pub bg3_high_priority: bool,
    pub bg_tile_large: [bool; 4],
    // MOSAIC
    pub mosaic_size: u8,
    pub bg_mosaic_enabled: [bool; 4],
    // BGnSC / BGnNBA
    pub bg_tilemap_base: [u16; 4],
    pub bg_tilemap_size: [u8; 4],
    pub bg_tile_base: [u16; 4],
    // BG scroll; the previous-write latch is shared by all eight registers
    pub bg_h_scroll: [u16; 4],
    pub bg_v_scroll: [u16; 4],
    pub bg_scroll_latch: u8,
    // VMAIN / VMADD + prefetch
    pub vram_address: u16,
    pub vram_increment_step: u16,
    pub vram_increment_on_high: bool,
    pub vram_remap_mode: u8,
    pub vram_prefetch: u16,
    // Mode 7; one previous-byte latch is shared by the matrix, center, and
    // scroll registers (distinct from the BG scroll latch)
    pub mode_7_latch: u8,
    pub mode_7_matrix_a: i16,
    pub mode_7_matrix_b: i16,
    pub mode_7_matrix_c: i16,
    pub mode_7_matrix_d: i16,
    pub mode_7_center_x: i16,
    pub mode_7_center_y: i16,
    pub mode_7_h_scroll: i16,
    pub mode_7_v_scroll: i16,
    pub mode_7_product: i32,
    pub mode_7_h_flip: bool,
    pub mode_7_v_flip: bool,
    pub mode_7_oob: u8,
    // CGADD + data port latches
    pub cgram_address: u8,
    pub cgram_write_buffer: u8,
    pub cgram_flipflop: AccessFlipflop,
    // TM / TS
    pub bg_enabled: [bool; 4],
    pub obj_enabled: bool,
    pub sub_screen_layers: u8,
    // H/V counter latches
    pub latched_h_counter: u16,
    pub latched_v_counter: u16,
    pub hv_latched: bool,
    // State plumbing for out-of-scope features
    pub w12sel: u8,
    pub w34sel: u8,
    pub wobjsel: u8,
    pub wh0: u8,
    pub wh1: u8,
    pub wh2: u8,
    pub wh3: u8,
    pub wbglog: u8,
    pub wobjlog: u8,
    pub window_main_mask: u8,
    pub window_sub_mask: u8,
    pub color_math_control_a: u8,
    pub color_math_control_b: u8,
    pub fixed_color: u8,
    pub setini: u8,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            force_blank: true,
            brightness: 0,
            obj_size_index: 0,
            obj_name_select: 0,
            obj_tile_base: 0,
            oam_address_reload: 0,
            oam_address: 0,
            oam_write_buffer: 0,
            bg_mode: 0,
            bg3_high_priority: false,
            bg_tile_large: [false; 4],
            mosaic_size: 1,
            bg_mosaic_enabled: [false; 4],
            bg_tilemap_base: [0; 4],
            bg_tilemap_size: [0; 4],
            bg_tile_base: [0; 4],
            bg_h_scroll: [0; 4],
            bg_v_scroll: [0; 4],
            bg_scroll_latch: 0,
            vram_address: 0,
            vram_increment_step: 1,
            vram_increment_on_high: false,
            vram_remap_mode: 0,
            vram_prefetch: 0,
            mode_7_latch: 0,
            mode_7_matrix_a: 0,
            mode_7_matrix_b: 0,
            mode_7_matrix_c: 0,
            mode_7_matrix_d: 0,
            mode_7_center_x: 0,
            mode_7_center_y: 0,
            mode_7_h_scroll: 0,
            mode_7_v_scroll: 0,
            mode_7_product: 0,
            mode_7_h_flip: false,
            mode_7_v_flip: false,
            mode_7_oob: 0,
            cgram_address: 0,
            cgram_write_buffer: 0,
            cgram_flipflop: AccessFlipflop::First,
            bg_enabled: [false; 4],
            obj_enabled: false,
            sub_screen_layers: 0,
            latched_h_counter: 0,
            latched_v_counter: 0,
            hv_latched: false,
            w12sel: 0,
            w34sel: 0,
            wobjsel: 0,
            wh0: 0,
            wh1: 0,
            wh2: 0,
            wh3: 0,
            wbglog: 0,
            wobjlog: 0,
            window_main_mask: 0,
            window_sub_mask: 0,
            color_math_control_a: 0,
            color_math_control_b: 0,
            fixed_color: 0,
            setini: 0,
        }
    }

    pub fn write_inidisp(&mut self, value: u8) {
        self.force_blank = value.bit(7);
        self.brightness = value & 0x0F;
    }

    pub fn write_obsel(&mut self, value: u8) {
        self.obj_size_index = value >> 5;
        self.obj_name_select = (value >> 3) & 0x03;
        self.obj_tile_base = u16::from(value & 0x07) << 13;
    }

    pub fn write_oamaddl(&mut self, value: u8) {
        self.oam_address_reload = (self.oam_address_reload & 0x0100) | u16::from(value);
        self.oam_address = self.oam_address_reload << 1;
    }

    pub fn write_oamaddh(&mut self, value: u8) {
        self.oam_address_reload =
            (self.oam_address_reload & 0x00FF) | (u16::from(value & 0x01) << 8);
        self.oam_address = self.oam_address_reload << 1;
    }

    pub fn write_bgmode(&mut self, value: u8) {
        self.bg_mode = value & 0x07;
        self.bg3_high_priority = value.bit(3);
        for bg in 0..4 {
            self.bg_tile_large[bg] = value.bit(4 + bg as u8);
        }
    }

    pub fn write_mosaic(&mut self, value: u8) {
        self.mosaic_size = (value >> 4) + 1;
        for bg in 0..4 {
            self.bg_mosaic_enabled[bg] = value.bit(bg as u8);
        }
    }

    pub fn write_bg_sc(&mut self, bg: usize, value: u8) {
        self.bg_tilemap_base[bg] = u16::from(value & 0xFC) << 8;
        self.bg_tilemap_size[bg] = value & 0x03;
    }

    // $210B sets the tile data base for BG1/BG2, $210C for BG3/BG4
    pub fn write_bg_nba(&mut self, first_bg: usize, value: u8) {
        self.bg_tile_base[first_bg] = u16::from(value & 0x0F) << 12;
        self.bg_tile_base[first_bg + 1] = u16::from(value >> 4) << 12;
    }

    pub fn write_bg_h_scroll(&mut self, bg: usize, value: u8) {
        self.bg_h_scroll[bg] =
            ((u16::from(value) << 8) | u16::from(self.bg_scroll_latch)) & 0x03FF;
        self.bg_scroll_latch = value;

        if bg == 0 {
            // BG1HOFS doubles as the Mode 7 scroll register, through the
            // Mode 7 latch
            self.mode_7_h_scroll = self.mode_7_write(value) as i16;
        }
    }

    pub fn write_bg_v_scroll(&mut self, bg: usize, value: u8) {
        self.bg_v_scroll[bg] =
            ((u16::from(value) << 8) | u16::from(self.bg_scroll_latch)) & 0x03FF;
        self.bg_scroll_latch = value;

        if bg == 0 {
            self.mode_7_v_scroll = self.mode_7_write(value) as i16;
        }
    }

    pub fn write_vmain(&mut self, value: u8) {
        self.vram_increment_on_high = value.bit(7);
        self.vram_increment_step = if value.bit(7) { 32 } else { 1 };
        self.vram_remap_mode = (value >> 2) & 0x03;
    }

    pub fn write_m7sel(&mut self, value: u8) {
        self.mode_7_h_flip = value.bit(0);
        self.mode_7_v_flip = value.bit(1);
        self.mode_7_oob = value >> 6;
    }

    /// Mode 7 registers latch 16-bit values as (new byte << 8) | previous.
    fn mode_7_write(&mut self, value: u8) -> u16 {
        let word = (u16::from(value) << 8) | u16::from(self.mode_7_latch);
        self.mode_7_latch = value;
        word
    }

    pub fn write_m7a(&mut self, value: u8) {
        self.mode_7_matrix_a = self.mode_7_write(value) as i16;
        self.update_multiply_product();
    }

    pub fn write_m7b(&mut self, value: u8) {
        self.mode_7_matrix_b = self.mode_7_write(value) as i16;
        self.update_multiply_product();
    }

    pub fn write_m7c(&mut self, value: u8) {
        self.mode_7_matrix_c = self.mode_7_write(value) as i16;
    }

    pub fn write_m7d(&mut self, value: u8) {
        self.mode_7_matrix_d = self.mode_7_write(value) as i16;
    }

    pub fn write_m7x(&mut self, value: u8) {
        self.mode_7_center_x = self.mode_7_write(value) as i16;
    }

    pub fn write_m7y(&mut self, value: u8) {
        self.mode_7_center_y = self.mode_7_write(value) as i16;
    }

    // M7A times the sign-extended low byte of M7B, read back through MPYL/M/H
    fn update_multiply_product(&mut self) {
        let multiplier = i32::from(self.mode_7_matrix_b as u16 as u8 as i8);
        self.mode_7_product = i32::from(self.mode_7_matrix_a) * multiplier;
    }

    pub fn write_cgadd(&mut self, value: u8) {
        self.cgram_address = value;
        self.cgram_flipflop = AccessFlipflop::First;
    }

    pub fn write_tm(&mut self, value: u8) {
        for bg in 0..4 {
            self.bg_enabled[bg] = value.bit(bg as u8);
        }
        self.obj_enabled = value.bit(4);
    }

    pub fn write_ts(&mut self, value: u8) {
        self.sub_screen_layers = value;
    }

    pub fn read_mpyl(&self) -> u8 {
        self.mode_7_product as u8
    }

    pub fn read_mpym(&self) -> u8 {
        (self.mode_7_product >> 8) as u8
    }

    pub fn read_mpyh(&self) -> u8 {
        (self.mode_7_product >> 16) as u8
    }

    pub fn latch_hv_counters(&mut self, h: u16, v: u16) {
        self.latched_h_counter = h;
        self.latched_v_counter = v;
        self.hv_latched = true;
    }
}
