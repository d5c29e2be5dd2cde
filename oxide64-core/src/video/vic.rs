// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

// SPEC: The MOS 6567/6569 video controller (VIC-II) and its application in the Commodore 64

#[cfg(not(feature = "std"))]
use alloc::prelude::*;

use bit_field::BitField;

use crate::factory::types::{Addressable, Chip, VideoOutput};
use crate::factory::VicModel;
use crate::util::{IrqLine, Pin, Ram, Shared, SharedCell};

use super::border_unit::BorderUnit;
use super::gfx_sequencer::{self, GfxSequencer};
use super::mux_unit::MuxUnit;
use super::spec::Spec;
use super::sprite_sequencer::{self, SpriteSequencer};
use super::vic_memory::VicMemory;

// VIC pulls the shared irq line on a source index distinct from CIA1 (source 0).
const IRQ_SOURCE_VIC: usize = 1;

const FIRST_BAD_LINE: u16 = 0x30;
const LAST_BAD_LINE: u16 = 0xf7;
const DISPLAY_WINDOW_START: u16 = 15;
const DISPLAY_WINDOW_LEN: u16 = 40;
const SPRITE_DMA_WINDOW: u16 = 16;

#[derive(Copy, Clone)]
pub enum Reg {
    M0X = 0x00,
    M0Y = 0x01,
    M1X = 0x02,
    M1Y = 0x03,
    M2X = 0x04,
    M2Y = 0x05,
    M3X = 0x06,
    M3Y = 0x07,
    M4X = 0x08,
    M4Y = 0x09,
    M5X = 0x0a,
    M5Y = 0x0b,
    M6X = 0x0c,
    M6Y = 0x0d,
    M7X = 0x0e,
    M7Y = 0x0f,
    MX8 = 0x10,
    CR1 = 0x11,
    RASTER = 0x12,
    LPX = 0x13,
    LPY = 0x14,
    ME = 0x15,
    CR2 = 0x16,
    MYE = 0x17,
    MEMPTR = 0x18,
    IRR = 0x19,
    IMR = 0x1a,
    MDP = 0x1b,
    MMC = 0x1c,
    MXE = 0x1d,
    MM = 0x1e,
    MD = 0x1f,
    EC = 0x20,
    B0C = 0x21,
    B1C = 0x22,
    B2C = 0x23,
    B3C = 0x24,
    MM0 = 0x25,
    MM1 = 0x26,
    M0C = 0x27,
    M1C = 0x28,
    M2C = 0x29,
    M3C = 0x2a,
    M4C = 0x2b,
    M5C = 0x2c,
    M6C = 0x2d,
    M7C = 0x2e,
    IGNORE = 0xff,
}

impl Reg {
    pub fn from(reg: u8) -> Reg {
        match reg {
            0x00 => Reg::M0X,
            0x01 => Reg::M0Y,
            0x02 => Reg::M1X,
            0x03 => Reg::M1Y,
            0x04 => Reg::M2X,
            0x05 => Reg::M2Y,
            0x06 => Reg::M3X,
            0x07 => Reg::M3Y,
            0x08 => Reg::M4X,
            0x09 => Reg::M4Y,
            0x0a => Reg::M5X,
            0x0b => Reg::M5Y,
            0x0c => Reg::M6X,
            0x0d => Reg::M6Y,
            0x0e => Reg::M7X,
            0x0f => Reg::M7Y,
            0x10 => Reg::MX8,
            0x11 => Reg::CR1,
            0x12 => Reg::RASTER,
            0x13 => Reg::LPX,
            0x14 => Reg::LPY,
            0x15 => Reg::ME,
            0x16 => Reg::CR2,
            0x17 => Reg::MYE,
            0x18 => Reg::MEMPTR,
            0x19 => Reg::IRR,
            0x1a => Reg::IMR,
            0x1b => Reg::MDP,
            0x1c => Reg::MMC,
            0x1d => Reg::MXE,
            0x1e => Reg::MM,
            0x1f => Reg::MD,
            0x20 => Reg::EC,
            0x21 => Reg::B0C,
            0x22 => Reg::B1C,
            0x23 => Reg::B2C,
            0x24 => Reg::B3C,
            0x25 => Reg::MM0,
            0x26 => Reg::MM1,
            0x27 => Reg::M0C,
            0x28 => Reg::M1C,
            0x29 => Reg::M2C,
            0x2a => Reg::M3C,
            0x2b => Reg::M4C,
            0x2c => Reg::M5C,
            0x2d => Reg::M6C,
            0x2e => Reg::M7C,
            0x2f..=0x3f => Reg::IGNORE,
            _ => panic!("invalid reg {}", reg),
        }
    }
}

/// VIC-II video controller.
///
/// Drives the raster beam, steals bus cycles from the CPU on bad lines and sprite
/// DMA (signalled through the shared `ba_line`), and produces one 8-pixel dot
/// cluster per `clock()` call into `frame_buffer`.
/// Runtime state of one sprite's pixel shift register, captured directly since
/// it evolves every cycle and isn't reachable through the $D000 register file.
pub struct SpriteState {
    pub counter: u32,
    pub data: u32,
    pub delay_cycles: u8,
    pub output: Option<u8>,
}

/// Plain snapshot of a `Vic`'s internal fields, captured directly rather than
/// through `read`/`write`: the mmio register path clears the sprite-sprite and
/// sprite-background collision registers ($D01E/$D01F) on read, which would
/// corrupt a live machine's pending-collision state just to serialize it.
/// Fields kept in sync every cycle by `sync_configs` (sprite/border/mux
/// `config` substructs, sprite `display`) are intentionally left out: they are
/// rederived from the fields captured here on the next `clock()`.
pub struct VicState {
    pub den: bool,
    pub den_latch: bool,
    pub rsel: bool,
    pub csel: bool,
    pub scroll_x: u8,
    pub scroll_y: u8,
    pub raster_compare: u16,
    pub irq_status: u8,
    pub irq_enable: u8,
    pub light_pen_pos: [u8; 2],
    pub video_matrix_base: u16,
    pub char_base: u16,

    pub sprite_x: [u16; 8],
    pub sprite_y: [u8; 8],
    pub sprite_enabled: [bool; 8],
    pub sprite_priority: [bool; 8],
    pub sprite_multicolor_mode: [bool; 8],
    pub sprite_expand_x: [bool; 8],
    pub sprite_expand_y: [bool; 8],
    pub sprite_color: [u8; 8],
    pub sprite_multicolor: [u8; 2],

    pub border_color: u8,
    pub border_mff: bool,
    pub border_vff: bool,

    pub gfx_mode: u8,
    pub gfx_bg_color: [u8; 4],
    pub gfx_c_data: u8,
    pub gfx_c_color: u8,
    pub gfx_g_data: u8,
    pub gfx_data: u8,
    pub gfx_mc_cycle: bool,
    pub gfx_output: (u8, bool),

    pub mux_mb_collision: u8,
    pub mux_mb_interrupt: bool,
    pub mux_mm_collision: u8,
    pub mux_mm_interrupt: bool,
    pub mux_output: u8,
    pub mux_output_priority: u8,

    pub sprites: Vec<SpriteState>,

    pub raster_y: u16,
    pub raster_cycle: u16,
    pub vc: u16,
    pub vc_base: u16,
    pub rc: u8,
    pub vmli: u8,
    pub bad_line: bool,
    pub display_state: bool,
    pub screen_row: [u8; 40],
    pub color_row: [u8; 40],

    pub sprite_dma: [bool; 8],
    pub sprite_mc: [u8; 8],
    pub sprite_pointer: [u8; 8],

    pub light_pen_triggered: bool,
}

pub struct Vic {
    // Dependencies
    chip_model: VicModel,
    spec: Spec,
    mem: VicMemory,
    color_ram: Shared<Ram>,
    frame_buffer: Shared<dyn VideoOutput>,
    vsync_flag: SharedCell<bool>,
    ba_line: Shared<Pin>,
    irq_line: Shared<IrqLine>,

    // Control registers
    den: bool,
    den_latch: bool,
    rsel: bool,
    csel: bool,
    scroll_x: u8,
    scroll_y: u8,
    raster_compare: u16,
    irq_status: u8,
    irq_enable: u8,
    light_pen_pos: [u8; 2],
    video_matrix_base: u16,
    char_base: u16,

    // Sprite registers
    sprite_x: [u16; 8],
    sprite_y: [u8; 8],
    sprite_enabled: [bool; 8],
    sprite_priority: [bool; 8],
    sprite_multicolor_mode: [bool; 8],
    sprite_expand_x: [bool; 8],
    sprite_expand_y: [bool; 8],
    sprite_color: [u8; 8],
    sprite_multicolor: [u8; 2],

    // Functional units
    border: BorderUnit,
    gfx: GfxSequencer,
    mux: MuxUnit,
    sprites: [SpriteSequencer; 8],

    // Raster state
    raster_y: u16,
    raster_cycle: u16,
    vc: u16,
    vc_base: u16,
    rc: u8,
    vmli: u8,
    bad_line: bool,
    display_state: bool,
    screen_row: [u8; 40],
    color_row: [u8; 40],

    // Sprite DMA state
    sprite_dma: [bool; 8],
    sprite_mc: [u8; 8],
    sprite_pointer: [u8; 8],

    light_pen_triggered: bool,
}

impl Vic {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chip_model: VicModel,
        color_ram: Shared<Ram>,
        mem: VicMemory,
        frame_buffer: Shared<dyn VideoOutput>,
        vsync_flag: SharedCell<bool>,
        ba_line: Shared<Pin>,
        irq_line: Shared<IrqLine>,
    ) -> Self {
        let spec = Spec::new(chip_model);
        Vic {
            chip_model,
            spec,
            mem,
            color_ram,
            frame_buffer,
            vsync_flag,
            ba_line,
            irq_line,
            den: true,
            den_latch: true,
            rsel: true,
            csel: true,
            scroll_x: 0,
            scroll_y: 3,
            raster_compare: 0,
            irq_status: 0,
            irq_enable: 0,
            light_pen_pos: [0; 2],
            video_matrix_base: 1024,
            char_base: 4096,
            sprite_x: [0; 8],
            sprite_y: [0; 8],
            sprite_enabled: [false; 8],
            sprite_priority: [false; 8],
            sprite_multicolor_mode: [false; 8],
            sprite_expand_x: [false; 8],
            sprite_expand_y: [false; 8],
            sprite_color: [0; 8],
            sprite_multicolor: [0; 2],
            border: BorderUnit::new(),
            gfx: GfxSequencer::new(),
            mux: MuxUnit::new(),
            sprites: [
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
                SpriteSequencer::new(),
            ],
            raster_y: 0,
            raster_cycle: 1,
            vc: 0,
            vc_base: 0,
            rc: 0,
            vmli: 0,
            bad_line: false,
            display_state: false,
            screen_row: [0; 40],
            color_row: [0; 40],
            sprite_dma: [false; 8],
            sprite_mc: [0; 8],
            sprite_pointer: [0; 8],
            light_pen_triggered: false,
        }
    }

    pub fn get_raster(&self) -> u16 {
        self.raster_y
    }

    /// Captures internal state directly, bypassing `read()`'s collision-register
    /// clear-on-read semantics ($D01E/$D01F).
    pub fn serialize(&self) -> VicState {
        let mut sprites = Vec::with_capacity(8);
        for sprite in self.sprites.iter() {
            let (counter, data, delay_cycles, output) = sprite.raw();
            sprites.push(SpriteState {
                counter,
                data,
                delay_cycles,
                output,
            });
        }
        let (border_mff, border_vff) = self.border.raw();
        let (gfx_c_data, gfx_c_color, gfx_g_data, gfx_data, gfx_mc_cycle, gfx_output) = self.gfx.raw();
        let (mux_output, mux_output_priority) = self.mux.raw();
        VicState {
            den: self.den,
            den_latch: self.den_latch,
            rsel: self.rsel,
            csel: self.csel,
            scroll_x: self.scroll_x,
            scroll_y: self.scroll_y,
            raster_compare: self.raster_compare,
            irq_status: self.irq_status,
            irq_enable: self.irq_enable,
            light_pen_pos: self.light_pen_pos,
            video_matrix_base: self.video_matrix_base,
            char_base: self.char_base,

            sprite_x: self.sprite_x,
            sprite_y: self.sprite_y,
            sprite_enabled: self.sprite_enabled,
            sprite_priority: self.sprite_priority,
            sprite_multicolor_mode: self.sprite_multicolor_mode,
            sprite_expand_x: self.sprite_expand_x,
            sprite_expand_y: self.sprite_expand_y,
            sprite_color: self.sprite_color,
            sprite_multicolor: self.sprite_multicolor,

            border_color: self.border.config.border_color,
            border_mff,
            border_vff,

            gfx_mode: self.gfx.config.mode.value(),
            gfx_bg_color: self.gfx.config.bg_color,
            gfx_c_data,
            gfx_c_color,
            gfx_g_data,
            gfx_data,
            gfx_mc_cycle,
            gfx_output,

            mux_mb_collision: self.mux.mb_collision,
            mux_mb_interrupt: self.mux.mb_interrupt,
            mux_mm_collision: self.mux.mm_collision,
            mux_mm_interrupt: self.mux.mm_interrupt,
            mux_output,
            mux_output_priority,

            sprites,

            raster_y: self.raster_y,
            raster_cycle: self.raster_cycle,
            vc: self.vc,
            vc_base: self.vc_base,
            rc: self.rc,
            vmli: self.vmli,
            bad_line: self.bad_line,
            display_state: self.display_state,
            screen_row: self.screen_row,
            color_row: self.color_row,

            sprite_dma: self.sprite_dma,
            sprite_mc: self.sprite_mc,
            sprite_pointer: self.sprite_pointer,

            light_pen_triggered: self.light_pen_triggered,
        }
    }

    /// Restores internal state captured by `serialize`, then resyncs the shared
    /// IRQ line from the restored `irq_status`/`irq_enable`.
    pub fn deserialize(&mut self, state: &VicState) {
        self.den = state.den;
        self.den_latch = state.den_latch;
        self.rsel = state.rsel;
        self.csel = state.csel;
        self.scroll_x = state.scroll_x;
        self.scroll_y = state.scroll_y;
        self.raster_compare = state.raster_compare;
        self.irq_status = state.irq_status;
        self.irq_enable = state.irq_enable;
        self.light_pen_pos = state.light_pen_pos;
        self.video_matrix_base = state.video_matrix_base;
        self.char_base = state.char_base;

        self.sprite_x = state.sprite_x;
        self.sprite_y = state.sprite_y;
        self.sprite_enabled = state.sprite_enabled;
        self.sprite_priority = state.sprite_priority;
        self.sprite_multicolor_mode = state.sprite_multicolor_mode;
        self.sprite_expand_x = state.sprite_expand_x;
        self.sprite_expand_y = state.sprite_expand_y;
        self.sprite_color = state.sprite_color;
        self.sprite_multicolor = state.sprite_multicolor;

        self.border.config.border_color = state.border_color;
        self.border.restore_raw(state.border_mff, state.border_vff);

        self.gfx.config.mode = gfx_sequencer::Mode::from(state.gfx_mode);
        self.gfx.config.bg_color = state.gfx_bg_color;
        self.gfx.restore_raw(
            state.gfx_c_data,
            state.gfx_c_color,
            state.gfx_g_data,
            state.gfx_data,
            state.gfx_mc_cycle,
            state.gfx_output,
        );

        self.mux.mb_collision = state.mux_mb_collision;
        self.mux.mb_interrupt = state.mux_mb_interrupt;
        self.mux.mm_collision = state.mux_mm_collision;
        self.mux.mm_interrupt = state.mux_mm_interrupt;
        self.mux.restore_raw(state.mux_output, state.mux_output_priority);

        for (sprite, saved) in self.sprites.iter_mut().zip(state.sprites.iter()) {
            sprite.restore_raw(saved.counter, saved.data, saved.delay_cycles, saved.output);
        }

        self.raster_y = state.raster_y;
        self.raster_cycle = state.raster_cycle;
        self.vc = state.vc;
        self.vc_base = state.vc_base;
        self.rc = state.rc;
        self.vmli = state.vmli;
        self.bad_line = state.bad_line;
        self.display_state = state.display_state;
        self.screen_row = state.screen_row;
        self.color_row = state.color_row;

        self.sprite_dma = state.sprite_dma;
        self.sprite_mc = state.sprite_mc;
        self.sprite_pointer = state.sprite_pointer;

        self.light_pen_triggered = state.light_pen_triggered;

        self.update_irq_line();
    }

    /// X coordinate (in the 0..0x1ff sprite-coordinate space) of the leftmost
    /// pixel produced by the given cycle.
    fn raster_x(&self, cycle: u16) -> u16 {
        let x = self.spec.first_x_coord as u32 + (cycle as u32 - 1) * 8;
        (x % 0x200) as u16
    }

    fn is_bad_line(&self) -> bool {
        self.den_latch
            && self.raster_y >= FIRST_BAD_LINE
            && self.raster_y <= LAST_BAD_LINE
            && (self.raster_y & 0x07) == u16::from(self.scroll_y & 0x07)
    }

    fn start_of_line(&mut self) {
        self.raster_y += 1;
        if self.raster_y >= self.spec.raster_lines {
            self.raster_y = 0;
            self.vsync_flag.set(true);
        }
        if self.raster_y == FIRST_BAD_LINE {
            self.den_latch = self.den;
        }
        self.bad_line = self.is_bad_line();
        if self.bad_line {
            self.display_state = true;
            self.vc = self.vc_base;
            self.vmli = 0;
        }
        if self.raster_y == 0 {
            self.vc_base = 0;
            self.rc = 0;
            self.display_state = false;
        }
        self.update_raster_irq();
        for sprite in 0..8 {
            if self.sprite_enabled[sprite] && u16::from(self.sprite_y[sprite]) == (self.raster_y & 0xff) {
                self.sprite_dma[sprite] = true;
                self.sprite_mc[sprite] = 0;
            }
        }
    }

    fn update_raster_irq(&mut self) {
        let target_cycle = if self.raster_compare == 0 { 0 } else { 1 };
        if self.raster_cycle == target_cycle.max(1) && self.raster_y == self.raster_compare {
            self.trigger_irq(0);
        }
    }

    fn trigger_irq(&mut self, bit: u8) {
        self.irq_status.set_bit(bit as usize, true);
        self.update_irq_line();
    }

    fn update_irq_line(&mut self) {
        let active = (self.irq_status & self.irq_enable & 0x0f) != 0;
        self.irq_status.set_bit(7, active);
        self.irq_line.borrow_mut().set_low(IRQ_SOURCE_VIC, active);
    }

    fn matrix_access(&mut self) {
        if self.bad_line {
            let address = self.video_matrix_base | self.vc;
            self.screen_row[self.vmli as usize] = self.mem.read(address);
            self.color_row[self.vmli as usize] = self.color_ram.borrow().read(self.vc) & 0x0f;
            self.ba_line.borrow_mut().set_active(false);
        }
    }

    fn graphics_access(&mut self) {
        let vmli = self.vmli as usize;
        let c_data = self.screen_row[vmli];
        let c_color = self.color_row[vmli];
        let bitmap_mode = matches!(self.current_mode_value(), 0x02 | 0x03);
        let g_data = if self.display_state {
            let address = if bitmap_mode {
                (self.char_base & 0x2000) | (self.vc << 3) | u16::from(self.rc)
            } else {
                self.char_base + (u16::from(c_data) << 3) + u16::from(self.rc)
            };
            self.mem.read(address)
        } else {
            self.mem.read(0x3fff)
        };
        self.gfx.set_data(c_data, c_color, g_data);
        self.gfx.load_data();
        if self.display_state {
            self.vc += 1;
            self.vmli = (self.vmli + 1) % 40;
            if self.rc == 7 {
                self.vc_base = self.vc;
            }
        }
    }

    fn current_mode_value(&self) -> u8 {
        match self.gfx.config.mode {
            gfx_sequencer::Mode::Text => 0x00,
            gfx_sequencer::Mode::McText => 0x01,
            gfx_sequencer::Mode::Bitmap => 0x02,
            gfx_sequencer::Mode::McBitmap => 0x03,
            gfx_sequencer::Mode::EcmText => 0x04,
            gfx_sequencer::Mode::InvalidText => 0x05,
            gfx_sequencer::Mode::InvalidBitmap1 => 0x06,
            gfx_sequencer::Mode::InvalidBitmap2 => 0x07,
        }
    }

    fn sprite_pointer_fetch(&mut self, sprite: usize) {
        let address = self.video_matrix_base | (0x03f8 + sprite as u16);
        self.sprite_pointer[sprite] = self.mem.read(address);
    }

    fn sprite_data_fetch(&mut self, sprite: usize) {
        let base = u16::from(self.sprite_pointer[sprite]) << 6;
        for byte in 0..3u16 {
            let offset = u16::from(self.sprite_mc[sprite]) + byte;
            if offset < 63 {
                let value = self.mem.read(base + offset);
                self.sprites[sprite].set_data(byte as usize, value);
            }
        }
        self.sprite_mc[sprite] = self.sprite_mc[sprite].wrapping_add(3);
        if self.sprite_mc[sprite] >= 63 {
            self.sprite_dma[sprite] = false;
        }
    }

    fn sync_configs(&mut self) {
        self.border.config.csel = self.csel;
        self.border.config.rsel = self.rsel;
        for i in 0..8 {
            let sprite = &mut self.sprites[i];
            sprite.config.enabled = self.sprite_enabled[i];
            sprite.config.x_screen = self.sprite_x[i];
            sprite.config.y = self.sprite_y[i];
            sprite.config.color = self.sprite_color[i];
            sprite.config.data_priority = self.sprite_priority[i];
            sprite.config.expand_x = self.sprite_expand_x[i];
            sprite.config.expand_y = self.sprite_expand_y[i];
            sprite.config.mode = if self.sprite_multicolor_mode[i] {
                sprite_sequencer::Mode::Multicolor
            } else {
                sprite_sequencer::Mode::Standard
            };
            sprite.config.multicolor = self.sprite_multicolor;
            sprite.display = self.sprite_enabled[i]
                && u16::from(self.sprite_y[i]) <= (self.raster_y & 0xff)
                && (self.raster_y & 0xff) < u16::from(self.sprite_y[i]) + 21;
            self.mux.config.data_priority[i] = self.sprite_priority[i];
        }
    }

    fn render(&mut self, x: u16) {
        self.border.update_main_ff(x, self.raster_y, self.den_latch);
        self.gfx.clock();
        let mut sprite_output = [None; 8];
        for i in 0..8 {
            self.sprites[i].clock(x);
            sprite_output[i] = self.sprites[i].output();
        }
        self.mux.compute_collisions(&sprite_output);
        if self.mux.mb_interrupt {
            self.trigger_irq(1);
        }
        if self.mux.mm_interrupt {
            self.trigger_irq(2);
        }
        self.mux.feed_border(self.border.config.border_color);
        self.mux.feed_graphics(self.gfx.output());
        self.mux.feed_sprites(&sprite_output);
        let color = if self.border.is_enabled() {
            self.border.config.border_color
        } else {
            self.mux.output()
        };
        let (width, height) = self.frame_buffer.borrow().get_dimension();
        let px = self.screen_x(x);
        if (self.raster_y as usize) < height && (px as usize) < width {
            let index = self.raster_y as usize * width + px as usize;
            self.frame_buffer.borrow_mut().write(index, color);
        }
    }

    fn screen_x(&self, x: u16) -> u16 {
        match x {
            0x000..=0x193 => x + 0x64,
            0x194..=0x1ff => x - 0x194,
            _ => 0,
        }
    }
}

impl Chip for Vic {
    fn clock(&mut self) {
        if self.raster_cycle == 1 {
            self.start_of_line();
        }
        self.sync_configs();

        let window_end = DISPLAY_WINDOW_START + DISPLAY_WINDOW_LEN;
        if self.raster_cycle >= DISPLAY_WINDOW_START && self.raster_cycle < window_end {
            self.matrix_access();
            self.graphics_access();
        } else {
            self.ba_line.borrow_mut().set_active(true);
        }

        let dma_sprites = (0..8).filter(|&i| self.sprite_dma[i]).count();
        if dma_sprites > 0 && self.raster_cycle > self.spec.cycles_per_raster - SPRITE_DMA_WINDOW {
            self.ba_line.borrow_mut().set_active(false);
            for sprite in 0..8 {
                if self.sprite_dma[sprite] {
                    if self.sprite_mc[sprite] == 0 {
                        self.sprite_pointer_fetch(sprite);
                    }
                    self.sprite_data_fetch(sprite);
                }
            }
        }

        for pixel in 0..8u16 {
            let x = (self.raster_x(self.raster_cycle) + pixel) % 0x200;
            self.render(x);
        }

        self.rc_maybe_advance();

        self.raster_cycle += 1;
        if self.raster_cycle > self.spec.cycles_per_raster {
            self.raster_cycle = 1;
        }
    }

    fn clock_delta(&mut self, delta: u32) {
        for _ in 0..delta {
            self.clock();
        }
    }

    fn process_vsync(&mut self) {}

    fn reset(&mut self) {
        self.den = true;
        self.den_latch = true;
        self.rsel = true;
        self.csel = true;
        self.scroll_x = 0;
        self.scroll_y = 3;
        self.raster_compare = 0;
        self.irq_status = 0;
        self.irq_enable = 0;
        self.light_pen_pos = [0; 2];
        self.video_matrix_base = 1024;
        self.char_base = 4096;
        self.sprite_x = [0; 8];
        self.sprite_y = [0; 8];
        self.sprite_enabled = [false; 8];
        self.sprite_priority = [false; 8];
        self.sprite_multicolor_mode = [false; 8];
        self.sprite_expand_x = [false; 8];
        self.sprite_expand_y = [false; 8];
        self.sprite_color = [0; 8];
        self.sprite_multicolor = [0; 2];
        self.border.reset();
        self.gfx.reset();
        self.mux.reset();
        for sprite in self.sprites.iter_mut() {
            sprite.reset();
        }
        self.raster_y = 0;
        self.raster_cycle = 1;
        self.vc = 0;
        self.vc_base = 0;
        self.rc = 0;
        self.vmli = 0;
        self.bad_line = false;
        self.display_state = false;
        self.screen_row = [0; 40];
        self.color_row = [0; 40];
        self.sprite_dma = [false; 8];
        self.sprite_mc = [0; 8];
        self.sprite_pointer = [0; 8];
        self.light_pen_triggered = false;
        self.irq_line.borrow_mut().set_low(IRQ_SOURCE_VIC, false);
    }

    fn read(&mut self, reg: u8) -> u8 {
        match Reg::from(reg) {
            Reg::M0X => (self.sprite_x[0] & 0x00ff) as u8,
            Reg::M0Y => self.sprite_y[0],
            Reg::M1X => (self.sprite_x[1] & 0x00ff) as u8,
            Reg::M1Y => self.sprite_y[1],
            Reg::M2X => (self.sprite_x[2] & 0x00ff) as u8,
            Reg::M2Y => self.sprite_y[2],
            Reg::M3X => (self.sprite_x[3] & 0x00ff) as u8,
            Reg::M3Y => self.sprite_y[3],
            Reg::M4X => (self.sprite_x[4] & 0x00ff) as u8,
            Reg::M4Y => self.sprite_y[4],
            Reg::M5X => (self.sprite_x[5] & 0x00ff) as u8,
            Reg::M5Y => self.sprite_y[5],
            Reg::M6X => (self.sprite_x[6] & 0x00ff) as u8,
            Reg::M6Y => self.sprite_y[6],
            Reg::M7X => (self.sprite_x[7] & 0x00ff) as u8,
            Reg::M7Y => self.sprite_y[7],
            Reg::MX8 => {
                let mut value = 0u8;
                for i in 0..8 {
                    value.set_bit(i, self.sprite_x[i].get_bit(8));
                }
                value
            }
            Reg::CR1 => {
                let mut value = 0u8;
                value.set_bit(7, self.raster_y.get_bit(8));
                value.set_bit(6, self.current_mode_value().get_bit(2));
                value.set_bit(5, self.current_mode_value().get_bit(1));
                value.set_bit(4, self.den);
                value.set_bit(3, self.rsel);
                value |= self.scroll_y & 0x07;
                value
            }
            Reg::RASTER => (self.raster_y & 0x00ff) as u8,
            Reg::LPX => self.light_pen_pos[0],
            Reg::LPY => self.light_pen_pos[1],
            Reg::ME => {
                let mut value = 0u8;
                for i in 0..8 {
                    value.set_bit(i, self.sprite_enabled[i]);
                }
                value
            }
            Reg::CR2 => {
                let mut value = 0xc0u8;
                value.set_bit(5, true);
                value.set_bit(4, self.current_mode_value().get_bit(0));
                value.set_bit(3, self.csel);
                value |= self.scroll_x & 0x07;
                value
            }
            Reg::MYE => {
                let mut value = 0u8;
                for i in 0..8 {
                    value.set_bit(i, self.sprite_expand_y[i]);
                }
                value
            }
            Reg::MEMPTR => {
                let vm = ((self.video_matrix_base & 0x3c00) >> 10) as u8;
                let cb = ((self.char_base & 0x3800) >> 11) as u8;
                (vm << 4) | (cb << 1) | 0x01
            }
            Reg::IRR => self.irq_status | 0x70,
            Reg::IMR => self.irq_enable | 0xf0,
            Reg::MDP => {
                let mut value = 0u8;
                for i in 0..8 {
                    value.set_bit(i, self.sprite_priority[i]);
                }
                value
            }
            Reg::MMC => {
                let mut value = 0u8;
                for i in 0..8 {
                    value.set_bit(i, self.sprite_multicolor_mode[i]);
                }
                value
            }
            Reg::MXE => {
                let mut value = 0u8;
                for i in 0..8 {
                    value.set_bit(i, self.sprite_expand_x[i]);
                }
                value
            }
            Reg::MM => {
                let value = self.mux.mm_collision;
                self.mux.mm_collision = 0;
                self.mux.mm_interrupt = false;
                value
            }
            Reg::MD => {
                let value = self.mux.mb_collision;
                self.mux.mb_collision = 0;
                self.mux.mb_interrupt = false;
                value
            }
            Reg::EC => self.border.config.border_color | 0xf0,
            Reg::B0C => self.gfx.config.bg_color[0] | 0xf0,
            Reg::B1C => self.gfx.config.bg_color[1] | 0xf0,
            Reg::B2C => self.gfx.config.bg_color[2] | 0xf0,
            Reg::B3C => self.gfx.config.bg_color[3] | 0xf0,
            Reg::MM0 => self.sprite_multicolor[0] | 0xf0,
            Reg::MM1 => self.sprite_multicolor[1] | 0xf0,
            Reg::M0C => self.sprite_color[0] | 0xf0,
            Reg::M1C => self.sprite_color[1] | 0xf0,
            Reg::M2C => self.sprite_color[2] | 0xf0,
            Reg::M3C => self.sprite_color[3] | 0xf0,
            Reg::M4C => self.sprite_color[4] | 0xf0,
            Reg::M5C => self.sprite_color[5] | 0xf0,
            Reg::M6C => self.sprite_color[6] | 0xf0,
            Reg::M7C => self.sprite_color[7] | 0xf0,
            Reg::IGNORE => 0xff,
        }
    }

    fn write(&mut self, reg: u8, value: u8) {
        match Reg::from(reg) {
            Reg::M0X => self.sprite_x[0] = (self.sprite_x[0] & 0xff00) | u16::from(value),
            Reg::M0Y => self.sprite_y[0] = value,
            Reg::M1X => self.sprite_x[1] = (self.sprite_x[1] & 0xff00) | u16::from(value),
            Reg::M1Y => self.sprite_y[1] = value,
            Reg::M2X => self.sprite_x[2] = (self.sprite_x[2] & 0xff00) | u16::from(value),
            Reg::M2Y => self.sprite_y[2] = value,
            Reg::M3X => self.sprite_x[3] = (self.sprite_x[3] & 0xff00) | u16::from(value),
            Reg::M3Y => self.sprite_y[3] = value,
            Reg::M4X => self.sprite_x[4] = (self.sprite_x[4] & 0xff00) | u16::from(value),
            Reg::M4Y => self.sprite_y[4] = value,
            Reg::M5X => self.sprite_x[5] = (self.sprite_x[5] & 0xff00) | u16::from(value),
            Reg::M5Y => self.sprite_y[5] = value,
            Reg::M6X => self.sprite_x[6] = (self.sprite_x[6] & 0xff00) | u16::from(value),
            Reg::M6Y => self.sprite_y[6] = value,
            Reg::M7X => self.sprite_x[7] = (self.sprite_x[7] & 0xff00) | u16::from(value),
            Reg::M7Y => self.sprite_y[7] = value,
            Reg::MX8 => {
                for i in 0..8 {
                    self.sprite_x[i].set_bit(8, value.get_bit(i));
                }
            }
            Reg::CR1 => {
                self.raster_compare.set_bit(8, value.get_bit(7));
                let mut mode = self.current_mode_value();
                mode.set_bit(2, value.get_bit(6));
                mode.set_bit(1, value.get_bit(5));
                self.gfx.config.mode = gfx_sequencer::Mode::from(mode);
                self.den = value.get_bit(4);
                self.rsel = value.get_bit(3);
                self.scroll_y = value & 0x07;
            }
            Reg::RASTER => self.raster_compare = (self.raster_compare & 0xff00) | u16::from(value),
            Reg::LPX => self.light_pen_pos[0] = value,
            Reg::LPY => self.light_pen_pos[1] = value,
            Reg::ME => {
                for i in 0..8 {
                    self.sprite_enabled[i] = value.get_bit(i);
                }
            }
            Reg::CR2 => {
                let mut mode = self.current_mode_value();
                mode.set_bit(0, value.get_bit(4));
                self.gfx.config.mode = gfx_sequencer::Mode::from(mode);
                self.csel = value.get_bit(3);
                self.scroll_x = value & 0x07;
            }
            Reg::MYE => {
                for i in 0..8 {
                    self.sprite_expand_y[i] = value.get_bit(i);
                }
            }
            Reg::MEMPTR => {
                self.video_matrix_base = u16::from((value & 0xf0) >> 4) << 10;
                self.char_base = u16::from((value & 0x0e) >> 1) << 11;
            }
            Reg::IRR => {
                self.irq_status &= !(value & 0x0f);
                self.update_irq_line();
            }
            Reg::IMR => {
                self.irq_enable = value & 0x0f;
                self.update_irq_line();
            }
            Reg::MDP => {
                for i in 0..8 {
                    self.sprite_priority[i] = value.get_bit(i);
                }
            }
            Reg::MMC => {
                for i in 0..8 {
                    self.sprite_multicolor_mode[i] = value.get_bit(i);
                }
            }
            Reg::MXE => {
                for i in 0..8 {
                    self.sprite_expand_x[i] = value.get_bit(i);
                }
            }
            Reg::MM => {}
            Reg::MD => {}
            Reg::EC => self.border.config.border_color = value & 0x0f,
            Reg::B0C => self.gfx.config.bg_color[0] = value & 0x0f,
            Reg::B1C => self.gfx.config.bg_color[1] = value & 0x0f,
            Reg::B2C => self.gfx.config.bg_color[2] = value & 0x0f,
            Reg::B3C => self.gfx.config.bg_color[3] = value & 0x0f,
            Reg::MM0 => self.sprite_multicolor[0] = value & 0x0f,
            Reg::MM1 => self.sprite_multicolor[1] = value & 0x0f,
            Reg::M0C => self.sprite_color[0] = value & 0x0f,
            Reg::M1C => self.sprite_color[1] = value & 0x0f,
            Reg::M2C => self.sprite_color[2] = value & 0x0f,
            Reg::M3C => self.sprite_color[3] = value & 0x0f,
            Reg::M4C => self.sprite_color[4] = value & 0x0f,
            Reg::M5C => self.sprite_color[5] = value & 0x0f,
            Reg::M6C => self.sprite_color[6] = value & 0x0f,
            Reg::M7C => self.sprite_color[7] = value & 0x0f,
            Reg::IGNORE => {}
        }
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
        self
    }
}

impl Vic {
    fn rc_maybe_advance(&mut self) {
        if self.raster_cycle == self.spec.cycles_per_raster && self.display_state {
            if self.rc == 7 {
                self.rc = 0;
                if !self.bad_line {
                    self.display_state = false;
                }
            } else {
                self.rc += 1;
            }
        }
    }
}
