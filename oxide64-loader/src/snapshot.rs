// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use oxide64_core::factory::{Chip, Cpu, Register};
use oxide64_core::io::{Cia, CiaState, RtcState, TimerState};
use oxide64_core::sound::{Sid, SidState};
use oxide64_core::video::{SpriteState, Vic, VicState};
use oxide64_system::C64;

// SPEC: magic "VC64", two version bytes, then a component-ordered
// concatenation of each subsystem's serialized state.

const MAGIC: &[u8; 4] = b"VC64";
const VERSION: [u8; 2] = [1, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotError {
    InvalidMagic,
    UnsupportedVersion(u8, u8),
    Truncated,
}

/// Append-only byte-oriented cursor used to build a snapshot buffer.
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION);
        SnapshotWriter { buf }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Sequential reader over a previously written snapshot buffer.
pub struct SnapshotReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SnapshotReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, SnapshotError> {
        if data.len() < MAGIC.len() + 2 || &data[0..MAGIC.len()] != MAGIC {
            return Err(SnapshotError::InvalidMagic);
        }
        let (major, minor) = (data[MAGIC.len()], data[MAGIC.len() + 1]);
        if major != VERSION[0] {
            return Err(SnapshotError::UnsupportedVersion(major, minor));
        }
        Ok(SnapshotReader {
            data,
            pos: MAGIC.len() + 2,
        })
    }

    pub fn read_u8(&mut self) -> Result<u8, SnapshotError> {
        let value = *self.data.get(self.pos).ok_or(SnapshotError::Truncated)?;
        self.pos += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, SnapshotError> {
        if self.pos + 2 > self.data.len() {
            return Err(SnapshotError::Truncated);
        }
        let value = u16::from_le_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(value)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SnapshotError> {
        if self.pos + len > self.data.len() {
            return Err(SnapshotError::Truncated);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_bool(&mut self) -> Result<bool, SnapshotError> {
        Ok(self.read_u8()? != 0)
    }
}

// Chip state is captured and restored through each chip's own `serialize`/
// `deserialize` methods rather than its mmio `read`/`write` register file:
// the register file has read-clear (CIA's ICR, VIC's $D01E/$D01F collision
// registers) and latch (CIA's TOD hours/tenths) side effects that would
// corrupt the live machine, or lose pending state, if exercised purely to
// serialize it.

fn save_timer_state(writer: &mut SnapshotWriter, state: &TimerState) {
    writer.write_bool(state.enabled);
    writer.write_bool(state.active);
    writer.write_bool(state.one_shot);
    writer.write_bool(state.toggle_output);
    writer.write_bool(state.pb_on);
    writer.write_u8(state.input_mode);
    writer.write_u8(state.raw_config);
    writer.write_u16(state.latch);
    writer.write_u16(state.counter);
    writer.write_bool(state.pb_output);
    writer.write_bool(state.cascade_input);
    writer.write_u16(state.delay_cycles);
    writer.write_u16(state.delay_feed);
}

fn read_timer_state(reader: &mut SnapshotReader) -> Result<TimerState, SnapshotError> {
    Ok(TimerState {
        enabled: reader.read_bool()?,
        active: reader.read_bool()?,
        one_shot: reader.read_bool()?,
        toggle_output: reader.read_bool()?,
        pb_on: reader.read_bool()?,
        input_mode: reader.read_u8()?,
        raw_config: reader.read_u8()?,
        latch: reader.read_u16()?,
        counter: reader.read_u16()?,
        pb_output: reader.read_bool()?,
        cascade_input: reader.read_bool()?,
        delay_cycles: reader.read_u16()?,
        delay_feed: reader.read_u16()?,
    })
}

fn save_rtc_state(writer: &mut SnapshotWriter, state: &RtcState) {
    writer.write_bool(state.enabled);
    writer.write_u8(state.hours);
    writer.write_u8(state.minutes);
    writer.write_u8(state.seconds);
    writer.write_u8(state.tenth);
    writer.write_bool(state.pm);
}

fn read_rtc_state(reader: &mut SnapshotReader) -> Result<RtcState, SnapshotError> {
    Ok(RtcState {
        enabled: reader.read_bool()?,
        hours: reader.read_u8()?,
        minutes: reader.read_u8()?,
        seconds: reader.read_u8()?,
        tenth: reader.read_u8()?,
        pm: reader.read_bool()?,
    })
}

fn save_cia(writer: &mut SnapshotWriter, chip: &dyn Chip) {
    let cia = chip
        .as_any()
        .downcast_ref::<Cia>()
        .expect("chip at this slot is always a Cia");
    let state = cia.serialize();
    writer.write_u8(state.irq_data);
    writer.write_u8(state.irq_mask);
    writer.write_u16(state.irq_delay_cycles);
    writer.write_u16(state.irq_delay_feed);
    save_timer_state(writer, &state.timer_a);
    save_timer_state(writer, &state.timer_b);
    save_rtc_state(writer, &state.tod_clock);
    save_rtc_state(writer, &state.tod_alarm);
    writer.write_bool(state.tod_set_alarm);
    writer.write_bool(state.cnt_pin.0);
    writer.write_bool(state.cnt_pin.1);
    writer.write_bool(state.flag_pin.0);
    writer.write_bool(state.flag_pin.1);
    writer.write_u8(state.port_a_direction);
    writer.write_u8(state.port_a_output);
    writer.write_u8(state.port_a_input);
    writer.write_u8(state.port_b_direction);
    writer.write_u8(state.port_b_output);
    writer.write_u8(state.port_b_input);
}

fn restore_cia(reader: &mut SnapshotReader, chip: &mut dyn Chip) -> Result<(), SnapshotError> {
    let state = CiaState {
        irq_data: reader.read_u8()?,
        irq_mask: reader.read_u8()?,
        irq_delay_cycles: reader.read_u16()?,
        irq_delay_feed: reader.read_u16()?,
        timer_a: read_timer_state(reader)?,
        timer_b: read_timer_state(reader)?,
        tod_clock: read_rtc_state(reader)?,
        tod_alarm: read_rtc_state(reader)?,
        tod_set_alarm: reader.read_bool()?,
        cnt_pin: (reader.read_bool()?, reader.read_bool()?),
        flag_pin: (reader.read_bool()?, reader.read_bool()?),
        port_a_direction: reader.read_u8()?,
        port_a_output: reader.read_u8()?,
        port_a_input: reader.read_u8()?,
        port_b_direction: reader.read_u8()?,
        port_b_output: reader.read_u8()?,
        port_b_input: reader.read_u8()?,
    };
    let cia = chip
        .as_any_mut()
        .downcast_mut::<Cia>()
        .expect("chip at this slot is always a Cia");
    cia.deserialize(&state);
    Ok(())
}

fn save_sid(writer: &mut SnapshotWriter, chip: &dyn Chip) {
    let sid = chip
        .as_any()
        .downcast_ref::<Sid>()
        .expect("chip at this slot is always a Sid");
    let state = sid.serialize();
    writer.write_bytes(&state.reg_file);
    writer.write_u16((state.cycles & 0xffff) as u16);
    writer.write_u16(((state.cycles >> 16) & 0xffff) as u16);
    writer.write_u16(((state.cycles >> 32) & 0xffff) as u16);
    writer.write_u16(((state.cycles >> 48) & 0xffff) as u16);
}

fn restore_sid(reader: &mut SnapshotReader, chip: &mut dyn Chip) -> Result<(), SnapshotError> {
    let mut reg_file = [0u8; 32];
    reg_file.copy_from_slice(reader.read_bytes(32)?);
    let cycles = u64::from(reader.read_u16()?)
        | (u64::from(reader.read_u16()?) << 16)
        | (u64::from(reader.read_u16()?) << 32)
        | (u64::from(reader.read_u16()?) << 48);
    let state = SidState { reg_file, cycles };
    let sid = chip
        .as_any_mut()
        .downcast_mut::<Sid>()
        .expect("chip at this slot is always a Sid");
    sid.deserialize(&state);
    Ok(())
}

fn save_sprite_state(writer: &mut SnapshotWriter, state: &SpriteState) {
    writer.write_u16((state.counter & 0xffff) as u16);
    writer.write_u16(((state.counter >> 16) & 0xffff) as u16);
    writer.write_u16((state.data & 0xffff) as u16);
    writer.write_u16(((state.data >> 16) & 0xffff) as u16);
    writer.write_u8(state.delay_cycles);
    writer.write_bool(state.output.is_some());
    writer.write_u8(state.output.unwrap_or(0));
}

fn read_sprite_state(reader: &mut SnapshotReader) -> Result<SpriteState, SnapshotError> {
    let counter = u32::from(reader.read_u16()?) | (u32::from(reader.read_u16()?) << 16);
    let data = u32::from(reader.read_u16()?) | (u32::from(reader.read_u16()?) << 16);
    let delay_cycles = reader.read_u8()?;
    let has_output = reader.read_bool()?;
    let output_value = reader.read_u8()?;
    Ok(SpriteState {
        counter,
        data,
        delay_cycles,
        output: if has_output { Some(output_value) } else { None },
    })
}

fn save_vic(writer: &mut SnapshotWriter, chip: &dyn Chip) {
    let vic = chip
        .as_any()
        .downcast_ref::<Vic>()
        .expect("chip at this slot is always a Vic");
    let state = vic.serialize();
    writer.write_bool(state.den);
    writer.write_bool(state.den_latch);
    writer.write_bool(state.rsel);
    writer.write_bool(state.csel);
    writer.write_u8(state.scroll_x);
    writer.write_u8(state.scroll_y);
    writer.write_u16(state.raster_compare);
    writer.write_u8(state.irq_status);
    writer.write_u8(state.irq_enable);
    writer.write_bytes(&state.light_pen_pos);
    writer.write_u16(state.video_matrix_base);
    writer.write_u16(state.char_base);

    for value in state.sprite_x.iter() {
        writer.write_u16(*value);
    }
    writer.write_bytes(&state.sprite_y);
    for i in 0..8 {
        writer.write_bool(state.sprite_enabled[i]);
        writer.write_bool(state.sprite_priority[i]);
        writer.write_bool(state.sprite_multicolor_mode[i]);
        writer.write_bool(state.sprite_expand_x[i]);
        writer.write_bool(state.sprite_expand_y[i]);
    }
    writer.write_bytes(&state.sprite_color);
    writer.write_bytes(&state.sprite_multicolor);

    writer.write_u8(state.border_color);
    writer.write_bool(state.border_mff);
    writer.write_bool(state.border_vff);

    writer.write_u8(state.gfx_mode);
    writer.write_bytes(&state.gfx_bg_color);
    writer.write_u8(state.gfx_c_data);
    writer.write_u8(state.gfx_c_color);
    writer.write_u8(state.gfx_g_data);
    writer.write_u8(state.gfx_data);
    writer.write_bool(state.gfx_mc_cycle);
    writer.write_u8(state.gfx_output.0);
    writer.write_bool(state.gfx_output.1);

    writer.write_u8(state.mux_mb_collision);
    writer.write_bool(state.mux_mb_interrupt);
    writer.write_u8(state.mux_mm_collision);
    writer.write_bool(state.mux_mm_interrupt);
    writer.write_u8(state.mux_output);
    writer.write_u8(state.mux_output_priority);

    for sprite in state.sprites.iter() {
        save_sprite_state(writer, sprite);
    }

    writer.write_u16(state.raster_y);
    writer.write_u16(state.raster_cycle);
    writer.write_u16(state.vc);
    writer.write_u16(state.vc_base);
    writer.write_u8(state.rc);
    writer.write_u8(state.vmli);
    writer.write_bool(state.bad_line);
    writer.write_bool(state.display_state);
    writer.write_bytes(&state.screen_row);
    writer.write_bytes(&state.color_row);

    for i in 0..8 {
        writer.write_bool(state.sprite_dma[i]);
    }
    writer.write_bytes(&state.sprite_mc);
    writer.write_bytes(&state.sprite_pointer);

    writer.write_bool(state.light_pen_triggered);
}

fn restore_vic(reader: &mut SnapshotReader, chip: &mut dyn Chip) -> Result<(), SnapshotError> {
    let den = reader.read_bool()?;
    let den_latch = reader.read_bool()?;
    let rsel = reader.read_bool()?;
    let csel = reader.read_bool()?;
    let scroll_x = reader.read_u8()?;
    let scroll_y = reader.read_u8()?;
    let raster_compare = reader.read_u16()?;
    let irq_status = reader.read_u8()?;
    let irq_enable = reader.read_u8()?;
    let mut light_pen_pos = [0u8; 2];
    light_pen_pos.copy_from_slice(reader.read_bytes(2)?);
    let video_matrix_base = reader.read_u16()?;
    let char_base = reader.read_u16()?;

    let mut sprite_x = [0u16; 8];
    for slot in sprite_x.iter_mut() {
        *slot = reader.read_u16()?;
    }
    let mut sprite_y = [0u8; 8];
    sprite_y.copy_from_slice(reader.read_bytes(8)?);
    let mut sprite_enabled = [false; 8];
    let mut sprite_priority = [false; 8];
    let mut sprite_multicolor_mode = [false; 8];
    let mut sprite_expand_x = [false; 8];
    let mut sprite_expand_y = [false; 8];
    for i in 0..8 {
        sprite_enabled[i] = reader.read_bool()?;
        sprite_priority[i] = reader.read_bool()?;
        sprite_multicolor_mode[i] = reader.read_bool()?;
        sprite_expand_x[i] = reader.read_bool()?;
        sprite_expand_y[i] = reader.read_bool()?;
    }
    let mut sprite_color = [0u8; 8];
    sprite_color.copy_from_slice(reader.read_bytes(8)?);
    let mut sprite_multicolor = [0u8; 2];
    sprite_multicolor.copy_from_slice(reader.read_bytes(2)?);

    let border_color = reader.read_u8()?;
    let border_mff = reader.read_bool()?;
    let border_vff = reader.read_bool()?;

    let gfx_mode = reader.read_u8()?;
    let mut gfx_bg_color = [0u8; 4];
    gfx_bg_color.copy_from_slice(reader.read_bytes(4)?);
    let gfx_c_data = reader.read_u8()?;
    let gfx_c_color = reader.read_u8()?;
    let gfx_g_data = reader.read_u8()?;
    let gfx_data = reader.read_u8()?;
    let gfx_mc_cycle = reader.read_bool()?;
    let gfx_output = (reader.read_u8()?, reader.read_bool()?);

    let mux_mb_collision = reader.read_u8()?;
    let mux_mb_interrupt = reader.read_bool()?;
    let mux_mm_collision = reader.read_u8()?;
    let mux_mm_interrupt = reader.read_bool()?;
    let mux_output = reader.read_u8()?;
    let mux_output_priority = reader.read_u8()?;

    let mut sprites = Vec::with_capacity(8);
    for _ in 0..8 {
        sprites.push(read_sprite_state(reader)?);
    }

    let raster_y = reader.read_u16()?;
    let raster_cycle = reader.read_u16()?;
    let vc = reader.read_u16()?;
    let vc_base = reader.read_u16()?;
    let rc = reader.read_u8()?;
    let vmli = reader.read_u8()?;
    let bad_line = reader.read_bool()?;
    let display_state = reader.read_bool()?;
    let mut screen_row = [0u8; 40];
    screen_row.copy_from_slice(reader.read_bytes(40)?);
    let mut color_row = [0u8; 40];
    color_row.copy_from_slice(reader.read_bytes(40)?);

    let mut sprite_dma = [false; 8];
    for slot in sprite_dma.iter_mut() {
        *slot = reader.read_bool()?;
    }
    let mut sprite_mc = [0u8; 8];
    sprite_mc.copy_from_slice(reader.read_bytes(8)?);
    let mut sprite_pointer = [0u8; 8];
    sprite_pointer.copy_from_slice(reader.read_bytes(8)?);

    let light_pen_triggered = reader.read_bool()?;

    let state = VicState {
        den,
        den_latch,
        rsel,
        csel,
        scroll_x,
        scroll_y,
        raster_compare,
        irq_status,
        irq_enable,
        light_pen_pos,
        video_matrix_base,
        char_base,
        sprite_x,
        sprite_y,
        sprite_enabled,
        sprite_priority,
        sprite_multicolor_mode,
        sprite_expand_x,
        sprite_expand_y,
        sprite_color,
        sprite_multicolor,
        border_color,
        border_mff,
        border_vff,
        gfx_mode,
        gfx_bg_color,
        gfx_c_data,
        gfx_c_color,
        gfx_g_data,
        gfx_data,
        gfx_mc_cycle,
        gfx_output,
        mux_mb_collision,
        mux_mb_interrupt,
        mux_mm_collision,
        mux_mm_interrupt,
        mux_output,
        mux_output_priority,
        sprites,
        raster_y,
        raster_cycle,
        vc,
        vc_base,
        rc,
        vmli,
        bad_line,
        display_state,
        screen_row,
        color_row,
        sprite_dma,
        sprite_mc,
        sprite_pointer,
        light_pen_triggered,
    };
    let vic = chip
        .as_any_mut()
        .downcast_mut::<Vic>()
        .expect("chip at this slot is always a Vic");
    vic.deserialize(&state);
    Ok(())
}

/// Captures a reset-then-restore equivalent snapshot of the machine's
/// architecturally visible state: CPU registers, main and color RAM, and
/// the documented register file of each chip. Attached media (disk, tape,
/// cartridge) is expected to be re-attached by the host after a restore
/// rather than round-tripped through the snapshot.
pub fn save(c64: &C64) -> Vec<u8> {
    let mut writer = SnapshotWriter::new();

    let cpu = c64.get_cpu();
    writer.write_u8(cpu.get_register(Register::A));
    writer.write_u8(cpu.get_register(Register::X));
    writer.write_u8(cpu.get_register(Register::Y));
    writer.write_u8(cpu.get_register(Register::SP));
    writer.write_u8(cpu.get_register(Register::P));
    writer.write_u16(cpu.get_pc());

    let ram = c64.get_ram();
    let ram_size = c64.get_config().model.memory_size;
    writer.write_u16(ram_size as u16);
    for addr in 0..ram_size as u16 {
        writer.write_u8(ram.borrow().read(addr));
    }

    let color_ram = c64.get_color_ram();
    let color_ram_size = c64.get_config().model.color_ram;
    writer.write_u16(color_ram_size as u16);
    for addr in 0..color_ram_size as u16 {
        writer.write_u8(color_ram.borrow().read(addr));
    }

    save_cia(&mut writer, &*c64.get_cia_1().borrow());
    save_cia(&mut writer, &*c64.get_cia_2().borrow());
    save_sid(&mut writer, &*c64.get_sid().borrow());
    save_vic(&mut writer, &*c64.get_vic().borrow());

    writer.into_inner()
}

/// Restores machine state previously produced by `save`. The caller is
/// expected to follow the same reset-then-restore contract as a cold
/// snapshot load: call this only at a cycle boundary, with the machine
/// freshly reset so chip-internal timing state starts from a known point.
pub fn restore(c64: &mut C64, data: &[u8]) -> Result<(), SnapshotError> {
    let mut reader = SnapshotReader::new(data)?;

    let a = reader.read_u8()?;
    let x = reader.read_u8()?;
    let y = reader.read_u8()?;
    let sp = reader.read_u8()?;
    let p = reader.read_u8()?;
    let pc = reader.read_u16()?;
    {
        let cpu = c64.get_cpu_mut();
        cpu.set_register(Register::A, a);
        cpu.set_register(Register::X, x);
        cpu.set_register(Register::Y, y);
        cpu.set_register(Register::SP, sp);
        cpu.set_register(Register::P, p);
        cpu.set_pc(pc);
    }

    let ram_size = reader.read_u16()? as usize;
    let ram_bytes = reader.read_bytes(ram_size)?.to_vec();
    let ram = c64.get_ram();
    for (addr, byte) in ram_bytes.iter().enumerate() {
        ram.borrow_mut().write(addr as u16, *byte);
    }

    let color_ram_size = reader.read_u16()? as usize;
    let color_ram_bytes = reader.read_bytes(color_ram_size)?.to_vec();
    let color_ram = c64.get_color_ram();
    for (addr, byte) in color_ram_bytes.iter().enumerate() {
        color_ram.borrow_mut().write(addr as u16, *byte);
    }

    restore_cia(&mut reader, &mut *c64.get_cia_1().borrow_mut())?;
    restore_cia(&mut reader, &mut *c64.get_cia_2().borrow_mut())?;
    restore_sid(&mut reader, &mut *c64.get_sid().borrow_mut())?;
    restore_vic(&mut reader, &mut *c64.get_vic().borrow_mut())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let data = [0u8; 16];
        assert_eq!(Err(SnapshotError::InvalidMagic), SnapshotReader::new(&data));
    }

    #[test]
    fn rejects_unsupported_major_version() {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.push(9);
        data.push(0);
        assert_eq!(
            Err(SnapshotError::UnsupportedVersion(9, 0)),
            SnapshotReader::new(&data)
        );
    }

    #[test]
    fn writer_round_trips_through_reader() {
        let mut writer = SnapshotWriter::new();
        writer.write_u8(0x42);
        writer.write_u16(0xbeef);
        writer.write_bytes(&[1, 2, 3]);
        let buf = writer.into_inner();

        let mut reader = SnapshotReader::new(&buf).unwrap();
        assert_eq!(0x42, reader.read_u8().unwrap());
        assert_eq!(0xbeef, reader.read_u16().unwrap());
        assert_eq!(&[1, 2, 3], reader.read_bytes(3).unwrap());
    }
}
