// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::{Pin, Shared};

use super::cycle_counter::CycleCounter;

// Spec: 6526 COMPLEX INTERFACE ADAPTER (CIA) Datasheet, Timer A/B

mod delay {
    pub const LOAD0: u16 = 1;
    pub const LOAD1: u16 = 1 << 1;
    pub const START0: u16 = 1 << 2;
    pub const START1: u16 = 1 << 3;
}

#[derive(Copy, Clone, PartialEq)]
pub enum Mode {
    TimerA,
    TimerB,
}

#[derive(Copy, Clone, PartialEq)]
enum RunMode {
    Continuous,
    OneShot,
}

#[derive(Copy, Clone, PartialEq)]
enum OutputMode {
    Pulse,
    Toggle,
}

/// Plain snapshot of a `Timer`'s internal fields, used to round-trip state
/// without going through `get_config`/`set_config`'s delayed-load side effects.
pub struct TimerState {
    pub enabled: bool,
    pub active: bool,
    pub one_shot: bool,
    pub toggle_output: bool,
    pub pb_on: bool,
    pub input_mode: u8,
    pub raw_config: u8,
    pub latch: u16,
    pub counter: u16,
    pub pb_output: bool,
    pub cascade_input: bool,
    pub delay_cycles: u16,
    pub delay_feed: u16,
}

pub struct Timer {
    // Configuration
    mode: Mode,
    // Runtime State
    enabled: bool,
    active: bool,
    run_mode: RunMode,
    output_mode: OutputMode,
    pb_on: bool,
    input_mode: u8,
    raw_config: u8,
    latch: u16,
    counter: u16,
    pb_output: bool,
    cascade_input: bool,
    delay: CycleCounter,
    // I/O
    cnt_pin: Shared<Pin>,
}

impl Timer {
    pub fn new(mode: Mode, cnt_pin: Shared<Pin>) -> Self {
        let mut timer = Self {
            mode,
            enabled: false,
            active: false,
            run_mode: RunMode::Continuous,
            output_mode: OutputMode::Pulse,
            pb_on: false,
            input_mode: 0,
            raw_config: 0,
            latch: 0xffff,
            counter: 0,
            pb_output: false,
            cascade_input: false,
            delay: CycleCounter::new(0xffff),
            cnt_pin,
        };
        timer.reset();
        timer
    }

    pub fn clock(&mut self) -> bool {
        if self.delay.has_cycle(delay::LOAD1) {
            self.counter = self.latch;
        }
        if self.delay.has_cycle(delay::START1) {
            self.active = true;
        }
        self.delay.clock();
        let running = self.enabled && self.active;
        let mut underflow = false;
        if running && self.count_input() {
            if self.counter == 0 {
                underflow = true;
                self.counter = self.latch;
                if self.run_mode == RunMode::OneShot {
                    self.enabled = false;
                    self.active = false;
                    self.raw_config.set_bit(0, false);
                }
            } else {
                self.counter -= 1;
            }
        }
        match self.output_mode {
            OutputMode::Toggle => {
                if underflow {
                    self.pb_output = !self.pb_output;
                }
            }
            OutputMode::Pulse => {
                self.pb_output = underflow;
            }
        }
        underflow
    }

    pub fn feed_source(&mut self, cascade_input: bool) {
        self.cascade_input = cascade_input;
    }

    pub fn get_config(&self) -> u8 {
        self.raw_config
    }

    pub fn get_counter(&self) -> u16 {
        self.counter
    }

    pub fn get_counter_hi(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    pub fn get_counter_lo(&self) -> u8 {
        self.counter as u8
    }

    pub fn get_latch(&self) -> u16 {
        self.latch
    }

    pub fn get_pb_output(&self) -> bool {
        self.pb_output
    }

    pub fn is_pb_on(&self) -> bool {
        self.pb_on
    }

    pub fn reset(&mut self) {
        self.enabled = false;
        self.active = false;
        self.run_mode = RunMode::OneShot;
        self.output_mode = OutputMode::Pulse;
        self.pb_on = false;
        self.input_mode = 0;
        self.raw_config = 0x08;
        self.latch = 0xffff;
        self.counter = 0x0000;
        self.pb_output = false;
        self.cascade_input = false;
        self.delay.reset();
    }

    pub fn set_config(&mut self, value: u8) {
        let start = value.get_bit(0);
        if start && !self.enabled {
            self.delay.feed(delay::START0);
        }
        if !start {
            self.active = false;
        }
        self.enabled = start;
        self.pb_on = value.get_bit(1);
        self.output_mode = if value.get_bit(2) {
            OutputMode::Toggle
        } else {
            OutputMode::Pulse
        };
        self.run_mode = if value.get_bit(3) {
            RunMode::OneShot
        } else {
            RunMode::Continuous
        };
        if value.get_bit(4) {
            self.delay.feed(delay::LOAD0);
        }
        let inmode_bits: u8 = match self.mode {
            Mode::TimerA => 0b1,
            Mode::TimerB => 0b11,
        };
        self.input_mode = (value >> 5) & inmode_bits;
        self.raw_config = value & !(1 << 4);
    }

    pub fn set_latch_hi(&mut self, value: u8) {
        self.latch = (u16::from(value) << 8) | (self.latch & 0x00ff);
        self.delay.feed(delay::LOAD0);
    }

    pub fn set_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xff00) | u16::from(value);
    }

    /// Captures internal state directly, bypassing `set_config`'s delayed load/start
    /// semantics so a restore doesn't re-trigger a one-cycle-delayed reload or start.
    pub fn snapshot(&self) -> TimerState {
        TimerState {
            enabled: self.enabled,
            active: self.active,
            one_shot: self.run_mode == RunMode::OneShot,
            toggle_output: self.output_mode == OutputMode::Toggle,
            pb_on: self.pb_on,
            input_mode: self.input_mode,
            raw_config: self.raw_config,
            latch: self.latch,
            counter: self.counter,
            pb_output: self.pb_output,
            cascade_input: self.cascade_input,
            delay_cycles: self.delay.raw_cycles(),
            delay_feed: self.delay.raw_feed(),
        }
    }

    pub fn restore(&mut self, state: &TimerState) {
        self.enabled = state.enabled;
        self.active = state.active;
        self.run_mode = if state.one_shot {
            RunMode::OneShot
        } else {
            RunMode::Continuous
        };
        self.output_mode = if state.toggle_output {
            OutputMode::Toggle
        } else {
            OutputMode::Pulse
        };
        self.pb_on = state.pb_on;
        self.input_mode = state.input_mode;
        self.raw_config = state.raw_config;
        self.latch = state.latch;
        self.counter = state.counter;
        self.pb_output = state.pb_output;
        self.cascade_input = state.cascade_input;
        self.delay.restore_raw(state.delay_cycles, state.delay_feed);
    }

    fn count_input(&self) -> bool {
        match self.mode {
            Mode::TimerA => match self.input_mode {
                0 => true,
                _ => self.cnt_pin.borrow().is_rising(),
            },
            Mode::TimerB => match self.input_mode {
                0 => true,
                1 => self.cnt_pin.borrow().is_rising(),
                2 => self.cascade_input,
                _ => self.cascade_input && self.cnt_pin.borrow().is_high(),
            },
        }
    }
}
