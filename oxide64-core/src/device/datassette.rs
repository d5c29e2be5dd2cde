// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use bit_field::BitField;
use log::LogLevel;

use crate::util::{IoPort, Pin, Pulse, Shared};

use super::Tape;

const DUTY_CYCLE: u32 = 50;

pub struct Datassette {
    // Dependencies
    flag_pin: Shared<Pin>,
    cpu_io_port: Shared<IoPort>,
    // Runtime State
    playing: bool,
    tape: Option<Box<dyn Tape>>,
    current_pulse: Pulse,
}

impl Datassette {
    pub fn new(flag_pin: Shared<Pin>, cpu_io_port: Shared<IoPort>) -> Self {
        Datassette {
            flag_pin,
            cpu_io_port,
            playing: false,
            tape: None,
            current_pulse: Pulse::new(0, DUTY_CYCLE),
        }
    }

    pub fn attach(&mut self, tape: Box<dyn Tape>) {
        self.tape = Some(tape);
    }

    #[inline(always)]
    pub fn clock(&mut self) {
        if self.is_playing() && self.tape.is_some() {
            if self.current_pulse.is_done() {
                let pulse_maybe = if let Some(ref mut tape) = self.tape {
                    tape.read_pulse()
                } else {
                    None
                };
                if let Some(pulse) = pulse_maybe {
                    self.current_pulse = Pulse::new(pulse, DUTY_CYCLE);
                } else {
                    self.stop();
                }
            }
            if !self.current_pulse.is_done() {
                self.flag_pin
                    .borrow_mut()
                    .set_active(self.current_pulse.advance());
            }
        }
    }

    pub fn detach(&mut self) {
        self.stop();
        self.tape = None;
    }

    pub fn is_playing(&self) -> bool {
        self.playing && !self.cpu_io_port.borrow().get_value().get_bit(5)
    }

    pub fn play(&mut self) {
        if log_enabled!(LogLevel::Info) {
            info!(target: "device", "Starting datassette");
        }
        if self.tape.is_some() {
            self.playing = true;
        }
    }

    pub fn reset(&mut self) {
        self.playing = false;
        self.current_pulse = Pulse::new(0, DUTY_CYCLE);
        if let Some(ref mut tape) = self.tape {
            tape.seek(0);
        }
    }

    pub fn stop(&mut self) {
        if log_enabled!(LogLevel::Info) {
            info!(target: "device", "Stopping datassette");
        }
        self.playing = false;
    }
}
