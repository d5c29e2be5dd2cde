// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use bit_field::BitField;

use crate::util::SharedCell;

// SPEC: joystick port bit map (active low): 0=up, 1=down, 2=left, 3=right, 4=fire

#[derive(Clone, Copy, PartialEq)]
pub enum Mode {
    None,
    Numpad,
    Joy0,
    Joy1,
}

impl Mode {
    pub fn from(mode: &str) -> Mode {
        match mode {
            "none" => Mode::None,
            "numpad" => Mode::Numpad,
            "joy0" => Mode::Joy0,
            "joy1" => Mode::Joy1,
            _ => panic!("invalid joystick mode {}", mode),
        }
    }

    pub fn index(self) -> Option<usize> {
        match self {
            Mode::Joy0 => Some(0),
            Mode::Joy1 => Some(1),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
pub enum Button {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    Fire = 4,
}

/// Joystick exposes the live button state through a shared bitmask cell that
/// CIA reads back (inverted) on the control port it is wired to. The host is
/// responsible for translating its own input events (keyboard, gamepad, ...)
/// into calls to `set_button`/`set_axis`; no input backend is assumed here.
pub struct Joystick {
    mode: Mode,
    axis_motion_threshold: i16,
    state: SharedCell<u8>,
}

impl Joystick {
    pub fn new(mode: Mode, axis_motion_threshold: i16, state: SharedCell<u8>) -> Self {
        Joystick {
            mode,
            axis_motion_threshold,
            state,
        }
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    pub fn get_state(&self) -> u8 {
        self.state.get()
    }

    pub fn set_axis_motion(&mut self, value: i16, positive_button: Button, negative_button: Button) {
        if value > self.axis_motion_threshold {
            self.set_button(positive_button, true);
            self.set_button(negative_button, false);
        } else if value < -self.axis_motion_threshold {
            self.set_button(negative_button, true);
            self.set_button(positive_button, false);
        } else {
            self.set_button(positive_button, false);
            self.set_button(negative_button, false);
        }
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let mut value = self.state.get();
        value.set_bit(button as usize, pressed);
        self.state.set(value);
    }

    pub fn reset(&mut self) {
        self.state.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::new_shared_cell;

    #[test]
    fn set_button_sets_bit() {
        let state = new_shared_cell(0u8);
        let mut joystick = Joystick::new(Mode::Joy0, 16384, state.clone());
        joystick.set_button(Button::Fire, true);
        assert_eq!(0b10000, state.get());
    }

    #[test]
    fn reset_clears_state() {
        let state = new_shared_cell(0xffu8);
        let mut joystick = Joystick::new(Mode::Joy0, 16384, state.clone());
        joystick.reset();
        assert_eq!(0, state.get());
    }
}
