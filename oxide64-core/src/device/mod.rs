// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

pub mod cartridge;
mod datassette;
pub mod disk;
mod drive;
pub mod gcr;
pub mod iec;
pub mod joystick;
pub mod keyboard;
mod tape;

pub use self::cartridge::Cartridge;
pub use self::datassette::Datassette;
pub use self::disk::Disk;
pub use self::drive::Vc1541;
pub use self::iec::IecBus;
pub use self::joystick::Joystick;
pub use self::keyboard::{Key, KeyEvent, Keyboard};
pub use self::tape::Tape;
