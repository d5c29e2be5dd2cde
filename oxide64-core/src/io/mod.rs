// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

pub mod cia;
mod cycle_counter;
mod rtc;
mod timer;
pub mod via;

pub use self::cia::{Cia, CiaState};
pub use self::rtc::RtcState;
pub use self::timer::TimerState;
pub use self::via::Via;
