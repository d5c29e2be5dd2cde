// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

use core::cell::Cell;

pub struct Clock {
    counter: Cell<u64>,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            counter: Cell::new(0),
        }
    }
}

impl Clock {
    #[inline]
    pub fn elapsed(&self, prev: u64) -> u64 {
        self.counter.get().wrapping_sub(prev)
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.counter.get()
    }

    pub fn reset(&self) {
        self.counter.set(0);
    }

    #[inline]
    pub fn tick(&self) {
        let result = self.counter.get().wrapping_add(1);
        self.counter.set(result);
    }

    #[inline]
    pub fn tick_delta(&self, delta: u64) {
        let result = self.counter.get().wrapping_add(delta);
        self.counter.set(result);
    }
}
