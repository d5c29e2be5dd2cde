// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use oxide64_core::device::Disk;
use oxide64_system::autostart;
use oxide64_system::{Autostart, AutostartMethod, Image, C64};

use super::Loader;
use crate::io::{self, Reader};

// SPEC: https://vice-emu.sourceforge.io/vice_17.html#SEC307 (D64 layout)

struct D64Image {
    disk: Option<Disk>,
}

impl Image for D64Image {
    fn mount(&mut self, c64: &mut C64) {
        info!(target: "loader", "Mounting D64 image");
        if let Some(disk) = self.disk.take() {
            c64.attach_disk(disk);
        }
    }

    fn unmount(&mut self, c64: &mut C64) {
        self.disk = c64.detach_disk();
    }
}

pub struct D64Loader {}

impl D64Loader {
    pub fn new() -> Self {
        Self {}
    }
}

impl Loader for D64Loader {
    fn autostart(&self, reader: &mut dyn Reader) -> io::Result<AutostartMethod> {
        let image = self.load(reader)?;
        let autostart = Autostart::new(autostart::Mode::Load, image);
        Ok(AutostartMethod::WithAutostart(Some(autostart)))
    }

    fn load(&self, reader: &mut dyn Reader) -> io::Result<Box<dyn Image>> {
        info!(target: "loader", "Loading D64");
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let disk = Disk::from_d64(&data).map_err(|e| format!("invalid D64 image {:?}", e))?;
        Ok(Box::new(D64Image { disk: Some(disk) }))
    }
}
