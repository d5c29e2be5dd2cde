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

// SPEC: http://unusedino.de/ec64/technical/formats/g64.html

struct G64Image {
    disk: Option<Disk>,
}

impl Image for G64Image {
    fn mount(&mut self, c64: &mut C64) {
        info!(target: "loader", "Mounting G64 image");
        if let Some(disk) = self.disk.take() {
            c64.attach_disk(disk);
        }
    }

    fn unmount(&mut self, c64: &mut C64) {
        self.disk = c64.detach_disk();
    }
}

pub struct G64Loader {}

impl G64Loader {
    pub fn new() -> Self {
        Self {}
    }
}

impl Loader for G64Loader {
    fn autostart(&self, reader: &mut dyn Reader) -> io::Result<AutostartMethod> {
        let image = self.load(reader)?;
        let autostart = Autostart::new(autostart::Mode::Load, image);
        Ok(AutostartMethod::WithAutostart(Some(autostart)))
    }

    fn load(&self, reader: &mut dyn Reader) -> io::Result<Box<dyn Image>> {
        info!(target: "loader", "Loading G64");
        // G64's track-offset table points forward into the same buffer, so
        // unlike the sequential formats this one has to be parsed from a
        // fully materialized copy rather than read straight off the wire.
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let disk = Disk::from_g64(&data).map_err(|e| format!("invalid G64 image {:?}", e))?;
        Ok(Box::new(G64Image { disk: Some(disk) }))
    }
}
