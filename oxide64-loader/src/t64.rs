// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use oxide64_system::autostart;
use oxide64_system::{Autostart, AutostartMethod, Image, C64};

use super::Loader;
use crate::io::{self, Reader};

// SPEC: https://ist.uwaterloo.ca/~schepers/formats/T64.TXT

const HEADER_SIZE: usize = 64;
const ENTRY_SIZE: usize = 32;

struct DirEntry {
    entry_type: u8,
    start_address: u16,
    end_address: u16,
    file_offset: u32,
}

struct T64Image {
    data: Vec<u8>,
    offset: u16,
}

impl Image for T64Image {
    fn mount(&mut self, c64: &mut C64) {
        info!(target: "loader", "Mounting T64 image");
        c64.load(&self.data, self.offset);
    }

    fn unmount(&mut self, _c64: &mut C64) {}
}

pub struct T64Loader {}

impl T64Loader {
    pub fn new() -> Self {
        Self {}
    }

    fn read_entry(&self, data: &[u8], index: usize) -> io::Result<DirEntry> {
        let offset = HEADER_SIZE + index * ENTRY_SIZE;
        if offset + ENTRY_SIZE > data.len() {
            return Err(format!("truncated T64 directory entry {}", index));
        }
        let entry = &data[offset..offset + ENTRY_SIZE];
        Ok(DirEntry {
            entry_type: entry[0],
            start_address: u16::from_le_bytes([entry[2], entry[3]]),
            end_address: u16::from_le_bytes([entry[4], entry[5]]),
            file_offset: u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]),
        })
    }
}

impl Loader for T64Loader {
    fn autostart(&self, reader: &mut dyn Reader) -> io::Result<AutostartMethod> {
        let image = self.load(reader)?;
        let autostart = Autostart::new(autostart::Mode::Run, image);
        Ok(AutostartMethod::WithAutostart(Some(autostart)))
    }

    fn load(&self, reader: &mut dyn Reader) -> io::Result<Box<dyn Image>> {
        info!(target: "loader", "Loading T64");
        // Directory entries carry absolute file offsets into the same
        // container, so the archive has to be fully buffered before we can
        // locate the first program's data.
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if data.len() < HEADER_SIZE {
            return Err("invalid T64 header".to_owned());
        }
        let used_entries = u16::from_le_bytes([data[36], data[37]]) as usize;
        let max_entries = u16::from_le_bytes([data[34], data[35]]) as usize;
        let entry_count = used_entries.max(1).min(max_entries.max(1));
        let mut found = None;
        for i in 0..entry_count {
            let entry = self.read_entry(&data, i)?;
            if entry.entry_type != 0 && entry.start_address < entry.end_address {
                found = Some(entry);
                break;
            }
        }
        let entry = found.ok_or_else(|| "no program entries in T64 archive".to_owned())?;
        info!(target: "loader", "Found program, load address 0x{:x}, size {}",
              entry.start_address, entry.end_address.wrapping_sub(entry.start_address));
        let start = entry.file_offset as usize;
        let size = (entry.end_address.wrapping_sub(entry.start_address)) as usize;
        let end = start + size;
        if end > data.len() {
            return Err("T64 entry data out of bounds".to_owned());
        }
        Ok(Box::new(T64Image {
            data: data[start..end].to_vec(),
            offset: entry.start_address,
        }))
    }
}
