// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;

use super::gcr;

// SPEC: https://vice-emu.sourceforge.io/vice_17.html#SEC307 (D64 layout)

/// 1541 disks store 85 halftrack slots (index 0 is unused padding, mirroring
/// the padding slot in the original halftrack/track union layout). Whole
/// tracks live at the odd indices: track `t` is halftrack `2 * t - 1`.
pub const NUM_HALFTRACKS: usize = 85;
pub const SECTOR_SIZE: usize = 256;

const GAP_BYTE: u8 = 0x55;
const HEADER_GAP: usize = 9;
const TRACK_GAP: usize = 8;

/// Returns the sector count for a 1541 speed zone track, or 0 for an
/// out-of-range track number.
pub fn sectors_per_track(track: u8) -> u8 {
    match track {
        1..=17 => 21,
        18..=24 => 19,
        25..=30 => 18,
        31..=42 => 17,
        _ => 0,
    }
}

/// Returns the density/speed zone (0 = slowest, 3 = fastest) of a track.
pub fn speed_zone(track: u8) -> u8 {
    match track {
        1..=17 => 3,
        18..=24 => 2,
        25..=30 => 1,
        _ => 0,
    }
}

fn d64_offset(track: u8, sector: u8) -> usize {
    let mut offset = 0usize;
    for t in 1..track {
        offset += sectors_per_track(t) as usize * SECTOR_SIZE;
    }
    offset + sector as usize * SECTOR_SIZE
}

fn d64_size(tracks: u8) -> usize {
    (1..=tracks)
        .map(|t| sectors_per_track(t) as usize * SECTOR_SIZE)
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    InvalidImageSize(usize),
    InvalidTrack(u8),
    InvalidSector(u8, u8),
}

/// A 1541 disk image held as its raw GCR bit stream, one entry per
/// halftrack. This is the representation the drive head actually reads
/// and writes; D64 sector images are encoded into it on load and decoded
/// back out on save.
pub struct Disk {
    halftracks: Vec<Vec<u8>>,
    tracks: u8,
    id: (u8, u8),
    write_protected: bool,
}

impl Disk {
    /// A disk with no halftrack data, as if no disk were in the drive's
    /// mechanism but the mechanism still needs something to read.
    pub fn blank(tracks: u8) -> Self {
        Disk {
            halftracks: vec![Vec::new(); NUM_HALFTRACKS],
            tracks,
            id: (0x41, 0x30),
            write_protected: false,
        }
    }

    /// Builds a disk from a standard D64 sector image (35 or 40 tracks,
    /// with or without the trailing per-sector error byte table).
    pub fn from_d64(data: &[u8]) -> Result<Self, DiskError> {
        let tracks = match data.len() {
            n if n == d64_size(35) || n == d64_size(35) + 683 => 35,
            n if n == d64_size(40) || n == d64_size(40) + 768 => 40,
            n => return Err(DiskError::InvalidImageSize(n)),
        };
        let id = (
            data[d64_offset(18, 0) + 0xa2],
            data[d64_offset(18, 0) + 0xa3],
        );
        let mut disk = Disk {
            halftracks: vec![Vec::new(); NUM_HALFTRACKS],
            tracks,
            id,
            write_protected: false,
        };
        for track in 1..=tracks {
            disk.encode_track(track, data);
        }
        Ok(disk)
    }

    /// Builds a disk directly from a G64 raw GCR bit-stream image.
    ///
    /// Layout: `"GCR-1541"` signature, version byte, halftrack-slot count,
    /// max track length (u16 LE), then an 84-entry u32 LE track-offset
    /// table and an 84-entry u32 LE speed-zone table. Each non-zero offset
    /// points at a `u16` bit length followed by that many (rounded up to
    /// whole bytes) GCR bytes for the halftrack.
    pub fn from_g64(data: &[u8]) -> Result<Self, DiskError> {
        const HEADER_SIG: &[u8] = b"GCR-1541";
        const TRACK_TABLE_OFFSET: usize = 12;

        if data.len() < TRACK_TABLE_OFFSET + 2 * NUM_HALFTRACKS * 4
            || &data[0..HEADER_SIG.len()] != HEADER_SIG
        {
            return Err(DiskError::InvalidImageSize(data.len()));
        }
        let halftrack_slots = data[9] as usize;
        let mut halftracks = vec![Vec::new(); NUM_HALFTRACKS];
        let mut max_track = 0u8;
        for i in 0..halftrack_slots.min(NUM_HALFTRACKS - 1) {
            let entry = TRACK_TABLE_OFFSET + i * 4;
            let offset = u32::from_le_bytes([
                data[entry],
                data[entry + 1],
                data[entry + 2],
                data[entry + 3],
            ]) as usize;
            if offset == 0 {
                continue;
            }
            if offset + 2 > data.len() {
                return Err(DiskError::InvalidTrack((i / 2 + 1) as u8));
            }
            let bit_len = u16::from_le_bytes([data[offset], data[offset + 1]]) as usize;
            let byte_len = (bit_len + 7) / 8;
            if offset + 2 + byte_len > data.len() {
                return Err(DiskError::InvalidTrack((i / 2 + 1) as u8));
            }
            let halftrack = i + 1;
            halftracks[halftrack] = data[offset + 2..offset + 2 + byte_len].to_vec();
            if i % 2 == 0 {
                max_track = max_track.max((i / 2 + 1) as u8);
            }
        }
        Ok(Disk {
            halftracks,
            tracks: max_track.max(35),
            id: (0x41, 0x30),
            write_protected: false,
        })
    }

    /// Decodes the halftrack GCR data back into a D64 sector image.
    pub fn to_d64(&self) -> Vec<u8> {
        let mut out = vec![0u8; d64_size(self.tracks)];
        for track in 1..=self.tracks {
            for sector in 0..sectors_per_track(track) {
                if let Some(data) = self.read_sector(track, sector) {
                    let offset = d64_offset(track, sector);
                    out[offset..offset + SECTOR_SIZE].copy_from_slice(&data);
                }
            }
        }
        out
    }

    pub fn is_write_protected(&self) -> bool {
        self.write_protected
    }

    pub fn set_write_protected(&mut self, value: bool) {
        self.write_protected = value;
    }

    /// GCR bit stream for the whole track (not a half-step), empty if the
    /// track has never been encoded.
    pub fn track_gcr(&self, track: u8) -> &[u8] {
        &self.halftracks[Self::halftrack_index(track)]
    }

    pub fn halftrack_gcr(&self, halftrack: usize) -> &[u8] {
        &self.halftracks[halftrack]
    }

    /// Looks up the sector holding the given track/sector by scanning the
    /// track's GCR stream for a matching header block, then decodes the
    /// data block that follows it.
    pub fn read_sector(&self, track: u8, sector: u8) -> Option<[u8; 256]> {
        let gcr = self.track_gcr(track);
        self.find_data_block(gcr, sector)
    }

    /// Re-encodes a single sector's data block in place within the track's
    /// GCR stream, used when the drive writes a sector back to the image.
    pub fn write_sector(&mut self, track: u8, sector: u8, data: &[u8; 256]) -> bool {
        if sector >= sectors_per_track(track) {
            return false;
        }
        let index = Self::halftrack_index(track);
        let block = gcr::data_block(data);
        let encoded = gcr::encode(&block);
        let gcr = &mut self.halftracks[index];
        if let Some(pos) = Self::find_header_sync(gcr, sector) {
            // Skip past the header's sync+10 GCR bytes and the inter-block gap
            // to the data block's own sync mark.
            if let Some(data_start) = Self::skip_to_data_sync(gcr, pos) {
                let end = data_start + encoded.len();
                if end <= gcr.len() {
                    gcr[data_start..end].copy_from_slice(&encoded);
                    return true;
                }
            }
        }
        false
    }

    fn halftrack_index(track: u8) -> usize {
        2 * track as usize - 1
    }

    fn encode_track(&mut self, track: u8, d64: &[u8]) {
        let mut stream = Vec::new();
        for sector in 0..sectors_per_track(track) {
            let offset = d64_offset(track, sector);
            let mut data = [0u8; SECTOR_SIZE];
            data.copy_from_slice(&d64[offset..offset + SECTOR_SIZE]);

            stream.extend(core::iter::repeat(gcr::SYNC_BYTE).take(gcr::SYNC_LEN));
            let header = gcr::header_block(track, sector, self.id.0, self.id.1);
            stream.extend(gcr::encode(&header));
            stream.extend(core::iter::repeat(GAP_BYTE).take(HEADER_GAP));

            stream.extend(core::iter::repeat(gcr::SYNC_BYTE).take(gcr::SYNC_LEN));
            let block = gcr::data_block(&data);
            stream.extend(gcr::encode(&block));
            stream.extend(core::iter::repeat(GAP_BYTE).take(TRACK_GAP));
        }
        self.halftracks[Self::halftrack_index(track)] = stream;
    }

    fn find_header_sync(gcr: &[u8], sector: u8) -> Option<usize> {
        let len = gcr.len();
        if len < gcr::SYNC_LEN + 10 {
            return None;
        }
        let mut i = 0;
        while i + gcr::SYNC_LEN + 10 <= len {
            if gcr[i..i + gcr::SYNC_LEN].iter().all(|&b| b == gcr::SYNC_BYTE) {
                let header_start = i + gcr::SYNC_LEN;
                if let Some((_, s, _, _)) = gcr::decode_header_block(&gcr[header_start..header_start + 10]) {
                    if s == sector {
                        return Some(i);
                    }
                }
                i = header_start + 10;
            } else {
                i += 1;
            }
        }
        None
    }

    fn skip_to_data_sync(gcr: &[u8], header_sync_pos: usize) -> Option<usize> {
        let mut pos = header_sync_pos + gcr::SYNC_LEN + 10;
        while pos < gcr.len() && gcr[pos] != gcr::SYNC_BYTE {
            pos += 1;
        }
        while pos < gcr.len() && gcr[pos] == gcr::SYNC_BYTE {
            pos += 1;
        }
        if pos <= gcr.len() {
            Some(pos)
        } else {
            None
        }
    }

    fn find_data_block(&self, gcr: &[u8], sector: u8) -> Option<[u8; 256]> {
        let pos = Self::find_header_sync(gcr, sector)?;
        let data_start = Self::skip_to_data_sync(gcr, pos)?;
        if data_start + 325 > gcr.len() {
            return None;
        }
        gcr::decode_data_block(&gcr[data_start..data_start + 325])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sectors_per_track_matches_speed_zones() {
        assert_eq!(21, sectors_per_track(1));
        assert_eq!(21, sectors_per_track(17));
        assert_eq!(19, sectors_per_track(18));
        assert_eq!(18, sectors_per_track(25));
        assert_eq!(17, sectors_per_track(35));
    }

    #[test]
    fn blank_35_track_image_round_trips_size() {
        assert_eq!(174_848, d64_size(35));
    }

    #[test]
    fn sector_written_then_read_back_matches() {
        let image = vec![0u8; d64_size(35)];
        let mut disk = Disk::from_d64(&image).unwrap();
        let mut data = [0u8; 256];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = i as u8;
        }
        assert!(disk.write_sector(18, 3, &data));
        let read_back = disk.read_sector(18, 3).unwrap();
        assert_eq!(&data[..], &read_back[..]);
    }

    #[test]
    fn to_d64_recovers_original_image_after_load() {
        let mut image = vec![0u8; d64_size(35)];
        image[d64_offset(1, 0)] = 0xab;
        let disk = Disk::from_d64(&image).unwrap();
        let round_tripped = disk.to_d64();
        assert_eq!(image, round_tripped);
    }

    #[test]
    fn invalid_image_size_is_rejected() {
        assert_eq!(
            Err(DiskError::InvalidImageSize(100)),
            Disk::from_d64(&vec![0u8; 100])
        );
    }
}
