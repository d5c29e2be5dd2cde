// This file is part of oxide64.
// Copyright (c) 2016-2019 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
use alloc::prelude::*;
use byteorder::ByteOrder;
use core::result;

pub type Result<T> = result::Result<T, String>;

pub trait Reader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> Result<usize>;
    fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<()>;
    fn consume(&mut self, amt: usize);
}

pub trait ReadBytesExt: Reader {
    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    #[inline]
    fn read_u16<T: ByteOrder>(&mut self) -> Result<u16> {
        let mut buf = [0; 2];
        self.read_exact(&mut buf)?;
        Ok(T::read_u16(&buf))
    }

    #[inline]
    fn read_u32<T: ByteOrder>(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        self.read_exact(&mut buf)?;
        Ok(T::read_u32(&buf))
    }
}

impl<R: Reader + ?Sized> ReadBytesExt for R {}

/// `std`-only bridge from a real file to the no_std-friendly `Reader`
/// trait, so loaders never need to know about `std::fs`/`std::io`
/// directly.
#[cfg(feature = "std")]
pub struct FileReader(std::io::BufReader<std::fs::File>);

#[cfg(feature = "std")]
impl FileReader {
    pub fn open(path: &std::path::Path) -> std::io::Result<Self> {
        Ok(FileReader(std::io::BufReader::new(std::fs::File::open(
            path,
        )?)))
    }
}

#[cfg(feature = "std")]
impl Reader for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        std::io::Read::read(&mut self.0, buf).map_err(|e| e.to_string())
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        std::io::Read::read_to_end(&mut self.0, buf).map_err(|e| e.to_string())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        std::io::Read::read_exact(&mut self.0, buf).map_err(|e| e.to_string())
    }

    fn consume(&mut self, amt: usize) {
        let mut discard = vec![0u8; amt];
        let _ = std::io::Read::read_exact(&mut self.0, &mut discard);
    }
}
