// This file is part of oxide64.
// Copyright (c) 2016-2018 Sebastian Jastrzebski. All rights reserved.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::boxed::Box;
extern crate byteorder;
#[macro_use]
extern crate log;
extern crate oxide64_core;
extern crate oxide64_system;

mod bin;
mod crt;
mod d64;
mod g64;
pub mod io;
#[cfg(feature = "std")]
mod loaders;
mod p00;
mod prg;
mod snapshot;
mod t64;
mod tap;

use oxide64_system::{AutostartMethod, Image};

pub use self::bin::BinLoader;
pub use self::crt::CrtLoader;
pub use self::d64::D64Loader;
pub use self::g64::G64Loader;
#[cfg(feature = "std")]
pub use self::loaders::Loaders;
pub use self::p00::P00Loader;
pub use self::prg::PrgLoader;
pub use self::snapshot::{
    restore as restore_snapshot, save as save_snapshot, SnapshotError, SnapshotReader,
    SnapshotWriter,
};
pub use self::t64::T64Loader;
pub use self::tap::TapLoader;

#[cfg(feature = "std")]
pub use self::io::FileReader;

pub trait Loader {
    fn autostart(&self, reader: &mut dyn io::Reader) -> io::Result<AutostartMethod>;
    fn load(&self, reader: &mut dyn io::Reader) -> io::Result<Box<dyn Image>>;
}
