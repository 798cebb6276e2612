//! # Cerastar BM1 RAM Emulator
//!
//! Emulation of the 256-byte I2C RAM (a PCF8570) through which a Junkers/Bosch
//! Cerastar gas furnace and its BM1 bus module exchange data.
//!
//! The furnace writes telemetry to offset 0x20 and raises the flag at 0x10.
//! The bus module writes its control targets to 0x90, seals them with a CRC-8
//! at 0x9F and raises the flag at 0x11. This crate implements the bus-module
//! side of that exchange, plus a simulated furnace for testing.
//!
//! ## Quick Start
//!
//! ```rust
//! use cerastar_bm1::RamBlock;
//!
//! let mut ram = RamBlock::new();
//! ram.set_targets(0x80, 22, 45, false).unwrap();
//!
//! let bm1 = ram.published_bus_module_state().unwrap();
//! assert_eq!(bm1.vl_set_x2.raw(), 44);
//! assert!(bm1.checksum_valid());
//! ```
//!
//! ## Architecture
//!
//! - [`crc8`] - table-driven CRC-8, polynomial 0x39
//! - [`ramblock`] - the memory image and its fixed-offset field accessors
//! - [`busmodule`] - flag-gated, checksummed control writes
//! - [`shared`] - thread-safe handle around one block
//! - [`transport`] - PCF8570 address-pointer access model
//! - [`furnace`] - simulated furnace master
//! - [`diag`] - human-readable renderings and hex dump
//! - [`protocol`] - JSON command interface
//! - [`config`] - emulator configuration

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod busmodule;
pub mod config;
pub mod crc8;
pub mod diag;
pub mod furnace;
pub mod protocol;
pub mod ramblock;
pub mod shared;
pub mod transport;

// Re-export main public types for convenience
pub use busmodule::RamError;
pub use furnace::{FrameError, FurnaceEmulator};
pub use protocol::{Command, CommandResponse, ProtocolHandler};
pub use ramblock::{BusModuleState, FurnaceState, HalfDegrees, RamBlock};
pub use shared::SharedRamBlock;
