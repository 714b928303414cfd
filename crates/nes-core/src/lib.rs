//! NES Core - Pure Rust NES emulation library
//!
//! This crate holds the cycle-level emulation of the 2A03 CPU and the 2C02
//! PPU, the paged memory they address through, and the chunked snapshot
//! format. It has no windowing, audio or input dependencies; frontends drive
//! it through [`system::NesSystem`].

#![forbid(unsafe_code)]

/// Region and machine configuration
pub mod config;
/// Error taxonomy
pub mod error;
/// Logged-once warning bookkeeping
pub mod warnings;
/// Paged, bank-switchable memory
pub mod memory;
/// Chunked snapshot codec
pub mod state;
/// CPU module containing the 2A03 (6502 variant) implementation
pub mod cpu;
/// PPU (Picture Processing Unit) implementation
pub mod ppu;
/// CPU bus seam: port map and devices
pub mod bus;
/// Per-step hook registry
pub mod hooks;
/// Cartridge images and the fixed board
pub mod cartridge;
/// Integration module for complete NES system
pub mod system;

pub use error::{Error, Result};
