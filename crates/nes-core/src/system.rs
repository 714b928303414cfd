//! NES System Integration
//!
//! [`NesSystem`] owns the CPU and the bus (which owns the PPU and every
//! installed device). The CPU is the only driver: each step advances its
//! clock and the bus brings the PPU and the hooks up to the same point.

use log::{info, warn};

use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::config::{Config, Region};
use crate::cpu::Cpu;
use crate::error::{Error, Result};
use crate::ppu::Ppu;
use crate::state::{Loader, Saver, Tag};
use crate::warnings::{Warning, Warnings};

/// Snapshot format version written by [`NesSystem::save_state`]
pub const STATE_VERSION: u8 = 1;

const TAG_SNAPSHOT: Tag = Tag::new(b"NESS");
const TAG_HEADER: Tag = Tag::new(b"HDR\0");
const TAG_CPU: Tag = Tag::new(b"CPU\0");
const TAG_PPU: Tag = Tag::new(b"PPU\0");
const TAG_CARTRIDGE: Tag = Tag::new(b"CRT\0");

/// NES System - integrates all components
#[derive(Debug)]
pub struct NesSystem {
    cpu: Cpu,
    bus: Bus,
    config: Config,
    /// Frames completed since power-on
    frame_count: u64,
    warnings: Warnings,
}

impl NesSystem {
    /// Create a powered-on NTSC system with no cartridge
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let mut system = Self {
            cpu: Cpu::new(config.region)?,
            bus: Bus::new(config.region)?,
            config,
            frame_count: 0,
            warnings: Warnings::new(),
        };
        system.power();
        Ok(system)
    }

    /// Power cycle: clears RAM and restarts every clock
    pub fn power(&mut self) {
        self.bus.ppu_mut().set_warm_up(self.config.warm_up);
        self.bus.reset(true);
        self.cpu.reset(&mut self.bus, true);
        self.frame_count = 0;
    }

    /// Press the reset button
    pub fn reset(&mut self) {
        self.bus.reset(false);
        self.cpu.reset(&mut self.bus, false);
    }

    /// Replace the cartridge and power cycle
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) -> Result<()> {
        let mapper = cartridge.mapper_number();
        if mapper != 0 && self.warnings.first(Warning::UnsupportedMapper) {
            warn!("system: mapper {} is not emulated, running with a fixed layout", mapper);
        }
        self.bus.remove_devices();
        cartridge.insert(&mut self.bus)?;
        self.power();
        Ok(())
    }

    /// Parse an iNES image and insert it
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        self.insert_cartridge(Cartridge::from_rom(rom)?)
    }

    /// Execute one instruction or interrupt sequence
    pub fn step(&mut self) {
        self.cpu.step(&mut self.bus);
    }

    /// Run until the PPU finishes a frame, then rebase every clock to it
    pub fn run_frame(&mut self) {
        loop {
            self.cpu.step(&mut self.bus);
            if let Some(end) = self.bus.ppu_mut().take_frame_end() {
                self.cpu.end_frame(end);
                self.bus.ppu_mut().end_frame(end);
                self.frame_count += 1;
                return;
            }
        }
    }

    pub fn run_frames(&mut self, frames: u64) {
        for _ in 0..frames {
            self.run_frame();
        }
    }

    /// Switch region at runtime; clocks are rescaled in place
    pub fn set_region(&mut self, region: Region) {
        self.cpu.set_region(region);
        self.bus.ppu_mut().set_region(region);
        self.config.region = region;
    }

    /// Serialize the machine
    pub fn save_state(&self) -> Vec<u8> {
        let mut state = Saver::new();
        state.begin(TAG_SNAPSHOT);
        state
            .begin(TAG_HEADER)
            .write_u8(STATE_VERSION)
            .write_u8(self.config.region.to_u8())
            .end();
        self.cpu.save(&mut state, TAG_CPU);
        self.bus.ppu().save(&mut state, TAG_PPU);
        if self.bus.device_count() > 0 {
            state.begin(TAG_CARTRIDGE);
            self.bus.save_devices(&mut state);
            state.end();
        }
        let data = state.finish();
        info!("system: saved {} byte snapshot", data.len());
        data
    }

    /// Restore a snapshot made by [`NesSystem::save_state`]
    ///
    /// The cartridge is not part of the snapshot; the one it was taken with
    /// must already be inserted. On error the machine may be half loaded and
    /// should be powered again.
    pub fn load_state(&mut self, data: &[u8]) -> Result<()> {
        if data.len() < 8 || data[..4] != TAG_SNAPSHOT.0 {
            return Err(Error::InvalidFile("missing snapshot magic"));
        }
        let mut state = Loader::new(data);
        state.begin()?;

        if state.begin()? != Some(TAG_HEADER) {
            return Err(Error::InvalidFile("snapshot header missing"));
        }
        let version = state.read_u8()?;
        if version > STATE_VERSION {
            return Err(Error::UnsupportedFeature("snapshot format is newer than this reader"));
        }
        let region = Region::from_u8(state.read_u8()?).ok_or(Error::CorruptFile("unknown region"))?;
        state.end()?;
        self.set_region(region);

        while let Some(tag) = state.begin()? {
            match tag {
                TAG_CPU => self.cpu.load(&mut state)?,
                TAG_PPU => self.bus.ppu_mut().load(&mut state)?,
                TAG_CARTRIDGE => self.bus.load_devices(&mut state)?,
                _ => {}
            }
            state.end()?;
        }
        state.end()?;
        info!("system: loaded snapshot v{} ({:?})", version, region);
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        self.bus.ppu()
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        self.bus.ppu_mut()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Last rendered picture, 256x240 9-bit pixels
    pub fn frame_buffer(&self) -> &[u16] {
        self.bus.ppu().output()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
