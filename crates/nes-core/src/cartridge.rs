//! Cartridge images and the fixed board
//!
//! This module parses iNES 1.0 images and provides the simplest board, one
//! with no bank switching. It is what the runner and the tests plug in; the
//! per-mapper banking policies of real boards live outside the core.

use log::info;

use crate::bus::{Bus, Device, DeviceId};
use crate::error::{Error, Result};
use crate::memory::{Memory, SourceData};
use crate::ppu::Mirroring;
use crate::state::{Loader, Saver, Tag};

/// iNES header size
pub const HEADER_SIZE: usize = 16;
/// Optional trainer between header and PRG ROM
pub const TRAINER_SIZE: usize = 512;
pub const PRG_BANK_SIZE: usize = 0x4000;
pub const CHR_BANK_SIZE: usize = 0x2000;
/// PRG RAM at $6000-$7FFF
pub const WRAM_SIZE: usize = 0x2000;

const MAGIC: [u8; 4] = *b"NES\x1A";
const TAG_PRG: Tag = Tag::new(b"PRG\0");
const TAG_WRAM: Tag = Tag::new(b"WRM\0");

/// iNES header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InesHeader {
    /// PRG ROM size in 16KB units
    pub prg_banks: u8,
    /// CHR ROM size in 8KB units; 0 means the board carries CHR RAM
    pub chr_banks: u8,
    pub flags_6: u8,
    pub flags_7: u8,
}

impl InesHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::InvalidFile("iNES header too short"));
        }
        if bytes[..4] != MAGIC {
            return Err(Error::InvalidFile("missing iNES magic"));
        }
        Ok(Self {
            prg_banks: bytes[4],
            chr_banks: bytes[5],
            flags_6: bytes[6],
            flags_7: bytes[7],
        })
    }

    pub fn mapper_number(&self) -> u8 {
        (self.flags_6 >> 4) | (self.flags_7 & 0xF0)
    }

    pub fn has_trainer(&self) -> bool {
        self.flags_6 & 0x04 != 0
    }

    /// PRG RAM is battery backed and survives a power cycle
    pub fn has_battery(&self) -> bool {
        self.flags_6 & 0x02 != 0
    }

    pub fn mirroring(&self) -> Mirroring {
        if self.flags_6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if self.flags_6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    pub fn prg_rom_size(&self) -> usize {
        self.prg_banks as usize * PRG_BANK_SIZE
    }

    pub fn chr_rom_size(&self) -> usize {
        self.chr_banks as usize * CHR_BANK_SIZE
    }
}

/// A parsed cartridge image
#[derive(Debug, Clone)]
pub struct Cartridge {
    header: InesHeader,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
}

impl Cartridge {
    /// Parse an iNES image
    pub fn from_rom(rom: &[u8]) -> Result<Self> {
        let header = InesHeader::parse(rom)?;
        if header.prg_banks == 0 {
            return Err(Error::CorruptFile("iNES image declares no PRG ROM"));
        }

        let mut offset = HEADER_SIZE;
        if header.has_trainer() {
            offset += TRAINER_SIZE;
        }
        let prg_end = offset + header.prg_rom_size();
        let chr_end = prg_end + header.chr_rom_size();
        if rom.len() < chr_end {
            return Err(Error::CorruptFile("iNES image shorter than its declared ROM sizes"));
        }

        Ok(Self {
            header,
            prg_rom: rom[offset..prg_end].to_vec(),
            chr_rom: rom[prg_end..chr_end].to_vec(),
        })
    }

    pub fn header(&self) -> &InesHeader {
        &self.header
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    pub fn mapper_number(&self) -> u8 {
        self.header.mapper_number()
    }

    /// Wire the cartridge into the machine
    ///
    /// CHR ROM (or 8KB of CHR RAM) goes to the PPU pattern bus, the header
    /// mirroring is applied, and the board answers at $6000-$FFFF.
    pub fn insert(self, bus: &mut Bus) -> Result<DeviceId> {
        let Cartridge {
            header,
            prg_rom,
            chr_rom,
        } = self;

        let ppu = bus.ppu_mut();
        let chr = ppu.chr_mut();
        if chr_rom.is_empty() {
            chr.configure(0, SourceData::Alloc(CHR_BANK_SIZE), true, true)?;
        } else {
            chr.configure(0, SourceData::Attach(chr_rom), true, false)?;
        }
        chr.swap_source_bank(0, 0x0000, CHR_BANK_SIZE, 0);
        ppu.set_mirroring(header.mirroring());

        let board = FixedBoard::new(header, prg_rom)?;
        let id = bus.install(Box::new(board))?;
        bus.map(0x6000, 0xFFFF, id);
        info!(
            "cartridge: mapper {}, {}KB PRG, {}KB CHR{}",
            header.mapper_number(),
            header.prg_rom_size() / 1024,
            header.chr_rom_size() / 1024,
            if header.chr_banks == 0 { " RAM" } else { "" }
        );
        Ok(id)
    }
}

/// Board with PRG ROM fixed at $8000 and 8KB of PRG RAM at $6000
#[derive(Debug, Clone)]
pub struct FixedBoard {
    prg: Memory,
    wram: Memory,
    battery: bool,
}

impl FixedBoard {
    pub fn new(header: InesHeader, prg_rom: Vec<u8>) -> Result<Self> {
        let mut prg = Memory::new(0x8000, 0x2000, 1)?;
        prg.configure(0, SourceData::Attach(prg_rom), true, false)?;
        // a 16KB image repeats at $C000
        prg.swap_bank(0x0000, 0x8000, 0);

        let mut wram = Memory::new(WRAM_SIZE, WRAM_SIZE, 1)?;
        wram.configure(0, SourceData::Alloc(WRAM_SIZE), true, true)?;

        Ok(Self {
            prg,
            wram,
            battery: header.has_battery(),
        })
    }

    pub fn prg(&self) -> &Memory {
        &self.prg
    }

    pub fn wram(&self) -> &Memory {
        &self.wram
    }
}

impl Device for FixedBoard {
    fn name(&self) -> &str {
        "cartridge"
    }

    fn read(&mut self, address: u16, _cycle: u64) -> Option<u8> {
        match address {
            0x8000..=0xFFFF => Some(self.prg.read(address)),
            0x6000..=0x7FFF => Some(self.wram.read(address)),
            _ => None,
        }
    }

    fn write(&mut self, address: u16, value: u8, _cycle: u64) {
        if let 0x6000..=0x7FFF = address {
            self.wram.write(address, value);
        }
    }

    fn reset(&mut self, hard: bool) {
        if hard && !self.battery {
            self.wram.clear_ram();
        }
    }

    fn save(&self, state: &mut Saver) {
        self.prg.save(state, TAG_PRG);
        self.wram.save(state, TAG_WRAM);
    }

    fn load(&mut self, state: &mut Loader<'_>) -> Result<()> {
        while let Some(tag) = state.begin()? {
            match tag {
                TAG_PRG => self.prg.load(state)?,
                TAG_WRAM => self.wram.load(state)?,
                _ => {}
            }
            state.end()?;
        }
        Ok(())
    }
}
