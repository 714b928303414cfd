//! PPU (Picture Processing Unit) implementation
//!
//! The 2C02 renders 256x240 pixels per frame, one dot at a time. The PPU is
//! driven lazily: the bus calls [`Ppu::update`] with a master clock target
//! before every register access and after every CPU step, and the PPU runs
//! its phase machine up to that point.
//!
//! Key timing (NTSC / PAL):
//! - 341 dots per scanline, 262 / 312 scanlines per frame
//! - vblank starts at scanline 241, dot 1
//! - NTSC skips the last pre-render dot on odd frames while rendering

mod oam;
mod render;

use log::{debug, info, warn};

use crate::config::Region;
use crate::error::{Error, Result};
use crate::memory::{Memory, SourceData};
use crate::state::{Loader, Saver, Tag};
use crate::warnings::{Warning, Warnings};

pub use oam::{Oam, SpriteSlot};
pub use render::Phase;

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;
pub const DOTS_PER_LINE: u16 = 341;
pub const PALETTE_SIZE: usize = 32;
pub const OAM_SIZE: usize = 256;
/// Internal nametable RAM (CIRAM)
pub const CIRAM_SIZE: usize = 0x800;

/// Byte left in OAM by a $2004 write during rendering
const OAM_GARBAGE: u8 = 0xFF;

const TAG_REGISTERS: Tag = Tag::new(b"REG\0");
const TAG_PALETTE: Tag = Tag::new(b"PAL\0");
const TAG_OAM: Tag = Tag::new(b"OAM\0");
const TAG_NAMETABLES: Tag = Tag::new(b"NMT\0");
const TAG_PATTERNS: Tag = Tag::new(b"CHR\0");
const TAG_FRAME: Tag = Tag::new(b"FRM\0");

/// $2000 PPUCTRL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PpuCtrl(u8);

impl PpuCtrl {
    pub const NMI_ENABLE: u8 = 0b1000_0000;
    pub const SPRITE_SIZE: u8 = 0b0010_0000;
    pub const BG_PATTERN_TABLE: u8 = 0b0001_0000;
    pub const SPR_PATTERN_TABLE: u8 = 0b0000_1000;
    pub const VRAM_INC: u8 = 0b0000_0100;
    pub const NAMETABLE: u8 = 0b0000_0011;

    pub fn new(val: u8) -> Self {
        Self(val)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn nmi_enable(&self) -> bool {
        self.0 & Self::NMI_ENABLE != 0
    }

    pub fn sprite_height(&self) -> u16 {
        if self.0 & Self::SPRITE_SIZE != 0 {
            16
        } else {
            8
        }
    }

    pub fn bg_table(&self) -> u16 {
        if self.0 & Self::BG_PATTERN_TABLE != 0 {
            0x1000
        } else {
            0x0000
        }
    }

    pub fn sprite_table(&self) -> u16 {
        if self.0 & Self::SPR_PATTERN_TABLE != 0 {
            0x1000
        } else {
            0x0000
        }
    }

    pub fn vram_increment(&self) -> u16 {
        if self.0 & Self::VRAM_INC != 0 {
            32
        } else {
            1
        }
    }
}

/// $2001 PPUMASK
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PpuMask(u8);

impl PpuMask {
    pub const GRAYSCALE: u8 = 0b0000_0001;
    pub const BG_LEFT: u8 = 0b0000_0010;
    pub const SPR_LEFT: u8 = 0b0000_0100;
    pub const RENDER_BG: u8 = 0b0000_1000;
    pub const RENDER_SPR: u8 = 0b0001_0000;
    pub const EMPHASIS: u8 = 0b1110_0000;

    pub fn new(val: u8) -> Self {
        Self(val)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn render_background(&self) -> bool {
        self.0 & Self::RENDER_BG != 0
    }

    pub fn render_sprites(&self) -> bool {
        self.0 & Self::RENDER_SPR != 0
    }

    pub fn rendering(&self) -> bool {
        self.0 & (Self::RENDER_BG | Self::RENDER_SPR) != 0
    }

    pub fn grayscale(&self) -> bool {
        self.0 & Self::GRAYSCALE != 0
    }

    /// Colour mask applied to palette entries
    pub fn colour_mask(&self) -> u8 {
        if self.grayscale() {
            0x30
        } else {
            0x3F
        }
    }

    /// Emphasis bits shifted into place above the 6-bit colour
    pub fn emphasis(&self) -> u16 {
        ((self.0 & Self::EMPHASIS) as u16) << 1
    }
}

/// $2002 PPUSTATUS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PpuStatus(u8);

impl PpuStatus {
    pub const VBLANK: u8 = 0b1000_0000;
    pub const SPRITE_ZERO_HIT: u8 = 0b0100_0000;
    pub const SPRITE_OVERFLOW: u8 = 0b0010_0000;

    pub fn new(val: u8) -> Self {
        Self(val)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn vblank(&self) -> bool {
        self.0 & Self::VBLANK != 0
    }

    pub fn sprite_zero_hit(&self) -> bool {
        self.0 & Self::SPRITE_ZERO_HIT != 0
    }

    pub fn sprite_overflow(&self) -> bool {
        self.0 & Self::SPRITE_OVERFLOW != 0
    }

    fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

/// Nametable layout chosen by the cartridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenA,
    SingleScreenB,
    /// Four independent nametables backed by cartridge VRAM
    FourScreen,
}

/// Background fetch latches and shift registers
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Background {
    nametable: u8,
    attribute: u8,
    low: u8,
    high: u8,
    pattern_low: u16,
    pattern_high: u16,
    attribute_low: u16,
    attribute_high: u16,
}

/// PPU state
#[derive(Debug, Clone)]
pub struct Ppu {
    region: Region,
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,
    /// Current VRAM address (loopy v)
    v: u16,
    /// Temporary VRAM address (loopy t)
    t: u16,
    fine_x: u8,
    /// First/second write toggle shared by $2005 and $2006
    w: bool,
    read_buffer: u8,
    /// Last value driven on the CPU-facing data lines
    io_latch: u8,

    palette: [u8; PALETTE_SIZE],
    oam: Oam,
    chr: Memory,
    nmt: Memory,

    bg: Background,
    output: Vec<u16>,

    phase: Phase,
    scanline: u16,
    dot: u16,
    /// Master clock of the next dot to run
    cycles: u64,
    dot_clock: u64,
    warm_up: bool,
    frame: u64,
    odd_frame: bool,
    suppress_vblank: bool,

    nmi: Option<u64>,
    frame_end: Option<u64>,
    warnings: Warnings,
}

impl Ppu {
    pub fn new(region: Region) -> Result<Self> {
        let mut chr = Memory::new(0x2000, 0x400, 2)?;
        chr.configure(0, SourceData::Alloc(0x2000), true, true)?;
        let mut nmt = Memory::new(0x1000, 0x400, 2)?;
        nmt.configure(0, SourceData::Alloc(CIRAM_SIZE), true, true)?;

        let mut ppu = Self {
            region,
            ctrl: PpuCtrl::default(),
            mask: PpuMask::default(),
            status: PpuStatus::default(),
            oam_addr: 0,
            v: 0,
            t: 0,
            fine_x: 0,
            w: false,
            read_buffer: 0,
            io_latch: 0,
            palette: [0; PALETTE_SIZE],
            oam: Oam::default(),
            chr,
            nmt,
            bg: Background::default(),
            output: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            phase: Phase::PreRender,
            scanline: region.pre_render_line(),
            dot: 0,
            cycles: 0,
            dot_clock: region.ppu_divider(),
            warm_up: true,
            frame: 0,
            odd_frame: false,
            suppress_vblank: false,
            nmi: None,
            frame_end: None,
            warnings: Warnings::new(),
        };
        ppu.set_mirroring(Mirroring::Vertical);
        Ok(ppu)
    }

    /// Enable or disable the power-on warm-up frame
    pub fn set_warm_up(&mut self, enabled: bool) {
        self.warm_up = enabled;
    }

    /// Power cycle (`hard`) or reset button
    ///
    /// Both restart the frame timeline. Only a power cycle clears memory.
    pub fn reset(&mut self, hard: bool) {
        if hard {
            self.status = PpuStatus::default();
            self.oam_addr = 0;
            self.v = 0;
            self.t = 0;
            self.palette = [0; PALETTE_SIZE];
            self.oam = Oam::default();
            self.nmt.clear_ram();
            self.chr.clear_ram();
            self.io_latch = 0;
            self.frame = 0;
            self.warnings.clear();
        }
        self.ctrl = PpuCtrl::default();
        self.mask = PpuMask::default();
        self.fine_x = 0;
        self.w = false;
        self.read_buffer = 0;
        self.odd_frame = false;
        self.suppress_vblank = false;
        self.bg = Background::default();
        self.oam.clear_slots();
        self.output.fill(0);
        self.cycles = 0;
        self.nmi = None;
        self.frame_end = None;

        if self.warm_up {
            self.phase = Phase::WarmUp;
            self.scanline = 0;
        } else {
            self.phase = Phase::PreRender;
            self.scanline = self.region.pre_render_line();
        }
        self.dot = 0;
        info!("ppu: {} reset ({:?})", if hard { "hard" } else { "soft" }, self.phase);
    }

    /// Switch NTSC/PAL timing
    ///
    /// The master clock is rescaled by the CPU divider ratio, the same basis
    /// the CPU uses, so both timelines still agree afterwards.
    pub fn set_region(&mut self, region: Region) {
        if region == self.region {
            return;
        }
        let (old, new) = (self.region.cpu_divider(), region.cpu_divider());
        let rescale = |clock: u64| clock * new / old;
        self.cycles = rescale(self.cycles);
        self.nmi = self.nmi.map(rescale);
        self.frame_end = self.frame_end.map(rescale);
        self.dot_clock = region.ppu_divider();
        self.region = region;
        if self.scanline > region.pre_render_line() {
            self.phase = Phase::PreRender;
            self.scanline = region.pre_render_line();
            self.dot = 0;
        }
    }

    /// Run every dot scheduled before master clock `target`
    pub fn update(&mut self, target: u64) {
        while self.cycles < target {
            render::PHASES[self.phase as usize](self, target);
        }
    }

    /// NMI edge raised since the last call, with its master clock
    pub fn take_nmi(&mut self) -> Option<u64> {
        self.nmi.take()
    }

    /// Master clock at which the last frame ended, if one ended
    pub fn take_frame_end(&mut self) -> Option<u64> {
        self.frame_end.take()
    }

    /// Rebase the clock after the system closed a frame of `frame` clocks
    pub fn end_frame(&mut self, frame: u64) {
        self.cycles = self.cycles.saturating_sub(frame);
        if let Some(nmi) = self.nmi.as_mut() {
            *nmi = nmi.saturating_sub(frame);
        }
    }

    /// True while the fetch pipeline is live and OAM/VRAM are busy
    fn rendering_active(&self) -> bool {
        self.mask.rendering()
            && (self.scanline < SCREEN_HEIGHT as u16 || self.scanline == self.region.pre_render_line())
            && self.phase != Phase::WarmUp
    }

    /// CPU read of $2000-$2007 (already decoded modulo 8)
    pub fn read_register(&mut self, address: u16) -> u8 {
        match address & 7 {
            2 => {
                let value = (self.status.bits() & 0xE0) | (self.io_latch & 0x1F);
                self.status.set(PpuStatus::VBLANK, false);
                self.w = false;
                if self.phase == Phase::VBlankIn && self.dot == 1 {
                    // read lands on the dot the flag rises: flag and NMI are lost
                    self.suppress_vblank = true;
                }
                self.io_latch = value;
            }
            4 => {
                let mut value = self.oam.ram[self.oam_addr as usize];
                if self.oam_addr & 3 == 2 {
                    value &= 0xE3;
                }
                if self.rendering_active() && (1..=64).contains(&self.dot) && self.scanline < SCREEN_HEIGHT as u16 {
                    value = 0xFF;
                }
                self.io_latch = value;
            }
            7 => {
                let address = self.v & 0x3FFF;
                let value = if address >= 0x3F00 {
                    self.read_buffer = self.nmt.read(address & 0x0FFF);
                    (self.palette[palette_index(address)] & self.mask.colour_mask()) | (self.io_latch & 0xC0)
                } else {
                    let value = self.read_buffer;
                    self.read_buffer = self.vram_read(address);
                    value
                };
                self.advance_vram_address();
                self.io_latch = value;
            }
            _ => {
                if self.warnings.first(Warning::WriteOnlyRegisterRead) {
                    debug!("ppu: read of write-only register ${:04X} returns the io latch", address);
                }
            }
        }
        self.io_latch
    }

    /// CPU write of $2000-$2007
    pub fn write_register(&mut self, address: u16, value: u8) {
        self.io_latch = value;
        let reg = address & 7;
        if self.phase == Phase::WarmUp && matches!(reg, 0 | 1 | 5 | 6) {
            return;
        }
        match reg {
            0 => {
                let was_enabled = self.ctrl.nmi_enable();
                self.ctrl = PpuCtrl::new(value);
                self.t = (self.t & !0x0C00) | ((value as u16 & 0x03) << 10);
                if !was_enabled && self.ctrl.nmi_enable() && self.status.vblank() {
                    self.nmi = Some(self.cycles);
                }
            }
            1 => self.mask = PpuMask::new(value),
            3 => self.oam_addr = value,
            4 => {
                if self.rendering_active() {
                    if self.warnings.first(Warning::OamWriteWhileRendering) {
                        warn!(
                            "ppu: OAM write during rendering at line {} dot {}",
                            self.scanline, self.dot
                        );
                    }
                    self.oam.ram[self.oam_addr as usize] = OAM_GARBAGE;
                    self.oam_addr = self.oam_addr.wrapping_add(4);
                } else {
                    self.oam.ram[self.oam_addr as usize] = value;
                    self.oam_addr = self.oam_addr.wrapping_add(1);
                }
            }
            5 => {
                if !self.w {
                    self.t = (self.t & !0x001F) | (value as u16 >> 3);
                    self.fine_x = value & 0x07;
                } else {
                    self.t = (self.t & !0x73E0) | ((value as u16 & 0x07) << 12) | ((value as u16 & 0xF8) << 2);
                }
                self.w = !self.w;
            }
            6 => {
                if !self.w {
                    self.t = (self.t & 0x00FF) | ((value as u16 & 0x3F) << 8);
                } else {
                    self.t = (self.t & 0xFF00) | value as u16;
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            7 => {
                let address = self.v & 0x3FFF;
                self.vram_write(address, value);
                self.advance_vram_address();
            }
            _ => {}
        }
    }

    /// $2007 access: a plain increment, or the coarse X / Y glitch mid-render
    fn advance_vram_address(&mut self) {
        if self.rendering_active() {
            self.increment_x();
            self.increment_y();
        } else {
            self.v = (self.v + self.ctrl.vram_increment()) & 0x7FFF;
        }
    }

    /// PPU bus read, $0000-$3FFF
    pub fn vram_read(&self, address: u16) -> u8 {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => self.chr.read(address),
            0x2000..=0x3EFF => self.nmt.read(address & 0x0FFF),
            _ => self.palette[palette_index(address)],
        }
    }

    pub fn vram_write(&mut self, address: u16, value: u8) {
        let address = address & 0x3FFF;
        match address {
            0x0000..=0x1FFF => self.chr.write(address, value),
            0x2000..=0x3EFF => self.nmt.write(address & 0x0FFF, value),
            _ => self.palette[palette_index(address)] = value & 0x3F,
        }
    }

    /// Apply a nametable layout through the nametable bank API
    pub fn set_mirroring(&mut self, mirroring: Mirroring) {
        let banks: [usize; 4] = match mirroring {
            Mirroring::Horizontal => [0, 0, 1, 1],
            Mirroring::Vertical => [0, 1, 0, 1],
            Mirroring::SingleScreenA => [0, 0, 0, 0],
            Mirroring::SingleScreenB => [1, 1, 1, 1],
            Mirroring::FourScreen => {
                if self.nmt.source(1).is_empty() {
                    if let Err(e) = self.nmt.configure(1, SourceData::Alloc(0x1000), true, true) {
                        warn!("ppu: four-screen VRAM unavailable: {}", e);
                        return;
                    }
                }
                self.nmt.swap_source_bank(1, 0x0000, 0x1000, 0);
                return;
            }
        };
        for (i, &bank) in banks.iter().enumerate() {
            self.nmt.swap_source_bank(0, (i * 0x400) as u16, 0x400, bank);
        }
    }

    /// Pattern table bus, exposed to cartridge boards
    pub fn chr(&self) -> &Memory {
        &self.chr
    }

    pub fn chr_mut(&mut self) -> &mut Memory {
        &mut self.chr
    }

    /// Nametable bus, exposed to cartridge boards
    pub fn nametables(&self) -> &Memory {
        &self.nmt
    }

    pub fn nametables_mut(&mut self) -> &mut Memory {
        &mut self.nmt
    }

    pub fn palette(&self) -> &[u8; PALETTE_SIZE] {
        &self.palette
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam.ram
    }

    pub fn oam_mut(&mut self) -> &mut [u8; OAM_SIZE] {
        &mut self.oam.ram
    }

    /// Finished pixels: 6-bit colour plus emphasis in bits 6-8
    pub fn output(&self) -> &[u16] {
        &self.output
    }

    pub fn pixel(&self, x: usize, y: usize) -> u16 {
        self.output[y * SCREEN_WIDTH + x]
    }

    pub fn ctrl(&self) -> PpuCtrl {
        self.ctrl
    }

    pub fn mask(&self) -> PpuMask {
        self.mask
    }

    pub fn status(&self) -> PpuStatus {
        self.status
    }

    pub fn vram_address(&self) -> u16 {
        self.v
    }

    pub fn temp_address(&self) -> u16 {
        self.t
    }

    pub fn fine_x(&self) -> u8 {
        self.fine_x
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_odd_frame(&self) -> bool {
        self.odd_frame
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Write the `PPU\0` chunk
    pub fn save(&self, state: &mut Saver, tag: Tag) {
        state.begin(tag);
        state
            .begin(TAG_REGISTERS)
            .write_u8(self.ctrl.bits())
            .write_u8(self.mask.bits())
            .write_u8(self.status.bits())
            .write_u8(self.oam_addr)
            .write_u16(self.v)
            .write_u16(self.t)
            .write_u8(self.fine_x)
            .write_u8(self.w as u8)
            .write_u8(self.read_buffer)
            .write_u8(self.io_latch)
            .end();
        state.begin(TAG_PALETTE).compress(&self.palette).end();
        state.begin(TAG_OAM).compress(&self.oam.ram).end();
        self.nmt.save(state, TAG_NAMETABLES);
        self.chr.save(state, TAG_PATTERNS);
        if self.region.skips_odd_dot() {
            state.begin(TAG_FRAME).write_u8(self.odd_frame as u8).end();
        }
        state.end();
    }

    /// Restore from an entered `PPU\0` chunk
    ///
    /// The snapshot does not carry the dot position. The timeline restarts at
    /// the pre-render line with the vblank flag set.
    pub fn load(&mut self, state: &mut Loader<'_>) -> Result<()> {
        while let Some(tag) = state.begin()? {
            match tag {
                TAG_REGISTERS => {
                    self.ctrl = PpuCtrl::new(state.read_u8()?);
                    self.mask = PpuMask::new(state.read_u8()?);
                    self.status = PpuStatus::new(state.read_u8()? & 0xE0);
                    self.oam_addr = state.read_u8()?;
                    self.v = state.read_u16()? & 0x7FFF;
                    self.t = state.read_u16()? & 0x7FFF;
                    self.fine_x = state.read_u8()? & 0x07;
                    self.w = state.read_u8()? != 0;
                    self.read_buffer = state.read_u8()?;
                    self.io_latch = state.read_u8()?;
                }
                TAG_PALETTE => state.uncompress(&mut self.palette)?,
                TAG_OAM => state.uncompress(&mut self.oam.ram)?,
                TAG_NAMETABLES => self.nmt.load(state)?,
                TAG_PATTERNS => self.chr.load(state)?,
                TAG_FRAME => {
                    let odd = state.read_u8()?;
                    if odd > 1 {
                        return Err(Error::CorruptFile("bad frame toggle"));
                    }
                    self.odd_frame = odd != 0 && self.region.skips_odd_dot();
                }
                _ => {}
            }
            state.end()?;
        }

        self.phase = Phase::PreRender;
        self.scanline = self.region.pre_render_line();
        self.dot = 0;
        self.cycles = 0;
        self.status.set(PpuStatus::VBLANK, true);
        self.suppress_vblank = false;
        self.bg = Background::default();
        self.oam.clear_slots();
        self.nmi = None;
        self.frame_end = None;
        Ok(())
    }
}

/// Palette RAM index with $3F10/$3F14/$3F18/$3F1C folded onto the backdrop entries
pub fn palette_index(address: u16) -> usize {
    let index = address as usize & 0x1F;
    if index & 0x13 == 0x10 {
        index & 0x0F
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    fn ppu() -> Ppu {
        let mut ppu = Ppu::new(Region::Ntsc).unwrap();
        ppu.set_warm_up(false);
        ppu.reset(true);
        ppu
    }

    #[test]
    fn test_scroll_and_address_latches() {
        let mut ppu = ppu();
        ppu.write_register(0x2000, 0x03);
        ppu.write_register(0x2005, 0x7D);
        assert_eq!(ppu.fine_x(), 5);
        ppu.write_register(0x2005, 0x5E);
        assert_eq!(ppu.temp_address(), 0x6D6F);
        ppu.write_register(0x2006, 0x3D);
        ppu.write_register(0x2006, 0xF0);
        assert_eq!(ppu.vram_address(), 0x3DF0);
    }

    #[test]
    fn test_status_read_clears_vblank_and_toggle() {
        let mut ppu = ppu();
        ppu.status.set(PpuStatus::VBLANK, true);
        ppu.write_register(0x2006, 0x21);
        ppu.io_latch = 0x1F;
        assert_eq!(ppu.read_register(0x2002), 0x9F);
        assert!(!ppu.status().vblank());
        assert!(!ppu.w);
    }

    #[test]
    fn test_buffered_data_reads() {
        let mut ppu = ppu();
        ppu.vram_write(0x2400, 0x42);
        ppu.write_register(0x2006, 0x24);
        ppu.write_register(0x2006, 0x00);
        ppu.read_register(0x2007);
        assert_eq!(ppu.read_register(0x2007), 0x42);
    }

    #[test]
    fn test_palette_reads_are_immediate() {
        let mut ppu = ppu();
        ppu.vram_write(0x3F01, 0x2A);
        ppu.write_register(0x2006, 0x3F);
        ppu.write_register(0x2006, 0x01);
        assert_eq!(ppu.read_register(0x2007) & 0x3F, 0x2A);
    }

    #[test]
    fn test_oam_attribute_read_mask() {
        let mut ppu = ppu();
        ppu.write_register(0x2003, 0x02);
        ppu.write_register(0x2004, 0xFF);
        ppu.write_register(0x2003, 0x02);
        assert_eq!(ppu.read_register(0x2004), 0xE3);
    }

    #[test]
    fn test_write_only_register_reads_latch() {
        let mut ppu = ppu();
        ppu.write_register(0x2000, 0x5A);
        assert_eq!(ppu.read_register(0x2005), 0x5A);
    }

    #[test]
    fn test_enabling_nmi_during_vblank() {
        let mut ppu = ppu();
        ppu.status.set(PpuStatus::VBLANK, true);
        ppu.write_register(0x2000, 0x80);
        assert!(ppu.take_nmi().is_some());
    }

    #[test]
    fn test_mirroring_layouts() {
        let mut ppu = ppu();
        ppu.set_mirroring(Mirroring::Horizontal);
        ppu.vram_write(0x2000, 1);
        assert_eq!(ppu.vram_read(0x2400), 1);
        assert_ne!(ppu.vram_read(0x2800), 1);

        ppu.set_mirroring(Mirroring::Vertical);
        ppu.vram_write(0x2000, 2);
        assert_eq!(ppu.vram_read(0x2800), 2);
        assert_eq!(ppu.vram_read(0x3000), 2);

        ppu.set_mirroring(Mirroring::FourScreen);
        ppu.vram_write(0x2C00, 9);
        assert_eq!(ppu.vram_read(0x2C00), 9);
        assert_ne!(ppu.vram_read(0x2400), 9);
    }

    #[test]
    fn test_warm_up_ignores_ctrl() {
        let mut ppu = Ppu::new(Region::Ntsc).unwrap();
        ppu.reset(true);
        assert_eq!(ppu.phase(), Phase::WarmUp);
        ppu.write_register(0x2000, 0x80);
        assert!(!ppu.ctrl().nmi_enable());
        ppu.write_register(0x2003, 0x10);
        assert_eq!(ppu.oam_addr, 0x10);
    }

    quickcheck! {
        fn prop_palette_mirrors(address: u16) -> bool {
            let index = palette_index(0x3F00 | (address & 0xFF));
            index < 32 && (index & 0x13) != 0x10
        }
    }
}
