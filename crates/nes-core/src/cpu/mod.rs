//! CPU module - 2A03 (6502 variant) implementation
//!
//! The NES uses a 6502 core without decimal mode. Every bus access costs one
//! CPU cycle, counted in master clocks so the PPU can be caught up to the exact
//! moment of a register access.

mod instructions;
pub mod interrupt;
pub mod table;

use std::fmt;

use log::{info, warn};

use crate::config::Region;
use crate::error::{Error, Result};
use crate::memory::{Memory, SourceData};
use crate::state::{Loader, Saver, Tag};
use crate::warnings::{Warning, Warnings};

pub use interrupt::{Interrupt, IrqLine, NEVER};
pub use table::{decode, AddressingMode, InstructionInfo, Opcode};

/// Internal work RAM size, mirrored four times over $0000-$1FFF
pub const RAM_SIZE: usize = 0x800;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

const TAG_REGISTERS: Tag = Tag::new(b"REG\0");
const TAG_RAM: Tag = Tag::new(b"RAM\0");
const TAG_INTERRUPTS: Tag = Tag::new(b"INT\0");

/// Everything outside the CPU that it talks to
///
/// Addresses below $2000 never reach the bus; the CPU decodes its own RAM.
pub trait Bus {
    /// Read at master clock `cycle`. `None` means nothing drives the data
    /// bus and the CPU sees its last transferred byte.
    fn read(&mut self, address: u16, cycle: u64) -> Option<u8>;
    /// Write at master clock `cycle`
    fn write(&mut self, address: u16, value: u8, cycle: u64);
    /// Bring every other component up to `cycle` and collect their interrupts
    ///
    /// Called once per step; this is where per-step hooks run.
    fn sync(&mut self, cycle: u64, interrupt: &mut Interrupt);
    /// Catch the video side up to `cycle` inside an instruction, without
    /// running per-step hooks
    fn catch_up(&mut self, _cycle: u64, _interrupt: &mut Interrupt) {}
    /// Pending OAM DMA page, taken once
    fn take_dma(&mut self) -> Option<u8> {
        None
    }
}

/// 2A03 CPU registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegisters {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
}

impl Default for CpuRegisters {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
        }
    }
}

/// Packed processor status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const CARRY: u8 = 0b0000_0001;
    pub const ZERO: u8 = 0b0000_0010;
    pub const INTERRUPT: u8 = 0b0000_0100;
    pub const DECIMAL: u8 = 0b0000_1000;
    pub const BREAK: u8 = 0b0001_0000;
    pub const UNUSED: u8 = 0b0010_0000;
    pub const OVERFLOW: u8 = 0b0100_0000;
    pub const NEGATIVE: u8 = 0b1000_0000;

    /// Build from a pushed byte; B and the unused bit do not exist in the register
    pub fn new(value: u8) -> Self {
        Self(value & !(Self::BREAK | Self::UNUSED))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Byte pushed on the stack, with or without the B flag
    pub fn pushed(&self, brk: bool) -> u8 {
        self.0 | Self::UNUSED | if brk { Self::BREAK } else { 0 }
    }

    #[inline]
    fn get(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub fn carry(&self) -> bool {
        self.get(Self::CARRY)
    }

    pub fn zero(&self) -> bool {
        self.get(Self::ZERO)
    }

    pub fn interrupt(&self) -> bool {
        self.get(Self::INTERRUPT)
    }

    pub fn decimal(&self) -> bool {
        self.get(Self::DECIMAL)
    }

    pub fn overflow(&self) -> bool {
        self.get(Self::OVERFLOW)
    }

    pub fn negative(&self) -> bool {
        self.get(Self::NEGATIVE)
    }

    pub fn set_carry(&mut self, on: bool) {
        self.set(Self::CARRY, on)
    }

    pub fn set_zero(&mut self, on: bool) {
        self.set(Self::ZERO, on)
    }

    pub fn set_interrupt(&mut self, on: bool) {
        self.set(Self::INTERRUPT, on)
    }

    pub fn set_decimal(&mut self, on: bool) {
        self.set(Self::DECIMAL, on)
    }

    pub fn set_overflow(&mut self, on: bool) {
        self.set(Self::OVERFLOW, on)
    }

    pub fn set_negative(&mut self, on: bool) {
        self.set(Self::NEGATIVE, on)
    }

    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.set(Self::ZERO, value == 0);
        self.set(Self::NEGATIVE, value & 0x80 != 0);
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self(Self::INTERRUPT)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u8, char); 6] = [
            (StatusFlags::NEGATIVE, 'N'),
            (StatusFlags::OVERFLOW, 'V'),
            (StatusFlags::DECIMAL, 'D'),
            (StatusFlags::INTERRUPT, 'I'),
            (StatusFlags::ZERO, 'Z'),
            (StatusFlags::CARRY, 'C'),
        ];
        for (bit, name) in NAMES {
            let c = if self.get(bit) { name } else { name.to_ascii_lowercase() };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// The 2A03 CPU
#[derive(Debug, Clone)]
pub struct Cpu {
    registers: CpuRegisters,
    status: StatusFlags,
    ram: Memory,
    interrupt: Interrupt,
    /// Master clock of the next bus access
    cycles: u64,
    /// `clock[n]` is the length of `n + 1` CPU cycles in master clocks
    clock: [u64; 8],
    region: Region,
    /// Interrupt-disable value the next IRQ poll observes
    i_poll: bool,
    /// Last byte transferred on the data bus
    data_bus: u8,
    warnings: Warnings,
}

impl Cpu {
    pub fn new(region: Region) -> Result<Self> {
        let mut ram = Memory::new(0x2000, RAM_SIZE, 1)?;
        ram.configure(0, SourceData::Alloc(RAM_SIZE), true, true)?;
        Ok(Self {
            registers: CpuRegisters::default(),
            status: StatusFlags::default(),
            ram,
            interrupt: Interrupt::new(region.cpu_divider()),
            cycles: 0,
            clock: clock_table(region),
            region,
            i_poll: true,
            data_bus: 0,
            warnings: Warnings::new(),
        })
    }

    /// Run the reset sequence
    ///
    /// A hard reset is a power cycle: registers and RAM are cleared and the
    /// cycle counter restarts. A soft reset only drops SP by three and sets I.
    pub fn reset<B: Bus>(&mut self, bus: &mut B, hard: bool) {
        if hard {
            self.registers = CpuRegisters::default();
            self.status = StatusFlags::default();
            self.ram.clear_ram();
            self.cycles = 0;
            self.data_bus = 0;
            self.warnings.clear();
        } else {
            self.registers.sp = self.registers.sp.wrapping_sub(3);
            self.status.set_interrupt(true);
        }
        self.interrupt.reset();
        self.i_poll = true;

        // five internal cycles, then the vector fetch
        self.cycles += self.clock[4];
        self.registers.pc = self.read_word(bus, RESET_VECTOR);
        info!(
            "cpu: {} reset, pc=${:04X}",
            if hard { "hard" } else { "soft" },
            self.registers.pc
        );
    }

    /// Execute one instruction, or service one pending interrupt
    ///
    /// Afterwards the bus is synchronized to the new cycle count so the PPU and
    /// registered hooks observe the same clock.
    pub fn step<B: Bus>(&mut self, bus: &mut B) {
        if !self.interrupt.jammed && self.interrupt.nmi_due(self.cycles) {
            self.interrupt.nmi_clock = NEVER;
            self.interrupt_sequence(bus, NMI_VECTOR, false);
        } else if !self.interrupt.jammed && !self.i_poll && self.interrupt.irq_due(self.cycles) {
            self.interrupt_sequence(bus, IRQ_VECTOR, false);
        } else {
            let byte = self.fetch(bus);
            let info = decode(byte);
            let i_before = self.status.interrupt();
            self.execute(bus, info);
            self.i_poll = match info.opcode {
                Opcode::CLI | Opcode::SEI | Opcode::PLP => i_before,
                _ => self.status.interrupt(),
            };
        }

        if let Some(page) = bus.take_dma() {
            self.oam_dma(bus, page);
        }
        bus.sync(self.cycles, &mut self.interrupt);
    }

    /// Push PC and P, then jump through `vector`
    ///
    /// An NMI that comes due while the return address is being pushed steals
    /// the vector, for BRK as well as IRQ.
    fn interrupt_sequence<B: Bus>(&mut self, bus: &mut B, mut vector: u16, brk: bool) {
        if brk {
            self.fetch(bus);
        } else {
            let pc = self.registers.pc;
            self.read(bus, pc);
            self.read(bus, pc);
        }
        let pc = self.registers.pc;
        self.push(bus, (pc >> 8) as u8);
        self.push(bus, pc as u8);

        bus.catch_up(self.cycles, &mut self.interrupt);
        if vector != NMI_VECTOR && self.interrupt.nmi_due(self.cycles) {
            self.interrupt.nmi_clock = NEVER;
            vector = NMI_VECTOR;
        }

        let pushed = self.status.pushed(brk);
        self.push(bus, pushed);
        self.status.set_interrupt(true);
        self.i_poll = true;
        self.registers.pc = self.read_word(bus, vector);
    }

    /// Halt on a KIL opcode: PC stays on the opcode and interrupts are ignored
    fn jam<B: Bus>(&mut self, bus: &mut B) {
        self.registers.pc = self.registers.pc.wrapping_sub(1);
        self.read(bus, 0xFFFF);
        if !self.interrupt.jammed {
            self.interrupt.jammed = true;
            self.interrupt.nmi_clock = NEVER;
            self.interrupt.irq_clock = NEVER;
        }
        if self.warnings.first(Warning::CpuJam) {
            warn!("cpu: jammed at ${:04X}", self.registers.pc);
        }
    }

    /// Copy a page into OAM through $2004, stalling the CPU for 513 or 514 cycles
    fn oam_dma<B: Bus>(&mut self, bus: &mut B, page: u8) {
        self.cycles += self.clock[0];
        if (self.cycles / self.clock[0]) & 1 == 1 {
            self.cycles += self.clock[0];
        }
        let base = (page as u16) << 8;
        for i in 0..256u16 {
            let value = self.read(bus, base | i);
            self.write(bus, 0x2004, value);
        }
    }

    #[inline]
    pub(crate) fn read<B: Bus>(&mut self, bus: &mut B, address: u16) -> u8 {
        let value = if address < 0x2000 {
            Some(self.ram.read(address))
        } else {
            bus.read(address, self.cycles)
        };
        self.cycles += self.clock[0];
        self.data_bus = value.unwrap_or(self.data_bus);
        self.data_bus
    }

    #[inline]
    pub(crate) fn write<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        if address < 0x2000 {
            self.ram.write(address, value);
        } else {
            bus.write(address, value, self.cycles);
        }
        self.cycles += self.clock[0];
        self.data_bus = value;
    }

    fn read_word<B: Bus>(&mut self, bus: &mut B, address: u16) -> u16 {
        let lo = self.read(bus, address) as u16;
        let hi = self.read(bus, address.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    #[inline]
    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let pc = self.registers.pc;
        self.registers.pc = pc.wrapping_add(1);
        self.read(bus, pc)
    }

    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        let address = 0x0100 | self.registers.sp as u16;
        self.write(bus, address, value);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
    }

    pub(crate) fn pull<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.registers.sp = self.registers.sp.wrapping_add(1);
        let address = 0x0100 | self.registers.sp as u16;
        self.read(bus, address)
    }

    pub fn registers(&self) -> &CpuRegisters {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut CpuRegisters {
        &mut self.registers
    }

    pub fn status(&self) -> &StatusFlags {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusFlags {
        &mut self.status
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn interrupt_mut(&mut self) -> &mut Interrupt {
        &mut self.interrupt
    }

    pub fn is_jammed(&self) -> bool {
        self.interrupt.jammed
    }

    /// Master clock of the next bus access
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycle count in CPU cycles
    pub fn elapsed_cycles(&self) -> u64 {
        self.cycles / self.clock[0]
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Switch NTSC/PAL timing, rescaling the counter and pending deadlines
    pub fn set_region(&mut self, region: Region) {
        if region == self.region {
            return;
        }
        let (old, new) = (self.region.cpu_divider(), region.cpu_divider());
        let rescale = |clock: u64| if clock == NEVER { NEVER } else { clock / old * new };
        self.cycles = rescale(self.cycles);
        self.interrupt.nmi_clock = rescale(self.interrupt.nmi_clock);
        self.interrupt.irq_clock = rescale(self.interrupt.irq_clock);
        self.interrupt.latency = new;
        self.clock = clock_table(region);
        self.region = region;
    }

    /// Internal RAM as seen on the bus, mirrors folded
    pub fn ram(&self) -> &[u8] {
        self.ram.source(0)
    }

    pub fn peek_ram(&self, address: u16) -> u8 {
        self.ram.read(address)
    }

    pub fn poke_ram(&mut self, address: u16, value: u8) {
        self.ram.write(address, value)
    }

    /// Rebase every clock by the length of the finished frame
    pub fn end_frame(&mut self, frame: u64) {
        self.cycles = self.cycles.saturating_sub(frame);
        self.interrupt.rebase(frame);
    }

    /// Write the `CPU\0` chunk
    ///
    /// Deadlines are stored as CPU-cycle distances from the current cycle, so
    /// they survive a change of region and of frame position.
    pub fn save(&self, state: &mut Saver, tag: Tag) {
        let r = &self.registers;
        state.begin(tag);
        state
            .begin(TAG_REGISTERS)
            .write_u16(r.pc)
            .write_u8(r.a)
            .write_u8(r.x)
            .write_u8(r.y)
            .write_u8(r.sp)
            .write_u8(self.status.bits())
            .write_u8(self.i_poll as u8)
            .write_u8(self.data_bus)
            .end();

        self.ram.save(state, TAG_RAM);

        let divider = self.clock[0];
        let distance = |clock: u64| {
            if clock == NEVER {
                u32::MAX
            } else {
                (clock.saturating_sub(self.cycles) / divider) as u32
            }
        };
        state
            .begin(TAG_INTERRUPTS)
            .write_u8(self.interrupt.irq_lines)
            .write_u8(self.interrupt.jammed as u8)
            .write_u32(distance(self.interrupt.nmi_clock))
            .write_u32(distance(self.interrupt.irq_clock))
            .end();
        state.end();
    }

    /// Restore from an entered `CPU\0` chunk; the cycle counter restarts at zero
    pub fn load(&mut self, state: &mut Loader<'_>) -> Result<()> {
        self.cycles = 0;
        while let Some(tag) = state.begin()? {
            match tag {
                TAG_REGISTERS => {
                    self.registers.pc = state.read_u16()?;
                    self.registers.a = state.read_u8()?;
                    self.registers.x = state.read_u8()?;
                    self.registers.y = state.read_u8()?;
                    self.registers.sp = state.read_u8()?;
                    self.status = StatusFlags::new(state.read_u8()?);
                    self.i_poll = state.read_u8()? != 0;
                    self.data_bus = state.read_u8()?;
                }
                TAG_RAM => self.ram.load(state)?,
                TAG_INTERRUPTS => {
                    let lines = state.read_u8()?;
                    let jammed = state.read_u8()?;
                    if jammed > 1 {
                        return Err(Error::CorruptFile("bad jam flag"));
                    }
                    let divider = self.clock[0];
                    let deadline = |distance: u32| {
                        if distance == u32::MAX {
                            NEVER
                        } else {
                            distance as u64 * divider
                        }
                    };
                    self.interrupt.irq_lines = lines;
                    self.interrupt.jammed = jammed != 0;
                    self.interrupt.nmi_clock = deadline(state.read_u32()?);
                    self.interrupt.irq_clock = deadline(state.read_u32()?);
                }
                _ => {}
            }
            state.end()?;
        }
        Ok(())
    }
}

fn clock_table(region: Region) -> [u64; 8] {
    let divider = region.cpu_divider();
    let mut table = [0; 8];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (i as u64 + 1) * divider;
    }
    table
}
