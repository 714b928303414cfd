//! CPU bus seam
//!
//! The NES memory map as seen from the CPU:
//! $0000-$1FFF - 2KB internal RAM, decoded inside the CPU
//! $2000-$3FFF - PPU registers (mirrored every $08 bytes)
//! $4014       - OAM DMA
//! $4000-$401F - APU and I/O, open bus unless a device claims them
//! $4020-$FFFF - cartridge space, open bus until a board is installed
//!
//! Every address has a read handler and a write handler. External code
//! installs [`Device`]s and maps them onto address ranges; this table is the
//! only place the core couples to cartridge hardware.

use std::fmt;

use log::{debug, warn};

use crate::config::Region;
use crate::cpu::interrupt::Interrupt;
use crate::cpu::Bus as CpuBus;
use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::ppu::Ppu;
use crate::state::{Loader, Saver, Tag};

/// Address of the OAM DMA register
pub const OAM_DMA: u16 = 0x4014;

/// Index of an installed device
pub type DeviceId = u8;

/// Most devices a bus accepts; each one gets its own `DEVn` snapshot chunk
pub const MAX_DEVICES: usize = 64;

/// Hardware that answers on the CPU bus
pub trait Device: fmt::Debug {
    /// Short name, reported by [`Bus::owner`]
    fn name(&self) -> &str;
    /// Read at master clock `cycle`; `None` leaves the data bus floating
    fn read(&mut self, address: u16, cycle: u64) -> Option<u8>;
    fn write(&mut self, address: u16, value: u8, cycle: u64);
    fn reset(&mut self, _hard: bool) {}
    /// Append device chunks to a snapshot
    fn save(&self, _state: &mut Saver) {}
    /// Restore from an entered device chunk
    fn load(&mut self, _state: &mut Loader<'_>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    OpenBus,
    Ppu,
    OamDma,
    Device(DeviceId),
}

#[derive(Debug, Clone, Copy)]
struct Port {
    read: Handler,
    write: Handler,
}

impl Port {
    const OPEN: Port = Port {
        read: Handler::OpenBus,
        write: Handler::OpenBus,
    };
}

/// The CPU address space outside internal RAM
pub struct Bus {
    ppu: Ppu,
    ports: Vec<Port>,
    devices: Vec<Box<dyn Device>>,
    hooks: Hooks,
    /// Page written to $4014, until the CPU takes it
    dma: Option<u8>,
}

impl Bus {
    pub fn new(region: Region) -> Result<Self> {
        let mut bus = Self {
            ppu: Ppu::new(region)?,
            ports: vec![Port::OPEN; 0x10000],
            devices: Vec::new(),
            hooks: Hooks::new(),
            dma: None,
        };
        bus.map_defaults();
        Ok(bus)
    }

    fn map_defaults(&mut self) {
        self.ports.fill(Port::OPEN);
        for port in &mut self.ports[0x2000..0x4000] {
            *port = Port {
                read: Handler::Ppu,
                write: Handler::Ppu,
            };
        }
        self.ports[OAM_DMA as usize].write = Handler::OamDma;
    }

    /// Take ownership of `device`; it answers nowhere until mapped
    pub fn install(&mut self, device: Box<dyn Device>) -> Result<DeviceId> {
        if self.devices.len() >= MAX_DEVICES {
            return Err(Error::UnsupportedFeature("too many bus devices"));
        }
        let id = self.devices.len() as DeviceId;
        debug!("bus: installed device {} '{}'", id, device.name());
        self.devices.push(device);
        Ok(id)
    }

    /// Drop every installed device and restore the power-on map
    pub fn remove_devices(&mut self) {
        self.devices.clear();
        self.map_defaults();
    }

    /// Ports for `first..=last`; an inverted range selects nothing
    fn span(&mut self, first: u16, last: u16) -> &mut [Port] {
        if first > last {
            warn!("bus: ignoring inverted range ${:04X}-${:04X}", first, last);
            return &mut [];
        }
        &mut self.ports[first as usize..=last as usize]
    }

    /// Route reads and writes of `first..=last` to device `id`
    pub fn map(&mut self, first: u16, last: u16, id: DeviceId) {
        self.map_read(first, last, id);
        self.map_write(first, last, id);
    }

    pub fn map_read(&mut self, first: u16, last: u16, id: DeviceId) {
        for port in self.span(first, last) {
            port.read = Handler::Device(id);
        }
    }

    pub fn map_write(&mut self, first: u16, last: u16, id: DeviceId) {
        for port in self.span(first, last) {
            port.write = Handler::Device(id);
        }
    }

    /// Return `first..=last` to open bus
    pub fn unmap(&mut self, first: u16, last: u16) {
        self.span(first, last).fill(Port::OPEN);
    }

    /// Name of whatever answers reads at `address`
    pub fn owner(&self, address: u16) -> Option<&str> {
        match self.ports[address as usize].read {
            Handler::OpenBus => None,
            Handler::Ppu => Some("ppu"),
            Handler::OamDma => Some("oam-dma"),
            Handler::Device(id) => self.devices.get(id as usize).map(|d| d.name()),
        }
    }

    pub fn device(&self, id: DeviceId) -> Option<&dyn Device> {
        self.devices.get(id as usize).map(|d| d.as_ref())
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut (dyn Device + 'static)> {
        self.devices.get_mut(id as usize).map(|d| d.as_mut())
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn reset(&mut self, hard: bool) {
        self.ppu.reset(hard);
        for device in &mut self.devices {
            device.reset(hard);
        }
        self.dma = None;
    }

    /// Save every device as `DEV0`, `DEV1`, ... inside the current chunk
    pub(crate) fn save_devices(&self, state: &mut Saver) {
        for (i, device) in self.devices.iter().enumerate() {
            state.begin(Tag::indexed(b"DEV", i as u8));
            device.save(state);
            state.end();
        }
    }

    /// Restore devices from an entered chunk written by [`Bus::save_devices`]
    pub(crate) fn load_devices(&mut self, state: &mut Loader<'_>) -> Result<()> {
        while let Some(tag) = state.begin()? {
            let index = tag.0[3].wrapping_sub(b'0') as usize;
            if &tag.0[..3] == b"DEV" {
                match self.devices.get_mut(index) {
                    Some(device) => device.load(state)?,
                    None => return Err(Error::CorruptFile("snapshot names a missing device")),
                }
            }
            state.end()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("devices", &self.devices)
            .field("hooks", &self.hooks)
            .field("dma", &self.dma)
            .finish_non_exhaustive()
    }
}

impl CpuBus for Bus {
    fn read(&mut self, address: u16, cycle: u64) -> Option<u8> {
        match self.ports[address as usize].read {
            Handler::OpenBus | Handler::OamDma => None,
            Handler::Ppu => {
                self.ppu.update(cycle);
                Some(self.ppu.read_register(address))
            }
            Handler::Device(id) => self.devices[id as usize].read(address, cycle),
        }
    }

    fn write(&mut self, address: u16, value: u8, cycle: u64) {
        match self.ports[address as usize].write {
            Handler::OpenBus => {}
            Handler::Ppu => {
                self.ppu.update(cycle);
                self.ppu.write_register(address, value);
            }
            Handler::OamDma => self.dma = Some(value),
            Handler::Device(id) => self.devices[id as usize].write(address, value, cycle),
        }
    }

    fn sync(&mut self, cycle: u64, interrupt: &mut Interrupt) {
        self.catch_up(cycle, interrupt);
        self.hooks.execute(cycle, interrupt);
    }

    fn catch_up(&mut self, cycle: u64, interrupt: &mut Interrupt) {
        self.ppu.update(cycle);
        if let Some(at) = self.ppu.take_nmi() {
            interrupt.do_nmi(at);
        }
    }

    fn take_dma(&mut self) -> Option<u8> {
        self.dma.take()
    }
}
