//! Paged, bank-switchable memory
//!
//! A [`Memory`] covers a power-of-two address space cut into equal pages.
//! Each page is backed by a slice of one of up to two sources (ROM or RAM
//! buffers). Bank switching only rewrites the page table, so `read` stays a
//! plain indexed lookup.

use log::debug;

use crate::error::{Error, Result};
use crate::state::{Loader, Saver, Tag};

/// Maximum number of backing sources per paged space
pub const MAX_SOURCES: usize = 2;

const TAG_ACCESS: Tag = Tag::new(b"ACC\0");
const TAG_BANKS: Tag = Tag::new(b"BNK\0");

/// How a source gets its backing buffer
#[derive(Debug, Clone)]
pub enum SourceData {
    /// Allocate a zero-filled buffer owned by this memory
    Alloc(usize),
    /// Adopt an externally supplied buffer (e.g. cartridge ROM)
    Attach(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Source {
    data: Vec<u8>,
    /// Logical size before power-of-two padding
    size: usize,
    mask: usize,
    readable: bool,
    writable: bool,
    owned: bool,
}

impl Source {
    fn empty(page_size: usize) -> Self {
        Self {
            data: vec![0; page_size],
            size: 0,
            mask: page_size - 1,
            readable: false,
            writable: false,
            owned: true,
        }
    }
}

/// Page table entry: which source, which page-sized bank, and the derived offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Page {
    source: u8,
    bank: u32,
    offset: usize,
}

/// A paged address space
#[derive(Debug, Clone)]
pub struct Memory {
    sources: Vec<Source>,
    pages: Vec<Page>,
    page_shift: u32,
    space_mask: usize,
}

impl Memory {
    /// Create a space of `space_size` bytes split into `page_size` pages
    ///
    /// Both sizes must be powers of two, with `page_size <= space_size`.
    pub fn new(space_size: usize, page_size: usize, num_sources: usize) -> Result<Self> {
        if !space_size.is_power_of_two() || !page_size.is_power_of_two() || page_size > space_size {
            return Err(Error::UnsupportedFeature("paged memory geometry must be powers of two"));
        }
        if num_sources == 0 || num_sources > MAX_SOURCES {
            return Err(Error::UnsupportedFeature("paged memory supports one or two sources"));
        }
        Ok(Self {
            sources: (0..num_sources).map(|_| Source::empty(page_size)).collect(),
            pages: vec![Page::default(); space_size / page_size],
            page_shift: page_size.trailing_zeros(),
            space_mask: space_size - 1,
        })
    }

    pub fn page_size(&self) -> usize {
        1 << self.page_shift
    }

    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    /// Install a backing buffer for `source`
    ///
    /// The buffer is padded up to a power of two no smaller than a page so
    /// every masked bank offset stays in bounds.
    pub fn configure(&mut self, source: usize, data: SourceData, readable: bool, writable: bool) -> Result<()> {
        let page_size = self.page_size();
        let slot = self
            .sources
            .get_mut(source)
            .ok_or(Error::UnsupportedFeature("source index out of range"))?;

        let (mut buffer, size, owned) = match data {
            SourceData::Alloc(size) => {
                let mut buffer = Vec::new();
                buffer.try_reserve_exact(size)?;
                buffer.resize(size, 0);
                (buffer, size, true)
            }
            SourceData::Attach(buffer) => {
                let size = buffer.len();
                (buffer, size, false)
            }
        };

        let padded = size.max(page_size).next_power_of_two();
        if buffer.len() < padded {
            buffer.try_reserve_exact(padded - buffer.len())?;
            buffer.resize(padded, 0);
        }

        *slot = Source {
            data: buffer,
            size,
            mask: padded - 1,
            readable,
            writable,
            owned,
        };
        debug!("memory: source {} configured with {} bytes (r={}, w={})", source, size, readable, writable);

        self.refresh_source(source);
        Ok(())
    }

    /// Change the access flags of a source without touching its contents
    pub fn set_access(&mut self, source: usize, readable: bool, writable: bool) {
        if let Some(slot) = self.sources.get_mut(source) {
            slot.readable = readable;
            slot.writable = writable;
        }
    }

    fn refresh_source(&mut self, source: usize) {
        let shift = self.page_shift;
        let mask = self.sources[source].mask;
        for page in self.pages.iter_mut().filter(|p| p.source as usize == source) {
            page.offset = ((page.bank as usize) << shift) & mask;
            page.bank = (page.offset >> shift) as u32;
        }
    }

    /// Map `bank` (in units of `size`) into the window starting at `address`
    ///
    /// The window keeps its current source per page; see [`Memory::swap_source_bank`].
    pub fn swap_bank(&mut self, address: u16, size: usize, bank: usize) {
        let first = (address as usize & self.space_mask) >> self.page_shift;
        let count = (size >> self.page_shift).max(1);
        for i in 0..count {
            let index = (first + i) % self.pages.len();
            let source = self.pages[index].source as usize;
            self.assign(index, source, bank * count + i);
        }
    }

    /// Like [`Memory::swap_bank`], also selecting the backing source
    pub fn swap_source_bank(&mut self, source: usize, address: u16, size: usize, bank: usize) {
        if source >= self.sources.len() {
            log::warn!("memory: ignoring swap to missing source {}", source);
            return;
        }
        let first = (address as usize & self.space_mask) >> self.page_shift;
        let count = (size >> self.page_shift).max(1);
        for i in 0..count {
            let index = (first + i) % self.pages.len();
            self.assign(index, source, bank * count + i);
        }
    }

    /// Map consecutive `size` windows from `address` to the given banks
    pub fn swap_banks(&mut self, address: u16, size: usize, banks: &[usize]) {
        for (i, &bank) in banks.iter().enumerate() {
            self.swap_bank(address.wrapping_add((i * size) as u16), size, bank);
        }
    }

    fn assign(&mut self, page: usize, source: usize, page_bank: usize) {
        let offset = (page_bank << self.page_shift) & self.sources[source].mask;
        self.pages[page] = Page {
            source: source as u8,
            bank: (offset >> self.page_shift) as u32,
            offset,
        };
    }

    #[inline]
    pub fn read(&self, address: u16) -> u8 {
        let address = address as usize & self.space_mask;
        let page = &self.pages[address >> self.page_shift];
        self.sources[page.source as usize].data[page.offset + (address & (self.page_size() - 1))]
    }

    /// Store `value`; silently dropped when the backing source is read-only
    #[inline]
    pub fn write(&mut self, address: u16, value: u8) {
        let address = address as usize & self.space_mask;
        let page = self.pages[address >> self.page_shift];
        let in_page = address & ((1 << self.page_shift) - 1);
        let source = &mut self.sources[page.source as usize];
        if source.writable {
            source.data[page.offset + in_page] = value;
        }
    }

    pub fn is_readable(&self, address: u16) -> bool {
        let page = &self.pages[(address as usize & self.space_mask) >> self.page_shift];
        self.sources[page.source as usize].readable
    }

    pub fn is_writable(&self, address: u16) -> bool {
        let page = &self.pages[(address as usize & self.space_mask) >> self.page_shift];
        self.sources[page.source as usize].writable
    }

    /// `(source, bank)` currently mapped at `address`, bank in page units
    pub fn bank_at(&self, address: u16) -> (usize, usize) {
        let page = &self.pages[(address as usize & self.space_mask) >> self.page_shift];
        (page.source as usize, page.bank as usize)
    }

    /// Logical contents of a source
    pub fn source(&self, source: usize) -> &[u8] {
        self.sources.get(source).map_or(&[], |s| &s.data[..s.size])
    }

    pub fn source_mut(&mut self, source: usize) -> &mut [u8] {
        match self.sources.get_mut(source) {
            Some(s) => &mut s.data[..s.size],
            None => &mut [],
        }
    }

    /// Zero-fill every owned writable source
    pub fn clear_ram(&mut self) {
        for source in self.sources.iter_mut().filter(|s| s.owned && s.writable) {
            source.data.fill(0);
        }
    }

    /// Write this space as a chunk tagged `tag`
    ///
    /// Contents of owned, writable sources travel with the layout so the
    /// owner does not have to persist its RAM separately.
    pub fn save(&self, state: &mut Saver, tag: Tag) {
        state.begin(tag);

        state.begin(TAG_ACCESS);
        for source in &self.sources {
            state.write_u8(source.readable as u8 | (source.writable as u8) << 1);
        }
        state.end();

        state.begin(TAG_BANKS);
        for page in &self.pages {
            state.write_u8(page.source).write_u32(page.bank);
        }
        state.end();

        for (i, source) in self.sources.iter().enumerate() {
            if source.owned && source.writable && source.size > 0 {
                state.begin(Tag::indexed(b"RAM", i as u8)).compress(&source.data[..source.size]).end();
            }
        }

        state.end();
    }

    /// Restore from the chunk the caller has already entered
    pub fn load(&mut self, state: &mut Loader<'_>) -> Result<()> {
        while let Some(tag) = state.begin()? {
            match tag {
                TAG_ACCESS => {
                    for i in 0..self.sources.len() {
                        let flags = state.read_u8()?;
                        self.sources[i].readable = flags & 1 != 0;
                        self.sources[i].writable = flags & 2 != 0;
                    }
                }
                TAG_BANKS => {
                    for i in 0..self.pages.len() {
                        let source = state.read_u8()? as usize;
                        let bank = state.read_u32()? as usize;
                        if source >= self.sources.len() {
                            return Err(Error::CorruptFile("bank source index out of range"));
                        }
                        if bank << self.page_shift > self.sources[source].mask {
                            return Err(Error::CorruptFile("bank index out of range"));
                        }
                        self.assign(i, source, bank);
                    }
                }
                Tag([b'R', b'A', b'M', n]) if n >= b'0' => {
                    let index = (n - b'0') as usize;
                    let source = self
                        .sources
                        .get_mut(index)
                        .ok_or(Error::CorruptFile("ram source index out of range"))?;
                    if !(source.owned && source.writable) {
                        return Err(Error::CorruptFile("ram chunk names a read-only source"));
                    }
                    let size = source.size;
                    state.uncompress(&mut source.data[..size])?;
                }
                _ => {}
            }
            state.end()?;
        }
        Ok(())
    }
}
