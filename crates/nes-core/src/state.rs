//! Chunked binary snapshot codec
//!
//! A snapshot is a sequence of chunks laid out as
//! `[4-byte tag][u32 little-endian length][payload]`. Payloads may nest
//! further chunks. Readers skip whatever they do not understand by seeking to
//! the end of the enclosing chunk, which keeps older readers working on newer
//! files.
//!
//! Leaf blobs written with [`Saver::compress`] start with one method byte:
//! `0` for raw bytes and `1` for deflate (zlib framing). A compressed blob
//! always fills the rest of its chunk.

use std::fmt;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// Four-byte chunk identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    /// Tag with the last byte replaced by an index, used for repeated chunks
    ///
    /// The index byte is `'0' + index`, wrapping past 255.
    pub const fn indexed(bytes: &[u8; 3], index: u8) -> Self {
        Self([bytes[0], bytes[1], bytes[2], b'0'.wrapping_add(index)])
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag(\"{}\")", self)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0.iter().take_while(|&&b| b != 0) {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        Ok(())
    }
}

/// Compression method byte values
const METHOD_RAW: u8 = 0;
const METHOD_DEFLATE: u8 = 1;

/// Snapshot writer
///
/// Chunk lengths are back-patched on [`Saver::end`], so the writer never needs
/// to know a payload size up front.
#[derive(Debug, Default)]
pub struct Saver {
    data: Vec<u8>,
    open: Vec<usize>,
}

impl Saver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a chunk: write the tag and reserve its length field
    pub fn begin(&mut self, tag: Tag) -> &mut Self {
        self.data.extend_from_slice(&tag.0);
        self.open.push(self.data.len());
        self.data.extend_from_slice(&[0; 4]);
        self
    }

    /// Close the innermost chunk and patch its length
    pub fn end(&mut self) -> &mut Self {
        if let Some(offset) = self.open.pop() {
            let length = (self.data.len() - offset - 4) as u32;
            self.data[offset..offset + 4].copy_from_slice(&length.to_le_bytes());
        } else {
            log::warn!("state: end() without a matching begin()");
        }
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.data.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Write a method byte and `data`, deflated when that makes it smaller
    pub fn compress(&mut self, data: &[u8]) -> &mut Self {
        match deflate(data) {
            Some(packed) if packed.len() < data.len() => {
                self.data.push(METHOD_DEFLATE);
                self.data.extend_from_slice(&packed);
            }
            _ => {
                self.data.push(METHOD_RAW);
                self.data.extend_from_slice(data);
            }
        }
        self
    }

    /// Consume the writer, closing any chunk left open
    pub fn finish(mut self) -> Vec<u8> {
        while !self.open.is_empty() {
            self.end();
        }
        self.data
    }
}

fn deflate(data: &[u8]) -> Option<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::best());
    encoder.write_all(data).ok()?;
    encoder.finish().ok()
}

/// Snapshot reader
///
/// Every read is bounded by the innermost open chunk. Overruns fail with
/// [`Error::CorruptFile`] instead of reading into a sibling chunk.
#[derive(Debug)]
pub struct Loader<'a> {
    data: &'a [u8],
    pos: usize,
    ends: Vec<usize>,
}

impl<'a> Loader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            ends: Vec::new(),
        }
    }

    fn limit(&self) -> usize {
        self.ends.last().copied().unwrap_or(self.data.len())
    }

    /// Bytes left before the end of the current chunk
    pub fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.pos)
    }

    /// Enter the next chunk, or return `None` at the end of the current scope
    pub fn begin(&mut self) -> Result<Option<Tag>> {
        let limit = self.limit();
        if self.pos >= limit {
            return Ok(None);
        }
        if limit - self.pos < 8 {
            return Err(Error::CorruptFile("truncated chunk header"));
        }
        let mut tag = [0; 4];
        tag.copy_from_slice(&self.data[self.pos..self.pos + 4]);
        let mut length = [0; 4];
        length.copy_from_slice(&self.data[self.pos + 4..self.pos + 8]);
        let length = u32::from_le_bytes(length) as usize;
        self.pos += 8;
        if length > limit - self.pos {
            return Err(Error::CorruptFile("chunk overruns its parent"));
        }
        self.ends.push(self.pos + length);
        Ok(Some(Tag(tag)))
    }

    /// Leave the current chunk, skipping any unread payload
    pub fn end(&mut self) -> Result<()> {
        match self.ends.pop() {
            Some(end) => {
                self.pos = end;
                Ok(())
            }
            None => Err(Error::CorruptFile("unbalanced chunk end")),
        }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(Error::CorruptFile("read past end of chunk"));
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut bytes = [0; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        out.copy_from_slice(self.take(out.len())?);
        Ok(())
    }

    /// Decode a blob written by [`Saver::compress`] into `out`
    ///
    /// The decoded size must match `out.len()` exactly.
    pub fn uncompress(&mut self, out: &mut [u8]) -> Result<()> {
        let method = self.read_u8()?;
        let payload = self.take(self.remaining())?;
        match method {
            METHOD_RAW => {
                if payload.len() != out.len() {
                    return Err(Error::CorruptFile("raw block size mismatch"));
                }
                out.copy_from_slice(payload);
                Ok(())
            }
            METHOD_DEFLATE => {
                let mut decoder = ZlibDecoder::new(payload);
                decoder
                    .read_exact(out)
                    .map_err(|_| Error::CorruptFile("deflate block too short"))?;
                let mut extra = [0; 1];
                match decoder.read(&mut extra) {
                    Ok(0) => Ok(()),
                    Ok(_) => Err(Error::CorruptFile("deflate block too long")),
                    Err(_) => Err(Error::CorruptFile("bad deflate stream")),
                }
            }
            _ => Err(Error::CorruptFile("unknown compression method")),
        }
    }
}
