//! Minimal compound file writer.
//!
//! Produces version 3 (512-byte sector) containers with every stream placed
//! directly under the root storage. Streams shorter than the mini stream
//! cutoff are packed into the mini stream; the rest get regular sectors.
//! Only the 109 header DIFAT slots are used, which caps the output at a few
//! megabytes of stream data.
//!
//! Available with the `writer` feature.
//!
//! ```rust
//! # #[cfg(feature = "writer")]
//! # {
//! use docsift::ole::{CompoundFile, CompoundFileBuilder};
//!
//! let mut builder = CompoundFileBuilder::new();
//! builder.create_stream("MyStream", b"Hello, World!")?;
//! let bytes = builder.build()?;
//!
//! let cf = CompoundFile::open(bytes)?;
//! assert_eq!(cf.open_stream("MyStream")?, b"Hello, World!");
//! # }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use super::consts::*;
use super::file::OleError;

const FAT_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE_V3 / 4;
const DIR_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE_V3 / DIRENTRY_SIZE;
/// Directory names hold 31 UTF-16 code units plus a terminator
const MAX_NAME_UNITS: usize = 31;

#[inline]
fn sectors_for(len: usize) -> usize {
    len.div_ceil(SECTOR_SIZE_V3)
}

/// In-memory stream awaiting serialization
#[derive(Debug, Clone)]
struct PendingStream {
    name: String,
    data: Vec<u8>,
}

impl PendingStream {
    #[inline]
    fn is_mini(&self) -> bool {
        self.data.len() < MINI_STREAM_CUTOFF as usize
    }
}

/// Builder for compound files with root-level streams.
///
/// Streams keep the order they were added in, both in sector allocation and
/// in the directory's in-order walk.
#[derive(Debug, Clone, Default)]
pub struct CompoundFileBuilder {
    streams: Vec<PendingStream>,
}

impl CompoundFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream under the root storage.
    ///
    /// Fails when the name is empty, too long, contains `/`, or duplicates an
    /// existing stream (names compare case-insensitively).
    pub fn create_stream(&mut self, name: &str, data: &[u8]) -> Result<(), OleError> {
        if name.is_empty() || name.contains('/') || name.encode_utf16().count() > MAX_NAME_UNITS {
            return Err(OleError::InvalidFormat(format!("Invalid stream name: {name:?}")));
        }
        let lowered = name.to_lowercase();
        if self.streams.iter().any(|s| s.name.to_lowercase() == lowered) {
            return Err(OleError::InvalidFormat(format!("Stream already exists: {name}")));
        }

        self.streams.push(PendingStream {
            name: name.to_string(),
            data: data.to_vec(),
        });
        Ok(())
    }

    /// Serialize the container.
    pub fn build(&self) -> Result<Vec<u8>, OleError> {
        // Mini stream: every small stream padded to a mini sector boundary
        let mut ministream = Vec::new();
        let mut mini_starts = Vec::with_capacity(self.streams.len());
        let mut minifat: Vec<u32> = Vec::new();
        for stream in &self.streams {
            if !stream.is_mini() || stream.data.is_empty() {
                mini_starts.push(ENDOFCHAIN);
                continue;
            }
            let first = minifat.len() as u32;
            let count = stream.data.len().div_ceil(MINI_SECTOR_SIZE);
            for i in 0..count {
                let next = if i + 1 == count { ENDOFCHAIN } else { first + i as u32 + 1 };
                minifat.push(next);
            }
            ministream.extend_from_slice(&stream.data);
            ministream.resize(minifat.len() * MINI_SECTOR_SIZE, 0);
            mini_starts.push(first);
        }

        let dir_sectors = sectors_for((self.streams.len() + 1) * DIRENTRY_SIZE);
        let minifat_sectors = sectors_for(minifat.len() * 4);
        let ministream_sectors = sectors_for(ministream.len());
        let big_sectors: usize = self
            .streams
            .iter()
            .filter(|s| !s.is_mini())
            .map(|s| sectors_for(s.data.len()))
            .sum();
        let payload_sectors = dir_sectors + minifat_sectors + ministream_sectors + big_sectors;

        // The FAT has to describe its own sectors too
        let mut fat_sectors = 1;
        while fat_sectors * FAT_ENTRIES_PER_SECTOR < payload_sectors + fat_sectors {
            fat_sectors += 1;
        }
        if fat_sectors > HEADER_DIFAT_ENTRIES {
            return Err(OleError::InvalidFormat(
                "Stream data exceeds the header DIFAT capacity".to_string(),
            ));
        }

        let mut fat = vec![FREESECT; fat_sectors * FAT_ENTRIES_PER_SECTOR];
        for entry in fat.iter_mut().take(fat_sectors) {
            *entry = FATSECT;
        }

        let mut next_free = fat_sectors;
        let mut allocate = |fat: &mut Vec<u32>, count: usize| -> u32 {
            if count == 0 {
                return ENDOFCHAIN;
            }
            let first = next_free;
            for i in first..first + count {
                fat[i] = if i + 1 == first + count { ENDOFCHAIN } else { i as u32 + 1 };
            }
            next_free += count;
            first as u32
        };

        let dir_start = allocate(&mut fat, dir_sectors);
        let minifat_start = allocate(&mut fat, minifat_sectors);
        let ministream_start = allocate(&mut fat, ministream_sectors);
        let big_starts: Vec<u32> = self
            .streams
            .iter()
            .map(|s| {
                if s.is_mini() {
                    ENDOFCHAIN
                } else {
                    allocate(&mut fat, sectors_for(s.data.len()))
                }
            })
            .collect();

        let total_sectors = fat_sectors + payload_sectors;
        let mut out = vec![0u8; HEADER_SIZE + total_sectors * SECTOR_SIZE_V3];

        // Header
        out[0..8].copy_from_slice(MAGIC);
        put_u16(&mut out, 0x18, 0x003E); // minor version
        put_u16(&mut out, 0x1A, 3); // major version
        put_u16(&mut out, 0x1C, BYTE_ORDER_LE);
        put_u16(&mut out, 0x1E, 9); // sector shift
        put_u16(&mut out, 0x20, 6); // mini sector shift
        put_u32(&mut out, 0x2C, fat_sectors as u32);
        put_u32(&mut out, 0x30, dir_start);
        put_u32(&mut out, 0x38, MINI_STREAM_CUTOFF);
        put_u32(&mut out, 0x3C, minifat_start);
        put_u32(&mut out, 0x40, minifat_sectors as u32);
        put_u32(&mut out, 0x44, ENDOFCHAIN);
        put_u32(&mut out, 0x48, 0);
        for i in 0..HEADER_DIFAT_ENTRIES {
            let value = if i < fat_sectors { i as u32 } else { FREESECT };
            put_u32(&mut out, 0x4C + i * 4, value);
        }

        // FAT
        for (i, value) in fat.iter().enumerate() {
            put_u32(&mut out, HEADER_SIZE + i * 4, *value);
        }

        // Directory
        let mut directory = Vec::with_capacity(dir_sectors * DIR_ENTRIES_PER_SECTOR);
        directory.push(encode_entry(
            "Root Entry",
            STGTY_ROOT,
            if self.streams.is_empty() { NOSTREAM } else { 1 },
            NOSTREAM,
            ministream_start,
            ministream.len() as u64,
        ));
        for (i, stream) in self.streams.iter().enumerate() {
            let right = if i + 1 < self.streams.len() { i as u32 + 2 } else { NOSTREAM };
            let start = if stream.is_mini() { mini_starts[i] } else { big_starts[i] };
            directory.push(encode_entry(
                &stream.name,
                STGTY_STREAM,
                NOSTREAM,
                right,
                start,
                stream.data.len() as u64,
            ));
        }
        while directory.len() < dir_sectors * DIR_ENTRIES_PER_SECTOR {
            directory.push(encode_entry("", STGTY_EMPTY, NOSTREAM, NOSTREAM, FREESECT, 0));
        }
        write_chain(&mut out, dir_start, &directory.concat());

        // MiniFAT and mini stream
        let minifat_bytes: Vec<u8> = minifat.iter().flat_map(|v| v.to_le_bytes()).collect();
        write_chain(&mut out, minifat_start, &minifat_bytes);
        write_chain(&mut out, ministream_start, &ministream);

        // Regular streams
        for (stream, &start) in self.streams.iter().zip(&big_starts) {
            if !stream.is_mini() {
                write_chain(&mut out, start, &stream.data);
            }
        }

        Ok(out)
    }
}

#[inline]
fn put_u16(out: &mut [u8], offset: usize, value: u16) {
    out[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

#[inline]
fn put_u32(out: &mut [u8], offset: usize, value: u32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Copy contiguous data starting at `start`; allocation is always contiguous here
fn write_chain(out: &mut [u8], start: u32, data: &[u8]) {
    if start == ENDOFCHAIN || data.is_empty() {
        return;
    }
    let offset = HEADER_SIZE + start as usize * SECTOR_SIZE_V3;
    out[offset..offset + data.len()].copy_from_slice(data);
}

fn encode_entry(
    name: &str,
    entry_type: u8,
    child: u32,
    right: u32,
    start_sector: u32,
    size: u64,
) -> Vec<u8> {
    let mut entry = vec![0u8; DIRENTRY_SIZE];
    let units: Vec<u16> = name.encode_utf16().take(MAX_NAME_UNITS).collect();
    for (i, unit) in units.iter().enumerate() {
        put_u16(&mut entry, i * 2, *unit);
    }
    if entry_type != STGTY_EMPTY {
        put_u16(&mut entry, 0x40, ((units.len() + 1) * 2) as u16);
    }
    entry[0x42] = entry_type;
    entry[0x43] = 1; // black
    put_u32(&mut entry, 0x44, NOSTREAM);
    put_u32(&mut entry, 0x48, right);
    put_u32(&mut entry, 0x4C, child);
    put_u32(&mut entry, 0x74, start_sector);
    entry[0x78..0x80].copy_from_slice(&size.to_le_bytes());
    entry
}
