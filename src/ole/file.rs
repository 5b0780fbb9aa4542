use super::consts::*;
use crate::common::binary::{BinaryError, read_u16_le, read_u32_le};
use bytes::Bytes;
use fixedbitset::FixedBitSet;
use thiserror::Error;
use tracing::{debug, warn};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
#[derive(Debug, Clone, DeriveFromBytes)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    /// Left sibling SID
    sid_left: U32<LE>,
    /// Right sibling SID
    sid_right: U32<LE>,
    /// Child SID
    sid_child: U32<LE>,
    /// CLSID (16 bytes)
    clsid: [u8; 16],
    /// State bits
    state_bits: U32<LE>,
    /// Creation time (FILETIME)
    creation_time: U64<LE>,
    /// Modified time (FILETIME)
    modified_time: U64<LE>,
    /// Starting sector
    start_sector: U32<LE>,
    /// Stream size
    stream_size: U64<LE>,
}

/// Error types for compound file parsing
#[derive(Debug, Error)]
pub enum OleError {
    /// Signature missing or the buffer is too small to hold a header
    #[error("Not an OLE2 compound file")]
    NotCompoundFile,
    /// Header fields are inconsistent
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    /// Sector chains or directory entries point outside the file
    #[error("Corrupted file: {0}")]
    Corrupted(String),
    /// No stream with the requested name
    #[error("Stream not found: {0}")]
    StreamNotFound(String),
    /// Short read while decoding a header structure
    #[error("Invalid data: {0}")]
    InvalidData(#[from] BinaryError),
}

/// Represents an OLE directory entry (stream or storage)
#[derive(Debug, Clone)]
struct DirectoryEntry {
    /// Storage ID (index in directory)
    sid: u32,
    /// Entry name (UTF-16 decoded to UTF-8)
    name: String,
    /// Entry type (stream, storage, root, etc.)
    entry_type: u8,
    /// Index of left sibling in red-black tree
    sid_left: u32,
    /// Index of right sibling in red-black tree
    sid_right: u32,
    /// Index of child node in red-black tree
    sid_child: u32,
    /// First sector of the stream
    start_sector: u32,
    /// Size of the stream in bytes
    size: u64,
}

impl DirectoryEntry {
    #[inline]
    fn is_stream(&self) -> bool {
        self.entry_type == STGTY_STREAM
    }

    #[inline]
    fn is_storage(&self) -> bool {
        self.entry_type == STGTY_STORAGE || self.entry_type == STGTY_ROOT
    }
}

/// An opened OLE2 compound file.
///
/// The whole container is held in memory as a shared [`Bytes`] buffer. The
/// FAT, MiniFAT, directory and mini stream are decoded once in [`open`] and
/// never mutated afterwards, so every accessor takes `&self`.
///
/// [`open`]: CompoundFile::open
///
/// # Example
///
/// ```no_run
/// use docsift::ole::CompoundFile;
///
/// let data = std::fs::read("document.doc")?;
/// let cf = CompoundFile::open(data)?;
/// for path in cf.stream_paths() {
///     println!("{path}");
/// }
/// let word = cf.open_stream("WordDocument")?;
/// println!("WordDocument: {} bytes", word.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct CompoundFile {
    /// Raw container bytes
    data: Bytes,
    /// Sector size (512 or 4096 bytes)
    sector_size: usize,
    /// Mini sector size (typically 64 bytes)
    mini_sector_size: usize,
    /// Mini stream cutoff size (typically 4096 bytes)
    mini_stream_cutoff: u32,
    /// File Allocation Table - maps sector to next sector in chain
    fat: Vec<u32>,
    /// Mini FAT - for streams smaller than cutoff size
    minifat: Vec<u32>,
    /// All directory entries indexed by SID
    entries: Vec<Option<DirectoryEntry>>,
    /// Mini stream contents (root entry chain)
    ministream: Vec<u8>,
}

impl CompoundFile {
    /// Parse a compound file from its raw bytes.
    ///
    /// Fails with [`OleError::NotCompoundFile`] when the buffer is empty, too
    /// small, or lacks the `D0 CF 11 E0 A1 B1 1A E1` signature.
    pub fn open(data: impl Into<Bytes>) -> Result<Self, OleError> {
        let data: Bytes = data.into();

        if !is_ole_file(&data) {
            return Err(OleError::NotCompoundFile);
        }

        let header = &data[..HEADER_SIZE];
        let dll_version = read_u16_le(header, 0x1A)?;
        let byte_order = read_u16_le(header, 0x1C)?;
        let sector_shift = read_u16_le(header, 0x1E)?;
        let mini_sector_shift = read_u16_le(header, 0x20)?;
        let first_dir_sector = read_u32_le(header, 0x30)?;
        let mini_stream_cutoff = read_u32_le(header, 0x38)?;
        let first_minifat_sector = read_u32_le(header, 0x3C)?;
        let num_minifat_sectors = read_u32_le(header, 0x40)?;
        let first_difat_sector = read_u32_le(header, 0x44)?;
        let num_difat_sectors = read_u32_le(header, 0x48)?;

        // Validate byte order (must be little-endian)
        if byte_order != BYTE_ORDER_LE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }

        if !(9..=12).contains(&sector_shift) || mini_sector_shift > sector_shift {
            return Err(OleError::InvalidFormat(format!(
                "Unsupported sector shift {sector_shift}/{mini_sector_shift}"
            )));
        }

        let sector_size = 1usize << sector_shift;
        let mini_sector_size = 1usize << mini_sector_shift;

        // Validate sector size matches DLL version
        if (dll_version == 3 && sector_size != SECTOR_SIZE_V3)
            || (dll_version == 4 && sector_size != SECTOR_SIZE_V4)
        {
            return Err(OleError::InvalidFormat("Sector size mismatch".to_string()));
        }

        let mut cf = CompoundFile {
            data,
            sector_size,
            mini_sector_size,
            mini_stream_cutoff,
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            ministream: Vec::new(),
        };

        cf.load_fat(first_difat_sector, num_difat_sectors)?;
        cf.load_directory(first_dir_sector)?;

        if num_minifat_sectors > 0 && first_minifat_sector != ENDOFCHAIN {
            cf.load_minifat(first_minifat_sector)?;
        }

        debug!(
            file_size = cf.file_size(),
            sector_size,
            fat_entries = cf.fat.len(),
            directory_entries = cf.entries.len(),
            "opened compound file"
        );

        Ok(cf)
    }

    /// Number of whole or partial sectors following the header.
    #[inline]
    fn sector_count(&self) -> usize {
        self.data.len().saturating_sub(HEADER_SIZE).div_ceil(self.sector_size)
    }

    /// Borrow a single sector. The final sector may be short in truncated files.
    fn sector(&self, sector_id: u32) -> Result<&[u8], OleError> {
        // Sector position in file: (sector_id + 1) * sector_size
        let start = (sector_id as usize + 1) * self.sector_size;
        if sector_id > MAXREGSECT || start >= self.data.len() {
            return Err(OleError::Corrupted(format!(
                "Sector {sector_id} lies beyond the end of the file"
            )));
        }
        let end = (start + self.sector_size).min(self.data.len());
        Ok(&self.data[start..end])
    }

    /// Load the File Allocation Table (FAT)
    ///
    /// First 109 FAT sector indexes are stored in the header, additional
    /// indexes are stored in chained DIFAT sectors.
    fn load_fat(&mut self, first_difat_sector: u32, num_difat_sectors: u32) -> Result<(), OleError> {
        let mut fat_sectors = Vec::new();
        for i in 0..HEADER_DIFAT_ENTRIES {
            let sector = read_u32_le(&self.data, 0x4C + i * 4)?;
            if sector == FREESECT || sector == ENDOFCHAIN {
                break;
            }
            fat_sectors.push(sector);
        }

        if num_difat_sectors > 0 {
            let entries_per_sector = (self.sector_size / 4) - 1; // last slot links to the next DIFAT sector
            let mut visited = FixedBitSet::with_capacity(self.sector_count());
            let mut difat_sector = first_difat_sector;

            for _ in 0..num_difat_sectors {
                if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                    break;
                }
                if (difat_sector as usize) < visited.len() && visited.put(difat_sector as usize) {
                    return Err(OleError::Corrupted("DIFAT chain loops".to_string()));
                }

                let sector_data = self.sector(difat_sector)?;
                for i in 0..entries_per_sector {
                    let sector = read_u32_le(sector_data, i * 4)?;
                    if sector == FREESECT || sector == ENDOFCHAIN {
                        break;
                    }
                    fat_sectors.push(sector);
                }
                difat_sector = read_u32_le(sector_data, entries_per_sector * 4)?;
            }
        }

        let entries_per_sector = self.sector_size / 4;
        let mut fat = Vec::with_capacity(fat_sectors.len() * entries_per_sector);
        for &sector_id in &fat_sectors {
            let sector_data = self.sector(sector_id)?;
            fat.extend(
                sector_data
                    .chunks_exact(4)
                    .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            );
        }

        if fat.is_empty() {
            return Err(OleError::Corrupted("Compound file has no FAT".to_string()));
        }

        self.fat = fat;
        Ok(())
    }

    /// Read a stream by following the FAT chain
    ///
    /// Stops early, without failing, at the first sector beyond the end of
    /// the file.
    fn read_fat_chain(&self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut visited = FixedBitSet::with_capacity(self.fat.len());
        let mut sector = start_sector;

        while sector != ENDOFCHAIN {
            let index = sector as usize;
            if index >= self.fat.len() {
                return Err(OleError::Corrupted(format!(
                    "Invalid sector index {sector} in FAT chain"
                )));
            }
            if visited.put(index) {
                return Err(OleError::Corrupted("FAT chain loops".to_string()));
            }
            // A truncated file keeps whatever precedes the cut
            if index >= self.sector_count() {
                warn!(sector, file_size = self.file_size(), "FAT chain runs past the end of the file");
                break;
            }

            data.extend_from_slice(self.sector(sector)?);
            sector = self.fat[index];
        }

        Ok(data)
    }

    /// Read a stream by following the MiniFAT chain
    fn read_minifat_chain(&self, start_sector: u32, size: usize) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::with_capacity(size.min(self.ministream.len()));
        let mut visited = FixedBitSet::with_capacity(self.minifat.len());
        let mut sector = start_sector;

        while sector != ENDOFCHAIN && data.len() < size {
            let index = sector as usize;
            if index >= self.minifat.len() {
                return Err(OleError::Corrupted(format!(
                    "Invalid sector index {sector} in MiniFAT chain"
                )));
            }
            if visited.put(index) {
                return Err(OleError::Corrupted("MiniFAT chain loops".to_string()));
            }

            let position = index * self.mini_sector_size;
            let Some(chunk) = self.ministream.get(position..position + self.mini_sector_size)
            else {
                return Err(OleError::Corrupted("Mini sector out of bounds".to_string()));
            };
            data.extend_from_slice(chunk);
            sector = self.minifat[index];
        }

        Ok(data)
    }

    /// Load the Mini FAT and the mini stream it indexes
    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let minifat_data = self.read_fat_chain(first_minifat_sector)?;
        self.minifat = minifat_data
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let root_start = match self.entries.first() {
            Some(Some(root)) => root.start_sector,
            _ => return Err(OleError::Corrupted("No root entry".to_string())),
        };
        if root_start != ENDOFCHAIN {
            self.ministream = self.read_fat_chain(root_start)?;
        }

        Ok(())
    }

    /// Load and decode every directory entry
    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_fat_chain(first_dir_sector)?;

        self.entries = dir_data
            .chunks_exact(DIRENTRY_SIZE)
            .enumerate()
            .map(|(sid, chunk)| self.parse_directory_entry(chunk, sid as u32))
            .collect();

        match self.entries.first() {
            Some(Some(root)) if root.entry_type == STGTY_ROOT => Ok(()),
            _ => Err(OleError::Corrupted("Missing root directory entry".to_string())),
        }
    }

    /// Parse a single directory entry from 128 bytes; unused slots yield `None`
    fn parse_directory_entry(&self, data: &[u8], sid: u32) -> Option<DirectoryEntry> {
        let raw = RawDirectoryEntry::read_from_bytes(data).ok()?;
        if raw.entry_type == STGTY_EMPTY {
            return None;
        }

        // Decode name from UTF-16LE
        let name_len = (raw.name_len.get() as usize).min(64);
        let name = crate::common::binary::parse_utf16le_string(&raw.name[..name_len]);

        // 512-byte sector files only use the low 32 bits of the size
        let size = if self.sector_size == SECTOR_SIZE_V3 {
            raw.stream_size.get() & 0xFFFF_FFFF
        } else {
            raw.stream_size.get()
        };

        Some(DirectoryEntry {
            sid,
            name,
            entry_type: raw.entry_type,
            sid_left: raw.sid_left.get(),
            sid_right: raw.sid_right.get(),
            sid_child: raw.sid_child.get(),
            start_sector: raw.start_sector.get(),
            size,
        })
    }

    #[inline]
    fn entry(&self, sid: u32) -> Option<&DirectoryEntry> {
        self.entries.get(sid as usize).and_then(Option::as_ref)
    }

    /// In-order walk of the sibling tree hanging off `first`.
    ///
    /// Each SID is visited at most once, so malformed trees with cycles
    /// terminate.
    fn siblings(&self, first: u32, visited: &mut FixedBitSet) -> Vec<&DirectoryEntry> {
        let mut ordered = Vec::new();
        let mut stack: Vec<&DirectoryEntry> = Vec::new();
        let mut current = first;

        loop {
            while current != NOSTREAM
                && (current as usize) < visited.len()
                && !visited.put(current as usize)
            {
                let Some(entry) = self.entry(current) else {
                    break;
                };
                stack.push(entry);
                current = entry.sid_left;
            }

            let Some(entry) = stack.pop() else {
                break;
            };
            ordered.push(entry);
            current = entry.sid_right;
        }

        ordered
    }

    fn collect_streams(
        &self,
        first: u32,
        prefix: &str,
        visited: &mut FixedBitSet,
        out: &mut Vec<(String, u32)>,
    ) {
        for entry in self.siblings(first, visited) {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };

            if entry.is_stream() {
                out.push((path, entry.sid));
            } else if entry.is_storage() {
                self.collect_streams(entry.sid_child, &path, visited, out);
            }
        }
    }

    fn walk_streams(&self) -> Vec<(String, u32)> {
        let mut out = Vec::new();
        let mut visited = FixedBitSet::with_capacity(self.entries.len());
        if let Some(Some(root)) = self.entries.first() {
            visited.insert(0);
            self.collect_streams(root.sid_child, "", &mut visited, &mut out);
        }
        out
    }

    /// List every stream in directory order.
    ///
    /// Streams inside storages are reported as `Storage/Stream`.
    pub fn stream_paths(&self) -> Vec<String> {
        self.walk_streams().into_iter().map(|(path, _)| path).collect()
    }

    /// Find a directory entry by `/`-separated path (case-insensitive)
    fn find_entry(&self, path: &str) -> Option<&DirectoryEntry> {
        let mut current = self.entry(0)?;
        let mut visited = FixedBitSet::with_capacity(self.entries.len());

        for component in path.split('/').filter(|c| !c.is_empty()) {
            let wanted = component.to_lowercase();
            current = self
                .siblings(current.sid_child, &mut visited)
                .into_iter()
                .find(|entry| entry.name.to_lowercase() == wanted)?;
        }

        (current.sid != 0).then_some(current)
    }

    /// Check if a stream exists
    pub fn stream_exists(&self, path: &str) -> bool {
        self.find_entry(path).is_some_and(DirectoryEntry::is_stream)
    }

    /// Open a stream by path and return its contents
    ///
    /// Fails with [`OleError::StreamNotFound`] when no stream has that name.
    pub fn open_stream(&self, path: &str) -> Result<Vec<u8>, OleError> {
        let entry = self
            .find_entry(path)
            .filter(|entry| entry.is_stream())
            .ok_or_else(|| OleError::StreamNotFound(path.to_string()))?;

        let size = entry.size as usize;
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut data = if entry.size < self.mini_stream_cutoff as u64 {
            self.read_minifat_chain(entry.start_sector, size)?
        } else {
            self.read_fat_chain(entry.start_sector)?
        };

        if data.len() < size {
            warn!(
                stream = path,
                declared = size,
                available = data.len(),
                "stream is truncated"
            );
        }
        data.truncate(size);
        Ok(data)
    }

    /// Total size of the backing buffer in bytes
    #[inline]
    pub fn file_size(&self) -> usize {
        self.data.len()
    }
}

/// Check whether a buffer starts with the compound file signature
///
/// This only sniffs the magic bytes; [`CompoundFile::open`] does the real
/// validation.
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MINIMAL_OLEFILE_SIZE && &data[0..8] == MAGIC
}
