//! Reading and writing of FSDATA archives.
//!
//! An FSDATA archive has no header. It starts with a fixed-size table of
//! `entry_count` records, each made of a start sector and a sector count, and
//! is followed by the payload region at `entry_count * ENTRY_SIZE`.

mod archive;
pub mod builder;
pub mod entry;
mod error;
pub mod reader;
pub mod slot;

use std::convert::TryFrom;
use std::io::{Read, Seek, Write};

pub use builder::FsdataArchiveBuilder;
pub use entry::{DataRange, RawEntry};
pub use error::{FsdataError, Result};
pub use reader::{FsdataArchive, FsdataFileEntry};
pub use slot::SlotId;

pub const SECTOR_SIZE: u64 = 0x800;
pub const ALIGNMENT_SIZE: u64 = 0x1000;
pub const ENTRY_SIZE: u64 = (2 * std::mem::size_of::<i32>()) as u64;

/// Number of records in an archive's entry table.
///
/// The table size is always a multiple of `ALIGNMENT_SIZE`, which keeps the
/// payload region aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryCount(u32);

impl EntryCount {
    pub fn new(count: u32) -> Result<Self> {
        if (u64::from(count) * ENTRY_SIZE) % ALIGNMENT_SIZE != 0 {
            return Err(FsdataError::InvalidEntryCount(count));
        }
        Ok(Self(count))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Offset of the payload region, relative to the start of the archive.
    pub fn base_address(self) -> u64 {
        u64::from(self.0) * ENTRY_SIZE
    }
}

impl TryFrom<u32> for EntryCount {
    type Error = FsdataError;

    fn try_from(count: u32) -> Result<Self> {
        Self::new(count)
    }
}

/// Lists the files stored in the archive starting at `reader`'s current
/// position.
pub fn read<R: Read + Seek>(
    entry_count: EntryCount,
    reader: &mut R,
) -> Result<Vec<FsdataFileEntry>> {
    reader::read_file_entries(reader, entry_count)
}

/// Writes a complete archive made of `files` at `writer`'s current position.
pub fn write<W, I, R>(entry_count: EntryCount, files: I, writer: W) -> Result<()>
where
    W: Write + Seek,
    I: IntoIterator<Item = (String, SlotId, R)>,
    R: Read,
{
    let mut builder = FsdataArchiveBuilder::create(writer, entry_count)?;
    for (name, slot, data) in files {
        builder.append_file(name, slot, data);
    }
    builder.finish()
}
