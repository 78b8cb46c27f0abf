use std::convert::TryFrom;
use std::io::Write;

use crate::{EntryCount, FsdataError, Result, ENTRY_SIZE, SECTOR_SIZE};
use nom::number::complete::le_i32;
use nom::*;
use serde::Serialize;

/// Entry table record, as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RawEntry {
    pub start_sector: i32,
    pub sector_count: i32,
}

impl RawEntry {
    pub const EMPTY: RawEntry = RawEntry {
        start_sector: 0,
        sector_count: 0,
    };

    /// A non-positive sector count marks an unused slot
    pub fn is_empty(&self) -> bool {
        self.sector_count <= 0
    }
}

/// Location of a payload in absolute stream coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRange {
    // Note: signed since start sectors are not validated when decoding
    pub offset: i64,
    pub length: u64,
}

/// Converts a table record into an absolute data range.
///
/// Returns `None` for empty slots.
pub fn decode(entry: RawEntry, base_address: u64, stream_start: u64) -> Option<DataRange> {
    if entry.is_empty() {
        return None;
    }
    let offset = base_address as i64
        + i64::from(entry.start_sector) * SECTOR_SIZE as i64
        + stream_start as i64;
    let length = entry.sector_count as u64 * SECTOR_SIZE;
    Some(DataRange { offset, length })
}

/// Converts an absolute payload offset and its padded length into a table
/// record.
///
/// Both `absolute_offset - base_address` and `padded_length` are expected to
/// be multiples of `SECTOR_SIZE`. Remainders are truncated.
pub fn encode(absolute_offset: u64, base_address: u64, padded_length: u64) -> Result<RawEntry> {
    let relative_offset = absolute_offset as i64 - base_address as i64;
    Ok(RawEntry {
        start_sector: i32::try_from(relative_offset / SECTOR_SIZE as i64)?,
        sector_count: i32::try_from(padded_length / SECTOR_SIZE)?,
    })
}

/// Rounds `value` up to the next multiple of `alignment`.
pub fn align(value: u64, alignment: u64) -> u64 {
    let remainder = value % alignment;
    if remainder == 0 {
        value
    } else {
        value + (alignment - remainder)
    }
}

pub fn write_raw_entry<W: Write>(writer: W, entry: &RawEntry) -> Result<()> {
    bincode::serialize_into(writer, entry)?;
    Ok(())
}

/// Parses a whole entry table. `data` must hold at least
/// `entry_count * ENTRY_SIZE` bytes.
pub fn parse_entry_table(data: &[u8], entry_count: EntryCount) -> Result<Vec<RawEntry>> {
    let table_size = entry_count.get() as usize * ENTRY_SIZE as usize;
    if data.len() < table_size {
        return Err(FsdataError::parsing_error("Entry table is incomplete"));
    }
    let (_, entries) = parse_raw_entries(&data[..table_size], entry_count.get() as usize)
        .map_err(|_| FsdataError::parsing_error("Failed to parse entry table"))?;
    Ok(entries)
}

named!(parse_raw_entry<&[u8], RawEntry>,
    do_parse!(
        start_sector: le_i32
            >> sector_count: le_i32
            >> (RawEntry {
                start_sector,
                sector_count,
            }
    )
));

named_args!(parse_raw_entries(entry_count: usize)<&[u8], Vec<RawEntry>>,
    count!(parse_raw_entry, entry_count)
);
