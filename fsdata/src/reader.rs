use std::boxed::Box;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::entry::{decode, parse_entry_table, DataRange};
use crate::{EntryCount, FsdataError, Result};

#[derive(Debug)]
pub struct FsdataArchive<R: ?Sized> {
    obj: Box<R>,
    entry_count: EntryCount,
    // Sorted by slot
    entries: Vec<FsdataFileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsdataFileEntry {
    pub slot: u32,
    pub name: String,
    pub offset: i64,
    // Note: padded to the sector size, the format doesn't store exact sizes
    pub size: u64,
}

impl FsdataFileEntry {
    pub fn range(&self) -> DataRange {
        DataRange {
            offset: self.offset,
            length: self.size,
        }
    }

    /// Returns a copy of this entry with another name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl FsdataArchive<File> {
    pub fn open<P: AsRef<Path>>(
        archive_path: P,
        entry_count: EntryCount,
    ) -> Result<FsdataArchive<File>> {
        let file = File::open(archive_path)?;
        FsdataArchive::new(file, entry_count)
    }
}

impl<R: Read + Seek> FsdataArchive<R> {
    /// Create a new archive with the underlying object as the reader.
    ///
    /// The archive is expected to start at the reader's current position.
    pub fn new(mut obj: R, entry_count: EntryCount) -> Result<FsdataArchive<R>> {
        let entries = read_file_entries(&mut obj, entry_count)?;
        Ok(FsdataArchive {
            obj: Box::new(obj),
            entry_count,
            entries,
        })
    }

    pub fn entry_count(&self) -> EntryCount {
        self.entry_count
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    pub fn get_file_entry(&self, slot: u32) -> Option<&FsdataFileEntry> {
        self.entries
            .binary_search_by_key(&slot, |entry| entry.slot)
            .ok()
            .map(|index| &self.entries[index])
    }

    pub fn get_entries(&self) -> impl Iterator<Item = &'_ FsdataFileEntry> {
        self.entries.iter()
    }

    /// Replaces the name of the entry stored in `slot`.
    pub fn rename_entry(&mut self, slot: u32, name: impl Into<String>) -> Result<()> {
        let index = self
            .entries
            .binary_search_by_key(&slot, |entry| entry.slot)
            .map_err(|_| FsdataError::EntryNotFound)?;
        self.entries[index] = self.entries[index].with_name(name);
        Ok(())
    }

    pub fn read_file_content(&mut self, slot: u32) -> Result<Vec<u8>> {
        let range = self
            .get_file_entry(slot)
            .ok_or(FsdataError::EntryNotFound)?
            .range();
        read_range(self.obj.as_mut(), range)
    }

    pub fn extract_file(&mut self, slot: u32, destination_path: &Path) -> Result<()> {
        let content = self.read_file_content(slot)?;
        let mut file = File::create(destination_path)?;
        Ok(file.write_all(content.as_slice())?)
    }
}

/// Scans the entry table found at the reader's current position and lists
/// the slots in use, in table order.
pub fn read_file_entries<R: Read + Seek>(
    reader: &mut R,
    entry_count: EntryCount,
) -> Result<Vec<FsdataFileEntry>> {
    let stream_start = reader.seek(SeekFrom::Current(0))?;
    let table_size = entry_count.base_address();
    let mut table_buf = Vec::with_capacity(table_size as usize);
    let mut reader_chunk = reader.take(table_size);
    reader_chunk.read_to_end(&mut table_buf)?;
    if (table_buf.len() as u64) < table_size {
        return Err(FsdataError::TruncatedRead {
            offset: stream_start as i64,
            length: table_size,
            stream_length: stream_start + table_buf.len() as u64,
        });
    }

    let raw_entries = parse_entry_table(&table_buf, entry_count)?;
    let entries: Vec<FsdataFileEntry> = (0..)
        .zip(raw_entries)
        .filter_map(|(slot, raw_entry)| {
            let range = decode(raw_entry, entry_count.base_address(), stream_start)?;
            Some(FsdataFileEntry {
                slot,
                name: slot.to_string(),
                offset: range.offset,
                size: range.length,
            })
        })
        .collect();
    log::debug!("{} of {} entries in use", entries.len(), entry_count.get());
    Ok(entries)
}

/// Reads the bytes covered by `range`, making sure they are all available.
pub fn read_range<R>(reader: &mut R, range: DataRange) -> Result<Vec<u8>>
where
    R: Read + Seek + ?Sized,
{
    let stream_length = reader.seek(SeekFrom::End(0))?;
    let truncated = range.offset < 0
        || (range.offset as u64)
            .checked_add(range.length)
            .map_or(true, |end| end > stream_length);
    if truncated {
        return Err(FsdataError::TruncatedRead {
            offset: range.offset,
            length: range.length,
            stream_length,
        });
    }

    reader.seek(SeekFrom::Start(range.offset as u64))?;
    let mut content: Vec<u8> = Vec::with_capacity(range.length as usize);
    let mut file_chunk = reader.take(range.length);
    file_chunk.read_to_end(&mut content)?;
    Ok(content)
}
