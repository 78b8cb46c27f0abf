use std::boxed::Box;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::archive::fill_zeroes;
use crate::entry::{align, encode, write_raw_entry};
use crate::slot::{resolve_slot_ids, SlotId};
use crate::{EntryCount, FsdataError, Result, ALIGNMENT_SIZE, ENTRY_SIZE};

/// Writes a whole FSDATA archive at once.
///
/// Files are only collected by `append_file*`. Their slots are resolved and
/// their content is read when `finish` is called, which happens on drop if it
/// wasn't called explicitly.
pub struct FsdataArchiveBuilder<'a, W: Write + Seek> {
    obj: Box<W>,
    start_offset: u64,
    entry_count: EntryCount,
    files: Vec<PendingFile<'a>>,
    finished: bool,
}

struct PendingFile<'a> {
    name: String,
    slot: SlotId,
    data: PendingData<'a>,
}

enum PendingData<'a> {
    Path(PathBuf),
    Reader(Box<dyn Read + 'a>),
}

impl<'a> PendingData<'a> {
    fn read_all(self) -> Result<Vec<u8>> {
        match self {
            PendingData::Path(path) => Ok(fs::read(path)?),
            PendingData::Reader(mut reader) => {
                let mut content = Vec::new();
                reader.read_to_end(&mut content)?;
                Ok(content)
            }
        }
    }
}

impl<'a, W: Write + Seek> FsdataArchiveBuilder<'a, W> {
    /// The archive is written from the current position of `obj`.
    pub fn create(mut obj: W, entry_count: EntryCount) -> Result<Self> {
        let start_offset = obj.seek(SeekFrom::Current(0))?;
        Ok(Self {
            obj: Box::new(obj),
            start_offset,
            entry_count,
            files: Vec::new(),
            finished: false,
        })
    }

    pub fn entry_count(&self) -> EntryCount {
        self.entry_count
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Appends a file whose content is read from `data` when the archive is
    /// written. `name` is used to derive the slot of unresolved files.
    pub fn append_file<R>(&mut self, name: impl Into<String>, slot: SlotId, data: R)
    where
        R: Read + 'a,
    {
        self.files.push(PendingFile {
            name: name.into(),
            slot,
            data: PendingData::Reader(Box::new(data)),
        });
    }

    /// Appends a file stored on disk. It is opened only when the archive is
    /// written.
    pub fn append_file_from_path<P: AsRef<Path>>(&mut self, path: P, slot: SlotId) {
        let path = path.as_ref();
        self.files.push(PendingFile {
            name: path.to_string_lossy().into_owned(),
            slot,
            data: PendingData::Path(path.to_path_buf()),
        });
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        // Nothing is written if slots can't be resolved
        let requests: Vec<(&str, SlotId)> = self
            .files
            .iter()
            .map(|file| (file.name.as_str(), file.slot))
            .collect();
        let slots = resolve_slot_ids(&requests, self.entry_count)?;
        let mut files: Vec<(u32, PendingFile<'a>)> =
            slots.into_iter().zip(self.files.drain(..)).collect();
        files.sort_by_key(|(slot, _)| *slot);

        // Reserve the entry table so that the payload region can be addressed
        self.obj.seek(SeekFrom::Start(self.start_offset))?;
        fill_zeroes(self.obj.by_ref(), self.entry_count.base_address())?;
        if files.is_empty() {
            return Ok(());
        }
        self.write_content(files)
    }

    fn write_content(&mut self, files: Vec<(u32, PendingFile<'a>)>) -> Result<()> {
        let entry_count = self.entry_count.get();
        let base_address = self.start_offset + self.entry_count.base_address();
        let mut entry_offset = self.start_offset;
        let mut data_offset = base_address;
        let mut index: u32 = 0;
        for (slot, file) in files {
            // Skip empty slots, they're already zeroed
            while index != slot {
                if index >= entry_count {
                    return Err(FsdataError::IndexOutOfRange { index, entry_count });
                }
                index += 1;
                entry_offset += ENTRY_SIZE;
            }

            let content = file.data.read_all()?;
            let size = content.len() as u64;
            let padded_size = align(size, ALIGNMENT_SIZE);
            let entry = encode(data_offset, base_address, padded_size)?;
            log::trace!(
                "'{}' -> slot {} ({} bytes at 0x{:x})",
                file.name,
                slot,
                size,
                data_offset
            );

            self.obj.seek(SeekFrom::Start(entry_offset))?;
            write_raw_entry(self.obj.by_ref(), &entry)?;
            let next_entry_offset = self.obj.seek(SeekFrom::Current(0))?;

            self.obj.seek(SeekFrom::Start(data_offset))?;
            self.obj.write_all(&content)?;
            fill_zeroes(self.obj.by_ref(), padded_size - size)?;
            self.obj.seek(SeekFrom::Start(next_entry_offset))?;

            entry_offset = next_entry_offset;
            data_offset += padded_size;
            index += 1;
        }
        self.obj.flush()?;
        Ok(())
    }
}

impl<'a, W: Write + Seek> Drop for FsdataArchiveBuilder<'a, W> {
    // Automatically call finish on destruction
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::FsdataArchive;
    use crate::FsdataFileEntry;
    use hex_literal::hex;
    use std::fs::File;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn padded(content: &[u8]) -> Vec<u8> {
        let mut result = content.to_vec();
        result.resize(align(content.len() as u64, ALIGNMENT_SIZE) as usize, 0);
        result
    }

    #[test]
    fn test_empty() {
        let entry_count = EntryCount::new(4096).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            builder.finish().unwrap();
        }
        let data = cursor.into_inner();
        assert_eq!(data.len(), 4096 * 8);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_finish_on_drop() {
        let entry_count = EntryCount::new(512).unwrap();
        let content = vec![7u8; 3];
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            builder.append_file("1.bin", SlotId::Unresolved, content.as_slice());
        }
        let data = cursor.into_inner();
        assert_eq!(data.len(), 4096 + 4096);
        assert_eq!(&data[8..16], &hex!("0000000002000000"));
        assert_eq!(&data[4096..4099], &[7, 7, 7]);
    }

    #[test]
    fn test_table_layout() {
        let entry_count = EntryCount::new(512).unwrap();
        let first = vec![1u8; 5000];
        let second = vec![2u8; 4096];
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            // Appended out of order
            builder.append_file("b", SlotId::Explicit(10), second.as_slice());
            builder.append_file("a", SlotId::Explicit(2), first.as_slice());
            builder.finish().unwrap();
        }
        let data = cursor.into_inner();
        assert_eq!(data.len(), 4096 + 8192 + 4096);
        assert_eq!(&data[..16], &[0u8; 16]);
        // Slot 2: sectors 0..4
        assert_eq!(&data[16..24], &hex!("0000000004000000"));
        assert!(data[24..80].iter().all(|&b| b == 0));
        // Slot 10: sectors 4..6
        assert_eq!(&data[80..88], &hex!("0400000002000000"));
        assert!(data[88..4096].iter().all(|&b| b == 0));
        assert_eq!(&data[4096..4096 + 5000], first.as_slice());
        assert!(data[4096 + 5000..4096 + 8192].iter().all(|&b| b == 0));
        assert_eq!(&data[4096 + 8192..], second.as_slice());
    }

    #[test]
    fn test_round_trip() {
        let entry_count = EntryCount::new(4096).unwrap();
        let test_content: Vec<(&str, Vec<u8>)> = vec![
            ("12_ship.bin", (0..=255).cycle().take(10000).collect()),
            ("ship.bin", vec![0xCC; 1]),
            ("007.bin", vec![0x11; 4096]),
            ("4095_last", vec![0x22; 4097]),
        ];
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            for (name, content) in &test_content {
                builder.append_file(*name, SlotId::Unresolved, content.as_slice());
            }
            builder.finish().unwrap();
        }

        cursor.set_position(0);
        let mut archive = FsdataArchive::new(cursor, entry_count).unwrap();
        let slots: Vec<u32> = archive.get_entries().map(|e| e.slot).collect();
        assert_eq!(slots, vec![1, 7, 12, 4095]);
        for (slot, (_, content)) in [12, 1, 7, 4095].iter().zip(&test_content) {
            assert_eq!(archive.read_file_content(*slot).unwrap(), padded(content));
        }
    }

    #[test]
    fn test_round_trip_with_stream_offset() {
        let entry_count = EntryCount::new(512).unwrap();
        let content = vec![0xABu8; 100];
        let mut cursor = Cursor::new(vec![0xFFu8; 10]);
        cursor.set_position(10);
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            builder.append_file("x", SlotId::Explicit(3), content.as_slice());
            builder.finish().unwrap();
        }
        assert_eq!(&cursor.get_ref()[..10], &[0xFF; 10]);

        cursor.set_position(10);
        let mut archive = FsdataArchive::new(cursor, entry_count).unwrap();
        assert_eq!(
            archive.get_file_entry(3).unwrap(),
            &FsdataFileEntry {
                slot: 3,
                name: "3".to_string(),
                offset: 10 + 4096,
                size: 4096,
            }
        );
        assert_eq!(archive.read_file_content(3).unwrap(), padded(&content));
    }

    #[test]
    fn test_empty_file_is_absent() {
        let entry_count = EntryCount::new(512).unwrap();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            builder.append_file("0", SlotId::Unresolved, std::io::empty());
            builder.append_file("1", SlotId::Unresolved, &[1u8][..]);
            builder.finish().unwrap();
        }
        cursor.set_position(0);
        let archive = FsdataArchive::new(cursor, entry_count).unwrap();
        let slots: Vec<u32> = archive.get_entries().map(|e| e.slot).collect();
        assert_eq!(slots, vec![1]);
        assert_eq!(archive.get_file_entry(1).unwrap().offset, 4096);
    }

    #[test]
    fn test_errors_write_nothing() {
        let entry_count = EntryCount::new(512).unwrap();
        let content = vec![1u8; 10];

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            builder.append_file("10_a", SlotId::Unresolved, content.as_slice());
            builder.append_file("10_b", SlotId::Unresolved, content.as_slice());
            assert!(matches!(
                builder.finish().unwrap_err(),
                FsdataError::DuplicateId(10)
            ));
            // Single-shot
            assert!(builder.finish().is_ok());
        }
        assert!(cursor.get_ref().is_empty());

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            builder.append_file("a", SlotId::Explicit(512), content.as_slice());
            assert!(matches!(
                builder.finish().unwrap_err(),
                FsdataError::IdOutOfRange {
                    id: 512,
                    entry_count: 512
                }
            ));
        }
        assert!(cursor.get_ref().is_empty());

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut builder = FsdataArchiveBuilder::create(&mut cursor, entry_count).unwrap();
            for _ in 0..513 {
                builder.append_file("a", SlotId::Unresolved, content.as_slice());
            }
            assert!(matches!(
                builder.finish().unwrap_err(),
                FsdataError::CapacityExceeded { .. }
            ));
        }
        assert!(cursor.get_ref().is_empty());
    }

    #[test]
    fn test_append_file_from_path() {
        let temp_dir = tempdir().unwrap();
        let source_dir = temp_dir.path().join("ERDATA");
        fs::create_dir(&source_dir).unwrap();
        fs::write(source_dir.join("2.bin"), vec![2u8; 10]).unwrap();
        fs::write(source_dir.join("0001.tex.bin"), vec![1u8; 20]).unwrap();
        let output_path = temp_dir.path().join("ERDATA.BIN");
        let entry_count = EntryCount::new(4096).unwrap();
        {
            let output_file = File::create(&output_path).unwrap();
            let mut builder = FsdataArchiveBuilder::create(output_file, entry_count).unwrap();
            builder.append_file_from_path(source_dir.join("2.bin"), SlotId::Unresolved);
            builder.append_file_from_path(source_dir.join("0001.tex.bin"), SlotId::Unresolved);
            assert_eq!(builder.file_count(), 2);
        }

        let mut archive = FsdataArchive::open(&output_path, entry_count).unwrap();
        assert_eq!(archive.file_count(), 2);
        assert_eq!(archive.read_file_content(1).unwrap(), padded(&[1u8; 20]));
        assert_eq!(archive.read_file_content(2).unwrap(), padded(&[2u8; 10]));
        assert_eq!(
            fs::metadata(&output_path).unwrap().len(),
            4096 * 8 + 2 * 4096
        );
    }

    #[test]
    fn test_missing_source_file() {
        let temp_dir = tempdir().unwrap();
        let entry_count = EntryCount::new(512).unwrap();
        let mut builder =
            FsdataArchiveBuilder::create(Cursor::new(Vec::new()), entry_count).unwrap();
        builder.append_file_from_path(temp_dir.path().join("missing.bin"), SlotId::Unresolved);
        assert!(matches!(
            builder.finish().unwrap_err(),
            FsdataError::IoError(_)
        ));
    }
}
