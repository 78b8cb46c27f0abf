use std::io;
use std::num;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FsdataError>;

#[derive(Error, Debug)]
pub enum FsdataError {
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
    #[error("bincode error: {0}")]
    BincodeError(#[from] bincode::Error),
    #[error("int conversion error: {0}")]
    TryFromIntError(#[from] num::TryFromIntError),
    #[error("failed to parse archive: {0}")]
    ParsingError(String),
    #[error("invalid entry count {0}: entry table size must be a multiple of the alignment size")]
    InvalidEntryCount(u32),
    #[error("too many files: {file_count} files for {entry_count} entries")]
    CapacityExceeded { file_count: usize, entry_count: u32 },
    #[error("ID already taken: {0}")]
    DuplicateId(u32),
    #[error("ID out of range; ID: {id}; entry count: {entry_count}")]
    IdOutOfRange { id: u32, entry_count: u32 },
    #[error("index went out of range; index: {index}; entry count: {entry_count}")]
    IndexOutOfRange { index: u32, entry_count: u32 },
    #[error("cannot read beyond the end of the stream (offset: {offset}, length: {length}, stream length: {stream_length})")]
    TruncatedRead {
        offset: i64,
        length: u64,
        stream_length: u64,
    },
    #[error("failed to find file entry")]
    EntryNotFound,
}

impl FsdataError {
    pub fn parsing_error(msg: impl Into<String>) -> Self {
        Self::ParsingError(msg.into())
    }
}
