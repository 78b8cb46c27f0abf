use std::io::{self, Read, Write};

use crate::Result;

/// Writes `count` NUL bytes into writer.
///
/// Used to reserve the entry table and to pad payloads.
pub fn fill_zeroes<W: Write>(mut writer: W, count: u64) -> Result<u64> {
    if count == 0 {
        return Ok(0);
    }
    let written = io::copy(&mut io::repeat(0).take(count), &mut writer)?;
    Ok(written)
}

/// Returns the file name part of `path`, without any of its extensions.
///
/// Both '/' and '\\' are treated as separators and the name is cut at its
/// first '.', so "data/12_ship.tex.bin" gives "12_ship".
pub fn file_name_without_extensions(path: &str) -> &str {
    let file_name = path.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(path);
    file_name.split('.').next().unwrap_or(file_name)
}
