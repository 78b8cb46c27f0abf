use std::collections::HashSet;
use std::convert::TryFrom;

use crate::archive::file_name_without_extensions;
use crate::{EntryCount, FsdataError, Result};

/// Slot requested for a file appended to a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotId {
    Explicit(u32),
    /// The slot is derived from the file's name, or from its append index
    /// when the name doesn't start with digits.
    Unresolved,
}

/// Parses the leading decimal digits of a file name, once its directories
/// and extensions are stripped.
///
/// Returns `None` if the name doesn't start with a digit or if the number
/// doesn't fit in an `i32`.
pub fn parse_slot_id(path: &str) -> Option<u32> {
    let name = file_name_without_extensions(path);
    let digit_count = name.bytes().take_while(u8::is_ascii_digit).count();
    if digit_count == 0 {
        return None;
    }
    name[..digit_count]
        .parse::<i32>()
        .ok()
        .and_then(|id| u32::try_from(id).ok())
}

/// Assigns a slot to each requested file, in append order.
///
/// The result holds one slot per request, at the request's index.
pub fn resolve_slot_ids<S: AsRef<str>>(
    requests: &[(S, SlotId)],
    entry_count: EntryCount,
) -> Result<Vec<u32>> {
    if requests.len() > entry_count.get() as usize {
        return Err(FsdataError::CapacityExceeded {
            file_count: requests.len(),
            entry_count: entry_count.get(),
        });
    }

    let mut claimed_ids = HashSet::with_capacity(requests.len());
    let mut slots = Vec::with_capacity(requests.len());
    for (index, (name, slot)) in requests.iter().enumerate() {
        let name: &str = name.as_ref();
        let id = match *slot {
            SlotId::Explicit(id) => id,
            SlotId::Unresolved => match parse_slot_id(name) {
                Some(id) => id,
                None => {
                    log::trace!("'{}' has no ID prefix, using index {}", name, index);
                    u32::try_from(index)?
                }
            },
        };
        // Explicit IDs are checked too, two files can't share a slot
        if !claimed_ids.insert(id) {
            return Err(FsdataError::DuplicateId(id));
        }
        if id >= entry_count.get() {
            return Err(FsdataError::IdOutOfRange {
                id,
                entry_count: entry_count.get(),
            });
        }
        slots.push(id);
    }
    Ok(slots)
}
