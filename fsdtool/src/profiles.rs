use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fsdata::EntryCount;
use serde::Deserialize;

const ARCHIVE_NAME_SUFFIX: &str = "DATA";

/// Entry counts of the supported archives, indexed by game type.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GameProfiles {
    entry_counts: BTreeMap<String, u32>,
}

impl Default for GameProfiles {
    fn default() -> Self {
        let entry_counts = [("ER", 4096), ("AC2", 4096), ("AC25", 8192), ("AC3", 8192)]
            .iter()
            .map(|(game_type, count)| (game_type.to_string(), *count))
            .collect();
        Self { entry_counts }
    }
}

impl GameProfiles {
    pub fn entry_count(&self, game_type: &str) -> Result<EntryCount> {
        let count = self.entry_counts.get(game_type).ok_or_else(|| {
            anyhow!(
                "Could not get entry count for automatically discovered game type: {}",
                game_type
            )
        })?;
        Ok(EntryCount::new(*count)?)
    }

    fn validate(&self) -> Result<()> {
        for (game_type, count) in &self.entry_counts {
            EntryCount::new(*count)
                .with_context(|| format!("Invalid entry count for '{}'", game_type))?;
        }
        Ok(())
    }
}

/// Lists archive names and entry counts, one per line
impl fmt::Display for GameProfiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (game_type, count) in &self.entry_counts {
            writeln!(f, "{}{}.BIN: {}", game_type, ARCHIVE_NAME_SUFFIX, count)?;
        }
        Ok(())
    }
}

pub fn parse_game_profiles(file_path: impl AsRef<Path>) -> Result<GameProfiles> {
    let file = File::open(file_path)?;
    let file_reader = BufReader::new(file);
    let profiles: GameProfiles =
        serde_yaml::from_reader(file_reader).context("Invalid configuration")?;
    profiles.validate()?;
    Ok(profiles)
}

/// Extracts the game type from an archive or directory name.
///
/// The name, without directories and extensions, must end with "DATA":
/// "AC3DATA.BIN" and "AC3DATA" both give "AC3".
pub fn game_type_from_path(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Invalid path: '{}'", path.to_string_lossy()))?
        .to_string_lossy();
    let name = file_name.split('.').next().unwrap_or_default();
    if name.len() <= ARCHIVE_NAME_SUFFIX.len() {
        return Err(anyhow!(
            "Could not get game type by name: '{}'",
            path.to_string_lossy()
        ));
    }
    name.strip_suffix(ARCHIVE_NAME_SUFFIX)
        .map(str::to_string)
        .ok_or_else(|| {
            anyhow!(
                "Extensionless name did not end with \"{}\" as expected: {}",
                ARCHIVE_NAME_SUFFIX,
                name
            )
        })
}
