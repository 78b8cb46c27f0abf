use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use fsdata::{EntryCount, FsdataArchive, FsdataArchiveBuilder, FsdataFileEntry, SlotId};
use walkdir::WalkDir;

const ARCHIVE_EXTENSION: &str = "BIN";
const BACKUP_EXTENSION: &str = "BAK";
const TEMPORARY_EXTENSION: &str = "TMP";

/// Extracts every file of an archive into `<output_root>/<archive name>`.
///
/// Extracted files are named after their slot.
pub fn unpack_archive<P1, P2>(
    archive_path: P1,
    entry_count: EntryCount,
    output_root: P2,
) -> Result<PathBuf>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let archive_path = archive_path.as_ref();
    let mut archive = FsdataArchive::open(archive_path, entry_count)
        .with_context(|| format!("Failed to open '{}'", archive_path.to_string_lossy()))?;

    let output_directory = output_root.as_ref().join(name_without_extensions(archive_path)?);
    if output_directory.is_file() {
        return Err(anyhow!(
            "Must not be file at: '{}'",
            output_directory.to_string_lossy()
        ));
    }
    fs::create_dir_all(&output_directory)?;

    let entries: Vec<FsdataFileEntry> = archive.get_entries().cloned().collect();
    for entry in &entries {
        let destination_path = output_directory.join(&entry.name);
        if destination_path.is_dir() {
            return Err(anyhow!(
                "Must not be directory at: '{}'",
                destination_path.to_string_lossy()
            ));
        }
        log::trace!("Extracting slot {} ({} bytes)", entry.slot, entry.size);
        archive
            .extract_file(entry.slot, &destination_path)
            .with_context(|| format!("Failed to extract slot {}", entry.slot))?;
    }
    log::info!(
        "{} files extracted into '{}'",
        entries.len(),
        output_directory.to_string_lossy()
    );
    Ok(output_directory)
}

/// Builds `<output_root>/<directory name>.BIN` from every file found under
/// `directory`.
///
/// Files are appended in file name order and get their slot from their name.
/// The archive is written to a temporary file first and only replaces the
/// existing one once complete. An existing archive is kept as a backup,
/// unless a backup already exists.
pub fn repack_directory<P1, P2>(
    directory: P1,
    entry_count: EntryCount,
    output_root: P2,
) -> Result<PathBuf>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let directory = directory.as_ref();
    let output_path = output_root.as_ref().join(format!(
        "{}.{}",
        name_without_extensions(directory)?,
        ARCHIVE_EXTENSION
    ));

    let file_paths = list_files(directory)?;
    log::info!("{} files found", file_paths.len());

    let temporary_path = with_extension_suffix(&output_path, TEMPORARY_EXTENSION);
    if let Err(err) = write_archive(&temporary_path, entry_count, file_paths) {
        let _ = fs::remove_file(&temporary_path);
        return Err(err);
    }
    backup_existing_file(&output_path)?;
    fs::rename(&temporary_path, &output_path).with_context(|| {
        format!(
            "Failed to move archive to '{}'",
            output_path.to_string_lossy()
        )
    })?;
    log::info!("Archive written at '{}'", output_path.to_string_lossy());
    Ok(output_path)
}

fn write_archive(
    archive_path: &Path,
    entry_count: EntryCount,
    file_paths: Vec<PathBuf>,
) -> Result<()> {
    let output_file = File::create(archive_path)?;
    let mut archive_builder = FsdataArchiveBuilder::create(output_file, entry_count)?;
    for file_path in file_paths {
        log::trace!("'{}' will be PACKED", file_path.to_string_lossy());
        archive_builder.append_file_from_path(file_path, SlotId::Unresolved);
    }
    archive_builder
        .finish()
        .context("Failed to write archive")
}

/// Appends `.<extension>` to the full file name of `path`.
fn with_extension_suffix(path: &Path, extension: &str) -> PathBuf {
    let mut result = path.as_os_str().to_owned();
    result.push(".");
    result.push(extension);
    PathBuf::from(result)
}

fn list_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(directory)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter();
    let mut file_paths = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            file_paths.push(entry.into_path());
        }
    }
    Ok(file_paths)
}

fn backup_existing_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let backup_path = with_extension_suffix(path, BACKUP_EXTENSION);
    if backup_path.exists() {
        log::warn!(
            "'{}' already exists, '{}' will be overwritten",
            backup_path.to_string_lossy(),
            path.to_string_lossy()
        );
        return Ok(());
    }
    log::info!("Backing up to '{}'", backup_path.to_string_lossy());
    fs::rename(path, &backup_path).context("Failed to back up existing archive")?;
    Ok(())
}

fn name_without_extensions(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Invalid path: '{}'", path.to_string_lossy()))?
        .to_string_lossy();
    match file_name.split('.').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(anyhow!("Invalid name: '{}'", file_name)),
    }
}
