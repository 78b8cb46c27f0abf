mod commands;
mod profiles;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, Context, Result};
use commands::{repack_directory, unpack_archive};
use fsdata::EntryCount;
use log::LevelFilter;
use profiles::{game_type_from_path, parse_game_profiles, GameProfiles};
use simple_logger::SimpleLogger;
use structopt::StructOpt;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

const USAGE_NOTICE: &str = "\
Naming:
    Archives must keep their original name to be unpacked (e.g. AC3DATA.BIN).
    Directories must be named after the archive, without extensions, to be
    repacked (e.g. AC3DATA).

IDs:
    A file whose name starts with digits is stored at that ID. Other files get
    their index in the directory listing. IDs must be lower than the entry
    count of the archive.

Built-in profiles (replaced by --profiles, listed with --verbose):
    ERDATA.BIN:   4096
    AC2DATA.BIN:  4096
    AC25DATA.BIN: 8192
    AC3DATA.BIN:  8192";

#[derive(Debug, StructOpt)]
#[structopt(
    name = PKG_NAME,
    about = PKG_DESCRIPTION,
    author = PKG_AUTHORS,
    after_help = USAGE_NOTICE
)]
struct Opt {
    #[structopt(short, long, help = "Enable verbose logging")]
    verbose: bool,
    #[structopt(
        parse(from_os_str),
        long,
        help = "Path to a YAML file mapping game types to entry counts"
    )]
    profiles: Option<PathBuf>,
    #[structopt(
        short,
        long,
        help = "Entry count to use instead of the one of the detected game type"
    )]
    entry_count: Option<u32>,
    #[structopt(
        parse(from_os_str),
        short,
        long,
        help = "Path to the directory where outputs are written (default: next to each input)"
    )]
    output_directory: Option<PathBuf>,
    #[structopt(
        parse(from_os_str),
        required = true,
        help = "Archives to unpack or directories to repack"
    )]
    paths: Vec<PathBuf>,
}

fn run(cli_args: Opt) -> Result<()> {
    let profiles = match &cli_args.profiles {
        Some(profiles_path) => parse_game_profiles(profiles_path).with_context(|| {
            format!(
                "Failed to load profiles from '{}'",
                profiles_path.to_string_lossy()
            )
        })?,
        None => GameProfiles::default(),
    };
    log::debug!("Entry counts by archive:\n{}", profiles);
    let entry_count = cli_args.entry_count.map(EntryCount::new).transpose()?;

    let mut failure_count = 0;
    for path in &cli_args.paths {
        let result = process_path(
            path,
            &profiles,
            entry_count,
            cli_args.output_directory.as_deref(),
        );
        if let Err(err) = result {
            // Keep going with the other paths
            log::error!("{}: {:#}", path.to_string_lossy(), err);
            failure_count += 1;
        }
    }

    log::info!("Finished.");
    if failure_count > 0 {
        return Err(anyhow!(
            "{} of {} paths could not be processed",
            failure_count,
            cli_args.paths.len()
        ));
    }
    Ok(())
}

fn process_path(
    path: &Path,
    profiles: &GameProfiles,
    entry_count: Option<EntryCount>,
    output_directory: Option<&Path>,
) -> Result<()> {
    if !path.is_file() && !path.is_dir() {
        log::warn!("Argument not supported: '{}'", path.to_string_lossy());
        return Ok(());
    }

    let entry_count = match entry_count {
        Some(entry_count) => entry_count,
        None => profiles.entry_count(&game_type_from_path(path)?)?,
    };
    let output_root = match output_directory {
        Some(output_directory) => output_directory.to_path_buf(),
        None => parent_directory(path)?,
    };

    if path.is_file() {
        log::info!("Unpacking '{}'", path.to_string_lossy());
        unpack_archive(path, entry_count, output_root)
            .context("Failed to unpack archive")?;
    } else {
        log::info!("Repacking '{}'", path.to_string_lossy());
        repack_directory(path, entry_count, output_root)
            .context("Failed to repack directory")?;
    }
    Ok(())
}

fn parent_directory(path: &Path) -> Result<PathBuf> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Invalid path: '{}'", path.to_string_lossy()))?;
    path.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("No parent directory: '{}'", path.to_string_lossy()))
}

fn main() {
    const SUCCESS_EXIT_CODE: i32 = 0;
    const FAILURE_EXIT_CODE: i32 = 1;

    // Parse CLI arguments
    let cli_args = Opt::from_args();
    // Initialize the logger
    if let Err(err) = init_logger(cli_args.verbose) {
        eprintln!("Failed to initialize the logger: {}", err);
        process::exit(FAILURE_EXIT_CODE);
    }

    // Run the actual program
    let result = run(cli_args);
    match result {
        Ok(()) => {
            process::exit(SUCCESS_EXIT_CODE);
        }
        Err(err) => {
            log::error!("{:#}", err);
            process::exit(FAILURE_EXIT_CODE);
        }
    }
}

fn init_logger(verbose: bool) -> Result<()> {
    let level_filter = if verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };

    SimpleLogger::new()
        .with_level(LevelFilter::Off)
        .with_module_level(PKG_NAME, level_filter)
        .with_module_level("fsdata", level_filter)
        .init()?;
    Ok(())
}
