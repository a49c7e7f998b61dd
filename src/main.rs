//Enable more cargo lint tests
#![warn(rust_2018_idioms)]
#![warn(clippy::disallowed_types)]

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use bzip2_engine::tools::cli::{BzOpts, Mode};
use bzip2_engine::{compress_with, decompress, CompressOptions, Error, Result};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> ExitCode {
    let opts = BzOpts::parse();

    // Available log levels are Error, Warn, Info, Debug, Trace
    if TermLogger::init(
        opts.log_level(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("bzip2-engine: logging is unavailable");
    }

    let options = match opts.compress_options() {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(1);
        }
    };

    //----- Figure how what we need to do and go do it
    let mut failed = false;
    if opts.files.is_empty() {
        if let Err(e) = process_stdin(&opts, &options) {
            error!("(stdin): {}", e);
            failed = true;
        }
    }
    for name in &opts.files {
        match process_file(&opts, &options, Path::new(name)) {
            Ok(()) => info!("{}: done", name),
            Err(e) => {
                error!("{}: {}", name, e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

/// Filter standard input to standard output.
fn process_stdin(opts: &BzOpts, options: &CompressOptions) -> Result<()> {
    let input = io::stdin().lock();
    let output = io::stdout().lock();
    match opts.mode() {
        Mode::Zip => compress_with(input, output, options).map(|_| ()),
        Mode::Unzip => decompress(input, output).map(|_| ()),
        Mode::Test => decompress(input, io::sink()).map(|_| ()),
    }
}

/// Compress, decompress or test one file.
fn process_file(opts: &BzOpts, options: &CompressOptions, path: &Path) -> Result<()> {
    let mode = opts.mode();
    let input = BufReader::new(File::open(path)?);

    if mode == Mode::Test {
        let stats = decompress(input, io::sink())?;
        info!(
            "{}: ok, {} blocks, {} bytes",
            path.display(),
            stats.blocks_read,
            stats.bytes_out
        );
        return Ok(());
    }

    if opts.stdout {
        let output = io::stdout().lock();
        return match mode {
            Mode::Zip => compress_with(input, output, options).map(|_| ()),
            _ => decompress(input, output).map(|_| ()),
        };
    }

    let target = output_name(path, mode);
    if target.exists() && !opts.force {
        return Err(Error::InvalidConfiguration(format!(
            "output file {} already exists (use -f to overwrite)",
            target.display()
        )));
    }

    let output = BufWriter::new(File::create(&target)?);
    let result = match mode {
        Mode::Zip => compress_with(input, output, options).map(|stats| {
            info!(
                "{}: {} -> {} bytes in {} blocks",
                path.display(),
                stats.bytes_in,
                stats.bytes_out,
                stats.blocks_written
            )
        }),
        _ => decompress(input, output).map(|stats| {
            info!(
                "{}: {} -> {} bytes",
                path.display(),
                stats.bytes_in,
                stats.bytes_out
            )
        }),
    };

    match result {
        Ok(()) => {
            if !opts.keep {
                fs::remove_file(path)?;
            }
            Ok(())
        }
        Err(e) => {
            // Don't leave a partial output behind.
            if let Err(rm) = fs::remove_file(&target) {
                warn!("could not remove {}: {}", target.display(), rm);
            }
            Err(e)
        }
    }
}

/// Name of the file to write: add .bz2 when compressing, strip it when decompressing.
fn output_name(path: &Path, mode: Mode) -> PathBuf {
    let name = path.to_string_lossy();
    if mode == Mode::Zip {
        return PathBuf::from(format!("{}.bz2", name));
    }
    for (suffix, replacement) in [(".bz2", ""), (".bz", ""), (".tbz2", ".tar"), (".tbz", ".tar")] {
        if let Some(stem) = name.strip_suffix(suffix) {
            if !stem.is_empty() {
                return PathBuf::from(format!("{}{}", stem, replacement));
            }
        }
    }
    PathBuf::from(format!("{}.out", name))
}
