use std::fmt::{Display, Formatter};

use clap::Parser;
use log::LevelFilter;

use crate::compression::options::{BlockSize, CompressOptions, DEFAULT_ITERATIONS};
use crate::error::Result;

/// Zip, Unzip, Test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Zip,
    Unzip,
    Test,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Command Line Interpretation - uses external CLAP crate.
#[derive(Parser, Debug)]
#[clap(
    name = "bzip2-engine",
    version,
    about = "A block-sorting file compressor, bzip2 compatible",
    long_about = None)]
pub struct BzOpts {
    /// Files to process. With no files, read standard input and write standard output
    #[clap()]
    pub files: Vec<String>,

    /// Compress (the default unless the program is asked to decompress or test)
    #[clap(short = 'z', long = "compress")]
    pub compress: bool,

    /// Decompress
    #[clap(short = 'd', long = "decompress", conflicts_with_all = &["compress", "test"])]
    pub decompress: bool,

    /// Test compressed file integrity
    #[clap(short = 't', long = "test", conflicts_with = "compress")]
    pub test: bool,

    /// Keep (don't delete) input files
    #[clap(short = 'k', long = "keep")]
    pub keep: bool,

    /// Overwrite existing output files
    #[clap(short = 'f', long = "force")]
    pub force: bool,

    /// Send output to standard out
    #[clap(short = 'c', long = "stdout")]
    pub stdout: bool,

    /// Suppress noncritical messages
    #[clap(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Be verbose. Repeat for more detail: -v shows each file, -vvvv is chatty
    #[clap(short = 'v', long = "verbose", parse(from_occurrences))]
    pub verbose: usize,

    /// 1..9 - Set the block size from 100-900k. 900k is the default
    #[clap(short = 'b', long = "block-size")]
    pub block_size: Option<u32>,

    /// Alias for 100k blocks
    #[clap(long = "fast", conflicts_with_all = &["block-size", "best"])]
    pub fast: bool,

    /// Alias for 900k blocks
    #[clap(long = "best", conflicts_with = "block-size")]
    pub best: bool,

    /// Huffman table refinement passes per block
    #[clap(short = 'i', long = "iterations", default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: usize,

    /// Worker threads (defaults to one per core)
    #[clap(long = "threads")]
    pub threads: Option<usize>,
}

impl BzOpts {
    /// What we were asked to do.
    pub fn mode(&self) -> Mode {
        if self.decompress {
            Mode::Unzip
        } else if self.test {
            Mode::Test
        } else {
            Mode::Zip
        }
    }

    /// Map -q and -v counts to a log level.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 | 3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// The block size requested, 900k unless told otherwise.
    pub fn block_size(&self) -> Result<BlockSize> {
        if self.fast {
            return Ok(BlockSize::FASTEST);
        }
        match self.block_size {
            Some(factor) => BlockSize::new(factor),
            None => Ok(BlockSize::BEST),
        }
    }

    /// Build validated compression options from the command line.
    pub fn compress_options(&self) -> Result<CompressOptions> {
        let options = CompressOptions::new(self.block_size()?).with_iterations(self.iterations)?;
        match self.threads {
            Some(threads) => options.with_workers(threads),
            None => Ok(options),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> BzOpts {
        BzOpts::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults_test() {
        let opts = parse(&["bzip2-engine", "file.txt"]);
        assert_eq!(opts.mode(), Mode::Zip);
        assert_eq!(opts.files, vec!["file.txt".to_string()]);
        assert_eq!(opts.block_size().unwrap(), BlockSize::BEST);
        assert_eq!(opts.log_level(), LevelFilter::Warn);
        let options = opts.compress_options().unwrap();
        assert_eq!(options.iterations(), DEFAULT_ITERATIONS);
    }

    #[test]
    fn modes_test() {
        assert_eq!(parse(&["bzip2-engine", "-d", "a.bz2"]).mode(), Mode::Unzip);
        assert_eq!(parse(&["bzip2-engine", "-t", "a.bz2"]).mode(), Mode::Test);
        assert_eq!(parse(&["bzip2-engine", "-z", "a"]).mode(), Mode::Zip);
        assert!(BzOpts::try_parse_from(["bzip2-engine", "-d", "-z", "a"]).is_err());
    }

    #[test]
    fn block_size_test() {
        assert_eq!(
            parse(&["bzip2-engine", "-b", "3"]).block_size().unwrap(),
            BlockSize::new(3).unwrap()
        );
        assert_eq!(
            parse(&["bzip2-engine", "--fast"]).block_size().unwrap(),
            BlockSize::FASTEST
        );
        assert_eq!(
            parse(&["bzip2-engine", "--best"]).block_size().unwrap(),
            BlockSize::BEST
        );
        assert!(parse(&["bzip2-engine", "-b", "0"]).block_size().is_err());
        assert!(parse(&["bzip2-engine", "-b", "10"]).block_size().is_err());
        assert!(BzOpts::try_parse_from(["bzip2-engine", "-b", "x"]).is_err());
    }

    #[test]
    fn verbosity_test() {
        assert_eq!(parse(&["bzip2-engine", "-v"]).log_level(), LevelFilter::Info);
        assert_eq!(parse(&["bzip2-engine", "-vv"]).log_level(), LevelFilter::Debug);
        assert_eq!(parse(&["bzip2-engine", "-vvvv"]).log_level(), LevelFilter::Trace);
        assert_eq!(parse(&["bzip2-engine", "-q", "-vvvv"]).log_level(), LevelFilter::Error);
    }

    #[test]
    fn verbosity_not_compiled_out_test() {
        // Every level -v can ask for must survive the compile time filter in any profile.
        let loudest = parse(&["bzip2-engine", "-vvvv"]).log_level();
        assert!(loudest <= log::STATIC_MAX_LEVEL);
    }

    #[test]
    fn bad_options_test() {
        assert!(parse(&["bzip2-engine", "-i", "0"]).compress_options().is_err());
        assert!(parse(&["bzip2-engine", "-i", "17"]).compress_options().is_err());
        assert!(parse(&["bzip2-engine", "--threads", "0"]).compress_options().is_err());
        let options = parse(&["bzip2-engine", "-i", "2", "--threads", "3"])
            .compress_options()
            .unwrap();
        assert_eq!(options.iterations(), 2);
        assert_eq!(options.workers(), 3);
    }
}
