//! Command line arguments of `mincc`.

use std::path::PathBuf;

use log::LevelFilter;

use crate::target::Target;

#[derive(Debug, clap::Parser)]
#[clap(author, version, about = "Compiles a small C subset into x86-64 assembly")]
pub struct Args {
    /// Program text to compile
    #[clap(required_unless_present = "file", conflicts_with = "file")]
    pub source: Option<String>,

    /// Read the program text from a file instead
    #[clap(short, long, value_hint = clap::ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Write the output to a file instead of stdout
    #[clap(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Target to generate code for. Defaults to the host
    #[clap(long, value_enum)]
    pub target: Option<Target>,

    /// Pipeline stage whose result is printed
    #[clap(long, value_enum, default_value_t = Emit::Asm)]
    pub emit: Emit,

    /// Raises the log level, may be repeated. `RUST_LOG` takes precedence
    #[clap(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Emit {
    Asm,
    Tokens,
    Ast,
}

impl Args {
    pub fn log_level_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
