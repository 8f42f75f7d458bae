use std::{
    fmt::Write as _,
    fs,
    io::{self, Write as _},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use log::{debug, trace};
use mincc::{codegen, lexer, parser, util::fmt::tree, CompileError};

use crate::{
    args::{Args, Emit},
    target::DEFAULT_TARGET,
};

mod args;
mod target;

#[derive(Debug, thiserror::Error)]
enum Error {
    /// A rendered diagnostic.
    #[error("{0}")]
    Compile(String),
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
    #[error("no default target for this host, pass --target")]
    NoTarget,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level_filter())
        .parse_env("RUST_LOG")
        .init();
    trace!("starting mincc with args: {args:?}");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let src = match (&args.source, &args.file) {
        (Some(source), _) => source.clone(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.clone(),
            source,
        })?,
        (None, None) => unreachable!("clap requires a source"),
    };
    debug!("compiling {} bytes of source", src.len());

    let out = emit(args, &src)?;
    match &args.output {
        Some(path) => fs::write(path, out)?,
        None => io::stdout().lock().write_all(out.as_bytes())?,
    }
    Ok(())
}

/// Runs the pipeline up to the requested stage and renders its result.
fn emit(args: &Args, src: &str) -> Result<String, Error> {
    let report = |error: CompileError| Error::Compile(error.report(src).trim_end().to_owned());

    let tokens = lexer::lex_in_new(src).map_err(|e| report(e.into()))?;
    if args.emit == Emit::Tokens {
        let mut out = String::with_capacity(32 * tokens.len());
        for token in &tokens {
            writeln!(out, "{token:?}").expect("writing to a string is infallible");
        }
        return Ok(out);
    }

    let program = parser::parse_program(&tokens).map_err(|e| report(e.into()))?;
    if args.emit == Emit::Ast {
        return Ok(tree::print_program_string(&program));
    }

    let target = args.target.unwrap_or(DEFAULT_TARGET);
    let target = target.codegen().ok_or(Error::NoTarget)?;
    debug!("generating code for {target}");
    codegen::generate(target, &program).map_err(|e| report(e.into()))
}
