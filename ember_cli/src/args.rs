//! Command-line argument parser.
//!
//! Hand-rolled: the surface is four flags and an optional script path,
//! which does not justify a parser dependency.

use std::path::PathBuf;

/// What the driver should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Interactive command loop on stdin: `ember` with no arguments.
    Repl,
    /// Batch: run the command language from a file: `ember session.gc`.
    Script(PathBuf),
    /// Print help and exit: `ember -h` / `ember --help`.
    PrintHelp,
    /// Print version and exit: `ember -V` / `ember --version`.
    PrintVersion,
}

/// Parsed command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// What to run.
    pub mode: Mode,
    /// `-q`: suppress the banner and help preamble.
    pub quiet: bool,
}

/// Argument parsing failures, reported as usage errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    /// A flag the driver does not know.
    UnknownFlag(String),
    /// More than one script path.
    ExtraArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgsError::UnknownFlag(flag) => write!(f, "unknown flag: {}", flag),
            ArgsError::ExtraArgument(arg) => write!(f, "unexpected argument: {}", arg),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Parse the process arguments (without the program name).
pub fn parse<I>(args: I) -> Result<CliArgs, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = Mode::Repl;
    let mut quiet = false;

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliArgs { mode: Mode::PrintHelp, quiet }),
            "-V" | "--version" => return Ok(CliArgs { mode: Mode::PrintVersion, quiet }),
            "-q" | "--quiet" => quiet = true,
            flag if flag.starts_with('-') => return Err(ArgsError::UnknownFlag(arg)),
            _ => match mode {
                Mode::Repl => mode = Mode::Script(PathBuf::from(arg)),
                _ => return Err(ArgsError::ExtraArgument(arg)),
            },
        }
    }

    Ok(CliArgs { mode, quiet })
}

/// Usage text printed for `-h` and on usage errors.
pub const USAGE: &str = "\
Usage: ember [OPTIONS] [SCRIPT]

Interactive garbage-collection sandbox. With no SCRIPT, reads commands
from stdin; with one, runs the same command language from the file.

Options:
  -q, --quiet      suppress the banner and help preamble
  -h, --help       print this help and exit
  -V, --version    print the version and exit
";
