//! Ember: interactive garbage-collection sandbox.

mod args;
mod error;
mod repl;

use args::Mode;
use repl::{RunOptions, Session};

use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match args::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => return error::usage(&e),
    };

    match cli.mode {
        Mode::PrintHelp => {
            print!("{}", args::USAGE);
            ExitCode::from(error::EXIT_SUCCESS)
        }

        Mode::PrintVersion => {
            println!("ember {}", env!("CARGO_PKG_VERSION"));
            ExitCode::from(error::EXIT_SUCCESS)
        }

        Mode::Repl => {
            let mut session = match Session::new() {
                Ok(session) => session,
                Err(e) => return error::fatal(&e),
            };
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            let options = RunOptions {
                banner: !cli.quiet,
                prompt: true,
            };
            match repl::run(&mut session, stdin.lock(), &mut stdout, options) {
                Ok(()) => ExitCode::from(error::EXIT_SUCCESS),
                Err(e) => error::fatal(&e),
            }
        }

        Mode::Script(path) => {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => return error::fatal(&e),
            };
            let mut session = match Session::new() {
                Ok(session) => session,
                Err(e) => return error::fatal(&e),
            };
            let mut stdout = io::stdout();
            let options = RunOptions {
                banner: false,
                prompt: false,
            };
            match repl::run(&mut session, BufReader::new(file), &mut stdout, options) {
                Ok(()) => ExitCode::from(error::EXIT_SUCCESS),
                Err(e) => error::fatal(&e),
            }
        }
    }
}
