//! elmcheck - type checking for Elm sources

use clap::Parser;
use elmcheck::cli::Cli;
use elmcheck::logger::{self, LogLevel};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(LogLevel::from_verbosity(cli.verbose));

    match cli.run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::FAILURE
        }
    }
}
