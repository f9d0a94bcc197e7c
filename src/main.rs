mod commands;

use crate::commands::Asynclog;
use clap::Parser;
use std::{io::IsTerminal, process::ExitCode};

fn main() -> ExitCode {
    let cli = Asynclog::parse();

    match cli.run() {
        Err(err) => {
            let root = err.root_cause();
            let (red, reset) = if std::io::stderr().is_terminal() {
                ("\x1b[31m", "\x1b[0m")
            } else {
                ("", "")
            };

            eprintln!("{}Error: {}", red, err);
            eprintln!();
            eprintln!("Caused by:");
            eprintln!("  {}{}", root, reset);
            ExitCode::from(1)
        }
        Ok(_) => ExitCode::from(0),
    }
}
