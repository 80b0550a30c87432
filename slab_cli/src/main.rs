//! SlabTally - slab measurement and dispatch tracking for stone yards
//!
//! A CLI for recording measured slabs at the gantry, finalizing dispatches,
//! and producing reports and printable PDF documents.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = commands::execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
