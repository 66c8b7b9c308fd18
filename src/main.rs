use clap::Parser;
use gcscan::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
