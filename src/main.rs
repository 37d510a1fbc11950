use clap::Parser;
use marketledger::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
