use clap::Parser;
use triggerscan::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
