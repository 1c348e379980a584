use clap::Parser;
use turtlescan::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
