use clap::Parser;
use cointrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
