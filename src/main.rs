//! CLI entry point for the Galactic kinematics analysis

use clap::Parser;
use galkin::io::cli::{Cli, CommandRunner};

fn main() -> galkin::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut runner = CommandRunner::new(cli);
    runner.run()
}
