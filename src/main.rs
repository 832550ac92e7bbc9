//! SMAA T2x - Command-line tool for antialiasing rendered frame sequences

use std::process::ExitCode;

use smaa_t2x::cli;

fn main() -> ExitCode {
    env_logger::init();
    cli::run()
}
