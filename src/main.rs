/*!
 * Philosopher - Main Entry Point
 *
 * One process per philosopher. Launch `seat 0` first (it sets the
 * table), then `seat 1` through `seat 4`; or let `table` do that.
 */

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use dining_table::cli::{self, Cli};
use dining_table::init_tracing;

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(
                philosopher = ?err.philosopher(),
                error = %err,
                "philosopher exiting on fatal error"
            );
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
    }
}
