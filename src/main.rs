//! The `patience` binary: parses the CLI surface, builds a session from
//! it, and drives the runner to completion.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use patience_core::clock::SystemClock;
use patience_core::config::build_session;
use patience_core::effectiveness::EffectivenessTracker;
use patience_core::runner::Runner;
use patience_core::PatienceError;

use patience_core::cli::Cli;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CONFIGURATION_ERROR: i32 = 1;
const EXIT_SESSION_TIMEOUT: i32 = 2;
const EXIT_SCHEDULE_INFEASIBLE: i32 = 3;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug = cli.strategy.common().debug;

    let filter = if debug {
        EnvFilter::new("patience=debug,patience_core=debug")
    } else {
        EnvFilter::new("patience=info,patience_core=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("patience: {e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32, PatienceError> {
    let clock = Arc::new(SystemClock);
    let effectiveness = Arc::new(EffectivenessTracker::new(clock.clone()));
    let config = build_session(&cli.strategy)?;
    let runner = Runner::new(config, clock, effectiveness);
    let outcome = runner.run().await?;

    if outcome.succeeded {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(outcome.exit_code)
    }
}

fn exit_code_for_error(error: &PatienceError) -> i32 {
    match error {
        PatienceError::Configuration(_) | PatienceError::ChildExec(_) => EXIT_CONFIGURATION_ERROR,
        PatienceError::SessionTimeout { .. } => EXIT_SESSION_TIMEOUT,
        PatienceError::ScheduleInfeasible => EXIT_SCHEDULE_INFEASIBLE,
    }
}
