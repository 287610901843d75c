#[cfg(not(unix))]
compile_error!("Only unix platforms are currently supported");

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use ferry::{
    cli::{Cli, Parameters, USAGE},
    controller::{self, Ferry},
};
use ferry_common::{logging, tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = logging::init();

    // Usage and startup failures exit with 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            println!("{USAGE}");
            tracing::error!("{err}");
            return ExitCode::SUCCESS;
        }
    };

    let parameters = match Parameters::try_from(&cli) {
        Ok(parameters) => parameters,
        Err(err) => {
            println!("{USAGE}");
            tracing::error!("{err}");
            return ExitCode::SUCCESS;
        }
    };

    let ferry = match Ferry::init(&parameters).await {
        Ok(ferry) => ferry,
        Err(err) => {
            tracing::error!("Error while initializing context: {err:#}");
            return ExitCode::SUCCESS;
        }
    };

    let outcome = ferry.run().await;

    match &outcome {
        Ok(termination) => tracing::info!("Delivery loop stopped: {termination}"),
        Err(err) => tracing::error!("{err:#}"),
    }

    if controller::is_success(&outcome) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
