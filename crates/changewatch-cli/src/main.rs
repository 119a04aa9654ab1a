//! Entry point for the `changewatch` binary.

use std::process::ExitCode;

use changewatch::{redact, run, AppError, Cli, Exit};
use changewatch_config::Environment;
use changewatch_log::LogConfig;
use clap::Parser;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("changewatch: failed to create Tokio runtime: {e}");
            return Exit::GeneralError.into();
        }
    };

    match runtime.block_on(start(cli)) {
        Ok(()) => Exit::Success.into(),
        Err(e) => {
            if tracing::dispatcher::has_been_set() {
                error!("{e}");
            } else {
                eprintln!("changewatch: {e}");
            }
            e.exit_code()
        }
    }
}

async fn start(cli: Cli) -> Result<(), AppError> {
    Environment::init()?;
    changewatch_log::init(cli.log_config(LogConfig::from_env()))?;

    let config = cli.config_loader().load()?;

    if cli.check_config {
        print!("{}", redact::render(&config)?);
        return Ok(());
    }

    info!(
        version = %config.version,
        build = env!("CARGO_PKG_VERSION"),
        source = %config.app_namespace(),
        audit = %config.audit_namespace(),
        "starting changewatch"
    );

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for interrupt: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = run(&config) => result,
        () = interrupted => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}
