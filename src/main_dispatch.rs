use poolcast::cli::{self, Cli, Commands};
use poolcast::config::AppConfig;
use poolcast::error::{PoolcastError, Result};
use tracing::{error, warn};

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_from(&cli.config)?;
    if let Some(root) = &cli.root {
        config.storage.root_dir = root.clone();
    }
    config
        .validate()
        .map_err(|errors| PoolcastError::Validation(errors.join("; ")))?;
    Ok(config)
}

/// Run the selected command and return the process exit code
pub(crate) async fn run(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Check { period, exit_code } => {
            // Any failure on this path means "no new period"
            let config = match load_config(cli) {
                Ok(config) => config,
                Err(e) => {
                    crate::main_runtime::init_logging_simple();
                    warn!(error = %e, "configuration unavailable, reporting no new period");
                    return 0;
                }
            };
            crate::main_runtime::init_logging(&config.logging);

            let new_period_code = match exit_code.unwrap_or(config.tracker.new_period_exit_code) {
                code @ (1 | 2) => code,
                other => {
                    warn!(code = other, "exit code must be 1 or 2, using 2");
                    2
                }
            };

            cli::run_check(&config, period.as_deref())
                .await
                .exit_code(new_period_code)
        }
        Commands::Current => {
            crate::main_runtime::init_logging_simple();
            report(async { cli::run_current(&load_config(cli)?).await.map(|_| ()) }.await)
        }
        Commands::Listing { period } => {
            crate::main_runtime::init_logging_simple();
            report(
                async {
                    cli::run_listing(&load_config(cli)?, period.as_deref())
                        .await
                        .map(|_| ())
                }
                .await,
            )
        }
        Commands::Fuse {
            period,
            weighting,
            discount,
        } => {
            let result = load_config(cli).and_then(|config| {
                crate::main_runtime::init_logging(&config.logging);
                cli::run_fuse(&config, period.as_deref(), *weighting, *discount).map(|_| ())
            });
            report(result)
        }
        Commands::Strength { period, as_of } => {
            let result = load_config(cli).and_then(|config| {
                crate::main_runtime::init_logging(&config.logging);
                cli::run_strength(&config, period.as_deref(), *as_of).map(|_| ())
            });
            report(result)
        }
        Commands::Log { limit } => {
            crate::main_runtime::init_logging_simple();
            report(load_config(cli).and_then(|config| cli::show_log(&config, *limit)))
        }
    }
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("\x1b[31m✗ {e}\x1b[0m");
            1
        }
    }
}
