use bevy::app::App;
use bevy::log::{Level, LogPlugin, error, info, warn};
use clap::Parser;
use galdyn::cli::{self, Args};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_solvers {
        cli::handle_list_solvers();
        return ExitCode::SUCCESS;
    }

    if args.list_potentials {
        cli::handle_list_potentials();
        return ExitCode::SUCCESS;
    }

    let config = match cli::load_and_apply_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let level = config.logging.level.parse::<Level>();
    let defaults = LogPlugin::default();
    let filter = if config.logging.filter.is_empty() {
        defaults.filter.clone()
    } else {
        config.logging.filter.clone()
    };

    // Headless app: only the log subscriber is installed.
    let mut app = App::new();
    app.add_plugins(LogPlugin {
        level: *level.as_ref().unwrap_or(&Level::INFO),
        filter,
        ..defaults
    });
    app.finish();
    app.cleanup();

    if level.is_err() {
        warn!(
            "Unknown log level '{}', using info",
            config.logging.level
        );
    }
    info!(
        "galdyn {} (built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_DATE")
    );

    match cli::integrate_orbit(&config).and_then(|orbit| cli::print_summary(&orbit)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
