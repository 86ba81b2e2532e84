#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod logging;
mod run;

use clap::Parser;
use cli::{Cli, Commands, JSON_MODE, flush_logs};
use rover_core::RoverError;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let result = real_main(cli);
    if let Err(e) = result {
        if Cli::json_mode() {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        tracing::error!(error = %e, "rover exited with error");
        flush_logs();
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
    flush_logs();
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let _ = color_eyre::install();

    let cfg = rover_config::load_file(&cli.config)
        .map_err(|e| eyre::Report::new(RoverError::Config(format!("{e:#}"))))?;

    logging::init(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run { duration_ms, sim } => run::run_rover(&cfg, duration_ms, sim, cli.json),
        Commands::SelfCheck { samples, sim } => run::self_check(&cfg, samples, sim, cli.json),
        Commands::Health => run::health(&cfg, &cli.config),
    }
}
