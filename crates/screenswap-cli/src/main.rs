// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Screenswap: command-line green-screen compositor
//
// Entry point. Initialises logging, parses arguments, runs the subcommand,
// and maps failures to human-readable messages and exit codes.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use screenswap_core::human_errors::{ErrorCategory, humanize_error};

use cli::Cli;
use commands::Outcome;

/// Exit code when a batch finished but some items failed.
const EXIT_BATCH_PARTIAL: u8 = 5;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version requests are not failures.
            let code = if err.use_stderr() {
                ErrorCategory::InvalidInput.exit_code()
            } else {
                0
            };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    tracing::debug!(command = ?cli.command, "Screenswap starting");

    let result = cli::resolve_config(&cli).and_then(|config| commands::run(&cli.command, config));
    match result {
        Ok(Outcome::Json(json)) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Batch { json, failed }) => {
            println!("{json}");
            if failed > 0 {
                tracing::warn!(failed, "Batch finished with failures");
                ExitCode::from(EXIT_BATCH_PARTIAL)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            let human = humanize_error(&err);
            tracing::error!(error = %err, "Command failed");
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::from(human.category.exit_code())
        }
    }
}
