// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tmxd: the ttyd-mux daemon binary.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tmx_core::Config;

fn main() -> ExitCode {
    let config_path = match parse_args() {
        Ok(path) => path,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let state_dir = match tmx_storage::state_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("tmxd: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = std::fs::create_dir_all(&state_dir) {
        eprintln!("tmxd: cannot create state dir {}: {e}", state_dir.display());
        return ExitCode::FAILURE;
    }

    // Log to a file under the state dir; TMX_LOG controls the filter.
    let appender = tracing_appender::rolling::never(&state_dir, "daemon.log");
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env("TMX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tmxd: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("tmxd: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(tmx_daemon::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "daemon failed");
            eprintln!("tmxd: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `tmxd [--config <path>]`; TTYD_MUX_CONFIG is the fallback.
fn parse_args() -> Result<PathBuf, String> {
    let mut args = std::env::args().skip(1);
    let mut config: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => return Err("tmxd: --config requires a path".to_string()),
            },
            "--help" | "-h" => {
                return Err("usage: tmxd [--config <path>]".to_string());
            }
            other => return Err(format!("tmxd: unknown argument {other}")),
        }
    }
    Ok(config
        .or_else(|| std::env::var("TTYD_MUX_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("ttyd-mux.yml")))
}
