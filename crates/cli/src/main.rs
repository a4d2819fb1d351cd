// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tmx: CLI client for the ttyd-mux daemon.

mod client;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use client::ApiClient;
use tmx_core::Config;

#[derive(Parser)]
#[command(name = "tmx", about = "Manage ttyd-mux terminal sessions", version)]
struct Cli {
    /// Config file (default: ttyd-mux.yml, or TTYD_MUX_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session for a directory
    Start {
        /// Working directory for the session
        dir: PathBuf,
        /// Session name (derived from the directory when omitted)
        #[arg(long)]
        name: Option<String>,
        /// Explicit port for the child terminal server
        #[arg(long)]
        port: Option<u16>,
    },
    /// Stop a session
    Stop {
        name: String,
        /// Also kill the backing tmux session
        #[arg(long)]
        kill_tmux: bool,
    },
    /// List live sessions
    Ls,
    /// Show daemon status
    Status,
    /// Create a share link for a session
    Share {
        name: String,
        /// Lifetime, e.g. 30m, 1h, 2d
        #[arg(long, default_value = "1h")]
        expires: String,
        /// Allow terminal input through the share
        #[arg(long)]
        writable: bool,
    },
    /// List active share links
    Shares,
    /// Revoke a share token
    Revoke { token: String },
    /// Ask the daemon to shut down
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(|| std::env::var("TTYD_MUX_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("ttyd-mux.yml"));
    let config = Config::load(&config_path)?;
    let api = ApiClient::new(&config);

    match cli.command {
        Command::Start { dir, name, port } => {
            let dir = std::fs::canonicalize(&dir).unwrap_or(dir);
            let mut body = json!({ "dir": dir });
            if let Some(name) = name {
                body["name"] = json!(name);
            }
            if let Some(port) = port {
                body["port"] = json!(port);
            }
            let session: Value = api.post("/sessions", &body).await?;
            println!(
                "started {} on port {} ({})",
                field(&session, "name"),
                session["port"],
                field(&session, "path"),
            );
        }
        Command::Stop { name, kill_tmux } => {
            let path = format!("/sessions/{name}?killTmux={kill_tmux}");
            let _: Value = api.delete(&path).await?;
            println!("stopped {name}");
        }
        Command::Ls => {
            let sessions: Vec<Value> = api.get("/sessions").await?;
            if sessions.is_empty() {
                println!("no live sessions");
            }
            for s in sessions {
                println!(
                    "{:<20} port {:<6} {}",
                    field(&s, "name"),
                    s["port"],
                    field(&s, "dir"),
                );
            }
        }
        Command::Status => {
            let status: Value = api.get("/status").await?;
            match status.get("daemon").filter(|d| !d.is_null()) {
                Some(daemon) => println!(
                    "daemon pid {} on port {}",
                    daemon["pid"], daemon["listen_port"]
                ),
                None => println!("daemon identity not recorded"),
            }
            println!(
                "{} live session(s), version {}",
                status["sessions"].as_array().map_or(0, Vec::len),
                field(&status, "version"),
            );
        }
        Command::Share {
            name,
            expires,
            writable,
        } => {
            let body = json!({
                "sessionName": name,
                "expiresIn": expires,
                "readOnly": !writable,
            });
            let share: Value = api.post("/shares", &body).await?;
            println!("{}", field(&share, "path"));
        }
        Command::Shares => {
            let shares: Vec<Value> = api.get("/shares").await?;
            if shares.is_empty() {
                println!("no active shares");
            }
            for s in shares {
                println!(
                    "{:<16} expires {} {}",
                    field(&s, "sessionName"),
                    field(&s, "expiresAt"),
                    field(&s, "path"),
                );
            }
        }
        Command::Revoke { token } => {
            let _: Value = api.delete(&format!("/shares/{token}")).await?;
            println!("revoked");
        }
        Command::Shutdown => {
            let _: Value = api.post("/shutdown", &json!({})).await?;
            println!("daemon shutting down");
        }
    }
    Ok(())
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("?")
}
