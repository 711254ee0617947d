//! # Stagebook
//!
//! The main binary for Stagebook project tracking.
//!
//! This application provides:
//! - HTTP JSON API server (axum-based)
//! - CLI interface for projects, budgets, time and analytics
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │             apps/stagebook (THE BINARY)       │
//! │                                               │
//! │   ┌─────────────┐          ┌─────────────┐    │
//! │   │    CLI      │          │  HTTP API   │    │
//! │   │   (clap)    │          │   (axum)    │    │
//! │   └──────┬──────┘          └──────┬──────┘    │
//! │          └───────────┬────────────┘           │
//! │                      ▼                        │
//! │              ┌────────────────┐               │
//! │              │ stagebook-core │               │
//! │              │  (THE LOGIC)   │               │
//! │              └────────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! stagebook seed
//! stagebook portfolio
//! stagebook burn SB-2401 --stage 3
//! stagebook server --port 8080
//! ```

use clap::Parser;
use stagebook::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // STAGEBOOK_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("STAGEBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stagebook=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ╔═╗╔╦╗╔═╗╔═╗╔═╗╔╗ ╔═╗╔═╗╦╔═
  ╚═╗ ║ ╠═╣║ ╦║╣ ╠╩╗║ ║║ ║╠╩╗
  ╚═╝ ╩ ╩ ╩╚═╝╚═╝╚═╝╚═╝╚═╝╩ ╩

  Stagebook v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
