//! research-agent
//!
//! Command line entry point and Axum HTTP server for the research agent.
//!
//! ```text
//! research-agent run "Research JAMF and its market position" --transcript
//! research-agent serve --bind 0.0.0.0:3000
//! ```

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::run_log::StdoutRunLogSink;

use crate::config::ServerConfig;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bounded web research agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Research one brief and print the report
    Run {
        /// The research brief
        brief: String,

        /// Also print the full conversation
        #[arg(long)]
        transcript: bool,

        /// Print the raw note blocks after the report
        #[arg(long)]
        notes: bool,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::from_env()?;

    match cli.command {
        Command::Run {
            brief,
            transcript,
            notes,
        } => run_once(&config, &brief, transcript, notes).await,
        Command::Serve { bind } => serve(&config, &bind).await,
    }
}

async fn run_once(config: &ServerConfig, brief: &str, transcript: bool, notes: bool) -> anyhow::Result<()> {
    let state = AppState::from_config(config, Some(Arc::new(StdoutRunLogSink)))?;

    let output = match state.researcher.run(brief).await {
        Ok(output) => output,
        Err(failure) => {
            eprintln!("{}", failure.error.user_message());
            return Err(failure.into());
        }
    };

    if transcript {
        println!("{}", output.conversation.transcript());
    }
    println!("\n===== COMPRESSED RESEARCH =====\n");
    println!("{}", output.compressed_research);
    if notes {
        println!("\n===== RAW NOTES =====\n");
        for block in &output.raw_notes {
            println!("{block}\n");
        }
    }
    Ok(())
}

async fn serve(config: &ServerConfig, bind: &str) -> anyhow::Result<()> {
    let state = AppState::from_config(config, None)?;

    match state.provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to model provider"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Model provider not reachable - research runs will fail");
            tracing::warn!("  Check OPENAI_API_KEY and OPENAI_BASE_URL");
        }
    }

    let app = handlers::router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("research-agent server running on http://{}", bind);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health        - Health check");
    tracing::info!("  POST /api/research  - Run a research brief");
    tracing::info!("  GET  /api/runs      - Recent run logs");

    axum::serve(listener, app).await?;

    Ok(())
}
