//! `relay` binary: run the gateway or chat with one from the terminal.

mod terminal;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_client::{ChatSession, ClientError, GatewayClient, SubmitOutcome};
use relay_core::{Gateway, GatewayConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::{info, warn};

use terminal::TerminalSink;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Streaming support relay: gateway server and terminal chat client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway
    Serve {
        /// Address to listen on (overrides RELAY_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// FAQ JSON file used for grounding (overrides RELAY_FAQ_PATH)
        #[arg(long)]
        faq: Option<PathBuf>,
    },
    /// Chat with a running gateway
    Chat {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
    },
}

/// Loads `.env` from the crate dir, then from the working directory.
fn load_env() {
    let _ = dotenvy::from_path(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"),
    );
    let _ = dotenvy::dotenv();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    relay_core::init_observability();

    match Cli::parse().command {
        Commands::Serve { bind, faq } => serve(bind, faq).await,
        Commands::Chat { url } => chat(&url).await,
    }
}

async fn serve(bind: Option<SocketAddr>, faq: Option<PathBuf>) -> Result<()> {
    let mut config = GatewayConfig::from_env().context("invalid gateway configuration")?;
    if let Some(bind) = bind {
        config = config.bind(bind);
    }
    if faq.is_some() {
        config = config.faq_path(faq);
    }

    let gateway = Gateway::from_config(&config).context("failed to build gateway")?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(model = %config.upstream.model, "starting support relay");

    relay_core::serve(listener, Arc::new(gateway), shutdown_signal())
        .await
        .context("server error")?;
    info!("support relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; serving until killed");
        std::future::pending::<()>().await;
    }
}

async fn chat(url: &str) -> Result<()> {
    let client = GatewayClient::new(url)?;
    eprintln!("chatting via {}; /clear resets the conversation, /quit exits", client.chat_url());
    let session = ChatSession::new(client);
    let mut sink = TerminalSink::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/clear" => {
                session.clear();
                eprintln!("conversation cleared");
            }
            input => match session.submit(input, &mut sink).await {
                Ok(SubmitOutcome::Errored { .. }) => warn!("answer failed"),
                Ok(_) => {}
                Err(ClientError::Busy) => eprintln!("still answering, please wait"),
                Err(e) => return Err(e.into()),
            },
        }
    }
    Ok(())
}
