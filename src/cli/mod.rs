//! Command-line entry points.

pub mod doctor;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::RngCore;

use crate::agent::Agent;
use crate::channels::web::{GatewayState, start_server};
use crate::channels::{Channel, ReplChannel};
use crate::config::{AgentConfig, Config, LlmConfig, LocalConfig, LoggingConfig};
use crate::llm::{GeminiConfig, GeminiResponder};

pub use doctor::{DoctorSubcommand, run_doctor_command};

#[derive(Parser, Debug)]
#[command(name = "aria", version, about = "Aria, an onchain assistant for XMTP chats")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chat with Aria in the terminal (default)
    Run {
        /// Send a single message and exit
        #[arg(short, long)]
        message: Option<String>,

        /// Wallet address to chat as; payments are drawn from it
        #[arg(long, env = "ARIA_REPL_ADDRESS")]
        address: Option<String>,
    },

    /// Serve the frame, its webhook and the transport bridge
    Serve {
        /// Overrides ARIA_GATEWAY_HOST
        #[arg(long)]
        host: Option<String>,

        /// Overrides ARIA_GATEWAY_PORT
        #[arg(long)]
        port: Option<u16>,
    },

    /// Check configuration and external services
    Doctor {
        #[command(subcommand)]
        command: Option<DoctorSubcommand>,

        /// Exit with an error when any check fails
        #[arg(long)]
        strict: bool,
    },

    /// Write ~/.aria/.env with freshly generated messaging keys
    Init {
        /// Target file instead of ~/.aria/.env
        #[arg(long)]
        path: Option<PathBuf>,

        /// XMTP network: dev or production
        #[arg(long, default_value = "dev")]
        env: String,

        /// Gemini API key to store alongside the generated keys
        #[arg(long)]
        gemini_api_key: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Install the global subscriber: JSON lines in production, pretty
/// otherwise. `RUST_LOG` overrides `LOG_LEVEL`.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.as_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {e}");
    }
}

/// Agent with a Gemini responder when an API key is configured.
pub fn build_agent(agent: AgentConfig, llm: Option<&LlmConfig>) -> Agent {
    let base = Agent::new(agent);
    match llm {
        Some(llm) => {
            tracing::info!(model = %llm.model, "Gemini responder enabled");
            base.with_responder(Arc::new(GeminiResponder::new(GeminiConfig::from(llm))))
        }
        None => {
            tracing::info!("GEMINI_API_KEY not set, free text gets canned replies");
            base
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Run {
        message: None,
        address: None,
    }) {
        Command::Run { message, address } => run_repl(message, address).await,
        Command::Serve { host, port } => run_serve(host, port).await,
        Command::Doctor { command, strict } => run_doctor_command(command, strict).await,
        Command::Init {
            path,
            env,
            gemini_api_key,
            force,
        } => {
            let path = path.unwrap_or_else(crate::bootstrap::aria_env_path);
            run_init(&path, &env, gemini_api_key.as_deref(), force)?;
            println!("Wrote {}", path.display());
            println!("Run `aria doctor` to verify the configuration.");
            Ok(())
        }
    }
}

async fn run_repl(message: Option<String>, address: Option<String>) -> anyhow::Result<()> {
    let local = LocalConfig::from_env().context("invalid configuration")?;
    let agent = build_agent(local.agent, local.llm.as_ref());

    let mut repl = match message {
        Some(message) => ReplChannel::with_message(message),
        None => ReplChannel::new(),
    };
    if let Some(address) = address {
        anyhow::ensure!(
            crate::wallet::is_valid_address(&address),
            "--address must be a 0x-prefixed 40-hex address"
        );
        repl = repl.with_sender_address(address);
    }

    let stream = repl.start().await?;
    agent
        .run(stream, &repl, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    repl.shutdown().await?;
    Ok(())
}

async fn run_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let gateway = &config.channels.gateway;
    let host = host.unwrap_or_else(|| gateway.host.clone());
    let port = port.unwrap_or(gateway.port);

    let addr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .with_context(|| format!("cannot resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("no address for {host}:{port}"))?;

    tracing::info!(
        xmtp_env = config.xmtp.env.as_str(),
        chain_id = config.chain.chain_id,
        "Starting Aria gateway"
    );

    let agent = Arc::new(build_agent(config.agent.clone(), Some(&config.llm)));
    let sweeper = Arc::clone(agent.limiter()).spawn_sweeper(config.agent.rate_limit_sweep_interval);

    let state = Arc::new(GatewayState::new(
        agent,
        config.channels.frame.clone(),
        gateway.auth_token.clone(),
    ));
    let bound = start_server(addr, Arc::clone(&state)).await?;
    println!("Aria gateway listening on http://{bound}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("Shutdown requested");
    state.shutdown().await;
    sweeper.abort();
    Ok(())
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Write a dotenv file with a new wallet key and database encryption key.
pub fn run_init(
    path: &Path,
    xmtp_env: &str,
    gemini_api_key: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let xmtp_env = crate::config::XmtpEnv::parse(xmtp_env, "--env")?;
    anyhow::ensure!(
        force || !path.exists(),
        "{} already exists; pass --force to overwrite",
        path.display()
    );

    let wallet_key = format!("0x{}", random_hex(32));
    let db_key = random_hex(32);
    let mut vars = vec![
        ("XMTP_WALLET_KEY", wallet_key.as_str()),
        ("XMTP_DB_ENCRYPTION_KEY", db_key.as_str()),
        ("XMTP_ENV", xmtp_env.as_str()),
    ];
    if let Some(key) = gemini_api_key {
        vars.push(("GEMINI_API_KEY", key));
    }

    crate::bootstrap::save_env_file(path, &vars)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
