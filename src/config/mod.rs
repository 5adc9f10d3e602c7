//! Configuration for Aria.
//!
//! Everything is read from env vars, after `./.env` and `~/.aria/.env` have
//! been loaded by [`crate::bootstrap`]. Each section resolves itself and
//! reports the offending key on failure.

mod channels;
pub(crate) mod helpers;

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub use self::channels::{AccountAssociation, ChannelsConfig, FrameConfig, GatewayConfig};
use self::helpers::{normalize_variant, optional_env, parse_env, required_env, url_env};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Main configuration for the agent.
#[derive(Debug, Clone)]
pub struct Config {
    pub xmtp: XmtpConfig,
    pub llm: LlmConfig,
    pub chain: ChainConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmtpEnv {
    Dev,
    Production,
}

impl XmtpEnv {
    pub(crate) fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match normalize_variant(value).as_str() {
            "dev" => Ok(Self::Dev),
            "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected 'dev' or 'production', got '{value}'"),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(value: &str, key: &str) -> Result<Self, ConfigError> {
        match normalize_variant(value).as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected 'debug', 'info', 'warn', or 'error', got '{value}'"),
            }),
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Messaging-client credentials. The transport consumes these; the agent
/// core never reads them.
#[derive(Debug, Clone)]
pub struct XmtpConfig {
    pub wallet_key: SecretString,
    pub db_encryption_key: SecretString,
    pub env: XmtpEnv,
}

impl XmtpConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            wallet_key: SecretString::from(required_env("XMTP_WALLET_KEY")?),
            db_encryption_key: SecretString::from(required_env("XMTP_DB_ENCRYPTION_KEY")?),
            env: XmtpEnv::parse(&required_env("XMTP_ENV")?, "XMTP_ENV")?,
        })
    }
}

/// Generative responder settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub gemini_api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let timeout_secs = parse_env::<u64>("ARIA_RESPONDER_TIMEOUT_SECS", "a positive integer")?
            .unwrap_or(30);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ARIA_RESPONDER_TIMEOUT_SECS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            gemini_api_key: SecretString::from(required_env("GEMINI_API_KEY")?),
            model: optional_env("ARIA_GEMINI_MODEL")?
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: url_env("ARIA_GEMINI_BASE_URL")?
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: Option<String>,
}

impl ChainConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            chain_id: parse_env("BASE_CHAIN_ID", "a chain id integer")?
                .unwrap_or(crate::wallet::BASE_MAINNET_CHAIN_ID),
            rpc_url: url_env("BASE_RPC_URL")?,
        })
    }
}

/// Message pipeline tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_sweep_interval: Duration,
    /// Names the agent answers to in group chats.
    pub aliases: Vec<String>,
    /// The agent's own wallet address, for recognizing replies to itself.
    pub agent_address: Option<String>,
    pub chain_id: u64,
    pub attachment_demo_delay: Duration,
    pub responder_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: 5,
            rate_limit_window: Duration::from_millis(15_000),
            rate_limit_sweep_interval: Duration::from_secs(5 * 60),
            aliases: vec!["aria".to_string(), "@aria".to_string()],
            agent_address: None,
            chain_id: crate::wallet::BASE_MAINNET_CHAIN_ID,
            attachment_demo_delay: Duration::from_secs(1),
            responder_timeout: Duration::from_secs(30),
        }
    }
}

impl AgentConfig {
    pub(crate) fn resolve(chain: &ChainConfig, llm_timeout: Duration) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let rate_limit_max_requests =
            parse_env::<u32>("ARIA_RATE_LIMIT_MAX_REQUESTS", "a positive integer")?
                .unwrap_or(defaults.rate_limit_max_requests);
        if rate_limit_max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ARIA_RATE_LIMIT_MAX_REQUESTS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let window_ms = parse_env::<u64>("ARIA_RATE_LIMIT_WINDOW_MS", "a positive integer")?
            .unwrap_or(15_000);
        if window_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ARIA_RATE_LIMIT_WINDOW_MS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        let sweep_secs = parse_env::<u64>("ARIA_RATE_LIMIT_SWEEP_SECS", "a positive integer")?
            .unwrap_or(300)
            .max(1);

        let aliases = optional_env("ARIA_ALIASES")?
            .map(|raw| {
                raw.split(',')
                    .map(|alias| alias.trim().to_string())
                    .filter(|alias| !alias.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|aliases| !aliases.is_empty())
            .unwrap_or(defaults.aliases);

        let agent_address = optional_env("ARIA_AGENT_ADDRESS")?;
        if let Some(address) = &agent_address
            && !crate::wallet::is_valid_address(address)
        {
            return Err(ConfigError::InvalidValue {
                key: "ARIA_AGENT_ADDRESS".to_string(),
                message: format!("expected a 0x-prefixed 40-hex address, got '{address}'"),
            });
        }

        let demo_delay_ms =
            parse_env::<u64>("ARIA_ATTACHMENT_DEMO_DELAY_MS", "a non-negative integer")?
                .unwrap_or(1_000);

        Ok(Self {
            rate_limit_max_requests,
            rate_limit_window: Duration::from_millis(window_ms),
            rate_limit_sweep_interval: Duration::from_secs(sweep_secs),
            aliases,
            agent_address,
            chain_id: chain.chain_id,
            attachment_demo_delay: Duration::from_millis(demo_delay_ms),
            responder_timeout: llm_timeout,
        })
    }
}

/// Log output settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// JSON lines instead of human-readable output.
    pub json: bool,
}

impl LoggingConfig {
    /// Resolvable on its own so logging can start before the rest of the
    /// configuration is validated.
    pub fn resolve() -> Result<Self, ConfigError> {
        let level = match optional_env("LOG_LEVEL")? {
            Some(value) => LogLevel::parse(&value, "LOG_LEVEL")?,
            None => LogLevel::Info,
        };

        let json = match optional_env("ARIA_LOG_FORMAT")? {
            Some(value) => match normalize_variant(&value).as_str() {
                "json" => true,
                "pretty" | "text" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "ARIA_LOG_FORMAT".to_string(),
                        message: format!("expected 'json' or 'pretty', got '{value}'"),
                    });
                }
            },
            None => optional_env("XMTP_ENV")?
                .is_some_and(|env| normalize_variant(&env) == "production"),
        };

        Ok(Self { level, json })
    }
}

impl Config {
    /// Load dotenv files, then resolve every section from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        crate::bootstrap::load_env_files();
        Self::build()
    }

    /// Resolve from the current process environment only.
    pub fn build() -> Result<Self, ConfigError> {
        let chain = ChainConfig::resolve()?;
        let llm = LlmConfig::resolve()?;
        let agent = AgentConfig::resolve(&chain, llm.timeout)?;
        Ok(Self {
            xmtp: XmtpConfig::resolve()?,
            agent,
            llm,
            chain,
            logging: LoggingConfig::resolve()?,
            channels: ChannelsConfig::resolve()?,
        })
    }
}

/// Sections a local terminal session needs.
///
/// Messaging keys are not required, and without `GEMINI_API_KEY` the agent
/// answers free text with canned replies.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub llm: Option<LlmConfig>,
    pub agent: AgentConfig,
}

impl LocalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        crate::bootstrap::load_env_files();
        Self::build()
    }

    pub fn build() -> Result<Self, ConfigError> {
        let chain = ChainConfig::resolve()?;
        let llm = match LlmConfig::resolve() {
            Ok(llm) => Some(llm),
            Err(ConfigError::MissingEnvVar(_)) => None,
            Err(e) => return Err(e),
        };
        let timeout = llm
            .as_ref()
            .map(|llm| llm.timeout)
            .unwrap_or_else(|| AgentConfig::default().responder_timeout);
        Ok(Self {
            agent: AgentConfig::resolve(&chain, timeout)?,
            llm,
        })
    }
}
