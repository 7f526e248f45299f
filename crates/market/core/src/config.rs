//! Settings.
//!
//! Connection parameters, accounts and artifact locations, read once at start from a `.env`
//! style file with process environment overrides.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use alloy_primitives::Address;
use alloy_signer_local::LocalSignerError;
use apus_utils::LogFormat;
use config::{Config, ConfigError, Environment, Map};
use serde::Deserialize;
use thiserror::Error;

use crate::role::{KeyRing, RoleBook, RoleResolver};

/// Default directory holding the contract build output.
pub const DEFAULT_ARTIFACTS_DIR: &str = "build";

/// Default timeout for a single remote operation, in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Variables read from the process environment on top of the file.
const ENV_KEYS: [&str; 13] = [
    "APUS_RPC",
    "APUS_CHAIN_ID",
    "GAS_LIMIT",
    "PRIVATE_KEYS",
    "OWNER_ADDRESS",
    "PROVIDER_ADDRESS",
    "USER_ADDRESS",
    "ARTIFACTS_DIR",
    "RPC_TIMEOUT_SECS",
    "LOG_FORMAT",
    "MARKET_ARTIFACT",
    "PROOF_TASK_ARTIFACT",
    "PROVER_ARTIFACT",
];

/// Errors raised while resolving the configuration.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("line {line} is not KEY=value: {content}")]
    EnvLine { line: usize, content: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("private key #{index} is invalid: {source}")]
    InvalidPrivateKey { index: usize, source: LocalSignerError },

    #[error("{key} is not a valid address: {value}")]
    InvalidAddress { key: &'static str, value: String },

    #[error("no owner account: set OWNER_ADDRESS or PRIVATE_KEYS")]
    NoOwner,
}

/// Settings for the market client.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// The JSON-RPC endpoint of the node.
    #[serde(rename = "apus_rpc")]
    pub rpc_url: String,
    /// The chain id transactions are signed for.
    #[serde(rename = "apus_chain_id")]
    pub chain_id: u64,
    /// The gas limit set on every transaction.
    pub gas_limit: u64,
    /// Comma separated hex private keys.
    #[serde(default)]
    pub private_keys: String,
    /// Account of the owner role.
    pub owner_address: Option<String>,
    /// Account of the provider role.
    pub provider_address: Option<String>,
    /// Account of the user role.
    pub user_address: Option<String>,
    /// Directory holding `contract_address/` and `contracts/`.
    pub artifacts_dir: PathBuf,
    /// Timeout for a single remote operation, in seconds.
    pub rpc_timeout_secs: u64,
    /// The format for logging.
    pub log_format: LogFormat,
    /// Artifact file of the market contract.
    pub market_artifact: String,
    /// Artifact file of the proof task contract.
    pub proof_task_artifact: String,
    /// Artifact file of the prover contract.
    pub prover_artifact: String,
}

impl Settings {
    /// Loads settings from the env file at `path`, letting process environment variables of the
    /// same name take precedence.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Loads settings from the env file at `path`, letting values returned by `env` take
    /// precedence over the file.
    pub fn load_with(
        path: impl AsRef<Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| SettingsError::Io { path: path.to_path_buf(), source })?;
        let mut vars = parse_env(&text)?;
        for key in ENV_KEYS {
            if let Some(value) = env(key) {
                vars.insert(key.to_string(), value);
            }
        }
        Self::from_vars(vars)
    }

    /// Parses settings from env file text alone.
    pub fn from_env_text(text: &str) -> Result<Self, SettingsError> {
        Self::from_vars(parse_env(text)?)
    }

    fn from_vars(vars: Map<String, String>) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .set_default("artifacts_dir", DEFAULT_ARTIFACTS_DIR)?
            .set_default("rpc_timeout_secs", DEFAULT_RPC_TIMEOUT_SECS)?
            .set_default("log_format", "Minimal")?
            .set_default("market_artifact", "Market.json")?
            .set_default("proof_task_artifact", "ApusProofTask.json")?
            .set_default("prover_artifact", "ApusIProver.json")?
            .add_source(Environment::default().source(Some(vars)))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Timeout for a single remote operation.
    #[must_use]
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Builds the key ring from `PRIVATE_KEYS`.
    pub fn key_ring(&self) -> Result<KeyRing, SettingsError> {
        KeyRing::from_hex_keys(self.private_keys.split(',').filter(|key| !key.trim().is_empty()))
    }

    /// Builds the role book.
    ///
    /// The owner defaults to the first key's account; provider and user default to the owner.
    pub fn role_book(&self, keys: &KeyRing) -> Result<RoleBook, SettingsError> {
        let owner = match parse_address("OWNER_ADDRESS", self.owner_address.as_deref())? {
            Some(owner) => owner,
            None => keys.first_address().ok_or(SettingsError::NoOwner)?,
        };
        let provider = parse_address("PROVIDER_ADDRESS", self.provider_address.as_deref())?;
        let user = parse_address("USER_ADDRESS", self.user_address.as_deref())?;

        Ok(RoleBook { owner, provider: provider.unwrap_or(owner), user: user.unwrap_or(owner) })
    }

    /// Builds the role resolver from the configured keys and accounts.
    pub fn role_resolver(&self) -> Result<RoleResolver, SettingsError> {
        let keys = self.key_ring()?;
        let book = self.role_book(&keys)?;
        Ok(RoleResolver::new(book, keys))
    }
}

/// Parses `KEY=value` lines. Blank lines and `#` comments are skipped; any other line without
/// `=` is an error. Values are taken literally apart from one pair of enclosing quotes.
fn parse_env(text: &str) -> Result<Map<String, String>, SettingsError> {
    let mut vars = Map::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| SettingsError::EnvLine { line: index + 1, content: line.to_string() })?;
        vars.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

fn parse_address(
    key: &'static str,
    value: Option<&str>,
) -> Result<Option<Address>, SettingsError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| SettingsError::InvalidAddress { key, value: value.to_string() }),
        None => Ok(None),
    }
}
