//! Collaborator configuration.
//!
//! Base URLs for the content store RPC API and the ledger public API, the
//! stamp log location, and the anchoring wallet secret. Loaded from the
//! environment by [`StampConfig::from_env`] or built explicitly in tests.

use std::path::PathBuf;

use rand_core::{OsRng, RngCore};
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default transaction fee in the ledger's smallest unit (5 tokens at 1e8).
pub const DEFAULT_TRANSACTION_FEE: u64 = 500_000_000;

/// Configuration for connecting to the stamp service's collaborators.
///
/// Custom `Debug` redacts the wallet secret.
#[derive(Clone)]
pub struct StampConfig {
    /// Base URL of the content store RPC API (Kubo-compatible).
    pub ipfs_api_url: Url,
    /// Logical directory holding stamped files, e.g. `/stamped`.
    pub stamped_dir: String,
    /// Path of the JSON Lines stamp log.
    pub log_path: PathBuf,
    /// Base URL of the ledger public API.
    pub ledger_api_url: Url,
    /// Base URL of the ledger explorer, used to build transaction links.
    pub explorer_url: Url,
    /// Fee attached to each anchoring transaction.
    pub transaction_fee: u64,
    /// Ed25519 seed of the anchoring wallet.
    pub wallet_secret: WalletSecret,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StampConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampConfig")
            .field("ipfs_api_url", &self.ipfs_api_url)
            .field("stamped_dir", &self.stamped_dir)
            .field("log_path", &self.log_path)
            .field("ledger_api_url", &self.ledger_api_url)
            .field("explorer_url", &self.explorer_url)
            .field("transaction_fee", &self.transaction_fee)
            .field("wallet_secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StampConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `IPFS_API_URL` (default: `http://127.0.0.1:5001`)
    /// - `IPFS_STAMPED_DIR` (default: `/stamped`)
    /// - `STAMP_LOG_PATH` (default: `./data/stamp-log.jsonl`)
    /// - `LEDGER_API_URL` (required)
    /// - `LEDGER_EXPLORER_URL` (default: `https://dexplorer.ark.io`)
    /// - `LEDGER_TRANSACTION_FEE` (default: 500000000)
    /// - `LEDGER_WALLET_SECRET` (required, 64 hex chars)
    /// - `STAMP_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let ledger_raw =
            std::env::var("LEDGER_API_URL").map_err(|_| ConfigError::MissingVar("LEDGER_API_URL"))?;
        let secret_raw = std::env::var("LEDGER_WALLET_SECRET")
            .map_err(|_| ConfigError::MissingVar("LEDGER_WALLET_SECRET"))?;

        Ok(Self {
            ipfs_api_url: env_url("IPFS_API_URL", "http://127.0.0.1:5001")?,
            stamped_dir: normalize_dir(
                &std::env::var("IPFS_STAMPED_DIR").unwrap_or_else(|_| "/stamped".to_string()),
            )?,
            log_path: std::env::var("STAMP_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/stamp-log.jsonl")),
            ledger_api_url: parse_url("LEDGER_API_URL", &ledger_raw)?,
            explorer_url: env_url("LEDGER_EXPLORER_URL", "https://dexplorer.ark.io")?,
            transaction_fee: env_number("LEDGER_TRANSACTION_FEE", DEFAULT_TRANSACTION_FEE)?,
            wallet_secret: WalletSecret::from_hex(&secret_raw)?,
            timeout_secs: env_number("STAMP_TIMEOUT_SECS", 30)?,
        })
    }

    /// Create a configuration pointing at local mock servers (for testing).
    pub fn local_mock(
        ipfs_api_url: &str,
        ledger_api_url: &str,
        log_path: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            ipfs_api_url: parse_url("ipfs_api_url", ipfs_api_url)?,
            stamped_dir: "/stamped".to_string(),
            log_path: log_path.into(),
            ledger_api_url: parse_url("ledger_api_url", ledger_api_url)?,
            explorer_url: parse_url("explorer_url", "https://explorer.test")?,
            transaction_fee: DEFAULT_TRANSACTION_FEE,
            wallet_secret: WalletSecret::from_bytes([7u8; 32]),
            timeout_secs: 5,
        })
    }
}

/// Ed25519 seed for the anchoring wallet. Zeroized on drop, never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WalletSecret([u8; 32]);

impl WalletSecret {
    /// Wrap raw seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decode a 64-character hex seed.
    pub fn from_hex(raw: &str) -> Result<Self, ConfigError> {
        let mut decoded = hex::decode(raw.trim())
            .map_err(|e| ConfigError::InvalidSecret(format!("invalid hex: {e}")))?;
        if decoded.len() != 32 {
            let actual = decoded.len();
            decoded.zeroize();
            return Err(ConfigError::InvalidSecret(format!(
                "expected 32 bytes, got {actual}"
            )));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(seed))
    }

    /// Generate a fresh seed from the operating system RNG.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self(seed)
    }

    /// Hex encoding of the seed, as accepted by [`WalletSecret::from_hex`].
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Access the seed bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for WalletSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WalletSecret([REDACTED])")
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

fn env_number(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::InvalidNumber(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Directory paths are absolute and carry no trailing slash.
fn normalize_dir(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.len() < 2 {
        return Err(ConfigError::InvalidDirectory(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid number for {0}: {1}")]
    InvalidNumber(String, String),
    #[error("invalid stamped directory \"{0}\": must be an absolute path below the root")]
    InvalidDirectory(String),
    #[error("invalid LEDGER_WALLET_SECRET: {0}")]
    InvalidSecret(String),
}
