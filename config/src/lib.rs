//! Veil Configuration
//!
//! Shared configuration crate for all Veil components.
//!
//! Handles loading configuration from:
//! 1. VEIL_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.veil/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::{env, fs};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<VeilConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".veil";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_CHAIN_ID: u64 = 31337;
const DEFAULT_CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

const DEFAULT_GRANT_DAYS: u64 = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeilConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub grant: GrantConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// Chain connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_contract")]
    pub contract_address: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            chain_id: DEFAULT_CHAIN_ID,
            contract_address: DEFAULT_CONTRACT.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.into()
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_contract() -> String {
    DEFAULT_CONTRACT.into()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Decryption grant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantConfig {
    /// Validity window of a signed decryption grant, in days.
    #[serde(default = "default_grant_days")]
    pub duration_days: u64,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            duration_days: DEFAULT_GRANT_DAYS,
        }
    }
}

fn default_grant_days() -> u64 {
    DEFAULT_GRANT_DAYS
}

/// Feature flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Run against the in-process mock chain and co-processor instead
    /// of live services.
    #[serde(default)]
    pub dev_mode: bool,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl VeilConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check VEIL_CONFIG env var
        if let Ok(path) = env::var("VEIL_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.veil/config.toml
        dirs::home_dir()
            .map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Network
        env_string("VEIL_RPC_URL", &mut self.network.rpc_url);
        env_parse("VEIL_CHAIN_ID", &mut self.network.chain_id);
        env_string("VEIL_CONTRACT_ADDRESS", &mut self.network.contract_address);
        env_parse("VEIL_POLL_INTERVAL_MS", &mut self.network.poll_interval_ms);

        // Grant
        env_parse("VEIL_GRANT_DAYS", &mut self.grant.duration_days);

        // Features
        if let Some(v) = env_bool("DEV_MODE") {
            self.features.dev_mode = v;
        }
    }

    /// Parse the configured contract address.
    pub fn contract_address(&self) -> Result<veil_codec::Address> {
        self.network
            .contract_address
            .parse()
            .with_context(|| format!("invalid contract address: {}", self.network.contract_address))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.features.dev_mode = true;
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static VeilConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Try to get the global config instance.
    ///
    /// Returns `None` if config hasn't been initialized yet.
    pub fn try_global() -> Option<&'static VeilConfig> {
        GLOBAL_CONFIG.get()
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: VeilConfig) -> Result<(), VeilConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `VeilConfig::global()`.
#[inline]
pub fn global_config() -> &'static VeilConfig {
    VeilConfig::global()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VeilConfig::default();
        assert_eq!(config.network.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.network.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(config.grant.duration_days, DEFAULT_GRANT_DAYS);
        assert!(!config.features.dev_mode);
    }

    #[test]
    fn test_generate_sample() {
        let sample = VeilConfig::generate_sample();
        assert!(sample.contains("[network]"));
        assert!(sample.contains("[grant]"));
        assert!(sample.contains("[features]"));
    }

    #[test]
    fn test_parse_sample() {
        let sample = VeilConfig::generate_sample();
        let parsed: VeilConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.network.rpc_url, DEFAULT_RPC_URL);
        assert!(parsed.features.dev_mode);
    }

    #[test]
    fn test_contract_address_parses() {
        let config = VeilConfig::default();
        let addr = config.contract_address().unwrap();
        assert_eq!(addr.to_hex(), DEFAULT_CONTRACT.to_ascii_lowercase());
    }
}
