//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::constants::{INTERMEDIATE_MINTS, SOL_MINTS};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub parser: ParserSettings,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub follow: FollowConfig,
}

/// Enhanced-transactions provider (Helius) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// API key; may also arrive via WALLETSCOPE__PROVIDER__API_KEY
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,

    #[serde(default = "default_rpc_base_url")]
    pub rpc_base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum interval between RPC calls (signature paging)
    #[serde(default = "default_rpc_min_interval_ms")]
    pub rpc_min_interval_ms: u64,

    /// Minimum interval between enhanced-transaction calls
    #[serde(default = "default_enhanced_min_interval_ms")]
    pub enhanced_min_interval_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,

    /// WAL keeps readers unblocked while the sync coordinator writes
    #[serde(default = "default_true")]
    pub wal: bool,
}

/// Swap parser tunables
#[derive(Debug, Clone, Deserialize)]
pub struct ParserSettings {
    /// Magnitude divisor for converting intermediate-token flow to SOL when
    /// a multi-hop swap moved no native SOL. A fixed ratio, not a price
    /// feed; it will drift with the SOL price and is exposed here so
    /// deployments can adjust it.
    #[serde(default = "default_sol_per_stable_unit")]
    pub sol_per_stable_unit: f64,

    /// Mints treated as native SOL
    #[serde(default = "default_sol_mints")]
    pub sol_mints: Vec<String>,

    /// Stablecoins and liquid-staking tokens excluded from target tokens
    #[serde(default = "default_intermediate_mints")]
    pub intermediate_mints: Vec<String>,
}

impl ParserSettings {
    pub fn is_sol_mint(&self, mint: &str) -> bool {
        self.sol_mints.iter().any(|m| m == mint)
    }

    pub fn is_intermediate(&self, mint: &str) -> bool {
        self.is_sol_mint(mint) || self.intermediate_mints.iter().any(|m| m == mint)
    }
}

/// Sync coordinator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Signatures fetched per RPC page (provider max 1000)
    #[serde(default = "default_signature_page_limit")]
    pub signature_page_limit: usize,

    /// Signatures per enhanced-transaction request (provider max 100)
    #[serde(default = "default_enhance_batch_size")]
    pub enhance_batch_size: usize,

    /// Safety cap on new signatures ingested per run
    #[serde(default = "default_max_new_signatures")]
    pub max_new_signatures: usize,

    /// Status broadcast mailbox size; slow subscribers lose oldest events
    #[serde(default = "default_status_capacity")]
    pub status_capacity: usize,
}

/// Follow simulator defaults
#[derive(Debug, Clone, Deserialize)]
pub struct FollowConfig {
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u32,

    /// One of: conservative, moderate, aggressive
    #[serde(default = "default_slippage_model")]
    pub slippage_model: String,
}

fn default_rest_base_url() -> String {
    "https://api.helius.xyz".to_string()
}

fn default_rpc_base_url() -> String {
    "https://mainnet.helius-rpc.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_rpc_min_interval_ms() -> u64 {
    100
}

fn default_enhanced_min_interval_ms() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

fn default_db_path() -> String {
    "walletscope.db".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sol_per_stable_unit() -> f64 {
    100.0
}

fn default_sol_mints() -> Vec<String> {
    SOL_MINTS.iter().map(|s| s.to_string()).collect()
}

fn default_intermediate_mints() -> Vec<String> {
    INTERMEDIATE_MINTS.iter().map(|s| s.to_string()).collect()
}

fn default_signature_page_limit() -> usize {
    1000
}

fn default_enhance_batch_size() -> usize {
    100
}

fn default_max_new_signatures() -> usize {
    5000
}

fn default_status_capacity() -> usize {
    256
}

fn default_delay_seconds() -> u32 {
    5
}

fn default_slippage_model() -> String {
    "moderate".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            rest_base_url: default_rest_base_url(),
            rpc_base_url: default_rpc_base_url(),
            timeout_secs: default_timeout_secs(),
            rpc_min_interval_ms: default_rpc_min_interval_ms(),
            enhanced_min_interval_ms: default_enhanced_min_interval_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            wal: true,
        }
    }
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            sol_per_stable_unit: default_sol_per_stable_unit(),
            sol_mints: default_sol_mints(),
            intermediate_mints: default_intermediate_mints(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            signature_page_limit: default_signature_page_limit(),
            enhance_batch_size: default_enhance_batch_size(),
            max_new_signatures: default_max_new_signatures(),
            status_capacity: default_status_capacity(),
        }
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            delay_seconds: default_delay_seconds(),
            slippage_model: default_slippage_model(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            database: DatabaseConfig::default(),
            parser: ParserSettings::default(),
            sync: SyncConfig::default(),
            follow: FollowConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix WALLETSCOPE_)
            .add_source(
                config::Environment::with_prefix("WALLETSCOPE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.sync.signature_page_limit == 0 || self.sync.signature_page_limit > 1000 {
            anyhow::bail!(
                "signature_page_limit must be in 1..=1000, got {}",
                self.sync.signature_page_limit
            );
        }

        if self.sync.enhance_batch_size == 0 || self.sync.enhance_batch_size > 100 {
            anyhow::bail!(
                "enhance_batch_size must be in 1..=100, got {}",
                self.sync.enhance_batch_size
            );
        }

        if self.parser.sol_per_stable_unit <= 0.0 {
            anyhow::bail!("sol_per_stable_unit must be positive");
        }

        if self.parser.sol_mints.is_empty() {
            anyhow::bail!("sol_mints cannot be empty");
        }

        if self.database.path.is_empty() {
            anyhow::bail!("database path cannot be empty");
        }

        self.follow
            .slippage_model
            .parse::<crate::follow::SlippageModel>()
            .map_err(|e| anyhow::anyhow!(e))?;

        if self.provider.api_key.is_empty() {
            tracing::warn!("No provider API key configured - sync commands will fail");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Provider:
    rest_base_url: {}
    rpc_base_url: {}
    api_key: {}
    timeout: {}s
    pacing: rpc {}ms / enhanced {}ms
    retries: {} (base delay {}ms)
  Database:
    path: {}
    wal: {}
  Parser:
    sol_per_stable_unit: {}
    intermediate mints: {}
  Sync:
    signature_page_limit: {}
    enhance_batch_size: {}
    max_new_signatures: {}
  Follow:
    delay: {}s
    slippage_model: {}
"#,
            self.provider.rest_base_url,
            self.provider.rpc_base_url,
            if self.provider.api_key.is_empty() {
                "(not set)"
            } else {
                "***"
            },
            self.provider.timeout_secs,
            self.provider.rpc_min_interval_ms,
            self.provider.enhanced_min_interval_ms,
            self.provider.max_retries,
            self.provider.retry_base_delay_ms,
            self.database.path,
            self.database.wal,
            self.parser.sol_per_stable_unit,
            self.parser.intermediate_mints.len(),
            self.sync.signature_page_limit,
            self.sync.enhance_batch_size,
            self.sync.max_new_signatures,
            self.follow.delay_seconds,
            self.follow.slippage_model,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.signature_page_limit, 1000);
        assert_eq!(config.sync.enhance_batch_size, 100);
        assert_eq!(config.follow.delay_seconds, 5);
    }

    #[test]
    fn test_intermediate_classification() {
        let parser = ParserSettings::default();
        // Wrapped SOL counts as intermediate and as SOL
        assert!(parser.is_sol_mint("So11111111111111111111111111111111111111112"));
        assert!(parser.is_intermediate("So11111111111111111111111111111111111111112"));
        // USDC is intermediate but not SOL
        assert!(parser.is_intermediate("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
        assert!(!parser.is_sol_mint("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
        // A random mint is neither
        assert!(!parser.is_intermediate("Fm9rHUTF5v3hwMLbStjZXqNBBoZyGriQaFM6sTFz3K8A"));
    }

    #[test]
    fn test_validate_rejects_bad_batch_sizes() {
        let mut config = Config::default();
        config.sync.enhance_batch_size = 101;
        assert!(config.validate().is_err());
        config.sync.enhance_batch_size = 100;
        config.sync.signature_page_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_slippage_model() {
        let mut config = Config::default();
        config.follow.slippage_model = "reckless".to_string();
        assert!(config.validate().is_err());
    }
}
