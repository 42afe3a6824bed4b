//! Configuration for the transaction engine
//!
//! Everything the validator, composer and client need is carried in an
//! explicit [`EngineConfig`] value. Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. A JSON file (`--config`)
//! 3. `LIGHTER_*` environment variables

use crate::tx::{Identity, ProtocolBounds};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Environment variable names
pub mod env_vars {
    pub const NETWORK: &str = "LIGHTER_NETWORK";
    pub const API_URL: &str = "LIGHTER_API_URL";
    pub const ACCOUNT_INDEX: &str = "LIGHTER_ACCOUNT_INDEX";
    pub const API_KEY_INDEX: &str = "LIGHTER_API_KEY_INDEX";

    // Secret, never written to config files
    pub const ETH_PRIVATE_KEY: &str = "LIGHTER_ETH_PRIVATE_KEY";
}

/// Exchange deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Chain id hashed as the first element of every transaction
    pub fn chain_id(&self) -> u32 {
        match self {
            Network::Mainnet => 304,
            Network::Testnet => 300,
        }
    }

    pub fn api_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://mainnet.zklighter.elliot.ai",
            Network::Testnet => "https://testnet.zklighter.elliot.ai",
        }
    }

    pub fn ws_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "wss://mainnet.zklighter.elliot.ai/stream",
            Network::Testnet => "wss://testnet.zklighter.elliot.ai/stream",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(Error::Config(format!("unknown network '{}'", other))),
        }
    }
}

/// Default transaction lifetime: ten minutes less one second
pub const DEFAULT_TX_TTL_MS: i64 = 599_000;
/// Default resting-order lifetime: 28 days
pub const DEFAULT_ORDER_TTL_MS: i64 = 28 * 24 * 60 * 60 * 1000;
pub const DEFAULT_MAX_SLIPPAGE_BPS: u32 = 500;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub network: Network,
    /// Overrides the network's chain id
    pub chain_id: Option<u32>,
    /// Overrides the network's REST endpoint
    pub api_url: Option<String>,
    pub account_index: i64,
    pub api_key_index: u8,
    /// Offset added to "now" for a transaction's `expired_at`
    pub tx_ttl_ms: i64,
    /// Offset added to "now" for a resting order's `order_expiry`
    pub order_ttl_ms: i64,
    /// Upper bound accepted for slippage-protected market orders
    pub max_slippage_bps: u32,
    pub bounds: ProtocolBounds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            chain_id: None,
            api_url: None,
            account_index: 0,
            api_key_index: 0,
            tx_ttl_ms: DEFAULT_TX_TTL_MS,
            order_ttl_ms: DEFAULT_ORDER_TTL_MS,
            max_slippage_bps: DEFAULT_MAX_SLIPPAGE_BPS,
            bounds: ProtocolBounds::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env_with(|name| std::env::var(name).ok())
    }

    /// Load a JSON file. Missing keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `LIGHTER_*` variables resolved through `lookup`.
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(network) = lookup(env_vars::NETWORK) {
            self.network = network.parse()?;
        }
        if let Some(url) = lookup(env_vars::API_URL) {
            self.api_url = Some(url);
        }
        if let Some(raw) = lookup(env_vars::ACCOUNT_INDEX) {
            self.account_index = parse_var(env_vars::ACCOUNT_INDEX, &raw)?;
        }
        if let Some(raw) = lookup(env_vars::API_KEY_INDEX) {
            self.api_key_index = parse_var(env_vars::API_KEY_INDEX, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tx_ttl_ms <= 0 {
            return Err(Error::Config("tx_ttl_ms must be positive".into()));
        }
        if self.order_ttl_ms <= 0 {
            return Err(Error::Config("order_ttl_ms must be positive".into()));
        }
        if self.max_slippage_bps >= 10_000 {
            return Err(Error::Config(
                "max_slippage_bps must be below 10000".into(),
            ));
        }
        Ok(())
    }

    /// Chain id after applying the override
    pub fn resolved_chain_id(&self) -> u32 {
        self.chain_id.unwrap_or_else(|| self.network.chain_id())
    }

    /// REST endpoint after applying the override
    pub fn resolved_api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or_else(|| self.network.api_url())
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.account_index, self.api_key_index)
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{} is invalid: {}", name, e)))
}

/// Signing secrets read from the environment
///
/// The L2 API key never passes through here: it stays inside whichever
/// [`LocalSigner`](crate::crypto::LocalSigner) the caller injects.
///
/// SECURITY: values are held as `SecretString` and never printed.
pub struct Credentials {
    eth_private_key: Option<SecretString>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            eth_private_key: lookup(env_vars::ETH_PRIVATE_KEY)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
        }
    }

    pub fn has_eth_key(&self) -> bool {
        self.eth_private_key.is_some()
    }

    /// Ethereum (L1) key for kinds that need an L1 signature
    pub fn eth_private_key(&self) -> Result<&str> {
        self.eth_private_key
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or_else(|| Error::Config(format!("{} not set", env_vars::ETH_PRIVATE_KEY)))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = if self.has_eth_key() {
            "[REDACTED]"
        } else {
            "<unset>"
        };
        f.debug_struct("Credentials")
            .field("eth_private_key", &shown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn network_ids_and_urls() {
        assert_eq!(Network::Mainnet.chain_id(), 304);
        assert_eq!(Network::Testnet.chain_id(), 300);
        assert!(Network::Testnet.api_url().contains("testnet"));
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Testnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn defaults_match_exchange_conventions() {
        let config = EngineConfig::default();
        assert_eq!(config.resolved_chain_id(), 304);
        assert_eq!(config.tx_ttl_ms, 599_000);
        assert_eq!(config.order_ttl_ms, 2_419_200_000);
        assert_eq!(config.resolved_api_url(), Network::Mainnet.api_url());
    }

    #[test]
    fn env_overrides_defaults() {
        let config = EngineConfig::default()
            .apply_env_with(lookup(&[
                (env_vars::NETWORK, "testnet"),
                (env_vars::ACCOUNT_INDEX, "281474976710654"),
                (env_vars::API_KEY_INDEX, "3"),
                (env_vars::API_URL, "http://localhost:8080"),
            ]))
            .unwrap();
        assert_eq!(config.resolved_chain_id(), 300);
        assert_eq!(config.identity(), Identity::new(281_474_976_710_654, 3));
        assert_eq!(config.resolved_api_url(), "http://localhost:8080");
    }

    #[test]
    fn malformed_env_is_config_error() {
        let err = EngineConfig::default()
            .apply_env_with(lookup(&[(env_vars::API_KEY_INDEX, "300")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains(env_vars::API_KEY_INDEX)));
    }

    #[test]
    fn loads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"network":"testnet","account_index":12,"chain_id":999}}"#
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.account_index, 12);
        assert_eq!(config.resolved_chain_id(), 999);
        assert_eq!(config.max_slippage_bps, DEFAULT_MAX_SLIPPAGE_BPS);
        assert_eq!(config.bounds, ProtocolBounds::default());
    }

    #[test]
    fn rejects_nonsense_ttl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tx_ttl_ms":0}}"#).unwrap();
        assert!(EngineConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn credentials_debug_redacts() {
        let creds = Credentials::from_lookup(lookup(&[(
            env_vars::ETH_PRIVATE_KEY,
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )]));
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("ac0974bec"));
        assert!(debug.contains("[REDACTED]"));
        assert!(creds.eth_private_key().unwrap().starts_with("0x"));

        let empty = Credentials::from_lookup(lookup(&[(env_vars::ETH_PRIVATE_KEY, "  ")]));
        assert!(!empty.has_eth_key());
        assert!(format!("{:?}", empty).contains("<unset>"));
        assert!(matches!(empty.eth_private_key(), Err(Error::Config(_))));
    }
}
