//! Configuration layering.
//!
//! ```text
//! config.toml        (lowest)
//!   → environment    LULO_* variables
//!   → flags          (highest)
//!   → LuloConfig     resolved once at startup, passed by reference
//! ```
//!
//! The binary resolves environment and flags together (clap reads both) and
//! hands the result to [`ConfigLayer::overlay`] on top of the file layer.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{LuloError, Result};

/// Looked up in the working directory when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

const REDACTED: &str = "********";

/// When to fetch a fresh blockhash while submitting an API batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockhashRefresh {
    /// One blockhash for the whole batch, fetched before the first submission.
    #[default]
    Batch,
    /// A fresh blockhash before every submission.
    Transaction,
}

impl FromStr for BlockhashRefresh {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batch" => Ok(BlockhashRefresh::Batch),
            "transaction" => Ok(BlockhashRefresh::Transaction),
            other => Err(format!(
                "unknown blockhash refresh policy '{other}' (expected 'batch' or 'transaction')"
            )),
        }
    }
}

/// One source of settings. Every field is optional so layers can be stacked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypair: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lulo_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lulo_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_fee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_protocols: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockhash_refresh: Option<BlockhashRefresh>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl ConfigLayer {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LuloError::Parse(format!("config file: {e}")))
    }

    /// Read a TOML config file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LuloError::Io(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content).map_err(|e| e.context(path.display()))
    }

    /// Load `explicit` if given, otherwise `./config.toml` when it exists,
    /// otherwise an empty layer.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        Self::discover_in(Path::new("."), explicit)
    }

    /// [`Self::discover`] with the default file looked up in `dir`.
    pub fn discover_in(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = dir.join(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::load(&path)
                } else {
                    tracing::debug!(path = %path.display(), "No config file found");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Field-wise merge where `top` wins. Empty strings and empty lists in
    /// `top` count as unset.
    pub fn overlay(self, top: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            keypair: top
                .keypair
                .filter(|p| !p.as_os_str().is_empty())
                .or(self.keypair),
            rpc_url: non_empty(top.rpc_url).or(self.rpc_url),
            rpc_api_key: non_empty(top.rpc_api_key).or(self.rpc_api_key),
            lulo_api_key: non_empty(top.lulo_api_key).or(self.lulo_api_key),
            lulo_api_url: non_empty(top.lulo_api_url).or(self.lulo_api_url),
            priority_fee: top.priority_fee.or(self.priority_fee),
            allowed_protocols: top
                .allowed_protocols
                .filter(|list| !list.is_empty())
                .or(self.allowed_protocols),
            blockhash_refresh: top.blockhash_refresh.or(self.blockhash_refresh),
            request_timeout_secs: top.request_timeout_secs.or(self.request_timeout_secs),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolved settings, built once at startup.
#[derive(Debug)]
pub struct LuloConfig {
    pub keypair: Option<PathBuf>,
    pub rpc_url: Option<String>,
    pub rpc_api_key: Option<SecretString>,
    pub lulo_api_key: Option<SecretString>,
    pub lulo_api_url: String,
    pub priority_fee: Option<u64>,
    pub allowed_protocols: Vec<String>,
    pub blockhash_refresh: BlockhashRefresh,
    pub request_timeout: Option<Duration>,
}

impl From<ConfigLayer> for LuloConfig {
    fn from(layer: ConfigLayer) -> Self {
        Self {
            keypair: layer.keypair,
            rpc_url: layer.rpc_url,
            rpc_api_key: layer.rpc_api_key.map(SecretString::from),
            lulo_api_key: layer.lulo_api_key.map(SecretString::from),
            lulo_api_url: layer
                .lulo_api_url
                .unwrap_or_else(|| lulo_api::DEFAULT_BASE_URL.to_string()),
            priority_fee: layer.priority_fee,
            allowed_protocols: layer
                .allowed_protocols
                .unwrap_or_default()
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            blockhash_refresh: layer.blockhash_refresh.unwrap_or_default(),
            request_timeout: layer.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl LuloConfig {
    pub fn keypair_path(&self) -> Result<&Path> {
        self.keypair.as_deref().ok_or_else(|| {
            LuloError::Configuration(
                "keypair path not set (use --keypair, LULO_KEYPAIR or `keypair` in config.toml)"
                    .into(),
            )
        })
    }

    pub fn rpc_url(&self) -> Result<&str> {
        self.rpc_url.as_deref().ok_or_else(|| {
            LuloError::Configuration(
                "RPC URL not set (use --rpc-url, LULO_RPC_URL or `rpc-url` in config.toml)".into(),
            )
        })
    }

    /// The effective settings with API keys masked, for display.
    pub fn redacted(&self) -> ConfigLayer {
        ConfigLayer {
            keypair: self.keypair.clone(),
            rpc_url: self.rpc_url.clone(),
            rpc_api_key: self.rpc_api_key.as_ref().map(|_| REDACTED.to_string()),
            lulo_api_key: self.lulo_api_key.as_ref().map(|_| REDACTED.to_string()),
            lulo_api_url: Some(self.lulo_api_url.clone()),
            priority_fee: self.priority_fee,
            allowed_protocols: Some(self.allowed_protocols.clone()),
            blockhash_refresh: Some(self.blockhash_refresh),
            request_timeout_secs: self.request_timeout.map(|t| t.as_secs()),
        }
    }

    /// [`Self::redacted`] rendered as TOML.
    pub fn to_redacted_toml(&self) -> Result<String> {
        toml::to_string_pretty(&self.redacted())
            .map_err(|e| LuloError::Parse(format!("failed to render config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"
keypair = "/home/me/.config/solana/id.json"
rpc-url = "https://mainnet.helius-rpc.com"
rpc-api-key = "rpc-secret"
lulo-api-key = "lulo-secret"
priority-fee = 50000
allowed-protocols = ["kamino", "marginfi"]
blockhash-refresh = "transaction"
"#;

    #[test]
    fn parses_kebab_case_file() {
        let layer = ConfigLayer::from_toml_str(SAMPLE).unwrap();
        assert_eq!(layer.rpc_url.as_deref(), Some("https://mainnet.helius-rpc.com"));
        assert_eq!(layer.priority_fee, Some(50000));
        assert_eq!(layer.blockhash_refresh, Some(BlockhashRefresh::Transaction));
        assert_eq!(
            layer.allowed_protocols,
            Some(vec!["kamino".to_string(), "marginfi".to_string()])
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ConfigLayer::from_toml_str("rpc_url = \"x\"").unwrap_err();
        assert!(matches!(err, LuloError::Parse(_)));
    }

    #[test]
    fn overlay_prefers_top_layer() {
        let file = ConfigLayer::from_toml_str(SAMPLE).unwrap();
        let flags = ConfigLayer {
            rpc_url: Some("http://localhost:8899".into()),
            priority_fee: Some(1),
            ..ConfigLayer::default()
        };
        let merged = file.overlay(flags);
        assert_eq!(merged.rpc_url.as_deref(), Some("http://localhost:8899"));
        assert_eq!(merged.priority_fee, Some(1));
        // untouched fields fall through from the file
        assert_eq!(merged.lulo_api_key.as_deref(), Some("lulo-secret"));
    }

    #[test]
    fn empty_values_do_not_override() {
        let file = ConfigLayer::from_toml_str(SAMPLE).unwrap();
        let env = ConfigLayer {
            rpc_url: Some(String::new()),
            allowed_protocols: Some(Vec::new()),
            ..ConfigLayer::default()
        };
        let merged = file.overlay(env);
        assert_eq!(merged.rpc_url.as_deref(), Some("https://mainnet.helius-rpc.com"));
        assert_eq!(merged.allowed_protocols.map(|l| l.len()), Some(2));
    }

    #[test]
    fn defaults_when_nothing_configured() {
        let config = LuloConfig::from(ConfigLayer::default());
        assert_eq!(config.lulo_api_url, lulo_api::DEFAULT_BASE_URL);
        assert_eq!(config.blockhash_refresh, BlockhashRefresh::Batch);
        assert!(config.allowed_protocols.is_empty());
        assert!(matches!(config.keypair_path(), Err(LuloError::Configuration(_))));
        assert!(matches!(config.rpc_url(), Err(LuloError::Configuration(_))));
    }

    #[test]
    fn secrets_are_wrapped_and_redacted() {
        let config = LuloConfig::from(ConfigLayer::from_toml_str(SAMPLE).unwrap());
        assert_eq!(
            config.lulo_api_key.as_ref().unwrap().expose_secret(),
            "lulo-secret"
        );

        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("lulo-secret"));
        assert!(!rendered.contains("rpc-secret"));
        assert!(rendered.contains("rpc-api-key = \"********\""));
        assert!(rendered.contains("blockhash-refresh = \"transaction\""));
        assert!(!format!("{config:?}").contains("lulo-secret"));
    }

    #[test]
    fn explicit_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLayer::discover(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, LuloError::Io(_)));
    }

    #[test]
    fn missing_default_file_is_empty_layer() {
        let dir = tempfile::tempdir().unwrap();
        let layer = ConfigLayer::discover_in(dir.path(), None).unwrap();
        assert_eq!(layer, ConfigLayer::default());
    }

    #[test]
    fn default_file_is_picked_up_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), SAMPLE).unwrap();
        let layer = ConfigLayer::discover_in(dir.path(), None).unwrap();
        assert_eq!(layer.priority_fee, Some(50000));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();
        let layer = ConfigLayer::load(&path).unwrap();
        assert_eq!(layer.keypair, Some(PathBuf::from("/home/me/.config/solana/id.json")));
    }

    #[test]
    fn refresh_policy_from_str() {
        assert_eq!("Batch".parse::<BlockhashRefresh>(), Ok(BlockhashRefresh::Batch));
        assert_eq!(
            "transaction".parse::<BlockhashRefresh>(),
            Ok(BlockhashRefresh::Transaction)
        );
        assert!("sometimes".parse::<BlockhashRefresh>().is_err());
    }
}
