use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::llm::Provider;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub gateway: GatewaySection,
    pub engine: EngineSection,
    pub llm: LlmSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Base URL of the transaction history service; the account id is appended as a path segment
    pub transactions_api_url: String,
    pub enrich_transactions: bool,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub mcp_service_url: String,
    /// HS256 secret given inline; takes precedence over `jwt_secret_path`
    pub jwt_secret: Option<String>,
    pub jwt_secret_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// No provider means the fallback narrative is always used
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            transactions_api_url: "http://transactionhistory.boa.svc.cluster.local/transactions"
                .to_string(),
            enrich_transactions: false,
            timeout_secs: 5,
            max_retries: 3,
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            mcp_service_url: "http://mcp-service.boa.svc.cluster.local/v1/context/transactions"
                .to_string(),
            jwt_secret: None,
            jwt_secret_path: None,
            timeout_secs: 5,
        }
    }
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            api_key: None,
            temperature: 0.7,
        }
    }
}

/// Environment variables that override file/default settings.
#[derive(Debug, Default, Deserialize)]
pub struct EnvOverrides {
    pub port: Option<u16>,
    pub transactions_api_url: Option<String>,
    pub enrich_transactions: Option<bool>,
    pub mcp_service_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_secret_path: Option<PathBuf>,
    pub llm_provider: Option<Provider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Defaults, then the optional TOML file, then the environment (`.env` included).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };

        // a missing .env is fine
        dotenv::dotenv().ok();
        let env = envy::from_env::<EnvOverrides>().context("invalid environment variables")?;
        cfg.apply(env);

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_toml(&s).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn apply(&mut self, env: EnvOverrides) {
        if let Some(v) = env.port {
            self.server.port = v;
        }
        if let Some(v) = env.transactions_api_url {
            self.gateway.transactions_api_url = v;
        }
        if let Some(v) = env.enrich_transactions {
            self.gateway.enrich_transactions = v;
        }
        if let Some(v) = env.mcp_service_url {
            self.engine.mcp_service_url = v;
        }
        if env.jwt_secret.is_some() {
            self.engine.jwt_secret = env.jwt_secret;
        }
        if env.jwt_secret_path.is_some() {
            self.engine.jwt_secret_path = env.jwt_secret_path;
        }
        if env.llm_provider.is_some() {
            self.llm.provider = env.llm_provider;
        }
        if env.llm_model.is_some() {
            self.llm.model = env.llm_model;
        }
        if env.llm_api_key.is_some() {
            self.llm.api_key = env.llm_api_key;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.gateway.max_retries, 3);
        assert!(!cfg.gateway.enrich_transactions);
        assert!(cfg.llm.provider.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
[gateway]
enrich_transactions = true

[llm]
provider = "anthropic"
"#,
        )
        .unwrap();
        assert!(cfg.gateway.enrich_transactions);
        assert_eq!(cfg.gateway.timeout_secs, 5);
        assert_eq!(cfg.llm.provider, Some(Provider::Anthropic));
        assert_eq!(cfg.server.host, "0.0.0.0");
    }

    #[test]
    fn test_env_overrides_win() {
        let mut cfg = Config::from_toml("[server]\nport = 9000\n").unwrap();
        cfg.apply(EnvOverrides {
            port: Some(7070),
            mcp_service_url: Some("http://localhost:9000/v1/context/transactions".to_string()),
            llm_provider: Some(Provider::OpenAI),
            ..Default::default()
        });
        assert_eq!(cfg.server.port, 7070);
        assert_eq!(cfg.engine.mcp_service_url, "http://localhost:9000/v1/context/transactions");
        assert_eq!(cfg.llm.provider, Some(Provider::OpenAI));
        // untouched
        assert!(cfg.engine.jwt_secret.is_none());
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(Config::from_toml("[server]\nport = \"eighty\"\n").is_err());
    }
}
