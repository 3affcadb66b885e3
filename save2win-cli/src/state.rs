use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{KeyCache, KeySource};
use crate::config::Config;
use crate::llm::{LlmConfig, Narrator};
use crate::upstream::UpstreamClient;

/// Shared state of the context gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
}

impl GatewayState {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let upstream = UpstreamClient::new(
            Duration::from_secs(config.gateway.timeout_secs),
            config.gateway.max_retries,
        )?;
        Ok(Self { config, upstream })
    }
}

/// Shared state of the game-state engine.
#[derive(Clone)]
pub struct EngineState {
    pub config: Arc<Config>,
    pub gateway: UpstreamClient,
    pub narrator: Arc<Narrator>,
    pub keys: &'static KeyCache,
    pub key_source: Arc<KeySource>,
}

impl EngineState {
    pub fn new(config: Arc<Config>, keys: &'static KeyCache) -> Result<Self> {
        let gateway = UpstreamClient::new(Duration::from_secs(config.engine.timeout_secs), 0)?;
        let narrator = Narrator::new(LlmConfig::from_section(&config.llm))?;
        let key_source = KeySource::from_config(&config.engine);
        Ok(Self {
            config,
            gateway,
            narrator: Arc::new(narrator),
            keys,
            key_source: Arc::new(key_source),
        })
    }
}
