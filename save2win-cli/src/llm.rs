//! Narrative content (quest + tip) from a hosted chat model.
//!
//! Any failure here is logged and replaced by the fixed fallback pair;
//! the game-state endpoint never fails because the model did.

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use save2win_finance::NarrativeContent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::LlmSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-sonnet-latest",
            Provider::OpenAI => "gpt-4o-mini",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
}

impl LlmConfig {
    /// `None` when no provider or no key is configured.
    pub fn from_section(section: &LlmSection) -> Option<Self> {
        let provider = section.provider?;
        let api_key = section.api_key.clone().filter(|k| !k.is_empty())?;
        Some(Self {
            provider,
            model: section
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            api_key,
            temperature: section.temperature,
        })
    }
}

const SYSTEM: &str = "You are a fun financial coach.";

fn build_prompt(transactions: &[Value]) -> String {
    let txns = serde_json::to_string(transactions).unwrap_or_else(|_| "[]".to_string());
    format!(
        "A user has these recent transactions: {txns}.\n\
Based on this, generate a valid JSON object with two keys only:\n\
1. \"quest\": A creative, one-week savings challenge.\n\
2. \"tip\": A short, motivational financial tip."
    )
}

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid fence regex"));

/// Parse a model reply into narrative content. Code fences are stripped;
/// the remaining text must be a JSON object.
pub fn parse_narrative(text: &str) -> Result<NarrativeContent> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim();

    let value: Value = serde_json::from_str(body).context("model reply is not JSON")?;
    if !value.is_object() {
        bail!("model reply is not a JSON object");
    }
    Ok(NarrativeContent::from_json(&value))
}

pub struct Narrator {
    client: reqwest::Client,
    config: Option<LlmConfig>,
}

impl Narrator {
    pub fn new(config: Option<LlmConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("building LLM client")?;
        Ok(Self { client, config })
    }

    /// Generated content, or the fallback pair on any failure.
    pub async fn narrative(&self, transactions: &[Value]) -> NarrativeContent {
        match self.generate(transactions).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("narrative generation failed, using fallback: {e:#}");
                NarrativeContent::fallback()
            }
        }
    }

    async fn generate(&self, transactions: &[Value]) -> Result<NarrativeContent> {
        let Some(config) = &self.config else {
            bail!("no LLM provider configured");
        };
        let prompt = build_prompt(transactions);
        let text = match config.provider {
            Provider::Anthropic => self.anthropic_complete(config, &prompt).await?,
            Provider::OpenAI => self.openai_complete(config, &prompt).await?,
        };
        tracing::debug!(provider = ?config.provider, len = text.len(), "model reply received");
        parse_narrative(&text)
    }

    async fn anthropic_complete(&self, config: &LlmConfig, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: i32,
            temperature: f32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: &config.model,
            max_tokens: 450,
            temperature: config.temperature,
            system: SYSTEM,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&config.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("anthropic error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse anthropic response")?;
        let mut s = String::new();
        for b in out.content {
            if b.t == "text" {
                if let Some(t) = b.text {
                    s.push_str(&t);
                }
            }
        }
        Ok(s.trim().to_string())
    }

    async fn openai_complete(&self, config: &LlmConfig, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: &config.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: config.temperature,
        };

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse openai response")?;
        let content = out
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"quest\": \"Brew at home\", \"tip\": \"Skip one latte\"}\n```";
        let c = parse_narrative(reply).unwrap();
        assert_eq!(c.quest, "Brew at home");
        assert_eq!(c.tip, "Skip one latte");
    }

    #[test]
    fn test_parse_bare_reply_with_missing_tip() {
        let c = parse_narrative(r#"  {"quest": "Cash-only week"} "#).unwrap();
        assert_eq!(c.quest, "Cash-only week");
        assert_eq!(c.tip, "Save a little every day!");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_narrative("Sure! Save more.").is_err());
        assert!(parse_narrative("```json\n[1, 2]\n```").is_err());
    }

    #[test]
    fn test_config_requires_provider_and_key() {
        let mut section = LlmSection::default();
        assert!(LlmConfig::from_section(&section).is_none());

        section.provider = Some(Provider::OpenAI);
        assert!(LlmConfig::from_section(&section).is_none());

        section.api_key = Some("sk-test".to_string());
        let cfg = LlmConfig::from_section(&section).unwrap();
        assert_eq!(cfg.model, "gpt-4o-mini");
    }

    #[test]
    fn test_prompt_embeds_transactions() {
        let p = build_prompt(&[json!({"merchant": "Costa", "amount": -3})]);
        assert!(p.contains("\"merchant\":\"Costa\""));
        assert!(p.contains("\"quest\""));
    }

    #[tokio::test]
    async fn test_unconfigured_narrator_falls_back() {
        let narrator = Narrator::new(None).unwrap();
        let c = narrator.narrative(&[]).await;
        assert_eq!(c, NarrativeContent::fallback());
    }
}
