//! Bearer token verification for the engine.
//!
//! Tokens are HS256 JWTs. The signing key is read once per process and kept
//! read-only; a failed load stays failed until restart.

use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use sha2::Sha256;
use std::fs;
use std::path::PathBuf;

use crate::config::EngineSection;

type HmacSha256 = Hmac<Sha256>;

/// Where the signing key comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Inline(String),
    File(PathBuf),
    Missing,
}

impl KeySource {
    pub fn from_config(engine: &EngineSection) -> Self {
        if let Some(secret) = engine.jwt_secret.clone().filter(|s| !s.is_empty()) {
            return KeySource::Inline(secret);
        }
        match &engine.jwt_secret_path {
            Some(p) => KeySource::File(p.clone()),
            None => KeySource::Missing,
        }
    }

    fn load(&self) -> Result<Vec<u8>> {
        let key = match self {
            KeySource::Inline(s) => s.as_bytes().to_vec(),
            KeySource::File(p) => {
                let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
                s.trim().as_bytes().to_vec()
            }
            KeySource::Missing => bail!("no JWT signing key configured"),
        };
        if key.is_empty() {
            bail!("JWT signing key is empty");
        }
        Ok(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyState {
    NotLoaded,
    Loaded,
    Failed(String),
}

/// Init-once holder for the signing key.
pub struct KeyCache {
    cell: OnceCell<Result<Vec<u8>, String>>,
}

/// Process-wide key used by the engine service.
pub static SIGNING_KEY: KeyCache = KeyCache::new();

impl KeyCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn state(&self) -> KeyState {
        match self.cell.get() {
            None => KeyState::NotLoaded,
            Some(Ok(_)) => KeyState::Loaded,
            Some(Err(e)) => KeyState::Failed(e.clone()),
        }
    }

    /// Load on first use; later calls return the cached outcome.
    pub fn get_or_load(&self, source: &KeySource) -> Result<&[u8]> {
        let loaded = self.cell.get_or_init(|| {
            let res = source.load().map_err(|e| format!("{e:#}"));
            match &res {
                Ok(_) => tracing::info!("JWT signing key loaded"),
                Err(e) => tracing::error!("JWT signing key failed to load: {e}"),
            }
            res
        });
        match loaded {
            Ok(key) => Ok(key.as_slice()),
            Err(e) => Err(anyhow!("signing key unavailable: {e}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub acct: Option<String>,
    pub sub: Option<String>,
    pub exp: Option<i64>,
}

impl Claims {
    /// Account identifier from `acct`, falling back to `sub`.
    pub fn account_id(&self) -> Option<&str> {
        non_empty(&self.acct).or_else(|| non_empty(&self.sub))
    }
}

fn non_empty(claim: &Option<String>) -> Option<&str> {
    claim.as_deref().filter(|s| !s.is_empty())
}

/// Verify an HS256 token's signature and expiry against `now` (unix seconds).
pub fn verify_jwt(key: &[u8], token: &str, now: i64) -> Result<Claims> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("token is not three dot-separated segments");
    };

    let header: Header = decode_segment(header_b64).context("bad token header")?;
    if header.alg != "HS256" {
        bail!("unsupported token algorithm {}", header.alg);
    }

    let signature = URL_SAFE_NO_PAD.decode(sig_b64).context("bad token signature encoding")?;
    let mut mac = HmacSha256::new_from_slice(key).context("invalid signing key")?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature).map_err(|_| anyhow!("invalid signature"))?;

    let claims: Claims = decode_segment(payload_b64).context("bad token payload")?;
    if claims.exp.is_some_and(|exp| exp <= now) {
        bail!("token expired");
    }
    Ok(claims)
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Strip the `Bearer ` scheme from an Authorization header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
pub(crate) fn sign_hs256(key: &[u8], claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key");
    mac.update(format!("{header}.{payload}").as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{header}.{payload}.{sig}")
}
