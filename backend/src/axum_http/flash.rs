//! One-shot flash messages carried across a redirect in a signed cookie.
//!
//! Token layout: `base64url(json payload) "." base64url(hmac-sha256(payload))`.

use anyhow::{Result, anyhow};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const FLASH_COOKIE: &str = "flash";
pub const FLASH_PATH: &str = "/admin/assinaturas";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub kind: FlashKind,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FlashPayload {
    kind: FlashKind,
    message: String,
    exp: i64,
}

pub struct FlashSigner {
    key: Vec<u8>,
    ttl_seconds: u64,
    secure: bool,
}

impl FlashSigner {
    pub fn new(secret: &str, ttl_seconds: u64, secure: bool) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl_seconds,
            secure,
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key).map_err(|err| anyhow!("invalid flash key: {}", err))
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX / 1000))
    }

    pub fn sign(&self, flash: &FlashMessage, now: DateTime<Utc>) -> Result<String> {
        let payload = FlashPayload {
            kind: flash.kind,
            message: flash.message.clone(),
            exp: (now + self.ttl()).timestamp(),
        };
        let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?);

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", encoded, signature))
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<FlashMessage> {
        let (encoded, signature) = token
            .split_once('.')
            .ok_or_else(|| anyhow!("malformed flash token"))?;
        let signature = URL_SAFE_NO_PAD.decode(signature)?;

        let mut mac = self.mac()?;
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| anyhow!("flash signature mismatch"))?;

        let payload: FlashPayload = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(encoded)?)?;
        if payload.exp <= now.timestamp() {
            return Err(anyhow!("flash token expired"));
        }

        Ok(FlashMessage {
            kind: payload.kind,
            message: payload.message,
        })
    }

    /// Adds the flash cookie for the redirect target. Signing failures drop
    /// the message rather than the redirect.
    pub fn set(&self, jar: CookieJar, flash: FlashMessage) -> CookieJar {
        match self.sign(&flash, Utc::now()) {
            Ok(token) => jar.add(
                Cookie::build((FLASH_COOKIE, token))
                    .path(FLASH_PATH)
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(self.secure)
                    .max_age(cookie::time::Duration::seconds(
                        i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX / 1000),
                    )),
            ),
            Err(err) => {
                warn!(error = ?err, "admin_pages: failed to sign flash message");
                jar
            }
        }
    }

    /// Reads and clears the flash cookie. Invalid or expired tokens are dropped.
    pub fn take(&self, jar: CookieJar) -> (CookieJar, Option<FlashMessage>) {
        let Some(token) = jar.get(FLASH_COOKIE).map(|cookie| cookie.value().to_string()) else {
            return (jar, None);
        };

        let flash = match self.verify(&token, Utc::now()) {
            Ok(flash) => Some(flash),
            Err(err) => {
                warn!(error = %err, "admin_pages: discarding invalid flash cookie");
                None
            }
        };

        let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path(FLASH_PATH));
        (jar, flash)
    }
}
