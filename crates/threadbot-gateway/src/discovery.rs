//! Gateway URL discovery
//!
//! `GET {api_base}/gateway/bot` with the bot credential. 401 is fatal, 429 is retried after
//! the server-provided delay and anything else after a fixed delay, up to a bounded number
//! of attempts.

use crate::resilience::{with_timeout, TimeoutError};
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Bot token was rejected (401)")]
    InvalidToken,

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Unexpected status {status} from gateway discovery")]
    UnexpectedStatus { status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid gateway URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("Gateway discovery failed after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: Box<DiscoveryError>,
    },
}

impl DiscoveryError {
    /// Retrying cannot help
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidToken => true,
            Self::Exhausted { last_error, .. } => last_error.is_fatal(),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct DiscoveryConfig {
    /// REST base, e.g. `https://discord.com/api/v10`
    pub api_base: String,
    pub token: String,
    /// Gateway protocol version appended to the socket URL
    pub version: u8,
    pub max_attempts: u32,
    /// Delay after failures that carry no server-provided delay
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl DiscoveryConfig {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            token: token.into(),
            version: 10,
            max_attempts: 5,
            retry_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for DiscoveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryConfig")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .field("version", &self.version)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Body of a successful `GET /gateway/bot`
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayBotInfo {
    pub url: String,
    #[serde(default)]
    pub shards: Option<u32>,
    #[serde(default)]
    pub session_start_limit: Option<SessionStartLimit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionStartLimit {
    pub total: u32,
    pub remaining: u32,
    /// Milliseconds until the limit resets
    pub reset_after: u64,
    #[serde(default)]
    pub max_concurrency: Option<u32>,
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// HTTP client for gateway discovery
#[derive(Debug, Clone)]
pub struct GatewayDiscovery {
    http: reqwest::Client,
    config: DiscoveryConfig,
}

impl GatewayDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(http: reqwest::Client, config: DiscoveryConfig) -> Self {
        Self { http, config }
    }

    /// Resolve the WebSocket URL to connect to, with version and encoding applied
    pub async fn discover(&self) -> Result<String, DiscoveryError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.fetch_once().await {
                Ok(info) => {
                    if let Some(limit) = &info.session_start_limit {
                        tracing::debug!(
                            remaining = limit.remaining,
                            total = limit.total,
                            reset_after_ms = limit.reset_after,
                            "Session start limit"
                        );
                    }
                    let url = gateway_url(&info.url, self.config.version)?;
                    tracing::info!(url = %url, attempt, "Discovered gateway URL");
                    return Ok(url);
                }
                Err(e) => e,
            };

            if error.is_fatal() {
                tracing::error!(error = %error, "Gateway discovery rejected the bot token");
                return Err(error);
            }
            if attempt >= max_attempts {
                return Err(DiscoveryError::Exhausted {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            let delay = match &error {
                DiscoveryError::RateLimited { retry_after } => *retry_after,
                _ => self.config.retry_delay,
            };
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis(),
                error = %error,
                "Gateway discovery failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One `GET /gateway/bot` request
    pub async fn fetch_once(&self) -> Result<GatewayBotInfo, DiscoveryError> {
        let endpoint = format!("{}/gateway/bot", self.config.api_base.trim_end_matches('/'));
        let request = self
            .http
            .get(&endpoint)
            .header(AUTHORIZATION, format!("Bot {}", self.config.token))
            .send();

        let response = with_timeout(self.config.request_timeout, request).await??;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(DiscoveryError::InvalidToken);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header_delay = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<f64>().ok());
            let body_delay = response.json::<RateLimitBody>().await.ok().map(|b| b.retry_after);
            let retry_after = body_delay
                .or(header_delay)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(self.config.retry_delay);
            return Err(DiscoveryError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(DiscoveryError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<GatewayBotInfo>().await?)
    }
}

/// Append the protocol version and JSON encoding to a gateway URL
pub fn gateway_url(base: &str, version: u8) -> Result<String, DiscoveryError> {
    let mut url = Url::parse(base).map_err(|e| DiscoveryError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(DiscoveryError::InvalidUrl {
            url: base.to_string(),
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }

    url.query_pairs_mut()
        .append_pair("v", &version.to_string())
        .append_pair("encoding", "json");
    Ok(url.to_string())
}
