//! HTTP-backed embedding provider.
//!
//! Grounded on `llmspell-context`'s `reqwest` + `async-trait` usage —
//! `vestige-core` has no remote-HTTP embedding path of its own. Adds a
//! token-bucket limiter in front of the client and retries rate-limited
//! responses with bounded exponential backoff, per the provider
//! contract's `maxRetries=3`, `baseDelay=2s`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant as TokioInstant;

use super::provider::{EmbeddingError, EmbeddingProvider};

const MAX_RETRIES: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(2);

/// Simple token bucket: one permit refills every `refill_interval`, up
/// to `capacity` permits outstanding.
struct TokenBucket {
    capacity: f64,
    tokens: Mutex<f64>,
    refill_per_sec: f64,
    last_refill: Mutex<TokioInstant>,
}

impl TokenBucket {
    fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: capacity as f64,
            tokens: Mutex::new(capacity as f64),
            refill_per_sec,
            last_refill: Mutex::new(TokioInstant::now()),
        }
    }

    async fn acquire(&self) {
        loop {
            {
                let mut tokens = self.tokens.lock();
                let mut last = self.last_refill.lock();
                let now = TokioInstant::now();
                let elapsed = now.saturating_duration_since(*last).as_secs_f64();
                *tokens = (*tokens + elapsed * self.refill_per_sec).min(self.capacity);
                *last = now;

                if *tokens >= 1.0 {
                    *tokens -= 1.0;
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

/// Remote embedding provider speaking a simple OpenAI-style JSON API.
pub struct RemoteProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    provider_name: String,
    bucket: TokenBucket,
    requests_sent: AtomicU64,
    retries_performed: AtomicU64,
}

impl RemoteProvider {
    pub fn new(
        endpoint: String,
        api_key: String,
        model: String,
        dimension: usize,
        provider_name: String,
        requests_per_sec: f64,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            dimension,
            provider_name,
            bucket: TokenBucket::new(requests_per_sec.ceil() as u32, requests_per_sec),
            requests_sent: AtomicU64::new(0),
            retries_performed: AtomicU64::new(0),
        }
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    pub fn retries_performed(&self) -> u64 {
        self.retries_performed.load(Ordering::Relaxed)
    }

    async fn send_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempt = 0u32;
        loop {
            self.bucket.acquire().await;
            self.requests_sent.fetch_add(1, Ordering::Relaxed);

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&EmbedRequest {
                    model: &self.model,
                    input: texts,
                })
                .send()
                .await
                .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if attempt >= MAX_RETRIES {
                    return Err(EmbeddingError::RateLimited { retries: attempt });
                }
                let delay = BASE_DELAY * 2u32.pow(attempt);
                tracing::warn!(attempt, ?delay, "embedding provider rate limited, backing off");
                self.retries_performed.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !response.status().is_success() {
                return Err(EmbeddingError::Provider(format!(
                    "status {}",
                    response.status()
                )));
            }

            let body: EmbedResponse = response
                .json()
                .await
                .map_err(|e| EmbeddingError::Provider(e.to_string()))?;
            return Ok(body.data.into_iter().map(|d| d.embedding).collect());
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let batch = self.send_batch(std::slice::from_ref(&text.to_string())).await?;
        batch
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Provider("empty response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.send_batch(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        &self.provider_name
    }
}
