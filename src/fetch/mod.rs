//! Fetches OpenAPI documents from downstream services.
//!
//! Fetching is single-flight (via [`AggregationCache::get_or_compute`]),
//! bounded by a global concurrency semaphore, retried across a configured
//! list of fallback paths, and shielded from flapping downstreams by
//! caching failures with their own (shorter) TTL.

use crate::cache::AggregationCache;
use crate::config::AggregationOptions;
use crate::errors::{AggregatorError, Result};
use openapiv3::OpenAPI;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Raw response from an HTTP GET, abstracted so tests can substitute a fake
/// transport instead of hitting the network.
pub struct FetchedResponse {
    pub status: u16,
    pub body: bytes::Bytes,
}

/// The HTTP client seam. Production code uses [`ReqwestTransport`]; tests
/// implement this directly or point a [`ReqwestTransport`] at a `wiremock`
/// server.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedResponse>;
}

/// Production transport: a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedResponse> {
        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| AggregatorError::timeout(format!("GET {url}"), timeout.as_millis() as u64))?
            .map_err(|e| AggregatorError::fetch(url, e.to_string(), true))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| AggregatorError::fetch(url, e.to_string(), true))?;

        Ok(FetchedResponse { status, body })
    }
}

/// Fetches and caches downstream OpenAPI documents.
pub struct DocumentFetcher {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<AggregationCache>,
    semaphore: Arc<Semaphore>,
    fallback_paths: Vec<String>,
    fetch_timeout: Duration,
    cache_ttl: Duration,
    failure_cache_ttl: Duration,
    max_payload: usize,
}

impl DocumentFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, cache: Arc<AggregationCache>, options: &AggregationOptions) -> Self {
        Self {
            transport,
            cache,
            semaphore: Arc::new(Semaphore::new(options.max_concurrent_fetches)),
            fallback_paths: options.fallback_paths.clone(),
            fetch_timeout: options.fetch_timeout(),
            cache_ttl: options.cache_duration(),
            failure_cache_ttl: options.failure_cache_duration(),
            max_payload: options.maximum_cache_payload_bytes,
        }
    }

    /// Fetch the OpenAPI document at `base_url` + `primary_path`, falling
    /// back through the configured fallback paths on non-2xx responses,
    /// transport errors, or parse failures. Returns `None` if every
    /// attempt fails; the failure is cached so repeated callers don't
    /// re-hit a downed service.
    pub async fn fetch(&self, base_url: &str, primary_path: &str) -> Option<OpenAPI> {
        let key = format!("openapi:{}", canonical_key(base_url, primary_path));
        let base_tag = format!("baseUrl:{base_url}");
        let tags = ["openapi", base_tag.as_str()];

        let bytes = self
            .cache
            .get_or_compute(&key, self.cache_ttl, self.failure_cache_ttl, &tags, self.max_payload, || {
                self.fetch_with_fallback(base_url, primary_path)
            })
            .await?;

        serde_json::from_slice(&bytes).ok()
    }

    async fn fetch_with_fallback(&self, base_url: &str, primary_path: &str) -> Option<Vec<u8>> {
        let mut paths = Vec::with_capacity(1 + self.fallback_paths.len());
        paths.push(primary_path.to_string());
        paths.extend(self.fallback_paths.iter().cloned());

        for path in paths {
            if let Some(bytes) = self.try_one(base_url, &path).await {
                return Some(bytes);
            }
        }
        None
    }

    async fn try_one(&self, base_url: &str, path: &str) -> Option<Vec<u8>> {
        let _span = crate::fetch_span!(base_url, path).entered();
        let _permit = self.semaphore.acquire().await.ok()?;
        let url = match join_url(base_url, path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(base_url = %base_url, path = %path, error = %e, "could not build fetch URL");
                return None;
            }
        };

        let response = match self.transport.get(&url, self.fetch_timeout).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "openapi fetch attempt failed");
                return None;
            }
        };

        if !(200..300).contains(&response.status) {
            tracing::warn!(url = %url, status = response.status, "openapi fetch returned non-2xx");
            return None;
        }

        match serde_json::from_slice::<OpenAPI>(&response.body) {
            Ok(doc) => serde_json::to_vec(&doc).ok(),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "downstream document failed to parse as OpenAPI");
                None
            }
        }
    }
}

fn canonical_key(base_url: &str, path: &str) -> String {
    join_url(base_url, path).unwrap_or_else(|_| format!("{base_url}{path}"))
}

/// Appends `path` to `base_url`'s existing path, rather than resolving it
/// as a browser would (which would drop everything in `base_url` after its
/// last `/`). Validates `base_url` as a real URL in the process.
fn join_url(base_url: &str, path: &str) -> Result<String> {
    let mut url = url::Url::parse(base_url).map_err(AggregatorError::from)?;
    let existing = url.path().trim_end_matches('/');
    let addition = path.trim_start_matches('/');
    url.set_path(&format!("{existing}/{addition}"));
    Ok(url.to_string())
}
