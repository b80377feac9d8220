//! Shared HTTP client pool + rate limiter (spec.md §4.1 / component C1).
//!
//! Grounded on the teacher's `ClientBuilder` options (`create_optimized_client`) and on
//! `original_source/internal/request/client.go`'s option set (timeout default 10s, explicit
//! proxy override, header/cookie passthrough). The Go file keeps a lazily-initialized
//! `defaultClient *Client = nil` module global reachable via `GetDefaultClient()`/`SetDefaultClient()`;
//! we keep the same "there is one obvious default" ergonomics but require it to flow through an
//! explicit accessor (`default_client()`) rather than being mutated from anywhere (spec.md §9).

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Request, RequestBuilder, Response, Url};

use crate::error::{ConfigError, TransportError};
use crate::rate_limiter::RateLimiter;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RATE_LIMIT: u32 = 10;
const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub timeout: Option<Duration>,
    pub rate_limit: Option<u32>,
    pub proxy_url: Option<Url>,
    pub header: HeaderMap,
    pub cookies: Vec<(String, String)>,
}

/// One shared, reusable HTTP client: connection pool + token-bucket rate limiter + default
/// headers/cookies. Safe to clone cheaply (`reqwest::Client` and `Arc<RateLimiter>` both are).
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
    header: HeaderMap,
    cookies: Vec<(String, String)>,
    limiter: Arc<RateLimiter>,
}

impl Client {
    pub fn new(opts: ClientOptions) -> Result<Self, ConfigError> {
        let timeout = opts.timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let rate_limit = opts.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(DEFAULT_POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::limited(5));

        if let Some(proxy_url) = &opts.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url.clone())
                .map_err(|e| ConfigError::InvalidProxyUrl(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let inner = builder
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;

        let limiter = RateLimiter::new(rate_limit)?;

        Ok(Self {
            inner,
            header: opts.header,
            cookies: opts.cookies,
            limiter,
        })
    }

    pub fn with_header(mut self, header: HeaderMap) -> Self {
        self.header = header;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<(String, String)>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn header(&self) -> &HeaderMap {
        &self.header
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.request(method, url)
    }

    /// Acquires a rate-limit token, then performs the request.
    pub async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.limiter.acquire().await;
        self.inner.execute(request).await.map_err(TransportError::from)
    }
}

static DEFAULT_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| {
    Arc::new(Client::new(ClientOptions::default()).expect("default client options are always valid"))
});

/// The process-wide default client: 10s timeout, 10 req/s, no proxy. Callers that need
/// non-default headers/cookies/timeout/proxy build their own `Client` instead (spec.md §4.1).
pub fn default_client() -> Arc<Client> {
    DEFAULT_CLIENT.clone()
}

pub fn header_value(v: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(v).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_build_a_client() {
        let client = Client::new(ClientOptions::default());
        assert!(client.is_ok());
    }

    #[test]
    fn default_client_is_a_shared_singleton() {
        let a = default_client();
        let b = default_client();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
