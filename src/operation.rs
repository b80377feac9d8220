//! A single HTTP operation under test (spec.md §4.4 / component C4).
//!
//! Grounded on the teacher's `http_probe.rs`, which already builds `reqwest::Request`s from a
//! `Method`/`Url`/body triple; generalized here to also carry the security schemes bound to it
//! (an OpenAPI-expanded operation can carry several alternatives, spec.md §4.5 item 5) and to
//! support the deep clone `misconfiguration::http_trace` needs to mutate only the method.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, Url};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::http_client::Client;
use crate::security_scheme::SecurityScheme;

/// One HTTP request shape under test, plus the security schemes bound to it. Cloning is a deep
/// copy — every probe works on its own clone so a mutation (e.g. the TRACE probe's method swap)
/// never leaks into the next probe's view of the same operation (spec.md §3 isolation invariant).
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    pub method: Method,
    pub url: Url,
    pub raw_url: String,
    pub headers: HeaderMap,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub security_schemes: Vec<SecurityScheme>,
}

impl Operation {
    /// Single-operation constructor: the whole scan surface is this one request, with `NoAuth`
    /// as its only security scheme (equivalent to a one-operation OpenAPI document, spec.md §6).
    pub fn new(
        method: Method,
        url: Url,
        body: Option<Bytes>,
        _client: Arc<Client>,
    ) -> Result<Self, ConfigError> {
        let raw_url = url.to_string();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            method,
            url,
            raw_url,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body,
            security_schemes: vec![SecurityScheme::no_auth()],
        })
    }

    pub fn with_security_schemes(mut self, schemes: Vec<SecurityScheme>) -> Self {
        self.security_schemes = schemes;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_cookies(mut self, cookies: Vec<(String, String)>) -> Self {
        self.cookies = cookies;
        self
    }

    /// Builds a `RequestBuilder` for this operation's method/url/headers/cookies/body, with
    /// `scheme` applied last so an attack value always wins over any operation-level header that
    /// happens to share a name.
    pub fn new_request(&self, client: &Client, scheme: &SecurityScheme) -> RequestBuilder {
        let mut req = client.request(self.method.clone(), self.url.clone());
        req = req.headers(client.header().clone());
        req = req.headers(self.headers.clone());

        let mut cookie_header = String::new();
        for (name, value) in client.cookies().iter().chain(self.cookies.iter()) {
            if !cookie_header.is_empty() {
                cookie_header.push_str("; ");
            }
            cookie_header.push_str(name);
            cookie_header.push('=');
            cookie_header.push_str(value);
        }
        if !cookie_header.is_empty() {
            req = req.header(reqwest::header::COOKIE, cookie_header);
        }

        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        scheme.apply(req)
    }

    /// Returns a clone with `method` replaced — used by probes (http_trace) that need to send a
    /// structurally different request without disturbing the original operation.
    pub fn with_method(&self, method: Method) -> Self {
        let mut clone = self.clone();
        clone.method = method;
        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{Client, ClientOptions};

    fn test_client() -> Arc<Client> {
        Arc::new(Client::new(ClientOptions::default()).unwrap())
    }

    #[test]
    fn new_assigns_a_unique_id_and_no_auth_scheme() {
        let url = Url::parse("https://example.com/widgets").unwrap();
        let op = Operation::new(Method::GET, url, None, test_client()).unwrap();
        assert_eq!(op.security_schemes.len(), 1);
        assert!(!op.id.is_empty());
    }

    #[test]
    fn with_method_does_not_mutate_the_original() {
        let url = Url::parse("https://example.com/widgets").unwrap();
        let op = Operation::new(Method::GET, url, None, test_client()).unwrap();
        let traced = op.with_method(Method::TRACE);
        assert_eq!(op.method, Method::GET);
        assert_eq!(traced.method, Method::TRACE);
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let url = Url::parse("https://example.com/widgets").unwrap();
        let mut op = Operation::new(Method::GET, url, None, test_client()).unwrap();
        let snapshot = op.clone();
        op.security_schemes.push(SecurityScheme::no_auth());
        assert_eq!(snapshot.security_schemes.len(), 1);
        assert_eq!(op.security_schemes.len(), 2);
    }
}
