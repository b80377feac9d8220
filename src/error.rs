//! Typed, library-internal error taxonomy (spec.md §7).
//!
//! `anyhow` stays at the CLI boundary (`runner.rs`); everything the engine itself
//! raises is one of these, so callers can match on kind instead of string-sniffing.

use thiserror::Error;

/// Malformed options: bad URL, negative rate limit, unknown probe id, bad proxy.
/// Surfaced to the caller; a scan aborts before any probe runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid proxy url: {0}")]
    InvalidProxyUrl(String),
    #[error("invalid target url: {0}")]
    InvalidUrl(String),
    #[error("rate limit must be greater than zero")]
    NonPositiveRateLimit,
    #[error("unknown probe id: {0}")]
    UnknownProbeId(String),
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
}

/// OpenAPI input the translator cannot handle (spec.md §4.5/§6).
#[derive(Debug, Error)]
pub enum UnsupportedSpec {
    #[error("OpenAPI 2.x (Swagger) documents are not supported")]
    Version2,
    #[error("document contains an unresolved $ref: {0}")]
    UnresolvedRef(String),
    #[error("failed to parse document: {0}")]
    ParseError(String),
}

/// A security-scheme constructor or `set_attack_value` rejected a value (spec.md §4.2).
#[derive(Debug, Error)]
pub enum InvalidCredential {
    #[error("bearer token format is JWT but value does not parse as a JWT: {0}")]
    NotAJwt(String),
    #[error("basic auth credential must be \"user:password\"")]
    MalformedBasic,
}

#[derive(Debug, Error)]
pub enum InvalidAttackValue {
    #[error("attack value must parse as a JWT for this scheme: {0}")]
    NotAJwt(String),
}

/// DNS / TCP / TLS / timeout failures from the shared HTTP client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(std::time::Duration::from_secs(0))
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtParseError {
    #[error("expected 3 dot-separated segments, found {0}")]
    WrongSegmentCount(usize),
    #[error("invalid base64url in {0} segment")]
    InvalidBase64(&'static str),
    #[error("invalid JSON in {0} segment: {1}")]
    InvalidJson(&'static str, String),
}

#[derive(Debug, Error)]
pub enum JwtSignError {
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Per-probe error, contained by the orchestrator and recorded on the attempt (spec.md §7).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    JwtParse(#[from] JwtParseError),
    #[error(transparent)]
    JwtSign(#[from] JwtSignError),
    #[error(transparent)]
    InvalidAttackValue(#[from] InvalidAttackValue),
    #[error("{0}")]
    Other(String),
}

/// Setup-time failures surfaced by `Scan::new_*` / `Scan::execute`.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    UnsupportedSpec(#[from] UnsupportedSpec),
    #[error("orchestrator invariant violated: {0}")]
    Fatal(String),
}
