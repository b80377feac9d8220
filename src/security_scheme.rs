//! Security-scheme model (spec.md §4.2 / component C2).
//!
//! Grounded on `original_source/scan/broken_authentication/{authentication_bypass,jwt/*}/*.go`
//! for the exact surface every probe relies on (`HasValidValue`, `GetValidValueWriter`,
//! `SetAttackValue`, `GetToken`, `Reset`), modeled here as a tagged enum per spec.md §9's
//! "Polymorphic security schemes" note rather than a trait object — the variant set is closed
//! and each variant's attack-value validation differs (JWT bearer validates, the rest don't).

use std::collections::HashMap;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidAttackValue, InvalidCredential};
use crate::jwt::JwtWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeType {
    None,
    HttpBasic,
    HttpBearer,
    ApiKey,
    OAuth2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeIn {
    Header,
    Cookie,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenFormat {
    Opaque,
    Jwt,
}

/// An authentication mechanism bound to an operation and its current (valid or attack)
/// credential. `apply` never mutates the scheme; `set_attack_value` never touches the valid
/// value (spec.md §4.2 invariant).
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityScheme {
    NoAuth,
    HttpBasic {
        name: String,
        valid: Option<(String, String)>,
        attack: Option<(String, String)>,
    },
    HttpBearer {
        name: String,
        token_format: TokenFormat,
        valid: Option<String>,
        attack: Option<String>,
    },
    ApiKey {
        name: String,
        location: SchemeIn,
        valid: Option<String>,
        attack: Option<String>,
    },
    OAuth2 {
        name: String,
        valid: Option<String>,
        attack: Option<String>,
    },
}

impl SecurityScheme {
    pub fn no_auth() -> Self {
        SecurityScheme::NoAuth
    }

    pub fn http_basic(name: impl Into<String>, valid: Option<&str>) -> Result<Self, InvalidCredential> {
        let valid = valid.map(parse_basic).transpose()?;
        Ok(SecurityScheme::HttpBasic {
            name: name.into(),
            valid: valid.clone(),
            attack: valid,
        })
    }

    /// Opaque bearer token (no JWT structural validation).
    pub fn http_bearer(name: impl Into<String>, valid: Option<&str>) -> Self {
        let valid = valid.map(str::to_string);
        SecurityScheme::HttpBearer {
            name: name.into(),
            token_format: TokenFormat::Opaque,
            attack: valid.clone(),
            valid,
        }
    }

    /// Bearer token declared as JWT; fails `InvalidCredential` if `valid` doesn't parse as one.
    pub fn http_bearer_jwt(name: impl Into<String>, valid: Option<&str>) -> Result<Self, InvalidCredential> {
        if let Some(v) = valid {
            JwtWriter::parse(v).map_err(|_| InvalidCredential::NotAJwt(v.to_string()))?;
        }
        let valid = valid.map(str::to_string);
        Ok(SecurityScheme::HttpBearer {
            name: name.into(),
            token_format: TokenFormat::Jwt,
            attack: valid.clone(),
            valid,
        })
    }

    pub fn api_key(name: impl Into<String>, location: SchemeIn, valid: Option<&str>) -> Self {
        let valid = valid.map(str::to_string);
        SecurityScheme::ApiKey {
            name: name.into(),
            location,
            attack: valid.clone(),
            valid,
        }
    }

    pub fn oauth2(name: impl Into<String>, valid: Option<&str>) -> Self {
        let valid = valid.map(str::to_string);
        SecurityScheme::OAuth2 {
            name: name.into(),
            attack: valid.clone(),
            valid,
        }
    }

    pub fn scheme_type(&self) -> SchemeType {
        match self {
            SecurityScheme::NoAuth => SchemeType::None,
            SecurityScheme::HttpBasic { .. } => SchemeType::HttpBasic,
            SecurityScheme::HttpBearer { .. } => SchemeType::HttpBearer,
            SecurityScheme::ApiKey { .. } => SchemeType::ApiKey,
            SecurityScheme::OAuth2 { .. } => SchemeType::OAuth2,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SecurityScheme::NoAuth => "none",
            SecurityScheme::HttpBasic { name, .. }
            | SecurityScheme::HttpBearer { name, .. }
            | SecurityScheme::ApiKey { name, .. }
            | SecurityScheme::OAuth2 { name, .. } => name,
        }
    }

    pub fn token_format(&self) -> Option<TokenFormat> {
        match self {
            SecurityScheme::HttpBearer { token_format, .. } => Some(*token_format),
            _ => None,
        }
    }

    pub fn has_valid_value(&self) -> bool {
        match self {
            SecurityScheme::NoAuth => false,
            SecurityScheme::HttpBasic { valid, .. } => valid.is_some(),
            SecurityScheme::HttpBearer { valid, .. } => valid.is_some(),
            SecurityScheme::ApiKey { valid, .. } => valid.is_some(),
            SecurityScheme::OAuth2 { valid, .. } => valid.is_some(),
        }
    }

    /// The bearer token text, whether it's the valid or currently-installed attack value — the
    /// convenience JWT probes reach for (mirrors the Go `SecurityScheme.GetToken()`).
    pub fn token(&self) -> Option<&str> {
        match self {
            SecurityScheme::HttpBearer { attack, valid, .. } => attack.as_deref().or(valid.as_deref()),
            _ => None,
        }
    }

    pub fn get_valid_value(&self) -> Option<String> {
        match self {
            SecurityScheme::NoAuth => None,
            SecurityScheme::HttpBasic { valid, .. } => valid.as_ref().map(|(u, p)| format!("{u}:{p}")),
            SecurityScheme::HttpBearer { valid, .. } => valid.clone(),
            SecurityScheme::ApiKey { valid, .. } => valid.clone(),
            SecurityScheme::OAuth2 { valid, .. } => valid.clone(),
        }
    }

    pub fn get_attack_value(&self) -> Option<String> {
        match self {
            SecurityScheme::NoAuth => None,
            SecurityScheme::HttpBasic { attack, .. } => attack.as_ref().map(|(u, p)| format!("{u}:{p}")),
            SecurityScheme::HttpBearer { attack, .. } => attack.clone(),
            SecurityScheme::ApiKey { attack, .. } => attack.clone(),
            SecurityScheme::OAuth2 { attack, .. } => attack.clone(),
        }
    }

    /// Installs `v` as the attack value. Rejects the value with `InvalidAttackValue` for JWT
    /// bearer schemes when it doesn't parse as a JWT.
    pub fn set_attack_value(&mut self, v: &str) -> Result<(), InvalidAttackValue> {
        match self {
            SecurityScheme::NoAuth => {}
            SecurityScheme::HttpBasic { attack, .. } => {
                *attack = parse_basic(v).ok();
            }
            SecurityScheme::HttpBearer { token_format, attack, .. } => {
                if *token_format == TokenFormat::Jwt {
                    JwtWriter::parse(v).map_err(|_| InvalidAttackValue::NotAJwt(v.to_string()))?;
                }
                *attack = Some(v.to_string());
            }
            SecurityScheme::ApiKey { attack, .. } => *attack = Some(v.to_string()),
            SecurityScheme::OAuth2 { attack, .. } => *attack = Some(v.to_string()),
        }
        Ok(())
    }

    /// Attack value := valid value.
    pub fn reset(&mut self) {
        match self {
            SecurityScheme::NoAuth => {}
            SecurityScheme::HttpBasic { valid, attack, .. } => *attack = valid.clone(),
            SecurityScheme::HttpBearer { valid, attack, .. } => *attack = valid.clone(),
            SecurityScheme::ApiKey { valid, attack, .. } => *attack = valid.clone(),
            SecurityScheme::OAuth2 { valid, attack, .. } => *attack = valid.clone(),
        }
    }

    /// Returns an isolated clone for a single probe attempt (spec.md §3 isolation invariant).
    pub fn for_probe(&self) -> Self {
        self.clone()
    }

    /// Mutates `req` so it carries this scheme's current attack value. Never mutates `self`.
    pub fn apply(&self, mut req: RequestBuilder) -> RequestBuilder {
        match self {
            SecurityScheme::NoAuth => req,
            SecurityScheme::HttpBasic { attack, .. } => {
                if let Some((user, pass)) = attack {
                    req = req.basic_auth(user, Some(pass));
                }
                req
            }
            SecurityScheme::HttpBearer { attack, .. } => {
                if let Some(token) = attack {
                    req = req.bearer_auth(token);
                }
                req
            }
            SecurityScheme::ApiKey { name, location, attack, .. } => {
                if let Some(value) = attack {
                    req = match location {
                        SchemeIn::Header => {
                            if let (Ok(hn), Ok(hv)) =
                                (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value))
                            {
                                req.header(hn, hv)
                            } else {
                                req
                            }
                        }
                        SchemeIn::Cookie => req.header(
                            reqwest::header::COOKIE,
                            format!("{}={}", name, value),
                        ),
                        SchemeIn::Query => req.query(&[(name.as_str(), value.as_str())]),
                    };
                }
                req
            }
            SecurityScheme::OAuth2 { attack, .. } => {
                if let Some(token) = attack {
                    req = req.bearer_auth(token);
                }
                req
            }
        }
    }
}

fn parse_basic(v: &str) -> Result<(String, String), InvalidCredential> {
    v.split_once(':')
        .map(|(u, p)| (u.to_string(), p.to_string()))
        .ok_or(InvalidCredential::MalformedBasic)
}

/// A structured credential bound during OpenAPI expansion (spec.md §3 `SecuritySchemeValues`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credential {
    Opaque(String),
    Basic { user: String, pass: String },
    Structured(serde_json::Value),
}

impl Credential {
    pub fn as_bearer_str(&self) -> Option<String> {
        match self {
            Credential::Opaque(s) => Some(s.clone()),
            Credential::Structured(v) => v.as_str().map(str::to_string),
            Credential::Basic { .. } => None,
        }
    }
}

/// Mapping from OpenAPI security-scheme name to a user-supplied credential (spec.md §3).
/// Unknown names are a warning during expansion; missing names mean "no valid value".
#[derive(Debug, Clone, Default)]
pub struct SecuritySchemeValues(HashMap<String, Credential>);

impl SecuritySchemeValues {
    pub fn new(values: HashMap<String, Credential>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&Credential> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_never_mutates_self() {
        let scheme = SecurityScheme::http_bearer("auth", Some("valid-token"));
        let before = scheme.clone();
        let _ = scheme.apply(reqwest::Client::new().get("http://localhost/"));
        assert_eq!(scheme, before);
    }

    #[test]
    fn set_attack_value_never_touches_valid_value() {
        let mut scheme = SecurityScheme::http_bearer("auth", Some("valid-token"));
        scheme.set_attack_value("attack-token").unwrap();
        assert_eq!(scheme.get_valid_value().as_deref(), Some("valid-token"));
        assert_eq!(scheme.get_attack_value().as_deref(), Some("attack-token"));
    }

    #[test]
    fn reset_restores_attack_value_to_valid() {
        let mut scheme = SecurityScheme::http_bearer("auth", Some("valid-token"));
        scheme.set_attack_value("attack-token").unwrap();
        scheme.reset();
        assert_eq!(scheme.get_attack_value().as_deref(), Some("valid-token"));
    }

    #[test]
    fn jwt_bearer_rejects_non_jwt_valid_value() {
        assert!(SecurityScheme::http_bearer_jwt("auth", Some("not-a-jwt")).is_err());
    }

    #[test]
    fn jwt_bearer_rejects_non_jwt_attack_value() {
        let mut scheme = SecurityScheme::http_bearer_jwt("auth", None).unwrap();
        assert!(scheme.set_attack_value("not-a-jwt").is_err());
    }

    #[test]
    fn clone_is_independent() {
        let mut a = SecurityScheme::http_bearer("auth", Some("valid"));
        let b = a.clone();
        a.set_attack_value("mutated").unwrap();
        assert_eq!(b.get_attack_value().as_deref(), Some("valid"));
    }
}
