//! JWT weak-secret probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/broken_authentication/jwt/weak_secret/weak_secret.go`: run an
//! offline dictionary attack against the token's HMAC signature, then forge and replay a token
//! signed with the cracked secret to confirm the server actually accepts it.
//!
//! The dictionary is tiny (twenty entries, see `jwt::COMMON_SECRETS`) so a sequential scan would
//! be fast enough on its own, but we still fan it out with `rayon` -- the one probe in the
//! catalogue with genuinely CPU-bound work (HMAC over the wordlist), and the crate most of the
//! rest of this tree has no other use for.

use async_trait::async_trait;
use rayon::prelude::*;
use serde_json::json;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, JWT_WEAK_SECRET};
use crate::jwt::{crack_hmac_secret, JwtWriter, COMMON_SECRETS, FAKE_JWT};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::{SecurityScheme, TokenFormat};

pub struct WeakSecretProbe;

impl WeakSecretProbe {
    /// Splits the wordlist across rayon's pool and returns the first secret any chunk finds.
    fn crack_parallel(token: &str) -> Option<&'static str> {
        COMMON_SECRETS
            .par_chunks(4)
            .find_map_any(|chunk| crack_hmac_secret(token, chunk))
    }
}

#[async_trait]
impl Probe for WeakSecretProbe {
    fn id(&self) -> &'static str {
        "auth.jwt.weak_secret"
    }

    fn name(&self) -> &'static str {
        "JWT weak HMAC secret"
    }

    fn issue(&self) -> Issue {
        JWT_WEAK_SECRET
    }

    fn should_run(&self, _op: &Operation, scheme: &SecurityScheme) -> bool {
        scheme.token_format() == Some(TokenFormat::Jwt)
    }

    async fn scan(
        &self,
        op: &Operation,
        scheme: &SecurityScheme,
        client: &Client,
        policy: &UnauthorizedPolicy,
    ) -> Result<ScanReport, ProbeError> {
        let mut report = ScanReport::new(self.id(), self.name(), op.id.clone());
        let mut issue_report = IssueReport::pending(self.issue(), op.id.clone()).with_scheme(scheme.for_probe());

        if !self.should_run(op, scheme) {
            issue_report.skip(Some("security scheme is not a JWT bearer".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let base_token = scheme.get_valid_value().unwrap_or_else(|| FAKE_JWT.to_string());
        let writer = JwtWriter::parse(&base_token)?;

        if !writer.alg().to_uppercase().starts_with("HS") {
            issue_report.skip(Some(format!("{} is not an HMAC algorithm", writer.alg())));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let secret = match Self::crack_parallel(&base_token) {
            Some(secret) => secret,
            None => {
                issue_report.with_boolean_status(true);
                report.add_issue_report(issue_report);
                return Ok(report);
            }
        };

        let forged = writer
            .with_valid_claims()
            .sign_with_method_and_key(writer.alg(), secret.as_bytes())?;

        let mut attack_scheme = scheme.for_probe();
        attack_scheme.set_attack_value(&forged)?;
        let request = op.new_request(client, &attack_scheme);
        let (attempt, status) = send_and_record(client, request).await;
        report.add_scan_attempt(attempt);
        report.with_data(json!({ "secret": secret }));

        // The secret is proven weak only once the server actually accepts the forged replay
        // (spec §4.6 "fail ⇔ the server accepts it") — a cracked-but-rejected secret is a pass.
        let accepted = status.map(|s| !policy.is_unauthorized(s)).unwrap_or(false);
        issue_report.with_boolean_status(!accepted);

        report.add_issue_report(issue_report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ClientOptions;
    use reqwest::{Method, Url};
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> Client {
        Client::new(ClientOptions::default()).unwrap()
    }

    fn scheme_signed_with(secret: &str) -> SecurityScheme {
        let writer = JwtWriter::parse(FAKE_JWT).unwrap();
        let token = writer.sign_with_method_and_key("HS256", secret.as_bytes()).unwrap();
        SecurityScheme::http_bearer_jwt("auth", Some(&token)).unwrap()
    }

    #[tokio::test]
    async fn skips_non_jwt_schemes() {
        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse("http://localhost:1/").unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = WeakSecretProbe;
        let report = probe
            .scan(&op, &SecurityScheme::http_bearer("auth", Some("opaque")), &client, &UnauthorizedPolicy::default())
            .await
            .unwrap();
        assert!(report.issues[0].has_been_skipped());
    }

    #[tokio::test]
    async fn fails_when_secret_is_in_the_dictionary() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let scheme = scheme_signed_with("secret");
        let probe = WeakSecretProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
        assert_eq!(report.data.as_ref().unwrap()["secret"], "secret");
        assert_eq!(report.attempts.len(), 1);
    }

    #[tokio::test]
    async fn passes_when_secret_cannot_be_cracked() {
        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse("http://localhost:1/").unwrap(), None, Arc::new(client.clone())).unwrap();
        let scheme = scheme_signed_with("a-very-long-and-unguessable-secret-key");
        let probe = WeakSecretProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
        assert!(report.attempts.is_empty());
    }
}
