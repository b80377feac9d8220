//! JWT null-signature probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/broken_authentication/jwt/null_signature/null_signature.go`:
//! strip the signature segment entirely (keeping the trailing dot) and see whether the verifier
//! treats an empty signature as "no check needed" rather than "invalid".

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, JWT_NULL_SIGNATURE};
use crate::jwt::{JwtWriter, FAKE_JWT};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::{SecurityScheme, TokenFormat};

pub struct NullSignatureProbe;

#[async_trait]
impl Probe for NullSignatureProbe {
    fn id(&self) -> &'static str {
        "auth.jwt.null_signature"
    }

    fn name(&self) -> &'static str {
        "JWT null signature"
    }

    fn issue(&self) -> Issue {
        JWT_NULL_SIGNATURE
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
        let forged = writer.without_signature();

        let mut attack_scheme = scheme.for_probe();
        if attack_scheme.set_attack_value(&forged).is_err() {
            issue_report.skip(Some("security scheme rejected an empty-signature token".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let request = op.new_request(client, &attack_scheme);
        let (attempt, status) = send_and_record(client, request).await;
        report.add_scan_attempt(attempt);

        match status {
            Some(status) => issue_report.with_boolean_status(policy.is_unauthorized(status)),
            None => issue_report.skip(Some("transport error while probing null signature".to_string())),
        }

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
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_client() -> Client {
        Client::new(ClientOptions::default()).unwrap()
    }

    fn jwt_scheme(token: &str) -> SecurityScheme {
        SecurityScheme::http_bearer_jwt("auth", Some(token)).unwrap()
    }

    #[tokio::test]
    async fn skips_non_jwt_schemes() {
        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse("http://localhost:1/").unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = NullSignatureProbe;
        let report = probe
            .scan(&op, &SecurityScheme::http_bearer("auth", Some("opaque")), &client, &UnauthorizedPolicy::default())
            .await
            .unwrap();
        assert!(report.issues[0].has_been_skipped());
    }

    #[tokio::test]
    async fn fails_when_empty_signature_is_accepted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(move |req: &Request| {
                let auth = req.headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
                let token = auth.strip_prefix("Bearer ").unwrap_or("");
                if token.ends_with('.') {
                    ResponseTemplate::new(200)
                } else {
                    ResponseTemplate::new(401)
                }
            })
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let scheme = jwt_scheme(FAKE_JWT);
        let probe = NullSignatureProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), 1);
        assert!(report.issues[0].has_failed());
    }

    #[tokio::test]
    async fn passes_when_empty_signature_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(401)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let scheme = jwt_scheme(FAKE_JWT);
        let probe = NullSignatureProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
    }
}
