//! JWT not-verified probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/broken_authentication/jwt/not_verified/not_verified.go`:
//! a baseline call establishes the endpoint actually enforces auth, then a second call with the
//! same header/claims but a fresh unrelated key checks whether the server distinguishes a bad
//! signature from a good one.

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, JWT_NOT_VERIFIED};
use crate::jwt::{JwtWriter, FAKE_JWT};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::{SecurityScheme, TokenFormat};

pub struct NotVerifiedProbe;

#[async_trait]
impl Probe for NotVerifiedProbe {
    fn id(&self) -> &'static str {
        "auth.jwt.not_verified"
    }

    fn name(&self) -> &'static str {
        "JWT signature not verified"
    }

    fn issue(&self) -> Issue {
        JWT_NOT_VERIFIED
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

        let baseline_token = scheme.get_valid_value().unwrap_or_else(|| FAKE_JWT.to_string());
        let mut baseline_scheme = scheme.for_probe();
        if baseline_scheme.set_attack_value(&baseline_token).is_err() {
            issue_report.skip(Some("baseline token is not a JWT".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let baseline_request = op.new_request(client, &baseline_scheme);
        let (baseline_attempt, baseline_status) = send_and_record(client, baseline_request).await;
        report.add_scan_attempt(baseline_attempt);

        let baseline_status = match baseline_status {
            Some(status) => status,
            None => {
                issue_report.skip(Some("transport error on baseline request".to_string()));
                report.add_issue_report(issue_report);
                return Ok(report);
            }
        };

        if !policy.is_unauthorized(baseline_status) {
            issue_report.skip(Some("endpoint does not enforce auth on the valid token".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let writer = JwtWriter::parse(&baseline_token)?;
        let forged_token = writer.sign_with_random_key(writer.alg())?;

        let mut attack_scheme = scheme.for_probe();
        attack_scheme.set_attack_value(&forged_token)?;
        let attack_request = op.new_request(client, &attack_scheme);
        let (attack_attempt, attack_status) = send_and_record(client, attack_request).await;
        report.add_scan_attempt(attack_attempt);

        match attack_status {
            Some(status) => issue_report.with_boolean_status(status != baseline_status),
            None => issue_report.skip(Some("transport error on re-signed request".to_string())),
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
    async fn skips_when_baseline_is_not_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let scheme = jwt_scheme(FAKE_JWT);
        let probe = NotVerifiedProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), 1);
        assert!(report.issues[0].has_been_skipped());
    }

    #[tokio::test]
    async fn fails_when_server_ignores_the_signature() {
        let mock_server = MockServer::start().await;
        // Server rejects only when no Authorization header at all is present; any bearer,
        // valid or re-signed, is accepted identically -- it never actually checks the signature.
        Mock::given(method("GET"))
            .respond_with(move |req: &Request| {
                if req.headers.get("authorization").is_some() {
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
        let probe = NotVerifiedProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), 2);
        assert!(report.issues[0].has_failed());
    }
}
