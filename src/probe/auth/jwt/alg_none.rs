//! JWT `alg:none` probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/broken_authentication/jwt/alg_none/alg_none.go`: iterate the
//! case-mangled `alg` literals a case-sensitive verifier might mishandle, stop at the first one
//! the target accepts.

use async_trait::async_trait;
use serde_json::json;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, JWT_ALG_NONE};
use crate::jwt::{JwtWriter, FAKE_JWT};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::{SecurityScheme, TokenFormat};

const ALG_CASINGS: &[&str] = &["none", "NONE", "None", "nOnE"];

pub struct AlgNoneProbe;

#[async_trait]
impl Probe for AlgNoneProbe {
    fn id(&self) -> &'static str {
        "auth.jwt.alg_none"
    }

    fn name(&self) -> &'static str {
        "JWT alg:none"
    }

    fn issue(&self) -> Issue {
        JWT_ALG_NONE
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

        let base_writer = if scheme.has_valid_value() {
            let token = scheme.get_valid_value().expect("checked has_valid_value");
            let writer = JwtWriter::parse(&token)?;
            if writer.alg().eq_ignore_ascii_case("none") {
                issue_report.skip(Some("supplied token already uses alg:none".to_string()));
                report.add_issue_report(issue_report);
                return Ok(report);
            }
            writer.with_valid_claims()
        } else {
            JwtWriter::parse(FAKE_JWT)?
        };

        for alg in ALG_CASINGS {
            let forged = base_writer.sign_none(alg);
            let mut attack_scheme = scheme.for_probe();
            if attack_scheme.set_attack_value(&forged).is_err() {
                continue;
            }

            let request = op.new_request(client, &attack_scheme);
            let (attempt, status) = send_and_record(client, request).await;
            report.add_scan_attempt(attempt);

            match status {
                Some(status) => {
                    issue_report.with_boolean_status(policy.is_unauthorized(status));
                    if issue_report.has_failed() {
                        report.with_data(json!({ "alg": alg }));
                        break;
                    }
                }
                None => {
                    issue_report.skip(Some("transport error while probing alg:none".to_string()));
                    break;
                }
            }
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
        let probe = AlgNoneProbe;
        let report = probe
            .scan(&op, &SecurityScheme::http_bearer("auth", Some("opaque")), &client, &UnauthorizedPolicy::default())
            .await
            .unwrap();
        assert!(report.issues[0].has_been_skipped());
        assert!(report.attempts.is_empty());
    }

    #[tokio::test]
    async fn fails_when_server_accepts_alg_none() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(move |req: &Request| {
                let auth = req.headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
                let token = auth.strip_prefix("Bearer ").unwrap_or("");
                if crate::jwt::is_alg_none(token) {
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
        let probe = AlgNoneProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
        assert!(report.attempts.len() <= 4);
        assert_eq!(report.data.as_ref().unwrap()["alg"], "none");
    }

    #[tokio::test]
    async fn passes_when_server_rejects_all_casings() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(401)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let scheme = jwt_scheme(FAKE_JWT);
        let probe = AlgNoneProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), 4);
        assert!(report.issues[0].has_passed());
    }
}
