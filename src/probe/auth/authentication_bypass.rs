//! Authentication-bypass probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/broken_authentication/authentication_bypass/authentication_bypass.go`:
//! skip when the operation carries no security scheme; otherwise replay the request with a
//! `NoAuth` scheme and expect it to be rejected.

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, AUTHENTICATION_BYPASS};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

pub struct AuthenticationBypassProbe;

#[async_trait]
impl Probe for AuthenticationBypassProbe {
    fn id(&self) -> &'static str {
        "auth.authentication_bypass"
    }

    fn name(&self) -> &'static str {
        "Authentication bypass"
    }

    fn issue(&self) -> Issue {
        AUTHENTICATION_BYPASS
    }

    fn should_run(&self, _op: &Operation, scheme: &SecurityScheme) -> bool {
        !matches!(scheme, SecurityScheme::NoAuth)
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
            issue_report.skip(Some("operation has no security scheme to bypass".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let no_auth = SecurityScheme::no_auth();
        let request = op.new_request(client, &no_auth);
        let (attempt, status) = send_and_record(client, request).await;
        report.add_scan_attempt(attempt);

        match status {
            Some(status) => issue_report.with_boolean_status(policy.is_unauthorized(status)),
            None => issue_report.skip(Some("transport error while replaying without auth".to_string())),
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
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> Client {
        Client::new(ClientOptions::default()).unwrap()
    }

    fn operation(client: &Client, url: Url) -> Operation {
        Operation::new(Method::GET, url, None, Arc::new(client.clone())).unwrap()
    }

    #[tokio::test]
    async fn skips_when_no_security_scheme() {
        let client = test_client();
        let op = operation(&client, Url::parse("http://localhost:1/").unwrap());
        let probe = AuthenticationBypassProbe;

        let report = probe
            .scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default())
            .await
            .unwrap();

        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].has_been_skipped());
        assert!(report.attempts.is_empty());
    }

    #[tokio::test]
    async fn fails_when_unauthenticated_request_is_accepted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = operation(&client, Url::parse(&mock_server.uri()).unwrap());
        let scheme = SecurityScheme::http_bearer("auth", Some("eyJhbGciOiJIUzI1NiJ9.e30."));
        let probe = AuthenticationBypassProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), 1);
        assert!(report.issues[0].has_failed());
    }

    #[tokio::test]
    async fn passes_when_unauthenticated_request_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = operation(&client, Url::parse(&mock_server.uri()).unwrap());
        let scheme = SecurityScheme::http_bearer("auth", Some("token"));
        let probe = AuthenticationBypassProbe;

        let report = probe.scan(&op, &scheme, &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
    }
}
