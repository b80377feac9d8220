//! Missing-security-headers probe (spec.md §4.6).
//!
//! Grounded on `analyze::security_headers::SecurityHeaderAnalysis`, reused verbatim against a
//! single baseline response. Best-practice category (spec.md §4.7): a missing header is a
//! hardening gap, not by itself an exploitable vulnerability, hence the lower CVSS score on
//! `issue::SECURITY_HEADERS`.

use async_trait::async_trait;
use serde_json::json;

use crate::analyze::security_headers::SecurityHeaderAnalysis;
use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, SECURITY_HEADERS};
use crate::operation::Operation;
use crate::probe::{lowercase_header_map, send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

/// Below this score, a response is missing enough hardening headers to fail the probe.
const MIN_PASSING_SCORE: u8 = 70;

pub struct SecurityHeadersProbe;

#[async_trait]
impl Probe for SecurityHeadersProbe {
    fn id(&self) -> &'static str {
        "misconfiguration.security_headers"
    }

    fn name(&self) -> &'static str {
        "Missing security headers"
    }

    fn issue(&self) -> Issue {
        SECURITY_HEADERS
    }

    fn should_run(&self, _op: &Operation, _scheme: &SecurityScheme) -> bool {
        true
    }

    async fn scan(
        &self,
        op: &Operation,
        scheme: &SecurityScheme,
        client: &Client,
        _policy: &UnauthorizedPolicy,
    ) -> Result<ScanReport, ProbeError> {
        let mut report = ScanReport::new(self.id(), self.name(), op.id.clone());
        let mut issue_report = IssueReport::pending(self.issue(), op.id.clone()).with_scheme(scheme.for_probe());

        let request = op.new_request(client, scheme);
        let (attempt, status) = send_and_record(client, request).await;

        let headers = attempt
            .response
            .as_ref()
            .map(|r| lowercase_header_map(&r.headers))
            .unwrap_or_default();
        report.add_scan_attempt(attempt);

        if status.is_none() {
            issue_report.skip(Some("transport error while probing security headers".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let analysis = SecurityHeaderAnalysis::analyze(&headers);
        report.with_data(json!({
            "score": analysis.security_score,
            "missing_headers": analysis.missing_headers,
            "findings": analysis.findings,
        }));
        issue_report.with_boolean_status(analysis.security_score >= MIN_PASSING_SCORE);

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

    #[tokio::test]
    async fn fails_when_headers_are_absent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = SecurityHeadersProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
    }

    #[tokio::test]
    async fn passes_when_hardening_headers_are_present() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("strict-transport-security", "max-age=63072000")
                    .insert_header("content-security-policy", "default-src 'self'")
                    .insert_header("x-frame-options", "DENY")
                    .insert_header("x-content-type-options", "nosniff")
                    .insert_header("referrer-policy", "no-referrer")
                    .insert_header("permissions-policy", "geolocation=()"),
            )
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = SecurityHeadersProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
    }
}
