//! CORS misconfiguration probe (spec.md §4.6).
//!
//! Grounded on `analyze::cors_checker::CorsAnalysis`, reused verbatim: send a preflight-shaped
//! request with a clearly foreign `Origin` and let the existing analyzer judge the response
//! headers (wildcard + credentials, reflected null origin, and so on).

use async_trait::async_trait;
use serde_json::json;

use crate::analyze::cors_checker::CorsAnalysis;
use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, CORS_MISCONFIGURATION};
use crate::operation::Operation;
use crate::probe::{lowercase_header_map, send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

const PROBE_ORIGIN: &str = "https://attacker.example";

pub struct CorsProbe;

#[async_trait]
impl Probe for CorsProbe {
    fn id(&self) -> &'static str {
        "misconfiguration.cors"
    }

    fn name(&self) -> &'static str {
        "CORS misconfiguration"
    }

    fn issue(&self) -> Issue {
        CORS_MISCONFIGURATION
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

        let request = op
            .new_request(client, scheme)
            .header(reqwest::header::ORIGIN, PROBE_ORIGIN)
            .header("Access-Control-Request-Method", op.method.as_str());
        let (attempt, status) = send_and_record(client, request).await;

        let headers = attempt
            .response
            .as_ref()
            .map(|r| lowercase_header_map(&r.headers))
            .unwrap_or_default();
        report.add_scan_attempt(attempt);

        if status.is_none() {
            issue_report.skip(Some("transport error while probing CORS".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let analysis = CorsAnalysis::analyze(&headers);
        report.with_data(json!({
            "allow_origin": analysis.allow_origin,
            "allow_credentials": analysis.allow_credentials,
            "vulnerabilities": analysis.vulnerabilities,
        }));
        issue_report.with_boolean_status(!analysis.is_misconfigured);

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
    async fn fails_on_wildcard_origin_with_credentials() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("access-control-allow-origin", "*")
                    .insert_header("access-control-allow-credentials", "true"),
            )
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = CorsProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
    }

    #[tokio::test]
    async fn passes_with_no_cors_headers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = CorsProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
    }
}
