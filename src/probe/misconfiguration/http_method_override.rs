//! HTTP method-override probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/misconfiguration/http_method_override` behavior: some
//! frameworks and reverse proxies honor `X-HTTP-Method-Override`-style headers, letting a request
//! sent with a harmless transport method (`GET`) actually execute the operation's real, possibly
//! more sensitive, method. Non-goal per spec.md: only the header-based vector is covered, not
//! query-string (`?_method=`) overrides.

use async_trait::async_trait;
use reqwest::Method;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, HTTP_METHOD_OVERRIDE};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

const OVERRIDE_HEADERS: &[&str] = &["X-HTTP-Method-Override", "X-HTTP-Method", "X-Method-Override"];

pub struct HttpMethodOverrideProbe;

#[async_trait]
impl Probe for HttpMethodOverrideProbe {
    fn id(&self) -> &'static str {
        "misconfiguration.http_method_override"
    }

    fn name(&self) -> &'static str {
        "HTTP method override honored"
    }

    fn issue(&self) -> Issue {
        HTTP_METHOD_OVERRIDE
    }

    fn should_run(&self, op: &Operation, _scheme: &SecurityScheme) -> bool {
        op.method != Method::GET
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

        if !self.should_run(op, scheme) {
            issue_report.skip(Some("operation's real method is already GET".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let tunneled = op.with_method(Method::GET);
        for header_name in OVERRIDE_HEADERS {
            let mut request = tunneled.new_request(client, scheme);
            request = request.header(*header_name, op.method.as_str());
            let (attempt, status) = send_and_record(client, request).await;
            report.add_scan_attempt(attempt);

            if let Some(status) = status {
                if status.is_success() {
                    issue_report.with_boolean_status(false);
                    report.with_data(serde_json::json!({ "header": header_name }));
                    report.add_issue_report(issue_report);
                    return Ok(report);
                }
            }
        }

        issue_report.with_boolean_status(true);
        report.add_issue_report(issue_report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ClientOptions;
    use reqwest::Url;
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_client() -> Client {
        Client::new(ClientOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn skips_get_operations() {
        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse("http://localhost:1/").unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = HttpMethodOverrideProbe;
        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();
        assert!(report.issues[0].has_been_skipped());
    }

    #[tokio::test]
    async fn fails_when_override_header_is_honored() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(move |req: &Request| {
                if req.headers.get("X-HTTP-Method-Override").is_some() {
                    ResponseTemplate::new(200)
                } else {
                    ResponseTemplate::new(403)
                }
            })
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::DELETE, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = HttpMethodOverrideProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
    }

    #[tokio::test]
    async fn passes_when_override_headers_are_ignored() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::DELETE, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = HttpMethodOverrideProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), OVERRIDE_HEADERS.len());
        assert!(report.issues[0].has_passed());
    }
}
