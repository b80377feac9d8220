//! HTTP TRACE method probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/misconfiguration/http_trace_method/http_trace_method.go`:
//! replay the operation with `TRACE` and flag any 2xx response -- a server that echoes a TRACE
//! request back is vulnerable to cross-site tracing (CWE-16).

use async_trait::async_trait;
use reqwest::Method;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, HTTP_TRACE};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

pub struct HttpTraceProbe;

#[async_trait]
impl Probe for HttpTraceProbe {
    fn id(&self) -> &'static str {
        "misconfiguration.http_trace"
    }

    fn name(&self) -> &'static str {
        "HTTP TRACE method enabled"
    }

    fn issue(&self) -> Issue {
        HTTP_TRACE
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

        let traced = op.with_method(Method::TRACE);
        let request = traced.new_request(client, scheme);
        let (attempt, status) = send_and_record(client, request).await;
        report.add_scan_attempt(attempt);

        // spec.md §4.6/§7: pass ⇔ transport error OR response status != 200 -- unlike most
        // probes, a transport error here is itself evidence TRACE isn't served, not an
        // inconclusive skip.
        match status {
            Some(status) => issue_report.with_boolean_status(status.as_u16() != 200),
            None => issue_report.with_boolean_status(true),
        }

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
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> Client {
        Client::new(ClientOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn fails_when_trace_is_echoed_back() {
        let mock_server = MockServer::start().await;
        Mock::given(method("TRACE")).respond_with(ResponseTemplate::new(200)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = HttpTraceProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
    }

    #[tokio::test]
    async fn passes_when_trace_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("TRACE")).respond_with(ResponseTemplate::new(405)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = HttpTraceProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
    }

    #[tokio::test]
    async fn passes_on_transport_error() {
        let client = test_client();
        // Nothing listens on this port: the TRACE attempt fails at the transport layer, which
        // spec.md §4.6/§7 treats as pass (unlike most other probes' skip-on-transport-error).
        let op = Operation::new(Method::GET, Url::parse("http://127.0.0.1:1/").unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = HttpTraceProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
        assert_eq!(report.attempts.len(), 1);
    }
}
