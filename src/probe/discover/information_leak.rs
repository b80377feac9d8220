//! Information-leak probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/discover/information_leak` behavior: scan the baseline
//! response body for patterns a well-behaved production API should never surface -- stack
//! traces, interpreter tracebacks, internal connection strings, cloud credential prefixes.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, INFORMATION_LEAK};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

struct LeakPattern {
    label: &'static str,
    regex: Regex,
}

static LEAK_PATTERNS: Lazy<Vec<LeakPattern>> = Lazy::new(|| {
    let specs: &[(&str, &str)] = &[
        ("stack_trace_java", r"at [\w.$]+\([\w.]+\.java:\d+\)"),
        ("traceback_python", r"Traceback \(most recent call last\)"),
        ("stack_trace_dotnet", r"at [\w.]+\.\w+\([^)]*\) in [^:]+:line \d+"),
        ("sql_error", r"(?i)SQL syntax.*MySQL|ORA-\d{5}|PostgreSQL.*ERROR"),
        ("connection_string", r"(?i)(mysql|postgres(?:ql)?|mongodb|redis)://[^\s\"']+"),
        ("aws_access_key", r"AKIA[0-9A-Z]{16}"),
        ("private_key_block", r"-----BEGIN (?:RSA |EC )?PRIVATE KEY-----"),
        ("debug_flag_on", r"(?i)\bDEBUG\s*=\s*true\b"),
        ("internal_ip", r"\b(?:10|172\.(?:1[6-9]|2\d|3[01])|192\.168)\.\d{1,3}\.\d{1,3}\b"),
    ];
    specs
        .iter()
        .map(|(label, pattern)| LeakPattern {
            label,
            regex: Regex::new(pattern).expect("leak pattern is valid regex"),
        })
        .collect()
});

pub struct InformationLeakProbe;

#[async_trait]
impl Probe for InformationLeakProbe {
    fn id(&self) -> &'static str {
        "discover.information_leak"
    }

    fn name(&self) -> &'static str {
        "Information leak in response"
    }

    fn issue(&self) -> Issue {
        INFORMATION_LEAK
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
        let body = attempt.response.as_ref().and_then(|r| r.body.clone()).unwrap_or_default();
        report.add_scan_attempt(attempt);

        if status.is_none() {
            issue_report.skip(Some("transport error while checking for information leaks".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let matched: Vec<&str> = LEAK_PATTERNS
            .iter()
            .filter(|p| p.regex.is_match(&body))
            .map(|p| p.label)
            .collect();

        issue_report.with_boolean_status(matched.is_empty());
        if !matched.is_empty() {
            report.with_data(json!({ "matched_patterns": matched }));
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
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client() -> Client {
        Client::new(ClientOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn fails_on_python_traceback() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Traceback (most recent call last):\n  File..."))
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = InformationLeakProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
        assert_eq!(report.data.as_ref().unwrap()["matched_patterns"][0], "traceback_python");
    }

    #[tokio::test]
    async fn passes_on_clean_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok"}"#))
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = InformationLeakProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
    }
}
