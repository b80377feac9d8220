//! Technology fingerprinting (spec.md §4.6).
//!
//! Grounded on `analyze::fingerprint::TechnologyFingerprint`, reused verbatim. Discover category
//! (spec.md §4.7): informational (`issue::FINGERPRINT`'s CVSS score is 0.0), but per spec.md
//! §4.6 "status ⇔ no fingerprint identified" the verdict still tracks whether anything was
//! identified at all -- `Passed` when the response gave nothing away, `Failed` once any
//! component was recognized.

use async_trait::async_trait;
use serde_json::json;

use crate::analyze::fingerprint::TechnologyFingerprint;
use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, FINGERPRINT};
use crate::operation::Operation;
use crate::probe::{lowercase_header_map, send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

pub struct FingerprintProbe;

#[async_trait]
impl Probe for FingerprintProbe {
    fn id(&self) -> &'static str {
        "discover.fingerprint"
    }

    fn name(&self) -> &'static str {
        "Technology fingerprint"
    }

    fn issue(&self) -> Issue {
        FINGERPRINT
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

        let (headers, body) = attempt
            .response
            .as_ref()
            .map(|r| (lowercase_header_map(&r.headers), r.body.clone().unwrap_or_default()))
            .unwrap_or_default();
        report.add_scan_attempt(attempt);

        if status.is_none() {
            issue_report.skip(Some("transport error while fingerprinting".to_string()));
            report.add_issue_report(issue_report);
            return Ok(report);
        }

        let fingerprint = TechnologyFingerprint::analyze(&headers, &body);
        let identified = fingerprint.server.is_some()
            || fingerprint.cdn.is_some()
            || fingerprint.language.is_some()
            || !fingerprint.framework.is_empty()
            || !fingerprint.database_hints.is_empty()
            || !fingerprint.technologies.is_empty();
        report.with_data(json!({
            "server": fingerprint.server,
            "framework": fingerprint.framework,
            "cdn": fingerprint.cdn,
            "language": fingerprint.language,
            "database_hints": fingerprint.database_hints,
            "technologies": fingerprint.technologies,
        }));
        issue_report.with_boolean_status(!identified);

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
    async fn fails_and_records_hints_when_a_technology_is_identified() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-powered-by", "Express"))
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = FingerprintProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_failed());
        assert_eq!(report.data.as_ref().unwrap()["framework"][0], "Express.js");
    }

    #[tokio::test]
    async fn passes_when_nothing_is_identified() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = FingerprintProbe;

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert!(report.issues[0].has_passed());
    }
}
