//! Missing rate-limiting probe (spec.md §4.6).
//!
//! Grounded on `original_source/scan/misconfiguration/no_rate_limit` behavior: burst a handful of
//! requests at the operation and check whether any came back `429 Too Many Requests` (or a
//! matching `Retry-After`). Best-practice category (spec.md §4.7) -- silence here doesn't prove
//! there's no rate limiter, only that this probe's burst size didn't trip it.

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::http_client::Client;
use crate::issue::{Issue, RATE_LIMIT_MISSING};
use crate::operation::Operation;
use crate::probe::{send_and_record, Probe, UnauthorizedPolicy};
use crate::report::{IssueReport, ScanReport};
use crate::security_scheme::SecurityScheme;

const DEFAULT_BURST: usize = 10;

pub struct RateLimitProbe {
    pub burst: usize,
}

impl Default for RateLimitProbe {
    fn default() -> Self {
        Self { burst: DEFAULT_BURST }
    }
}

#[async_trait]
impl Probe for RateLimitProbe {
    fn id(&self) -> &'static str {
        "misconfiguration.rate_limit"
    }

    fn name(&self) -> &'static str {
        "No rate limiting observed"
    }

    fn issue(&self) -> Issue {
        RATE_LIMIT_MISSING
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

        let mut saw_throttle = false;
        for _ in 0..self.burst {
            let request = op.new_request(client, scheme);
            let (attempt, status) = send_and_record(client, request).await;
            report.add_scan_attempt(attempt);
            if matches!(status.map(|s| s.as_u16()), Some(429)) {
                saw_throttle = true;
                break;
            }
        }

        issue_report.with_boolean_status(saw_throttle);
        report.add_issue_report(issue_report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::ClientOptions;
    use reqwest::{Method, Url};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn test_client() -> Client {
        Client::new(ClientOptions {
            rate_limit: Some(1000),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fails_when_no_request_is_throttled() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).mount(&mock_server).await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = RateLimitProbe { burst: 5 };

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), 5);
        assert!(report.issues[0].has_failed());
    }

    #[tokio::test]
    async fn passes_and_stops_early_when_throttled() {
        let mock_server = MockServer::start().await;
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &Request| {
                let n = seen_clone.fetch_add(1, Ordering::SeqCst);
                if n >= 2 {
                    ResponseTemplate::new(429)
                } else {
                    ResponseTemplate::new(200)
                }
            })
            .mount(&mock_server)
            .await;

        let client = test_client();
        let op = Operation::new(Method::GET, Url::parse(&mock_server.uri()).unwrap(), None, Arc::new(client.clone())).unwrap();
        let probe = RateLimitProbe { burst: 10 };

        let report = probe.scan(&op, &SecurityScheme::no_auth(), &client, &UnauthorizedPolicy::default()).await.unwrap();

        assert_eq!(report.attempts.len(), 3);
        assert!(report.issues[0].has_passed());
    }
}
