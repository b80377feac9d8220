//! Scan reporting (spec.md §4.5/§7 / component C5).
//!
//! Grounded on `original_source/report/report.go`'s `ScanReport`/`IssueReport`/`Reporter` shapes
//! and the teacher's `clean_reporter.rs` (`ScanReport`, `Finding`, `Severity`) for the
//! serialization/severity conventions. A `Reporter`'s success never implies the absence of
//! errors: errors and issue pass/fail status are tracked independently, exactly as the Go
//! original keeps `report.Errors` distinct from `report.Issues`.

use serde::{Deserialize, Serialize};

use crate::issue::Issue;
use crate::security_scheme::SecurityScheme;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<String>,
}

/// One request/response pair (or a transport error) a probe made while scanning an operation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IssueScanAttempt {
    pub request: Option<RecordedRequest>,
    pub response: Option<RecordedResponse>,
    pub error: Option<String>,
}

impl IssueScanAttempt {
    pub fn new(request: RecordedRequest, response: RecordedResponse) -> Self {
        Self {
            request: Some(request),
            response: Some(response),
            error: None,
        }
    }

    pub fn from_error(request: Option<RecordedRequest>, error: impl ToString) -> Self {
        Self {
            request,
            response: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum IssueReportStatus {
    Pending,
    Skipped { reason: Option<String> },
    Passed,
    Failed,
}

/// One probe's verdict against one operation, plus the scheme it was run under (`None` when the
/// probe never reached the point of selecting one, e.g. an immediate skip).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueReport {
    pub issue: Issue,
    pub status: IssueReportStatus,
    #[serde(skip)]
    pub security_scheme: Option<SecurityScheme>,
    pub operation_id: String,
    pub data: Option<serde_json::Value>,
}

impl IssueReport {
    pub fn pending(issue: Issue, operation_id: impl Into<String>) -> Self {
        Self {
            issue,
            status: IssueReportStatus::Pending,
            security_scheme: None,
            operation_id: operation_id.into(),
            data: None,
        }
    }

    pub fn with_scheme(mut self, scheme: SecurityScheme) -> Self {
        self.security_scheme = Some(scheme);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn skip(&mut self, reason: Option<String>) {
        self.status = IssueReportStatus::Skipped { reason };
    }

    /// `true` → Passed (no vulnerability found), `false` → Failed.
    pub fn with_boolean_status(&mut self, ok: bool) {
        self.status = if ok {
            IssueReportStatus::Passed
        } else {
            IssueReportStatus::Failed
        };
    }

    pub fn has_passed(&self) -> bool {
        matches!(self.status, IssueReportStatus::Passed)
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.status, IssueReportStatus::Failed)
    }

    pub fn has_been_skipped(&self) -> bool {
        matches!(self.status, IssueReportStatus::Skipped { .. })
    }
}

/// A timestamp type that stays serializable without reaching for `chrono`/`time` — the teacher's
/// `clean_reporter.rs` stores wall-clock instants as RFC3339 strings produced at the call site, so
/// we keep the same shape here rather than pull in a date/time crate purely for bookkeeping.
pub type Timestamp = String;

/// One probe's full run against one operation: timing, every HTTP attempt made, and the resulting
/// issue reports (usually one, but a probe may record more than one sub-check).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub id: String,
    pub name: String,
    pub operation_id: String,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub attempts: Vec<IssueScanAttempt>,
    pub issues: Vec<IssueReport>,
    pub data: Option<serde_json::Value>,
}

impl ScanReport {
    pub fn new(id: impl Into<String>, name: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            operation_id: operation_id.into(),
            start_time: None,
            end_time: None,
            attempts: Vec::new(),
            issues: Vec::new(),
            data: None,
        }
    }

    pub fn start(&mut self, at: impl Into<String>) {
        self.start_time = Some(at.into());
    }

    pub fn end(&mut self, at: impl Into<String>) {
        self.end_time = Some(at.into());
    }

    pub fn with_data(&mut self, data: serde_json::Value) {
        self.data = Some(data);
    }

    pub fn add_scan_attempt(&mut self, attempt: IssueScanAttempt) {
        self.attempts.push(attempt);
    }

    pub fn add_issue_report(&mut self, issue: IssueReport) {
        self.issues.push(issue);
    }

    pub fn get_errors(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_deref())
            .collect()
    }

    pub fn get_failed_issue_reports(&self) -> Vec<&IssueReport> {
        self.issues.iter().filter(|i| i.has_failed()).collect()
    }

    pub fn has_failed_issue_report(&self) -> bool {
        self.issues.iter().any(|i| i.has_failed())
    }
}

/// The aggregate of every `ScanReport` produced by one `Scan::execute` call (spec.md §4.5/§7).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Reporter {
    pub reports: Vec<ScanReport>,
}

impl Reporter {
    pub fn new(reports: Vec<ScanReport>) -> Self {
        Self { reports }
    }

    /// `true` iff any report contains a failed issue. A scan can have `has_vulnerability() ==
    /// false` and still have transport errors — check `get_errors()` separately (spec.md §7).
    pub fn has_vulnerability(&self) -> bool {
        self.reports.iter().any(ScanReport::has_failed_issue_report)
    }

    pub fn failed_issue_reports(&self) -> Vec<&IssueReport> {
        self.reports.iter().flat_map(ScanReport::get_failed_issue_reports).collect()
    }

    pub fn highest_severity_score(&self) -> f32 {
        self.failed_issue_reports()
            .iter()
            .map(|i| i.issue.cvss_score)
            .fold(0.0, f32::max)
    }

    /// Flattens every report's transport/probe errors. Non-empty here does not imply
    /// `has_vulnerability()` is `true`, and vice versa — the two are tracked independently.
    pub fn get_errors(&self) -> Vec<&str> {
        self.reports.iter().flat_map(ScanReport::get_errors).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::HTTP_TRACE;

    #[test]
    fn boolean_status_true_is_passed() {
        let mut report = IssueReport::pending(HTTP_TRACE, "op-1");
        report.with_boolean_status(true);
        assert!(report.has_passed());
        assert!(!report.has_failed());
    }

    #[test]
    fn boolean_status_false_is_failed() {
        let mut report = IssueReport::pending(HTTP_TRACE, "op-1");
        report.with_boolean_status(false);
        assert!(report.has_failed());
    }

    #[test]
    fn skip_carries_a_reason() {
        let mut report = IssueReport::pending(HTTP_TRACE, "op-1");
        report.skip(Some("not applicable".to_string()));
        assert!(report.has_been_skipped());
        assert!(!report.has_failed());
        assert!(!report.has_passed());
    }

    #[test]
    fn reporter_success_does_not_imply_no_errors() {
        let mut scan = ScanReport::new("s1", "http_trace", "op-1");
        let mut passed = IssueReport::pending(HTTP_TRACE, "op-1");
        passed.with_boolean_status(true);
        scan.add_issue_report(passed);
        scan.add_scan_attempt(IssueScanAttempt::from_error(None, "connection reset"));

        let reporter = Reporter::new(vec![scan]);
        assert!(!reporter.has_vulnerability());
        assert_eq!(reporter.get_errors(), vec!["connection reset"]);
    }

    #[test]
    fn highest_severity_score_ignores_passed_and_skipped() {
        let mut scan = ScanReport::new("s1", "http_trace", "op-1");
        let mut failed = IssueReport::pending(HTTP_TRACE, "op-1");
        failed.with_boolean_status(false);
        scan.add_issue_report(failed);

        let mut passed = IssueReport::pending(crate::issue::FINGERPRINT, "op-1");
        passed.with_boolean_status(true);
        scan.add_issue_report(passed);

        let reporter = Reporter::new(vec![scan]);
        assert_eq!(reporter.highest_severity_score(), HTTP_TRACE.cvss_score);
    }
}
