//! Report rendering + transport (ambient stack, out of scope per spec.md §1 — kept as the thin
//! collaborator demonstration the teacher already ships in `output/clean_reporter.rs`).
//!
//! `render_table` mirrors the teacher's `ScanReport::print_summary`/`format_text_report` shape but
//! reads the real `Reporter`/`IssueReport` types instead of the teacher's own `Finding`/`Severity`.
//! `render_json`/`render_yaml` are pass-throughs over `Reporter`'s `Serialize` impl.
//! `post_report` is the single HTTP POST helper spec.md §1 allows as "report transport", nothing more.

use std::fmt::Write as _;

use crate::error::TransportError;
use crate::http_client::Client;
use crate::report::{IssueReport, Reporter};

pub fn render_json(reporter: &Reporter) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reporter)
}

pub fn render_yaml(reporter: &Reporter) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(reporter)
}

/// A human-readable summary: one line per operation/probe pair, grouped by severity, in the
/// teacher's `format_text_report` register (banner rules, bracketed severity tags).
pub fn render_table(reporter: &Reporter) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "                API VULNERABILITY SCAN REPORT");
    let _ = writeln!(out, "{}", "=".repeat(60));

    let failed = reporter.failed_issue_reports();
    let _ = writeln!(out, "\nOperations scanned: {}", reporter.reports.len());
    let _ = writeln!(out, "Issues failed: {}", failed.len());
    let _ = writeln!(out, "Highest CVSS score: {:.1}", reporter.highest_severity_score());

    let errors = reporter.get_errors();
    if !errors.is_empty() {
        let _ = writeln!(out, "Transport errors: {}", errors.len());
    }

    if failed.is_empty() {
        let _ = writeln!(out, "\n[OK] No vulnerabilities detected");
        return out;
    }

    let mut sorted: Vec<&IssueReport> = failed;
    sorted.sort_by(|a, b| b.issue.cvss_score.partial_cmp(&a.issue.cvss_score).unwrap_or(std::cmp::Ordering::Equal));

    let _ = writeln!(out, "\nFindings:");
    for report in sorted {
        let _ = writeln!(
            out,
            "  [{}] {} ({}, {}) on {}",
            report.issue.severity_label().to_uppercase(),
            report.issue.name,
            report.issue.owasp.code(),
            report.issue.cwe.map(|c| format!("CWE-{}", c.number())).unwrap_or_default(),
            report.operation_id,
        );
    }

    out
}

/// Posts a rendered JSON report to `url` through the shared client. No retry, no auth beyond
/// whatever headers the caller's `Client` already carries — report transport protocols beyond this
/// single helper are explicitly out of scope (spec.md §1).
pub async fn post_report(client: &Client, url: reqwest::Url, reporter: &Reporter) -> Result<reqwest::StatusCode, TransportError> {
    let request = client.request(reqwest::Method::POST, url).json(reporter).build().map_err(TransportError::from)?;
    let response = client.send(request).await?;
    Ok(response.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::HTTP_TRACE;
    use crate::report::{IssueReport, ScanReport};

    #[test]
    fn render_table_reports_clean_scan() {
        let mut scan = ScanReport::new("misconfiguration.http_trace", "TRACE method enabled", "op-1");
        let mut issue = IssueReport::pending(HTTP_TRACE, "op-1");
        issue.with_boolean_status(true);
        scan.add_issue_report(issue);

        let reporter = Reporter::new(vec![scan]);
        let table = render_table(&reporter);
        assert!(table.contains("No vulnerabilities detected"));
    }

    #[test]
    fn render_table_lists_failed_findings_by_severity() {
        let mut scan = ScanReport::new("misconfiguration.http_trace", "TRACE method enabled", "op-1");
        let mut issue = IssueReport::pending(HTTP_TRACE, "op-1");
        issue.with_boolean_status(false);
        scan.add_issue_report(issue);

        let reporter = Reporter::new(vec![scan]);
        let table = render_table(&reporter);
        assert!(table.contains("TRACE method enabled"));
        assert!(table.contains("API8:2023"));
    }

    #[test]
    fn render_json_round_trips() {
        let reporter = Reporter::new(vec![ScanReport::new("discover.fingerprint", "Technology fingerprint", "op-1")]);
        let json = render_json(&reporter).unwrap();
        let parsed: Reporter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.reports.len(), 1);
    }

    #[test]
    fn render_yaml_produces_a_document() {
        let reporter = Reporter::new(vec![ScanReport::new("discover.fingerprint", "Technology fingerprint", "op-1")]);
        let yaml = render_yaml(&reporter).unwrap();
        assert!(yaml.contains("discover.fingerprint"));
    }
}
