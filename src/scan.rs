//! Scan orchestrator (spec.md §4.5/§5/§8 / component C8).
//!
//! Grounded on `original_source/scan/scan.go`'s `Scan`/`ScanOptions` (operation × probe
//! selection, include/exclude sets) and the teacher's `runner.rs` concurrency shape
//! (`tokio::sync::Semaphore`-bounded fan-out, `tokio_util::sync::CancellationToken` for
//! graceful abort). Report ordering is slotted by `(operation_index, probe_index)` rather than
//! pushed in completion order, so two runs against the same target produce byte-identical
//! `Reporter` contents regardless of how the scheduler interleaves them (spec.md §5, §8 property 2).

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Method, Url};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::ScanError;
use crate::http_client::Client;
use crate::issue::Issue;
use crate::openapi::{self, OperationSet, Warning};
use crate::operation::Operation;
use crate::probe::{catalogue, Probe, UnauthorizedPolicy, BEST_PRACTICE_PROBE_IDS, DISCOVER_PROBE_IDS, VULN_PROBE_IDS};
use crate::report::{IssueReport, IssueReportStatus, Reporter, ScanReport};
use crate::security_scheme::{SecurityScheme, SecuritySchemeValues};

const DEFAULT_MAX_PARALLEL: usize = 16;

/// A configured, not-yet-executed scan: the operations under test, the probe catalogue subset
/// enabled for them, and the shared resources (`client`, `policy`) every probe runs against.
pub struct Scan {
    operations: Vec<Operation>,
    probes: Vec<Arc<dyn Probe>>,
    client: Arc<Client>,
    policy: UnauthorizedPolicy,
    enabled: HashSet<String>,
    include: HashSet<String>,
    exclude: HashSet<String>,
    max_parallel: usize,
    warnings: Vec<Warning>,
}

impl Scan {
    /// A scan surface of exactly one request (spec.md §6 "single-operation interface": method,
    /// absolute URL, optional body bytes, optional explicit security scheme — `None` binds
    /// `SecurityScheme::NoAuth`, same as `Operation::new`'s default).
    pub fn new_url_scan(
        method: Method,
        url: Url,
        body: Option<Bytes>,
        scheme: Option<SecurityScheme>,
        client: Arc<Client>,
    ) -> Result<Self, ScanError> {
        let mut operation = Operation::new(method, url, body, client.clone()).map_err(ScanError::Config)?;
        if let Some(scheme) = scheme {
            operation = operation.with_security_schemes(vec![scheme]);
        }
        Ok(Self::from_operations(vec![operation], client))
    }

    /// A scan surface expanded from an OpenAPI document (spec.md §6, component C6).
    pub fn new_openapi_scan(
        doc: &openapiv3::OpenAPI,
        values: &SecuritySchemeValues,
        client: Arc<Client>,
        seed: u64,
    ) -> Result<Self, ScanError> {
        let (OperationSet { operations }, warnings) = openapi::expand(doc, values, client.clone(), seed)?;
        let mut scan = Self::from_operations(operations, client);
        scan.warnings = warnings;
        Ok(scan)
    }

    fn from_operations(operations: Vec<Operation>, client: Arc<Client>) -> Self {
        Self {
            operations,
            probes: catalogue(),
            client,
            policy: UnauthorizedPolicy::default(),
            enabled: HashSet::new(),
            include: HashSet::new(),
            exclude: HashSet::new(),
            max_parallel: DEFAULT_MAX_PARALLEL,
            warnings: Vec::new(),
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn with_policy(mut self, policy: UnauthorizedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Enables every probe id in `VULN_PROBE_IDS` (spec.md §4.7).
    pub fn with_all_vulns_scans(self) -> Self {
        self.with_enabled_scans(VULN_PROBE_IDS.iter().copied())
    }

    /// Enables every probe id in `BEST_PRACTICE_PROBE_IDS`.
    pub fn with_all_best_practices_scans(self) -> Self {
        self.with_enabled_scans(BEST_PRACTICE_PROBE_IDS.iter().copied())
    }

    /// Enables every probe id in `DISCOVER_PROBE_IDS`.
    pub fn with_all_openapi_discover_scans(self) -> Self {
        self.with_enabled_scans(DISCOVER_PROBE_IDS.iter().copied())
    }

    fn with_enabled_scans(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.enabled.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Force-includes a probe id regardless of `enabled`/`exclude` — spec.md §4.7's selection
    /// rule is `(enabled ∧ ¬excluded) ∨ included`, so an id named here always runs even if it was
    /// also passed to `with_exclude_scans`.
    pub fn with_include_scans(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude_scans(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Runs every selected (operation, probe) pair, reporting each finished `ScanReport` to
    /// `on_progress` as it lands, and returns the aggregated `Reporter` plus the operations that
    /// were scanned. `cancellation` lets a caller abort in-flight work; whatever is already
    /// slotted at that point is still returned (spec.md §5 "Cancellation & timeouts").
    pub async fn execute(
        &self,
        on_progress: impl Fn(&ScanReport) + Send + Sync + 'static,
        cancellation: CancellationToken,
    ) -> Result<(Reporter, Vec<Operation>), ScanError> {
        let probes: Vec<Arc<dyn Probe>> = self
            .probes
            .iter()
            .filter(|p| self.is_selected(p.id()))
            .cloned()
            .collect();
        if probes.is_empty() {
            return Err(ScanError::Fatal("no probes selected for this scan".to_string()));
        }

        let total = self.operations.len() * probes.len();
        let mut slots: Vec<Option<ScanReport>> = (0..total).map(|_| None).collect();

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let on_progress = Arc::new(on_progress);
        let mut handles = Vec::with_capacity(total);

        for (op_idx, operation) in self.operations.iter().enumerate() {
            for (probe_idx, probe) in probes.iter().enumerate() {
                let slot = op_idx * probes.len() + probe_idx;
                let operation = operation.clone();
                let probe = probe.clone();
                let client = self.client.clone();
                let policy = self.policy.clone();
                let semaphore = semaphore.clone();
                let cancellation = cancellation.clone();
                let on_progress = on_progress.clone();

                handles.push(tokio::spawn(async move {
                    if cancellation.is_cancelled() {
                        return (slot, None);
                    }
                    let _permit = tokio::select! {
                        permit = semaphore.acquire_owned() => permit.expect("semaphore is never closed"),
                        _ = cancellation.cancelled() => return (slot, None),
                    };

                    let report = run_one(&probe, &operation, client.as_ref(), &policy).await;
                    on_progress(&report);
                    (slot, Some(report))
                }));
            }
        }

        for handle in handles {
            match handle.await {
                Ok((slot, Some(report))) => slots[slot] = Some(report),
                Ok((_, None)) => {}
                Err(e) if e.is_panic() => return Err(ScanError::Fatal(format!("probe task panicked: {e}"))),
                Err(_) => {}
            }
        }

        let reports: Vec<ScanReport> = slots.into_iter().flatten().collect();
        Ok((Reporter::new(reports), self.operations.clone()))
    }

    /// spec.md §4.7: a probe runs iff `(enabled ∧ ¬excluded) ∨ included` — the explicit include
    /// set is an OR-override that beats exclusion, so a probe named in both `--include` and
    /// `--exclude` still runs.
    fn is_selected(&self, probe_id: &str) -> bool {
        (self.enabled.contains(probe_id) && !self.exclude.contains(probe_id)) || self.include.contains(probe_id)
    }
}

/// Runs every security scheme an operation carries through one probe, recording a `Skipped`
/// synthetic report for a scheme the probe declines (`should_run == false`) and containing any
/// `ProbeError` as a skipped report carrying the error text (spec.md §7 "per-probe errors are
/// contained" / component C7).
async fn run_one(probe: &Arc<dyn Probe>, operation: &Operation, client: &Client, policy: &UnauthorizedPolicy) -> ScanReport {
    let mut merged = ScanReport::new(probe.id(), probe.name(), operation.id.clone());

    for scheme in &operation.security_schemes {
        if !probe.should_run(operation, scheme) {
            let mut issue_report = IssueReport::pending(probe.issue(), operation.id.clone()).with_scheme(scheme.for_probe());
            issue_report.skip(Some("probe declined this security scheme".to_string()));
            merged.add_issue_report(issue_report);
            continue;
        }

        match probe.scan(operation, scheme, client, policy).await {
            Ok(report) => {
                for attempt in report.attempts {
                    merged.add_scan_attempt(attempt);
                }
                for issue in report.issues {
                    merged.add_issue_report(issue);
                }
                if let Some(data) = report.data {
                    merged.with_data(data);
                }
            }
            Err(e) => {
                let mut issue_report = synthetic_error_report(probe.issue(), operation.id.clone());
                issue_report.skip(Some(e.to_string()));
                merged.add_issue_report(issue_report);
            }
        }
    }

    merged
}

fn synthetic_error_report(issue: Issue, operation_id: String) -> IssueReport {
    IssueReport {
        issue,
        status: IssueReportStatus::Pending,
        security_scheme: None,
        operation_id,
        data: None,
    }
}
