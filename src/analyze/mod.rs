//! Response-analysis heuristics shared by several probes (spec.md §4.6 catalogue entries
//! `discover::fingerprint`, `misconfiguration::cors`, `misconfiguration::security_headers`).
//!
//! Kept as the teacher's own analyzer structs (`TechnologyFingerprint`, `CorsAnalysis`,
//! `SecurityHeaderAnalysis`) — the probes in `crate::probe` wrap these in the `Probe` contract
//! instead of calling them ad hoc, the way the teacher's CLI used to.

pub mod cors_checker;
pub mod fingerprint;
pub mod security_headers;
