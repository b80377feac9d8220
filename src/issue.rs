//! Static vulnerability-classification metadata (spec.md §4.5 / component C5).
//!
//! Grounded on `original_source/report/report.go`'s `OWASP_2023_*`/`CWE_*` constants and the
//! teacher's `clean_reporter.rs` `Severity` scoring. The catalogue is closed and known at compile
//! time, so we model it as enums rather than the Go project's loose string constants — each probe
//! owns exactly one `Issue` and never constructs one ad hoc.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwaspCategory {
    BrokenObjectLevelAuthorization,
    BrokenAuthentication,
    BrokenObjectPropertyLevelAuthorization,
    UnrestrictedResourceConsumption,
    BrokenFunctionLevelAuthorization,
    ServerSideRequestForgery,
    SecurityMisconfiguration,
    ImproperInventoryManagement,
    UnsafeConsumptionOfApis,
}

impl OwaspCategory {
    pub fn code(&self) -> &'static str {
        match self {
            OwaspCategory::BrokenObjectLevelAuthorization => "API1:2023",
            OwaspCategory::BrokenAuthentication => "API2:2023",
            OwaspCategory::BrokenObjectPropertyLevelAuthorization => "API3:2023",
            OwaspCategory::UnrestrictedResourceConsumption => "API4:2023",
            OwaspCategory::BrokenFunctionLevelAuthorization => "API5:2023",
            OwaspCategory::ServerSideRequestForgery => "API7:2023",
            OwaspCategory::SecurityMisconfiguration => "API8:2023",
            OwaspCategory::ImproperInventoryManagement => "API9:2023",
            OwaspCategory::UnsafeConsumptionOfApis => "API10:2023",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CweId {
    Cwe287, // Improper Authentication
    Cwe306, // Missing Authentication for Critical Function
    Cwe347, // Improper Verification of Cryptographic Signature
    Cwe327, // Use of a Broken or Risky Cryptographic Algorithm
    Cwe798, // Use of Hard-coded Credentials
    Cwe16,  // Configuration
    Cwe200, // Exposure of Sensitive Information
    Cwe942, // Overly Permissive Cross-domain Whitelist
    Cwe799, // Improper Control of Interaction Frequency
}

impl CweId {
    pub fn number(&self) -> u32 {
        match self {
            CweId::Cwe287 => 287,
            CweId::Cwe306 => 306,
            CweId::Cwe347 => 347,
            CweId::Cwe327 => 327,
            CweId::Cwe798 => 798,
            CweId::Cwe16 => 16,
            CweId::Cwe200 => 200,
            CweId::Cwe942 => 942,
            CweId::Cwe799 => 799,
        }
    }
}

/// Static facts about one kind of vulnerability a probe can detect. One per probe, never built
/// dynamically — the catalogue is the same fixed set the teacher's `Severity`/CVSS bookkeeping
/// used, widened with CWE/OWASP identifiers to match `original_source/report/report.go`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Issue {
    pub id: &'static str,
    pub name: &'static str,
    pub url: Option<&'static str>,
    pub owasp: OwaspCategory,
    pub cwe: Option<CweId>,
    pub cvss_version: f32,
    pub cvss_vector: &'static str,
    pub cvss_score: f32,
}

impl Issue {
    pub const fn severity_label(&self) -> &'static str {
        match self.cvss_score {
            s if s <= 0.0 => "info",
            s if s < 4.0 => "low",
            s if s < 7.0 => "medium",
            s if s < 9.0 => "high",
            _ => "critical",
        }
    }
}

pub const AUTHENTICATION_BYPASS: Issue = Issue {
    id: "auth.authentication_bypass",
    name: "Authentication bypass",
    url: Some("https://owasp.org/API-Security/editions/2023/en/0xa2-broken-authentication/"),
    owasp: OwaspCategory::BrokenAuthentication,
    cwe: Some(CweId::Cwe306),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:N",
    cvss_score: 8.6,
};

pub const JWT_ALG_NONE: Issue = Issue {
    id: "auth.jwt.alg_none",
    name: "JWT alg:none accepted",
    url: Some("https://owasp.org/API-Security/editions/2023/en/0xa2-broken-authentication/"),
    owasp: OwaspCategory::BrokenAuthentication,
    cwe: Some(CweId::Cwe347),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:N",
    cvss_score: 9.1,
};

pub const JWT_NOT_VERIFIED: Issue = Issue {
    id: "auth.jwt.not_verified",
    name: "JWT signature not verified",
    url: Some("https://owasp.org/API-Security/editions/2023/en/0xa2-broken-authentication/"),
    owasp: OwaspCategory::BrokenAuthentication,
    cwe: Some(CweId::Cwe347),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:N",
    cvss_score: 9.1,
};

pub const JWT_NULL_SIGNATURE: Issue = Issue {
    id: "auth.jwt.null_signature",
    name: "JWT empty signature accepted",
    url: Some("https://owasp.org/API-Security/editions/2023/en/0xa2-broken-authentication/"),
    owasp: OwaspCategory::BrokenAuthentication,
    cwe: Some(CweId::Cwe347),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:N",
    cvss_score: 9.1,
};

pub const JWT_WEAK_SECRET: Issue = Issue {
    id: "auth.jwt.weak_secret",
    name: "JWT signed with a guessable secret",
    url: Some("https://owasp.org/API-Security/editions/2023/en/0xa2-broken-authentication/"),
    owasp: OwaspCategory::BrokenAuthentication,
    cwe: Some(CweId::Cwe798),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:N",
    cvss_score: 9.8,
};

pub const HTTP_TRACE: Issue = Issue {
    id: "misconfiguration.http_trace",
    name: "TRACE method enabled",
    url: Some("https://owasp.org/www-community/attacks/Cross_Site_Tracing"),
    owasp: OwaspCategory::SecurityMisconfiguration,
    cwe: Some(CweId::Cwe16),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:L/I:N/A:N",
    cvss_score: 4.3,
};

pub const HTTP_METHOD_OVERRIDE: Issue = Issue {
    id: "misconfiguration.http_method_override",
    name: "HTTP method override honored",
    url: Some("https://owasp.org/API-Security/editions/2023/en/0xa5-broken-function-level-authorization/"),
    owasp: OwaspCategory::BrokenFunctionLevelAuthorization,
    cwe: Some(CweId::Cwe16),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:N",
    cvss_score: 8.1,
};

pub const FINGERPRINT: Issue = Issue {
    id: "discover.fingerprint",
    name: "Technology fingerprint",
    url: None,
    owasp: OwaspCategory::ImproperInventoryManagement,
    cwe: Some(CweId::Cwe200),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:N/I:N/A:N",
    cvss_score: 0.0,
};

pub const CORS_MISCONFIGURATION: Issue = Issue {
    id: "misconfiguration.cors",
    name: "CORS misconfiguration",
    url: Some("https://owasp.org/www-community/attacks/CORS_OriginHeaderScrutiny"),
    owasp: OwaspCategory::SecurityMisconfiguration,
    cwe: Some(CweId::Cwe942),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:R/S:U/C:H/I:L/A:N",
    cvss_score: 7.4,
};

pub const SECURITY_HEADERS: Issue = Issue {
    id: "misconfiguration.security_headers",
    name: "Missing security headers",
    url: Some("https://owasp.org/www-project-secure-headers/"),
    owasp: OwaspCategory::SecurityMisconfiguration,
    cwe: Some(CweId::Cwe16),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:L/I:N/A:N",
    cvss_score: 3.1,
};

pub const RATE_LIMIT_MISSING: Issue = Issue {
    id: "misconfiguration.rate_limit",
    name: "No rate limiting observed",
    url: Some("https://owasp.org/API-Security/editions/2023/en/0xa4-unrestricted-resource-consumption/"),
    owasp: OwaspCategory::UnrestrictedResourceConsumption,
    cwe: Some(CweId::Cwe799),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:N/I:N/A:L",
    cvss_score: 5.3,
};

pub const INFORMATION_LEAK: Issue = Issue {
    id: "discover.information_leak",
    name: "Information leak in response",
    url: None,
    owasp: OwaspCategory::ImproperInventoryManagement,
    cwe: Some(CweId::Cwe200),
    cvss_version: 3.1,
    cvss_vector: "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:L/I:N/A:N",
    cvss_score: 5.3,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_labels_bucket_as_expected() {
        assert_eq!(FINGERPRINT.severity_label(), "info");
        assert_eq!(HTTP_TRACE.severity_label(), "medium");
        assert_eq!(JWT_WEAK_SECRET.severity_label(), "critical");
    }

    #[test]
    fn owasp_codes_are_stable_strings() {
        assert_eq!(AUTHENTICATION_BYPASS.owasp.code(), "API2:2023");
    }
}
