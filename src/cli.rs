//! Command-line surface over the scan engine (spec.md §1 "out of scope" collaborator).
//!
//! Grounded on the teacher's `cli.rs` (`clap::Parser`-derived `Cli`/`Commands`, global
//! `--debug`/`--verbose` flags, an `after_help` usage block) trimmed to the two scan surfaces
//! spec.md §6 actually names: a single ad hoc operation (component C4) or an OpenAPI document
//! (component C6) — the teacher's domain-recon flags (`--subdomains`, `--browser`, `--anon`,
//! `--bypass-waf`, `--deep-js`, ...) have no counterpart in SPEC_FULL.md and are dropped rather
//! than carried as dead CLI surface.

use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(
    author,
    version,
    about = "apivuln_hunter - API vulnerability scanner",
    long_about = None,
    after_help = "EXAMPLES:
  Probe a single operation:
    apivuln_hunter url https://api.example.com/widgets --bearer-jwt $TOKEN --all-vulns

  Scan every operation in an OpenAPI document:
    apivuln_hunter openapi ./openapi.yaml --credentials ./creds.toml --all-vulns --all-best-practices

For more information: https://github.com/mmadersbacher/API_Hunter"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable verbose (info-level) logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

/// Options shared by both scan surfaces (spec.md §6 "Orchestrator options").
#[derive(clap::Args, Debug)]
pub struct ScanOptions {
    /// Tokens/sec the shared rate limiter allows [default: 10]
    #[arg(long)]
    pub rate_limit: Option<u32>,

    /// Per-request timeout in seconds [default: 10]
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Explicit proxy URL; overrides any environment proxy
    #[arg(long)]
    pub proxy: Option<String>,

    /// Extra default header, repeatable, formatted "Name: value"
    #[arg(long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Extra default cookie, repeatable, formatted "name=value"
    #[arg(long = "cookie", value_name = "NAME=VALUE")]
    pub cookies: Vec<String>,

    /// Upper bound on concurrently in-flight (operation, probe) pairs [default: 16]
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Load defaults (rate limit, timeout, max parallel, severity threshold, proxy) from a TOML
    /// `EngineConfig` file; any flag above still overrides the value it sets
    #[arg(long)]
    pub config: Option<String>,

    /// Enable every probe in `VULN_PROBE_IDS`
    #[arg(long)]
    pub all_vulns: bool,

    /// Enable every probe in `BEST_PRACTICE_PROBE_IDS`
    #[arg(long)]
    pub all_best_practices: bool,

    /// Enable every probe in `DISCOVER_PROBE_IDS`
    #[arg(long)]
    pub all_openapi_discover: bool,

    /// Probe id to force-include regardless of the `--all-*` selection, repeatable
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Probe id to force-exclude even if selected by `--all-*`/`--include`, repeatable
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Minimum CVSS score that makes the process exit non-zero (spec.md §6 exit semantics)
    #[arg(long)]
    pub severity_threshold: Option<f32>,

    /// Render format for the report
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Write the rendered report to this file instead of stdout
    #[arg(long)]
    pub out: Option<String>,

    /// POST the JSON report to this URL after the scan completes
    #[arg(long)]
    pub post_url: Option<String>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Probe a single HTTP operation (spec.md §6 "single-operation interface")
    Url {
        /// HTTP method, e.g. GET, POST, DELETE
        #[arg(long, default_value = "GET")]
        method: String,

        /// Absolute target URL
        url: String,

        /// Literal request body
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Path to a file whose contents become the request body
        #[arg(long)]
        body_file: Option<String>,

        /// Opaque bearer token to attach as the operation's security scheme
        #[arg(long, conflicts_with_all = ["bearer_jwt", "basic", "api_key"])]
        bearer: Option<String>,

        /// Bearer token declared as a JWT (fails fast if it doesn't parse as one)
        #[arg(long, conflicts_with_all = ["bearer", "basic", "api_key"])]
        bearer_jwt: Option<String>,

        /// HTTP Basic credential, formatted "user:password"
        #[arg(long, conflicts_with_all = ["bearer", "bearer_jwt", "api_key"])]
        basic: Option<String>,

        /// API key header/cookie/query value, formatted "name=value"
        #[arg(long, conflicts_with_all = ["bearer", "bearer_jwt", "basic"])]
        api_key: Option<String>,

        /// Where the API key is carried
        #[arg(long, value_enum, default_value_t = ApiKeyLocation::Header)]
        api_key_in: ApiKeyLocation,

        #[command(flatten)]
        scan: ScanOptions,
    },

    /// Expand an OpenAPI document into operations and scan every one (spec.md §6, component C6)
    Openapi {
        /// Path to the OpenAPI 3.x document (JSON or YAML)
        document: String,

        /// Path to a TOML/JSON file mapping security-scheme name to credential
        #[arg(long)]
        credentials: Option<String>,

        /// Seed for deterministic fake-data generation (spec.md §4.5)
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[command(flatten)]
        scan: ScanOptions,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum ApiKeyLocation {
    Header,
    Cookie,
    Query,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
