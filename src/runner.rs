//! Wires the CLI surface to the scan engine (spec.md §1 "out of scope" collaborator).
//!
//! Grounded on the teacher's `run_from_cli` (tracing-subscriber setup keyed off `--debug`/
//! `--verbose`, `anyhow::Result` at the boundary) generalized to the new `Commands::Url`/
//! `Commands::Openapi` surface and the real `Scan`/`Reporter` engine instead of the teacher's
//! domain-recon pipeline.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use anyhow::Context;
use reqwest::{Method, Url};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use apivuln_hunter::config::EngineConfig;
use apivuln_hunter::error::ScanError;
use apivuln_hunter::http_client::{Client, ClientOptions};
use apivuln_hunter::openapi;
use apivuln_hunter::output::{post_report, render_json, render_table, render_yaml};
use apivuln_hunter::report::Reporter;
use apivuln_hunter::scan::Scan;
use apivuln_hunter::security_scheme::{Credential, SchemeIn, SecurityScheme, SecuritySchemeValues};

use crate::cli::{ApiKeyLocation, Cli, Commands, OutputFormat, ScanOptions};

/// Drives one scan from a parsed `Cli` and returns the process exit code spec.md §6 defines
/// (0 clean, 1 a failed issue at or above `--severity-threshold`). Any `Err` here is a setup
/// failure (bad flags, unreadable file, malformed OpenAPI document, ...) and the caller maps it
/// to exit code 2 rather than this function picking one itself.
pub async fn run_from_cli(cli: Cli) -> anyhow::Result<i32> {
    let crate_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter_str = format!("apivuln_hunter={crate_level},reqwest=info,hyper=info");
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Url {
            method,
            url,
            body,
            body_file,
            bearer,
            bearer_jwt,
            basic,
            api_key,
            api_key_in,
            scan,
        } => {
            let method = Method::from_bytes(method.as_bytes()).context("invalid HTTP method")?;
            let url = Url::parse(&url).context("invalid target url")?;
            let body = load_body(body, body_file)?;
            let scheme = build_single_scheme(bearer, bearer_jwt, basic, api_key, api_key_in)?;

            let config = load_config(&scan)?;
            let client = Arc::new(build_client(&scan, &config)?);
            let scan_obj = Scan::new_url_scan(method, url, body, scheme, client.clone()).map_err(setup_error)?;
            let scan_obj = apply_selection(scan_obj, &scan, &config);
            run_scan(scan_obj, &scan, &config, &client).await
        }
        Commands::Openapi {
            document,
            credentials,
            seed,
            scan,
        } => {
            let bytes = fs::read(&document).with_context(|| format!("reading {document}"))?;
            let is_yaml = document.ends_with(".yaml") || document.ends_with(".yml");
            let doc = openapi::load_document(&bytes, is_yaml).map_err(anyhow::Error::from)?;
            let values = match credentials {
                Some(path) => load_credentials(&path)?,
                None => SecuritySchemeValues::default(),
            };

            let config = load_config(&scan)?;
            let client = Arc::new(build_client(&scan, &config)?);
            let scan_obj = Scan::new_openapi_scan(&doc, &values, client.clone(), seed).map_err(setup_error)?;
            for warning in scan_obj.warnings() {
                tracing::warn!("{}", warning.0);
            }
            let scan_obj = apply_selection(scan_obj, &scan, &config);
            run_scan(scan_obj, &scan, &config, &client).await
        }
    }
}

/// Runs `scan_obj`, renders + writes the report, and returns the exit code spec.md §6 defines:
/// 0 clean, 1 a failed issue scores at or above the effective severity threshold, 2 is handled
/// earlier by `setup_error` (this function only ever returns 0 or 1).
async fn run_scan(scan_obj: Scan, opts: &ScanOptions, config: &EngineConfig, client: &Arc<Client>) -> anyhow::Result<i32> {
    let (reporter, operations) = scan_obj
        .execute(
            |report| tracing::info!(probe = %report.id, operation = %report.operation_id, "probe finished"),
            CancellationToken::new(),
        )
        .await
        .map_err(setup_error)?;
    tracing::info!(operations = operations.len(), reports = reporter.reports.len(), "scan complete");

    write_report(&reporter, opts)?;

    if let Some(post_url) = &opts.post_url {
        let url = Url::parse(post_url).context("invalid --post-url")?;
        let status = post_report(client, url, &reporter).await?;
        tracing::info!(status = %status, "posted report");
    }

    let threshold = opts.severity_threshold.unwrap_or(config.severity_threshold);
    let exit_code = if reporter.has_vulnerability() && reporter.highest_severity_score() >= threshold {
        1
    } else {
        0
    };
    Ok(exit_code)
}

fn write_report(reporter: &Reporter, opts: &ScanOptions) -> anyhow::Result<()> {
    let rendered = match opts.format {
        OutputFormat::Table => render_table(reporter),
        OutputFormat::Json => render_json(reporter)?,
        OutputFormat::Yaml => render_yaml(reporter)?,
    };

    match &opts.out {
        Some(path) => fs::write(path, rendered).with_context(|| format!("writing report to {path}"))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Applies the `--all-*`/`--include`/`--exclude`/`--max-parallel` flags to a freshly constructed
/// `Scan` (spec.md §6 "Orchestrator options").
fn apply_selection(mut scan_obj: Scan, opts: &ScanOptions, config: &EngineConfig) -> Scan {
    scan_obj = scan_obj.with_max_parallel(opts.max_parallel.unwrap_or(config.max_parallel));
    if opts.all_vulns {
        scan_obj = scan_obj.with_all_vulns_scans();
    }
    if opts.all_best_practices {
        scan_obj = scan_obj.with_all_best_practices_scans();
    }
    if opts.all_openapi_discover {
        scan_obj = scan_obj.with_all_openapi_discover_scans();
    }
    scan_obj = scan_obj.with_include_scans(opts.include.iter().cloned());
    scan_obj.with_exclude_scans(opts.exclude.iter().cloned())
}

/// Loads `--config`'s `EngineConfig` if given, otherwise the engine defaults; individual
/// `ScanOptions` flags always take precedence over whatever this returns.
fn load_config(opts: &ScanOptions) -> anyhow::Result<EngineConfig> {
    match &opts.config {
        Some(path) => Ok(EngineConfig::from_toml_file(std::path::Path::new(path))?),
        None => Ok(EngineConfig::default()),
    }
}

fn build_client(opts: &ScanOptions, config: &EngineConfig) -> anyhow::Result<Client> {
    let mut client_opts = ClientOptions {
        timeout: Some(std::time::Duration::from_secs(opts.timeout_secs.unwrap_or(config.timeout_secs))),
        rate_limit: Some(opts.rate_limit.unwrap_or(config.rate_limit)),
        ..Default::default()
    };

    let proxy = opts.proxy.clone().or_else(|| config.proxy_url.clone());
    if let Some(proxy) = proxy {
        client_opts.proxy_url = Some(Url::parse(&proxy).context("invalid proxy url")?);
    }

    let mut header_map = reqwest::header::HeaderMap::new();
    for raw in &opts.headers {
        let (name, value) = raw.split_once(':').with_context(|| format!("malformed --header \"{raw}\", expected \"Name: value\""))?;
        let name = reqwest::header::HeaderName::try_from(name.trim()).context("invalid header name")?;
        let value = reqwest::header::HeaderValue::from_str(value.trim()).context("invalid header value")?;
        header_map.insert(name, value);
    }
    client_opts.header = header_map;

    let mut cookies = Vec::new();
    for raw in &opts.cookies {
        let (name, value) = raw.split_once('=').with_context(|| format!("malformed --cookie \"{raw}\", expected \"name=value\""))?;
        cookies.push((name.to_string(), value.to_string()));
    }
    client_opts.cookies = cookies;

    Client::new(client_opts).map_err(anyhow::Error::from)
}

fn load_body(body: Option<String>, body_file: Option<String>) -> anyhow::Result<Option<bytes::Bytes>> {
    if let Some(body) = body {
        return Ok(Some(bytes::Bytes::from(body.into_bytes())));
    }
    if let Some(path) = body_file {
        let contents = fs::read(&path).with_context(|| format!("reading {path}"))?;
        return Ok(Some(bytes::Bytes::from(contents)));
    }
    Ok(None)
}

fn build_single_scheme(
    bearer: Option<String>,
    bearer_jwt: Option<String>,
    basic: Option<String>,
    api_key: Option<String>,
    api_key_in: ApiKeyLocation,
) -> anyhow::Result<Option<SecurityScheme>> {
    if let Some(token) = bearer {
        return Ok(Some(SecurityScheme::http_bearer("auth", Some(&token))));
    }
    if let Some(token) = bearer_jwt {
        return Ok(Some(
            SecurityScheme::http_bearer_jwt("auth", Some(&token)).context("--bearer-jwt does not parse as a JWT")?,
        ));
    }
    if let Some(credential) = basic {
        return Ok(Some(
            SecurityScheme::http_basic("auth", Some(&credential)).context("--basic must be \"user:password\"")?,
        ));
    }
    if let Some(raw) = api_key {
        let (name, value) = raw.split_once('=').context("--api-key must be \"name=value\"")?;
        let location = match api_key_in {
            ApiKeyLocation::Header => SchemeIn::Header,
            ApiKeyLocation::Cookie => SchemeIn::Cookie,
            ApiKeyLocation::Query => SchemeIn::Query,
        };
        return Ok(Some(SecurityScheme::api_key(name, location, Some(value))));
    }
    Ok(None)
}

/// Loads a TOML or JSON file mapping security-scheme name to credential (spec.md §6 "Credentials
/// input"). Extension-sniffed the same way `openapi::load_document` sniffs YAML vs JSON.
fn load_credentials(path: &str) -> anyhow::Result<SecuritySchemeValues> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let map: HashMap<String, Credential> = if path.ends_with(".json") {
        serde_json::from_str(&text).context("parsing credentials as JSON")?
    } else {
        toml::from_str(&text).context("parsing credentials as TOML")?
    };
    Ok(SecuritySchemeValues::new(map))
}

fn setup_error(e: ScanError) -> anyhow::Error {
    anyhow::Error::from(e)
}
