//! OpenAPI document expansion into concrete operations (spec.md §4.5/§6 / component C6).
//!
//! Grounded on `original_source/openapi/openapi.go` and `original_source/scenario/openapi_test.go`
//! for the expansion semantics (one `Operation` per path×method, security binding/dedup,
//! deterministic ordering under a seed) and on `agentgateway-agentgateway`'s use of the
//! `openapiv3` crate as the validated document model. The crate itself does not validate or
//! dereference `$ref`s — per spec.md §1 that's an external collaborator's job — but it refuses to
//! proceed past an unresolved one rather than silently expanding a broken document.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use openapiv3::{
    Operation as OaOperation, Parameter, ParameterSchemaOrContent, PathItem, ReferenceOr, Schema,
    SchemaKind, SecurityRequirement, SecurityScheme as OaSecurityScheme, Type as OaType,
    VariantOrUnknownOrEmpty,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{Method, Url};

use crate::error::UnsupportedSpec;
use crate::http_client::Client;
use crate::operation::Operation;
use crate::security_scheme::{SchemeIn, SecurityScheme, SecuritySchemeValues};

/// A non-fatal translation note (unknown security scheme name, missing server url, ...).
#[derive(Debug, Clone)]
pub struct Warning(pub String);

/// The set of concrete operations an OpenAPI document expands into.
#[derive(Debug, Clone, Default)]
pub struct OperationSet {
    pub operations: Vec<Operation>,
}

/// Deserializes `bytes` into an `openapiv3::OpenAPI`. Rejects Swagger 2.x documents outright and
/// any document still carrying an unresolved `$ref` — the caller is expected to hand this a
/// de-referenced document (the `openapiv3` crate itself does no `$ref` resolution).
pub fn load_document(bytes: &[u8], is_yaml: bool) -> Result<openapiv3::OpenAPI, UnsupportedSpec> {
    let raw: serde_json::Value = if is_yaml {
        serde_yaml::from_slice(bytes).map_err(|e| UnsupportedSpec::ParseError(e.to_string()))?
    } else {
        serde_json::from_slice(bytes).map_err(|e| UnsupportedSpec::ParseError(e.to_string()))?
    };

    if raw.get("swagger").is_some() {
        return Err(UnsupportedSpec::Version2);
    }

    if let Some(path) = first_unresolved_ref(&raw) {
        return Err(UnsupportedSpec::UnresolvedRef(path));
    }

    serde_json::from_value(raw).map_err(|e| UnsupportedSpec::ParseError(e.to_string()))
}

/// Recursively scans a decoded document for a literal `"$ref"` key, returning a best-effort
/// breadcrumb path to the first one found.
fn first_unresolved_ref(value: &serde_json::Value) -> Option<String> {
    fn walk(value: &serde_json::Value, path: &str) -> Option<String> {
        match value {
            serde_json::Value::Object(map) => {
                if map.contains_key("$ref") {
                    return Some(path.to_string());
                }
                for (k, v) in map {
                    if let Some(found) = walk(v, &format!("{path}/{k}")) {
                        return Some(found);
                    }
                }
                None
            }
            serde_json::Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    if let Some(found) = walk(v, &format!("{path}[{i}]")) {
                        return Some(found);
                    }
                }
                None
            }
            _ => None,
        }
    }
    walk(value, "")
}

/// Expands `doc` into the concrete set of operations a scan runs against, binding security
/// schemes from `values` and synthesizing parameter/body data deterministically from `seed`.
pub fn expand(
    doc: &openapiv3::OpenAPI,
    values: &SecuritySchemeValues,
    client: Arc<Client>,
    seed: u64,
) -> Result<(OperationSet, Vec<Warning>), UnsupportedSpec> {
    let mut operations = Vec::new();
    let mut warnings = Vec::new();

    let base_url = doc
        .servers
        .first()
        .map(|s| s.url.trim_end_matches('/').to_string())
        .unwrap_or_default();

    for (path, item_ref) in doc.paths.paths.iter() {
        let item = match item_ref.as_item() {
            Some(item) => item,
            None => {
                warnings.push(Warning(format!("unresolved path item at {path}")));
                continue;
            }
        };

        for (method, op) in methods_in_order(item) {
            let operation_id = op
                .operation_id
                .clone()
                .unwrap_or_else(|| format!("{method}-{path}"));

            let mut rng = seeded_rng(seed, &operation_id, "");

            let (expanded_path, query_pairs, header_pairs, cookie_pairs) =
                expand_parameters(path, op, &mut rng, &mut warnings, &operation_id);

            let raw_url = format!("{base_url}{expanded_path}");
            let mut url = match Url::parse(&raw_url) {
                Ok(u) => u,
                Err(e) => {
                    warnings.push(Warning(format!("{operation_id}: invalid url {raw_url}: {e}")));
                    continue;
                }
            };
            if !query_pairs.is_empty() {
                let mut qp = url.query_pairs_mut();
                for (k, v) in &query_pairs {
                    qp.append_pair(k, v);
                }
            }

            let body = expand_request_body(op, &mut rng);

            let security_requirements: &[SecurityRequirement] = op
                .security
                .as_deref()
                .or(doc.security.as_deref())
                .unwrap_or(&[]);

            let alternatives = bind_security_alternatives(
                security_requirements,
                doc,
                values,
                &mut warnings,
                &operation_id,
            );

            for schemes in alternatives {
                let mut built = Operation::new(method.clone(), url.clone(), body.clone(), client.clone())
                    .map_err(|e| UnsupportedSpec::ParseError(e.to_string()))?;
                built.id = operation_id.clone();
                built = built.with_security_schemes(schemes);

                if !header_pairs.is_empty() {
                    let mut headers = reqwest::header::HeaderMap::new();
                    for (k, v) in &header_pairs {
                        if let (Ok(name), Ok(value)) = (
                            reqwest::header::HeaderName::try_from(k.as_str()),
                            reqwest::header::HeaderValue::from_str(v),
                        ) {
                            headers.insert(name, value);
                        }
                    }
                    built = built.with_headers(headers);
                }
                if !cookie_pairs.is_empty() {
                    built = built.with_cookies(cookie_pairs.clone());
                }

                operations.push(built);
            }
        }
    }

    Ok((OperationSet { operations }, warnings))
}

/// Walks a path item's declared methods in the fixed order GET, PUT, POST, DELETE, OPTIONS,
/// HEAD, PATCH, TRACE (spec.md §5/§8 property 2: deterministic regardless of declaration order).
fn methods_in_order(item: &PathItem) -> Vec<(Method, &OaOperation)> {
    let candidates: [(Method, &Option<OaOperation>); 8] = [
        (Method::GET, &item.get),
        (Method::PUT, &item.put),
        (Method::POST, &item.post),
        (Method::DELETE, &item.delete),
        (Method::OPTIONS, &item.options),
        (Method::HEAD, &item.head),
        (Method::PATCH, &item.patch),
        (Method::TRACE, &item.trace),
    ];
    candidates
        .into_iter()
        .filter_map(|(m, op)| op.as_ref().map(|o| (m, o)))
        .collect()
}

fn seeded_rng(seed: u64, operation_id: &str, param_name: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    operation_id.hash(&mut hasher);
    param_name.hash(&mut hasher);
    let mixed = seed ^ hasher.finish();
    StdRng::seed_from_u64(mixed)
}

type ParamExpansion = (String, Vec<(String, String)>, Vec<(String, String)>, Vec<(String, String)>);

/// Expands path/query/header/cookie parameters, returning the substituted path plus query/header/
/// cookie key-value pairs to attach.
fn expand_parameters(
    path: &str,
    op: &OaOperation,
    rng: &mut StdRng,
    warnings: &mut Vec<Warning>,
    operation_id: &str,
) -> ParamExpansion {
    let mut expanded_path = path.to_string();
    let mut query_pairs = Vec::new();
    let mut header_pairs = Vec::new();
    let mut cookie_pairs = Vec::new();

    for param_ref in &op.parameters {
        let param = match param_ref.as_item() {
            Some(p) => p,
            None => {
                warnings.push(Warning(format!("{operation_id}: unresolved parameter reference")));
                continue;
            }
        };

        match param {
            Parameter::Path { parameter_data, .. } => {
                let value = synthesize_value(parameter_data, rng);
                expanded_path = expanded_path.replace(&format!("{{{}}}", parameter_data.name), &value);
            }
            Parameter::Query { parameter_data, .. } => {
                if parameter_data.required || rng.gen_bool(0.5) {
                    let value = synthesize_value(parameter_data, rng);
                    query_pairs.push((parameter_data.name.clone(), value));
                }
            }
            Parameter::Header { parameter_data, .. } => {
                if parameter_data.required {
                    let value = synthesize_value(parameter_data, rng);
                    header_pairs.push((parameter_data.name.clone(), value));
                }
            }
            Parameter::Cookie { parameter_data, .. } => {
                if parameter_data.required {
                    let value = synthesize_value(parameter_data, rng);
                    cookie_pairs.push((parameter_data.name.clone(), value));
                }
            }
        }
    }

    (expanded_path, query_pairs, header_pairs, cookie_pairs)
}

fn synthesize_value(data: &openapiv3::ParameterData, rng: &mut StdRng) -> String {
    if let Some(example) = &data.example {
        return value_to_string(example);
    }
    if let Some((_, example)) = data.examples.iter().next() {
        if let Some(item) = example.as_item() {
            if let Some(v) = &item.value {
                return value_to_string(v);
            }
        }
    }
    let schema = match &data.format {
        ParameterSchemaOrContent::Schema(s) => s.as_item(),
        ParameterSchemaOrContent::Content(content) => {
            content.values().next().and_then(|mt| mt.schema.as_ref()).and_then(ReferenceOr::as_item)
        }
    };
    synthesize_from_schema(schema, &data.name, rng)
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn synthesize_from_schema(schema: Option<&Schema>, name: &str, rng: &mut StdRng) -> String {
    let kind = match schema.map(|s| &s.schema_kind) {
        Some(kind) => kind,
        None => return format!("{name}-{}", rng.gen_range(0..1000)),
    };

    match kind {
        SchemaKind::Type(OaType::Integer(ty)) => {
            let min = ty.minimum.unwrap_or(0);
            let max = ty.maximum.unwrap_or(1000);
            rng.gen_range(min..=max.max(min)).to_string()
        }
        SchemaKind::Type(OaType::Number(ty)) => {
            let min = ty.minimum.unwrap_or(0.0);
            let max = ty.maximum.unwrap_or(1000.0);
            rng.gen_range(min..=max.max(min)).to_string()
        }
        SchemaKind::Type(OaType::Boolean(_)) => rng.gen_bool(0.5).to_string(),
        SchemaKind::Type(OaType::String(ty)) => {
            let is_uuid = matches!(
                &ty.format,
                VariantOrUnknownOrEmpty::Unknown(s) if s.eq_ignore_ascii_case("uuid")
            );
            if is_uuid {
                seeded_uuid_like(rng)
            } else if !ty.enumeration.is_empty() {
                ty.enumeration.first().cloned().flatten().unwrap_or_default()
            } else {
                format!("{name}-{}", rng.gen_range(0..1000))
            }
        }
        _ => format!("{name}-{}", rng.gen_range(0..1000)),
    }
}

fn seeded_uuid_like(rng: &mut StdRng) -> String {
    let bytes: [u8; 16] = rng.gen();
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

fn expand_request_body(op: &OaOperation, rng: &mut StdRng) -> Option<bytes::Bytes> {
    let body_ref = op.request_body.as_ref()?;
    let body = body_ref.as_item()?;
    let media = body.content.get("application/json")?;

    if let Some(example) = &media.example {
        return Some(bytes::Bytes::from(serde_json::to_vec(example).ok()?));
    }

    let schema = media.schema.as_ref().and_then(ReferenceOr::as_item);
    let synthesized = synthesize_body_value(schema, rng);
    serde_json::to_vec(&synthesized).ok().map(bytes::Bytes::from)
}

fn synthesize_body_value(schema: Option<&Schema>, rng: &mut StdRng) -> serde_json::Value {
    let kind = match schema.map(|s| &s.schema_kind) {
        Some(kind) => kind,
        None => return serde_json::json!({}),
    };

    match kind {
        SchemaKind::Type(OaType::Object(ty)) => {
            let mut map = serde_json::Map::new();
            for (name, prop_ref) in &ty.properties {
                let prop_schema = prop_ref.clone().unbox();
                let value = match prop_schema.as_item() {
                    Some(s) => match &s.schema_kind {
                        SchemaKind::Type(OaType::String(_)) => {
                            serde_json::Value::String(format!("{name}-{}", rng.gen_range(0..1000)))
                        }
                        SchemaKind::Type(OaType::Integer(_)) => serde_json::json!(rng.gen_range(0..1000)),
                        SchemaKind::Type(OaType::Number(_)) => serde_json::json!(rng.gen_range(0.0..1000.0)),
                        SchemaKind::Type(OaType::Boolean(_)) => serde_json::json!(rng.gen_bool(0.5)),
                        SchemaKind::Type(OaType::Object(_)) => synthesize_body_value(Some(s), rng),
                        _ => serde_json::Value::Null,
                    },
                    None => serde_json::Value::Null,
                };
                map.insert(name.clone(), value);
            }
            serde_json::Value::Object(map)
        }
        _ => serde_json::json!({}),
    }
}

/// Resolves every alternative security requirement into a `Vec<SecurityScheme>` (one per
/// alternative, AND-combined within it), deduplicated by signature (spec.md §4.5 item 5).
fn bind_security_alternatives(
    requirements: &[SecurityRequirement],
    doc: &openapiv3::OpenAPI,
    values: &SecuritySchemeValues,
    warnings: &mut Vec<Warning>,
    operation_id: &str,
) -> Vec<Vec<SecurityScheme>> {
    if requirements.is_empty() {
        return vec![vec![SecurityScheme::no_auth()]];
    }

    let mut seen = HashSet::new();
    let mut alternatives = Vec::new();

    for requirement in requirements {
        if requirement.is_empty() {
            let schemes = vec![SecurityScheme::no_auth()];
            if seen.insert(signature(&schemes)) {
                alternatives.push(schemes);
            }
            continue;
        }

        let mut schemes = Vec::new();
        for name in requirement.keys() {
            let scheme = resolve_named_scheme(name, doc, values, warnings, operation_id);
            schemes.push(scheme);
        }

        let sig = signature(&schemes);
        if seen.insert(sig) {
            alternatives.push(schemes);
        }
    }

    if alternatives.is_empty() {
        alternatives.push(vec![SecurityScheme::no_auth()]);
    }
    alternatives
}

fn resolve_named_scheme(
    name: &str,
    doc: &openapiv3::OpenAPI,
    values: &SecuritySchemeValues,
    warnings: &mut Vec<Warning>,
    operation_id: &str,
) -> SecurityScheme {
    let declared = doc
        .components
        .as_ref()
        .and_then(|c| c.security_schemes.get(name))
        .and_then(ReferenceOr::as_item);

    let declared = match declared {
        Some(d) => d,
        None => {
            warnings.push(Warning(format!(
                "{operation_id}: unknown security scheme \"{name}\", defaulting to no auth"
            )));
            return SecurityScheme::no_auth();
        }
    };

    let credential = values.get(name);

    match declared {
        OaSecurityScheme::HTTP { scheme, bearer_format: _, .. } if scheme.eq_ignore_ascii_case("basic") => {
            match credential.and_then(|c| basic_parts(c)) {
                Some((user, pass)) => {
                    SecurityScheme::http_basic(name, Some(&format!("{user}:{pass}")))
                        .unwrap_or_else(|_| SecurityScheme::http_basic(name, None).unwrap())
                }
                None => SecurityScheme::http_basic(name, None).unwrap(),
            }
        }
        OaSecurityScheme::HTTP { bearer_format, .. } => {
            let is_jwt = bearer_format.as_deref().unwrap_or("").eq_ignore_ascii_case("jwt");
            let token = credential.and_then(|c| c.as_bearer_str());
            if is_jwt {
                SecurityScheme::http_bearer_jwt(name, token.as_deref()).unwrap_or_else(|_| {
                    warnings.push(Warning(format!(
                        "{operation_id}: credential for \"{name}\" is not a valid JWT"
                    )));
                    SecurityScheme::http_bearer_jwt(name, None).unwrap()
                })
            } else {
                SecurityScheme::http_bearer(name, token.as_deref())
            }
        }
        OaSecurityScheme::APIKey { location, .. } => {
            let token = credential.and_then(|c| c.as_bearer_str());
            let location = match location {
                openapiv3::APIKeyLocation::Header => SchemeIn::Header,
                openapiv3::APIKeyLocation::Query => SchemeIn::Query,
                openapiv3::APIKeyLocation::Cookie => SchemeIn::Cookie,
            };
            SecurityScheme::api_key(name, location, token.as_deref())
        }
        OaSecurityScheme::OAuth2 { .. } | OaSecurityScheme::OpenIDConnect { .. } => {
            let token = credential.and_then(|c| c.as_bearer_str());
            SecurityScheme::oauth2(name, token.as_deref())
        }
    }
}

fn basic_parts(credential: &crate::security_scheme::Credential) -> Option<(String, String)> {
    match credential {
        crate::security_scheme::Credential::Basic { user, pass } => Some((user.clone(), pass.clone())),
        _ => None,
    }
}

fn signature(schemes: &[SecurityScheme]) -> String {
    schemes
        .iter()
        .map(|s| format!("{:?}:{}:{:?}", s.scheme_type(), s.name(), s.get_valid_value()))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_swagger_2_documents() {
        let doc = br#"{"swagger": "2.0", "info": {"title": "x", "version": "1"}, "paths": {}}"#;
        let err = load_document(doc, false).unwrap_err();
        assert!(matches!(err, UnsupportedSpec::Version2));
    }

    #[test]
    fn rejects_unresolved_ref() {
        let doc = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "x", "version": "1"},
            "paths": {
                "/widgets": {"$ref": "#/components/paths/widgets"}
            }
        });
        let bytes = serde_json::to_vec(&doc).unwrap();
        let err = load_document(&bytes, false).unwrap_err();
        assert!(matches!(err, UnsupportedSpec::UnresolvedRef(_)));
    }

    fn empty_doc() -> openapiv3::OpenAPI {
        let json = serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "x", "version": "1"},
            "paths": {}
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn no_security_requirement_binds_no_auth() {
        let warnings = &mut Vec::new();
        let doc = empty_doc();
        let values = SecuritySchemeValues::default();
        let alts = bind_security_alternatives(&[], &doc, &values, warnings, "op");
        assert_eq!(alts.len(), 1);
        assert!(matches!(alts[0][0], SecurityScheme::NoAuth));
    }

    #[test]
    fn unknown_scheme_name_warns_and_defaults_to_no_auth() {
        let mut warnings = Vec::new();
        let doc = empty_doc();
        let values = SecuritySchemeValues::default();
        let mut requirement = SecurityRequirement::new();
        requirement.insert("missing".to_string(), vec![]);
        let alts = bind_security_alternatives(&[requirement], &doc, &values, &mut warnings, "op");
        assert_eq!(alts.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(alts[0][0], SecurityScheme::NoAuth));
    }

    #[test]
    fn seeded_rng_is_deterministic_for_same_inputs() {
        let mut a = seeded_rng(42, "op-1", "id");
        let mut b = seeded_rng(42, "op-1", "id");
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }
}
