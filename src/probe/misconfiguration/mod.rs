pub mod cors;
pub mod http_method_override;
pub mod http_trace;
pub mod rate_limit;
pub mod security_headers;
