pub mod alg_none;
pub mod not_verified;
pub mod null_signature;
pub mod weak_secret;
