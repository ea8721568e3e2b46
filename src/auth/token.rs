//! Token models: redacted secrets, cache records, and caller-facing access tokens.

pub mod access;
pub mod record;
pub mod secret;
