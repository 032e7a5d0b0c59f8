//! # Checks API Endpoints
//!
//! Endpoint implementations attached to `CheckRunClient`. Only the check run
//! resource is covered; this crate is not a general GitHub API client.

pub mod checks;
