//! # GitHub App Check Run Client
//!
//! Authenticates as a GitHub App installation and creates or updates Check
//! Run records against a repository's commits. Covers the installation-token
//! lifecycle (signed app assertions, token exchange, caching with
//! per-installation single-flight refresh) and the conditional-field rules
//! the Checks API enforces on create/update request bodies.
//!
//! The crate is a library; argument parsing, configuration discovery, and
//! output rendering belong to the calling tool.

pub mod app;
pub mod client;
pub mod consts;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod request;
pub mod token;

// Re-export the client and credential types
pub use app::AppCredential;
pub use client::CheckRunClient;
pub use error::{Error, Result};
// Re-export wire models
pub use models::{
  Annotation, AnnotationLevel, CheckAction, CheckConclusion, CheckImage, CheckOutput, CheckRunResponse, CheckStatus,
  RepoSlug,
};
// Re-export the request builder surface
pub use request::{CheckRunFields, build_create, build_update};
pub use token::{InstallationToken, InstallationTokenCache};
