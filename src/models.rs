//! # Checks API Wire Models
//!
//! Request and response types for check run operations, plus the repository
//! slug parser shared by the endpoint implementations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Lifecycle status of a check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
  Queued,
  InProgress,
  Completed,
}

/// Terminal conclusion of a completed check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
  Success,
  Failure,
  Neutral,
  Cancelled,
  TimedOut,
  ActionRequired,
  Stale,
}

/// Severity of a single annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationLevel {
  Notice,
  Warning,
  Failure,
}

/// One annotated source location rendered alongside the check result.
///
/// Annotation order is preserved on the wire; the rendering side displays
/// them positionally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
  pub path: String,
  pub start_line: u32,
  pub end_line: u32,
  pub annotation_level: AnnotationLevel,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub raw_details: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_column: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_column: Option<u32>,
}

/// An image embedded in the check run output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckImage {
  pub alt: String,
  pub image_url: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub caption: Option<String>,
}

/// Rich output attached to a check run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutput {
  pub title: String,
  pub summary: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub text: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub annotations: Vec<Annotation>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub images: Vec<CheckImage>,
}

/// A requested action button shown on the check run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckAction {
  pub label: String,
  pub description: String,
  pub identifier: String,
}

/// Repository slug in `owner/repo` form.
///
/// Parsed and validated before any network call so a malformed slug never
/// reaches URL interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
  owner: String,
  repo: String,
}

impl RepoSlug {
  pub fn owner(&self) -> &str {
    &self.owner
  }

  pub fn repo(&self) -> &str {
    &self.repo
  }
}

impl FromStr for RepoSlug {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.split_once('/') {
      Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => Ok(Self {
        owner: owner.to_string(),
        repo: repo.to_string(),
      }),
      _ => Err(Error::Validation(format!(
        "repository slug must be `owner/repo`, got `{s}`"
      ))),
    }
  }
}

impl fmt::Display for RepoSlug {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.owner, self.repo)
  }
}

#[derive(Deserialize)]
struct WireCheckSuite {
  id: u64,
}

#[derive(Deserialize)]
struct WireCheckRun {
  id: u64,
  check_suite: WireCheckSuite,
}

/// Identifier pair returned by the Checks API, plus the full decoded payload.
///
/// Transient: constructed per call and handed straight back to the caller.
#[derive(Debug, Clone)]
pub struct CheckRunResponse {
  pub check_run_id: u64,
  pub check_suite_id: u64,
  pub raw: Value,
}

impl CheckRunResponse {
  /// Pull the run/suite id pair out of a decoded 2xx payload.
  pub(crate) fn from_value(raw: Value) -> Result<Self> {
    let wire: WireCheckRun = serde_json::from_value(raw.clone())
      .map_err(|e| Error::Validation(format!("unexpected check run response shape: {e}")))?;
    Ok(Self {
      check_run_id: wire.id,
      check_suite_id: wire.check_suite.id,
      raw,
    })
  }
}
