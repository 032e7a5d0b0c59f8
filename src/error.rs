//! # Error Taxonomy
//!
//! Typed failures surfaced to the calling tool. The caller decides how to
//! render them and what exit code to map them to; the crate itself never
//! prints or exits.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  /// Key material unusable or the signing operation failed. Fatal, never
  /// retried.
  #[error("credential error: {0}")]
  Credential(String),

  /// The app assertion or installation token was rejected, including after
  /// the single transparent token refresh.
  #[error("authentication rejected: {0}")]
  Auth(String),

  /// The installation, repository, or check run does not exist. Never
  /// retried.
  #[error("not found: {0}")]
  NotFound(String),

  /// The request violates the Checks API field rules, either caught locally
  /// before any network call or reported by the remote side. The message
  /// names the offending field or rule.
  #[error("invalid check run request: {0}")]
  Validation(String),

  /// A network, 5xx, or 429 failure that survived the bounded retries.
  #[error("transient failure after {attempts} attempt(s): {message}")]
  Transient {
    message: String,
    attempts: u32,
    /// The request may have reached the server before the failure, so the
    /// remote mutation may already have taken effect.
    unknown_outcome: bool,
    #[source]
    source: Option<reqwest::Error>,
  },
}

impl Error {
  /// Duplicate this failure for another caller that was awaiting the same
  /// exchange. The transport-level source, when present, stays with the
  /// original; variant and message carry over.
  pub(crate) fn shared(&self) -> Self {
    match self {
      Error::Credential(message) => Error::Credential(message.clone()),
      Error::Auth(message) => Error::Auth(message.clone()),
      Error::NotFound(message) => Error::NotFound(message.clone()),
      Error::Validation(message) => Error::Validation(message.clone()),
      Error::Transient {
        message,
        attempts,
        unknown_outcome,
        ..
      } => Error::Transient {
        message: message.clone(),
        attempts: *attempts,
        unknown_outcome: *unknown_outcome,
        source: None,
      },
    }
  }

  /// Whether the failure left the remote outcome unknown (e.g. a timeout
  /// after the request was already on the wire).
  pub fn is_unknown_outcome(&self) -> bool {
    matches!(
      self,
      Error::Transient {
        unknown_outcome: true,
        ..
      }
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validation_display_names_the_rule() {
    let err = Error::Validation("`conclusion` requires status `completed`".to_string());
    assert_eq!(
      err.to_string(),
      "invalid check run request: `conclusion` requires status `completed`"
    );
  }

  #[test]
  fn test_transient_display_carries_attempts() {
    let err = Error::Transient {
      message: "POST /check-runs returned HTTP 503".to_string(),
      attempts: 3,
      unknown_outcome: false,
      source: None,
    };
    assert!(err.to_string().contains("after 3 attempt(s)"));
    assert!(!err.is_unknown_outcome());
  }

  #[test]
  fn test_shared_copy_preserves_variant_and_message() {
    let original = Error::Transient {
      message: "token exchange returned HTTP 503".to_string(),
      attempts: 3,
      unknown_outcome: true,
      source: None,
    };
    let copy = original.shared();
    assert_eq!(copy.to_string(), original.to_string());
    assert!(copy.is_unknown_outcome());

    let auth = Error::Auth("assertion rejected".to_string());
    assert!(matches!(auth.shared(), Error::Auth(message) if message == "assertion rejected"));
  }

  #[test]
  fn test_unknown_outcome_flag() {
    let err = Error::Transient {
      message: "request timed out".to_string(),
      attempts: 1,
      unknown_outcome: true,
      source: None,
    };
    assert!(err.is_unknown_outcome());
    assert!(!Error::Auth("rejected".to_string()).is_unknown_outcome());
  }
}
