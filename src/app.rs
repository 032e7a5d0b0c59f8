//! # App Credential
//!
//! Holds the GitHub App id and its RS256 private key and produces the
//! short-lived signed assertions exchanged for installation tokens. Signing
//! is CPU-only; no network I/O happens here.

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

use crate::error::{Error, Result};

/// Seconds subtracted from `iat` to absorb clock skew against GitHub
const CLOCK_SKEW_SECS: u64 = 60;

/// Assertion lifetime; GitHub caps app JWTs at ten minutes
const ASSERTION_TTL_SECS: u64 = 600;

#[derive(Serialize)]
struct Claims {
  iat: u64,
  exp: u64,
  iss: String,
}

/// A GitHub App identity: numeric app id plus RS256 private key.
///
/// Constructed once at startup and immutable afterwards. The key material is
/// never serialized back out.
pub struct AppCredential {
  app_id: u64,
  key: EncodingKey,
}

// The signing key must never leak through Debug output
impl fmt::Debug for AppCredential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AppCredential")
      .field("app_id", &self.app_id)
      .finish_non_exhaustive()
  }
}

impl AppCredential {
  /// Parse the App's private key from PEM bytes.
  pub fn from_pem(app_id: u64, pem: &[u8]) -> Result<Self> {
    let key = EncodingKey::from_rsa_pem(pem)
      .map_err(|e| Error::Credential(format!("failed to parse RSA private key: {e}")))?;
    Ok(Self { app_id, key })
  }

  /// Read and parse the App's private key from a PEM file on disk.
  pub fn from_pem_file(app_id: u64, path: &Path) -> Result<Self> {
    let pem = std::fs::read(path)
      .map_err(|e| Error::Credential(format!("failed to read private key {}: {e}", path.display())))?;
    Self::from_pem(app_id, &pem)
  }

  /// The numeric GitHub App id this credential signs for.
  pub fn app_id(&self) -> u64 {
    self.app_id
  }

  /// Produce a fresh signed assertion binding the app identity.
  ///
  /// Each call signs anew; assertions expire within minutes and are not
  /// meant to be reused across long intervals.
  pub fn sign(&self) -> Result<String> {
    let now = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map_err(|e| Error::Credential(format!("system clock is before the Unix epoch: {e}")))?
      .as_secs();

    let claims = Claims {
      iat: now.saturating_sub(CLOCK_SKEW_SECS),
      exp: now + ASSERTION_TTL_SECS,
      iss: self.app_id.to_string(),
    };

    encode(&Header::new(Algorithm::RS256), &claims, &self.key)
      .map_err(|e| Error::Credential(format!("failed to sign app assertion: {e}")))
  }
}
