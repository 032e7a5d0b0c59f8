//! # Installation Token Cache
//!
//! Exchanges a signed app assertion for an installation-scoped bearer token
//! and memoizes it until expiry. Refreshes are single-flighted per
//! installation: concurrent callers for the same installation share one
//! network exchange, while unrelated installations never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::app::AppCredential;
use crate::client::{backoff_delay, is_transient, remote_message, retry_after_hint};
use crate::consts;
use crate::error::{Error, Result};

/// A short-lived installation-scoped bearer token.
///
/// Usable only while `now < expires_at`; an expired token is discarded and
/// replaced, never mutated in place.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationToken {
  #[serde(rename = "token")]
  pub value: String,
  pub expires_at: DateTime<Utc>,
}

impl InstallationToken {
  /// Whether the token is still usable, with a safety margin so it is never
  /// handed out moments before the server clock expires it.
  pub fn is_valid(&self) -> bool {
    self.is_valid_at(Utc::now())
  }

  fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at - now > Duration::seconds(consts::TOKEN_EXPIRY_MARGIN_SECS)
  }
}

/// Per-installation cache slot. The async mutex is held across a token
/// exchange, so callers queued on it while one runs form a cohort that
/// shares the exchange's outcome — token or failure — instead of issuing
/// their own. The generation counter, bumped after every completed exchange,
/// is how a caller tells whether an exchange finished while it waited.
#[derive(Default)]
struct Slot {
  state: tokio::sync::Mutex<SlotState>,
  generation: AtomicU64,
}

#[derive(Default)]
struct SlotState {
  token: Option<InstallationToken>,
  failure: Option<Error>,
}

/// Caches installation tokens keyed by installation id.
///
/// Construct one instance and hand it to the clients that need it; there is
/// no process-wide memoization.
pub struct InstallationTokenCache {
  credential: AppCredential,
  http: Client,
  pub(crate) base_url: String,
  slots: Mutex<HashMap<u64, Arc<Slot>>>,
}

impl InstallationTokenCache {
  /// Create a cache exchanging tokens against the SaaS GitHub API.
  pub fn new(credential: AppCredential) -> Self {
    Self::with_base_url(credential, consts::API_BASE_URL)
  }

  /// Create a cache against an explicit API root (GitHub Enterprise
  /// deployments).
  pub fn with_base_url(credential: AppCredential, base_url: impl Into<String>) -> Self {
    Self {
      credential,
      http: Client::new(),
      base_url: base_url.into(),
      slots: Mutex::new(HashMap::new()),
    }
  }

  /// Return a valid token for the installation.
  ///
  /// A cached, still-valid token is returned without network I/O. Otherwise
  /// exactly one exchange runs no matter how many callers arrive at once;
  /// every caller observes the resulting token or the same failure. Callers
  /// holding a previously returned token re-call this instead of reusing
  /// stale values.
  pub async fn get_token(&self, installation_id: u64) -> Result<InstallationToken> {
    let slot = self.slot(installation_id);
    let observed = slot.generation.load(Ordering::SeqCst);
    let mut state = slot.state.lock().await;

    if let Some(token) = state.token.as_ref() {
      if token.is_valid() {
        return Ok(token.clone());
      }
    }

    // An exchange completed while this caller was queued on the slot; share
    // its failure rather than issuing another exchange. (A successful one
    // already returned above.)
    if slot.generation.load(Ordering::SeqCst) != observed {
      if let Some(failure) = state.failure.as_ref() {
        return Err(failure.shared());
      }
    }

    state.failure = None;
    let outcome = self.exchange(installation_id).await;
    slot.generation.fetch_add(1, Ordering::SeqCst);
    match outcome {
      Ok(token) => {
        debug!(installation_id, expires_at = %token.expires_at, "cached fresh installation token");
        state.token = Some(token.clone());
        Ok(token)
      }
      Err(err) => {
        state.token = None;
        state.failure = Some(err.shared());
        Err(err)
      }
    }
  }

  /// Drop any cached token for the installation so the next `get_token`
  /// performs a fresh exchange. Used by the client when the remote side
  /// rejects a token mid-flight.
  pub async fn evict(&self, installation_id: u64) {
    let slot = self.slot(installation_id);
    let mut state = slot.state.lock().await;
    state.token = None;
    state.failure = None;
  }

  fn slot(&self, installation_id: u64) -> Arc<Slot> {
    let mut slots = self.slots.lock().expect("token slot map poisoned");
    Arc::clone(slots.entry(installation_id).or_default())
  }

  /// Sign a fresh assertion and POST it to the installation's access-token
  /// endpoint. Transient failures back off and retry; rejection of the
  /// assertion and unknown installations are surfaced immediately.
  async fn exchange(&self, installation_id: u64) -> Result<InstallationToken> {
    let assertion = self.credential.sign()?;
    let url = format!("{}/app/installations/{}/access_tokens", self.base_url, installation_id);

    let mut transient_attempts = 0;
    loop {
      let result = self
        .http
        .post(&url)
        .timeout(consts::REQUEST_TIMEOUT)
        .header("Accept", consts::ACCEPT)
        .header("User-Agent", consts::USER_AGENT)
        .bearer_auth(&assertion)
        .send()
        .await;

      let response = match result {
        Ok(response) => response,
        Err(err) => {
          transient_attempts += 1;
          if transient_attempts >= consts::MAX_TRANSIENT_ATTEMPTS {
            return Err(Error::Transient {
              message: format!("token exchange for installation {installation_id} failed: {err}"),
              attempts: transient_attempts,
              unknown_outcome: false,
              source: Some(err),
            });
          }
          tokio::time::sleep(backoff_delay(transient_attempts, None)).await;
          continue;
        }
      };

      let status = response.status();
      match status {
        _ if status.is_success() => {
          return response
            .json::<InstallationToken>()
            .await
            .map_err(|e| Error::Validation(format!("unexpected token response shape: {e}")));
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
          return Err(Error::Auth(format!(
            "token issuer rejected the app assertion for installation {installation_id}"
          )));
        }
        StatusCode::NOT_FOUND => {
          return Err(Error::NotFound(format!("installation {installation_id} does not exist")));
        }
        _ if is_transient(status) => {
          transient_attempts += 1;
          if transient_attempts >= consts::MAX_TRANSIENT_ATTEMPTS {
            return Err(Error::Transient {
              message: format!("token exchange returned HTTP {status}"),
              attempts: transient_attempts,
              unknown_outcome: false,
              source: None,
            });
          }
          let hint = retry_after_hint(&response);
          tokio::time::sleep(backoff_delay(transient_attempts, hint)).await;
        }
        _ => {
          let message = remote_message(response).await;
          return Err(Error::Validation(format!("token exchange rejected ({status}): {message}")));
        }
      }
    }
  }
}
