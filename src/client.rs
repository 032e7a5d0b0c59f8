//! # Check Run HTTP Client
//!
//! Orchestrates token acquisition, request execution, and outcome mapping
//! for check run calls: protocol headers, the single transparent token
//! refresh on 401/403, and bounded backoff retries for transient failures.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::consts;
use crate::error::{Error, Result};
use crate::models::CheckRunResponse;
use crate::token::InstallationTokenCache;

/// HTTP client for check run create/update calls.
///
/// Holds no per-call state beyond the token cache handed in at construction,
/// so one instance may serve a single scoped operation or be shared.
pub struct CheckRunClient {
  pub(crate) client: Client,
  pub(crate) base_url: String,
  pub(crate) tokens: Arc<InstallationTokenCache>,
  pub(crate) user_agent: String,
}

impl CheckRunClient {
  /// Create a client against the SaaS GitHub API with the default
  /// User-Agent.
  pub fn new(tokens: Arc<InstallationTokenCache>) -> Self {
    Self::with_options(tokens, consts::API_BASE_URL, None)
  }

  /// Create a client with an explicit API root (GitHub Enterprise
  /// deployments) and an optional User-Agent prefix supplied by the calling
  /// tool.
  pub fn with_options(
    tokens: Arc<InstallationTokenCache>,
    base_url: impl Into<String>,
    user_agent_prefix: Option<&str>,
  ) -> Self {
    Self {
      client: Client::new(),
      base_url: base_url.into(),
      tokens,
      user_agent: compose_user_agent(user_agent_prefix),
    }
  }

  /// Issue one authenticated call against the Checks API.
  ///
  /// On 401/403 the cached installation token is evicted and the call is
  /// retried exactly once with a fresh token. Transient failures (5xx, 429,
  /// transport errors) are retried with backoff up to the bounded attempt
  /// count; that budget is separate from the auth refresh.
  pub(crate) async fn send_check(
    &self,
    method: Method,
    url: &str,
    installation_id: u64,
    body: &Value,
  ) -> Result<CheckRunResponse> {
    let mut refreshed = false;
    let mut transient_attempts = 0;

    loop {
      let token = self.tokens.get_token(installation_id).await?;

      let result = self
        .client
        .request(method.clone(), url)
        .timeout(consts::REQUEST_TIMEOUT)
        .header("Accept", consts::ACCEPT)
        .header("User-Agent", &self.user_agent)
        .bearer_auth(&token.value)
        .json(body)
        .send()
        .await;

      let response = match result {
        Ok(response) => response,
        Err(err) => {
          transient_attempts += 1;
          // A connect failure never reached the server; anything past that
          // (timeout, reset mid-response) may have been applied remotely.
          let unknown_outcome = !err.is_connect();
          // A create is not idempotent, so a request that may already have
          // landed must not be re-sent.
          let retriable = !unknown_outcome || method != Method::POST;
          if !retriable || transient_attempts >= consts::MAX_TRANSIENT_ATTEMPTS {
            return Err(Error::Transient {
              message: format!("{method} {url} failed: {err}"),
              attempts: transient_attempts,
              unknown_outcome,
              source: Some(err),
            });
          }
          warn!(%method, url, attempt = transient_attempts, "transport failure, backing off");
          tokio::time::sleep(backoff_delay(transient_attempts, None)).await;
          continue;
        }
      };

      let status = response.status();
      match status {
        _ if status.is_success() => {
          let raw = response
            .json::<Value>()
            .await
            .map_err(|e| Error::Validation(format!("unexpected check run response shape: {e}")))?;
          return CheckRunResponse::from_value(raw);
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
          if refreshed {
            return Err(Error::Auth(format!(
              "installation token rejected again ({status}) after a fresh exchange"
            )));
          }
          debug!(installation_id, %status, "installation token rejected, refreshing once");
          self.tokens.evict(installation_id).await;
          refreshed = true;
        }
        StatusCode::NOT_FOUND => {
          return Err(Error::NotFound(format!(
            "{method} {url} returned 404: repository or check run does not exist"
          )));
        }
        _ if is_transient(status) => {
          transient_attempts += 1;
          if transient_attempts >= consts::MAX_TRANSIENT_ATTEMPTS {
            return Err(Error::Transient {
              message: format!("{method} {url} returned HTTP {status}"),
              attempts: transient_attempts,
              unknown_outcome: false,
              source: None,
            });
          }
          let hint = retry_after_hint(&response);
          warn!(%method, url, %status, attempt = transient_attempts, "transient response, backing off");
          tokio::time::sleep(backoff_delay(transient_attempts, hint)).await;
        }
        _ => {
          // Any other 4xx means the builder let a bad shape through or the
          // protocol drifted; surface the remote-reported reason.
          let message = remote_message(response).await;
          return Err(Error::Validation(format!("remote rejected the request ({status}): {message}")));
        }
      }
    }
  }
}

/// Compose the User-Agent header value: an optional caller prefix ahead of
/// the tool's own identity.
pub(crate) fn compose_user_agent(prefix: Option<&str>) -> String {
  match prefix {
    Some(prefix) => format!("{prefix} built with {}", consts::USER_AGENT),
    None => consts::USER_AGENT.to_string(),
  }
}

/// 429 and any 5xx are retryable
pub(crate) fn is_transient(status: StatusCode) -> bool {
  status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Exponential backoff for the given (1-based) failed attempt, overridden by
/// a server-provided Retry-After hint when present.
pub(crate) fn backoff_delay(attempt: u32, hint: Option<Duration>) -> Duration {
  hint.unwrap_or_else(|| consts::BACKOFF_BASE * 2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Parse a Retry-After header carrying a delay in seconds.
pub(crate) fn retry_after_hint(response: &Response) -> Option<Duration> {
  response
    .headers()
    .get("Retry-After")
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.trim().parse::<u64>().ok())
    .map(Duration::from_secs)
}

/// Pull the remote error message out of a failure body, falling back to the
/// raw text when it is not the usual `{"message": ...}` shape.
pub(crate) async fn remote_message(response: Response) -> String {
  let body = response.text().await.unwrap_or_default();
  if let Ok(value) = serde_json::from_str::<Value>(&body) {
    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
      return message.to_string();
    }
  }
  body
}
