//! Constants for the checkin-gh client

use std::time::Duration;

/// Base URL for the official SaaS GitHub API
pub const API_BASE_URL: &str = "https://api.github.com";

/// Default User-Agent header value identifying the tool and its version
pub const USER_AGENT: &str = concat!(
  "checkin-gh/",
  env!("CARGO_PKG_VERSION"),
  " (+https://github.com/eddieland/checkin-gh)"
);

/// Accept header value selecting the Checks API content negotiation
pub const ACCEPT: &str = "application/vnd.github.antiope-preview+json";

/// Per-request timeout applied to both the token exchange and check run calls
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Total attempts allowed for a transient failure (5xx, 429, transport)
pub const MAX_TRANSIENT_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles on each subsequent transient attempt
pub const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Seconds shaved off a token's server-side expiry so a token is never handed
/// out moments before it lapses mid-request
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 30;
