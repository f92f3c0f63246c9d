use std::time::Duration;

use crate::config::RetrySettings;

pub mod auth;
pub mod client;
pub mod paginate;

pub use auth::{authenticate, AccessToken};
pub use client::{EsiClient, Page, ResourceMeta};
pub use paginate::fetch_all;

/// User agent advertised on every upstream request.
pub const USER_AGENT: &str = "eve-industry-cli";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-page retry budget for the pagination engine. Threaded in from
/// configuration rather than read from a global.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt, so `attempts + 1` total tries.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            attempts: settings.attempts,
            delay: Duration::from_secs(settings.delay_secs),
        }
    }
}
