//! Retry and backoff policy for tarball downloads.
//!
//! Classifies curl and HTTP failures (timeouts, throttling, connection
//! drops) and decides exponential backoff so a flaky mirror does not fail
//! the whole build.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
