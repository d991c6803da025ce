// src/http.rs
// Shared HTTP client for calls to the assistant and IAM endpoints

use std::time::Duration;

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the shared HTTP client.
///
/// `request_timeout` bounds each whole request; the resolver additionally
/// wraps every remote call in its own timeout so fake clients are bounded too.
pub fn create_shared_client(request_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(request_timeout)
        .connect_timeout(connect_timeout(request_timeout))
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Connecting may never take longer than the whole request is allowed to
fn connect_timeout(request_timeout: Duration) -> Duration {
    CONNECT_TIMEOUT.min(request_timeout)
}
