use std::time::Duration;

use reqwest::Client;

/// HTTP client shared by the credential, catalog, and synthesis paths
///
/// One pool per server instance so concurrent segment calls reuse
/// connections to the vendor.
pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()
        .expect("failed to build HTTP client")
}
