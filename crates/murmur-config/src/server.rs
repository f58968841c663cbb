use std::net::SocketAddr;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP server binds to, defaults to 0.0.0.0:3000
    pub listen_address: Option<SocketAddr>,
}
