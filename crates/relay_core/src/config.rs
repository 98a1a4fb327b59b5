//! Per-server connection configuration.
//!
//! Each configured backend game server gets exactly one
//! [`ServerConnectionConfig`], supplied at startup and never mutated.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

fn default_bind_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// Configuration for one backend server connection.
///
/// The relay listens on `bind_host:port` for this server, expects the
/// backend to authenticate with `PASS <password>` and forwards everything it
/// receives to the output channel identified by `channel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConnectionConfig {
    /// Display name of the backend server, used in logs
    pub name: String,

    /// TCP port to listen on
    pub port: u16,

    /// Shared secret the backend must present with `PASS`
    pub password: String,

    /// Opaque identifier of the destination output channel
    pub channel: String,

    /// Log every chunk received from the backend
    #[serde(default)]
    pub debug: bool,

    /// Interface to bind the listener to
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,

    /// Idle read timeout in seconds (0 disables the timeout)
    #[serde(default)]
    pub idle_timeout_secs: u64,
}

impl ServerConnectionConfig {
    /// Creates a configuration listening on all interfaces with no idle
    /// timeout and debug output disabled.
    pub fn new(
        name: impl Into<String>,
        port: u16,
        password: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            port,
            password: password.into(),
            channel: channel.into(),
            debug: false,
            bind_host: default_bind_host(),
            idle_timeout_secs: 0,
        }
    }

    /// The socket address the listener binds to.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_host, self.port)
    }

    /// Idle read timeout, or `None` when connections never time out.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Name used for the connected backend in log lines.
    pub fn client_name(&self) -> String {
        format!("{} Client", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_new() {
        let config = ServerConnectionConfig::new("Arena", 7777, "secret", "123");
        assert_eq!(config.bind_address(), "0.0.0.0:7777".parse().unwrap());
        assert_eq!(config.idle_timeout(), None);
        assert!(!config.debug);
        assert_eq!(config.client_name(), "Arena Client");
    }

    #[test]
    fn test_idle_timeout() {
        let mut config = ServerConnectionConfig::new("Arena", 7777, "secret", "123");
        config.idle_timeout_secs = 90;
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let config: ServerConnectionConfig = serde_json::from_str(
            r#"{"name":"CTF","port":7778,"password":"pw","channel":"987"}"#,
        )
        .unwrap();
        assert_eq!(config.name, "CTF");
        assert_eq!(config.port, 7778);
        assert_eq!(config.bind_host, default_bind_host());
        assert_eq!(config.idle_timeout_secs, 0);
    }
}
