//! Addressing of the master and the volume servers.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Host of the master when nothing else is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port of the master when nothing else is configured.
pub const DEFAULT_PORT: u16 = 9333;

/// URL scheme used to talk to the cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain `http`.
    #[default]
    Http,
    /// `https`.
    Https,
}

impl Scheme {
    /// Returns the scheme as it appears in a URL.
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of the master directory service.
///
/// This is fixed when a client is constructed. Every request the client builds derives its URL
/// from here, and volume servers are contacted using the same [`Scheme`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterEndpoint {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl ClusterEndpoint {
    /// Creates an endpoint for the master at `host:port`.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// The URL scheme.
    #[inline]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The master's host name or IP address.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The master's port.
    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the root URL of the master, such as `http://127.0.0.1:9333/`.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}://{}:{}/", self.scheme, self.host, self.port))
    }

    /// Returns the URL of `path` on the master.
    pub fn master_url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url()?.join(path.trim_start_matches('/'))
    }

    /// Returns the URL of `path` on the volume server at `address`.
    ///
    /// Volume servers report their address as `host:port`. Addresses that already carry a
    /// scheme are used as they are.
    pub fn volume_url(&self, address: &str, path: &str) -> Result<Url, url::ParseError> {
        let address = address.trim_end_matches('/');
        let base = if address.contains("://") {
            format!("{address}/")
        } else {
            format!("{}://{address}/", self.scheme)
        };
        Url::parse(&base)?.join(path.trim_start_matches('/'))
    }
}

impl Default for ClusterEndpoint {
    fn default() -> Self {
        Self::new(Scheme::Http, DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ClusterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_master() {
        let endpoint = ClusterEndpoint::default();
        assert_eq!(endpoint.base_url().unwrap().as_str(), "http://127.0.0.1:9333/");
        assert_eq!(
            endpoint.master_url("/dir/assign").unwrap().as_str(),
            "http://127.0.0.1:9333/dir/assign"
        );
    }

    #[test]
    fn builds_volume_urls() {
        let endpoint = ClusterEndpoint::new(Scheme::Https, "master", 443);
        assert_eq!(
            endpoint.volume_url("10.0.0.2:8080", "3,01637037d6").unwrap().as_str(),
            "https://10.0.0.2:8080/3,01637037d6"
        );
        assert_eq!(
            endpoint
                .volume_url("http://volume:8080/", "status")
                .unwrap()
                .as_str(),
            "http://volume:8080/status"
        );
    }
}
