//! Configuration for a [`Client`](crate::Client).
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `WEED__`)
//! 2. YAML configuration file
//! 3. Defaults
//!
//! # Environment Variables
//!
//! Environment variables use `WEED__` as a prefix, for example:
//!
//! - `WEED__SERVER=10.0.0.1` sets the master's host
//! - `WEED__PORT=9333` sets the master's port
//! - `WEED__USE_PUBLIC_URL=true` sends data transfers to public volume server addresses
//! - `WEED__TIMEOUT=5s` sets connect and read timeouts
//!
//! # YAML Configuration File
//!
//! ```yaml
//! server: 10.0.0.1
//! port: 9333
//! scheme: https
//! use_public_url: true
//! timeout: 5s
//! ```

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use weedstore_types::endpoint::{DEFAULT_HOST, DEFAULT_PORT};
use weedstore_types::{ClusterEndpoint, Scheme};

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "WEED__";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host name or IP address of the master.
    ///
    /// # Default
    ///
    /// `127.0.0.1`
    pub server: String,

    /// Port of the master.
    ///
    /// # Default
    ///
    /// `9333`
    pub port: u16,

    /// Scheme used for the master and all volume servers.
    ///
    /// # Default
    ///
    /// `http`
    pub scheme: Scheme,

    /// Whether to send data transfers to the public address of volume servers.
    ///
    /// # Default
    ///
    /// `false`
    pub use_public_url: bool,

    /// Connect and read timeout for each HTTP exchange, such as `5s`.
    ///
    /// # Default
    ///
    /// None
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            scheme: Scheme::default(),
            use_public_url: false,
            timeout: None,
        }
    }
}

impl Config {
    /// Loads configuration from defaults, the optional YAML file at `path`, and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// Returns the master's endpoint.
    pub fn endpoint(&self) -> ClusterEndpoint {
        ClusterEndpoint::new(self.scheme, &self.server, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_master() {
        figment::Jail::expect_with(|_jail| {
            let config = Config::load(None)?;
            assert_eq!(config, Config::default());
            assert_eq!(config.endpoint().to_string(), "http://127.0.0.1:9333");
            Ok(())
        });
    }

    #[test]
    fn configurable_via_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("WEED__SERVER", "10.0.0.1");
            jail.set_env("WEED__PORT", "9444");
            jail.set_env("WEED__SCHEME", "https");
            jail.set_env("WEED__USE_PUBLIC_URL", "true");
            jail.set_env("WEED__TIMEOUT", "2s");

            let config = Config::load(None)?;

            assert_eq!(config.endpoint().to_string(), "https://10.0.0.1:9444");
            assert!(config.use_public_url);
            assert_eq!(config.timeout, Some(Duration::from_secs(2)));
            Ok(())
        });
    }

    #[test]
    fn configurable_via_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "weed.yml",
                r#"
                server: master.internal
                port: 19333
                use_public_url: true
                "#,
            )?;
            jail.set_env("WEED__PORT", "29333");

            let config = Config::load(Some(Path::new("weed.yml")))?;

            assert_eq!(config.server, "master.internal");
            // Environment takes precedence over the file.
            assert_eq!(config.port, 29333);
            assert!(config.use_public_url);
            assert_eq!(config.timeout, None);
            Ok(())
        });
    }
}
