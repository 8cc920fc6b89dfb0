use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use url::Url;
use weedstore_types::{ClusterEndpoint, Location, TransferOptions};

use crate::config::Config;
use crate::transport::Transport;

/// The type of [`Stream`](futures_util::Stream) used for streaming uploads and downloads.
pub type ClientStream = BoxStream<'static, io::Result<Bytes>>;

const USER_AGENT: &str = concat!("weedstore-client/", env!("CARGO_PKG_VERSION"));

/// Builder to create a [`Client`].
#[must_use]
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: ClusterEndpoint,
    use_public_url: bool,
    reqwest_builder: reqwest::ClientBuilder,
}

impl ClientBuilder {
    /// Creates a new [`ClientBuilder`] for the master at `endpoint`.
    pub fn new(endpoint: ClusterEndpoint) -> Self {
        // No default timeouts, deadlines are applied by the caller per operation.
        let reqwest_builder = reqwest::Client::builder().user_agent(USER_AGENT);

        Self {
            endpoint,
            use_public_url: false,
            reqwest_builder,
        }
    }

    /// Changes whether data transfers use the public address of volume servers instead of their
    /// internal one.
    ///
    /// This only affects volume servers. The master is always reached through the configured
    /// endpoint. Individual calls can override this through [`TransferOptions::use_public_url`].
    pub fn use_public_url(mut self, use_public_url: bool) -> Self {
        self.use_public_url = use_public_url;
        self
    }

    /// Sets both the connect and the read timeout for the [`reqwest::Client`].
    /// For more fine-grained configuration, use [`Self::configure_reqwest`].
    pub fn timeout(self, timeout: Duration) -> Self {
        self.configure_reqwest(|builder| builder.connect_timeout(timeout).read_timeout(timeout))
    }

    /// Calls the closure with the underlying [`reqwest::ClientBuilder`].
    pub fn configure_reqwest<F>(mut self, closure: F) -> Self
    where
        F: FnOnce(reqwest::ClientBuilder) -> reqwest::ClientBuilder,
    {
        self.reqwest_builder = closure(self.reqwest_builder);
        self
    }

    /// Returns a [`Client`] that uses this [`ClientBuilder`] configuration.
    ///
    /// # Errors
    ///
    /// This method fails if the [`reqwest::Client`] fails to build. Refer to
    /// [`reqwest::ClientBuilder::build`] for more information on when this can happen.
    pub fn build(self) -> crate::Result<Client> {
        let reqwest = self.reqwest_builder.build()?;
        Ok(Client {
            inner: Arc::new(ClientInner {
                transport: Transport::new(reqwest),
                endpoint: self.endpoint,
                use_public_url: self.use_public_url,
            }),
        })
    }
}

#[derive(Debug)]
pub(crate) struct ClientInner {
    transport: Transport,
    endpoint: ClusterEndpoint,
    use_public_url: bool,
}

/// A client for the cluster. Use [`Client::builder`] to configure and construct this.
///
/// The client only holds immutable configuration and a connection pool. It is cheap to clone and
/// can be shared across any number of concurrent operations.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client for the master at `endpoint` with default settings.
    pub fn new(endpoint: ClusterEndpoint) -> crate::Result<Self> {
        Self::builder(endpoint).build()
    }

    /// Convenience function to create a [`ClientBuilder`].
    pub fn builder(endpoint: ClusterEndpoint) -> ClientBuilder {
        ClientBuilder::new(endpoint)
    }

    /// Creates a client from a loaded [`Config`].
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let mut builder = Self::builder(config.endpoint()).use_public_url(config.use_public_url);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// The master this client talks to.
    #[inline]
    pub fn endpoint(&self) -> &ClusterEndpoint {
        &self.inner.endpoint
    }

    #[inline]
    pub(crate) fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub(crate) fn master_url(&self, path: &str) -> crate::Result<Url> {
        Ok(self.inner.endpoint.master_url(path)?)
    }

    /// Returns the URL of `path` on the replica at `location`, honoring the public URL setting.
    pub(crate) fn volume_url(
        &self,
        location: &Location,
        options: &TransferOptions,
        path: &str,
    ) -> crate::Result<Url> {
        let use_public_url = options.use_public_url.unwrap_or(self.inner.use_public_url);
        let address = location.address(use_public_url);
        Ok(self.inner.endpoint.volume_url(address, path)?)
    }
}
