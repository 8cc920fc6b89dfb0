use weedstore_types::{Fid, InvalidFidError};

/// Errors that can happen within the weedstore-client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error emitted from the underlying [`reqwest`] client, such as a refused connection, a
    /// failed DNS resolution, or a timeout.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    /// The master or a volume server reported an error in its JSON response.
    #[error("cluster error: {message}")]
    Cluster {
        /// The message reported by the cluster.
        message: String,
        /// The volume the error relates to, if the cluster reported one.
        volume_id: Option<String>,
    },
    /// A volume server does not have the requested file.
    #[error("file '{fid}' not found")]
    NotFound {
        /// The file that was requested.
        fid: Fid,
    },
    /// The master knows the volume but currently reports no replica holding it.
    #[error("no volume servers found for volume {}", .fid.volume_id())]
    NoVolumeServers {
        /// The file that was requested.
        fid: Fid,
    },
    /// A volume server acknowledged a delete without reporting a removed size.
    #[error("file with fid {fid} could not be removed")]
    Removal {
        /// The file that was supposed to be removed.
        fid: Fid,
    },
    /// IO errors related to reading local payloads or writing into a sink.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The given string is not a valid file id.
    #[error(transparent)]
    InvalidFid(#[from] InvalidFidError),
    /// Error when URL manipulation fails.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Invalid header name in the forwarded headers.
    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
    /// Invalid header value in the forwarded headers.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
    /// A write was started without any payload.
    #[error("cannot write an empty batch")]
    EmptyBatch,
    /// The master reserved fewer slots than there are payloads in the batch.
    #[error("master assigned {assigned} slots for a batch of {expected} payloads")]
    CountMismatch {
        /// Number of payloads in the batch.
        expected: usize,
        /// Number of slots the master reserved.
        assigned: u32,
    },
    /// A server answered with an error status and a body that is not a cluster error.
    #[error("unexpected status {status}: {message}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, lossily decoded.
        message: String,
    },
    /// A successful response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if the requested file does not exist on the replica that was asked.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns the volume id reported along with a cluster error, if any.
    pub fn volume_id(&self) -> Option<&str> {
        match self {
            Error::Cluster { volume_id, .. } => volume_id.as_deref(),
            _ => None,
        }
    }
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
