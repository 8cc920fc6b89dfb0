//! One HTTP exchange with the master or a volume server.
//!
//! Responses from the cluster are JSON, either the expected payload or an error envelope of the
//! form `{"error": "...", "volumeId": "..."}`. [`decode_body`] turns both into a [`Result`].

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use url::Url;
use weedstore_types::Fid;

use crate::{Error, Result};

/// The error envelope used by both the master and the volume servers.
#[derive(Debug, Deserialize)]
struct ClusterFailure {
    #[serde(deserialize_with = "non_empty")]
    error: String,
    #[serde(default, rename = "volumeId", deserialize_with = "volume_id")]
    volume_id: Option<String>,
}

/// A decoded response body: the cluster's error envelope, or the payload.
///
/// The failure variant is tried first. An empty `error` field does not count as a failure.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Failure(ClusterFailure),
    Success(T),
}

fn non_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.is_empty() {
        return Err(D::Error::custom("empty error message"));
    }
    Ok(value)
}

fn volume_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(id)) if !id.is_empty() => Some(id),
        Some(serde_json::Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

impl From<ClusterFailure> for Error {
    fn from(failure: ClusterFailure) -> Self {
        Error::Cluster {
            message: failure.error,
            volume_id: failure.volume_id,
        }
    }
}

/// Decodes a buffered response body received with `status`.
pub(crate) fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    match serde_json::from_slice::<Envelope<T>>(body) {
        Ok(Envelope::Failure(failure)) => Err(failure.into()),
        Ok(Envelope::Success(payload)) if status.is_success() => Ok(payload),
        Err(err) if status.is_success() => Err(err.into()),
        Ok(Envelope::Success(_)) | Err(_) => Err(Error::Status {
            status: status.as_u16(),
            message: String::from_utf8_lossy(body).trim().to_owned(),
        }),
    }
}

/// Converts forwarded headers into a [`HeaderMap`], validating names and values.
pub(crate) fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }
    Ok(map)
}

/// Performs requests against the cluster and normalizes their failures.
///
/// This never retries. Whatever fails is handed to the caller.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    reqwest: reqwest::Client,
}

impl Transport {
    pub(crate) fn new(reqwest: reqwest::Client) -> Self {
        Self { reqwest }
    }

    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.reqwest.request(method, url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.build()?;
        tracing::debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self.reqwest.execute(request).await?;
        tracing::trace!(status = %response.status(), "received response");
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;
        decode_body(status, &body)
    }

    /// Sends a request to the master and decodes the JSON response.
    pub(crate) async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    /// Sends a request that changes the file `fid` on a volume server, such as an upload or a
    /// delete, and decodes the JSON response.
    pub(crate) async fn call_mutation<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fid: &Fid,
    ) -> Result<T> {
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound { fid: fid.clone() });
        }
        Self::decode(response).await
    }

    /// Sends a download request for `fid` and returns the response with its body unread.
    pub(crate) async fn call_binary(&self, request: RequestBuilder, fid: &Fid) -> Result<Response> {
        let response = self.send(request).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound { fid: fid.clone() });
        }
        if status.is_client_error() || status.is_server_error() {
            let body = response.bytes().await?;
            // Error statuses never decode into a payload.
            return Err(match decode_body::<serde_json::Value>(status, &body) {
                Err(err) => err,
                Ok(_) => Error::Status {
                    status: status.as_u16(),
                    message: String::new(),
                },
            });
        }

        Ok(response)
    }
}
