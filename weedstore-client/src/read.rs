use std::{fmt, io};

use bytes::BytesMut;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter, DuplexStream};
use tokio_util::io::StreamReader;
use weedstore_types::{Fid, TransferOptions};

use crate::transport::header_map;
use crate::{Client, ClientStream, Error};

/// Destination for [`ReadBuilder::send_to`].
///
/// Besides the body bytes, a sink is told about the response head before any data arrives, and
/// about the error if the read fails at any point. Both hooks do nothing by default.
pub trait ReadSink: AsyncWrite + Unpin + Send {
    /// Called with the status and headers of the volume server's response.
    fn write_head(&mut self, _status: StatusCode, _headers: &HeaderMap) {}

    /// Called once when the read fails, including when the file does not exist.
    fn fail(&mut self, _error: &Error) {}
}

impl ReadSink for Vec<u8> {}

impl ReadSink for tokio::fs::File {}

impl ReadSink for DuplexStream {}

impl<W: AsyncWrite + Unpin + Send> ReadSink for BufWriter<W> {}

/// The result from a successful [`read()`](Client::read) call.
///
/// The body has not been consumed yet and is exposed as a stream.
pub struct ReadResponse {
    /// Status of the volume server's response.
    pub status: StatusCode,
    /// Headers of the volume server's response.
    pub headers: HeaderMap,
    /// The response stream.
    pub stream: ClientStream,
}

impl ReadResponse {
    /// Loads the file fully into memory.
    pub async fn payload(self) -> crate::Result<bytes::Bytes> {
        let bytes: BytesMut = self.stream.try_collect().await?;
        Ok(bytes.freeze())
    }
}

impl fmt::Debug for ReadResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("stream", &format_args!("[Stream]"))
            .finish()
    }
}

impl Client {
    /// Reads the file with the given `fid` from the first replica the master reports.
    ///
    /// Note: Fid validation is deferred to the `send()` call. If the fid is invalid, `send()`
    /// will return an error.
    pub fn read(&self, fid: &str) -> ReadBuilder {
        ReadBuilder {
            client: self.clone(),
            fid: Fid::parse(fid).map_err(Into::into),
            url_suffix: String::new(),
            options: TransferOptions::default(),
        }
    }
}

/// A [`read`](Client::read) request builder.
pub struct ReadBuilder {
    client: Client,
    fid: crate::Result<Fid>,
    url_suffix: String,
    options: TransferOptions,
}

impl fmt::Debug for ReadBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadBuilder")
            .field("client", &self.client)
            .field("fid", &self.fid.as_ref().map(|fid| fid.as_str()))
            .field("url_suffix", &self.url_suffix)
            .field("options", &self.options)
            .finish()
    }
}

impl ReadBuilder {
    /// Restricts the lookup to a named collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.options.collection = Some(collection.into());
        self
    }

    /// Appends a header that is sent to the volume server. It is never sent to the master.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Appends a raw suffix to the file's URL, such as `.jpg` or `?height=200`.
    ///
    /// The suffix is not escaped.
    pub fn url_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.url_suffix = suffix.into();
        self
    }

    /// Overrides whether the download uses the public address of the volume server.
    pub fn use_public_url(mut self, use_public_url: bool) -> Self {
        self.options.use_public_url = Some(use_public_url);
        self
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Sends the read request and returns as soon as the response head has arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The fid is invalid
    /// - The lookup fails, or reports no replica ([`Error::NoVolumeServers`])
    /// - The replica does not have the file ([`Error::NotFound`])
    /// - The replica answers with any other error
    #[tracing::instrument(level = "trace", skip_all, fields(fid = tracing::field::Empty))]
    pub async fn send(self) -> crate::Result<ReadResponse> {
        let fid = self.fid?;
        tracing::Span::current().record("fid", fid.as_str());

        let headers = header_map(&self.options.headers)?;
        let lookup = self.client.locate(&fid, &self.options).await?;
        let Some(location) = lookup.primary() else {
            return Err(Error::NoVolumeServers { fid });
        };

        let path = format!("{fid}{}", self.url_suffix);
        let url = self.client.volume_url(location, &self.options, &path)?;
        let request = self
            .client
            .transport()
            .request(Method::GET, url)
            .headers(headers);

        let response = self.client.transport().call_binary(request, &fid).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let stream = response.bytes_stream().map_err(io::Error::other).boxed();

        Ok(ReadResponse {
            status,
            headers,
            stream,
        })
    }

    /// Sends the read request and streams the body into `sink`.
    ///
    /// Resolves only after the whole body has been copied and the sink has been flushed, not as
    /// soon as the transfer is set up, and returns the number of bytes written. Use
    /// [`send`](Self::send) to get hold of the stream as soon as the response head arrives. Any
    /// error is reported to [`ReadSink::fail`] before it is returned.
    pub async fn send_to<S>(self, sink: &mut S) -> crate::Result<u64>
    where
        S: ReadSink + ?Sized,
    {
        let result = self.copy_into(sink).await;
        if let Err(err) = &result {
            sink.fail(err);
        }
        result
    }

    async fn copy_into<S>(self, sink: &mut S) -> crate::Result<u64>
    where
        S: ReadSink + ?Sized,
    {
        let response = self.send().await?;
        sink.write_head(response.status, &response.headers);

        let mut reader = StreamReader::new(response.stream);
        let copied = tokio::io::copy(&mut reader, sink).await?;
        sink.flush().await?;

        tracing::debug!(bytes = copied, "read into sink");
        Ok(copied)
    }
}
