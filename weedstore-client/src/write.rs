use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::future::try_join_all;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use weedstore_types::{Assignment, Fid, Location, TransferOptions};

use crate::transport::header_map;
use crate::{Client, ClientStream, Error};

/// Form field that carries the file contents of an upload.
const FORM_FIELD: &str = "file";

/// Contents of a single file to upload.
pub enum Payload {
    /// A file on the local filesystem, opened when the upload starts.
    File(PathBuf),
    /// An in-memory buffer.
    Buffer(Bytes),
    /// A stream of chunks of unknown total length.
    Stream(ClientStream),
}

impl Payload {
    /// Creates a payload from a file on the local filesystem.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Creates a payload from an [`AsyncRead`].
    pub fn read<R>(body: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::Stream(ReaderStream::new(body).boxed())
    }

    async fn into_part(self) -> crate::Result<Part> {
        let part = match self {
            Payload::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let length = file.metadata().await?.len();
                let body = Body::wrap_stream(ReaderStream::new(file));

                let part = Part::stream_with_length(body, length);
                match path.file_name() {
                    Some(name) => part.file_name(name.to_string_lossy().into_owned()),
                    None => part,
                }
            }
            Payload::Buffer(bytes) => {
                let length = bytes.len() as u64;
                Part::stream_with_length(bytes, length)
            }
            Payload::Stream(stream) => Part::stream(Body::wrap_stream(stream)),
        };
        Ok(part)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::File(path) => f.debug_tuple("File").field(path).finish(),
            Payload::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Payload::Stream(_) => f.debug_tuple("Stream").finish_non_exhaustive(),
        }
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for Payload {
    fn from(path: &Path) -> Self {
        Self::File(path.to_owned())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Buffer(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffer(bytes.into())
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Buffer(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Payload {
    fn from(bytes: &'static [u8; N]) -> Self {
        Self::Buffer(Bytes::from_static(bytes))
    }
}

impl From<ClientStream> for Payload {
    fn from(stream: ClientStream) -> Self {
        Self::Stream(stream)
    }
}

impl Client {
    /// Uploads a batch of files under a single assignment.
    ///
    /// With more than one payload, the files are stored as `<fid>_0`, `<fid>_1`, and so on, in
    /// the order given here. A single payload is stored under the plain fid.
    pub fn write<I>(&self, payloads: I) -> WriteBuilder
    where
        I: IntoIterator,
        I::Item: Into<Payload>,
    {
        WriteBuilder {
            client: self.clone(),
            payloads: payloads.into_iter().map(Into::into).collect(),
            options: TransferOptions::default(),
        }
    }

    /// Uploads a single file.
    pub fn write_one(&self, payload: impl Into<Payload>) -> WriteBuilder {
        self.write([payload.into()])
    }
}

/// A [`write`](Client::write) request builder.
#[derive(Debug)]
pub struct WriteBuilder {
    client: Client,
    payloads: Vec<Payload>,
    options: TransferOptions,
}

impl WriteBuilder {
    /// Stores the files in a named collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.options.collection = Some(collection.into());
        self
    }

    /// Requests a replica placement, such as `001`.
    pub fn replication(mut self, replication: impl Into<String>) -> Self {
        self.options.replication = Some(replication.into());
        self
    }

    /// Requests a time-to-live, such as `3d`.
    pub fn ttl(mut self, ttl: impl Into<String>) -> Self {
        self.options.ttl = Some(ttl.into());
        self
    }

    /// Prefers volume servers in the given data center.
    pub fn data_center(mut self, data_center: impl Into<String>) -> Self {
        self.options.data_center = Some(data_center.into());
        self
    }

    /// Appends a header that is sent along with every upload. It is never sent to the master.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Overrides whether the upload goes to the public address of the volume server.
    pub fn use_public_url(mut self, use_public_url: bool) -> Self {
        self.options.use_public_url = Some(use_public_url);
        self
    }

    /// Replaces all options at once. The batch size always overrides `count`.
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }
}

impl WriteBuilder {
    /// Assigns a slot for every payload and uploads all of them concurrently.
    ///
    /// Returns the assignment once every upload has succeeded.
    ///
    /// # Errors
    ///
    /// Fails as a whole if the assignment or any single upload fails. The first error is
    /// returned and remaining uploads are abandoned. Files that were already uploaded are left
    /// in place.
    #[tracing::instrument(level = "trace", skip_all, fields(count = self.payloads.len()))]
    pub async fn send(self) -> crate::Result<Assignment> {
        let Self {
            client,
            payloads,
            mut options,
        } = self;

        if payloads.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let batch_size = payloads.len();
        options.count = Some(batch_size as u32);

        let headers = header_map(&options.headers)?;
        let assignment = client.assign_with(&options).await?;
        if (assignment.count as usize) < batch_size {
            return Err(Error::CountMismatch {
                expected: batch_size,
                assigned: assignment.count,
            });
        }

        let location = assignment.location();
        let uploads = payloads.into_iter().zip(assignment.slots()).map(|(payload, fid)| {
            upload(&client, &location, &options, headers.clone(), fid, payload)
        });
        try_join_all(uploads).await?;

        tracing::debug!(fid = %assignment.fid, "batch written");
        Ok(assignment)
    }
}

async fn upload(
    client: &Client,
    location: &Location,
    options: &TransferOptions,
    headers: HeaderMap,
    fid: Fid,
    payload: Payload,
) -> crate::Result<()> {
    let url = client.volume_url(location, options, fid.as_str())?;
    let form = Form::new().part(FORM_FIELD, payload.into_part().await?);

    let request = client
        .transport()
        .request(Method::POST, url)
        .headers(headers)
        .multipart(form);

    let _: Value = client.transport().call_mutation(request, &fid).await?;
    tracing::trace!(%fid, "uploaded");
    Ok(())
}
