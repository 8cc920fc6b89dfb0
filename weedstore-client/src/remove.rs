use std::fmt;

use futures_util::future::try_join_all;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use weedstore_types::{Fid, Location, TransferOptions};

use crate::transport::header_map;
use crate::{Client, Error};

/// The result from a successful [`remove()`](Client::remove) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveResponse {
    /// Number of replicas the file was deleted from.
    pub count: usize,
}

/// Acknowledgement of a volume server for a delete.
#[derive(Debug, Deserialize)]
struct DeletedFile {
    #[serde(default)]
    size: u64,
}

impl Client {
    /// Deletes the file with the given `fid` from every replica.
    ///
    /// Note: Fid validation is deferred to the `send()` call. If the fid is invalid, `send()`
    /// will return an error.
    pub fn remove(&self, fid: &str) -> RemoveBuilder {
        RemoveBuilder {
            client: self.clone(),
            fid: Fid::parse(fid).map_err(Into::into),
            options: TransferOptions::default(),
        }
    }
}

/// A [`remove`](Client::remove) request builder.
pub struct RemoveBuilder {
    client: Client,
    fid: crate::Result<Fid>,
    options: TransferOptions,
}

impl fmt::Debug for RemoveBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveBuilder")
            .field("client", &self.client)
            .field("fid", &self.fid.as_ref().map(|fid| fid.as_str()))
            .field("options", &self.options)
            .finish()
    }
}

impl RemoveBuilder {
    /// Restricts the lookup to a named collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.options.collection = Some(collection.into());
        self
    }

    /// Appends a header that is sent with every delete. It is never sent to the master.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.headers.insert(name.into(), value.into());
        self
    }

    /// Overrides whether deletes go to the public address of the volume servers.
    pub fn use_public_url(mut self, use_public_url: bool) -> Self {
        self.options.use_public_url = Some(use_public_url);
        self
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Sends a delete to every replica concurrently.
    ///
    /// # Errors
    ///
    /// Fails as a whole if the lookup or any single delete fails. The first error is returned;
    /// replicas that were already cleaned up stay deleted.
    #[tracing::instrument(level = "trace", skip_all, fields(fid = tracing::field::Empty))]
    pub async fn send(self) -> crate::Result<RemoveResponse> {
        let fid = self.fid?;
        tracing::Span::current().record("fid", fid.as_str());

        let headers = header_map(&self.options.headers)?;
        let lookup = self.client.locate(&fid, &self.options).await?;

        let deletes = lookup.locations.iter().map(|location| {
            delete(&self.client, location, &self.options, headers.clone(), &fid)
        });
        try_join_all(deletes).await?;

        let count = lookup.locations.len();
        tracing::debug!(count, "removed");
        Ok(RemoveResponse { count })
    }
}

async fn delete(
    client: &Client,
    location: &Location,
    options: &TransferOptions,
    headers: HeaderMap,
    fid: &Fid,
) -> crate::Result<()> {
    let url = client.volume_url(location, options, fid.as_str())?;
    let request = client
        .transport()
        .request(Method::DELETE, url)
        .headers(headers);

    let deleted: DeletedFile = client.transport().call_mutation(request, fid).await?;
    if deleted.size == 0 {
        return Err(Error::Removal { fid: fid.clone() });
    }
    Ok(())
}
