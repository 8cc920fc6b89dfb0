//! Calls against the master directory service.

use reqwest::Method;
use serde_json::Value;
use weedstore_types::{Assignment, Fid, LookupResult, TransferOptions, VacuumOptions};

use crate::Client;

impl Client {
    /// Reserves one or more file ids on a volume server.
    ///
    /// Most callers want [`Client::write`], which assigns and uploads in one step.
    pub fn assign(&self) -> AssignBuilder {
        AssignBuilder {
            client: self.clone(),
            options: TransferOptions::default(),
        }
    }

    /// Resolves the file with the given `fid` to the replicas currently holding it.
    ///
    /// Note: Fid validation is deferred to the `send()` call. If the fid is invalid, `send()`
    /// will return an error.
    pub fn lookup(&self, fid: &str) -> LookupBuilder {
        LookupBuilder {
            client: self.clone(),
            fid: Fid::parse(fid).map_err(Into::into),
            options: TransferOptions::default(),
        }
    }

    /// Returns the master's topology and volume layout.
    pub async fn system_status(&self) -> crate::Result<Value> {
        self.master_status_at("dir/status").await
    }

    /// Returns the state of the master cluster, such as the current leader.
    pub async fn cluster_status(&self) -> crate::Result<Value> {
        self.master_status_at("cluster/status").await
    }

    /// Returns the status of the master node. Same endpoint as [`cluster_status`](Self::cluster_status).
    pub async fn master_status(&self) -> crate::Result<Value> {
        self.master_status_at("cluster/status").await
    }

    /// Returns the status reported by the volume server at `address` (`host:port`).
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn volume_status(&self, address: &str) -> crate::Result<Value> {
        let url = self.endpoint().volume_url(address, "status")?;
        let request = self.transport().request(Method::GET, url);
        self.transport().call(request).await
    }

    /// Asks the master to compact volumes with enough deleted content.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn vacuum(&self, options: &VacuumOptions) -> crate::Result<Value> {
        let url = self.master_url("vol/vacuum")?;
        let request = self.transport().request(Method::GET, url).query(options);
        self.transport().call(request).await
    }

    #[tracing::instrument(level = "trace", skip(self))]
    async fn master_status_at(&self, path: &str) -> crate::Result<Value> {
        let url = self.master_url(path)?;
        let request = self.transport().request(Method::GET, url);
        self.transport().call(request).await
    }

    /// Requests an assignment. Headers in `options` are never sent to the master.
    #[tracing::instrument(level = "trace", skip_all, fields(count = options.count))]
    pub(crate) async fn assign_with(&self, options: &TransferOptions) -> crate::Result<Assignment> {
        let url = self.master_url("dir/assign")?;
        let request = self
            .transport()
            .request(Method::GET, url)
            .query(&options.assign_query());

        let assignment: Assignment = self.transport().call(request).await?;
        tracing::debug!(fid = %assignment.fid, url = %assignment.url, "assigned");
        Ok(assignment)
    }

    /// Resolves the volume of `fid`. Never cached.
    #[tracing::instrument(level = "trace", skip_all, fields(%fid))]
    pub(crate) async fn locate(
        &self,
        fid: &Fid,
        options: &TransferOptions,
    ) -> crate::Result<LookupResult> {
        let url = self.master_url("dir/lookup")?;
        let request = self
            .transport()
            .request(Method::GET, url)
            .query(&options.lookup_query(fid.volume_id()));

        let result: LookupResult = self.transport().call(request).await?;
        tracing::debug!(replicas = result.locations.len(), "located");
        Ok(result)
    }
}

/// An [`assign`](Client::assign) request builder.
#[derive(Debug)]
pub struct AssignBuilder {
    client: Client,
    options: TransferOptions,
}

impl AssignBuilder {
    /// Sets the number of consecutive slots to reserve. Defaults to 1.
    pub fn count(mut self, count: u32) -> Self {
        self.options.count = Some(count);
        self
    }

    /// Restricts the assignment to a named collection.
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

    /// Replaces all options at once.
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Sends the assign request.
    pub async fn send(self) -> crate::Result<Assignment> {
        self.client.assign_with(&self.options).await
    }
}

/// A [`lookup`](Client::lookup) request builder.
#[derive(Debug)]
pub struct LookupBuilder {
    client: Client,
    fid: crate::Result<Fid>,
    options: TransferOptions,
}

impl LookupBuilder {
    /// Restricts the lookup to a named collection.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.options.collection = Some(collection.into());
        self
    }

    /// Sends the lookup request.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The fid is invalid
    /// - The request fails to send
    /// - The master does not know the volume ([`Error::Cluster`](crate::Error::Cluster), carrying
    ///   the volume id)
    pub async fn send(self) -> crate::Result<LookupResult> {
        let fid = self.fid?;
        self.client.locate(&fid, &self.options).await
    }
}
