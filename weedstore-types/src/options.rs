//! Per-call options and their query-string encodings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Options that apply to a single assign, write, read, or remove call.
///
/// Only a subset is meaningful for each call. Assignment-related fields go to the master;
/// [`headers`](Self::headers) only ever go to volume servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOptions {
    /// Restricts assignment and lookup to a named collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Replica placement requested on assignment, such as `001`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication: Option<String>,

    /// Time-to-live requested on assignment, such as `3d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// Preferred data center for the assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_center: Option<String>,

    /// Number of files in the batch. Writers overwrite this with the actual batch size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// Extra HTTP headers forwarded to volume servers, for example an authorization token.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Overrides the client's choice between public and internal volume server addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_public_url: Option<bool>,
}

/// Query parameters of the master's assign endpoint.
///
/// Deliberately excludes headers, which must never reach the master.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignQuery<'a> {
    /// Number of slots to reserve.
    pub count: u32,
    /// See [`TransferOptions::collection`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<&'a str>,
    /// See [`TransferOptions::replication`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<&'a str>,
    /// See [`TransferOptions::ttl`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<&'a str>,
    /// See [`TransferOptions::data_center`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_center: Option<&'a str>,
}

/// Query parameters of the master's lookup endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery<'a> {
    /// The volume to resolve.
    pub volume_id: &'a str,
    /// See [`TransferOptions::collection`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<&'a str>,
}

impl TransferOptions {
    /// Returns the query for an assign call. `count` defaults to 1.
    pub fn assign_query(&self) -> AssignQuery<'_> {
        AssignQuery {
            count: self.count.unwrap_or(1),
            collection: self.collection.as_deref(),
            replication: self.replication.as_deref(),
            ttl: self.ttl.as_deref(),
            data_center: self.data_center.as_deref(),
        }
    }

    /// Returns the query for a lookup of `volume_id`.
    pub fn lookup_query<'a>(&'a self, volume_id: &'a str) -> LookupQuery<'a> {
        LookupQuery {
            volume_id,
            collection: self.collection.as_deref(),
        }
    }
}

/// Options for triggering garbage collection on the master.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacuumOptions {
    /// Minimum ratio of deleted content before a volume is compacted, such as `0.3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garbage_threshold: Option<f64>,

    /// Restricts compaction to a named collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}
