//! Replica locations as reported by the master's lookup endpoint.

use serde::{Deserialize, Serialize};

use crate::de;

/// A volume server holding a replica of some volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// The address used inside the cluster, as `host:port`.
    pub url: String,
    /// The address advertised to clients outside the cluster.
    #[serde(default)]
    pub public_url: String,
}

impl Location {
    /// Returns the address to use for data transfers.
    ///
    /// Falls back to the internal address if no public one is advertised.
    pub fn address(&self, use_public_url: bool) -> &str {
        if use_public_url && !self.public_url.is_empty() {
            &self.public_url
        } else {
            &self.url
        }
    }
}

/// The result of resolving a volume id at the master.
///
/// Lookups are never cached, so this always reflects the cluster's view at the time of the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    /// The volume that was resolved.
    #[serde(deserialize_with = "de::string_or_number")]
    pub volume_id: String,
    /// All replicas currently holding the volume, in no guaranteed order.
    ///
    /// An empty list means the volume exists but has no available replica right now.
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub locations: Vec<Location>,
}

impl LookupResult {
    /// Returns the replica that reads are directed to.
    pub fn primary(&self) -> Option<&Location> {
        self.locations.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lookup_response() {
        let json = r#"{
            "volumeId": "3",
            "locations": [
                {"url": "127.0.0.1:8080", "publicUrl": "volume-a.example.com"},
                {"url": "127.0.0.1:8081", "publicUrl": "volume-b.example.com"}
            ]
        }"#;
        let result: LookupResult = serde_json::from_str(json).unwrap();

        assert_eq!(result.volume_id, "3");
        assert_eq!(result.locations.len(), 2);

        let primary = result.primary().unwrap();
        assert_eq!(primary.address(false), "127.0.0.1:8080");
        assert_eq!(primary.address(true), "volume-a.example.com");
    }

    #[test]
    fn tolerates_numeric_ids_and_null_locations() {
        let result: LookupResult =
            serde_json::from_str(r#"{"volumeId": 3, "locations": null}"#).unwrap();
        assert_eq!(result.volume_id, "3");
        assert!(result.primary().is_none());
    }

    #[test]
    fn falls_back_to_internal_address() {
        let location = Location {
            url: "10.0.0.1:8080".into(),
            public_url: String::new(),
        };
        assert_eq!(location.address(true), "10.0.0.1:8080");
    }
}
