//! Storage slots handed out by the master.

use serde::{Deserialize, Serialize};

use crate::fid::Fid;
use crate::location::Location;

/// A reservation of one or more file ids on a volume server.
///
/// Returned by the master's assign endpoint. When `count` is larger than one, the slots are
/// addressed as [`Fid::part`] of [`fid`](Self::fid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// The assigned file id.
    pub fid: Fid,
    /// Internal address of the volume server to upload to.
    pub url: String,
    /// Public address of the volume server to upload to.
    #[serde(default)]
    pub public_url: String,
    /// Number of consecutive slots reserved.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

impl Assignment {
    /// Returns the volume server this assignment points at.
    pub fn location(&self) -> Location {
        Location {
            url: self.url.clone(),
            public_url: self.public_url.clone(),
        }
    }

    /// Returns the fid of slot `index`.
    ///
    /// Single-slot assignments use the plain fid, batches use `<fid>_<index>`.
    pub fn slot(&self, index: usize) -> Fid {
        if self.count <= 1 {
            self.fid.clone()
        } else {
            self.fid.part(index)
        }
    }

    /// Returns the fids of all reserved slots, in order.
    pub fn slots(&self) -> impl Iterator<Item = Fid> + '_ {
        (0..self.count.max(1) as usize).map(|index| self.slot(index))
    }
}
