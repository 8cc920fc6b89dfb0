//! Shared data model for talking to a blob cluster made of a master directory service and a
//! set of volume servers.
//!
//! The master hands out [`Assignment`]s and resolves file identifiers ([`Fid`]) to replica
//! [`Location`]s. Volume servers hold the bytes. Everything in here is plain data; the network
//! side lives in `weedstore-client`.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod de;

pub mod assignment;
pub mod endpoint;
pub mod fid;
pub mod location;
pub mod options;

pub use assignment::Assignment;
pub use endpoint::{ClusterEndpoint, Scheme};
pub use fid::{Fid, InvalidFidError};
pub use location::{Location, LookupResult};
pub use options::{TransferOptions, VacuumOptions};
