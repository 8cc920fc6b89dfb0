//! # Weedstore Client
//!
//! An async client for a blob cluster made of a master directory service and replicated volume
//! servers. The master assigns file ids and knows where replicas live; the volume servers hold
//! the bytes.
//!
//! Every operation follows the same shape: ask the master (assign or lookup), then talk to one or
//! all volume servers directly.
//!
//! - [`Client::write`] reserves a slot per payload and uploads all payloads concurrently.
//! - [`Client::read`] resolves a fid and streams it from the first replica.
//! - [`Client::remove`] resolves a fid and deletes it from every replica.
//!
//! ## Usage
//!
//! ```no_run
//! use weedstore_client::{Client, ClusterEndpoint, Payload};
//!
//! #[tokio::main]
//! # async fn main() -> weedstore_client::Result<()> {
//!     let client = Client::new(ClusterEndpoint::default())?;
//!
//!     let assignment = client.write_one(Payload::from(&b"Hello, world!"[..])).send().await?;
//!     let payload = client.read(assignment.fid.as_str()).send().await?.payload().await?;
//!     assert_eq!(payload, "Hello, world!");
//!
//!     client.remove(assignment.fid.as_str()).send().await?;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod client;
pub mod config;
mod directory;
mod error;
mod read;
mod remove;
mod transport;
mod write;

pub use weedstore_types::{
    Assignment, ClusterEndpoint, Fid, Location, LookupResult, Scheme, TransferOptions,
    VacuumOptions,
};

pub use client::*;
pub use directory::*;
pub use error::*;
pub use read::*;
pub use remove::*;
pub use write::*;
