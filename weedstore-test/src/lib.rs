//! Test utilities for the weedstore client.
//!
//! This crate provides in-process stand-ins for the cluster the client talks to. See the modules
//! for all available utilities.

pub mod cluster;
pub mod server;
pub mod tracing;
