//! High-level server API: a [`UaServer`](server::UaServer) built on the
//! transport and session layers.

#[allow(clippy::module_inception)]
mod server;

pub use server::*;
