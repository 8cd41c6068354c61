//! High-level client API: identity/endpoint bootstrap plus a connected
//! [`UaClient`](client::UaClient).

mod bootstrap;
#[allow(clippy::module_inception)]
mod client;

pub use bootstrap::*;
pub use client::*;
