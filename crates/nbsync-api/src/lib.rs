// nbsync-api: Async Rust client for the NetBox REST API

pub mod client;
pub mod endpoint;
pub mod error;
pub mod object;
pub mod transport;

pub use client::NetBoxClient;
pub use endpoint::{Endpoint, Query};
pub use error::Error;
pub use object::{Object, id_of, object_id};
pub use transport::{TlsMode, TransportConfig};
