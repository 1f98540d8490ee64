//! # Pulse Core
//!
//! The domain layer of the feed client: entities, the gateway port, and the
//! optimistic store that mediates every mutation between the UI and the
//! backend. Nothing here knows which backend technology sits behind the port.

pub mod domain;
pub mod error;
pub mod mapping;
pub mod ports;
pub mod store;

pub use error::{DomainError, GatewayError};
pub use store::{OptimisticStore, StoreConfig};
