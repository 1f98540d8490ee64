//! # Pulse Infrastructure
//!
//! Concrete implementations of the gateway port defined in `pulse-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No network client, mock dataset only
//! - `http` - Live feed backend over HTTP/JSON via reqwest

pub mod gateway;

pub use gateway::{GatewayOp, InMemoryGateway};

#[cfg(feature = "http")]
pub use gateway::{HttpGateway, HttpGatewayConfig};
