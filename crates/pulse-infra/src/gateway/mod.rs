//! Gateway implementations - live HTTP backend and in-memory mock dataset.

mod memory;

pub use memory::{GatewayOp, InMemoryGateway};

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use self::http::{HttpGateway, HttpGatewayConfig};
