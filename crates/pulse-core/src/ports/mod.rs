//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod gateway;

pub use gateway::{Collection, EntityGateway, Fields, Filter, ListQuery, OrderBy, Record, SortOrder};
