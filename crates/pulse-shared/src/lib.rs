//! # Pulse Shared
//!
//! Types that cross a process boundary: the persisted wire records exchanged
//! with the feed backend, request DTOs sent by the UI, and the response
//! envelopes used on both sides.

pub mod dto;
pub mod record;
pub mod response;

pub use record::{CommentRecord, PostRecord};
pub use response::{ApiResponse, ErrorResponse};
