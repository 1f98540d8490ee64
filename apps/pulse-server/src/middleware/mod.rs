//! Middleware and cross-cutting HTTP concerns.

pub mod error;
