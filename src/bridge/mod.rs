//! stdin/stdout request handling.

pub mod handler;
pub mod types;
