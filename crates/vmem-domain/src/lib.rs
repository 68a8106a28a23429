//! Domain layer for vmem: core types and business rules for the media
//! ingestion pipeline and its vector memory.
//!
//! This crate is pure: entities, value objects, the error type, port traits,
//! pricing tables, and side-effect-free helpers. Infrastructure and provider
//! crates implement the ports; the application crate composes them.

#[macro_use]
pub mod macros;

pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod utils;
pub mod value_objects;

pub use error::{Error, Result};
