//! Domain layer for the strategist decision core
//!
//! This module contains the data model, the shared numeric helpers and the
//! port traits the adapters implement.

pub mod errors;
pub mod models;
pub mod ports;
pub mod stats;

pub use errors::{DomainError, DomainResult};
