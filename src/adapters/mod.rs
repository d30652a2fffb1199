//! Adapters implementing the domain ports.
//!
//! - `sqlite`: the persistent outcome store and arm repository
//! - `cache`: TTL read-through decorator for arm statistics

pub mod cache;
pub mod sqlite;
