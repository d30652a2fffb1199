//! Application layer: wires adapters and services into the caller-facing
//! decision core.

pub mod decision_core;

pub use decision_core::DecisionCore;
