//! Shared types and models for the MBG school meal nutrition monitor
//!
//! This crate contains types shared between the backend, the browser (via
//! WASM) and other components of the system. Nothing here does I/O.

pub mod detection;
pub mod models;
pub mod nutrition;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
