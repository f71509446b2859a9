//! Core types and constants for link residual classification

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
