//! Link input validation and the error taxonomy

pub mod error;
pub mod rules;

pub use error::{FatalError, LinkError, Recovery, ValidationError};
pub use rules::{LinkValidator, ValidationConfig};
