//! Domain layer for the account service
//!
//! Pure models, the error taxonomy and the repository port. Nothing here
//! performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
