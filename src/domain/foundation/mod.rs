//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the role relay domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{RoleJobId, SubjectId};
pub use timestamp::Timestamp;
