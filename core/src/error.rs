//! Error taxonomy for the Core (spec.md §7).
//!
//! Mutating commands surface one of these and leave the store unchanged.
//! Read-only queries only ever return `NotFound`; an empty-but-valid result
//! (e.g. a level with no rooms) is `Ok(vec![])`, never an error.

use crate::ids::{EntityKind, Uuid};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("entity not found: {0}")]
    NotFound(Uuid),

    #[error("entity {id} is a {actual}, expected a {expected}")]
    WrongKind {
        id: Uuid,
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("duplicate id: {0}")]
    DuplicateId(Uuid),

    #[error("duplicate edge between {0} and {1}")]
    DuplicateEdge(Uuid, Uuid),
}

pub type CoreResult<T> = Result<T, CoreError>;
