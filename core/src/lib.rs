//! Floor-plan geometry and constraint core: a hierarchical building model,
//! adjacency/door auto-routing, connectivity validation, circulation
//! synthesis, constraint checking, and an observable-state projector.
//!
//! The crate is a synchronous, single-threaded in-process library (see
//! [`commands::Core`] for the entry point); it has no network protocol, no
//! CLI, and no file format of its own. Collaborators (a chat/LLM driver, a
//! mesh/render component, an interactive editor) consume it by issuing
//! commands and reading back [`snapshot::Snapshot`].

pub mod adjacency;
pub mod circulation;
pub mod commands;
pub mod config;
pub mod connectivity;
pub mod constraints;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod snapshot;
pub mod store;

pub use commands::Core;
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use ids::Uuid;
pub use snapshot::Snapshot;
