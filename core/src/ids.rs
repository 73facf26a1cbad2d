//! Opaque entity identifiers.
//!
//! IDs are UUIDs by convention (spec.md §3) represented as owned strings so
//! every entity kind can share the same id type without generic plumbing
//! leaking into the store's public API.

/// An opaque, store-unique identifier.
pub type Uuid = String;

/// Generates a fresh, store-unique id (UUID v4).
pub fn new_id() -> Uuid {
    uuid::Uuid::new_v4().to_string()
}

/// The kind of entity an id refers to, used by the store to report
/// `WrongKind` errors when a caller passes an id of the wrong type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Building,
    Level,
    Footprint,
    Wall,
    Opening,
    Room,
    WallAssembly,
    Grid,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Project => "Project",
            EntityKind::Building => "Building",
            EntityKind::Level => "Level",
            EntityKind::Footprint => "Footprint",
            EntityKind::Wall => "Wall",
            EntityKind::Opening => "Opening",
            EntityKind::Room => "Room",
            EntityKind::WallAssembly => "WallAssembly",
            EntityKind::Grid => "Grid",
        };
        write!(f, "{}", s)
    }
}
