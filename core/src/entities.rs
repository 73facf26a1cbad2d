//! The tagged-variant-per-kind entity types that make up the building
//! model (spec.md §3). Each kind is stored in its own arena by the store
//! (`store.rs`); entities here only hold data and lightweight derived
//! accessors, never mutate siblings directly.

use serde::{Deserialize, Serialize};

use crate::geometry::{Aabb, HasSurface, Point, Polygon};
use crate::ids::Uuid;

/// Enumerated room-type label controlling adjacency and circulation policy
/// (GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Living,
    Kitchen,
    Dining,
    Family,
    GreatRoom,
    Bedroom,
    Bathroom,
    Closet,
    Office,
    Hallway,
    Circulation,
    Foyer,
    Mudroom,
    Garage,
    Utility,
    Laundry,
    Pantry,
    Patio,
    Deck,
    Stair,
    Landing,
    Other,
}

impl std::fmt::Display for RoomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RoomType::Living => "living",
            RoomType::Kitchen => "kitchen",
            RoomType::Dining => "dining",
            RoomType::Family => "family",
            RoomType::GreatRoom => "great_room",
            RoomType::Bedroom => "bedroom",
            RoomType::Bathroom => "bathroom",
            RoomType::Closet => "closet",
            RoomType::Office => "office",
            RoomType::Hallway => "hallway",
            RoomType::Circulation => "circulation",
            RoomType::Foyer => "foyer",
            RoomType::Mudroom => "mudroom",
            RoomType::Garage => "garage",
            RoomType::Utility => "utility",
            RoomType::Laundry => "laundry",
            RoomType::Pantry => "pantry",
            RoomType::Patio => "patio",
            RoomType::Deck => "deck",
            RoomType::Stair => "stair",
            RoomType::Landing => "landing",
            RoomType::Other => "other",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub unit_system: String,
    pub code_region: String,
    pub buildings: Vec<Uuid>,
    /// Monotonic per-project event counter (spec.md §3), separate from the
    /// store-wide mutation counter.
    pub event_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Building {
    pub name: String,
    pub project: Uuid,
    pub levels: Vec<Uuid>,
    pub grid: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    pub building: Uuid,
    /// Elevation above datum (ft).
    pub elevation: f32,
    pub floor_to_floor: f32,
    pub footprint: Option<Uuid>,
    pub walls: Vec<Uuid>,
    pub rooms: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footprint {
    pub level: Uuid,
    pub polygon: Polygon,
}

impl Footprint {
    pub fn area(&self) -> f32 {
        self.polygon.area()
    }

    pub fn perimeter(&self) -> f32 {
        self.polygon.perimeter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallAssembly {
    pub name: String,
    pub layers: Vec<AssemblyLayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyLayer {
    pub material_tag: String,
    pub thickness: f32,
    pub role: LayerRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    Structure,
    Sheathing,
    Insulation,
    Finish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    pub level: Uuid,
    pub start: Point,
    pub end: Point,
    pub height: f32,
    pub assembly: Uuid,
    pub openings: Vec<Uuid>,
    /// Whether this wall is part of the level's exterior footprint, versus
    /// an interior partition. Derived at creation time by the command
    /// facade (commands.rs), since it depends on whether a footprint edge
    /// coincides with the wall.
    pub is_exterior: bool,
}

impl Wall {
    pub fn length(&self) -> f32 {
        (self.end - self.start).magnitude()
    }

    pub fn direction(&self) -> crate::geometry::Cardinal {
        let d = self.end - self.start;
        crate::geometry::vector_to_cardinal(d.x, d.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpeningKind {
    Door,
    Window,
    CasedOpening,
}

/// Either anchoring representation for an opening; both must resolve to
/// the same geometry (spec.md §3 invariant on Opening).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OpeningAnchor {
    Wall(Uuid),
    RoomPair(Uuid, Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opening {
    pub kind: OpeningKind,
    pub wall: Uuid,
    pub anchor: OpeningAnchor,
    /// Position along the wall, in [0, 1].
    pub position: f32,
    pub width: f32,
    pub height: f32,
    /// Window sill height; `None` for doors and cased openings.
    pub sill_height: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub level: Uuid,
    pub name: String,
    pub room_type: RoomType,
    pub polygon: Polygon,
    pub openings: Vec<Uuid>,
}

impl Room {
    pub fn area(&self) -> f32 {
        self.polygon.area()
    }

    pub fn center(&self) -> Point {
        self.polygon.centroid()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::of_polygon(&self.polygon)
    }

    /// `{width, depth}` extent of the room's axis-aligned bounds.
    pub fn dimensions(&self) -> (f32, f32) {
        let b = self.bounds();
        (b.width(), b.depth())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridAxisDirection {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grid {
    pub building: Uuid,
    pub axes: Vec<GridAxis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridAxis {
    pub name: String,
    pub direction: GridAxisDirection,
    pub offset: f32,
}
