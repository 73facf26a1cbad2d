//! Runtime configuration recognized by the Core (spec.md §6).
//!
//! All fields are optional in spirit — `CoreConfig::default()` reproduces
//! the literal defaults from the spec, and callers override only what they
//! need.

use serde::{Deserialize, Serialize};

/// Hallway width presets (spec.md §6 / §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HallwayWidthPreset {
    Minimum,
    Comfortable,
    Accessible,
    Gallery,
}

impl HallwayWidthPreset {
    pub fn feet(self) -> f32 {
        match self {
            HallwayWidthPreset::Minimum => 3.0,
            HallwayWidthPreset::Comfortable => 3.5,
            HallwayWidthPreset::Accessible => 4.0,
            HallwayWidthPreset::Gallery => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Default hallway width used by the circulation synthesizer (ft).
    pub hallway_width_ft: f32,
    /// Wall thickness used only for derived renderings (ft); the Core's
    /// own polygons are never thickened by this value.
    pub wall_thickness_ft: f32,
    /// Tolerance for shared-wall detection between AABBs (ft).
    pub shared_wall_eps_ft: f32,
    /// Tolerance for general room-adjacency heuristics (ft).
    pub adjacency_eps_ft: f32,
    /// Tolerance for open-plan cluster adjacency (ft). Open Question (a):
    /// fixed at 1 ft, see SPEC_FULL.md §9 and DESIGN.md.
    pub open_plan_adjacency_eps_ft: f32,
    /// Default swing-door width (ft).
    pub default_door_width_ft: f32,
    /// Swing-door width when either side of the pair is a closet (ft).
    pub closet_door_width_ft: f32,
    /// Cased-opening width for open-plan pairs (ft).
    pub cased_opening_width_ft: f32,
    /// Default door/opening height (ft).
    pub default_door_height_ft: f32,
    /// Minimum room dimension enforced by editor-facing operations (ft).
    pub min_room_dimension_ft: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            hallway_width_ft: HallwayWidthPreset::Comfortable.feet(),
            wall_thickness_ft: 0.667,
            shared_wall_eps_ft: 0.5,
            adjacency_eps_ft: 1.5,
            open_plan_adjacency_eps_ft: 1.0,
            default_door_width_ft: 3.0,
            closet_door_width_ft: 2.5,
            cased_opening_width_ft: 4.0,
            default_door_height_ft: 6.67,
            min_room_dimension_ft: 4.0,
        }
    }
}
