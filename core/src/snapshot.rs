//! Observable-state projector (component G, spec.md §4.G): folds
//! components B-F into a deterministic snapshot, plus a stable text
//! rendering for an LLM driver.
//!
//! Grounded on `reporting.rs`'s pattern of building a flat, ordered report
//! struct from the model and then rendering it to text in a second pass.

use serde::{Deserialize, Serialize};

use crate::adjacency;
use crate::circulation::{self, HallwayShape};
use crate::config::CoreConfig;
use crate::connectivity;
use crate::constraints::{self, ConstraintReport};
use crate::entities::{OpeningAnchor, OpeningKind};
use crate::error::CoreResult;
use crate::geometry::{describe_relative_position, Aabb, Point};
use crate::ids::Uuid;
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub room_type: String,
    pub center: Point,
    pub dimensions: (f32, f32),
    pub area: f32,
    pub bounds: Aabb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSummary {
    pub id: Uuid,
    pub start: Point,
    pub end: Point,
    pub length: f32,
    pub facing: String,
    pub is_structural: bool,
    pub is_exterior: bool,
    pub height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OpeningLocator {
    Wall(Uuid),
    RoomPair(Uuid, Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningSummary {
    pub id: Uuid,
    pub kind: String,
    pub locator: OpeningLocator,
    pub position: f32,
    pub width: f32,
    pub height: f32,
    pub sill: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Floorplan {
    pub rooms: Vec<RoomSummary>,
    pub walls: Vec<WallSummary>,
    pub openings: Vec<OpeningSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Layout {
    pub total_area: f32,
    pub bounds: Option<Aabb>,
    pub adjacency_strings: Vec<String>,
    pub circulation_strings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionResult {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastAction {
    pub tool: String,
    pub args: String,
    pub result: ActionResult,
    pub message: String,
    pub created: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Context {
    pub project_id: Option<Uuid>,
    pub building_id: Option<Uuid>,
    pub level_id: Option<Uuid>,
    pub unit_system: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub floorplan: Floorplan,
    pub layout: Layout,
    /// Rooms reachable from the entry through the door graph (spec.md §4.D).
    pub reachable_rooms: Vec<Uuid>,
    /// Rooms not reachable from the entry (spec.md §4.D).
    pub orphaned_rooms: Vec<Uuid>,
    pub last_action: Option<LastAction>,
    pub constraints: ConstraintReport,
    pub context: Context,
}

/// Builds the deterministic snapshot for a level (spec.md §4.G). `last_action`
/// is supplied by the command facade, which is the only component that
/// knows what just happened.
pub fn build_snapshot(
    store: &Store,
    level_id: &str,
    config: &CoreConfig,
    last_action: Option<LastAction>,
) -> CoreResult<Snapshot> {
    let level = store.level(level_id)?;
    let building = store.building(&level.building)?;

    let rooms: Vec<RoomSummary> = level
        .rooms
        .iter()
        .filter_map(|id| store.room(id).ok().map(|r| (id.clone(), r)))
        .map(|(id, r)| RoomSummary {
            id,
            name: r.name.clone(),
            room_type: r.room_type.to_string(),
            center: r.center(),
            dimensions: r.dimensions(),
            area: r.area(),
            bounds: r.bounds(),
        })
        .collect();

    let walls: Vec<WallSummary> = level
        .walls
        .iter()
        .filter_map(|id| store.wall(id).ok().map(|w| (id.clone(), w)))
        .map(|(id, w)| WallSummary {
            id,
            start: w.start,
            end: w.end,
            length: w.length(),
            facing: w.direction().to_string(),
            is_structural: true,
            is_exterior: w.is_exterior,
            height: w.height,
        })
        .collect();

    let openings: Vec<OpeningSummary> = store
        .openings_iter()
        .filter(|(_, o)| match &o.anchor {
            OpeningAnchor::Wall(wall_id) => level.walls.contains(wall_id),
            OpeningAnchor::RoomPair(a, b) => level.rooms.contains(a) || level.rooms.contains(b),
        })
        .map(|(id, o)| OpeningSummary {
            id: id.clone(),
            kind: match o.kind {
                OpeningKind::Door => "door".to_string(),
                OpeningKind::Window => "window".to_string(),
                OpeningKind::CasedOpening => "cased_opening".to_string(),
            },
            locator: match &o.anchor {
                OpeningAnchor::Wall(w) => OpeningLocator::Wall(w.clone()),
                OpeningAnchor::RoomPair(a, b) => OpeningLocator::RoomPair(a.clone(), b.clone()),
            },
            position: o.position,
            width: o.width,
            height: o.height,
            sill: o.sill_height,
        })
        .collect();

    let total_area: f32 = rooms.iter().map(|r| r.area).sum();
    let bounds = rooms.iter().map(|r| r.bounds).reduce(Aabb::join);

    let adjacency_strings = adjacency_strings(&rooms);

    let circulation = circulation::build_hallway_network(store, level_id, config)?;
    let circulation_strings = circulation_strings(&circulation);

    let layout = Layout {
        total_area,
        bounds,
        adjacency_strings,
        circulation_strings,
    };

    let mut constraint_report = constraints::check_level(store, level_id, config)?;
    let connectivity_report = connectivity::validate_level(store, level_id, config)?;
    constraint_report.warnings.extend(connectivity_report.warnings.clone());
    for warning in adjacency::scan_level_warnings(store, level_id, config)? {
        constraint_report.warnings.push(warning.message);
    }

    let context = Context {
        project_id: Some(building.project.clone()),
        building_id: Some(level.building.clone()),
        level_id: Some(level_id.to_string()),
        unit_system: "ft".to_string(),
    };

    Ok(Snapshot {
        floorplan: Floorplan { rooms, walls, openings },
        layout,
        reachable_rooms: connectivity_report.reachable,
        orphaned_rooms: connectivity_report.orphans,
        last_action,
        constraints: constraint_report,
        context,
    })
}

/// `"<b> is NORTH of <a>"`-style strings for every pair of rooms sharing a
/// wall (spec.md §4.G); the compound form comes from
/// `describe_relative_position`.
fn adjacency_strings(rooms: &[RoomSummary]) -> Vec<String> {
    let mut out = vec![];
    for i in 0..rooms.len() {
        for j in 0..rooms.len() {
            if i == j {
                continue;
            }
            let a = &rooms[i];
            let b = &rooms[j];
            let dx = b.center.x - a.center.x;
            let dy = b.center.y - a.center.y;
            let direction = describe_relative_position(dx, dy);
            out.push(format!("{} is {} of {}", b.name, direction, a.name));
        }
    }
    out
}

fn circulation_strings(result: &circulation::CirculationResult) -> Vec<String> {
    result
        .segments
        .iter()
        .map(|seg| {
            let shape = match seg.shape {
                HallwayShape::Straight => "straight",
                HallwayShape::LShaped => "L-shaped",
            };
            format!(
                "{} hallway segment, {:.1} ft long, {:.1} ft wide",
                shape, seg.length, seg.width
            )
        })
        .collect()
}

/// Flattens a snapshot into a stable, section-headed prose form for an LLM
/// prompt (spec.md §4.G `formatStateForLLM`).
pub fn format_state_for_llm(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    out.push_str("# Floor Plan\n");
    for room in &snapshot.floorplan.rooms {
        out.push_str(&format!(
            "- {} ({}): {:.0} ft\u{b2}, {:.1}x{:.1} ft\n",
            room.name, room.room_type, room.area, room.dimensions.0, room.dimensions.1
        ));
    }

    out.push_str("\n# Layout\n");
    out.push_str(&format!("Total area: {:.0} ft\u{b2}\n", snapshot.layout.total_area));
    for line in &snapshot.layout.adjacency_strings {
        out.push_str(&format!("- {}\n", line));
    }
    for line in &snapshot.layout.circulation_strings {
        out.push_str(&format!("- {}\n", line));
    }

    out.push_str("\n# Constraints\n");
    for line in &snapshot.constraints.violated {
        out.push_str(&format!("VIOLATED: {}\n", line));
    }
    for line in &snapshot.constraints.warnings {
        out.push_str(&format!("WARNING: {}\n", line));
    }
    for line in &snapshot.constraints.satisfied {
        out.push_str(&format!("OK: {}\n", line));
    }

    if let Some(action) = &snapshot.last_action {
        out.push_str("\n# Last Action\n");
        let result = match action.result {
            ActionResult::Success => "success",
            ActionResult::Error => "error",
        };
        out.push_str(&format!("{} ({}): {}\n", action.tool, result, action.message));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Building, Level, Project, Room, RoomType};

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> crate::geometry::Polygon {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn snapshot_totals_room_area_and_renders_text() {
        let mut store = Store::new();
        let project_id = store.insert_project(Project::default());
        let building_id = store
            .insert_building(
                &project_id,
                Building {
                    name: "Main".into(),
                    project: project_id,
                    levels: vec![],
                    grid: None,
                },
            )
            .unwrap();
        let level_id = store
            .insert_level(
                &building_id,
                Level {
                    name: "L1".into(),
                    building: building_id,
                    elevation: 0.0,
                    floor_to_floor: 10.0,
                    footprint: None,
                    walls: vec![],
                    rooms: vec![],
                },
            )
            .unwrap();
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "living".into(),
                    room_type: RoomType::Living,
                    polygon: rect(0.0, 0.0, 10.0, 10.0),
                    openings: vec![],
                },
            )
            .unwrap();

        let snapshot = build_snapshot(&store, &level_id, &CoreConfig::default(), None).unwrap();
        assert!((snapshot.layout.total_area - 100.0).abs() < 1e-3);

        let text = format_state_for_llm(&snapshot);
        assert!(text.contains("# Floor Plan"));
        assert!(text.contains("living"));
    }
}
