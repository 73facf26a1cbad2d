//! Constraint checker (component F, spec.md §4.F).
//!
//! Rules read the current level snapshot and emit three disjoint string
//! lists. Grounded on `checks.rs`'s pattern of a flat `Vec<String>` of
//! warning messages accumulated across independent rule passes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::entities::{Room, RoomType};
use crate::error::CoreResult;
use crate::geometry::shared_edge;
use crate::ids::Uuid;
use crate::store::Store;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub satisfied: Vec<String>,
    pub violated: Vec<String>,
    pub warnings: Vec<String>,
}

/// Code-minimum and typical area thresholds per room type, in ft² (spec.md
/// §4.F rule 1-2). Types not listed are not area-constrained.
fn area_thresholds(t: RoomType) -> Option<(f32, f32)> {
    // (minimum, typical_min)
    let m = match t {
        RoomType::Living => (70.0, 150.0),
        RoomType::Kitchen => (50.0, 100.0),
        RoomType::Dining => (100.0, 120.0),
        RoomType::Family => (150.0, 200.0),
        RoomType::Bedroom => (70.0, 110.0),
        RoomType::Bathroom => (35.0, 50.0),
        RoomType::Closet => (16.0, 25.0),
        RoomType::Office => (64.0, 90.0),
        RoomType::Garage => (200.0, 400.0),
        RoomType::Utility | RoomType::Laundry => (35.0, 50.0),
        RoomType::Pantry => (16.0, 25.0),
        RoomType::Mudroom | RoomType::Foyer => (36.0, 60.0),
        RoomType::Patio | RoomType::Deck => (64.0, 120.0),
        _ => return None,
    };
    Some(m)
}

/// The neighbor types a room type expects to be adjacent to, and the ones
/// it should avoid (spec.md §4.F rule 4).
fn adjacency_expectations(t: RoomType) -> (&'static [RoomType], &'static [RoomType]) {
    use RoomType::*;
    match t {
        Kitchen => (&[Living, Dining, Pantry, Family], &[Bedroom, Bathroom]),
        Bedroom => (&[Hallway, Bathroom, Closet], &[Kitchen, Garage]),
        Living => (&[Kitchen, Dining, Family, Foyer], &[Garage]),
        Bathroom => (&[Hallway, Bedroom], &[Kitchen, Dining]),
        _ => (&[], &[]),
    }
}

fn room_pair_adjacent(store: &Store, a: &Uuid, b: &Uuid, config: &CoreConfig) -> bool {
    let (Ok(ra), Ok(rb)) = (store.room(a), store.room(b)) else {
        return false;
    };
    shared_edge(&ra.bounds(), &rb.bounds(), config.adjacency_eps_ft).is_some()
}

/// Runs every constraint rule against a level, returning the satisfied,
/// violated, and warning message lists (spec.md §4.F). Message text is
/// stable across calls for the same input, since tests assert on it.
pub fn check_level(store: &Store, level_id: &str, config: &CoreConfig) -> CoreResult<ConstraintReport> {
    let level = store.level(level_id)?;
    let rooms: Vec<(Uuid, Room)> = level
        .rooms
        .iter()
        .filter_map(|id| store.room(id).ok().map(|r| (id.clone(), r.clone())))
        .collect();

    let mut report = ConstraintReport::default();

    // Rules 1-2: minimum/typical area.
    for (_, room) in &rooms {
        if let Some((minimum, typical_min)) = area_thresholds(room.room_type) {
            let area = room.area();
            if area < minimum {
                report.violated.push(format!(
                    "{} area {:.0} ft\u{b2} is below the {:.0} ft\u{b2} minimum for {}",
                    room.name, area, minimum, room.room_type
                ));
            } else {
                report
                    .satisfied
                    .push(format!("{} meets the minimum area for {}", room.name, room.room_type));
                if area < typical_min {
                    report.warnings.push(format!(
                        "{} area {:.0} ft\u{b2} is below the typical range for {}",
                        room.name, area, room.room_type
                    ));
                }
            }
        }
    }

    // Rule 3: wall-connection tally (endpoint coincidences, eps 0.5 ft).
    let wall_connections = count_wall_connections(store, level_id, config);
    if wall_connections > 0 {
        report
            .satisfied
            .push(format!("{} wall connections found", wall_connections));
    }

    // Rule 4: per-room adjacency expectations.
    for (id, room) in &rooms {
        let (expected, forbidden) = adjacency_expectations(room.room_type);
        if expected.is_empty() && forbidden.is_empty() {
            continue;
        }
        let neighbors: Vec<&Room> = rooms
            .iter()
            .filter(|(other_id, _)| other_id != id)
            .filter(|(other_id, _)| room_pair_adjacent(store, id, other_id, config))
            .map(|(_, r)| r)
            .collect();
        if neighbors.is_empty() {
            continue;
        }
        if !expected.is_empty() && !neighbors.iter().any(|n| expected.contains(&n.room_type)) {
            report.warnings.push(format!(
                "{} should be near {}",
                room.name,
                expected.iter().map(|t| t.to_string()).collect::<Vec<_>>().join("/")
            ));
        }
        if neighbors.iter().any(|n| forbidden.contains(&n.room_type)) {
            report.warnings.push(format!(
                "{} should avoid {}",
                room.name,
                forbidden.iter().map(|t| t.to_string()).collect::<Vec<_>>().join("/")
            ));
        }
    }

    // Rule 5: kitchen-living adjacency.
    let kitchen = rooms.iter().find(|(_, r)| r.room_type == RoomType::Kitchen);
    let living = rooms.iter().find(|(_, r)| r.room_type == RoomType::Living);
    if let (Some((kid, _)), Some((lid, _))) = (kitchen, living) {
        if !room_pair_adjacent(store, kid, lid, config) {
            report
                .warnings
                .push("kitchen and living room exist but are not adjacent".to_string());
        }
    }

    // Rule 6: entry privacy (bathroom directly adjacent to entry on a
    // non-south side).
    if let Some((entry_id, _)) = rooms
        .iter()
        .find(|(_, r)| matches!(r.room_type, RoomType::Foyer | RoomType::Mudroom))
    {
        let entry_room = store.room(entry_id)?;
        for (_, bath) in rooms.iter().filter(|(_, r)| r.room_type == RoomType::Bathroom) {
            if let Some(edge) = shared_edge(&entry_room.bounds(), &bath.bounds(), config.adjacency_eps_ft) {
                if edge.direction != crate::geometry::SharedEdgeDirection::South {
                    report.warnings.push(format!(
                        "{} is directly off the entry, consider relocating for privacy",
                        bath.name
                    ));
                }
            }
        }
    }

    // Rule 7: primary-bedroom ensuite (Open Question (c): substring match
    // on "primary"/"master" in the room name; see SPEC_FULL.md and
    // DESIGN.md for the rationale).
    for (id, room) in &rooms {
        if room.room_type != RoomType::Bedroom {
            continue;
        }
        let lowered = room.name.to_lowercase();
        if !(lowered.contains("primary") || lowered.contains("master")) {
            continue;
        }
        let has_ensuite = rooms
            .iter()
            .filter(|(_, r)| r.room_type == RoomType::Bathroom)
            .any(|(other_id, _)| room_pair_adjacent(store, id, other_id, config));
        if !has_ensuite {
            report
                .warnings
                .push(format!("{} has no adjacent ensuite bathroom", room.name));
        }
    }

    Ok(report)
}

/// Counts wall-endpoint coincidences within `config.shared_wall_eps_ft`
/// (spec.md §4.F rule 3).
fn count_wall_connections(store: &Store, level_id: &str, config: &CoreConfig) -> usize {
    let Ok(level) = store.level(level_id) else {
        return 0;
    };
    let endpoints: Vec<crate::geometry::Point> = level
        .walls
        .iter()
        .filter_map(|id| store.wall(id).ok())
        .flat_map(|w| [w.start, w.end])
        .collect();

    let mut buckets: HashMap<(i32, i32), usize> = HashMap::new();
    let cell = |p: crate::geometry::Point| -> (i32, i32) {
        let s = config.shared_wall_eps_ft.max(1e-3);
        ((p.x / s).round() as i32, (p.y / s).round() as i32)
    };
    for p in &endpoints {
        *buckets.entry(cell(*p)).or_insert(0) += 1;
    }
    buckets.values().filter(|&&n| n >= 2).count()
}
