//! Connectivity validator (component D, spec.md §4.D).
//!
//! Grounded on `bemodel::checks`'s BFS-over-adjacency style (the space
//! reachability pass there walks a `HashMap<Uuid, Vec<Uuid>>` adjacency
//! list built from shared boundaries) — generalized here from thermal
//! envelope adjacency to the door graph.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use log::warn;

use crate::config::CoreConfig;
use crate::entities::{OpeningAnchor, OpeningKind, Room, RoomType};
use crate::error::CoreResult;
use crate::geometry::shared_edge;
use crate::ids::Uuid;
use crate::store::Store;

/// Room types preferred as the entry room, in priority order (spec.md §4.D).
const ENTRY_PREFERENCE: &[RoomType] = &[
    RoomType::Foyer,
    RoomType::Mudroom,
    RoomType::Living,
    RoomType::Garage,
];

#[derive(Debug, Clone)]
pub struct RepairSuggestion {
    pub orphan: Uuid,
    pub target: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectivityReport {
    pub entry: Option<Uuid>,
    pub reachable: Vec<Uuid>,
    pub orphans: Vec<Uuid>,
    pub repairs: Vec<RepairSuggestion>,
    pub warnings: Vec<String>,
}

impl ConnectivityReport {
    pub fn is_fully_connected(&self) -> bool {
        self.orphans.is_empty()
    }
}

/// Picks the entry room for a level: the first room (in insertion order)
/// whose type is in `ENTRY_PREFERENCE`'s earliest-matching tier, else the
/// first room in insertion order (spec.md §4.D rule 1, shared with §4.E).
pub fn choose_entry_room(rooms: &IndexMap<Uuid, Room>) -> Option<Uuid> {
    for preferred in ENTRY_PREFERENCE {
        if let Some((id, _)) = rooms.iter().find(|(_, r)| r.room_type == *preferred) {
            return Some(id.clone());
        }
    }
    rooms.keys().next().cloned()
}

/// Builds the undirected room-to-room door graph for a level: an edge
/// exists between two rooms that share a `door` or `cased_opening`.
fn door_graph(store: &Store, room_ids: &[Uuid]) -> IndexMap<Uuid, Vec<Uuid>> {
    let rooms: HashSet<&Uuid> = room_ids.iter().collect();
    let mut graph: IndexMap<Uuid, Vec<Uuid>> = room_ids.iter().map(|id| (id.clone(), vec![])).collect();

    for (_, opening) in store.openings_iter() {
        if !matches!(opening.kind, OpeningKind::Door | OpeningKind::CasedOpening) {
            continue;
        }
        if let OpeningAnchor::RoomPair(a, b) = &opening.anchor {
            if rooms.contains(a) && rooms.contains(b) {
                graph.get_mut(a).unwrap().push(b.clone());
                graph.get_mut(b).unwrap().push(a.clone());
            }
        }
    }
    graph
}

/// Runs breadth-first reachability from the entry room and reports orphans
/// with repair suggestions (spec.md §4.D).
pub fn validate_level(store: &Store, level_id: &str, config: &CoreConfig) -> CoreResult<ConnectivityReport> {
    let level = store.level(level_id)?;
    let room_ids = level.rooms.clone();

    let rooms: IndexMap<Uuid, Room> = room_ids
        .iter()
        .filter_map(|id| store.room(id).ok().map(|r| (id.clone(), r.clone())))
        .collect();

    let mut report = ConnectivityReport::default();
    let Some(entry) = choose_entry_room(&rooms) else {
        return Ok(report);
    };
    report.entry = Some(entry.clone());

    let graph = door_graph(store, &room_ids);

    let mut visited: HashSet<Uuid> = HashSet::new();
    let mut queue: VecDeque<Uuid> = VecDeque::new();
    visited.insert(entry.clone());
    queue.push_back(entry);

    while let Some(current) = queue.pop_front() {
        for neighbor in graph.get(&current).into_iter().flatten() {
            if visited.insert(neighbor.clone()) {
                queue.push_back(neighbor.clone());
            }
        }
    }

    let orphans: Vec<Uuid> = room_ids
        .iter()
        .filter(|id| !visited.contains(*id))
        .cloned()
        .collect();

    for orphan_id in &orphans {
        let Some(orphan) = rooms.get(orphan_id) else { continue };
        let msg = format!("{} has no door connection (orphaned)", orphan.name);
        warn!("{msg}");
        report.warnings.push(msg);

        let orphan_aabb = orphan.bounds();
        let mut best: Option<(Uuid, f32)> = None;
        for reachable_id in &visited {
            let Some(reachable) = rooms.get(reachable_id) else { continue };
            let Some(edge) = shared_edge(&orphan_aabb, &reachable.bounds(), config.shared_wall_eps_ft) else {
                continue;
            };
            if edge.length() >= 3.0 {
                if best.as_ref().map_or(true, |(_, len)| edge.length() > *len) {
                    best = Some((reachable_id.clone(), edge.length()));
                }
            }
        }
        if let Some((target, _)) = best {
            let target_name = rooms.get(&target).map(|r| r.name.clone()).unwrap_or_default();
            report.repairs.push(RepairSuggestion {
                orphan: orphan_id.clone(),
                target: target.clone(),
                message: format!(
                    "{} shares a wall with {} and could connect to it",
                    orphan.name, target_name
                ),
            });
        }
    }

    report.reachable = room_ids.iter().filter(|id| visited.contains(*id)).cloned().collect();
    report.orphans = orphans;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Building, Level, Opening, Project, Room, RoomType};

    fn make_level(store: &mut Store) -> Uuid {
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
        store
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
            .unwrap()
    }

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> crate::geometry::Polygon {
        vec![
            crate::geometry::Point::new(x0, y0),
            crate::geometry::Point::new(x1, y0),
            crate::geometry::Point::new(x1, y1),
            crate::geometry::Point::new(x0, y1),
        ]
    }

    #[test]
    fn orphan_room_is_detected() {
        let mut store = Store::new();
        let level_id = make_level(&mut store);
        let foyer_id = store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "foyer".into(),
                    room_type: RoomType::Foyer,
                    polygon: rect(0.0, 0.0, 8.0, 8.0),
                    openings: vec![],
                },
            )
            .unwrap();
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "bedroom".into(),
                    room_type: RoomType::Bedroom,
                    polygon: rect(20.0, 20.0, 32.0, 32.0),
                    openings: vec![],
                },
            )
            .unwrap();

        let report = validate_level(&store, &level_id, &CoreConfig::default()).unwrap();
        assert_eq!(report.entry, Some(foyer_id.clone()));
        assert_eq!(report.reachable, vec![foyer_id]);
        assert_eq!(report.orphans.len(), 1);
        assert!(report.warnings[0].contains("has no door connection (orphaned)"));
    }

    #[test]
    fn connected_rooms_have_no_orphans() {
        let mut store = Store::new();
        let level_id = make_level(&mut store);
        let a = store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "hallway".into(),
                    room_type: RoomType::Hallway,
                    polygon: rect(0.0, 0.0, 20.0, 4.0),
                    openings: vec![],
                },
            )
            .unwrap();
        let b = store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "bedroom".into(),
                    room_type: RoomType::Bedroom,
                    polygon: rect(0.0, 4.0, 12.0, 16.0),
                    openings: vec![],
                },
            )
            .unwrap();

        // Manufacture the door a command facade would have routed.
        let assembly_id = store.insert_assembly(crate::entities::WallAssembly {
            name: "2x4".into(),
            layers: vec![],
        });
        let wall_id = store
            .insert_wall(
                &level_id,
                crate::entities::Wall {
                    level: level_id.clone(),
                    start: crate::geometry::Point::new(0.0, 4.0),
                    end: crate::geometry::Point::new(12.0, 4.0),
                    height: 8.0,
                    assembly: assembly_id,
                    openings: vec![],
                    is_exterior: false,
                },
            )
            .unwrap();
        store
            .insert_opening(Opening {
                kind: OpeningKind::Door,
                wall: wall_id,
                anchor: OpeningAnchor::RoomPair(a.clone(), b.clone()),
                position: 0.5,
                width: 3.0,
                height: 6.67,
                sill_height: None,
            })
            .unwrap();

        let report = validate_level(&store, &level_id, &CoreConfig::default()).unwrap();
        assert!(report.is_fully_connected());
        assert_eq!(report.orphans.len(), 0);
    }
}
