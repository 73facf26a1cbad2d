//! Adjacency & door router (component C, spec.md §4.C).
//!
//! Grounded on `bemodel`'s enum-driven dispatch style (e.g.
//! `model_transmittance.rs`'s matches over `BoundaryType`/`Tilt`) and on
//! `checks.rs`'s `HashSet<Uuid>`-based duplicate/validity bookkeeping —
//! generalized here from "is this id valid" into "have we already routed
//! this unordered pair".

use std::collections::HashSet;

use log::{info, warn};

use crate::config::CoreConfig;
use crate::entities::{OpeningAnchor, OpeningKind, Room, RoomType};
use crate::error::CoreResult;
use crate::geometry::shared_edge;
use crate::ids::Uuid;
use crate::store::Store;

/// How two room types relate under the auto-door policy matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacencyClass {
    OpenPlan,
    AutoConnect,
    Forbidden,
    Unspecified,
}

/// A newly routed opening, pending insertion into the store.
#[derive(Debug, Clone)]
pub struct RoutedOpening {
    pub room1: Uuid,
    pub room2: Uuid,
    pub kind: OpeningKind,
    pub position: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct AdjacencyWarning {
    pub message: String,
    pub room1: Uuid,
    pub room2: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct AdjacencyResult {
    pub openings: Vec<RoutedOpening>,
    pub warnings: Vec<AdjacencyWarning>,
}

pub const OPEN_PLAN_TYPES: &[RoomType] = &[
    RoomType::Living,
    RoomType::Kitchen,
    RoomType::Dining,
    RoomType::Family,
    RoomType::GreatRoom,
];

/// Classifies an unordered pair of room types per spec.md's policy matrix.
/// The matrix is symmetric: the pair is tested both ways.
pub fn classify(a: RoomType, b: RoomType) -> AdjacencyClass {
    use RoomType::*;

    let pair = (a, b);
    let is = |x: RoomType, y: RoomType| pair == (x, y) || pair == (y, x);

    // Open-plan pairs: living-kitchen, living-dining, kitchen-dining,
    // living-family, kitchen-family (and the symmetric great_room variants,
    // since great_room behaves like an additional open-plan room type).
    if OPEN_PLAN_TYPES.contains(&a) && OPEN_PLAN_TYPES.contains(&b) && a != b {
        return AdjacencyClass::OpenPlan;
    }

    // Forbidden pairs.
    if is(Bedroom, Bedroom)
        || is(Bathroom, Kitchen)
        || is(Bathroom, Dining)
        || is(Bedroom, Kitchen)
        || is(Garage, Bedroom)
        || is(Garage, Kitchen)
    {
        return AdjacencyClass::Forbidden;
    }

    // Auto-connect pairs.
    if is(Bedroom, Hallway)
        || is(Bedroom, Closet)
        || is(Bedroom, Bathroom)
        || is(Hallway, Kitchen)
        || is(Hallway, Living)
        || is(Hallway, Dining)
        || is(Hallway, Family)
        || is(Hallway, GreatRoom)
        || is(Hallway, Office)
        || is(Hallway, Bathroom)
        || is(Hallway, Mudroom)
        || is(Hallway, Foyer)
        || is(Mudroom, Garage)
        || is(Kitchen, Pantry)
        || is(Foyer, Living)
        || is(Foyer, Hallway)
        || is(Circulation, Bedroom)
        || is(Circulation, Living)
        || is(Circulation, Kitchen)
    {
        return AdjacencyClass::AutoConnect;
    }

    AdjacencyClass::Unspecified
}

fn human_pair_text(t: RoomType, u: RoomType) -> String {
    if t == u {
        format!("between {}s", plural(t))
    } else {
        format!("between {} and {}", t, u)
    }
}

fn plural(t: RoomType) -> String {
    format!("{}", t)
}

/// Runs shared-wall detection and the door policy for `room_id` against
/// every other room on the same level, returning newly routed openings and
/// warnings. Duplicate suppression is left to the caller (commands.rs),
/// which knows the existing opening set.
pub fn route_for_room(
    store: &Store,
    level_id: &str,
    room_id: &str,
    existing_pairs: &HashSet<(Uuid, Uuid)>,
    config: &CoreConfig,
) -> CoreResult<AdjacencyResult> {
    let room = store.room(room_id)?;
    let room_aabb = room.bounds();

    let mut result = AdjacencyResult::default();

    let others: Vec<(Uuid, &Room)> = store
        .rooms_iter()
        .filter(|(id, r)| id.as_str() != room_id && r.level == level_id)
        .map(|(id, r)| (id.clone(), r))
        .collect();

    for (other_id, other) in others {
        let pair_key = unordered_pair(room_id.to_string(), other_id.clone());
        if existing_pairs.contains(&pair_key) {
            continue;
        }

        let other_aabb = other.bounds();
        let Some(edge) = shared_edge(&room_aabb, &other_aabb, config.shared_wall_eps_ft) else {
            continue;
        };

        let class = classify(room.room_type, other.room_type);
        match class {
            AdjacencyClass::OpenPlan => {
                let width = config.cased_opening_width_ft;
                if edge.length() < width {
                    continue;
                }
                result.openings.push(RoutedOpening {
                    room1: room_id.to_string(),
                    room2: other_id.clone(),
                    kind: OpeningKind::CasedOpening,
                    position: 0.5,
                    width,
                    height: config.default_door_height_ft,
                });
                info!("routed cased opening between {room_id} and {other_id}");
            }
            AdjacencyClass::AutoConnect => {
                let width = if room.room_type == RoomType::Closet || other.room_type == RoomType::Closet {
                    config.closet_door_width_ft
                } else {
                    config.default_door_width_ft
                };
                if edge.length() < width {
                    continue;
                }
                result.openings.push(RoutedOpening {
                    room1: room_id.to_string(),
                    room2: other_id.clone(),
                    kind: OpeningKind::Door,
                    position: 0.5,
                    width,
                    height: config.default_door_height_ft,
                });
                info!("routed door between {room_id} and {other_id}");
            }
            AdjacencyClass::Forbidden => {
                let msg = format!(
                    "Consider adding hallway {}",
                    human_pair_text(room.room_type, other.room_type)
                );
                warn!("{msg}");
                result.warnings.push(AdjacencyWarning {
                    message: msg,
                    room1: room_id.to_string(),
                    room2: other_id.clone(),
                });
            }
            AdjacencyClass::Unspecified => {}
        }
    }

    Ok(result)
}

/// Scans every pair of rooms on a level once and returns the forbidden-pair
/// warnings the current layout would produce, independent of whether an
/// opening was ever routed for it. Used by the snapshot projector, which
/// needs these warnings to survive even when `route_for_room` only ran at
/// creation time for one of the two rooms.
pub fn scan_level_warnings(store: &Store, level_id: &str, config: &CoreConfig) -> CoreResult<Vec<AdjacencyWarning>> {
    let rooms: Vec<(Uuid, &Room)> = store
        .rooms_iter()
        .filter(|(_, r)| r.level == level_id)
        .map(|(id, r)| (id.clone(), r))
        .collect();

    let mut warnings = vec![];
    for i in 0..rooms.len() {
        for j in (i + 1)..rooms.len() {
            let (id_a, room_a) = &rooms[i];
            let (id_b, room_b) = &rooms[j];
            if shared_edge(&room_a.bounds(), &room_b.bounds(), config.shared_wall_eps_ft).is_none() {
                continue;
            }
            if classify(room_a.room_type, room_b.room_type) == AdjacencyClass::Forbidden {
                warnings.push(AdjacencyWarning {
                    message: format!("Consider adding hallway {}", human_pair_text(room_a.room_type, room_b.room_type)),
                    room1: id_a.clone(),
                    room2: id_b.clone(),
                });
            }
        }
    }
    Ok(warnings)
}

fn unordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The midpoint of a shared segment, i.e. where an auto-routed door or
/// cased opening is centered (spec.md §8 property 9).
pub fn door_position_on_edge(edge_from: crate::geometry::Point, edge_to: crate::geometry::Point) -> crate::geometry::Point {
    nalgebra::center(&edge_from, &edge_to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_plan_pair_is_classified() {
        assert_eq!(
            classify(RoomType::Living, RoomType::Kitchen),
            AdjacencyClass::OpenPlan
        );
        assert_eq!(
            classify(RoomType::Kitchen, RoomType::Living),
            AdjacencyClass::OpenPlan
        );
    }

    #[test]
    fn forbidden_pair_is_symmetric() {
        assert_eq!(
            classify(RoomType::Bedroom, RoomType::Bedroom),
            AdjacencyClass::Forbidden
        );
        assert_eq!(
            classify(RoomType::Bathroom, RoomType::Kitchen),
            AdjacencyClass::Forbidden
        );
        assert_eq!(
            classify(RoomType::Kitchen, RoomType::Bathroom),
            AdjacencyClass::Forbidden
        );
    }

    #[test]
    fn auto_connect_bedroom_hallway() {
        assert_eq!(
            classify(RoomType::Bedroom, RoomType::Hallway),
            AdjacencyClass::AutoConnect
        );
    }
}
