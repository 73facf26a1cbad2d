//! Circulation synthesizer (component E, spec.md §4.E): the minimum
//! hallway network and the open-plan traffic-path overlays.
//!
//! The MST construction is grounded on `bemodel::bvh`'s style of building
//! a spatial structure incrementally from a distance metric over room
//! centroids; the open-plan flood fill reuses `checks.rs`'s
//! `HashSet`-based visited-set walk.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::adjacency::{self, AdjacencyClass};
use crate::config::CoreConfig;
use crate::connectivity::choose_entry_room;
use crate::entities::{Room, RoomType};
use crate::error::CoreResult;
use crate::geometry::{shared_edge, Aabb, HasSurface, Point, Polygon, Vector};
use crate::ids::Uuid;
use crate::store::Store;

/// A penalty multiplier applied to forbidden-pair MST edge weights so they
/// are only ever chosen when no other path exists (spec.md §4.E).
const FORBIDDEN_PENALTY: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HallwayShape {
    Straight,
    LShaped,
}

#[derive(Debug, Clone)]
pub struct HallwaySegment {
    pub room_a: Uuid,
    pub room_b: Uuid,
    pub shape: HallwayShape,
    pub centerline: Vec<Point>,
    pub polygon: Polygon,
    pub width: f32,
    pub length: f32,
}

#[derive(Debug, Clone, Default)]
pub struct CirculationResult {
    pub segments: Vec<HallwaySegment>,
    pub total_length: f32,
    pub total_area: f32,
    pub junctions: Vec<Point>,
}

/// Point on `aabb`'s boundary, on the face nearest `target`, projected onto
/// that face's dominant axis (spec.md §4.E `connectionPoint`).
fn connection_point(aabb: Aabb, target: Point) -> Point {
    let center = aabb.center();
    let dx = target.x - center.x;
    let dy = target.y - center.y;
    if dy.abs() >= dx.abs() {
        let y = if dy >= 0.0 { aabb.max.y } else { aabb.min.y };
        Point::new(target.x.clamp(aabb.min.x, aabb.max.x), y)
    } else {
        let x = if dx >= 0.0 { aabb.max.x } else { aabb.min.x };
        Point::new(x, target.y.clamp(aabb.min.y, aabb.max.y))
    }
}

fn straight_polygon(from: Point, to: Point, width: f32) -> Polygon {
    let dir = (to - from).normalize();
    let normal = Vector::new(-dir.y, dir.x) * (width / 2.0);
    vec![from - normal, to - normal, to + normal, from + normal]
}

/// Canonical two-leg L-shaped corridor outline (Open Question (b)): two
/// abutting axis-aligned rectangles of `width`, meeting at `corner`, CCW
/// winding. Degenerates to an overlapping hexagon for legs shorter than
/// `width / 2`; this generator targets residential-scale corridors, not a
/// general polygon-clipping kernel.
fn l_shaped_polygon(from: Point, corner: Point, to: Point, width: f32) -> Polygon {
    let hw = width / 2.0;
    let len1 = (corner - from).magnitude();
    let len2 = (to - corner).magnitude();
    let dir1 = (corner - from).normalize();
    let dir2 = (to - corner).normalize();
    let canonical = [
        (-len1, -hw),
        (0.0, -hw),
        (0.0, 0.0),
        (hw, 0.0),
        (hw, len2),
        (-hw, len2),
        (-hw, hw),
        (-len1, hw),
    ];
    canonical
        .iter()
        .map(|&(lx, ly)| corner + dir1 * lx + dir2 * ly)
        .collect()
}

fn polyline_length(points: &[Point]) -> f32 {
    points.windows(2).map(|w| (w[1] - w[0]).magnitude()).sum()
}

/// Direct connection (door/cased opening, no hallway needed) is permitted
/// between any pair whose adjacency class is not `Forbidden`.
fn edge_weight(room_a: &Room, room_b: &Room, config: &CoreConfig) -> f32 {
    let class = adjacency::classify(room_a.room_type, room_b.room_type);
    if !matches!(class, AdjacencyClass::Forbidden) {
        if let Some(edge) = shared_edge(&room_a.bounds(), &room_b.bounds(), config.shared_wall_eps_ft) {
            if edge.length() >= config.default_door_width_ft {
                return 0.0;
            }
        }
    }
    let dist = (room_a.center() - room_b.center()).magnitude();
    if matches!(class, AdjacencyClass::Forbidden) {
        dist * FORBIDDEN_PENALTY
    } else {
        dist
    }
}

/// Builds the minimum hallway network for a level via Prim's algorithm
/// (spec.md §4.E). Rooms connected by a zero-weight edge (direct adjacency)
/// produce no hallway segment.
pub fn build_hallway_network(store: &Store, level_id: &str, config: &CoreConfig) -> CoreResult<CirculationResult> {
    let level = store.level(level_id)?;
    let rooms: HashMap<Uuid, Room> = level
        .rooms
        .iter()
        .filter_map(|id| store.room(id).ok().map(|r| (id.clone(), r.clone())))
        .collect();

    let mut result = CirculationResult::default();
    if rooms.len() < 2 {
        return Ok(result);
    }

    let ordered: indexmap::IndexMap<Uuid, Room> = level
        .rooms
        .iter()
        .filter_map(|id| rooms.get(id).map(|r| (id.clone(), r.clone())))
        .collect();
    let Some(entry) = choose_entry_room(&ordered) else {
        return Ok(result);
    };

    let mut in_tree: HashSet<Uuid> = HashSet::new();
    in_tree.insert(entry.clone());
    let mut remaining: HashSet<Uuid> = rooms.keys().filter(|id| **id != entry).cloned().collect();

    while !remaining.is_empty() {
        let mut best: Option<(Uuid, Uuid, f32)> = None;
        for a in &in_tree {
            let room_a = &rooms[a];
            for b in &remaining {
                let room_b = &rooms[b];
                let w = edge_weight(room_a, room_b, config);
                if best.as_ref().map_or(true, |(_, _, bw)| w < *bw) {
                    best = Some((a.clone(), b.clone(), w));
                }
            }
        }
        let Some((a, b, weight)) = best else { break };
        remaining.remove(&b);
        in_tree.insert(b.clone());

        if weight <= 0.0 {
            debug!("rooms {a} and {b} connect directly, no hallway segment");
            continue;
        }

        let room_a = &rooms[&a];
        let room_b = &rooms[&b];
        let p_a = connection_point(room_a.bounds(), room_b.center());
        let p_b = connection_point(room_b.bounds(), room_a.center());

        let width = config.hallway_width_ft;
        let aligned_x = (p_a.x - p_b.x).abs() < 1e-3;
        let aligned_y = (p_a.y - p_b.y).abs() < 1e-3;

        let (shape, centerline, polygon) = if aligned_x || aligned_y {
            (HallwayShape::Straight, vec![p_a, p_b], straight_polygon(p_a, p_b, width))
        } else {
            let corner = Point::new(p_b.x, p_a.y);
            (
                HallwayShape::LShaped,
                vec![p_a, corner, p_b],
                l_shaped_polygon(p_a, corner, p_b, width),
            )
        };

        let length = polyline_length(&centerline);
        result.total_length += length;
        result.total_area += polygon.as_slice().area();
        result.segments.push(HallwaySegment {
            room_a: a,
            room_b: b,
            shape,
            centerline,
            polygon,
            width,
            length,
        });
    }

    result.junctions = find_junctions(&result.segments);
    Ok(result)
}

/// Endpoints (or L-shaped corners) shared by three or more segments.
fn find_junctions(segments: &[HallwaySegment]) -> Vec<Point> {
    const EPS: f32 = 0.25;
    let mut counts: Vec<(Point, usize)> = vec![];
    for seg in segments {
        for &p in &seg.centerline {
            if let Some(existing) = counts.iter_mut().find(|(q, _)| (*q - p).magnitude() < EPS) {
                existing.1 += 1;
            } else {
                counts.push((p, 1));
            }
        }
    }
    counts.into_iter().filter(|(_, c)| *c >= 3).map(|(p, _)| p).collect()
}

// ---------------------------------------------------------------------
// Open-plan clusters and traffic paths
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficPathKind {
    PrimaryCirculation,
    KitchenWorkZone,
    EntryZone,
}

#[derive(Debug, Clone)]
pub struct TrafficPath {
    pub kind: TrafficPathKind,
    pub polygon: Polygon,
}

impl TrafficPath {
    pub fn area(&self) -> f32 {
        self.polygon.as_slice().area()
    }
}

#[derive(Debug, Clone)]
pub struct OpenPlanCluster {
    pub rooms: Vec<Uuid>,
    pub bounds: Aabb,
    pub traffic_paths: Vec<TrafficPath>,
}

/// Conservative combined-traffic-area overlap factor when a cluster has
/// more than one traffic path (spec.md §4.E).
const TRAFFIC_OVERLAP_FACTOR: f32 = 0.8;

impl OpenPlanCluster {
    /// Total traffic area, discounted by the overlap factor when multiple
    /// paths share the cluster (they are allowed to overlap by design).
    pub fn traffic_area(&self) -> f32 {
        let sum: f32 = self.traffic_paths.iter().map(TrafficPath::area).sum();
        if self.traffic_paths.len() > 1 {
            sum * TRAFFIC_OVERLAP_FACTOR
        } else {
            sum
        }
    }
}

/// Detects maximal connected components of open-plan-typed rooms on a
/// level (spec.md §4.E), using the configured open-plan adjacency
/// tolerance (Open Question (a), fixed at 1 ft; see SPEC_FULL.md).
pub fn detect_open_plan_clusters(
    store: &Store,
    level_id: &str,
    config: &CoreConfig,
) -> CoreResult<Vec<OpenPlanCluster>> {
    let level = store.level(level_id)?;
    let rooms: indexmap::IndexMap<Uuid, Room> = level
        .rooms
        .iter()
        .filter_map(|id| store.room(id).ok().map(|r| (id.clone(), r.clone())))
        .collect();

    let open_plan: Vec<Uuid> = rooms
        .iter()
        .filter(|(_, r)| adjacency::OPEN_PLAN_TYPES.contains(&r.room_type))
        .map(|(id, _)| id.clone())
        .collect();
    let open_plan_set: HashSet<Uuid> = open_plan.iter().cloned().collect();

    let mut visited: HashSet<Uuid> = HashSet::new();
    let mut clusters = vec![];

    for start in &open_plan {
        if visited.contains(start) {
            continue;
        }
        let mut component = vec![];
        let mut stack = vec![start.clone()];
        visited.insert(start.clone());
        while let Some(current) = stack.pop() {
            component.push(current.clone());
            let current_room = &rooms[&current];
            for other_id in &open_plan {
                if visited.contains(other_id) {
                    continue;
                }
                let other_room = &rooms[other_id];
                if shared_edge(&current_room.bounds(), &other_room.bounds(), config.open_plan_adjacency_eps_ft)
                    .is_some()
                {
                    visited.insert(other_id.clone());
                    stack.push(other_id.clone());
                }
            }
        }

        let bounds = component
            .iter()
            .map(|id| rooms[id].bounds())
            .reduce(Aabb::join)
            .expect("component is non-empty");

        let traffic_paths = build_traffic_paths(&rooms, &component, &open_plan_set, store, bounds, config);

        clusters.push(OpenPlanCluster {
            rooms: component,
            bounds,
            traffic_paths,
        });
    }

    Ok(clusters)
}

/// An entry into the cluster from an adjacent, non-member room.
struct ClusterEntry {
    point: Point,
    is_primary: bool,
}

fn find_cluster_entries(
    rooms: &indexmap::IndexMap<Uuid, Room>,
    component: &[Uuid],
    open_plan_set: &HashSet<Uuid>,
    config: &CoreConfig,
) -> Vec<ClusterEntry> {
    let mut entries = vec![];
    for member_id in component {
        let member = &rooms[member_id];
        for (other_id, other) in rooms {
            if open_plan_set.contains(other_id) || component.contains(other_id) {
                continue;
            }
            let Some(edge) = shared_edge(&member.bounds(), &other.bounds(), config.adjacency_eps_ft) else {
                continue;
            };
            entries.push(ClusterEntry {
                point: edge.midpoint(),
                is_primary: matches!(other.room_type, RoomType::Foyer | RoomType::Hallway),
            });
        }
    }
    entries
}

fn build_traffic_paths(
    rooms: &indexmap::IndexMap<Uuid, Room>,
    component: &[Uuid],
    open_plan_set: &HashSet<Uuid>,
    store: &Store,
    bounds: Aabb,
    config: &CoreConfig,
) -> Vec<TrafficPath> {
    let _ = store;
    let mut paths = vec![];

    let entries = find_cluster_entries(rooms, component, open_plan_set, config);
    let primary = entries.iter().find(|e| e.is_primary).or_else(|| entries.first());
    match primary {
        Some(primary) => {
            let secondary = entries
                .iter()
                .find(|e| (e.point - primary.point).magnitude() > 1e-3 && !std::ptr::eq(*e, primary));
            let target = secondary.map(|s| s.point).unwrap_or_else(|| {
                let center = bounds.center();
                Point::new(2.0 * center.x - primary.point.x, 2.0 * center.y - primary.point.y)
            });
            paths.push(TrafficPath {
                kind: TrafficPathKind::PrimaryCirculation,
                polygon: straight_polygon(primary.point, target, 3.5),
            });
        }
        None => {
            // No externally-facing room borders the cluster (e.g. the whole
            // level is one open-plan space): span the combined AABB's long
            // axis between its two opposite sides instead (spec.md §8 S6).
            let center = bounds.center();
            let (from, to) = if bounds.width() >= bounds.depth() {
                (Point::new(bounds.min.x, center.y), Point::new(bounds.max.x, center.y))
            } else {
                (Point::new(center.x, bounds.min.y), Point::new(center.x, bounds.max.y))
            };
            paths.push(TrafficPath {
                kind: TrafficPathKind::PrimaryCirculation,
                polygon: straight_polygon(from, to, 3.5),
            });
        }
    }

    if let Some((_, kitchen)) = rooms
        .iter()
        .find(|(id, r)| component.contains(id) && r.room_type == RoomType::Kitchen)
    {
        let kb = kitchen.bounds();
        let width = kb.width();
        let depth = kb.depth();
        let zone_length = 0.7 * width.max(depth);
        let zone_depth = 4.0;
        let center = kb.center();
        let polygon = if width >= depth {
            // Long wall runs east-west; zone hugs the south face.
            let half = zone_length / 2.0;
            vec![
                Point::new(center.x - half, kb.min.y),
                Point::new(center.x + half, kb.min.y),
                Point::new(center.x + half, kb.min.y + zone_depth),
                Point::new(center.x - half, kb.min.y + zone_depth),
            ]
        } else {
            let half = zone_length / 2.0;
            vec![
                Point::new(kb.min.x, center.y - half),
                Point::new(kb.min.x + zone_depth, center.y - half),
                Point::new(kb.min.x + zone_depth, center.y + half),
                Point::new(kb.min.x, center.y + half),
            ]
        };
        paths.push(TrafficPath {
            kind: TrafficPathKind::KitchenWorkZone,
            polygon,
        });
    }

    paths
}

/// Builds the 4 ft x `max(1.5 * door_width, 4)` entry landing just inside a
/// door (spec.md §4.E).
pub fn entry_zone_polygon(door_point: Point, inward: Vector, door_width: f32) -> Polygon {
    let depth = (1.5 * door_width).max(4.0);
    let along = Vector::new(-inward.y, inward.x).normalize() * 2.0;
    let into = inward.normalize() * depth;
    vec![
        door_point - along,
        door_point + along,
        door_point + along + into,
        door_point - along + into,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Building, Level, Project};

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Polygon {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

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

    #[test]
    fn fully_open_plan_level_has_no_hallway_segments() {
        let mut store = Store::new();
        let level_id = make_level(&mut store);
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "living".into(),
                    room_type: RoomType::Living,
                    polygon: rect(0.0, 0.0, 20.0, 15.0),
                    openings: vec![],
                },
            )
            .unwrap();
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "kitchen".into(),
                    room_type: RoomType::Kitchen,
                    polygon: rect(20.0, 0.0, 32.0, 10.0),
                    openings: vec![],
                },
            )
            .unwrap();

        let result = build_hallway_network(&store, &level_id, &CoreConfig::default()).unwrap();
        assert!(result.segments.is_empty());
    }

    #[test]
    fn open_plan_cluster_detects_three_rooms_and_kitchen_zone() {
        let mut store = Store::new();
        let level_id = make_level(&mut store);
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "living".into(),
                    room_type: RoomType::Living,
                    polygon: rect(0.0, 0.0, 20.0, 15.0),
                    openings: vec![],
                },
            )
            .unwrap();
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "kitchen".into(),
                    room_type: RoomType::Kitchen,
                    polygon: rect(20.0, 0.0, 32.0, 10.0),
                    openings: vec![],
                },
            )
            .unwrap();
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "dining".into(),
                    room_type: RoomType::Dining,
                    polygon: rect(20.0, 10.0, 32.0, 20.0),
                    openings: vec![],
                },
            )
            .unwrap();

        let clusters = detect_open_plan_clusters(&store, &level_id, &CoreConfig::default()).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].rooms.len(), 3);

        let zone = clusters[0]
            .traffic_paths
            .iter()
            .find(|p| p.kind == TrafficPathKind::KitchenWorkZone)
            .unwrap();
        assert!((zone.area() - (0.7 * 12.0 * 4.0)).abs() < 1e-3);
    }
}
