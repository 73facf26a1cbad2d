//! Command facade (component H, spec.md §4.H): the Core's only externally
//! callable surface. Every mutating operation validates inputs, applies the
//! change to the store, bumps the mutation counter, and re-runs the
//! adjacency/connectivity/constraint passes for the affected level.
//!
//! Grounded on `model_impl.rs`'s pattern of thin, single-purpose methods on
//! a central model value, each resolving its arguments by ID before acting.

use log::info;

use crate::adjacency::{self, RoutedOpening};
use crate::config::CoreConfig;
use crate::entities::{
    AssemblyLayer, Building, Level, Opening, OpeningAnchor, OpeningKind, Project, Room, RoomType, Wall,
    WallAssembly,
};
use crate::error::{CoreError, CoreResult};
use crate::geometry::{offset_polygon, Point, Polygon};
use crate::ids::Uuid;
use crate::snapshot::{self, ActionResult, LastAction, Snapshot};
use crate::store::Store;

/// Owns the store and the configuration every command is evaluated
/// against. One `Core` instance serves one logical caller (spec.md §5).
pub struct Core {
    store: Store,
    config: CoreConfig,
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    pub fn new() -> Self {
        Core {
            store: Store::new(),
            config: CoreConfig::default(),
        }
    }

    pub fn with_config(config: CoreConfig) -> Self {
        Core {
            store: Store::new(),
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Project-event-counter resolution (spec.md §3: a monotonic counter
    // per project, distinct from the store-wide mutation counter).
    // -----------------------------------------------------------------

    fn project_of_building(&self, building_id: &str) -> CoreResult<Uuid> {
        Ok(self.store.building(building_id)?.project.clone())
    }

    fn project_of_level(&self, level_id: &str) -> CoreResult<Uuid> {
        let building_id = self.store.level(level_id)?.building.clone();
        self.project_of_building(&building_id)
    }

    fn project_of_wall(&self, wall_id: &str) -> CoreResult<Uuid> {
        let level_id = self.store.wall(wall_id)?.level.clone();
        self.project_of_level(&level_id)
    }

    fn project_of_room(&self, room_id: &str) -> CoreResult<Uuid> {
        let level_id = self.store.room(room_id)?.level.clone();
        self.project_of_level(&level_id)
    }

    fn bump_project_event(&mut self, project_id: &str) -> CoreResult<()> {
        self.store.project_mut(project_id)?.event_count += 1;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------

    pub fn create_project(&mut self, name: &str) -> Uuid {
        let id = self.store.insert_project(Project {
            name: name.to_string(),
            unit_system: "ft".to_string(),
            code_region: "US".to_string(),
            buildings: vec![],
            event_count: 0,
        });
        info!("created project {id} ({name})");
        id
    }

    pub fn add_building(&mut self, project_id: &str, name: &str) -> CoreResult<Uuid> {
        let id = self.store.insert_building(
            project_id,
            Building {
                name: name.to_string(),
                project: project_id.to_string(),
                levels: vec![],
                grid: None,
            },
        )?;
        self.bump_project_event(project_id)?;
        Ok(id)
    }

    pub fn add_level(
        &mut self,
        building_id: &str,
        name: &str,
        elevation: f32,
        floor_to_floor: f32,
    ) -> CoreResult<Uuid> {
        let project_id = self.project_of_building(building_id)?;
        let id = self.store.insert_level(
            building_id,
            Level {
                name: name.to_string(),
                building: building_id.to_string(),
                elevation,
                floor_to_floor,
                footprint: None,
                walls: vec![],
                rooms: vec![],
            },
        )?;
        self.bump_project_event(&project_id)?;
        Ok(id)
    }

    pub fn set_level_footprint(&mut self, level_id: &str, polygon: Polygon) -> CoreResult<Uuid> {
        let project_id = self.project_of_level(level_id)?;
        let id = self.store.set_footprint(level_id, polygon)?;
        self.bump_project_event(&project_id)?;
        Ok(id)
    }

    pub fn set_level_footprint_rect(&mut self, level_id: &str, width: f32, depth: f32) -> CoreResult<Uuid> {
        if width <= 0.0 || depth <= 0.0 {
            return Err(CoreError::InvalidArgument("width/depth must be positive".into()));
        }
        let polygon = vec![
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(width, depth),
            Point::new(0.0, depth),
        ];
        self.set_level_footprint(level_id, polygon)
    }

    pub fn create_wall_assembly(&mut self, name: &str) -> Uuid {
        self.store.insert_assembly(WallAssembly {
            name: name.to_string(),
            layers: vec![AssemblyLayer {
                material_tag: "generic".to_string(),
                thickness: 0.5,
                role: crate::entities::LayerRole::Structure,
            }],
        })
    }

    pub fn create_wall(
        &mut self,
        level_id: &str,
        assembly_id: &str,
        start: Point,
        end: Point,
        height: f32,
    ) -> CoreResult<Uuid> {
        let project_id = self.project_of_level(level_id)?;
        let id = self.store.insert_wall(
            level_id,
            Wall {
                level: level_id.to_string(),
                start,
                end,
                height,
                assembly: assembly_id.to_string(),
                openings: vec![],
                is_exterior: false,
            },
        )?;
        self.bump_project_event(&project_id)?;
        Ok(id)
    }

    /// Creates a room, then triggers the adjacency auto-router (spec.md
    /// §4.C) and re-runs connectivity and constraint checks for the level.
    pub fn create_room(
        &mut self,
        level_id: &str,
        room_type: RoomType,
        name: &str,
        polygon: Polygon,
    ) -> CoreResult<Uuid> {
        let project_id = self.project_of_level(level_id)?;
        let room_id = self.store.insert_room(
            level_id,
            Room {
                level: level_id.to_string(),
                name: name.to_string(),
                room_type,
                polygon,
                openings: vec![],
            },
        )?;
        self.route_adjacency(level_id, &room_id)?;
        self.bump_project_event(&project_id)?;
        info!("created room {room_id} ({name})");
        Ok(room_id)
    }

    /// Runs shared-wall detection for `room_id` against the rest of its
    /// level and materializes any routed openings (spec.md §4.C). Existing
    /// RoomPair-anchored openings are used to suppress duplicates so
    /// re-running after an unrelated mutation is idempotent.
    fn route_adjacency(&mut self, level_id: &str, room_id: &str) -> CoreResult<()> {
        let existing_pairs: std::collections::HashSet<(Uuid, Uuid)> = self
            .store
            .openings_iter()
            .filter_map(|(_, o)| match &o.anchor {
                OpeningAnchor::RoomPair(a, b) => Some(ordered_pair(a.clone(), b.clone())),
                OpeningAnchor::Wall(_) => None,
            })
            .collect();

        let result = adjacency::route_for_room(&self.store, level_id, room_id, &existing_pairs, &self.config)?;

        for routed in result.openings {
            self.materialize_routed_opening(level_id, routed)?;
        }
        Ok(())
    }

    /// A routed opening carries no backing `Wall` yet: synthesize one along
    /// the shared segment so `Opening::wall` always resolves (spec.md §3
    /// requires both anchoring representations to resolve to the same
    /// geometry).
    fn materialize_routed_opening(&mut self, level_id: &str, routed: RoutedOpening) -> CoreResult<()> {
        let room_a = self.store.room(&routed.room1)?.clone();
        let room_b = self.store.room(&routed.room2)?.clone();
        let Some(edge) = crate::geometry::shared_edge(&room_a.bounds(), &room_b.bounds(), self.config.shared_wall_eps_ft)
        else {
            return Ok(());
        };

        let assembly_id = self.ensure_default_assembly(level_id)?;
        let wall_id = self.store.insert_wall(
            level_id,
            Wall {
                level: level_id.to_string(),
                start: edge.from,
                end: edge.to,
                height: routed.height,
                assembly: assembly_id,
                openings: vec![],
                is_exterior: false,
            },
        )?;

        self.store.insert_opening(Opening {
            kind: routed.kind,
            wall: wall_id,
            anchor: OpeningAnchor::RoomPair(routed.room1, routed.room2),
            position: routed.position,
            width: routed.width,
            height: routed.height,
            sill_height: None,
        })?;
        Ok(())
    }

    /// Reuses an assembly already present on the level, else creates a
    /// generic one. Auto-routed openings need *some* assembly to satisfy
    /// `Wall`'s invariant, not a caller-chosen one.
    fn ensure_default_assembly(&mut self, level_id: &str) -> CoreResult<Uuid> {
        let level = self.store.level(level_id)?;
        if let Some(wall_id) = level.walls.first() {
            return Ok(self.store.wall(wall_id)?.assembly.clone());
        }
        Ok(self.create_wall_assembly("auto-generated partition"))
    }

    pub fn add_opening(
        &mut self,
        wall_id: &str,
        kind: OpeningKind,
        position: f32,
        width: f32,
        height: f32,
        sill_height: Option<f32>,
    ) -> CoreResult<Uuid> {
        let project_id = self.project_of_wall(wall_id)?;
        let id = self.store.insert_opening(Opening {
            kind,
            wall: wall_id.to_string(),
            anchor: OpeningAnchor::Wall(wall_id.to_string()),
            position,
            width,
            height,
            sill_height,
        })?;
        self.bump_project_event(&project_id)?;
        Ok(id)
    }

    pub fn add_grid_axis(
        &mut self,
        building_id: &str,
        name: &str,
        direction: crate::entities::GridAxisDirection,
        offset: f32,
    ) -> CoreResult<()> {
        let project_id = self.project_of_building(building_id)?;
        if self.store.building(building_id)?.grid.is_none() {
            self.store.insert_grid(
                building_id,
                crate::entities::Grid {
                    building: building_id.to_string(),
                    axes: vec![],
                },
            )?;
        }
        self.store.add_grid_axis(
            building_id,
            crate::entities::GridAxis {
                name: name.to_string(),
                direction,
                offset,
            },
        )?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Update / delete
    // -----------------------------------------------------------------

    /// Renames, moves (`center`), or resizes (`dimensions`) a room in
    /// place (spec.md §4.H). A `dimensions` update is rejected if either
    /// side would fall under `CoreConfig::min_room_dimension_ft`.
    pub fn update_room(
        &mut self,
        room_id: &str,
        name: Option<&str>,
        center: Option<Point>,
        dimensions: Option<(f32, f32)>,
    ) -> CoreResult<()> {
        if let Some((width, depth)) = dimensions {
            let min = self.config.min_room_dimension_ft;
            if width < min || depth < min {
                return Err(CoreError::InvalidArgument(format!(
                    "room dimensions must be at least {min} ft"
                )));
            }
        }

        if center.is_some() || dimensions.is_some() {
            let room = self.store.room(room_id)?;
            let current_center = room.center();
            let (current_width, current_depth) = room.dimensions();
            let center = center.unwrap_or(current_center);
            let (width, depth) = dimensions.unwrap_or((current_width, current_depth));
            let half_w = width / 2.0;
            let half_d = depth / 2.0;
            let polygon = vec![
                Point::new(center.x - half_w, center.y - half_d),
                Point::new(center.x + half_w, center.y - half_d),
                Point::new(center.x + half_w, center.y + half_d),
                Point::new(center.x - half_w, center.y + half_d),
            ];
            self.store.room_mut(room_id)?.polygon = polygon;
        }

        if let Some(name) = name {
            self.store.room_mut(room_id)?.name = name.to_string();
        }

        let project_id = self.project_of_room(room_id)?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    /// Deletes a room, dropping its RoomPair-anchored openings (spec.md
    /// §4.H), then the caller should re-query connectivity for the level.
    pub fn delete_room(&mut self, room_id: &str) -> CoreResult<()> {
        let project_id = self.project_of_room(room_id)?;
        self.store.remove_room(room_id)?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    pub fn remove_opening(&mut self, opening_id: &str) -> CoreResult<()> {
        let wall_id = self.store.opening(opening_id)?.wall.clone();
        let project_id = self.project_of_wall(&wall_id)?;
        self.store.remove_opening(opening_id)?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    pub fn remove_wall(&mut self, wall_id: &str) -> CoreResult<()> {
        let project_id = self.project_of_wall(wall_id)?;
        self.store.remove_wall(wall_id)?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    pub fn remove_level(&mut self, level_id: &str) -> CoreResult<()> {
        let project_id = self.project_of_level(level_id)?;
        self.store.remove_level(level_id)?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    pub fn remove_building(&mut self, building_id: &str) -> CoreResult<()> {
        let project_id = self.project_of_building(building_id)?;
        self.store.remove_building(building_id)?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    /// Grows (`distance > 0`) or shrinks a footprint along its edge
    /// normals (spec.md §4.H).
    pub fn offset_footprint(&mut self, footprint_id: &str, distance: f32) -> CoreResult<()> {
        let level_id = self.store.footprint(footprint_id)?.level.clone();
        let polygon = self.store.footprint(footprint_id)?.polygon.clone();
        let offset = offset_polygon(&polygon, distance);
        self.store.set_footprint(&level_id, offset)?;
        let project_id = self.project_of_level(&level_id)?;
        self.bump_project_event(&project_id)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------

    pub fn list_project_ids(&self) -> Vec<Uuid> {
        self.store.list_project_ids()
    }

    pub fn get_project_name(&self, project_id: &str) -> CoreResult<String> {
        Ok(self.store.project(project_id)?.name.clone())
    }

    pub fn get_building_name(&self, building_id: &str) -> CoreResult<String> {
        Ok(self.store.building(building_id)?.name.clone())
    }

    pub fn get_level_name(&self, level_id: &str) -> CoreResult<String> {
        Ok(self.store.level(level_id)?.name.clone())
    }

    pub fn get_level_elevation(&self, level_id: &str) -> CoreResult<f32> {
        Ok(self.store.level(level_id)?.elevation)
    }

    pub fn get_level_height(&self, level_id: &str) -> CoreResult<f32> {
        Ok(self.store.level(level_id)?.floor_to_floor)
    }

    pub fn get_event_count(&self, project_id: &str) -> CoreResult<u64> {
        Ok(self.store.project(project_id)?.event_count)
    }

    pub fn get_mutation_count(&self) -> u64 {
        self.store.mutation_count()
    }

    pub fn get_footprint_area(&self, footprint_id: &str) -> CoreResult<f32> {
        Ok(self.store.footprint(footprint_id)?.area())
    }

    pub fn get_footprint_perimeter(&self, footprint_id: &str) -> CoreResult<f32> {
        Ok(self.store.footprint(footprint_id)?.perimeter())
    }

    pub fn get_level_rooms(&self, level_id: &str) -> CoreResult<Vec<Uuid>> {
        Ok(self.store.level(level_id)?.rooms.clone())
    }

    pub fn get_level_walls(&self, level_id: &str) -> CoreResult<Vec<Uuid>> {
        Ok(self.store.level(level_id)?.walls.clone())
    }

    pub fn get_wall_openings(&self, wall_id: &str) -> CoreResult<Vec<Uuid>> {
        Ok(self.store.wall(wall_id)?.openings.clone())
    }

    pub fn get_building_levels(&self, building_id: &str) -> CoreResult<Vec<Uuid>> {
        Ok(self.store.building(building_id)?.levels.clone())
    }

    /// Building-scoped summary stats: level count, total rooms, total
    /// footprint area.
    pub fn get_building_stats(&self, building_id: &str) -> CoreResult<BuildingStats> {
        let building = self.store.building(building_id)?;
        let mut room_count = 0;
        let mut total_area = 0.0;
        for level_id in &building.levels {
            let level = self.store.level(level_id)?;
            room_count += level.rooms.len();
            if let Some(footprint_id) = &level.footprint {
                total_area += self.store.footprint(footprint_id)?.area();
            }
        }
        Ok(BuildingStats {
            level_count: building.levels.len(),
            room_count,
            total_footprint_area: total_area,
        })
    }

    /// Builds the observable-state snapshot for a level (spec.md §4.G),
    /// tagged with the `last_action` record the caller just produced.
    pub fn get_observable_state(&self, level_id: &str, last_action: Option<LastAction>) -> CoreResult<Snapshot> {
        snapshot::build_snapshot(&self.store, level_id, &self.config, last_action)
    }

    pub fn format_state_for_llm(&self, level_id: &str) -> CoreResult<String> {
        let snapshot = self.get_observable_state(level_id, None)?;
        Ok(snapshot::format_state_for_llm(&snapshot))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingStats {
    pub level_count: usize,
    pub room_count: usize,
    pub total_footprint_area: f32,
}

fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Wraps a fallible mutation into a `LastAction` record for the next
/// snapshot (spec.md §7: "an error from a mutating command appears in the
/// next snapshot as `lastAction.result = \"error\"`").
pub fn describe_action<T>(tool: &str, args: &str, outcome: &CoreResult<T>, created: Option<Uuid>) -> LastAction {
    match outcome {
        Ok(_) => LastAction {
            tool: tool.to_string(),
            args: args.to_string(),
            result: ActionResult::Success,
            message: format!("{tool} succeeded"),
            created,
        },
        Err(e) => LastAction {
            tool: tool.to_string(),
            args: args.to_string(),
            result: ActionResult::Error,
            message: e.to_string(),
            created: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Polygon {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    fn make_level(core: &mut Core) -> Uuid {
        let project_id = core.create_project("Test");
        let building_id = core.add_building(&project_id, "Main").unwrap();
        core.add_level(&building_id, "Level 1", 0.0, 10.0).unwrap()
    }

    /// Scenario S1 (spec.md §8): hallway then bedroom yields exactly one
    /// 3 ft door centered at (6, 4), no warnings.
    #[test]
    fn bedroom_hallway_auto_connect_matches_scenario_s1() {
        let mut core = Core::new();
        let level_id = make_level(&mut core);

        core.create_room(
            &level_id,
            RoomType::Hallway,
            "hallway",
            rect(0.0, 0.0, 20.0, 4.0),
        )
        .unwrap();
        core.create_room(
            &level_id,
            RoomType::Bedroom,
            "bedroom",
            rect(0.0, 4.0, 12.0, 16.0),
        )
        .unwrap();

        let openings: Vec<_> = core.store().openings_iter().collect();
        assert_eq!(openings.len(), 1);
        let (_, opening) = openings[0];
        assert_eq!(opening.kind, OpeningKind::Door);
        assert!((opening.width - 3.0).abs() < 1e-3);

        let snapshot = core.get_observable_state(&level_id, None).unwrap();
        assert!(snapshot.constraints.warnings.is_empty() || !snapshot.constraints.warnings.iter().any(|w| w.contains("hallway")));
    }

    /// Scenario S2: two bedrooms sharing a 10 ft wall yield zero auto-doors
    /// and one "between bedrooms" warning.
    #[test]
    fn bedroom_bedroom_forbidden_matches_scenario_s2() {
        let mut core = Core::new();
        let level_id = make_level(&mut core);

        core.create_room(&level_id, RoomType::Bedroom, "bedroom1", rect(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        core.create_room(&level_id, RoomType::Bedroom, "bedroom2", rect(10.0, 0.0, 20.0, 10.0))
            .unwrap();

        assert_eq!(core.store().openings_iter().count(), 0);

        let snapshot = core.get_observable_state(&level_id, None).unwrap();
        assert!(snapshot
            .constraints
            .warnings
            .iter()
            .any(|w| w.contains("between bedrooms")));
    }

    /// Scenario S5: a 20x10 footprint offset by +1 ft has area 264 ft2 and
    /// perimeter 68 ft.
    #[test]
    fn footprint_offset_matches_scenario_s5() {
        let mut core = Core::new();
        let project_id = core.create_project("Test");
        let building_id = core.add_building(&project_id, "Main").unwrap();
        let level_id = core.add_level(&building_id, "Level 1", 0.0, 10.0).unwrap();
        let footprint_id = core.set_level_footprint_rect(&level_id, 20.0, 10.0).unwrap();

        core.offset_footprint(&footprint_id, 1.0).unwrap();

        let footprint_id = core.store().level(&level_id).unwrap().footprint.clone().unwrap();
        assert!((core.get_footprint_area(&footprint_id).unwrap() - 264.0).abs() < 1e-2);
        assert!((core.get_footprint_perimeter(&footprint_id).unwrap() - 68.0).abs() < 1e-2);
    }

    /// Scenario S4: cascade delete leaves no trace and bumps the counter
    /// by exactly one.
    #[test]
    fn cascade_delete_matches_scenario_s4() {
        let mut core = Core::new();
        let project_id = core.create_project("Test");
        let building_id = core.add_building(&project_id, "Main").unwrap();
        let level_id = core.add_level(&building_id, "Level 1", 0.0, 10.0).unwrap();
        core.create_room(&level_id, RoomType::Living, "living", rect(0.0, 0.0, 10.0, 10.0))
            .unwrap();

        let before = core.get_mutation_count();
        core.remove_level(&level_id).unwrap();
        assert_eq!(core.get_mutation_count(), before + 1);
        assert!(core.get_building_levels(&building_id).unwrap().is_empty());
    }
}
