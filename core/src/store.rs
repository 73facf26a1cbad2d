//! The entity store (component B, spec.md §4.B): typed, ID-addressed
//! arenas for every entity kind, with cascading delete and a monotonic
//! mutation counter that is the sole cache key for derived projections.
//!
//! Re-architected per REDESIGN FLAGS (spec.md §9) away from the teacher's
//! flat `Vec<Space>`/`Vec<Wall>` container (`bemodel::Model`) into
//! per-kind `IndexMap` arenas keyed by id — insertion order is preserved
//! (needed for "first room in insertion order" fallbacks in §4.D/§4.E),
//! and lookups are O(1) instead of `bemodel`'s linear `iter().find()`.

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::entities::{
    Building, Footprint, Grid, Level, Opening, OpeningAnchor, Project, Room, Wall, WallAssembly,
};
use crate::error::{CoreError, CoreResult};
use crate::ids::{new_id, EntityKind, Uuid};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    projects: IndexMap<Uuid, Project>,
    buildings: IndexMap<Uuid, Building>,
    levels: IndexMap<Uuid, Level>,
    footprints: IndexMap<Uuid, Footprint>,
    walls: IndexMap<Uuid, Wall>,
    openings: IndexMap<Uuid, Opening>,
    rooms: IndexMap<Uuid, Room>,
    assemblies: IndexMap<Uuid, WallAssembly>,
    grids: IndexMap<Uuid, Grid>,
    /// Bumped on every structural mutation (spec.md invariant 5). The sole
    /// external-visible clock (spec.md §5).
    mutation_count: u64,
}

/// Generates the boilerplate accessor methods for one entity arena:
/// `{name}(id)`, `{name}_mut(id)`, `{name}s()` iterator, and insertion.
macro_rules! arena_accessors {
    ($field:ident, $ty:ty, $kind:expr, $get:ident, $get_mut:ident, $iter:ident) => {
        pub fn $get(&self, id: &str) -> CoreResult<&$ty> {
            self.$field.get(id).ok_or_else(|| CoreError::NotFound(id.to_string()))
        }

        pub fn $get_mut(&mut self, id: &str) -> CoreResult<&mut $ty> {
            self.$field
                .get_mut(id)
                .ok_or_else(|| CoreError::NotFound(id.to_string()))
        }

        pub fn $iter(&self) -> impl Iterator<Item = (&Uuid, &$ty)> {
            self.$field.iter()
        }

        #[allow(dead_code)]
        const _: EntityKind = $kind;
    };
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mutation_count(&self) -> u64 {
        self.mutation_count
    }

    fn bump(&mut self) {
        self.mutation_count += 1;
    }

    // ---------------------------------------------------------------
    // Project
    // ---------------------------------------------------------------

    arena_accessors!(projects, Project, EntityKind::Project, project, project_mut, projects_iter);

    pub fn insert_project(&mut self, project: Project) -> Uuid {
        let id = new_id();
        debug!("inserting project {id}");
        self.projects.insert(id.clone(), project);
        self.bump();
        id
    }

    pub fn list_project_ids(&self) -> Vec<Uuid> {
        self.projects.keys().cloned().collect()
    }

    // ---------------------------------------------------------------
    // Building
    // ---------------------------------------------------------------

    arena_accessors!(
        buildings,
        Building,
        EntityKind::Building,
        building,
        building_mut,
        buildings_iter
    );

    pub fn insert_building(&mut self, project_id: &str, building: Building) -> CoreResult<Uuid> {
        self.project(project_id)?;
        let id = new_id();
        self.project_mut(project_id)?.buildings.push(id.clone());
        self.buildings.insert(id.clone(), building);
        self.bump();
        Ok(id)
    }

    /// Cascading delete: building -> levels -> rooms/walls -> openings;
    /// level -> footprint (spec.md invariant 2).
    pub fn remove_building(&mut self, id: &str) -> CoreResult<()> {
        let building = self.buildings.shift_remove(id).ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        for level_id in building.levels.clone() {
            self.remove_level_unchecked(&level_id);
        }
        if let Some(grid_id) = building.grid.clone() {
            self.grids.shift_remove(&grid_id);
        }
        for project in self.projects.values_mut() {
            project.buildings.retain(|b| b != id);
        }
        info!("removed building {id}");
        self.bump();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Level
    // ---------------------------------------------------------------

    arena_accessors!(levels, Level, EntityKind::Level, level, level_mut, levels_iter);

    pub fn insert_level(&mut self, building_id: &str, level: Level) -> CoreResult<Uuid> {
        self.building(building_id)?;
        let id = new_id();
        self.building_mut(building_id)?.levels.push(id.clone());
        self.levels.insert(id.clone(), level);
        self.bump();
        Ok(id)
    }

    pub fn remove_level(&mut self, id: &str) -> CoreResult<()> {
        self.level(id)?;
        let level = self.remove_level_unchecked(id);
        if let Some(level) = level {
            for building in self.buildings.values_mut() {
                building.levels.retain(|l| l != id);
            }
        }
        self.bump();
        Ok(())
    }

    /// Shared implementation used by both direct and cascading level removal.
    fn remove_level_unchecked(&mut self, id: &str) -> Option<Level> {
        let level = self.levels.shift_remove(id)?;
        for room_id in level.rooms.clone() {
            self.remove_room_unchecked(&room_id);
        }
        for wall_id in level.walls.clone() {
            self.remove_wall_unchecked(&wall_id);
        }
        if let Some(footprint_id) = level.footprint.clone() {
            self.footprints.shift_remove(&footprint_id);
        }
        info!("removed level {id}");
        Some(level)
    }

    // ---------------------------------------------------------------
    // Footprint
    // ---------------------------------------------------------------

    pub fn footprint(&self, id: &str) -> CoreResult<&Footprint> {
        self.footprints.get(id).ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    pub fn set_footprint(&mut self, level_id: &str, polygon: crate::geometry::Polygon) -> CoreResult<Uuid> {
        if polygon.len() < 3 {
            return Err(CoreError::InvalidGeometry(
                "footprint polygon needs at least 3 vertices".into(),
            ));
        }
        self.level(level_id)?;
        if let Some(old) = self.level(level_id)?.footprint.clone() {
            self.footprints.shift_remove(&old);
        }
        let id = new_id();
        self.footprints.insert(
            id.clone(),
            Footprint {
                level: level_id.to_string(),
                polygon,
            },
        );
        self.level_mut(level_id)?.footprint = Some(id.clone());
        self.bump();
        Ok(id)
    }

    // ---------------------------------------------------------------
    // WallAssembly
    // ---------------------------------------------------------------

    arena_accessors!(
        assemblies,
        WallAssembly,
        EntityKind::WallAssembly,
        assembly,
        assembly_mut,
        assemblies_iter
    );

    pub fn insert_assembly(&mut self, assembly: WallAssembly) -> Uuid {
        let id = new_id();
        self.assemblies.insert(id.clone(), assembly);
        self.bump();
        id
    }

    /// Wall assemblies are never destroyed while referenced (spec.md §3).
    pub fn remove_assembly(&mut self, id: &str) -> CoreResult<()> {
        let in_use = self.walls.values().any(|w| w.assembly == id);
        if in_use {
            return Err(CoreError::InvalidArgument(format!(
                "wall assembly {id} is still referenced by a wall"
            )));
        }
        self.assemblies
            .shift_remove(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        self.bump();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Wall
    // ---------------------------------------------------------------

    arena_accessors!(walls, Wall, EntityKind::Wall, wall, wall_mut, walls_iter);

    pub fn insert_wall(&mut self, level_id: &str, wall: Wall) -> CoreResult<Uuid> {
        if wall.length() <= 0.0 {
            return Err(CoreError::InvalidGeometry("wall has zero length".into()));
        }
        self.level(level_id)?;
        self.assembly(&wall.assembly)?;
        let id = new_id();
        self.level_mut(level_id)?.walls.push(id.clone());
        self.walls.insert(id.clone(), wall);
        self.bump();
        Ok(id)
    }

    pub fn remove_wall(&mut self, id: &str) -> CoreResult<()> {
        self.wall(id)?;
        self.remove_wall_unchecked(id);
        for level in self.levels.values_mut() {
            level.walls.retain(|w| w != id);
        }
        self.bump();
        Ok(())
    }

    fn remove_wall_unchecked(&mut self, id: &str) -> Option<Wall> {
        let wall = self.walls.shift_remove(id)?;
        for opening_id in &wall.openings {
            self.openings.shift_remove(opening_id);
        }
        let live_openings: std::collections::HashSet<&Uuid> = self.openings.keys().collect();
        for room in self.rooms.values_mut() {
            room.openings.retain(|o| live_openings.contains(o));
        }
        info!("removed wall {id}");
        Some(wall)
    }

    // ---------------------------------------------------------------
    // Opening
    // ---------------------------------------------------------------

    pub fn opening(&self, id: &str) -> CoreResult<&Opening> {
        self.openings.get(id).ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    pub fn openings_iter(&self) -> impl Iterator<Item = (&Uuid, &Opening)> {
        self.openings.iter()
    }

    pub fn insert_opening(&mut self, opening: Opening) -> CoreResult<Uuid> {
        if !(0.0..=1.0).contains(&opening.position) {
            return Err(CoreError::InvalidArgument(
                "opening position must be in [0,1]".into(),
            ));
        }
        if opening.width <= 0.0 || opening.height <= 0.0 {
            return Err(CoreError::InvalidArgument(
                "opening width/height must be positive".into(),
            ));
        }
        self.wall(&opening.wall)?;
        let id = new_id();
        self.wall_mut(&opening.wall)?.openings.push(id.clone());
        if let OpeningAnchor::RoomPair(r1, r2) = &opening.anchor {
            self.room(r1)?;
            self.room(r2)?;
            let r1 = r1.clone();
            let r2 = r2.clone();
            self.room_mut(&r1)?.openings.push(id.clone());
            self.room_mut(&r2)?.openings.push(id.clone());
        }
        self.openings.insert(id.clone(), opening);
        self.bump();
        Ok(id)
    }

    pub fn remove_opening(&mut self, id: &str) -> CoreResult<()> {
        let opening = self
            .openings
            .shift_remove(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        if let Some(wall) = self.walls.get_mut(&opening.wall) {
            wall.openings.retain(|o| o != id);
        }
        for room in self.rooms.values_mut() {
            room.openings.retain(|o| o != id);
        }
        self.bump();
        Ok(())
    }

    // ---------------------------------------------------------------
    // Room
    // ---------------------------------------------------------------

    arena_accessors!(rooms, Room, EntityKind::Room, room, room_mut, rooms_iter);

    pub fn insert_room(&mut self, level_id: &str, room: Room) -> CoreResult<Uuid> {
        if room.polygon.len() < 3 {
            return Err(CoreError::InvalidGeometry(
                "room polygon needs at least 3 vertices".into(),
            ));
        }
        if room.area() <= 0.0 {
            return Err(CoreError::InvalidGeometry("room polygon has zero area".into()));
        }
        self.level(level_id)?;
        let id = new_id();
        self.level_mut(level_id)?.rooms.push(id.clone());
        self.rooms.insert(id.clone(), room);
        self.bump();
        Ok(id)
    }

    pub fn remove_room(&mut self, id: &str) -> CoreResult<()> {
        self.room(id)?;
        self.remove_room_unchecked(id);
        for level in self.levels.values_mut() {
            level.rooms.retain(|r| r != id);
        }
        self.bump();
        Ok(())
    }

    fn remove_room_unchecked(&mut self, id: &str) -> Option<Room> {
        let room = self.rooms.shift_remove(id)?;
        // Openings expressed as (room1, room2) pairs are dropped when
        // either room is deleted (spec.md invariant 3).
        let dangling: Vec<Uuid> = self
            .openings
            .iter()
            .filter(|(_, o)| matches!(&o.anchor, OpeningAnchor::RoomPair(a, b) if a == id || b == id))
            .map(|(oid, _)| oid.clone())
            .collect();
        for oid in dangling {
            if let Some(opening) = self.openings.shift_remove(&oid) {
                if let Some(wall) = self.walls.get_mut(&opening.wall) {
                    wall.openings.retain(|o| o != &oid);
                }
            }
        }
        let live_openings: std::collections::HashSet<&Uuid> = self.openings.keys().collect();
        for other in self.rooms.values_mut() {
            other.openings.retain(|o| live_openings.contains(o));
        }
        info!("removed room {id}");
        Some(room)
    }

    // ---------------------------------------------------------------
    // Grid
    // ---------------------------------------------------------------

    pub fn grid(&self, id: &str) -> CoreResult<&Grid> {
        self.grids.get(id).ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    pub fn insert_grid(&mut self, building_id: &str, grid: Grid) -> CoreResult<Uuid> {
        self.building(building_id)?;
        let id = new_id();
        self.building_mut(building_id)?.grid = Some(id.clone());
        self.grids.insert(id.clone(), grid);
        self.bump();
        Ok(id)
    }

    pub fn add_grid_axis(
        &mut self,
        building_id: &str,
        axis: crate::entities::GridAxis,
    ) -> CoreResult<()> {
        let grid_id = self
            .building(building_id)?
            .grid
            .clone()
            .ok_or_else(|| CoreError::InvalidArgument("building has no grid".into()))?;
        self.grids
            .get_mut(&grid_id)
            .ok_or_else(|| CoreError::NotFound(grid_id.clone()))?
            .axes
            .push(axis);
        self.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{LayerRole, RoomType};

    /// Builds project -> building -> level -> wall, returning their ids.
    fn make_level_with_wall(store: &mut Store) -> (Uuid, Uuid, Uuid, Uuid) {
        let project_id = store.insert_project(Project {
            name: "Test".into(),
            unit_system: "ft".into(),
            code_region: "US".into(),
            buildings: vec![],
            event_count: 0,
        });
        let building_id = store
            .insert_building(
                &project_id,
                Building {
                    name: "Main".into(),
                    project: project_id.clone(),
                    levels: vec![],
                    grid: None,
                },
            )
            .unwrap();
        let level_id = store
            .insert_level(
                &building_id,
                Level {
                    name: "Level 1".into(),
                    building: building_id.clone(),
                    elevation: 0.0,
                    floor_to_floor: 10.0,
                    footprint: None,
                    walls: vec![],
                    rooms: vec![],
                },
            )
            .unwrap();
        let assembly_id = store.insert_assembly(WallAssembly {
            name: "2x4".into(),
            layers: vec![crate::entities::AssemblyLayer {
                material_tag: "gypsum".into(),
                thickness: 0.5,
                role: LayerRole::Finish,
            }],
        });
        let wall_id = store
            .insert_wall(
                &level_id,
                Wall {
                    level: level_id.clone(),
                    start: nalgebra::Point2::new(0.0, 0.0),
                    end: nalgebra::Point2::new(10.0, 0.0),
                    height: 8.0,
                    assembly: assembly_id,
                    openings: vec![],
                    is_exterior: false,
                },
            )
            .unwrap();
        (project_id, building_id, level_id, wall_id)
    }

    #[test]
    fn cascade_delete_removes_descendants() {
        let mut store = Store::new();
        let (_project_id, building_id, level_id, wall_id) = make_level_with_wall(&mut store);
        store
            .insert_room(
                &level_id,
                Room {
                    level: level_id.clone(),
                    name: "Bedroom".into(),
                    room_type: RoomType::Bedroom,
                    polygon: vec![
                        nalgebra::Point2::new(0.0, 0.0),
                        nalgebra::Point2::new(10.0, 0.0),
                        nalgebra::Point2::new(10.0, 10.0),
                        nalgebra::Point2::new(0.0, 10.0),
                    ],
                    openings: vec![],
                },
            )
            .unwrap();

        let before = store.mutation_count();
        store.remove_level(&level_id).unwrap();
        assert_eq!(store.mutation_count(), before + 1);
        assert!(store.wall(&wall_id).is_err());
        assert!(store.level(&level_id).is_err());
        assert!(store.building(&building_id).unwrap().levels.is_empty());
    }

    #[test]
    fn removing_wall_cascades_its_openings() {
        let mut store = Store::new();
        let (_project_id, _building_id, _level_id, wall_id) = make_level_with_wall(&mut store);
        let opening_id = store
            .insert_opening(Opening {
                kind: crate::entities::OpeningKind::Door,
                wall: wall_id.clone(),
                anchor: OpeningAnchor::Wall(wall_id.clone()),
                position: 0.5,
                width: 3.0,
                height: 6.67,
                sill_height: None,
            })
            .unwrap();

        store.remove_wall(&wall_id).unwrap();
        assert!(store.opening(&opening_id).is_err());
    }

    #[test]
    fn mutation_counter_is_monotonic() {
        let mut store = Store::new();
        let c0 = store.mutation_count();
        let project_id = store.insert_project(Project::default());
        let c1 = store.mutation_count();
        assert!(c1 > c0);
        store
            .insert_building(
                &project_id,
                Building {
                    name: "B".into(),
                    project: project_id.clone(),
                    levels: vec![],
                    grid: None,
                },
            )
            .unwrap();
        assert!(store.mutation_count() > c1);
    }
}
