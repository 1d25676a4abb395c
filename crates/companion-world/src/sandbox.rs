//! In-memory world implementing [`Perception`] and [`Interaction`].
//!
//! The sandbox is deliberately simple: straight-line path checks against
//! terrain obstacles, cylinder line-of-sight, and entity state held in a
//! `BTreeMap` so every query returns keys in a stable order. It exists so
//! the behavior core can run end to end in tests and in the headless
//! engine without a host game.

use std::collections::BTreeMap;

use companion_types::{
    AgentClass, AgentId, Durability, EntityId, ItemCategory, ItemRecord, PeerId, ResourceKind,
    StationKind, Vec3,
};
use tracing::debug;

use crate::entity::{
    Container, Creature, Entity, EntityFilter, EntityKind, GroundItem, ResourceNode, Station,
};
use crate::error::WorldError;
use crate::fixture::{Fixture, InsertRefusal};
use crate::inventory::Inventory;
use crate::substrate::{Hit, Interaction, Perception, StrikeOutcome};
use crate::terrain::{JUMPABLE_HEIGHT, Terrain, segment_hits_cylinder};

/// Path checks sample ground every this many meters.
const PATH_SAMPLE_STEP: f32 = 1.0;

/// Unit weight of released fixture output.
const OUTPUT_UNIT_WEIGHT: f32 = 1.0;

/// The sandbox world.
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    /// Ground and static obstacles.
    terrain: Terrain,
    /// Every entity by key.
    entities: BTreeMap<EntityId, Entity>,
    /// Connected peers' avatar positions.
    peers: BTreeMap<PeerId, Vec3>,
}

impl SandboxWorld {
    /// An empty world on the given terrain.
    pub const fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            entities: BTreeMap::new(),
            peers: BTreeMap::new(),
        }
    }

    /// The terrain.
    pub const fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    /// Mutable terrain access (scenario setup).
    pub const fn terrain_mut(&mut self) -> &mut Terrain {
        &mut self.terrain
    }

    /// All entities in key order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Mutable entity lookup.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Remove an entity from the world.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Place or move a peer's avatar.
    pub fn set_peer_position(&mut self, peer: PeerId, position: Vec3) {
        self.peers.insert(peer, position);
    }

    /// Disconnect a peer.
    pub fn remove_peer(&mut self, peer: &PeerId) {
        self.peers.remove(peer);
    }

    /// `point` with Y snapped to the ground, unchanged where there is none.
    pub fn snap_to_ground(&self, point: Vec3) -> Vec3 {
        self.terrain
            .ground_height(point)
            .map_or(point, |y| point.with_y(y))
    }

    // -------------------------------------------------------------------
    // Spawning
    // -------------------------------------------------------------------

    /// Insert a fully built entity.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.insert(id, entity);
        id
    }

    fn spawn(&mut self, name: &str, position: Vec3, radius: f32, height: f32, kind: EntityKind) -> EntityId {
        let position = self.snap_to_ground(position);
        self.insert(Entity {
            id: EntityId::new(),
            name: name.to_owned(),
            position,
            radius,
            height,
            active: true,
            kind,
        })
    }

    /// Spawn a resource node with a footprint typical for its kind.
    pub fn spawn_resource(
        &mut self,
        name: &str,
        kind: ResourceKind,
        position: Vec3,
        tier: u8,
        health: f32,
        yields: Vec<ItemRecord>,
    ) -> EntityId {
        let (radius, height) = match kind {
            ResourceKind::Wood => (0.5, 6.0),
            ResourceKind::Stone => (1.0, 1.5),
            ResourceKind::Ore => (1.2, 1.0),
        };
        let node = ResourceNode {
            kind,
            tier,
            health,
            max_health: health,
            yields,
        };
        self.spawn(name, position, radius, height, EntityKind::Resource(node))
    }

    /// Spawn a production fixture.
    pub fn spawn_fixture(&mut self, name: &str, position: Vec3, fixture: Fixture) -> EntityId {
        self.spawn(name, position, 1.0, 2.0, EntityKind::Fixture(fixture))
    }

    /// Spawn a container holding `inventory`.
    pub fn spawn_container(&mut self, name: &str, position: Vec3, inventory: Inventory) -> EntityId {
        let container = Container {
            inventory,
            opened_by: None,
        };
        self.spawn(name, position, 0.6, 1.0, EntityKind::Container(container))
    }

    /// Spawn a ground item.
    pub fn spawn_drop(&mut self, position: Vec3, item: ItemRecord) -> EntityId {
        let name = item.name.clone();
        let drop = GroundItem {
            item,
            claimed_by: None,
        };
        self.spawn(&name, position, 0.2, 0.2, EntityKind::Drop(drop))
    }

    /// Spawn a door.
    pub fn spawn_door(&mut self, position: Vec3, open: bool) -> EntityId {
        self.spawn("Door", position, 1.0, 2.5, EntityKind::Door(open))
    }

    /// Spawn a creature.
    pub fn spawn_creature(&mut self, name: &str, position: Vec3, health: f32, hostile: bool) -> EntityId {
        let creature = Creature {
            health,
            max_health: health,
            hostile,
        };
        self.spawn(name, position, 0.5, 1.8, EntityKind::Creature(creature))
    }

    /// Spawn a station.
    pub fn spawn_station(&mut self, name: &str, position: Vec3, kind: StationKind, tier: u8) -> EntityId {
        self.spawn(name, position, 0.8, 1.2, EntityKind::Station(Station { kind, tier }))
    }

    /// Spawn an attachable vehicle.
    pub fn spawn_vehicle(&mut self, name: &str, position: Vec3) -> EntityId {
        self.spawn(name, position, 1.5, 1.5, EntityKind::Vehicle(None))
    }

    // -------------------------------------------------------------------
    // Simulation
    // -------------------------------------------------------------------

    /// Advance fixtures by `dt` seconds. Returns units finished.
    pub fn advance(&mut self, dt: f32) -> u32 {
        let mut finished: u32 = 0;
        for entity in self.entities.values_mut() {
            if let EntityKind::Fixture(fixture) = &mut entity.kind {
                finished = finished.saturating_add(fixture.advance(dt));
            }
        }
        finished
    }

    /// Whether a body stepping from `from` to `to` would walk into
    /// something. Only approaching moves are blocked, so a body that ends
    /// up overlapping an obstacle can always walk out of it.
    pub fn walk_blocked(&self, from: Vec3, to: Vec3, clearance: f32, jumping: bool) -> bool {
        let terrain_hit = self.terrain.obstacles.iter().any(|o| {
            let approaching = to.horizontal_distance(o.center) < from.horizontal_distance(o.center);
            let inside = to.horizontal_distance(o.center) < o.radius + clearance;
            let jumpable = jumping && o.height <= JUMPABLE_HEIGHT;
            approaching && inside && !jumpable && to.y < o.center.y + o.height
        });
        if terrain_hit {
            return true;
        }
        self.entities.values().any(|e| {
            if !e.active || !e.is_solid() {
                return false;
            }
            let approaching = to.horizontal_distance(e.position) < from.horizontal_distance(e.position);
            approaching && to.horizontal_distance(e.position) < e.radius + clearance
        })
    }

    /// Ring positions around `center` for spawned drops.
    fn drop_positions(&self, center: Vec3, radius: f32, count: usize) -> Vec<Vec3> {
        let step = core::f32::consts::TAU / count.max(1) as f32;
        (0..count)
            .map(|i| {
                let dir = Vec3::from_yaw(step * i as f32);
                self.snap_to_ground(center + dir * radius)
            })
            .collect()
    }
}

impl Perception for SandboxWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, filter: EntityFilter) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.active && filter.matches(e))
            .filter(|e| e.position.distance(center) - e.radius <= radius)
            .map(|e| e.id)
            .collect()
    }

    fn has_path(&self, from: Vec3, to: Vec3, class: AgentClass) -> bool {
        if self.terrain.ground_height(from).is_none() || self.terrain.ground_height(to).is_none() {
            return false;
        }
        let clearance = match class {
            AgentClass::Humanoid => 0.3,
            AgentClass::Large => 1.0,
        };
        let grown_blocked = self.terrain.obstacles.iter().any(|o| {
            segment_hits_cylinder(
                from.with_y(o.center.y),
                to.with_y(o.center.y),
                o.center,
                o.radius + clearance,
                o.height,
            ) && o.height > JUMPABLE_HEIGHT
        });
        if grown_blocked {
            return false;
        }
        let length = from.horizontal_distance(to);
        let mut travelled = 0.0_f32;
        loop {
            let t = if length > 0.0 { (travelled / length).min(1.0) } else { 1.0 };
            if self.terrain.ground_height(from + (to - from) * t).is_none() {
                return false;
            }
            if t >= 1.0 {
                return true;
            }
            travelled += PATH_SAMPLE_STEP;
        }
    }

    fn ground_height(&self, point: Vec3) -> Option<f32> {
        self.terrain.ground_height(point)
    }

    fn line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        if self.terrain.segment_blocked(from, to) {
            return false;
        }
        !self.entities.values().any(|e| {
            if !e.active || !e.is_solid() {
                return false;
            }
            let contains_end = to.horizontal_distance(e.position) <= e.radius + 0.05
                || from.horizontal_distance(e.position) <= e.radius + 0.05;
            !contains_end && segment_hits_cylinder(from, to, e.position, e.radius, e.height)
        })
    }

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn peer_position(&self, peer: &PeerId) -> Option<Vec3> {
        self.peers.get(peer).copied()
    }
}

/// What a strike did, resolved before the entity map is touched again.
enum StrikeEffect {
    Survived(f32),
    Destroyed {
        position: Vec3,
        radius: f32,
        yields: Vec<ItemRecord>,
    },
}

impl Interaction for SandboxWorld {
    fn drop_item(&mut self, position: Vec3, item: ItemRecord) -> EntityId {
        debug!(item = %item.name, quantity = item.quantity, ?position, "Item dropped");
        self.spawn_drop(position, item)
    }

    fn strike(&mut self, target: EntityId, hit: Hit) -> Result<StrikeOutcome, WorldError> {
        let entity = self
            .entities
            .get_mut(&target)
            .ok_or(WorldError::EntityNotFound(target))?;
        if !entity.is_live() {
            return Err(WorldError::Inactive(target));
        }
        let position = entity.position;
        let radius = entity.radius;
        let effect = match &mut entity.kind {
            EntityKind::Resource(node) => {
                if hit.tool != Some(node.kind.tool_class()) {
                    return Ok(StrikeOutcome::Damaged {
                        remaining: node.health,
                    });
                }
                if hit.tier < node.tier {
                    return Err(WorldError::TierTooLow {
                        entity: target,
                        required: node.tier,
                        provided: hit.tier,
                    });
                }
                node.health -= hit.damage;
                if node.health > 0.0 {
                    StrikeEffect::Survived(node.health)
                } else {
                    StrikeEffect::Destroyed {
                        position,
                        radius,
                        yields: core::mem::take(&mut node.yields),
                    }
                }
            }
            EntityKind::Creature(creature) => {
                creature.health -= hit.damage;
                if creature.health > 0.0 {
                    StrikeEffect::Survived(creature.health)
                } else {
                    StrikeEffect::Destroyed {
                        position,
                        radius,
                        yields: Vec::new(),
                    }
                }
            }
            _ => {
                return Err(WorldError::WrongKind {
                    entity: target,
                    expected: "destructible",
                });
            }
        };

        match effect {
            StrikeEffect::Survived(remaining) => Ok(StrikeOutcome::Damaged { remaining }),
            StrikeEffect::Destroyed {
                position,
                radius,
                yields,
            } => {
                self.entities.remove(&target);
                let spots = self.drop_positions(position, radius + 0.6, yields.len());
                let drops = yields
                    .into_iter()
                    .zip(spots)
                    .map(|(item, spot)| self.spawn_drop(spot, item))
                    .collect::<Vec<_>>();
                debug!(target = %target, drops = drops.len(), "Entity destroyed");
                Ok(StrikeOutcome::Destroyed { drops })
            }
        }
    }

    fn claim_drop(&mut self, drop: EntityId, agent: AgentId) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&drop)
            .ok_or(WorldError::EntityNotFound(drop))?;
        let EntityKind::Drop(ground) = &mut entity.kind else {
            return Err(WorldError::WrongKind {
                entity: drop,
                expected: "drop",
            });
        };
        match ground.claimed_by {
            Some(holder) if holder != agent => Err(WorldError::DropClaimed { drop, holder }),
            _ => {
                ground.claimed_by = Some(agent);
                Ok(())
            }
        }
    }

    fn release_drop(&mut self, drop: EntityId, agent: AgentId) {
        if let Some(EntityKind::Drop(ground)) = self.entities.get_mut(&drop).map(|e| &mut e.kind)
            && ground.claimed_by == Some(agent)
        {
            ground.claimed_by = None;
        }
    }

    fn pick_up(&mut self, drop: EntityId, agent: AgentId) -> Result<ItemRecord, WorldError> {
        let entity = self.entities.get(&drop).ok_or(WorldError::EntityNotFound(drop))?;
        let ground = entity.as_drop().ok_or(WorldError::WrongKind {
            entity: drop,
            expected: "drop",
        })?;
        if let Some(holder) = ground.claimed_by
            && holder != agent
        {
            return Err(WorldError::DropClaimed { drop, holder });
        }
        let item = ground.item.clone();
        self.entities.remove(&drop);
        Ok(item)
    }

    fn open_container(&mut self, container: EntityId, agent: AgentId) -> Result<(), WorldError> {
        let chest = container_mut(&mut self.entities, container)?;
        match chest.opened_by {
            Some(holder) if holder != agent => Err(WorldError::ContainerInUse { container, holder }),
            _ => {
                chest.opened_by = Some(agent);
                Ok(())
            }
        }
    }

    fn close_container(&mut self, container: EntityId, agent: AgentId) {
        if let Ok(chest) = container_mut(&mut self.entities, container)
            && chest.opened_by == Some(agent)
        {
            chest.opened_by = None;
        }
    }

    fn take_from_container(
        &mut self,
        container: EntityId,
        agent: AgentId,
        name: &str,
        max: u32,
    ) -> Result<Option<ItemRecord>, WorldError> {
        let chest = container_mut(&mut self.entities, container)?;
        if chest.opened_by != Some(agent) {
            return Err(WorldError::ContainerNotOpen { container, agent });
        }
        Ok(chest.inventory.take_up_to(name, max))
    }

    fn deposit(&mut self, container: EntityId, agent: AgentId, item: ItemRecord) -> Result<(), WorldError> {
        let chest = container_mut(&mut self.entities, container)?;
        if chest.opened_by != Some(agent) {
            return Err(WorldError::ContainerNotOpen { container, agent });
        }
        chest.inventory.add(item)?;
        Ok(())
    }

    fn insert_into_fixture(&mut self, fixture: EntityId, name: &str, is_fuel: bool) -> Result<(), WorldError> {
        let target = fixture_mut(&mut self.entities, fixture)?;
        target.insert(name, is_fuel).map_err(|refusal| match refusal {
            InsertRefusal::Full => WorldError::FixtureFull(fixture),
            InsertRefusal::NotAccepted => WorldError::NotAccepted {
                fixture,
                item: name.to_owned(),
            },
        })
    }

    fn release_output(&mut self, fixture: EntityId) -> Result<Vec<EntityId>, WorldError> {
        let (ready, origin) = {
            let entity = self
                .entities
                .get_mut(&fixture)
                .ok_or(WorldError::EntityNotFound(fixture))?;
            let position = entity.position;
            let EntityKind::Fixture(target) = &mut entity.kind else {
                return Err(WorldError::WrongKind {
                    entity: fixture,
                    expected: "fixture",
                });
            };
            if target.ready.is_empty() {
                return Err(WorldError::NothingToRelease(fixture));
            }
            (core::mem::take(&mut target.ready), position + target.output_offset)
        };
        let spots = self.drop_positions(origin, 0.4, ready.len());
        Ok(ready
            .into_iter()
            .zip(spots)
            .map(|(name, spot)| {
                let item = ItemRecord::stack(name, ItemCategory::Refined, 1, OUTPUT_UNIT_WEIGHT);
                self.spawn_drop(spot, item)
            })
            .collect())
    }

    fn use_door(&mut self, door: EntityId) -> Result<bool, WorldError> {
        let entity = self
            .entities
            .get_mut(&door)
            .ok_or(WorldError::EntityNotFound(door))?;
        let EntityKind::Door(open) = &mut entity.kind else {
            return Err(WorldError::WrongKind {
                entity: door,
                expected: "door",
            });
        };
        *open = !*open;
        Ok(*open)
    }

    fn attach(&mut self, vehicle: EntityId, agent: AgentId) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&vehicle)
            .ok_or(WorldError::EntityNotFound(vehicle))?;
        let EntityKind::Vehicle(rider) = &mut entity.kind else {
            return Err(WorldError::WrongKind {
                entity: vehicle,
                expected: "vehicle",
            });
        };
        match rider {
            Some(current) if *current != agent => Err(WorldError::VehicleOccupied(vehicle)),
            _ => {
                *rider = Some(agent);
                Ok(())
            }
        }
    }

    fn repair(&mut self, station: EntityId, item: &mut ItemRecord) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get(&station)
            .ok_or(WorldError::EntityNotFound(station))?;
        let Some(bench) = entity.as_station().filter(|s| s.kind.repairs()) else {
            return Err(WorldError::WrongKind {
                entity: station,
                expected: "repair station",
            });
        };
        if item.tier > bench.tier {
            return Err(WorldError::TierTooLow {
                entity: station,
                required: item.tier,
                provided: bench.tier,
            });
        }
        if let Some(durability) = item.durability {
            item.durability = Some(Durability::full(durability.max));
        }
        Ok(())
    }
}

fn container_mut(
    entities: &mut BTreeMap<EntityId, Entity>,
    id: EntityId,
) -> Result<&mut Container, WorldError> {
    match entities.get_mut(&id).map(|e| &mut e.kind) {
        Some(EntityKind::Container(container)) => Ok(container),
        Some(_) => Err(WorldError::WrongKind {
            entity: id,
            expected: "container",
        }),
        None => Err(WorldError::EntityNotFound(id)),
    }
}

fn fixture_mut(entities: &mut BTreeMap<EntityId, Entity>, id: EntityId) -> Result<&mut Fixture, WorldError> {
    match entities.get_mut(&id).map(|e| &mut e.kind) {
        Some(EntityKind::Fixture(fixture)) => Ok(fixture),
        Some(_) => Err(WorldError::WrongKind {
            entity: id,
            expected: "fixture",
        }),
        None => Err(WorldError::EntityNotFound(id)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use companion_types::{ItemCategory, ToolClass};

    use super::*;
    use crate::terrain::Obstacle;

    fn world() -> SandboxWorld {
        SandboxWorld::new(Terrain::flat(100.0))
    }

    fn axe_hit(damage: f32, tier: u8) -> Hit {
        Hit {
            damage,
            tool: Some(ToolClass::Axe),
            tier,
        }
    }

    fn log() -> ItemRecord {
        ItemRecord::stack("Wood", ItemCategory::Material, 5, 2.0)
    }

    #[test]
    fn overlap_returns_matching_in_range() {
        let mut w = world();
        let near = w.spawn_resource("Beech", ResourceKind::Wood, Vec3::new(3.0, 0.0, 0.0), 0, 40.0, vec![]);
        let _far = w.spawn_resource("Beech", ResourceKind::Wood, Vec3::new(60.0, 0.0, 0.0), 0, 40.0, vec![]);
        let _rock = w.spawn_resource("Rock", ResourceKind::Stone, Vec3::new(2.0, 0.0, 0.0), 0, 40.0, vec![]);
        let hits = w.overlap_sphere(Vec3::ZERO, 10.0, EntityFilter::Resource(ResourceKind::Wood));
        assert_eq!(hits, vec![near]);
    }

    #[test]
    fn strike_destroys_and_spawns_drops() {
        let mut w = world();
        let tree = w.spawn_resource("Beech", ResourceKind::Wood, Vec3::ZERO, 0, 30.0, vec![log(), log()]);
        let first = w.strike(tree, axe_hit(20.0, 1)).unwrap();
        assert!(matches!(first, StrikeOutcome::Damaged { .. }));
        let second = w.strike(tree, axe_hit(20.0, 1)).unwrap();
        let StrikeOutcome::Destroyed { drops } = second else {
            panic!("expected destruction");
        };
        assert_eq!(drops.len(), 2);
        assert!(w.entity(tree).is_none());
        assert!(matches!(w.strike(tree, axe_hit(1.0, 1)), Err(WorldError::EntityNotFound(_))));
    }

    #[test]
    fn strike_rejects_low_tier() {
        let mut w = world();
        let tree = w.spawn_resource("Oak", ResourceKind::Wood, Vec3::ZERO, 2, 30.0, vec![]);
        assert!(matches!(w.strike(tree, axe_hit(20.0, 1)), Err(WorldError::TierTooLow { required: 2, .. })));
    }

    #[test]
    fn wrong_tool_class_does_no_damage() {
        let mut w = world();
        let rock = w.spawn_resource("Rock", ResourceKind::Stone, Vec3::ZERO, 0, 30.0, vec![]);
        let outcome = w.strike(rock, axe_hit(20.0, 3)).unwrap();
        assert_eq!(outcome, StrikeOutcome::Damaged { remaining: 30.0 });
    }

    #[test]
    fn container_is_exclusive() {
        let mut w = world();
        let chest = w.spawn_container("Chest", Vec3::ZERO, Inventory::new(8, 500.0));
        let a = AgentId::new();
        let b = AgentId::new();
        assert!(w.open_container(chest, a).is_ok());
        assert!(matches!(w.open_container(chest, b), Err(WorldError::ContainerInUse { .. })));
        assert!(matches!(w.deposit(chest, b, log()), Err(WorldError::ContainerNotOpen { .. })));
        assert!(w.deposit(chest, a, log()).is_ok());
        w.close_container(chest, a);
        assert!(w.open_container(chest, b).is_ok());
        let taken = w.take_from_container(chest, b, "Wood", 3).unwrap();
        assert_eq!(taken.map(|t| t.quantity), Some(3));
    }

    #[test]
    fn claimed_drop_cannot_be_taken_by_others() {
        let mut w = world();
        let drop = w.spawn_drop(Vec3::ZERO, log());
        let a = AgentId::new();
        let b = AgentId::new();
        assert!(w.claim_drop(drop, a).is_ok());
        assert!(matches!(w.pick_up(drop, b), Err(WorldError::DropClaimed { .. })));
        w.release_drop(drop, a);
        assert!(w.pick_up(drop, b).is_ok());
        assert!(w.entity(drop).is_none());
    }

    #[test]
    fn release_output_spawns_refined_drops() {
        let mut w = world();
        let mut fixture = Fixture::new(Vec::new(), None, 2, 0, 0, 1.0);
        fixture.ready.push(String::from("Copper"));
        let id = w.spawn_fixture("Smelter", Vec3::ZERO, fixture);
        let drops = w.release_output(id).unwrap();
        assert_eq!(drops.len(), 1);
        assert!(matches!(w.release_output(id), Err(WorldError::NothingToRelease(_))));
    }

    #[test]
    fn dropped_item_lands_unclaimed_and_can_be_picked_up() {
        let mut w = world();
        let agent = AgentId::new();
        let spot = Vec3::new(2.0, 0.0, 1.0);
        let drop = w.drop_item(spot, log());
        let ground = w.entity(drop).and_then(Entity::as_drop).unwrap();
        assert_eq!(ground.claimed_by, None);
        assert_eq!(w.overlap_sphere(spot, 0.5, EntityFilter::Drop), vec![drop]);

        w.claim_drop(drop, agent).unwrap();
        let item = w.pick_up(drop, agent).unwrap();
        assert_eq!(item.quantity, 5);
        assert!(w.entity(drop).is_none());
    }

    #[test]
    fn obstacle_blocks_path_and_sight() {
        let mut w = world();
        w.terrain_mut().obstacles.push(Obstacle {
            center: Vec3::new(0.0, 0.0, 5.0),
            radius: 1.5,
            height: 4.0,
        });
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(0.0, 0.0, 10.0);
        assert!(!w.has_path(from, to, AgentClass::Humanoid));
        assert!(!w.line_of_sight(from.with_y(1.0), to.with_y(1.0)));
        assert!(w.has_path(from, Vec3::new(6.0, 0.0, 0.0), AgentClass::Humanoid));
    }

    #[test]
    fn walking_into_solid_entity_is_blocked() {
        let mut w = world();
        let _ = w.spawn_container("Chest", Vec3::new(0.0, 0.0, 1.0), Inventory::new(4, 100.0));
        assert!(w.walk_blocked(Vec3::ZERO, Vec3::new(0.0, 0.0, 0.2), 0.3, false));
        assert!(!w.walk_blocked(Vec3::ZERO, Vec3::new(0.0, 0.0, -0.2), 0.3, false));
    }

    #[test]
    fn repair_restores_durability_within_tier() {
        let mut w = world();
        let bench = w.spawn_station("Workbench", Vec3::ZERO, StationKind::Workbench, 2);
        let mut axe = ItemRecord::tool("AxeBronze", ToolClass::Axe, 30.0, 2, 100.0);
        axe.durability = Some(Durability { current: 10.0, max: 100.0 });
        assert!(w.repair(bench, &mut axe).is_ok());
        assert_eq!(axe.durability.map(|d| d.current), Some(100.0));
        let mut iron = ItemRecord::tool("AxeIron", ToolClass::Axe, 40.0, 3, 100.0);
        assert!(matches!(w.repair(bench, &mut iron), Err(WorldError::TierTooLow { .. })));
    }
}
