//! Shared harness for the scenario tests.
//!
//! A harness owns a sandbox world, a replicated store and one agent with
//! its coordinator. [`Harness::tick`] runs a whole simulation step:
//! coordinator, then body integration, then fixture processing.

#![allow(dead_code)]

use companion_agents::{
    Agent, AgentManager, AgentMemory, BehaviorConfig, Coordinator, TickContext, TickReport,
};
use companion_types::{
    AgentClass, AgentId, EntityId, ItemCategory, ItemRecord, Mode, NoticeKind, PeerId,
    ReplicatedRecord, ToolClass, Vec3,
};
use companion_world::{
    Body, Conversion, Fixture, Inventory, MemoryStore, Perception, RecordChange, ReplicatedStore,
    SandboxWorld, Terrain, UiSessions,
};

pub const DT: f32 = 0.1;

pub struct Harness {
    pub world: SandboxWorld,
    pub store: MemoryStore,
    pub ui: UiSessions,
    pub peer: PeerId,
    pub config: BehaviorConfig,
    pub agent: Agent,
    pub body: Body,
    pub memory: AgentMemory,
    pub coordinator: Coordinator,
    pub now: f64,
}

impl Harness {
    /// One agent "Rook" at the origin, owned by peer "host" standing at
    /// (-3, 0, 0), on flat ground.
    pub fn new(mode: Mode, inventory: Inventory) -> Self {
        Self::with_config(mode, inventory, BehaviorConfig::default())
    }

    pub fn with_config(mode: Mode, inventory: Inventory, config: BehaviorConfig) -> Self {
        let peer = PeerId::new("host");
        let mut world = SandboxWorld::new(Terrain::flat(200.0));
        world.set_peer_position(peer.clone(), Vec3::new(-3.0, 0.0, 0.0));
        let agent = AgentManager::new()
            .create("Rook".to_owned(), AgentClass::Humanoid, 100.0, inventory)
            .unwrap();
        let mut store = MemoryStore::new();
        store.register(
            agent.id,
            peer.clone(),
            ReplicatedRecord {
                mode: Some(mode.code()),
                owner: Some(peer.clone()),
                ..ReplicatedRecord::default()
            },
        );
        let memory = AgentMemory::new(&config);
        Self {
            world,
            store,
            ui: UiSessions::new(),
            peer,
            config,
            agent,
            body: Body::new(Vec3::ZERO, AgentClass::Humanoid),
            memory,
            coordinator: Coordinator::new(),
            now: 0.0,
        }
    }

    pub fn tick(&mut self) -> TickReport {
        let ctx = TickContext::new(
            self.now,
            DT,
            &self.peer,
            &mut self.agent,
            &mut self.body,
            &mut self.world,
            &mut self.store,
            &self.ui,
            &self.config,
            &mut self.memory,
        );
        let report = self.coordinator.tick(ctx);
        self.body.integrate(DT, &self.world);
        self.world.advance(DT);
        self.now += f64::from(DT);
        report
    }

    /// Tick until `done` holds, up to `limit` ticks.
    pub fn run_until(&mut self, limit: usize, mut done: impl FnMut(&Self, &TickReport) -> bool) -> TickReport {
        for _ in 0..limit {
            let report = self.tick();
            if done(self, &report) {
                return report;
            }
        }
        panic!("condition not reached within {limit} ticks");
    }

    /// Tick `count` times, keeping every report.
    pub fn run_for(&mut self, count: usize) -> Vec<TickReport> {
        (0..count).map(|_| self.tick()).collect()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.store
            .apply(&self.peer, self.agent.id, RecordChange::Mode(mode))
            .unwrap();
    }

    pub fn set_stamina(&mut self, stamina: f32) {
        self.store
            .apply(&self.peer, self.agent.id, RecordChange::Stamina(stamina))
            .unwrap();
    }

    pub fn record(&self) -> &ReplicatedRecord {
        self.store.record(self.agent.id).unwrap()
    }

    /// Who holds `chest` open.
    pub fn chest_holder(&self, chest: EntityId) -> Option<AgentId> {
        self.world
            .entity(chest)
            .and_then(|e| e.as_container())
            .and_then(|c| c.opened_by)
    }

    /// Units of `name` stored in `chest`.
    pub fn chest_count(&self, chest: EntityId, name: &str) -> u32 {
        self.world
            .entity(chest)
            .and_then(|e| e.as_container())
            .map_or(0, |c| c.inventory.count(name))
    }

    /// Move an entity on the ground plane.
    pub fn shift(&mut self, id: EntityId, delta: Vec3) {
        let entity = self.world.entity_mut(id).unwrap();
        entity.position = entity.position + delta;
    }
}

pub fn raised(reports: &[TickReport], kind: NoticeKind) -> bool {
    reports
        .iter()
        .flat_map(|r| r.notices.iter())
        .any(|n| n.kind == kind)
}

pub fn inventory_of(items: Vec<ItemRecord>) -> Inventory {
    let mut inventory = Inventory::new(12, 200.0);
    for item in items {
        inventory.add(item).unwrap();
    }
    inventory
}

pub fn axes() -> Inventory {
    inventory_of(vec![
        ItemRecord::tool("Stone Axe", ToolClass::Axe, 5.0, 0, 100.0),
        ItemRecord::tool("Iron Axe", ToolClass::Axe, 12.0, 1, 100.0),
    ])
}

pub fn sword() -> ItemRecord {
    ItemRecord::weapon("Sword", 6.0, 2.0, true, 100.0)
}

pub fn logs() -> Vec<ItemRecord> {
    vec![ItemRecord::stack("Log", ItemCategory::Material, 2, 1.0)]
}

pub fn copper_smelter() -> Fixture {
    Fixture::new(
        vec![Conversion {
            input: "CopperOre".to_owned(),
            output: "CopperBar".to_owned(),
        }],
        Some("Coal".to_owned()),
        2,
        4,
        1,
        5.0,
    )
}

/// A chest inventory holding copper ore and coal.
pub fn supplies(ore: u32, coal: u32) -> Inventory {
    let mut chest = Inventory::new(8, 200.0);
    chest
        .add(ItemRecord::stack("CopperOre", ItemCategory::Ore, ore, 1.0))
        .unwrap();
    chest
        .add(ItemRecord::stack("Coal", ItemCategory::Fuel, coal, 1.0))
        .unwrap();
    chest
}
