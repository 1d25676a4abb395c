//! Replicated per-agent state with single-writer authority.
//!
//! Every agent has exactly one authoritative peer at a time. Reads are open
//! to everyone; writes from any other peer are rejected with
//! [`StoreError::NotAuthoritative`]. Authority moves only through
//! [`MemoryStore::transfer_authority`], which models host migration.

use std::collections::BTreeMap;

use companion_types::{AgentId, Mode, PeerId, ReplicatedRecord, Vec3};
use tracing::{debug, warn};

use crate::error::StoreError;

/// One field write against a [`ReplicatedRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    /// Persist a new mode.
    Mode(Mode),
    /// Change the owning peer.
    Owner(PeerId),
    /// Set the home point.
    Home(Vec3),
    /// Forget the home point.
    ClearHome,
    /// Assign a formation slot.
    FormationSlot(i32),
    /// Store the current stamina.
    Stamina(f32),
    /// Record the last rest spot used.
    LastRecovery(String),
}

/// Access to replicated agent records.
pub trait ReplicatedStore {
    /// The current record, if the agent is known.
    fn record(&self, agent: AgentId) -> Option<&ReplicatedRecord>;

    /// The peer currently holding write authority.
    fn authority(&self, agent: AgentId) -> Option<&PeerId>;

    /// Apply a change on behalf of `peer`.
    fn apply(&mut self, peer: &PeerId, agent: AgentId, change: RecordChange) -> Result<(), StoreError>;

    /// Whether `peer` may write this agent's record.
    fn is_authoritative(&self, peer: &PeerId, agent: AgentId) -> bool {
        self.authority(agent) == Some(peer)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    authority: PeerId,
    record: ReplicatedRecord,
}

/// In-memory [`ReplicatedStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: BTreeMap<AgentId, Slot>,
}

impl MemoryStore {
    /// An empty store.
    pub const fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Register an agent with its initial authority and record.
    pub fn register(&mut self, agent: AgentId, authority: PeerId, record: ReplicatedRecord) {
        self.slots.insert(agent, Slot { authority, record });
    }

    /// Move write authority to another peer.
    pub fn transfer_authority(&mut self, agent: AgentId, to: PeerId) -> Result<(), StoreError> {
        let slot = self
            .slots
            .get_mut(&agent)
            .ok_or(StoreError::UnknownAgent(agent))?;
        debug!(agent = %agent, from = %slot.authority, to = %to, "Authority transferred");
        slot.authority = to;
        Ok(())
    }

    /// Drop an agent's record (death or despawn).
    pub fn remove(&mut self, agent: AgentId) -> Option<ReplicatedRecord> {
        self.slots.remove(&agent).map(|slot| slot.record)
    }

    /// Agents whose authority is `peer`, in key order.
    pub fn agents_owned_by<'a>(&'a self, peer: &'a PeerId) -> impl Iterator<Item = AgentId> + 'a {
        self.slots
            .iter()
            .filter(move |(_, slot)| &slot.authority == peer)
            .map(|(id, _)| *id)
    }
}

impl ReplicatedStore for MemoryStore {
    fn record(&self, agent: AgentId) -> Option<&ReplicatedRecord> {
        self.slots.get(&agent).map(|slot| &slot.record)
    }

    fn authority(&self, agent: AgentId) -> Option<&PeerId> {
        self.slots.get(&agent).map(|slot| &slot.authority)
    }

    fn apply(&mut self, peer: &PeerId, agent: AgentId, change: RecordChange) -> Result<(), StoreError> {
        let slot = self
            .slots
            .get_mut(&agent)
            .ok_or(StoreError::UnknownAgent(agent))?;
        if &slot.authority != peer {
            warn!(agent = %agent, peer = %peer, "Rejected write from non-authoritative peer");
            return Err(StoreError::NotAuthoritative {
                agent,
                peer: peer.clone(),
            });
        }
        let record = &mut slot.record;
        match change {
            RecordChange::Mode(mode) => record.mode = Some(mode.code()),
            RecordChange::Owner(owner) => record.owner = Some(owner),
            RecordChange::Home(point) => {
                record.home = Some(point);
                record.home_set = Some(true);
            }
            RecordChange::ClearHome => record.home_set = Some(false),
            RecordChange::FormationSlot(slot_index) => record.formation_slot = Some(slot_index),
            RecordChange::Stamina(stamina) => record.stamina = Some(stamina),
            RecordChange::LastRecovery(key) => record.last_recovery_id = Some(key),
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn authoritative_write_applies() {
        let mut store = MemoryStore::new();
        let agent = AgentId::new();
        let host = PeerId::new("host");
        store.register(agent, host.clone(), ReplicatedRecord::default());
        assert!(store.apply(&host, agent, RecordChange::Mode(Mode::GatherOre)).is_ok());
        assert_eq!(store.record(agent).unwrap().mode(), Some(Mode::GatherOre));
    }

    #[test]
    fn non_authoritative_write_is_rejected() {
        let mut store = MemoryStore::new();
        let agent = AgentId::new();
        let host = PeerId::new("host");
        let guest = PeerId::new("guest");
        store.register(agent, host, ReplicatedRecord::default());
        let result = store.apply(&guest, agent, RecordChange::Stamina(3.0));
        assert!(matches!(result, Err(StoreError::NotAuthoritative { .. })));
        assert_eq!(store.record(agent).unwrap().stamina, None);
    }

    #[test]
    fn authority_transfer_changes_writer() {
        let mut store = MemoryStore::new();
        let agent = AgentId::new();
        let host = PeerId::new("host");
        let guest = PeerId::new("guest");
        store.register(agent, host.clone(), ReplicatedRecord::default());
        assert!(store.transfer_authority(agent, guest.clone()).is_ok());
        assert!(store.apply(&host, agent, RecordChange::ClearHome).is_err());
        assert!(store.apply(&guest, agent, RecordChange::Home(Vec3::ZERO)).is_ok());
        assert_eq!(store.record(agent).unwrap().home_point(), Some(Vec3::ZERO));
        assert_eq!(store.agents_owned_by(&guest).count(), 1);
    }

    #[test]
    fn unknown_agent_is_an_error() {
        let mut store = MemoryStore::new();
        let peer = PeerId::new("host");
        let result = store.apply(&peer, AgentId::new(), RecordChange::Stamina(1.0));
        assert!(matches!(result, Err(StoreError::UnknownAgent(_))));
    }
}
