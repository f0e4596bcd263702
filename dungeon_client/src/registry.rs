//! Entity registry.
//!
//! An owned arena of entity records keyed by server id. Only the
//! synchronizer mutates membership; the extrapolator only writes positions
//! and rotations of records that already exist.

use std::collections::HashMap;

use dungeon_shared::{math::Vec2, protocol::EntityId, render::VisualHandle};

/// Spin state. Present means active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub phase: f32,
}

/// Constant-velocity motion re-anchored at every snapshot that carries it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Pixel position when the vector was (re)established.
    pub origin: Vec2,
    /// Tiles per server tick.
    pub dx: f32,
    pub dy: f32,
}

/// One renderable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub handle: VisualHandle,
    pub texture: String,
    pub position: Vec2,
    pub rotation: f32,
    pub z_order: i32,
    pub spin: Option<Spin>,
    pub motion: Option<Motion>,
    /// Registry insertion sequence; breaks draw-order ties.
    seq: u64,
}

/// Live entities of the current session.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
    next_seq: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Inserts a fresh record. Callers check for an existing id first.
    pub(crate) fn insert(
        &mut self,
        id: EntityId,
        handle: VisualHandle,
        texture: String,
        z_order: i32,
    ) -> &mut Entity {
        let seq = self.next_seq;
        self.next_seq += 1;
        debug_assert!(!self.entities.contains_key(&id), "duplicate entity id {id}");
        self.entities.entry(id).or_insert(Entity {
            id,
            handle,
            texture,
            position: Vec2::ZERO,
            rotation: 0.0,
            z_order,
            spin: None,
            motion: None,
            seq,
        })
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Removes every record, returning them.
    pub(crate) fn drain(&mut self) -> Vec<Entity> {
        self.entities.drain().map(|(_, e)| e).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Entities back to front: ascending z, then insertion order.
    pub fn draw_order(&self) -> Vec<&Entity> {
        let mut ordered: Vec<&Entity> = self.entities.values().collect();
        ordered.sort_by_key(|e| (e.z_order, e.seq));
        ordered
    }
}
