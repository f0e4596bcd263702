//! Snapshot synchronization.
//!
//! The server pushes whole snapshots; the client keeps a registry of live
//! entities and reconciles it against each one. All registry membership
//! changes go through [`EntitySynchronizer::apply_snapshot`] and
//! [`EntitySynchronizer::clear`].

use std::collections::HashSet;
use std::time::Instant;

use dungeon_shared::{
    config::{ClientConfig, RemovalPolicy},
    math::{TileSpace, Vec2, QUARTER_TURN},
    protocol::{EntityId, PlayerStats, RenderMessage, SpriteState, SpriteUpdate},
    render::{Renderer, VisualHandle},
};
use tracing::{debug, trace};

use crate::registry::{Entity, EntityRegistry, Motion, Spin};

/// Time since the last applied snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SnapshotClock {
    /// Seconds accumulated by frame ticks since the last reset.
    pub elapsed: f32,
    /// Wall time of the last reset.
    pub anchored_at: Option<Instant>,
}

impl SnapshotClock {
    pub fn reset(&mut self, now: Instant) {
        self.elapsed = 0.0;
        self.anchored_at = Some(now);
    }

    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt;
        self.elapsed
    }
}

/// What one snapshot changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub created: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    /// Descriptors that hit an already registered entity.
    pub updated: usize,
}

/// Owns the entity registry and applies snapshots to it.
pub struct EntitySynchronizer {
    registry: EntityRegistry,
    policy: RemovalPolicy,
    tiles: TileSpace,
    clock: SnapshotClock,
    stats: PlayerStats,
    snapshots: u64,
}

impl EntitySynchronizer {
    pub fn new(policy: RemovalPolicy, tiles: TileSpace) -> Self {
        Self {
            registry: EntityRegistry::new(),
            policy,
            tiles,
            clock: SnapshotClock::default(),
            stats: PlayerStats::default(),
            snapshots: 0,
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(cfg.removal, cfg.tile_space())
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    pub fn policy(&self) -> RemovalPolicy {
        self.policy
    }

    pub fn tile_space(&self) -> TileSpace {
        self.tiles
    }

    pub fn clock(&self) -> SnapshotClock {
        self.clock
    }

    /// Snapshots applied since the last clear.
    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots
    }

    /// Registry and clock together, for the extrapolator.
    pub(crate) fn motion_state_mut(&mut self) -> (&mut EntityRegistry, &mut SnapshotClock) {
        (&mut self.registry, &mut self.clock)
    }

    /// Reconciles the registry against one authoritative snapshot.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &RenderMessage,
        now: Instant,
        renderer: &mut dyn Renderer,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let mut seen = HashSet::with_capacity(snapshot.sprites.len());

        for update in &snapshot.sprites {
            match update {
                SpriteUpdate::Destroy(id) => match self.policy {
                    RemovalPolicy::ExplicitDestroy => {
                        if self.remove(*id, renderer) {
                            report.removed.push(*id);
                        }
                    }
                    RemovalPolicy::Absence => {
                        trace!(id = %id, "Destroy flag under absence policy; left to sweep");
                    }
                },
                SpriteUpdate::Upsert(sprite) => {
                    seen.insert(sprite.id);
                    self.upsert(sprite, renderer, &mut report);
                }
            }
        }

        if self.policy == RemovalPolicy::Absence {
            let mut stale: Vec<EntityId> = self
                .registry
                .iter()
                .map(|e| e.id)
                .filter(|id| !seen.contains(id))
                .collect();
            stale.sort();
            for id in stale {
                self.remove(id, renderer);
                report.removed.push(id);
            }
        }

        self.publish_draw_order(renderer);
        self.clock.reset(now);
        self.stats = snapshot.stats;
        self.snapshots += 1;

        debug!(
            created = report.created.len(),
            removed = report.removed.len(),
            updated = report.updated,
            live = self.registry.len(),
            "Snapshot applied"
        );
        report
    }

    /// Destroys every visual and forgets every entity.
    pub fn clear(&mut self, renderer: &mut dyn Renderer) -> usize {
        let drained = self.registry.drain();
        for entity in &drained {
            renderer.destroy_visual(entity.handle);
        }
        if !drained.is_empty() {
            renderer.set_draw_order(&[]);
        }
        self.clock = SnapshotClock::default();
        self.stats = PlayerStats::default();
        self.snapshots = 0;
        drained.len()
    }

    fn upsert(&mut self, sprite: &SpriteState, renderer: &mut dyn Renderer, report: &mut SyncReport) {
        let position = self.tiles.to_pixel(sprite.x, sprite.y);
        if let Some(entity) = self.registry.get_mut(sprite.id) {
            if entity.texture != sprite.texture {
                entity.texture = sprite.texture.clone();
                renderer.set_texture(entity.handle, &sprite.texture);
            }
            report.updated += 1;
            refresh(entity, sprite, position, renderer);
        } else {
            debug!(id = %sprite.id, texture = %sprite.texture, "Adding sprite");
            let handle = renderer.create_visual(&sprite.texture);
            let entity = self
                .registry
                .insert(sprite.id, handle, sprite.texture.clone(), sprite.z);
            report.created.push(sprite.id);
            refresh(entity, sprite, position, renderer);
        }
    }

    fn remove(&mut self, id: EntityId, renderer: &mut dyn Renderer) -> bool {
        match self.registry.remove(id) {
            Some(entity) => {
                debug!(id = %id, "Removing sprite");
                renderer.destroy_visual(entity.handle);
                true
            }
            None => false,
        }
    }

    fn publish_draw_order(&self, renderer: &mut dyn Renderer) {
        let order: Vec<VisualHandle> = self
            .registry
            .draw_order()
            .into_iter()
            .map(|e| e.handle)
            .collect();
        renderer.set_draw_order(&order);
    }
}

/// Writes the snapshot-derived state of one sprite onto its entity.
fn refresh(entity: &mut Entity, sprite: &SpriteState, position: Vec2, renderer: &mut dyn Renderer) {
    entity.position = position;
    renderer.set_anchor_center(entity.handle);
    renderer.set_position(entity.handle, position.x, position.y);

    if let Some(phase) = sprite.spin_phase {
        entity.spin = Some(Spin { phase });
        entity.rotation = phase * QUARTER_TURN;
        renderer.set_rotation(entity.handle, entity.rotation);
    }

    entity.motion = match (sprite.motion, entity.motion) {
        (Some(v), _) => Some(Motion {
            origin: position,
            dx: v.dx,
            dy: v.dy,
        }),
        // Velocity carries over, but the origin moves with the clock reset.
        (None, Some(prev)) => Some(Motion {
            origin: position,
            ..prev
        }),
        (None, None) => None,
    };
}
