//! Motion extrapolation.
//!
//! The server sends discrete snapshots at its own tick rate while the client
//! renders every frame. Between snapshots, entities carrying a motion vector
//! are dead-reckoned at constant velocity and spinning entities are rotated
//! from their phase. Nothing is eased or clamped: the next snapshot re-anchors
//! every origin and the visual snaps to the authoritative position.

use dungeon_shared::{
    config::ClientConfig,
    math::{Vec2, QUARTER_TURN},
    render::Renderer,
};

use crate::sync::EntitySynchronizer;

/// Per-frame dead reckoning over the synchronizer's registry.
#[derive(Debug, Clone, Copy)]
pub struct MotionExtrapolator {
    /// Snapshots per second the server targets.
    pub server_tick_rate: f32,
    /// Pixels per tile.
    pub tile_scale: f32,
}

impl MotionExtrapolator {
    pub fn new(server_tick_rate: f32, tile_scale: f32) -> Self {
        Self {
            server_tick_rate,
            tile_scale,
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(cfg.server_tick_rate, cfg.tile_scale)
    }

    /// Advances the snapshot clock by `frame_delta_seconds` and pushes the
    /// extrapolated pose of every moving or spinning entity. Returns how many
    /// entities were touched.
    pub fn tick(
        &self,
        frame_delta_seconds: f32,
        sync: &mut EntitySynchronizer,
        renderer: &mut dyn Renderer,
    ) -> usize {
        let (registry, clock) = sync.motion_state_mut();
        let frame_delta = clock.advance(frame_delta_seconds) * self.server_tick_rate;
        let distance = frame_delta * self.tile_scale;

        let mut touched = 0;
        for entity in registry.iter_mut() {
            let mut moved = false;
            if let Some(spin) = entity.spin {
                entity.rotation = (spin.phase + frame_delta) * QUARTER_TURN;
                renderer.set_rotation(entity.handle, entity.rotation);
                moved = true;
            }
            if let Some(motion) = entity.motion {
                entity.position = motion.origin + Vec2::new(motion.dx, motion.dy) * distance;
                renderer.set_position(entity.handle, entity.position.x, entity.position.y);
                moved = true;
            }
            if moved {
                touched += 1;
            }
        }
        touched
    }
}
