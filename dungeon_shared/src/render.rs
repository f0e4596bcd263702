//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend. The
//! synchronization core drives any type implementing [`Renderer`]; the
//! renderer only holds opaque visuals it is told to create and destroy and
//! never decides an entity's lifetime on its own.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::math::Vec2;

/// Opaque handle to one visual owned by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(pub u64);

/// The calls the synchronization core makes against a backend.
pub trait Renderer {
    /// Allocates a visual for a texture key. Unknown keys are the backend's
    /// problem; it must still hand back a handle.
    fn create_visual(&mut self, texture: &str) -> VisualHandle;
    fn destroy_visual(&mut self, handle: VisualHandle);
    fn set_position(&mut self, handle: VisualHandle, x: f32, y: f32);
    fn set_rotation(&mut self, handle: VisualHandle, radians: f32);
    fn set_texture(&mut self, handle: VisualHandle, texture: &str);
    /// Back-to-front paint order.
    fn set_draw_order(&mut self, order: &[VisualHandle]);
    /// Anchors the visual at its center so rotation pivots in place.
    fn set_anchor_center(&mut self, _handle: VisualHandle) {}
}

/// A no-op renderer useful for headless runs.
#[derive(Default)]
pub struct NullRenderer {
    next: u64,
}

impl Renderer for NullRenderer {
    fn create_visual(&mut self, _texture: &str) -> VisualHandle {
        self.next += 1;
        VisualHandle(self.next)
    }
    fn destroy_visual(&mut self, _handle: VisualHandle) {}
    fn set_position(&mut self, _handle: VisualHandle, _x: f32, _y: f32) {}
    fn set_rotation(&mut self, _handle: VisualHandle, _radians: f32) {}
    fn set_texture(&mut self, _handle: VisualHandle, _texture: &str) {}
    fn set_draw_order(&mut self, _order: &[VisualHandle]) {}
}

/// One call made against a [`SceneRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Create(VisualHandle, String),
    Destroy(VisualHandle),
    Position(VisualHandle, Vec2),
    Rotation(VisualHandle, f32),
    Texture(VisualHandle, String),
    DrawOrder(Vec<VisualHandle>),
    AnchorCenter(VisualHandle),
}

/// Retained state of one visual.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub texture: String,
    pub position: Vec2,
    pub rotation: f32,
    pub centered: bool,
    /// False when the texture key was not in the known set.
    pub resolved: bool,
}

/// Headless retained-mode backend.
///
/// Keeps the full scene (visuals and paint order). A log of every call is
/// kept only when enabled with [`SceneRenderer::recording`]; otherwise the
/// scene's memory is bounded by the number of live visuals.
#[derive(Default)]
pub struct SceneRenderer {
    next: u64,
    known_textures: Option<HashSet<String>>,
    visuals: HashMap<VisualHandle, Visual>,
    draw_order: Vec<VisualHandle>,
    record: bool,
    calls: Vec<RenderCall>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts resolvable textures to `keys`; anything else is drawn as a
    /// placeholder and logged.
    pub fn with_textures<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_textures: Some(keys.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Turns on the call log.
    pub fn recording(mut self) -> Self {
        self.record = true;
        self
    }

    fn log(&mut self, call: RenderCall) {
        if self.record {
            self.calls.push(call);
        }
    }

    fn resolve(&self, texture: &str) -> bool {
        match &self.known_textures {
            Some(known) if !known.contains(texture) => {
                warn!(texture, "Unknown texture key, drawing placeholder");
                false
            }
            _ => true,
        }
    }

    pub fn visual(&self, handle: VisualHandle) -> Option<&Visual> {
        self.visuals.get(&handle)
    }

    /// Number of live visuals.
    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    pub fn draw_order(&self) -> &[VisualHandle] {
        &self.draw_order
    }

    /// Logged calls. Always empty unless recording.
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Drains the call log.
    pub fn take_calls(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    /// Counts logged calls matching a predicate.
    pub fn count_calls(&self, pred: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Renderer for SceneRenderer {
    fn create_visual(&mut self, texture: &str) -> VisualHandle {
        self.next += 1;
        let handle = VisualHandle(self.next);
        let resolved = self.resolve(texture);
        self.visuals.insert(
            handle,
            Visual {
                texture: texture.to_string(),
                position: Vec2::ZERO,
                rotation: 0.0,
                centered: false,
                resolved,
            },
        );
        self.log(RenderCall::Create(handle, texture.to_string()));
        handle
    }

    fn destroy_visual(&mut self, handle: VisualHandle) {
        if self.visuals.remove(&handle).is_none() {
            debug!(?handle, "Destroy for unknown visual");
        }
        self.draw_order.retain(|h| *h != handle);
        self.log(RenderCall::Destroy(handle));
    }

    fn set_position(&mut self, handle: VisualHandle, x: f32, y: f32) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.position = Vec2::new(x, y);
        }
        self.log(RenderCall::Position(handle, Vec2::new(x, y)));
    }

    fn set_rotation(&mut self, handle: VisualHandle, radians: f32) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.rotation = radians;
        }
        self.log(RenderCall::Rotation(handle, radians));
    }

    fn set_texture(&mut self, handle: VisualHandle, texture: &str) {
        let resolved = self.resolve(texture);
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.texture = texture.to_string();
            v.resolved = resolved;
        }
        self.log(RenderCall::Texture(handle, texture.to_string()));
    }

    fn set_draw_order(&mut self, order: &[VisualHandle]) {
        self.draw_order = order.to_vec();
        self.log(RenderCall::DrawOrder(order.to_vec()));
    }

    fn set_anchor_center(&mut self, handle: VisualHandle) {
        if let Some(v) = self.visuals.get_mut(&handle) {
            v.centered = true;
        }
        self.log(RenderCall::AnchorCenter(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_tracks_visual_state() {
        let mut scene = SceneRenderer::new().recording();
        let h = scene.create_visual("hero");
        scene.set_position(h, 3.0, 4.0);
        scene.set_rotation(h, 1.5);
        scene.set_anchor_center(h);
        let v = scene.visual(h).unwrap();
        assert_eq!(v.position, Vec2::new(3.0, 4.0));
        assert_eq!(v.rotation, 1.5);
        assert!(v.centered);

        scene.set_draw_order(&[h]);
        scene.destroy_visual(h);
        assert!(scene.is_empty());
        assert!(scene.draw_order().is_empty());
        assert_eq!(scene.count_calls(|c| matches!(c, RenderCall::Destroy(_))), 1);
    }

    #[test]
    fn unknown_texture_still_gets_a_visual() {
        let mut scene = SceneRenderer::with_textures(["hero", "wall"]);
        let known = scene.create_visual("wall");
        let unknown = scene.create_visual("dragon");
        assert!(scene.visual(known).unwrap().resolved);
        assert!(!scene.visual(unknown).unwrap().resolved);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn call_log_is_off_by_default() {
        let mut scene = SceneRenderer::with_textures(["axe"]);
        let h = scene.create_visual("axe");
        for i in 0..10_000 {
            scene.set_position(h, i as f32, 0.0);
            scene.set_rotation(h, i as f32);
            scene.set_draw_order(&[h]);
        }
        assert!(scene.calls().is_empty());
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.visual(h).unwrap().position, Vec2::new(9_999.0, 0.0));
        assert_eq!(scene.draw_order(), &[h]);
    }

    #[test]
    fn null_renderer_hands_out_distinct_handles() {
        let mut r = NullRenderer::default();
        assert_ne!(r.create_visual("a"), r.create_visual("a"));
    }
}
