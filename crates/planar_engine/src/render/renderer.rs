//! Frame renderer
//!
//! Owns the device backend privately, so every fixed-function state change
//! is forced through the [`RenderStateCache`]. One frame is
//! update → cull → draw, optionally with a [`GlobalEffect`] layered over
//! the plain draw.

use crate::config::RendererConfig;
use crate::render::api::{DrawCall, ObjectUniforms, RenderBackend};
use crate::render::context::RenderContext;
use crate::render::effect::Effect;
use crate::render::planar::{GlobalEffect, PlanarReport};
use crate::render::primitives::Camera;
use crate::render::state::{ColorMask, DepthState, RenderStateCache, RenderStates};
use crate::render::{RenderError, RenderResult};
use crate::scene::{Culler, NodeId, SceneGraph, VisibleSet};

/// Counters for one rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Mesh leaves that survived culling
    pub visible: usize,
    /// Draw calls issued, across all passes
    pub draw_calls: u64,
    /// Device state calls issued by the cache
    pub state_calls: u64,
    /// Planar effect planes that ran all their passes
    pub planes_drawn: usize,
    /// Planar effect planes skipped for geometric reasons
    pub planes_skipped: usize,
}

/// Draws scene graphs through a backend
#[derive(Debug)]
pub struct Renderer<B: RenderBackend> {
    backend: B,
    cache: RenderStateCache,
    camera: Camera,
    config: RendererConfig,
    draw_calls: u64,
}

impl<B: RenderBackend> Renderer<B> {
    /// Take ownership of a backend and push a known state to it
    pub fn new(mut backend: B, camera: Camera, config: RendererConfig) -> RenderResult<Self> {
        config.validate()?;
        let cache = RenderStateCache::synchronized(&mut backend, &config);
        log::info!(
            "Renderer ready: {} stencil bits, depth range {:?}",
            config.stencil_bits,
            config.default_depth_range
        );
        Ok(Self { backend, cache, camera, config, draw_calls: 0 })
    }

    /// Read-only access to the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Give the backend back
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Mutable access to the backend for code inside the crate (tests)
    #[cfg(test)]
    pub(crate) fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The state cache mirror
    pub fn cache(&self) -> &RenderStateCache {
        &self.cache
    }

    /// Camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Configuration the renderer was created with
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Total draw calls issued
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Apply one descriptor of each category, letting the context's
    /// override slots win
    pub fn apply_states(&mut self, states: &RenderStates, ctx: &RenderContext) {
        let backend = &mut self.backend;
        self.cache.apply_alpha(backend, &states.alpha, ctx.alpha.as_ref());
        self.cache.apply_cull(backend, &states.cull, ctx.cull.as_ref(), ctx.reverse_cull_order);
        self.cache.apply_depth(backend, &states.depth, ctx.depth.as_ref());
        self.cache.apply_offset(backend, &states.offset, ctx.offset.as_ref());
        self.cache.apply_stencil(backend, &states.stencil, ctx.stencil.as_ref());
    }

    /// Apply a depth state on its own, outside any draw
    pub fn apply_depth_state(&mut self, state: &DepthState) {
        self.cache.apply_depth(&mut self.backend, state, None);
    }

    /// Select which color channels are written
    pub fn set_color_mask(&mut self, mask: ColorMask) {
        self.cache.set_color_mask(&mut self.backend, mask);
    }

    /// Set the depth range, returning the previous one
    pub fn set_depth_range(&mut self, near: f32, far: f32) -> (f32, f32) {
        self.cache.set_depth_range(&mut self.backend, near, far)
    }

    /// Reset the stencil buffer so plane tags do not leak into later frames
    pub fn clear_stencil(&mut self) {
        self.backend.clear_stencil(0);
    }

    /// Draw one mesh leaf.
    ///
    /// The effect is chosen as context override, then `entry_effect`, then
    /// the leaf's own effect.
    pub fn draw_node(
        &mut self,
        scene: &SceneGraph,
        id: NodeId,
        entry_effect: Option<&Effect>,
        ctx: &RenderContext,
    ) -> RenderResult<()> {
        let node = scene.node(id)?;
        let (Some(mesh), Some(own_effect)) = (node.mesh(), node.effect()) else {
            return Err(RenderError::NotAMesh(node.name().to_string()));
        };
        let effect = ctx.effect.as_ref().or(entry_effect).unwrap_or(own_effect);

        self.apply_states(&effect.states, ctx);

        let world = *node.world();
        let model_view_projection = self.camera.get_projection_view_matrix() * world;
        let call = DrawCall {
            node: id,
            name: node.name(),
            mesh,
            effect: &effect.kind,
            world,
            pre_view: self.camera.pre_view_or_identity(),
            uniforms: ObjectUniforms {
                model_view_projection: model_view_projection.into(),
                world: world.into(),
                diffuse: effect.kind.diffuse().into(),
            },
        };
        self.backend.draw(&call)?;
        self.draw_calls += 1;
        Ok(())
    }

    /// Draw every entry of a visible set in order. Returns the number of
    /// draws issued.
    pub fn draw_visible_set(
        &mut self,
        scene: &SceneGraph,
        visible: &VisibleSet,
        ctx: &RenderContext,
    ) -> RenderResult<usize> {
        for entry in visible.entries() {
            self.draw_node(scene, entry.node, entry.effect.as_ref(), ctx)?;
        }
        Ok(visible.len())
    }

    /// Run one frame: update the scene, cull against the camera and draw,
    /// through `effect` when one is given.
    pub fn render_frame(
        &mut self,
        scene: &mut SceneGraph,
        culler: &mut Culler,
        root: NodeId,
        time: f64,
        effect: Option<&GlobalEffect>,
    ) -> RenderResult<FrameStats> {
        let state_calls_before = self.cache.calls_emitted();
        let draw_calls_before = self.draw_calls;

        scene.update(time);
        let scene: &SceneGraph = scene;
        culler.set_frustum(&self.camera.frustum());
        let visible = culler.compute_visible_set(scene, root)?;

        let report = match effect {
            Some(effect) => effect.draw(self, scene, visible)?,
            None => {
                self.draw_visible_set(scene, visible, &RenderContext::new())?;
                PlanarReport::default()
            }
        };

        let stats = FrameStats {
            visible: visible.len(),
            draw_calls: self.draw_calls - draw_calls_before,
            state_calls: self.cache.calls_emitted() - state_calls_before,
            planes_drawn: report.drawn(),
            planes_skipped: report.skipped(),
        };
        log::debug!(
            "Frame at t={time:.3}: {} visible, {} draws, {} state calls, {} planes drawn, {} skipped",
            stats.visible,
            stats.draw_calls,
            stats.state_calls,
            stats.planes_drawn,
            stats.planes_skipped
        );
        Ok(stats)
    }
}
