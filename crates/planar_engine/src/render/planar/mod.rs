//! Planar stencil effects
//!
//! Both effects run the same per-plane sequence, strictly one plane after
//! another:
//!
//! ```text
//! Idle → StencilMark → (skip if geometry rejects) → Project → Redraw → Restore
//! ```
//!
//! Plane `i` tags its footprint in the stencil buffer with reference
//! `i + 1`. After the last plane every override is dropped and the whole
//! visible set is drawn normally; the planar passes are an overlay.

pub mod projection;
pub mod reflection;
pub mod shadow;

#[cfg(test)]
mod planar_tests;

pub use projection::{oblique_projection, perspective_projection_onto_plane, reflection_matrix};
pub use reflection::{PlanarReflectionEffect, ReflectionPlane};
pub use shadow::{PlanarShadowEffect, ShadowPlane};

use std::collections::HashSet;

use crate::config::RendererConfig;
use crate::render::api::RenderBackend;
use crate::render::context::RenderContext;
use crate::render::renderer::Renderer;
use crate::render::state::{ColorMask, CompareFunction, DepthState, StencilState};
use crate::render::{RenderError, RenderResult};
use crate::scene::{NodeId, Plane, SceneError, SceneGraph, VisibleSet};

/// Step of the per-plane sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanePhase {
    /// Nothing issued for this plane yet
    Idle,
    /// Tagging the plane's visible pixels in the stencil buffer
    StencilMark,
    /// Building the shadow projection or the mirror reflection
    Project,
    /// Drawing projected casters, reflected geometry or the composite
    Redraw,
    /// Dropping overrides after the plane
    Restore,
}

/// Why a plane was skipped for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryRejection {
    /// The plane's first triangle is collinear or missing
    DegeneratePlane,
    /// The caster lies entirely on the plane's back side
    CasterBehindPlane,
    /// A directional light is parallel to the plane or shines on its back
    LightDirectionAway,
    /// A point or spot light is on or behind the plane
    LightBehindPlane,
    /// The projection produced non-finite values
    NonFiniteProjection,
}

/// What happened to one plane in one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneOutcome {
    /// All passes ran; `redraws` projected or reflected draws were issued
    Drawn {
        /// Draws issued in the redraw pass
        redraws: usize,
    },
    /// Passes after `phase` were skipped
    Skipped {
        /// Last phase that ran
        phase: PlanePhase,
        /// Rejection reason
        reason: GeometryRejection,
    },
}

/// Per-plane outcomes of one planar effect draw
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanarReport {
    /// Outcome of plane `i` at index `i`
    pub outcomes: Vec<PlaneOutcome>,
}

impl PlanarReport {
    /// Planes that ran every pass
    pub fn drawn(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, PlaneOutcome::Drawn { .. }))
            .count()
    }

    /// Planes skipped for geometric reasons
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.drawn()
    }
}

/// Effect applied to a whole frame instead of a single drawable
#[derive(Debug, Clone)]
pub enum GlobalEffect {
    /// Projected planar shadows
    Shadow(PlanarShadowEffect),
    /// Planar mirrors
    Reflection(PlanarReflectionEffect),
}

impl GlobalEffect {
    /// Draw the visible set through this effect
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
        scene: &SceneGraph,
        visible: &VisibleSet,
    ) -> RenderResult<PlanarReport> {
        match self {
            Self::Shadow(effect) => effect.draw(renderer, scene, visible),
            Self::Reflection(effect) => effect.draw(renderer, scene, visible),
        }
    }
}

impl From<PlanarShadowEffect> for GlobalEffect {
    fn from(effect: PlanarShadowEffect) -> Self {
        Self::Shadow(effect)
    }
}

impl From<PlanarReflectionEffect> for GlobalEffect {
    fn from(effect: PlanarReflectionEffect) -> Self {
        Self::Reflection(effect)
    }
}

/// Stencil reference that tags plane `index`
pub fn stencil_reference(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Check plane drawables before any device call: every plane must be a
/// distinct mesh leaf and every reference must fit the stencil buffer.
pub(crate) fn validate_planes(
    scene: &SceneGraph,
    planes: impl ExactSizeIterator<Item = NodeId>,
    config: &RendererConfig,
) -> RenderResult<()> {
    let count = planes.len();
    let max = config.max_stencil_reference();
    if u32::try_from(count).map_or(true, |count| count > max) {
        return Err(RenderError::StencilReferenceOverflow { planes: count, max });
    }

    let mut seen = HashSet::with_capacity(count);
    for plane in planes {
        let node = scene.node(plane)?;
        if !node.is_mesh() {
            return Err(RenderError::NotAMesh(node.name().to_string()));
        }
        if !seen.insert(plane) {
            return Err(RenderError::DuplicatePlane(node.name().to_string()));
        }
    }
    Ok(())
}

/// World-space plane through the drawable's first triangle, `None` when
/// that triangle is missing or degenerate
pub(crate) fn world_plane(scene: &SceneGraph, node: NodeId) -> RenderResult<Option<Plane>> {
    match scene.world_triangle(node, 0) {
        Ok([a, b, c]) => Ok(Plane::from_points(a, b, c)),
        Err(SceneError::TriangleOutOfRange { .. }) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Model-space plane through the drawable's first triangle
pub(crate) fn model_plane(scene: &SceneGraph, node: NodeId) -> RenderResult<Option<Plane>> {
    match scene.model_triangle(node, 0) {
        Ok([a, b, c]) => Ok(Plane::from_points(a, b, c)),
        Err(SceneError::TriangleOutOfRange { .. }) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Depth state for passes that test against the scene without writing
pub(crate) fn read_only_depth() -> DepthState {
    DepthState { enabled: true, writable: false, compare: CompareFunction::LessEqual }
}

/// Tag the pixels where `plane` is visible with `reference`. Color writes
/// are left disabled; callers restore them.
pub(crate) fn stencil_mark_pass<B: RenderBackend>(
    renderer: &mut Renderer<B>,
    scene: &SceneGraph,
    plane: NodeId,
    reference: u32,
) -> RenderResult<()> {
    let ctx = RenderContext {
        stencil: Some(StencilState::mark(reference)),
        depth: Some(read_only_depth()),
        ..RenderContext::new()
    };
    renderer.set_color_mask(ColorMask::empty());
    renderer.draw_node(scene, plane, None, &ctx)
}

/// Drop every override, clear the plane tags and draw the visible set
/// normally
pub(crate) fn finish_frame<B: RenderBackend>(
    renderer: &mut Renderer<B>,
    scene: &SceneGraph,
    visible: &VisibleSet,
) -> RenderResult<()> {
    renderer.camera_mut().clear_pre_view_matrix();
    renderer.set_color_mask(ColorMask::all());
    renderer.clear_stencil();
    renderer.draw_visible_set(scene, visible, &RenderContext::new())?;
    Ok(())
}
