//! Planar mirrors
//!
//! Per mirror: tag its visible pixels in the stencil buffer, push the depth
//! under those pixels to the far plane, draw the scene reflected across the
//! mirror plane into the tagged pixels, then blend the mirror itself over
//! the reflection with the configured reflectance.

use crate::foundation::math::{is_finite_matrix, Mat4};
use crate::render::api::RenderBackend;
use crate::render::context::RenderContext;
use crate::render::renderer::Renderer;
use crate::render::state::{
    AlphaState, BlendFactor, ColorMask, CompareFunction, DepthState, StencilOp, StencilState,
};
use crate::render::{RenderError, RenderResult};
use crate::scene::{NodeId, Plane, SceneGraph, VisibleSet};

use super::{
    finish_frame, model_plane, reflection_matrix, stencil_mark_pass, stencil_reference,
    validate_planes, world_plane, GeometryRejection, PlanarReport, PlaneOutcome, PlanePhase,
};

/// One mirror and how strongly it reflects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionPlane {
    /// Mesh leaf whose first triangle defines the mirror plane
    pub plane: NodeId,
    /// Fraction of the reflected image that shows through, in [0, 1]
    pub reflectance: f32,
}

/// Mirror plane in both spaces, each derived from its own triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MirrorPlanes {
    /// Plane through the model-space triangle
    pub model: Plane,
    /// Plane through the world-space triangle
    pub world: Plane,
}

/// Any number of planar mirrors
#[derive(Debug, Clone, Default)]
pub struct PlanarReflectionEffect {
    planes: Vec<ReflectionPlane>,
}

fn clamp_reflectance(reflectance: f32) -> f32 {
    let clamped = reflectance.clamp(0.0, 1.0);
    if !(0.0..=1.0).contains(&reflectance) {
        log::warn!("Reflectance {reflectance} clamped to {clamped}");
    }
    clamped
}

impl PlanarReflectionEffect {
    /// Effect without mirrors
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mirror, returning its index. Reflectance is clamped to [0, 1].
    pub fn add_plane(&mut self, plane: NodeId, reflectance: f32) -> usize {
        self.planes.push(ReflectionPlane { plane, reflectance: clamp_reflectance(reflectance) });
        self.planes.len() - 1
    }

    /// Builder form of [`add_plane`](Self::add_plane)
    pub fn with_plane(mut self, plane: NodeId, reflectance: f32) -> Self {
        self.add_plane(plane, reflectance);
        self
    }

    /// Number of configured mirrors
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Mirror configuration at `index`
    pub fn plane(&self, index: usize) -> RenderResult<&ReflectionPlane> {
        self.planes.get(index).ok_or(RenderError::PlaneIndexOutOfRange {
            index,
            count: self.planes.len(),
        })
    }

    /// Change the reflectance of mirror `index`
    pub fn set_reflectance(&mut self, index: usize, reflectance: f32) -> RenderResult<()> {
        let count = self.planes.len();
        let plane = self
            .planes
            .get_mut(index)
            .ok_or(RenderError::PlaneIndexOutOfRange { index, count })?;
        plane.reflectance = clamp_reflectance(reflectance);
        Ok(())
    }

    /// Model and world planes of mirror `index`; `None` when either
    /// triangle is degenerate
    pub fn mirror_planes(&self, scene: &SceneGraph, index: usize) -> RenderResult<Option<MirrorPlanes>> {
        let config = self.plane(index)?;
        let model = model_plane(scene, config.plane)?;
        let world = world_plane(scene, config.plane)?;
        Ok(model.zip(world).map(|(model, world)| MirrorPlanes { model, world }))
    }

    /// World-space reflection for mirror `index`, or why it cannot be drawn
    pub fn reflection(&self, scene: &SceneGraph, index: usize) -> RenderResult<Result<Mat4, GeometryRejection>> {
        let Some(planes) = self.mirror_planes(scene, index)? else {
            return Ok(Err(GeometryRejection::DegeneratePlane));
        };
        let matrix = reflection_matrix(&planes.world);
        if is_finite_matrix(&matrix) {
            Ok(Ok(matrix))
        } else {
            Ok(Err(GeometryRejection::NonFiniteProjection))
        }
    }

    /// Draw every mirror's passes, then the visible set
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
        scene: &SceneGraph,
        visible: &VisibleSet,
    ) -> RenderResult<PlanarReport> {
        validate_planes(scene, self.planes.iter().map(|p| p.plane), renderer.config())?;

        let mut report = PlanarReport::default();
        for (index, config) in self.planes.iter().enumerate() {
            let reference = stencil_reference(index);

            log::trace!("Mirror {index}: {:?}", PlanePhase::StencilMark);
            stencil_mark_pass(renderer, scene, config.plane, reference)?;

            log::trace!("Mirror {index}: {:?}", PlanePhase::Project);
            let reflection = match self.reflection(scene, index)? {
                Ok(matrix) => matrix,
                Err(reason) => {
                    renderer.set_color_mask(ColorMask::all());
                    log::trace!("Mirror {index} skipped this frame: {reason:?}");
                    report.outcomes.push(PlaneOutcome::Skipped { phase: PlanePhase::StencilMark, reason });
                    continue;
                }
            };

            let eye = renderer.camera().eye();
            log::trace!("Mirror {index}: eye {:?} reflects to {:?}", eye, reflection.transform_point(&eye));

            Self::push_depth(renderer, scene, config.plane, reference)?;
            renderer.set_color_mask(ColorMask::all());

            log::trace!("Mirror {index}: {:?}", PlanePhase::Redraw);
            renderer.camera_mut().set_pre_view_matrix(reflection);
            let redrawn = Self::draw_reflected(renderer, scene, visible, config.plane, reference);
            renderer.camera_mut().clear_pre_view_matrix();
            let redraws = redrawn?;

            Self::composite(renderer, scene, config, reference)?;
            report.outcomes.push(PlaneOutcome::Drawn { redraws });
        }

        log::trace!("Reflection effect: {:?}", PlanePhase::Restore);
        finish_frame(renderer, scene, visible)?;
        Ok(report)
    }

    /// Redraw the mirror at the far plane wherever it is tagged, so the
    /// reflected scene depth-tests against an empty background
    fn push_depth<B: RenderBackend>(
        renderer: &mut Renderer<B>,
        scene: &SceneGraph,
        mirror: NodeId,
        reference: u32,
    ) -> RenderResult<()> {
        let ctx = RenderContext {
            stencil: Some(StencilState::equal(reference, StencilOp::Keep)),
            depth: Some(DepthState { enabled: true, writable: true, compare: CompareFunction::Always }),
            ..RenderContext::new()
        };
        let prior_depth = *renderer.cache().depth();
        let previous = renderer.set_depth_range(1.0, 1.0);
        let pushed = renderer.draw_node(scene, mirror, None, &ctx);
        renderer.set_depth_range(previous.0, previous.1);
        renderer.apply_depth_state(&prior_depth);
        pushed
    }

    fn draw_reflected<B: RenderBackend>(
        renderer: &mut Renderer<B>,
        scene: &SceneGraph,
        visible: &VisibleSet,
        mirror: NodeId,
        reference: u32,
    ) -> RenderResult<usize> {
        let ctx = RenderContext {
            stencil: Some(StencilState::equal(reference, StencilOp::Keep)),
            reverse_cull_order: true,
            ..RenderContext::new()
        };
        let mut redraws = 0;
        for entry in visible.entries() {
            if entry.node == mirror {
                continue;
            }
            renderer.draw_node(scene, entry.node, entry.effect.as_ref(), &ctx)?;
            redraws += 1;
        }
        Ok(redraws)
    }

    /// Blend the mirror over its reflection and invert the tag so the
    /// footprint no longer matches this reference
    fn composite<B: RenderBackend>(
        renderer: &mut Renderer<B>,
        scene: &SceneGraph,
        config: &ReflectionPlane,
        reference: u32,
    ) -> RenderResult<()> {
        let ctx = RenderContext {
            alpha: Some(AlphaState {
                blend_enabled: true,
                src_blend: BlendFactor::OneMinusConstantAlpha,
                dst_blend: BlendFactor::ConstantAlpha,
                constant_color: [0.0, 0.0, 0.0, config.reflectance],
                ..AlphaState::default()
            }),
            stencil: Some(StencilState::equal(reference, StencilOp::Invert)),
            ..RenderContext::new()
        };
        renderer.draw_node(scene, config.plane, None, &ctx)
    }
}
