//! Planar projected shadows
//!
//! For each shadow plane the caster's visible geometry is flattened onto
//! the plane through the camera's pre-view matrix and drawn as a flat
//! translucent color, restricted by the stencil buffer to the pixels where
//! the plane itself is visible. Drawing the projected pixels resets their
//! stencil tag, so overlapping caster triangles darken the plane only once.

use std::collections::HashSet;

use crate::foundation::math::{is_finite_matrix, Mat4, Point3, Vec4};
use crate::render::api::RenderBackend;
use crate::render::context::RenderContext;
use crate::render::effect::Effect;
use crate::render::lighting::{Light, LightType};
use crate::render::renderer::Renderer;
use crate::render::state::{
    AlphaState, BlendFactor, ColorMask, CompareFunction, DepthState, StencilOp, StencilState,
};
use crate::render::{RenderError, RenderResult};
use crate::scene::{NodeId, PlaneSide, SceneGraph, VisibleSet};

use super::{
    finish_frame, oblique_projection, perspective_projection_onto_plane, stencil_mark_pass,
    stencil_reference, validate_planes, world_plane, GeometryRejection, PlanarReport, PlaneOutcome,
    PlanePhase,
};

/// One receiving plane with its projector
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowPlane {
    /// Mesh leaf whose first triangle defines the plane
    pub plane: NodeId,
    /// Light the shadow is cast from
    pub projector: Light,
    /// Shadow color; alpha is the opacity
    pub shadow_color: Vec4,
}

/// Planar shadows of one caster subtree onto any number of planes
#[derive(Debug, Clone)]
pub struct PlanarShadowEffect {
    caster: NodeId,
    planes: Vec<ShadowPlane>,
}

impl PlanarShadowEffect {
    /// Effect casting the shadows of the subtree at `caster`
    pub fn new(caster: NodeId) -> Self {
        Self { caster, planes: Vec::new() }
    }

    /// Add a receiving plane, returning its index
    pub fn add_plane(&mut self, plane: NodeId, projector: Light, shadow_color: Vec4) -> usize {
        self.planes.push(ShadowPlane { plane, projector, shadow_color });
        self.planes.len() - 1
    }

    /// Builder form of [`add_plane`](Self::add_plane)
    pub fn with_plane(mut self, plane: NodeId, projector: Light, shadow_color: Vec4) -> Self {
        self.add_plane(plane, projector, shadow_color);
        self
    }

    /// Root of the caster subtree
    pub fn caster(&self) -> NodeId {
        self.caster
    }

    /// Number of configured planes
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Plane configuration at `index`
    pub fn plane(&self, index: usize) -> RenderResult<&ShadowPlane> {
        self.planes.get(index).ok_or(RenderError::PlaneIndexOutOfRange {
            index,
            count: self.planes.len(),
        })
    }

    /// Replace the light of plane `index`
    pub fn set_projector(&mut self, index: usize, projector: Light) -> RenderResult<()> {
        let count = self.planes.len();
        let plane = self
            .planes
            .get_mut(index)
            .ok_or(RenderError::PlaneIndexOutOfRange { index, count })?;
        plane.projector = projector;
        Ok(())
    }

    /// Replace the shadow color of plane `index`
    pub fn set_shadow_color(&mut self, index: usize, color: Vec4) -> RenderResult<()> {
        let count = self.planes.len();
        let plane = self
            .planes
            .get_mut(index)
            .ok_or(RenderError::PlaneIndexOutOfRange { index, count })?;
        plane.shadow_color = color;
        Ok(())
    }

    /// World-space matrix flattening geometry onto plane `index`, or the
    /// reason no shadow can be cast this frame. Bounds must be current.
    pub fn projection(
        &self,
        scene: &SceneGraph,
        index: usize,
    ) -> RenderResult<Result<Mat4, GeometryRejection>> {
        let config = self.plane(index)?;
        let Some(plane) = world_plane(scene, config.plane)? else {
            return Ok(Err(GeometryRejection::DegeneratePlane));
        };

        let caster_bound = scene.world_bound(self.caster)?;
        if plane.which_side(&caster_bound) == PlaneSide::Negative {
            return Ok(Err(GeometryRejection::CasterBehindPlane));
        }

        let projector = &config.projector;
        let matrix = match projector.light_type {
            LightType::Directional => oblique_projection(&plane, &projector.direction)
                .ok_or(GeometryRejection::LightDirectionAway),
            LightType::Point | LightType::Spot => {
                perspective_projection_onto_plane(&plane, &Point3::from(projector.position))
                    .ok_or(GeometryRejection::LightBehindPlane)
            }
        };
        Ok(matrix.and_then(|matrix| {
            if is_finite_matrix(&matrix) {
                Ok(matrix)
            } else {
                Err(GeometryRejection::NonFiniteProjection)
            }
        }))
    }

    /// Draw the planar shadow passes for every plane, then the visible set
    pub fn draw<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
        scene: &SceneGraph,
        visible: &VisibleSet,
    ) -> RenderResult<PlanarReport> {
        validate_planes(scene, self.planes.iter().map(|p| p.plane), renderer.config())?;
        scene.node(self.caster)?;
        let plane_nodes: HashSet<NodeId> = self.planes.iter().map(|p| p.plane).collect();

        let mut report = PlanarReport::default();
        for (index, config) in self.planes.iter().enumerate() {
            let reference = stencil_reference(index);

            log::trace!("Shadow plane {index}: {:?}", PlanePhase::StencilMark);
            stencil_mark_pass(renderer, scene, config.plane, reference)?;
            renderer.set_color_mask(ColorMask::all());

            log::trace!("Shadow plane {index}: {:?}", PlanePhase::Project);
            let projection = match self.projection(scene, index)? {
                Ok(matrix) => matrix,
                Err(reason) => {
                    log::trace!("Shadow plane {index} skipped this frame: {reason:?}");
                    report.outcomes.push(PlaneOutcome::Skipped { phase: PlanePhase::StencilMark, reason });
                    continue;
                }
            };

            log::trace!("Shadow plane {index}: {:?}", PlanePhase::Redraw);
            renderer.camera_mut().set_pre_view_matrix(projection);
            let redrawn = self.draw_casters(renderer, scene, visible, &plane_nodes, config, reference);
            renderer.camera_mut().clear_pre_view_matrix();
            report.outcomes.push(PlaneOutcome::Drawn { redraws: redrawn? });
        }

        log::trace!("Shadow effect: {:?}", PlanePhase::Restore);
        finish_frame(renderer, scene, visible)?;
        Ok(report)
    }

    fn draw_casters<B: RenderBackend>(
        &self,
        renderer: &mut Renderer<B>,
        scene: &SceneGraph,
        visible: &VisibleSet,
        plane_nodes: &HashSet<NodeId>,
        config: &ShadowPlane,
        reference: u32,
    ) -> RenderResult<usize> {
        let ctx = RenderContext {
            alpha: Some(AlphaState {
                blend_enabled: true,
                src_blend: BlendFactor::SrcAlpha,
                dst_blend: BlendFactor::SrcAlpha,
                ..AlphaState::default()
            }),
            depth: Some(DepthState { enabled: false, writable: false, compare: CompareFunction::LessEqual }),
            stencil: Some(StencilState::equal(reference, StencilOp::Zero)),
            effect: Some(Effect::flat_material(config.shadow_color)),
            ..RenderContext::new()
        };

        let mut redraws = 0;
        for node in visible.nodes() {
            if plane_nodes.contains(&node) || !scene.is_descendant_of(node, self.caster) {
                continue;
            }
            renderer.draw_node(scene, node, None, &ctx)?;
            redraws += 1;
        }
        Ok(redraws)
    }
}
