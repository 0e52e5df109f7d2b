//! Backend abstraction traits for the rendering system
//!
//! This module defines the trait a graphics device must implement to be
//! driven by the [`Renderer`](crate::render::Renderer). State setters are
//! fine grained so that the render state cache can emit exactly the calls
//! whose values changed.
//!
//! # Usage invariant
//! Only the [`RenderStateCache`](crate::render::state::RenderStateCache)
//! may call the state setters. A setter invoked from anywhere else leaves
//! the cache's mirror out of sync with the device, and every later
//! redundant-call elision becomes wrong. The renderer owns its backend
//! privately so safe code outside the crate cannot do this.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Mat4;
use crate::render::effect::EffectKind;
use crate::render::state::{
    BlendFactor, ColorMask, CompareFunction, OffsetMode, StencilOp,
};
use crate::render::RenderError;
use crate::scene::{NodeId, TriMesh};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Per-object uniform block as it would be uploaded to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    /// `projection * view * pre_view * world`
    pub model_view_projection: [[f32; 4]; 4],
    /// Model-to-world matrix
    pub world: [[f32; 4]; 4],
    /// Diffuse color of the effect (RGBA)
    pub diffuse: [f32; 4],
}

/// Everything a backend needs to issue one draw
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Node being drawn
    pub node: NodeId,
    /// Node name (for debugging)
    pub name: &'a str,
    /// Geometry
    pub mesh: &'a TriMesh,
    /// Shading model selected for this draw
    pub effect: &'a EffectKind,
    /// Model-to-world matrix
    pub world: Mat4,
    /// Camera pre-view matrix active for this draw
    pub pre_view: Mat4,
    /// Packed uniforms
    pub uniforms: ObjectUniforms,
}

/// Graphics device driven by the renderer
pub trait RenderBackend {
    /// Enable or disable blending
    fn set_blend_enabled(&mut self, enabled: bool);

    /// Set source and destination blend factors
    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Set the constant blend color
    fn set_blend_constant(&mut self, color: [f32; 4]);

    /// Enable or disable the alpha test
    fn set_alpha_test_enabled(&mut self, enabled: bool);

    /// Set the alpha test function and reference
    fn set_alpha_func(&mut self, compare: CompareFunction, reference: f32);

    /// Enable or disable face culling
    fn set_cull_enabled(&mut self, enabled: bool);

    /// Select which winding is front facing
    fn set_front_face_ccw(&mut self, ccw: bool);

    /// Enable or disable the depth test
    fn set_depth_test_enabled(&mut self, enabled: bool);

    /// Enable or disable depth writes
    fn set_depth_write_enabled(&mut self, enabled: bool);

    /// Set the depth test function
    fn set_depth_func(&mut self, compare: CompareFunction);

    /// Enable or disable polygon offset for one rasterization mode
    fn set_polygon_offset_enabled(&mut self, mode: OffsetMode, enabled: bool);

    /// Set polygon offset scale and bias
    fn set_polygon_offset(&mut self, scale: f32, bias: f32);

    /// Enable or disable the stencil test
    fn set_stencil_test_enabled(&mut self, enabled: bool);

    /// Set stencil function, reference and read mask together
    fn set_stencil_func(&mut self, compare: CompareFunction, reference: u32, mask: u32);

    /// Set the stencil write mask
    fn set_stencil_write_mask(&mut self, mask: u32);

    /// Set stencil fail / depth-fail / depth-pass operations together
    fn set_stencil_op(&mut self, on_fail: StencilOp, on_z_fail: StencilOp, on_z_pass: StencilOp);

    /// Select which color channels are written
    fn set_color_mask(&mut self, mask: ColorMask);

    /// Set the depth range the viewport maps to
    fn set_depth_range(&mut self, near: f32, far: f32);

    /// Clear the whole stencil buffer to `value`
    fn clear_stencil(&mut self, value: u32);

    /// Issue a draw
    fn draw(&mut self, call: &DrawCall<'_>) -> BackendResult<()>;
}
