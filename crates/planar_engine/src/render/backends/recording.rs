//! Headless backend that records every device call
//!
//! Keeps its own copy of the device state so recorded draws carry the exact
//! state they were issued under. Used by tests and the headless demo.

use crate::foundation::math::Mat4;
use crate::render::api::{BackendResult, DrawCall, ObjectUniforms, RenderBackend};
use crate::render::effect::EffectKind;
use crate::render::state::{
    AlphaState, BlendFactor, ColorMask, CompareFunction, CullState, DepthState, OffsetMode,
    OffsetState, StencilOp, StencilState,
};
use crate::scene::NodeId;

/// State held by the recorded device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    /// Alpha state
    pub alpha: AlphaState,
    /// Cull state
    pub cull: CullState,
    /// Depth state
    pub depth: DepthState,
    /// Offset state
    pub offset: OffsetState,
    /// Stencil state
    pub stencil: StencilState,
    /// Color write mask
    pub color_mask: ColorMask,
    /// Depth range
    pub depth_range: (f32, f32),
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            alpha: AlphaState::default(),
            cull: CullState::default(),
            depth: DepthState::default(),
            offset: OffsetState::default(),
            stencil: StencilState::default(),
            color_mask: ColorMask::all(),
            depth_range: (0.0, 1.0),
        }
    }
}

/// A draw as seen by the device
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Node drawn
    pub node: NodeId,
    /// Node name
    pub name: String,
    /// Shading model
    pub effect: EffectKind,
    /// Model-to-world matrix
    pub world: Mat4,
    /// Pre-view matrix active at draw time
    pub pre_view: Mat4,
    /// Uploaded uniforms
    pub uniforms: ObjectUniforms,
    /// Uniform block exactly as packed for upload
    pub uniform_bytes: Vec<u8>,
    /// Device state at draw time
    pub state: DeviceState,
}

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// `set_blend_enabled`
    BlendEnabled(bool),
    /// `set_blend_func`
    BlendFunc(BlendFactor, BlendFactor),
    /// `set_blend_constant`
    BlendConstant([f32; 4]),
    /// `set_alpha_test_enabled`
    AlphaTestEnabled(bool),
    /// `set_alpha_func`
    AlphaFunc(CompareFunction, f32),
    /// `set_cull_enabled`
    CullEnabled(bool),
    /// `set_front_face_ccw`
    FrontFaceCcw(bool),
    /// `set_depth_test_enabled`
    DepthTestEnabled(bool),
    /// `set_depth_write_enabled`
    DepthWriteEnabled(bool),
    /// `set_depth_func`
    DepthFunc(CompareFunction),
    /// `set_polygon_offset_enabled`
    PolygonOffsetEnabled(OffsetMode, bool),
    /// `set_polygon_offset`
    PolygonOffset(f32, f32),
    /// `set_stencil_test_enabled`
    StencilTestEnabled(bool),
    /// `set_stencil_func`
    StencilFunc(CompareFunction, u32, u32),
    /// `set_stencil_write_mask`
    StencilWriteMask(u32),
    /// `set_stencil_op`
    StencilOp(StencilOp, StencilOp, StencilOp),
    /// `set_color_mask`
    ColorMask(ColorMask),
    /// `set_depth_range`
    DepthRange(f32, f32),
    /// `clear_stencil`
    ClearStencil(u32),
    /// `draw`
    Draw(Box<DrawRecord>),
}

/// Backend that records calls instead of talking to a GPU
#[derive(Debug, Default)]
pub struct RecordingBackend {
    state: DeviceState,
    calls: Vec<DeviceCall>,
}

impl RecordingBackend {
    /// Create a backend with default device state and an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls recorded since the last clear
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Forget recorded calls (device state is kept)
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Current device state
    pub fn device_state(&self) -> &DeviceState {
        &self.state
    }

    /// Recorded draws, in issue order
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.calls.iter().filter_map(|call| match call {
            DeviceCall::Draw(record) => Some(record.as_ref()),
            _ => None,
        })
    }

    /// Number of state calls recorded (draws and clears excluded)
    pub fn state_call_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| !matches!(call, DeviceCall::Draw(_) | DeviceCall::ClearStencil(_)))
            .count()
    }
}

impl RenderBackend for RecordingBackend {
    fn set_blend_enabled(&mut self, enabled: bool) {
        self.state.alpha.blend_enabled = enabled;
        self.calls.push(DeviceCall::BlendEnabled(enabled));
    }

    fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.state.alpha.src_blend = src;
        self.state.alpha.dst_blend = dst;
        self.calls.push(DeviceCall::BlendFunc(src, dst));
    }

    fn set_blend_constant(&mut self, color: [f32; 4]) {
        self.state.alpha.constant_color = color;
        self.calls.push(DeviceCall::BlendConstant(color));
    }

    fn set_alpha_test_enabled(&mut self, enabled: bool) {
        self.state.alpha.compare_enabled = enabled;
        self.calls.push(DeviceCall::AlphaTestEnabled(enabled));
    }

    fn set_alpha_func(&mut self, compare: CompareFunction, reference: f32) {
        self.state.alpha.compare = compare;
        self.state.alpha.reference = reference;
        self.calls.push(DeviceCall::AlphaFunc(compare, reference));
    }

    fn set_cull_enabled(&mut self, enabled: bool) {
        self.state.cull.enabled = enabled;
        self.calls.push(DeviceCall::CullEnabled(enabled));
    }

    fn set_front_face_ccw(&mut self, ccw: bool) {
        self.state.cull.ccw_order = ccw;
        self.calls.push(DeviceCall::FrontFaceCcw(ccw));
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        self.state.depth.enabled = enabled;
        self.calls.push(DeviceCall::DepthTestEnabled(enabled));
    }

    fn set_depth_write_enabled(&mut self, enabled: bool) {
        self.state.depth.writable = enabled;
        self.calls.push(DeviceCall::DepthWriteEnabled(enabled));
    }

    fn set_depth_func(&mut self, compare: CompareFunction) {
        self.state.depth.compare = compare;
        self.calls.push(DeviceCall::DepthFunc(compare));
    }

    fn set_polygon_offset_enabled(&mut self, mode: OffsetMode, enabled: bool) {
        match mode {
            OffsetMode::Fill => self.state.offset.fill_enabled = enabled,
            OffsetMode::Line => self.state.offset.line_enabled = enabled,
            OffsetMode::Point => self.state.offset.point_enabled = enabled,
        }
        self.calls.push(DeviceCall::PolygonOffsetEnabled(mode, enabled));
    }

    fn set_polygon_offset(&mut self, scale: f32, bias: f32) {
        self.state.offset.scale = scale;
        self.state.offset.bias = bias;
        self.calls.push(DeviceCall::PolygonOffset(scale, bias));
    }

    fn set_stencil_test_enabled(&mut self, enabled: bool) {
        self.state.stencil.enabled = enabled;
        self.calls.push(DeviceCall::StencilTestEnabled(enabled));
    }

    fn set_stencil_func(&mut self, compare: CompareFunction, reference: u32, mask: u32) {
        self.state.stencil.compare = compare;
        self.state.stencil.reference = reference;
        self.state.stencil.mask = mask;
        self.calls.push(DeviceCall::StencilFunc(compare, reference, mask));
    }

    fn set_stencil_write_mask(&mut self, mask: u32) {
        self.state.stencil.write_mask = mask;
        self.calls.push(DeviceCall::StencilWriteMask(mask));
    }

    fn set_stencil_op(&mut self, on_fail: StencilOp, on_z_fail: StencilOp, on_z_pass: StencilOp) {
        self.state.stencil.on_fail = on_fail;
        self.state.stencil.on_z_fail = on_z_fail;
        self.state.stencil.on_z_pass = on_z_pass;
        self.calls.push(DeviceCall::StencilOp(on_fail, on_z_fail, on_z_pass));
    }

    fn set_color_mask(&mut self, mask: ColorMask) {
        self.state.color_mask = mask;
        self.calls.push(DeviceCall::ColorMask(mask));
    }

    fn set_depth_range(&mut self, near: f32, far: f32) {
        self.state.depth_range = (near, far);
        self.calls.push(DeviceCall::DepthRange(near, far));
    }

    fn clear_stencil(&mut self, value: u32) {
        self.calls.push(DeviceCall::ClearStencil(value));
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> BackendResult<()> {
        log::trace!("draw '{}' ({:?})", call.name, call.node);
        self.calls.push(DeviceCall::Draw(Box::new(DrawRecord {
            node: call.node,
            name: call.name.to_string(),
            effect: call.effect.clone(),
            world: call.world,
            pre_view: call.pre_view,
            uniforms: call.uniforms,
            uniform_bytes: bytemuck::bytes_of(&call.uniforms).to_vec(),
            state: self.state.clone(),
        })));
        Ok(())
    }
}
