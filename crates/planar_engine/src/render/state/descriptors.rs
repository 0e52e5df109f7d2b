//! Render state descriptors
//!
//! Five orthogonal categories of fixed-function GPU state. Each descriptor
//! is a plain value; the defaults mirror the state a freshly created device
//! context reports.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Comparison used by alpha, depth and stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareFunction {
    /// Never passes
    Never,
    /// Passes if incoming < stored
    Less,
    /// Passes if incoming == stored
    Equal,
    /// Passes if incoming <= stored
    LessEqual,
    /// Passes if incoming > stored
    Greater,
    /// Passes if incoming != stored
    NotEqual,
    /// Passes if incoming >= stored
    GreaterEqual,
    /// Always passes
    Always,
}

/// Source/destination blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source color
    SrcColor,
    /// 1 - source color
    OneMinusSrcColor,
    /// Destination color
    DstColor,
    /// 1 - destination color
    OneMinusDstColor,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
    /// Destination alpha
    DstAlpha,
    /// 1 - destination alpha
    OneMinusDstAlpha,
    /// min(source alpha, 1 - destination alpha)
    SrcAlphaSaturate,
    /// Constant blend color
    ConstantColor,
    /// 1 - constant blend color
    OneMinusConstantColor,
    /// Constant blend alpha
    ConstantAlpha,
    /// 1 - constant blend alpha
    OneMinusConstantAlpha,
}

/// Action applied to a stencil value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilOp {
    /// Keep the stored value
    Keep,
    /// Write zero
    Zero,
    /// Write the reference value
    Replace,
    /// Increment, clamping at the maximum
    Increment,
    /// Decrement, clamping at zero
    Decrement,
    /// Bitwise invert
    Invert,
}

bitflags! {
    /// Color channels the device may write
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorMask: u8 {
        /// Red channel
        const RED = 0b0001;
        /// Green channel
        const GREEN = 0b0010;
        /// Blue channel
        const BLUE = 0b0100;
        /// Alpha channel
        const ALPHA = 0b1000;
    }
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Alpha blending and alpha testing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaState {
    /// Blending enabled
    pub blend_enabled: bool,
    /// Source blend factor
    pub src_blend: BlendFactor,
    /// Destination blend factor
    pub dst_blend: BlendFactor,
    /// Alpha test enabled
    pub compare_enabled: bool,
    /// Alpha test function
    pub compare: CompareFunction,
    /// Alpha test reference in [0, 1]
    pub reference: f32,
    /// Constant blend color (RGBA)
    pub constant_color: [f32; 4],
}

impl Default for AlphaState {
    fn default() -> Self {
        Self {
            blend_enabled: false,
            src_blend: BlendFactor::SrcAlpha,
            dst_blend: BlendFactor::OneMinusSrcAlpha,
            compare_enabled: false,
            compare: CompareFunction::Always,
            reference: 0.0,
            constant_color: [0.0; 4],
        }
    }
}

/// Back-face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CullState {
    /// Culling enabled
    pub enabled: bool,
    /// Front faces use the renderer's configured winding; `false` flips it
    pub ccw_order: bool,
}

impl Default for CullState {
    fn default() -> Self {
        Self { enabled: true, ccw_order: true }
    }
}

/// Depth testing and depth writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthState {
    /// Depth test enabled
    pub enabled: bool,
    /// Depth writes enabled
    pub writable: bool,
    /// Depth test function
    pub compare: CompareFunction,
}

impl Default for DepthState {
    fn default() -> Self {
        Self { enabled: true, writable: true, compare: CompareFunction::LessEqual }
    }
}

/// Rasterization mode polygon offset applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetMode {
    /// Filled polygons
    Fill,
    /// Wireframe lines
    Line,
    /// Points
    Point,
}

/// Polygon offset (depth bias)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetState {
    /// Offset filled polygons
    pub fill_enabled: bool,
    /// Offset lines
    pub line_enabled: bool,
    /// Offset points
    pub point_enabled: bool,
    /// Slope-scaled factor
    pub scale: f32,
    /// Constant bias
    pub bias: f32,
}

impl Default for OffsetState {
    fn default() -> Self {
        Self {
            fill_enabled: false,
            line_enabled: false,
            point_enabled: false,
            scale: 0.0,
            bias: 0.0,
        }
    }
}

/// Stencil testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StencilState {
    /// Stencil test enabled
    pub enabled: bool,
    /// Stencil test function
    pub compare: CompareFunction,
    /// Reference value
    pub reference: u32,
    /// Mask applied to reference and stored value before comparing
    pub mask: u32,
    /// Mask applied to written values
    pub write_mask: u32,
    /// Action when the stencil test fails
    pub on_fail: StencilOp,
    /// Action when stencil passes but depth fails
    pub on_z_fail: StencilOp,
    /// Action when both tests pass
    pub on_z_pass: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            compare: CompareFunction::Never,
            reference: 0,
            mask: u32::MAX,
            write_mask: u32::MAX,
            on_fail: StencilOp::Keep,
            on_z_fail: StencilOp::Keep,
            on_z_pass: StencilOp::Keep,
        }
    }
}

impl StencilState {
    /// Mark pixels that pass depth testing with `reference`
    pub fn mark(reference: u32) -> Self {
        Self {
            enabled: true,
            compare: CompareFunction::Always,
            reference,
            on_fail: StencilOp::Keep,
            on_z_fail: StencilOp::Keep,
            on_z_pass: StencilOp::Replace,
            ..Self::default()
        }
    }

    /// Restrict drawing to pixels tagged with `reference`
    pub fn equal(reference: u32, on_z_pass: StencilOp) -> Self {
        Self {
            enabled: true,
            compare: CompareFunction::Equal,
            reference,
            on_fail: StencilOp::Keep,
            on_z_fail: StencilOp::Keep,
            on_z_pass,
            ..Self::default()
        }
    }
}

/// One descriptor of each category, as attached to an effect pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStates {
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
}
