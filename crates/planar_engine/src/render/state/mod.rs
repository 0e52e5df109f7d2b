//! Fixed-function render state: descriptors and the device mirror cache

pub mod descriptors;
pub mod cache;

pub use descriptors::{
    AlphaState, BlendFactor, ColorMask, CompareFunction, CullState, DepthState, OffsetMode,
    OffsetState, RenderStates, StencilOp, StencilState,
};
pub use cache::RenderStateCache;
