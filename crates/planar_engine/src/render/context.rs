//! Per-draw render context
//!
//! Override slots used to be renderer-wide globals; here they are plain
//! fields of a value passed to every draw, so their scope is exactly the
//! draws that receive the context.

use crate::render::effect::Effect;
use crate::render::state::{AlphaState, CullState, DepthState, OffsetState, StencilState};

/// Override slots and flags threaded into every draw
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    /// Replaces every drawable's alpha state when set
    pub alpha: Option<AlphaState>,
    /// Replaces every drawable's cull state when set
    pub cull: Option<CullState>,
    /// Replaces every drawable's depth state when set
    pub depth: Option<DepthState>,
    /// Replaces every drawable's offset state when set
    pub offset: Option<OffsetState>,
    /// Replaces every drawable's stencil state when set
    pub stencil: Option<StencilState>,
    /// Replaces every drawable's effect when set
    pub effect: Option<Effect>,
    /// Flip triangle winding (used while drawing mirrored geometry)
    pub reverse_cull_order: bool,
}

impl RenderContext {
    /// Context with no overrides
    pub fn new() -> Self {
        Self::default()
    }
}
