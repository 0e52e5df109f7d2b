//! Render state cache
//!
//! Mirrors the fixed-function state last sent to the device and forwards
//! only the fields that change. Every state change in the renderer goes
//! through here; see the usage invariant on
//! [`RenderBackend`](crate::render::api::RenderBackend).

use crate::config::RendererConfig;
use crate::render::api::RenderBackend;
use crate::render::state::{
    AlphaState, ColorMask, CullState, DepthState, OffsetMode, OffsetState, StencilState,
};

/// Mirror of device state with diffing apply entry points
#[derive(Debug, Clone)]
pub struct RenderStateCache {
    alpha: AlphaState,
    cull: CullState,
    depth: DepthState,
    offset: OffsetState,
    stencil: StencilState,
    color_mask: ColorMask,
    depth_range: (f32, f32),
    front_face_ccw: bool,
    calls_emitted: u64,
}

impl RenderStateCache {
    /// Push a complete known state to the device and mirror it.
    ///
    /// The device may hold anything before this call, so every setter is
    /// issued unconditionally.
    pub fn synchronized<B: RenderBackend + ?Sized>(backend: &mut B, config: &RendererConfig) -> Self {
        let alpha = AlphaState::default();
        let cull = CullState { ccw_order: config.front_face_ccw, ..CullState::default() };
        let depth = DepthState::default();
        let offset = OffsetState::default();
        let stencil = StencilState::default();
        let color_mask = ColorMask::all();
        let depth_range = config.default_depth_range;

        backend.set_blend_enabled(alpha.blend_enabled);
        backend.set_blend_func(alpha.src_blend, alpha.dst_blend);
        backend.set_blend_constant(alpha.constant_color);
        backend.set_alpha_test_enabled(alpha.compare_enabled);
        backend.set_alpha_func(alpha.compare, alpha.reference);
        backend.set_cull_enabled(cull.enabled);
        backend.set_front_face_ccw(cull.ccw_order);
        backend.set_depth_test_enabled(depth.enabled);
        backend.set_depth_write_enabled(depth.writable);
        backend.set_depth_func(depth.compare);
        backend.set_polygon_offset_enabled(OffsetMode::Fill, offset.fill_enabled);
        backend.set_polygon_offset_enabled(OffsetMode::Line, offset.line_enabled);
        backend.set_polygon_offset_enabled(OffsetMode::Point, offset.point_enabled);
        backend.set_polygon_offset(offset.scale, offset.bias);
        backend.set_stencil_test_enabled(stencil.enabled);
        backend.set_stencil_func(stencil.compare, stencil.reference, stencil.mask);
        backend.set_stencil_write_mask(stencil.write_mask);
        backend.set_stencil_op(stencil.on_fail, stencil.on_z_fail, stencil.on_z_pass);
        backend.set_color_mask(color_mask);
        backend.set_depth_range(depth_range.0, depth_range.1);

        log::debug!("Render state cache synchronized with device");

        Self {
            alpha,
            cull,
            depth,
            offset,
            stencil,
            color_mask,
            depth_range,
            front_face_ccw: config.front_face_ccw,
            calls_emitted: 20,
        }
    }

    /// Number of device state calls issued since creation
    pub fn calls_emitted(&self) -> u64 {
        self.calls_emitted
    }

    /// Alpha state the device currently holds
    pub fn alpha(&self) -> &AlphaState {
        &self.alpha
    }

    /// Cull state the device currently holds (after any winding reversal)
    pub fn cull(&self) -> &CullState {
        &self.cull
    }

    /// Depth state the device currently holds
    pub fn depth(&self) -> &DepthState {
        &self.depth
    }

    /// Offset state the device currently holds
    pub fn offset(&self) -> &OffsetState {
        &self.offset
    }

    /// Stencil state the device currently holds
    pub fn stencil(&self) -> &StencilState {
        &self.stencil
    }

    /// Color mask the device currently holds
    pub fn color_mask(&self) -> ColorMask {
        self.color_mask
    }

    /// Depth range the device currently holds
    pub fn depth_range(&self) -> (f32, f32) {
        self.depth_range
    }

    /// Apply alpha state; `override_state` wins over `requested` when set
    pub fn apply_alpha<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        requested: &AlphaState,
        override_state: Option<&AlphaState>,
    ) {
        let state = override_state.unwrap_or(requested);

        if state.blend_enabled {
            if !self.alpha.blend_enabled {
                self.alpha.blend_enabled = true;
                backend.set_blend_enabled(true);
                self.calls_emitted += 1;
            }
            if state.src_blend != self.alpha.src_blend || state.dst_blend != self.alpha.dst_blend {
                self.alpha.src_blend = state.src_blend;
                self.alpha.dst_blend = state.dst_blend;
                backend.set_blend_func(state.src_blend, state.dst_blend);
                self.calls_emitted += 1;
            }
            if state.constant_color != self.alpha.constant_color {
                self.alpha.constant_color = state.constant_color;
                backend.set_blend_constant(state.constant_color);
                self.calls_emitted += 1;
            }
        } else if self.alpha.blend_enabled {
            self.alpha.blend_enabled = false;
            backend.set_blend_enabled(false);
            self.calls_emitted += 1;
        }

        if state.compare_enabled {
            if !self.alpha.compare_enabled {
                self.alpha.compare_enabled = true;
                backend.set_alpha_test_enabled(true);
                self.calls_emitted += 1;
            }
            if state.compare != self.alpha.compare || state.reference != self.alpha.reference {
                self.alpha.compare = state.compare;
                self.alpha.reference = state.reference;
                backend.set_alpha_func(state.compare, state.reference);
                self.calls_emitted += 1;
            }
        } else if self.alpha.compare_enabled {
            self.alpha.compare_enabled = false;
            backend.set_alpha_test_enabled(false);
            self.calls_emitted += 1;
        }
    }

    /// Apply cull state. The requested winding is relative to the configured
    /// front face, and `reverse_order` flips it once more before it reaches
    /// the device.
    pub fn apply_cull<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        requested: &CullState,
        override_state: Option<&CullState>,
        reverse_order: bool,
    ) {
        let state = override_state.unwrap_or(requested);

        if state.enabled {
            if !self.cull.enabled {
                self.cull.enabled = true;
                backend.set_cull_enabled(true);
                self.calls_emitted += 1;
            }
            let ccw = (state.ccw_order == self.front_face_ccw) != reverse_order;
            if ccw != self.cull.ccw_order {
                self.cull.ccw_order = ccw;
                backend.set_front_face_ccw(ccw);
                self.calls_emitted += 1;
            }
        } else if self.cull.enabled {
            self.cull.enabled = false;
            backend.set_cull_enabled(false);
            self.calls_emitted += 1;
        }
    }

    /// Apply depth state
    pub fn apply_depth<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        requested: &DepthState,
        override_state: Option<&DepthState>,
    ) {
        let state = override_state.unwrap_or(requested);

        if state.enabled {
            if !self.depth.enabled {
                self.depth.enabled = true;
                backend.set_depth_test_enabled(true);
                self.calls_emitted += 1;
            }
            if state.compare != self.depth.compare {
                self.depth.compare = state.compare;
                backend.set_depth_func(state.compare);
                self.calls_emitted += 1;
            }
        } else if self.depth.enabled {
            self.depth.enabled = false;
            backend.set_depth_test_enabled(false);
            self.calls_emitted += 1;
        }

        if state.writable != self.depth.writable {
            self.depth.writable = state.writable;
            backend.set_depth_write_enabled(state.writable);
            self.calls_emitted += 1;
        }
    }

    /// Apply polygon offset state
    pub fn apply_offset<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        requested: &OffsetState,
        override_state: Option<&OffsetState>,
    ) {
        let state = override_state.unwrap_or(requested);

        let modes = [
            (OffsetMode::Fill, state.fill_enabled, &mut self.offset.fill_enabled),
            (OffsetMode::Line, state.line_enabled, &mut self.offset.line_enabled),
            (OffsetMode::Point, state.point_enabled, &mut self.offset.point_enabled),
        ];
        for (mode, wanted, current) in modes {
            if wanted != *current {
                *current = wanted;
                backend.set_polygon_offset_enabled(mode, wanted);
                self.calls_emitted += 1;
            }
        }

        let any_enabled = state.fill_enabled || state.line_enabled || state.point_enabled;
        if any_enabled && (state.scale != self.offset.scale || state.bias != self.offset.bias) {
            self.offset.scale = state.scale;
            self.offset.bias = state.bias;
            backend.set_polygon_offset(state.scale, state.bias);
            self.calls_emitted += 1;
        }
    }

    /// Apply stencil state.
    ///
    /// Function, reference and read mask travel together, as do the three
    /// operations; each group is compared against the mirror on its own.
    pub fn apply_stencil<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        requested: &StencilState,
        override_state: Option<&StencilState>,
    ) {
        let state = override_state.unwrap_or(requested);

        if !state.enabled {
            if self.stencil.enabled {
                self.stencil.enabled = false;
                backend.set_stencil_test_enabled(false);
                self.calls_emitted += 1;
            }
            return;
        }

        if !self.stencil.enabled {
            self.stencil.enabled = true;
            backend.set_stencil_test_enabled(true);
            self.calls_emitted += 1;
        }

        if state.compare != self.stencil.compare
            || state.reference != self.stencil.reference
            || state.mask != self.stencil.mask
        {
            self.stencil.compare = state.compare;
            self.stencil.reference = state.reference;
            self.stencil.mask = state.mask;
            backend.set_stencil_func(state.compare, state.reference, state.mask);
            self.calls_emitted += 1;
        }

        if state.write_mask != self.stencil.write_mask {
            self.stencil.write_mask = state.write_mask;
            backend.set_stencil_write_mask(state.write_mask);
            self.calls_emitted += 1;
        }

        if state.on_fail != self.stencil.on_fail
            || state.on_z_fail != self.stencil.on_z_fail
            || state.on_z_pass != self.stencil.on_z_pass
        {
            self.stencil.on_fail = state.on_fail;
            self.stencil.on_z_fail = state.on_z_fail;
            self.stencil.on_z_pass = state.on_z_pass;
            backend.set_stencil_op(state.on_fail, state.on_z_fail, state.on_z_pass);
            self.calls_emitted += 1;
        }
    }

    /// Set the color write mask
    pub fn set_color_mask<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, mask: ColorMask) {
        if mask != self.color_mask {
            self.color_mask = mask;
            backend.set_color_mask(mask);
            self.calls_emitted += 1;
        }
    }

    /// Set the depth range, returning the range that was active before
    pub fn set_depth_range<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        near: f32,
        far: f32,
    ) -> (f32, f32) {
        let previous = self.depth_range;
        if (near, far) != previous {
            self.depth_range = (near, far);
            backend.set_depth_range(near, far);
            self.calls_emitted += 1;
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{DeviceCall, RecordingBackend};
    use crate::render::state::{BlendFactor, CompareFunction, StencilOp};

    fn setup() -> (RecordingBackend, RenderStateCache) {
        let mut backend = RecordingBackend::new();
        let cache = RenderStateCache::synchronized(&mut backend, &RendererConfig::default());
        backend.clear_calls();
        (backend, cache)
    }

    fn assert_mirror_matches_device(backend: &RecordingBackend, cache: &RenderStateCache) {
        let device = backend.device_state();
        assert_eq!(device.alpha.blend_enabled, cache.alpha().blend_enabled);
        assert_eq!(device.alpha.src_blend, cache.alpha().src_blend);
        assert_eq!(device.alpha.dst_blend, cache.alpha().dst_blend);
        assert_eq!(device.alpha.constant_color, cache.alpha().constant_color);
        assert_eq!(device.cull, *cache.cull());
        assert_eq!(device.depth, *cache.depth());
        assert_eq!(device.stencil, *cache.stencil());
        assert_eq!(device.color_mask, cache.color_mask());
        assert_eq!(device.depth_range, cache.depth_range());
    }

    #[test]
    fn test_synchronize_issues_every_setter() {
        let mut backend = RecordingBackend::new();
        let cache = RenderStateCache::synchronized(&mut backend, &RendererConfig::default());
        assert_eq!(backend.calls().len() as u64, cache.calls_emitted());
        assert_mirror_matches_device(&backend, &cache);
    }

    #[test]
    fn test_applying_same_state_twice_is_idempotent() {
        let (mut backend, mut cache) = setup();
        let stencil = StencilState::mark(3);
        let alpha = AlphaState {
            blend_enabled: true,
            src_blend: BlendFactor::SrcAlpha,
            dst_blend: BlendFactor::SrcAlpha,
            ..AlphaState::default()
        };

        cache.apply_stencil(&mut backend, &stencil, None);
        cache.apply_alpha(&mut backend, &alpha, None);
        let first = backend.calls().len();
        assert!(first > 0);

        cache.apply_stencil(&mut backend, &stencil, None);
        cache.apply_alpha(&mut backend, &alpha, None);
        assert_eq!(backend.calls().len(), first);
        assert_mirror_matches_device(&backend, &cache);
    }

    #[test]
    fn test_only_changed_fields_are_sent() {
        let (mut backend, mut cache) = setup();
        let depth = DepthState { compare: CompareFunction::Always, ..DepthState::default() };
        cache.apply_depth(&mut backend, &depth, None);
        assert_eq!(backend.calls(), &[DeviceCall::DepthFunc(CompareFunction::Always)]);
    }

    #[test]
    fn test_override_wins_over_requested() {
        let (mut backend, mut cache) = setup();
        let requested = DepthState::default();
        let forced = DepthState { enabled: false, ..DepthState::default() };
        cache.apply_depth(&mut backend, &requested, Some(&forced));
        assert!(!cache.depth().enabled);
        assert_eq!(backend.calls(), &[DeviceCall::DepthTestEnabled(false)]);
    }

    #[test]
    fn test_stencil_function_group_sent_once_per_change() {
        let (mut backend, mut cache) = setup();
        cache.apply_stencil(&mut backend, &StencilState::mark(1), None);
        assert_eq!(
            backend.calls(),
            &[
                DeviceCall::StencilTestEnabled(true),
                DeviceCall::StencilFunc(CompareFunction::Always, 1, u32::MAX),
                DeviceCall::StencilOp(StencilOp::Keep, StencilOp::Keep, StencilOp::Replace),
            ]
        );

        backend.clear_calls();
        cache.apply_stencil(&mut backend, &StencilState::mark(2), None);
        assert_eq!(backend.calls(), &[DeviceCall::StencilFunc(CompareFunction::Always, 2, u32::MAX)]);

        backend.clear_calls();
        cache.apply_stencil(&mut backend, &StencilState::equal(2, StencilOp::Zero), None);
        assert_eq!(
            backend.calls(),
            &[
                DeviceCall::StencilFunc(CompareFunction::Equal, 2, u32::MAX),
                DeviceCall::StencilOp(StencilOp::Keep, StencilOp::Keep, StencilOp::Zero),
            ]
        );
        assert_mirror_matches_device(&backend, &cache);
    }

    #[test]
    fn test_disabled_stencil_only_toggles_enable() {
        let (mut backend, mut cache) = setup();
        cache.apply_stencil(&mut backend, &StencilState::mark(1), None);
        backend.clear_calls();

        cache.apply_stencil(&mut backend, &StencilState::default(), None);
        assert_eq!(backend.calls(), &[DeviceCall::StencilTestEnabled(false)]);
        assert_eq!(cache.stencil().reference, 1);
    }

    #[test]
    fn test_reverse_order_flips_front_face() {
        let (mut backend, mut cache) = setup();
        let cull = CullState::default();
        cache.apply_cull(&mut backend, &cull, None, true);
        assert_eq!(backend.calls(), &[DeviceCall::FrontFaceCcw(false)]);

        backend.clear_calls();
        cache.apply_cull(&mut backend, &cull, None, false);
        assert_eq!(backend.calls(), &[DeviceCall::FrontFaceCcw(true)]);
    }

    #[test]
    fn test_winding_follows_configured_front_face() {
        let mut backend = RecordingBackend::new();
        let config = RendererConfig { front_face_ccw: false, ..RendererConfig::default() };
        let mut cache = RenderStateCache::synchronized(&mut backend, &config);
        backend.clear_calls();

        let cull = CullState::default();
        cache.apply_cull(&mut backend, &cull, None, false);
        assert!(backend.calls().is_empty());
        assert!(!backend.device_state().cull.ccw_order);

        cache.apply_cull(&mut backend, &cull, None, true);
        assert_eq!(backend.calls(), &[DeviceCall::FrontFaceCcw(true)]);

        backend.clear_calls();
        cache.apply_cull(&mut backend, &CullState { ccw_order: false, ..cull }, None, false);
        assert_eq!(backend.calls(), &[DeviceCall::FrontFaceCcw(true)]);
        assert_mirror_matches_device(&backend, &cache);
    }

    #[test]
    fn test_depth_range_returns_previous() {
        let (mut backend, mut cache) = setup();
        let previous = cache.set_depth_range(&mut backend, 1.0, 1.0);
        assert_eq!(previous, (0.0, 1.0));
        let restored = cache.set_depth_range(&mut backend, previous.0, previous.1);
        assert_eq!(restored, (1.0, 1.0));
        assert_eq!(
            backend.calls(),
            &[DeviceCall::DepthRange(1.0, 1.0), DeviceCall::DepthRange(0.0, 1.0)]
        );
    }

    #[test]
    fn test_color_mask_elides_redundant_calls() {
        let (mut backend, mut cache) = setup();
        cache.set_color_mask(&mut backend, ColorMask::empty());
        cache.set_color_mask(&mut backend, ColorMask::empty());
        cache.set_color_mask(&mut backend, ColorMask::all());
        assert_eq!(
            backend.calls(),
            &[DeviceCall::ColorMask(ColorMask::empty()), DeviceCall::ColorMask(ColorMask::all())]
        );
    }

    #[test]
    fn test_offset_scale_only_sent_when_enabled() {
        let (mut backend, mut cache) = setup();
        let disabled = OffsetState { scale: 2.0, bias: 1.0, ..OffsetState::default() };
        cache.apply_offset(&mut backend, &disabled, None);
        assert!(backend.calls().is_empty());

        let enabled = OffsetState { fill_enabled: true, ..disabled };
        cache.apply_offset(&mut backend, &enabled, None);
        assert_eq!(
            backend.calls(),
            &[
                DeviceCall::PolygonOffsetEnabled(OffsetMode::Fill, true),
                DeviceCall::PolygonOffset(2.0, 1.0),
            ]
        );
    }
}
