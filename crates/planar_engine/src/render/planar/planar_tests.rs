//! Frame-level tests for the planar shadow and reflection passes
//!
//! Every test drives full frames through the recording backend and checks
//! the draws and device state the passes leave behind.

use approx::assert_relative_eq;

use crate::config::RendererConfig;
use crate::foundation::math::{is_finite_matrix, Mat4, Point3, Transform, Vec3, Vec4};
use crate::render::backends::{DeviceCall, DrawRecord, RecordingBackend};
use crate::render::effect::Effect;
use crate::render::lighting::{Attenuation, Light};
use crate::render::planar::{
    oblique_projection, reflection_matrix, GeometryRejection, GlobalEffect, PlanarReflectionEffect,
    PlanarShadowEffect, PlaneOutcome, PlanePhase,
};
use crate::render::primitives::Camera;
use crate::render::renderer::Renderer;
use crate::render::state::{
    BlendFactor, ColorMask, CompareFunction, DepthState, StencilOp, StencilState,
};
use crate::render::RenderError;
use crate::scene::{Culler, NodeId, Plane, SceneGraph, TriMesh};

const SHADOW_COLOR: Vec4 = Vec4::new(0.0, 0.0, 0.0, 0.5);

struct Stage {
    scene: SceneGraph,
    root: NodeId,
    floor: NodeId,
    caster: NodeId,
    cube: NodeId,
    culler: Culler,
    renderer: Renderer<RecordingBackend>,
}

fn stage_with(config: RendererConfig, eye: Vec3) -> Stage {
    let mut scene = SceneGraph::new();
    let root = scene.create_group("root");
    let floor = scene.create_mesh("floor", TriMesh::horizontal_quad(5.0, 0.0), Effect::default());
    let caster = scene.create_group("caster");
    let cube = scene.create_mesh("cube", TriMesh::cube(0.5), Effect::default());
    scene.attach_child(root, floor).unwrap();
    scene.attach_child(root, caster).unwrap();
    scene.attach_child(caster, cube).unwrap();
    scene.set_local_transform(cube, Transform::from_position(Vec3::new(0.0, 2.0, 0.0))).unwrap();

    let camera = Camera::perspective(eye, 60.0, 1.0, 0.1, 100.0);
    let mut renderer = Renderer::new(RecordingBackend::new(), camera, config).unwrap();
    renderer.backend_mut().clear_calls();
    let culler = Culler::new(&renderer.camera().frustum());

    Stage { scene, root, floor, caster, cube, culler, renderer }
}

fn stage() -> Stage {
    stage_with(RendererConfig::default(), Vec3::new(0.0, 6.0, 10.0))
}

fn sun() -> Light {
    Light::directional(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0))
}

fn draws(stage: &Stage) -> Vec<DrawRecord> {
    stage.renderer.backend().draws().cloned().collect()
}

fn names(draws: &[DrawRecord]) -> Vec<&str> {
    draws.iter().map(|draw| draw.name.as_str()).collect()
}

fn render(stage: &mut Stage, effect: &GlobalEffect) -> Result<crate::render::FrameStats, RenderError> {
    stage
        .renderer
        .render_frame(&mut stage.scene, &mut stage.culler, stage.root, 0.0, Some(effect))
}

fn assert_restored(stage: &Stage) {
    let device = stage.renderer.backend().device_state();
    assert_eq!(device.color_mask, ColorMask::all());
    assert_eq!(device.depth_range, (0.0, 1.0));
    assert!(!device.stencil.enabled);
    assert!(stage.renderer.camera().pre_view_matrix().is_none());
}

#[test]
fn test_shadow_pass_sequence() {
    let mut stage = stage();
    let effect: GlobalEffect = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, sun(), SHADOW_COLOR).into();

    let stats = render(&mut stage, &effect).unwrap();
    assert_eq!(stats.planes_drawn, 1);
    assert_eq!(stats.planes_skipped, 0);
    assert_eq!(stats.draw_calls, 4);

    let draws = draws(&stage);
    assert_eq!(names(&draws), vec!["floor", "cube", "floor", "cube"]);

    let mark = &draws[0];
    assert_eq!(mark.state.stencil, StencilState::mark(1));
    assert_eq!(mark.state.depth, DepthState { enabled: true, writable: false, compare: CompareFunction::LessEqual });
    assert_eq!(mark.state.color_mask, ColorMask::empty());

    let shadow = &draws[1];
    assert_eq!(shadow.state.stencil, StencilState::equal(1, StencilOp::Zero));
    assert!(!shadow.state.depth.enabled);
    assert!(shadow.state.alpha.blend_enabled);
    assert_eq!(shadow.state.alpha.src_blend, BlendFactor::SrcAlpha);
    assert_eq!(shadow.state.alpha.dst_blend, BlendFactor::SrcAlpha);
    assert_eq!(shadow.state.color_mask, ColorMask::all());
    assert_eq!(shadow.effect, Effect::flat_material(SHADOW_COLOR).kind);
    assert_eq!(shadow.uniforms.diffuse, [0.0, 0.0, 0.0, 0.5]);
    assert_ne!(shadow.pre_view, Mat4::identity());

    for normal in &draws[2..] {
        assert_eq!(normal.pre_view, Mat4::identity());
        assert!(!normal.state.stencil.enabled);
        assert!(!normal.state.alpha.blend_enabled);
        assert_eq!(normal.state.depth, DepthState::default());
        assert_eq!(normal.effect, Effect::default().kind);
    }
    assert_restored(&stage);
}

#[test]
fn test_straight_down_light_casts_one_to_one_silhouette() {
    let mut stage = stage();
    let effect: GlobalEffect = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, sun(), SHADOW_COLOR).into();
    render(&mut stage, &effect).unwrap();

    let shadow = draws(&stage)[1].clone();
    let expected = oblique_projection(&Plane::new(Vec3::y(), 0.0), &Vec3::new(0.0, -1.0, 0.0)).unwrap();
    assert_relative_eq!(shadow.pre_view, expected, epsilon = 1e-6);

    for index in 0..12 {
        for corner in stage.scene.world_triangle(stage.cube, index).unwrap() {
            let projected = shadow.pre_view.transform_point(&corner);
            assert_relative_eq!(projected, Point3::new(corner.x, 0.0, corner.z), epsilon = 1e-5);
        }
    }
}

#[test]
fn test_point_light_below_plane_skips_caster_redraw() {
    let mut stage = stage();
    let below = Light::point(Vec3::new(0.0, -3.0, 0.0), Vec3::new(1.0, 1.0, 1.0), Attenuation::default());
    let shadows = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, below, SHADOW_COLOR);

    stage.scene.update(0.0);
    assert_eq!(shadows.projection(&stage.scene, 0).unwrap(), Err(GeometryRejection::LightBehindPlane));

    let stats = render(&mut stage, &GlobalEffect::from(shadows)).unwrap();
    assert_eq!(stats.planes_skipped, 1);

    let draws = draws(&stage);
    assert_eq!(names(&draws), vec!["floor", "floor", "cube"]);
    assert!(draws.iter().all(|draw| draw.state.stencil.compare != CompareFunction::Equal));
    assert_restored(&stage);
}

#[test]
fn test_point_light_above_plane_projects_from_light() {
    let mut stage = stage();
    let lamp = Light::point(Vec3::new(0.0, 4.0, 0.0), Vec3::new(1.0, 1.0, 1.0), Attenuation::default());
    let effect: GlobalEffect = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, lamp, SHADOW_COLOR).into();
    render(&mut stage, &effect).unwrap();

    let shadow = draws(&stage)[1].clone();
    // Halfway between lamp and floor, offsets from the lamp's foot double.
    let projected = shadow.pre_view.transform_point(&Point3::new(0.5, 2.0, -0.5));
    assert_relative_eq!(projected, Point3::new(1.0, 0.0, -1.0), epsilon = 1e-5);
}

#[test]
fn test_spot_light_projects_from_its_position() {
    let mut stage = stage();
    let spot = Light::spot(
        Vec3::new(1.0, 4.0, 0.0),
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 1.0),
        Attenuation::default(),
        0.8,
        1.0,
    );
    let effect: GlobalEffect = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, spot, SHADOW_COLOR).into();
    let stats = render(&mut stage, &effect).unwrap();
    assert_eq!(stats.planes_drawn, 1);

    let shadow = draws(&stage)[1].clone();
    let projected = shadow.pre_view.transform_point(&Point3::new(0.5, 2.0, -0.5));
    assert_relative_eq!(projected, Point3::new(0.0, 0.0, -1.0), epsilon = 1e-5);

    let floor = Plane::new(Vec3::y(), 0.0);
    let directional = oblique_projection(&floor, &Vec3::new(0.0, -1.0, 0.0)).unwrap();
    assert!(!approx::relative_eq!(shadow.pre_view, directional, epsilon = 1e-4));
}

#[test]
fn test_caster_behind_plane_is_skipped() {
    let mut stage = stage();
    stage.scene.set_local_transform(stage.cube, Transform::from_position(Vec3::new(0.0, -3.0, 0.0))).unwrap();
    let shadows = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, sun(), SHADOW_COLOR);

    stage.scene.update(0.0);
    assert_eq!(shadows.projection(&stage.scene, 0).unwrap(), Err(GeometryRejection::CasterBehindPlane));

    let stage_scene = &stage.scene;
    let visible = stage.culler.compute_visible_set(stage_scene, stage.root).unwrap().clone();
    let report = GlobalEffect::from(shadows).draw(&mut stage.renderer, stage_scene, &visible).unwrap();
    assert_eq!(
        report.outcomes,
        vec![PlaneOutcome::Skipped { phase: PlanePhase::StencilMark, reason: GeometryRejection::CasterBehindPlane }]
    );
}

#[test]
fn test_shadow_planes_use_distinct_references() {
    let mut stage = stage();
    let step = stage.scene.create_mesh("step", TriMesh::horizontal_quad(1.0, 0.0), Effect::default());
    stage.scene.attach_child(stage.root, step).unwrap();
    stage.scene.set_local_transform(step, Transform::from_position(Vec3::new(3.0, 0.5, 0.0))).unwrap();

    let effect: GlobalEffect = PlanarShadowEffect::new(stage.caster)
        .with_plane(stage.floor, sun(), SHADOW_COLOR)
        .with_plane(step, sun(), SHADOW_COLOR)
        .into();
    let stats = render(&mut stage, &effect).unwrap();
    assert_eq!(stats.planes_drawn, 2);

    let draws = draws(&stage);
    let marks: Vec<u32> = draws
        .iter()
        .filter(|draw| draw.state.stencil.enabled && draw.state.stencil.compare == CompareFunction::Always)
        .map(|draw| draw.state.stencil.reference)
        .collect();
    let redraws: Vec<u32> = draws
        .iter()
        .filter(|draw| draw.state.stencil.enabled && draw.state.stencil.compare == CompareFunction::Equal)
        .map(|draw| draw.state.stencil.reference)
        .collect();
    assert_eq!(marks, vec![1, 2]);
    assert_eq!(redraws, vec![1, 2]);
}

#[test]
fn test_contract_violations_fail_before_device_calls() {
    let mut stage = stage_with(RendererConfig { stencil_bits: 1, ..RendererConfig::default() }, Vec3::new(0.0, 6.0, 10.0));
    let step = stage.scene.create_mesh("step", TriMesh::horizontal_quad(1.0, 0.0), Effect::default());
    stage.scene.attach_child(stage.root, step).unwrap();

    let duplicate: GlobalEffect = PlanarShadowEffect::new(stage.caster)
        .with_plane(stage.floor, sun(), SHADOW_COLOR)
        .with_plane(stage.floor, sun(), SHADOW_COLOR)
        .into();
    assert!(matches!(render(&mut stage, &duplicate), Err(RenderError::StencilReferenceOverflow { planes: 2, max: 1 })));

    let duplicate: GlobalEffect = PlanarReflectionEffect::new().with_plane(step, 0.5).with_plane(step, 0.5).into();
    assert!(matches!(render(&mut stage, &duplicate), Err(RenderError::StencilReferenceOverflow { .. })));

    let group_plane: GlobalEffect = PlanarReflectionEffect::new().with_plane(stage.caster, 0.5).into();
    assert!(matches!(render(&mut stage, &group_plane), Err(RenderError::NotAMesh(name)) if name == "caster"));

    assert!(stage.renderer.backend().calls().is_empty());
}

#[test]
fn test_duplicate_plane_is_rejected() {
    let mut stage = stage();
    let effect: GlobalEffect = PlanarShadowEffect::new(stage.caster)
        .with_plane(stage.floor, sun(), SHADOW_COLOR)
        .with_plane(stage.floor, sun(), SHADOW_COLOR)
        .into();
    assert!(matches!(render(&mut stage, &effect), Err(RenderError::DuplicatePlane(name)) if name == "floor"));
    assert!(stage.renderer.backend().calls().is_empty());

    let shadows = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, sun(), SHADOW_COLOR);
    assert!(matches!(shadows.plane(3), Err(RenderError::PlaneIndexOutOfRange { index: 3, count: 1 })));
}

#[test]
fn test_reflection_pass_sequence() {
    let mut stage = stage();
    let effect: GlobalEffect = PlanarReflectionEffect::new().with_plane(stage.floor, 0.4).into();

    let stats = render(&mut stage, &effect).unwrap();
    assert_eq!(stats.planes_drawn, 1);
    assert_eq!(stats.draw_calls, 6);

    let draws = draws(&stage);
    assert_eq!(names(&draws), vec!["floor", "floor", "cube", "floor", "floor", "cube"]);

    let mark = &draws[0];
    assert_eq!(mark.state.stencil, StencilState::mark(1));
    assert_eq!(mark.state.color_mask, ColorMask::empty());

    let push = &draws[1];
    assert_eq!(push.state.depth_range, (1.0, 1.0));
    assert_eq!(push.state.depth, DepthState { enabled: true, writable: true, compare: CompareFunction::Always });
    assert_eq!(push.state.stencil, StencilState::equal(1, StencilOp::Keep));
    assert_eq!(push.state.color_mask, ColorMask::empty());

    let reflected = &draws[2];
    assert_relative_eq!(reflected.pre_view, reflection_matrix(&Plane::new(Vec3::y(), 0.0)), epsilon = 1e-6);
    assert!(!reflected.state.cull.ccw_order);
    assert_eq!(reflected.state.stencil, StencilState::equal(1, StencilOp::Keep));
    assert_eq!(reflected.state.depth, DepthState::default());
    assert_eq!(reflected.state.depth_range, (0.0, 1.0));
    assert_eq!(reflected.state.color_mask, ColorMask::all());
    let mirrored = reflected.pre_view.transform_point(&Point3::new(0.0, 2.0, 0.0));
    assert_relative_eq!(mirrored, Point3::new(0.0, -2.0, 0.0), epsilon = 1e-6);

    let composite = &draws[3];
    assert_eq!(composite.pre_view, Mat4::identity());
    assert!(composite.state.cull.ccw_order);
    assert!(composite.state.alpha.blend_enabled);
    assert_eq!(composite.state.alpha.src_blend, BlendFactor::OneMinusConstantAlpha);
    assert_eq!(composite.state.alpha.dst_blend, BlendFactor::ConstantAlpha);
    assert_eq!(composite.state.alpha.constant_color, [0.0, 0.0, 0.0, 0.4]);
    assert_eq!(composite.state.stencil, StencilState::equal(1, StencilOp::Invert));

    for normal in &draws[4..] {
        assert!(!normal.state.stencil.enabled);
        assert!(!normal.state.alpha.blend_enabled);
        assert!(normal.state.cull.ccw_order);
    }
    assert_restored(&stage);
}

#[test]
fn test_depth_push_restores_range_and_compare_immediately() {
    let mut stage = stage();
    let effect: GlobalEffect = PlanarReflectionEffect::new().with_plane(stage.floor, 0.4).into();
    render(&mut stage, &effect).unwrap();

    let calls = stage.renderer.backend().calls();
    let push = calls
        .iter()
        .enumerate()
        .filter(|(_, call)| matches!(call, DeviceCall::Draw(_)))
        .nth(1)
        .map(|(index, _)| index)
        .unwrap();
    assert_eq!(calls[push + 1], DeviceCall::DepthRange(0.0, 1.0));
    assert_eq!(calls[push + 2], DeviceCall::DepthFunc(CompareFunction::LessEqual));
    // The mark pass left depth writes off; the push turned them on
    assert_eq!(calls[push + 3], DeviceCall::DepthWriteEnabled(false));

    let clear = calls.iter().position(|call| *call == DeviceCall::ClearStencil(0)).unwrap();
    let final_pass = calls
        .iter()
        .enumerate()
        .filter(|(_, call)| matches!(call, DeviceCall::Draw(_)))
        .nth(4)
        .map(|(index, _)| index)
        .unwrap();
    assert!(clear < final_pass);
}

#[test]
fn test_degenerate_mirror_is_skipped() {
    let mut stage = stage();
    let sliver = TriMesh::new(
        vec![Point3::new(-1.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
        vec![0, 1, 2],
    );
    let mirror = stage.scene.create_mesh("sliver", sliver, Effect::default());
    stage.scene.attach_child(stage.root, mirror).unwrap();

    let effect: GlobalEffect = PlanarReflectionEffect::new().with_plane(mirror, 0.5).into();
    let stats = render(&mut stage, &effect).unwrap();
    assert_eq!(stats.planes_skipped, 1);

    let draws = draws(&stage);
    assert_eq!(names(&draws), vec!["sliver", "floor", "cube", "sliver"]);
    assert!(draws.iter().all(|draw| draw.state.depth_range == (0.0, 1.0)));
    assert_restored(&stage);
}

#[test]
fn test_eye_on_mirror_plane_stays_finite() {
    let mut stage = stage_with(RendererConfig::default(), Vec3::new(0.0, 0.0, 10.0));
    let effect: GlobalEffect = PlanarReflectionEffect::new().with_plane(stage.floor, 0.5).into();
    render(&mut stage, &effect).unwrap();

    for draw in draws(&stage) {
        assert!(is_finite_matrix(&draw.pre_view));
        assert!(draw.uniforms.model_view_projection.iter().flatten().all(|value| value.is_finite()));
    }
}

#[test]
fn test_mirror_planes_agree_between_spaces() {
    let mut stage = stage();
    stage.scene.set_local_transform(stage.floor, Transform::from_position(Vec3::new(0.0, -1.5, 0.0))).unwrap();
    stage.scene.update(0.0);

    let effect = PlanarReflectionEffect::new().with_plane(stage.floor, 0.5);
    let planes = effect.mirror_planes(&stage.scene, 0).unwrap().unwrap();
    assert_relative_eq!(planes.model.normal, Vec3::y(), epsilon = 1e-6);
    assert_relative_eq!(planes.model.constant, 0.0, epsilon = 1e-6);
    assert_relative_eq!(planes.world.normal, Vec3::y(), epsilon = 1e-6);
    assert_relative_eq!(planes.world.constant, -1.5, epsilon = 1e-6);
    assert!(matches!(effect.mirror_planes(&stage.scene, 1), Err(RenderError::PlaneIndexOutOfRange { .. })));
}

#[test]
fn test_second_frame_reuses_cached_state() {
    let mut stage = stage();
    let effect: GlobalEffect = PlanarShadowEffect::new(stage.caster).with_plane(stage.floor, sun(), SHADOW_COLOR).into();
    let first = render(&mut stage, &effect).unwrap();
    let second = render(&mut stage, &effect).unwrap();
    assert_eq!(first.draw_calls, second.draw_calls);
    assert!(second.state_calls <= first.state_calls);
    assert_restored(&stage);
}
