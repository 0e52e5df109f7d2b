//! # Planar Engine
//!
//! Rendering correctness core of a 3D engine: hierarchical scene-graph
//! culling, a render-state cache that elides redundant device calls, and
//! stencil-buffer planar shadows and mirrors built on both.
//!
//! ## Features
//!
//! - **Scene graph**: arena of group and mesh nodes with world transforms
//!   and bounding spheres kept consistent by an update pass
//! - **Culling**: frustum and user planes tested with a monotonic plane mask
//! - **State cache**: five fixed-function state categories with override
//!   slots, mirrored so only changed values reach the device
//! - **Planar effects**: projected shadows and reflections, multi-pass and
//!   stencil masked
//!
//! ## Quick Start
//!
//! ```rust
//! use planar_engine::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let mut scene = SceneGraph::new();
//!     let root = scene.create_group("root");
//!     let floor = scene.create_mesh("floor", TriMesh::horizontal_quad(5.0, 0.0), Effect::default());
//!     let crate_box = scene.create_mesh("box", TriMesh::cube(0.5), Effect::default());
//!     scene.attach_child(root, floor)?;
//!     scene.attach_child(root, crate_box)?;
//!     scene.set_local_transform(crate_box, Transform::from_position(Vec3::new(0.0, 1.0, 0.0)))?;
//!
//!     let camera = Camera::perspective(Vec3::new(0.0, 4.0, 8.0), 60.0, 16.0 / 9.0, 0.1, 100.0);
//!     let mut renderer = Renderer::new(RecordingBackend::new(), camera, RendererConfig::default())?;
//!     let mut culler = Culler::new(&renderer.camera().frustum());
//!
//!     let shadows: GlobalEffect = PlanarShadowEffect::new(crate_box)
//!         .with_plane(floor, Light::directional(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0)), Vec4::new(0.0, 0.0, 0.0, 0.5))
//!         .into();
//!     let stats = renderer.render_frame(&mut scene, &mut culler, root, 0.0, Some(&shadows))?;
//!     assert_eq!(stats.planes_drawn, 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, RendererConfig},
        foundation::math::{Mat4, Point3, Quat, Transform, Vec3, Vec4},
        render::{
            backends::RecordingBackend,
            planar::{GlobalEffect, PlanarReflectionEffect, PlanarShadowEffect},
            Camera, Effect, EffectKind, FrameStats, Light, RenderContext, RenderError, Renderer,
        },
        scene::{Culler, CullingMode, NodeId, SceneError, SceneGraph, TriMesh},
    };
}
