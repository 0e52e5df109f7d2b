//! # Rendering
//!
//! Drives a [`RenderBackend`] from a culled scene graph.
//!
//! ## Architecture
//!
//! - **Renderer**: owns the backend, the state cache and the camera; draws
//!   visible sets under a [`RenderContext`]
//! - **State cache**: the only code that changes fixed-function device state
//! - **Effects**: per-drawable shading model plus render states
//! - **Planar effects**: multi-pass stencil shadows and mirrors layered on
//!   top of a normal frame

pub mod api;
pub mod backends;
pub mod context;
pub mod effect;
pub mod lighting;
pub mod planar;
pub mod primitives;
pub mod renderer;
pub mod state;

pub use api::{BackendResult, DrawCall, ObjectUniforms, RenderBackend};
pub use context::RenderContext;
pub use effect::{Effect, EffectKind, MaterialColors, TextureHandle};
pub use lighting::{Attenuation, Light, LightType};
pub use planar::{GlobalEffect, PlanarReflectionEffect, PlanarShadowEffect};
pub use primitives::Camera;
pub use renderer::{FrameStats, Renderer};

use thiserror::Error;

use crate::config::ConfigError;
use crate::scene::{CullerError, SceneError};

/// Rendering errors
///
/// Planes that are geometrically unusable for one frame are not errors;
/// they are skipped and reported in the frame statistics. These variants
/// signal caller misuse and abort the operation before any device call.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A plane index outside the configured planes
    #[error("Plane index {index} out of range ({count} planes configured)")]
    PlaneIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of configured planes
        count: usize,
    },

    /// More planes than distinct stencil references
    #[error("{planes} planes need stencil references up to {planes}, but the stencil buffer holds at most {max}")]
    StencilReferenceOverflow {
        /// Number of configured planes
        planes: usize,
        /// Largest usable reference
        max: u32,
    },

    /// The same drawable configured as two planes would share a stencil footprint
    #[error("Node '{0}' is configured as more than one plane")]
    DuplicatePlane(String),

    /// A draw or plane slot needs a mesh leaf
    #[error("Node '{0}' is not a mesh")]
    NotAMesh(String),

    /// Scene graph lookup failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Culler setup failed
    #[error("Culler error: {0}")]
    Culler(#[from] CullerError),

    /// Renderer configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
