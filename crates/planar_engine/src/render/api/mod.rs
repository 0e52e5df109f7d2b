//! High-level rendering API definitions

pub mod render_backend;

pub use render_backend::{RenderBackend, BackendResult, DrawCall, ObjectUniforms};
