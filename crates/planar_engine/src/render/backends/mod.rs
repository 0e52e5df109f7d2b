//! Graphics backend implementations
//!
//! Only the headless recording backend lives in this crate; GPU backends
//! implement [`RenderBackend`](crate::render::api::RenderBackend) downstream.

pub mod recording;

pub use recording::{DeviceCall, DeviceState, DrawRecord, RecordingBackend};
