//! The contract between the packed scene and whatever executes the per-pixel kernel.

mod cpu;

use image::RgbaImage;
use thiserror::Error;

use crate::{geometry::ScreenSize, packing::PackedScene};

pub use cpu::{CpuBackend, RenderSettings, color_to_image};

#[derive(Debug, Error, PartialEq)]
pub enum BackendError {
    /// The backend can't run on this machine.
    #[error("Compute backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the packed input.
    #[error("Compute backend rejected the scene: {0}")]
    Rejected(String),
}

/// Executes one kernel invocation per pixel of `resolution` over a packed scene.
///
/// The scene is only borrowed for the duration of the call and the returned
/// image is complete: all work has finished before `dispatch` returns.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn dispatch(
        &self,
        scene: &PackedScene,
        resolution: ScreenSize,
    ) -> Result<RgbaImage, BackendError>;
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dispatch(
        &self,
        scene: &PackedScene,
        resolution: ScreenSize,
    ) -> Result<RgbaImage, BackendError> {
        (**self).dispatch(scene, resolution)
    }
}
