pub mod backend;
pub mod bvh;
mod camera;
pub mod geometry;
pub mod packing;
mod renderer;
pub mod scene;
mod screen_block;
pub mod util;

pub use crate::backend::{BackendError, ComputeBackend, CpuBackend, RenderSettings};
pub use crate::renderer::{RenderError, RenderOutput, Renderer};
pub use bvh::SphereBvh;
pub use camera::Camera;
pub use packing::{IndexEncoding, PackError, PackedScene};
pub use scene::{Scene, SceneParameters};
