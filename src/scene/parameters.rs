use std::num::NonZeroU32;

use bon::Builder;

use super::material::Color;

/// Per-frame values handed to the compute backend together with the scene.
#[derive(Builder, Copy, Clone, Debug, PartialEq)]
pub struct SceneParameters {
    /// When false, the kernel intersects every sphere instead of walking the BVH.
    #[builder(default = true)]
    pub bvh_enabled: bool,

    /// Maximum number of ray segments traced per sample.
    #[builder(default = 10)]
    pub max_bounces: u32,

    #[builder(default = NonZeroU32::MIN)]
    pub samples_per_pixel: NonZeroU32,

    /// Radiance returned by rays that leave the scene
    #[builder(default = Color::repeat(1.0))]
    pub background: Color,
}

impl Default for SceneParameters {
    fn default() -> Self {
        SceneParameters::builder().build()
    }
}
