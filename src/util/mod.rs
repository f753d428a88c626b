mod stats;

pub use stats::Stats;

/// Linear color with alpha, the accumulation format of the renderers.
pub type Rgba = rgb::RGBA<f32>;

/// Converts a linear color component to an 8 bit value with gamma 2 applied.
pub fn gamma_encode(linear: f32) -> u8 {
    let encoded = linear.max(0.0).sqrt().min(1.0);
    (encoded * 255.0 + 0.5) as u8
}
