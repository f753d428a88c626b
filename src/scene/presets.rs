//! Hand-authored and procedurally generated demo scenes.
//!
//! Every preset comes with the camera placement and scene parameters it was
//! designed for.

use std::num::NonZeroU32;

use itertools::Itertools as _;
use rand::{Rng, SeedableRng as _, rngs::SmallRng};

use crate::{
    camera::Camera,
    geometry::{FloatType, WorldPoint, WorldVector},
};

use super::{Color, InvalidSceneError, Material, Scene, SceneParameters, Sphere};

const THREE_SPHERES_SAMPLES: NonZeroU32 = NonZeroU32::new(100).unwrap();

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preset {
    /// Glass, diffuse and metal sphere next to each other on a large ground sphere
    ThreeSpheres,
    /// Three large spheres surrounded by a grid of small randomized ones.
    /// With `seed` set the scene is reproducible.
    Random { seed: Option<u64> },
    /// Dark scene lit only by three colored emissive spheres
    Lights,
    /// Box made of five huge spheres with a light in the ceiling
    CornellBox,
}

impl Preset {
    pub fn scene(&self) -> Result<Scene, InvalidSceneError> {
        let spheres = match *self {
            Preset::ThreeSpheres => three_spheres(),
            Preset::Random { seed } => {
                let mut rng = match seed {
                    Some(seed) => SmallRng::seed_from_u64(seed),
                    None => SmallRng::from_os_rng(),
                };
                random_spheres(&mut rng)
            }
            Preset::Lights => lights(),
            Preset::CornellBox => cornell_box(),
        };
        Scene::new(spheres)
    }

    pub fn default_aspect_ratio(&self) -> FloatType {
        match self {
            Preset::CornellBox => 1.0,
            _ => 16.0 / 9.0,
        }
    }

    pub fn camera(&self, aspect_ratio: FloatType) -> Camera {
        let up = WorldVector::new(0.0, 1.0, 0.0);
        let builder = match self {
            Preset::ThreeSpheres => Camera::builder()
                .look_from(WorldPoint::new(-2.0, 2.0, 1.0))
                .look_at(WorldPoint::new(0.0, 0.0, -1.0))
                .vertical_fov(20.0),
            Preset::Random { .. } => Camera::builder()
                .look_from(WorldPoint::new(13.0, 2.0, 3.0))
                .look_at(WorldPoint::new(0.0, 0.0, 0.0))
                .vertical_fov(20.0),
            Preset::Lights => Camera::builder()
                .look_from(WorldPoint::new(0.0, 2.0, 13.0))
                .look_at(WorldPoint::new(0.0, 0.0, 0.0))
                .vertical_fov(20.0),
            Preset::CornellBox => Camera::builder()
                .look_from(WorldPoint::new(0.0, 0.0, 6.0))
                .look_at(WorldPoint::new(0.0, 0.0, 0.0))
                .vertical_fov(45.0),
        };
        let (aperture, focus_distance) = match self {
            Preset::Random { .. } => (0.1, 10.0),
            _ => (0.0, 1.0),
        };

        builder
            .up(up)
            .aspect_ratio(aspect_ratio)
            .aperture(aperture)
            .focus_distance(focus_distance)
            .build()
    }

    pub fn parameters(&self) -> SceneParameters {
        let builder = SceneParameters::builder();
        match self {
            Preset::ThreeSpheres => builder
                .max_bounces(5)
                .samples_per_pixel(THREE_SPHERES_SAMPLES)
                .build(),
            Preset::Random { .. } => builder.max_bounces(10).build(),
            Preset::Lights => builder.background(Color::repeat(0.1)).build(),
            Preset::CornellBox => builder.background(Color::zeros()).build(),
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "three-spheres" => Ok(Preset::ThreeSpheres),
            "random" => Ok(Preset::Random { seed: None }),
            "lights" => Ok(Preset::Lights),
            "cornell-box" => Ok(Preset::CornellBox),
            other => {
                if let Some(seed) = other.strip_prefix("random:") {
                    seed.parse()
                        .map(|seed| Preset::Random { seed: Some(seed) })
                        .map_err(|e| format!("Invalid seed {seed:?}: {e}"))
                } else {
                    Err(format!("Unknown preset {other:?}"))
                }
            }
        }
    }
}

fn three_spheres() -> Vec<Sphere> {
    vec![
        Sphere::new(
            WorldPoint::new(-1.0, 0.0, -1.0),
            0.5,
            Material::dielectric(Color::repeat(1.0), 1.5),
        ),
        Sphere::new(
            WorldPoint::new(0.0, 0.0, -1.0),
            0.5,
            Material::diffuse(Color::new(0.1, 0.2, 0.5)),
        ),
        Sphere::new(
            WorldPoint::new(1.0, 0.0, -1.0),
            0.5,
            Material::metal(Color::new(0.8, 0.6, 0.2), 0.0),
        ),
        Sphere::new(
            WorldPoint::new(0.0, -100.5, -1.0),
            100.0,
            Material::diffuse(Color::new(0.8, 0.8, 0.0)),
        ),
    ]
}

/// Large spheres at the start of the random scene.
fn random_scene_anchors() -> Vec<Sphere> {
    vec![
        Sphere::new(
            WorldPoint::new(0.0, 1.0, 0.0),
            1.0,
            Material::dielectric(Color::repeat(1.0), 1.5),
        ),
        Sphere::new(
            WorldPoint::new(-4.0, 1.0, 0.0),
            1.0,
            Material::diffuse(Color::new(0.4, 0.2, 0.1)),
        ),
        Sphere::new(
            WorldPoint::new(4.0, 1.0, 0.0),
            1.0,
            Material::metal(Color::new(0.7, 0.6, 0.5), 0.0),
        ),
        Sphere::new(
            WorldPoint::new(0.0, -1000.0, 0.0),
            1000.0,
            Material::diffuse(Color::repeat(0.5)),
        ),
    ]
}

fn random_spheres(rng: &mut impl Rng) -> Vec<Sphere> {
    const SMALL_RADIUS: FloatType = 0.2;
    const DIFFUSE_THRESHOLD: FloatType = 0.8;
    const METAL_THRESHOLD: FloatType = 0.95;

    let mut spheres = random_scene_anchors();
    let keep_clear = WorldPoint::new(4.0, SMALL_RADIUS, 0.0);

    for (a, b) in (-11..11).cartesian_product(-11..11) {
        let choose_material: FloatType = rng.random();
        let center = WorldPoint::new(
            a as FloatType + 0.9 * rng.random::<FloatType>(),
            SMALL_RADIUS,
            b as FloatType + 0.9 * rng.random::<FloatType>(),
        );

        if (center - keep_clear).norm() <= 0.9 {
            continue;
        }

        let material = if choose_material < DIFFUSE_THRESHOLD {
            Material::diffuse(random_color(rng, 0.0..1.0))
        } else if choose_material < METAL_THRESHOLD {
            let albedo = random_color(rng, 0.5..1.0);
            Material::metal(albedo, rng.random_range(0.0..0.5))
        } else {
            Material::dielectric(Color::repeat(1.0), 1.5)
        };
        spheres.push(Sphere::new(center, SMALL_RADIUS, material));
    }

    spheres
}

fn random_color(rng: &mut impl Rng, range: std::ops::Range<FloatType>) -> Color {
    Color::new(
        rng.random_range(range.clone()),
        rng.random_range(range.clone()),
        rng.random_range(range),
    )
}

fn lights() -> Vec<Sphere> {
    vec![
        Sphere::new(
            WorldPoint::new(0.0, -1000.0, 0.0),
            1000.0,
            Material::diffuse(Color::repeat(0.5)),
        ),
        Sphere::new(
            WorldPoint::new(0.0, 1.0, 0.0),
            1.0,
            Material::diffuse(Color::new(0.1, 0.2, 0.5)),
        ),
        Sphere::new(
            WorldPoint::new(-2.0, 0.5, 2.0),
            0.5,
            Material::emissive(Color::new(1.0, 0.1, 0.1)),
        ),
        Sphere::new(
            WorldPoint::new(0.0, 0.5, 5.0),
            0.5,
            Material::emissive(Color::new(0.1, 1.0, 0.1)),
        ),
        Sphere::new(
            WorldPoint::new(2.0, 0.5, 2.0),
            0.5,
            Material::emissive(Color::new(0.1, 0.1, 1.0)),
        ),
    ]
}

fn cornell_box() -> Vec<Sphere> {
    let white = Material::diffuse(Color::repeat(1.0));
    vec![
        // Floor
        Sphere::new(WorldPoint::new(0.0, -102.0, 0.0), 100.0, white),
        // Left wall
        Sphere::new(
            WorldPoint::new(-102.0, 0.0, 0.0),
            100.0,
            Material::diffuse(Color::new(0.65, 0.05, 0.05)),
        ),
        // Right wall
        Sphere::new(
            WorldPoint::new(102.0, 0.0, 0.0),
            100.0,
            Material::diffuse(Color::new(0.12, 0.45, 0.15)),
        ),
        // Back wall
        Sphere::new(WorldPoint::new(0.0, 0.0, -101.5), 100.0, white),
        // Ceiling
        Sphere::new(WorldPoint::new(0.0, 102.0, 0.0), 100.0, white),
        // Light, coincident with the ceiling
        Sphere::new(
            WorldPoint::new(0.0, 102.0, 0.0),
            100.0,
            Material::emissive(Color::repeat(1.0)),
        ),
        Sphere::new(WorldPoint::new(-1.1, -1.5, -0.7), 0.5, white),
        Sphere::new(
            WorldPoint::new(1.1, -1.5, -0.7),
            0.5,
            Material::metal(Color::repeat(1.0), 0.0),
        ),
        Sphere::new(
            WorldPoint::new(0.0, 0.0, -0.5),
            0.5,
            Material::dielectric(Color::repeat(1.0), 1.5),
        ),
    ]
}
