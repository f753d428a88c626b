use image::RgbaImage;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use rand_distr::{Distribution as _, UnitBall, UnitDisc, UnitSphere};

use crate::{
    geometry::{FloatType, HitRecord, Ray, ScreenBlock, ScreenPoint, ScreenSize, WorldVector},
    scene::{Color, Material},
    screen_block::ScreenBlockExt as _,
    util::{Rgba, gamma_encode},
};

use super::{
    decode::{KernelCamera, KernelScene},
    traversal,
};

/// Offset of the ray start from the previous hit, avoids re-hitting the same surface.
const T_MIN: FloatType = 0.001;

pub struct Worker {
    rng: SmallRng,
    bvh_stack_cache: Vec<u32>,
}

/// What happens to a ray at a surface.
#[derive(Clone, Debug)]
pub enum Interaction {
    Scattered { attenuation: Color, ray: Ray },
    Emitted(Color),
    Absorbed,
}

impl Worker {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            rng,
            bvh_stack_cache: Vec::new(),
        }
    }

    pub fn render_tile(
        &mut self,
        scene: &KernelScene,
        resolution: ScreenSize,
        tile: &ScreenBlock,
        buffer: &mut RgbaImage,
    ) {
        let samples = scene.samples_per_pixel;
        for point in tile.internal_points() {
            let mut pixel_sum = Color::zeros();
            for _i in 0..samples {
                pixel_sum += self.render_sample(scene, resolution, &point);
            }
            let pixel = pixel_sum / samples as FloatType;

            let buffer_position = point - tile.min;
            buffer.put_pixel(
                buffer_position.x,
                buffer_position.y,
                color_to_image(Rgba::new(pixel.x, pixel.y, pixel.z, 1.0)),
            );
        }
    }

    fn render_sample(
        &mut self,
        scene: &KernelScene,
        resolution: ScreenSize,
        point: &ScreenPoint,
    ) -> Color {
        let ray = sample_ray(&scene.camera, resolution, point, &mut self.rng);
        self.ray_color(scene, ray)
    }

    /// Follows a path through the scene for at most `max_bounces` segments.
    pub fn ray_color(&mut self, scene: &KernelScene, mut ray: Ray) -> Color {
        let mut throughput = Color::repeat(1.0);

        for _ in 0..scene.max_bounces {
            let Some(hit) = traversal::hit(
                scene,
                &ray,
                T_MIN,
                FloatType::INFINITY,
                &mut self.bvh_stack_cache,
            ) else {
                return throughput.component_mul(&scene.background);
            };

            let material = &scene.spheres[hit.sphere as usize].material;
            match scatter(material, &ray, &hit, &mut self.rng) {
                Interaction::Scattered {
                    attenuation,
                    ray: scattered,
                } => {
                    throughput.component_mul_assign(&attenuation);
                    ray = scattered;
                }
                Interaction::Emitted(color) => return throughput.component_mul(&color),
                Interaction::Absorbed => return Color::zeros(),
            }
        }

        // Ran out of bounces
        Color::zeros()
    }
}

/// Camera ray through a random position inside the pixel, starting at a random
/// point of the lens.
/// Pixel rows go top to bottom.
pub fn sample_ray(
    camera: &KernelCamera,
    resolution: ScreenSize,
    point: &ScreenPoint,
    rng: &mut impl Rng,
) -> Ray {
    let s = (point.x as FloatType + rng.random::<FloatType>()) / resolution.x as FloatType;
    let t = 1.0 - (point.y as FloatType + rng.random::<FloatType>()) / resolution.y as FloatType;

    let lens_uv: [FloatType; 2] = UnitDisc.sample(rng);
    let offset = camera.u * (camera.lens_radius * lens_uv[0])
        + camera.v * (camera.lens_radius * lens_uv[1]);

    let origin = camera.origin + offset;
    let target = camera.lower_left_corner + camera.horizontal * s + camera.vertical * t;

    Ray::new(origin, target - origin)
}

pub fn scatter(
    material: &Material,
    ray: &Ray,
    hit: &HitRecord,
    rng: &mut impl Rng,
) -> Interaction {
    match *material {
        Material::Diffuse { color } => {
            let mut direction = hit.normal.as_ref() + random_unit_vector(rng);
            // Random vector almost exactly opposite to the normal
            if direction.iter().all(|x| x.abs() < 1e-8) {
                direction = hit.normal.into_inner();
            }
            Interaction::Scattered {
                attenuation: color,
                ray: Ray::new(hit.point, direction),
            }
        }
        Material::Metal { color, fuzz } => {
            let reflected = reflect(ray.direction.as_ref(), hit.normal.as_ref());
            let direction = reflected + random_in_unit_sphere(rng) * fuzz;
            if direction.dot(&hit.normal) > 0.0 {
                Interaction::Scattered {
                    attenuation: color,
                    ray: Ray::new(hit.point, direction),
                }
            } else {
                Interaction::Absorbed
            }
        }
        Material::Dielectric { color, ior } => {
            let ratio = if hit.front_face { 1.0 / ior } else { ior };
            let unit_direction = ray.direction.as_ref();
            let cos_theta = (-unit_direction).dot(&hit.normal).min(1.0);
            let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

            let cannot_refract = ratio * sin_theta > 1.0;
            let direction =
                if cannot_refract || reflectance(cos_theta, ratio) > rng.random::<FloatType>() {
                    reflect(unit_direction, hit.normal.as_ref())
                } else {
                    refract(unit_direction, hit.normal.as_ref(), ratio)
                };

            Interaction::Scattered {
                attenuation: color,
                ray: Ray::new(hit.point, direction),
            }
        }
        Material::Emissive { color } => Interaction::Emitted(color),
    }
}

fn random_unit_vector(rng: &mut impl Rng) -> WorldVector {
    let v: [FloatType; 3] = UnitSphere.sample(rng);
    WorldVector::from(v)
}

fn random_in_unit_sphere(rng: &mut impl Rng) -> WorldVector {
    let v: [FloatType; 3] = UnitBall.sample(rng);
    WorldVector::from(v)
}

fn reflect(v: &WorldVector, normal: &WorldVector) -> WorldVector {
    v - normal * (2.0 * v.dot(normal))
}

/// Refraction of a unit vector through a surface with the given unit normal.
fn refract(v: &WorldVector, normal: &WorldVector, ratio: FloatType) -> WorldVector {
    let cos_theta = (-v).dot(normal).min(1.0);
    let perpendicular = (v + normal * cos_theta) * ratio;
    let parallel = normal * -(1.0 - perpendicular.norm_squared()).abs().sqrt();
    perpendicular + parallel
}

/// Schlick's approximation of reflectance
fn reflectance(cosine: FloatType, ratio: FloatType) -> FloatType {
    let r0 = ((1.0 - ratio) / (1.0 + ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

/// Maps a linear f32 rgba pixel to 8 bit, gamma corrected pixel for module image.
pub fn color_to_image(color: Rgba) -> image::Rgba<u8> {
    image::Rgba([
        gamma_encode(color.r),
        gamma_encode(color.g),
        gamma_encode(color.b),
        (color.a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
