//! Reading the packed buffers back into a form the CPU kernel can walk.
//!
//! Everything coming from the buffers is validated here once, so that the
//! per-pixel code can index freely without further checks.

use crate::{
    backend::BackendError,
    geometry::{FloatType, WorldBox, WorldPoint, WorldVector},
    packing::{GpuBvhNode, GpuCamera, GpuSphere, IndexEncoding, PackedScene},
    scene::{Color, Material, SurfaceType},
};

#[derive(Clone, Debug)]
pub struct KernelSphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    pub material: Material,
}

#[derive(Clone, Debug)]
pub struct KernelNode {
    pub bounds: WorldBox,
    pub left_or_first: u32,
    pub primitive_count: u32,
}

/// Camera block reduced to what ray generation needs.
#[derive(Clone, Debug)]
pub struct KernelCamera {
    pub origin: WorldPoint,
    pub lower_left_corner: WorldPoint,
    pub horizontal: WorldVector,
    pub vertical: WorldVector,
    pub u: WorldVector,
    pub v: WorldVector,
    pub lens_radius: FloatType,
}

#[derive(Clone, Debug)]
pub struct KernelScene {
    pub spheres: Vec<KernelSphere>,
    pub nodes: Vec<KernelNode>,
    /// Decoded index permutation
    pub indices: Vec<u32>,

    pub bvh_enabled: bool,
    pub max_bounces: u32,
    pub samples_per_pixel: u32,
    pub background: Color,
    pub camera: KernelCamera,
}

fn rejected(message: impl Into<String>) -> BackendError {
    BackendError::Rejected(message.into())
}

fn vec3(v: &[f32]) -> WorldVector {
    WorldVector::new(v[0], v[1], v[2])
}

impl KernelScene {
    pub fn decode(packed: &PackedScene) -> Result<KernelScene, BackendError> {
        let header = packed.header();
        let sphere_count = packed.spheres().len();

        if usize::try_from(header.primitive_count).ok() != Some(sphere_count) {
            return Err(rejected(format!(
                "Header declares {} spheres, buffer holds {}",
                header.primitive_count, sphere_count
            )));
        }
        if sphere_count == 0 {
            return Err(rejected("Scene has no spheres"));
        }
        let max_bounces = u32::try_from(header.max_bounces)
            .map_err(|_| rejected(format!("Negative bounce count {}", header.max_bounces)))?;
        let samples_per_pixel = u32::try_from(header.samples_per_pixel)
            .ok()
            .filter(|spp| *spp > 0)
            .ok_or_else(|| {
                rejected(format!("Invalid samples per pixel {}", header.samples_per_pixel))
            })?;

        let camera = packed
            .camera()
            .ok_or_else(|| rejected("Camera block is missing"))?;

        let spheres = packed
            .spheres()
            .iter()
            .enumerate()
            .map(|(i, sphere)| decode_sphere(i, sphere))
            .collect::<Result<Vec<_>, _>>()?;

        let encoding = packed.encoding();
        let indices = packed
            .indices()
            .iter()
            .map(|bits| {
                encoding
                    .decode(*bits)
                    .filter(|index| (*index as usize) < sphere_count)
                    .ok_or_else(|| rejected(format!("Invalid sphere index {bits:#010x}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if packed.nodes().is_empty() {
            return Err(rejected("BVH has no nodes"));
        }
        let nodes = packed
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| {
                decode_node(i, node, encoding, packed.nodes().len(), indices.len())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(KernelScene {
            spheres,
            nodes,
            indices,
            bvh_enabled: header.bvh_enabled != 0,
            max_bounces,
            samples_per_pixel,
            background: vec3(&header.background),
            camera: KernelCamera::from(camera),
        })
    }
}

fn decode_sphere(index: usize, sphere: &GpuSphere) -> Result<KernelSphere, BackendError> {
    let color = vec3(&sphere.color);
    let material = match SurfaceType::try_from(sphere.surface_type) {
        Ok(SurfaceType::Diffuse) => Material::diffuse(color),
        Ok(SurfaceType::Metal) => Material::metal(color, sphere.fuzz),
        Ok(SurfaceType::Dielectric) => Material::dielectric(color, sphere.index_of_refraction),
        Ok(SurfaceType::Emissive) => Material::emissive(color),
        Err(tag) => {
            return Err(rejected(format!(
                "Sphere {index} has unknown surface type {tag}"
            )));
        }
    };

    Ok(KernelSphere {
        center: vec3(&sphere.center).into(),
        radius: sphere.radius,
        material,
    })
}

fn decode_node(
    index: usize,
    node: &GpuBvhNode,
    encoding: IndexEncoding,
    node_count: usize,
    index_count: usize,
) -> Result<KernelNode, BackendError> {
    let invalid = || rejected(format!("BVH node {index} is malformed"));

    let left_or_first = encoding.decode(node.left_or_first).ok_or_else(invalid)?;
    let primitive_count = encoding.decode(node.primitive_count).ok_or_else(invalid)?;

    let valid = if primitive_count == 0 {
        // Children are always allocated after their parent, this also rules out cycles
        let left = left_or_first as usize;
        left > index && left + 1 < node_count
    } else {
        left_or_first as usize + primitive_count as usize <= index_count
    };
    if !valid {
        return Err(invalid());
    }

    Ok(KernelNode {
        bounds: WorldBox::new(vec3(&node.min).into(), vec3(&node.max).into()),
        left_or_first,
        primitive_count,
    })
}

impl From<&GpuCamera> for KernelCamera {
    fn from(camera: &GpuCamera) -> Self {
        let [u, v, w] = camera.basis_vectors();
        let origin = camera.look_from_point();

        let horizontal = u * (camera.focus_distance * camera.viewport_width);
        let vertical = v * (camera.focus_distance * camera.viewport_height);
        let lower_left_corner =
            origin - horizontal / 2.0 - vertical / 2.0 - w * camera.focus_distance;

        KernelCamera {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius: camera.aperture / 2.0,
        }
    }
}
