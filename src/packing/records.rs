//! Fixed stride records of the packed buffers.
//!
//! All records are `repr(C)` and `Pod`, so the buffers can be handed to a
//! backend as raw little-endian bytes without any further conversion.
//! Integer fields that depend on `IndexEncoding` are stored as their raw
//! 32 bit pattern.

use bytemuck::{Pod, Zeroable};

use crate::{
    camera::Camera,
    geometry::{WorldPoint, WorldVector},
    scene::{Color, Sphere},
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSphere {
    pub center: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    /// `SurfaceType` discriminant
    pub surface_type: i32,
    pub fuzz: f32,
    pub index_of_refraction: f32,
    /// Zero for static spheres
    pub time0: f32,
    pub time1: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub min: [f32; 3],
    /// Encoded left child index for inner nodes, first permutation slot for leaves
    pub left_or_first: u32,
    pub max: [f32; 3],
    /// Encoded, zero marks an inner node
    pub primitive_count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct SceneHeader {
    pub primitive_count: i32,
    pub bvh_enabled: i32,
    pub max_bounces: i32,
    pub samples_per_pixel: i32,
    pub background: [f32; 3],
    pub _pad: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuCamera {
    pub look_from: [f32; 4],
    pub look_at: [f32; 4],
    pub up: [f32; 4],
    pub vertical_fov: f32,
    pub aspect_ratio: f32,
    pub aperture: f32,
    pub focus_distance: f32,
    pub viewport_height: f32,
    pub viewport_width: f32,
    pub _pad0: [f32; 2],
    pub w: [f32; 4],
    pub u: [f32; 4],
    pub v: [f32; 4],
    pub time0: f32,
    pub time1: f32,
    pub _pad1: [f32; 2],
}

pub const SPHERE_RECORD_SIZE: usize = 48;
pub const NODE_RECORD_SIZE: usize = 32;
pub const INDEX_RECORD_SIZE: usize = 4;
pub const HEADER_SIZE: usize = 32;
pub const CAMERA_BLOCK_SIZE: usize = 144;

const _: () = assert!(size_of::<GpuSphere>() == SPHERE_RECORD_SIZE);
const _: () = assert!(size_of::<GpuBvhNode>() == NODE_RECORD_SIZE);
const _: () = assert!(size_of::<u32>() == INDEX_RECORD_SIZE);
const _: () = assert!(size_of::<SceneHeader>() == HEADER_SIZE);
const _: () = assert!(size_of::<GpuCamera>() == CAMERA_BLOCK_SIZE);

fn point4(p: &WorldPoint) -> [f32; 4] {
    [p.x, p.y, p.z, 1.0]
}

fn vector4(v: &WorldVector) -> [f32; 4] {
    [v.x, v.y, v.z, 0.0]
}

fn color3(c: &Color) -> [f32; 3] {
    [c.x, c.y, c.z]
}

impl From<&Sphere> for GpuSphere {
    fn from(sphere: &Sphere) -> Self {
        let (time0, time1) = sphere
            .time
            .map(|interval| (interval.start, interval.end))
            .unwrap_or_default();

        GpuSphere {
            center: sphere.center.into(),
            radius: sphere.radius,
            color: color3(&sphere.material.color()),
            surface_type: sphere.material.surface_type() as i32,
            fuzz: sphere.material.fuzz(),
            index_of_refraction: sphere.material.index_of_refraction(),
            time0,
            time1,
        }
    }
}

impl From<&Camera> for GpuCamera {
    fn from(camera: &Camera) -> Self {
        let (u, v, w) = camera.basis();
        let (viewport_width, viewport_height) = camera.viewport_size();
        let (time0, time1) = camera.shutter();

        GpuCamera {
            look_from: point4(&camera.look_from()),
            look_at: point4(&camera.look_at()),
            up: vector4(&camera.up()),
            vertical_fov: camera.vertical_fov(),
            aspect_ratio: camera.aspect_ratio(),
            aperture: camera.aperture(),
            focus_distance: camera.focus_distance(),
            viewport_height,
            viewport_width,
            _pad0: [0.0; 2],
            w: vector4(&w),
            u: vector4(&u),
            v: vector4(&v),
            time0,
            time1,
            _pad1: [0.0; 2],
        }
    }
}

impl GpuCamera {
    pub fn look_from_point(&self) -> WorldPoint {
        WorldPoint::new(self.look_from[0], self.look_from[1], self.look_from[2])
    }

    pub fn basis_vectors(&self) -> [WorldVector; 3] {
        [self.u, self.v, self.w].map(|x| WorldVector::new(x[0], x[1], x[2]))
    }
}
