//! Flattening of a scene, its BVH and the per-frame values into the fixed
//! stride buffers a compute backend consumes.

mod records;

use thiserror::Error;
use tracing::debug;

use crate::{bvh::SphereBvh, camera::Camera, scene::Scene, scene::SceneParameters};

pub use records::{
    CAMERA_BLOCK_SIZE, GpuBvhNode, GpuCamera, GpuSphere, HEADER_SIZE, INDEX_RECORD_SIZE,
    NODE_RECORD_SIZE, SPHERE_RECORD_SIZE, SceneHeader,
};

/// How integer fields (child/first indices, primitive counts and the index
/// permutation) are stored in the packed buffers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum IndexEncoding {
    /// Integers converted to `f32`, for kernels that read every field as a float.
    /// Only exact below 2^24.
    Float,
    /// Plain `u32`
    #[default]
    Native,
}

#[derive(Debug, Error, PartialEq)]
pub enum PackError {
    #[error("Index {value} can't be stored exactly as a 32 bit float")]
    IndexNotRepresentable { value: u32 },

    #[error("Value {value} of header field `{field}` doesn't fit into a signed 32 bit integer")]
    HeaderFieldOutOfRange { field: &'static str, value: u64 },
}

impl IndexEncoding {
    /// First integer that `Float` refuses to encode.
    pub const FLOAT_LIMIT: u32 = 1 << 24;

    pub fn encode(self, value: u32) -> Result<u32, PackError> {
        match self {
            IndexEncoding::Native => Ok(value),
            IndexEncoding::Float => {
                if value >= Self::FLOAT_LIMIT {
                    Err(PackError::IndexNotRepresentable { value })
                } else {
                    Ok((value as f32).to_bits())
                }
            }
        }
    }

    /// Inverse of `encode`, returns None for bit patterns that `encode` never produces.
    pub fn decode(self, bits: u32) -> Option<u32> {
        match self {
            IndexEncoding::Native => Some(bits),
            IndexEncoding::Float => {
                let value = f32::from_bits(bits);
                let valid = value >= 0.0 && value < Self::FLOAT_LIMIT as f32 && value.fract() == 0.0;
                valid.then_some(value as u32)
            }
        }
    }
}

/// Packed buffers ready for dispatch.
///
/// Owned by value, backends only ever borrow it, so the buffers can't change
/// while a dispatch is running.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedScene {
    spheres: Vec<GpuSphere>,
    nodes: Vec<GpuBvhNode>,
    indices: Vec<u32>,
    header: SceneHeader,
    camera: Option<GpuCamera>,
    encoding: IndexEncoding,
}

fn header_field(field: &'static str, value: u64) -> Result<i32, PackError> {
    i32::try_from(value).map_err(|_| PackError::HeaderFieldOutOfRange { field, value })
}

impl PackedScene {
    pub fn pack(
        scene: &Scene,
        bvh: &SphereBvh,
        parameters: &SceneParameters,
        camera: Option<&Camera>,
        encoding: IndexEncoding,
    ) -> Result<PackedScene, PackError> {
        assert2::assert!(bvh.sphere_count() == scene.len(), "BVH was built for a different scene");
        let _span = tracing::debug_span!("pack_scene", spheres = scene.len(), ?encoding).entered();

        let spheres: Vec<GpuSphere> = scene.spheres().iter().map(GpuSphere::from).collect();

        let nodes = bvh
            .nodes()
            .iter()
            .map(|node| {
                Ok(GpuBvhNode {
                    min: node.bounds.min.into(),
                    left_or_first: encoding.encode(node.left_child_or_first_primitive)?,
                    max: node.bounds.max.into(),
                    primitive_count: encoding.encode(node.primitive_count)?,
                })
            })
            .collect::<Result<Vec<_>, PackError>>()?;

        let indices = bvh
            .indices()
            .iter()
            .map(|index| encoding.encode(*index))
            .collect::<Result<Vec<_>, PackError>>()?;

        let header = SceneHeader {
            primitive_count: header_field("primitive_count", scene.len() as u64)?,
            bvh_enabled: parameters.bvh_enabled as i32,
            max_bounces: header_field("max_bounces", parameters.max_bounces.into())?,
            samples_per_pixel: header_field(
                "samples_per_pixel",
                parameters.samples_per_pixel.get().into(),
            )?,
            background: parameters.background.into(),
            _pad: 0.0,
        };

        let packed = PackedScene {
            spheres,
            nodes,
            indices,
            header,
            camera: camera.map(GpuCamera::from),
            encoding,
        };
        packed.check_buffer_sizes(bvh);

        debug!(
            sphere_bytes = packed.sphere_bytes().len(),
            node_bytes = packed.node_bytes().len(),
            index_bytes = packed.index_bytes().len(),
            "Scene packed"
        );

        Ok(packed)
    }

    /// Overwrites every buffer with a fresh packing of the inputs.
    /// On error `self` is left untouched.
    pub fn repack(
        &mut self,
        scene: &Scene,
        bvh: &SphereBvh,
        parameters: &SceneParameters,
        camera: Option<&Camera>,
    ) -> Result<(), PackError> {
        *self = PackedScene::pack(scene, bvh, parameters, camera, self.encoding)?;
        Ok(())
    }

    fn check_buffer_sizes(&self, bvh: &SphereBvh) {
        use assert2::assert;
        let n = bvh.sphere_count();
        assert!(self.sphere_bytes().len() == n * SPHERE_RECORD_SIZE);
        assert!(self.node_bytes().len() == bvh.nodes_used() * NODE_RECORD_SIZE);
        assert!(self.index_bytes().len() == n * INDEX_RECORD_SIZE);
        assert!(self.header_bytes().len() == HEADER_SIZE);
        if let Some(camera_bytes) = self.camera_bytes() {
            assert!(camera_bytes.len() == CAMERA_BLOCK_SIZE);
        }
    }

    pub fn spheres(&self) -> &[GpuSphere] {
        &self.spheres
    }

    pub fn nodes(&self) -> &[GpuBvhNode] {
        &self.nodes
    }

    /// Encoded index permutation
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn header(&self) -> &SceneHeader {
        &self.header
    }

    pub fn camera(&self) -> Option<&GpuCamera> {
        self.camera.as_ref()
    }

    pub fn encoding(&self) -> IndexEncoding {
        self.encoding
    }

    pub fn sphere_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.spheres)
    }

    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn header_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.header)
    }

    pub fn camera_bytes(&self) -> Option<&[u8]> {
        self.camera.as_ref().map(bytemuck::bytes_of)
    }

    #[cfg(test)]
    pub(crate) fn spheres_mut(&mut self) -> &mut [GpuSphere] {
        &mut self.spheres
    }
}
