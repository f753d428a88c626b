use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use image::RgbaImage;
use thiserror::Error;
use tracing::info;

use crate::{
    backend::{BackendError, ComputeBackend},
    bvh::SphereBvh,
    camera::Camera,
    geometry::{FloatType, ScreenSize},
    packing::{IndexEncoding, PackError, PackedScene},
    scene::{InvalidSceneError, Scene, SceneParameters},
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    InvalidScene(#[from] InvalidSceneError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to write the image: {0}")]
    ImageWrite(#[from] image::ImageError),

    #[error("Resolution {width}x{height} has no pixels")]
    EmptyResolution { width: u32, height: u32 },
}

/// Owns everything needed to render a frame: the scene, its BVH, the packed
/// buffers, the camera and the backend that runs the kernel.
///
/// Every setter rebuilds or repacks what it invalidates before returning, so
/// the packed buffers always match the rest of the state. A failed setter
/// leaves the renderer unchanged.
pub struct Renderer<B: ComputeBackend> {
    scene: Scene,
    bvh: SphereBvh,
    packed: PackedScene,
    camera: Camera,
    parameters: SceneParameters,
    backend: B,

    /// Time spent building the BVH and packing for the current scene
    build_time: Duration,
}

/// A finished frame.
#[derive(Clone, Debug)]
pub struct RenderOutput {
    pub image: RgbaImage,
    pub samples_per_pixel: u32,
    pub build_time: Duration,
    pub render_time: Duration,
}

impl<B: ComputeBackend> Renderer<B> {
    pub fn new(
        scene: Scene,
        camera: Camera,
        parameters: SceneParameters,
        backend: B,
    ) -> Result<Self, RenderError> {
        Self::with_index_encoding(scene, camera, parameters, backend, IndexEncoding::default())
    }

    pub fn with_index_encoding(
        scene: Scene,
        camera: Camera,
        parameters: SceneParameters,
        backend: B,
        encoding: IndexEncoding,
    ) -> Result<Self, RenderError> {
        let (bvh, packed, build_time) = build_and_pack(&scene, &parameters, &camera, encoding)?;

        Ok(Renderer {
            scene,
            bvh,
            packed,
            camera,
            parameters,
            backend,
            build_time,
        })
    }

    /// Replace the scene, rebuilding the BVH and all buffers.
    pub fn set_scene(&mut self, scene: Scene) -> Result<(), RenderError> {
        let (bvh, packed, build_time) =
            build_and_pack(&scene, &self.parameters, &self.camera, self.packed.encoding())?;

        self.scene = scene;
        self.bvh = bvh;
        self.packed = packed;
        self.build_time = build_time;
        Ok(())
    }

    pub fn set_parameters(&mut self, parameters: SceneParameters) -> Result<(), RenderError> {
        self.packed
            .repack(&self.scene, &self.bvh, &parameters, Some(&self.camera))?;
        self.parameters = parameters;
        Ok(())
    }

    pub fn set_camera(&mut self, camera: Camera) -> Result<(), RenderError> {
        self.packed
            .repack(&self.scene, &self.bvh, &self.parameters, Some(&camera))?;
        self.camera = camera;
        Ok(())
    }

    /// Adapt the camera to the aspect ratio of a new output size.
    pub fn resize(&mut self, resolution: ScreenSize) -> Result<(), RenderError> {
        if resolution.x == 0 || resolution.y == 0 {
            return Err(RenderError::EmptyResolution {
                width: resolution.x,
                height: resolution.y,
            });
        }
        let aspect_ratio = resolution.x as FloatType / resolution.y as FloatType;
        if aspect_ratio != self.camera.aspect_ratio() {
            self.set_camera(self.camera.with_aspect_ratio(aspect_ratio))?;
        }
        Ok(())
    }

    /// Render a frame at the given resolution.
    /// Blocks until the backend has finished the whole image.
    pub fn render(&mut self, resolution: ScreenSize) -> Result<RenderOutput, RenderError> {
        self.resize(resolution)?;

        let start = Instant::now();
        let image = self.backend.dispatch(&self.packed, resolution)?;
        let render_time = start.elapsed();

        info!(
            backend = self.backend.name(),
            "Rendered {}x{} in {:.2} ms",
            resolution.x,
            resolution.y,
            render_time.as_secs_f64() * 1000.0
        );

        Ok(RenderOutput {
            image,
            samples_per_pixel: self.parameters.samples_per_pixel.get(),
            build_time: self.build_time,
            render_time,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn bvh(&self) -> &SphereBvh {
        &self.bvh
    }

    pub fn packed(&self) -> &PackedScene {
        &self.packed
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn parameters(&self) -> &SceneParameters {
        &self.parameters
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn build_time(&self) -> Duration {
        self.build_time
    }
}

fn build_and_pack(
    scene: &Scene,
    parameters: &SceneParameters,
    camera: &Camera,
    encoding: IndexEncoding,
) -> Result<(SphereBvh, PackedScene, Duration), RenderError> {
    let start = Instant::now();
    let bvh = SphereBvh::build(scene)?;
    let packed = PackedScene::pack(scene, &bvh, parameters, Some(camera), encoding)?;
    let build_time = start.elapsed();

    info!(
        spheres = scene.len(),
        nodes = bvh.nodes_used(),
        "Scene prepared in {:.2} ms",
        build_time.as_secs_f64() * 1000.0
    );
    bvh.log_statistics();

    Ok((bvh, packed, build_time))
}

impl RenderOutput {
    /// `render_{spp}spp_{width}x{height}_{milliseconds}ms.png`
    pub fn file_name(&self) -> String {
        format!(
            "render_{}spp_{}x{}_{:.2}ms.png",
            self.samples_per_pixel,
            self.image.width(),
            self.image.height(),
            self.render_time.as_secs_f64() * 1000.0
        )
    }

    /// Write the image as PNG into `directory`, returns the full path.
    pub fn save(&self, directory: impl AsRef<Path>) -> Result<PathBuf, RenderError> {
        let path = directory.as_ref().join(self.file_name());
        self.image.save(&path)?;
        info!(path = %path.display(), "Image saved");
        Ok(path)
    }
}
