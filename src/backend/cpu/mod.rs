//! Reference implementation of the compute backend running on CPU threads.

mod decode;
mod traversal;
mod worker;

use std::{
    num::NonZeroU32,
    ops::Deref as _,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use image::{GenericImage, GenericImageView, RgbaImage};
use tracing::{debug, warn};

use crate::{
    backend::{BackendError, ComputeBackend},
    geometry::{ScreenBlock, ScreenSize},
    packing::PackedScene,
    screen_block::ScreenBlockExt as _,
};

use decode::KernelScene;
use worker::Worker;

pub use worker::color_to_image;

const DEFAULT_TILE_SIZE: NonZeroU32 = NonZeroU32::new(32).unwrap();

#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    pub tile_size: NonZeroU32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Renders on one worker thread per CPU core, each pinned to its core.
pub struct CpuBackend {
    settings: RenderSettings,
    progress_callback: Option<ProgressCallback>,
}

impl CpuBackend {
    pub fn new(settings: RenderSettings) -> Self {
        CpuBackend {
            settings,
            progress_callback: None,
        }
    }

    /// Register a function that gets called with (finished tiles, total tiles)
    /// every time a worker finishes a tile.
    pub fn with_progress_callback<F: Fn(usize, usize) + Send + Sync + 'static>(
        mut self,
        callback: F,
    ) -> Self {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        CpuBackend::new(RenderSettings::default())
    }
}

struct RenderState<'a> {
    scene: &'a KernelScene,
    resolution: ScreenSize,
    settings: RenderSettings,

    image: Mutex<RgbaImage>,

    tile_ordering: Vec<ScreenBlock>,
    next_tile_index: AtomicUsize,
    finished_tiles: AtomicUsize,
}

impl RenderState<'_> {
    fn get_next_tile(&self) -> Option<&ScreenBlock> {
        let id = self.next_tile_index.fetch_add(1, Ordering::AcqRel);
        self.tile_ordering.get(id)
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn dispatch(
        &self,
        scene: &PackedScene,
        resolution: ScreenSize,
    ) -> Result<RgbaImage, BackendError> {
        if resolution.x == 0 || resolution.y == 0 {
            return Err(BackendError::Rejected(format!(
                "Resolution {}x{} is empty",
                resolution.x, resolution.y
            )));
        }
        let _span = tracing::info_span!(
            "dispatch",
            backend = self.name(),
            width = resolution.x,
            height = resolution.y
        )
        .entered();

        let scene = KernelScene::decode(scene)?;
        let cores = core_affinity::get_core_ids()
            .filter(|cores| !cores.is_empty())
            .ok_or_else(|| BackendError::Unavailable("Can't get the list of CPU cores".into()))?;

        let state = RenderState {
            scene: &scene,
            resolution,
            settings: self.settings,

            image: Mutex::new(RgbaImage::new(resolution.x, resolution.y)),

            tile_ordering: ScreenBlock::from_size(resolution)
                .tile_ordering(self.settings.tile_size),
            next_tile_index: AtomicUsize::new(0),
            finished_tiles: AtomicUsize::new(0),
        };
        debug!(
            workers = cores.len(),
            tiles = state.tile_ordering.len(),
            "Starting workers"
        );

        thread::scope(|scope| {
            let threads = cores
                .into_iter()
                .enumerate()
                .map(|(worker_id, core)| {
                    let state = &state;
                    let progress_callback = self.progress_callback.as_ref();

                    thread::Builder::new()
                        .name(format!("worker{worker_id}"))
                        .spawn_scoped(scope, move || {
                            if !core_affinity::set_for_current(core) {
                                warn!(worker_id, "Failed to pin worker to its core");
                            }

                            let mut worker = Worker::new();
                            let tile_size = state.settings.tile_size.get();
                            let mut buffer = RgbaImage::new(tile_size, tile_size);

                            while let Some(tile) = state.get_next_tile() {
                                worker.render_tile(
                                    state.scene,
                                    state.resolution,
                                    tile,
                                    &mut buffer,
                                );
                                state
                                    .image
                                    .lock()
                                    .expect("Poisoned lock!")
                                    .copy_from(
                                        buffer.view(0, 0, tile.width(), tile.height()).deref(),
                                        tile.min.x,
                                        tile.min.y,
                                    )
                                    .unwrap_or_else(|_| {
                                        unreachable!("The buffer should always fit into the output")
                                    });

                                let finished =
                                    state.finished_tiles.fetch_add(1, Ordering::AcqRel) + 1;
                                if let Some(callback) = progress_callback {
                                    callback(finished, state.tile_ordering.len());
                                }
                            }
                        })
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| BackendError::Unavailable(format!("Failed to spawn worker: {e}")))?;

            // Every worker is joined before the image is handed out
            for handle in threads {
                handle
                    .join()
                    .map_err(|_| BackendError::Unavailable("Worker thread panicked".into()))?;
            }
            Ok::<_, BackendError>(())
        })?;

        let image = state
            .image
            .into_inner()
            .map_err(|_| BackendError::Unavailable("Worker thread panicked".into()))?;
        Ok(image)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bvh::SphereBvh,
        camera::Camera,
        geometry::{WorldPoint, WorldVector},
        packing::{GpuSphere, IndexEncoding},
        scene::{Color, Material, Scene, SceneParameters, Sphere, presets::Preset},
    };
    use assert2::{assert, let_assert};
    use std::{num::NonZeroU32, sync::Arc};

    fn packed(preset: Preset, parameters: SceneParameters, aspect_ratio: f32) -> PackedScene {
        let scene = preset.scene().unwrap();
        let bvh = SphereBvh::build(&scene).unwrap();
        let camera = preset.camera(aspect_ratio);
        PackedScene::pack(&scene, &bvh, &parameters, Some(&camera), IndexEncoding::Native)
            .unwrap()
    }

    fn small_backend() -> CpuBackend {
        CpuBackend::new(RenderSettings {
            tile_size: NonZeroU32::new(8).unwrap(),
        })
    }

    #[test]
    fn renders_full_image() {
        let parameters = SceneParameters::builder().max_bounces(4).build();
        let packed = packed(Preset::ThreeSpheres, parameters, 2.0);

        let_assert!(Ok(image) = small_backend().dispatch(&packed, ScreenSize::new(20, 10)));
        assert!(image.dimensions() == (20, 10));
        assert!(image.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn emissive_only_scene_is_exact() {
        // Every camera ray hits the light, so every pixel gets exactly its color
        let scene = Scene::new(vec![Sphere::new(
            WorldPoint::origin(),
            1000.0,
            Material::emissive(Color::new(0.25, 1.0, 0.0)),
        )])
        .unwrap();
        let bvh = SphereBvh::build(&scene).unwrap();
        let camera = Camera::builder()
            .look_from(WorldPoint::origin())
            .look_at(WorldPoint::new(0.0, 0.0, -1.0))
            .up(WorldVector::new(0.0, 1.0, 0.0))
            .vertical_fov(60.0)
            .aspect_ratio(1.0)
            .build();
        let packed = PackedScene::pack(
            &scene,
            &bvh,
            &SceneParameters::default(),
            Some(&camera),
            IndexEncoding::Float,
        )
        .unwrap();

        let image = small_backend().dispatch(&packed, ScreenSize::new(9, 9)).unwrap();
        assert!(image.pixels().all(|p| *p == image::Rgba([128, 255, 0, 255])));
    }

    #[test]
    fn bvh_and_brute_force_render_the_same_background_mask() {
        // Fully dark scene with a white background: a pixel is black exactly when
        // its single sample hit something, which both traversals must agree on.
        let make = |bvh_enabled| {
            let parameters = SceneParameters::builder()
                .bvh_enabled(bvh_enabled)
                .max_bounces(1)
                .build();
            packed(Preset::Random { seed: Some(11) }, parameters, 1.0)
        };
        let resolution = ScreenSize::new(16, 16);
        let with_bvh = small_backend().dispatch(&make(true), resolution).unwrap();
        let without_bvh = small_backend().dispatch(&make(false), resolution).unwrap();

        // Jitter makes individual pixels differ, but the sky fraction must be close
        let sky = |image: &RgbaImage| image.pixels().filter(|p| p.0[0] == 255).count() as i64;
        assert!((sky(&with_bvh) - sky(&without_bvh)).abs() <= 16);
    }

    #[test]
    fn missing_camera_is_rejected() {
        let scene = Preset::Lights.scene().unwrap();
        let bvh = SphereBvh::build(&scene).unwrap();
        let packed = PackedScene::pack(
            &scene,
            &bvh,
            &SceneParameters::default(),
            None,
            IndexEncoding::Native,
        )
        .unwrap();

        let_assert!(
            Err(BackendError::Rejected(_)) = small_backend().dispatch(&packed, ScreenSize::new(4, 4))
        );
    }

    #[test]
    fn unknown_surface_type_is_rejected() {
        let mut packed = packed(Preset::ThreeSpheres, SceneParameters::default(), 1.0);
        let corrupted = GpuSphere {
            surface_type: 17,
            ..packed.spheres()[2]
        };
        packed.spheres_mut()[2] = corrupted;

        let_assert!(
            Err(BackendError::Rejected(message)) =
                small_backend().dispatch(&packed, ScreenSize::new(4, 4))
        );
        assert!(message.contains("17"));
    }

    #[test]
    fn empty_resolution_is_rejected() {
        let packed = packed(Preset::ThreeSpheres, SceneParameters::default(), 1.0);
        let_assert!(
            Err(BackendError::Rejected(_)) = small_backend().dispatch(&packed, ScreenSize::new(0, 4))
        );
    }

    #[test]
    fn progress_reports_every_tile() {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_total = Arc::new(AtomicUsize::new(0));
        let backend = {
            let calls = Arc::clone(&calls);
            let last_total = Arc::clone(&last_total);
            small_backend().with_progress_callback(move |_finished, total| {
                calls.fetch_add(1, Ordering::Relaxed);
                last_total.store(total, Ordering::Relaxed);
            })
        };
        let parameters = SceneParameters::builder().max_bounces(2).build();
        let packed = packed(Preset::Lights, parameters, 1.0);

        backend.dispatch(&packed, ScreenSize::new(17, 16)).unwrap();
        // 3 x 2 tiles of 8 pixels
        assert!(calls.load(Ordering::Relaxed) == 6);
        assert!(last_total.load(Ordering::Relaxed) == 6);
        assert!(backend.name() == "cpu");
    }
}
