use assert2::assert;
use bon::bon;
use nalgebra::Unit;

use crate::geometry::{EPSILON, FloatType, WorldPoint, WorldVector};

/// Positionable thin lens camera.
///
/// Only the primary fields are supplied, the orthonormal basis and the viewport
/// size are derived from them whenever the camera is constructed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    look_from: WorldPoint,
    look_at: WorldPoint,
    up: WorldVector,

    /// Vertical field of view in degrees
    vertical_fov: FloatType,
    aspect_ratio: FloatType,
    /// Lens diameter, zero for a pinhole camera
    aperture: FloatType,
    focus_distance: FloatType,

    /// Shutter interval
    time0: FloatType,
    time1: FloatType,

    viewport_height: FloatType,
    viewport_width: FloatType,

    /// Points backwards, away from `look_at`
    w: Unit<WorldVector>,
    /// Points right
    u: Unit<WorldVector>,
    /// Points up
    v: Unit<WorldVector>,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        look_from: WorldPoint,
        look_at: WorldPoint,
        up: WorldVector,
        vertical_fov: FloatType,
        aspect_ratio: FloatType,
        #[builder(default)] aperture: FloatType,
        #[builder(default = 1.0)] focus_distance: FloatType,
        #[builder(default)] time0: FloatType,
        #[builder(default = 1.0)] time1: FloatType,
    ) -> Self {
        assert!(vertical_fov > 0.0 && vertical_fov < 180.0);
        assert!(aspect_ratio > 0.0);
        assert!(aperture >= 0.0);
        assert!(focus_distance > 0.0);
        assert!(time0 <= time1);

        let w = Unit::try_new(look_from - look_at, EPSILON)
            .expect("`look_from` and `look_at` must differ");
        let u = Unit::try_new(up.cross(&w), EPSILON)
            .expect("`up` and view direction must be linearly independent");
        let v = Unit::new_normalize(w.cross(&u));

        let viewport_height = 2.0 * (vertical_fov.to_radians() / 2.0).tan();
        let viewport_width = aspect_ratio * viewport_height;

        Camera {
            look_from,
            look_at,
            up,
            vertical_fov,
            aspect_ratio,
            aperture,
            focus_distance,
            time0,
            time1,
            viewport_height,
            viewport_width,
            w,
            u,
            v,
        }
    }
}

impl Camera {
    /// Same camera with a different aspect ratio, all derived fields recomputed.
    pub fn with_aspect_ratio(&self, aspect_ratio: FloatType) -> Camera {
        Camera::builder()
            .look_from(self.look_from)
            .look_at(self.look_at)
            .up(self.up)
            .vertical_fov(self.vertical_fov)
            .aspect_ratio(aspect_ratio)
            .aperture(self.aperture)
            .focus_distance(self.focus_distance)
            .time0(self.time0)
            .time1(self.time1)
            .build()
    }

    pub fn look_from(&self) -> WorldPoint {
        self.look_from
    }

    pub fn look_at(&self) -> WorldPoint {
        self.look_at
    }

    pub fn up(&self) -> WorldVector {
        self.up
    }

    pub fn vertical_fov(&self) -> FloatType {
        self.vertical_fov
    }

    pub fn aspect_ratio(&self) -> FloatType {
        self.aspect_ratio
    }

    pub fn aperture(&self) -> FloatType {
        self.aperture
    }

    pub fn focus_distance(&self) -> FloatType {
        self.focus_distance
    }

    pub fn shutter(&self) -> (FloatType, FloatType) {
        (self.time0, self.time1)
    }

    pub fn viewport_size(&self) -> (FloatType, FloatType) {
        (self.viewport_width, self.viewport_height)
    }

    /// Orthonormal camera basis (u, v, w): right, up, backwards.
    pub fn basis(&self) -> (Unit<WorldVector>, Unit<WorldVector>, Unit<WorldVector>) {
        (self.u, self.v, self.w)
    }
}
