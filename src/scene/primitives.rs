use crate::geometry::{FloatType, WorldBox, WorldPoint};

use super::material::Material;

/// Shutter interval during which a sphere may move.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TimeInterval {
    pub start: FloatType,
    pub end: FloatType,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    pub material: Material,
    pub time: Option<TimeInterval>,
}

impl Sphere {
    pub fn new(center: WorldPoint, radius: FloatType, material: Material) -> Sphere {
        Sphere {
            center,
            radius,
            material,
            time: None,
        }
    }

    pub fn with_time_interval(self, start: FloatType, end: FloatType) -> Sphere {
        Sphere {
            time: Some(TimeInterval { start, end }),
            ..self
        }
    }

    pub fn bounding_box(&self) -> WorldBox {
        WorldBox::around_sphere(&self.center, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::Color;
    use assert2::assert;

    #[test]
    fn bounding_box_is_center_plus_minus_radius() {
        let sphere = Sphere::new(
            WorldPoint::new(1.0, 2.0, 3.0),
            0.5,
            Material::diffuse(Color::repeat(0.5)),
        );
        let b = sphere.bounding_box();
        assert!(b.min == WorldPoint::new(0.5, 1.5, 2.5));
        assert!(b.max == WorldPoint::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn time_interval_is_carried() {
        let sphere = Sphere::new(
            WorldPoint::origin(),
            1.0,
            Material::emissive(Color::repeat(1.0)),
        )
        .with_time_interval(0.25, 0.75);
        assert!(sphere.time == Some(TimeInterval { start: 0.25, end: 0.75 }));
    }
}
