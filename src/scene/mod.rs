pub mod material;
mod parameters;
pub mod presets;
pub mod primitives;

use thiserror::Error;

use crate::geometry::{FloatType, WorldBox};

pub use material::{Color, Material, SurfaceType};
pub use parameters::SceneParameters;
pub use primitives::{Sphere, TimeInterval};

/// The primitive store: an immutable list of spheres.
///
/// A scene is built in one go from a list of spheres and never edited afterwards;
/// changing anything means building a new scene (and a new BVH).
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    spheres: Vec<Sphere>,
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidSceneError {
    #[error("Scene contains no spheres")]
    Empty,

    #[error("Sphere {index} has non-positive radius {radius}")]
    NonPositiveRadius { index: usize, radius: FloatType },

    #[error("Sphere {index} has a non-finite center")]
    NonFiniteCenter { index: usize },

    #[error("Scene has {count} spheres, at most {} are supported", MAX_SPHERES)]
    TooManySpheres { count: usize },
}

/// BVH nodes are addressed with 32 bit indices and a tree over N spheres needs 2N - 1 of them.
pub const MAX_SPHERES: usize = (u32::MAX / 2) as usize;

impl Scene {
    pub fn new(spheres: Vec<Sphere>) -> Result<Scene, InvalidSceneError> {
        if spheres.is_empty() {
            return Err(InvalidSceneError::Empty);
        }
        if spheres.len() > MAX_SPHERES {
            return Err(InvalidSceneError::TooManySpheres {
                count: spheres.len(),
            });
        }

        for (index, sphere) in spheres.iter().enumerate() {
            // Also catches NaN
            if !(sphere.radius > 0.0) {
                return Err(InvalidSceneError::NonPositiveRadius {
                    index,
                    radius: sphere.radius,
                });
            }
            if !sphere.center.iter().all(|x| x.is_finite()) {
                return Err(InvalidSceneError::NonFiniteCenter { index });
            }
        }

        Ok(Scene { spheres })
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn bounding_box(&self) -> WorldBox {
        self.spheres
            .iter()
            .fold(WorldBox::empty(), |acc, sphere| acc.union(&sphere.bounding_box()))
    }
}

impl TryFrom<Vec<Sphere>> for Scene {
    type Error = InvalidSceneError;

    fn try_from(spheres: Vec<Sphere>) -> Result<Self, Self::Error> {
        Scene::new(spheres)
    }
}
