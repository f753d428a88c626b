use crate::geometry::{FloatType, Ray, WorldPoint};

/// Distance along the ray to the nearest intersection with a sphere that lies
/// strictly inside `(t_min, t_max)`.
pub fn intersect_sphere(
    center: &WorldPoint,
    radius: FloatType,
    ray: &Ray,
    t_min: FloatType,
    t_max: FloatType,
) -> Option<FloatType> {
    let oc = ray.origin - center;
    let b = oc.dot(&ray.direction);
    // Offset of the closest approach from the center. Computing the discriminant
    // from it avoids the cancellation in `b * b - (|oc|^2 - r^2)` for distant origins.
    let f = oc - ray.direction.as_ref() * b;
    let discriminant = radius * radius - f.dot(&f);

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = -b - sqrt_disc;
    let t2 = -b + sqrt_disc;
    if t1 > t_min && t1 < t_max {
        Some(t1)
    } else if t2 > t_min && t2 < t_max {
        Some(t2)
    } else {
        None
    }
}
