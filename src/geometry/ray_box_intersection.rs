use crate::geometry::{FloatType, Ray, WorldBox};

pub trait RayIntersectionExt {
    /// Calculate first and last ray intersection with the box
    fn intersect(&self, ray: &Ray) -> (FloatType, FloatType);

    /// Returns true if the ray enters the box somewhere within `t_min..=t_max`.
    fn is_hit(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> bool {
        let (t1, t2) = self.intersect(ray);
        t1.max(t_min) <= t2.min(t_max)
    }
}

impl RayIntersectionExt for WorldBox {
    /// Calculates ray intersection with the box (slab method).
    /// Returns minimum and maximum distance along the ray, ray intersects if min <= max.
    fn intersect(&self, ray: &Ray) -> (FloatType, FloatType) {
        // Componentwise distances along the ray to the box's min and max corners
        // The multiplication is NAN if the ray is starting inside the slab bounding plane
        // and is parallel to it. In this case we blend to +-infinity, so that the range becomes infinite
        let to_box_min = (self.min - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if x.is_nan() { FloatType::NEG_INFINITY } else { x });
        let to_box_max = (self.max - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if x.is_nan() { FloatType::INFINITY } else { x });

        // Correctly ordered (min_t <= max_t)
        let componentwise_min_t = to_box_min.inf(&to_box_max);
        let componentwise_max_t = to_box_min.sup(&to_box_max);

        (componentwise_min_t.max(), componentwise_max_t.min())
    }
}
