use std::ops::{Add, Sub};

use nalgebra::{ClosedAddAssign, ClosedDivAssign, Point, Point2, Scalar};
use num_traits::One;

use super::{FloatType, WorldBox, WorldPoint, WorldVector};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AABB<Point> {
    pub min: Point,
    pub max: Point,
}

impl<Point> AABB<Point> {
    pub fn new(min: Point, max: Point) -> AABB<Point> {
        AABB { min, max }
    }

    pub fn with_size<S>(min: Point, size: &S) -> AABB<Point>
    where
        for<'a> &'a Point: Add<&'a S, Output = Point>,
    {
        let max = &min + size;
        AABB { min, max }
    }
}

impl<Point: Sub + Copy> AABB<Point> {
    pub fn size(&self) -> Point::Output {
        self.max - self.min
    }
}

impl<T: Scalar + Copy + Sub> AABB<Point2<T>> {
    pub fn width(&self) -> T::Output {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> T::Output {
        self.max[1] - self.min[1]
    }
}

impl<T: Scalar + ClosedAddAssign + ClosedDivAssign + One, const D: usize> AABB<Point<T, D>> {
    pub fn center(&self) -> Point<T, D> {
        let two = T::one() + T::one();
        let avg_coords = (&self.min.coords + &self.max.coords) / two;
        Point::from(avg_coords)
    }
}

impl WorldBox {
    /// Box that contains nothing; growing it by any box yields that box.
    pub fn empty() -> WorldBox {
        WorldBox {
            min: WorldPoint::from(WorldVector::repeat(FloatType::INFINITY)),
            max: WorldPoint::from(WorldVector::repeat(FloatType::NEG_INFINITY)),
        }
    }

    /// Axis aligned bounds of a sphere.
    pub fn around_sphere(center: &WorldPoint, radius: FloatType) -> WorldBox {
        let r_vec = WorldVector::repeat(radius);
        WorldBox {
            min: center - r_vec,
            max: center + r_vec,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min
            .coords
            .iter()
            .zip(self.max.coords.iter())
            .any(|(min, max)| min > max)
    }

    /// Extend the box so that it also covers `other`.
    pub fn grow(&mut self, other: &WorldBox) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    pub fn union(&self, other: &WorldBox) -> WorldBox {
        let mut ret = self.clone();
        ret.grow(other);
        ret
    }

    /// Index of the axis with the largest extent.
    /// On exact ties the earlier axis (in X, Y, Z order) wins.
    pub fn largest_axis(&self) -> usize {
        let extent = self.size();
        let mut axis = 0;
        if extent.y > extent[axis] {
            axis = 1;
        }
        if extent.z > extent[axis] {
            axis = 2;
        }
        axis
    }

    pub fn contains_point(&self, p: &WorldPoint) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    pub fn contains_box(&self, other: &WorldBox) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }
}
