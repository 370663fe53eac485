//! Axis-aligned bounding boxes.

use cgmath::{EuclideanSpace, Point3, Transform};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    pub fn from_point(point: Point3<f32>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Box around `points` after applying `transform`, `None` when empty.
    pub fn from_points<'a>(
        points: impl IntoIterator<Item = &'a [f32; 3]>,
        transform: &cgmath::Matrix4<f32>,
    ) -> Option<Self> {
        points
            .into_iter()
            .map(|&p| transform.transform_point(Point3::from(p)))
            .fold(None, |bounds: Option<Self>, point| match bounds {
                Some(mut bounds) => {
                    bounds.extend(point);
                    Some(bounds)
                }
                None => Some(Self::from_point(point)),
            })
    }

    pub fn extend(&mut self, point: Point3<f32>) {
        self.min = Point3::new(
            self.min.x.min(point.x),
            self.min.y.min(point.y),
            self.min.z.min(point.z),
        );
        self.max = Point3::new(
            self.max.x.max(point.x),
            self.max.y.max(point.y),
            self.max.z.max(point.z),
        );
    }

    pub fn union(mut self, other: &Self) -> Self {
        self.extend(other.min);
        self.extend(other.max);
        self
    }

    pub fn extent(&self) -> cgmath::Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn largest_extent(&self) -> f32 {
        let extent = self.extent();
        extent.x.max(extent.y).max(extent.z)
    }
}
