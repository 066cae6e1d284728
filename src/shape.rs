//! Collision shapes and their mass properties.
//!
//! Shapes live in body-local space. Polygons store their vertices in
//! counter-clockwise order (y up), each vertex carrying the outward normal of
//! the edge that ends at it:
//!
//! ```text
//!   v[i-1] ──edge i──▶ v[i]        normal[i] = outward normal of edge i
//! ```
//!
//! Mass properties are plain geometry (area, centroid, second moment of area);
//! the body multiplies them by its density.

use core::f32::consts::PI;

use log::debug;
use nalgebra::{UnitComplex, Vector2};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

use crate::error::PhysicsError;

/// Maximum number of vertices a single polygon can hold.
pub const MAX_POLYGON_VERTICES: usize = 16;

/// Lengths below this are treated as zero when normalizing.
pub(crate) const DEGENERATE_EPSILON: f32 = 1e-6;

/// Direction used whenever a normal cannot be derived (zero-length edge,
/// coincident centers).
#[inline]
pub(crate) fn fallback_normal() -> Vector2<f32> {
    Vector2::y()
}

/// A polygon corner together with the edge that ends at it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector2<f32>,
    /// Unit outward normal of the edge from the previous vertex to this one.
    pub normal: Vector2<f32>,
    /// Internal edges are never chosen as a separating axis or contact face.
    /// They let several convex pieces form one body without the pieces'
    /// shared edges producing contacts.
    pub internal: bool,
}

/// A convex polygon with precomputed outward edge normals.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: heapless::Vec<Vertex, MAX_POLYGON_VERTICES>,
}

impl Polygon {
    /// Build a polygon from its corner points.
    ///
    /// Clockwise input is reversed so the stored polygon always has positive
    /// area.
    pub fn new(points: &[Vector2<f32>]) -> Result<Self, PhysicsError> {
        Self::build(points, None)
    }

    /// Build a polygon and mark some of its edges as internal.
    ///
    /// `internal[i]` refers to the edge from `points[i - 1]` to `points[i]`
    /// (wrapping), so the flag list must be exactly as long as `points`.
    pub fn with_internal_edges(
        points: &[Vector2<f32>],
        internal: &[bool],
    ) -> Result<Self, PhysicsError> {
        Self::build(points, Some(internal))
    }

    fn build(points: &[Vector2<f32>], internal: Option<&[bool]>) -> Result<Self, PhysicsError> {
        let count = points.len();
        if count < 3 {
            return Err(PhysicsError::TooFewVertices(count));
        }
        if count > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::TooManyVertices {
                count,
                max: MAX_POLYGON_VERTICES,
            });
        }
        if let Some(flags) = internal {
            if flags.len() != count {
                return Err(PhysicsError::InternalEdgeMismatch {
                    vertices: count,
                    flags: flags.len(),
                });
            }
        }
        Ok(Self::assemble(points, internal))
    }

    /// Caller guarantees `3 <= points.len() <= MAX_POLYGON_VERTICES` and a
    /// matching flag list.
    fn assemble(points: &[Vector2<f32>], internal: Option<&[bool]>) -> Self {
        let mut vertices = heapless::Vec::new();
        for (i, point) in points.iter().enumerate() {
            let _ = vertices.push(Vertex {
                position: *point,
                normal: fallback_normal(),
                internal: internal.is_some_and(|flags| flags[i]),
            });
        }

        let mut polygon = Self { vertices };
        if polygon.signed_area() < 0.0 {
            debug!("polygon with {} vertices given clockwise, reversing", points.len());
            polygon.reverse_winding();
        }
        polygon.recompute_normals();
        polygon
    }

    /// Axis-aligned rectangle centered on `center`.
    pub fn rectangle(center: Vector2<f32>, width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::assemble(
            &[
                center + Vector2::new(-hw, -hh),
                center + Vector2::new(hw, -hh),
                center + Vector2::new(hw, hh),
                center + Vector2::new(-hw, hh),
            ],
            None,
        )
    }

    /// Axis-aligned rectangle spanning two opposite corners.
    pub fn corner_rect(corner_a: Vector2<f32>, corner_b: Vector2<f32>) -> Self {
        let size = corner_b - corner_a;
        Self::rectangle((corner_a + corner_b) * 0.5, size.x.abs(), size.y.abs())
    }

    /// Regular polygon with `sides` corners on a circle of `radius`.
    ///
    /// The bottom edge is horizontal.
    pub fn regular(center: Vector2<f32>, radius: f32, sides: usize) -> Result<Self, PhysicsError> {
        if sides < 3 {
            return Err(PhysicsError::TooFewVertices(sides));
        }
        if sides > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::TooManyVertices {
                count: sides,
                max: MAX_POLYGON_VERTICES,
            });
        }

        let step = 2.0 * PI / sides as f32;
        let turn = UnitComplex::new(step);
        let mut corner = UnitComplex::new(step * 0.5) * Vector2::new(0.0, -radius);
        let mut points: heapless::Vec<Vector2<f32>, MAX_POLYGON_VERTICES> = heapless::Vec::new();
        for _ in 0..sides {
            let _ = points.push(center + corner);
            corner = turn * corner;
        }
        Ok(Self::assemble(&points, None))
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Signed area; positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f32 {
        let n = self.vertices.len();
        let mut area = 0.0;
        let mut last = self.vertices[n - 1].position;
        for vertex in self.vertices.iter() {
            area += last.perp(&vertex.position) * 0.5;
            last = vertex.position;
        }
        area
    }

    /// Flip the vertex order while keeping each internal flag on the same
    /// undirected edge.
    fn reverse_winding(&mut self) {
        let n = self.vertices.len();
        let original = self.vertices.clone();
        for j in 0..n {
            self.vertices[j].position = original[n - 1 - j].position;
            self.vertices[j].internal = original[(n - j) % n].internal;
        }
    }

    /// Recompute every outward edge normal from the current positions.
    pub fn recompute_normals(&mut self) {
        let n = self.vertices.len();
        for i in 0..n {
            let prev = self.vertices[(i + n - 1) % n].position;
            let edge = self.vertices[i].position - prev;
            // Rotating the edge clockwise points outward for CCW winding
            self.vertices[i].normal = Vector2::new(edge.y, -edge.x)
                .try_normalize(DEGENERATE_EPSILON)
                .unwrap_or_else(fallback_normal);
        }
    }

    /// Centroid and area, using the triangle fan from the local origin.
    pub fn centroid_and_area(&self) -> (Vector2<f32>, f32) {
        let n = self.vertices.len();
        let mut weighted = Vector2::zeros();
        let mut area = 0.0;
        let mut last = self.vertices[n - 1].position;
        for vertex in self.vertices.iter() {
            let current = vertex.position;
            let tri_area = last.perp(&current) * 0.5;
            // Triangle (origin, last, current) has its centroid at (last + current) / 3
            weighted += (last + current) * tri_area;
            area += tri_area;
            last = current;
        }
        if area.abs() < DEGENERATE_EPSILON {
            return (Vector2::zeros(), area);
        }
        (weighted / (3.0 * area), area)
    }

    /// Second moment of area about the local origin.
    pub fn second_moment(&self) -> f32 {
        let n = self.vertices.len();
        let mut moment = 0.0;
        let mut last = self.vertices[n - 1].position;
        for vertex in self.vertices.iter() {
            let current = vertex.position;
            let tri_area = last.perp(&current) * 0.5;
            moment += (last.norm_squared() + last.dot(&current) + current.norm_squared()) * tri_area;
            last = current;
        }
        moment / 6.0
    }

    pub fn translate(&mut self, offset: Vector2<f32>) {
        for vertex in self.vertices.iter_mut() {
            vertex.position += offset;
        }
        self.recompute_normals();
    }

    /// Copy of this polygon rotated then translated. Normals are rotated only.
    pub fn transformed(&self, position: Vector2<f32>, rotation: UnitComplex<f32>) -> Self {
        let mut vertices = self.vertices.clone();
        for vertex in vertices.iter_mut() {
            vertex.position = rotation * vertex.position + position;
            vertex.normal = rotation * vertex.normal;
        }
        Self { vertices }
    }
}

/// A circle in body-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vector2<f32>,
    pub radius: f32,
}

/// Area of a disk of the given radius.
#[inline]
pub(crate) fn disk_area(radius: f32) -> f32 {
    PI * radius * radius
}

impl Circle {
    /// Any radius is accepted here so zero-size query circles work;
    /// [`RigidBody::new`](crate::body::RigidBody::new) rejects non-positive
    /// radii on body colliders.
    pub fn new(center: Vector2<f32>, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn centroid_and_area(&self) -> (Vector2<f32>, f32) {
        (self.center, disk_area(self.radius))
    }

    /// Disk moment about its own center plus the parallel-axis term for the
    /// offset from the local origin.
    pub fn second_moment(&self) -> f32 {
        let area = disk_area(self.radius);
        area * self.radius * self.radius * 0.5 + area * self.center.norm_squared()
    }

    pub fn translate(&mut self, offset: Vector2<f32>) {
        self.center += offset;
    }

    pub fn transformed(&self, position: Vector2<f32>, rotation: UnitComplex<f32>) -> Self {
        Self {
            center: rotation * self.center + position,
            radius: self.radius,
        }
    }
}

/// A collider attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Polygon(Polygon),
}

impl Shape {
    /// Area-weighted centroid and area of the shape in its local frame.
    pub fn centroid_and_area(&self) -> (Vector2<f32>, f32) {
        match self {
            Shape::Circle(circle) => circle.centroid_and_area(),
            Shape::Polygon(polygon) => polygon.centroid_and_area(),
        }
    }

    /// Second moment of area about the local origin.
    pub fn second_moment(&self) -> f32 {
        match self {
            Shape::Circle(circle) => circle.second_moment(),
            Shape::Polygon(polygon) => polygon.second_moment(),
        }
    }

    pub fn translate(&mut self, offset: Vector2<f32>) {
        match self {
            Shape::Circle(circle) => circle.translate(offset),
            Shape::Polygon(polygon) => polygon.translate(offset),
        }
    }

    /// Copy of the shape placed at `position` with orientation `rotation`.
    pub fn transformed(&self, position: Vector2<f32>, rotation: UnitComplex<f32>) -> Self {
        match self {
            Shape::Circle(circle) => Shape::Circle(circle.transformed(position, rotation)),
            Shape::Polygon(polygon) => Shape::Polygon(polygon.transformed(position, rotation)),
        }
    }
}

impl From<Circle> for Shape {
    fn from(circle: Circle) -> Self {
        Shape::Circle(circle)
    }
}

impl From<Polygon> for Shape {
    fn from(polygon: Polygon) -> Self {
        Shape::Polygon(polygon)
    }
}
