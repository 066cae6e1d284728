//! Narrow-phase collision between world-space shapes.
//!
//! Every test reports the contact normal pointing from the second shape
//! toward the first, so pushing the first shape along `+normal` (and the
//! second along `-normal`) separates them.

use nalgebra::Vector2;

// ComplexField provides abs()/sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

use crate::body::{BodyId, RigidBody, MAX_COLLIDERS};
use crate::shape::{fallback_normal, Circle, Polygon, Shape, Vertex, DEGENERATE_EPSILON};

/// A manifold never holds more than this many points.
pub const MAX_CONTACT_POINTS: usize = 2;

/// Contact points of a single manifold, in world space.
pub type ContactPoints = heapless::Vec<Vector2<f32>, MAX_CONTACT_POINTS>;

/// Result of testing two shapes, before body ownership is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeContact {
    /// Unit normal pointing from the second shape toward the first.
    pub normal: Vector2<f32>,
    /// Penetration depth along `normal` (positive when overlapping).
    pub depth: f32,
    pub points: ContactPoints,
}

impl ShapeContact {
    fn single(normal: Vector2<f32>, depth: f32, point: Vector2<f32>) -> Self {
        let mut points = ContactPoints::new();
        let _ = points.push(point);
        Self {
            normal,
            depth,
            points,
        }
    }

    /// Same manifold seen from the other shape.
    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

/// A contact between two bodies, valid for the sub-step that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Unit normal pointing from `body_b` toward `body_a`.
    pub normal: Vector2<f32>,
    /// Penetration depth along the normal.
    pub depth: f32,
    /// World-space contact points (0 to 2).
    pub points: ContactPoints,
}

impl Contact {
    fn new(body_a: BodyId, body_b: BodyId, contact: ShapeContact) -> Self {
        Self {
            body_a,
            body_b,
            normal: contact.normal,
            depth: contact.depth,
            points: contact.points,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Test two world-space shapes for overlap.
///
/// Returns `None` when the shapes are disjoint.
pub fn collide_shapes(a: &Shape, b: &Shape) -> Option<ShapeContact> {
    match (a, b) {
        (Shape::Circle(a), Shape::Circle(b)) => collide_circles(a, b),
        (Shape::Circle(a), Shape::Polygon(b)) => collide_circle_polygon(a, b),
        (Shape::Polygon(a), Shape::Circle(b)) => collide_polygon_circle(a, b),
        (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(a, b),
    }
}

/// Test every collider of `body_a` against every collider of `body_b` and push
/// one [`Contact`] per overlapping pair.
///
/// Returns the number of contacts that did not fit into `contacts`.
pub fn collide_bodies<const C: usize>(
    id_a: BodyId,
    body_a: &RigidBody,
    id_b: BodyId,
    body_b: &RigidBody,
    contacts: &mut heapless::Vec<Contact, C>,
) -> usize {
    let shapes_b: heapless::Vec<Shape, MAX_COLLIDERS> = body_b.world_colliders().collect();
    let mut dropped = 0;

    for shape_a in body_a.world_colliders() {
        for shape_b in shapes_b.iter() {
            if let Some(contact) = collide_shapes(&shape_a, shape_b) {
                if contacts.push(Contact::new(id_a, id_b, contact)).is_err() {
                    dropped += 1;
                }
            }
        }
    }

    dropped
}

// ---------------------------------------------------------------------------
// Circle tests
// ---------------------------------------------------------------------------

/// Circle vs circle. The contact point lies on `b`'s surface.
pub fn collide_circles(a: &Circle, b: &Circle) -> Option<ShapeContact> {
    let between = a.center - b.center;
    let distance = between.norm();
    let radii = a.radius + b.radius;
    if distance >= radii {
        return None;
    }

    let normal = if distance > DEGENERATE_EPSILON {
        between / distance
    } else {
        // Coincident centers
        fallback_normal()
    };

    Some(ShapeContact::single(
        normal,
        radii - distance,
        b.center + normal * b.radius,
    ))
}

/// Closest polygon feature to a circle center.
struct Feature {
    distance: f32,
    point: Vector2<f32>,
    normal: Vector2<f32>,
}

/// Circle vs polygon. The normal points from the polygon toward the circle.
///
/// Each edge is inspected in the frame of the vertex that ends it: `x` along
/// the edge's outward normal, `y` along the edge direction, so the edge spans
/// `y ∈ [-length, 0]`. The circle center either lies past the vertex (vertex
/// feature), inside the edge's span (face feature) or before it (left to the
/// previous vertex). Internal edges still reject a circle lying wholly in
/// front of them but never become the contact feature.
pub fn collide_circle_polygon(circle: &Circle, polygon: &Polygon) -> Option<ShapeContact> {
    let vertices = polygon.vertices();
    let n = vertices.len();
    let mut best: Option<Feature> = None;

    for i in 0..n {
        let vertex = &vertices[i];
        let previous = &vertices[(i + n - 1) % n];
        let tangent = edge_tangent(vertex.normal);
        let edge_length = (vertex.position - previous.position).norm();

        let offset = circle.center - vertex.position;
        let along_normal = offset.dot(&vertex.normal);
        let along_edge = offset.dot(&tangent);

        // Whole circle in front of this face
        if along_normal > circle.radius {
            return None;
        }

        let candidate = if along_edge > 0.0 {
            let distance = offset.norm();
            Feature {
                distance,
                point: vertex.position,
                normal: offset
                    .try_normalize(DEGENERATE_EPSILON)
                    .unwrap_or(vertex.normal),
            }
        } else if along_edge < -edge_length || vertex.internal {
            continue;
        } else {
            Feature {
                distance: along_normal,
                point: circle.center - vertex.normal * along_normal,
                normal: vertex.normal,
            }
        };

        if best
            .as_ref()
            .map_or(true, |b| candidate.distance.abs() < b.distance.abs())
        {
            best = Some(candidate);
        }
    }

    let feature = best?;
    if feature.distance > circle.radius {
        return None;
    }

    Some(ShapeContact::single(
        feature.normal,
        circle.radius - feature.distance,
        feature.point,
    ))
}

/// Polygon vs circle; the mirror of [`collide_circle_polygon`].
pub fn collide_polygon_circle(polygon: &Polygon, circle: &Circle) -> Option<ShapeContact> {
    collide_circle_polygon(circle, polygon).map(ShapeContact::flipped)
}

// ---------------------------------------------------------------------------
// Polygon vs polygon (separating axis theorem)
// ---------------------------------------------------------------------------

/// Least-penetration face of a reference polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    depth: f32,
    /// Vertex ending the reference face.
    reference: usize,
    /// Deepest incident vertex along the face normal.
    incident: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AxisQuery {
    /// Some face normal fully separates the polygons.
    Separated,
    /// Overlapping along every face; `None` when every face is internal.
    Overlap(Option<Axis>),
}

/// Project `incident` onto each face normal of `reference` and find the face
/// of least penetration.
fn least_penetration_axis(reference: &Polygon, incident: &Polygon) -> AxisQuery {
    let mut best: Option<Axis> = None;

    for (i, face) in reference.vertices().iter().enumerate() {
        let reference_projection = face.position.dot(&face.normal);

        let mut min_projection = f32::INFINITY;
        let mut min_index = 0;
        for (j, vertex) in incident.vertices().iter().enumerate() {
            let projection = vertex.position.dot(&face.normal);
            if projection < min_projection {
                min_projection = projection;
                min_index = j;
            }
        }

        if min_projection > reference_projection {
            return AxisQuery::Separated;
        }
        if face.internal {
            continue;
        }

        let depth = reference_projection - min_projection;
        if best.map_or(true, |b| depth < b.depth) {
            best = Some(Axis {
                depth,
                reference: i,
                incident: min_index,
            });
        }
    }

    AxisQuery::Overlap(best)
}

/// Polygon vs polygon using the separating axis theorem on both polygons'
/// face normals, followed by clipping the incident edge against the
/// reference face.
///
/// Internal edges can still prove separation but are never chosen as the
/// contact axis. When neither polygon has a usable face the pair is treated
/// as disjoint.
pub fn collide_polygons(a: &Polygon, b: &Polygon) -> Option<ShapeContact> {
    let b_faces = match least_penetration_axis(b, a) {
        AxisQuery::Separated => return None,
        AxisQuery::Overlap(axis) => axis,
    };
    let a_faces = match least_penetration_axis(a, b) {
        AxisQuery::Separated => return None,
        AxisQuery::Overlap(axis) => axis,
    };

    match (b_faces, a_faces) {
        (None, None) => None,
        (Some(on_b), Some(on_a)) if on_a.depth < on_b.depth => Some(face_contact(a, b, on_a).flipped()),
        (None, Some(on_a)) => Some(face_contact(a, b, on_a).flipped()),
        (Some(on_b), _) => Some(face_contact(b, a, on_b)),
    }
}

/// Build the manifold for a winning axis. The normal points out of
/// `reference`, toward `incident`.
fn face_contact(reference: &Polygon, incident: &Polygon, axis: Axis) -> ShapeContact {
    let ref_vertices = reference.vertices();
    let inc_vertices = incident.vertices();
    let n_ref = ref_vertices.len();
    let n_inc = inc_vertices.len();

    let face_end = &ref_vertices[axis.reference];
    let face_start = &ref_vertices[(axis.reference + n_ref - 1) % n_ref];
    let face = ReferenceFace::new(face_start, face_end);

    // The incident face is the neighbour edge most anti-parallel to the axis
    let k = axis.incident;
    let before = &inc_vertices[(k + n_inc - 1) % n_inc];
    let deepest = &inc_vertices[k];
    let after = &inc_vertices[(k + 1) % n_inc];
    let segment = if deepest.normal.dot(&face.normal) < after.normal.dot(&face.normal) {
        [before.position, deepest.position]
    } else {
        [deepest.position, after.position]
    };

    // The deepest vertex passed the overlap test on this axis with the same
    // projection, so it always survives clipping.
    let points = face.clip(segment);

    ShapeContact {
        normal: face.normal,
        depth: axis.depth,
        points,
    }
}

/// A reference face expressed in the frame of the vertex ending it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReferenceFace {
    end: Vector2<f32>,
    normal: Vector2<f32>,
    tangent: Vector2<f32>,
    length: f32,
}

impl ReferenceFace {
    fn new(start: &Vertex, end: &Vertex) -> Self {
        Self {
            end: end.position,
            normal: end.normal,
            tangent: edge_tangent(end.normal),
            length: (end.position - start.position).norm(),
        }
    }

    /// Keep the segment endpoints that lie behind the face, projected onto
    /// it and clamped to its extent.
    pub(crate) fn clip(&self, segment: [Vector2<f32>; 2]) -> ContactPoints {
        let face_projection = self.end.dot(&self.normal);
        let mut points = ContactPoints::new();
        for point in segment {
            if point.dot(&self.normal) > face_projection {
                continue;
            }
            let _ = points.push(self.project(point));
        }
        points
    }

    fn project(&self, point: Vector2<f32>) -> Vector2<f32> {
        let along_edge = (point - self.end).dot(&self.tangent).clamp(-self.length, 0.0);
        self.end + self.tangent * along_edge
    }
}

/// Edge direction for a counter-clockwise polygon, from its outward normal.
#[inline]
fn edge_tangent(normal: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(-normal.y, normal.x)
}
