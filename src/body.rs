//! Rigid bodies: state, mass properties and frame transforms.
//!
//! Three frames are used throughout the crate:
//! - **world**: the simulation frame.
//! - **local**: attached to the body, origin at its center of mass.
//! - **axis-aligned local**: the body's orientation without its translation.
//!   Directions and lever arms for torque bookkeeping are expressed here.
//!
//! The acceleration accumulators hold *velocity changes*: [`RigidBody::apply_force`]
//! already multiplies by the inverse mass, and the integrator adds the
//! accumulators to the velocities as they are.

use log::debug;
use nalgebra::{UnitComplex, Vector2};

use crate::error::{require_positive, PhysicsError};
use crate::shape::{Circle, Polygon, Shape};

/// Maximum number of colliders a single body can carry.
pub const MAX_COLLIDERS: usize = 8;

/// Index of a rigid body within a [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    /// Id carried by contacts from [`test_hitbox`](crate::world::PhysicsWorld::test_hitbox)
    /// for the probe side. Never assigned to a real body.
    pub const PROBE: BodyId = BodyId(usize::MAX);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Determines how a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Fully simulated: affected by gravity, forces, impulses and contacts.
    Dynamic,
    /// Zero inverse mass and inertia. Collides as an immovable obstacle and is
    /// never integrated; it only moves when repositioned explicitly.
    Static,
}

/// Surface and bulk properties of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Restitution coefficient, nominally in `0.0..=1.0`.
    pub bounciness: f32,
    /// Kinetic (sliding) friction coefficient.
    pub friction: f32,
    /// Static friction coefficient.
    pub static_friction: f32,
    /// Mass per unit area.
    pub density: f32,
}

impl Material {
    pub const fn new(bounciness: f32, friction: f32, static_friction: f32, density: f32) -> Self {
        Self {
            bounciness,
            friction,
            static_friction,
            density,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(0.2, 0.3, 0.4, 1.0)
    }
}

/// Optional settings for [`RigidBody::new`].
///
/// Individual overrides are applied on top of [`with_material`](Self::with_material)
/// (or [`Material::default`]) and only ever change this body's own copy.
#[derive(Debug, Clone, Default)]
pub struct BodyOptions {
    rotation: Option<UnitComplex<f32>>,
    velocity: Option<Vector2<f32>>,
    angular_velocity: Option<f32>,
    restitution: Option<f32>,
    static_friction: Option<f32>,
    friction: Option<f32>,
    density: Option<f32>,
    mass: Option<f32>,
    material: Option<Material>,
    is_static: bool,
    skip_recentering: bool,
}

impl BodyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the initial orientation.
    pub fn with_rotation(mut self, rotation: UnitComplex<f32>) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Builder: set the initial orientation from an angle in radians.
    pub fn with_angle(self, angle: f32) -> Self {
        self.with_rotation(UnitComplex::new(angle))
    }

    /// Builder: set the initial linear velocity.
    pub fn with_velocity(mut self, velocity: Vector2<f32>) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Builder: set the initial angular velocity (radians per second, counter-clockwise).
    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = Some(angular_velocity);
        self
    }

    /// Builder: set restitution (bounciness, 0.0..=1.0).
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution.clamp(0.0, 1.0));
        self
    }

    /// Builder: set the static friction coefficient.
    pub fn with_static_friction(mut self, friction: f32) -> Self {
        self.static_friction = Some(friction.max(0.0));
        self
    }

    /// Builder: set the kinetic friction coefficient.
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = Some(friction.max(0.0));
        self
    }

    /// Builder: set the density used to derive mass and inertia.
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = Some(density);
        self
    }

    /// Builder: force the total mass. Inertia is rescaled by the same factor.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    /// Builder: start from this material instead of the default one.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    /// Builder: make the body static (zero inverse mass and inertia).
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Builder: keep the colliders where they are instead of moving the
    /// center of mass to the local origin.
    pub fn with_skip_recentering(mut self, skip: bool) -> Self {
        self.skip_recentering = skip;
        self
    }
}

/// A rigid body with linear and angular dynamics.
///
/// Mass and inertia are derived once from the colliders and the density at
/// construction and are frozen afterwards.
#[derive(Debug, Clone)]
pub struct RigidBody {
    // -- Linear state --
    position: Vector2<f32>,
    velocity: Vector2<f32>,
    /// Velocity change accumulated this sub-step.
    acceleration: Vector2<f32>,
    mass: f32,
    inv_mass: f32,

    // -- Angular state --
    rotation: UnitComplex<f32>,
    angular_velocity: f32,
    /// Angular velocity change accumulated this sub-step.
    angular_acceleration: f32,
    inertia: f32,
    inv_inertia: f32,

    // -- Shadow state from the previous sub-step, informational only --
    previous_position: Vector2<f32>,
    previous_rotation: UnitComplex<f32>,
    last_dt: f32,

    material: Material,
    body_type: BodyType,
    colliders: heapless::Vec<Shape, MAX_COLLIDERS>,

    /// Inactive bodies are skipped by integration, collisions and constraints.
    active: bool,
}

impl RigidBody {
    /// Create a body at `position` from one or more body-local colliders.
    ///
    /// Unless [`BodyOptions::with_skip_recentering`] is set, the colliders are
    /// shifted so the computed center of mass becomes the local origin.
    pub fn new<I>(position: Vector2<f32>, colliders: I, options: BodyOptions) -> Result<Self, PhysicsError>
    where
        I: IntoIterator<Item = Shape>,
    {
        let mut shapes: heapless::Vec<Shape, MAX_COLLIDERS> = heapless::Vec::new();
        let mut count = 0;
        for shape in colliders {
            count += 1;
            let _ = shapes.push(shape);
        }
        if count == 0 {
            return Err(PhysicsError::NoColliders);
        }
        if count > MAX_COLLIDERS {
            return Err(PhysicsError::TooManyColliders {
                count,
                max: MAX_COLLIDERS,
            });
        }
        for shape in shapes.iter() {
            if let Shape::Circle(circle) = shape {
                require_positive("circle radius", circle.radius)?;
            }
        }

        let mut material = options.material.unwrap_or_default();
        if let Some(restitution) = options.restitution {
            material.bounciness = restitution;
        }
        if let Some(density) = options.density {
            material.density = density;
        }
        if let Some(friction) = options.static_friction {
            material.static_friction = friction;
        }
        if let Some(friction) = options.friction {
            material.friction = friction;
        }

        let (mut mass, mut inertia) =
            compute_mass_properties(&mut shapes, material.density, options.skip_recentering)?;
        let mut inv_mass = 1.0 / mass;
        let mut inv_inertia = 1.0 / inertia;

        let body_type = if options.is_static {
            inv_mass = 0.0;
            inv_inertia = 0.0;
            BodyType::Static
        } else {
            BodyType::Dynamic
        };

        if let Some(requested) = options.mass {
            if !(requested > 0.0 && requested.is_finite()) {
                return Err(PhysicsError::DegenerateMass {
                    area: mass / material.density,
                    mass: requested,
                    inertia,
                });
            }
            let factor = requested / mass;
            debug!("mass override {} -> {} (factor {})", mass, requested, factor);
            mass *= factor;
            inertia *= factor;
            inv_mass /= factor;
            inv_inertia /= factor;
        }

        let rotation = options.rotation.unwrap_or_else(UnitComplex::identity);
        let velocity = options.velocity.unwrap_or_else(Vector2::zeros);
        let angular_velocity = options.angular_velocity.unwrap_or(0.0);
        let last_dt = 1.0;

        Ok(Self {
            position,
            velocity,
            acceleration: Vector2::zeros(),
            mass,
            inv_mass,
            rotation,
            angular_velocity,
            angular_acceleration: 0.0,
            inertia,
            inv_inertia,
            previous_position: position - velocity * last_dt,
            previous_rotation: UnitComplex::new(-angular_velocity * last_dt) * rotation,
            last_dt,
            material,
            body_type,
            colliders: shapes,
            active: true,
        })
    }

    /// Shorthand: a `width` × `height` rectangle centered on `position`.
    pub fn rectangle(
        position: Vector2<f32>,
        width: f32,
        height: f32,
        options: BodyOptions,
    ) -> Result<Self, PhysicsError> {
        Self::new(
            position,
            [Shape::from(Polygon::rectangle(Vector2::zeros(), width, height))],
            options,
        )
    }

    /// Shorthand: a regular polygon centered on `position`.
    pub fn regular_polygon(
        position: Vector2<f32>,
        radius: f32,
        sides: usize,
        options: BodyOptions,
    ) -> Result<Self, PhysicsError> {
        let polygon = Polygon::regular(Vector2::zeros(), radius, sides)?;
        Self::new(position, [Shape::from(polygon)], options)
    }

    /// Shorthand: a disk centered on `position`.
    pub fn circle(position: Vector2<f32>, radius: f32, options: BodyOptions) -> Result<Self, PhysicsError> {
        Self::new(
            position,
            [Shape::from(Circle::new(Vector2::zeros(), radius))],
            options,
        )
    }

    /// Disposable query body at the origin. Mass properties are not derived,
    /// so degenerate shapes (points, slivers) are accepted.
    pub(crate) fn probe(shape: Shape) -> Self {
        let mut colliders = heapless::Vec::new();
        let _ = colliders.push(shape);
        Self {
            position: Vector2::zeros(),
            velocity: Vector2::zeros(),
            acceleration: Vector2::zeros(),
            mass: 0.0,
            inv_mass: 0.0,
            rotation: UnitComplex::identity(),
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            previous_position: Vector2::zeros(),
            previous_rotation: UnitComplex::identity(),
            last_dt: 1.0,
            material: Material::default(),
            body_type: BodyType::Static,
            colliders,
            active: true,
        }
    }

    // -- Accessors --

    pub fn position(&self) -> Vector2<f32> {
        self.position
    }

    pub fn rotation(&self) -> UnitComplex<f32> {
        self.rotation
    }

    /// Orientation in radians, in `(-π, π]`.
    pub fn angle(&self) -> f32 {
        self.rotation.angle()
    }

    pub fn velocity(&self) -> Vector2<f32> {
        self.velocity
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Position before the most recent integration.
    pub fn previous_position(&self) -> Vector2<f32> {
        self.previous_position
    }

    /// Orientation before the most recent integration.
    pub fn previous_rotation(&self) -> UnitComplex<f32> {
        self.previous_rotation
    }

    /// Pending linear velocity change (already divided by mass).
    pub fn acceleration(&self) -> Vector2<f32> {
        self.acceleration
    }

    /// Pending angular velocity change (already divided by inertia).
    pub fn angular_acceleration(&self) -> f32 {
        self.angular_acceleration
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn inverse_inertia(&self) -> f32 {
        self.inv_inertia
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Colliders in body-local space.
    pub fn colliders(&self) -> &[Shape] {
        &self.colliders
    }

    /// Colliders placed in world space at the current pose.
    pub fn world_colliders(&self) -> impl Iterator<Item = Shape> + '_ {
        self.colliders
            .iter()
            .map(move |shape| shape.transformed(self.position, self.rotation))
    }

    /// Returns the kinetic energy: `½mv² + ½Iω²`.
    pub fn kinetic_energy(&self) -> f32 {
        0.5 * self.mass * self.velocity.norm_squared()
            + 0.5 * self.inertia * self.angular_velocity * self.angular_velocity
    }

    // -- Frame transforms --

    pub fn local_to_world(&self, point: Vector2<f32>) -> Vector2<f32> {
        self.rotation * point + self.position
    }

    pub fn world_to_local(&self, point: Vector2<f32>) -> Vector2<f32> {
        self.rotation.inverse() * (point - self.position)
    }

    /// Rotate a local vector into world orientation without translating it.
    pub fn local_to_aa(&self, vector: Vector2<f32>) -> Vector2<f32> {
        self.rotation * vector
    }

    pub fn aa_to_local(&self, vector: Vector2<f32>) -> Vector2<f32> {
        self.rotation.inverse() * vector
    }

    // -- Point velocities --

    /// Velocity of the material point at `point` (world space): `v + ω × r`.
    pub fn velocity_at_world_point(&self, point: Vector2<f32>) -> Vector2<f32> {
        self.velocity_at_offset(point - self.position)
    }

    /// Velocity of the material point at `point` (local space).
    pub fn velocity_at_local_point(&self, point: Vector2<f32>) -> Vector2<f32> {
        self.velocity_at_offset(self.local_to_aa(point))
    }

    /// `offset` is in axis-aligned local space.
    pub(crate) fn velocity_at_offset(&self, offset: Vector2<f32>) -> Vector2<f32> {
        self.velocity + Vector2::new(-offset.y, offset.x) * self.angular_velocity
    }

    // -- Forces & impulses --

    /// Accumulate a force applied at `offset` (axis-aligned local space).
    ///
    /// The force is stored as a velocity change, `force * inverse_mass`, so a
    /// continuous force must be pre-multiplied by the step duration. No-op on
    /// static bodies.
    #[inline]
    pub fn apply_force(&mut self, force: Vector2<f32>, offset: Vector2<f32>) {
        self.acceleration += force * self.inv_mass;
        self.angular_acceleration += offset.perp(&force) * self.inv_inertia;
    }

    /// Like [`apply_force`](Self::apply_force) with the application point given in world space.
    #[inline]
    pub fn apply_force_at_point(&mut self, force: Vector2<f32>, point: Vector2<f32>) {
        self.apply_force(force, point - self.position);
    }

    /// Apply an instantaneous impulse at `offset` (axis-aligned local space).
    /// Directly modifies velocity: `Δv = J / m`, `Δω = (r × J) / I`.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vector2<f32>, offset: Vector2<f32>) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += offset.perp(&impulse) * self.inv_inertia;
    }

    // -- Direct state mutation --

    /// Move the body by `delta`.
    ///
    /// With `impart_velocity` the displacement also counts as motion over the
    /// last sub-step and is added to the velocity; otherwise it is a teleport
    /// and the previous-position shadow is shifted along with it.
    pub fn translate(&mut self, delta: Vector2<f32>, impart_velocity: bool) {
        self.position += delta;
        if impart_velocity {
            self.velocity += delta / self.last_dt;
        } else {
            self.previous_position += delta;
        }
    }

    pub fn set_position(&mut self, position: Vector2<f32>, impart_velocity: bool) {
        self.translate(position - self.position, impart_velocity);
    }

    /// Rotate the body by `delta`, with the same velocity semantics as
    /// [`translate`](Self::translate).
    pub fn rotate(&mut self, delta: UnitComplex<f32>, impart_velocity: bool) {
        self.rotation = delta * self.rotation;
        self.rotation.renormalize();
        if impart_velocity {
            self.angular_velocity += delta.angle() / self.last_dt;
        } else {
            self.previous_rotation = delta * self.previous_rotation;
        }
    }

    pub fn set_rotation(&mut self, rotation: UnitComplex<f32>, impart_velocity: bool) {
        self.rotate(rotation * self.rotation.inverse(), impart_velocity);
    }

    pub fn set_velocity(&mut self, velocity: Vector2<f32>) {
        self.velocity = velocity;
        self.previous_position = self.position - velocity * self.last_dt;
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: f32) {
        self.angular_velocity = angular_velocity;
        self.previous_rotation = UnitComplex::new(-angular_velocity * self.last_dt) * self.rotation;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Deactivate and drop all motion.
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
        self.velocity = Vector2::zeros();
        self.angular_velocity = 0.0;
        self.clear_accumulators();
    }

    // -- Integration --

    /// Integrate this body forward by `dt` seconds using semi-implicit Euler.
    ///
    /// Gravity and the accumulated velocity changes are added to the
    /// velocities first, then position and orientation advance with the new
    /// velocities.
    pub(crate) fn integrate(&mut self, dt: f32, gravity: Vector2<f32>) {
        self.previous_position = self.position;
        self.previous_rotation = self.rotation;
        self.last_dt = dt;

        if self.body_type != BodyType::Dynamic {
            self.clear_accumulators();
            return;
        }

        // --- Linear ---
        self.acceleration += gravity * dt;
        self.velocity += self.acceleration;
        self.position += self.velocity * dt;

        // --- Angular ---
        self.angular_velocity += self.angular_acceleration;
        self.rotation = UnitComplex::new(self.angular_velocity * dt) * self.rotation;
        self.rotation.renormalize();

        self.clear_accumulators();
    }

    /// Fold the accumulators into the velocities without moving the body.
    pub(crate) fn apply_accelerations(&mut self) {
        self.velocity += self.acceleration;
        self.angular_velocity += self.angular_acceleration;
        self.clear_accumulators();
    }

    /// Positional correction that leaves velocity untouched.
    pub(crate) fn nudge(&mut self, delta: Vector2<f32>) {
        self.position += delta;
    }

    fn clear_accumulators(&mut self) {
        self.acceleration = Vector2::zeros();
        self.angular_acceleration = 0.0;
    }
}

/// Derive `(mass, inertia)` from the shapes, recentering them on the center
/// of mass unless `skip_recentering` is set.
fn compute_mass_properties(
    shapes: &mut [Shape],
    density: f32,
    skip_recentering: bool,
) -> Result<(f32, f32), PhysicsError> {
    let mut weighted = Vector2::zeros();
    let mut area = 0.0;
    for shape in shapes.iter() {
        let (centroid, shape_area) = shape.centroid_and_area();
        weighted += centroid * shape_area;
        area += shape_area;
    }

    let mass = area * density;
    if !(area > 0.0 && area.is_finite() && mass > 0.0 && mass.is_finite()) {
        return Err(PhysicsError::DegenerateMass {
            area,
            mass,
            inertia: 0.0,
        });
    }

    if !skip_recentering {
        let offset = -weighted / area;
        for shape in shapes.iter_mut() {
            shape.translate(offset);
        }
    }

    let inertia = shapes.iter().map(Shape::second_moment).sum::<f32>() * density;
    if !(inertia > 0.0 && inertia.is_finite()) {
        return Err(PhysicsError::DegenerateMass { area, mass, inertia });
    }
    Ok((mass, inertia))
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use core::f32::consts::{FRAC_PI_2, PI};

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn approx_vec_eq(a: &Vector2<f32>, b: &Vector2<f32>) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
    }

    fn unit_box() -> RigidBody {
        RigidBody::rectangle(Vector2::zeros(), 1.0, 1.0, BodyOptions::new()).unwrap()
    }

    // -- Construction --

    #[test]
    fn test_rectangle_mass_and_inertia() {
        let body = RigidBody::rectangle(
            Vector2::new(1.0, 2.0),
            2.0,
            3.0,
            BodyOptions::new().with_density(2.0),
        )
        .unwrap();
        assert!(approx_eq(body.mass(), 12.0));
        assert!(approx_eq(body.inverse_mass(), 1.0 / 12.0));
        // I = m (w² + h²) / 12
        assert!(approx_eq(body.inertia(), 12.0 * 13.0 / 12.0));
        assert_eq!(body.body_type(), BodyType::Dynamic);
        assert!(approx_vec_eq(&body.position(), &Vector2::new(1.0, 2.0)));
    }

    #[test]
    fn test_circle_mass() {
        let body = RigidBody::circle(Vector2::zeros(), 2.0, BodyOptions::new()).unwrap();
        let area = PI * 4.0;
        assert!(approx_eq(body.mass(), area));
        assert!(approx_eq(body.inertia(), area * 2.0));
    }

    #[test]
    fn test_recentering_moves_centroid_to_origin() {
        let offset_box = Shape::from(Polygon::rectangle(Vector2::new(3.0, -2.0), 2.0, 2.0));
        let body = RigidBody::new(Vector2::zeros(), [offset_box], BodyOptions::new()).unwrap();
        let (centroid, _) = body.colliders()[0].centroid_and_area();
        assert!(approx_vec_eq(&centroid, &Vector2::zeros()));
    }

    #[test]
    fn test_recentering_multi_shape_body() {
        // Equal-area pieces at x = 0 and x = 4 balance at x = 2
        let left = Shape::from(Polygon::rectangle(Vector2::zeros(), 2.0, 2.0));
        let right = Shape::from(Polygon::rectangle(Vector2::new(4.0, 0.0), 2.0, 2.0));
        let body = RigidBody::new(Vector2::zeros(), [left, right], BodyOptions::new()).unwrap();

        let (c0, a0) = body.colliders()[0].centroid_and_area();
        let (c1, a1) = body.colliders()[1].centroid_and_area();
        assert!(approx_vec_eq(&c0, &Vector2::new(-2.0, 0.0)));
        assert!(approx_vec_eq(&c1, &Vector2::new(2.0, 0.0)));
        let combined = (c0 * a0 + c1 * a1) / (a0 + a1);
        assert!(approx_vec_eq(&combined, &Vector2::zeros()));

        // Each box: A(w²+h²)/12 + A·d² = 4·8/12 + 4·4
        let expected = 2.0 * (4.0 * 8.0 / 12.0 + 16.0);
        assert!(approx_eq(body.inertia(), expected));
    }

    #[test]
    fn test_skip_recentering_keeps_offsets() {
        let offset_circle = Shape::from(Circle::new(Vector2::new(1.0, 0.0), 0.5));
        let body = RigidBody::new(
            Vector2::zeros(),
            [offset_circle],
            BodyOptions::new().with_skip_recentering(true),
        )
        .unwrap();
        let (centroid, _) = body.colliders()[0].centroid_and_area();
        assert!(approx_vec_eq(&centroid, &Vector2::new(1.0, 0.0)));
    }

    #[test]
    fn test_static_body() {
        let body = RigidBody::rectangle(Vector2::zeros(), 4.0, 1.0, BodyOptions::new().with_static(true))
            .unwrap();
        assert_eq!(body.body_type(), BodyType::Static);
        assert!(body.is_static());
        assert_eq!(body.inverse_mass(), 0.0);
        assert_eq!(body.inverse_inertia(), 0.0);
        assert!(body.mass() > 0.0);
    }

    #[test]
    fn test_mass_override_rescales() {
        let body = RigidBody::rectangle(Vector2::zeros(), 2.0, 2.0, BodyOptions::new().with_mass(10.0))
            .unwrap();
        assert!(approx_eq(body.mass(), 10.0));
        assert!(approx_eq(body.inverse_mass(), 0.1));
        // Geometry inertia 4·8/12 scaled by 10/4
        let expected = 4.0 * 8.0 / 12.0 * 2.5;
        assert!(approx_eq(body.inertia(), expected));
        assert!(approx_eq(body.inverse_inertia(), 1.0 / expected));
    }

    #[test]
    fn test_invalid_mass_override() {
        let result = RigidBody::rectangle(Vector2::zeros(), 1.0, 1.0, BodyOptions::new().with_mass(-1.0));
        assert!(matches!(result, Err(PhysicsError::DegenerateMass { .. })));
    }

    #[test]
    fn test_non_positive_circle_radius_is_error() {
        for radius in [0.0, -1.0, f32::NAN] {
            let result = RigidBody::circle(Vector2::zeros(), radius, BodyOptions::new());
            assert!(matches!(
                result,
                Err(PhysicsError::InvalidParameter {
                    name: "circle radius",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_zero_area_polygon_is_error() {
        let sliver = Polygon::new(&[Vector2::zeros(), Vector2::new(1.0, 0.0), Vector2::new(2.0, 0.0)]).unwrap();
        let result = RigidBody::new(Vector2::zeros(), [Shape::from(sliver)], BodyOptions::new());
        assert!(matches!(result, Err(PhysicsError::DegenerateMass { .. })));
    }

    #[test]
    fn test_zero_density_is_error() {
        let result = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new().with_density(0.0));
        assert!(matches!(result, Err(PhysicsError::DegenerateMass { .. })));
    }

    #[test]
    fn test_no_colliders_is_error() {
        let result = RigidBody::new(Vector2::zeros(), core::iter::empty::<Shape>(), BodyOptions::new());
        assert_eq!(result.err(), Some(PhysicsError::NoColliders));
    }

    #[test]
    fn test_too_many_colliders_is_error() {
        let shapes = (0..MAX_COLLIDERS + 1)
            .map(|i| Shape::from(Circle::new(Vector2::new(i as f32, 0.0), 0.5)));
        let result = RigidBody::new(Vector2::zeros(), shapes, BodyOptions::new());
        assert_eq!(
            result.err(),
            Some(PhysicsError::TooManyColliders {
                count: MAX_COLLIDERS + 1,
                max: MAX_COLLIDERS
            })
        );
    }

    #[test]
    fn test_material_overrides_are_per_body() {
        let shared = Material::new(0.5, 0.1, 0.2, 3.0);
        let a = RigidBody::circle(
            Vector2::zeros(),
            1.0,
            BodyOptions::new().with_material(shared).with_friction(0.9),
        )
        .unwrap();
        let b = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new().with_material(shared))
            .unwrap();
        assert!(approx_eq(a.material().friction, 0.9));
        assert!(approx_eq(b.material().friction, 0.1));
        assert!(approx_eq(shared.friction, 0.1));
        assert!(approx_eq(a.material().density, 3.0));
    }

    #[test]
    fn test_default_material() {
        let body = unit_box();
        assert_eq!(*body.material(), Material::new(0.2, 0.3, 0.4, 1.0));
    }

    #[test]
    fn test_restitution_clamped() {
        let body = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new().with_restitution(3.0))
            .unwrap();
        assert!(approx_eq(body.material().bounciness, 1.0));
    }

    #[test]
    fn test_initial_velocity_shadow_state() {
        let body = RigidBody::circle(
            Vector2::new(1.0, 1.0),
            1.0,
            BodyOptions::new().with_velocity(Vector2::new(2.0, 0.0)),
        )
        .unwrap();
        assert!(approx_vec_eq(&body.velocity(), &Vector2::new(2.0, 0.0)));
        assert!(approx_vec_eq(&body.previous_position(), &Vector2::new(-1.0, 1.0)));
    }

    // -- Frames --

    #[test]
    fn test_local_world_round_trip() {
        let mut body = unit_box();
        body.set_position(Vector2::new(3.0, -7.5), false);
        body.set_rotation(UnitComplex::new(2.3), false);

        let samples = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 2.0),
            Vector2::new(-4.5, 0.25),
        ];
        for p in samples.iter() {
            let there_and_back = body.world_to_local(body.local_to_world(*p));
            assert!(approx_vec_eq(&there_and_back, p));
            let back_and_there = body.local_to_world(body.world_to_local(*p));
            assert!(approx_vec_eq(&back_and_there, p));
            assert!(approx_vec_eq(&body.aa_to_local(body.local_to_aa(*p)), p));
        }
    }

    #[test]
    fn test_local_to_world_quarter_turn() {
        let mut body = unit_box();
        body.set_position(Vector2::new(1.0, 0.0), false);
        body.set_rotation(UnitComplex::new(FRAC_PI_2), false);
        let world = body.local_to_world(Vector2::new(1.0, 0.0));
        assert!(approx_vec_eq(&world, &Vector2::new(1.0, 1.0)));
        let aa = body.local_to_aa(Vector2::new(1.0, 0.0));
        assert!(approx_vec_eq(&aa, &Vector2::new(0.0, 1.0)));
    }

    #[test]
    fn test_velocity_at_point() {
        let mut body = unit_box();
        body.set_velocity(Vector2::new(1.0, 0.0));
        body.set_angular_velocity(2.0);
        // ω × r for r = (0, 1): (-2, 0)
        let v = body.velocity_at_world_point(Vector2::new(0.0, 1.0));
        assert!(approx_vec_eq(&v, &Vector2::new(-1.0, 0.0)));

        body.set_rotation(UnitComplex::new(FRAC_PI_2), false);
        // Local (1, 0) now sits at world (0, 1)
        let v_local = body.velocity_at_local_point(Vector2::new(1.0, 0.0));
        assert!(approx_vec_eq(&v_local, &Vector2::new(-1.0, 0.0)));
    }

    // -- Forces --

    #[test]
    fn test_apply_force_accumulates_velocity_change() {
        let mut body = RigidBody::rectangle(Vector2::zeros(), 1.0, 2.0, BodyOptions::new()).unwrap();
        body.apply_force(Vector2::new(4.0, 0.0), Vector2::zeros());
        body.apply_force(Vector2::new(0.0, 2.0), Vector2::zeros());
        assert!(approx_vec_eq(&body.acceleration(), &Vector2::new(2.0, 1.0)));
        assert!(approx_eq(body.angular_acceleration(), 0.0));
    }

    #[test]
    fn test_apply_force_off_center_adds_torque() {
        let mut body = unit_box();
        body.apply_force(Vector2::new(0.0, 1.0), Vector2::new(1.0, 0.0));
        // r × F = 1, divided by I = 1/6
        assert!(approx_eq(body.angular_acceleration(), 6.0));

        let mut other = unit_box();
        other.set_position(Vector2::new(5.0, 5.0), false);
        other.apply_force_at_point(Vector2::new(0.0, 1.0), Vector2::new(6.0, 5.0));
        assert!(approx_eq(other.angular_acceleration(), 6.0));
    }

    #[test]
    fn test_force_and_impulse_on_static_body_ignored() {
        let mut body = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new().with_static(true))
            .unwrap();
        body.apply_force(Vector2::new(100.0, 0.0), Vector2::new(0.0, 1.0));
        body.apply_impulse(Vector2::new(100.0, 0.0), Vector2::new(0.0, 1.0));
        assert!(approx_vec_eq(&body.acceleration(), &Vector2::zeros()));
        assert!(approx_vec_eq(&body.velocity(), &Vector2::zeros()));
        assert!(approx_eq(body.angular_velocity(), 0.0));
    }

    #[test]
    fn test_apply_impulse() {
        let mut body = RigidBody::rectangle(Vector2::zeros(), 1.0, 2.0, BodyOptions::new()).unwrap();
        body.apply_impulse(Vector2::new(10.0, 0.0), Vector2::zeros());
        // Δv = J / m = 10 / 2
        assert!(approx_vec_eq(&body.velocity(), &Vector2::new(5.0, 0.0)));
    }

    // -- Integration --

    #[test]
    fn test_integrate_semi_implicit() {
        let mut body = unit_box();
        body.integrate(1.0, Vector2::new(0.0, -10.0));
        // Velocity first, then position with the new velocity
        assert!(approx_eq(body.velocity().y, -10.0));
        assert!(approx_eq(body.position().y, -10.0));
        assert!(approx_vec_eq(&body.previous_position(), &Vector2::zeros()));
        assert!(approx_vec_eq(&body.acceleration(), &Vector2::zeros()));
    }

    #[test]
    fn test_integrate_rotation_stays_normalized() {
        let mut body = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new().with_angular_velocity(3.0))
            .unwrap();
        for _ in 0..10_000 {
            body.integrate(0.01, Vector2::zeros());
        }
        let c = body.rotation().into_inner();
        assert!(approx_eq(c.re * c.re + c.im * c.im, 1.0));
        assert!(approx_eq(body.angular_velocity(), 3.0));
    }

    #[test]
    fn test_static_body_not_integrated() {
        let mut body = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new().with_static(true))
            .unwrap();
        body.integrate(1.0, Vector2::new(0.0, -10.0));
        assert!(approx_vec_eq(&body.position(), &Vector2::zeros()));
        assert!(approx_vec_eq(&body.velocity(), &Vector2::zeros()));
    }

    #[test]
    fn test_apply_accelerations_keeps_position() {
        let mut body = unit_box();
        body.apply_force(Vector2::new(1.0, 0.0), Vector2::zeros());
        body.apply_accelerations();
        assert!(approx_vec_eq(&body.velocity(), &Vector2::new(1.0, 0.0)));
        assert!(approx_vec_eq(&body.position(), &Vector2::zeros()));
        assert!(approx_vec_eq(&body.acceleration(), &Vector2::zeros()));
    }

    // -- Direct mutation --

    #[test]
    fn test_translate_teleport_vs_impart() {
        let mut body = unit_box();
        body.integrate(0.5, Vector2::zeros());

        body.translate(Vector2::new(1.0, 0.0), false);
        assert!(approx_vec_eq(&body.velocity(), &Vector2::zeros()));
        assert!(approx_vec_eq(&body.previous_position(), &Vector2::new(1.0, 0.0)));

        body.translate(Vector2::new(1.0, 0.0), true);
        // Displacement over the last 0.5 s sub-step
        assert!(approx_vec_eq(&body.velocity(), &Vector2::new(2.0, 0.0)));
        assert!(approx_vec_eq(&body.position(), &Vector2::new(2.0, 0.0)));
    }

    #[test]
    fn test_rotate_teleport_vs_impart() {
        let mut body = unit_box();
        body.rotate(UnitComplex::new(0.5), false);
        assert!(approx_eq(body.angle(), 0.5));
        assert!(approx_eq(body.angular_velocity(), 0.0));

        body.rotate(UnitComplex::new(0.25), true);
        assert!(approx_eq(body.angle(), 0.75));
        assert!(approx_eq(body.angular_velocity(), 0.25));
    }

    #[test]
    fn test_set_velocity_updates_shadow() {
        let mut body = unit_box();
        body.set_position(Vector2::new(2.0, 2.0), false);
        body.set_velocity(Vector2::new(0.0, 3.0));
        assert!(approx_vec_eq(&body.previous_position(), &Vector2::new(2.0, -1.0)));
    }

    #[test]
    fn test_kinetic_energy() {
        let mut body = RigidBody::rectangle(Vector2::zeros(), 1.0, 2.0, BodyOptions::new()).unwrap();
        body.set_velocity(Vector2::new(3.0, 0.0));
        // KE = 0.5 * 2 * 9
        assert!(approx_eq(body.kinetic_energy(), 9.0));
    }

    #[test]
    fn test_world_colliders_follow_pose() {
        let mut body = RigidBody::circle(Vector2::new(1.0, 1.0), 0.5, BodyOptions::new()).unwrap();
        body.translate(Vector2::new(2.0, 0.0), false);
        match body.world_colliders().next() {
            Some(Shape::Circle(circle)) => {
                assert!(approx_vec_eq(&circle.center, &Vector2::new(3.0, 1.0)))
            }
            other => panic!("unexpected collider {:?}", other),
        };
    }
}
