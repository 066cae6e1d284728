//! The simulation world and its sub-stepped solver.

use log::{trace, warn};
use nalgebra::Vector2;

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

use crate::body::{BodyId, RigidBody};
use crate::collision::{collide_bodies, Contact};
use crate::constraint::{Constraint, ConstraintId};
use crate::group::{Group, GroupIndex};
use crate::shape::{Shape, DEGENERATE_EPSILON};

/// Plain-function pre-solve hook: receives every body and the sub-step index.
pub type PreSolveHook = fn(&mut [RigidBody], usize);

/// The physics simulation world.
///
/// Owns a fixed-capacity set of rigid bodies, constraints and named groups,
/// and steps the simulation forward.
///
/// # Type Parameters
/// * `N` - Maximum number of bodies.
/// * `M` - Maximum number of constraints.
/// * `G` - Maximum number of named groups.
///
/// # Example
/// ```
/// use planar_physics::{BodyOptions, PhysicsWorld, RigidBody};
/// use nalgebra::Vector2;
///
/// let mut world = PhysicsWorld::<8>::new();
/// world.set_gravity(Vector2::new(0.0, -9.8));
///
/// let ground = RigidBody::rectangle(Vector2::zeros(), 20.0, 1.0, BodyOptions::new().with_static(true))
///     .unwrap();
/// let crate_box = RigidBody::rectangle(Vector2::new(0.0, 2.0), 1.0, 1.0, BodyOptions::new()).unwrap();
/// world.add_body(ground).unwrap();
/// let id = world.add_body(crate_box).unwrap();
///
/// world.step::<8>(1.0 / 60.0, 4);
/// assert!(world.body(id).unwrap().velocity().y < 0.0);
/// ```
pub struct PhysicsWorld<const N: usize, const M: usize = 0, const G: usize = 0> {
    bodies: heapless::Vec<RigidBody, N>,
    constraints: heapless::Vec<Constraint, M>,
    groups: GroupIndex<N, G>,
    gravity: Vector2<f32>,
    pre_solve: Option<PreSolveHook>,
    /// Contact and constraint velocity passes per sub-step.
    pub velocity_iterations: u32,
    /// Fraction of the penetration (beyond the slop) removed per sub-step.
    pub position_correction: f32,
    /// Penetration left uncorrected so resting contacts stay in touch.
    pub penetration_slop: f32,
}

impl<const N: usize, const M: usize, const G: usize> Default for PhysicsWorld<N, M, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const M: usize, const G: usize> PhysicsWorld<N, M, G> {
    /// Create a new physics world with no gravity.
    pub fn new() -> Self {
        Self {
            bodies: heapless::Vec::new(),
            constraints: heapless::Vec::new(),
            groups: GroupIndex::new(),
            gravity: Vector2::zeros(),
            pre_solve: None,
            velocity_iterations: 3,
            position_correction: 0.8,
            penetration_slop: 0.005,
        }
    }

    /// Set the gravity vector (e.g., `Vector2::new(0.0, -9.8)`).
    pub fn set_gravity(&mut self, gravity: Vector2<f32>) {
        self.gravity = gravity;
    }

    pub fn gravity(&self) -> Vector2<f32> {
        self.gravity
    }

    /// Register a function run after integration on every sub-step.
    /// [`step`](Self::step) uses it; [`step_with`](Self::step_with) overrides it.
    pub fn set_pre_solve(&mut self, hook: Option<PreSolveHook>) {
        self.pre_solve = hook;
    }

    // -- Bodies --

    /// Add a body to the world. Returns its [`BodyId`], or `None` if at capacity.
    pub fn add_body(&mut self, body: RigidBody) -> Option<BodyId> {
        let id = BodyId(self.bodies.len());
        self.bodies.push(body).ok()?;
        Some(id)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    /// Returns the total number of bodies in the world (including inactive).
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn active_body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_active()).count()
    }

    /// Deactivate a body and clear its motion.
    ///
    /// The slot is kept so existing [`BodyId`]s stay valid. Returns `false`
    /// if the id is unknown or the body was already inactive.
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        match self.bodies.get_mut(id.0) {
            Some(body) if body.is_active() => {
                body.deactivate();
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if the body exists.
    pub fn set_active(&mut self, id: BodyId, active: bool) -> bool {
        if let Some(body) = self.bodies.get_mut(id.0) {
            body.set_active(active);
            true
        } else {
            false
        }
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut RigidBody)> {
        self.bodies.iter_mut().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    // -- Constraints --

    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> Option<ConstraintId> {
        let id = ConstraintId(self.constraints.len());
        self.constraints.push(constraint.into()).ok()?;
        Some(id)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id.0)
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.constraints.get_mut(id.0)
    }

    /// Remove a constraint by ID (swap-removes; invalidates the last ID).
    pub fn remove_constraint(&mut self, id: ConstraintId) -> bool {
        if id.0 < self.constraints.len() {
            self.constraints.swap_remove(id.0);
            true
        } else {
            false
        }
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Grab `body` with the mouse spring `id` at `point` (world space), which
    /// is also the initial pointer position.
    ///
    /// Returns `false` if either id is unknown or `id` is not a mouse spring.
    pub fn grab(&mut self, id: ConstraintId, body: BodyId, point: Vector2<f32>) -> bool {
        let Some(target) = self.bodies.get(body.0) else {
            return false;
        };
        let anchor = target.world_to_local(point);
        let mass = target.mass();
        match self.constraints.get_mut(id.0) {
            Some(Constraint::Mouse(mouse)) => {
                mouse.enable(body, mass, anchor, point);
                true
            }
            _ => false,
        }
    }

    // -- Groups --

    /// Add `bodies` to the world and record them under `name`.
    ///
    /// Returns the new ids, or `None` if the world or the group table ran out
    /// of room. Bodies added before running out stay in the world.
    pub fn add_group(
        &mut self,
        name: &str,
        bodies: impl IntoIterator<Item = RigidBody>,
    ) -> Option<heapless::Vec<BodyId, N>> {
        let mut ids = heapless::Vec::new();
        for body in bodies {
            let id = self.add_body(body)?;
            ids.push(id).ok()?;
        }
        self.groups.extend(name, ids.iter().copied())?;
        Some(ids)
    }

    /// Record existing bodies under `name`, creating the group if needed.
    pub fn add_to_group(&mut self, name: &str, ids: impl IntoIterator<Item = BodyId>) -> Option<()> {
        let count = self.bodies.len();
        let mut known: heapless::Vec<BodyId, N> = heapless::Vec::new();
        for id in ids {
            if id.0 >= count {
                return None;
            }
            if !known.contains(&id) {
                known.push(id).ok()?;
            }
        }
        self.groups.extend(name, known)
    }

    /// Copy the current members of `child` into `parent`.
    pub fn nest_group(&mut self, parent: &str, child: &str) -> Option<()> {
        self.groups.nest(parent, child)
    }

    /// Members of the named group, in insertion order.
    pub fn group(&self, name: &str) -> Option<&[BodyId]> {
        self.groups.get(name).map(Group::members)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group<N>> {
        self.groups.iter()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Visit every member of the named group mutably. Returns `false` if there
    /// is no such group.
    pub fn for_each_in_group(&mut self, name: &str, mut f: impl FnMut(BodyId, &mut RigidBody)) -> bool {
        let Some(group) = self.groups.get(name) else {
            return false;
        };
        for &id in group.members() {
            if let Some(body) = self.bodies.get_mut(id.0) {
                f(id, body);
            }
        }
        true
    }

    // -- Collision detection --

    /// Collide every pair of active bodies.
    ///
    /// Pairs of two static bodies are skipped. Contacts beyond the capacity
    /// `C` are dropped with a warning.
    pub fn detect_collisions<const C: usize>(&self) -> heapless::Vec<Contact, C> {
        let mut contacts = heapless::Vec::new();
        let mut dropped = 0;
        let len = self.bodies.len();

        for i in 0..len {
            let body_a = &self.bodies[i];
            if !body_a.is_active() {
                continue;
            }
            for j in (i + 1)..len {
                let body_b = &self.bodies[j];
                if !body_b.is_active() || (body_a.is_static() && body_b.is_static()) {
                    continue;
                }
                dropped += collide_bodies(BodyId(i), body_a, BodyId(j), body_b, &mut contacts);
            }
        }

        if dropped > 0 {
            warn!("contact buffer full ({}), dropped {} contacts", C, dropped);
        }
        contacts
    }

    /// Contacts between `shape` (world space) and every active body.
    ///
    /// The shape is not added to the world and need not have a valid mass.
    /// In the returned contacts `body_a` is the world body, `body_b` is
    /// [`BodyId::PROBE`] and the normal points from the probe toward the body.
    pub fn test_hitbox<const C: usize>(&self, shape: Shape) -> heapless::Vec<Contact, C> {
        let probe = RigidBody::probe(shape);
        let mut contacts = heapless::Vec::new();
        let mut dropped = 0;
        for (i, body) in self.bodies.iter().enumerate() {
            if body.is_active() {
                dropped += collide_bodies(BodyId(i), body, BodyId::PROBE, &probe, &mut contacts);
            }
        }
        if dropped > 0 {
            warn!("hitbox buffer full ({}), dropped {} contacts", C, dropped);
        }
        contacts
    }

    // -- Contact solver --

    /// Apply normal and friction impulses for every contact point.
    ///
    /// Impulses for all points of a contact are computed from the velocities
    /// at the start of that contact and split evenly over its points. Normal
    /// impulses use the smaller restitution of the pair. Friction is Coulomb:
    /// sliding stops outright while the needed impulse stays inside the static
    /// cone, otherwise the kinetic coefficient applies. Both coefficients
    /// combine as `sqrt(a * b)`.
    pub fn resolve_contacts(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            let (Some(body_a), Some(body_b)) = (self.bodies.get(contact.body_a.0), self.bodies.get(contact.body_b.0))
            else {
                continue;
            };

            let inv_mass_a = body_a.inverse_mass();
            let inv_mass_b = body_b.inverse_mass();
            let inv_inertia_a = body_a.inverse_inertia();
            let inv_inertia_b = body_b.inverse_inertia();
            if inv_mass_a + inv_mass_b <= 0.0 {
                continue;
            }

            let (material_a, material_b) = (body_a.material(), body_b.material());
            let restitution = material_a.bounciness.min(material_b.bounciness);
            let static_friction = (material_a.static_friction * material_b.static_friction).sqrt();
            let kinetic_friction = (material_a.friction * material_b.friction).sqrt();

            let normal = contact.normal;
            let share = 1.0 / contact.points.len() as f32;
            let mut impulses: heapless::Vec<(Vector2<f32>, Vector2<f32>, Vector2<f32>), 2> = heapless::Vec::new();

            for point in contact.points.iter() {
                let ra = point - body_a.position();
                let rb = point - body_b.position();

                // Velocity of A relative to B at the contact point
                let relative = body_a.velocity_at_offset(ra) - body_b.velocity_at_offset(rb);
                let closing = relative.dot(&normal);
                if closing >= 0.0 {
                    continue;
                }

                let effective = |direction: &Vector2<f32>| {
                    let arm_a = ra.perp(direction);
                    let arm_b = rb.perp(direction);
                    inv_mass_a + inv_mass_b + arm_a * arm_a * inv_inertia_a + arm_b * arm_b * inv_inertia_b
                };

                let normal_mass = effective(&normal);
                if normal_mass <= 0.0 {
                    continue;
                }
                let jn = -(1.0 + restitution) * closing / normal_mass * share;
                let mut impulse = normal * jn;

                // --- Friction ---
                let tangential = relative - normal * closing;
                let slide_speed = tangential.norm();
                if slide_speed > DEGENERATE_EPSILON {
                    let tangent = tangential / slide_speed;
                    let tangent_mass = effective(&tangent);
                    if tangent_mass > 0.0 {
                        let stopping = slide_speed / tangent_mass * share;
                        let jt = if stopping <= static_friction * jn {
                            stopping
                        } else {
                            kinetic_friction * jn
                        };
                        impulse -= tangent * jt;
                    }
                }

                let _ = impulses.push((impulse, ra, rb));
            }

            let (a, b) = (contact.body_a.0, contact.body_b.0);
            for (impulse, ra, rb) in impulses {
                self.bodies[a].apply_impulse(impulse, ra);
                self.bodies[b].apply_impulse(-impulse, rb);
            }
        }
    }

    /// Push overlapping bodies apart along the contact normal, in proportion
    /// to their inverse masses. Velocities are untouched.
    pub fn correct_positions(&mut self, contacts: &[Contact]) {
        for contact in contacts {
            let (a, b) = (contact.body_a.0, contact.body_b.0);
            let (Some(body_a), Some(body_b)) = (self.bodies.get(a), self.bodies.get(b)) else {
                continue;
            };
            let inv_mass_a = body_a.inverse_mass();
            let inv_mass_b = body_b.inverse_mass();
            let inv_mass_sum = inv_mass_a + inv_mass_b;
            if inv_mass_sum <= 0.0 {
                continue;
            }

            let excess = (contact.depth - self.penetration_slop).max(0.0);
            let correction = contact.normal * (excess / inv_mass_sum * self.position_correction);
            self.bodies[a].nudge(correction * inv_mass_a);
            self.bodies[b].nudge(-correction * inv_mass_b);
        }
    }

    // -- Stepping --

    /// Advance the simulation by `dt`, split into `substeps` equal sub-steps,
    /// running the registered pre-solve hook on each.
    ///
    /// The `C` const generic sets the maximum number of contacts per sub-step.
    pub fn step<const C: usize>(&mut self, dt: f32, substeps: u32) {
        let hook = self.pre_solve;
        self.step_with::<C>(dt, substeps, |bodies, index| {
            if let Some(hook) = hook {
                hook(bodies, index);
            }
        });
    }

    /// Like [`step`](Self::step), with `hook` run after integration on each
    /// sub-step instead of the registered one.
    ///
    /// Each sub-step: integrate, run the hook, collide, then
    /// `velocity_iterations` rounds of contact impulses, constraint velocity
    /// solves (with `dt / velocity_iterations`) and residual accelerations,
    /// and finally one round of position correction and constraint position
    /// solves.
    pub fn step_with<const C: usize>(
        &mut self,
        dt: f32,
        substeps: u32,
        mut hook: impl FnMut(&mut [RigidBody], usize),
    ) {
        if substeps == 0 || dt <= 0.0 {
            return;
        }
        let sub_dt = dt / substeps as f32;
        let iterations = self.velocity_iterations.max(1);
        let iteration_dt = sub_dt / iterations as f32;

        for index in 0..substeps as usize {
            self.integrate(sub_dt);
            hook(self.bodies.as_mut_slice(), index);

            let contacts = self.detect_collisions::<C>();
            trace!("sub-step {}: {} contacts", index, contacts.len());

            for _ in 0..iterations {
                self.resolve_contacts(&contacts);
                for constraint in self.constraints.iter_mut() {
                    constraint.solve_velocity(&mut self.bodies, iteration_dt);
                }
                for body in self.bodies.iter_mut().filter(|b| b.is_active()) {
                    body.apply_accelerations();
                }
            }

            self.correct_positions(&contacts);
            for constraint in self.constraints.iter_mut() {
                constraint.solve_position(&mut self.bodies, sub_dt);
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.iter_mut().filter(|b| b.is_active()) {
            body.integrate(dt, gravity);
        }
    }
}
