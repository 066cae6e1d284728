use nalgebra::Vector2;

use super::active_body;
use crate::body::{BodyId, RigidBody};
use crate::shape::DEGENERATE_EPSILON;

/// Settings for [`Spring::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringOptions {
    /// Anchor in body A's local space.
    pub anchor_a: Vector2<f32>,
    /// Anchor in body B's local space, or a world point when there is no body B.
    pub anchor_b: Vector2<f32>,
    /// Hooke constant.
    pub stiffness: f32,
    /// Damping applied to the closing velocity along the spring axis.
    pub damping: f32,
    pub rest_length: f32,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            anchor_a: Vector2::zeros(),
            anchor_b: Vector2::zeros(),
            stiffness: 1.0,
            damping: 0.0,
            rest_length: 0.0,
        }
    }
}

/// Damped spring between two anchors.
///
/// The force applied each velocity solve is
/// `dir · (k · (len − rest) + c · (v_rel · dir)) · dt`, pulling body A toward
/// the other end and pushing body B back with the opposite force. Springs
/// act through forces only and have no position phase.
#[derive(Debug, Clone)]
pub struct Spring {
    body_a: BodyId,
    body_b: Option<BodyId>,
    pub anchor_a: Vector2<f32>,
    pub anchor_b: Vector2<f32>,
    pub stiffness: f32,
    pub damping: f32,
    pub rest_length: f32,
}

/// Where a spring end sits this sub-step.
struct End {
    point: Vector2<f32>,
    velocity: Vector2<f32>,
    /// Lever arm in axis-aligned local space.
    offset: Vector2<f32>,
}

impl End {
    fn on_body(body: &RigidBody, anchor: Vector2<f32>) -> Self {
        Self {
            point: body.local_to_world(anchor),
            velocity: body.velocity_at_local_point(anchor),
            offset: body.local_to_aa(anchor),
        }
    }

    fn fixed(point: Vector2<f32>) -> Self {
        Self {
            point,
            velocity: Vector2::zeros(),
            offset: Vector2::zeros(),
        }
    }
}

impl Spring {
    /// Connect `body_a` to `body_b`, or to the fixed world point
    /// `options.anchor_b` when `body_b` is `None`.
    pub fn new(body_a: BodyId, body_b: Option<BodyId>, options: SpringOptions) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a: options.anchor_a,
            anchor_b: options.anchor_b,
            stiffness: options.stiffness,
            damping: options.damping,
            rest_length: options.rest_length,
        }
    }

    pub fn body_a(&self) -> BodyId {
        self.body_a
    }

    pub fn body_b(&self) -> Option<BodyId> {
        self.body_b
    }

    /// Both spring ends in world space, for drawing.
    pub fn world_anchors(&self, bodies: &[RigidBody]) -> Option<(Vector2<f32>, Vector2<f32>)> {
        let (a, b) = self.ends(bodies)?;
        Some((a.point, b.point))
    }

    fn ends(&self, bodies: &[RigidBody]) -> Option<(End, End)> {
        let a = End::on_body(active_body(bodies, self.body_a)?, self.anchor_a);
        let b = match self.body_b {
            Some(id) => End::on_body(active_body(bodies, id)?, self.anchor_b),
            None => End::fixed(self.anchor_b),
        };
        Some((a, b))
    }

    /// Force the spring currently exerts on body A (already scaled by `dt`).
    fn force(&self, a: &End, b: &End, dt: f32) -> Vector2<f32> {
        let displacement = b.point - a.point;
        let length = displacement.norm();
        let direction = if length > DEGENERATE_EPSILON {
            displacement / length
        } else {
            // Anchors coincide; only the damping term can be non-zero here
            Vector2::zeros()
        };

        let closing_speed = (b.velocity - a.velocity).dot(&direction);
        direction * (self.stiffness * (length - self.rest_length) + self.damping * closing_speed) * dt
    }

    pub fn solve_velocity(&mut self, bodies: &mut [RigidBody], dt: f32) {
        let Some((a, b)) = self.ends(bodies) else {
            return;
        };
        let force = self.force(&a, &b, dt);

        bodies[self.body_a.0].apply_force(force, a.offset);
        if let Some(id) = self.body_b {
            bodies[id.0].apply_force(-force, b.offset);
        }
    }

    pub fn solve_position(&mut self, _bodies: &mut [RigidBody], _dt: f32) {}
}

/// A spring from a grabbed body to a pointer position.
///
/// While disabled it does nothing. Enabling scales stiffness and damping by
/// the grabbed body's mass, so light and heavy bodies follow the pointer
/// the same way.
#[derive(Debug, Clone)]
pub struct MouseSpring {
    spring: Option<Spring>,
    /// Stiffness per unit of grabbed mass.
    pub stiffness_per_mass: f32,
    /// Damping per unit of grabbed mass.
    pub damping_per_mass: f32,
}

impl Default for MouseSpring {
    fn default() -> Self {
        Self::new()
    }
}

impl MouseSpring {
    pub fn new() -> Self {
        Self {
            spring: None,
            stiffness_per_mass: 100.0,
            damping_per_mass: 8.0,
        }
    }

    /// Grab `body` at `anchor` (body-local) and pull it toward `target` (world).
    pub fn enable(&mut self, body: BodyId, mass: f32, anchor: Vector2<f32>, target: Vector2<f32>) {
        self.spring = Some(Spring::new(
            body,
            None,
            SpringOptions {
                anchor_a: anchor,
                anchor_b: target,
                stiffness: self.stiffness_per_mass * mass,
                damping: self.damping_per_mass * mass,
                rest_length: 0.0,
            },
        ));
    }

    /// Move the pointer end. Ignored while disabled.
    pub fn update(&mut self, target: Vector2<f32>) {
        if let Some(spring) = self.spring.as_mut() {
            spring.anchor_b = target;
        }
    }

    pub fn disable(&mut self) {
        self.spring = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.spring.is_some()
    }

    pub fn spring(&self) -> Option<&Spring> {
        self.spring.as_ref()
    }

    pub fn solve_velocity(&mut self, bodies: &mut [RigidBody], dt: f32) {
        if let Some(spring) = self.spring.as_mut() {
            spring.solve_velocity(bodies, dt);
        }
    }

    pub fn solve_position(&mut self, bodies: &mut [RigidBody], dt: f32) {
        if let Some(spring) = self.spring.as_mut() {
            spring.solve_position(bodies, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::body::BodyOptions;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn approx_vec_eq(a: &Vector2<f32>, b: &Vector2<f32>) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
    }

    /// Two 1 kg unit boxes.
    fn two_boxes(a: Vector2<f32>, b: Vector2<f32>) -> [RigidBody; 2] {
        [
            RigidBody::rectangle(a, 1.0, 1.0, BodyOptions::new()).unwrap(),
            RigidBody::rectangle(b, 1.0, 1.0, BodyOptions::new()).unwrap(),
        ]
    }

    #[test]
    fn test_default_options() {
        let options = SpringOptions::default();
        assert_eq!(options.stiffness, 1.0);
        assert_eq!(options.damping, 0.0);
        assert_eq!(options.rest_length, 0.0);
    }

    #[test]
    fn test_stretched_spring_pulls_together() {
        let mut bodies = two_boxes(Vector2::zeros(), Vector2::new(3.0, 0.0));
        let mut spring = Spring::new(
            BodyId(0),
            Some(BodyId(1)),
            SpringOptions {
                stiffness: 2.0,
                rest_length: 1.0,
                ..SpringOptions::default()
            },
        );
        spring.solve_velocity(&mut bodies, 0.5);

        // k · (3 − 1) · dt = 2
        assert!(approx_vec_eq(&bodies[0].acceleration(), &Vector2::new(2.0, 0.0)));
        assert!(approx_vec_eq(&bodies[1].acceleration(), &Vector2::new(-2.0, 0.0)));
    }

    #[test]
    fn test_compressed_spring_pushes_apart() {
        let mut bodies = two_boxes(Vector2::zeros(), Vector2::new(1.0, 0.0));
        let mut spring = Spring::new(
            BodyId(0),
            Some(BodyId(1)),
            SpringOptions {
                rest_length: 2.0,
                ..SpringOptions::default()
            },
        );
        spring.solve_velocity(&mut bodies, 1.0);
        assert!(bodies[0].acceleration().x < 0.0);
        assert!(bodies[1].acceleration().x > 0.0);
    }

    #[test]
    fn test_damping_opposes_separation() {
        let mut bodies = two_boxes(Vector2::zeros(), Vector2::new(1.0, 0.0));
        bodies[1].set_velocity(Vector2::new(2.0, 0.0));
        let mut spring = Spring::new(
            BodyId(0),
            Some(BodyId(1)),
            SpringOptions {
                stiffness: 0.0,
                damping: 0.5,
                rest_length: 1.0,
                ..SpringOptions::default()
            },
        );
        spring.solve_velocity(&mut bodies, 1.0);
        assert!(approx_vec_eq(&bodies[0].acceleration(), &Vector2::new(1.0, 0.0)));
        assert!(approx_vec_eq(&bodies[1].acceleration(), &Vector2::new(-1.0, 0.0)));
    }

    #[test]
    fn test_damping_ignores_sideways_motion() {
        let mut bodies = two_boxes(Vector2::zeros(), Vector2::new(1.0, 0.0));
        bodies[1].set_velocity(Vector2::new(0.0, 5.0));
        let mut spring = Spring::new(
            BodyId(0),
            Some(BodyId(1)),
            SpringOptions {
                stiffness: 0.0,
                damping: 1.0,
                rest_length: 1.0,
                ..SpringOptions::default()
            },
        );
        spring.solve_velocity(&mut bodies, 1.0);
        assert!(approx_vec_eq(&bodies[0].acceleration(), &Vector2::zeros()));
    }

    #[test]
    fn test_spring_to_world_point() {
        let mut bodies = [RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new()).unwrap()];
        let mut spring = Spring::new(
            BodyId(0),
            None,
            SpringOptions {
                anchor_b: Vector2::new(0.0, 4.0),
                ..SpringOptions::default()
            },
        );
        spring.solve_velocity(&mut bodies, 1.0);
        let expected = 4.0 * bodies[0].inverse_mass();
        assert!(approx_vec_eq(&bodies[0].acceleration(), &Vector2::new(0.0, expected)));
    }

    #[test]
    fn test_off_center_anchor_adds_torque() {
        let mut bodies = two_boxes(Vector2::zeros(), Vector2::new(0.0, 3.0));
        let mut spring = Spring::new(
            BodyId(0),
            Some(BodyId(1)),
            SpringOptions {
                anchor_a: Vector2::new(0.5, 0.0),
                anchor_b: Vector2::new(0.5, 0.0),
                ..SpringOptions::default()
            },
        );
        spring.solve_velocity(&mut bodies, 1.0);
        // Pulled up at the right edge: counter-clockwise on A, clockwise on B
        assert!(bodies[0].angular_acceleration() > 0.0);
        assert!(bodies[1].angular_acceleration() < 0.0);
    }

    #[test]
    fn test_coincident_anchors_stay_finite() {
        let mut bodies = two_boxes(Vector2::zeros(), Vector2::zeros());
        let mut spring = Spring::new(BodyId(0), Some(BodyId(1)), SpringOptions::default());
        spring.solve_velocity(&mut bodies, 1.0);
        assert!(bodies[0].acceleration().x.is_finite());
        assert!(bodies[0].acceleration().y.is_finite());
    }

    #[test]
    fn test_missing_body_skipped() {
        let mut bodies = two_boxes(Vector2::zeros(), Vector2::new(2.0, 0.0));
        let mut spring = Spring::new(BodyId(0), Some(BodyId(7)), SpringOptions::default());
        spring.solve_velocity(&mut bodies, 1.0);
        assert!(approx_vec_eq(&bodies[0].acceleration(), &Vector2::zeros()));
        assert!(spring.world_anchors(&bodies).is_none());
    }

    #[test]
    fn test_world_anchors() {
        let bodies = two_boxes(Vector2::new(1.0, 0.0), Vector2::new(4.0, 0.0));
        let spring = Spring::new(
            BodyId(0),
            Some(BodyId(1)),
            SpringOptions {
                anchor_a: Vector2::new(0.5, 0.0),
                ..SpringOptions::default()
            },
        );
        let (a, b) = spring.world_anchors(&bodies).unwrap();
        assert!(approx_vec_eq(&a, &Vector2::new(1.5, 0.0)));
        assert!(approx_vec_eq(&b, &Vector2::new(4.0, 0.0)));
    }

    // -- Mouse spring --

    #[test]
    fn test_mouse_spring_disabled_is_noop() {
        let mut bodies = [RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new()).unwrap()];
        let mut mouse = MouseSpring::new();
        mouse.update(Vector2::new(5.0, 5.0));
        mouse.solve_velocity(&mut bodies, 1.0);
        assert!(!mouse.is_enabled());
        assert!(approx_vec_eq(&bodies[0].acceleration(), &Vector2::zeros()));
    }

    #[test]
    fn test_mouse_spring_mass_invariant() {
        let light = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new()).unwrap();
        let heavy = RigidBody::circle(Vector2::zeros(), 1.0, BodyOptions::new().with_density(10.0)).unwrap();
        let mut bodies = [light, heavy];

        let mut grab_light = MouseSpring::new();
        grab_light.enable(BodyId(0), bodies[0].mass(), Vector2::zeros(), Vector2::new(1.0, 0.0));
        let mut grab_heavy = MouseSpring::new();
        grab_heavy.enable(BodyId(1), bodies[1].mass(), Vector2::zeros(), Vector2::new(1.0, 0.0));

        grab_light.solve_velocity(&mut bodies, 0.01);
        grab_heavy.solve_velocity(&mut bodies, 0.01);
        assert!(approx_vec_eq(&bodies[0].acceleration(), &bodies[1].acceleration()));
        assert!(approx_eq(bodies[0].acceleration().x, 1.0));
    }

    #[test]
    fn test_mouse_spring_update_and_disable() {
        let mut mouse = MouseSpring::new();
        mouse.enable(BodyId(0), 2.0, Vector2::zeros(), Vector2::zeros());
        assert!(mouse.is_enabled());
        let spring = mouse.spring().unwrap();
        assert!(approx_eq(spring.stiffness, 200.0));
        assert!(approx_eq(spring.damping, 16.0));
        assert_eq!(spring.body_b(), None);

        mouse.update(Vector2::new(3.0, 4.0));
        assert!(approx_vec_eq(&mouse.spring().unwrap().anchor_b, &Vector2::new(3.0, 4.0)));

        mouse.disable();
        assert!(!mouse.is_enabled());
        assert!(mouse.spring().is_none());
    }
}
