//! Constraints: force elements and drivetrains attached to bodies.
//!
//! Every constraint runs in two phases each sub-step. The velocity phase
//! runs inside the solver's velocity iterations (with a fraction of the
//! sub-step), the position phase runs once after contact correction. Both
//! phases receive the world's body slice and address bodies by [`BodyId`].

mod spring;
mod wheel;

pub use spring::{MouseSpring, Spring, SpringOptions};
pub use wheel::{DcMotor, DcMotorOptions, Wheel, WheelOptions};

use log::warn;

use crate::body::{BodyId, RigidBody};

/// Unique identifier for a constraint within a [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub(crate) usize);

impl ConstraintId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A constraint element that a [`DcMotor`] can drive.
pub trait MotorDrivable {
    /// Set the torque the motor delivers until the next call.
    fn apply_motor_torque(&mut self, torque: f32);

    /// Angular velocity seen by the motor shaft (radians per second).
    fn angular_velocity(&self) -> f32;

    fn solve_velocity(&mut self, bodies: &mut [RigidBody], dt: f32);

    fn solve_position(&mut self, bodies: &mut [RigidBody], dt: f32);
}

/// Constraint attached to one or two bodies.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Damped spring between two anchors, or between an anchor and a fixed world point.
    Spring(Spring),
    /// Pointer-driven spring that can be toggled on and off.
    Mouse(MouseSpring),
    /// Rolling-contact wheel mounted on a carrier body.
    Wheel(Wheel),
    /// DC motor driving a wheel.
    Motor(DcMotor),
}

impl Constraint {
    pub fn solve_velocity(&mut self, bodies: &mut [RigidBody], dt: f32) {
        match self {
            Constraint::Spring(spring) => spring.solve_velocity(bodies, dt),
            Constraint::Mouse(mouse) => mouse.solve_velocity(bodies, dt),
            Constraint::Wheel(wheel) => wheel.solve_velocity(bodies, dt),
            Constraint::Motor(motor) => motor.solve_velocity(bodies, dt),
        }
    }

    pub fn solve_position(&mut self, bodies: &mut [RigidBody], dt: f32) {
        match self {
            Constraint::Spring(spring) => spring.solve_position(bodies, dt),
            Constraint::Mouse(mouse) => mouse.solve_position(bodies, dt),
            Constraint::Wheel(wheel) => wheel.solve_position(bodies, dt),
            Constraint::Motor(motor) => motor.solve_position(bodies, dt),
        }
    }
}

impl From<Spring> for Constraint {
    fn from(spring: Spring) -> Self {
        Constraint::Spring(spring)
    }
}

impl From<MouseSpring> for Constraint {
    fn from(mouse: MouseSpring) -> Self {
        Constraint::Mouse(mouse)
    }
}

impl From<Wheel> for Constraint {
    fn from(wheel: Wheel) -> Self {
        Constraint::Wheel(wheel)
    }
}

impl From<DcMotor> for Constraint {
    fn from(motor: DcMotor) -> Self {
        Constraint::Motor(motor)
    }
}

/// Look up an active body for a constraint. Unknown ids are logged, inactive
/// bodies are skipped silently.
pub(crate) fn active_body(bodies: &[RigidBody], id: BodyId) -> Option<&RigidBody> {
    match bodies.get(id.0) {
        Some(body) if body.is_active() => Some(body),
        Some(_) => None,
        None => {
            warn!("constraint references missing body {}", id.0);
            None
        }
    }
}
