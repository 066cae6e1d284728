use core::f32::consts::PI;

use nalgebra::{UnitComplex, Vector2};

// ComplexField provides sqrt()/abs()/signum() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

use super::{active_body, MotorDrivable};
use crate::body::{BodyId, RigidBody};
use crate::error::{require_positive, PhysicsError};
use crate::shape::disk_area;

/// Settings for [`Wheel::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelOptions {
    /// Rolling direction relative to the carrier, in radians (0 = local +x).
    pub angle: f32,
    pub radius: f32,
    /// Wheel material density, used for the spin inertia.
    pub density: f32,
    /// Kinetic (sliding) friction coefficient against the ground.
    pub friction: f32,
    /// Static friction coefficient against the ground.
    pub static_friction: f32,
    /// Number of identical wheels sharing the carrier's load.
    pub wheel_count: u32,
    /// Acceleration pressing the carrier onto the ground. Independent of the
    /// world gravity, so top-down vehicles can run with zero gravity.
    pub normal_acceleration: f32,
}

impl Default for WheelOptions {
    fn default() -> Self {
        Self {
            angle: 0.0,
            radius: 1.0,
            density: 100.0,
            friction: 1.0,
            static_friction: 1.2,
            wheel_count: 1,
            normal_acceleration: 9.8,
        }
    }
}

/// A wheel rolling on the ground plane, mounted on a carrier body.
///
/// Each velocity solve resolves the contact patch velocity into an axial
/// (rolling) part and a lateral (sideways) part:
/// - Lateral slip is cancelled outright while the needed impulse stays under
///   the static friction limit, otherwise kinetic friction slides it down.
/// - Axially the wheel spin and the carrier's share of translation exchange
///   kinetic energy until the wheel rolls without slipping. The same
///   stick/slide limit applies and sliding friction reacts on the spin.
///
/// A wheel on a static or missing carrier spins freely.
#[derive(Debug, Clone)]
pub struct Wheel {
    body: BodyId,
    /// Mount point in the carrier's local space.
    mount: Vector2<f32>,
    /// Rolling direction relative to the carrier.
    orientation: UnitComplex<f32>,
    radius: f32,
    inertia: f32,
    pub friction: f32,
    pub static_friction: f32,
    wheel_count: u32,
    pub normal_acceleration: f32,

    spin: f32,
    applied_torque: f32,
    /// Ground impulse applied to the carrier by the last solve.
    friction_force: Vector2<f32>,
}

impl Wheel {
    /// Fails with [`PhysicsError::InvalidParameter`] unless `radius` and
    /// `density` are positive, since the spin inertia must be non-zero.
    pub fn new(body: BodyId, mount: Vector2<f32>, options: WheelOptions) -> Result<Self, PhysicsError> {
        let radius = require_positive("wheel radius", options.radius)?;
        let density = require_positive("wheel density", options.density)?;
        Ok(Self {
            body,
            mount,
            orientation: UnitComplex::new(options.angle),
            radius,
            inertia: disk_area(radius) * radius * radius * density,
            friction: options.friction,
            static_friction: options.static_friction,
            wheel_count: options.wheel_count.max(1),
            normal_acceleration: options.normal_acceleration,
            spin: 0.0,
            applied_torque: 0.0,
            friction_force: Vector2::zeros(),
        })
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn mount(&self) -> Vector2<f32> {
        self.mount
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Spin inertia of the wheel about its axle.
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Wheel spin in radians per second; positive rolls along the wheel axis.
    pub fn spin(&self) -> f32 {
        self.spin
    }

    pub fn set_spin(&mut self, spin: f32) {
        self.spin = spin;
    }

    pub fn applied_torque(&self) -> f32 {
        self.applied_torque
    }

    /// Drive torque applied on every solve until changed.
    pub fn set_torque(&mut self, torque: f32) {
        self.applied_torque = torque;
    }

    /// Ground impulse on the carrier from the most recent velocity solve, in
    /// world orientation.
    pub fn friction_force(&self) -> Vector2<f32> {
        self.friction_force
    }

    /// Rolling direction in world orientation.
    pub fn axis(&self, carrier: &RigidBody) -> Vector2<f32> {
        carrier.rotation() * self.orientation * Vector2::x()
    }

    pub fn solve_velocity(&mut self, bodies: &mut [RigidBody], dt: f32) {
        self.spin += self.applied_torque / self.inertia * dt;
        self.friction_force = Vector2::zeros();

        let Some(carrier) = active_body(bodies, self.body) else {
            return;
        };
        if carrier.inverse_mass() <= 0.0 {
            return;
        }

        let axis = self.axis(carrier);
        let lateral_axis = Vector2::new(-axis.y, axis.x);
        let offset = carrier.local_to_aa(self.mount);
        let point_velocity = carrier.velocity_at_offset(offset);
        let wheels = self.wheel_count as f32;

        let mass_factor = |direction: &Vector2<f32>| {
            let arm = offset.perp(direction);
            carrier.inverse_mass() + carrier.inverse_inertia() * arm * arm
        };
        let lateral_factor = mass_factor(&lateral_axis);
        let axial_factor = mass_factor(&axis);

        // Per-wheel share of the carrier's weight
        let normal_load = self.normal_acceleration / carrier.inverse_mass() / wheels;
        let static_limit = self.static_friction * normal_load * dt;
        let sliding_impulse = self.friction * normal_load * dt;

        // -- Lateral --
        let lateral_speed = point_velocity.dot(&lateral_axis);
        let stopping = -lateral_speed / lateral_factor / wheels;
        let lateral_impulse = if stopping.abs() <= static_limit {
            stopping
        } else {
            -lateral_speed.signum() * sliding_impulse
        };

        // -- Axial --
        // Signed kinetic energy of spin plus the carrier's share, redistributed
        // into pure rolling: ½ v² (I / r² + m)
        let axial_speed = point_velocity.dot(&axis);
        let share = carrier.mass() / wheels;
        let energy = 0.5 * self.inertia * self.spin * self.spin.abs()
            + 0.5 * share * axial_speed * axial_speed.abs();
        let rolling_speed = energy.signum()
            * (2.0 * energy.abs() / (self.inertia / (self.radius * self.radius) + share)).sqrt();

        let stopping = (rolling_speed - axial_speed) / axial_factor / wheels;
        let axial_impulse = if stopping.abs() <= static_limit {
            self.spin = rolling_speed / self.radius;
            stopping
        } else {
            let sliding = (rolling_speed - axial_speed).signum() * sliding_impulse;
            self.spin -= sliding * self.radius / self.inertia;
            sliding
        };

        self.friction_force = lateral_axis * lateral_impulse + axis * axial_impulse;
        bodies[self.body.0].apply_force(self.friction_force, offset);
    }

    pub fn solve_position(&mut self, _bodies: &mut [RigidBody], _dt: f32) {}
}

impl MotorDrivable for Wheel {
    fn apply_motor_torque(&mut self, torque: f32) {
        self.set_torque(torque);
    }

    fn angular_velocity(&self) -> f32 {
        self.spin
    }

    fn solve_velocity(&mut self, bodies: &mut [RigidBody], dt: f32) {
        Wheel::solve_velocity(self, bodies, dt);
    }

    fn solve_position(&mut self, bodies: &mut [RigidBody], dt: f32) {
        Wheel::solve_position(self, bodies, dt);
    }
}

/// Nameplate ratings for [`DcMotor::new`]. Defaults describe a Kraken X60.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcMotorOptions {
    /// Volts.
    pub nominal_voltage: f32,
    /// N·m at the motor shaft.
    pub stall_torque: f32,
    /// Amps.
    pub stall_current: f32,
    /// Amps drawn with no load.
    pub free_current: f32,
    /// Radians per second at the motor shaft with no load.
    pub free_speed: f32,
    /// Output turns per motor turn, inverted: torque multiplies, speed divides.
    pub gear_ratio: f32,
}

impl Default for DcMotorOptions {
    fn default() -> Self {
        Self {
            nominal_voltage: 12.0,
            stall_torque: 7.09,
            stall_current: 366.0,
            free_current: 2.0,
            free_speed: 6000.0 / 60.0 * 2.0 * PI,
            gear_ratio: 1.0,
        }
    }
}

/// Brushed DC motor model driving a [`MotorDrivable`] element.
///
/// Electrical constants are derived once from the ratings:
/// - `R = V_nominal / I_stall`
/// - `Kt = τ_stall / I_stall`
/// - `Kv = ω_free / (V_nominal − R · I_free)`
///
/// Each velocity solve feeds `τ = (V_in − ω / Kv) / R · Kt` to the output and
/// then lets the output solve.
#[derive(Debug, Clone)]
pub struct DcMotor<D: MotorDrivable = Wheel> {
    output: D,
    input_voltage: f32,
    resistance: f32,
    torque_constant: f32,
    speed_constant: f32,
    stall_torque: f32,
    free_speed: f32,
}

impl<D: MotorDrivable> DcMotor<D> {
    /// Fails with [`PhysicsError::InvalidParameter`] when a rating would make
    /// a derived constant zero, infinite or negative: non-positive voltage,
    /// stall current, free speed or gear ratio, or a free current at or above
    /// the stall current.
    pub fn new(output: D, options: DcMotorOptions) -> Result<Self, PhysicsError> {
        let nominal_voltage = require_positive("nominal voltage", options.nominal_voltage)?;
        let stall_current = require_positive("stall current", options.stall_current)?;
        let gear_ratio = require_positive("gear ratio", options.gear_ratio)?;
        let free_speed = require_positive("free speed", options.free_speed)? / gear_ratio;

        let stall_torque = options.stall_torque * gear_ratio;
        let resistance = nominal_voltage / stall_current;
        let torque_constant = stall_torque / stall_current;
        // Voltage left to turn the shaft at free speed
        let back_emf = require_positive("free-running back-EMF", nominal_voltage - resistance * options.free_current)?;
        let speed_constant = free_speed / back_emf;

        Ok(Self {
            output,
            input_voltage: 0.0,
            resistance,
            torque_constant,
            speed_constant,
            stall_torque,
            free_speed,
        })
    }

    pub fn set_input_voltage(&mut self, volts: f32) {
        self.input_voltage = volts;
    }

    pub fn input_voltage(&self) -> f32 {
        self.input_voltage
    }

    /// Winding resistance in ohms.
    pub fn resistance(&self) -> f32 {
        self.resistance
    }

    /// Torque constant `Kt` in N·m per amp, after gearing.
    pub fn torque_constant(&self) -> f32 {
        self.torque_constant
    }

    /// Speed constant `Kv` in rad/s per volt, after gearing.
    pub fn speed_constant(&self) -> f32 {
        self.speed_constant
    }

    /// Stall torque after gearing.
    pub fn stall_torque(&self) -> f32 {
        self.stall_torque
    }

    /// Free speed after gearing.
    pub fn free_speed(&self) -> f32 {
        self.free_speed
    }

    /// Output torque at the current input voltage and the given output speed.
    pub fn torque_at(&self, angular_velocity: f32) -> f32 {
        let effective_voltage = self.input_voltage - angular_velocity / self.speed_constant;
        effective_voltage / self.resistance * self.torque_constant
    }

    pub fn output(&self) -> &D {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut D {
        &mut self.output
    }

    pub fn solve_velocity(&mut self, bodies: &mut [RigidBody], dt: f32) {
        let torque = self.torque_at(self.output.angular_velocity());
        self.output.apply_motor_torque(torque);
        self.output.solve_velocity(bodies, dt);
    }

    pub fn solve_position(&mut self, bodies: &mut [RigidBody], dt: f32) {
        self.output.solve_position(bodies, dt);
    }
}
