#![no_std]
//! Fixed-capacity 2D rigid-body physics.
//!
//! Bodies carry circle and convex polygon colliders. Contacts come from a
//! separating-axis narrow phase with edge clipping, and a sub-stepped
//! sequential-impulse solver resolves them alongside springs, rolling
//! wheels and DC motors. Everything lives in `heapless` storage sized by
//! const generics, so the crate runs without an allocator.
//!
//! ```
//! use planar_physics::{BodyOptions, PhysicsWorld, RigidBody, Spring, SpringOptions};
//! use nalgebra::Vector2;
//!
//! let mut world = PhysicsWorld::<4, 1>::new();
//! let bob = world
//!     .add_body(RigidBody::circle(Vector2::new(2.0, 0.0), 0.25, BodyOptions::new()).unwrap())
//!     .unwrap();
//! world
//!     .add_constraint(Spring::new(
//!         bob,
//!         None,
//!         SpringOptions { stiffness: 10.0, ..SpringOptions::default() },
//!     ))
//!     .unwrap();
//!
//! for _ in 0..10 {
//!     world.step::<4>(1.0 / 60.0, 2);
//! }
//! assert!(world.body(bob).unwrap().position().x < 2.0);
//! ```

pub mod body;
pub mod collision;
pub mod constraint;
pub mod error;
pub mod group;
pub mod shape;
pub mod world;

pub use body::{BodyId, BodyOptions, BodyType, Material, RigidBody, MAX_COLLIDERS};
pub use collision::{Contact, ShapeContact};
pub use constraint::{
    Constraint, ConstraintId, DcMotor, DcMotorOptions, MotorDrivable, MouseSpring, Spring, SpringOptions, Wheel,
    WheelOptions,
};
pub use error::PhysicsError;
pub use group::Group;
pub use shape::{Circle, Polygon, Shape, Vertex, MAX_POLYGON_VERTICES};
pub use world::{PhysicsWorld, PreSolveHook};
