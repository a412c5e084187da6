mod backend;
mod body;
mod point_mass;
mod world;

pub use backend::PhysicsBackend;
pub use body::{BodyDynamics, BodyState, ForceMode};
pub use point_mass::PointMass;
pub use world::{PhysicsScene, PhysicsWorld};
