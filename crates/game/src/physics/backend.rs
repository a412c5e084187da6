use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use super::{BodyDynamics, PhysicsScene, PointMass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhysicsBackend {
    #[default]
    Rapier,
    PointMass,
}

impl PhysicsBackend {
    pub fn create(self, spawn: Vec3) -> Box<dyn BodyDynamics> {
        match self {
            PhysicsBackend::Rapier => Box::new(PhysicsScene::create(spawn)),
            PhysicsBackend::PointMass => Box::new(PointMass::new(
                spawn,
                PhysicsScene::PLAYER_RADIUS,
                PhysicsScene::PLAYER_MASS,
            )),
        }
    }
}

impl FromStr for PhysicsBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rapier" => Ok(PhysicsBackend::Rapier),
            "point-mass" | "pointmass" => Ok(PhysicsBackend::PointMass),
            other => Err(format!("unknown physics backend '{other}'")),
        }
    }
}

impl fmt::Display for PhysicsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsBackend::Rapier => f.write_str("rapier"),
            PhysicsBackend::PointMass => f.write_str("point-mass"),
        }
    }
}
