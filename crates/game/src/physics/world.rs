use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use super::{BodyDynamics, BodyState, ForceMode};

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    const TICK_RATE: Real = 1.0 / 50.0;

    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = Self::TICK_RATE;
        integration_parameters.min_ccd_dt = Self::TICK_RATE / 100.0;

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, -9.81, 0.0),
        }
    }

    pub fn step(&mut self, dt: Real) {
        if self.integration_parameters.dt != dt {
            self.integration_parameters.dt = dt;
            self.integration_parameters.min_ccd_dt = dt / 100.0;
        }

        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    pub fn add_ground(&mut self, y: Real, half_size: Real) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_size, 0.1, half_size)
            .translation(Vector::new(0.0, y, 0.0))
            .build();
        self.colliders.insert(collider)
    }

    pub fn add_dynamic_sphere(
        &mut self,
        position: Vec3,
        radius: Real,
        mass: Real,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position.x, position.y, position.z))
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(radius)
            .mass(mass)
            .friction(0.5)
            .restitution(0.3)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn body_state(&self, handle: RigidBodyHandle) -> Option<BodyState> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            let r = b.rotation();
            let v = b.linvel();
            let w = b.angvel();
            BodyState {
                position: Vec3::new(t.x, t.y, t.z),
                rotation: Quat::from_xyzw(r.x, r.y, r.z, r.w),
                linear_velocity: Vec3::new(v.x, v.y, v.z),
                angular_velocity: Vec3::new(w.x, w.y, w.z),
            }
        })
    }

    pub fn set_body_state(&mut self, handle: RigidBodyHandle, state: &BodyState) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let (p, q) = (state.position, state.rotation);
            let rot = Rotation::from_xyzw(q.x, q.y, q.z, q.w).normalize();
            let new_pose = Pose::from_parts(Vector::new(p.x, p.y, p.z), rot);
            body.set_position(new_pose, true);

            let (v, w) = (state.linear_velocity, state.angular_velocity);
            body.set_linvel(Vector::new(v.x, v.y, v.z), true);
            body.set_angvel(Vector::new(w.x, w.y, w.z), true);
        }
    }

    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(Vector::new(impulse.x, impulse.y, impulse.z), true);
        }
    }

    pub fn add_velocity(&mut self, handle: RigidBodyHandle, delta: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let v = body.linvel();
            let new_vel = Vector::new(v.x + delta.x, v.y + delta.y, v.z + delta.z);
            body.set_linvel(new_vel, true);
        }
    }
}

/// A player sphere resting on a ground slab whose top face sits at `y = 0`.
pub struct PhysicsScene {
    world: PhysicsWorld,
    player: RigidBodyHandle,
}

impl PhysicsScene {
    pub const GROUND_HALF_SIZE: Real = 50.0;
    pub const PLAYER_RADIUS: Real = 0.5;
    pub const PLAYER_MASS: Real = 1.0;

    pub fn create(spawn: Vec3) -> Self {
        let mut world = PhysicsWorld::new();
        world.add_ground(-0.1, Self::GROUND_HALF_SIZE);
        let player = world.add_dynamic_sphere(spawn, Self::PLAYER_RADIUS, Self::PLAYER_MASS);
        Self { world, player }
    }
}

impl BodyDynamics for PhysicsScene {
    fn state(&self) -> BodyState {
        self.world.body_state(self.player).unwrap_or_default()
    }

    fn set_state(&mut self, state: &BodyState) {
        self.world.set_body_state(self.player, state);
    }

    fn apply_impulse(&mut self, impulse: Vec3, mode: ForceMode) {
        match mode {
            ForceMode::Impulse => self.world.apply_impulse(self.player, impulse),
            ForceMode::VelocityChange => self.world.add_velocity(self.player, impulse),
        }
    }

    fn step(&mut self, dt: f32) {
        self.world.step(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_settles_on_ground() {
        let mut scene = PhysicsScene::create(Vec3::new(0.0, 2.0, 0.0));
        for _ in 0..250 {
            scene.step(1.0 / 50.0);
        }
        let y = scene.position().y;
        assert!((y - PhysicsScene::PLAYER_RADIUS).abs() < 0.05, "y = {y}");
    }

    #[test]
    fn set_state_overwrites_all_fields() {
        let mut scene = PhysicsScene::create(Vec3::new(0.0, 2.0, 0.0));
        let target = BodyState {
            position: Vec3::new(3.0, 4.0, 5.0),
            rotation: Quat::from_rotation_y(1.0),
            linear_velocity: Vec3::new(1.0, 0.0, -1.0),
            angular_velocity: Vec3::new(0.0, 2.0, 0.0),
        };
        scene.set_state(&target);

        let state = scene.state();
        assert!((state.position - target.position).length() < 1e-6);
        assert!(state.rotation.dot(target.rotation).abs() > 0.9999);
        assert!((state.linear_velocity - target.linear_velocity).length() < 1e-6);
        assert!((state.angular_velocity - target.angular_velocity).length() < 1e-6);
    }

    #[test]
    fn impulse_moves_player() {
        let mut scene = PhysicsScene::create(Vec3::new(0.0, 0.5, 0.0));
        scene.apply_impulse(Vec3::new(0.5, 0.0, 0.0), ForceMode::Impulse);
        scene.step(1.0 / 50.0);
        assert!(scene.position().x > 0.0);
    }
}
