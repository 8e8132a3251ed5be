use bevy::math::{Quat, Vec3};
use bevy::prelude::*;
use rapier3d::control::{DynamicRayCastVehicleController, WheelTuning};
use rapier3d::na as nalgebra;
use rapier3d::na::{self, point, vector};
use rapier3d::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline,
    QueryFilter, QueryPipeline, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};

use crate::readiness::{dispatch_actions, ReadinessGate, SpawnGround, SpawnVehicle};

/// Opaque handle to a rigid body owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyId(pub u32);

/// Opaque handle to a wheeled-vehicle assembly owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleId(pub u32);

/// Suspension tuning applied to one wheel after its geometry is registered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuspensionTuning {
    pub stiffness: f32,
    pub max_travel: f32,
    pub friction_slip: f32,
    pub compression_damping: f32,
    pub relaxation_damping: f32,
}

/// Which optional wheel knobs a backend exposes. Stiffness and travel are
/// universal; the rest are applied only where supported and skipped silently
/// otherwise.
#[derive(Debug, Clone, Copy)]
pub struct WheelSupport {
    pub friction_slip: bool,
    pub suspension_damping: bool,
    pub brake: bool,
}

/// Capability surface of the physics engine.
///
/// The simulation core only ever talks to this trait, so the whole vehicle
/// path can be driven by a deterministic stub in tests.
pub trait PhysicsBackend: Send + Sync {
    fn create_static_ground(&mut self, width: f32, depth: f32);
    fn create_dynamic_chassis(&mut self, position: Vec3) -> BodyId;
    fn attach_box_collider(&mut self, body: BodyId, half_extents: Vec3, mass: f32, friction: f32);
    fn create_dynamic_box(&mut self, position: Vec3, half_extents: Vec3, mass: f32) -> BodyId;
    fn create_vehicle(&mut self, chassis: BodyId) -> VehicleId;
    /// Registers wheel geometry and returns its index on the vehicle.
    fn add_wheel(
        &mut self,
        vehicle: VehicleId,
        attachment: Vec3,
        down: Vec3,
        axle: Vec3,
        rest_length: f32,
        radius: f32,
    ) -> usize;
    fn wheel_support(&self) -> WheelSupport;
    fn set_wheel_params(&mut self, vehicle: VehicleId, wheel: usize, tuning: &SuspensionTuning);
    fn set_wheel_engine_force(&mut self, vehicle: VehicleId, wheel: usize, force: f32);
    fn set_wheel_brake(&mut self, vehicle: VehicleId, wheel: usize, force: f32);
    fn set_wheel_steering(&mut self, vehicle: VehicleId, wheel: usize, angle: f32);
    fn wake_body(&mut self, body: BodyId);
    fn step_vehicle(&mut self, vehicle: VehicleId, dt: f32);
    fn step_world(&mut self, dt: f32);
    fn read_transform(&self, body: BodyId) -> Option<(Vec3, Quat)>;
    fn teleport_body(&mut self, body: BodyId, position: Vec3, rotation: Quat);
    fn vehicle_speed(&self, vehicle: VehicleId) -> f32;
}

#[derive(Resource)]
pub struct Physics(pub Box<dyn PhysicsBackend>);

/// Per-frame ordering of the simulation: integrate the world, drive the
/// vehicle, then copy poses onto the render graph. Chained, never overlapping.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TickSet {
    Step,
    Drive,
    Sync,
}

pub struct PhysicsPlugin;
impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReadinessGate>()
            .add_event::<SpawnGround>()
            .add_event::<SpawnVehicle>()
            .configure_sets(Update, (TickSet::Step, TickSet::Drive, TickSet::Sync).chain())
            .add_systems(Startup, init_physics)
            .add_systems(
                Update,
                (
                    announce_physics_ready.run_if(resource_exists::<Physics>),
                    step_physics
                        .run_if(resource_exists::<Physics>)
                        .in_set(TickSet::Step),
                    crate::sync::sync_transforms
                        .run_if(resource_exists::<Physics>)
                        .in_set(TickSet::Sync),
                ),
            );
    }
}

fn init_physics(mut commands: Commands) {
    commands.insert_resource(Physics(Box::new(RapierWorld::new())));
    info!("physics world initialized");
}

/// Re-notifies the gate every frame the backend exists; the gate discards
/// everything after the first notification.
fn announce_physics_ready(
    mut gate: ResMut<ReadinessGate>,
    mut ground_ev: EventWriter<SpawnGround>,
    mut vehicle_ev: EventWriter<SpawnVehicle>,
) {
    let actions = gate.on_physics_ready();
    dispatch_actions(actions, &mut ground_ev, &mut vehicle_ev);
}

fn step_physics(mut physics: ResMut<Physics>, time: Res<Time>) {
    physics.0.step_world(time.delta_seconds());
}

/// The rapier-backed world: every set the pipeline needs, plus the vehicle
/// controllers, behind stable integer handles.
pub struct RapierWorld {
    gravity: na::Vector3<f32>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    body_handles: Vec<RigidBodyHandle>,
    vehicles: Vec<DynamicRayCastVehicleController>,
}

impl RapierWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -9.81, 0.0],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            body_handles: Vec::new(),
            vehicles: Vec::new(),
        }
    }

    fn handle(&self, body: BodyId) -> Option<RigidBodyHandle> {
        self.body_handles.get(body.0 as usize).copied()
    }

    fn register(&mut self, handle: RigidBodyHandle) -> BodyId {
        let id = BodyId(self.body_handles.len() as u32);
        self.body_handles.push(handle);
        id
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for RapierWorld {
    fn create_static_ground(&mut self, width: f32, depth: f32) {
        // A thick slab whose top face sits at y = 0.
        let ground = ColliderBuilder::cuboid(width / 2.0, 2.0, depth / 2.0)
            .translation(vector![0.0, -2.0, 0.0]);
        self.colliders.insert(ground);
    }

    fn create_dynamic_chassis(&mut self, position: Vec3) -> BodyId {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .can_sleep(false);
        let handle = self.bodies.insert(body);
        self.register(handle)
    }

    fn attach_box_collider(&mut self, body: BodyId, half_extents: Vec3, mass: f32, friction: f32) {
        let Some(handle) = self.handle(body) else {
            return;
        };
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .friction(friction);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
    }

    fn create_dynamic_box(&mut self, position: Vec3, half_extents: Vec3, mass: f32) -> BodyId {
        let body = RigidBodyBuilder::dynamic().translation(vector![
            position.x, position.y, position.z
        ]);
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .restitution(0.3)
            .friction(0.7);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.register(handle)
    }

    fn create_vehicle(&mut self, chassis: BodyId) -> VehicleId {
        let handle = self
            .handle(chassis)
            .expect("vehicle chassis must be created through this backend");
        let id = VehicleId(self.vehicles.len() as u32);
        self.vehicles
            .push(DynamicRayCastVehicleController::new(handle));
        id
    }

    fn add_wheel(
        &mut self,
        vehicle: VehicleId,
        attachment: Vec3,
        down: Vec3,
        axle: Vec3,
        rest_length: f32,
        radius: f32,
    ) -> usize {
        let controller = &mut self.vehicles[vehicle.0 as usize];
        controller.add_wheel(
            point![attachment.x, attachment.y, attachment.z],
            vector![down.x, down.y, down.z],
            vector![axle.x, axle.y, axle.z],
            rest_length,
            radius,
            &WheelTuning::default(),
        );
        controller.wheels().len() - 1
    }

    fn wheel_support(&self) -> WheelSupport {
        WheelSupport {
            friction_slip: true,
            suspension_damping: true,
            brake: true,
        }
    }

    fn set_wheel_params(&mut self, vehicle: VehicleId, wheel: usize, tuning: &SuspensionTuning) {
        let support = self.wheel_support();
        let controller = &mut self.vehicles[vehicle.0 as usize];
        let Some(wheel) = controller.wheels_mut().get_mut(wheel) else {
            return;
        };
        wheel.suspension_stiffness = tuning.stiffness;
        wheel.max_suspension_travel = tuning.max_travel;
        if support.friction_slip {
            wheel.friction_slip = tuning.friction_slip;
        }
        if support.suspension_damping {
            wheel.damping_compression = tuning.compression_damping;
            wheel.damping_relaxation = tuning.relaxation_damping;
        }
    }

    fn set_wheel_engine_force(&mut self, vehicle: VehicleId, wheel: usize, force: f32) {
        let controller = &mut self.vehicles[vehicle.0 as usize];
        if let Some(wheel) = controller.wheels_mut().get_mut(wheel) {
            wheel.engine_force = force;
        }
    }

    fn set_wheel_brake(&mut self, vehicle: VehicleId, wheel: usize, force: f32) {
        let controller = &mut self.vehicles[vehicle.0 as usize];
        if let Some(wheel) = controller.wheels_mut().get_mut(wheel) {
            wheel.brake = force;
        }
    }

    fn set_wheel_steering(&mut self, vehicle: VehicleId, wheel: usize, angle: f32) {
        let controller = &mut self.vehicles[vehicle.0 as usize];
        if let Some(wheel) = controller.wheels_mut().get_mut(wheel) {
            wheel.steering = angle;
        }
    }

    fn wake_body(&mut self, body: BodyId) {
        if let Some(handle) = self.handle(body) {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.wake_up(true);
            }
        }
    }

    fn step_vehicle(&mut self, vehicle: VehicleId, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let Some(controller) = self.vehicles.get_mut(vehicle.0 as usize) else {
            return;
        };
        let chassis = controller.chassis;
        // Wheel rays only probe the static environment; the chassis collider
        // still collides with dynamic props.
        let filter = QueryFilter::exclude_dynamic().exclude_rigid_body(chassis);
        controller.update_vehicle(
            dt,
            &mut self.bodies,
            &self.colliders,
            &self.query_pipeline,
            filter,
        );
    }

    fn step_world(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn read_transform(&self, body: BodyId) -> Option<(Vec3, Quat)> {
        let handle = self.handle(body)?;
        let body = self.bodies.get(handle)?;
        let t = body.translation();
        let r = body.rotation();
        Some((
            Vec3::new(t.x, t.y, t.z),
            Quat::from_xyzw(r.i, r.j, r.k, r.w),
        ))
    }

    fn teleport_body(&mut self, body: BodyId, position: Vec3, rotation: Quat) {
        let Some(handle) = self.handle(body) else {
            return;
        };
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.set_translation(vector![position.x, position.y, position.z], true);
        body.set_rotation(
            na::UnitQuaternion::new_normalize(na::Quaternion::new(
                rotation.w, rotation.x, rotation.y, rotation.z,
            )),
            true,
        );
        body.set_linvel(vector![0.0, 0.0, 0.0], true);
        body.set_angvel(vector![0.0, 0.0, 0.0], true);
    }

    fn vehicle_speed(&self, vehicle: VehicleId) -> f32 {
        self.vehicles
            .get(vehicle.0 as usize)
            .map(|controller| controller.current_vehicle_speed)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_forward(world: &mut RapierWorld, vehicle: VehicleId, chassis: BodyId, seconds: f32) {
        let dt = 1.0 / 60.0;
        let steps = (seconds / dt) as usize;
        for _ in 0..steps {
            world.wake_body(chassis);
            for wheel in 0..4 {
                world.set_wheel_engine_force(vehicle, wheel, 8000.0);
            }
            world.step_world(dt);
            world.step_vehicle(vehicle, dt);
        }
    }

    fn build_vehicle(world: &mut RapierWorld) -> (BodyId, VehicleId) {
        let chassis = world.create_dynamic_chassis(Vec3::new(0.0, 2.0, 0.0));
        world.attach_box_collider(chassis, Vec3::new(1.0, 0.4, 2.2), 1500.0, 0.5);
        let vehicle = world.create_vehicle(chassis);
        let tuning = SuspensionTuning {
            stiffness: 70.0,
            max_travel: 0.3,
            friction_slip: 1.5,
            compression_damping: 4.4,
            relaxation_damping: 4.3,
        };
        for (x, z) in [(1.1, 1.5), (-1.1, 1.5), (1.1, -1.5), (-1.1, -1.5)] {
            let index = world.add_wheel(
                vehicle,
                Vec3::new(x, 0.2, z),
                Vec3::NEG_Y,
                Vec3::X,
                0.6,
                0.35,
            );
            world.set_wheel_params(vehicle, index, &tuning);
        }
        (chassis, vehicle)
    }

    #[test]
    fn chassis_spawns_at_requested_pose() {
        let mut world = RapierWorld::new();
        let chassis = world.create_dynamic_chassis(Vec3::new(0.0, 2.0, 0.0));
        let (position, rotation) = world.read_transform(chassis).unwrap();
        assert_eq!(position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(rotation, Quat::IDENTITY);
    }

    #[test]
    fn wheels_are_indexed_in_creation_order() {
        let mut world = RapierWorld::new();
        let chassis = world.create_dynamic_chassis(Vec3::new(0.0, 2.0, 0.0));
        let vehicle = world.create_vehicle(chassis);
        for expected in 0..4 {
            let index = world.add_wheel(
                vehicle,
                Vec3::new(1.0, 0.2, 1.0),
                Vec3::NEG_Y,
                Vec3::X,
                0.6,
                0.35,
            );
            assert_eq!(index, expected);
        }
    }

    #[test]
    fn bodies_fall_under_gravity_onto_the_ground() {
        let mut world = RapierWorld::new();
        world.create_static_ground(100.0, 100.0);
        let crate_box = world.create_dynamic_box(Vec3::new(0.0, 4.0, 0.0), Vec3::splat(0.5), 20.0);
        for _ in 0..240 {
            world.step_world(1.0 / 60.0);
        }
        let (position, _) = world.read_transform(crate_box).unwrap();
        assert!(position.y < 4.0, "box never fell: {position:?}");
        assert!(position.y > -1.0, "box fell through the ground: {position:?}");
    }

    #[test]
    fn throttle_moves_the_vehicle_off_its_spawn_point() {
        let mut world = RapierWorld::new();
        world.create_static_ground(100.0, 100.0);
        let (chassis, vehicle) = build_vehicle(&mut world);
        let (start, _) = world.read_transform(chassis).unwrap();

        drive_forward(&mut world, vehicle, chassis, 1.5);

        let (end, _) = world.read_transform(chassis).unwrap();
        let horizontal = Vec3::new(end.x - start.x, 0.0, end.z - start.z).length();
        assert!(
            horizontal > 0.25,
            "vehicle stayed put: start {start:?}, end {end:?}"
        );
        assert!(end.y > -1.0, "vehicle fell through the ground: {end:?}");
    }

    #[test]
    fn teleport_resets_pose() {
        let mut world = RapierWorld::new();
        world.create_static_ground(100.0, 100.0);
        let (chassis, vehicle) = build_vehicle(&mut world);
        drive_forward(&mut world, vehicle, chassis, 1.0);

        world.teleport_body(chassis, Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY);
        let (position, rotation) = world.read_transform(chassis).unwrap();
        assert!((position - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
        assert!(rotation.abs_diff_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn stale_body_ids_read_nothing() {
        let world = RapierWorld::new();
        assert!(world.read_transform(BodyId(7)).is_none());
    }
}
