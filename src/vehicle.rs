use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

use crate::assets::AssetLibrary;
use crate::input::{InputState, Keybinds};
use crate::physics::{BodyId, Physics, PhysicsBackend, SuspensionTuning, TickSet, VehicleId};
use crate::readiness::{AppState, SpawnVehicle};
use crate::sync::PhysicsBody;

pub const WHEEL_COUNT: usize = 4;
/// Steered wheel indices. The wheel order is fixed at construction:
/// 0 front-left, 1 front-right, 2 rear-left, 3 rear-right.
pub const FRONT_WHEELS: [usize; 2] = [0, 1];

#[derive(Event, Default)]
pub struct ResetEvent;

/// Live-tunable magnitudes and toggles. Wheel geometry and suspension
/// constants live in [`VehicleSpec`] and are fixed once the car exists.
#[derive(Resource, Clone)]
pub struct DriveSettings {
    pub engine_force: f32,
    pub brake_force: f32,
    pub max_steer: f32,
    pub follow_camera: bool,
    pub show_help: bool,
    pub show_diagnostics: bool,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            engine_force: 8000.0,
            brake_force: 150.0,
            max_steer: 0.5,
            follow_camera: true,
            show_help: true,
            show_diagnostics: false,
        }
    }
}

/// Everything needed to build the car: chassis collider, spawn pose, and
/// the generic-sedan wheel dimensions.
#[derive(Resource, Clone)]
pub struct VehicleSpec {
    pub spawn_position: Vec3,
    pub chassis_half_extents: Vec3,
    pub chassis_mass: f32,
    pub chassis_friction: f32,
    pub wheel_radius: f32,
    pub suspension_rest_length: f32,
    pub wheel_half_track: f32,
    pub wheel_axle_height: f32,
    pub wheel_front_z: f32,
    pub wheel_rear_z: f32,
    pub tuning: SuspensionTuning,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self {
            spawn_position: Vec3::new(0.0, 2.0, 0.0),
            chassis_half_extents: Vec3::new(1.0, 0.4, 2.2),
            chassis_mass: 1500.0,
            chassis_friction: 0.5,
            wheel_radius: 0.35,
            suspension_rest_length: 0.6,
            // Wider track keeps the car stable; lower friction slip lets it
            // drift instead of flipping.
            wheel_half_track: 1.1,
            wheel_axle_height: 0.2,
            wheel_front_z: 1.5,
            wheel_rear_z: -1.5,
            tuning: SuspensionTuning {
                stiffness: 70.0,
                max_travel: 0.3,
                friction_slip: 1.5,
                compression_damping: 4.4,
                relaxation_damping: 4.3,
            },
        }
    }
}

/// One wheel's immutable description: where it attaches and how its
/// suspension behaves.
#[derive(Debug, Clone, Copy)]
pub struct WheelConfig {
    pub attachment: Vec3,
    pub down: Vec3,
    pub axle: Vec3,
    pub rest_length: f32,
    pub radius: f32,
    pub tuning: SuspensionTuning,
}

impl VehicleSpec {
    /// Wheel descriptions in index order: front-left, front-right,
    /// rear-left, rear-right.
    pub fn wheel_configs(&self) -> [WheelConfig; WHEEL_COUNT] {
        let wheel = |x: f32, z: f32| WheelConfig {
            attachment: Vec3::new(x, self.wheel_axle_height, z),
            down: Vec3::NEG_Y,
            axle: Vec3::X,
            rest_length: self.suspension_rest_length,
            radius: self.wheel_radius,
            tuning: self.tuning,
        };
        [
            wheel(self.wheel_half_track, self.wheel_front_z),
            wheel(-self.wheel_half_track, self.wheel_front_z),
            wheel(self.wheel_half_track, self.wheel_rear_z),
            wheel(-self.wheel_half_track, self.wheel_rear_z),
        ]
    }
}

/// Per-tick control output derived from the current key state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Actuation {
    pub engine_force: f32,
    pub brake_force: f32,
    pub steering: f32,
}

/// Maps held keys to actuation. Forward wins over reverse, left over right,
/// and the brake zeroes the engine force for the tick.
pub fn resolve_actuation(
    input: &InputState,
    binds: &Keybinds,
    settings: &DriveSettings,
) -> Actuation {
    let mut actuation = Actuation::default();

    if binds.pressed(input, binds.forward) {
        actuation.engine_force = settings.engine_force;
    } else if binds.pressed(input, binds.reverse) {
        actuation.engine_force = -settings.engine_force;
    }

    if binds.pressed(input, binds.steer_left) {
        actuation.steering = -settings.max_steer;
    } else if binds.pressed(input, binds.steer_right) {
        actuation.steering = settings.max_steer;
    }

    if binds.pressed(input, binds.brake) {
        actuation.brake_force = settings.brake_force;
        actuation.engine_force = 0.0;
    }

    actuation
}

/// Handles of a constructed car inside the physics backend.
#[derive(Debug, Clone, Copy)]
pub struct VehicleRig {
    pub chassis: BodyId,
    pub controller: VehicleId,
}

/// Creates the chassis, its collider, the wheel assembly, and all four
/// wheels, in fixed index order. Called exactly once, when the readiness
/// gate fires.
pub fn build_vehicle(physics: &mut dyn PhysicsBackend, spec: &VehicleSpec) -> VehicleRig {
    let chassis = physics.create_dynamic_chassis(spec.spawn_position);
    physics.attach_box_collider(
        chassis,
        spec.chassis_half_extents,
        spec.chassis_mass,
        spec.chassis_friction,
    );
    let controller = physics.create_vehicle(chassis);
    for config in spec.wheel_configs() {
        let index = physics.add_wheel(
            controller,
            config.attachment,
            config.down,
            config.axle,
            config.rest_length,
            config.radius,
        );
        physics.set_wheel_params(controller, index, &config.tuning);
    }
    VehicleRig { chassis, controller }
}

/// The live car. Exists only after the readiness gate has fired; its absence
/// is what makes the per-frame drive system a no-op while loading.
#[derive(Resource)]
pub struct Vehicle {
    chassis: BodyId,
    controller: VehicleId,
    visual: Entity,
    last_pose: Option<(Vec3, Quat)>,
    last_speed: f32,
}

impl Vehicle {
    pub fn new(rig: VehicleRig, visual: Entity) -> Self {
        Self {
            chassis: rig.chassis,
            controller: rig.controller,
            visual,
            last_pose: None,
            last_speed: 0.0,
        }
    }

    /// Render-graph attachment point for the chassis.
    pub fn visual_entity(&self) -> Entity {
        self.visual
    }

    pub fn chassis(&self) -> BodyId {
        self.chassis
    }

    /// Chassis pose read back at the end of the last tick.
    pub fn pose(&self) -> Option<(Vec3, Quat)> {
        self.last_pose
    }

    pub fn speed(&self) -> f32 {
        self.last_speed
    }

    /// One simulation tick: wake the chassis, write actuation to the wheels,
    /// advance the wheel simulation by the elapsed wall-clock seconds, and
    /// read back the authoritative chassis pose.
    pub fn tick(&mut self, physics: &mut dyn PhysicsBackend, actuation: Actuation, dt: f32) {
        // Player input is too sparse to keep the body awake on its own.
        physics.wake_body(self.chassis);

        // Engine force goes to every wheel; steering only to the front axle.
        for wheel in 0..WHEEL_COUNT {
            physics.set_wheel_engine_force(self.controller, wheel, actuation.engine_force);
        }
        if physics.wheel_support().brake {
            for wheel in 0..WHEEL_COUNT {
                physics.set_wheel_brake(self.controller, wheel, actuation.brake_force);
            }
        }
        for wheel in FRONT_WHEELS {
            physics.set_wheel_steering(self.controller, wheel, actuation.steering);
        }

        physics.step_vehicle(self.controller, dt);

        self.last_pose = physics.read_transform(self.chassis);
        self.last_speed = physics.vehicle_speed(self.controller);
    }
}

pub struct VehiclePlugin;
impl Plugin for VehiclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleSpec>()
            .init_resource::<DriveSettings>()
            .add_event::<ResetEvent>()
            .add_systems(
                Update,
                (
                    handle_spawn_vehicle.run_if(resource_exists::<Physics>),
                    drive_vehicle
                        .run_if(in_state(AppState::Driving))
                        .run_if(resource_exists::<Physics>)
                        .in_set(TickSet::Drive),
                    handle_reset.run_if(resource_exists::<Physics>),
                ),
            );
    }
}

fn handle_spawn_vehicle(
    mut commands: Commands,
    mut events: EventReader<SpawnVehicle>,
    mut physics: ResMut<Physics>,
    spec: Res<VehicleSpec>,
    library: Res<AssetLibrary>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    let rig = build_vehicle(physics.0.as_mut(), &spec);

    let visual = commands
        .spawn((
            SpatialBundle::from_transform(Transform::from_translation(spec.spawn_position)),
            PhysicsBody(rig.chassis),
        ))
        .id();

    match library.scene("car_model") {
        Some(scene) => {
            commands.entity(visual).with_children(|parent| {
                // The glTF is authored facing sideways and far too large.
                parent.spawn(SceneBundle {
                    scene,
                    transform: Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2))
                        .with_scale(Vec3::splat(0.04)),
                    ..default()
                });
            });
        }
        None => warn!("car model missing from the asset library, driving a bare chassis"),
    }

    commands.insert_resource(Vehicle::new(rig, visual));
    next_state.set(AppState::Driving);
    info!("vehicle spawned");
}

fn drive_vehicle(
    vehicle: Option<ResMut<Vehicle>>,
    mut physics: ResMut<Physics>,
    input: Res<InputState>,
    binds: Res<Keybinds>,
    settings: Res<DriveSettings>,
    time: Res<Time>,
) {
    let Some(mut vehicle) = vehicle else {
        return;
    };
    let actuation = resolve_actuation(&input, &binds, &settings);
    vehicle.tick(physics.0.as_mut(), actuation, time.delta_seconds());
}

fn handle_reset(
    mut events: EventReader<ResetEvent>,
    vehicle: Option<Res<Vehicle>>,
    mut physics: ResMut<Physics>,
    spec: Res<VehicleSpec>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();
    if let Some(vehicle) = vehicle {
        physics
            .0
            .teleport_body(vehicle.chassis(), spec.spawn_position, Quat::IDENTITY);
    }
}
