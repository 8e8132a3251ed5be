use bevy::pbr::CascadeShadowConfigBuilder;
use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use crate::physics::{Physics, TickSet};
use crate::readiness::SpawnGround;
use crate::sync::PhysicsBody;
use crate::vehicle::{DriveSettings, Vehicle};
use crate::MainCamera;

const GROUND_SIZE: f32 = 100.0;
const CRATE_COUNT: usize = 12;
const CRATE_SIZE: f32 = 1.0;
const CAMERA_OFFSET: Vec3 = Vec3::new(8.0, 4.0, 10.0);

pub struct EnvironmentPlugin;
impl Plugin for EnvironmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_environment).add_systems(
            Update,
            (
                handle_spawn_ground.run_if(resource_exists::<Physics>),
                follow_camera.after(TickSet::Sync),
            ),
        );
    }
}

/// Visual floor and lighting only; the physics ground arrives separately,
/// as soon as the physics world reports ready.
fn setup_environment(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn(PbrBundle {
        mesh: meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.27, 0.27, 0.27),
            perceptual_roughness: 0.8,
            metallic: 0.2,
            ..default()
        }),
        ..default()
    });

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 5_000.0,
            shadows_enabled: true,
            ..default()
        },
        transform: Transform::from_xyz(3.5, 2.0, -1.25).looking_at(Vec3::ZERO, Vec3::Y),
        cascade_shadow_config: CascadeShadowConfigBuilder {
            maximum_distance: 60.0,
            ..default()
        }
        .build(),
        ..default()
    });
}

fn handle_spawn_ground(
    mut events: EventReader<SpawnGround>,
    mut commands: Commands,
    mut physics: ResMut<Physics>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if events.is_empty() {
        return;
    }
    events.clear();

    physics.0.create_static_ground(GROUND_SIZE, GROUND_SIZE);
    info!("ground collider created");

    // A loose ring of crates to bump into.
    let mesh = meshes.add(Cuboid::new(CRATE_SIZE, CRATE_SIZE, CRATE_SIZE));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.6, 0.45, 0.25),
        perceptual_roughness: 0.9,
        ..default()
    });
    let mut rng = rand::thread_rng();
    for _ in 0..CRATE_COUNT {
        let radius = rng.gen_range(8.0..20.0);
        let angle = rng.gen_range(0.0..TAU);
        let position = Vec3::new(
            radius * angle.cos(),
            rng.gen_range(0.5..2.0),
            radius * angle.sin(),
        );
        let body = physics
            .0
            .create_dynamic_box(position, Vec3::splat(CRATE_SIZE / 2.0), 20.0);
        commands.spawn((
            PbrBundle {
                mesh: mesh.clone(),
                material: material.clone(),
                transform: Transform::from_translation(position),
                ..default()
            },
            PhysicsBody(body),
        ));
    }
}

/// Eases the camera toward a fixed offset behind the car and keeps it
/// pointed at the chassis. Inactive until the car exists or when toggled
/// off, leaving the startup vantage point in place.
fn follow_camera(
    settings: Res<DriveSettings>,
    vehicle: Option<Res<Vehicle>>,
    time: Res<Time>,
    mut cameras: Query<&mut Transform, With<MainCamera>>,
    targets: Query<&Transform, (With<PhysicsBody>, Without<MainCamera>)>,
) {
    if !settings.follow_camera {
        return;
    }
    let Some(vehicle) = vehicle else {
        return;
    };
    let Ok(mut camera) = cameras.get_single_mut() else {
        return;
    };
    let Ok(target) = targets.get(vehicle.visual_entity()) else {
        return;
    };

    let focus = target.translation;
    let lerp_factor = (1.0 - (-2.0 * time.delta_seconds()).exp()).clamp(0.0, 1.0);
    camera.translation = camera.translation.lerp(focus + CAMERA_OFFSET, lerp_factor);
    camera.look_at(focus + Vec3::Y, Vec3::Y);
}
