mod assets;
mod input;
mod physics;
mod readiness;
mod scene;
mod sync;
mod ui;
mod vehicle;

use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;

use assets::ResourcesPlugin;
use input::InputPlugin;
use physics::PhysicsPlugin;
use readiness::AppState;
use scene::EnvironmentPlugin;
use ui::UiPlugin;
use vehicle::VehiclePlugin;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.10, 0.10, 0.18)))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::WHITE,
            brightness: 120.0,
        })
        .init_state::<AppState>()
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "roadster-rs — raycast vehicle sandbox".into(),
                resolution: (1400., 900.).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            PhysicsPlugin,
            ResourcesPlugin,
            InputPlugin,
            EnvironmentPlugin,
            VehiclePlugin,
            UiPlugin,
        ))
        .add_systems(Startup, setup_camera)
        .run();
}

fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera3dBundle {
            camera: Camera {
                hdr: true,
                ..default()
            },
            tonemapping: Tonemapping::TonyMcMapface,
            transform: Transform::from_xyz(8.0, 4.0, 10.0)
                .looking_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
            ..default()
        },
        BloomSettings::default(),
        MainCamera,
    ));
}

#[derive(Component)]
pub struct MainCamera;
