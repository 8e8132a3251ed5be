use bevy::asset::LoadState;
use bevy::prelude::*;
use std::collections::HashMap;

use crate::readiness::{dispatch_actions, ReadinessGate, SpawnGround, SpawnVehicle};

/// One external asset to fetch before the world can finish spawning.
pub struct AssetSource {
    pub name: &'static str,
    pub path: &'static str,
}

/// Everything the sandbox loads up front.
pub const SOURCES: &[AssetSource] = &[AssetSource {
    name: "car_model",
    path: "models/car/scene.gltf#Scene0",
}];

/// Named lookup for loaded scenes, filled at startup from [`SOURCES`].
#[derive(Resource, Default)]
pub struct AssetLibrary {
    scenes: HashMap<&'static str, Handle<Scene>>,
    missing_reported: bool,
}

impl AssetLibrary {
    pub fn scene(&self, name: &str) -> Option<Handle<Scene>> {
        self.scenes.get(name).cloned()
    }
}

pub struct ResourcesPlugin;
impl Plugin for ResourcesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AssetLibrary>()
            .add_systems(Startup, start_loading)
            .add_systems(Update, watch_loading);
    }
}

fn start_loading(asset_server: Res<AssetServer>, mut library: ResMut<AssetLibrary>) {
    for source in SOURCES {
        library
            .scenes
            .insert(source.name, asset_server.load(source.path));
    }
}

/// Notifies the gate once every declared source has finished loading with
/// its dependencies. An empty manifest counts as loaded immediately. The
/// gate ignores the repeated notifications this system produces afterwards.
fn watch_loading(
    asset_server: Res<AssetServer>,
    mut library: ResMut<AssetLibrary>,
    mut gate: ResMut<ReadinessGate>,
    mut ground_ev: EventWriter<SpawnGround>,
    mut vehicle_ev: EventWriter<SpawnVehicle>,
) {
    if !library.missing_reported {
        let mut any_failed = false;
        for (name, handle) in &library.scenes {
            if let LoadState::Failed(_) = asset_server.load_state(handle.id()) {
                warn!(
                    "asset '{name}' failed to load; drop a glTF at assets/models/car/scene.gltf \
                     to get a car"
                );
                any_failed = true;
            }
        }
        library.missing_reported = any_failed;
    }

    let all_loaded = library
        .scenes
        .values()
        .all(|handle| asset_server.is_loaded_with_dependencies(handle));
    if all_loaded {
        let actions = gate.on_assets_ready();
        dispatch_actions(actions, &mut ground_ev, &mut vehicle_ev);
    }
}
