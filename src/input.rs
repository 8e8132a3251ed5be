use bevy::input::keyboard::KeyboardInput;
use bevy::prelude::*;
use std::collections::HashMap;

use crate::vehicle::{DriveSettings, ResetEvent};

/// Held-state of every key ever seen, pumped from keyboard events. Purely
/// level-triggered: there is no "just pressed" here, only "currently held".
#[derive(Resource, Default)]
pub struct InputState {
    pressed: HashMap<KeyCode, bool>,
}

impl InputState {
    pub fn set_pressed(&mut self, key: KeyCode, pressed: bool) {
        self.pressed.insert(key, pressed);
    }

    /// Keys never seen count as released.
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.get(&key).copied().unwrap_or(false)
    }
}

/// Drive actions each answer to two keys (letter + arrow/aux); UI toggles
/// answer to one.
#[derive(Resource)]
pub struct Keybinds {
    pub forward: [KeyCode; 2],
    pub reverse: [KeyCode; 2],
    pub steer_left: [KeyCode; 2],
    pub steer_right: [KeyCode; 2],
    pub brake: [KeyCode; 2],
    pub follow: KeyCode,
    pub help: KeyCode,
    pub diagnostics: KeyCode,
    pub reset: KeyCode,
}

impl Default for Keybinds {
    fn default() -> Self {
        Self {
            forward: [KeyCode::KeyW, KeyCode::ArrowUp],
            reverse: [KeyCode::KeyS, KeyCode::ArrowDown],
            steer_left: [KeyCode::KeyA, KeyCode::ArrowLeft],
            steer_right: [KeyCode::KeyD, KeyCode::ArrowRight],
            brake: [KeyCode::Space, KeyCode::ControlLeft],
            follow: KeyCode::KeyF,
            help: KeyCode::KeyH,
            diagnostics: KeyCode::F3,
            reset: KeyCode::KeyR,
        }
    }
}

impl Keybinds {
    pub fn pressed(&self, input: &InputState, binding: [KeyCode; 2]) -> bool {
        binding.iter().any(|key| input.is_pressed(*key))
    }
}

pub struct InputPlugin;
impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InputState>()
            .init_resource::<Keybinds>()
            .add_systems(
                Update,
                (
                    pump_keyboard,
                    follow_toggle,
                    help_toggle,
                    diagnostics_toggle,
                    reset_trigger,
                ),
            );
    }
}

fn pump_keyboard(mut events: EventReader<KeyboardInput>, mut input: ResMut<InputState>) {
    for event in events.read() {
        input.set_pressed(event.key_code, event.state.is_pressed());
    }
}

fn follow_toggle(
    mut settings: ResMut<DriveSettings>,
    binds: Res<Keybinds>,
    keys: Res<ButtonInput<KeyCode>>,
) {
    if keys.just_pressed(binds.follow) {
        settings.follow_camera = !settings.follow_camera;
    }
}

fn help_toggle(
    mut settings: ResMut<DriveSettings>,
    binds: Res<Keybinds>,
    keys: Res<ButtonInput<KeyCode>>,
) {
    if keys.just_pressed(binds.help) {
        settings.show_help = !settings.show_help;
    }
}

fn diagnostics_toggle(
    mut settings: ResMut<DriveSettings>,
    binds: Res<Keybinds>,
    keys: Res<ButtonInput<KeyCode>>,
) {
    if keys.just_pressed(binds.diagnostics) {
        settings.show_diagnostics = !settings.show_diagnostics;
    }
}

fn reset_trigger(
    mut ev_reset: EventWriter<ResetEvent>,
    binds: Res<Keybinds>,
    keys: Res<ButtonInput<KeyCode>>,
) {
    if keys.just_pressed(binds.reset) {
        ev_reset.send(ResetEvent);
    }
}
