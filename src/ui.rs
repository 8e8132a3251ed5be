use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};

use crate::readiness::AppState;
use crate::vehicle::{DriveSettings, ResetEvent, Vehicle};

pub struct UiPlugin;
impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin)
            .add_systems(Update, loading_banner.run_if(in_state(AppState::Loading)))
            .add_systems(
                Update,
                (settings_panel, help_panel, diagnostics_panel)
                    .run_if(in_state(AppState::Driving)),
            );
    }
}

fn loading_banner(mut contexts: EguiContexts) {
    egui::Window::new("Loading").show(contexts.ctx_mut(), |ui| {
        ui.label("Waiting for physics and assets…");
    });
}

fn settings_panel(
    mut contexts: EguiContexts,
    mut settings: ResMut<DriveSettings>,
    mut ev_reset: EventWriter<ResetEvent>,
) {
    egui::Window::new("Settings").show(contexts.ctx_mut(), |ui| {
        ui.add(egui::Slider::new(&mut settings.engine_force, 0.0..=20_000.0).text("Engine force"));
        ui.add(egui::Slider::new(&mut settings.brake_force, 0.0..=500.0).text("Brake force"));
        ui.add(egui::Slider::new(&mut settings.max_steer, 0.1..=1.0).text("Max steering (rad)"));

        ui.separator();

        ui.checkbox(&mut settings.follow_camera, "Follow camera");
        ui.checkbox(&mut settings.show_help, "Show controls");
        ui.checkbox(&mut settings.show_diagnostics, "Show diagnostics");

        ui.separator();

        if ui.button("Reset car (R)").clicked() {
            ev_reset.send(ResetEvent);
        }
    });
}

fn help_panel(mut contexts: EguiContexts, settings: Res<DriveSettings>) {
    if !settings.show_help {
        return;
    }
    egui::Window::new("Controls").show(contexts.ctx_mut(), |ui| {
        ui.label("W / ↑ — accelerate");
        ui.label("S / ↓ — reverse");
        ui.label("A / ← — steer left");
        ui.label("D / → — steer right");
        ui.label("Space — handbrake");
        ui.label("R — reset car");
        ui.label("F — toggle follow camera");
        ui.label("H — toggle this window");
        ui.label("F3 — toggle diagnostics");
    });
}

fn diagnostics_panel(
    mut contexts: EguiContexts,
    settings: Res<DriveSettings>,
    diagnostics: Res<DiagnosticsStore>,
    vehicle: Option<Res<Vehicle>>,
) {
    if !settings.show_diagnostics {
        return;
    }
    egui::Window::new("Diagnostics").show(contexts.ctx_mut(), |ui| {
        if let Some(fps) = diagnostics.get(&FrameTimeDiagnosticsPlugin::FPS) {
            if let Some(value) = fps.smoothed() {
                ui.label(format!("FPS: {value:.1}"));
            }
        }
        if let Some(vehicle) = vehicle {
            ui.label(format!("Speed: {:.1} m/s", vehicle.speed()));
            if let Some((position, _)) = vehicle.pose() {
                ui.label(format!(
                    "Chassis: ({:.1}, {:.1}, {:.1})",
                    position.x, position.y, position.z
                ));
            }
        }
    });
}
