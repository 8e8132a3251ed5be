use bevy::prelude::*;

#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AppState {
    #[default]
    Loading,
    Driving,
}

/// Sent once when the physics ground can be created.
#[derive(Event, Default)]
pub struct SpawnGround;

/// Sent once when both physics and assets are ready.
#[derive(Event, Default)]
pub struct SpawnVehicle;

/// Actions a readiness notification unlocked. Each is produced at most once
/// over the gate's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateActions {
    pub create_ground: bool,
    pub spawn_vehicle: bool,
}

/// Join point for the two startup signals the world depends on.
///
/// The physics world and the asset pipeline finish initializing in whatever
/// order the platform delivers; the ground only needs physics, the vehicle
/// needs both. Both entry points are idempotent, so callers may re-notify
/// every frame without triggering a second spawn.
#[derive(Resource, Debug, Default)]
pub struct ReadinessGate {
    physics_ready: bool,
    assets_loaded: bool,
    ground_created: bool,
    vehicle_spawned: bool,
}

impl ReadinessGate {
    pub fn on_physics_ready(&mut self) -> GateActions {
        self.physics_ready = true;
        self.evaluate()
    }

    pub fn on_assets_ready(&mut self) -> GateActions {
        self.assets_loaded = true;
        self.evaluate()
    }

    fn evaluate(&mut self) -> GateActions {
        let mut actions = GateActions::default();
        // A static ground does not depend on the vehicle asset.
        if self.physics_ready && !self.ground_created {
            self.ground_created = true;
            actions.create_ground = true;
        }
        if self.physics_ready && self.assets_loaded && !self.vehicle_spawned {
            self.vehicle_spawned = true;
            actions.spawn_vehicle = true;
        }
        actions
    }

    pub fn vehicle_spawned(&self) -> bool {
        self.vehicle_spawned
    }
}

/// Forwards gate actions as events so the spawn systems stay decoupled from
/// whichever signal arrived last.
pub fn dispatch_actions(
    actions: GateActions,
    ground_ev: &mut EventWriter<SpawnGround>,
    vehicle_ev: &mut EventWriter<SpawnVehicle>,
) {
    if actions.create_ground {
        ground_ev.send(SpawnGround);
    }
    if actions.spawn_vehicle {
        vehicle_ev.send(SpawnVehicle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physics_first_then_assets() {
        let mut gate = ReadinessGate::default();

        let first = gate.on_physics_ready();
        assert!(first.create_ground);
        assert!(!first.spawn_vehicle);

        let second = gate.on_assets_ready();
        assert!(!second.create_ground);
        assert!(second.spawn_vehicle);
        assert!(gate.vehicle_spawned());
    }

    #[test]
    fn assets_first_then_physics() {
        let mut gate = ReadinessGate::default();

        let first = gate.on_assets_ready();
        assert_eq!(first, GateActions::default());
        assert!(!gate.vehicle_spawned());

        let second = gate.on_physics_ready();
        assert!(second.create_ground);
        assert!(second.spawn_vehicle);
        assert!(gate.vehicle_spawned());
    }

    #[test]
    fn duplicate_signals_fire_nothing() {
        let mut gate = ReadinessGate::default();
        gate.on_physics_ready();
        gate.on_assets_ready();

        assert_eq!(gate.on_physics_ready(), GateActions::default());
        assert_eq!(gate.on_assets_ready(), GateActions::default());
        assert_eq!(gate.on_assets_ready(), GateActions::default());
        assert!(gate.vehicle_spawned());
    }

    #[test]
    fn ground_is_created_once_even_when_renotified() {
        let mut gate = ReadinessGate::default();
        assert!(gate.on_physics_ready().create_ground);
        assert!(!gate.on_physics_ready().create_ground);
        // Assets arriving later must not re-create the ground either.
        assert!(!gate.on_assets_ready().create_ground);
    }

    #[test]
    fn assets_alone_spawn_nothing() {
        let mut gate = ReadinessGate::default();
        gate.on_assets_ready();
        gate.on_assets_ready();
        assert!(!gate.vehicle_spawned());
    }
}
