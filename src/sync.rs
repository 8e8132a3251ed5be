use bevy::prelude::*;

use crate::physics::{BodyId, Physics};

/// Marks a visual whose transform mirrors a rigid body in the backend.
#[derive(Component)]
pub struct PhysicsBody(pub BodyId);

/// Direct 1:1 pose copy, no interpolation.
pub fn apply_pose(transform: &mut Transform, position: Vec3, rotation: Quat) {
    transform.translation = position;
    transform.rotation = rotation;
}

/// Copies every tracked body's authoritative pose onto its render node.
/// Bodies the backend no longer knows about are skipped.
pub fn sync_transforms(
    physics: Res<Physics>,
    mut bodies: Query<(&PhysicsBody, &mut Transform)>,
) {
    for (body, mut transform) in &mut bodies {
        if let Some((position, rotation)) = physics.0.read_transform(body.0) {
            apply_pose(&mut transform, position, rotation);
        }
    }
}
