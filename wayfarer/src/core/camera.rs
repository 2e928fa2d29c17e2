use crate::core::avatar::Avatar;
use crate::core::system_sets::{StartupSysSet, TickSysSet};
use crate::prelude::*;
use bevy::prelude::*;

#[derive(Component)]
struct FollowCamera;
impl FollowCamera {
    const BASE_OFFSET_FROM_AVATAR: Vec3 = Vec3::new(0.0, 14.0, 10.0);
    const SMOOTHING: f32 = 6.0;
}

pub struct CameraPlugin {
    pub registered_by: &'static str,
}
impl_tracked_plugin!(CameraPlugin);

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        log_plugin_build(self);
        app.add_systems(Startup, sys_setup_cam.in_set(StartupSysSet::SetupScene))
            .add_systems(Update, sys_follow_avatar.after(TickSysSet::Ik));
    }
}

fn sys_setup_cam(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        FollowCamera,
        Transform::from_translation(FollowCamera::BASE_OFFSET_FROM_AVATAR)
            .looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // One sun is plenty; terrain shading detail comes from the normals.
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            illuminance: 8000.0,
            ..default()
        },
        Transform::from_xyz(30.0, 60.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    logger::one(LogSev::Debug, LogAbout::Camera, "Follow camera spawned.");
}

/// Exponential chase toward the avatar-relative anchor; runs after the
/// tick sets so it sees the avatar's final position for the frame.
fn sys_follow_avatar(
    time: Res<Time>,
    avatars: Query<&Transform, (With<Avatar>, Without<FollowCamera>)>,
    mut cameras: Query<&mut Transform, With<FollowCamera>>,
) {
    let Ok(avatar) = avatars.single() else {
        return;
    };
    let Ok(mut cam) = cameras.single_mut() else {
        return;
    };

    let anchor = avatar.translation + FollowCamera::BASE_OFFSET_FROM_AVATAR;
    let t = (FollowCamera::SMOOTHING * time.delta_secs()).min(1.0);
    cam.translation = cam.translation.lerp(anchor, t);
    cam.look_at(avatar.translation, Vec3::Y);
}
