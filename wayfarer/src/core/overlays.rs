use crate::core::avatar::Avatar;
use crate::core::level_loader::WorldRes;
use crate::core::nav::ActivePath;
use crate::core::system_sets::TickSysSet;
use crate::prelude::*;
use crate::settings::Settings;
use bevy::prelude::*;
use terracore::nav::path_grid::PATHGRID_SIZE;

/// Runtime diagnostic toggles. Seeded from settings, flipped with the
/// function keys, never persisted.
#[derive(Resource, Default)]
pub struct DebugFlags {
    pub path_overlay: bool,
    pub path_grid_overlay: bool,
    pub foot_ik: bool,
}

/// How far around the avatar the path-grid overlay reaches, in cells.
const GRID_OVERLAY_RADIUS: i32 = 12;

pub struct OverlaysPlugin {
    pub registered_by: &'static str,
}
impl_tracked_plugin!(OverlaysPlugin);

impl Plugin for OverlaysPlugin {
    fn build(&self, app: &mut App) {
        log_plugin_build(self);
        app.init_resource::<DebugFlags>()
            .add_systems(Startup, sys_seed_flags_from_settings)
            .add_systems(
                Update,
                (
                    sys_toggle_flags.in_set(TickSysSet::Input),
                    (sys_draw_path_overlay, sys_draw_path_grid_overlay)
                        .after(TickSysSet::Ik)
                        .run_if(in_state(AppState::InGame)),
                ),
            );
    }
}

fn sys_seed_flags_from_settings(settings: Res<Settings>, mut flags: ResMut<DebugFlags>) {
    flags.path_overlay = settings.debug.path_overlay;
    flags.path_grid_overlay = settings.debug.path_grid_overlay;
    flags.foot_ik = settings.debug.foot_ik;
}

fn sys_toggle_flags(keys: Res<ButtonInput<KeyCode>>, mut flags: ResMut<DebugFlags>) {
    let mut report = |name: &str, value: bool| {
        logger::one(
            LogSev::Info,
            LogAbout::Overlays,
            &format!("{name}: {}.", if value { "on" } else { "off" }),
        );
    };
    if keys.just_pressed(KeyCode::F1) {
        flags.path_overlay = !flags.path_overlay;
        report("Path overlay", flags.path_overlay);
    }
    if keys.just_pressed(KeyCode::F2) {
        flags.path_grid_overlay = !flags.path_grid_overlay;
        report("Path-grid overlay", flags.path_grid_overlay);
    }
    if keys.just_pressed(KeyCode::F3) {
        flags.foot_ik = !flags.foot_ik;
        report("Foot IK", flags.foot_ik);
    }
}

/// Gizmo polyline over the route the avatar is following.
fn sys_draw_path_overlay(flags: Res<DebugFlags>, active: Res<ActivePath>, mut gizmos: Gizmos) {
    if !flags.path_overlay {
        return;
    }
    let Some(path) = &active.path else {
        return;
    };
    let lift = Vec3::Y * 0.1;
    for pair in path.waypoints.windows(2) {
        gizmos.line(
            pair[0].to_bevy() + lift,
            pair[1].to_bevy() + lift,
            Color::srgb(1.0, 0.85, 0.1),
        );
    }
    for p in &path.waypoints {
        gizmos.sphere(p.to_bevy() + lift, 0.12, Color::srgb(1.0, 0.4, 0.1));
    }
}

/// Walkability cells of the chunk under the avatar, drawn as flat
/// rectangles around it. Green walkable, red blocked.
fn sys_draw_path_grid_overlay(
    flags: Res<DebugFlags>,
    world: Res<WorldRes>,
    avatars: Query<&Transform, With<Avatar>>,
    mut gizmos: Gizmos,
) {
    if !flags.path_grid_overlay {
        return;
    }
    let Ok(avatar) = avatars.single() else {
        return;
    };
    let pos = avatar.translation;
    let Some(chunk) = world.0.chunk_at(pos.x, pos.z) else {
        return;
    };

    let cell = chunk.world_size() / PATHGRID_SIZE as f32;
    let (off_x, off_z) = chunk.offset();
    let grid = chunk.path_grid();
    let avatar_cx = ((pos.x - off_x) / cell) as i32;
    let avatar_cz = ((pos.z - off_z) / cell) as i32;

    for dz in -GRID_OVERLAY_RADIUS..=GRID_OVERLAY_RADIUS {
        for dx in -GRID_OVERLAY_RADIUS..=GRID_OVERLAY_RADIUS {
            let (cx, cz) = (avatar_cx + dx, avatar_cz + dz);
            if cx < 0 || cz < 0 || cx >= PATHGRID_SIZE as i32 || cz >= PATHGRID_SIZE as i32 {
                continue;
            }
            let color = if grid.is_walkable(cx as usize, cz as usize) {
                Color::srgba(0.2, 0.9, 0.2, 0.4)
            } else {
                Color::srgba(0.95, 0.15, 0.15, 0.6)
            };
            let center_x = off_x + (cx as f32 + 0.5) * cell;
            let center_z = off_z + (cz as f32 + 0.5) * cell;
            let y = world.0.height_at(center_x, center_z) + 0.05;
            gizmos.rect(
                Isometry3d::new(
                    Vec3::new(center_x, y, center_z),
                    Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                ),
                Vec2::splat(cell * 0.9),
                color,
            );
        }
    }
}
