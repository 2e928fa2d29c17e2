use crate::core::avatar::Avatar;
use crate::core::constants::WAYPOINT_REACH_DISTANCE;
use crate::core::level_loader::WorldRes;
use crate::core::system_sets::TickSysSet;
use crate::prelude::*;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use terracore::errors::PlanError;
use terracore::nav::{Path as NavPath, WindowPlanner};

/// The planner and its scratch buffers: one per process, exclusive to the
/// planning system.
#[derive(Resource, Default)]
pub struct PlannerRes(pub WindowPlanner);

/// The route the avatar is currently following. Replacing it IS the
/// cancellation model: a new request drops the old path.
#[derive(Resource, Default)]
pub struct ActivePath {
    pub path: Option<NavPath>,
    pub next_waypoint: usize,
}

#[derive(Resource, Default)]
pub struct MoveRequest(pub Option<Vec3>);

/// One log line per failure class per level; planning failures repeat
/// every tick the player clicks somewhere bad, the log should not.
#[derive(Resource, Default)]
struct ReportedPlanFailures {
    blocked: bool,
    no_route: bool,
    capacity: bool,
}

pub struct NavPlugin {
    pub registered_by: &'static str,
}
impl_tracked_plugin!(NavPlugin);
impl Plugin for NavPlugin {
    fn build(&self, app: &mut App) {
        log_plugin_build(self);
        app.init_resource::<PlannerRes>()
            .init_resource::<ActivePath>()
            .init_resource::<MoveRequest>()
            .init_resource::<ReportedPlanFailures>()
            .add_systems(
                Update,
                (
                    sys_click_to_request.in_set(TickSysSet::Input),
                    sys_plan_requested_path.in_set(TickSysSet::Plan),
                    sys_follow_path.in_set(TickSysSet::Move),
                ),
            );
    }
}

/// On left click, cast the cursor into the world and bisect the ray
/// against the heightfield for the exact ground hit.
fn sys_click_to_request(
    windows: Query<&Window, With<PrimaryWindow>>,
    buttons: Res<ButtonInput<MouseButton>>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    world: Res<WorldRes>,
    mut request: ResMut<MoveRequest>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor_pos) = window.cursor_position() else {
        return;
    };
    let Ok((camera, cam_transform)) = cameras.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(cam_transform, cursor_pos) else {
        return;
    };

    let origin = ray.origin;
    let dir = Vec3::from(ray.direction);
    if dir.y.abs() < f32::EPSILON {
        return;
    }

    // Rough plane intersection at the terrain floor, then bisect between
    // camera and plane until the ray meets the sampled surface.
    let t_plane = (terracore::terrain::height_field::HEIGHT_MIN - origin.y) / dir.y;
    if t_plane <= 0.0 {
        return;
    }
    let mut t_low = 0.0;
    let mut t_high = t_plane;
    let mut hit = origin + dir * t_plane;
    for _ in 0..24 {
        let t_mid = (t_low + t_high) * 0.5;
        let p = origin + dir * t_mid;
        let ground = world.0.height_at(p.x, p.z);
        if p.y > ground {
            t_low = t_mid;
        } else {
            t_high = t_mid;
            hit = p;
        }
    }

    logger::one(
        LogSev::DebugVerbose,
        LogAbout::Input,
        &format!("Move request at ({:.2}, {:.2}).", hit.x, hit.z),
    );
    request.0 = Some(hit);
}

fn sys_plan_requested_path(
    world: Res<WorldRes>,
    mut planner: ResMut<PlannerRes>,
    mut request: ResMut<MoveRequest>,
    mut active: ResMut<ActivePath>,
    mut reported: ResMut<ReportedPlanFailures>,
    avatars: Query<&Transform, With<Avatar>>,
) {
    let Some(goal) = request.0.take() else {
        return;
    };
    let Ok(avatar_tf) = avatars.single() else {
        return;
    };

    let start = avatar_tf.translation;
    match planner
        .0
        .find_smoothed_path(&world.0, start.to_core(), goal.to_core())
    {
        Ok(path) => {
            logger::one(
                LogSev::Debug,
                LogAbout::Nav,
                &format!(
                    "Planned path: {} waypoints, {:.1} m.",
                    path.waypoints.len(),
                    path.length()
                ),
            );
            // Supersede whatever route was active.
            *active = ActivePath {
                path: Some(path),
                next_waypoint: 1,
            };
        }
        Err(err) => {
            let reported_flag = match err {
                PlanError::Blocked(_) => &mut reported.blocked,
                PlanError::NoRoute => &mut reported.no_route,
                PlanError::CapacityExceeded => &mut reported.capacity,
            };
            if !*reported_flag {
                *reported_flag = true;
                logger::one(
                    LogSev::Warn,
                    LogAbout::Nav,
                    &format!("Path request failed: {err}. (Reported once per level.)"),
                );
            }
        }
    }
}

/// Walk the avatar along the active polyline, snapped to the terrain.
fn sys_follow_path(
    time: Res<Time>,
    world: Res<WorldRes>,
    mut active: ResMut<ActivePath>,
    mut avatars: Query<(&mut Transform, &mut Avatar)>,
) {
    let Ok((mut transform, mut avatar)) = avatars.single_mut() else {
        return;
    };
    let Some(path) = &active.path else {
        avatar.moving = false;
        return;
    };

    if active.next_waypoint >= path.waypoints.len() {
        active.path = None;
        avatar.moving = false;
        return;
    }

    let target = path.waypoints[active.next_waypoint].to_bevy();
    let pos = transform.translation;
    let to_target = Vec2::new(target.x - pos.x, target.z - pos.z);
    let step = avatar.speed * time.delta_secs();

    if to_target.length() <= step.max(WAYPOINT_REACH_DISTANCE) {
        transform.translation.x = target.x;
        transform.translation.z = target.z;
        active.next_waypoint += 1;
    } else {
        let dir = to_target.normalize();
        transform.translation.x += dir.x * step;
        transform.translation.z += dir.y * step;
        // Face the walk direction.
        let yaw = f32::atan2(dir.x, dir.y);
        transform.rotation = Quat::from_rotation_y(yaw);
    }
    avatar.moving = true;

    let ground = world.0.height_at(transform.translation.x, transform.translation.z);
    transform.translation.y = ground + avatar.grounded_offset;
}
