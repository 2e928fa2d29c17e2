use crate::core::constants::{
    ANIM_BLEND_SECONDS, AVATAR_GROUND_OFFSET, AVATAR_START_XZ, FOOT_IK_WEIGHT,
};
use crate::core::level_loader::{SkeletonRes, WorldRes};
use crate::core::overlays::DebugFlags;
use crate::core::system_sets::{StartupSysSet, TickSysSet};
use crate::prelude::*;
use crate::settings::Settings;
use bevy::prelude::*;
use terracore::skel::{Animator, TwoBoneIK};

/// Bone names the rig looks for; a missing chain just disables that leg's
/// IK instead of failing the spawn.
const LEFT_LEG_BONES: [&str; 3] = ["hip.L", "knee.L", "foot.L"];
const RIGHT_LEG_BONES: [&str; 3] = ["hip.R", "knee.R", "foot.R"];

#[derive(Component)]
pub struct Avatar {
    pub speed: f32,
    pub grounded_offset: f32,
    pub moving: bool,
}

/// The skeletal runtime state riding on the avatar entity. The matrix
/// palette in `animator` is what a skinned renderer consumes after the Ik
/// set has run.
#[derive(Component)]
pub struct AvatarRig {
    pub animator: Animator,
    pub left_leg: Option<TwoBoneIK>,
    pub right_leg: Option<TwoBoneIK>,
}

pub struct AvatarPlugin {
    pub registered_by: &'static str,
}
impl_tracked_plugin!(AvatarPlugin);
impl Plugin for AvatarPlugin {
    fn build(&self, app: &mut App) {
        log_plugin_build(self);
        app.add_systems(Startup, sys_spawn_avatar.in_set(StartupSysSet::SetupScene))
            .add_systems(
                Update,
                (
                    sys_animate.in_set(TickSysSet::Animate),
                    sys_foot_ik.in_set(TickSysSet::Ik),
                ),
            );
    }
}

fn leg_chain(skeleton: &terracore::skel::Skeleton, names: [&str; 3]) -> Option<TwoBoneIK> {
    let hip = skeleton.bone_index(names[0])?;
    let knee = skeleton.bone_index(names[1])?;
    let foot = skeleton.bone_index(names[2])?;
    Some(TwoBoneIK::new(skeleton, hip, knee, foot))
}

fn sys_spawn_avatar(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    world: Res<WorldRes>,
    skeleton: Res<SkeletonRes>,
    settings: Res<Settings>,
) {
    let (x, z) = AVATAR_START_XZ;
    let ground = world.0.height_at(x, z);
    let animator = Animator::new(&skeleton.0);

    let left_leg = leg_chain(&skeleton.0, LEFT_LEG_BONES);
    let right_leg = leg_chain(&skeleton.0, RIGHT_LEG_BONES);
    if left_leg.is_none() || right_leg.is_none() {
        logger::one(
            LogSev::Warn,
            LogAbout::Skeletal,
            "Leg bone chains not found; foot IK disabled for the missing side(s).",
        );
    }

    // Placeholder capsule: the skinned renderer is a collaborator, the
    // palette is still computed every frame for it.
    let mesh = meshes.add(Capsule3d::new(0.35, 1.0));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb_u8(170, 120, 80),
        ..default()
    });

    commands.spawn((
        Mesh3d(mesh),
        MeshMaterial3d(material),
        Transform::from_xyz(x, ground + AVATAR_GROUND_OFFSET, z),
        Avatar {
            speed: settings.input.move_speed,
            grounded_offset: AVATAR_GROUND_OFFSET,
            moving: false,
        },
        AvatarRig {
            animator,
            left_leg,
            right_leg,
        },
    ));
    logger::one(
        LogSev::Info,
        LogAbout::Avatar,
        &format!("Avatar spawned at ({x}, {ground:.2}, {z})."),
    );
}

/// Pick Idle/Walk from the movement state and advance the animator.
fn sys_animate(
    time: Res<Time>,
    skeleton: Res<SkeletonRes>,
    mut rigs: Query<(&Avatar, &mut AvatarRig)>,
) {
    for (avatar, mut rig) in rigs.iter_mut() {
        let wanted = if avatar.moving { "Walk" } else { "Idle" };
        rig.animator
            .play_by_name(&skeleton.0, wanted, ANIM_BLEND_SECONDS);
        rig.animator.advance(&skeleton.0, time.delta_secs());
    }
}

/// Plant each foot on the terrain under it. Runs strictly after the
/// animator so the solve reads this frame's globals, not last frame's.
fn sys_foot_ik(
    world: Res<WorldRes>,
    skeleton: Res<SkeletonRes>,
    flags: Res<DebugFlags>,
    mut rigs: Query<(&Transform, &mut AvatarRig)>,
) {
    if !flags.foot_ik {
        return;
    }
    for (transform, mut rig) in rigs.iter_mut() {
        let model = transform.compute_matrix().to_core();
        let AvatarRig {
            animator,
            left_leg,
            right_leg,
        } = &mut *rig;

        for leg in [left_leg, right_leg].into_iter().flatten() {
            // Where the animation put this foot, in world space.
            let foot_model = animator.global(leg.foot()).w_axis;
            let foot_world = model.transform_point3(glam::Vec3::new(
                foot_model.x,
                foot_model.y,
                foot_model.z,
            ));

            // Plant it on the terrain right under it.
            let ground = world.0.height_at(foot_world.x, foot_world.z);
            let target = glam::Vec3::new(foot_world.x, ground, foot_world.z);

            leg.set_target_world(target, &model);
            leg.apply(&skeleton.0, animator, FOOT_IK_WEIGHT);
        }
    }
}
