use crate::core::system_sets::StartupSysSet;
use crate::prelude::*;
use crate::settings::Settings;
use bevy::prelude::*;
use std::sync::Arc;
use terracore::skel::{Skeleton, SkinnedMesh};
use terracore::terrain::level::{load_level, LevelDescriptor};
use terracore::terrain::ChunkedWorld;

/// The loaded terrain world. Shared and immutable after load; the planner
/// and the avatar borrow it, nobody owns it twice.
#[derive(Resource)]
pub struct WorldRes(pub Arc<ChunkedWorld>);

#[derive(Resource)]
pub struct LevelInfoRes(pub Arc<LevelDescriptor>);

#[derive(Resource)]
pub struct SkeletonRes(pub Arc<Skeleton>);

#[derive(Resource)]
pub struct SkinnedMeshRes(pub Arc<SkinnedMesh>);

pub struct LevelPlugin {
    pub registered_by: &'static str,
}
impl_tracked_plugin!(LevelPlugin);
impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        log_plugin_build(self);
        app.add_systems(
            Startup,
            sys_load_level_assets.in_set(StartupSysSet::LoadAssets),
        );
    }
}

pub fn sys_load_level_assets(mut commands: Commands, settings: Res<Settings>) {
    let lg = |text: &str| logger::one(LogSev::Info, LogAbout::Level, text);

    lg(&format!(
        "Loading level descriptor '{}'...",
        settings.paths.level.display()
    ));
    let level = load_level(&settings.paths.level).expect("Error loading the level");
    lg(&format!(
        "Level is {}x{} chunks of {} m; {} chunk records.",
        level.descriptor.chunks_x,
        level.descriptor.chunks_z,
        level.descriptor.chunk_size,
        level.descriptor.records.len()
    ));

    lg("Loading avatar skeleton...");
    let skeleton = Skeleton::load(&settings.paths.skeleton).expect("Error loading the skeleton");
    lg(&format!(
        "Skeleton has {} bones, {} animations.",
        skeleton.bones.len(),
        skeleton.animations.len()
    ));

    lg("Loading avatar skinned mesh...");
    let mesh =
        SkinnedMesh::load(&settings.paths.skinned_mesh).expect("Error loading the skinned mesh");
    lg(&format!(
        "Skinned mesh has {} vertices, {} indices.",
        mesh.vertices.len(),
        mesh.indices.len()
    ));

    commands.insert_resource(WorldRes(Arc::new(level.world)));
    commands.insert_resource(LevelInfoRes(Arc::new(level.descriptor)));
    commands.insert_resource(SkeletonRes(Arc::new(skeleton)));
    commands.insert_resource(SkinnedMeshRes(Arc::new(mesh)));
    lg("Done loading level assets.");
}
