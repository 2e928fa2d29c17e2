use crate::core::constants::CHUNK_MESH_QUADS;
use crate::core::level_loader::WorldRes;
use crate::core::system_sets::StartupSysSet;
use crate::prelude::*;
use bevy::{
    prelude::*,
    render::{
        mesh::{Indices, PrimitiveTopology},
        render_asset::RenderAssetUsages,
    },
};
use std::collections::HashSet;
use terracore::terrain::HeightField;

/// Marker tying a rendered mesh entity back to its terrain chunk slot.
#[derive(Component)]
pub struct TerrainChunkMesh {
    pub ix: i32,
    pub iz: i32,
}

pub struct TerrainRenderPlugin {
    pub registered_by: &'static str,
}
impl_tracked_plugin!(TerrainRenderPlugin);

impl Plugin for TerrainRenderPlugin {
    fn build(&self, app: &mut App) {
        log_plugin_build(self);
        app.add_systems(
            Startup,
            sys_spawn_chunk_meshes.in_set(StartupSysSet::SetupScene),
        )
        .add_systems(
            Update,
            sys_sync_chunk_visibility.run_if(in_state(AppState::InGame)),
        );
    }
}

/// One grid mesh per loaded chunk, sampled from the heightfield. Geometry
/// is local to the chunk; the transform carries the world offset.
fn sys_spawn_chunk_meshes(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    world: Res<WorldRes>,
) {
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.45, 0.55, 0.35),
        perceptual_roughness: 0.95,
        ..default()
    });

    let mut spawned = 0usize;
    for iz in 0..world.0.chunks_z() {
        for ix in 0..world.0.chunks_x() {
            let Some(chunk) = world.0.chunk(ix, iz) else {
                continue;
            };
            let mesh = meshes.add(build_chunk_mesh(chunk));
            let (off_x, off_z) = chunk.offset();
            commands.spawn((
                TerrainChunkMesh { ix, iz },
                Mesh3d(mesh),
                MeshMaterial3d(material.clone()),
                Transform::from_xyz(off_x, 0.0, off_z),
            ));
            spawned += 1;
        }
    }
    logger::one(
        LogSev::Info,
        LogAbout::Renderer,
        &format!("Spawned {spawned} terrain chunk meshes."),
    );
}

fn build_chunk_mesh(chunk: &HeightField) -> Mesh {
    let quads = CHUNK_MESH_QUADS as usize;
    let grid = quads + 1;
    let size = chunk.world_size();
    let (off_x, off_z) = chunk.offset();
    let step = size / quads as f32;

    let mut positions = Vec::with_capacity(grid * grid);
    let mut normals = Vec::with_capacity(grid * grid);
    let mut uvs = Vec::with_capacity(grid * grid);
    for vz in 0..grid {
        for vx in 0..grid {
            let lx = (vx as f32 * step).min(size - 1e-3);
            let lz = (vz as f32 * step).min(size - 1e-3);
            let h = chunk.height_at(off_x + lx, off_z + lz);
            let n = chunk.normal_at(off_x + lx, off_z + lz);
            positions.push([lx, h, lz]);
            normals.push([n.x, n.y, n.z]);
            uvs.push([vx as f32 / quads as f32, vz as f32 / quads as f32]);
        }
    }

    let mut indices = Vec::with_capacity(quads * quads * 6);
    for tz in 0..quads {
        for tx in 0..quads {
            let i0 = (tz * grid + tx) as u32;
            let i1 = i0 + 1;
            let i2 = i0 + grid as u32 + 1;
            let i3 = i0 + grid as u32;
            // Counter-clockwise winding so the normals face up.
            indices.extend([i0, i2, i1, i0, i3, i2]);
        }
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::MAIN_WORLD | RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Drive per-chunk visibility from the core's frustum culling instead of
/// leaving every chunk to Bevy's own pass.
fn sys_sync_chunk_visibility(
    world: Res<WorldRes>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    mut chunks: Query<(&TerrainChunkMesh, &mut Visibility)>,
) {
    let Ok((camera, cam_transform)) = cameras.single() else {
        return;
    };
    let view = cam_transform.compute_matrix().inverse();
    let view_proj = (camera.clip_from_view() * view).to_core();

    let mut visible: HashSet<(i32, i32)> = HashSet::new();
    world.0.visible_chunks(&view_proj, |idx, _| {
        visible.insert(idx);
    });

    for (chunk, mut visibility) in chunks.iter_mut() {
        *visibility = if visible.contains(&(chunk.ix, chunk.iz)) {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}
