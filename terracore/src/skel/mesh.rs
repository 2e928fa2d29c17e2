use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use bytemuck::{Pod, Zeroable};

use crate::errors::AssetError;

const MAGIC: &[u8; 4] = b"SMSH";
const MAX_VERTICES: i32 = 1 << 20;
const MAX_INDICES: i32 = 3 << 20;

/// One skinned vertex as stored in the SMSH file; `Pod` so the renderer
/// can upload the vertex array without repacking.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SkinnedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub bone_ids: [i32; 4],
    pub bone_weights: [f32; 4],
}

/// A skinned mesh asset. Bone weights are passed through as stored;
/// normalizing sloppy weights is the renderer's problem, not the loader's.
pub struct SkinnedMesh {
    pub vertices: Vec<SkinnedVertex>,
    pub indices: Vec<u16>,
}

impl SkinnedMesh {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let file = File::open(path).map_err(|e| AssetError::from_open(e, path))?;
        Self::read_from(&mut BufReader::new(file))
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, AssetError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(AssetError::malformed(format!(
                "skinned mesh magic is {magic:02x?}, expected \"SMSH\""
            )));
        }

        let vertex_count = r.read_i32::<LittleEndian>()?;
        let index_count = r.read_i32::<LittleEndian>()?;
        if vertex_count <= 0 || vertex_count > MAX_VERTICES {
            return Err(AssetError::malformed(format!(
                "vertex count {vertex_count} outside 1..={MAX_VERTICES}"
            )));
        }
        if index_count <= 0 || index_count > MAX_INDICES {
            return Err(AssetError::malformed(format!(
                "index count {index_count} outside 1..={MAX_INDICES}"
            )));
        }

        let mut vertices = Vec::with_capacity(vertex_count as usize);
        for _ in 0..vertex_count {
            let mut v = SkinnedVertex::zeroed();
            for slot in &mut v.position {
                *slot = r.read_f32::<LittleEndian>()?;
            }
            for slot in &mut v.normal {
                *slot = r.read_f32::<LittleEndian>()?;
            }
            for slot in &mut v.uv {
                *slot = r.read_f32::<LittleEndian>()?;
            }
            for slot in &mut v.bone_ids {
                *slot = r.read_i32::<LittleEndian>()?;
            }
            for slot in &mut v.bone_weights {
                *slot = r.read_f32::<LittleEndian>()?;
            }
            vertices.push(v);
        }

        let mut indices = Vec::with_capacity(index_count as usize);
        for _ in 0..index_count {
            let idx = r.read_u16::<LittleEndian>()?;
            if idx as i32 >= vertex_count {
                return Err(AssetError::malformed(format!(
                    "index {idx} out of range for {vertex_count} vertices"
                )));
            }
            indices.push(idx);
        }

        Ok(Self { vertices, indices })
    }
}
