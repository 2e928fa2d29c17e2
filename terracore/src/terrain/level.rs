use std::path::{Path, PathBuf};

use log::warn;

use crate::errors::AssetError;
use super::height_field::HeightField;
use super::world::ChunkedWorld;

/// One chunk record from a level descriptor. Indices are the signed,
/// centered indices as written in the file; `prop_mesh` is the render prop
/// geometry for the client and is not interpreted here.
#[derive(Clone, Debug)]
pub struct ChunkRecord {
    pub ix: i32,
    pub iz: i32,
    pub prop_mesh: PathBuf,
    pub heightmap: PathBuf,
    pub walkmask: Option<PathBuf>,
}

/// Parsed level descriptor. Header keys are order-free; `#` and blank
/// lines are ignored.
#[derive(Clone, Debug)]
pub struct LevelDescriptor {
    pub chunks_x: i32,
    pub chunks_z: i32,
    pub chunk_size: f32,
    pub records: Vec<ChunkRecord>,
}

impl LevelDescriptor {
    /// Chunk indices in the descriptor are centered: for `chunks_x = 4`
    /// they run over {-2, -1, 0, 1}. This maps them onto 0-based grid
    /// slots.
    #[inline(always)]
    pub fn slot_of(&self, ix: i32, iz: i32) -> (i32, i32) {
        (ix + self.chunks_x / 2, iz + self.chunks_z / 2)
    }

    /// World min-corner of grid slot (0, 0).
    #[inline(always)]
    pub fn world_origin(&self) -> (f32, f32) {
        (
            -(self.chunks_x / 2) as f32 * self.chunk_size,
            -(self.chunks_z / 2) as f32 * self.chunk_size,
        )
    }

    pub fn parse(text: &str) -> Result<Self, AssetError> {
        let mut chunks_x: Option<i32> = None;
        let mut chunks_z: Option<i32> = None;
        let mut chunk_size: Option<f32> = None;
        let mut records = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let first = tokens.next().unwrap();

            let parse_err = |what: &str| {
                AssetError::malformed(format!(
                    "level descriptor line {}: bad {what}: '{line}'",
                    line_no + 1
                ))
            };

            match first {
                "chunks_x" => {
                    let v = tokens.next().ok_or_else(|| parse_err("chunks_x"))?;
                    chunks_x = Some(v.parse().map_err(|_| parse_err("chunks_x"))?);
                }
                "chunks_z" => {
                    let v = tokens.next().ok_or_else(|| parse_err("chunks_z"))?;
                    chunks_z = Some(v.parse().map_err(|_| parse_err("chunks_z"))?);
                }
                "chunk_size" => {
                    let v = tokens.next().ok_or_else(|| parse_err("chunk_size"))?;
                    chunk_size = Some(v.parse().map_err(|_| parse_err("chunk_size"))?);
                }
                ix_token => {
                    // Chunk record: <ix> <iz> <obj> <heightmap> [walkmask]
                    let ix: i32 = ix_token.parse().map_err(|_| parse_err("chunk index"))?;
                    let iz: i32 = tokens
                        .next()
                        .ok_or_else(|| parse_err("chunk record"))?
                        .parse()
                        .map_err(|_| parse_err("chunk index"))?;
                    let prop_mesh = tokens.next().ok_or_else(|| parse_err("chunk record"))?;
                    let heightmap = tokens.next().ok_or_else(|| parse_err("chunk record"))?;
                    let walkmask = tokens.next();
                    records.push(ChunkRecord {
                        ix,
                        iz,
                        prop_mesh: PathBuf::from(prop_mesh),
                        heightmap: PathBuf::from(heightmap),
                        walkmask: walkmask.map(PathBuf::from),
                    });
                }
            }
        }

        let chunks_x =
            chunks_x.ok_or_else(|| AssetError::malformed("level descriptor: missing chunks_x"))?;
        let chunks_z =
            chunks_z.ok_or_else(|| AssetError::malformed("level descriptor: missing chunks_z"))?;
        let chunk_size =
            chunk_size.ok_or_else(|| AssetError::malformed("level descriptor: missing chunk_size"))?;
        if chunks_x <= 0 || chunks_z <= 0 {
            return Err(AssetError::malformed(format!(
                "level descriptor: bad grid {chunks_x}x{chunks_z}"
            )));
        }
        if chunk_size <= 0.0 {
            return Err(AssetError::malformed(format!(
                "level descriptor: bad chunk_size {chunk_size}"
            )));
        }

        let descriptor = Self {
            chunks_x,
            chunks_z,
            chunk_size,
            records,
        };
        for rec in &descriptor.records {
            let (sx, sz) = descriptor.slot_of(rec.ix, rec.iz);
            if sx < 0 || sx >= chunks_x || sz < 0 || sz >= chunks_z {
                return Err(AssetError::malformed(format!(
                    "level descriptor: chunk index ({}, {}) outside {chunks_x}x{chunks_z} grid",
                    rec.ix, rec.iz
                )));
            }
        }
        Ok(descriptor)
    }
}

/// A loaded level: the terrain world plus the parsed descriptor (the client
/// still needs the per-chunk prop mesh paths).
pub struct LoadedLevel {
    pub world: ChunkedWorld,
    pub descriptor: LevelDescriptor,
}

impl ChunkedWorld {
    /// Load just the terrain world from a level descriptor. Unload is
    /// dropping the value.
    pub fn load(descriptor_path: &Path) -> Result<Self, AssetError> {
        Ok(load_level(descriptor_path)?.world)
    }
}

/// Load a level descriptor and every chunk it names. Descriptor problems
/// abort the load; a single chunk whose images are missing or malformed is
/// logged and left as a hole, which the data model allows.
pub fn load_level(descriptor_path: &Path) -> Result<LoadedLevel, AssetError> {
    let text = std::fs::read_to_string(descriptor_path)
        .map_err(|e| AssetError::from_open(e, descriptor_path))?;
    let descriptor = LevelDescriptor::parse(&text)?;
    let base_dir = descriptor_path.parent().unwrap_or(Path::new("."));

    let (origin_x, origin_z) = descriptor.world_origin();
    let mut world = ChunkedWorld::new(
        descriptor.chunks_x,
        descriptor.chunks_z,
        descriptor.chunk_size,
        origin_x,
        origin_z,
    );

    for rec in &descriptor.records {
        let (sx, sz) = descriptor.slot_of(rec.ix, rec.iz);
        let (off_x, off_z) = world.slot_origin(sx, sz);
        match load_chunk(base_dir, rec, descriptor.chunk_size, off_x, off_z) {
            Ok(chunk) => world.insert_chunk(sx, sz, chunk),
            Err(err) => {
                warn!(
                    "chunk ({}, {}) failed to load, leaving a hole: {err}",
                    rec.ix, rec.iz
                );
            }
        }
    }

    Ok(LoadedLevel { world, descriptor })
}

fn load_chunk(
    base_dir: &Path,
    rec: &ChunkRecord,
    chunk_size: f32,
    off_x: f32,
    off_z: f32,
) -> Result<HeightField, AssetError> {
    let hm_path = base_dir.join(&rec.heightmap);
    let hm = image::open(&hm_path)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => AssetError::from_open(io, &hm_path),
            other => AssetError::malformed(format!("heightmap '{}': {other}", hm_path.display())),
        })?
        .to_luma16();

    let mask = match &rec.walkmask {
        Some(rel) => {
            let mask_path = base_dir.join(rel);
            let img = image::open(&mask_path)
                .map_err(|e| match e {
                    image::ImageError::IoError(io) => AssetError::from_open(io, &mask_path),
                    other => {
                        AssetError::malformed(format!("walkmask '{}': {other}", mask_path.display()))
                    }
                })?
                .to_luma8();
            Some(img)
        }
        None => None,
    };

    HeightField::from_images(&hm, mask.as_ref(), chunk_size, off_x, off_z)
}
