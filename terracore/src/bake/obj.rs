use std::path::Path;

use glam::Vec3;

use crate::errors::AssetError;

/// Raw triangle geometry for the baker: positions plus index triples. No
/// normals, no UVs, no materials; the ray-cast wants surfaces, nothing
/// else.
pub struct TriangleSoup {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleSoup {
    pub fn load_obj(path: &Path) -> Result<Self, AssetError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| AssetError::from_open(e, path))?;
        Self::parse_obj(&text)
    }

    /// Minimal OBJ read: `v` lines accumulate positions, `f` lines
    /// fan-triangulate. Vertex references may be 1-based or negative
    /// (relative to the positions seen so far); `v/vt/vn` tokens use only
    /// the leading position index. Everything else is ignored.
    pub fn parse_obj(text: &str) -> Result<Self, AssetError> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut triangles: Vec<[u32; 3]> = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let mut tokens = line.split_whitespace();
            let parse_err = |what: &str| {
                AssetError::malformed(format!("obj line {}: {what}: '{line}'", line_no + 1))
            };

            match tokens.next() {
                Some("v") => {
                    let mut coords = [0f32; 3];
                    for c in &mut coords {
                        *c = tokens
                            .next()
                            .ok_or_else(|| parse_err("truncated vertex"))?
                            .parse()
                            .map_err(|_| parse_err("bad vertex coordinate"))?;
                    }
                    positions.push(Vec3::from_array(coords));
                }
                Some("f") => {
                    let mut face: Vec<u32> = Vec::with_capacity(4);
                    for token in tokens {
                        let index_part = token.split('/').next().unwrap_or(token);
                        let idx: i64 = index_part
                            .parse()
                            .map_err(|_| parse_err("bad face index"))?;
                        let resolved = if idx > 0 {
                            idx - 1
                        } else if idx < 0 {
                            positions.len() as i64 + idx
                        } else {
                            return Err(parse_err("face index 0"));
                        };
                        if resolved < 0 || resolved >= positions.len() as i64 {
                            return Err(parse_err("face index out of range"));
                        }
                        face.push(resolved as u32);
                    }
                    if face.len() < 3 {
                        return Err(parse_err("face with fewer than 3 vertices"));
                    }
                    for i in 2..face.len() {
                        triangles.push([face[0], face[i - 1], face[i]]);
                    }
                }
                _ => {} // comments, normals, uvs, groups, materials
            }
        }

        Ok(Self {
            positions,
            triangles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_fan_triangulates() {
        let soup = TriangleSoup::parse_obj(
            "v 0 0 0\nv 1 0 0\nv 1 0 1\nv 0 0 1\nf 1 2 3 4\n",
        )
        .unwrap();
        assert_eq!(soup.positions.len(), 4);
        assert_eq!(soup.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn negative_and_slashed_indices_resolve() {
        let soup = TriangleSoup::parse_obj(
            "v 0 0 0\nv 1 0 0\nv 0 0 1\nf -3/1/1 -2/2/2 -1/3/3\n",
        )
        .unwrap();
        assert_eq!(soup.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        let err = TriangleSoup::parse_obj("v 0 0 0\nf 1 2 3\n");
        assert!(matches!(err, Err(AssetError::Malformed(_))));
    }
}
