//! Offline heightmap baker.
//!
//! Usage: bake_heightmap <input.obj> <output.png> [resolution] [world_size]

use std::path::Path;
use std::process::ExitCode;

use terracore::bake::{bake_to_png, BakeParams, TriangleSoup};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || args.len() > 5 {
        eprintln!("Usage: {} <input.obj> <output.png> [resolution] [world_size]", args[0]);
        return ExitCode::FAILURE;
    }

    let mut params = BakeParams::default();
    if let Some(res) = args.get(3) {
        params.resolution = match res.parse() {
            Ok(v) if v >= 2 => v,
            _ => {
                eprintln!("Bad resolution '{res}'.");
                return ExitCode::FAILURE;
            }
        };
    }
    if let Some(size) = args.get(4) {
        params.world_size = match size.parse() {
            Ok(v) if v > 0.0 => v,
            _ => {
                eprintln!("Bad world size '{size}'.");
                return ExitCode::FAILURE;
            }
        };
    }

    let mesh = match TriangleSoup::load_obj(Path::new(&args[1])) {
        Ok(mesh) => mesh,
        Err(err) => {
            eprintln!("Failed to read '{}': {err}", args[1]);
            return ExitCode::FAILURE;
        }
    };
    println!(
        "Loaded {} vertices, {} triangles from '{}'.",
        mesh.positions.len(),
        mesh.triangles.len(),
        args[1]
    );

    if let Err(err) = bake_to_png(&mesh, params, Path::new(&args[2])) {
        eprintln!("Bake failed: {err}");
        return ExitCode::FAILURE;
    }
    println!(
        "Wrote {0}x{0} 16-bit heightmap to '{1}'.",
        params.resolution, args[2]
    );
    ExitCode::SUCCESS
}
