//! Export one decompressed geometry asset as a Wavefront OBJ file.
//!
//! Run: `cargo run -p dk64 --features tools --bin extract_obj -- <asset.bin> [out.obj]`
//!
//! Set `RUST_LOG=debug` to see how each display list was resolved.

use std::env;
use std::fs;
use std::path::PathBuf;

use dk64::{GeometryAsset, ObjOptions, to_obj};
use dk64_decode::BuildLimits;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        eprintln!("usage: extract_obj <asset.bin> [out.obj]");
        std::process::exit(2);
    };
    let output = args
        .next()
        .map_or_else(|| input.with_extension("obj"), PathBuf::from);

    let asset = GeometryAsset::new(fs::read(&input)?);
    let decoded = asset.decode(BuildLimits::default())?;

    if let Some(target) = decoded.points_to {
        println!("{} points to table entry {target}; nothing to export", input.display());
        return Ok(());
    }

    fs::write(&output, to_obj(&decoded, ObjOptions::default()))?;

    let skipped: usize = decoded.meshes.iter().map(|(_, mesh)| mesh.skipped.len()).sum();
    println!(
        "Wrote {} vertices, {} triangles from {} display lists to {}",
        decoded.vertex_count(),
        decoded.triangle_count(),
        decoded.meshes.len(),
        output.display()
    );
    if skipped > 0 {
        println!("Skipped {skipped} vertex groups that did not fit their window");
    }

    Ok(())
}
