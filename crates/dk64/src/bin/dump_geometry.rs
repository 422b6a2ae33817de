//! Dump a JSON summary of a geometry table.
//!
//! Each argument is one decompressed table entry, in table order. The
//! summary lists every top-level display list with its window, vertex
//! pointer, opcode histogram and group sizes, so decodes can be diffed
//! across versions.
//!
//! Run: `cargo run -p dk64 --features tools --bin dump_geometry -- <entry>...`

use std::collections::BTreeMap;
use std::env;
use std::fs;

use dk64::{DecodedGeometry, GeometryTable};
use dk64_decode::BuildLimits;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: dump_geometry <entry>...");
        std::process::exit(2);
    }

    let entries = paths.iter().map(fs::read).collect::<Result<Vec<_>, _>>()?;
    let table = GeometryTable::new(entries);

    let assets: Vec<Value> = table
        .decode_all(BuildLimits::default())
        .into_iter()
        .zip(&paths)
        .enumerate()
        .map(|(index, (decoded, path))| match decoded {
            Ok(geometry) => summarize(index, path, &geometry),
            Err(err) => json!({ "index": index, "path": path, "error": err.to_string() }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json!({ "assets": assets }))?);
    Ok(())
}

fn summarize(index: usize, path: &str, geometry: &DecodedGeometry) -> Value {
    let lists: Vec<Value> = geometry
        .meshes
        .iter()
        .map(|(id, mesh)| {
            let list = geometry.graph.node(*id);
            let mut opcodes: BTreeMap<&str, usize> = BTreeMap::new();
            for command in list.commands() {
                *opcodes.entry(command.opcode().name()).or_default() += 1;
            }
            json!({
                "offset": list.offset(),
                "num_commands": list.num_commands(),
                "opcodes": opcodes,
                "window": { "start": list.window().start, "size": list.window().size },
                "vertex_pointer": list.vertex_pointer(),
                "branches": list.branches().keys().collect::<Vec<_>>(),
                "vertex_count": geometry.graph.recursive_vertex_count(*id),
                "groups": mesh
                    .groups
                    .iter()
                    .map(|group| json!([group.vertices.len(), group.triangles.len()]))
                    .collect::<Vec<_>>(),
                "skipped": mesh.skipped.len(),
            })
        })
        .collect();

    let bounds = geometry
        .bounds()
        .map(|(min, max)| json!({ "min": min.to_array(), "max": max.to_array() }));

    json!({
        "index": index,
        "path": path,
        "points_to": geometry.points_to,
        "vertex_count": geometry.vertex_count(),
        "triangle_count": geometry.triangle_count(),
        "bounds": bounds,
        "display_lists": lists,
    })
}
