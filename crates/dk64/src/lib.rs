//! Extract meshes from DK64 geometry assets.
//!
//! Builds on [`dk64_decode`] with the asset-level pieces: reading geometry
//! headers, detecting indirection records, decoding whole geometry tables
//! with per-asset error isolation, and exporting meshes as Wavefront OBJ.
//!
//! Inputs are decompressed table entries; locating and inflating them in a
//! ROM is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use dk64::{GeometryAsset, ObjOptions, to_obj};
//! use dk64_decode::BuildLimits;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let asset = GeometryAsset::new(std::fs::read("geometry_07.bin")?);
//! let decoded = asset.decode(BuildLimits::default())?;
//! std::fs::write("geometry_07.obj", to_obj(&decoded, ObjOptions::default()))?;
//! # Ok(())
//! # }
//! ```

mod error;

pub mod asset;
pub mod obj;
pub mod table;

pub use asset::{DecodedGeometry, GeometryAsset, GeometryHeader, is_indirection};
pub use error::{Error, Result};
pub use obj::{ObjOptions, to_obj, write_obj};
pub use table::GeometryTable;

pub use dk64_decode;
