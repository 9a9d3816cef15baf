//! Geometry Engine Abstraction and Solid Constructions
//!
//! This crate provides:
//! - The geometry engine contract and its validated convenience operations
//! - A pure Rust CSG engine and a null engine
//! - Engine-independent compound shapes (rods, masks, halves, mirrored pairs)
//! - Mixed line/spline profile paths for extrusion and revolution
//! - A font registry for text solids

pub mod derived;
pub mod fonts;
pub mod kernel;
pub mod ops;
pub mod path;

// Re-exports for convenience
pub use derived::{CylinderOptions, DerivedGeometry, HALF_EXTENT};
pub use fonts::{FontRegistry, resolve_font};
pub use kernel::{
    Aabb, AssemblyItem, BooleanType, CadEngine, CadError, CadResult, Capability, CsgEngine,
    Direction, EngineKind, ExportFormat, Fidelity, FilletOutcome, NullEngine, Shape,
    TessellatedMesh, Transform, default_engine,
};
pub use ops::Fluent;
pub use path::{AUTO, CurveKnot, PathElement, build_path};
