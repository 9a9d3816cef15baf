//! Buildable Solid Parts
//!
//! This crate contains the layer above the geometry engines:
//! - SolidConfig: per-part engine, fidelity and output settings
//! - Solid: lazily generated, cached part with nested sub-parts
//! - Export: mesh files, existence retry, volume check and reports
//! - Mesh: volume and convex hull measurement of exported STL files

pub mod config;
pub mod constants;
pub mod export;
pub mod mesh;
pub mod solid;

pub use config::*;
pub use constants::*;
pub use export::*;
pub use mesh::*;
pub use solid::*;
