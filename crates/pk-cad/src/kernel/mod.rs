//! Geometry engine abstraction
//!
//! The [`CadEngine`] trait is the only way the rest of the workspace touches
//! geometry. Backends store solids internally and hand out [`Shape`] handles.

mod bsp;
mod csg;
mod mesh;
mod null;
pub mod stl;
mod text;
mod traits;
mod types;

pub use csg::CsgEngine;
pub use null::NullEngine;
pub use traits::{CadEngine, EngineKind, default_engine};
pub use types::*;
