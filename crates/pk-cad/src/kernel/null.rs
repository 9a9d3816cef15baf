//! Engine placeholder used when no geometry backend should run

use std::path::{Path, PathBuf};

use glam::{DVec2, DVec3};

use super::{
    Aabb, AssemblyItem, BooleanType, CadEngine, CadError, CadResult, Capability, Direction,
    EngineKind, ExportFormat, Fidelity, FilletOutcome, Shape, TessellatedMesh, Transform,
};

/// A null engine that always returns errors
#[derive(Debug, Default)]
pub struct NullEngine {
    fidelity: Fidelity,
}

impl NullEngine {
    pub fn new(fidelity: Fidelity) -> Self {
        Self { fidelity }
    }
}

fn unavailable<T>(operation: &str) -> CadResult<T> {
    Err(CadError::KernelNotAvailable(format!(
        "No geometry engine available for {}",
        operation
    )))
}

impl CadEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Null
    }

    fn fidelity(&self) -> Fidelity {
        self.fidelity
    }

    fn is_available(&self) -> bool {
        false
    }

    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    fn create_sphere(&self, _radius: f64) -> CadResult<Shape> {
        unavailable("sphere")
    }

    fn create_box(&self, _size: DVec3) -> CadResult<Shape> {
        unavailable("box")
    }

    fn create_cone(
        &self,
        _height: f64,
        _r1: f64,
        _r2: f64,
        _direction: Direction,
    ) -> CadResult<Shape> {
        unavailable("cone")
    }

    fn create_regpoly_extrusion(
        &self,
        _length: f64,
        _apothem: f64,
        _sides: usize,
        _direction: Direction,
    ) -> CadResult<Shape> {
        unavailable("regular polygon extrusion")
    }

    fn create_polygon_extrusion(&self, _points: &[DVec2], _height: f64) -> CadResult<Shape> {
        unavailable("polygon extrusion")
    }

    fn create_revolve(&self, _points: &[DVec2], _degrees: f64) -> CadResult<Shape> {
        unavailable("revolve")
    }

    fn create_sweep(&self, _radius: f64, _path: &[DVec3]) -> CadResult<Shape> {
        unavailable("sweep")
    }

    fn create_text(
        &self,
        _text: &str,
        _font_size: f64,
        _thickness: f64,
        _font_path: &Path,
    ) -> CadResult<Shape> {
        unavailable("text")
    }

    fn boolean(&self, _a: &Shape, _b: &Shape, _op: BooleanType) -> CadResult<Shape> {
        unavailable("boolean")
    }

    fn transform(&self, _shape: &Shape, _transform: Transform) -> CadResult<Shape> {
        unavailable("transform")
    }

    fn mirror(&self, _shape: &Shape) -> CadResult<Shape> {
        unavailable("mirror")
    }

    fn fillet(&self, _shape: &Shape, _points: &[DVec3], _radius: f64) -> CadResult<FilletOutcome> {
        unavailable("fillet")
    }

    fn bounding_box(&self, _shape: &Shape) -> CadResult<Aabb> {
        unavailable("bounding box")
    }

    fn tessellate(&self, _shape: &Shape) -> CadResult<TessellatedMesh> {
        unavailable("tessellation")
    }

    fn import_mesh(&self, _path: &Path) -> CadResult<Shape> {
        unavailable("mesh import")
    }

    fn export(&self, _shape: &Shape, _path: &Path, _format: ExportFormat) -> CadResult<()> {
        unavailable("export")
    }

    fn export_best(&self, _shape: &Shape, _path: &Path) -> CadResult<PathBuf> {
        unavailable("export")
    }

    fn export_assembly(&self, _items: &[AssemblyItem], _path: &Path) -> CadResult<()> {
        unavailable("assembly export")
    }

    fn release(&self, _shape: &Shape) -> bool {
        false
    }
}
