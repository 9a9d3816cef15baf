//! Geometry engine trait definitions
//!
//! Engines implement the `create_*` constructors and the core operations.
//! The validated wrappers, direction shorthands and pass-through rules are
//! provided methods so every engine behaves identically at the boundary.

use std::path::{Path, PathBuf};

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use super::{
    Aabb, AssemblyItem, BooleanType, CadError, CadResult, Capability, CsgEngine, Direction,
    ExportFormat, Fidelity, FilletOutcome, NullEngine, Shape, TessellatedMesh, Transform,
};
use crate::fonts;
use crate::path::{PathElement, build_path};

/// Closed set of engines a solid can be built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineKind {
    /// In-tree BSP polygon engine
    #[default]
    Csg,
    /// Engine that reports every operation unavailable
    Null,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [EngineKind::Csg, EngineKind::Null];

    /// Gap left between faces that must not fuse when mirrored or masked
    pub fn tolerance(self) -> f64 {
        match self {
            EngineKind::Csg => 0.02,
            EngineKind::Null => 0.0,
        }
    }

    /// Short tag used in output file names
    pub fn code(self) -> &'static str {
        match self {
            EngineKind::Csg => "csg",
            EngineKind::Null => "null",
        }
    }

    /// Build a fresh engine instance at the given fidelity
    pub fn instantiate(self, fidelity: Fidelity) -> Box<dyn CadEngine> {
        tracing::debug!("Instantiating {} engine at fidelity {:?}", self.code(), fidelity);
        match self {
            EngineKind::Csg => Box::new(CsgEngine::new(fidelity)),
            EngineKind::Null => Box::new(NullEngine::new(fidelity)),
        }
    }
}

/// The default engine at medium fidelity
pub fn default_engine() -> Box<dyn CadEngine> {
    EngineKind::default().instantiate(Fidelity::default())
}

fn require_positive(what: &str, value: f64) -> CadResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CadError::InvalidGeometryParameter(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}

fn require_non_negative(what: &str, value: f64) -> CadResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CadError::InvalidGeometryParameter(format!(
            "{} must not be negative, got {}",
            what, value
        )))
    }
}

/// The geometry capability contract
///
/// Every operation takes handles by reference and returns a new handle;
/// the returned handle is the authoritative one.
pub trait CadEngine: Send + Sync {
    /// Get the name of this engine
    fn name(&self) -> &str;

    /// The selector this engine was built from
    fn kind(&self) -> EngineKind;

    /// Fidelity fixed at construction
    fn fidelity(&self) -> Fidelity;

    /// Check if the engine can build geometry at all
    fn is_available(&self) -> bool;

    /// Whether an optional capability is implemented
    fn supports(&self, capability: Capability) -> bool;

    // ========== Engine constructors (inputs already validated) ==========

    /// Sphere centered on the origin
    fn create_sphere(&self, radius: f64) -> CadResult<Shape>;

    /// Box centered on the origin
    fn create_box(&self, size: DVec3) -> CadResult<Shape>;

    /// Truncated cone centered on the origin along `direction`, `r1` at the
    /// negative end
    fn create_cone(&self, height: f64, r1: f64, r2: f64, direction: Direction)
    -> CadResult<Shape>;

    /// Regular prism centered on the origin along `direction`
    fn create_regpoly_extrusion(
        &self,
        length: f64,
        apothem: f64,
        sides: usize,
        direction: Direction,
    ) -> CadResult<Shape>;

    /// Extrude a closed XY polygon from `z = 0` to a positive `height`
    fn create_polygon_extrusion(&self, points: &[DVec2], height: f64) -> CadResult<Shape>;

    /// Revolve a closed profile about the X axis
    fn create_revolve(&self, points: &[DVec2], degrees: f64) -> CadResult<Shape>;

    /// Sweep a round profile along a 3D polyline
    fn create_sweep(&self, radius: f64, path: &[DVec3]) -> CadResult<Shape>;

    /// Glyph outlines from the font at `font_path` extruded along Z
    fn create_text(
        &self,
        text: &str,
        font_size: f64,
        thickness: f64,
        font_path: &Path,
    ) -> CadResult<Shape>;

    // ========== Core operations ==========

    /// Perform a boolean operation; the result carries `a`'s metadata
    fn boolean(&self, a: &Shape, b: &Shape, op: BooleanType) -> CadResult<Shape>;

    /// Apply an affine transform; the result carries the input's metadata
    fn transform(&self, shape: &Shape, transform: Transform) -> CadResult<Shape>;

    /// Reflect across the XZ plane (`y -> -y`) into an independent handle
    fn mirror(&self, shape: &Shape) -> CadResult<Shape>;

    /// Round the edges nearest `points`
    fn fillet(&self, shape: &Shape, points: &[DVec3], radius: f64) -> CadResult<FilletOutcome>;

    /// Axis-aligned bounds of a shape
    fn bounding_box(&self, shape: &Shape) -> CadResult<Aabb>;

    /// Tessellate a shape into triangles at the engine's fidelity
    fn tessellate(&self, shape: &Shape) -> CadResult<TessellatedMesh>;

    /// Load an STL file as a shape
    fn import_mesh(&self, path: &Path) -> CadResult<Shape>;

    /// Write a shape in the requested format
    fn export(&self, shape: &Shape, path: &Path, format: ExportFormat) -> CadResult<()>;

    /// Write a shape in the engine's preferred format; returns the file written
    fn export_best(&self, shape: &Shape, path: &Path) -> CadResult<PathBuf>;

    /// Write several named shapes to one file
    fn export_assembly(&self, items: &[AssemblyItem], path: &Path) -> CadResult<()>;

    /// Free the geometry behind a handle. Returns whether anything was stored.
    fn release(&self, shape: &Shape) -> bool;

    // ========== Provided operations ==========

    /// Engine-family tolerance
    fn tolerance(&self) -> f64 {
        self.kind().tolerance()
    }

    /// Release every temporary that is not also one of `keep`
    fn discard(&self, temporaries: &[&Shape], keep: &[&Shape]) {
        for temp in temporaries {
            if keep.iter().all(|k| k.id != temp.id) {
                self.release(temp);
            }
        }
    }

    fn sphere(&self, radius: f64) -> CadResult<Shape> {
        require_positive("Sphere radius", radius)?;
        self.create_sphere(radius)
    }

    /// Box of `length × width × height` centered on the origin
    fn cuboid(&self, length: f64, width: f64, height: f64) -> CadResult<Shape> {
        require_positive("Box length", length)?;
        require_positive("Box width", width)?;
        require_positive("Box height", height)?;
        self.create_box(DVec3::new(length, width, height))
    }

    fn cone(&self, height: f64, r1: f64, r2: f64, direction: Direction) -> CadResult<Shape> {
        require_positive("Cone height", height)?;
        require_non_negative("Cone radius", r1)?;
        require_non_negative("Cone radius", r2)?;
        if r1 == 0.0 && r2 == 0.0 {
            return Err(CadError::InvalidGeometryParameter(
                "Cone needs at least one non-zero radius".into(),
            ));
        }
        self.create_cone(height, r1, r2, direction)
    }

    fn cone_x(&self, height: f64, r1: f64, r2: f64) -> CadResult<Shape> {
        self.cone(height, r1, r2, Direction::X)
    }

    fn cone_y(&self, height: f64, r1: f64, r2: f64) -> CadResult<Shape> {
        self.cone(height, r1, r2, Direction::Y)
    }

    fn cone_z(&self, height: f64, r1: f64, r2: f64) -> CadResult<Shape> {
        self.cone(height, r1, r2, Direction::Z)
    }

    fn cylinder_x(&self, height: f64, radius: f64) -> CadResult<Shape> {
        require_positive("Cylinder radius", radius)?;
        self.cone(height, radius, radius, Direction::X)
    }

    fn cylinder_y(&self, height: f64, radius: f64) -> CadResult<Shape> {
        require_positive("Cylinder radius", radius)?;
        self.cone(height, radius, radius, Direction::Y)
    }

    fn cylinder_z(&self, height: f64, radius: f64) -> CadResult<Shape> {
        require_positive("Cylinder radius", radius)?;
        self.cone(height, radius, radius, Direction::Z)
    }

    /// Regular polygon with inscribed radius `radius` extruded along `direction`
    fn regpoly_extrusion(
        &self,
        length: f64,
        radius: f64,
        sides: usize,
        direction: Direction,
    ) -> CadResult<Shape> {
        require_positive("Extrusion length", length)?;
        require_positive("Polygon radius", radius)?;
        if sides < 3 {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Regular polygon needs at least 3 sides, got {}",
                sides
            )));
        }
        self.create_regpoly_extrusion(length, radius, sides, direction)
    }

    fn regpoly_extrusion_x(&self, length: f64, radius: f64, sides: usize) -> CadResult<Shape> {
        self.regpoly_extrusion(length, radius, sides, Direction::X)
    }

    fn regpoly_extrusion_y(&self, length: f64, radius: f64, sides: usize) -> CadResult<Shape> {
        self.regpoly_extrusion(length, radius, sides, Direction::Y)
    }

    fn regpoly_extrusion_z(&self, length: f64, radius: f64, sides: usize) -> CadResult<Shape> {
        self.regpoly_extrusion(length, radius, sides, Direction::Z)
    }

    /// Extrude a closed XY polygon from `z = 0` by `height`; a negative
    /// height places the solid below the profile plane.
    fn polygon_extrusion(&self, points: &[DVec2], height: f64) -> CadResult<Shape> {
        if points.len() < 3 {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Polygon needs at least 3 points, got {}",
                points.len()
            )));
        }
        if !height.is_finite() || height == 0.0 {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Extrusion height must be non-zero, got {}",
                height
            )));
        }
        let shape = self.create_polygon_extrusion(points, height.abs())?;
        if height < 0.0 {
            let lowered = self.move_by(&shape, 0.0, 0.0, height)?;
            self.discard(&[&shape], &[&lowered]);
            Ok(lowered)
        } else {
            Ok(shape)
        }
    }

    /// Revolve a closed profile (`x` along the axis, `y` as radius) about X
    fn revolve(&self, points: &[DVec2], degrees: f64) -> CadResult<Shape> {
        if points.len() < 3 {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Revolve profile needs at least 3 points, got {}",
                points.len()
            )));
        }
        if !(degrees > 0.0 && degrees <= 360.0) {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Revolve angle must be in (0, 360], got {}",
                degrees
            )));
        }
        if let Some(p) = points.iter().find(|p| p.y < 0.0) {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Revolve profile point {} lies below the axis",
                p
            )));
        }
        self.create_revolve(points, degrees)
    }

    /// Sweep a round profile of `radius` along a 3D polyline
    fn regpoly_sweep(&self, radius: f64, path: &[DVec3]) -> CadResult<Shape> {
        require_positive("Sweep radius", radius)?;
        if path.len() < 2 {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Sweep path needs at least 2 points, got {}",
                path.len()
            )));
        }
        self.create_sweep(radius, path)
    }

    /// Text extruded `thickness` along Z, using the registry's default font
    /// when `font` is `None`
    fn text(
        &self,
        text: &str,
        font_size: f64,
        thickness: f64,
        font: Option<&str>,
    ) -> CadResult<Shape> {
        if text.trim().is_empty() {
            return Err(CadError::InvalidGeometryParameter("Text is empty".into()));
        }
        require_positive("Font size", font_size)?;
        require_positive("Text thickness", thickness)?;
        if !self.supports(Capability::Text) {
            return Err(CadError::UnsupportedOperation(format!(
                "{} engine cannot build text",
                self.name()
            )));
        }
        let font_path = fonts::resolve_font(font)?;
        self.create_text(text, font_size, thickness, &font_path)
    }

    /// Extrude a mixed line/spline profile
    fn spline_extrusion(
        &self,
        start: DVec2,
        path: &[PathElement],
        height: f64,
    ) -> CadResult<Shape> {
        let points = build_path(start, path, self.fidelity().smoothing_segments())?;
        self.polygon_extrusion(&points, height)
    }

    /// Revolve a mixed line/spline profile about X
    fn spline_revolve(&self, start: DVec2, path: &[PathElement], degrees: f64) -> CadResult<Shape> {
        let points = build_path(start, path, self.fidelity().smoothing_segments())?;
        self.revolve(&points, degrees)
    }

    // ========== Booleans with pass-through ==========

    /// `a` minus `b`; `None` returns `a` untouched
    fn cut(&self, a: &Shape, b: Option<&Shape>) -> CadResult<Shape> {
        match b {
            Some(b) => self.boolean(a, b, BooleanType::Subtract),
            None => Ok(a.clone()),
        }
    }

    /// `a` united with `b`; `None` returns `a` untouched
    fn join(&self, a: &Shape, b: Option<&Shape>) -> CadResult<Shape> {
        match b {
            Some(b) => self.boolean(a, b, BooleanType::Union),
            None => Ok(a.clone()),
        }
    }

    /// `a` intersected with `b`; `None` returns `a` untouched
    fn intersect(&self, a: &Shape, b: Option<&Shape>) -> CadResult<Shape> {
        match b {
            Some(b) => self.boolean(a, b, BooleanType::Intersect),
            None => Ok(a.clone()),
        }
    }

    // ========== Transforms with identity short-circuit ==========

    fn apply(&self, shape: &Shape, transform: Transform) -> CadResult<Shape> {
        if transform.is_identity() {
            Ok(shape.clone())
        } else {
            self.transform(shape, transform)
        }
    }

    fn move_by(&self, shape: &Shape, dx: f64, dy: f64, dz: f64) -> CadResult<Shape> {
        self.apply(shape, Transform::Translate(DVec3::new(dx, dy, dz)))
    }

    fn rotate_x(&self, shape: &Shape, degrees: f64) -> CadResult<Shape> {
        self.apply(shape, Transform::Rotate { direction: Direction::X, degrees })
    }

    fn rotate_y(&self, shape: &Shape, degrees: f64) -> CadResult<Shape> {
        self.apply(shape, Transform::Rotate { direction: Direction::Y, degrees })
    }

    fn rotate_z(&self, shape: &Shape, degrees: f64) -> CadResult<Shape> {
        self.apply(shape, Transform::Rotate { direction: Direction::Z, degrees })
    }

    fn scale(&self, shape: &Shape, sx: f64, sy: f64, sz: f64) -> CadResult<Shape> {
        let factors = DVec3::new(sx, sy, sz);
        if !factors.is_finite() || factors.cmpeq(DVec3::ZERO).any() {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Scale factors must be finite and non-zero, got {}",
                factors
            )));
        }
        self.apply(shape, Transform::Scale(factors))
    }

    /// Translate by `distance` along `direction`
    fn move_along(&self, shape: &Shape, direction: Direction, distance: f64) -> CadResult<Shape> {
        let offset = direction.offset(distance);
        self.move_by(shape, offset.x, offset.y, offset.z)
    }

    /// Scale by `factor` along `direction` only
    fn scale_along(&self, shape: &Shape, direction: Direction, factor: f64) -> CadResult<Shape> {
        let factors = direction.stretch(factor);
        self.scale(shape, factors.x, factors.y, factors.z)
    }

    /// Write a shape as STL
    fn export_stl(&self, shape: &Shape, path: &Path) -> CadResult<()> {
        self.export(shape, path, ExportFormat::Stl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_tolerance_families() {
        assert_eq!(EngineKind::Csg.tolerance(), 0.02);
        assert_eq!(EngineKind::Null.tolerance(), 0.0);
        for kind in EngineKind::ALL {
            let engine = kind.instantiate(Fidelity::High);
            assert_eq!(engine.kind(), kind);
            assert_eq!(engine.fidelity(), Fidelity::High);
            assert_eq!(engine.tolerance(), kind.tolerance());
        }
    }

    #[test]
    fn test_null_operand_passes_through() {
        let engine = NullEngine::new(Fidelity::Medium);
        let shape = Shape::new(uuid::Uuid::new_v4()).with_color([1, 2, 3]);
        // NullEngine fails every engine call, so success proves no call was made
        assert_eq!(engine.cut(&shape, None).unwrap(), shape);
        assert_eq!(engine.join(&shape, None).unwrap(), shape);
        assert_eq!(engine.intersect(&shape, None).unwrap(), shape);
    }

    #[test]
    fn test_identity_transforms_short_circuit() {
        let engine = NullEngine::new(Fidelity::Medium);
        let shape = Shape::new(uuid::Uuid::new_v4());
        assert_eq!(engine.move_by(&shape, 0.0, 0.0, 0.0).unwrap(), shape);
        assert_eq!(engine.rotate_x(&shape, 0.0).unwrap(), shape);
        assert_eq!(engine.rotate_y(&shape, 0.0).unwrap(), shape);
        assert_eq!(engine.rotate_z(&shape, 0.0).unwrap(), shape);
        assert_eq!(engine.scale(&shape, 1.0, 1.0, 1.0).unwrap(), shape);
        assert_eq!(engine.move_along(&shape, Direction::Y, 0.0).unwrap(), shape);
        assert_eq!(engine.scale_along(&shape, Direction::Z, 1.0).unwrap(), shape);
        assert!(matches!(
            engine.move_by(&shape, 1.0, 0.0, 0.0),
            Err(CadError::KernelNotAvailable(_))
        ));
    }

    #[test]
    fn test_primitive_validation() {
        let engine = NullEngine::new(Fidelity::Medium);
        let invalid = |r: CadResult<Shape>| matches!(r, Err(CadError::InvalidGeometryParameter(_)));
        assert!(invalid(engine.sphere(0.0)));
        assert!(invalid(engine.sphere(f64::NAN)));
        assert!(invalid(engine.cuboid(1.0, -1.0, 1.0)));
        assert!(invalid(engine.cone_z(1.0, 0.0, 0.0)));
        assert!(invalid(engine.cylinder_x(0.0, 1.0)));
        assert!(invalid(engine.regpoly_extrusion_z(1.0, 1.0, 2)));
        assert!(invalid(engine.polygon_extrusion(&[DVec2::ZERO, DVec2::X], 1.0)));
        assert!(invalid(engine.polygon_extrusion(&[DVec2::ZERO, DVec2::X, DVec2::Y], 0.0)));
        assert!(invalid(engine.revolve(&[DVec2::Y, DVec2::ONE, DVec2::X], 400.0)));
        assert!(invalid(engine.revolve(&[DVec2::NEG_Y, DVec2::ONE, DVec2::X], 90.0)));
        assert!(invalid(engine.regpoly_sweep(1.0, &[DVec3::ZERO])));
        assert!(invalid(engine.scale(&Shape::new(uuid::Uuid::new_v4()), 0.0, 1.0, 1.0)));
        assert!(invalid(engine.text("  ", 10.0, 1.0, None)));
    }

    #[test]
    fn test_valid_input_reaches_engine() {
        let engine = NullEngine::new(Fidelity::Medium);
        assert!(matches!(
            engine.cone_z(2.0, 1.0, 0.0),
            Err(CadError::KernelNotAvailable(_))
        ));
    }
}
