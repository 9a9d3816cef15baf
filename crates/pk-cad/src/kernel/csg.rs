//! CSG Engine Backend
//!
//! Pure Rust polygon-soup engine: solids are stored as outward-facing planar
//! polygons and combined with BSP-tree booleans.
//!
//! Note: fillets are not supported and the only export formats are STL and OBJ.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use glam::{DMat4, DQuat, DVec2, DVec3};
use uuid::Uuid;

use super::bsp::{self, Polygon};
use super::{
    Aabb, AssemblyItem, BooleanType, CadEngine, CadError, CadResult, Capability, Direction,
    EngineKind, ExportFormat, Fidelity, FilletOutcome, Shape, TessellatedMesh, Transform, mesh,
    stl, text,
};

/// BSP-based CSG engine
pub struct CsgEngine {
    fidelity: Fidelity,
    /// Storage for polygon sets (keyed by UUID)
    shapes: Mutex<HashMap<Uuid, Vec<Polygon>>>,
}

impl CsgEngine {
    /// Create a new CSG engine
    pub fn new(fidelity: Fidelity) -> Self {
        Self {
            fidelity,
            shapes: Mutex::new(HashMap::new()),
        }
    }

    /// Number of shapes currently stored
    pub fn shape_count(&self) -> usize {
        self.lock().map(|shapes| shapes.len()).unwrap_or(0)
    }

    fn lock(&self) -> CadResult<MutexGuard<'_, HashMap<Uuid, Vec<Polygon>>>> {
        self.shapes
            .lock()
            .map_err(|_| CadError::OperationFailed("Shape storage lock poisoned".into()))
    }

    /// Store a polygon set and return a handle to it
    fn store(&self, polygons: Vec<Polygon>) -> CadResult<Shape> {
        let id = Uuid::new_v4();
        self.lock()?.insert(id, polygons);
        Ok(Shape::new(id))
    }

    /// Get a copy of a stored polygon set
    fn get(&self, shape: &Shape) -> CadResult<Vec<Polygon>> {
        self.lock()?
            .get(&shape.id)
            .cloned()
            .ok_or(CadError::UnknownShape(shape.id))
    }

    /// Sides used for round cross-sections
    fn sides(&self) -> usize {
        self.fidelity.smoothing_segments() * 4
    }

    /// Stacks used for spheres
    fn stacks(&self) -> usize {
        self.fidelity.smoothing_segments() * 2
    }

    /// Rotation taking +Z onto `direction`
    fn align_z(direction: Direction) -> DMat4 {
        match direction {
            Direction::X => DMat4::from_rotation_y(90f64.to_radians()),
            Direction::Y => DMat4::from_rotation_x(-90f64.to_radians()),
            Direction::Z => DMat4::IDENTITY,
        }
    }

    fn matrix(transform: Transform) -> DMat4 {
        match transform {
            Transform::Translate(offset) => DMat4::from_translation(offset),
            Transform::Rotate { direction, degrees } => {
                DMat4::from_axis_angle(direction.unit(), degrees.to_radians())
            }
            Transform::Scale(factors) => DMat4::from_scale(factors),
        }
    }

    fn apply_matrix(polygons: &[Polygon], matrix: &DMat4) -> Vec<Polygon> {
        polygons
            .iter()
            .filter_map(|p| p.transformed(matrix))
            .collect()
    }

    /// Tube segment from `a` to `b`
    fn segment(&self, radius: f64, a: DVec3, b: DVec3) -> Vec<Polygon> {
        let axis = b - a;
        let length = axis.length();
        let rotation = DQuat::from_rotation_arc(DVec3::Z, axis / length);
        let matrix = DMat4::from_rotation_translation(rotation, (a + b) * 0.5);
        Self::apply_matrix(&mesh::frustum(length, radius, radius, self.sides()), &matrix)
    }

    fn triangulate(&self, polygons: &[Polygon]) -> TessellatedMesh {
        let min_area = self.fidelity.tolerance() * self.fidelity.tolerance();
        let mut out = TessellatedMesh::new();
        for polygon in polygons {
            let normal = polygon.plane.normal.as_vec3().to_array();
            let a = polygon.vertices[0];
            for pair in polygon.vertices[1..].windows(2) {
                let (b, c) = (pair[0], pair[1]);
                if (b - a).cross(c - a).length() * 0.5 < min_area {
                    continue;
                }
                for v in [a, b, c] {
                    out.indices.push(out.vertices.len() as u32);
                    out.vertices.push(v.as_vec3().to_array());
                    out.normals.push(normal);
                }
            }
        }
        out
    }
}

impl Default for CsgEngine {
    fn default() -> Self {
        Self::new(Fidelity::default())
    }
}

impl CadEngine for CsgEngine {
    fn name(&self) -> &str {
        "csg"
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Csg
    }

    fn fidelity(&self) -> Fidelity {
        self.fidelity
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Fillet => false,
            Capability::Text | Capability::Sweep | Capability::Revolve | Capability::ImportMesh => {
                true
            }
            Capability::Export(format) => matches!(format, ExportFormat::Stl | ExportFormat::Obj),
        }
    }

    fn create_sphere(&self, radius: f64) -> CadResult<Shape> {
        self.store(mesh::sphere(radius, self.sides(), self.stacks()))
    }

    fn create_box(&self, size: DVec3) -> CadResult<Shape> {
        self.store(mesh::cuboid(size))
    }

    fn create_cone(
        &self,
        height: f64,
        r1: f64,
        r2: f64,
        direction: Direction,
    ) -> CadResult<Shape> {
        let polygons = mesh::frustum(height, r1, r2, self.sides());
        self.store(Self::apply_matrix(&polygons, &Self::align_z(direction)))
    }

    fn create_regpoly_extrusion(
        &self,
        length: f64,
        apothem: f64,
        sides: usize,
        direction: Direction,
    ) -> CadResult<Shape> {
        let prism = mesh::prism(&mesh::regular_polygon(apothem, sides), &[], length)?;
        let matrix =
            Self::align_z(direction) * DMat4::from_translation(DVec3::new(0.0, 0.0, -length / 2.0));
        self.store(Self::apply_matrix(&prism, &matrix))
    }

    fn create_polygon_extrusion(&self, points: &[DVec2], height: f64) -> CadResult<Shape> {
        self.store(mesh::prism(points, &[], height)?)
    }

    fn create_revolve(&self, points: &[DVec2], degrees: f64) -> CadResult<Shape> {
        self.store(mesh::revolve(points, degrees, self.sides())?)
    }

    fn create_sweep(&self, radius: f64, path: &[DVec3]) -> CadResult<Shape> {
        let mut points = path.to_vec();
        points.dedup();
        if points.len() < 2 {
            return Err(CadError::InvalidGeometryParameter(
                "Sweep path has no length".into(),
            ));
        }

        let mut result = self.segment(radius, points[0], points[1]);
        for pair in points[1..].windows(2) {
            let joint = Self::apply_matrix(
                &mesh::sphere(radius, self.sides(), self.stacks()),
                &DMat4::from_translation(pair[0]),
            );
            result = bsp::union(result, joint);
            result = bsp::union(result, self.segment(radius, pair[0], pair[1]));
        }
        self.store(result)
    }

    fn create_text(
        &self,
        text: &str,
        font_size: f64,
        thickness: f64,
        font_path: &Path,
    ) -> CadResult<Shape> {
        let glyphs = text::text_contours(
            text,
            font_path,
            font_size,
            self.fidelity.smoothing_segments(),
        )?;
        // Holes are resolved per glyph so neighbouring glyphs never cut each other
        let mut result: Option<Vec<Polygon>> = None;
        for region in glyphs.into_iter().flat_map(text::group_regions) {
            let solid = mesh::prism(&region.outer, &region.holes, thickness)?;
            result = Some(match result {
                Some(acc) => bsp::union(acc, solid),
                None => solid,
            });
        }
        match result {
            Some(polygons) => self.store(polygons),
            None => Err(CadError::InvalidGeometryParameter(format!(
                "Text {:?} produced no outlines",
                text
            ))),
        }
    }

    fn boolean(&self, a: &Shape, b: &Shape, op: BooleanType) -> CadResult<Shape> {
        let (pa, pb) = (self.get(a)?, self.get(b)?);
        let polygons = match op {
            BooleanType::Union => bsp::union(pa, pb),
            BooleanType::Subtract => bsp::subtract(pa, pb),
            BooleanType::Intersect => bsp::intersect(pa, pb),
        };
        Ok(self.store(polygons)?.inherit_metadata(a))
    }

    fn transform(&self, shape: &Shape, transform: Transform) -> CadResult<Shape> {
        let polygons = Self::apply_matrix(&self.get(shape)?, &Self::matrix(transform));
        Ok(self.store(polygons)?.inherit_metadata(shape))
    }

    fn mirror(&self, shape: &Shape) -> CadResult<Shape> {
        let matrix = DMat4::from_scale(DVec3::new(1.0, -1.0, 1.0));
        let polygons = Self::apply_matrix(&self.get(shape)?, &matrix);
        Ok(self.store(polygons)?.inherit_metadata(shape))
    }

    fn fillet(&self, shape: &Shape, _points: &[DVec3], radius: f64) -> CadResult<FilletOutcome> {
        tracing::warn!(
            "Fillet (radius {}) is not supported by the {} engine, leaving edges sharp",
            radius,
            self.name()
        );
        Ok(FilletOutcome::Unsupported(shape.clone()))
    }

    fn bounding_box(&self, shape: &Shape) -> CadResult<Aabb> {
        bsp::bounds(&self.get(shape)?)
            .ok_or_else(|| CadError::OperationFailed("Shape has no geometry".into()))
    }

    fn tessellate(&self, shape: &Shape) -> CadResult<TessellatedMesh> {
        Ok(self.triangulate(&self.get(shape)?))
    }

    fn import_mesh(&self, path: &Path) -> CadResult<Shape> {
        let polygons: Vec<Polygon> = stl::read_stl(path)?
            .into_iter()
            .filter_map(|triangle| Polygon::new(triangle.to_vec()))
            .collect();
        tracing::debug!("Imported {} faces from {}", polygons.len(), path.display());
        self.store(polygons)
    }

    fn export(&self, shape: &Shape, path: &Path, format: ExportFormat) -> CadResult<()> {
        match format {
            ExportFormat::Stl => stl::write_stl(&self.tessellate(shape)?, path),
            ExportFormat::Obj => {
                let name = shape.name.as_deref().unwrap_or("shape");
                stl::write_obj(&self.tessellate(shape)?, name, path)
            }
            other => Err(CadError::UnsupportedOperation(format!(
                "{} engine cannot export {:?}",
                self.name(),
                other
            ))),
        }
    }

    fn export_best(&self, shape: &Shape, path: &Path) -> CadResult<PathBuf> {
        let path = path.with_extension(ExportFormat::Stl.extension());
        self.export(shape, &path, ExportFormat::Stl)?;
        Ok(path)
    }

    fn export_assembly(&self, items: &[AssemblyItem], path: &Path) -> CadResult<()> {
        let Some((first, rest)) = items.split_first() else {
            return Err(CadError::InvalidGeometryParameter(
                "Assembly has no items".into(),
            ));
        };
        tracing::info!(
            "{} engine has no assembly format, writing {} items as one mesh",
            self.name(),
            items.len()
        );
        let mut joined = self.get(&first.shape)?;
        for item in rest {
            joined = bsp::union(joined, self.get(&item.shape)?);
        }
        stl::write_stl(&self.triangulate(&joined), path)
    }

    fn release(&self, shape: &Shape) -> bool {
        match self.lock() {
            Ok(mut shapes) => shapes.remove(&shape.id).is_some(),
            Err(_) => false,
        }
    }
}
