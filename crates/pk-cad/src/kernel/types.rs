//! Value types shared by every geometry engine

use std::ops::Mul;
use std::path::{Path, PathBuf};

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Principal axis used for axis-aligned construction, moves and scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    X,
    Y,
    Z,
}

impl Direction {
    /// All directions in axis order
    pub const ALL: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    /// Unit vector along this axis
    pub fn unit(self) -> DVec3 {
        match self {
            Direction::X => DVec3::X,
            Direction::Y => DVec3::Y,
            Direction::Z => DVec3::Z,
        }
    }

    /// Component index of this axis (0, 1 or 2)
    pub fn index(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }

    /// Translation triple: `amount` on this axis, zero elsewhere
    pub fn offset(self, amount: f64) -> DVec3 {
        self.unit() * amount
    }

    /// Scale triple: `factor` on this axis, identity elsewhere
    pub fn stretch(self, factor: f64) -> DVec3 {
        let mut v = DVec3::ONE;
        v[self.index()] = factor;
        v
    }

    /// Next axis in cyclic order (X → Y → Z → X)
    pub fn next(self) -> Direction {
        match self {
            Direction::X => Direction::Y,
            Direction::Y => Direction::Z,
            Direction::Z => Direction::X,
        }
    }

    /// Lowercase axis name
    pub fn name(self) -> &'static str {
        match self {
            Direction::X => "x",
            Direction::Y => "y",
            Direction::Z => "z",
        }
    }
}

impl Mul<f64> for Direction {
    type Output = DVec3;

    fn mul(self, rhs: f64) -> DVec3 {
        self.offset(rhs)
    }
}

/// Quality tier fixing export tolerance and curve sampling density
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Fidelity {
    Low,
    #[default]
    Medium,
    High,
}

impl Fidelity {
    /// All levels from coarsest to finest
    pub const ALL: [Fidelity; 3] = [Fidelity::Low, Fidelity::Medium, Fidelity::High];

    /// Numeric export tolerance
    pub fn tolerance(self) -> f64 {
        match self {
            Fidelity::Low => 0.001,
            Fidelity::Medium => 0.0005,
            Fidelity::High => 0.00025,
        }
    }

    /// Base segment count used to discretize curves
    pub fn smoothing_segments(self) -> usize {
        match self {
            Fidelity::Low => 6,
            Fidelity::Medium => 12,
            Fidelity::High => 17,
        }
    }

    /// Single-letter tag used in output file names
    pub fn code(self) -> &'static str {
        match self {
            Fidelity::Low => "L",
            Fidelity::Medium => "M",
            Fidelity::High => "H",
        }
    }
}

/// Opaque handle to one solid stored inside an engine instance
///
/// Handles are values: every engine operation returns a new handle and the
/// returned handle is the authoritative one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Key of the geometry inside the owning engine
    pub id: Uuid,
    /// Display color (RGB, 0-255)
    pub color: Option<[u8; 3]>,
    /// Human-readable name
    pub name: Option<String>,
}

impl Shape {
    /// Create a handle for geometry stored under `id`
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            color: None,
            name: None,
        }
    }

    /// Set the display color
    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Copy color and name from `source` onto this handle
    pub fn inherit_metadata(mut self, source: &Shape) -> Self {
        self.color = source.color;
        self.name = source.name.clone();
        self
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// Bounding box of a point set, `None` when empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DVec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    /// Edge lengths
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Center point
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Enclosed volume
    pub fn volume(&self) -> f64 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Whether the boxes overlap (touching counts)
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}

/// A tessellated mesh output from an engine
#[derive(Debug, Clone, Default)]
pub struct TessellatedMesh {
    /// Vertex positions
    pub vertices: Vec<[f32; 3]>,
    /// Vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (3 indices per triangle)
    pub indices: Vec<u32>,
}

impl TessellatedMesh {
    /// Create an empty tessellated mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate triangles as vertex triples
    pub fn triangles(&self) -> impl Iterator<Item = [[f32; 3]; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }
}

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanType {
    /// Union (join)
    Union,
    /// Subtraction (cut)
    Subtract,
    /// Intersection (common)
    Intersect,
}

/// Affine transform request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Translate(DVec3),
    Rotate { direction: Direction, degrees: f64 },
    Scale(DVec3),
}

impl Transform {
    /// Whether applying this transform leaves geometry unchanged
    pub fn is_identity(&self) -> bool {
        match self {
            Transform::Translate(v) => *v == DVec3::ZERO,
            Transform::Rotate { degrees, .. } => *degrees == 0.0,
            Transform::Scale(v) => *v == DVec3::ONE,
        }
    }
}

/// Result of a fillet request
#[derive(Debug, Clone, PartialEq)]
pub enum FilletOutcome {
    /// Edges were rounded
    Applied(Shape),
    /// The engine cannot round edges; the input is returned untouched
    Unsupported(Shape),
}

impl FilletOutcome {
    /// The resulting shape in either case
    pub fn into_shape(self) -> Shape {
        match self {
            FilletOutcome::Applied(shape) | FilletOutcome::Unsupported(shape) => shape,
        }
    }

    /// Whether the fillet was actually applied
    pub fn is_applied(&self) -> bool {
        matches!(self, FilletOutcome::Applied(_))
    }
}

/// One member of a multi-part export
#[derive(Debug, Clone)]
pub struct AssemblyItem {
    pub shape: Shape,
    pub name: String,
    pub color: Option<[u8; 3]>,
}

/// Output file formats an engine may be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Binary STL mesh
    Stl,
    /// Wavefront OBJ mesh
    Obj,
    /// STEP CAD interchange
    Step,
    /// 2D vector drawing
    Svg,
    /// Engine-native multi-part assembly
    Assembly,
}

impl ExportFormat {
    /// Conventional file extension
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Stl => "stl",
            ExportFormat::Obj => "obj",
            ExportFormat::Step => "step",
            ExportFormat::Svg => "svg",
            ExportFormat::Assembly => "assembly",
        }
    }

    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .as_deref()
        {
            Some("stl") => Some(ExportFormat::Stl),
            Some("obj") => Some(ExportFormat::Obj),
            Some("step") | Some("stp") => Some(ExportFormat::Step),
            Some("svg") => Some(ExportFormat::Svg),
            _ => None,
        }
    }
}

/// Optional capabilities callers can query before asking for them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Fillet,
    Text,
    Sweep,
    Revolve,
    ImportMesh,
    Export(ExportFormat),
}

/// Error type for engine operations
#[derive(Debug, Clone, Error)]
pub enum CadError {
    #[error("Invalid geometry parameter: {0}")]
    InvalidGeometryParameter(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Exported file {path} did not appear after {attempts} attempts")]
    ExportTimingFailure { path: PathBuf, attempts: u32 },

    #[error("Missing resource: {0}")]
    MissingResource(String),

    #[error("Kernel not available: {0}")]
    KernelNotAvailable(String),

    #[error("Unknown shape: {0}")]
    UnknownShape(Uuid),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("File I/O error: {0}")]
    Io(String),
}

/// Result type for engine operations
pub type CadResult<T> = Result<T, CadError>;
