//! Exported mesh inspection (volume and convex hull)

use std::path::Path;

use glam::DVec3;
use parry3d::math::Point;
use pk_cad::Aabb;
use pk_cad::kernel::stl::read_stl;

/// Measurements of a triangle mesh file
#[derive(Debug, Clone, PartialEq)]
pub struct MeshStats {
    pub triangle_count: usize,
    /// Enclosed volume (signed sum over triangles, positive when outward)
    pub volume: f64,
    /// Volume of the convex hull of all vertices
    pub hull_volume: f64,
    pub bounds: Aabb,
}

/// Signed volume enclosed by a triangle soup
pub fn signed_volume(triangles: &[[DVec3; 3]]) -> f64 {
    triangles
        .iter()
        .map(|[a, b, c]| a.dot(b.cross(*c)))
        .sum::<f64>()
        / 6.0
}

/// Volume of the convex hull around every vertex
pub fn hull_volume(triangles: &[[DVec3; 3]]) -> Result<f64, MeshError> {
    let points: Vec<Point<f32>> = triangles
        .iter()
        .flatten()
        .map(|v| Point::new(v.x as f32, v.y as f32, v.z as f32))
        .collect();
    if points.len() < 4 {
        return Err(MeshError::Hull(
            "Need at least 4 points for convex hull".to_string(),
        ));
    }

    let (vertices, faces) = parry3d::transformation::try_convex_hull(&points)
        .map_err(|e| MeshError::Hull(format!("{:?}", e)))?;
    let corner = |i: u32| {
        let p = vertices[i as usize];
        DVec3::new(p.x as f64, p.y as f64, p.z as f64)
    };
    let hull: Vec<[DVec3; 3]> = faces
        .iter()
        .map(|f| [corner(f[0]), corner(f[1]), corner(f[2])])
        .collect();
    Ok(signed_volume(&hull).abs())
}

/// Load an STL file and measure it
pub fn analyze_stl(path: impl AsRef<Path>) -> Result<MeshStats, MeshError> {
    let triangles = read_stl(path.as_ref()).map_err(|e| MeshError::Load(e.to_string()))?;
    if triangles.is_empty() {
        return Err(MeshError::Empty);
    }
    let bounds = Aabb::from_points(triangles.iter().flatten()).ok_or(MeshError::Empty)?;
    Ok(MeshStats {
        triangle_count: triangles.len(),
        volume: signed_volume(&triangles),
        hull_volume: hull_volume(&triangles)?,
        bounds,
    })
}

/// Mesh inspection errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("Failed to load mesh: {0}")]
    Load(String),
    #[error("Mesh has no triangles")]
    Empty,
    #[error("Convex hull failed: {0}")]
    Hull(String),
}
