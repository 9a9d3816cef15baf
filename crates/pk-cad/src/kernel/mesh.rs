//! Primitive polygon generation for the CSG engine
//!
//! Every closed primitive is generated centered on the origin and oriented
//! with outward-facing polygons.

use std::f64::consts::{PI, TAU};

use glam::{DVec2, DVec3};

use super::bsp::{Polygon, orient_outward};
use super::{CadError, CadResult};

/// Flip any face of a convex, origin-centered solid that points inward
fn outward_convex(polygons: Vec<Polygon>) -> Vec<Polygon> {
    let center = polygons.iter().map(Polygon::centroid).sum::<DVec3>() / polygons.len().max(1) as f64;
    polygons
        .into_iter()
        .map(|mut p| {
            if p.plane.normal.dot(p.centroid() - center) < 0.0 {
                p.flip();
            }
            p
        })
        .collect()
}

/// Axis-aligned box centered on the origin
pub(crate) fn cuboid(size: DVec3) -> Vec<Polygon> {
    const FACES: [[usize; 4]; 6] = [
        [0, 4, 6, 2],
        [1, 3, 7, 5],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 2, 3, 1],
        [4, 5, 7, 6],
    ];
    let half = size * 0.5;
    FACES
        .iter()
        .filter_map(|face| {
            let vertices = face
                .iter()
                .map(|&i| {
                    DVec3::new(
                        if i & 1 != 0 { half.x } else { -half.x },
                        if i & 2 != 0 { half.y } else { -half.y },
                        if i & 4 != 0 { half.z } else { -half.z },
                    )
                })
                .collect();
            Polygon::new(vertices)
        })
        .collect()
}

/// UV sphere with poles on the Z axis
pub(crate) fn sphere(radius: f64, slices: usize, stacks: usize) -> Vec<Polygon> {
    let vertex = |i: usize, j: usize| {
        let theta = (i % slices) as f64 / slices as f64 * TAU;
        let phi = j as f64 / stacks as f64 * PI;
        DVec3::new(
            theta.cos() * phi.sin(),
            theta.sin() * phi.sin(),
            phi.cos(),
        ) * radius
    };

    let mut polygons = Vec::with_capacity(slices * stacks);
    for i in 0..slices {
        for j in 0..stacks {
            let mut vertices = vec![vertex(i, j)];
            if j > 0 {
                vertices.push(vertex(i + 1, j));
            }
            if j < stacks - 1 {
                vertices.push(vertex(i + 1, j + 1));
            }
            vertices.push(vertex(i, j + 1));
            polygons.extend(Polygon::new(vertices));
        }
    }
    outward_convex(polygons)
}

/// Truncated cone along Z, `r1` at `z = -h/2` and `r2` at `z = +h/2`
pub(crate) fn frustum(height: f64, r1: f64, r2: f64, sides: usize) -> Vec<Polygon> {
    let half = height * 0.5;
    let ring = |r: f64, z: f64| -> Vec<DVec3> {
        (0..sides)
            .map(|i| {
                let theta = i as f64 / sides as f64 * TAU;
                DVec3::new(r * theta.cos(), r * theta.sin(), z)
            })
            .collect()
    };
    let bottom = ring(r1, -half);
    let top = ring(r2, half);

    let mut polygons = Vec::with_capacity(sides + 2);
    if r1 > 0.0 {
        polygons.extend(Polygon::new(bottom.clone()));
    }
    if r2 > 0.0 {
        polygons.extend(Polygon::new(top.clone()));
    }
    for i in 0..sides {
        let j = (i + 1) % sides;
        polygons.extend(Polygon::new(vec![bottom[i], bottom[j], top[j], top[i]]));
    }
    outward_convex(polygons)
}

/// Regular polygon whose inscribed circle has radius `apothem`
pub(crate) fn regular_polygon(apothem: f64, sides: usize) -> Vec<DVec2> {
    let circumradius = apothem / (PI / sides as f64).cos();
    (0..sides)
        .map(|i| {
            let theta = i as f64 / sides as f64 * TAU;
            DVec2::new(circumradius * theta.cos(), circumradius * theta.sin())
        })
        .collect()
}

/// Twice the signed area of a closed 2D ring (positive when counter-clockwise)
pub(crate) fn signed_area2(ring: &[DVec2]) -> f64 {
    ring.iter()
        .enumerate()
        .map(|(i, a)| a.perp_dot(ring[(i + 1) % ring.len()]))
        .sum()
}

/// Triangulate a ring with holes, returning counter-clockwise triangles
fn triangulate(outer: &[DVec2], holes: &[Vec<DVec2>]) -> CadResult<Vec<[DVec2; 3]>> {
    let mut flat = Vec::new();
    let mut hole_indices = Vec::with_capacity(holes.len());
    let mut points = Vec::new();
    for p in outer {
        flat.extend([p.x, p.y]);
        points.push(*p);
    }
    for hole in holes {
        hole_indices.push(points.len());
        for p in hole {
            flat.extend([p.x, p.y]);
            points.push(*p);
        }
    }

    let indices = earcutr::earcut(&flat, &hole_indices, 2)
        .map_err(|e| CadError::OperationFailed(format!("Triangulation failed: {:?}", e)))?;

    Ok(indices
        .chunks_exact(3)
        .map(|tri| {
            let (a, b, c) = (points[tri[0]], points[tri[1]], points[tri[2]]);
            if (b - a).perp_dot(c - a) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect())
}

/// Normalize ring orientation: outer counter-clockwise, holes clockwise
fn oriented(ring: &[DVec2], counter_clockwise: bool) -> Vec<DVec2> {
    let mut ring = ring.to_vec();
    if (signed_area2(&ring) > 0.0) != counter_clockwise {
        ring.reverse();
    }
    ring
}

/// Extrude a 2D region with holes from `z = 0` to `z = height`
pub(crate) fn prism(outer: &[DVec2], holes: &[Vec<DVec2>], height: f64) -> CadResult<Vec<Polygon>> {
    if outer.len() < 3 {
        return Err(CadError::InvalidGeometryParameter(
            "Profile must have at least 3 points".into(),
        ));
    }
    if signed_area2(outer).abs() < 1e-12 {
        return Err(CadError::InvalidGeometryParameter(
            "Profile encloses no area".into(),
        ));
    }

    let outer = oriented(outer, true);
    let holes: Vec<Vec<DVec2>> = holes.iter().map(|h| oriented(h, false)).collect();

    let lift = |p: DVec2, z: f64| DVec3::new(p.x, p.y, z);
    let mut polygons = Vec::new();
    for [a, b, c] in triangulate(&outer, &holes)? {
        polygons.extend(Polygon::new(vec![lift(a, height), lift(b, height), lift(c, height)]));
        polygons.extend(Polygon::new(vec![lift(a, 0.0), lift(c, 0.0), lift(b, 0.0)]));
    }
    for ring in std::iter::once(&outer).chain(holes.iter()) {
        for (i, a) in ring.iter().enumerate() {
            let b = ring[(i + 1) % ring.len()];
            polygons.extend(Polygon::new(vec![
                lift(*a, 0.0),
                lift(b, 0.0),
                lift(b, height),
                lift(*a, height),
            ]));
        }
    }
    Ok(polygons)
}

/// Revolve a closed profile (`x` along the axis, `y` as radius) about X
pub(crate) fn revolve(profile: &[DVec2], degrees: f64, segments: usize) -> CadResult<Vec<Polygon>> {
    if profile.len() < 3 {
        return Err(CadError::InvalidGeometryParameter(
            "Profile must have at least 3 points".into(),
        ));
    }
    if profile.iter().any(|p| p.y < 0.0) {
        return Err(CadError::InvalidGeometryParameter(
            "Revolve profile must not cross the X axis".into(),
        ));
    }

    let profile = oriented(profile, true);
    let full = degrees >= 360.0;
    let sweep = degrees.min(360.0).to_radians();
    let steps = ((segments as f64 * sweep / TAU).ceil() as usize).max(1);
    let place = |p: DVec2, step: usize| {
        let angle = if full && step == steps {
            0.0
        } else {
            sweep * step as f64 / steps as f64
        };
        DVec3::new(p.x, p.y * angle.cos(), p.y * angle.sin())
    };

    let mut polygons = Vec::new();
    for step in 0..steps {
        for (i, a) in profile.iter().enumerate() {
            let b = profile[(i + 1) % profile.len()];
            polygons.extend(Polygon::new(vec![
                place(*a, step),
                place(b, step),
                place(b, step + 1),
                place(*a, step + 1),
            ]));
        }
    }
    if !full {
        for [a, b, c] in triangulate(&profile, &[])? {
            polygons.extend(Polygon::new(vec![place(a, 0), place(c, 0), place(b, 0)]));
            polygons.extend(Polygon::new(vec![
                place(a, steps),
                place(b, steps),
                place(c, steps),
            ]));
        }
    }
    Ok(orient_outward(polygons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::bsp::{bounds, signed_volume};
    use approx::assert_relative_eq;

    #[test]
    fn test_cuboid_volume_and_bounds() {
        let polygons = cuboid(DVec3::new(10.0, 20.0, 30.0));
        assert_eq!(polygons.len(), 6);
        assert_relative_eq!(signed_volume(&polygons), 6000.0, epsilon = 1e-9);
        let bbox = bounds(&polygons).unwrap();
        assert_eq!(bbox.size(), DVec3::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_sphere_bounds_and_volume() {
        let polygons = sphere(2.0, 24, 12);
        let bbox = bounds(&polygons).unwrap();
        assert_relative_eq!(bbox.size().x, 4.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().y, 4.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().z, 4.0, epsilon = 1e-9);
        let exact = 4.0 / 3.0 * PI * 8.0;
        let volume = signed_volume(&polygons);
        assert!(volume > 0.0 && volume < exact);
        assert!(volume > exact * 0.9);
    }

    #[test]
    fn test_frustum_apex() {
        let polygons = frustum(2.0, 1.0, 0.0, 16);
        // base cap plus one triangle per side
        assert_eq!(polygons.len(), 17);
        assert!(signed_volume(&polygons) > 0.0);
    }

    #[test]
    fn test_regular_polygon_apothem() {
        let hex = regular_polygon(1.0, 6);
        let mid = (hex[0] + hex[1]) * 0.5;
        assert_relative_eq!(mid.length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_prism_with_hole() {
        let outer = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(4.0, 0.0),
            DVec2::new(4.0, 4.0),
            DVec2::new(0.0, 4.0),
        ];
        let hole = vec![
            DVec2::new(1.0, 1.0),
            DVec2::new(3.0, 1.0),
            DVec2::new(3.0, 3.0),
            DVec2::new(1.0, 3.0),
        ];
        let polygons = prism(&outer, &[hole], 2.0).unwrap();
        assert_relative_eq!(signed_volume(&polygons), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_prism_clockwise_input() {
        let square = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 0.0),
        ];
        let polygons = prism(&square, &[], 3.0).unwrap();
        assert_relative_eq!(signed_volume(&polygons), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_revolve_full_and_partial() {
        // unit square offset from the axis revolves into a washer
        let square = vec![
            DVec2::new(0.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(0.0, 2.0),
        ];
        let full = revolve(&square, 360.0, 64).unwrap();
        let exact = PI * (4.0 - 1.0);
        let volume = signed_volume(&full);
        assert!(volume > exact * 0.98 && volume < exact);

        let half = revolve(&square, 180.0, 64).unwrap();
        assert_relative_eq!(signed_volume(&half), volume / 2.0, max_relative = 1e-6);
    }

    #[test]
    fn test_revolve_rejects_negative_radius() {
        let profile = vec![
            DVec2::new(0.0, -1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ];
        assert!(matches!(
            revolve(&profile, 360.0, 16),
            Err(CadError::InvalidGeometryParameter(_))
        ));
    }
}
