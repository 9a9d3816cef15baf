//! Compound constructions built only from [`CadEngine`] operations
//!
//! Everything here works unchanged on any engine; [`DerivedGeometry`] is
//! implemented for every engine, boxed or not.

use serde::{Deserialize, Serialize};

use crate::kernel::{CadEngine, CadError, CadResult, Direction, Shape, Transform};

/// Side of the cube used by [`DerivedGeometry::half`]. Geometry further than
/// half of this from the origin is not fully cut.
pub const HALF_EXTENT: f64 = 2000.0;

/// Variations on a plain cylinder; at most one may be set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CylinderOptions {
    /// Radius at the positive end (makes a cone)
    pub rad2: Option<f64>,
    /// Polygonal cross-section with this many sides
    pub sides: Option<usize>,
    /// Cap height as a fraction of the radius (makes a domed rod)
    pub dome_ratio: Option<f64>,
}

impl CylinderOptions {
    pub fn cone(rad2: f64) -> Self {
        Self { rad2: Some(rad2), ..Self::default() }
    }

    pub fn polygon(sides: usize) -> Self {
        Self { sides: Some(sides), ..Self::default() }
    }

    pub fn domed(dome_ratio: f64) -> Self {
        Self { dome_ratio: Some(dome_ratio), ..Self::default() }
    }

    fn count(&self) -> usize {
        usize::from(self.rad2.is_some())
            + usize::from(self.sides.is_some())
            + usize::from(self.dome_ratio.is_some())
    }
}

/// Engine-independent compound shapes
pub trait DerivedGeometry: CadEngine {
    /// Cylinder along `direction` with an optional variation
    fn cylinder(
        &self,
        length: f64,
        radius: f64,
        options: CylinderOptions,
        direction: Direction,
    ) -> CadResult<Shape> {
        if options.count() > 1 {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Cylinder options are mutually exclusive, got {:?}",
                options
            )));
        }
        if let Some(rad2) = options.rad2 {
            self.cone_dir(length, radius, rad2, direction)
        } else if let Some(sides) = options.sides {
            self.regpoly_extrusion(length, radius, sides, direction)
        } else if let Some(dome) = options.dome_ratio {
            self.cylinder_rounded(length, radius, dome, direction)
        } else {
            self.cylinder_dir(length, radius, direction)
        }
    }

    /// Rod along Z whose ends are spheres flattened to `dome × radius`.
    /// `length` includes the caps.
    fn cylinder_rounded_z(&self, length: f64, radius: f64, dome: f64) -> CadResult<Shape> {
        if !(dome.is_finite() && dome >= 0.0) {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Dome ratio must not be negative, got {}",
                dome
            )));
        }
        if dome == 0.0 {
            return self.cylinder_z(length, radius);
        }
        let stem = length - 2.0 * radius * dome;
        if stem < 0.0 {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Rod of length {} is too short for caps of radius {} and dome {}",
                length, radius, dome
            )));
        }

        let sphere = self.sphere(radius)?;
        let cap = self.scale(&sphere, 1.0, 1.0, dome)?;
        self.discard(&[&sphere], &[&cap]);
        if stem == 0.0 {
            return Ok(cap);
        }
        let body = self.cylinder_z(stem, radius)?;
        let top = self.move_by(&cap, 0.0, 0.0, stem / 2.0)?;
        let bottom = self.move_by(&cap, 0.0, 0.0, -stem / 2.0)?;
        let rod = self.join(&body, Some(&top))?;
        let rod_full = self.join(&rod, Some(&bottom))?;
        self.discard(&[&cap, &body, &top, &bottom, &rod], &[&rod_full]);
        Ok(rod_full)
    }

    fn cylinder_rounded_x(&self, length: f64, radius: f64, dome: f64) -> CadResult<Shape> {
        let rod = self.cylinder_rounded_z(length, radius, dome)?;
        let rotated = self.rotate_y(&rod, 90.0)?;
        self.discard(&[&rod], &[&rotated]);
        Ok(rotated)
    }

    fn cylinder_rounded_y(&self, length: f64, radius: f64, dome: f64) -> CadResult<Shape> {
        let rod = self.cylinder_rounded_z(length, radius, dome)?;
        let rotated = self.rotate_x(&rod, -90.0)?;
        self.discard(&[&rod], &[&rotated]);
        Ok(rotated)
    }

    fn cylinder_rounded(
        &self,
        length: f64,
        radius: f64,
        dome: f64,
        direction: Direction,
    ) -> CadResult<Shape> {
        match direction {
            Direction::X => self.cylinder_rounded_x(length, radius, dome),
            Direction::Y => self.cylinder_rounded_y(length, radius, dome),
            Direction::Z => self.cylinder_rounded_z(length, radius, dome),
        }
    }

    /// Cutter that rounds an edge running along `direction` through the
    /// origin. The mask occupies the positive quadrant of the cross-section
    /// before the optional rotation about `direction`.
    fn edge_mask(
        &self,
        length: f64,
        radius: f64,
        direction: Direction,
        rotation_degrees: f64,
    ) -> CadResult<Shape> {
        let side = radius + self.tolerance();
        let size = direction.unit() * length + (glam::DVec3::ONE - direction.unit()) * side;
        let centered = self.cuboid(size.x, size.y, size.z)?;
        let shift = (glam::DVec3::ONE - direction.unit()) * (side / 2.0);
        let block = self.move_by(&centered, shift.x, shift.y, shift.z)?;

        // Longer than the block so no end faces coincide
        let round = self.cylinder_dir(length + 2.0 * side, side, direction)?;
        let mask = self.cut(&block, Some(&round))?;
        let rotated = if rotation_degrees == 0.0 {
            mask.clone()
        } else {
            self.transform(&mask, Transform::Rotate { direction, degrees: rotation_degrees })?
        };
        self.discard(&[&centered, &block, &round, &mask], &[&rotated]);
        Ok(rotated)
    }

    /// One quarter of a sphere: the `z >= 0` half when `top`, then the
    /// `y >= 0` half when `front`
    fn sphere_quadrant(&self, radius: f64, top: bool, front: bool) -> CadResult<Shape> {
        let side = 2.0 * radius + self.tolerance();
        let sphere = self.sphere(radius)?;
        let cutter = self.cuboid(side, side, side)?;

        let z_cutter = self.move_by(&cutter, 0.0, 0.0, if top { -side / 2.0 } else { side / 2.0 })?;
        let half = self.cut(&sphere, Some(&z_cutter))?;
        let y_cutter = self.move_by(&cutter, 0.0, if front { -side / 2.0 } else { side / 2.0 }, 0.0)?;
        let quadrant = self.cut(&half, Some(&y_cutter))?;
        self.discard(&[&sphere, &cutter, &z_cutter, &half, &y_cutter], &[&quadrant]);
        Ok(quadrant)
    }

    /// Cylinder along `direction` split lengthwise. The cut plane is normal
    /// to the next axis (X to Y, Y to Z, Z to X).
    fn half_cylinder(
        &self,
        length: f64,
        radius: f64,
        direction: Direction,
        keep_positive: bool,
    ) -> CadResult<Shape> {
        let cylinder = self.cylinder_dir(length, radius, direction)?;
        let side = 2.0 * (length + 2.0 * radius) + self.tolerance();
        let block = self.cuboid(side, side, side)?;
        let offset = if keep_positive { -side / 2.0 } else { side / 2.0 };
        let cutter = self.move_along(&block, direction.next(), offset)?;
        let halved = self.cut(&cylinder, Some(&cutter))?;
        self.discard(&[&cylinder, &block, &cutter], &[&halved]);
        Ok(halved)
    }

    /// Remove the negative (`keep_positive`) or positive half-space along
    /// `direction`
    fn half(&self, shape: &Shape, direction: Direction, keep_positive: bool) -> CadResult<Shape> {
        let block = self.cuboid(HALF_EXTENT, HALF_EXTENT, HALF_EXTENT)?;
        let offset = if keep_positive { -HALF_EXTENT / 2.0 } else { HALF_EXTENT / 2.0 };
        let cutter = self.move_along(&block, direction, offset)?;
        let halved = self.cut(shape, Some(&cutter))?;
        self.discard(&[&block, &cutter], &[&halved, shape]);
        Ok(halved)
    }

    /// Join a shape with its reflection across the XZ plane, the halves
    /// held apart by the engine tolerance
    fn mirror_join(&self, shape: &Shape) -> CadResult<Shape> {
        let gap = self.tolerance() / 2.0;
        let reflected = self.mirror(shape)?;
        let mirrored = self.move_by(&reflected, 0.0, -gap, 0.0)?;
        let original = self.move_by(shape, 0.0, gap, 0.0)?;
        let joined = self.join(&original, Some(&mirrored))?;
        self.discard(&[&reflected, &mirrored, &original], &[&joined, shape]);
        Ok(joined)
    }

    fn cone_dir(&self, height: f64, r1: f64, r2: f64, direction: Direction) -> CadResult<Shape> {
        match direction {
            Direction::X => self.cone_x(height, r1, r2),
            Direction::Y => self.cone_y(height, r1, r2),
            Direction::Z => self.cone_z(height, r1, r2),
        }
    }

    fn cylinder_dir(&self, height: f64, radius: f64, direction: Direction) -> CadResult<Shape> {
        match direction {
            Direction::X => self.cylinder_x(height, radius),
            Direction::Y => self.cylinder_y(height, radius),
            Direction::Z => self.cylinder_z(height, radius),
        }
    }
}

impl<E: CadEngine + ?Sized> DerivedGeometry for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{CsgEngine, EngineKind, Fidelity, NullEngine};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn volume(engine: &dyn CadEngine, shape: &Shape) -> f64 {
        let mesh = engine.tessellate(shape).unwrap();
        mesh.triangles()
            .map(|[a, b, c]| {
                let (a, b, c) = (
                    glam::DVec3::from(a.map(f64::from)),
                    glam::DVec3::from(b.map(f64::from)),
                    glam::DVec3::from(c.map(f64::from)),
                );
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    #[test]
    fn test_rod_bounds_in_every_direction() {
        let engine = CsgEngine::default();
        for direction in Direction::ALL {
            let rod = engine.cylinder_rounded(30.0, 5.0, 1.0, direction).unwrap();
            let size = engine.bounding_box(&rod).unwrap().size();
            let mut expected = glam::DVec3::splat(10.0);
            expected[direction.index()] = 30.0;
            assert_relative_eq!(size.x, expected.x, epsilon = 1e-6);
            assert_relative_eq!(size.y, expected.y, epsilon = 1e-6);
            assert_relative_eq!(size.z, expected.z, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_flat_dome_is_plain_cylinder() {
        let engine = CsgEngine::new(Fidelity::High);
        let rod = engine.cylinder_rounded_z(20.0, 3.0, 0.0).unwrap();
        let analytic = PI * 3.0 * 3.0 * 20.0;
        assert_relative_eq!(volume(&engine, &rod), analytic, max_relative = 0.01);
    }

    #[test]
    fn test_zero_stem_is_scaled_sphere() {
        let engine = CsgEngine::default();
        let rod = engine.cylinder_rounded_z(5.0, 5.0, 0.5).unwrap();
        let size = engine.bounding_box(&rod).unwrap().size();
        assert_relative_eq!(size.x, 10.0, epsilon = 1e-6);
        assert_relative_eq!(size.z, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rod_too_short() {
        let engine = CsgEngine::default();
        assert!(matches!(
            engine.cylinder_rounded_z(5.0, 5.0, 1.0),
            Err(CadError::InvalidGeometryParameter(_))
        ));
    }

    #[test]
    fn test_cylinder_options() {
        let engine = CsgEngine::default();
        let conflicting = CylinderOptions { rad2: Some(1.0), sides: Some(6), dome_ratio: None };
        assert!(matches!(
            engine.cylinder(10.0, 2.0, conflicting, Direction::Z),
            Err(CadError::InvalidGeometryParameter(_))
        ));

        let hex = engine.cylinder(10.0, 2.0, CylinderOptions::polygon(6), Direction::X).unwrap();
        assert_relative_eq!(engine.bounding_box(&hex).unwrap().size().x, 10.0, epsilon = 1e-9);

        let cone = engine.cylinder(10.0, 2.0, CylinderOptions::cone(0.0), Direction::Z).unwrap();
        let plain = engine.cylinder(10.0, 2.0, CylinderOptions::default(), Direction::Z).unwrap();
        assert!(volume(&engine, &cone) < volume(&engine, &plain) / 2.0);
    }

    #[test]
    fn test_half_keeps_requested_side() {
        let engine = CsgEngine::default();
        let cube = engine.cuboid(10.0, 10.0, 10.0).unwrap();

        let positive = engine.half(&cube, Direction::X, true).unwrap();
        let bbox = engine.bounding_box(&positive).unwrap();
        assert_relative_eq!(bbox.min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(volume(&engine, &positive), 500.0, epsilon = 1e-3);

        let negative = engine.half(&cube, Direction::Z, false).unwrap();
        assert_relative_eq!(engine.bounding_box(&negative).unwrap().max.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_half_cylinder_cuts_next_axis() {
        let engine = CsgEngine::default();
        let half = engine.half_cylinder(10.0, 2.0, Direction::Z, true).unwrap();
        let bbox = engine.bounding_box(&half).unwrap();
        // Z's next axis is X
        assert_relative_eq!(bbox.min.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.size().z, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_quadrant() {
        let engine = CsgEngine::default();
        let quadrant = engine.sphere_quadrant(4.0, true, false).unwrap();
        let bbox = engine.bounding_box(&quadrant).unwrap();
        assert_relative_eq!(bbox.min.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.z, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_edge_mask_bounds() {
        let engine = CsgEngine::default();
        let mask = engine.edge_mask(12.0, 2.0, Direction::X, 0.0).unwrap();
        let side = 2.0 + engine.tolerance();
        let bbox = engine.bounding_box(&mask).unwrap();
        assert_relative_eq!(bbox.size().x, 12.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.y, side, epsilon = 1e-6);
        assert_relative_eq!(bbox.max.z, side, epsilon = 1e-6);
        assert!(volume(&engine, &mask) < 12.0 * side * side * 0.25);

        let turned = engine.edge_mask(12.0, 2.0, Direction::X, 180.0).unwrap();
        assert_relative_eq!(engine.bounding_box(&turned).unwrap().min.y, -side, epsilon = 1e-6);
    }

    #[test]
    fn test_mirror_join_spans_both_sides() {
        let engine = CsgEngine::default();
        let gap = engine.tolerance() / 2.0;
        let cube = engine.cuboid(2.0, 2.0, 2.0).unwrap().with_name("lug");
        let cube = engine.move_by(&cube, 0.0, 3.0, 0.0).unwrap();
        let pair = engine.mirror_join(&cube).unwrap();
        let bbox = engine.bounding_box(&pair).unwrap();
        assert_relative_eq!(bbox.max.y, 4.0 + gap, epsilon = 1e-9);
        assert_relative_eq!(bbox.min.y, -4.0 - gap, epsilon = 1e-9);
        assert_eq!(pair.name.as_deref(), Some("lug"));
    }

    #[test]
    fn test_works_through_boxed_engine() {
        let engine = EngineKind::Csg.instantiate(Fidelity::Low);
        let rod = engine.cylinder_dir(4.0, 1.0, Direction::Y).unwrap();
        assert_relative_eq!(engine.bounding_box(&rod).unwrap().size().y, 4.0, epsilon = 1e-9);

        let null = NullEngine::default();
        assert!(matches!(
            null.mirror_join(&rod),
            Err(CadError::KernelNotAvailable(_))
        ));
    }

    #[test]
    fn test_constructions_store_only_their_result() {
        let engine = CsgEngine::new(Fidelity::Low);
        let rod = engine.cylinder_rounded_x(10.0, 1.0, 1.0).unwrap();
        assert_eq!(engine.shape_count(), 1);

        let mask = engine.edge_mask(5.0, 1.0, Direction::Z, 0.0).unwrap();
        let quadrant = engine.sphere_quadrant(2.0, true, false).unwrap();
        let split = engine.half_cylinder(4.0, 1.0, Direction::X, true).unwrap();
        assert_eq!(engine.shape_count(), 4);

        let halved = engine.half(&rod, Direction::X, true).unwrap();
        let pair = engine.mirror_join(&split).unwrap();
        assert_eq!(engine.shape_count(), 6);
        for shape in [&rod, &mask, &quadrant, &split, &halved, &pair] {
            assert!(engine.bounding_box(shape).is_ok());
        }
    }
}
