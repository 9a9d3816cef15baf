//! Operator sugar over engine booleans
//!
//! `a + b` joins, `a - b` cuts and `a & b` intersects. A `None` right-hand
//! side leaves the left operand untouched.

use std::ops::{Add, BitAnd, Sub};

use crate::kernel::{CadEngine, CadResult, Shape};

/// A shape paired with the engine that owns it
#[derive(Clone)]
pub struct Fluent<'e> {
    engine: &'e dyn CadEngine,
    shape: Shape,
}

impl<'e> Fluent<'e> {
    pub fn new(engine: &'e dyn CadEngine, shape: Shape) -> Self {
        Self { engine, shape }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn into_shape(self) -> Shape {
        self.shape
    }

    pub fn engine(&self) -> &'e dyn CadEngine {
        self.engine
    }

    fn with(&self, result: CadResult<Shape>) -> CadResult<Fluent<'e>> {
        result.map(|shape| Fluent::new(self.engine, shape))
    }

    pub fn join(&self, other: Option<&Shape>) -> CadResult<Fluent<'e>> {
        self.with(self.engine.join(&self.shape, other))
    }

    pub fn cut(&self, other: Option<&Shape>) -> CadResult<Fluent<'e>> {
        self.with(self.engine.cut(&self.shape, other))
    }

    pub fn intersect(&self, other: Option<&Shape>) -> CadResult<Fluent<'e>> {
        self.with(self.engine.intersect(&self.shape, other))
    }

    pub fn move_by(&self, dx: f64, dy: f64, dz: f64) -> CadResult<Fluent<'e>> {
        self.with(self.engine.move_by(&self.shape, dx, dy, dz))
    }
}

impl std::fmt::Debug for Fluent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fluent")
            .field("engine", &self.engine.name())
            .field("shape", &self.shape)
            .finish()
    }
}

macro_rules! fluent_operator {
    ($trait:ident, $method:ident, $op:ident) => {
        impl<'e> $trait<Option<&Shape>> for &Fluent<'e> {
            type Output = CadResult<Fluent<'e>>;

            fn $method(self, rhs: Option<&Shape>) -> Self::Output {
                self.$op(rhs)
            }
        }

        impl<'e> $trait<&Shape> for &Fluent<'e> {
            type Output = CadResult<Fluent<'e>>;

            fn $method(self, rhs: &Shape) -> Self::Output {
                self.$op(Some(rhs))
            }
        }

        impl<'e> $trait<&Fluent<'e>> for &Fluent<'e> {
            type Output = CadResult<Fluent<'e>>;

            fn $method(self, rhs: &Fluent<'e>) -> Self::Output {
                self.$op(Some(&rhs.shape))
            }
        }
    };
}

fluent_operator!(Add, add, join);
fluent_operator!(Sub, sub, cut);
fluent_operator!(BitAnd, bitand, intersect);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{CsgEngine, NullEngine};
    use approx::assert_relative_eq;

    #[test]
    fn test_operators_combine() {
        let engine = CsgEngine::default();
        let base = Fluent::new(&engine, engine.cuboid(4.0, 4.0, 4.0).unwrap());
        let hole = engine.cylinder_z(10.0, 1.0).unwrap();
        let lid = base.move_by(0.0, 0.0, 3.0).unwrap();

        let drilled = (&base - &hole).unwrap();
        let stacked = (&drilled + &lid).unwrap();
        let overlap = (&base & &lid).unwrap();

        let size = engine.bounding_box(stacked.shape()).unwrap().size();
        assert_relative_eq!(size.z, 7.0, epsilon = 1e-9);
        let overlap_size = engine.bounding_box(overlap.shape()).unwrap().size();
        assert_relative_eq!(overlap_size.z, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_none_passes_through() {
        let engine = NullEngine::default();
        let shape = Shape::new(uuid::Uuid::new_v4());
        let fluent = Fluent::new(&engine, shape.clone());
        assert_eq!((&fluent + None).unwrap().into_shape(), shape);
        assert_eq!((&fluent - None).unwrap().into_shape(), shape);
        assert_eq!((&fluent & None).unwrap().into_shape(), shape);
        assert!((&fluent + &shape).is_err());
    }
}
