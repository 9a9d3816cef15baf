//! Mixed line and spline profile paths
//!
//! A path starts at a point and continues with straight segments and
//! spline curves. Curves pass through knots with a prescribed gradient and
//! are flattened to points as cubic Bézier spans.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::kernel::{CadError, CadResult};

/// Control-distance ratio meaning "derive from neighbouring geometry"
pub const AUTO: f64 = f64::NEG_INFINITY;

/// A point a curve passes through
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKnot {
    pub point: DVec2,
    /// dy/dx of the curve at the knot; infinite for a vertical tangent
    pub gradient: f64,
    /// Control distance before the knot as a fraction of the chord, or [`AUTO`]
    pub prev_ratio: f64,
    /// Control distance after the knot as a fraction of the chord, or [`AUTO`]
    pub post_ratio: f64,
}

impl CurveKnot {
    /// Knot with automatic control distances
    pub fn new(point: DVec2, gradient: f64) -> Self {
        Self {
            point,
            gradient,
            prev_ratio: AUTO,
            post_ratio: AUTO,
        }
    }

    /// Set explicit control distances
    pub fn with_ratios(mut self, prev_ratio: f64, post_ratio: f64) -> Self {
        self.prev_ratio = prev_ratio;
        self.post_ratio = post_ratio;
        self
    }

    fn validate(&self) -> CadResult<()> {
        if !self.point.is_finite() || self.gradient.is_nan() {
            return Err(CadError::InvalidGeometryParameter(format!(
                "Curve knot {} has a non-finite coordinate or gradient",
                self.point
            )));
        }
        for ratio in [self.prev_ratio, self.post_ratio] {
            if ratio != AUTO && !(ratio.is_finite() && ratio >= 0.0) {
                return Err(CadError::InvalidGeometryParameter(format!(
                    "Curve ratio must be AUTO or a non-negative number, got {}",
                    ratio
                )));
            }
        }
        Ok(())
    }

    /// Unit tangent from the gradient
    fn tangent(&self) -> DVec2 {
        if self.gradient.is_infinite() {
            DVec2::Y
        } else {
            DVec2::new(1.0, self.gradient).normalize()
        }
    }
}

/// One element of a profile path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathElement {
    /// Straight segment to a point
    Line(DVec2),
    /// Spline through at least two knots
    Curve(Vec<CurveKnot>),
}

impl PathElement {
    pub fn line(x: f64, y: f64) -> Self {
        PathElement::Line(DVec2::new(x, y))
    }
}

/// Flatten a path into an ordered point list. `segments` is the smoothing
/// count of the engine fidelity.
pub fn build_path(start: DVec2, elements: &[PathElement], segments: usize) -> CadResult<Vec<DVec2>> {
    if !start.is_finite() {
        return Err(CadError::InvalidGeometryParameter(format!(
            "Path start {} is not finite",
            start
        )));
    }

    let mut points = vec![start];
    for element in elements {
        match element {
            PathElement::Line(p) => {
                if !p.is_finite() {
                    return Err(CadError::InvalidGeometryParameter(format!(
                        "Line end {} is not finite",
                        p
                    )));
                }
                points.push(*p);
            }
            PathElement::Curve(knots) => {
                if knots.len() < 2 {
                    return Err(CadError::InvalidGeometryParameter(format!(
                        "Curve needs at least 2 knots, got {}",
                        knots.len()
                    )));
                }
                for knot in knots {
                    knot.validate()?;
                }
                if points.last() != Some(&knots[0].point) {
                    points.push(knots[0].point);
                }
                for pair in knots.windows(2) {
                    sample_span(&pair[0], &pair[1], segments, &mut points);
                }
            }
        }
    }
    points.dedup();
    Ok(points)
}

/// Control points of the cubic span between two knots
fn control_points(k0: &CurveKnot, k1: &CurveKnot) -> (DVec2, DVec2) {
    let delta = k1.point - k0.point;
    let chord = delta.length();

    let mut t0 = k0.tangent();
    if t0.dot(delta) < 0.0 {
        t0 = -t0;
    }
    let mut t1 = k1.tangent();
    if t1.dot(delta) < 0.0 {
        t1 = -t1;
    }

    // Distances along each tangent to the point where the tangent lines meet
    let denom = t0.perp_dot(t1);
    let apex = if denom.abs() > 1e-12 {
        let ahead = delta.perp_dot(t1) / denom;
        let behind = t0.perp_dot(delta) / denom;
        (ahead > 0.0 && behind > 0.0).then_some((ahead, behind))
    } else {
        None
    };

    let c0 = if k0.post_ratio == AUTO {
        match apex {
            Some((ahead, _)) => k0.point + t0 * (ahead * 2.0 / 3.0),
            None => k0.point + t0 * (chord / 3.0),
        }
    } else {
        k0.point + t0 * (k0.post_ratio * chord)
    };
    let c1 = if k1.prev_ratio == AUTO {
        match apex {
            Some((_, behind)) => k1.point - t1 * (behind * 2.0 / 3.0),
            None => k1.point - t1 * (chord / 3.0),
        }
    } else {
        k1.point - t1 * (k1.prev_ratio * chord)
    };
    (c0, c1)
}

fn sample_span(k0: &CurveKnot, k1: &CurveKnot, segments: usize, out: &mut Vec<DVec2>) {
    let chord = k0.point.distance(k1.point);
    if chord == 0.0 {
        return;
    }
    let (c0, c1) = control_points(k0, k1);
    let n = ((segments.max(1) as f64 * chord.max(1.0).sqrt()).ceil() as usize).max(1);
    for i in 1..n {
        let t = i as f64 / n as f64;
        let u = 1.0 - t;
        out.push(
            k0.point * (u * u * u) + c0 * (3.0 * u * u * t) + c1 * (3.0 * u * t * t) + k1.point * (t * t * t),
        );
    }
    out.push(k1.point);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wave() -> Vec<PathElement> {
        vec![
            PathElement::line(10.0, 0.0),
            PathElement::Curve(vec![
                CurveKnot::new(DVec2::new(10.0, 0.0), 1.0),
                CurveKnot::new(DVec2::new(12.0, 5.0), f64::INFINITY).with_ratios(0.4, 0.4),
                CurveKnot::new(DVec2::new(8.0, 9.0), -0.5),
            ]),
            PathElement::line(0.0, 9.0),
        ]
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build_path(DVec2::ZERO, &wave(), 12).unwrap();
        let b = build_path(DVec2::ZERO, &wave(), 12).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.first(), Some(&DVec2::ZERO));
        assert_eq!(a.last(), Some(&DVec2::new(0.0, 9.0)));
    }

    #[test]
    fn test_knots_are_interpolated_without_duplicates() {
        let points = build_path(DVec2::ZERO, &wave(), 6).unwrap();
        assert!(points.contains(&DVec2::new(12.0, 5.0)));
        // the curve starts where the line ended, so the knot is not repeated
        assert_eq!(points.iter().filter(|p| **p == DVec2::new(10.0, 0.0)).count(), 1);
        assert!(points.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_sample_count_grows_with_chord() {
        let curve = |len: f64| {
            vec![PathElement::Curve(vec![
                CurveKnot::new(DVec2::ZERO, 0.0),
                CurveKnot::new(DVec2::new(len, 0.0), 0.0),
            ])]
        };
        // ceil(6 * sqrt(max(0.5, 1))) = 6 and ceil(6 * sqrt(4)) = 12
        assert_eq!(build_path(DVec2::ZERO, &curve(0.5), 6).unwrap().len(), 7);
        assert_eq!(build_path(DVec2::ZERO, &curve(4.0), 6).unwrap().len(), 13);
    }

    #[test]
    fn test_parallel_tangents_stay_straight() {
        let path = [PathElement::Curve(vec![
            CurveKnot::new(DVec2::ZERO, 0.0),
            CurveKnot::new(DVec2::new(4.0, 0.0), 0.0),
        ])];
        let points = build_path(DVec2::ZERO, &path, 6).unwrap();
        assert!(points.iter().all(|p| p.y == 0.0));
        assert!(points.windows(2).all(|w| w[1].x > w[0].x));
    }

    #[test]
    fn test_auto_uses_tangent_intersection() {
        let path = [PathElement::Curve(vec![
            CurveKnot::new(DVec2::ZERO, 0.0),
            CurveKnot::new(DVec2::ONE, f64::INFINITY),
        ])];
        // one segment over a chord of sqrt(2) gives two samples
        let points = build_path(DVec2::ZERO, &path, 1).unwrap();
        assert_eq!(points.len(), 3);
        assert_relative_eq!(points[1].x, 0.75, epsilon = 1e-12);
        assert_relative_eq!(points[1].y, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_explicit_ratio_places_controls() {
        let (c0, c1) = control_points(
            &CurveKnot::new(DVec2::ZERO, 0.0).with_ratios(AUTO, 0.5),
            &CurveKnot::new(DVec2::new(2.0, 0.0), 0.0).with_ratios(0.25, AUTO),
        );
        assert_eq!(c0, DVec2::new(1.0, 0.0));
        assert_eq!(c1, DVec2::new(1.5, 0.0));
    }

    #[test]
    fn test_line_to_first_knot_when_detached() {
        let path = [PathElement::Curve(vec![
            CurveKnot::new(DVec2::new(0.0, 3.0), 0.0),
            CurveKnot::new(DVec2::new(3.0, 3.0), 0.0),
        ])];
        let points = build_path(DVec2::ZERO, &path, 6).unwrap();
        assert_eq!(points[1], DVec2::new(0.0, 3.0));
    }

    #[test]
    fn test_invalid_curves() {
        let single = [PathElement::Curve(vec![CurveKnot::new(DVec2::ONE, 0.0)])];
        assert!(matches!(
            build_path(DVec2::ZERO, &single, 6),
            Err(CadError::InvalidGeometryParameter(_))
        ));
        let negative = [PathElement::Curve(vec![
            CurveKnot::new(DVec2::ZERO, 0.0).with_ratios(AUTO, -1.0),
            CurveKnot::new(DVec2::ONE, 0.0),
        ])];
        assert!(build_path(DVec2::ZERO, &negative, 6).is_err());
    }
}
