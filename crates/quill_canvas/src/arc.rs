//! Arc geometry: tangent-circle corners and elliptical arcs as cubics

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use smallvec::SmallVec;

use quill_core::Point;

/// Dimensionless tolerance on the corner cosine.
///
/// Corners whose cosine is within this distance of 1 or -1 are treated
/// as straight lines.
pub const ARC_TO_EPSILON: f64 = 1e-9;

/// Control point factor for a quarter circle (4/3 * tan(pi/8))
const QUARTER_ARC_CV: f64 = 0.552_284_749_830_793_3;

/// A cubic Bézier piece starting at the previous pen position
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicCurve {
    pub ctrl1: Point,
    pub ctrl2: Point,
    pub end: Point,
}

/// The replacement geometry for an arc-to corner, in user space
#[derive(Clone, Debug, PartialEq)]
pub struct ArcToCurves {
    /// Straight segment to the first tangent point, when it differs from p0
    pub lead_in: Option<Point>,
    pub curves: SmallVec<[CubicCurve; 2]>,
    pub center: Point,
}

/// Round the corner p0 -> p1 -> p2 with a circle of `radius`.
///
/// Returns `None` for any degenerate input; callers draw a straight line
/// to `p1` instead.
pub fn arc_to_curves(p0: Point, p1: Point, p2: Point, radius: f64) -> Option<ArcToCurves> {
    if !(radius > 0.0) || !radius.is_finite() {
        return None;
    }

    let lsq01 = p0.distance_sq(p1);
    let lsq12 = p1.distance_sq(p2);
    let lsq02 = p0.distance_sq(p2);
    let len01 = lsq01.sqrt();
    let len12 = lsq12.sqrt();
    let cos_num = lsq01 + lsq12 - lsq02;
    let cos_den = 2.0 * len01 * len12;
    if !(cos_den > 0.0) || !cos_den.is_finite() {
        return None;
    }

    // law of cosines: angle at p1 is 2 * theta
    let cos_2theta = cos_num / cos_den;
    let tansq_den = 1.0 + cos_2theta;
    let tansq_num = 1.0 - cos_2theta;
    if tansq_den < ARC_TO_EPSILON || tansq_num < ARC_TO_EPSILON {
        return None;
    }
    let tansq_theta = tansq_num / tansq_den;
    let a = radius / tansq_theta.sqrt();

    let t0 = Point::new(
        p1.x + (a / len01) * (p0.x - p1.x),
        p1.y + (a / len01) * (p0.y - p1.y),
    );
    let t1 = Point::new(
        p1.x + (a / len12) * (p2.x - p1.x),
        p1.y + (a / len12) * (p2.y - p1.y),
    );

    let mid = Point::new((t0.x + t1.x) / 2.0, (t0.y + t1.y) / 2.0);
    let len_ratio_den = mid.distance_sq(p1);
    if !(len_ratio_den > 0.0) {
        return None;
    }
    let len_ratio = mid.distance_sq(t0) / len_ratio_den;
    let center = Point::new(
        mid.x + (mid.x - p1.x) * len_ratio,
        mid.y + (mid.y - p1.y) * len_ratio,
    );
    if !center.x.is_finite() || !center.y.is_finite() {
        return None;
    }

    let lead_in = if t0 != p0 { Some(t0) } else { None };

    let cos_half_arc = (tansq_num / 2.0).sqrt();
    let ccw = (t0.y - center.y) * (t1.x - center.x) > (t1.y - center.y) * (t0.x - center.x);

    let mut curves = SmallVec::new();
    if cos_2theta <= 0.0 {
        // arc of at most 90 degrees: one piece
        let sin_half_arc = (tansq_den / 2.0).sqrt();
        let mut cv = 4.0 / 3.0 * sin_half_arc / (1.0 + cos_half_arc);
        if ccw {
            cv = -cv;
        }
        curves.push(CubicCurve {
            ctrl1: Point::new(t0.x - cv * (t0.y - center.y), t0.y + cv * (t0.x - center.x)),
            ctrl2: Point::new(t1.x + cv * (t1.y - center.y), t1.y - cv * (t1.x - center.x)),
            end: t1,
        });
    } else {
        let sin_qtr_arc = ((1.0 - cos_half_arc) / 2.0).sqrt();
        let cos_qtr_arc = ((1.0 + cos_half_arc) / 2.0).sqrt();
        let mut cv = 4.0 / 3.0 * sin_qtr_arc / (1.0 + cos_qtr_arc);
        if ccw {
            cv = -cv;
        }
        let mid_ratio = radius / len_ratio_den.sqrt();
        let mid_arc = Point::new(
            center.x + (p1.x - mid.x) * mid_ratio,
            center.y + (p1.y - mid.y) * mid_ratio,
        );
        curves.push(CubicCurve {
            ctrl1: Point::new(t0.x - cv * (t0.y - center.y), t0.y + cv * (t0.x - center.x)),
            ctrl2: Point::new(
                mid_arc.x + cv * (mid_arc.y - center.y),
                mid_arc.y - cv * (mid_arc.x - center.x),
            ),
            end: mid_arc,
        });
        curves.push(CubicCurve {
            ctrl1: Point::new(
                mid_arc.x - cv * (mid_arc.y - center.y),
                mid_arc.y + cv * (mid_arc.x - center.x),
            ),
            ctrl2: Point::new(t1.x + cv * (t1.y - center.y), t1.y - cv * (t1.x - center.x)),
            end: t1,
        });
    }

    Some(ArcToCurves {
        lead_in,
        curves,
        center,
    })
}

/// Piece of an elliptical arc in user space
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArcSegment {
    Move(Point),
    Cubic(CubicCurve),
}

/// An open arc of the ellipse centered at `center`.
///
/// Angles are in degrees, counter-clockwise on screen (y down), so the
/// sweep runs opposite to the raw trigonometric direction. Extents of a
/// full turn or more draw exactly one full ellipse. Negative radii yield
/// nothing; a zero extent yields only the starting moveto.
pub fn elliptical_arc(
    center: Point,
    rx: f64,
    ry: f64,
    start_deg: f64,
    extent_deg: f64,
) -> SmallVec<[ArcSegment; 5]> {
    let mut out = SmallVec::new();
    if rx < 0.0 || ry < 0.0 {
        return out;
    }

    let start = -start_deg.to_radians();
    let extent = -extent_deg;
    let (segments, increment, cv) = if extent >= 360.0 || extent <= -360.0 {
        if extent < 0.0 {
            (4, -FRAC_PI_2, -QUARTER_ARC_CV)
        } else {
            (4, FRAC_PI_2, QUARTER_ARC_CV)
        }
    } else {
        let segments = (extent.abs() / 90.0).ceil() as usize;
        let increment = if segments == 0 {
            0.0
        } else {
            (extent / segments as f64).to_radians()
        };
        let cv = bezier_tangent(increment);
        if cv == 0.0 {
            (0, increment, cv)
        } else {
            (segments, increment, cv)
        }
    };

    let map = |ux: f64, uy: f64| Point::new(center.x + ux * rx, center.y + uy * ry);

    out.push(ArcSegment::Move(map(start.cos(), start.sin())));
    for i in 0..segments {
        let mut angle = start + increment * i as f64;
        let (rel_x, rel_y) = (angle.cos(), angle.sin());
        let ctrl1 = map(rel_x - cv * rel_y, rel_y + cv * rel_x);
        angle += increment;
        let (rel_x, rel_y) = (angle.cos(), angle.sin());
        let ctrl2 = map(rel_x + cv * rel_y, rel_y - cv * rel_x);
        let end = map(rel_x, rel_y);
        out.push(ArcSegment::Cubic(CubicCurve { ctrl1, ctrl2, end }));
    }
    out
}

/// Control point length for a circular arc spanning `increment` radians
fn bezier_tangent(increment: f64) -> f64 {
    let half = increment / 2.0;
    4.0 / 3.0 * half.sin() / (1.0 + half.cos())
}

/// Flags of an SVG elliptical arc command
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SvgArcFlags {
    pub large_arc: bool,
    pub sweep: bool,
}

/// Convert an SVG endpoint-parameterized arc to cubics.
///
/// Returns `None` when either radius is zero, in which case the arc is a
/// straight line. Coincident endpoints produce no curves.
pub fn svg_arc(
    from: Point,
    rx: f64,
    ry: f64,
    x_axis_rotation_deg: f64,
    flags: SvgArcFlags,
    to: Point,
) -> Option<SmallVec<[CubicCurve; 4]>> {
    if from == to {
        return Some(SmallVec::new());
    }
    let mut rx = rx.abs();
    let mut ry = ry.abs();
    if rx == 0.0 || ry == 0.0 {
        return None;
    }

    let phi = x_axis_rotation_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let hx = (from.x - to.x) / 2.0;
    let hy = (from.y - to.y) / 2.0;
    let x1 = cos_phi * hx + sin_phi * hy;
    let y1 = -sin_phi * hx + cos_phi * hy;

    // scale radii up when they cannot span the endpoints
    let lambda = (x1 * x1) / (rx * rx) + (y1 * y1) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * y1 * y1 - ry2 * x1 * x1;
    let den = rx2 * y1 * y1 + ry2 * x1 * x1;
    let mut coef = if den == 0.0 {
        0.0
    } else {
        (num / den).max(0.0).sqrt()
    };
    if flags.large_arc == flags.sweep {
        coef = -coef;
    }
    let cx1 = coef * rx * y1 / ry;
    let cy1 = -coef * ry * x1 / rx;
    let cx = cos_phi * cx1 - sin_phi * cy1 + (from.x + to.x) / 2.0;
    let cy = sin_phi * cx1 + cos_phi * cy1 + (from.y + to.y) / 2.0;

    let ux = (x1 - cx1) / rx;
    let uy = (y1 - cy1) / ry;
    let vx = (-x1 - cx1) / rx;
    let vy = (-y1 - cy1) / ry;
    let theta1 = vector_angle(1.0, 0.0, ux, uy);
    let mut dtheta = vector_angle(ux, uy, vx, vy);
    if !flags.sweep && dtheta > 0.0 {
        dtheta -= TAU;
    } else if flags.sweep && dtheta < 0.0 {
        dtheta += TAU;
    }

    let segments = ((dtheta.abs() / FRAC_PI_2).ceil() as usize).max(1);
    let delta = dtheta / segments as f64;
    let t = 4.0 / 3.0 * (delta / 4.0).tan();

    let map = |ux: f64, uy: f64| {
        let x = rx * ux;
        let y = ry * uy;
        Point::new(cos_phi * x - sin_phi * y + cx, sin_phi * x + cos_phi * y + cy)
    };

    let mut curves = SmallVec::new();
    for i in 0..segments {
        let a0 = theta1 + delta * i as f64;
        let a1 = a0 + delta;
        let (s0, c0) = a0.sin_cos();
        let (s1, c1) = a1.sin_cos();
        let end = if i + 1 == segments {
            to
        } else {
            map(c1, s1)
        };
        curves.push(CubicCurve {
            ctrl1: map(c0 - t * s0, s0 + t * c0),
            ctrl2: map(c1 + t * s1, s1 - t * c1),
            end,
        });
    }
    Some(curves)
}

fn vector_angle(ux: f64, uy: f64, vx: f64, vy: f64) -> f64 {
    let angle = (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
    if angle.is_nan() {
        PI
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_right_angle_corner_is_one_curve() {
        let arc = arc_to_curves(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            2.0,
        )
        .unwrap();
        assert_eq!(arc.lead_in, Some(Point::new(8.0, 0.0)));
        assert_eq!(arc.curves.len(), 1);
        let end = arc.curves[0].end;
        assert!(close(end.x, 10.0) && close(end.y, 2.0));
        assert!(close(arc.center.x, 8.0) && close(arc.center.y, 2.0));
        assert!(close(end.distance(arc.center), 2.0));
    }

    #[test]
    fn test_sharp_corner_splits_in_two() {
        // 45 degree corner sweeps 135 degrees of arc
        let arc = arc_to_curves(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            1.0,
        )
        .unwrap();
        assert_eq!(arc.curves.len(), 2);
        for curve in &arc.curves {
            assert!(close(curve.end.distance(arc.center), 1.0));
        }
    }

    #[test]
    fn test_straight_and_folded_corners_degenerate() {
        let p0 = Point::new(0.0, 0.0);
        let p1 = Point::new(10.0, 0.0);
        assert!(arc_to_curves(p0, p1, Point::new(20.0, 0.0), 3.0).is_none());
        assert!(arc_to_curves(p0, p1, Point::new(5.0, 0.0), 3.0).is_none());
        assert!(arc_to_curves(p0, p0, Point::new(5.0, 5.0), 3.0).is_none());
        assert!(arc_to_curves(p0, p1, Point::new(10.0, 10.0), 0.0).is_none());
        assert!(arc_to_curves(p0, p1, Point::new(10.0, 10.0), f64::NAN).is_none());
    }

    #[test]
    fn test_elliptical_quarter_arc() {
        let segs = elliptical_arc(Point::new(0.0, 0.0), 10.0, 10.0, 0.0, 90.0);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], ArcSegment::Move(Point::new(10.0, 0.0)));
        match segs[1] {
            ArcSegment::Cubic(c) => {
                // counter-clockwise on screen ends above the center
                assert!(close(c.end.x, 0.0));
                assert!(close(c.end.y, -10.0));
            }
            ArcSegment::Move(_) => panic!("expected a curve"),
        }
    }

    #[test]
    fn test_full_ellipse_and_empty_extent() {
        assert_eq!(elliptical_arc(Point::ZERO, 4.0, 2.0, 30.0, 720.0).len(), 5);
        assert_eq!(elliptical_arc(Point::ZERO, 4.0, 2.0, 30.0, 0.0).len(), 1);
        assert!(elliptical_arc(Point::ZERO, -1.0, 2.0, 0.0, 90.0).is_empty());
    }

    #[test]
    fn test_svg_semicircle() {
        let flags = SvgArcFlags {
            large_arc: false,
            sweep: true,
        };
        let curves = svg_arc(
            Point::new(0.0, 0.0),
            5.0,
            5.0,
            0.0,
            flags,
            Point::new(10.0, 0.0),
        )
        .unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[1].end, Point::new(10.0, 0.0));
        // positive sweep with y down goes over the top
        assert!(close(curves[0].end.x, 5.0));
        assert!(close(curves[0].end.y, -5.0));
    }

    #[test]
    fn test_svg_zero_radius_is_a_line() {
        let flags = SvgArcFlags {
            large_arc: false,
            sweep: false,
        };
        assert!(svg_arc(Point::ZERO, 0.0, 3.0, 0.0, flags, Point::new(1.0, 1.0)).is_none());
    }
}
