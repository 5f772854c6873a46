//! 2D affine transforms

use crate::geometry::Point;

/// 2D affine transform (scale, shear and translate; no perspective)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2D {
    /// Matrix elements [a, b, c, d, tx, ty]
    /// | a  c  tx |
    /// | b  d  ty |
    /// | 0  0   1 |
    pub elements: [f64; 6],
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    /// Build from the six coefficients in column order
    pub const fn new(mxx: f64, myx: f64, mxy: f64, myy: f64, mxt: f64, myt: f64) -> Self {
        Self {
            elements: [mxx, myx, mxy, myy, mxt, myt],
        }
    }

    pub fn translation(x: f64, y: f64) -> Self {
        Self {
            elements: [1.0, 0.0, 0.0, 1.0, x, y],
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            elements: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    /// Rotation by `angle` radians.
    ///
    /// Quarter turns snap to exact 0/1 coefficients so that a rotation by
    /// 90 degrees stays a pure axis swap.
    pub fn rotation(angle: f64) -> Self {
        let mut s = angle.sin();
        let c;
        if s == 1.0 || s == -1.0 {
            c = 0.0;
        } else {
            c = angle.cos();
            if c == 1.0 || c == -1.0 {
                s = 0.0;
            }
        }
        Self {
            elements: [c, s, -s, c, 0.0, 0.0],
        }
    }

    pub fn mxx(&self) -> f64 {
        self.elements[0]
    }

    pub fn myx(&self) -> f64 {
        self.elements[1]
    }

    pub fn mxy(&self) -> f64 {
        self.elements[2]
    }

    pub fn myy(&self) -> f64 {
        self.elements[3]
    }

    pub fn mxt(&self) -> f64 {
        self.elements[4]
    }

    pub fn myt(&self) -> f64 {
        self.elements[5]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True when the matrix only translates (identity included)
    pub fn is_translate_or_identity(&self) -> bool {
        let [a, b, c, d, _, _] = self.elements;
        a == 1.0 && b == 0.0 && c == 0.0 && d == 1.0
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(a * point.x + c * point.y + tx, b * point.x + d * point.y + ty)
    }

    /// Transform a vector, ignoring the translation column
    pub fn delta_transform(&self, point: Point) -> Point {
        let [a, b, c, d, _, _] = self.elements;
        Point::new(a * point.x + c * point.y, b * point.x + d * point.y)
    }

    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, _, _] = self.elements;
        a * d - b * c
    }

    /// The inverse matrix, or `None` when the matrix is singular
    pub fn inverse(&self) -> Option<Affine2D> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let [a, b, c, d, tx, ty] = self.elements;
        Some(Affine2D {
            elements: [
                d / det,
                -b / det,
                -c / det,
                a / det,
                (c * ty - d * tx) / det,
                (b * tx - a * ty) / det,
            ],
        })
    }

    /// Map a device-space point back to user space
    pub fn inverse_transform_point(&self, point: Point) -> Option<Point> {
        if self.is_translate_or_identity() {
            return Some(Point::new(point.x - self.mxt(), point.y - self.myt()));
        }
        self.inverse().map(|inv| inv.transform_point(point))
    }

    /// Concatenate this transform with another (self * other)
    /// The resulting transform first applies `other`, then `self`.
    pub fn then(&self, other: &Affine2D) -> Affine2D {
        let [a1, b1, c1, d1, tx1, ty1] = self.elements;
        let [a2, b2, c2, d2, tx2, ty2] = other.elements;

        Affine2D {
            elements: [
                a1 * a2 + c1 * b2,
                b1 * a2 + d1 * b2,
                a1 * c2 + c1 * d2,
                b1 * c2 + d1 * d2,
                a1 * tx2 + c1 * ty2 + tx1,
                b1 * tx2 + d1 * ty2 + ty1,
            ],
        }
    }

    /// Append a translation so it applies before the current matrix
    pub fn translate(&mut self, x: f64, y: f64) {
        *self = self.then(&Affine2D::translation(x, y));
    }

    pub fn append_scale(&mut self, sx: f64, sy: f64) {
        *self = self.then(&Affine2D::scale(sx, sy));
    }

    pub fn append_rotation(&mut self, angle: f64) {
        *self = self.then(&Affine2D::rotation(angle));
    }

    pub fn append(&mut self, other: &Affine2D) {
        *self = self.then(other);
    }
}
