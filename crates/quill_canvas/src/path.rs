//! Device-space path storage
//!
//! Points are stored after the transform that was current when they were
//! added, so a later transform change never moves recorded geometry.

use smallvec::SmallVec;

use quill_core::FillRule;

use crate::opcode::Opcode;

/// Line pieces used per curve when flattening for hit tests
const FLATTEN_STEPS: usize = 16;

/// One path segment in device space
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
    MoveTo {
        x: f32,
        y: f32,
    },
    LineTo {
        x: f32,
        y: f32,
    },
    QuadTo {
        cx: f32,
        cy: f32,
        x: f32,
        y: f32,
    },
    CubicTo {
        c1x: f32,
        c1y: f32,
        c2x: f32,
        c2y: f32,
        x: f32,
        y: f32,
    },
    Close,
}

impl PathSegment {
    /// The opcode tagging this segment in a serialized path run
    pub fn opcode(&self) -> Opcode {
        match self {
            PathSegment::MoveTo { .. } => Opcode::MoveTo,
            PathSegment::LineTo { .. } => Opcode::LineTo,
            PathSegment::QuadTo { .. } => Opcode::QuadTo,
            PathSegment::CubicTo { .. } => Opcode::CubicTo,
            PathSegment::Close => Opcode::ClosePath,
        }
    }

    /// Coordinates in wire order
    pub fn coords(&self) -> SmallVec<[f32; 6]> {
        match *self {
            PathSegment::MoveTo { x, y } | PathSegment::LineTo { x, y } => {
                smallvec::smallvec![x, y]
            }
            PathSegment::QuadTo { cx, cy, x, y } => smallvec::smallvec![cx, cy, x, y],
            PathSegment::CubicTo {
                c1x,
                c1y,
                c2x,
                c2y,
                x,
                y,
            } => smallvec::smallvec![c1x, c1y, c2x, c2y, x, y],
            PathSegment::Close => SmallVec::new(),
        }
    }

    /// Apply `f` to every point of the segment
    pub fn map_points(self, mut f: impl FnMut(f32, f32) -> (f32, f32)) -> Self {
        match self {
            PathSegment::MoveTo { x, y } => {
                let (x, y) = f(x, y);
                PathSegment::MoveTo { x, y }
            }
            PathSegment::LineTo { x, y } => {
                let (x, y) = f(x, y);
                PathSegment::LineTo { x, y }
            }
            PathSegment::QuadTo { cx, cy, x, y } => {
                let (cx, cy) = f(cx, cy);
                let (x, y) = f(x, y);
                PathSegment::QuadTo { cx, cy, x, y }
            }
            PathSegment::CubicTo {
                c1x,
                c1y,
                c2x,
                c2y,
                x,
                y,
            } => {
                let (c1x, c1y) = f(c1x, c1y);
                let (c2x, c2y) = f(c2x, c2y);
                let (x, y) = f(x, y);
                PathSegment::CubicTo {
                    c1x,
                    c1y,
                    c2x,
                    c2y,
                    x,
                    y,
                }
            }
            PathSegment::Close => PathSegment::Close,
        }
    }
}

/// An ordered list of path segments plus the pen position
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathData {
    segments: SmallVec<[PathSegment; 16]>,
    current: (f32, f32),
    subpath_start: (f32, f32),
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The pen position, or `None` for an empty path
    pub fn current_point(&self) -> Option<(f32, f32)> {
        if self.segments.is_empty() {
            None
        } else {
            Some(self.current)
        }
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.current = (0.0, 0.0);
        self.subpath_start = (0.0, 0.0);
    }

    /// Start a subpath; a moveto directly after another replaces it
    pub fn move_to(&mut self, x: f32, y: f32) {
        if let Some(PathSegment::MoveTo {
            x: last_x,
            y: last_y,
        }) = self.segments.last_mut()
        {
            *last_x = x;
            *last_y = y;
        } else {
            self.segments.push(PathSegment::MoveTo { x, y });
        }
        self.current = (x, y);
        self.subpath_start = (x, y);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.segments.push(PathSegment::LineTo { x, y });
        self.current = (x, y);
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.segments.push(PathSegment::QuadTo { cx, cy, x, y });
        self.current = (x, y);
    }

    pub fn curve_to(&mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) {
        self.segments.push(PathSegment::CubicTo {
            c1x,
            c1y,
            c2x,
            c2y,
            x,
            y,
        });
        self.current = (x, y);
    }

    /// Close the current subpath. Repeated closes collapse into one.
    pub fn close_path(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        if !matches!(self.segments.last(), Some(PathSegment::Close)) {
            self.segments.push(PathSegment::Close);
        }
        self.current = self.subpath_start;
    }

    /// Push a segment through the same rules as the individual builders
    pub fn push(&mut self, segment: PathSegment) {
        match segment {
            PathSegment::MoveTo { x, y } => self.move_to(x, y),
            PathSegment::LineTo { x, y } => self.line_to(x, y),
            PathSegment::QuadTo { cx, cy, x, y } => self.quad_to(cx, cy, x, y),
            PathSegment::CubicTo {
                c1x,
                c1y,
                c2x,
                c2y,
                x,
                y,
            } => self.curve_to(c1x, c1y, c2x, c2y, x, y),
            PathSegment::Close => self.close_path(),
        }
    }

    /// Append segments from another path.
    ///
    /// With `connect`, a leading moveto becomes a lineto so the new geometry
    /// continues the current subpath. The lineto is skipped when it would
    /// not move the pen.
    pub fn append(&mut self, segments: impl IntoIterator<Item = PathSegment>, connect: bool) {
        let mut iter = segments.into_iter();
        let Some(first) = iter.next() else {
            return;
        };
        match first {
            PathSegment::MoveTo { x, y } if connect && !self.segments.is_empty() => {
                let closed = matches!(self.segments.last(), Some(PathSegment::Close));
                if closed || self.current != (x, y) {
                    self.line_to(x, y);
                }
            }
            other => self.push(other),
        }
        for segment in iter {
            self.push(segment);
        }
    }

    /// Hit test a device-space point against the filled area
    pub fn contains(&self, x: f32, y: f32, rule: FillRule) -> bool {
        let mut winding = 0i32;
        let mut start = (0.0f32, 0.0f32);
        let mut pen = (0.0f32, 0.0f32);
        let mut open = false;

        let edge = |from: (f32, f32), to: (f32, f32), winding: &mut i32| {
            let (x0, y0) = from;
            let (x1, y1) = to;
            if y0 == y1 {
                return;
            }
            let upward = y0 < y1;
            let (lo, hi) = if upward { (y0, y1) } else { (y1, y0) };
            if y < lo || y >= hi {
                return;
            }
            let crossing = x0 + (y - y0) * (x1 - x0) / (y1 - y0);
            if crossing > x {
                *winding += if upward { 1 } else { -1 };
            }
        };

        for segment in &self.segments {
            match *segment {
                PathSegment::MoveTo { x: mx, y: my } => {
                    if open {
                        edge(pen, start, &mut winding);
                    }
                    start = (mx, my);
                    pen = start;
                    open = true;
                }
                PathSegment::LineTo { x: lx, y: ly } => {
                    edge(pen, (lx, ly), &mut winding);
                    pen = (lx, ly);
                }
                PathSegment::QuadTo { cx, cy, x: ex, y: ey } => {
                    let p0 = pen;
                    for i in 1..=FLATTEN_STEPS {
                        let t = i as f32 / FLATTEN_STEPS as f32;
                        let mt = 1.0 - t;
                        let px = mt * mt * p0.0 + 2.0 * mt * t * cx + t * t * ex;
                        let py = mt * mt * p0.1 + 2.0 * mt * t * cy + t * t * ey;
                        edge(pen, (px, py), &mut winding);
                        pen = (px, py);
                    }
                    pen = (ex, ey);
                }
                PathSegment::CubicTo {
                    c1x,
                    c1y,
                    c2x,
                    c2y,
                    x: ex,
                    y: ey,
                } => {
                    let p0 = pen;
                    for i in 1..=FLATTEN_STEPS {
                        let t = i as f32 / FLATTEN_STEPS as f32;
                        let mt = 1.0 - t;
                        let a = mt * mt * mt;
                        let b = 3.0 * mt * mt * t;
                        let c = 3.0 * mt * t * t;
                        let d = t * t * t;
                        let px = a * p0.0 + b * c1x + c * c2x + d * ex;
                        let py = a * p0.1 + b * c1y + c * c2y + d * ey;
                        edge(pen, (px, py), &mut winding);
                        pen = (px, py);
                    }
                    pen = (ex, ey);
                }
                PathSegment::Close => {
                    edge(pen, start, &mut winding);
                    pen = start;
                }
            }
        }
        if open {
            edge(pen, start, &mut winding);
        }
        rule.is_inside(winding)
    }
}

/// The recorder's working path and its serialization flag
#[derive(Debug)]
pub struct PathAccumulator {
    data: PathData,
    dirty: bool,
}

impl PathAccumulator {
    pub fn new() -> Self {
        Self {
            data: PathData::new(),
            dirty: true,
        }
    }

    pub fn data(&self) -> &PathData {
        &self.data
    }

    /// Mutable access; any mutation requires the path to be re-sent
    pub fn data_mut(&mut self) -> &mut PathData {
        self.dirty = true;
        &mut self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for PathAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f32) -> PathData {
        let mut p = PathData::new();
        p.move_to(0.0, 0.0);
        p.line_to(size, 0.0);
        p.line_to(size, size);
        p.line_to(0.0, size);
        p.close_path();
        p
    }

    #[test]
    fn test_consecutive_moves_fold() {
        let mut p = PathData::new();
        p.move_to(1.0, 1.0);
        p.move_to(5.0, 6.0);
        assert_eq!(p.segments(), &[PathSegment::MoveTo { x: 5.0, y: 6.0 }]);
        assert_eq!(p.current_point(), Some((5.0, 6.0)));
    }

    #[test]
    fn test_close_returns_to_subpath_start() {
        let mut p = square(4.0);
        assert_eq!(p.current_point(), Some((0.0, 0.0)));
        p.close_path();
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn test_close_on_empty_path_is_ignored() {
        let mut p = PathData::new();
        p.close_path();
        assert!(p.is_empty());
        assert_eq!(p.current_point(), None);
    }

    #[test]
    fn test_connected_append_turns_move_into_line() {
        let mut p = PathData::new();
        p.move_to(0.0, 0.0);
        p.line_to(10.0, 0.0);
        p.append(
            [
                PathSegment::MoveTo { x: 10.0, y: 0.0 },
                PathSegment::LineTo { x: 10.0, y: 10.0 },
            ],
            true,
        );
        // pen already at (10, 0): no extra segment
        assert_eq!(p.len(), 3);

        p.append([PathSegment::MoveTo { x: 20.0, y: 20.0 }], true);
        assert_eq!(p.segments()[3], PathSegment::LineTo { x: 20.0, y: 20.0 });
    }

    #[test]
    fn test_contains_respects_fill_rule() {
        let mut p = square(10.0);
        // inner square wound the same way
        p.move_to(3.0, 3.0);
        p.line_to(7.0, 3.0);
        p.line_to(7.0, 7.0);
        p.line_to(3.0, 7.0);
        p.close_path();

        assert!(p.contains(5.0, 5.0, FillRule::NonZero));
        assert!(!p.contains(5.0, 5.0, FillRule::EvenOdd));
        assert!(p.contains(1.0, 1.0, FillRule::EvenOdd));
        assert!(!p.contains(11.0, 5.0, FillRule::NonZero));
    }

    #[test]
    fn test_accumulator_dirty_tracking() {
        let mut acc = PathAccumulator::new();
        acc.mark_clean();
        assert!(!acc.is_dirty());
        acc.data_mut().move_to(1.0, 2.0);
        assert!(acc.is_dirty());
    }
}
