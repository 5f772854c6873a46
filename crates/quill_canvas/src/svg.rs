//! SVG path data parsing
//!
//! Supports the full command set (M L H V C S Q T A Z, absolute and
//! relative) and writes user-space segments into a [`PathData`]. The
//! caller decides what to do with a partially built path on error; the
//! recorder parses into scratch storage and discards it.

use quill_core::Point;

use crate::arc::{svg_arc, SvgArcFlags};
use crate::error::SvgPathError;
use crate::path::PathData;

type Result<T> = std::result::Result<T, SvgPathError>;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a str) -> Self {
        Self {
            bytes: data.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')) {
            self.pos += 1;
        }
    }

    /// Whitespace with at most one comma
    fn skip_separator(&mut self) {
        self.skip_whitespace();
        if self.peek() == Some(b',') {
            self.pos += 1;
            self.skip_whitespace();
        }
    }

    fn at_number(&mut self) -> bool {
        self.skip_separator();
        matches!(self.peek(), Some(b'0'..=b'9' | b'+' | b'-' | b'.'))
    }

    fn unexpected(&self) -> SvgPathError {
        match self.peek() {
            None => SvgPathError::UnexpectedEnd,
            Some(_) => {
                let ch = std::str::from_utf8(&self.bytes[self.pos..])
                    .ok()
                    .and_then(|rest| rest.chars().next())
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                SvgPathError::UnexpectedChar {
                    ch,
                    offset: self.pos,
                }
            }
        }
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_separator();
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut digits = self.eat_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            digits += self.eat_digits();
        }
        if digits == 0 {
            self.pos = start;
            return Err(self.unexpected());
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.eat_digits() == 0 {
                // not an exponent after all
                self.pos = mark;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| SvgPathError::InvalidNumber { offset: start })?;
        text.parse::<f64>()
            .map_err(|_| SvgPathError::InvalidNumber { offset: start })
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Arc flags are a single 0 or 1 and need no separator after them
    fn flag(&mut self) -> Result<bool> {
        self.skip_separator();
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(self.unexpected()),
        }
    }
}

/// Pen state carried between commands
struct Pen {
    current: Point,
    /// Reflection source for S/s
    last_cubic_ctrl: Option<Point>,
    /// Reflection source for T/t
    last_quad_ctrl: Option<Point>,
}

impl Pen {
    fn resolve(&self, relative: bool, x: f64, y: f64) -> Point {
        if relative {
            Point::new(self.current.x + x, self.current.y + y)
        } else {
            Point::new(x, y)
        }
    }
}

fn to_f32(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Parse `data` and append its segments to `path`.
///
/// A path without geometry must begin with a moveto. Relative commands
/// are measured from the path's current point.
pub fn parse_svg_path(data: &str, path: &mut PathData) -> Result<()> {
    let mut cursor = Cursor::new(data);
    let mut pen = Pen {
        current: path
            .current_point()
            .map(|(x, y)| Point::new(x as f64, y as f64))
            .unwrap_or(Point::ZERO),
        last_cubic_ctrl: None,
        last_quad_ctrl: None,
    };
    let mut command: Option<u8> = None;

    loop {
        cursor.skip_separator();
        let Some(byte) = cursor.peek() else {
            break;
        };
        if byte.is_ascii_alphabetic() {
            cursor.pos += 1;
            command = Some(byte);
        } else if command.is_none() || !cursor.at_number() {
            return Err(cursor.unexpected());
        }
        let Some(cmd) = command else {
            return Err(cursor.unexpected());
        };

        let relative = cmd.is_ascii_lowercase();
        if path.is_empty() && !matches!(cmd, b'M' | b'm') {
            return Err(SvgPathError::MissingMoveTo);
        }

        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;
        match cmd.to_ascii_uppercase() {
            b'M' => {
                let x = cursor.number()?;
                let y = cursor.number()?;
                let p = pen.resolve(relative, x, y);
                let (fx, fy) = to_f32(p);
                path.move_to(fx, fy);
                pen.current = p;
                // extra coordinate pairs after a moveto are linetos
                command = Some(if relative { b'l' } else { b'L' });
            }
            b'L' => {
                let x = cursor.number()?;
                let y = cursor.number()?;
                let p = pen.resolve(relative, x, y);
                let (fx, fy) = to_f32(p);
                path.line_to(fx, fy);
                pen.current = p;
            }
            b'H' => {
                let x = cursor.number()?;
                let x = if relative { pen.current.x + x } else { x };
                let p = Point::new(x, pen.current.y);
                let (fx, fy) = to_f32(p);
                path.line_to(fx, fy);
                pen.current = p;
            }
            b'V' => {
                let y = cursor.number()?;
                let y = if relative { pen.current.y + y } else { y };
                let p = Point::new(pen.current.x, y);
                let (fx, fy) = to_f32(p);
                path.line_to(fx, fy);
                pen.current = p;
            }
            b'C' | b'S' => {
                let c1 = if cmd.to_ascii_uppercase() == b'C' {
                    let x = cursor.number()?;
                    let y = cursor.number()?;
                    pen.resolve(relative, x, y)
                } else {
                    reflect(pen.last_cubic_ctrl, pen.current)
                };
                let x = cursor.number()?;
                let y = cursor.number()?;
                let c2 = pen.resolve(relative, x, y);
                let x = cursor.number()?;
                let y = cursor.number()?;
                let end = pen.resolve(relative, x, y);
                let (c1x, c1y) = to_f32(c1);
                let (c2x, c2y) = to_f32(c2);
                let (ex, ey) = to_f32(end);
                path.curve_to(c1x, c1y, c2x, c2y, ex, ey);
                pen.current = end;
                cubic_ctrl = Some(c2);
            }
            b'Q' | b'T' => {
                let ctrl = if cmd.to_ascii_uppercase() == b'Q' {
                    let x = cursor.number()?;
                    let y = cursor.number()?;
                    pen.resolve(relative, x, y)
                } else {
                    reflect(pen.last_quad_ctrl, pen.current)
                };
                let x = cursor.number()?;
                let y = cursor.number()?;
                let end = pen.resolve(relative, x, y);
                let (cx, cy) = to_f32(ctrl);
                let (ex, ey) = to_f32(end);
                path.quad_to(cx, cy, ex, ey);
                pen.current = end;
                quad_ctrl = Some(ctrl);
            }
            b'A' => {
                let rx = cursor.number()?;
                let ry = cursor.number()?;
                let rotation = cursor.number()?;
                let large_arc = cursor.flag()?;
                let sweep = cursor.flag()?;
                let x = cursor.number()?;
                let y = cursor.number()?;
                let end = pen.resolve(relative, x, y);
                let flags = SvgArcFlags { large_arc, sweep };
                match svg_arc(pen.current, rx, ry, rotation, flags, end) {
                    Some(curves) => {
                        for curve in curves {
                            let (c1x, c1y) = to_f32(curve.ctrl1);
                            let (c2x, c2y) = to_f32(curve.ctrl2);
                            let (ex, ey) = to_f32(curve.end);
                            path.curve_to(c1x, c1y, c2x, c2y, ex, ey);
                        }
                    }
                    None => {
                        let (ex, ey) = to_f32(end);
                        path.line_to(ex, ey);
                    }
                }
                pen.current = end;
            }
            b'Z' => {
                path.close_path();
                if let Some((x, y)) = path.current_point() {
                    pen.current = Point::new(x as f64, y as f64);
                }
                // Z takes no arguments, so nothing may repeat it implicitly
                command = None;
            }
            _ => {
                cursor.pos -= 1;
                return Err(cursor.unexpected());
            }
        }
        pen.last_cubic_ctrl = cubic_ctrl;
        pen.last_quad_ctrl = quad_ctrl;
    }
    Ok(())
}

fn reflect(ctrl: Option<Point>, about: Point) -> Point {
    match ctrl {
        Some(c) => Point::new(2.0 * about.x - c.x, 2.0 * about.y - c.y),
        None => about,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;

    fn parse(data: &str) -> Result<PathData> {
        let mut path = PathData::new();
        parse_svg_path(data, &mut path)?;
        Ok(path)
    }

    #[test]
    fn test_absolute_and_relative_lines() {
        let path = parse("M10 10 l5,0 v5 H0 z").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::MoveTo { x: 10.0, y: 10.0 },
                PathSegment::LineTo { x: 15.0, y: 10.0 },
                PathSegment::LineTo { x: 15.0, y: 15.0 },
                PathSegment::LineTo { x: 0.0, y: 15.0 },
                PathSegment::Close,
            ]
        );
        assert_eq!(path.current_point(), Some((10.0, 10.0)));
    }

    #[test]
    fn test_implicit_lineto_after_moveto() {
        let path = parse("m1 1 2 2 3 3").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.segments()[2], PathSegment::LineTo { x: 6.0, y: 6.0 });
    }

    #[test]
    fn test_compact_numbers() {
        // "0.5.5" is two numbers, "-1-2" too
        let path = parse("M0.5.5L-1-2").unwrap();
        assert_eq!(path.segments()[0], PathSegment::MoveTo { x: 0.5, y: 0.5 });
        assert_eq!(path.segments()[1], PathSegment::LineTo { x: -1.0, y: -2.0 });
        let path = parse("M1e1,2E-1").unwrap();
        assert_eq!(path.segments()[0], PathSegment::MoveTo { x: 10.0, y: 0.2 });
    }

    #[test]
    fn test_smooth_cubic_reflects_control() {
        let path = parse("M0 0 C0 10 10 10 10 0 S20 -10 20 0").unwrap();
        assert_eq!(
            path.segments()[2],
            PathSegment::CubicTo {
                c1x: 10.0,
                c1y: -10.0,
                c2x: 20.0,
                c2y: -10.0,
                x: 20.0,
                y: 0.0,
            }
        );
    }

    #[test]
    fn test_smooth_quad_without_previous_uses_pen() {
        let path = parse("M5 5 T10 5").unwrap();
        assert_eq!(
            path.segments()[1],
            PathSegment::QuadTo {
                cx: 5.0,
                cy: 5.0,
                x: 10.0,
                y: 5.0,
            }
        );
    }

    #[test]
    fn test_arc_with_packed_flags() {
        let path = parse("M0 0a5 5 0 0110 0").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.current_point(), Some((10.0, 0.0)));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("L1 1").unwrap_err(), SvgPathError::MissingMoveTo);
        assert_eq!(parse("M1").unwrap_err(), SvgPathError::UnexpectedEnd);
        assert!(matches!(
            parse("M1 1 X").unwrap_err(),
            SvgPathError::UnexpectedChar { ch: 'X', .. }
        ));
        assert!(matches!(
            parse("M1 1 Z 3").unwrap_err(),
            SvgPathError::UnexpectedChar { ch: '3', .. }
        ));
    }

    #[test]
    fn test_relative_to_existing_pen() {
        let mut path = PathData::new();
        path.move_to(100.0, 100.0);
        parse_svg_path("l10 0", &mut path).unwrap();
        assert_eq!(path.segments()[1], PathSegment::LineTo { x: 110.0, y: 100.0 });
    }
}
