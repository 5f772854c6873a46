//! Command recorder - the drawing operation surface
//!
//! Attribute setters write through to the buffer as soon as a value
//! changes. The transform and the path are flushed lazily: the transform
//! right before the next operation that depends on it, the path right
//! before the next fill, stroke or clip.

use std::sync::Arc;

use quill_core::{
    Affine2D, ArcClosure, BlendMode, Effect, FillRule, Font, FontSmoothing, Image, LineCap,
    LineJoin, Paint, Point, TextAlign, TextBaseline,
};

use crate::arc::{self, ArcSegment};
use crate::buffer::{BufferObject, CommandBuffer};
use crate::error::Result;
use crate::opcode::{Opcode, WireByte};
use crate::path::{PathAccumulator, PathData, PathSegment};
use crate::pixels::PixelWriter;
use crate::state::{is_positive_finite, normalize_dashes, AttributeState, DashUpdate};
use crate::surface::FrameTarget;
use crate::svg::parse_svg_path;

/// Producer-side state that never crosses to the renderer
#[derive(Debug)]
pub(crate) struct RecorderState {
    state: AttributeState,
    stack: Vec<AttributeState>,
    path: PathAccumulator,
    clips: Vec<Arc<PathData>>,
    transform_dirty: bool,
}

impl RecorderState {
    pub(crate) fn new() -> Self {
        Self {
            state: AttributeState::default(),
            stack: Vec::new(),
            path: PathAccumulator::new(),
            clips: Vec::new(),
            transform_dirty: false,
        }
    }
}

fn to_device(transform: &Affine2D, x: f64, y: f64) -> (f32, f32) {
    let p = transform.transform_point(Point::new(x, y));
    (p.x as f32, p.y as f32)
}

/// Records drawing operations into the surface's live buffer.
///
/// Obtained from [`Surface::recorder`](crate::Surface::recorder). Invalid
/// arguments are ignored and leave all state unchanged; the only error a
/// recording call returns is a failure to grow the buffer.
pub struct CommandRecorder<'a> {
    rec: &'a mut RecorderState,
    target: &'a mut FrameTarget,
}

impl<'a> CommandRecorder<'a> {
    pub(crate) fn new(rec: &'a mut RecorderState, target: &'a mut FrameTarget) -> Self {
        Self { rec, target }
    }

    /// The current attribute values
    pub fn state(&self) -> &AttributeState {
        &self.rec.state
    }

    /// Depth of the `save()` stack
    pub fn save_depth(&self) -> usize {
        self.rec.stack.len()
    }

    /// The accumulated path in device space
    pub fn path(&self) -> &PathData {
        self.rec.path.data()
    }

    // === Buffer writes ===

    fn buffer(&mut self) -> Result<&mut CommandBuffer> {
        self.target.buffer()
    }

    fn write_opcode(&mut self, opcode: Opcode) -> Result<()> {
        self.buffer()?.put_opcode(opcode)
    }

    fn write_param(&mut self, opcode: Opcode, value: f64) -> Result<()> {
        let buf = self.buffer()?;
        buf.put_opcode(opcode)?;
        buf.put_float(value as f32)
    }

    fn write_byte_param(&mut self, opcode: Opcode, value: u8) -> Result<()> {
        let buf = self.buffer()?;
        buf.put_opcode(opcode)?;
        buf.put_byte(value)
    }

    fn write_object(&mut self, opcode: Opcode, object: BufferObject) -> Result<()> {
        let buf = self.buffer()?;
        buf.put_opcode(opcode)?;
        buf.put_object(object)
    }

    fn update_transform(&mut self) -> Result<()> {
        if !self.rec.transform_dirty {
            return Ok(());
        }
        let t = self.rec.state.transform;
        let buf = self.target.buffer()?;
        buf.put_opcode(Opcode::Transform)?;
        for value in [t.mxx(), t.mxy(), t.mxt(), t.myx(), t.myy(), t.myt()] {
            buf.put_double(value)?;
        }
        self.rec.transform_dirty = false;
        Ok(())
    }

    /// Send the path as a PATHSTART..PATHEND run if it changed
    fn flush_path(&mut self) -> Result<()> {
        self.update_transform()?;
        if !self.rec.path.is_dirty() {
            return Ok(());
        }
        let buf = self.target.buffer()?;
        buf.put_opcode(Opcode::PathStart)?;
        for segment in self.rec.path.data().segments() {
            buf.put_opcode(segment.opcode())?;
            for coord in segment.coords() {
                buf.put_float(coord)?;
            }
        }
        buf.put_opcode(Opcode::PathEnd)?;
        self.rec.path.mark_clean();
        Ok(())
    }

    fn write_path(&mut self, opcode: Opcode) -> Result<()> {
        self.flush_path()?;
        self.write_opcode(opcode)
    }

    fn write_op4(&mut self, opcode: Opcode, a: f64, b: f64, c: f64, d: f64) -> Result<()> {
        self.update_transform()?;
        let buf = self.target.buffer()?;
        buf.put_opcode(opcode)?;
        for value in [a, b, c, d] {
            buf.put_float(value as f32)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_op6(
        &mut self,
        opcode: Opcode,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        f: f64,
    ) -> Result<()> {
        self.update_transform()?;
        let buf = self.target.buffer()?;
        buf.put_opcode(opcode)?;
        for value in [a, b, c, d, e, f] {
            buf.put_float(value as f32)?;
        }
        Ok(())
    }

    /// Inline polygon path, sent without touching the accumulated path
    fn write_poly(&mut self, points: &[Point], close: bool, opcode: Opcode) -> Result<()> {
        let transform = self.rec.state.transform;
        let buf = self.target.buffer()?;
        buf.put_opcode(Opcode::PathStart)?;
        for (i, p) in points.iter().enumerate() {
            let (x, y) = to_device(&transform, p.x, p.y);
            buf.put_opcode(if i == 0 { Opcode::MoveTo } else { Opcode::LineTo })?;
            buf.put_float(x)?;
            buf.put_float(y)?;
        }
        if close {
            buf.put_opcode(Opcode::ClosePath)?;
        }
        buf.put_opcode(Opcode::PathEnd)?;
        // attributes such as line width still need the current matrix
        self.update_transform()?;
        self.write_opcode(opcode)?;
        // the renderer's path no longer matches ours
        self.rec.path.mark_dirty();
        Ok(())
    }

    pub(crate) fn update_dimensions(&mut self) -> Result<()> {
        let (width, height) = (self.target.width, self.target.height);
        let buf = self.target.buffer()?;
        buf.put_opcode(Opcode::SetDims)?;
        buf.put_float(width as f32)?;
        buf.put_float(height as f32)
    }

    // === State stack ===

    /// Push a copy of the current attributes. The path is not saved.
    pub fn save(&mut self) {
        self.rec.stack.push(self.rec.state.clone());
    }

    /// Pop the most recent `save()` and re-apply its attributes.
    ///
    /// Only fields that differ are re-sent. Clips pushed since the save
    /// are popped. Does nothing when the stack is empty.
    pub fn restore(&mut self) -> Result<()> {
        let Some(saved) = self.rec.stack.pop() else {
            tracing::trace!("restore without matching save");
            return Ok(());
        };
        self.apply_state(saved)?;
        self.rec.transform_dirty = true;
        Ok(())
    }

    fn apply_state(&mut self, saved: AttributeState) -> Result<()> {
        self.set_global_alpha(saved.global_alpha)?;
        self.set_global_blend_mode(saved.blend_mode)?;
        self.set_transform_affine(saved.transform);
        self.set_fill_shared(saved.fill)?;
        self.set_stroke_shared(saved.stroke)?;
        self.set_line_width(saved.line_width)?;
        self.set_line_cap(saved.line_cap)?;
        self.set_line_join(saved.line_join)?;
        self.set_miter_limit(saved.miter_limit)?;
        self.apply_dashes(saved.dashes)?;
        self.set_line_dash_offset(saved.dash_offset)?;
        while self.rec.state.clip_depth > saved.clip_depth {
            self.write_opcode(Opcode::PopClip)?;
            self.rec.state.clip_depth -= 1;
            self.rec.clips.pop();
        }
        self.set_fill_rule(saved.fill_rule)?;
        self.set_font_shared(saved.font)?;
        self.set_font_smoothing(saved.font_smoothing)?;
        self.set_text_align(saved.text_align)?;
        self.set_text_baseline(saved.text_baseline)?;
        self.apply_effect_attribute(saved.effect)
    }

    // === Transform ===

    pub fn translate(&mut self, x: f64, y: f64) {
        self.rec.state.transform.translate(x, y);
        self.rec.transform_dirty = true;
    }

    pub fn scale(&mut self, x: f64, y: f64) {
        self.rec.state.transform.append_scale(x, y);
        self.rec.transform_dirty = true;
    }

    /// Rotate by `degrees`, clockwise on screen
    pub fn rotate(&mut self, degrees: f64) {
        self.rec.state.transform.append_rotation(degrees.to_radians());
        self.rec.transform_dirty = true;
    }

    /// Concatenate a matrix onto the current transform
    pub fn transform(&mut self, mxx: f64, myx: f64, mxy: f64, myy: f64, mxt: f64, myt: f64) {
        self.transform_affine(&Affine2D::new(mxx, myx, mxy, myy, mxt, myt));
    }

    pub fn transform_affine(&mut self, matrix: &Affine2D) {
        self.rec.state.transform.append(matrix);
        self.rec.transform_dirty = true;
    }

    pub fn set_transform(&mut self, mxx: f64, myx: f64, mxy: f64, myy: f64, mxt: f64, myt: f64) {
        self.set_transform_affine(Affine2D::new(mxx, myx, mxy, myy, mxt, myt));
    }

    pub fn set_transform_affine(&mut self, matrix: Affine2D) {
        self.rec.state.transform = matrix;
        self.rec.transform_dirty = true;
    }

    pub fn transform_matrix(&self) -> Affine2D {
        self.rec.state.transform
    }

    // === Attributes ===

    /// Set the global alpha. Non-finite values are ignored.
    ///
    /// The value is kept as given and clamped to `[0, 1]` when written.
    pub fn set_global_alpha(&mut self, alpha: f64) -> Result<()> {
        if !alpha.is_finite() || self.rec.state.global_alpha == alpha {
            return Ok(());
        }
        self.write_param(Opcode::GlobalAlpha, alpha.clamp(0.0, 1.0))?;
        self.rec.state.global_alpha = alpha;
        Ok(())
    }

    pub fn global_alpha(&self) -> f64 {
        self.rec.state.global_alpha
    }

    pub fn set_global_blend_mode(&mut self, mode: BlendMode) -> Result<()> {
        if self.rec.state.blend_mode == mode {
            return Ok(());
        }
        self.write_byte_param(Opcode::CompMode, mode.to_wire())?;
        self.rec.state.blend_mode = mode;
        Ok(())
    }

    pub fn global_blend_mode(&self) -> BlendMode {
        self.rec.state.blend_mode
    }

    pub fn set_fill(&mut self, paint: impl Into<Paint>) -> Result<()> {
        self.set_fill_shared(Arc::new(paint.into()))
    }

    /// Set the fill from a shared handle, recording the same handle
    pub fn set_fill_shared(&mut self, paint: Arc<Paint>) -> Result<()> {
        let current = &self.rec.state.fill;
        if Arc::ptr_eq(current, &paint) || **current == *paint {
            return Ok(());
        }
        self.write_object(Opcode::FillPaint, BufferObject::Paint(paint.clone()))?;
        self.rec.state.fill = paint;
        Ok(())
    }

    pub fn fill_paint(&self) -> &Paint {
        &self.rec.state.fill
    }

    pub fn set_stroke(&mut self, paint: impl Into<Paint>) -> Result<()> {
        self.set_stroke_shared(Arc::new(paint.into()))
    }

    pub fn set_stroke_shared(&mut self, paint: Arc<Paint>) -> Result<()> {
        let current = &self.rec.state.stroke;
        if Arc::ptr_eq(current, &paint) || **current == *paint {
            return Ok(());
        }
        self.write_object(Opcode::StrokePaint, BufferObject::Paint(paint.clone()))?;
        self.rec.state.stroke = paint;
        Ok(())
    }

    pub fn stroke_paint(&self) -> &Paint {
        &self.rec.state.stroke
    }

    pub fn set_line_width(&mut self, width: f64) -> Result<()> {
        if !is_positive_finite(width) || self.rec.state.line_width == width {
            return Ok(());
        }
        self.write_param(Opcode::LineWidth, width)?;
        self.rec.state.line_width = width;
        Ok(())
    }

    pub fn line_width(&self) -> f64 {
        self.rec.state.line_width
    }

    pub fn set_line_cap(&mut self, cap: LineCap) -> Result<()> {
        if self.rec.state.line_cap == cap {
            return Ok(());
        }
        self.write_byte_param(Opcode::LineCap, cap.to_wire())?;
        self.rec.state.line_cap = cap;
        Ok(())
    }

    pub fn line_cap(&self) -> LineCap {
        self.rec.state.line_cap
    }

    pub fn set_line_join(&mut self, join: LineJoin) -> Result<()> {
        if self.rec.state.line_join == join {
            return Ok(());
        }
        self.write_byte_param(Opcode::LineJoin, join.to_wire())?;
        self.rec.state.line_join = join;
        Ok(())
    }

    pub fn line_join(&self) -> LineJoin {
        self.rec.state.line_join
    }

    pub fn set_miter_limit(&mut self, limit: f64) -> Result<()> {
        if !is_positive_finite(limit) || self.rec.state.miter_limit == limit {
            return Ok(());
        }
        self.write_param(Opcode::MiterLimit, limit)?;
        self.rec.state.miter_limit = limit;
        Ok(())
    }

    pub fn miter_limit(&self) -> f64 {
        self.rec.state.miter_limit
    }

    /// Set the dash pattern; `None`, empty or all-zero patterns clear it
    pub fn set_line_dashes(&mut self, dashes: Option<&[f64]>) -> Result<()> {
        match normalize_dashes(dashes) {
            DashUpdate::Ignore => Ok(()),
            DashUpdate::Clear => self.apply_dashes(None),
            DashUpdate::Set(dashes) => self.apply_dashes(Some(dashes)),
        }
    }

    fn apply_dashes(&mut self, dashes: Option<Arc<[f64]>>) -> Result<()> {
        if self.rec.state.dashes == dashes {
            return Ok(());
        }
        self.write_object(Opcode::DashArray, BufferObject::Dashes(dashes.clone()))?;
        self.rec.state.dashes = dashes;
        Ok(())
    }

    pub fn line_dashes(&self) -> Option<&[f64]> {
        self.rec.state.dashes.as_deref()
    }

    pub fn set_line_dash_offset(&mut self, offset: f64) -> Result<()> {
        if !offset.is_finite() || self.rec.state.dash_offset == offset {
            return Ok(());
        }
        self.write_param(Opcode::DashOffset, offset)?;
        self.rec.state.dash_offset = offset;
        Ok(())
    }

    pub fn line_dash_offset(&self) -> f64 {
        self.rec.state.dash_offset
    }

    pub fn set_font(&mut self, font: Font) -> Result<()> {
        self.set_font_shared(Arc::new(font))
    }

    pub fn set_font_shared(&mut self, font: Arc<Font>) -> Result<()> {
        let current = &self.rec.state.font;
        if Arc::ptr_eq(current, &font) || **current == *font {
            return Ok(());
        }
        self.write_object(Opcode::Font, BufferObject::Font(font.clone()))?;
        self.rec.state.font = font;
        Ok(())
    }

    pub fn font(&self) -> &Font {
        &self.rec.state.font
    }

    pub fn set_font_smoothing(&mut self, smoothing: FontSmoothing) -> Result<()> {
        if self.rec.state.font_smoothing == smoothing {
            return Ok(());
        }
        self.write_byte_param(Opcode::FontSmooth, smoothing.to_wire())?;
        self.rec.state.font_smoothing = smoothing;
        Ok(())
    }

    pub fn font_smoothing(&self) -> FontSmoothing {
        self.rec.state.font_smoothing
    }

    pub fn set_text_align(&mut self, align: TextAlign) -> Result<()> {
        if self.rec.state.text_align == align {
            return Ok(());
        }
        self.write_byte_param(Opcode::TextAlign, align.to_wire())?;
        self.rec.state.text_align = align;
        Ok(())
    }

    pub fn text_align(&self) -> TextAlign {
        self.rec.state.text_align
    }

    pub fn set_text_baseline(&mut self, baseline: TextBaseline) -> Result<()> {
        if self.rec.state.text_baseline == baseline {
            return Ok(());
        }
        self.write_byte_param(Opcode::TextBaseline, baseline.to_wire())?;
        self.rec.state.text_baseline = baseline;
        Ok(())
    }

    pub fn text_baseline(&self) -> TextBaseline {
        self.rec.state.text_baseline
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) -> Result<()> {
        if self.rec.state.fill_rule == rule {
            return Ok(());
        }
        self.write_byte_param(Opcode::FillRule, rule.to_wire())?;
        self.rec.state.fill_rule = rule;
        Ok(())
    }

    pub fn fill_rule(&self) -> FillRule {
        self.rec.state.fill_rule
    }

    /// Effect applied to every subsequent drawing operation
    pub fn set_effect(&mut self, effect: Option<Effect>) -> Result<()> {
        self.apply_effect_attribute(effect.map(Arc::new))
    }

    fn apply_effect_attribute(&mut self, effect: Option<Arc<Effect>>) -> Result<()> {
        if self.rec.state.effect == effect {
            return Ok(());
        }
        self.write_object(Opcode::Effect, BufferObject::Effect(effect.clone()))?;
        self.rec.state.effect = effect;
        Ok(())
    }

    pub fn effect(&self) -> Option<&Effect> {
        self.rec.state.effect.as_deref()
    }

    /// Apply `effect` once to everything drawn so far
    pub fn apply_effect(&mut self, effect: Effect) -> Result<()> {
        self.write_object(
            Opcode::ApplyEffect,
            BufferObject::Effect(Some(Arc::new(effect))),
        )
    }

    // === Path construction ===

    /// Clear the path. Nothing is written until the next path consumer.
    pub fn begin_path(&mut self) {
        self.rec.path.data_mut().clear();
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.update_transform()?;
        let (x, y) = to_device(&self.rec.state.transform, x, y);
        self.rec.path.data_mut().move_to(x, y);
        Ok(())
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.update_transform()?;
        let (x, y) = to_device(&self.rec.state.transform, x, y);
        let path = self.rec.path.data_mut();
        if path.is_empty() {
            path.move_to(x, y);
        }
        path.line_to(x, y);
        Ok(())
    }

    pub fn quadratic_curve_to(&mut self, xc: f64, yc: f64, x1: f64, y1: f64) -> Result<()> {
        self.update_transform()?;
        let t = self.rec.state.transform;
        let (cx, cy) = to_device(&t, xc, yc);
        let (x, y) = to_device(&t, x1, y1);
        let path = self.rec.path.data_mut();
        if path.is_empty() {
            path.move_to(cx, cy);
        }
        path.quad_to(cx, cy, x, y);
        Ok(())
    }

    pub fn bezier_curve_to(
        &mut self,
        xc1: f64,
        yc1: f64,
        xc2: f64,
        yc2: f64,
        x1: f64,
        y1: f64,
    ) -> Result<()> {
        self.update_transform()?;
        let t = self.rec.state.transform;
        let (c1x, c1y) = to_device(&t, xc1, yc1);
        let (c2x, c2y) = to_device(&t, xc2, yc2);
        let (x, y) = to_device(&t, x1, y1);
        let path = self.rec.path.data_mut();
        if path.is_empty() {
            path.move_to(c1x, c1y);
        }
        path.curve_to(c1x, c1y, c2x, c2y, x, y);
        Ok(())
    }

    /// Round the corner at (x1, y1) towards (x2, y2) with a circle of
    /// `radius`.
    ///
    /// The pen ends on the second tangent point, not on (x2, y2). Any
    /// degenerate input falls back to `line_to(x1, y1)`.
    pub fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) -> Result<()> {
        self.update_transform()?;
        let Some((px, py)) = self.rec.path.data().current_point() else {
            return self.line_to(x1, y1);
        };
        let device = Point::new(px as f64, py as f64);
        let Some(p0) = self.rec.state.transform.inverse_transform_point(device) else {
            tracing::trace!("arc_to with a singular transform, drawing a line");
            return self.line_to(x1, y1);
        };
        let Some(corner) =
            arc::arc_to_curves(p0, Point::new(x1, y1), Point::new(x2, y2), radius)
        else {
            tracing::trace!(radius, "degenerate arc_to, drawing a line");
            return self.line_to(x1, y1);
        };

        if let Some(start) = corner.lead_in {
            self.line_to(start.x, start.y)?;
        }
        for curve in &corner.curves {
            self.bezier_curve_to(
                curve.ctrl1.x,
                curve.ctrl1.y,
                curve.ctrl2.x,
                curve.ctrl2.y,
                curve.end.x,
                curve.end.y,
            )?;
        }
        Ok(())
    }

    /// Append an open elliptical arc, connected to the current subpath.
    ///
    /// Angles are in degrees, counter-clockwise on screen.
    pub fn arc(
        &mut self,
        center_x: f64,
        center_y: f64,
        radius_x: f64,
        radius_y: f64,
        start_angle: f64,
        length: f64,
    ) -> Result<()> {
        self.update_transform()?;
        let t = self.rec.state.transform;
        let pieces = arc::elliptical_arc(
            Point::new(center_x, center_y),
            radius_x,
            radius_y,
            start_angle,
            length,
        );
        let segments = pieces.into_iter().map(|piece| match piece {
            ArcSegment::Move(p) => {
                let (x, y) = to_device(&t, p.x, p.y);
                PathSegment::MoveTo { x, y }
            }
            ArcSegment::Cubic(c) => {
                let (c1x, c1y) = to_device(&t, c.ctrl1.x, c.ctrl1.y);
                let (c2x, c2y) = to_device(&t, c.ctrl2.x, c.ctrl2.y);
                let (x, y) = to_device(&t, c.end.x, c.end.y);
                PathSegment::CubicTo {
                    c1x,
                    c1y,
                    c2x,
                    c2y,
                    x,
                    y,
                }
            }
        });
        self.rec.path.data_mut().append(segments, true);
        Ok(())
    }

    /// Add a closed rectangle subpath
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.update_transform()?;
        let t = self.rec.state.transform;
        let origin = t.transform_point(Point::new(x, y));
        let dw = t.delta_transform(Point::new(w, 0.0));
        let dh = t.delta_transform(Point::new(0.0, h));
        let path = self.rec.path.data_mut();
        path.move_to(origin.x as f32, origin.y as f32);
        path.line_to((origin.x + dw.x) as f32, (origin.y + dw.y) as f32);
        path.line_to(
            (origin.x + dw.x + dh.x) as f32,
            (origin.y + dw.y + dh.y) as f32,
        );
        path.line_to((origin.x + dh.x) as f32, (origin.y + dh.y) as f32);
        path.close_path();
        Ok(())
    }

    /// Append SVG path data.
    ///
    /// Unless the data starts with an absolute moveto, it continues from
    /// the current point. Malformed data is dropped as a whole and the
    /// path is left as it was.
    pub fn append_svg_path(&mut self, svg: &str) -> Result<()> {
        self.update_transform()?;
        let mut prepend_move = true;
        let mut skip_move = true;
        match svg.trim_start().chars().next() {
            Some('M') => {
                prepend_move = false;
                skip_move = false;
            }
            Some('m') => {
                if self.rec.path.data().is_empty() {
                    prepend_move = false;
                }
                skip_move = false;
            }
            _ => {}
        }

        let t = self.rec.state.transform;
        let mut scratch = PathData::new();
        match self.rec.path.data().current_point() {
            Some((px, py)) if prepend_move => {
                let device = Point::new(px as f64, py as f64);
                let user = t.inverse_transform_point(device).unwrap_or(device);
                scratch.move_to(user.x as f32, user.y as f32);
            }
            _ => skip_move = false,
        }

        if let Err(err) = parse_svg_path(svg, &mut scratch) {
            tracing::debug!(error = %err, "ignoring malformed SVG path data");
            return Ok(());
        }

        let skip = usize::from(skip_move);
        let segments = scratch.segments().iter().skip(skip).map(|segment| {
            segment.map_points(|x, y| to_device(&t, x as f64, y as f64))
        });
        self.rec.path.data_mut().append(segments, false);
        Ok(())
    }

    pub fn close_path(&mut self) -> Result<()> {
        if !self.rec.path.data().is_empty() {
            self.update_transform()?;
            self.rec.path.data_mut().close_path();
        }
        Ok(())
    }

    // === Path consumption ===

    pub fn fill(&mut self) -> Result<()> {
        self.write_path(Opcode::FillPath)
    }

    pub fn stroke(&mut self) -> Result<()> {
        self.write_path(Opcode::StrokePath)
    }

    /// Intersect the clip with the current path.
    ///
    /// The clip carries its own snapshot of the path so that it can be
    /// replayed after a reset.
    pub fn clip(&mut self) -> Result<()> {
        self.flush_path()?;
        let snapshot = Arc::new(self.rec.path.data().clone());
        self.write_object(Opcode::PushClip, BufferObject::Path(snapshot.clone()))?;
        self.rec.clips.push(snapshot);
        self.rec.state.clip_depth += 1;
        Ok(())
    }

    /// Hit test a user-space point against the current path and fill rule
    pub fn is_point_in_path(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = to_device(&self.rec.state.transform, x, y);
        self.rec
            .path
            .data()
            .contains(dx, dy, self.rec.state.fill_rule)
    }

    // === Direct shapes ===

    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        if w != 0.0 && h != 0.0 {
            self.reset_if_covers(false, x, y, w, h)?;
            self.write_op4(Opcode::ClearRect, x, y, w, h)?;
        }
        Ok(())
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        if w != 0.0 && h != 0.0 {
            self.reset_if_covers(true, x, y, w, h)?;
            self.write_op4(Opcode::FillRect, x, y, w, h)?;
        }
        Ok(())
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        if w != 0.0 || h != 0.0 {
            self.write_op4(Opcode::StrokeRect, x, y, w, h)?;
        }
        Ok(())
    }

    pub fn fill_oval(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        if w != 0.0 && h != 0.0 {
            self.write_op4(Opcode::FillOval, x, y, w, h)?;
        }
        Ok(())
    }

    pub fn stroke_oval(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        if w != 0.0 || h != 0.0 {
            self.write_op4(Opcode::StrokeOval, x, y, w, h)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fill_arc(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        start_angle: f64,
        extent: f64,
        closure: ArcClosure,
    ) -> Result<()> {
        if w != 0.0 && h != 0.0 {
            self.write_byte_param(Opcode::ArcType, closure.to_wire())?;
            self.write_op6(Opcode::FillArc, x, y, w, h, start_angle, extent)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stroke_arc(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        start_angle: f64,
        extent: f64,
        closure: ArcClosure,
    ) -> Result<()> {
        if w != 0.0 && h != 0.0 {
            self.write_byte_param(Opcode::ArcType, closure.to_wire())?;
            self.write_op6(Opcode::StrokeArc, x, y, w, h, start_angle, extent)?;
        }
        Ok(())
    }

    pub fn fill_round_rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        arc_width: f64,
        arc_height: f64,
    ) -> Result<()> {
        if w != 0.0 && h != 0.0 {
            self.write_op6(Opcode::FillRoundRect, x, y, w, h, arc_width, arc_height)?;
        }
        Ok(())
    }

    pub fn stroke_round_rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        arc_width: f64,
        arc_height: f64,
    ) -> Result<()> {
        if w != 0.0 && h != 0.0 {
            self.write_op6(Opcode::StrokeRoundRect, x, y, w, h, arc_width, arc_height)?;
        }
        Ok(())
    }

    pub fn stroke_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        self.write_op4(Opcode::StrokeLine, x1, y1, x2, y2)
    }

    /// Fill a closed polygon; fewer than three points draw nothing
    pub fn fill_polygon(&mut self, points: &[Point]) -> Result<()> {
        if points.len() >= 3 {
            self.write_poly(points, true, Opcode::FillPath)?;
        }
        Ok(())
    }

    pub fn stroke_polygon(&mut self, points: &[Point]) -> Result<()> {
        if points.len() >= 2 {
            self.write_poly(points, true, Opcode::StrokePath)?;
        }
        Ok(())
    }

    pub fn stroke_polyline(&mut self, points: &[Point]) -> Result<()> {
        if points.len() >= 2 {
            self.write_poly(points, false, Opcode::StrokePath)?;
        }
        Ok(())
    }

    // === Text ===

    fn write_text(
        &mut self,
        opcode: Opcode,
        text: &str,
        x: f64,
        y: f64,
        max_width: f64,
    ) -> Result<()> {
        self.update_transform()?;
        let rtl = self.target.right_to_left;
        let buf = self.target.buffer()?;
        buf.put_opcode(opcode)?;
        buf.put_float(x as f32)?;
        buf.put_float(y as f32)?;
        buf.put_float(max_width as f32)?;
        buf.put_boolean(rtl)?;
        buf.put_object(BufferObject::Text(Arc::from(text)))
    }

    pub fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        self.write_text(Opcode::FillText, text, x, y, 0.0)
    }

    /// Fill text squeezed to at most `max_width`; non-positive widths draw
    /// nothing
    pub fn fill_text_with_max_width(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        max_width: f64,
    ) -> Result<()> {
        if !(max_width > 0.0) {
            return Ok(());
        }
        self.write_text(Opcode::FillText, text, x, y, max_width)
    }

    pub fn stroke_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        self.write_text(Opcode::StrokeText, text, x, y, 0.0)
    }

    pub fn stroke_text_with_max_width(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        max_width: f64,
    ) -> Result<()> {
        if !(max_width > 0.0) {
            return Ok(());
        }
        self.write_text(Opcode::StrokeText, text, x, y, max_width)
    }

    // === Images ===

    /// Draw an image at its natural size. Images still loading are skipped.
    pub fn draw_image(&mut self, image: &Image, x: f64, y: f64) -> Result<()> {
        let (w, h) = (image.width() as f64, image.height() as f64);
        self.draw_image_scaled(image, x, y, w, h)
    }

    pub fn draw_image_scaled(
        &mut self,
        image: &Image,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) -> Result<()> {
        if !image.is_loaded() {
            return Ok(());
        }
        self.write_op4(Opcode::DrawImage, x, y, w, h)?;
        self.buffer()?.put_object(BufferObject::Image(image.clone()))
    }

    /// Draw the source rectangle of `image` into the destination rectangle
    #[allow(clippy::too_many_arguments)]
    pub fn draw_image_region(
        &mut self,
        image: &Image,
        sx: f64,
        sy: f64,
        sw: f64,
        sh: f64,
        dx: f64,
        dy: f64,
        dw: f64,
        dh: f64,
    ) -> Result<()> {
        if !image.is_loaded() {
            return Ok(());
        }
        self.write_op4(Opcode::DrawSubimage, dx, dy, dw, dh)?;
        let buf = self.buffer()?;
        for value in [sx, sy, sw, sh] {
            buf.put_float(value as f32)?;
        }
        buf.put_object(BufferObject::Image(image.clone()))
    }

    /// Direct pixel access, bypassing transform, clip and effects
    pub fn pixel_writer(&mut self) -> PixelWriter<'_> {
        PixelWriter::new(&mut *self.target)
    }

    // === Reset ===

    fn covers_surface(&self, uses_fill: bool, x: f64, y: f64, w: f64, h: f64) -> bool {
        let state = &self.rec.state;
        let t = &state.transform;
        if !t.is_translate_or_identity() {
            return false;
        }
        let x = x + t.mxt();
        let y = y + t.myt();
        let covers =
            x <= 0.0 && y <= 0.0 && x + w >= self.target.width && y + h >= self.target.height;
        if !covers {
            return false;
        }
        if uses_fill
            && (state.blend_mode != BlendMode::SrcOver
                || !state.fill.is_opaque()
                || state.global_alpha < 1.0)
        {
            return false;
        }
        state.clip_depth == 0 && state.effect.is_none()
    }

    fn reset_if_covers(&mut self, uses_fill: bool, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        if self.covers_surface(uses_fill, x, y, w, h) {
            self.reset()?;
        }
        Ok(())
    }

    /// Discard the frame recorded so far and restate the current
    /// attributes and clips from defaults.
    ///
    /// Only acts once the frame has grown past the configured threshold or
    /// the renderer reports a backlog.
    pub fn reset(&mut self) -> Result<()> {
        let size = self
            .target
            .pending()
            .map_or(0, CommandBuffer::write_value_position);
        let behind = self.target.renderer_behind;
        if size <= self.target.config.reset_threshold() && !behind {
            return Ok(());
        }
        tracing::debug!(
            discarded_bytes = size,
            renderer_behind = behind,
            "resetting frame buffer"
        );

        let buf = self.target.buffer()?;
        buf.reset();
        buf.put_opcode(Opcode::Reset)?;
        self.update_dimensions()?;
        self.rec.transform_dirty = true;
        self.rec.path.mark_dirty();

        let saved = std::mem::take(&mut self.rec.state);
        let depth = saved.clip_depth;
        let buf = self.target.buffer()?;
        for clip in self.rec.clips.iter().take(depth) {
            buf.put_opcode(Opcode::PushClip)?;
            buf.put_object(BufferObject::Path(clip.clone()))?;
        }
        self.rec.state.clip_depth = depth;
        self.apply_state(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{decode_frame, Command};
    use crate::Surface;

    fn drain(surface: &mut Surface) -> Vec<Command> {
        match surface.take_buffer() {
            Some(mut frame) => decode_frame(&mut frame).unwrap(),
            None => Vec::new(),
        }
    }

    #[test]
    fn test_transform_flushed_once_before_geometry() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.translate(10.0, 0.0);
        rec.scale(2.0, 2.0);
        rec.rotate(90.0);
        rec.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        rec.fill_rect(2.0, 2.0, 1.0, 1.0).unwrap();

        let commands = drain(&mut surface);
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[0], Command::Transform(_)));
        assert!(matches!(commands[1], Command::FillRect(_)));
        assert!(matches!(commands[2], Command::FillRect(_)));
    }

    #[test]
    fn test_unchanged_path_is_not_resent() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.rect(1.0, 1.0, 5.0, 5.0).unwrap();
        rec.fill().unwrap();
        rec.stroke().unwrap();

        let commands = drain(&mut surface);
        assert_eq!(commands.len(), 3);
        assert!(matches!(&commands[0], Command::Path(segments) if segments.len() == 5));
        assert_eq!(commands[1], Command::FillPath);
        assert_eq!(commands[2], Command::StrokePath);
    }

    #[test]
    fn test_restore_resends_changed_fields_and_pops_clips() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.save();
        rec.set_line_width(5.0).unwrap();
        rec.rect(0.0, 0.0, 10.0, 10.0).unwrap();
        rec.clip().unwrap();
        assert_eq!(rec.state().clip_depth, 1);
        rec.restore().unwrap();
        assert_eq!(rec.line_width(), 1.0);
        assert_eq!(rec.state().clip_depth, 0);

        let commands = drain(&mut surface);
        assert_eq!(commands[0], Command::LineWidth(5.0));
        assert!(matches!(commands[1], Command::Path(_)));
        assert!(matches!(commands[2], Command::PushClip(_)));
        assert_eq!(commands[3], Command::LineWidth(1.0));
        assert_eq!(commands[4], Command::PopClip);
        assert_eq!(commands.len(), 5);
    }

    #[test]
    fn test_restore_without_save_is_ignored() {
        let mut surface = Surface::new(10.0, 10.0);
        surface.recorder().restore().unwrap();
        assert!(surface.take_buffer().is_none());
    }

    #[test]
    fn test_arc_to_on_empty_path_starts_at_corner() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.arc_to(10.0, 0.0, 10.0, 10.0, 2.0).unwrap();
        assert_eq!(
            rec.path().segments(),
            &[
                PathSegment::MoveTo { x: 10.0, y: 0.0 },
                PathSegment::LineTo { x: 10.0, y: 0.0 }
            ]
        );
    }

    #[test]
    fn test_svg_continues_from_current_point() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.translate(1.0, 1.0);
        rec.move_to(4.0, 4.0).unwrap();
        rec.append_svg_path("l 10 0").unwrap();
        assert_eq!(
            rec.path().segments(),
            &[
                PathSegment::MoveTo { x: 5.0, y: 5.0 },
                PathSegment::LineTo { x: 15.0, y: 5.0 }
            ]
        );
    }

    #[test]
    fn test_svg_absolute_move_starts_new_subpath() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.move_to(4.0, 4.0).unwrap();
        rec.line_to(8.0, 4.0).unwrap();
        rec.append_svg_path("  M 0 0 L 1 1").unwrap();
        assert_eq!(rec.path().len(), 4);
        assert_eq!(rec.path().current_point(), Some((1.0, 1.0)));
    }

    #[test]
    fn test_malformed_svg_leaves_path_untouched() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.move_to(1.0, 1.0).unwrap();
        let before = rec.path().clone();
        rec.append_svg_path("L 5 5 Q").unwrap();
        rec.append_svg_path("M 1 x").unwrap();
        assert_eq!(*rec.path(), before);
    }

    #[test]
    fn test_polygon_invalidates_sent_path() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        rec.rect(1.0, 1.0, 5.0, 5.0).unwrap();
        rec.fill().unwrap();
        rec.fill_polygon(&[
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        ])
        .unwrap();
        rec.fill().unwrap();

        let commands = drain(&mut surface);
        let runs: Vec<usize> = commands
            .iter()
            .filter_map(|c| match c {
                Command::Path(segments) => Some(segments.len()),
                _ => None,
            })
            .collect();
        // rect, triangle, then the rect again
        assert_eq!(runs, vec![5, 4, 5]);
    }

    #[test]
    fn test_effects_and_text() {
        let mut surface = Surface::new(100.0, 100.0);
        surface.set_right_to_left(true);
        let mut rec = surface.recorder();
        rec.set_effect(Some(Effect::GaussianBlur { radius: 4.0 })).unwrap();
        rec.set_effect(Some(Effect::GaussianBlur { radius: 4.0 })).unwrap();
        rec.fill_text_with_max_width("hi", 1.0, 2.0, 0.0).unwrap();
        rec.fill_text_with_max_width("hi", 1.0, 2.0, f64::NAN).unwrap();
        rec.stroke_text_with_max_width("hi", 1.0, 2.0, 30.0).unwrap();
        rec.apply_effect(Effect::SepiaTone { level: 1.0 }).unwrap();

        let commands = drain(&mut surface);
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[0], Command::Effect(Some(_))));
        match &commands[1] {
            Command::StrokeText(run) => {
                assert_eq!(&*run.text, "hi");
                assert_eq!(run.max_width, 30.0);
                assert!(run.right_to_left);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(commands[2], Command::ApplyEffect(_)));
    }

    #[test]
    fn test_unloaded_images_are_skipped() {
        let mut surface = Surface::new(100.0, 100.0);
        let mut rec = surface.recorder();
        let pending = Image::pending(4, 4, 0.5);
        rec.draw_image(&pending, 0.0, 0.0).unwrap();
        rec.draw_image_region(&pending, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0)
            .unwrap();
        assert!(surface.take_buffer().is_none());

        let image = Image::from_bgra_pre(2, 3, vec![0xff; 24]);
        surface.recorder().draw_image(&image, 5.0, 6.0).unwrap();
        let commands = drain(&mut surface);
        match &commands[0] {
            Command::DrawImage { dst, image: drawn } => {
                assert_eq!((dst.x, dst.y, dst.w, dst.h), (5.0, 6.0, 2.0, 3.0));
                assert_eq!(*drawn, image);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
