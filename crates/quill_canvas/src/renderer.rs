//! Renderer handoff and frame decoding
//!
//! A renderer receives whole frames. [`decode_frame`] turns a frame back
//! into typed commands in recording order; [`QueueRenderer`] is the
//! reference consumer that coalesces frames the way a render thread that
//! cannot keep up would.

use std::sync::Arc;

use quill_core::{
    Affine2D, ArcClosure, BlendMode, Effect, FillRule, Font, FontSmoothing, Image, LineCap,
    LineJoin, Paint, TextAlign, TextBaseline,
};

use crate::buffer::{BufferObject, CommandBuffer};
use crate::error::ReplayError;
use crate::opcode::{Opcode, WireByte};
use crate::path::PathSegment;

/// Consumer side of the frame handoff
pub trait Renderer {
    /// Take ownership of a finished frame.
    ///
    /// Returns true when an earlier frame was still waiting, i.e. the
    /// renderer is falling behind.
    fn update_rendering(&mut self, frame: CommandBuffer) -> bool;
}

/// Rectangle payload of the direct shape ops
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: Arc<str>,
    pub x: f32,
    pub y: f32,
    /// Zero when unconstrained
    pub max_width: f32,
    pub right_to_left: bool,
}

/// One decoded instruction
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    GlobalAlpha(f32),
    BlendMode(BlendMode),
    FillPaint(Arc<Paint>),
    StrokePaint(Arc<Paint>),
    LineWidth(f32),
    LineCap(LineCap),
    LineJoin(LineJoin),
    MiterLimit(f32),
    Font(Arc<Font>),
    TextAlign(TextAlign),
    TextBaseline(TextBaseline),
    Transform(Affine2D),
    Effect(Option<Arc<Effect>>),
    PushClip(Arc<crate::path::PathData>),
    PopClip,
    ArcType(ArcClosure),
    FillRule(FillRule),
    LineDashes(Option<Arc<[f64]>>),
    LineDashOffset(f32),
    FontSmoothing(FontSmoothing),

    FillRect(Bounds),
    StrokeRect(Bounds),
    ClearRect(Bounds),
    StrokeLine { x1: f32, y1: f32, x2: f32, y2: f32 },
    FillOval(Bounds),
    StrokeOval(Bounds),
    FillRoundRect { bounds: Bounds, arc_width: f32, arc_height: f32 },
    StrokeRoundRect { bounds: Bounds, arc_width: f32, arc_height: f32 },
    FillArc { bounds: Bounds, start: f32, extent: f32 },
    StrokeArc { bounds: Bounds, start: f32, extent: f32 },
    FillText(TextRun),
    StrokeText(TextRun),

    /// A PATHSTART..PATHEND run replacing the renderer's path
    Path(Vec<PathSegment>),
    FillPath,
    StrokePath,

    DrawImage { dst: Bounds, image: Image },
    DrawSubimage { dst: Bounds, src: Bounds, image: Image },
    PutArgb { x: i32, y: i32, argb: u32 },
    PutPixels { x: i32, y: i32, w: i32, h: i32, bgra_pre: Arc<[u8]> },

    ApplyEffect(Arc<Effect>),

    Reset,
    SetDims { width: f32, height: f32 },
}

type Decoded<T> = Result<T, ReplayError>;

fn object<T>(
    buf: &mut CommandBuffer,
    expected: &'static str,
    pick: impl FnOnce(BufferObject) -> Option<T>,
) -> Decoded<T> {
    let offset = buf.read_value_position();
    let object = buf.get_object()?;
    pick(object).ok_or(ReplayError::ObjectMismatch { offset, expected })
}

fn wire<T: WireByte>(buf: &mut CommandBuffer, opcode: Opcode) -> Decoded<T> {
    let byte = buf.get_byte()?;
    T::from_wire(byte).ok_or(ReplayError::InvalidValue {
        opcode: opcode.as_u8(),
        value: byte as i64,
    })
}

fn bounds(buf: &mut CommandBuffer) -> Decoded<Bounds> {
    Ok(Bounds {
        x: buf.get_float()?,
        y: buf.get_float()?,
        w: buf.get_float()?,
        h: buf.get_float()?,
    })
}

fn text_run(buf: &mut CommandBuffer) -> Decoded<TextRun> {
    let x = buf.get_float()?;
    let y = buf.get_float()?;
    let max_width = buf.get_float()?;
    let right_to_left = buf.get_boolean()?;
    let text = object(buf, "text", |o| match o {
        BufferObject::Text(text) => Some(text),
        _ => None,
    })?;
    Ok(TextRun {
        text,
        x,
        y,
        max_width,
        right_to_left,
    })
}

fn image(buf: &mut CommandBuffer) -> Decoded<Image> {
    object(buf, "image", |o| match o {
        BufferObject::Image(image) => Some(image),
        _ => None,
    })
}

fn paint(buf: &mut CommandBuffer) -> Decoded<Arc<Paint>> {
    object(buf, "paint", |o| match o {
        BufferObject::Paint(paint) => Some(paint),
        _ => None,
    })
}

fn opcode_at(buf: &mut CommandBuffer) -> Decoded<Opcode> {
    let offset = buf.read_value_position();
    let byte = buf.get_byte()?;
    Opcode::from_u8(byte).ok_or(ReplayError::UnknownOpcode {
        opcode: byte,
        offset,
    })
}

fn path_run(buf: &mut CommandBuffer) -> Decoded<Vec<PathSegment>> {
    let mut segments = Vec::new();
    loop {
        let offset = buf.read_value_position();
        let segment = match opcode_at(buf)? {
            Opcode::MoveTo => PathSegment::MoveTo {
                x: buf.get_float()?,
                y: buf.get_float()?,
            },
            Opcode::LineTo => PathSegment::LineTo {
                x: buf.get_float()?,
                y: buf.get_float()?,
            },
            Opcode::QuadTo => PathSegment::QuadTo {
                cx: buf.get_float()?,
                cy: buf.get_float()?,
                x: buf.get_float()?,
                y: buf.get_float()?,
            },
            Opcode::CubicTo => PathSegment::CubicTo {
                c1x: buf.get_float()?,
                c1y: buf.get_float()?,
                c2x: buf.get_float()?,
                c2y: buf.get_float()?,
                x: buf.get_float()?,
                y: buf.get_float()?,
            },
            Opcode::ClosePath => PathSegment::Close,
            Opcode::PathEnd => return Ok(segments),
            other => {
                return Err(ReplayError::UnknownOpcode {
                    opcode: other.as_u8(),
                    offset,
                })
            }
        };
        segments.push(segment);
    }
}

fn next_command(buf: &mut CommandBuffer) -> Decoded<Command> {
    let offset = buf.read_value_position();
    let opcode = opcode_at(buf)?;
    let command = match opcode {
        Opcode::GlobalAlpha => Command::GlobalAlpha(buf.get_float()?),
        Opcode::CompMode => Command::BlendMode(wire(buf, opcode)?),
        Opcode::FillPaint => Command::FillPaint(paint(buf)?),
        Opcode::StrokePaint => Command::StrokePaint(paint(buf)?),
        Opcode::LineWidth => Command::LineWidth(buf.get_float()?),
        Opcode::LineCap => Command::LineCap(wire(buf, opcode)?),
        Opcode::LineJoin => Command::LineJoin(wire(buf, opcode)?),
        Opcode::MiterLimit => Command::MiterLimit(buf.get_float()?),
        Opcode::Font => Command::Font(object(buf, "font", |o| match o {
            BufferObject::Font(font) => Some(font),
            _ => None,
        })?),
        Opcode::TextAlign => Command::TextAlign(wire(buf, opcode)?),
        Opcode::TextBaseline => Command::TextBaseline(wire(buf, opcode)?),
        Opcode::Transform => {
            let mxx = buf.get_double()?;
            let mxy = buf.get_double()?;
            let mxt = buf.get_double()?;
            let myx = buf.get_double()?;
            let myy = buf.get_double()?;
            let myt = buf.get_double()?;
            Command::Transform(Affine2D::new(mxx, myx, mxy, myy, mxt, myt))
        }
        Opcode::Effect => Command::Effect(object(buf, "effect", |o| match o {
            BufferObject::Effect(effect) => Some(effect),
            _ => None,
        })?),
        Opcode::PushClip => Command::PushClip(object(buf, "path", |o| match o {
            BufferObject::Path(path) => Some(path),
            _ => None,
        })?),
        Opcode::PopClip => Command::PopClip,
        Opcode::ArcType => Command::ArcType(wire(buf, opcode)?),
        Opcode::FillRule => Command::FillRule(wire(buf, opcode)?),
        Opcode::DashArray => Command::LineDashes(object(buf, "dashes", |o| match o {
            BufferObject::Dashes(dashes) => Some(dashes),
            _ => None,
        })?),
        Opcode::DashOffset => Command::LineDashOffset(buf.get_float()?),
        Opcode::FontSmooth => Command::FontSmoothing(wire(buf, opcode)?),

        Opcode::FillRect => Command::FillRect(bounds(buf)?),
        Opcode::StrokeRect => Command::StrokeRect(bounds(buf)?),
        Opcode::ClearRect => Command::ClearRect(bounds(buf)?),
        Opcode::StrokeLine => Command::StrokeLine {
            x1: buf.get_float()?,
            y1: buf.get_float()?,
            x2: buf.get_float()?,
            y2: buf.get_float()?,
        },
        Opcode::FillOval => Command::FillOval(bounds(buf)?),
        Opcode::StrokeOval => Command::StrokeOval(bounds(buf)?),
        Opcode::FillRoundRect => Command::FillRoundRect {
            bounds: bounds(buf)?,
            arc_width: buf.get_float()?,
            arc_height: buf.get_float()?,
        },
        Opcode::StrokeRoundRect => Command::StrokeRoundRect {
            bounds: bounds(buf)?,
            arc_width: buf.get_float()?,
            arc_height: buf.get_float()?,
        },
        Opcode::FillArc => Command::FillArc {
            bounds: bounds(buf)?,
            start: buf.get_float()?,
            extent: buf.get_float()?,
        },
        Opcode::StrokeArc => Command::StrokeArc {
            bounds: bounds(buf)?,
            start: buf.get_float()?,
            extent: buf.get_float()?,
        },
        Opcode::FillText => Command::FillText(text_run(buf)?),
        Opcode::StrokeText => Command::StrokeText(text_run(buf)?),

        Opcode::PathStart => Command::Path(path_run(buf)?),
        Opcode::FillPath => Command::FillPath,
        Opcode::StrokePath => Command::StrokePath,
        // segment opcodes only appear inside a path run
        Opcode::MoveTo
        | Opcode::LineTo
        | Opcode::QuadTo
        | Opcode::CubicTo
        | Opcode::ClosePath
        | Opcode::PathEnd => {
            return Err(ReplayError::UnknownOpcode {
                opcode: opcode.as_u8(),
                offset,
            })
        }

        Opcode::DrawImage => Command::DrawImage {
            dst: bounds(buf)?,
            image: image(buf)?,
        },
        Opcode::DrawSubimage => Command::DrawSubimage {
            dst: bounds(buf)?,
            src: bounds(buf)?,
            image: image(buf)?,
        },
        Opcode::PutArgb => Command::PutArgb {
            x: buf.get_int()?,
            y: buf.get_int()?,
            argb: buf.get_int()? as u32,
        },
        Opcode::PutArgbPreBuf => Command::PutPixels {
            x: buf.get_int()?,
            y: buf.get_int()?,
            w: buf.get_int()?,
            h: buf.get_int()?,
            bgra_pre: object(buf, "pixels", |o| match o {
                BufferObject::Pixels(pixels) => Some(pixels),
                _ => None,
            })?,
        },

        Opcode::ApplyEffect => Command::ApplyEffect(object(buf, "effect", |o| match o {
            BufferObject::Effect(Some(effect)) => Some(effect),
            _ => None,
        })?),

        Opcode::Reset => Command::Reset,
        Opcode::SetDims => Command::SetDims {
            width: buf.get_float()?,
            height: buf.get_float()?,
        },
    };
    Ok(command)
}

/// Decode every command in `frame`, starting from its beginning
pub fn decode_frame(frame: &mut CommandBuffer) -> Result<Vec<Command>, ReplayError> {
    frame.rewind_read();
    let mut commands = Vec::new();
    while frame.has_values() {
        commands.push(next_command(frame)?);
    }
    Ok(commands)
}

/// Holds at most one undrawn frame, merging newer frames into it
#[derive(Debug, Default)]
pub struct QueueRenderer {
    pending: Option<CommandBuffer>,
    frames_received: u64,
    frames_coalesced: u64,
}

impl QueueRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&CommandBuffer> {
        self.pending.as_ref()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Frames that arrived while another was still pending
    pub fn frames_coalesced(&self) -> u64 {
        self.frames_coalesced
    }

    pub fn take_pending(&mut self) -> Option<CommandBuffer> {
        self.pending.take()
    }

    /// Draw the pending frame, returning its commands.
    ///
    /// A frame that fails to decode is dropped.
    pub fn render(&mut self) -> Option<Vec<Command>> {
        let mut frame = self.pending.take()?;
        match decode_frame(&mut frame) {
            Ok(commands) => {
                tracing::trace!(commands = commands.len(), "rendered frame");
                Some(commands)
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping undecodable frame");
                None
            }
        }
    }
}

impl Renderer for QueueRenderer {
    fn update_rendering(&mut self, mut frame: CommandBuffer) -> bool {
        if frame.is_empty() {
            return self.pending.is_some();
        }
        self.frames_received += 1;
        let starts_fresh = frame.peek_byte(0) == Some(Opcode::Reset.as_u8());
        let Some(pending) = self.pending.as_mut() else {
            self.pending = Some(frame);
            return false;
        };

        self.frames_coalesced += 1;
        if starts_fresh {
            tracing::trace!("newer frame resets, discarding pending frame");
            *pending = frame;
        } else if let Err(err) = pending.append(&mut frame) {
            tracing::warn!(error = %err, "could not merge frames, keeping the newest");
            *pending = frame;
        }
        true
    }
}
