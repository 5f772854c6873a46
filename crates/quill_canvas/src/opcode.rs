//! Opcode table and payload byte encodings
//!
//! The stream is private to the producer and the consumer in this crate;
//! values are grouped by base so ranges can be tested cheaply.

use quill_core::{
    ArcClosure, BlendMode, FillRule, FontSmoothing, LineCap, LineJoin, TextAlign, TextBaseline,
};

pub const ATTR_BASE: u8 = 0;
pub const OP_BASE: u8 = 20;
pub const PATH_BASE: u8 = 40;
pub const IMG_BASE: u8 = 50;
pub const FX_BASE: u8 = 60;
pub const UTIL_BASE: u8 = 70;

/// A single-byte instruction tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Attributes
    GlobalAlpha = ATTR_BASE,
    CompMode = ATTR_BASE + 1,
    FillPaint = ATTR_BASE + 2,
    StrokePaint = ATTR_BASE + 3,
    LineWidth = ATTR_BASE + 4,
    LineCap = ATTR_BASE + 5,
    LineJoin = ATTR_BASE + 6,
    MiterLimit = ATTR_BASE + 7,
    Font = ATTR_BASE + 8,
    TextAlign = ATTR_BASE + 9,
    TextBaseline = ATTR_BASE + 10,
    Transform = ATTR_BASE + 11,
    Effect = ATTR_BASE + 12,
    PushClip = ATTR_BASE + 13,
    PopClip = ATTR_BASE + 14,
    ArcType = ATTR_BASE + 15,
    FillRule = ATTR_BASE + 16,
    DashArray = ATTR_BASE + 17,
    DashOffset = ATTR_BASE + 18,
    FontSmooth = ATTR_BASE + 19,

    // Direct shapes and text
    FillRect = OP_BASE,
    StrokeRect = OP_BASE + 1,
    ClearRect = OP_BASE + 2,
    StrokeLine = OP_BASE + 3,
    FillOval = OP_BASE + 4,
    StrokeOval = OP_BASE + 5,
    FillRoundRect = OP_BASE + 6,
    StrokeRoundRect = OP_BASE + 7,
    FillArc = OP_BASE + 8,
    StrokeArc = OP_BASE + 9,
    FillText = OP_BASE + 10,
    StrokeText = OP_BASE + 11,

    // Paths
    PathStart = PATH_BASE,
    MoveTo = PATH_BASE + 1,
    LineTo = PATH_BASE + 2,
    QuadTo = PATH_BASE + 3,
    CubicTo = PATH_BASE + 4,
    ClosePath = PATH_BASE + 5,
    PathEnd = PATH_BASE + 6,
    FillPath = PATH_BASE + 7,
    StrokePath = PATH_BASE + 8,

    // Images and pixels
    DrawImage = IMG_BASE,
    DrawSubimage = IMG_BASE + 1,
    PutArgb = IMG_BASE + 2,
    PutArgbPreBuf = IMG_BASE + 3,

    // Effects
    ApplyEffect = FX_BASE,

    // Utilities
    Reset = UTIL_BASE,
    SetDims = UTIL_BASE + 1,
}

impl Opcode {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let op = match byte {
            0 => Self::GlobalAlpha,
            1 => Self::CompMode,
            2 => Self::FillPaint,
            3 => Self::StrokePaint,
            4 => Self::LineWidth,
            5 => Self::LineCap,
            6 => Self::LineJoin,
            7 => Self::MiterLimit,
            8 => Self::Font,
            9 => Self::TextAlign,
            10 => Self::TextBaseline,
            11 => Self::Transform,
            12 => Self::Effect,
            13 => Self::PushClip,
            14 => Self::PopClip,
            15 => Self::ArcType,
            16 => Self::FillRule,
            17 => Self::DashArray,
            18 => Self::DashOffset,
            19 => Self::FontSmooth,
            20 => Self::FillRect,
            21 => Self::StrokeRect,
            22 => Self::ClearRect,
            23 => Self::StrokeLine,
            24 => Self::FillOval,
            25 => Self::StrokeOval,
            26 => Self::FillRoundRect,
            27 => Self::StrokeRoundRect,
            28 => Self::FillArc,
            29 => Self::StrokeArc,
            30 => Self::FillText,
            31 => Self::StrokeText,
            40 => Self::PathStart,
            41 => Self::MoveTo,
            42 => Self::LineTo,
            43 => Self::QuadTo,
            44 => Self::CubicTo,
            45 => Self::ClosePath,
            46 => Self::PathEnd,
            47 => Self::FillPath,
            48 => Self::StrokePath,
            50 => Self::DrawImage,
            51 => Self::DrawSubimage,
            52 => Self::PutArgb,
            53 => Self::PutArgbPreBuf,
            60 => Self::ApplyEffect,
            70 => Self::Reset,
            71 => Self::SetDims,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Byte encoding for enum-valued payloads
pub trait WireByte: Sized + Copy {
    fn to_wire(self) -> u8;
    fn from_wire(byte: u8) -> Option<Self>;
}

macro_rules! wire_enum {
    ($ty:ty { $($variant:path = $byte:literal),+ $(,)? }) => {
        impl WireByte for $ty {
            fn to_wire(self) -> u8 {
                match self {
                    $($variant => $byte),+
                }
            }

            fn from_wire(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some($variant),)+
                    _ => None,
                }
            }
        }
    };
}

wire_enum!(LineCap {
    LineCap::Butt = 0,
    LineCap::Round = 1,
    LineCap::Square = 2,
});

wire_enum!(LineJoin {
    LineJoin::Miter = 0,
    LineJoin::Round = 1,
    LineJoin::Bevel = 2,
});

wire_enum!(ArcClosure {
    ArcClosure::Open = 0,
    ArcClosure::Chord = 1,
    ArcClosure::Round = 2,
});

wire_enum!(TextAlign {
    TextAlign::Left = 0,
    TextAlign::Center = 1,
    TextAlign::Right = 2,
    TextAlign::Justify = 3,
});

wire_enum!(TextBaseline {
    TextBaseline::Top = 0,
    TextBaseline::Middle = 1,
    TextBaseline::Alphabetic = 2,
    TextBaseline::Bottom = 3,
});

wire_enum!(FillRule {
    FillRule::NonZero = 0,
    FillRule::EvenOdd = 1,
});

wire_enum!(FontSmoothing {
    FontSmoothing::Gray = 0,
    FontSmoothing::Lcd = 1,
});

impl WireByte for BlendMode {
    fn to_wire(self) -> u8 {
        self as u8
    }

    fn from_wire(byte: u8) -> Option<Self> {
        BlendMode::from_u8(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_byte_maps_back_to_itself() {
        let mut count = 0;
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_u8(byte) {
                assert_eq!(op.as_u8(), byte);
                count += 1;
            }
        }
        assert_eq!(count, 20 + 12 + 9 + 4 + 1 + 2);
    }

    #[test]
    fn test_group_bases() {
        assert_eq!(Opcode::FillRect as u8, 20);
        assert_eq!(Opcode::StrokeText as u8, 31);
        assert_eq!(Opcode::StrokePath as u8, 48);
        assert_eq!(Opcode::SetDims as u8, 71);
        assert_eq!(Opcode::from_u8(32), None);
    }

    #[test]
    fn test_enum_payload_bytes() {
        assert_eq!(LineCap::Square.to_wire(), 2);
        assert_eq!(LineJoin::from_wire(2), Some(LineJoin::Bevel));
        assert_eq!(TextBaseline::Alphabetic.to_wire(), 2);
        assert_eq!(FillRule::from_wire(2), None);
    }
}
