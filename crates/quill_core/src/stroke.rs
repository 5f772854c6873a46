//! Stroke and fill enums

/// Line end decoration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineCap {
    Butt,
    Round,
    #[default]
    Square,
}

/// Corner treatment between stroked segments
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Winding rule for fills, clips and hit testing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    /// Whether a point with the given winding count is inside
    pub fn is_inside(&self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding & 1 != 0,
        }
    }
}

/// How an arc shape is closed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ArcClosure {
    #[default]
    Open,
    Chord,
    Round,
}
