//! Font and text layout attributes

/// Font weight on the usual 100..900 scale
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Thin,
    ExtraLight,
    Light,
    #[default]
    Normal,
    Medium,
    SemiBold,
    Bold,
    ExtraBold,
    Black,
}

impl FontWeight {
    pub fn weight(&self) -> u16 {
        match self {
            FontWeight::Thin => 100,
            FontWeight::ExtraLight => 200,
            FontWeight::Light => 300,
            FontWeight::Normal => 400,
            FontWeight::Medium => 500,
            FontWeight::SemiBold => 600,
            FontWeight::Bold => 700,
            FontWeight::ExtraBold => 800,
            FontWeight::Black => 900,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontPosture {
    #[default]
    Regular,
    Italic,
}

/// A resolved font request
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub family: String,
    /// Size in points
    pub size: f64,
    pub weight: FontWeight,
    pub posture: FontPosture,
}

impl Font {
    pub const DEFAULT_FAMILY: &'static str = "System";
    pub const DEFAULT_SIZE: f64 = 12.0;

    pub fn new(family: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
            weight: FontWeight::Normal,
            posture: FontPosture::Regular,
        }
    }

    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_posture(mut self, posture: FontPosture) -> Self {
        self.posture = posture;
        self
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FAMILY, Self::DEFAULT_SIZE)
    }
}

/// Glyph antialiasing mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontSmoothing {
    #[default]
    Gray,
    Lcd,
}

/// Horizontal text anchoring relative to the x coordinate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical text anchoring relative to the y coordinate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextBaseline {
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
}
