//! Paints: solid colors, gradients and image patterns

use smallvec::SmallVec;

use crate::color::Color;
use crate::geometry::{Point, Rect};
use crate::image::Image;

/// A gradient stop
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f32, // 0.0 to 1.0
    pub color: Color,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }
}

/// What a gradient does outside its `[0, 1]` range
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CycleMethod {
    #[default]
    NoCycle,
    Reflect,
    Repeat,
}

pub type Stops = SmallVec<[GradientStop; 4]>;

/// A resolved paint, as produced by the style layer
#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Color),
    LinearGradient {
        start: Point,
        end: Point,
        /// Coordinates are fractions of the filled shape's bounds
        proportional: bool,
        cycle: CycleMethod,
        stops: Stops,
    },
    RadialGradient {
        center: Point,
        radius: f64,
        focus_angle: f64,
        focus_distance: f64,
        proportional: bool,
        cycle: CycleMethod,
        stops: Stops,
    },
    ImagePattern {
        image: Image,
        anchor: Rect,
        proportional: bool,
    },
}

impl Paint {
    /// A two-stop linear gradient in absolute coordinates
    pub fn linear(start: Point, end: Point, from: Color, to: Color) -> Self {
        Paint::LinearGradient {
            start,
            end,
            proportional: false,
            cycle: CycleMethod::NoCycle,
            stops: smallvec::smallvec![GradientStop::new(0.0, from), GradientStop::new(1.0, to)],
        }
    }

    /// A two-stop radial gradient in absolute coordinates
    pub fn radial(center: Point, radius: f64, from: Color, to: Color) -> Self {
        Paint::RadialGradient {
            center,
            radius,
            focus_angle: 0.0,
            focus_distance: 0.0,
            proportional: false,
            cycle: CycleMethod::NoCycle,
            stops: smallvec::smallvec![GradientStop::new(0.0, from), GradientStop::new(1.0, to)],
        }
    }

    /// Whether every pixel this paint produces is fully opaque
    pub fn is_opaque(&self) -> bool {
        match self {
            Paint::Solid(color) => color.is_opaque(),
            Paint::LinearGradient { stops, .. } | Paint::RadialGradient { stops, .. } => {
                stops.iter().all(|s| s.color.is_opaque())
            }
            Paint::ImagePattern { image, .. } => image.is_opaque(),
        }
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Paint::Solid(color)
    }
}

impl Default for Paint {
    fn default() -> Self {
        Paint::Solid(Color::BLACK)
    }
}
