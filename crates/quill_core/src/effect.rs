//! Image effects applied to drawing operations

use crate::color::Color;

/// An image effect.
///
/// Effects are plain values; once handed to the surface they are shared
/// immutably with the renderer.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    BoxBlur { width: f64, height: f64, iterations: u32 },
    GaussianBlur { radius: f64 },
    DropShadow {
        radius: f64,
        offset_x: f64,
        offset_y: f64,
        color: Color,
    },
    InnerShadow {
        radius: f64,
        offset_x: f64,
        offset_y: f64,
        color: Color,
    },
    ColorAdjust {
        hue: f64,
        saturation: f64,
        brightness: f64,
        contrast: f64,
    },
    Glow { level: f64 },
    Bloom { threshold: f64 },
    SepiaTone { level: f64 },
    /// Apply `top` to the output of `bottom`
    Chain { top: Box<Effect>, bottom: Box<Effect> },
}

impl Effect {
    pub fn chain(top: Effect, bottom: Effect) -> Self {
        Effect::Chain {
            top: Box::new(top),
            bottom: Box::new(bottom),
        }
    }
}
