//! Quill core types
//!
//! Fully resolved values that the drawing surface accepts through its
//! attribute setters. Nothing here parses style syntax; a style layer is
//! expected to hand over finished values.
//!
//! # Contents
//!
//! - Geometry primitives and a 2D affine matrix
//! - Colors, gradients and image patterns
//! - Fonts and text layout enums
//! - Image handles with load progress
//! - Effects and blend modes

pub mod affine;
pub mod blend;
pub mod color;
pub mod effect;
pub mod geometry;
pub mod image;
pub mod paint;
pub mod stroke;
pub mod text;

pub use affine::Affine2D;
pub use blend::BlendMode;
pub use color::Color;
pub use effect::Effect;
pub use geometry::{Point, Rect, Size};
pub use image::Image;
pub use paint::{CycleMethod, GradientStop, Paint};
pub use stroke::{ArcClosure, FillRule, LineCap, LineJoin};
pub use text::{Font, FontPosture, FontSmoothing, FontWeight, TextAlign, TextBaseline};
