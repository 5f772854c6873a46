//! Rendering attribute snapshot

use std::sync::Arc;

use quill_core::{
    Affine2D, BlendMode, Effect, FillRule, Font, FontSmoothing, LineCap, LineJoin, Paint,
    TextAlign, TextBaseline,
};

/// Every attribute that affects how later operations render.
///
/// Shared values sit behind `Arc` so that `save()` copies are cheap and
/// the recorded buffer can hold the same handles.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeState {
    pub global_alpha: f64,
    pub blend_mode: BlendMode,
    pub transform: Affine2D,
    pub fill: Arc<Paint>,
    pub stroke: Arc<Paint>,
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub dashes: Option<Arc<[f64]>>,
    pub dash_offset: f64,
    /// Number of clip paths pushed and not yet popped
    pub clip_depth: usize,
    pub font: Arc<Font>,
    pub font_smoothing: FontSmoothing,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub effect: Option<Arc<Effect>>,
    pub fill_rule: FillRule,
}

impl Default for AttributeState {
    fn default() -> Self {
        Self {
            global_alpha: 1.0,
            blend_mode: BlendMode::SrcOver,
            transform: Affine2D::IDENTITY,
            fill: Arc::new(Paint::default()),
            stroke: Arc::new(Paint::default()),
            line_width: 1.0,
            line_cap: LineCap::Square,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
            dashes: None,
            dash_offset: 0.0,
            clip_depth: 0,
            font: Arc::new(Font::default()),
            font_smoothing: FontSmoothing::Gray,
            text_align: TextAlign::Left,
            text_baseline: TextBaseline::Alphabetic,
            effect: None,
            fill_rule: FillRule::NonZero,
        }
    }
}

/// Accepts values that are finite and strictly positive
pub(crate) fn is_positive_finite(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

/// Outcome of validating a requested dash pattern
#[derive(Clone, Debug, PartialEq)]
pub enum DashUpdate {
    /// Solid lines
    Clear,
    Set(Arc<[f64]>),
    /// Invalid request; keep the current pattern
    Ignore,
}

/// Validate and normalize a dash pattern.
///
/// Empty or all-zero patterns mean solid lines. Odd-length patterns are
/// repeated once so on/off pairs line up. A negative or non-finite entry
/// rejects the whole pattern.
pub fn normalize_dashes(dashes: Option<&[f64]>) -> DashUpdate {
    let Some(dashes) = dashes else {
        return DashUpdate::Clear;
    };
    if dashes.is_empty() {
        return DashUpdate::Clear;
    }
    let mut all_zero = true;
    for &d in dashes {
        if !(d >= 0.0) || !d.is_finite() {
            return DashUpdate::Ignore;
        }
        if d > 0.0 {
            all_zero = false;
        }
    }
    if all_zero {
        return DashUpdate::Clear;
    }
    if dashes.len() % 2 == 1 {
        let doubled: Vec<f64> = dashes.iter().chain(dashes.iter()).copied().collect();
        DashUpdate::Set(doubled.into())
    } else {
        DashUpdate::Set(Arc::from(dashes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = AttributeState::default();
        assert_eq!(s.line_cap, LineCap::Square);
        assert_eq!(s.miter_limit, 10.0);
        assert_eq!(s.text_baseline, TextBaseline::Alphabetic);
        assert_eq!(*s.fill, Paint::Solid(quill_core::Color::BLACK));
        assert!(s.transform.is_identity());
    }

    #[test]
    fn test_odd_dashes_are_repeated() {
        let update = normalize_dashes(Some(&[4.0, 2.0, 1.0]));
        assert_eq!(
            update,
            DashUpdate::Set(Arc::from(&[4.0, 2.0, 1.0, 4.0, 2.0, 1.0][..]))
        );
    }

    #[test]
    fn test_dash_clearing_and_rejection() {
        assert_eq!(normalize_dashes(None), DashUpdate::Clear);
        assert_eq!(normalize_dashes(Some(&[])), DashUpdate::Clear);
        assert_eq!(normalize_dashes(Some(&[0.0, 0.0, 0.0])), DashUpdate::Clear);
        assert_eq!(normalize_dashes(Some(&[1.0, -1.0])), DashUpdate::Ignore);
        assert_eq!(normalize_dashes(Some(&[1.0, f64::NAN])), DashUpdate::Ignore);
        assert_eq!(
            normalize_dashes(Some(&[1.0, f64::INFINITY])),
            DashUpdate::Ignore
        );
    }

    #[test]
    fn test_positive_finite() {
        assert!(is_positive_finite(0.5));
        assert!(!is_positive_finite(0.0));
        assert!(!is_positive_finite(f64::INFINITY));
        assert!(!is_positive_finite(f64::NAN));
    }
}
