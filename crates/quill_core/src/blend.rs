//! Compositing modes

/// Blend mode used when compositing a drawing operation onto the surface.
///
/// `SrcOver` is ordinary alpha blending; every other mode counts as a
/// blended draw for the coverage check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    SrcOver = 0,
    SrcAtop = 1,
    Add = 2,
    Multiply = 3,
    Screen = 4,
    Overlay = 5,
    Darken = 6,
    Lighten = 7,
    ColorDodge = 8,
    ColorBurn = 9,
    HardLight = 10,
    SoftLight = 11,
    Difference = 12,
    Exclusion = 13,
    Red = 14,
    Green = 15,
    Blue = 16,
}

impl BlendMode {
    pub const ALL: [BlendMode; 17] = [
        BlendMode::SrcOver,
        BlendMode::SrcAtop,
        BlendMode::Add,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Red,
        BlendMode::Green,
        BlendMode::Blue,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants_match_table() {
        for (i, mode) in BlendMode::ALL.iter().enumerate() {
            assert_eq!(*mode as usize, i);
            assert_eq!(BlendMode::from_u8(i as u8), Some(*mode));
        }
        assert_eq!(BlendMode::from_u8(17), None);
    }
}
