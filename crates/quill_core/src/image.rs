//! Image handles

use std::sync::Arc;

#[derive(Debug)]
struct ImageData {
    width: u32,
    height: u32,
    /// Premultiplied BGRA, tightly packed
    pixels: Arc<[u8]>,
    progress: f64,
    opaque: bool,
}

/// A shared, immutable image.
///
/// Cloning is cheap; clones compare equal because equality is identity.
#[derive(Clone, Debug)]
pub struct Image {
    data: Arc<ImageData>,
}

impl Image {
    /// A fully loaded image from premultiplied BGRA bytes.
    ///
    /// Missing trailing bytes are treated as transparent.
    pub fn from_bgra_pre(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * 4;
        let opaque = pixels.len() >= expected && pixels.chunks_exact(4).all(|px| px[3] == 0xFF);
        Self {
            data: Arc::new(ImageData {
                width,
                height,
                pixels,
                progress: 1.0,
                opaque,
            }),
        }
    }

    /// A placeholder for an image whose content has not arrived yet
    pub fn pending(width: u32, height: u32, progress: f64) -> Self {
        Self {
            data: Arc::new(ImageData {
                width,
                height,
                pixels: Arc::from(Vec::new()),
                progress: progress.clamp(0.0, 1.0),
                opaque: false,
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.data.width
    }

    pub fn height(&self) -> u32 {
        self.data.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data.pixels
    }

    /// Load progress in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.data.progress
    }

    pub fn is_loaded(&self) -> bool {
        self.data.progress >= 1.0
    }

    pub fn is_opaque(&self) -> bool {
        self.data.opaque
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_and_opaque() {
        let img = Image::from_bgra_pre(2, 1, vec![0, 0, 0, 255, 10, 20, 30, 255]);
        assert!(img.is_loaded());
        assert!(img.is_opaque());

        let translucent = Image::from_bgra_pre(1, 1, vec![0, 0, 0, 128]);
        assert!(!translucent.is_opaque());

        let pending = Image::pending(4, 4, 0.25);
        assert!(!pending.is_loaded());
        assert_eq!(pending.progress(), 0.25);
    }

    #[test]
    fn test_equality_is_identity() {
        let a = Image::from_bgra_pre(1, 1, vec![0, 0, 0, 255]);
        let b = Image::from_bgra_pre(1, 1, vec![0, 0, 0, 255]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
