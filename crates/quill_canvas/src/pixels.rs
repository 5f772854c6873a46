//! Direct pixel writes
//!
//! Pixel writes bypass transform, clip, alpha and effects. Block writes
//! are clipped to the surface and stored as tightly packed premultiplied
//! BGRA.

use std::sync::Arc;

use quill_core::Color;

use crate::buffer::BufferObject;
use crate::error::Result;
use crate::opcode::Opcode;
use crate::surface::FrameTarget;

/// Layout of the source bytes passed to [`PixelWriter::set_pixels`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 bytes per pixel, premultiplied alpha
    ByteBgraPre,
    /// 4 bytes per pixel, straight alpha
    ByteBgra,
    /// 3 bytes per pixel, opaque
    ByteRgb,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::ByteBgraPre | PixelFormat::ByteBgra => 4,
            PixelFormat::ByteRgb => 3,
        }
    }

    /// Convert one source pixel to premultiplied BGRA
    fn to_bgra_pre(self, src: &[u8]) -> [u8; 4] {
        match self {
            PixelFormat::ByteBgraPre => [src[0], src[1], src[2], src[3]],
            PixelFormat::ByteBgra => {
                let a = src[3];
                [
                    premultiply(src[0], a),
                    premultiply(src[1], a),
                    premultiply(src[2], a),
                    a,
                ]
            }
            PixelFormat::ByteRgb => [src[2], src[1], src[0], 0xff],
        }
    }
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((channel as u32 * alpha as u32 + 127) / 255) as u8
}

fn argb_to_bgra_pre(argb: u32) -> [u8; 4] {
    let [a, r, g, b] = argb.to_be_bytes();
    [premultiply(b, a), premultiply(g, a), premultiply(r, a), a]
}

/// A block write after clipping against the surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ClippedBlock {
    x: i32,
    y: i32,
    w: usize,
    h: usize,
    /// Skipped source columns and rows
    src_x: usize,
    src_y: usize,
}

fn clip_block(x: i32, y: i32, w: i32, h: i32, bounds: (i32, i32)) -> Option<ClippedBlock> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = x.saturating_add(w).min(bounds.0);
    let y1 = y.saturating_add(h).min(bounds.1);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(ClippedBlock {
        x: x0,
        y: y0,
        w: (x1 - x0) as usize,
        h: (y1 - y0) as usize,
        src_x: (x0 - x) as usize,
        src_y: (y0 - y) as usize,
    })
}

/// Writes pixels into the frame being recorded
pub struct PixelWriter<'a> {
    target: &'a mut FrameTarget,
}

impl<'a> PixelWriter<'a> {
    pub(crate) fn new(target: &'a mut FrameTarget) -> Self {
        Self { target }
    }

    /// Addressable pixel extent: the surface size rounded up
    pub fn bounds(&self) -> (i32, i32) {
        (
            self.target.width.ceil() as i32,
            self.target.height.ceil() as i32,
        )
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        let (w, h) = self.bounds();
        x >= 0 && y >= 0 && x < w && y < h
    }

    /// Set one pixel from a straight-alpha ARGB value
    pub fn set_argb(&mut self, x: i32, y: i32, argb: u32) -> Result<()> {
        if !self.in_bounds(x, y) {
            return Ok(());
        }
        let buf = self.target.buffer()?;
        buf.put_opcode(Opcode::PutArgb)?;
        buf.put_int(x)?;
        buf.put_int(y)?;
        buf.put_int(argb as i32)
    }

    pub fn set_color(&mut self, x: i32, y: i32, color: Color) -> Result<()> {
        self.set_argb(x, y, color.to_argb())
    }

    /// Write a `w` x `h` block of bytes in `format`.
    ///
    /// Row `r` of the block starts at `offset + r * scan` in `pixels`. The
    /// block is clipped to the surface. If `pixels` is too short for the
    /// clipped region, nothing is written.
    #[allow(clippy::too_many_arguments)]
    pub fn set_pixels(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        format: PixelFormat,
        pixels: &[u8],
        offset: usize,
        scan: usize,
    ) -> Result<()> {
        let Some(block) = clip_block(x, y, w, h, self.bounds()) else {
            return Ok(());
        };
        let bpp = format.bytes_per_pixel();
        if !source_fits(&block, offset, scan, bpp, pixels.len()) {
            tracing::debug!(
                len = pixels.len(),
                width = block.w,
                height = block.h,
                offset,
                scan,
                "pixel source too short, ignoring write"
            );
            return Ok(());
        }
        // in bounds for every row once the last one fits
        let row_start = |row: usize| offset + (block.src_y + row) * scan + block.src_x * bpp;

        let mut packed = Vec::with_capacity(block.w * block.h * 4);
        for row in 0..block.h {
            let start = row_start(row);
            for px in pixels[start..start + block.w * bpp].chunks_exact(bpp) {
                packed.extend_from_slice(&format.to_bgra_pre(px));
            }
        }
        self.write_block(block, packed)
    }

    /// Write a block of straight-alpha ARGB ints
    #[allow(clippy::too_many_arguments)]
    pub fn set_pixels_argb(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        pixels: &[u32],
        offset: usize,
        scan: usize,
    ) -> Result<()> {
        let Some(block) = clip_block(x, y, w, h, self.bounds()) else {
            return Ok(());
        };
        if !source_fits(&block, offset, scan, 1, pixels.len()) {
            tracing::debug!(
                len = pixels.len(),
                offset,
                scan,
                "pixel source too short, ignoring write"
            );
            return Ok(());
        }
        let row_start = |row: usize| offset + (block.src_y + row) * scan + block.src_x;

        let mut packed = Vec::with_capacity(block.w * block.h * 4);
        for row in 0..block.h {
            let start = row_start(row);
            for &argb in &pixels[start..start + block.w] {
                packed.extend_from_slice(&argb_to_bgra_pre(argb));
            }
        }
        self.write_block(block, packed)
    }

    fn write_block(&mut self, block: ClippedBlock, packed: Vec<u8>) -> Result<()> {
        let buf = self.target.buffer()?;
        buf.put_opcode(Opcode::PutArgbPreBuf)?;
        buf.put_int(block.x)?;
        buf.put_int(block.y)?;
        buf.put_int(block.w as i32)?;
        buf.put_int(block.h as i32)?;
        buf.put_object(BufferObject::Pixels(Arc::from(packed)))
    }
}

/// Whether the last source row of `block` ends within `len` elements.
///
/// Any overflow counts as not fitting.
fn source_fits(block: &ClippedBlock, offset: usize, scan: usize, unit: usize, len: usize) -> bool {
    let end = (block.src_y + block.h - 1)
        .checked_mul(scan)
        .and_then(|row| row.checked_add(offset))
        .and_then(|start| start.checked_add(block.src_x.checked_mul(unit)?))
        .and_then(|start| start.checked_add(block.w.checked_mul(unit)?));
    end.is_some_and(|end| end <= len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_block_inside() {
        let block = clip_block(2, 3, 4, 5, (10, 10)).unwrap();
        assert_eq!((block.x, block.y, block.w, block.h), (2, 3, 4, 5));
        assert_eq!((block.src_x, block.src_y), (0, 0));
    }

    #[test]
    fn test_clip_block_negative_origin() {
        let block = clip_block(-2, -1, 5, 4, (10, 10)).unwrap();
        assert_eq!((block.x, block.y, block.w, block.h), (0, 0, 3, 3));
        assert_eq!((block.src_x, block.src_y), (2, 1));
    }

    #[test]
    fn test_clip_block_outside() {
        assert!(clip_block(10, 0, 4, 4, (10, 10)).is_none());
        assert!(clip_block(-5, 0, 5, 4, (10, 10)).is_none());
        assert!(clip_block(0, 0, 0, 4, (10, 10)).is_none());
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(
            PixelFormat::ByteRgb.to_bgra_pre(&[1, 2, 3]),
            [3, 2, 1, 0xff]
        );
        assert_eq!(
            PixelFormat::ByteBgra.to_bgra_pre(&[255, 128, 0, 128]),
            [128, 64, 0, 128]
        );
        assert_eq!(
            PixelFormat::ByteBgraPre.to_bgra_pre(&[9, 8, 7, 6]),
            [9, 8, 7, 6]
        );
    }

    #[test]
    fn test_source_fits_rejects_overflow() {
        let block = clip_block(0, 0, 1, 2, (10, 10)).unwrap();
        assert!(source_fits(&block, 0, 2, 1, 4));
        assert!(!source_fits(&block, 3, 2, 1, 4));
        assert!(!source_fits(&block, usize::MAX - 1, 4, 1, 4));
        assert!(!source_fits(&block, 0, usize::MAX, 4, 4));
    }

    #[test]
    fn test_huge_source_offsets_are_ignored() {
        let mut surface = crate::Surface::new(10.0, 10.0);
        let mut rec = surface.recorder();
        let mut pixels = rec.pixel_writer();
        pixels
            .set_pixels_argb(0, 0, 1, 2, &[0u32; 4], usize::MAX - 1, 4)
            .unwrap();
        pixels
            .set_pixels(0, 0, 2, 2, PixelFormat::ByteRgb, &[0u8; 12], 0, usize::MAX)
            .unwrap();
        assert!(surface.take_buffer().is_none());
    }

    #[test]
    fn test_argb_premultiplies() {
        assert_eq!(argb_to_bgra_pre(0xff10_2030), [0x30, 0x20, 0x10, 0xff]);
        assert_eq!(argb_to_bgra_pre(0x00ff_ffff), [0, 0, 0, 0]);
    }
}
