use image::{GrayImage, Rgba, RgbaImage};
use rayon::prelude::*;

/// Default canvas edge length in pixels.
pub const DEFAULT_CANVAS_SIZE: u32 = 720;

/// Blank-state color inside the circular boundary.
const BLANK_INK: Rgba<u8> = Rgba([255, 255, 255, 255]);

// ============================================================================
// ALPHA BLENDING
// ============================================================================

/// Standard "over" blend of straight-alpha `src` onto `dst`.
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    if sa <= 0.0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mut out = Rgba([0, 0, 0, (out_a * 255.0).round() as u8]);
    for c in 0..3 {
        let sc = src[c] as f32;
        let dc = dst[c] as f32;
        out[c] = ((sc * sa + dc * da * (1.0 - sa)) / out_a).round().min(255.0) as u8;
    }
    out
}

// ============================================================================
// CANVAS — RGBA buffer with a hard circular clip boundary
// ============================================================================

/// The raster surface: one mutable RGBA buffer plus a circular clip mask.
///
/// The boundary circle is centered on the buffer with radius half the
/// smaller dimension.  Nothing the crate does may write a pixel outside the
/// circle; `blend_pixel` enforces this at the lowest level.  Blank state is
/// opaque white inside the circle and fully transparent outside it.
pub struct Canvas {
    width: u32,
    height: u32,
    center: (f32, f32),
    radius: f32,
    pixels: RgbaImage,
    clip_mask: GrayImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let center = (width as f32 / 2.0, height as f32 / 2.0);
        let radius = width.min(height) as f32 / 2.0;

        let clip_mask = build_clip_mask(width, height, center, radius);
        let pixels = blank_pixels(&clip_mask);

        Self {
            width,
            height,
            center,
            radius,
            pixels,
            clip_mask,
        }
    }

    // ---- geometry -----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn center(&self) -> (f32, f32) {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Geometric containment test for pointer coordinates.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.center.0;
        let dy = y - self.center.1;
        dx * dx + dy * dy <= self.radius * self.radius
    }

    /// Per-pixel clip test via the precomputed mask.
    pub fn is_paintable(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.clip_mask.get_pixel(x, y).0[0] != 0
    }

    // ---- pixel access -------------------------------------------------------

    /// Read accessor for the UI shell to render each frame.
    pub fn buffer(&self) -> &RgbaImage {
        &self.pixels
    }

    /// "Over"-blend `src` onto the pixel at (x, y).  Silently does nothing
    /// outside the buffer or outside the clip circle, so a brush dab that
    /// straddles the boundary lands only its inside portion.
    pub fn blend_pixel(&mut self, x: u32, y: u32, src: Rgba<u8>) {
        if src[3] == 0 || !self.is_paintable(x, y) {
            return;
        }
        let dst = *self.pixels.get_pixel(x, y);
        self.pixels.put_pixel(x, y, blend_over(dst, src));
    }

    /// Reset every pixel to the blank state (white circle, transparent
    /// surroundings).
    pub fn clear(&mut self) {
        self.pixels = blank_pixels(&self.clip_mask);
    }

    /// Replace the whole buffer.  Used by undo; dimensions must match.
    pub(crate) fn replace_buffer(&mut self, pixels: RgbaImage) {
        debug_assert_eq!(pixels.dimensions(), (self.width, self.height));
        self.pixels = pixels;
    }
}

/// Rasterise the boundary circle into a 0/255 mask, tested at pixel centers.
fn build_clip_mask(width: u32, height: u32, center: (f32, f32), radius: f32) -> GrayImage {
    let r_sq = radius * radius;
    let mut data = vec![0u8; (width as usize) * (height as usize)];
    data.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - center.1;
            for (x, m) in row.iter_mut().enumerate() {
                let dx = x as f32 + 0.5 - center.0;
                if dx * dx + dy * dy <= r_sq {
                    *m = 255;
                }
            }
        });
    GrayImage::from_raw(width, height, data).unwrap()
}

/// Blank buffer derived from the clip mask: white inside, transparent out.
fn blank_pixels(clip_mask: &GrayImage) -> RgbaImage {
    let (width, height) = clip_mask.dimensions();
    let mask_raw = clip_mask.as_raw();
    let mut data = vec![0u8; (width as usize) * (height as usize) * 4];
    data.par_chunks_mut(4)
        .enumerate()
        .for_each(|(i, px)| {
            if mask_raw[i] != 0 {
                px.copy_from_slice(&BLANK_INK.0);
            }
        });
    RgbaImage::from_raw(width, height, data).unwrap()
}
