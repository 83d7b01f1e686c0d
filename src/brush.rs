use std::collections::HashMap;
use std::ops::RangeInclusive;

use image::{GrayImage, Rgba, RgbaImage, imageops};

use crate::error::{PaintError, Result};
use crate::log_warn;

/// Brush radius range accepted from the UI shell, in pixels.
pub const SIZE_RANGE: RangeInclusive<u32> = 1..=100;
/// Opacity range accepted from the UI shell, in percent.
pub const OPACITY_RANGE: RangeInclusive<u8> = 1..=100;
/// Smoothing (interpolation density) range accepted from the UI shell.
pub const SMOOTHING_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Image-tip stamp spacing range, as a fraction of the tip diameter.
pub const SPACING_RANGE: RangeInclusive<f32> = 0.01..=2.0;

/// Fraction of the stamp radius that stays fully opaque before the soft
/// edge starts falling off.
const EDGE_HARDNESS: f32 = 0.75;

/// Fixed brightness multiplier applied to the grain layer so the pencil
/// texture stays visible at low opacity.
const GRAIN_BOOST: f32 = 1.3;

// ============================================================================
// BRUSH TIP + CONFIG
// ============================================================================

/// Identifies a brush tip — either the built-in procedural pencil texture
/// or a named image tip from the brush library.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum BrushTip {
    /// Default textured pencil — soft circular mask over per-stamp grain.
    #[default]
    Textured,
    /// Image-based tip, identified by its library name.
    Image(String),
}

impl BrushTip {
    pub fn is_textured(&self) -> bool {
        matches!(self, BrushTip::Textured)
    }

    pub fn display_name(&self) -> &str {
        match self {
            BrushTip::Textured => "Pencil",
            BrushTip::Image(name) => name.as_str(),
        }
    }
}

/// Tool configuration captured per stroke.
///
/// The stroke compositor takes an immutable copy of this at pointer-down, so
/// mid-stroke parameter changes only affect the next stroke.
#[derive(Clone, Debug)]
pub struct BrushConfig {
    /// Stamp radius in pixels (the stamp image has side `2 * size`).
    pub size: u32,
    /// Opacity percentage, 1–100.
    pub opacity: u8,
    /// Interpolation density, 0.0 (raw points only) to 1.0 (densest).
    pub smoothing: f32,
    /// Draw color; the alpha channel is ignored (stamps compute their own).
    pub color: Rgba<u8>,
    pub tip: BrushTip,
    /// Image-tip stamp spacing as a fraction of the tip diameter.
    pub spacing: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            size: 22,
            opacity: 100,
            smoothing: 0.28,
            color: Rgba([0x22, 0x22, 0x22, 255]),
            tip: BrushTip::Textured,
            spacing: 0.25,
        }
    }
}

impl BrushConfig {
    /// Distance in pixels between interpolated stamps along a stroke
    /// segment, or `None` when only raw pointer points should be stamped.
    ///
    /// For the textured tip the spacing shrinks as smoothing rises and never
    /// exceeds one stamp radius; image tips use their own spacing fraction.
    pub fn stamp_spacing(&self) -> Option<f32> {
        match self.tip {
            BrushTip::Textured => {
                if self.smoothing <= 0.0 {
                    None
                } else {
                    Some((self.size as f32 * (1.0 - self.smoothing)).max(1.0))
                }
            }
            BrushTip::Image(_) => Some((self.size as f32 * 2.0 * self.spacing).max(1.0)),
        }
    }
}

// ============================================================================
// STAMP GENERATOR
// ============================================================================

/// Renders one brush dab at a time.
///
/// Grain noise is drawn fresh for every stamp from a positional hash of
/// (seed, stamp counter, pixel), so consecutive stamps are never spatially
/// correlated yet the whole sequence is reproducible from the seed.
pub struct StampGenerator {
    seed: u64,
    stamp_counter: u32,
    /// Soft-edge mask for the current textured-tip size.
    mask_cache: Option<(u32, Vec<u8>)>,
    /// Resized alpha masks for image tips, keyed by (tip name, size).
    tip_mask_cache: HashMap<(String, u32), GrayImage>,
}

impl Default for StampGenerator {
    fn default() -> Self {
        Self::with_seed(0x00C0_FFEE)
    }
}

impl StampGenerator {
    /// A generator with an explicit noise seed, for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            stamp_counter: 0,
            mask_cache: None,
            tip_mask_cache: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Render the next dab for `config`.
    ///
    /// `tip_image` is the resolved library image when `config.tip` is an
    /// image tip; if the image is missing the generator falls back to the
    /// textured pencil rather than dropping the stamp.
    pub fn generate(
        &mut self,
        config: &BrushConfig,
        tip_image: Option<(&str, &RgbaImage)>,
    ) -> Result<RgbaImage> {
        if config.size == 0 {
            return Err(PaintError::bad_param("size", config.size, "1..=100"));
        }
        match (&config.tip, tip_image) {
            (BrushTip::Image(_), Some((name, src))) => Ok(self.image_stamp(name, src, config)),
            (BrushTip::Image(name), None) => {
                log_warn!("brush tip '{}' has no image, using pencil texture", name);
                Ok(self.textured_stamp(config))
            }
            (BrushTip::Textured, _) => Ok(self.textured_stamp(config)),
        }
    }

    // ---- textured pencil tip ------------------------------------------------

    fn textured_stamp(&mut self, config: &BrushConfig) -> RgbaImage {
        let size = config.size;
        let side = size * 2;
        self.stamp_counter = self.stamp_counter.wrapping_add(1);

        let seed = self.seed;
        let counter = self.stamp_counter;
        let opacity = config.opacity.min(100) as f32 / 100.0;
        let Rgba([r, g, b, _]) = config.color;
        let mask = self.soft_mask(size);

        let mut stamp = RgbaImage::new(side, side);
        for (x, y, px) in stamp.enumerate_pixels_mut() {
            let geom = mask[(y * side + x) as usize];
            if geom == 0 {
                continue;
            }
            let grain = ((grain_hash(seed, counter, x, y) & 0xFF) as f32 * GRAIN_BOOST)
                .min(255.0);
            let alpha = geom as f32 / 255.0 * grain / 255.0 * opacity;
            *px = Rgba([r, g, b, (alpha * 255.0).round() as u8]);
        }
        stamp
    }

    /// Soft-edge mask for the given radius, rebuilt only when the size
    /// changes.
    fn soft_mask(&mut self, size: u32) -> &[u8] {
        if self.mask_cache.as_ref().map(|(s, _)| *s) != Some(size) {
            self.mask_cache = Some((size, build_soft_mask(size)));
        }
        &self.mask_cache.as_ref().unwrap().1
    }

    // ---- image tips ---------------------------------------------------------

    fn image_stamp(&mut self, name: &str, src: &RgbaImage, config: &BrushConfig) -> RgbaImage {
        self.stamp_counter = self.stamp_counter.wrapping_add(1);

        let opacity = config.opacity.min(100) as f32 / 100.0;
        let Rgba([r, g, b, _]) = config.color;
        let mask = self.tip_mask(name, src, config.size);

        let mut stamp = RgbaImage::new(mask.width(), mask.height());
        for (x, y, px) in stamp.enumerate_pixels_mut() {
            let a = mask.get_pixel(x, y).0[0] as f32 / 255.0 * opacity;
            if a > 0.0 {
                *px = Rgba([r, g, b, (a * 255.0).round() as u8]);
            }
        }
        stamp
    }

    /// Resized alpha mask for an image tip: longest edge scaled to
    /// `2 * size` (aspect preserved, bicubic), alpha taken from the source
    /// alpha channel, or from inverted luminance when the source is fully
    /// opaque (dark marks paint, light paper does not).
    fn tip_mask(&mut self, name: &str, src: &RgbaImage, size: u32) -> GrayImage {
        let key = (name.to_string(), size);
        if let Some(cached) = self.tip_mask_cache.get(&key) {
            return cached.clone();
        }

        let edge = size * 2;
        let (sw, sh) = src.dimensions();
        let (nw, nh) = if sw >= sh {
            (edge, ((sh as u64 * edge as u64) / sw as u64).max(1) as u32)
        } else {
            (((sw as u64 * edge as u64) / sh as u64).max(1) as u32, edge)
        };
        let resized = imageops::resize(src, nw, nh, imageops::FilterType::CatmullRom);

        let opaque = resized.pixels().all(|p| p[3] == 255);
        let mut mask = GrayImage::new(nw, nh);
        for (x, y, m) in mask.enumerate_pixels_mut() {
            let p = resized.get_pixel(x, y);
            m.0[0] = if opaque {
                255 - luminance(*p)
            } else {
                p[3]
            };
        }

        self.tip_mask_cache.insert(key, mask.clone());
        mask
    }
}

/// Radial soft-edge mask for a textured stamp of radius `size`: fully
/// opaque inside `size * EDGE_HARDNESS`, smoothstep falloff to 0 at `size`.
fn build_soft_mask(size: u32) -> Vec<u8> {
    let side = size * 2;
    let radius = size as f32;
    let center = size as f32 - 0.5;
    let fade = (radius * (1.0 - EDGE_HARDNESS)).max(1.0);
    let solid = radius - fade;

    let mut mask = vec![0u8; (side * side) as usize];
    for y in 0..side {
        let dy = y as f32 - center;
        for x in 0..side {
            let dx = x as f32 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            let a = if dist <= solid {
                1.0
            } else if dist >= radius {
                0.0
            } else {
                // Smoothstep, inverted so the inner edge is opaque.
                let t = 1.0 - (dist - solid) / fade;
                t * t * (3.0 - 2.0 * t)
            };
            mask[(y * side + x) as usize] = (a * 255.0).round() as u8;
        }
    }
    mask
}

/// Positional hash driving the grain layer.  Deterministic in
/// (seed, counter, x, y); consecutive counters give uncorrelated noise.
fn grain_hash(seed: u64, counter: u32, x: u32, y: u32) -> u32 {
    let mut h = x
        .wrapping_mul(374761393)
        .wrapping_add(y.wrapping_mul(668265263))
        .wrapping_add(counter.wrapping_mul(1013904223))
        .wrapping_add((seed as u32) ^ ((seed >> 32) as u32));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

/// Rec. 601 luma, as used for greyscale conversion throughout the crate.
fn luminance(p: Rgba<u8>) -> u8 {
    (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: u32, opacity: u8) -> BrushConfig {
        BrushConfig {
            size,
            opacity,
            color: Rgba([0, 0, 0, 255]),
            ..BrushConfig::default()
        }
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut generator = StampGenerator::default();
        assert!(matches!(
            generator.generate(&config(0, 100), None),
            Err(PaintError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn stamp_alpha_is_zero_outside_radius_and_positive_inside() {
        let mut generator = StampGenerator::default();
        for size in [1u32, 5, 20, 100] {
            let stamp = generator.generate(&config(size, 100), None).unwrap();
            assert_eq!(stamp.dimensions(), (size * 2, size * 2));

            let center = size as f32 - 0.5;
            let mut inside_hit = false;
            for (x, y, px) in stamp.enumerate_pixels() {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist >= size as f32 {
                    assert_eq!(px[3], 0, "alpha at dist {dist} for size {size}");
                } else if px[3] > 0 {
                    inside_hit = true;
                }
            }
            assert!(inside_hit, "no opaque pixel inside radius for size {size}");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = StampGenerator::with_seed(42);
        let mut b = StampGenerator::with_seed(42);
        let cfg = config(10, 80);
        for _ in 0..3 {
            let sa = a.generate(&cfg, None).unwrap();
            let sb = b.generate(&cfg, None).unwrap();
            assert_eq!(sa.as_raw(), sb.as_raw());
        }
    }

    #[test]
    fn consecutive_stamps_redraw_fresh_grain() {
        let mut generator = StampGenerator::with_seed(42);
        let cfg = config(10, 100);
        let first = generator.generate(&cfg, None).unwrap();
        let second = generator.generate(&cfg, None).unwrap();
        assert_ne!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn opacity_scales_stamp_alpha() {
        // Separate generators so both stamps share the same grain.
        let full = StampGenerator::with_seed(7)
            .generate(&config(10, 100), None)
            .unwrap();
        let half = StampGenerator::with_seed(7)
            .generate(&config(10, 50), None)
            .unwrap();
        for (a, b) in full.pixels().zip(half.pixels()) {
            assert!((b[3] as f32 - a[3] as f32 * 0.5).abs() <= 1.0);
        }
    }

    #[test]
    fn stamp_color_matches_config() {
        let mut generator = StampGenerator::default();
        let cfg = BrushConfig {
            color: Rgba([10, 200, 30, 255]),
            ..config(8, 100)
        };
        let stamp = generator.generate(&cfg, None).unwrap();
        let painted = stamp.pixels().find(|p| p[3] > 0).unwrap();
        assert_eq!([painted[0], painted[1], painted[2]], [10, 200, 30]);
    }

    #[test]
    fn image_tip_scales_longest_edge_to_diameter() {
        let mut generator = StampGenerator::default();
        let src = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 200]));
        let cfg = BrushConfig {
            tip: BrushTip::Image("chalk".into()),
            ..config(15, 100)
        };
        let stamp = generator.generate(&cfg, Some(("chalk", &src))).unwrap();
        assert_eq!(stamp.dimensions(), (30, 15));
    }

    #[test]
    fn opaque_image_tip_paints_its_dark_marks() {
        let mut generator = StampGenerator::default();
        // Fully opaque source: black left half (ink), white right half (paper).
        let src = RgbaImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let cfg = BrushConfig {
            tip: BrushTip::Image("ink".into()),
            ..config(10, 100)
        };
        let stamp = generator.generate(&cfg, Some(("ink", &src))).unwrap();
        assert!(stamp.get_pixel(2, 10)[3] > 200);
        assert!(stamp.get_pixel(17, 10)[3] < 8);
    }

    #[test]
    fn missing_tip_image_falls_back_to_pencil() {
        let mut generator = StampGenerator::default();
        let cfg = BrushConfig {
            tip: BrushTip::Image("gone".into()),
            ..config(6, 100)
        };
        let stamp = generator.generate(&cfg, None).unwrap();
        assert_eq!(stamp.dimensions(), (12, 12));
        assert!(stamp.pixels().any(|p| p[3] > 0));
    }

    #[test]
    fn spacing_tracks_smoothing() {
        let mut cfg = config(20, 100);
        cfg.smoothing = 0.0;
        assert_eq!(cfg.stamp_spacing(), None);
        cfg.smoothing = 0.5;
        assert_eq!(cfg.stamp_spacing(), Some(10.0));
        cfg.smoothing = 1.0;
        assert_eq!(cfg.stamp_spacing(), Some(1.0));
    }
}
