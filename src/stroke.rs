use image::RgbaImage;

use crate::assets::BrushLibrary;
use crate::brush::{BrushConfig, BrushTip, StampGenerator};
use crate::canvas::Canvas;
use crate::error::Result;

/// Segments shorter than this are treated as a single point.
const MIN_SEGMENT_LEN: f32 = 0.1;

/// Live state of the stroke in progress.
///
/// The brush configuration is copied in at pointer-down, so parameter
/// changes made mid-stroke only affect the next stroke.
pub struct StrokeState {
    last: (f32, f32),
    config: BrushConfig,
}

impl StrokeState {
    pub fn new(start: (f32, f32), config: BrushConfig) -> Self {
        Self {
            last: start,
            config,
        }
    }

    pub fn last(&self) -> (f32, f32) {
        self.last
    }

    pub fn advance_to(&mut self, point: (f32, f32)) {
        self.last = point;
    }

    pub fn config(&self) -> &BrushConfig {
        &self.config
    }
}

/// Resolve the library image for an image tip; `None` for the textured tip
/// (or when the named tip was never registered — the generator falls back).
pub(crate) fn tip_image<'a>(
    library: &'a BrushLibrary,
    config: &'a BrushConfig,
) -> Option<(&'a str, &'a RgbaImage)> {
    match &config.tip {
        BrushTip::Textured => None,
        BrushTip::Image(name) => library.get(name).map(|img| (name.as_str(), img)),
    }
}

/// Generate one dab and composite it centered at `(x, y)`.
pub(crate) fn paint_point(
    canvas: &mut Canvas,
    generator: &mut StampGenerator,
    library: &BrushLibrary,
    config: &BrushConfig,
    x: f32,
    y: f32,
) -> Result<()> {
    let stamp = generator.generate(config, tip_image(library, config))?;
    apply_stamp(canvas, &stamp, x, y);
    Ok(())
}

/// Interpolate from `from` (already stamped) to `to`, stamping each
/// intermediate point that lies inside the clip circle.
///
/// Interpolation density follows the stroke config: no interpolation at
/// smoothing 0, otherwise stamps spaced at most one stamp radius apart.
pub(crate) fn paint_segment(
    canvas: &mut Canvas,
    generator: &mut StampGenerator,
    library: &BrushLibrary,
    config: &BrushConfig,
    from: (f32, f32),
    to: (f32, f32),
) -> Result<()> {
    let (x0, y0) = from;
    let (x1, y1) = to;
    let dx = x1 - x0;
    let dy = y1 - y0;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < MIN_SEGMENT_LEN {
        return paint_point(canvas, generator, library, config, x1, y1);
    }

    let Some(step) = config.stamp_spacing() else {
        // Raw points only.
        return paint_point(canvas, generator, library, config, x1, y1);
    };

    let steps = (distance / step).ceil().max(1.0) as usize;
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        let x = x0 + dx * t;
        let y = y0 + dy * t;
        if canvas.contains(x, y) {
            paint_point(canvas, generator, library, config, x, y)?;
        }
    }
    Ok(())
}

/// "Over"-blend a stamp image centered at `(x, y)`.  Every pixel goes
/// through the canvas clip, so a dab straddling the boundary lands only its
/// inside portion.
pub(crate) fn apply_stamp(canvas: &mut Canvas, stamp: &RgbaImage, x: f32, y: f32) {
    let (w, h) = stamp.dimensions();
    let left = (x - w as f32 / 2.0).round() as i64;
    let top = (y - h as f32 / 2.0).round() as i64;

    for (sx, sy, px) in stamp.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        let cx = left + sx as i64;
        let cy = top + sy as i64;
        if cx < 0 || cy < 0 {
            continue;
        }
        canvas.blend_pixel(cx as u32, cy as u32, *px);
    }
}
