use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageError, RgbImage, RgbaImage};
use rayon::prelude::*;

use crate::error::{PaintError, Result};

/// Fixed JPEG encode quality.
pub const JPEG_QUALITY: u8 = 90;

/// Background the alpha channel is flattened against for formats without
/// transparency.
const FLATTEN_BACKGROUND: f32 = 255.0;

// ============================================================================
// EXPORT FORMAT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Lossless RGBA.
    Png,
    /// Lossy RGB; alpha flattened onto white.
    Jpeg,
}

impl ExportFormat {
    /// Parse a format name ("png", "jpg", "jpeg", any case).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            _ => Err(PaintError::UnsupportedFormat(name.to_string())),
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| PaintError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_name(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }
}

// ============================================================================
// ENCODING
// ============================================================================

/// Encode the canvas buffer to `path`.
///
/// The format is fully resolved before any file is created, so an
/// unsupported format never leaves a partial file behind; write failures
/// surface as `PaintError::Io` and the in-memory buffer is never affected.
pub fn encode_and_write(image: &RgbaImage, path: &Path, format: ExportFormat) -> Result<()> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(|e| encode_error(path, e))?;
        }
        ExportFormat::Jpeg => {
            let rgb_image = flatten_onto_white(image);
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            encoder
                .encode(
                    rgb_image.as_raw(),
                    rgb_image.width(),
                    rgb_image.height(),
                    image::ColorType::Rgb8,
                )
                .map_err(|e| encode_error(path, e))?;
        }
    }

    Ok(())
}

/// Composite the alpha channel onto an opaque white background, yielding
/// the RGB buffer used for JPEG.  Pixels are processed in parallel.
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let src = image.as_raw();

    let mut data = vec![0u8; (width as usize) * (height as usize) * 3];
    data.par_chunks_mut(3)
        .zip(src.par_chunks(4))
        .for_each(|(dst, px)| {
            let a = px[3] as f32 / 255.0;
            for c in 0..3 {
                dst[c] = (px[c] as f32 * a + FLATTEN_BACKGROUND * (1.0 - a)).round() as u8;
            }
        });
    RgbImage::from_raw(width, height, data).unwrap()
}

fn io_error(path: &Path, source: std::io::Error) -> PaintError {
    PaintError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn encode_error(path: &Path, err: ImageError) -> PaintError {
    let source = match err {
        ImageError::IoError(e) => e,
        other => std::io::Error::other(other.to_string()),
    };
    io_error(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    use crate::canvas::Canvas;

    #[test]
    fn format_parsing() {
        assert_eq!(ExportFormat::from_name("png").unwrap(), ExportFormat::Png);
        assert_eq!(ExportFormat::from_name("PNG").unwrap(), ExportFormat::Png);
        assert_eq!(ExportFormat::from_name("jpg").unwrap(), ExportFormat::Jpeg);
        assert_eq!(ExportFormat::from_name("jpeg").unwrap(), ExportFormat::Jpeg);
        assert!(matches!(
            ExportFormat::from_name("webp"),
            Err(PaintError::UnsupportedFormat(_))
        ));

        assert_eq!(
            ExportFormat::from_path(Path::new("out/painting.png")).unwrap(),
            ExportFormat::Png
        );
        assert!(ExportFormat::from_path(Path::new("painting")).is_err());
        assert!(ExportFormat::from_path(Path::new("painting.gif")).is_err());
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let mut canvas = Canvas::new(64, 64);
        canvas.blend_pixel(32, 32, Rgba([12, 34, 56, 200]));

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        encode_and_write(canvas.buffer(), &path, ExportFormat::Png).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(reloaded.as_raw(), canvas.buffer().as_raw());
    }

    #[test]
    fn jpeg_flattens_alpha_onto_white() {
        let canvas = Canvas::new(64, 64);

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        encode_and_write(canvas.buffer(), &path, ExportFormat::Jpeg).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (64, 64));
        // Transparent corner and white disc both come back ≈ white.
        for px in [*reloaded.get_pixel(0, 0), *reloaded.get_pixel(32, 32)] {
            for c in 0..3 {
                assert!(px[c] > 245, "channel {c} = {}", px[c]);
            }
        }
    }

    #[test]
    fn jpeg_round_trip_stays_within_lossy_tolerance() {
        let mut canvas = Canvas::new(64, 64);
        for y in 20..44 {
            for x in 20..44 {
                canvas.blend_pixel(x, y, Rgba([40, 80, 120, 255]));
            }
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        encode_and_write(canvas.buffer(), &path, ExportFormat::Jpeg).unwrap();

        let reloaded = image::open(&path).unwrap().to_rgb8();
        let px = reloaded.get_pixel(32, 32);
        for (c, want) in [40i32, 80, 120].iter().enumerate() {
            assert!(
                (px[c] as i32 - want).abs() <= 16,
                "channel {c}: {} vs {want}",
                px[c]
            );
        }
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let canvas = Canvas::new(16, 16);
        let err = encode_and_write(
            canvas.buffer(),
            Path::new("/nonexistent-dir/out.png"),
            ExportFormat::Png,
        )
        .unwrap_err();
        assert!(matches!(err, PaintError::Io { .. }));
    }

    #[test]
    fn flatten_blends_partial_alpha() {
        let image = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 128]));
        let flat = flatten_onto_white(&image);
        // ~50% black over white → mid grey.
        assert!((flat.get_pixel(0, 0)[0] as i32 - 127).abs() <= 1);
    }
}
