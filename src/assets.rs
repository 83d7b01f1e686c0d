use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;

use crate::error::{PaintError, Result};
use crate::log_warn;

/// Image-tip files shipped with the application, name → path relative to the
/// asset directory.  Currently empty: the only built-in brush is the
/// procedural pencil texture.  This table is the extension point for named
/// tip assets.
pub const BUILTIN_BRUSH_FILES: &[(&str, &str)] = &[];

/// The name → image mapping behind `BrushTip::Image`.
///
/// Tips are registered at runtime, either from decoded files or from
/// in-memory buffers handed over by the UI shell's file dialog.
#[derive(Default)]
pub struct BrushLibrary {
    tips: HashMap<String, RgbaImage>,
}

impl BrushLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every entry of `BUILTIN_BRUSH_FILES` relative to `asset_dir`.
    /// A tip that fails to decode is skipped with a warning; the rest of the
    /// library still loads.
    pub fn load_builtin(&mut self, asset_dir: &Path) {
        for (name, relpath) in BUILTIN_BRUSH_FILES {
            let path = asset_dir.join(relpath);
            if let Err(e) = self.register_from_path(name, &path) {
                log_warn!("built-in brush '{}' failed to load: {}", name, e);
            }
        }
    }

    /// Decode an image file and register it under `name`, replacing any
    /// previous tip of that name.
    pub fn register_from_path(&mut self, name: &str, path: &Path) -> Result<()> {
        let image = image::open(path)
            .map_err(|e| PaintError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .to_rgba8();
        self.register(name, image);
        Ok(())
    }

    /// Register an already-decoded tip image under `name`.
    pub fn register(&mut self, name: &str, image: RgbaImage) {
        self.tips.insert(name.to_string(), image);
    }

    pub fn get(&self, name: &str) -> Option<&RgbaImage> {
        self.tips.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tips.contains_key(name)
    }

    /// Registered tip names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tips.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::tempdir;

    #[test]
    fn register_and_get() {
        let mut library = BrushLibrary::new();
        assert!(library.get("chalk").is_none());

        library.register("chalk", RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 4])));
        assert!(library.contains("chalk"));
        assert_eq!(library.get("chalk").unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn register_from_path_decodes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tip.png");
        RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let mut library = BrushLibrary::new();
        library.register_from_path("tip", &path).unwrap();
        assert_eq!(library.get("tip").unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let mut library = BrushLibrary::new();
        let err = library
            .register_from_path("ghost", Path::new("/nonexistent/tip.png"))
            .unwrap_err();
        assert!(matches!(err, PaintError::Decode { .. }));
        assert!(!library.contains("ghost"));
    }
}
