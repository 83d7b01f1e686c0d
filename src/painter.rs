use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::assets::BrushLibrary;
use crate::brush::{
    BrushConfig, BrushTip, OPACITY_RANGE, SIZE_RANGE, SMOOTHING_RANGE, SPACING_RANGE,
    StampGenerator,
};
use crate::canvas::{Canvas, DEFAULT_CANVAS_SIZE};
use crate::error::{PaintError, Result};
use crate::history::{History, Snapshot};
use crate::io::{self, ExportFormat};
use crate::log_info;
use crate::stroke::{self, StrokeState};

/// Name of the built-in procedural pencil brush.
pub const BUILTIN_BRUSH: &str = "pencil";

// ============================================================================
// PAINTER — the façade the UI shell drives
// ============================================================================

/// Owns the canvas, history, brush state and live stroke, and exposes the
/// operations the UI shell maps its raw input events onto.
///
/// Everything here runs synchronously on the caller's thread; the shell is
/// responsible for event translation and frame pacing.
pub struct Painter {
    canvas: Canvas,
    history: History,
    generator: StampGenerator,
    library: BrushLibrary,
    config: BrushConfig,
    active: Option<StrokeState>,
}

impl Default for Painter {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE, DEFAULT_CANVAS_SIZE)
    }
}

impl Painter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Canvas::new(width, height),
            history: History::default(),
            generator: StampGenerator::default(),
            library: BrushLibrary::new(),
            config: BrushConfig::default(),
            active: None,
        }
    }

    /// A painter with an explicit grain seed, for reproducible strokes.
    pub fn with_seed(width: u32, height: u32, seed: u64) -> Self {
        Self {
            generator: StampGenerator::with_seed(seed),
            ..Self::new(width, height)
        }
    }

    // ---- accessors ----------------------------------------------------------

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// The buffer the UI shell renders each frame.
    pub fn buffer(&self) -> &RgbaImage {
        self.canvas.buffer()
    }

    pub fn config(&self) -> &BrushConfig {
        &self.config
    }

    pub fn library(&self) -> &BrushLibrary {
        &self.library
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    // ---- pointer events -----------------------------------------------------

    /// Begin a stroke.  A press outside the buffer or outside the circular
    /// boundary never starts one.  Pushes exactly one history snapshot and
    /// applies the first stamp.
    pub fn on_pointer_down(&mut self, x: f32, y: f32) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }
        if !self.in_buffer(x, y) || !self.canvas.contains(x, y) {
            return Ok(());
        }

        // Generate before snapshotting so a rejected stamp leaves no trace.
        let stamp = self
            .generator
            .generate(&self.config, stroke::tip_image(&self.library, &self.config))?;
        self.history.push(Snapshot::capture(&self.canvas));
        stroke::apply_stamp(&mut self.canvas, &stamp, x, y);
        self.active = Some(StrokeState::new((x, y), self.config.clone()));
        Ok(())
    }

    /// Continue the active stroke.  Raw points are clamped to the buffer;
    /// points outside the circle are discarded silently (the stroke resumes
    /// from its last accepted point when the pointer re-enters).
    pub fn on_pointer_move(&mut self, x: f32, y: f32) -> Result<()> {
        let Some(active) = &self.active else {
            return Ok(());
        };
        let x = x.clamp(0.0, (self.canvas.width() - 1) as f32);
        let y = y.clamp(0.0, (self.canvas.height() - 1) as f32);
        if !self.canvas.contains(x, y) {
            return Ok(());
        }

        let from = active.last();
        let config = active.config().clone();
        stroke::paint_segment(
            &mut self.canvas,
            &mut self.generator,
            &self.library,
            &config,
            from,
            (x, y),
        )?;
        if let Some(active) = &mut self.active {
            active.advance_to((x, y));
        }
        Ok(())
    }

    /// End the active stroke.  No further stamps are applied.
    pub fn on_pointer_up(&mut self) {
        self.active = None;
    }

    // ---- parameters ---------------------------------------------------------
    // Out-of-range values are rejected and the prior value is kept.

    pub fn set_brush_size(&mut self, size: u32) -> Result<()> {
        if !SIZE_RANGE.contains(&size) {
            return Err(PaintError::bad_param("size", size, "1..=100"));
        }
        self.config.size = size;
        Ok(())
    }

    pub fn set_opacity(&mut self, opacity: u8) -> Result<()> {
        if !OPACITY_RANGE.contains(&opacity) {
            return Err(PaintError::bad_param("opacity", opacity, "1..=100"));
        }
        self.config.opacity = opacity;
        Ok(())
    }

    pub fn set_smoothing(&mut self, smoothing: f32) -> Result<()> {
        if !smoothing.is_finite() || !SMOOTHING_RANGE.contains(&smoothing) {
            return Err(PaintError::bad_param("smoothing", smoothing, "0.0..=1.0"));
        }
        self.config.smoothing = smoothing;
        Ok(())
    }

    /// Image-tip stamp spacing as a fraction of the tip diameter.
    pub fn set_spacing(&mut self, spacing: f32) -> Result<()> {
        if !spacing.is_finite() || !SPACING_RANGE.contains(&spacing) {
            return Err(PaintError::bad_param("spacing", spacing, "0.01..=2.0"));
        }
        self.config.spacing = spacing;
        Ok(())
    }

    /// The alpha channel of `color` is ignored; opacity is a separate
    /// parameter.
    pub fn set_color(&mut self, color: Rgba<u8>) {
        self.config.color = color;
    }

    /// Select the active brush: `"pencil"` for the built-in textured tip,
    /// or the name of a registered image tip.
    pub fn set_brush(&mut self, name: &str) -> Result<()> {
        if name == BUILTIN_BRUSH {
            self.config.tip = BrushTip::Textured;
        } else if self.library.contains(name) {
            self.config.tip = BrushTip::Image(name.to_string());
        } else {
            return Err(PaintError::bad_param(
                "brush",
                name,
                "\"pencil\" or a registered tip name",
            ));
        }
        Ok(())
    }

    /// Register an image tip from a file so `set_brush` can select it.
    pub fn register_brush(&mut self, name: &str, path: &Path) -> Result<()> {
        self.library.register_from_path(name, path)
    }

    /// Register an already-decoded image tip.
    pub fn register_brush_image(&mut self, name: &str, image: RgbaImage) {
        self.library.register(name, image);
    }

    // ---- commands -----------------------------------------------------------

    /// Roll back the most recent stroke.  Returns `false` (no-op) when the
    /// history is empty.  Ends any stroke in progress.
    pub fn undo(&mut self) -> bool {
        self.active = None;
        self.history.undo(&mut self.canvas)
    }

    /// Reset the canvas to its blank state and drop all history.
    pub fn clear(&mut self) {
        self.active = None;
        self.canvas.clear();
        self.history.clear();
        log_info!("canvas cleared");
    }

    /// Encode the current buffer to `path`.  The canvas itself is never
    /// affected, even on failure.
    pub fn save(&self, path: &Path, format: ExportFormat) -> Result<()> {
        io::encode_and_write(self.canvas.buffer(), path, format)?;
        log_info!("saved {} ({})", path.display(), format.extension());
        Ok(())
    }

    fn in_buffer(&self, x: f32, y: f32) -> bool {
        x >= 0.0
            && y >= 0.0
            && x < self.canvas.width() as f32
            && y < self.canvas.height() as f32
    }
}
