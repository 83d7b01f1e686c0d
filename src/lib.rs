//! fullcircle — core of a circular-canvas painting application.
//!
//! The crate owns everything below the window: an RGBA canvas with a hard
//! circular clip boundary, a textured pencil brush (plus registerable image
//! tips), stroke compositing, a bounded snapshot undo stack, and PNG/JPEG
//! export.  A UI shell translates its raw input-device events into the
//! [`Painter`] pointer/parameter calls and renders [`Painter::buffer`] each
//! frame; window construction, dialogs and frame pacing live entirely in
//! the shell.

pub mod assets;
pub mod brush;
pub mod canvas;
pub mod error;
pub mod history;
pub mod io;
pub mod logger;
pub mod painter;
pub mod stroke;

pub use assets::BrushLibrary;
pub use brush::{BrushConfig, BrushTip, StampGenerator};
pub use canvas::{Canvas, DEFAULT_CANVAS_SIZE};
pub use error::{PaintError, Result};
pub use history::{History, MAX_UNDO_DEPTH, Snapshot};
pub use io::ExportFormat;
pub use painter::{BUILTIN_BRUSH, Painter};
