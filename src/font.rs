//! Font registration for raster output.
//!
//! The bitmap backend draws text through ab_glyph, which only knows fonts that
//! were registered with plotters. One TrueType font is loaded per process and
//! registered as the `sans-serif` family used by every chart.

use crate::error::{PlotError, Result};
use plotters::style::{register_font, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

static REGISTERED: OnceLock<PathBuf> = OnceLock::new();

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Register `font_path`, or the first system font found, as `sans-serif`.
pub fn ensure_font(font_path: Option<&Path>) -> Result<()> {
    if REGISTERED.get().is_some() {
        return Ok(());
    }

    let candidates: Vec<PathBuf> = match font_path {
        Some(path) => vec![path.to_path_buf()],
        None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
    };

    for path in candidates {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if font_path.is_some() => return Err(PlotError::io(&path, e)),
            Err(_) => continue,
        };
        // plotters keeps a reference for the life of the process
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        register_font("sans-serif", FontStyle::Normal, bytes).map_err(|_| {
            PlotError::Config(format!("{}: not a usable TrueType font", path.display()))
        })?;
        debug!(font = %path.display(), "registered chart font");
        let _ = REGISTERED.set(path);
        return Ok(());
    }

    Err(no_font_error())
}

/// Text is measured through ab_glyph for SVG output too, so switching formats
/// does not help here.
fn no_font_error() -> PlotError {
    PlotError::Config(
        "no TrueType font found for chart text; pass --font <file.ttf> or set font_path \
         in the configuration (a build without the `png` feature needs no font)"
            .to_string(),
    )
}
