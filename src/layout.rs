//! # Text Fitting
//!
//! Finds the largest font size at which a label fits its rectangle and computes
//! where to put the pen for the requested vertical alignment.
//!
//! ## Measuring
//!
//! Text is measured with the pen at `(0, 0)` meaning the top-left corner of the
//! ascender line. The measured box therefore starts a few pixels below zero for
//! most fonts (`y_min > 0`), which is what the CENTER and BOTTOM alignments
//! compensate for.
//!
//! ## Search
//!
//! The search walks down from the maximum size one step at a time and stops at
//! the first size that fits. Glyph boxes do not grow strictly monotonically with
//! size for every font, so a bisection could skip the largest fitting size.

use rusttype::{point, Font, PositionedGlyph, Scale};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Largest font size the fitter tries
pub const MAX_FONT_SIZE: u32 = 100;

/// Errors from text layout.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// No font size in `[1, max]` fits the rectangle
    #[error("text {text:?} does not fit in a {width}x{height} rectangle at any size")]
    Overflow { text: String, width: i32, height: i32 },

    /// Alignment name is not one of `top`, `center`, `bottom`
    #[error("invalid vertical alignment {0:?}")]
    InvalidAlignment(String),

    /// Font file could not be read
    #[error("failed to read font {path}: {source}")]
    FontIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Font data is not a usable TrueType/OpenType font
    #[error("invalid font data")]
    InvalidFont,
}

/// A text placement region in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

impl FromStr for VerticalAlign {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(VerticalAlign::Top),
            "center" => Ok(VerticalAlign::Center),
            "bottom" => Ok(VerticalAlign::Bottom),
            other => Err(LayoutError::InvalidAlignment(other.to_string())),
        }
    }
}

/// Ink bounding box of a rendered string, relative to the pen origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBounds {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl TextBounds {
    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }
}

/// A font that can measure and rasterize strings at integer pixel sizes.
pub trait Typeface {
    /// Ink bounds of `text` at `size` with the pen at the ascender origin.
    fn bounds(&self, text: &str, size: u32) -> TextBounds;

    /// Calls `plot(x, y, coverage)` for every inked pixel of `text` drawn with
    /// the pen at `origin`. Coverage is in `0.0..=1.0`.
    fn rasterize(
        &self,
        text: &str,
        size: u32,
        origin: (i32, i32),
        plot: &mut dyn FnMut(i32, i32, f32),
    );
}

/// Result of a successful fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FittedText {
    pub size: u32,
    /// Pen origin for drawing
    pub x: i32,
    pub y: i32,
    /// Measured bounds at `size`
    pub bounds: TextBounds,
}

/// Fit `text` into `rect` at the largest size in `[1, max_size]`.
///
/// Horizontal placement is always centered. Integer divisions round toward
/// negative infinity.
pub fn fit<T: Typeface + ?Sized>(
    face: &T,
    rect: Rectangle,
    text: &str,
    align: VerticalAlign,
    max_size: u32,
) -> Result<FittedText, LayoutError> {
    for size in (1..=max_size).rev() {
        let bounds = face.bounds(text, size);
        let (text_width, text_height) = (bounds.width(), bounds.height());
        if text_width > rect.width || text_height > rect.height {
            continue;
        }

        let x = rect.x + (rect.width - text_width).div_euclid(2);
        let y = match align {
            VerticalAlign::Top => rect.y,
            VerticalAlign::Center => {
                rect.y + (rect.height - text_height).div_euclid(2) - bounds.y_min.div_euclid(2)
            }
            VerticalAlign::Bottom => {
                rect.y + rect.height - text_height - bounds.y_min.div_euclid(2)
            }
        };

        return Ok(FittedText { size, x, y, bounds });
    }

    Err(LayoutError::Overflow {
        text: text.to_string(),
        width: rect.width,
        height: rect.height,
    })
}

/// TrueType/OpenType face backed by `rusttype`.
pub struct TrueTypeFace {
    font: Font<'static>,
}

impl TrueTypeFace {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| LayoutError::FontIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, LayoutError> {
        Font::try_from_vec(data)
            .map(|font| Self { font })
            .ok_or(LayoutError::InvalidFont)
    }

    fn glyphs(&self, text: &str, size: u32, origin: (i32, i32)) -> Vec<PositionedGlyph<'_>> {
        let scale = Scale::uniform(size as f32);
        let ascent = self.font.v_metrics(scale).ascent;
        self.font
            .layout(
                text,
                scale,
                point(origin.0 as f32, origin.1 as f32 + ascent),
            )
            .collect()
    }
}

impl Typeface for TrueTypeFace {
    fn bounds(&self, text: &str, size: u32) -> TextBounds {
        let boxes: Vec<_> = self
            .glyphs(text, size, (0, 0))
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .collect();
        if boxes.is_empty() {
            return TextBounds::default();
        }
        boxes.iter().fold(
            TextBounds {
                x_min: i32::MAX,
                y_min: i32::MAX,
                x_max: i32::MIN,
                y_max: i32::MIN,
            },
            |acc, bb| TextBounds {
                x_min: acc.x_min.min(bb.min.x),
                y_min: acc.y_min.min(bb.min.y),
                x_max: acc.x_max.max(bb.max.x),
                y_max: acc.y_max.max(bb.max.y),
            },
        )
    }

    fn rasterize(
        &self,
        text: &str,
        size: u32,
        origin: (i32, i32),
        plot: &mut dyn FnMut(i32, i32, f32),
    ) {
        for glyph in self.glyphs(text, size, origin) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, coverage| {
                    plot(bb.min.x + gx as i32, bb.min.y + gy as i32, coverage);
                });
            }
        }
    }
}
