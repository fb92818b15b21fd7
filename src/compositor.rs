//! # Canvas Compositing
//!
//! Pixel-level building blocks for a frame: a panel-sized RGBA canvas, alpha
//! compositing of overlays, recoloring of single-tint artwork, text drawing,
//! and the final conversion to a palette-indexed raster.

use crate::layout::{
    fit, FittedText, LayoutError, Rectangle, Typeface, VerticalAlign, MAX_FONT_SIZE,
};
use crate::palette::{ColorMode, Palette};
use crate::{PANEL_HEIGHT, PANEL_WIDTH};
use image::{imageops, Pixel, Rgba, RgbaImage};

/// A panel-sized RGBA working surface
pub type Canvas = RgbaImage;

/// New panel-sized canvas filled with white (light mode) or black (dark mode).
pub fn create_background(mode: ColorMode) -> Canvas {
    RgbaImage::from_pixel(PANEL_WIDTH, PANEL_HEIGHT, mode.background())
}

/// Replace the RGB of every non-transparent pixel with `color`, keeping each
/// pixel's own alpha. Fully transparent pixels are left as they are.
pub fn recolor(mut image: RgbaImage, color: Rgba<u8>) -> RgbaImage {
    for pixel in image.pixels_mut() {
        if pixel[3] != 0 {
            *pixel = Rgba([color[0], color[1], color[2], pixel[3]]);
        }
    }
    image
}

/// Alpha-composite `overlay` onto `base` with its top-left corner at `position`.
///
/// The overlay's own alpha is the blend mask. Parts falling outside `base` are
/// clipped.
pub fn merge(mut base: RgbaImage, overlay: &RgbaImage, position: (i64, i64)) -> RgbaImage {
    imageops::overlay(&mut base, overlay, position.0, position.1);
    base
}

/// Draw `text` at a previously fitted position.
pub fn draw_text<T: Typeface + ?Sized>(
    canvas: &mut Canvas,
    face: &T,
    text: &str,
    fitted: &FittedText,
    color: Rgba<u8>,
) {
    let (width, height) = canvas.dimensions();
    face.rasterize(text, fitted.size, (fitted.x, fitted.y), &mut |x, y, coverage| {
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            return;
        }
        let alpha = (coverage.clamp(0.0, 1.0) * f32::from(color[3])).round() as u8;
        if alpha == 0 {
            return;
        }
        canvas
            .get_pixel_mut(x as u32, y as u32)
            .blend(&Rgba([color[0], color[1], color[2], alpha]));
    });
}

/// Fit `text` into `rect` and draw it.
pub fn place_text_in_rectangle<T: Typeface + ?Sized>(
    canvas: &mut Canvas,
    face: &T,
    rect: Rectangle,
    text: &str,
    color: Rgba<u8>,
    align: VerticalAlign,
) -> Result<FittedText, LayoutError> {
    let fitted = fit(face, rect, text, align, MAX_FONT_SIZE)?;
    draw_text(canvas, face, text, &fitted, color);
    Ok(fitted)
}

/// A palette-indexed raster, the format handed to display sinks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedImage {
    width: u32,
    height: u32,
    indices: Vec<u8>,
    palette: Palette,
}

impl IndexedImage {
    /// Build from row-major palette indices.
    ///
    /// Returns `None` when the index count does not match the dimensions.
    pub fn from_indices(
        width: u32,
        height: u32,
        indices: Vec<u8>,
        palette: Palette,
    ) -> Option<Self> {
        if indices.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            indices,
            palette,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Row-major palette indices
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Palette index at `(x, y)`, or `None` outside the image.
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices.get((y * self.width + x) as usize).copied()
    }

    /// Rotate by 180°: `(x, y)` moves to `(W-1-x, H-1-y)`.
    ///
    /// For a row-major raster this is exactly a reversal of the index buffer.
    pub fn flip180(mut self) -> Self {
        self.indices.reverse();
        self
    }

    /// Expand back to RGB through the palette.
    pub fn to_rgb(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| {
            let index = self.indices[(y * self.width + x) as usize];
            image::Rgb(self.palette.get(index))
        })
    }
}

/// Map every pixel to the nearest of the palette's three semantic colors.
///
/// Distance is squared RGB distance; ties resolve to the lower index. Alpha is
/// ignored, the canvas is opaque by construction.
pub fn quantize(canvas: &Canvas, palette: &Palette) -> IndexedImage {
    let colors = palette.colors();
    let indices = canvas
        .pixels()
        .map(|pixel| nearest_index(colors, [pixel[0], pixel[1], pixel[2]]))
        .collect();
    IndexedImage {
        width: canvas.width(),
        height: canvas.height(),
        indices,
        palette: palette.clone(),
    }
}

fn nearest_index(colors: &[[u8; 3]], rgb: [u8; 3]) -> u8 {
    let distance = |c: &[u8; 3]| -> u32 {
        c.iter()
            .zip(rgb.iter())
            .map(|(&a, &b)| {
                let d = i32::from(a) - i32::from(b);
                (d * d) as u32
            })
            .sum()
    };
    colors
        .iter()
        .enumerate()
        .min_by_key(|&(index, color)| (distance(color), index))
        .map(|(index, _)| index as u8)
        .unwrap_or(0)
}
