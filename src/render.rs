//! # View Renderer
//!
//! Turns a [`ViewData`] into a palette-indexed frame for the 250×122 panel.
//!
//! Every render starts from a fresh background, lays down the recolored border
//! frame, then the icons and labels of the view at fixed positions, and ends
//! with quantization (and a 180° flip when the panel is mounted upside down).

use crate::compositor::{
    create_background, merge, place_text_in_rectangle, quantize, recolor, Canvas, IndexedImage,
};
use crate::layout::{LayoutError, Rectangle, Typeface, VerticalAlign};
use crate::palette::{ColorMode, ColorPalette, ColorScheme, Palette};
use crate::{DashboardElement, ViewData};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Most elements a dashboard view can hold, one per quadrant
pub const MAX_DASHBOARD_ELEMENTS: usize = 4;

/// Large icon position for the detailed views
const LARGE_ICON_POSITION: (i64, i64) = (16, 16);

const DETAILED_TEXT: Rectangle = Rectangle::new(106, 16, 128, 90);
const UPPER_TEXT: Rectangle = Rectangle::new(106, 16, 128, 42);
const LOWER_TEXT: Rectangle = Rectangle::new(106, 64, 128, 42);

/// Dashboard quadrants in draw order: upper left, upper right, lower left,
/// lower right. Each is `(icon position, text rectangle)`.
const QUADRANTS: [((i64, i64), Rectangle); MAX_DASHBOARD_ELEMENTS] = [
    ((16, 15), Rectangle::new(57, 15, 68, 42)),
    ((125, 15), Rectangle::new(167, 15, 68, 42)),
    ((16, 65), Rectangle::new(57, 65, 68, 42)),
    ((125, 65), Rectangle::new(167, 65, 68, 42)),
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("dashboard view has {0} elements, at most 4 fit")]
    TooManyElements(usize),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("failed to load image asset {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Load an image asset from disk as RGBA.
pub fn load_asset<P: AsRef<Path>>(path: P) -> Result<Canvas, RenderError> {
    let path = path.as_ref();
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| RenderError::Asset {
            path: path.to_path_buf(),
            source,
        })
}

/// Renders views for one panel configuration.
pub struct ViewRenderer<T: Typeface> {
    face: T,
    border: Canvas,
    scheme: ColorScheme,
    palette: Palette,
    flip_screen: bool,
}

impl<T: Typeface> ViewRenderer<T> {
    pub fn new(
        face: T,
        border: Canvas,
        mode: ColorMode,
        palette: ColorPalette,
        flip_screen: bool,
    ) -> Self {
        Self {
            face,
            border,
            scheme: ColorScheme::new(mode, palette),
            palette: Palette::from_selector(palette),
            flip_screen,
        }
    }

    /// Render any view shape.
    pub fn render(&self, view: &ViewData) -> Result<IndexedImage, RenderError> {
        debug!(kind = view.kind(), "Rendering view");
        match view {
            ViewData::Dashboard {
                elements,
                is_border_alert,
            } => self.render_dashboard(elements, *is_border_alert),
            ViewData::Detailed {
                icon_path,
                text,
                is_border_alert,
                is_icon_alert,
                is_text_alert,
            } => self.render_detailed(
                icon_path,
                text,
                *is_border_alert,
                *is_icon_alert,
                *is_text_alert,
            ),
            ViewData::DetailedTwoLine {
                icon_path,
                upper_text,
                lower_text,
                is_border_alert,
                is_icon_alert,
                is_upper_text_alert,
                is_lower_text_alert,
            } => self.render_detailed_two_line(
                icon_path,
                (upper_text, *is_upper_text_alert),
                (lower_text, *is_lower_text_alert),
                *is_border_alert,
                *is_icon_alert,
            ),
        }
    }

    pub fn render_dashboard(
        &self,
        elements: &[DashboardElement],
        is_border_alert: bool,
    ) -> Result<IndexedImage, RenderError> {
        if elements.len() > MAX_DASHBOARD_ELEMENTS {
            return Err(RenderError::TooManyElements(elements.len()));
        }

        let mut canvas = self.framed_background(is_border_alert);
        for (element, (icon_position, text_rect)) in elements.iter().zip(QUADRANTS) {
            canvas = self.draw_icon(
                canvas,
                &element.icon_path,
                icon_position,
                element.is_icon_alert,
            )?;
            self.draw_label(
                &mut canvas,
                text_rect,
                &element.text,
                element.is_text_alert,
                VerticalAlign::Center,
            )?;
        }

        Ok(self.finish(&canvas))
    }

    pub fn render_detailed(
        &self,
        icon_path: &str,
        text: &str,
        is_border_alert: bool,
        is_icon_alert: bool,
        is_text_alert: bool,
    ) -> Result<IndexedImage, RenderError> {
        let canvas = self.framed_background(is_border_alert);
        let mut canvas = self.draw_icon(canvas, icon_path, LARGE_ICON_POSITION, is_icon_alert)?;
        self.draw_label(&mut canvas, DETAILED_TEXT, text, is_text_alert, VerticalAlign::Center)?;
        Ok(self.finish(&canvas))
    }

    /// `upper` and `lower` are `(text, alert)` pairs.
    pub fn render_detailed_two_line(
        &self,
        icon_path: &str,
        upper: (&str, bool),
        lower: (&str, bool),
        is_border_alert: bool,
        is_icon_alert: bool,
    ) -> Result<IndexedImage, RenderError> {
        let canvas = self.framed_background(is_border_alert);
        let mut canvas = self.draw_icon(canvas, icon_path, LARGE_ICON_POSITION, is_icon_alert)?;
        self.draw_label(&mut canvas, UPPER_TEXT, upper.0, upper.1, VerticalAlign::Bottom)?;
        self.draw_label(&mut canvas, LOWER_TEXT, lower.0, lower.1, VerticalAlign::Top)?;
        Ok(self.finish(&canvas))
    }

    fn framed_background(&self, is_border_alert: bool) -> Canvas {
        let border = recolor(self.border.clone(), self.scheme.drawable(is_border_alert));
        merge(create_background(self.scheme.mode()), &border, (0, 0))
    }

    fn draw_icon(
        &self,
        canvas: Canvas,
        icon_path: &str,
        position: (i64, i64),
        is_alert: bool,
    ) -> Result<Canvas, RenderError> {
        let icon = recolor(load_asset(icon_path)?, self.scheme.drawable(is_alert));
        Ok(merge(canvas, &icon, position))
    }

    fn draw_label(
        &self,
        canvas: &mut Canvas,
        rect: Rectangle,
        text: &str,
        is_alert: bool,
        align: VerticalAlign,
    ) -> Result<(), RenderError> {
        let color = self.scheme.drawable(is_alert);
        place_text_in_rectangle(canvas, &self.face, rect, text, color, align)?;
        Ok(())
    }

    fn finish(&self, canvas: &Canvas) -> IndexedImage {
        let image = quantize(canvas, &self.palette);
        if self.flip_screen {
            image.flip180()
        } else {
            image
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TextBounds;
    use crate::palette::{ACCENT_INDEX, BACKGROUND_INDEX, FOREGROUND_INDEX};
    use crate::{PANEL_HEIGHT, PANEL_WIDTH};
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    /// Glyphs are solid blocks `size / 2` wide with ink from `size / 4` down to `size`.
    struct BlockFace;

    impl Typeface for BlockFace {
        fn bounds(&self, text: &str, size: u32) -> TextBounds {
            let size = size as i32;
            TextBounds {
                x_min: 0,
                y_min: size / 4,
                x_max: text.chars().count() as i32 * (size / 2),
                y_max: size,
            }
        }

        fn rasterize(
            &self,
            text: &str,
            size: u32,
            origin: (i32, i32),
            plot: &mut dyn FnMut(i32, i32, f32),
        ) {
            let b = self.bounds(text, size);
            for y in b.y_min..b.y_max {
                for x in b.x_min..b.x_max {
                    plot(origin.0 + x, origin.1 + y, 1.0);
                }
            }
        }
    }

    /// Panel-sized frame, two pixels wide, drawn in black.
    fn border() -> RgbaImage {
        RgbaImage::from_fn(PANEL_WIDTH, PANEL_HEIGHT, |x, y| {
            if x < 2 || y < 2 || x >= PANEL_WIDTH - 2 || y >= PANEL_HEIGHT - 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    fn icon(dir: &TempDir, name: &str, side: u32) -> String {
        let path = dir.path().join(name);
        RgbaImage::from_pixel(side, side, Rgba([17, 17, 17, 255]))
            .save(&path)
            .unwrap();
        path.to_string_lossy().into_owned()
    }

    fn renderer(flip: bool) -> ViewRenderer<BlockFace> {
        ViewRenderer::new(BlockFace, border(), ColorMode::Light, ColorPalette::Red, flip)
    }

    #[test]
    fn test_dashboard_rejects_five_elements() {
        let elements: Vec<_> = (0..5)
            .map(|i| DashboardElement::new(format!("/missing/{i}.png"), "x"))
            .collect();
        let view = ViewData::Dashboard {
            elements,
            is_border_alert: false,
        };

        let err = renderer(false).render(&view).unwrap_err();
        assert!(matches!(err, RenderError::TooManyElements(5)));
    }

    #[test]
    fn test_dashboard_quadrants_and_alert_colors() {
        let dir = TempDir::new().unwrap();
        let small = icon(&dir, "small.png", 10);
        let view = ViewData::Dashboard {
            elements: vec![
                DashboardElement::new(&small, "ab").with_icon_alert(true),
                DashboardElement::new(&small, "ab").with_text_alert(true),
            ],
            is_border_alert: true,
        };

        let frame = renderer(false).render(&view).unwrap();
        assert_eq!((frame.width(), frame.height()), (PANEL_WIDTH, PANEL_HEIGHT));

        // border in alert color
        assert_eq!(frame.index_at(0, 0), Some(ACCENT_INDEX));
        // upper-left icon alert, upper-right icon primary
        assert_eq!(frame.index_at(16, 15), Some(ACCENT_INDEX));
        assert_eq!(frame.index_at(125, 15), Some(FOREGROUND_INDEX));
        // upper-left label primary, upper-right label alert
        assert_eq!(frame.index_at(90, 40), Some(FOREGROUND_INDEX));
        assert_eq!(frame.index_at(200, 40), Some(ACCENT_INDEX));
        // nothing in the empty lower quadrants
        assert_eq!(frame.index_at(20, 70), Some(BACKGROUND_INDEX));
    }

    #[test]
    fn test_detailed_two_line_layout() {
        let dir = TempDir::new().unwrap();
        let large = icon(&dir, "large.png", 80);
        let view = ViewData::DetailedTwoLine {
            icon_path: large,
            upper_text: "Papier".to_string(),
            lower_text: "Morgen".to_string(),
            is_border_alert: false,
            is_icon_alert: true,
            is_upper_text_alert: false,
            is_lower_text_alert: true,
        };

        let frame = renderer(false).render(&view).unwrap();
        assert_eq!(frame.index_at(0, 0), Some(FOREGROUND_INDEX));
        assert_eq!(frame.index_at(16, 16), Some(ACCENT_INDEX));
        assert_eq!(frame.index_at(95, 95), Some(ACCENT_INDEX));
        assert_eq!(frame.index_at(96, 96), Some(BACKGROUND_INDEX));

        let colors_in = |rows: std::ops::Range<u32>| {
            let mut seen = std::collections::HashSet::new();
            for y in rows {
                for x in 106..234 {
                    seen.insert(frame.index_at(x, y).unwrap());
                }
            }
            seen
        };
        let upper = colors_in(16..58);
        assert!(upper.contains(&FOREGROUND_INDEX));
        assert!(!upper.contains(&ACCENT_INDEX));
        let lower = colors_in(64..106);
        assert!(lower.contains(&ACCENT_INDEX));
        assert!(!lower.contains(&FOREGROUND_INDEX));
    }

    #[test]
    fn test_detailed_and_flip() {
        let dir = TempDir::new().unwrap();
        let large = icon(&dir, "large.png", 80);

        let upright = renderer(false)
            .render_detailed(&large, "5 Tage", false, false, false)
            .unwrap();
        let flipped = renderer(true)
            .render_detailed(&large, "5 Tage", false, false, false)
            .unwrap();

        assert_eq!(upright.index_at(16, 16), Some(FOREGROUND_INDEX));
        assert_eq!(upright.clone().flip180(), flipped);
    }

    #[test]
    fn test_dark_mode_background() {
        let dir = TempDir::new().unwrap();
        let large = icon(&dir, "large.png", 80);
        let renderer =
            ViewRenderer::new(BlockFace, border(), ColorMode::Dark, ColorPalette::Yellow, false);

        let frame = renderer.render_detailed(&large, "Heute", false, false, false).unwrap();
        // dark background quantizes to the black entry, primary ink to white
        assert_eq!(frame.index_at(100, 110), Some(FOREGROUND_INDEX));
        assert_eq!(frame.index_at(16, 16), Some(BACKGROUND_INDEX));
        assert_eq!(frame.index_at(0, 0), Some(BACKGROUND_INDEX));
    }

    #[test]
    fn test_missing_icon_is_asset_error() {
        let err = renderer(false)
            .render_detailed("/nonexistent/icon.png", "x", false, false, false)
            .unwrap_err();
        assert!(matches!(err, RenderError::Asset { .. }));
    }

    #[test]
    fn test_overflowing_label_is_layout_error() {
        let dir = TempDir::new().unwrap();
        let large = icon(&dir, "large.png", 80);
        // too wide at every size
        struct WideFace;
        impl Typeface for WideFace {
            fn bounds(&self, _: &str, _: u32) -> TextBounds {
                TextBounds {
                    x_min: 0,
                    y_min: 0,
                    x_max: 1000,
                    y_max: 1,
                }
            }
            fn rasterize(&self, _: &str, _: u32, _: (i32, i32), _: &mut dyn FnMut(i32, i32, f32)) {}
        }
        let renderer =
            ViewRenderer::new(WideFace, border(), ColorMode::Light, ColorPalette::Red, false);
        let err = renderer.render_detailed(&large, "x", false, false, false).unwrap_err();
        assert!(matches!(err, RenderError::Layout(LayoutError::Overflow { .. })));
    }
}
