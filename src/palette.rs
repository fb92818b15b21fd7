//! # Palette Table
//!
//! The Inky pHAT shows exactly three colors: white, black and one accent
//! (red or yellow depending on the panel variant). Every frame is quantized to
//! a 256-entry palette whose first three slots hold those colors.
//!
//! Semantic colors are resolved per color mode: the background fill comes from
//! [`ColorMode::background`], the primary and alert drawing colors from
//! [`ColorScheme`], keyed by mode, palette and alert flag.

use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of entries in an indexed-color palette table
pub const PALETTE_SIZE: usize = 256;

/// Index of the background color in the palette table
pub const BACKGROUND_INDEX: u8 = 0;
/// Index of the accent (alert) color in the palette table
pub const ACCENT_INDEX: u8 = 1;
/// Index of the foreground color in the palette table
pub const FOREGROUND_INDEX: u8 = 2;

pub const WHITE: [u8; 3] = [255, 255, 255];
pub const BLACK: [u8; 3] = [0, 0, 0];
pub const RED: [u8; 3] = [255, 0, 0];
pub const YELLOW: [u8; 3] = [255, 255, 0];

/// Light mode draws black on white, dark mode white on black.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Light,
    Dark,
}

/// Accent color family of the physical panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPalette {
    Red,
    Yellow,
}

impl fmt::Display for ColorPalette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorPalette::Red => write!(f, "red"),
            ColorPalette::Yellow => write!(f, "yellow"),
        }
    }
}

/// Ordered `[background, accent, foreground]` colors for a palette family.
pub fn semantic_colors(palette: ColorPalette) -> [[u8; 3]; 3] {
    match palette {
        ColorPalette::Red => [WHITE, RED, BLACK],
        ColorPalette::Yellow => [WHITE, YELLOW, BLACK],
    }
}

/// A 256-entry RGB palette table built from three semantic colors.
///
/// Slots 0..3 hold background, accent and foreground; every other slot is zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    entries: [[u8; 3]; PALETTE_SIZE],
}

impl Palette {
    pub fn from_selector(palette: ColorPalette) -> Self {
        let mut entries = [[0u8; 3]; PALETTE_SIZE];
        for (slot, color) in entries.iter_mut().zip(semantic_colors(palette)) {
            *slot = color;
        }
        Self { entries }
    }

    /// The three colors frames are quantized to.
    pub fn colors(&self) -> &[[u8; 3]] {
        &self.entries[..3]
    }

    pub fn get(&self, index: u8) -> [u8; 3] {
        self.entries[index as usize]
    }
}

/// Resolves semantic drawing colors to concrete RGBA values.
///
/// Built once per (mode, palette) pair and indexed by the alert flag of the
/// element being drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorScheme {
    mode: ColorMode,
    palette: ColorPalette,
    /// `[not alert, alert]`
    drawable: [Rgba<u8>; 2],
}

const fn opaque(rgb: [u8; 3]) -> Rgba<u8> {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
}

/// `(mode, palette) -> [primary, alert]` for drawable elements.
const fn drawable_colors(mode: ColorMode, palette: ColorPalette) -> [Rgba<u8>; 2] {
    match (mode, palette) {
        (ColorMode::Light, ColorPalette::Red) => [opaque(BLACK), opaque(RED)],
        (ColorMode::Light, ColorPalette::Yellow) => [opaque(BLACK), opaque(YELLOW)],
        (ColorMode::Dark, ColorPalette::Red) => [opaque(WHITE), opaque(RED)],
        (ColorMode::Dark, ColorPalette::Yellow) => [opaque(WHITE), opaque(YELLOW)],
    }
}

impl ColorMode {
    /// Secondary color, used as the canvas fill: white in light mode, black in
    /// dark mode.
    pub const fn background(self) -> Rgba<u8> {
        match self {
            ColorMode::Light => opaque(WHITE),
            ColorMode::Dark => opaque(BLACK),
        }
    }
}

impl ColorScheme {
    pub fn new(mode: ColorMode, palette: ColorPalette) -> Self {
        Self {
            mode,
            palette,
            drawable: drawable_colors(mode, palette),
        }
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn palette(&self) -> ColorPalette {
        self.palette
    }

    /// Color for a drawable element: alert color when its own flag is set,
    /// primary otherwise.
    pub fn drawable(&self, alert: bool) -> Rgba<u8> {
        self.drawable[usize::from(alert)]
    }

    pub fn primary(&self) -> Rgba<u8> {
        self.drawable(false)
    }

    pub fn alert(&self) -> Rgba<u8> {
        self.drawable(true)
    }
}
