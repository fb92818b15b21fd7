//! # Inky Dashboard Core Library
//!
//! This library drives a small tri-color e-paper panel (Pimoroni Inky pHAT,
//! 250×122 pixels) with rotating status views built from periodically polled
//! sensor data.
//!
//! ## Design Philosophy
//!
//! ### Deterministic Rendering
//! - **Fresh canvas per frame**: Every render starts from a new panel-sized RGBA
//!   canvas and ends as a palette-indexed raster with at most three colors
//! - **Single-tint assets**: Icons and the border frame are alpha-only artwork that
//!   is recolored at render time, so one asset serves light, dark and alert states
//! - **Fitted text**: Labels are drawn at the largest font size that fits their
//!   fixed rectangle
//!
//! ### Two Independent Loops
//! The service runs two loops on a single-threaded runtime:
//! - **Data collection**: polls every data source on its own interval
//! - **Display refresh**: picks the next view, renders it and hands it to the panel
//!
//! A failure in either loop is logged and that loop alone restarts after a fixed
//! delay. The panel keeps showing its last frame in the meantime.
//!
//! ## Core Types
//!
//! - [`ViewData`]: one renderable screen, one of three fixed shapes
//! - [`DashboardElement`]: one icon + label quadrant of the dashboard view

use serde::{Deserialize, Serialize};

// Module declarations
pub mod compositor;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod inky_phat;
pub mod layout;
pub mod logging;
pub mod palette;
pub mod preview;
pub mod render;
pub mod rotation;
pub mod supervisor;
pub mod waste;

/// Panel width in pixels (Inky pHAT, landscape)
pub const PANEL_WIDTH: u32 = 250;

/// Panel height in pixels (Inky pHAT, landscape)
pub const PANEL_HEIGHT: u32 = 122;

/// One icon + label quadrant of a [`ViewData::Dashboard`] view.
///
/// # Example
/// ```
/// use inky_dashboard_lib::DashboardElement;
///
/// let element = DashboardElement::new("media/waste/paper_small.png", "Morgen")
///     .with_icon_alert(true);
///
/// assert!(element.is_icon_alert);
/// assert!(!element.is_text_alert);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardElement {
    /// Path to the small alpha-only icon
    pub icon_path: String,
    /// Label drawn next to the icon
    pub text: String,
    /// Draw the icon in the alert color
    pub is_icon_alert: bool,
    /// Draw the label in the alert color
    pub is_text_alert: bool,
}

impl DashboardElement {
    pub fn new(icon_path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            icon_path: icon_path.into(),
            text: text.into(),
            is_icon_alert: false,
            is_text_alert: false,
        }
    }

    pub fn with_icon_alert(mut self, alert: bool) -> Self {
        self.is_icon_alert = alert;
        self
    }

    pub fn with_text_alert(mut self, alert: bool) -> Self {
        self.is_text_alert = alert;
        self
    }
}

/// One renderable screen.
///
/// The set of shapes is closed: the renderer dispatches on it with an exhaustive
/// `match`, so a new shape cannot be added without a renderer for it.
///
/// Two views are "the same" for rotation purposes iff all fields are equal.
///
/// # Example
/// ```
/// use inky_dashboard_lib::{DashboardElement, ViewData};
///
/// let view = ViewData::Dashboard {
///     elements: vec![DashboardElement::new("media/waste/waste_small.png", "2 Tage")],
///     is_border_alert: false,
/// };
///
/// assert_eq!(view.kind(), "dashboard");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewData {
    /// Up to four icon + label quadrants inside a border frame.
    Dashboard {
        elements: Vec<DashboardElement>,
        is_border_alert: bool,
    },
    /// One large icon with a single centered label.
    Detailed {
        icon_path: String,
        text: String,
        is_border_alert: bool,
        is_icon_alert: bool,
        is_text_alert: bool,
    },
    /// One large icon with two labels meeting in the middle.
    DetailedTwoLine {
        icon_path: String,
        upper_text: String,
        lower_text: String,
        is_border_alert: bool,
        is_icon_alert: bool,
        is_upper_text_alert: bool,
        is_lower_text_alert: bool,
    },
}

impl ViewData {
    /// Short name of the view shape, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            ViewData::Dashboard { .. } => "dashboard",
            ViewData::Detailed { .. } => "detailed",
            ViewData::DetailedTwoLine { .. } => "detailed_two_line",
        }
    }
}
