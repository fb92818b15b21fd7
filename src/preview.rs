//! # Frame Previews
//!
//! Sinks for development machines without a panel attached: a PNG file that is
//! overwritten with every frame, and a character rendering for the terminal.

use crate::compositor::IndexedImage;
use crate::display::{DisplaySink, SinkError};
use crate::palette::{ACCENT_INDEX, FOREGROUND_INDEX};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Writes every frame as an RGB PNG to a fixed path.
pub struct PngPreview {
    path: PathBuf,
}

impl PngPreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DisplaySink for PngPreview {
    fn present(&mut self, image: &IndexedImage) -> Result<(), SinkError> {
        image.to_rgb().save(&self.path)?;
        debug!(path = %self.path.display(), "Wrote preview");
        Ok(())
    }
}

/// Prints every frame as text, two pixel rows per line.
///
/// `' '` is background, `'#'` foreground and `'*'` accent. When the two pixels
/// of a cell differ, accent wins over foreground, foreground over background.
pub struct TerminalPreview<W: Write> {
    out: W,
}

impl<W: Write> TerminalPreview<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn cell(upper: Option<u8>, lower: Option<u8>) -> char {
    let pair = [upper, lower];
    if pair.contains(&Some(ACCENT_INDEX)) {
        '*'
    } else if pair.contains(&Some(FOREGROUND_INDEX)) {
        '#'
    } else {
        ' '
    }
}

impl<W: Write> DisplaySink for TerminalPreview<W> {
    fn present(&mut self, image: &IndexedImage) -> Result<(), SinkError> {
        let border = "-".repeat(image.width() as usize + 2);
        writeln!(self.out, "{border}")?;
        for y in (0..image.height()).step_by(2) {
            let row: String = (0..image.width())
                .map(|x| cell(image.index_at(x, y), image.index_at(x, y + 1)))
                .collect();
            writeln!(self.out, "|{row}|")?;
        }
        writeln!(self.out, "{border}")?;
        self.out.flush()?;
        Ok(())
    }
}
