//! # Display Sinks
//!
//! Anything a finished frame can be handed to: the physical panel or one of
//! the preview outputs in [`crate::preview`].

use crate::compositor::IndexedImage;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors from presenting a frame.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing a preview failed
    #[error("display IO: {0}")]
    Io(#[from] io::Error),

    /// Encoding a preview image failed
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),

    /// SPI or GPIO operation on the panel failed
    #[error("panel hardware error: {0}")]
    Hardware(String),

    /// Panel BUSY line did not clear in time
    #[error("panel stayed busy for more than {0:?}")]
    BusyTimeout(Duration),

    /// Frame dimensions do not match the sink
    #[error("frame is {actual:?}, display expects {expected:?}")]
    Size {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Receives finished frames.
pub trait DisplaySink {
    fn present(&mut self, image: &IndexedImage) -> Result<(), SinkError>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn present(&mut self, image: &IndexedImage) -> Result<(), SinkError> {
        (**self).present(image)
    }
}
