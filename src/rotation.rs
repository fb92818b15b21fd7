//! # View Rotation
//!
//! Cycles through the candidate views one display tick at a time. The only
//! state is the view shown last; the next view is the candidate after it.

use crate::ViewData;

/// Remembers the last shown view and picks the one after it.
#[derive(Debug, Default)]
pub struct RotationScheduler {
    last_shown: Option<ViewData>,
}

impl RotationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_shown(&self) -> Option<&ViewData> {
        self.last_shown.as_ref()
    }

    /// The view that should be shown next, without recording it.
    ///
    /// With no history, or when the last shown view is no longer among the
    /// candidates, rotation restarts at the first candidate.
    pub fn peek_next<'a>(&self, candidates: &'a [ViewData]) -> Option<&'a ViewData> {
        if candidates.is_empty() {
            return None;
        }

        let next = self
            .last_shown
            .as_ref()
            .and_then(|last| candidates.iter().position(|view| view == last))
            .map_or(0, |position| (position + 1) % candidates.len());

        candidates.get(next)
    }

    /// Record `view` as shown.
    pub fn commit(&mut self, view: ViewData) {
        self.last_shown = Some(view);
    }

    /// Pick the next view and record it as shown.
    pub fn select_next(&mut self, candidates: &[ViewData]) -> Option<ViewData> {
        let next = self.peek_next(candidates)?.clone();
        self.commit(next.clone());
        Some(next)
    }
}
