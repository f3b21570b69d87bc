//! Debounced re-highlighting.
//!
//! Time is passed in explicitly; the host calls [`Highlighter::tick`]
//! from its event loop (or when [`RenderScheduler::deadline`] is
//! reached) and the scheduler decides whether a pass is due.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::editor::{EditorState, Surface};
use crate::lexer::tokenize;
use crate::reconcile::reconcile;
use crate::render::Presentation;

/// Quiet window used when none is configured.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(100);

/// Single-deadline debounce timer.
#[derive(Debug, Clone)]
pub struct RenderScheduler {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl RenderScheduler {
    #[must_use]
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    #[must_use]
    pub const fn quiet_window(&self) -> Duration {
        self.quiet
    }

    /// Arm the timer, replacing any pending deadline.
    pub fn on_text_changed(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// True exactly once per armed deadline, when it has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub const fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW)
    }
}

/// A surface plus the scheduler that keeps it highlighted.
#[derive(Debug, Clone, Default)]
pub struct Highlighter {
    surface: Surface,
    scheduler: RenderScheduler,
    passes: usize,
}

impl Highlighter {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            surface: Surface::new(),
            scheduler: RenderScheduler::new(quiet),
            passes: 0,
        }
    }

    #[must_use]
    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    pub const fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    #[must_use]
    pub const fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// Number of tokenizer passes run so far.
    #[must_use]
    pub const fn passes(&self) -> usize {
        self.passes
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        self.surface.state()
    }

    /// Type `text` at the caret and arm the timer.
    pub fn input(&mut self, now: Instant, text: &str) {
        self.surface.insert(text);
        self.on_text_changed(now);
    }

    /// Delete backwards at the caret and arm the timer.
    pub fn delete_backward(&mut self, now: Instant) {
        self.surface.delete_backward();
        self.on_text_changed(now);
    }

    /// Notify the scheduler of an edit made directly on the surface.
    pub fn on_text_changed(&mut self, now: Instant) {
        self.scheduler.on_text_changed(now);
    }

    /// Run the pipeline if the quiet window has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<EditorState> {
        self.scheduler
            .poll(now)
            .then(|| self.rehighlight())
    }

    /// Replace the content (example or snippet load) and highlight
    /// it right away.
    pub fn load(&mut self, text: &str) -> EditorState {
        self.scheduler.cancel();
        self.surface.replace_all(text);
        self.rehighlight()
    }

    /// Re-highlight now, regardless of the timer.
    pub fn rehighlight(&mut self) -> EditorState {
        if self.surface.text().is_empty() {
            trace!("surface empty, skipping tokenizer");
            return reconcile(&mut self.surface, |_| Presentation::empty());
        }

        self.passes += 1;
        trace!(pass = self.passes, "re-highlighting surface");
        reconcile(&mut self.surface, |text| {
            Presentation::from_tokens(&tokenize(text))
        })
    }
}
