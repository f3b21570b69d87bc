//! Re-render a surface without losing caret, selection, or scroll.

use tracing::{debug, warn};

use crate::editor::{EditorState, Position, Selection, Surface, end_of, locate};
use crate::render::Presentation;

/// Rebuild `surface`'s presentation from its own text and restore
/// the selection at the same linear offsets.
///
/// `build` must be a pure function of the text. A presentation
/// whose text differs from the input is rejected and the surface is
/// left as it was. Offsets that no longer fit the content land at
/// the end of it.
pub fn reconcile<F>(surface: &mut Surface, build: F) -> EditorState
where
    F: FnOnce(&str) -> Presentation,
{
    let text = surface.text();
    let offsets = surface.selection_offsets();
    let scroll = surface.scroll_offset();

    let next = build(&text);
    let rebuilt = next.text();
    if rebuilt != text {
        warn!(
            expected = text.chars().count(),
            got = rebuilt.chars().count(),
            "rebuilt presentation does not reproduce surface text; keeping previous"
        );
        return surface.state();
    }

    surface.install(next);

    let selection = offsets.map(|(anchor, focus)| Selection {
        anchor: resolve(surface, anchor),
        focus: resolve(surface, focus),
    });
    surface.set_selection(selection);
    surface.set_scroll_offset(scroll);

    surface.state()
}

fn resolve(surface: &Surface, offset: usize) -> Position {
    locate(surface.presentation(), offset).unwrap_or_else(|| {
        debug!(offset, "caret offset past end of content, placing at end");
        end_of(surface.presentation())
    })
}
