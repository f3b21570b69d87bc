//! Editable surface and its linear text-offset model.
//!
//! The surface keeps its selection in tree terms (leaf index plus
//! offset inside the leaf), the way a host selection API does.
//! [`EditorState`] is the same information flattened to char
//! offsets into the plain text, which is what survives a rebuild
//! of the presentation.

use crate::render::Presentation;

/// Snapshot of a surface in linear terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub raw_text: String,
    pub caret: usize,
    pub selection_start: usize,
    pub selection_end: usize,
    pub scroll_offset: usize,
}

impl EditorState {
    #[must_use]
    pub const fn has_selection(&self) -> bool {
        self.selection_start != self.selection_end
    }
}

/// A point inside the presentation: leaf index and char offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub leaf: usize,
    pub offset: usize,
}

/// Anchor and focus of a selection; the focus is the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    #[must_use]
    pub const fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }
}

/// Resolve a linear char offset to a leaf position.
///
/// An offset on the boundary between two leaves resolves to the
/// start of the later one. Offsets past the end of content return
/// `None`.
#[must_use]
pub fn locate(presentation: &Presentation, offset: usize) -> Option<Position> {
    let leaves = presentation.leaves();
    let mut acc = 0;

    for (leaf, text) in leaves.iter().enumerate() {
        let len = text.chars().count();
        if offset < acc + len {
            return Some(Position {
                leaf,
                offset: offset - acc,
            });
        }
        acc += len;
    }

    (offset == acc).then(|| end_of(presentation))
}

/// Position just past the last char of content.
#[must_use]
pub fn end_of(presentation: &Presentation) -> Position {
    let leaves = presentation.leaves();
    leaves.last().map_or(Position { leaf: 0, offset: 0 }, |last| Position {
        leaf: leaves.len() - 1,
        offset: last.chars().count(),
    })
}

/// Linear char offset of a leaf position. Positions past a leaf's
/// end clamp to it; unknown leaves map to end of content.
#[must_use]
pub fn offset_of(presentation: &Presentation, position: Position) -> usize {
    let leaves = presentation.leaves();
    let Some(target) = leaves.get(position.leaf) else {
        return presentation.char_len();
    };
    let before: usize = leaves[..position.leaf]
        .iter()
        .map(|leaf| leaf.chars().count())
        .sum();
    before + position.offset.min(target.chars().count())
}

/// An editable surface: presentation, selection, scroll offset.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    presentation: Presentation,
    selection: Option<Selection>,
    scroll_offset: usize,
}

impl Surface {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            presentation: Presentation::empty(),
            selection: None,
            scroll_offset: 0,
        }
    }

    /// Surface holding `text` unhighlighted, caret at the start.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        let mut surface = Self::new();
        surface.presentation = Presentation::plain(text);
        surface.set_caret(0);
        surface
    }

    #[must_use]
    pub const fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    #[must_use]
    pub const fn selection(&self) -> Option<Selection> {
        self.selection
    }

    #[must_use]
    pub const fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub const fn set_scroll_offset(&mut self, offset: usize) {
        self.scroll_offset = offset;
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.presentation.text()
    }

    /// Selection as linear `(anchor, focus)` offsets.
    #[must_use]
    pub fn selection_offsets(&self) -> Option<(usize, usize)> {
        self.selection.map(|sel| {
            (
                offset_of(&self.presentation, sel.anchor),
                offset_of(&self.presentation, sel.focus),
            )
        })
    }

    #[must_use]
    pub fn state(&self) -> EditorState {
        let (anchor, focus) = self.selection_offsets().unwrap_or((0, 0));
        EditorState {
            raw_text: self.text(),
            caret: focus,
            selection_start: anchor.min(focus),
            selection_end: anchor.max(focus),
            scroll_offset: self.scroll_offset,
        }
    }

    /// Collapse the selection at `offset`, clamped to the content.
    pub fn set_caret(&mut self, offset: usize) {
        let at = self.position_or_end(offset);
        self.selection = Some(Selection::collapsed(at));
    }

    /// Select from `anchor` to `focus`, both clamped to the content.
    pub fn select(&mut self, anchor: usize, focus: usize) {
        self.selection = Some(Selection {
            anchor: self.position_or_end(anchor),
            focus: self.position_or_end(focus),
        });
    }

    /// Drop focus entirely.
    pub const fn blur(&mut self) {
        self.selection = None;
    }

    /// Replace the selection with `text`, leaving the caret after it.
    ///
    /// Like typing into a live surface, the edit lands in the text
    /// node under the caret and the presentation goes stale until
    /// the next re-highlight.
    pub fn insert(&mut self, text: &str) {
        let (start, end) = self.selected_range();
        self.splice(start, end, text);
        self.set_caret(start + text.chars().count());
    }

    /// Delete the selection, or the char before the caret.
    pub fn delete_backward(&mut self) {
        let (start, end) = self.selected_range();
        if start != end {
            self.splice(start, end, "");
            self.set_caret(start);
        } else if start > 0 {
            self.splice(start - 1, start, "");
            self.set_caret(start - 1);
        }
    }

    /// Swap in entirely new content as one plain text node.
    pub fn replace_all(&mut self, text: &str) {
        self.presentation = Presentation::plain(text);
        self.selection = None;
    }

    /// Install a rebuilt presentation. Callers are expected to
    /// re-place the selection afterwards.
    pub(crate) fn install(&mut self, presentation: Presentation) {
        self.presentation = presentation;
    }

    pub(crate) const fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    fn position_or_end(&self, offset: usize) -> Position {
        locate(&self.presentation, offset).unwrap_or_else(|| end_of(&self.presentation))
    }

    fn selected_range(&self) -> (usize, usize) {
        let len = self.presentation.char_len();
        let (anchor, focus) = self.selection_offsets().unwrap_or((len, len));
        (anchor.min(focus), anchor.max(focus))
    }

    /// Remove chars `start..end` and insert `text` at `start`. The
    /// insertion goes into the leaf that ends at or contains
    /// `start`, so typing extends the node being typed into.
    fn splice(&mut self, start: usize, end: usize, text: &str) {
        if self.presentation.leaves().is_empty() {
            if !text.is_empty() {
                self.presentation.push_text(text);
            }
            return;
        }

        let mut leaves = self.presentation.leaves_mut();
        let mut acc = 0;
        let mut insert_at: Option<(usize, usize)> = None;

        for (index, leaf) in leaves.iter_mut().enumerate() {
            let len = leaf.chars().count();
            let leaf_start = acc;
            let leaf_end = acc + len;

            if insert_at.is_none() && start <= leaf_end {
                insert_at = Some((index, start - leaf_start));
            }

            let cut_from = start.max(leaf_start);
            let cut_to = end.min(leaf_end);
            if cut_from < cut_to {
                let from = byte_index(leaf, cut_from - leaf_start);
                let to = byte_index(leaf, cut_to - leaf_start);
                leaf.replace_range(from..to, "");
            }

            acc = leaf_end;
        }

        let (index, offset) = insert_at.unwrap_or((leaves.len() - 1, usize::MAX));
        let leaf = &mut leaves[index];
        let at = byte_index(leaf, offset);
        leaf.insert_str(at, text);
    }
}

/// Byte index of the `n`th char, or the string's length past the end.
fn byte_index(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}
