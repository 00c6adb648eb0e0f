//! Buffer owns the document, the caret pair, and the undo history, and is
//! the seam where the Edit Engine (§4.4), Caret Engine (§4.3) and Undo
//! Manager (§4.5) meet: every public method here is one step of "capture
//! carets, run a primitive, push a record" or "pop a record, replay it,
//! push its inverse".
//!
//! # Some terminology
//! - **caret**: a `(line, byte)` position; see [region::Caret].
//! - **selection**: the range between the anchor and active carets.
//!
//! Terminology of `Document`, `ActiveLine`, and `LineRecord` is specified in
//! [document].

use std::cell::RefCell;
use std::rc::Rc;

use crate::measurement::TextMetrics;
use crate::region::{Caret, CaretPair};

pub mod active_line;
pub mod document;
pub mod edit;
pub mod line_index;
pub mod movement;
pub mod undo_history;

pub use document::Document;
pub use movement::{Direction, Granularity, VerticalMotionMemory};
pub use undo_history::{UndoManager, UndoRecord};

/// Which end(s) of the caret pair a motion should move — see spec §4.3
/// "Selection motion policy".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveTarget {
    /// Bare arrow: move both ends in lockstep, collapsing an existing
    /// selection to its near/far edge instead of moving by one unit.
    Both,
    /// Shift-arrow: extend the selection by moving only the active caret.
    ActiveOnly,
    /// Move only the anchor, leaving the active caret in place. Rare; kept
    /// for completeness of the flag set spec.md §4.3 describes.
    AnchorOnly,
}

/// `Buffer` is generic over an owner id `Id` so its undo manager can be
/// swapped for one shared with other textboxes (spec §5 "multi-textbox
/// undo"); `()` is the common single-textbox case. The manager itself lives
/// behind `Rc<RefCell<_>>` rather than owned by value, since sharing means
/// literally aliasing the same stack, not copying one.
#[derive(Debug)]
pub struct Buffer<Id = ()> {
    document: Document,
    carets: CaretPair,
    owner: Id,
    undo: Rc<RefCell<UndoManager<Id>>>,
    vertical_memory: VerticalMotionMemory,
}

impl<Id: Copy + PartialEq + std::fmt::Debug> Buffer<Id> {
    pub fn new(default_line_height: u32, owner: Id) -> Self {
        Self {
            document: Document::new(default_line_height),
            carets: CaretPair::default(),
            owner,
            undo: Rc::new(RefCell::new(UndoManager::new())),
            vertical_memory: VerticalMotionMemory::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for callers (the Viewport) that need to measure and
    /// cache per-line pixel widths outside of an edit.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn carets(&self) -> CaretPair {
        self.carets
    }

    /// Replace this buffer's undo manager with one possibly shared by other
    /// buffers, tagging this buffer's own records with `owner` so replay
    /// routes them back here (spec §6 `set_undo_manager`).
    pub fn set_undo_manager(&mut self, owner: Id, shared: Rc<RefCell<UndoManager<Id>>>) {
        self.owner = owner;
        self.undo = shared;
    }

    pub fn can_undo(&self) -> bool {
        self.undo.borrow().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.borrow().can_redo()
    }

    /// The record that would be undone next, if any (spec §6 `peek`).
    /// Cloned out of the shared manager rather than borrowed, since the
    /// manager may live behind a `RefCell` shared with other textboxes.
    pub fn peek_undo(&self) -> Option<UndoRecord> {
        self.undo.borrow().peek().cloned()
    }

    pub fn line_count(&self) -> usize {
        self.document.line_count()
    }

    pub fn line_length(&self, index: usize) -> usize {
        self.document.line_length(index)
    }

    /// The full document as a `\n`-joined string, or just the selected
    /// range when `selected_only` is true.
    pub fn get_contents(&mut self, selected_only: bool) -> String {
        let bytes = if selected_only {
            let (from, to) = self.carets.ordered();
            capture_selection(&mut self.document, from, to)
        } else {
            edit::get_contents(&mut self.document)
        };
        String::from_utf8(bytes).expect("document bytes are always valid utf-8")
    }

    /// Equivalent to select-all followed by replace — see spec §6.
    pub fn set_contents(&mut self, text: &str, multiline: bool, now_ms: u64) {
        self.select_all();
        self.insert(text, multiline, now_ms);
    }

    /// `(anchor.line, anchor.byte, active.line, active.byte)`.
    pub fn get_selection(&self) -> (usize, usize, usize, usize) {
        (
            self.carets.anchor.line,
            self.carets.anchor.byte,
            self.carets.active.line,
            self.carets.active.byte,
        )
    }

    /// Set the selection directly. A byte of `-1` means "end of that line",
    /// matching spec §6's sentinel convention.
    pub fn set_selection(&mut self, line_a: usize, byte_a: i64, line_b: usize, byte_b: i64) {
        let anchor = self.resolve_caret(line_a, byte_a);
        let active = self.resolve_caret(line_b, byte_b);
        self.carets = CaretPair::new(anchor, active);
        self.vertical_memory.reset();
    }

    fn resolve_caret(&self, line: usize, byte: i64) -> Caret {
        let line = line.min(self.document.lines().last_index());
        let byte = if byte < 0 {
            self.document.line_length(line)
        } else {
            (byte as usize).min(self.document.line_length(line))
        };
        Caret::new(line, byte)
    }

    pub fn select_all(&mut self) {
        let last = self.document.lines().last_index();
        self.carets = CaretPair::new(
            Caret::new(0, 0),
            Caret::new(last, self.document.line_length(last)),
        );
        self.vertical_memory.reset();
    }

    /// Replace the current selection with `""` — see spec §6 `clear`.
    pub fn clear(&mut self, now_ms: u64) {
        self.select_all();
        self.insert("", true, now_ms);
    }

    /// The single mutation entry point (spec §4.4): replace the current
    /// selection with `text`, push an undo record (unless it was a true
    /// no-op), and return the new caret position.
    ///
    /// `""` inserted into an empty selection is a no-op and does not touch
    /// the undo stack (spec §8 "Boundaries").
    pub fn insert(&mut self, text: &str, multiline: bool, now_ms: u64) -> Caret {
        if text.is_empty() && self.carets.is_empty() {
            return self.carets.active;
        }
        let normalized = normalize_insertion(text, multiline);
        let carets_before = self.carets;
        let outcome = edit::replace_selection(&mut self.document, self.carets, &normalized);
        self.carets = outcome.carets_after;
        self.vertical_memory.reset();

        self.undo.borrow_mut().push(
            self.owner,
            UndoRecord {
                carets_before,
                carets_after: outcome.carets_after,
                replaced_bytes: outcome.replaced_bytes,
                timestamp_ms: now_ms,
            },
        );
        self.carets.active
    }

    /// Forward/backward wraparound search, scanning only committed bytes
    /// (spec §4.4: forces a check-in first via [edit::find]/[edit::find_backward]).
    pub fn find(&mut self, needle: &str, from: Caret, backward: bool) -> Option<Caret> {
        self.document.check_in();
        let needle = needle.as_bytes();
        if backward {
            edit::find_backward(&self.document, needle, from)
                .or_else(|| edit::find_backward(&self.document, needle, self.doc_end()))
        } else {
            edit::find(&self.document, needle, from)
                .or_else(|| edit::find(&self.document, needle, Caret::new(0, 0)))
        }
    }

    fn doc_end(&self) -> Caret {
        let last = self.document.lines().last_index();
        Caret::new(last, self.document.line_length(last))
    }

    /// Move the caret per spec §4.3. Returns whether the active line
    /// changed. `metrics` is required for `Granularity::Vertical`.
    pub fn move_caret(
        &mut self,
        dir: Direction,
        granularity: Granularity,
        strong_whitespace: bool,
        target: MoveTarget,
        metrics: &dyn TextMetrics,
    ) -> bool {
        if granularity != Granularity::Vertical {
            self.vertical_memory.reset();
        }

        let step = |doc: &Document, caret: Caret, memory: &mut VerticalMotionMemory| match granularity
        {
            Granularity::Single => movement::move_single(doc, caret, dir),
            Granularity::Word => movement::move_word(doc, caret, dir, strong_whitespace),
            Granularity::Line => movement::move_line(doc, caret, dir),
            Granularity::Document => movement::move_document(doc, caret, dir),
            Granularity::Vertical => movement::move_vertical(doc, metrics, caret, dir, memory),
        };

        match target {
            MoveTarget::Both => {
                if !self.carets.is_empty() {
                    let forward = dir == Direction::Forward;
                    let at = self.carets.collapse_towards(forward);
                    self.carets = CaretPair::cursor(at);
                    return false;
                }
                let (new_caret, changed) = step(&self.document, self.carets.active, &mut self.vertical_memory);
                self.carets = CaretPair::cursor(new_caret);
                changed
            },
            MoveTarget::ActiveOnly => {
                let (new_active, changed) =
                    step(&self.document, self.carets.active, &mut self.vertical_memory);
                self.carets.active = new_active;
                changed
            },
            MoveTarget::AnchorOnly => {
                let (new_anchor, changed) =
                    step(&self.document, self.carets.anchor, &mut self.vertical_memory);
                self.carets.anchor = new_anchor;
                changed
            },
        }
    }

    /// Bracket a batch of edits so they undo atomically as one unit (spec
    /// §4.5 "Group protocol").
    pub fn begin_undo_group(&mut self) {
        self.undo.borrow_mut().begin_group();
    }

    pub fn end_undo_group(&mut self) {
        self.undo.borrow_mut().end_group();
    }

    /// Pop the top undo record (or whole group), restore `carets_before`,
    /// and replay it by re-inserting `replaced_bytes`; the resulting record
    /// is pushed onto the redo stack.
    ///
    /// When the undo manager is shared (spec §5 "multi-textbox undo"), a
    /// popped record may belong to a different textbox than this one; such
    /// records are passed straight through to the redo stack, untouched,
    /// for that textbox's own `undo` to replay against its own document.
    pub fn undo(&mut self, now_ms: u64) -> bool {
        let (group, batch) = self.undo.borrow_mut().begin_undo();
        if batch.is_empty() {
            return false;
        }
        let mut acted = false;
        for (owner, record) in batch {
            if owner == self.owner {
                let replay = self.replay(record, now_ms);
                self.undo.borrow_mut().push_redo(owner, replay, group);
                acted = true;
            } else {
                self.undo.borrow_mut().push_redo(owner, record, group);
            }
        }
        acted
    }

    /// Symmetric to [`Self::undo`].
    pub fn redo(&mut self, now_ms: u64) -> bool {
        let (group, batch) = self.undo.borrow_mut().begin_redo();
        if batch.is_empty() {
            return false;
        }
        let mut acted = false;
        for (owner, record) in batch {
            if owner == self.owner {
                let replay = self.replay(record, now_ms);
                self.undo.borrow_mut().push_undo_raw(owner, replay, group);
                acted = true;
            } else {
                self.undo.borrow_mut().push_undo_raw(owner, record, group);
            }
        }
        acted
    }

    /// Re-run the Edit Engine with `record.replaced_bytes` as the
    /// insertion, after installing `record.carets_before`. Returns the
    /// inverse record (spec §4.5 "Invoke").
    fn replay(&mut self, record: UndoRecord, now_ms: u64) -> UndoRecord {
        // The span to hand back to `replace_selection` is measured on the
        // *current* document, not the one `record` was captured against: the
        // edit's start position is stable across it, but its end position
        // only is if the replacement happened to be the same length as what
        // it replaced. The actual current end is wherever the edit's own
        // caret landed.
        let from = record.carets_before.ordered().0;
        self.carets = CaretPair::new(from, record.carets_after.active);
        let outcome = edit::replace_selection(&mut self.document, self.carets, &record.replaced_bytes);
        self.carets = outcome.carets_after;
        self.vertical_memory.reset();
        UndoRecord {
            carets_before: record.carets_before,
            carets_after: outcome.carets_after,
            replaced_bytes: outcome.replaced_bytes,
            timestamp_ms: now_ms,
        }
    }
}

fn capture_selection(doc: &mut document::Document, from: Caret, to: Caret) -> Vec<u8> {
    doc.check_in();
    if from.line == to.line {
        return doc.line_bytes(from.line)[from.byte..to.byte].to_vec();
    }
    let mut out = doc.line_bytes(from.line)[from.byte..].to_vec();
    for line in from.line + 1..to.line {
        out.push(b'\n');
        out.extend_from_slice(&doc.line_bytes(line));
    }
    out.push(b'\n');
    out.extend_from_slice(&doc.line_bytes(to.line)[..to.byte]);
    out
}

/// CRLF -> LF, then strip bare `\n` entirely when the host doesn't accept
/// multiline input (spec §4.4 "Insert phase").
fn normalize_insertion(text: &str, multiline: bool) -> Vec<u8> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if multiline {
        normalized.into_bytes()
    } else {
        normalized.replace('\n', "").into_bytes()
    }
}
