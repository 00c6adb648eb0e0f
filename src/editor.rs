//! `Editor`: the public facade (spec §6), tying the Buffer, Viewport, and
//! capability traits together behind the flat operation set a host embeds.
//!
//! Grounded in the teacher's `View`/`App` split — a thin owning struct that
//! holds the pieces (document id, viewport, theme) a host constructs it
//! with and forwards calls into — generalized here so the "pieces" are the
//! injected capability traits (spec §9 "dynamic dispatch replacement")
//! rather than concrete `syntect`/`bazed_rpc` types.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::buffer::{Buffer, Direction, Granularity, MoveTarget, UndoManager};
use crate::error::{Error, Result};
use crate::highlighting::{HighlightRun, Highlighter};
use crate::measurement::TextMetrics;
use crate::region::Caret;
use crate::view::{Insets, RepaintRegion, Viewport};

bitflags::bitflags! {
    /// Construction-time configuration (spec §6 "Creation").
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EditorFlags: u32 {
        /// Accept `\n` in inserts; otherwise `\n` is stripped on the way in.
        const MULTILINE = 1 << 0;
        /// Enable the §4.7 Edit-Session Controller state machine.
        const EDIT_BASED = 1 << 1;
        /// Losing focus while editing behaves as `end_edit(reject)`. Valid
        /// only together with `EDIT_BASED`.
        const REJECT_ON_FOCUS_LOSS = 1 << 2;
        /// Accept a literal tab keystroke as input; otherwise Tab is
        /// forwarded to the host's focus traversal.
        const ALLOW_TABS = 1 << 3;
        /// Render a line-number gutter, queried read-only via
        /// [`Editor::gutter_width`]/[`Editor::gutter_label`].
        const MARGIN = 1 << 4;
        /// **[ADDED]** spec §6 describes smart-quote substitution as "when
        /// enabled" without naming its flag; we gate it on this one rather
        /// than make it unconditional, consistent with every other toggle
        /// in this set being opt-in.
        const SMART_QUOTES = 1 << 5;
    }
}

/// Identifies one `Editor`'s records on an undo stack shared with others
/// (spec §5 "multi-textbox undo"). Allocated from a process-wide counter —
/// no crate dependency needed for uniqueness within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextboxId(u64);

impl TextboxId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Core-to-host notifications (spec §6 "Observer callbacks"). Every method
/// has a default no-op body; a host implements only the ones it cares about.
pub trait EditorObserver {
    fn on_edit(&mut self) {}
    fn on_edit_start(&mut self) {}

    /// Called as an edit session ends. `rejected` is `true` when the caller
    /// asked to discard the edit (`end_edit(false, ..)`), in which case the
    /// return value is ignored — the rollback has already happened and
    /// cannot be vetoed. When `rejected` is `false` (the caller asked to
    /// accept), returning `false` vetoes the accept: the session stays in
    /// `Editing` and [`Error::Rejected`] is returned to the caller (spec §4.7
    /// "if observer vetoes", §7 `Rejected`).
    fn on_edit_end(&mut self, rejected: bool, unchanged: bool) -> bool {
        let _ = (rejected, unchanged);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Editing,
    Destroying,
}

/// One key input the core recognizes (spec §6 "Keystroke mapping"). A host
/// translates its platform's raw key events into these before calling
/// [`Editor::handle_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Left,
    Right,
    ShiftLeft,
    ShiftRight,
    CtrlLeft,
    CtrlRight,
    Home,
    End,
    CtrlHome,
    CtrlEnd,
    Up,
    Down,
    PageUp,
    PageDown,
    Backspace { word: bool },
    Delete { word: bool },
    Char(char),
    Enter,
    Escape,
    Tab,
}

/// Whether [`Editor::handle_key`] consumed an input or the host should fall
/// back to its own handling (spec §6: Tab "is forwarded to the framework's
/// focus-traversal" when tabs aren't accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Forward,
}

const PAGE_STEP: u32 = 10;

/// The public facade: owns a [`Buffer`], a [`Viewport`], and the
/// host-injected capability objects, and re-entrancy-guards every mutating
/// call (spec §5's single-threaded "message-mutex check").
pub struct Editor {
    id: TextboxId,
    flags: EditorFlags,
    buffer: Buffer<TextboxId>,
    viewport: Viewport,
    metrics: Box<dyn TextMetrics>,
    highlighter: Option<Box<dyn Highlighter>>,
    observer: Option<Box<dyn EditorObserver>>,
    busy: Cell<bool>,
    session: SessionState,
    /// Contents snapshotted at `start_edit`, restored verbatim on reject.
    snapshot: Option<String>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("id", &self.id)
            .field("flags", &self.flags)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Re-entrancy guard per spec §5: set on entry to a mutating method,
/// cleared on exit (including via early return, through `Drop`), checked
/// first and returning `Error::Busy` if already held.
struct BusyGuard<'a>(&'a Cell<bool>);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn enter(busy: &Cell<bool>) -> Result<BusyGuard<'_>> {
    if busy.get() {
        return Err(Error::Busy);
    }
    busy.set(true);
    Ok(BusyGuard(busy))
}

impl Editor {
    pub fn new(
        flags: EditorFlags,
        default_line_height: u32,
        metrics: Box<dyn TextMetrics>,
        highlighter: Option<Box<dyn Highlighter>>,
        observer: Option<Box<dyn EditorObserver>>,
    ) -> Self {
        let id = TextboxId::next();
        Self {
            id,
            flags,
            buffer: Buffer::new(default_line_height, id),
            viewport: Viewport::new(0, 0, Insets::default()),
            metrics,
            highlighter,
            observer,
            busy: Cell::new(false),
            session: SessionState::Idle,
            snapshot: None,
        }
    }

    pub fn flags(&self) -> EditorFlags {
        self.flags
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn take_repaint_region(&mut self) -> Option<RepaintRegion> {
        self.viewport.take_repaint_region()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
        self.refresh_viewport();
    }

    pub fn set_scroll(&mut self, x: u32, y: u32) {
        let Self { viewport, buffer, .. } = self;
        viewport.set_scroll(x, y, buffer.document_mut());
    }

    fn refresh_viewport(&mut self) {
        let Self { viewport, buffer, metrics, .. } = self;
        viewport.refresh(buffer.document_mut(), metrics.as_ref());
    }

    fn ensure_caret_visible(&mut self) {
        let caret = self.buffer.carets().active;
        let Self { viewport, buffer, metrics, .. } = self;
        viewport.ensure_caret_visible(buffer.document_mut(), metrics.as_ref(), caret);
    }

    /// Share an undo stack with other editors (spec §6 `set_undo_manager`).
    pub fn set_undo_manager(&mut self, shared: std::rc::Rc<std::cell::RefCell<UndoManager<TextboxId>>>) {
        self.buffer.set_undo_manager(self.id, shared);
    }

    /// Highlight runs for one line, or `None` if no highlighter was
    /// supplied (spec §6 `Highlight`, "optional; empty runs = default
    /// style").
    pub fn highlight_line(&self, line: usize) -> Option<Vec<HighlightRun>> {
        let highlighter = self.highlighter.as_ref()?;
        let bytes = self.buffer.document().line_bytes_for_measurement(line);
        Some(highlighter.highlight(&bytes))
    }

    /// Read-only gutter width in pixels, present only under `MARGIN` (spec
    /// §6: "the gutter's bytes and width are reported through a read-only
    /// query, not mutation").
    pub fn gutter_width(&self) -> Option<u32> {
        if !self.flags.contains(EditorFlags::MARGIN) {
            return None;
        }
        let widest_label = self.buffer.line_count().to_string();
        Some(self.metrics.measure_string(widest_label.as_bytes()))
    }

    pub fn gutter_label(&self, line: usize) -> Option<String> {
        self.flags
            .contains(EditorFlags::MARGIN)
            .then(|| (line + 1).to_string())
    }

    // -- Content access (spec §6) -------------------------------------

    pub fn get_contents(&mut self, selected_only: bool) -> String {
        self.buffer.get_contents(selected_only)
    }

    pub fn set_contents(&mut self, text: &str, now_ms: u64) -> Result<()> {
        let _guard = enter(&self.busy)?;
        self.buffer.set_contents(text, self.flags.contains(EditorFlags::MULTILINE), now_ms);
        self.after_mutation(false);
        Ok(())
    }

    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    pub fn line_length(&self, index: usize) -> usize {
        self.buffer.line_length(index)
    }

    pub fn get_selection(&self) -> (usize, usize, usize, usize) {
        self.buffer.get_selection()
    }

    pub fn set_selection(&mut self, line_a: usize, byte_a: i64, line_b: usize, byte_b: i64) -> Result<()> {
        let _guard = enter(&self.busy)?;
        self.buffer.set_selection(line_a, byte_a, line_b, byte_b);
        self.viewport.mark_all_dirty();
        self.ensure_caret_visible();
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<()> {
        let _guard = enter(&self.busy)?;
        self.buffer.select_all();
        self.viewport.mark_all_dirty();
        Ok(())
    }

    pub fn clear(&mut self, notify: bool, now_ms: u64) -> Result<()> {
        let _guard = enter(&self.busy)?;
        self.buffer.clear(now_ms);
        self.after_mutation(!notify);
        Ok(())
    }

    /// Replace the current selection with `text` (spec §6 `insert`).
    pub fn insert(&mut self, text: &str, notify: bool, now_ms: u64) -> Result<Caret> {
        let _guard = enter(&self.busy)?;
        if self.session == SessionState::Destroying {
            return Err(Error::Rejected);
        }
        let caret = self.buffer.insert(text, self.flags.contains(EditorFlags::MULTILINE), now_ms);
        self.after_mutation(!notify);
        Ok(caret)
    }

    pub fn find(&mut self, needle: &str, from_line: usize, from_byte: i64, backward: bool) -> Option<(usize, usize)> {
        let from = Caret::new(from_line, if from_byte < 0 {
            self.buffer.line_length(from_line)
        } else {
            from_byte as usize
        });
        self.buffer
            .find(needle, from, backward)
            .map(|c| (c.line, c.byte))
    }

    fn after_mutation(&mut self, silent: bool) {
        self.viewport.mark_all_dirty();
        self.ensure_caret_visible();
        if !silent {
            if let Some(observer) = self.observer.as_mut() {
                observer.on_edit();
            }
        }
    }

    // -- Caret motion (spec §4.3, §6) ----------------------------------

    pub fn move_caret(
        &mut self,
        dir: Direction,
        granularity: Granularity,
        strong_whitespace: bool,
        target: MoveTarget,
    ) -> Result<bool> {
        let _guard = enter(&self.busy)?;
        let changed = self
            .buffer
            .move_caret(dir, granularity, strong_whitespace, target, self.metrics.as_ref());
        self.viewport.mark_all_dirty();
        self.ensure_caret_visible();
        Ok(changed)
    }

    // -- Undo / redo (spec §6) ------------------------------------------

    pub fn can_undo(&self) -> bool {
        self.buffer.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.buffer.can_redo()
    }

    pub fn peek_undo(&self) -> Option<crate::buffer::UndoRecord> {
        self.buffer.peek_undo()
    }

    pub fn undo(&mut self, now_ms: u64) -> Result<bool> {
        let _guard = enter(&self.busy)?;
        let acted = self.buffer.undo(now_ms);
        if acted {
            self.after_mutation(false);
        }
        Ok(acted)
    }

    pub fn redo(&mut self, now_ms: u64) -> Result<bool> {
        let _guard = enter(&self.busy)?;
        let acted = self.buffer.redo(now_ms);
        if acted {
            self.after_mutation(false);
        }
        Ok(acted)
    }

    // -- Edit-Session Controller (spec §4.7, optional mode) --------------

    /// Enter `Editing`: snapshot contents for rollback and notify the
    /// observer. A no-op (returns `Ok(())`) if `EDIT_BASED` isn't set.
    pub fn start_edit(&mut self, select_all: bool) -> Result<()> {
        if !self.flags.contains(EditorFlags::EDIT_BASED) {
            return Ok(());
        }
        let _guard = enter(&self.busy)?;
        match self.session {
            SessionState::Editing => return Err(Error::Busy),
            SessionState::Destroying => return Err(Error::Rejected),
            SessionState::Idle => {},
        }
        self.snapshot = Some(self.buffer.get_contents(false));
        self.session = SessionState::Editing;
        if select_all {
            self.buffer.select_all();
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.on_edit_start();
        }
        Ok(())
    }

    /// Leave `Editing`. `accept == false` restores the start-of-edit
    /// snapshot through the Edit Engine before emitting `on_edit_end`, so
    /// the rollback itself is undoable like any other edit.
    ///
    /// On the accept path the observer may veto by returning `false` from
    /// `on_edit_end`: the session then stays in `Editing` and this returns
    /// `Err(Error::Rejected)`, with nothing changed. A reject is final — the
    /// snapshot has already been restored by the time the observer is asked,
    /// so its return value there is only a notification.
    pub fn end_edit(&mut self, accept: bool, now_ms: u64) -> Result<()> {
        if !self.flags.contains(EditorFlags::EDIT_BASED) || self.session != SessionState::Editing {
            return Ok(());
        }
        let _guard = enter(&self.busy)?;
        let unchanged = self.snapshot.as_deref() == Some(self.buffer.get_contents(false).as_str());

        if accept {
            if let Some(observer) = self.observer.as_mut() {
                if !observer.on_edit_end(false, unchanged) {
                    return Err(Error::Rejected);
                }
            }
        } else {
            if let Some(snapshot) = self.snapshot.take() {
                self.buffer.set_contents(&snapshot, self.flags.contains(EditorFlags::MULTILINE), now_ms);
            }
            self.buffer.select_all();
            if let Some(observer) = self.observer.as_mut() {
                observer.on_edit_end(true, unchanged);
            }
        }

        self.snapshot = None;
        self.session = SessionState::Idle;
        self.viewport.mark_all_dirty();
        Ok(())
    }

    /// Cancel any pending edit without notification and refuse all further
    /// edits (spec §4.7 "destroy").
    pub fn begin_destroying(&mut self) {
        self.session = SessionState::Destroying;
        self.snapshot = None;
    }

    /// Focus-loss notification from the host; behaves as reject when
    /// `REJECT_ON_FOCUS_LOSS` is set, otherwise as accept (spec §4.7).
    pub fn on_focus_lost(&mut self, now_ms: u64) -> Result<()> {
        if self.session != SessionState::Editing {
            return Ok(());
        }
        let reject = self.flags.contains(EditorFlags::REJECT_ON_FOCUS_LOSS);
        self.end_edit(!reject, now_ms)
    }

    // -- Keystroke mapping (spec §6 "Keystroke mapping") -----------------

    pub fn handle_key(&mut self, input: KeyInput, now_ms: u64) -> Result<KeyOutcome> {
        use Direction::{Backward, Forward};
        use Granularity::*;
        match input {
            KeyInput::Left => { self.move_caret(Backward, Single, false, MoveTarget::Both)?; },
            KeyInput::Right => { self.move_caret(Forward, Single, false, MoveTarget::Both)?; },
            KeyInput::ShiftLeft => { self.move_caret(Backward, Single, false, MoveTarget::ActiveOnly)?; },
            KeyInput::ShiftRight => { self.move_caret(Forward, Single, false, MoveTarget::ActiveOnly)?; },
            KeyInput::CtrlLeft => { self.move_caret(Backward, Word, false, MoveTarget::Both)?; },
            KeyInput::CtrlRight => { self.move_caret(Forward, Word, false, MoveTarget::Both)?; },
            KeyInput::Home => { self.move_caret(Backward, Line, false, MoveTarget::Both)?; },
            KeyInput::End => { self.move_caret(Forward, Line, false, MoveTarget::Both)?; },
            KeyInput::CtrlHome => { self.move_caret(Backward, Document, false, MoveTarget::Both)?; },
            KeyInput::CtrlEnd => { self.move_caret(Forward, Document, false, MoveTarget::Both)?; },
            KeyInput::Up => { self.move_caret(Backward, Vertical, false, MoveTarget::Both)?; },
            KeyInput::Down => { self.move_caret(Forward, Vertical, false, MoveTarget::Both)?; },
            KeyInput::PageUp => {
                for _ in 0..PAGE_STEP {
                    self.move_caret(Backward, Vertical, false, MoveTarget::Both)?;
                }
            },
            KeyInput::PageDown => {
                for _ in 0..PAGE_STEP {
                    self.move_caret(Forward, Vertical, false, MoveTarget::Both)?;
                }
            },
            KeyInput::Backspace { word } => self.delete_one(Backward, word, now_ms)?,
            KeyInput::Delete { word } => self.delete_one(Forward, word, now_ms)?,
            KeyInput::Tab => {
                if !self.flags.contains(EditorFlags::ALLOW_TABS) {
                    return Ok(KeyOutcome::Forward);
                }
                self.insert("\t", true, now_ms)?;
            },
            KeyInput::Char(c) => {
                let text = self.substitute_smart_quote(c);
                self.insert(&text, true, now_ms)?;
            },
            KeyInput::Enter => {
                if self.flags.contains(EditorFlags::MULTILINE) {
                    self.insert_newline_with_indent(now_ms)?;
                } else if self.flags.contains(EditorFlags::EDIT_BASED) {
                    self.end_edit(true, now_ms)?;
                } else {
                    return Ok(KeyOutcome::Forward);
                }
            },
            KeyInput::Escape => {
                if self.flags.contains(EditorFlags::EDIT_BASED) {
                    self.end_edit(false, now_ms)?;
                } else {
                    return Ok(KeyOutcome::Forward);
                }
            },
        }
        Ok(KeyOutcome::Handled)
    }

    fn delete_one(&mut self, dir: Direction, word: bool, now_ms: u64) -> Result<()> {
        let _guard = enter(&self.busy)?;
        if self.buffer.carets().is_empty() {
            let granularity = if word { Granularity::Word } else { Granularity::Single };
            self.buffer
                .move_caret(dir, granularity, false, MoveTarget::ActiveOnly, self.metrics.as_ref());
        }
        self.buffer.insert("", self.flags.contains(EditorFlags::MULTILINE), now_ms);
        self.after_mutation(false);
        Ok(())
    }

    fn insert_newline_with_indent(&mut self, now_ms: u64) -> Result<()> {
        let _guard = enter(&self.busy)?;
        let line = self.buffer.carets().active.line;
        let bytes = self.buffer.document().line_bytes_for_measurement(line);
        let indent_len = bytes.iter().take_while(|&&b| b == b'\t').count();
        let mut text = String::with_capacity(indent_len + 1);
        text.push('\n');
        for _ in 0..indent_len {
            text.push('\t');
        }
        self.buffer.insert(&text, true, now_ms);
        self.after_mutation(false);
        Ok(())
    }

    /// Spec §6 "Smart-quote substitution": an ASCII quote becomes a curly
    /// one, opening vs. closing chosen by what precedes the caret.
    fn substitute_smart_quote(&self, c: char) -> String {
        if !self.flags.contains(EditorFlags::SMART_QUOTES) || (c != '"' && c != '\'') {
            return c.to_string();
        }
        let caret = self.buffer.carets().active;
        let bytes = self.buffer.document().line_bytes_for_measurement(caret.line);
        let opening = caret.byte == 0
            || bytes[..caret.byte]
                .last()
                .map(|&b| b == b' ' || b == b'\t')
                .unwrap_or(true);
        let quote = if c == '"' {
            if opening { '\u{201C}' } else { '\u{201D}' }
        } else if opening {
            '\u{2018}'
        } else {
            '\u{2019}'
        };
        quote.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util;

    struct FixedWidthMetrics;
    impl TextMetrics for FixedWidthMetrics {
        fn measure_string(&self, bytes: &[u8]) -> u32 {
            bytes.len() as u32 * 8
        }
        fn character_at_x(&self, bytes: &[u8], x: u32, _rounding: crate::measurement::XRounding) -> usize {
            ((x + 4) / 8).min(bytes.len() as u32) as usize
        }
    }

    fn editor(flags: EditorFlags) -> Editor {
        Editor::new(flags, 16, Box::new(FixedWidthMetrics), None, None)
    }

    #[test]
    fn typing_inserts_and_moves_the_caret() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE);
        ed.handle_key(KeyInput::Char('a'), 0).unwrap();
        ed.handle_key(KeyInput::Char('b'), 1).unwrap();
        assert_eq!("ab", ed.get_contents(false));
        assert_eq!((0, 2, 0, 2), ed.get_selection());
    }

    #[test]
    fn backspace_with_empty_selection_deletes_one_character() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE);
        ed.insert("abc", true, 0).unwrap();
        ed.handle_key(KeyInput::Backspace { word: false }, 1).unwrap();
        assert_eq!("ab", ed.get_contents(false));
    }

    #[test]
    fn adjacent_backspaces_within_window_undo_as_one_step() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE);
        ed.insert("abc", true, 0).unwrap();
        ed.handle_key(KeyInput::Backspace { word: false }, 100).unwrap();
        ed.handle_key(KeyInput::Backspace { word: false }, 200).unwrap();
        assert_eq!("a", ed.get_contents(false));
        ed.undo(300).unwrap();
        assert_eq!("abc", ed.get_contents(false));
    }

    #[test]
    fn tab_is_forwarded_when_tabs_are_not_allowed() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE);
        let outcome = ed.handle_key(KeyInput::Tab, 0).unwrap();
        assert_eq!(KeyOutcome::Forward, outcome);
        assert_eq!("", ed.get_contents(false));
    }

    #[test]
    fn tab_is_accepted_when_allowed() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE | EditorFlags::ALLOW_TABS);
        let outcome = ed.handle_key(KeyInput::Tab, 0).unwrap();
        assert_eq!(KeyOutcome::Handled, outcome);
        assert_eq!("\t", ed.get_contents(false));
    }

    #[test]
    fn enter_in_multiline_mode_copies_leading_tab_indentation() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE | EditorFlags::ALLOW_TABS);
        ed.insert("\tfoo", true, 0).unwrap();
        ed.handle_key(KeyInput::Enter, 1).unwrap();
        ed.handle_key(KeyInput::Char('x'), 2).unwrap();
        assert_eq!("\tfoo\n\tx", ed.get_contents(false));
    }

    #[test]
    fn escape_in_edit_based_mode_rejects_and_restores_the_snapshot() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::EDIT_BASED);
        ed.insert("hello", true, 0).unwrap();
        ed.start_edit(false).unwrap();
        ed.insert("goodbye", true, 1).unwrap();
        ed.handle_key(KeyInput::Escape, 2).unwrap();
        assert_eq!("hello", ed.get_contents(false));
    }

    struct VetoingObserver;
    impl EditorObserver for VetoingObserver {
        fn on_edit_end(&mut self, rejected: bool, _unchanged: bool) -> bool {
            !rejected
        }
    }

    #[test]
    fn observer_veto_keeps_the_session_editing_on_accept() {
        test_util::setup_test();
        let mut ed = Editor::new(
            EditorFlags::EDIT_BASED,
            16,
            Box::new(FixedWidthMetrics),
            None,
            Some(Box::new(VetoingObserver)),
        );
        ed.insert("hello", true, 0).unwrap();
        ed.start_edit(false).unwrap();
        ed.insert("goodbye", true, 1).unwrap();
        assert!(matches!(ed.end_edit(true, 2), Err(Error::Rejected)));
        assert_eq!("goodbye", ed.get_contents(false));
    }

    #[test]
    fn smart_quotes_pick_direction_from_context() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE | EditorFlags::SMART_QUOTES);
        ed.handle_key(KeyInput::Char('"'), 0).unwrap();
        ed.handle_key(KeyInput::Char('a'), 1).unwrap();
        ed.handle_key(KeyInput::Char('"'), 2).unwrap();
        assert_eq!("\u{201C}a\u{201D}", ed.get_contents(false));
    }

    #[test]
    fn reentrant_mutation_is_rejected_while_the_busy_guard_is_held() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE);
        ed.busy.set(true);
        assert!(matches!(ed.insert("x", true, 0), Err(Error::Busy)));
        ed.busy.set(false);
        assert!(ed.insert("x", true, 0).is_ok());
    }

    #[test]
    fn gutter_is_none_without_the_margin_flag() {
        test_util::setup_test();
        let ed = editor(EditorFlags::MULTILINE);
        assert_eq!(None, ed.gutter_width());
        assert_eq!(None, ed.gutter_label(0));
    }

    #[test]
    fn gutter_reports_width_and_one_based_labels_when_enabled() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE | EditorFlags::MARGIN);
        ed.insert("a\nb\nc", true, 0).unwrap();
        assert_eq!(Some(8), ed.gutter_width());
        assert_eq!(Some("1".to_string()), ed.gutter_label(0));
        assert_eq!(Some("3".to_string()), ed.gutter_label(2));
    }

    #[test]
    fn page_down_moves_vertically_by_ten_lines() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE);
        let text: String = (0..20).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        ed.insert(&text, true, 0).unwrap();
        ed.handle_key(KeyInput::CtrlHome, 1).unwrap();
        ed.handle_key(KeyInput::PageDown, 2).unwrap();
        assert_eq!((10, 0, 10, 0), ed.get_selection());
    }

    #[test]
    fn ctrl_home_and_end_jump_to_document_boundaries() {
        test_util::setup_test();
        let mut ed = editor(EditorFlags::MULTILINE);
        ed.insert("one\ntwo\nthree", true, 0).unwrap();
        ed.handle_key(KeyInput::CtrlHome, 1).unwrap();
        assert_eq!((0, 0, 0, 0), ed.get_selection());
        ed.handle_key(KeyInput::CtrlEnd, 2).unwrap();
        assert_eq!((2, 5, 2, 5), ed.get_selection());
    }
}
