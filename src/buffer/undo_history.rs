//! The Undo Manager (spec §4.5): a stack of reversible [`UndoRecord`]s with
//! time-stamped coalescing of adjacent typing, explicit group brackets, and
//! redo-branch truncation.
//!
//! Parameterized over an owner id `Id` so one manager can be shared by
//! several editors (spec §5: "the undo stack is owned exclusively by one
//! UndoManager, which may be shared by multiple textboxes... each record
//! carries a textbox identifier so replay routes to the correct one").
//! A single-editor `UndoManager<()>` is the common case.

use crate::region::CaretPair;

/// Coalescing window: a new edit merges into the previous one if it arrives
/// within this many milliseconds and the two describe adjacent typing.
pub const COALESCE_WINDOW_MS: u64 = 500;

/// A single reversible edit, as described in spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRecord {
    pub carets_before: CaretPair,
    pub carets_after: CaretPair,
    pub replaced_bytes: Vec<u8>,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone)]
struct StackEntry<Id> {
    owner: Id,
    record: UndoRecord,
    group: Option<u64>,
}

/// Stack of reversible records plus the group-bracket and coalescing
/// bookkeeping described in spec §4.5.
#[derive(Debug)]
pub struct UndoManager<Id = ()> {
    undo_stack: Vec<StackEntry<Id>>,
    redo_stack: Vec<StackEntry<Id>>,
    next_group_id: u64,
    group_depth: u32,
    current_group: Option<u64>,
}

impl<Id> Default for UndoManager<Id> {
    fn default() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            next_group_id: 0,
            group_depth: 0,
            current_group: None,
        }
    }
}

impl<Id: Copy + PartialEq + std::fmt::Debug> UndoManager<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a batch of edits that should undo atomically as one unit.
    /// Nestable: only the outermost `begin_group`/`end_group` pair defines
    /// the boundary.
    pub fn begin_group(&mut self) {
        if self.group_depth == 0 {
            self.next_group_id += 1;
            self.current_group = Some(self.next_group_id);
        }
        self.group_depth += 1;
    }

    pub fn end_group(&mut self) {
        self.group_depth = self.group_depth.saturating_sub(1);
        if self.group_depth == 0 {
            self.current_group = None;
        }
    }

    /// The top of the undo stack, without popping it.
    pub fn peek(&self) -> Option<&UndoRecord> {
        self.undo_stack.last().map(|e| &e.record)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Push a new record, merging it into the top of the stack when it
    /// describes adjacent typing within the coalescing window. Always
    /// truncates the redo stack (a fresh edit invalidates any redo branch).
    #[tracing::instrument(skip(self, record))]
    pub fn push(&mut self, owner: Id, record: UndoRecord) {
        self.redo_stack.clear();
        let group = self.current_group;

        if let Some(top) = self.undo_stack.last_mut() {
            if top.owner == owner && top.group == group && should_coalesce(&top.record, &record) {
                coalesce(&mut top.record, record);
                tracing::trace!("coalesced undo record into previous entry");
                return;
            }
        }

        self.undo_stack.push(StackEntry {
            owner,
            record,
            group,
        });
    }

    /// Pop the top record (and, if it belongs to a group, every other
    /// record sharing that group id) and hand the caller back the records
    /// to replay, oldest first, together with their owners.
    ///
    /// The caller is expected to re-invoke the edit engine for each
    /// `(owner, record)` pair with `record.carets_before` installed and
    /// `record.replaced_bytes` as the insertion, then push whatever new
    /// record that produces onto the redo stack via [`Self::push_redo`].
    #[tracing::instrument(skip(self))]
    pub fn begin_undo(&mut self) -> (Option<u64>, Vec<(Id, UndoRecord)>) {
        let Some(top) = self.undo_stack.pop() else {
            return (None, Vec::new());
        };
        let group = top.group;
        let mut batch = vec![top];
        while group.is_some() && self.undo_stack.last().map(|e| e.group) == Some(group) {
            batch.push(self.undo_stack.pop().unwrap());
        }
        (group, batch.into_iter().map(|e| (e.owner, e.record)).collect())
    }

    /// Symmetric to [`Self::begin_undo`], for redo.
    #[tracing::instrument(skip(self))]
    pub fn begin_redo(&mut self) -> (Option<u64>, Vec<(Id, UndoRecord)>) {
        let Some(top) = self.redo_stack.pop() else {
            return (None, Vec::new());
        };
        let group = top.group;
        let mut batch = vec![top];
        while group.is_some() && self.redo_stack.last().map(|e| e.group) == Some(group) {
            batch.push(self.redo_stack.pop().unwrap());
        }
        (group, batch.into_iter().map(|e| (e.owner, e.record)).collect())
    }

    /// Record produced by replaying an undo step; pushed onto the redo
    /// stack so that redo can reverse it again.
    pub fn push_redo(&mut self, owner: Id, record: UndoRecord, group: Option<u64>) {
        self.redo_stack.push(StackEntry {
            owner,
            record,
            group,
        });
    }

    /// Symmetric to [`Self::push_redo`]: the record produced by replaying a
    /// redo step, pushed back onto the undo stack. Unlike [`Self::push`],
    /// never coalesces and never touches the redo stack — the caller has
    /// already popped the entry this replaces out of it.
    pub fn push_undo_raw(&mut self, owner: Id, record: UndoRecord, group: Option<u64>) {
        self.undo_stack.push(StackEntry {
            owner,
            record,
            group,
        });
    }
}

/// Two edits may coalesce if they're both edit records within the time
/// window and describe adjacent typing or adjacent deleting.
fn should_coalesce(top: &UndoRecord, new: &UndoRecord) -> bool {
    if new.timestamp_ms < top.timestamp_ms {
        return false;
    }
    if new.timestamp_ms - top.timestamp_ms >= COALESCE_WINDOW_MS {
        return false;
    }
    let both_inserts = top.replaced_bytes.is_empty() && new.replaced_bytes.is_empty();
    if both_inserts {
        return top.carets_after == new.carets_before;
    }
    let both_deletes_backwards = !top.replaced_bytes.is_empty()
        && !new.replaced_bytes.is_empty()
        && top.carets_after.is_empty()
        && new.carets_after.is_empty();
    if both_deletes_backwards {
        // Adjacent backspaces: the caret the first deletion left behind
        // must equal the far edge of the second deletion's pre-expansion
        // selection — i.e. where the caret stood just before this
        // backspace grew it into a one-unit range.
        return top.carets_after == CaretPair::cursor(new.carets_before.ordered().1);
    }
    false
}

fn coalesce(top: &mut UndoRecord, new: UndoRecord) {
    if !new.replaced_bytes.is_empty() {
        // Adjacent backspaces: deleted bytes accumulate in document order,
        // i.e. the newly-deleted (earlier, since backspacing) bytes go first.
        let mut combined = new.replaced_bytes;
        combined.extend_from_slice(&top.replaced_bytes);
        top.replaced_bytes = combined;
        top.carets_before = new.carets_before;
    }
    top.carets_after = new.carets_after;
    top.timestamp_ms = new.timestamp_ms;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util;
    use crate::region::Caret;

    fn rec(before: (usize, usize), after: (usize, usize), replaced: &[u8], ts: u64) -> UndoRecord {
        UndoRecord {
            carets_before: CaretPair::cursor(Caret::new(before.0, before.1)),
            carets_after: CaretPair::cursor(Caret::new(after.0, after.1)),
            replaced_bytes: replaced.to_vec(),
            timestamp_ms: ts,
        }
    }

    #[test]
    fn adjacent_inserts_within_window_coalesce() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        mgr.push((), rec((0, 0), (0, 1), b"", 0));
        mgr.push((), rec((0, 1), (0, 2), b"", 100));
        mgr.push((), rec((0, 2), (0, 3), b"", 200));
        assert_eq!(1, mgr.undo_stack.len());
        assert_eq!(0, mgr.peek().unwrap().carets_before.active.byte);
        assert_eq!(3, mgr.peek().unwrap().carets_after.active.byte);
    }

    #[test]
    fn inserts_outside_window_do_not_coalesce() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        mgr.push((), rec((0, 0), (0, 1), b"", 0));
        mgr.push((), rec((0, 1), (0, 2), b"", 600));
        assert_eq!(2, mgr.undo_stack.len());
    }

    #[test]
    fn non_adjacent_carets_do_not_coalesce() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        mgr.push((), rec((0, 0), (0, 1), b"", 0));
        mgr.push((), rec((5, 0), (5, 1), b"", 50));
        assert_eq!(2, mgr.undo_stack.len());
    }

    /// A record as `delete_one` actually produces: `carets_before` is the
    /// expanded one-unit selection (anchor at the pre-expansion caret, active
    /// one unit further), `carets_after` is the collapsed post-delete caret.
    fn del_rec(before: ((usize, usize), (usize, usize)), after: (usize, usize), replaced: &[u8], ts: u64) -> UndoRecord {
        UndoRecord {
            carets_before: CaretPair::new(
                Caret::new(before.0.0, before.0.1),
                Caret::new(before.1.0, before.1.1),
            ),
            carets_after: CaretPair::cursor(Caret::new(after.0, after.1)),
            replaced_bytes: replaced.to_vec(),
            timestamp_ms: ts,
        }
    }

    #[test]
    fn adjacent_backspaces_within_window_coalesce() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        // Backspacing "abc" from (0,3) twice: first removes 'c' leaving the
        // caret at (0,2), second removes 'b' leaving it at (0,1).
        mgr.push((), del_rec(((0, 3), (0, 2)), (0, 2), b"c", 0));
        mgr.push((), del_rec(((0, 2), (0, 1)), (0, 1), b"b", 100));
        assert_eq!(1, mgr.undo_stack.len());
        assert_eq!(b"bc", mgr.peek().unwrap().replaced_bytes.as_slice());
        assert_eq!(Caret::new(0, 1), mgr.peek().unwrap().carets_after.active);
    }

    #[test]
    fn non_adjacent_backspaces_do_not_coalesce() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        mgr.push((), del_rec(((0, 3), (0, 2)), (0, 2), b"c", 0));
        // Caret jumped elsewhere before backspacing again: not adjacent.
        mgr.push((), del_rec(((5, 1), (5, 0)), (5, 0), b"x", 50));
        assert_eq!(2, mgr.undo_stack.len());
    }

    #[test]
    fn group_boundary_blocks_merge_across_groups() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        mgr.begin_group();
        mgr.push((), rec((0, 0), (0, 1), b"", 0));
        mgr.end_group();
        mgr.begin_group();
        mgr.push((), rec((0, 1), (0, 2), b"", 10));
        mgr.end_group();
        assert_eq!(2, mgr.undo_stack.len());
    }

    #[test]
    fn begin_undo_pops_whole_group_atomically() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        mgr.begin_group();
        mgr.push((), rec((0, 0), (0, 1), b"", 0));
        mgr.push((), rec((9, 0), (9, 1), b"", 700));
        mgr.end_group();
        let (_, batch) = mgr.begin_undo();
        assert_eq!(2, batch.len());
        assert!(mgr.undo_stack.is_empty());
    }

    #[test]
    fn push_clears_redo_stack() {
        test_util::setup_test();
        let mut mgr: UndoManager = UndoManager::new();
        mgr.push((), rec((0, 0), (0, 1), b"", 0));
        mgr.begin_undo();
        mgr.push_redo((), rec((0, 1), (0, 0), b"x", 1), None);
        assert!(mgr.can_redo());
        mgr.push((), rec((0, 0), (0, 1), b"", 2));
        assert!(!mgr.can_redo());
    }
}
