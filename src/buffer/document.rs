//! The Document Buffer and Active-Line Cache (spec §4.2), combined: both
//! halves of the "global byte buffer + one checked-out line" contract live
//! together here, since check-in/check-out must coordinate the byte buffer
//! and the line index atomically.

use std::borrow::Cow;

use super::active_line::ActiveLine;
use super::line_index::{LineIndex, LineRecord};
use crate::error::{Error, Result};

/// Longest permitted line, in bytes. The spec requires "at least 2^31
/// bytes"; this is comfortably past that while staying well short of
/// `usize::MAX` so the delta arithmetic in check-in never overflows on
/// 32-bit targets.
pub const MAX_LINE_BYTES: usize = 1 << 31;

/// Owns the concatenated line contents (no separators) and the line index
/// describing how those bytes are split into lines.
#[derive(Debug)]
pub struct Document {
    bytes: Vec<u8>,
    lines: LineIndex,
    active: Option<ActiveLine>,
}

impl Document {
    pub fn new(default_line_height: u32) -> Self {
        Self {
            bytes: Vec::new(),
            lines: LineIndex::new(default_line_height),
            active: None,
        }
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut LineIndex {
        &mut self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.line_count()
    }

    pub fn line_length(&self, index: usize) -> usize {
        match &self.active {
            Some(active) if active.index == index => active.scratch.len(),
            _ => self.lines.get(index).byte_length,
        }
    }

    /// Bytes of a single line, read discipline respected: if it is the
    /// active line, read from the scratch buffer; otherwise read straight
    /// out of the committed buffer.
    pub fn line_bytes(&self, index: usize) -> Cow<'_, [u8]> {
        match &self.active {
            Some(active) if active.index == index => Cow::Borrowed(&active.scratch),
            _ => {
                let record = self.lines.get(index);
                Cow::Borrowed(&self.bytes[record.byte_range()])
            },
        }
    }

    /// Owned copy of a line's bytes, for callers (the viewport) that need
    /// to hold them across a call that would otherwise borrow `self`
    /// mutably, such as feeding a measurement back into the line index.
    pub fn line_bytes_for_measurement(&self, index: usize) -> Vec<u8> {
        self.line_bytes(index).into_owned()
    }

    /// Whether a line is currently checked out.
    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    /// Check out `line_index` into the scratch buffer, checking in whatever
    /// was previously active first. A no-op if `line_index` is already
    /// active.
    #[tracing::instrument(skip(self))]
    pub fn checkout(&mut self, line_index: usize) -> Result<()> {
        if self.active.as_ref().map(|a| a.index) == Some(line_index) {
            return Ok(());
        }
        self.check_in();

        let record = self.lines.get(line_index);
        if record.byte_length > MAX_LINE_BYTES {
            return Err(Error::InvariantViolation(format!(
                "line {line_index} exceeds the maximum line length"
            )));
        }
        let bytes = &self.bytes[record.byte_range()];
        self.active = Some(ActiveLine::new(line_index, bytes));
        tracing::trace!(line_index, "checked out active line");
        Ok(())
    }

    /// Repair the global buffer with the scratch contents of the active
    /// line, if any, moving the tail of the buffer by the size delta and
    /// propagating offsets to subsequent lines. No-op if no line is active.
    #[tracing::instrument(skip(self))]
    pub fn check_in(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let delta = active.delta();
        let record = *self.lines.get(active.index);
        let old_end = record.byte_offset + active.old_length;
        let original_len = self.bytes.len();
        let tail_len = original_len - old_end;
        let new_end = (old_end as isize + delta) as usize;
        let new_total = (original_len as isize + delta) as usize;

        // Overlapping move of the tail to its new position. Order matters:
        // grow before shifting right, shrink after shifting left.
        if delta > 0 {
            self.bytes.resize(new_total, 0);
        }
        if tail_len > 0 {
            self.bytes.copy_within(old_end..old_end + tail_len, new_end);
        }
        if delta < 0 {
            self.bytes.truncate(new_total);
        }

        self.bytes[record.byte_offset..record.byte_offset + active.scratch.len()]
            .copy_from_slice(&active.scratch);

        self.lines.set_byte_length(active.index, active.scratch.len());
        self.lines
            .propagate_offset_delta(active.index + 1, delta);
        tracing::trace!(line = active.index, delta, "checked in active line");
    }

    /// All committed bytes, forcing a check-in first. Use for reads that
    /// span arbitrary ranges of the document (serialization, find,
    /// cross-line delete).
    pub fn checked_in_bytes(&mut self) -> &[u8] {
        self.check_in();
        &self.bytes
    }

    pub(crate) fn bytes_mut_checked_in(&mut self) -> &mut Vec<u8> {
        self.check_in();
        &mut self.bytes
    }

    /// Mutable access to the active line's scratch buffer. Checks the line
    /// out first if necessary.
    pub(crate) fn scratch_mut(&mut self, line_index: usize) -> Result<&mut Vec<u8>> {
        self.checkout(line_index)?;
        Ok(&mut self.active.as_mut().unwrap().scratch)
    }

    /// Insert `records` at `at` (already check-in'd state required).
    pub(crate) fn insert_line_records(&mut self, at: usize, records: Vec<LineRecord>) {
        self.lines.insert_lines(at, records);
    }

    pub(crate) fn delete_line_records(&mut self, at: usize, count: usize) {
        self.lines.delete_lines(at, count);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util;

    #[test]
    fn new_document_is_one_empty_line() {
        test_util::setup_test();
        let doc = Document::new(16);
        assert_eq!(1, doc.line_count());
        assert_eq!(0, doc.line_length(0));
    }

    #[test]
    fn checkout_then_check_in_grows_the_buffer() {
        test_util::setup_test();
        let mut doc = Document::new(16);
        let scratch = doc.scratch_mut(0).unwrap();
        scratch.extend_from_slice(b"hello");
        doc.check_in();
        assert_eq!(b"hello", doc.checked_in_bytes());
        assert_eq!(5, doc.lines().get(0).byte_length);
    }

    #[test]
    fn checkout_then_check_in_shrinks_the_buffer() {
        test_util::setup_test();
        let mut doc = Document::new(16);
        doc.scratch_mut(0).unwrap().extend_from_slice(b"hello");
        doc.check_in();
        let scratch = doc.scratch_mut(0).unwrap();
        scratch.truncate(2);
        doc.check_in();
        assert_eq!(b"he", doc.checked_in_bytes());
    }

    #[test]
    fn checkout_preserves_bytes_after_active_line() {
        test_util::setup_test();
        let mut doc = Document::new(16);
        doc.scratch_mut(0).unwrap().extend_from_slice(b"abc");
        doc.check_in();
        doc.insert_line_records(
            1,
            vec![LineRecord {
                byte_offset: 3,
                byte_length: 3,
                pixel_width: None,
                pixel_height: 16,
                y_position: 0,
            }],
        );
        doc.bytes_mut_checked_in().extend_from_slice(b"def");

        // check out line 0 and grow it; line 1's bytes must remain intact.
        doc.scratch_mut(0).unwrap().extend_from_slice(b"XYZ");
        doc.check_in();
        assert_eq!(b"abcXYZdef", doc.checked_in_bytes());
        assert_eq!(6, doc.lines().get(1).byte_offset);
    }
}
