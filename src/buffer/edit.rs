//! The Edit Engine (spec §4.4): the single `replace_selection` primitive
//! every mutation (typed character, backspace, paste, programmatic
//! `insert`) funnels through, plus the handful of pure read accessors that
//! don't need the caret/undo machinery around them.
//!
//! Two paths, chosen by whether the edit can stay on one line:
//!
//! - same-line, no embedded `\n` in the replacement: stays entirely inside
//!   the active-line cache — checkout, splice the scratch buffer, check in.
//!   This is the common case (ordinary typing) and the one the active-line
//!   cache in [`super::document`] exists to make cheap.
//! - anything spanning more than one line, either because the selection
//!   does or because the replacement text contains a newline: forces a
//!   check-in and splices the flat byte buffer directly, then rebuilds the
//!   line records for the affected span from scratch. Rarer (multi-line
//!   paste, multi-line delete), and not worth optimizing for in-place.
//!
//! Grounded in the original textbox's `EsTextboxInsert`: it too deletes the
//! old selection before inserting the new text, and treats a selection or
//! replacement crossing a line boundary as a structurally different case
//! from same-line editing.

use super::document::Document;
use super::line_index::LineRecord;
use crate::region::{Caret, CaretPair};

/// Everything the caller (the Buffer facade) needs to build an
/// [`super::undo_history::UndoRecord`] and place the caret after an edit.
pub(crate) struct EditOutcome {
    pub carets_after: CaretPair,
    pub replaced_bytes: Vec<u8>,
}

/// Replace the bytes spanned by `carets` with `replacement`. `replacement`
/// may contain `\n`, splitting it across new lines; an empty `replacement`
/// is a pure deletion. Returns the collapsed caret after the edit and the
/// bytes that were removed (for undo), with any joined lines represented by
/// an embedded `\n` — the same convention `replacement` itself uses.
pub(crate) fn replace_selection(
    doc: &mut Document,
    carets: CaretPair,
    replacement: &[u8],
) -> EditOutcome {
    let (from, to) = carets.ordered();
    let replaced_bytes = capture_range(doc, from, to);

    let caret_after = if from.line == to.line && !replacement.contains(&b'\n') {
        same_line_edit(doc, from, to, replacement)
    } else {
        cross_line_edit(doc, from, to, replacement)
    };

    EditOutcome {
        carets_after: CaretPair::cursor(caret_after),
        replaced_bytes,
    }
}

/// The bytes currently occupying `[from, to)`, with lines joined by `\n`.
fn capture_range(doc: &Document, from: Caret, to: Caret) -> Vec<u8> {
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

fn same_line_edit(doc: &mut Document, from: Caret, to: Caret, text: &[u8]) -> Caret {
    let scratch = doc.scratch_mut(from.line).expect("from.line is in range");
    scratch.splice(from.byte..to.byte, text.iter().copied());
    let new_byte = from.byte + text.len();
    doc.check_in();
    Caret::new(from.line, new_byte)
}

/// Splice the flat buffer directly and rebuild line records for the
/// affected span. Handles cross-line deletes, cross-line pastes, and
/// same-line insertions that themselves contain a newline.
///
/// The `\n` bytes in `replacement` are separators, not content: they never
/// land in the flat buffer (lines store no separator bytes of their own),
/// only in how the affected span gets carved back into line records.
fn cross_line_edit(doc: &mut Document, from: Caret, to: Caret, replacement: &[u8]) -> Caret {
    let from_offset = doc.lines().get(from.line).byte_offset;
    let to_offset = doc.lines().get(to.line).byte_offset;
    let to_line_len = doc.lines().get(to.line).byte_length;
    let default_height = doc.lines().default_line_height();

    let head_len = from.byte;
    let tail_len = to_line_len - to.byte;
    let start = from_offset + from.byte;
    let end = to_offset + to.byte;

    let segments: Vec<&[u8]> = replacement.split(|&b| b == b'\n').collect();
    let stripped: Vec<u8> = segments.concat();

    let bytes = doc.bytes_mut_checked_in();
    bytes.splice(start..end, stripped.iter().copied());

    let segment_count = segments.len();
    let mut new_records = Vec::with_capacity(segment_count);
    let mut offset = from_offset;
    for (i, segment) in segments.iter().enumerate() {
        let mut len = segment.len();
        if i == 0 {
            len += head_len;
        }
        if i == segment_count - 1 {
            len += tail_len;
        }
        new_records.push(LineRecord {
            byte_offset: offset,
            byte_length: len,
            pixel_width: None,
            pixel_height: default_height,
            y_position: 0,
        });
        offset += len;
    }

    let old_count = to.line - from.line + 1;
    let delta = stripped.len() as isize - (end - start) as isize;

    doc.delete_line_records(from.line, old_count);
    doc.insert_line_records(from.line, new_records);
    doc.lines_mut()
        .propagate_offset_delta(from.line + segment_count, delta);
    doc.lines_mut().recompute_y_positions(from.line);

    let caret_byte = if segment_count == 1 {
        head_len + segments[0].len()
    } else {
        segments[segment_count - 1].len()
    };
    Caret::new(from.line + segment_count - 1, caret_byte)
}

/// The full document text, lines joined by `\n`. Forces a check-in.
pub(crate) fn get_contents(doc: &mut Document) -> Vec<u8> {
    doc.check_in();
    let mut out = Vec::with_capacity(doc.checked_in_bytes().len() + doc.line_count());
    for line in 0..doc.line_count() {
        if line > 0 {
            out.push(b'\n');
        }
        out.extend_from_slice(&doc.line_bytes(line));
    }
    out
}

/// Line-local substring search starting at `from`, scanning forward one
/// line at a time. Does not match a needle that straddles a line boundary —
/// an explicit simplification, since the document has no addressable
/// newline byte to match against.
pub(crate) fn find(doc: &Document, needle: &[u8], from: Caret) -> Option<Caret> {
    if needle.is_empty() {
        return None;
    }
    for line in from.line..doc.line_count() {
        let bytes = doc.line_bytes(line);
        let search_start = if line == from.line { from.byte } else { 0 };
        if search_start > bytes.len() {
            continue;
        }
        if let Some(pos) = find_subslice(&bytes[search_start..], needle) {
            return Some(Caret::new(line, search_start + pos));
        }
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Line-local substring search scanning backward from `from`, one line at a
/// time. Symmetric to [`find`]: same single-line limitation, and looks for
/// the rightmost match on each line so repeated backward searches walk
/// through overlapping matches in document order.
pub(crate) fn find_backward(doc: &Document, needle: &[u8], from: Caret) -> Option<Caret> {
    if needle.is_empty() {
        return None;
    }
    for line in (0..=from.line).rev() {
        let bytes = doc.line_bytes(line);
        let search_end = if line == from.line {
            from.byte.min(bytes.len())
        } else {
            bytes.len()
        };
        if let Some(pos) = rfind_subslice(&bytes[..search_end], needle) {
            return Some(Caret::new(line, pos));
        }
    }
    None
}

fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util;

    fn doc_from(lines: &[&str]) -> Document {
        let mut doc = Document::new(16);
        for (i, text) in lines.iter().enumerate() {
            if i > 0 {
                doc.insert_line_records(
                    i,
                    vec![LineRecord {
                        byte_offset: doc.checked_in_bytes().len(),
                        byte_length: 0,
                        pixel_width: None,
                        pixel_height: 16,
                        y_position: 0,
                    }],
                );
            }
            doc.scratch_mut(i).unwrap().extend_from_slice(text.as_bytes());
            doc.check_in();
        }
        doc
    }

    #[test]
    fn typing_stays_on_one_line() {
        test_util::setup_test();
        let mut doc = doc_from(&["helo"]);
        let carets = CaretPair::cursor(Caret::new(0, 2));
        let outcome = replace_selection(&mut doc, carets, b"l");
        assert_eq!(Caret::new(0, 3), outcome.carets_after.active);
        assert_eq!(b"", outcome.replaced_bytes.as_slice());
        assert_eq!(b"hello", &*doc.line_bytes(0));
        assert_eq!(1, doc.line_count());
    }

    #[test]
    fn backspace_across_a_selection_records_the_deleted_bytes() {
        test_util::setup_test();
        let mut doc = doc_from(&["hello world"]);
        let carets = CaretPair::new(Caret::new(0, 5), Caret::new(0, 11));
        let outcome = replace_selection(&mut doc, carets, b"");
        assert_eq!(b" world", outcome.replaced_bytes.as_slice());
        assert_eq!(b"hello", &*doc.line_bytes(0));
    }

    #[test]
    fn deleting_a_newline_joins_two_lines() {
        test_util::setup_test();
        // Simulates pressing Delete at the end of "foo": the caller expands
        // the bare caret into a range spanning the line boundary before
        // calling replace_selection.
        let mut doc = doc_from(&["foo", "bar"]);
        let carets = CaretPair::new(Caret::new(0, 3), Caret::new(1, 0));
        let outcome = replace_selection(&mut doc, carets, b"");
        assert_eq!(1, doc.line_count());
        assert_eq!(b"foobar", &*doc.line_bytes(0));
        assert_eq!(Caret::new(0, 3), outcome.carets_after.active);
        assert_eq!(b"\n", outcome.replaced_bytes.as_slice());
    }

    #[test]
    fn pasting_a_newline_splits_a_line_in_two() {
        test_util::setup_test();
        let mut doc = doc_from(&["foobar"]);
        let carets = CaretPair::cursor(Caret::new(0, 3));
        let outcome = replace_selection(&mut doc, carets, b"\n");
        assert_eq!(2, doc.line_count());
        assert_eq!(b"foo", &*doc.line_bytes(0));
        assert_eq!(b"bar", &*doc.line_bytes(1));
        assert_eq!(Caret::new(1, 0), outcome.carets_after.active);
    }

    #[test]
    fn pasting_multiline_text_spanning_a_selection() {
        test_util::setup_test();
        let mut doc = doc_from(&["one two", "three four"]);
        let carets = CaretPair::new(Caret::new(0, 4), Caret::new(1, 5));
        let outcome = replace_selection(&mut doc, carets, b"X\nY\nZ");
        assert_eq!(3, doc.line_count());
        assert_eq!(b"one X", &*doc.line_bytes(0));
        assert_eq!(b"Y", &*doc.line_bytes(1));
        assert_eq!(b"Z four", &*doc.line_bytes(2));
        assert_eq!(Caret::new(2, 1), outcome.carets_after.active);
        assert_eq!(b"two\nthree", outcome.replaced_bytes.as_slice());
    }

    #[test]
    fn get_contents_joins_lines_with_newlines() {
        test_util::setup_test();
        let mut doc = doc_from(&["foo", "bar", "baz"]);
        assert_eq!(b"foo\nbar\nbaz", get_contents(&mut doc).as_slice());
    }

    #[test]
    fn find_is_limited_to_a_single_line() {
        test_util::setup_test();
        let doc = doc_from(&["hello world", "world peace"]);
        assert_eq!(
            Some(Caret::new(0, 6)),
            find(&doc, b"world", Caret::new(0, 0))
        );
        assert_eq!(None, find(&doc, b"world hello", Caret::new(0, 0)));
        assert_eq!(
            Some(Caret::new(1, 0)),
            find(&doc, b"world", Caret::new(0, 7))
        );
    }
}
