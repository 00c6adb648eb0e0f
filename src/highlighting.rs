//! Syntax highlighting is pluggable (spec §6 `Highlight`): the core carries
//! no lexer or theme of its own, only the shape a host-supplied highlighter
//! must answer in.
//!
//! Grounded in the teacher's `highlighting::Parser`, which fed a `Spans<
//! ScopeStack>` annotation back to the view for painting; generalized here
//! to a plain `Vec<HighlightRun>` per line so a host can back it with
//! whatever lexer it likes (or none) without this crate depending on
//! `syntect`.

/// One contiguous run of a line's bytes sharing a single visual style.
/// `byte_start..byte_end` is a half-open range into the line's own bytes
/// (not the document's flat buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRun {
    pub byte_start: usize,
    pub byte_end: usize,
    /// Opaque to this crate; the host assigns meaning (a theme color index,
    /// an RGB packed value, a scope id — whatever it paints with).
    pub color: u32,
}

/// A host-supplied lexer/theme. `highlight` is called lazily, once per line
/// that becomes visible, never speculatively for the whole document (spec
/// §4.6 "Lazy measurement" applies equally to highlighting: there is no
/// reason to light up a line nobody can see).
///
/// An empty returned `Vec` means "no runs, paint the line in the default
/// style" — not an error, and not the same as "not yet highlighted".
pub trait Highlighter {
    fn highlight(&self, line_bytes: &[u8]) -> Vec<HighlightRun>;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util;

    struct AllIdentifierOneColor;
    impl Highlighter for AllIdentifierOneColor {
        fn highlight(&self, line_bytes: &[u8]) -> Vec<HighlightRun> {
            if line_bytes.is_empty() {
                return Vec::new();
            }
            vec![HighlightRun {
                byte_start: 0,
                byte_end: line_bytes.len(),
                color: 0xFF_FF_FF,
            }]
        }
    }

    #[test]
    fn empty_line_yields_no_runs() {
        test_util::setup_test();
        let h = AllIdentifierOneColor;
        assert!(h.highlight(b"").is_empty());
    }

    #[test]
    fn non_empty_line_yields_one_run_spanning_it() {
        test_util::setup_test();
        let h = AllIdentifierOneColor;
        let runs = h.highlight(b"hello");
        assert_eq!(1, runs.len());
        assert_eq!(0, runs[0].byte_start);
        assert_eq!(5, runs[0].byte_end);
    }
}
