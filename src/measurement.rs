//! The glyph-measurement capability the core consumes from its host.
//!
//! Per §6 of the spec, the shaping/rasterization engine is an external
//! collaborator: the core only ever calls `measure_string` and
//! `character_at_x`. Grounded in the teacher's pattern of injecting
//! capability objects (`View` takes a `Theme` and talks to a `Highlighter`
//! built from it) rather than calling a concrete text-shaping library
//! directly.

/// Rounding bias used by [`TextMetrics::character_at_x`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRounding {
    /// Round to whichever side of a glyph the point is closer to.
    Middle,
    /// Always round towards the start of the glyph.
    Floor,
}

/// Host-provided text measurement, required to lay out lines and resolve
/// vertical caret motion and mouse clicks to byte offsets.
pub trait TextMetrics {
    /// Pixel width of `bytes` (a single line's content, or a prefix of one)
    /// rendered in the current text style.
    fn measure_string(&self, bytes: &[u8]) -> u32;

    /// Byte offset into `bytes` (a single line's content) of the character
    /// under pixel column `x`, using the given rounding rule.
    fn character_at_x(&self, bytes: &[u8], x: u32, rounding: XRounding) -> usize;
}

impl dyn TextMetrics + '_ {
    /// Convenience wrapper defaulting to middle-of-glyph rounding, the rule
    /// the spec requires for vertical motion (§4.3).
    pub(crate) fn character_at_x_middle(&self, bytes: &[u8], x: u32) -> usize {
        self.character_at_x(bytes, x, XRounding::Middle)
    }
}
