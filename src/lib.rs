#![forbid(unreachable_pub)]
//! A framework-agnostic text-editing core: a flat byte buffer with a line
//! index and an active-line cache, a two-caret selection model, a single
//! replace-selection edit primitive, time-coalesced undo, and a
//! pixel-measured viewport. Glyph shaping, clipboard, menus, and syntax
//! highlighting internals are host-supplied capabilities, injected at
//! construction rather than linked in.

pub mod buffer;
pub mod editor;
pub mod error;
pub mod highlighting;
pub mod measurement;
pub mod region;
pub mod view;
pub mod word_boundary;

#[cfg(test)]
mod test_util;
