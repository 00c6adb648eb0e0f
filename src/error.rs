//! Error taxonomy for the editing core.
//!
//! `InvalidArgument` from the design notes is deliberately absent here: it is
//! clamped in release builds and `debug_assert!`-ed in debug builds at the
//! call site, rather than propagated as a `Result`.

/// Failure modes a caller of the core may observe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Allocation failed while growing the document buffer or the active-line
    /// scratch buffer. The mutation that triggered this is aborted before any
    /// observable state changes.
    #[error("allocation failed while growing the document buffer")]
    OutOfMemory,

    /// Internal consistency check failed (active-line size mismatch,
    /// non-monotonic line offsets, ...). Reaching this is a bug in the core
    /// itself or in a caller that bypassed the check-in/check-out protocol.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Either of two cases that both mean "this mutation did not happen and
    /// nothing changed": an edit-session observer vetoed accepting the
    /// current edit via its `on_edit_end` return value (spec §4.7 "if
    /// observer vetoes", §7), leaving the session in `Editing`; or the
    /// mutation was attempted after the editor entered `Destroying` (spec
    /// §4.7 "cancel any pending edit ... no further edit may begin"), which
    /// has no edit session left to roll back. The spec names no separate
    /// error kind for the latter, so it shares this variant rather than
    /// inventing one.
    #[error("edit rejected")]
    Rejected,

    /// A mutating entry point was re-entered from within a notification
    /// callback. The caller should defer the mutation.
    #[error("re-entrant mutation attempted from within a notification callback")]
    Busy,
}

pub type Result<T> = std::result::Result<T, Error>;
