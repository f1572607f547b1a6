//! The session-level error taxonomy.
//!
//! The original implementation needed a custom `boost::system::error_category`
//! so a single `error_code` type could carry both ordinary system errors
//! and the one session-specific recoverable condition, `PartialData`,
//! with equality checked by category identity rather than by string
//! matching. In Rust the same property — decide whether this is the one
//! recoverable case, with no risk of a stringly-typed comparison —
//! falls out of plain enum exhaustiveness, so no category indirection
//! is needed.

use thiserror::Error;

/// Returned by the request handler. `PartialData` is the only
/// recoverable member of this taxonomy; every other way a request can
/// fail to produce a clean response is already folded into a
/// client-visible `ResponseMessage` by the time `Complete` is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// A response was appended to the sink; the caller clears its whole
    /// request buffer.
    Complete,
    /// The request buffer ends mid-message. `ignore_length` stale bytes
    /// — already superseded by a later, still-incomplete fragment —
    /// should be dropped before the caller reads more; `0` means keep
    /// the buffer as is.
    PartialData { ignore_length: usize },
}

impl HandleOutcome {
    /// Stands in for the original's category-identity check: is this the
    /// one recoverable framing condition, or something the caller should
    /// treat as a completed round (response already written, or none
    /// needed)?
    pub fn is_partial_data(&self) -> bool {
        matches!(self, HandleOutcome::PartialData { .. })
    }
}

/// Fatal, connection-closing conditions. Every variant here ends the
/// session; none of them are reported to the client.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("handler produced an empty response")]
    EmptyResponse,
}
