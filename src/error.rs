use crate::element::ElementKind;
use crate::host::{ArrayId, ListId};

/// Faults raised while mirroring an array. None of them are fatal to the editor: callers log
/// and fall back to an unproxied or read-only view.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProxyError {
    /// Element type matches none of the mirrorable kinds.
    #[error("unsupported array element type '{type_name}'")]
    UnsupportedElementKind { type_name: String },

    /// A removal references indices past the end of the array.
    #[error("removal range {start}..{end} exceeds array length {len}")]
    StaleRemovalRange { start: usize, end: usize, len: usize },

    /// Curve keyframe write-back with no element to carry tangents from.
    #[error("no array element at index {index} to carry curve tangents from")]
    MissingPreviousElement { index: usize },

    /// The proxy container for an event is already gone.
    #[error("no proxy container named '{name}'")]
    ProxyLookupFailure { name: String },

    #[error("array {0} does not exist")]
    UnknownArray(ArrayId),

    #[error("mirror list {0} does not exist")]
    UnknownList(ListId),

    #[error("record {record} is not part of mirror list {list}")]
    UnknownRecord { list: ListId, record: u64 },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("element does not match the {kind} layout")]
    ElementMismatch { kind: ElementKind },
}

impl ProxyError {
    /// Faults caused by notifications that outlived the state they describe.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            ProxyError::StaleRemovalRange { .. }
                | ProxyError::ProxyLookupFailure { .. }
                | ProxyError::UnknownArray(_)
                | ProxyError::UnknownList(_)
                | ProxyError::UnknownRecord { .. }
        )
    }
}
