//! Error types for SLATE operations

use crate::blackboard::descriptor::TypeDescriptor;

/// Result alias used throughout the crate
pub type SlateResult<T> = Result<T, SlateError>;

/// Error type covering all fallible SLATE operations
#[derive(Debug, thiserror::Error)]
pub enum SlateError {
    /// Creating or opening a named store failed: name collision, empty
    /// entry set, missing segment, or allocation failure.
    #[error("service creation failed: {0}")]
    ServiceCreation(String),

    /// Binding a writer to a store failed (another writer is alive).
    #[error("writer creation failed: {0}")]
    WriterCreation(String),

    /// Binding a reader to a store failed.
    #[error("reader creation failed: {0}")]
    ReaderCreation(String),

    /// Entry acquisition failed: the key is not registered in the store.
    #[error("entry access failed: {0}")]
    EntryAccess(String),

    /// Entry acquisition failed: the requested value layout disagrees
    /// with the layout registered for the slot. Size and alignment are
    /// load-bearing; the type name is only an advisory diagnostic.
    #[error(
        "type mismatch: requested {requested} but the slot stores \
         size={stored_size}, alignment={stored_align}"
    )]
    TypeMismatch {
        requested: TypeDescriptor,
        stored_size: u64,
        stored_align: u64,
    },

    /// Operation attempted on a handle or loan that already reached a
    /// terminal state (committed entry value, published segment).
    #[error("object disposed: {0}")]
    ObjectDisposed(&'static str),

    /// Configuration file error
    #[error("config error: {0}")]
    Config(String),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlateError {
    /// Convenience constructor matching the common `Config(String)` shape
    pub fn config(msg: impl Into<String>) -> Self {
        SlateError::Config(msg.into())
    }
}
