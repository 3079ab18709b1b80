//! FFI Error Types
//!
//! Every failure at the binding boundary surfaces as an [`FfiError`]. None of
//! them are retried: a missing library or symbol is a configuration problem,
//! and an ownership violation is a programming error.

use std::path::PathBuf;

use thiserror::Error;

use super::types::FfiSignature;
use crate::binding::HandleKind;
use crate::config::ConfigError;

/// Error type for FFI binding operations
#[derive(Debug, Error)]
pub enum FfiError {
    /// The shared library exists but could not be opened
    #[error("failed to load native library '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// The shared library could not be located
    #[error("native library '{name}' not found (searched: {})", format_paths(searched))]
    LibraryNotFound { name: String, searched: Vec<PathBuf> },

    /// Symbol missing from the export table, or never declared
    #[error("unknown symbol '{symbol}': {detail}")]
    UnknownSymbol { symbol: String, detail: String },

    /// Symbol already bound under an incompatible signature
    #[error("signature conflict for '{symbol}': bound as `{bound}`, declared as `{declared}`")]
    SignatureConflict {
        symbol: String,
        bound: FfiSignature,
        declared: FfiSignature,
    },

    /// Declared signature cannot be called through the marshaler
    #[error("invalid signature for '{symbol}': {reason}")]
    InvalidSignature { symbol: String, reason: String },

    /// Argument not representable in its declared native type
    #[error("cannot marshal argument {index} of '{symbol}': {reason}")]
    Marshal {
        symbol: String,
        index: usize,
        reason: String,
    },

    /// `release()` called twice on the same wrapper
    #[error("double release of {kind} handle {addr:#x}")]
    DoubleRelease { kind: HandleKind, addr: usize },

    /// Operation on a released handle, or on one whose owner was released
    #[error("use of {kind} handle {addr:#x} after release")]
    UseAfterRelease { kind: HandleKind, addr: usize },

    /// A second OWNED wrapper for an address that is already owned
    #[error("{kind} handle {addr:#x} is already owned by another wrapper")]
    OwnershipConflict { kind: HandleKind, addr: usize },

    /// A native constructor returned null
    #[error("'{symbol}' returned a null {kind} handle")]
    NullHandle { symbol: String, kind: HandleKind },

    /// Error text reported by the native library
    #[error("'{symbol}' failed: {message}")]
    Native { symbol: String, message: String },

    /// Loaded library is older than required
    #[error("native library version {found} is older than the required {required}")]
    IncompatibleVersion { found: String, required: String },

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FfiError {
    pub(crate) fn marshal(symbol: &str, index: usize, reason: impl Into<String>) -> Self {
        FfiError::Marshal {
            symbol: symbol.to_string(),
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_symbol(symbol: &str, detail: impl Into<String>) -> Self {
        FfiError::UnknownSymbol {
            symbol: symbol.to_string(),
            detail: detail.into(),
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for FFI binding operations
pub type Result<T> = std::result::Result<T, FfiError>;
