//! Ledger error types.
//!
//! Every failure of a ledger operation falls in one of three kinds:
//! validation (nothing was written), reference resolution (an entry,
//! sub-account or line could not be loaded) and persistence (the store
//! failed). A fourth kind, conflict, covers stale before/after pairs.

use std::error::Error as StdError;

use saldo_shared::AppError;
use saldo_shared::types::{EntryId, LineId, SubaccountId};
use thiserror::Error;

use super::validation::LineValidationError;

/// Result type alias using `LedgerError`.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Broad classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The line was rejected before any mutation.
    Validation,
    /// A referenced record could not be loaded.
    ReferenceResolution,
    /// The supplied previous state does not match what is stored.
    Conflict,
    /// The storage collaborator failed.
    Persistence,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// The line failed validation.
    #[error(transparent)]
    Validation(#[from] LineValidationError),

    /// A change pairs two different lines.
    #[error("Line change pairs different lines: {before} and {after}")]
    LineMismatch {
        /// ID of the previous state.
        before: LineId,
        /// ID of the new state.
        after: LineId,
    },

    /// The line's sub-account code is not the code of its sub-account.
    #[error("Sub-account {subaccount_id} has code {expected}, line carries {actual}")]
    SubaccountCodeMismatch {
        /// Referenced sub-account.
        subaccount_id: SubaccountId,
        /// Code stored on the sub-account.
        expected: String,
        /// Code carried by the line.
        actual: String,
    },

    // ========== Reference Resolution Errors ==========
    /// Accounting entry not found.
    #[error("Accounting entry not found: {0}")]
    EntryNotFound(EntryId),

    /// Sub-account not found.
    #[error("Sub-account not found: {0}")]
    SubaccountNotFound(SubaccountId),

    /// Accounting line not found.
    #[error("Accounting line not found: {0}")]
    LineNotFound(LineId),

    // ========== Conflict Errors ==========
    /// The stored line differs from the previous state supplied by the caller.
    #[error("Accounting line {0} no longer matches the supplied previous state")]
    StaleLine(LineId),

    // ========== Persistence Errors ==========
    /// Storage failure, propagated unchanged.
    #[error("Persistence error: {0}")]
    Persistence(#[source] Box<dyn StdError + Send + Sync>),
}

impl LedgerError {
    /// Wraps a storage failure, keeping it as the error source.
    pub fn persistence(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Persistence(err.into())
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::LineMismatch { .. }
            | Self::SubaccountCodeMismatch { .. } => ErrorKind::Validation,
            Self::EntryNotFound(_) | Self::SubaccountNotFound(_) | Self::LineNotFound(_) => {
                ErrorKind::ReferenceResolution
            }
            Self::StaleLine(_) => ErrorKind::Conflict,
            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Returns the stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.error_code(),
            Self::LineMismatch { .. } => "LINE_MISMATCH",
            Self::SubaccountCodeMismatch { .. } => "SUBACCOUNT_CODE_MISMATCH",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::SubaccountNotFound(_) => "SUBACCOUNT_NOT_FOUND",
            Self::LineNotFound(_) => "LINE_NOT_FOUND",
            Self::StaleLine(_) => "STALE_LINE",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Returns true if the error came from resolving a reference.
    #[must_use]
    pub fn is_reference_error(&self) -> bool {
        self.kind() == ErrorKind::ReferenceResolution
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::ReferenceResolution => Self::NotFound(message),
            ErrorKind::Conflict => Self::BusinessRule(message),
            ErrorKind::Persistence => Self::Database(message),
        }
    }
}
