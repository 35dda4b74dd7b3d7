//! Business rule validation for accounting lines.

use rust_decimal::Decimal;
use saldo_shared::types::{EntryId, SubaccountId};
use thiserror::Error;

use super::types::AccountingLine;

/// Minimum concept length, in characters.
pub const CONCEPT_MIN_LEN: usize = 1;
/// Maximum concept length, in characters.
pub const CONCEPT_MAX_LEN: usize = 255;
/// Decimal places stored for debit and credit.
pub const AMOUNT_MAX_SCALE: u32 = 4;

/// Validation errors for accounting lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineValidationError {
    /// Concept is empty or too long.
    #[error("Invalid length for concept: expected {min} to {max} characters, got {actual}")]
    ConceptLength {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// Line has no accounting entry.
    #[error("Accounting data missing: line has no accounting entry")]
    MissingEntry,

    /// Line has no sub-account.
    #[error("Accounting data missing: line has no sub-account")]
    MissingSubaccount,

    /// Line has a sub-account but no sub-account code.
    #[error("Accounting data missing: line has no sub-account code")]
    MissingSubaccountCode,

    /// Debit and credit are both zero.
    #[error("Accounting data missing: debit and credit are both zero")]
    ZeroAmount,

    /// Debit or credit is negative.
    #[error("Debit and credit cannot be negative")]
    NegativeAmount,

    /// Debit or credit has more decimal places than are stored.
    #[error("Amounts allow at most {max} decimal places, got {actual}")]
    AmountScale {
        /// Maximum decimal places.
        max: u32,
        /// Decimal places of the offending amount.
        actual: u32,
    },
}

impl LineValidationError {
    /// Returns the stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConceptLength { .. } => "INVALID_CONCEPT_LENGTH",
            Self::MissingEntry => "MISSING_ENTRY",
            Self::MissingSubaccount => "MISSING_SUBACCOUNT",
            Self::MissingSubaccountCode => "MISSING_SUBACCOUNT_CODE",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::AmountScale { .. } => "INVALID_AMOUNT_SCALE",
        }
    }
}

/// Returns the entry and sub-account a line points at.
///
/// # Errors
///
/// Returns an error if either reference is missing.
pub fn line_references(
    line: &AccountingLine,
) -> Result<(EntryId, SubaccountId), LineValidationError> {
    let entry_id = line.entry_id.ok_or(LineValidationError::MissingEntry)?;
    let subaccount_id = line
        .subaccount_id
        .ok_or(LineValidationError::MissingSubaccount)?;
    Ok((entry_id, subaccount_id))
}

/// Validates an accounting line.
///
/// The concept is checked first, then the references, then the amounts.
/// Amounts are compared after normalization, so `1.50000` counts as two
/// decimal places.
///
/// # Errors
///
/// Returns the first rule the line breaks.
pub fn validate_line(line: &AccountingLine) -> Result<(), LineValidationError> {
    let length = line.concept.chars().count();
    if !(CONCEPT_MIN_LEN..=CONCEPT_MAX_LEN).contains(&length) {
        return Err(LineValidationError::ConceptLength {
            min: CONCEPT_MIN_LEN,
            max: CONCEPT_MAX_LEN,
            actual: length,
        });
    }

    line_references(line)?;
    if line.subaccount_code.trim().is_empty() {
        return Err(LineValidationError::MissingSubaccountCode);
    }

    if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
        return Err(LineValidationError::NegativeAmount);
    }

    let scale = line.debit.normalize().scale().max(line.credit.normalize().scale());
    if scale > AMOUNT_MAX_SCALE {
        return Err(LineValidationError::AmountScale {
            max: AMOUNT_MAX_SCALE,
            actual: scale,
        });
    }

    if line.debit.is_zero() && line.credit.is_zero() {
        return Err(LineValidationError::ZeroAmount);
    }

    Ok(())
}
