//! Transfer-related types for the transfer engine
//!
//! A transfer is not persisted. It is a transient operation moving a positive
//! amount between two distinct accounts of the same currency, and it always
//! ends in exactly one [`TransferOutcome`].

use super::account::{Account, AccountId, Currency};
use rust_decimal::Decimal;

/// Request to move `amount` from `sender` to `recipient`
///
/// The amount is optional because it arrives from an untrusted boundary
/// (form field, CSV column); a missing amount is an invalid request rather
/// than a parse failure.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// Account debited by the transfer
    pub sender: AccountId,

    /// Account credited by the transfer
    pub recipient: AccountId,

    /// Amount to move, must be strictly positive
    pub amount: Option<Decimal>,
}

impl TransferRequest {
    /// Create a request carrying an amount
    ///
    /// # Arguments
    ///
    /// * `sender` - Account to debit
    /// * `recipient` - Account to credit
    /// * `amount` - Amount to move; not checked here, validation happens in the engine
    pub fn new(sender: AccountId, recipient: AccountId, amount: Decimal) -> Self {
        TransferRequest {
            sender,
            recipient,
            amount: Some(amount),
        }
    }
}

/// Unordered pair of account ids stored in canonical order
///
/// Every component that takes locks or issues writes over both accounts of a
/// transfer iterates this pair, so acquisition order is the same for all
/// callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountPair {
    low: AccountId,
    high: AccountId,
}

impl AccountPair {
    pub fn new(a: AccountId, b: AccountId) -> Self {
        if a <= b {
            AccountPair { low: a, high: b }
        } else {
            AccountPair { low: b, high: a }
        }
    }

    /// Both ids in ascending order
    pub fn ordered(&self) -> [AccountId; 2] {
        [self.low, self.high]
    }
}

/// Post-commit state of both accounts of a successful transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub sender: Account,
    pub recipient: Account,
}

/// Result of a transfer attempt
///
/// Every variant is an expected result reported to the caller. Fatal
/// failures (store unreachable, I/O errors) are returned as
/// [`TransferError`](super::TransferError) instead.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Both balances were changed and committed
    Success(TransferReceipt),

    /// Zero or equal ids, or a missing or non-positive amount
    InvalidRequest { reason: String },

    /// The account addressed as recipient does not exist
    RecipientNotFound { recipient: AccountId },

    /// The account named as sender does not exist
    SenderNotFound { sender: AccountId },

    /// Sender and recipient hold different currencies
    CurrencyMismatch {
        sender: Currency,
        recipient: Currency,
    },

    /// The sender cannot cover the amount
    InsufficientFunds {
        sender: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// An optimistic write found a stale version; retry from a fresh read
    Conflict,
}

impl TransferOutcome {
    pub fn invalid(reason: impl Into<String>) -> Self {
        TransferOutcome::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TransferOutcome::Conflict)
    }

    /// Whether the request itself was rejected at the addressing level
    ///
    /// An invalid request and a missing recipient are hard failures (the
    /// request or the addressed resource is wrong). A missing sender and the
    /// remaining business outcomes are soft results of a well-formed request.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TransferOutcome::InvalidRequest { .. } | TransferOutcome::RecipientNotFound { .. }
        )
    }

    /// Stable status name for reporting
    pub fn status(&self) -> &'static str {
        match self {
            TransferOutcome::Success(_) => "SUCCESS",
            TransferOutcome::InvalidRequest { .. } => "INVALID_REQUEST",
            TransferOutcome::RecipientNotFound { .. } => "RECIPIENT_NOT_FOUND",
            TransferOutcome::SenderNotFound { .. } => "SENDER_NOT_FOUND",
            TransferOutcome::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            TransferOutcome::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            TransferOutcome::Conflict => "CONFLICT",
        }
    }
}
