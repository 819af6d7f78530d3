//! Transfer preconditions
//!
//! Checks run in a fixed order, and the first failing check decides the
//! outcome:
//!
//! 1. request shape (ids non-zero and distinct, amount present and positive),
//!    checked before any store access
//! 2. recipient exists
//! 3. sender exists
//! 4. currencies match
//! 5. sender can cover the amount
//!
//! Steps 2-5 need account state and run inside the strategy's transaction.

use crate::types::{
    Account, AccountId, AccountPair, StoreError, TransferOutcome, TransferRequest,
};
use rust_decimal::Decimal;

/// A request that passed the shape check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidTransfer {
    pub sender: AccountId,
    pub recipient: AccountId,
    pub amount: Decimal,
}

impl ValidTransfer {
    pub fn pair(&self) -> AccountPair {
        AccountPair::new(self.sender, self.recipient)
    }

    /// Signed balance change `id` receives from this transfer
    pub fn delta_for(&self, id: AccountId) -> Decimal {
        if id == self.sender {
            -self.amount
        } else {
            self.amount
        }
    }

    /// Outcome for a balance write rejected by the store invariant
    pub fn insufficient_funds(&self, balance: Decimal) -> TransferOutcome {
        TransferOutcome::InsufficientFunds {
            sender: self.sender,
            balance,
            requested: self.amount,
        }
    }
}

/// Sender and recipient rows that passed every account-level check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedAccounts {
    pub sender: Account,
    pub recipient: Account,
}

/// Step 1: request shape
pub fn validate_request(request: &TransferRequest) -> Result<ValidTransfer, TransferOutcome> {
    if request.sender == 0 {
        return Err(TransferOutcome::invalid("sender id must be non-zero"));
    }
    if request.recipient == 0 {
        return Err(TransferOutcome::invalid("recipient id must be non-zero"));
    }
    if request.sender == request.recipient {
        return Err(TransferOutcome::invalid("sender and recipient must differ"));
    }
    let amount = match request.amount {
        None => return Err(TransferOutcome::invalid("amount is required")),
        Some(amount) if amount <= Decimal::ZERO => {
            return Err(TransferOutcome::invalid(format!(
                "amount must be positive, got {}",
                amount
            )))
        }
        Some(amount) => amount,
    };

    Ok(ValidTransfer {
        sender: request.sender,
        recipient: request.recipient,
        amount,
    })
}

/// Steps 2-5: account existence, currency and funds
pub fn validate_accounts(
    transfer: &ValidTransfer,
    recipient: Option<Account>,
    sender: Option<Account>,
) -> Result<CheckedAccounts, TransferOutcome> {
    let recipient = recipient.ok_or(TransferOutcome::RecipientNotFound {
        recipient: transfer.recipient,
    })?;
    let sender = sender.ok_or(TransferOutcome::SenderNotFound {
        sender: transfer.sender,
    })?;

    if sender.currency != recipient.currency {
        return Err(TransferOutcome::CurrencyMismatch {
            sender: sender.currency,
            recipient: recipient.currency,
        });
    }
    debit(transfer, &sender)?;

    Ok(CheckedAccounts { sender, recipient })
}

/// Sender balance after the debit, if it stays non-negative
pub fn debit(transfer: &ValidTransfer, sender: &Account) -> Result<Decimal, TransferOutcome> {
    match sender.balance.checked_sub(transfer.amount) {
        Some(remaining) if remaining >= Decimal::ZERO => Ok(remaining),
        _ => Err(transfer.insufficient_funds(sender.balance)),
    }
}

/// Recipient balance after the credit
pub fn credit(transfer: &ValidTransfer, recipient: &Account) -> Result<Decimal, StoreError> {
    recipient
        .balance
        .checked_add(transfer.amount)
        .ok_or(StoreError::BalanceOverflow {
            account: recipient.id,
        })
}
