//! Non-negative balance invariant
//!
//! Installed on every [`MemoryLedger`](super::MemoryLedger) so it fires for
//! every write path, including callers that bypass the transfer engine.

use super::traits::BalanceWriteHook;
use crate::types::{AccountId, StoreError};
use rust_decimal::Decimal;

/// Rejects any write that lowers a balance to below zero
///
/// A balance that is already negative may still be written while it
/// increases. Every decrease that ends below zero is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonNegativeBalance;

impl BalanceWriteHook for NonNegativeBalance {
    fn check(
        &self,
        account: AccountId,
        old_balance: Decimal,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        if new_balance < old_balance && new_balance < Decimal::ZERO {
            return Err(StoreError::insufficient_funds(
                account,
                old_balance,
                new_balance,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::debit_within_balance(1000, 500, true)]
    #[case::debit_to_exactly_zero(500, 0, true)]
    #[case::credit(500, 1500, true)]
    #[case::unchanged(0, 0, true)]
    #[case::debit_below_zero(500, -1, false)]
    #[case::negative_getting_worse(-100, -200, false)]
    #[case::negative_recovering(-200, -100, true)]
    #[case::negative_recovering_past_zero(-200, 50, true)]
    fn test_non_negative_balance_rule(#[case] old: i64, #[case] new: i64, #[case] allowed: bool) {
        let result = NonNegativeBalance.check(1, Decimal::from(old), Decimal::from(new));
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn test_rejection_carries_balances() {
        let result = NonNegativeBalance.check(3, Decimal::from(10), Decimal::from(-5));
        assert_eq!(
            result,
            Err(StoreError::InsufficientFunds {
                account: 3,
                balance: Decimal::from(10),
                attempted: Decimal::from(-5),
            })
        );
    }
}
