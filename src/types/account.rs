//! Account-related types for the transfer engine
//!
//! This module defines the Account record held by the ledger and the fixed
//! set of currencies an account can be denominated in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account identifier
///
/// Assigned by the store on creation, starting at 1. Zero is never a valid id.
pub type AccountId = u64;

/// Version stamp of an account row
///
/// Incremented by exactly 1 on every committed balance write.
pub type Version = u64;

/// Currencies an account can hold
///
/// Both sides of a transfer must share the same currency; the engine performs
/// no conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "RUB", alias = "RUR")]
    Rub,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "JPY", alias = "YEN")]
    Jpy,
}

impl Currency {
    /// ISO-style short code used in CSV input and output
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Rub => "RUB",
            Currency::Eur => "EUR",
            Currency::Jpy => "JPY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "RUB" | "RUR" => Ok(Currency::Rub),
            "EUR" => Ok(Currency::Eur),
            "JPY" | "YEN" => Ok(Currency::Jpy),
            other => Err(format!("Unknown currency '{}'", other)),
        }
    }
}

/// Ledger account record
///
/// `id`, `currency` and `owner` are immutable after creation. `balance` and
/// `version` change only through the transfer path.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Store-assigned identifier
    pub id: AccountId,

    /// Currency the balance is denominated in
    pub currency: Currency,

    /// Current balance
    ///
    /// Never negative after any committed write.
    pub balance: Decimal,

    /// Opaque display string naming the owner
    pub owner: String,

    /// Monotonic version stamp, used by the optimistic strategy
    pub version: Version,
}

impl Account {
    /// Create a fresh account record at version 0
    pub fn new(id: AccountId, currency: Currency, balance: Decimal, owner: impl Into<String>) -> Self {
        Account {
            id,
            currency,
            balance,
            owner: owner.into(),
            version: 0,
        }
    }
}
