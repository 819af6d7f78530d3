//! CSV format handling for account seeds, transfer requests and output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `CsvAccount` / `CsvTransfer` structures for deserialization
//! - Conversion from CSV records to domain types
//! - Account and outcome output serialization
//!
//! Apart from the file-opening helper, all functions work on in-memory
//! readers and writers for easy testing.

use crate::core::TransferReport;
use crate::types::{Account, AccountId, Currency, TransferError, TransferRequest};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Account seed row with columns: currency, balance, owner
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvAccount {
    pub currency: String,
    pub balance: String,
    pub owner: String,
}

/// Parsed account seed, ready to be created in a store
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSeed {
    pub currency: Currency,
    pub balance: Decimal,
    pub owner: String,
}

/// Transfer row with columns: sender, recipient, amount
///
/// The amount is optional so that an empty column reaches the engine as a
/// missing amount instead of being dropped as a malformed row.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvTransfer {
    pub sender: AccountId,
    pub recipient: AccountId,
    pub amount: Option<String>,
}

/// Convert a CsvAccount to an AccountSeed
pub fn convert_csv_account(csv_account: CsvAccount) -> Result<AccountSeed, String> {
    let currency = Currency::from_str(csv_account.currency.trim())?;
    let balance = Decimal::from_str(csv_account.balance.trim()).map_err(|_| {
        format!(
            "Invalid balance '{}' for owner '{}'",
            csv_account.balance, csv_account.owner
        )
    })?;

    Ok(AccountSeed {
        currency,
        balance,
        owner: csv_account.owner,
    })
}

/// Convert a CsvTransfer to a TransferRequest
///
/// An empty amount becomes `None`; an amount that is present but not a
/// number is a conversion error.
pub fn convert_csv_transfer(csv_transfer: CsvTransfer) -> Result<TransferRequest, String> {
    let amount = match csv_transfer.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => {
            match Decimal::from_str(amount_str.trim()) {
                Ok(decimal) => Some(decimal),
                Err(_) => {
                    return Err(format!(
                        "Invalid amount '{}' for transfer {} -> {}",
                        amount_str, csv_transfer.sender, csv_transfer.recipient
                    ))
                }
            }
        }
        _ => None,
    };

    Ok(TransferRequest {
        sender: csv_transfer.sender,
        recipient: csv_transfer.recipient,
        amount,
    })
}

/// Read every account seed from `input`
///
/// Unlike transfer rows, a bad seed row is fatal: ids are assigned in file
/// order, so skipping one would shift every later id.
pub fn read_accounts<R: Read>(input: R) -> Result<Vec<AccountSeed>, TransferError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut seeds = Vec::new();
    for record in reader.deserialize::<CsvAccount>() {
        let record = record?;
        let seed = convert_csv_account(record).map_err(|message| TransferError::ParseError {
            line: Some(seeds.len() as u64 + 2),
            message,
        })?;
        seeds.push(seed);
    }

    Ok(seeds)
}

/// Open `path` and read every account seed from it
pub fn read_accounts_file(path: &Path) -> Result<Vec<AccountSeed>, TransferError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TransferError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => TransferError::from(e),
    })?;
    read_accounts(file)
}

/// Write account states to CSV format
///
/// Writes accounts with columns: id, currency, balance, owner, version.
/// Accounts are sorted by id for deterministic output.
pub fn write_accounts_csv(
    accounts: &[Account],
    output: &mut dyn Write,
) -> Result<(), TransferError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["id", "currency", "balance", "owner", "version"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer.write_record(&[
            account.id.to_string(),
            account.currency.code().to_string(),
            format!("{:.4}", account.balance),
            account.owner,
            account.version.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Streams one `sender,recipient,amount,status` row per processed transfer
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(output: W) -> Result<Self, TransferError> {
        let mut writer = csv::Writer::from_writer(output);
        writer.write_record(["sender", "recipient", "amount", "status"])?;
        Ok(Self { writer })
    }

    pub fn write_reports(&mut self, reports: &[TransferReport]) -> Result<(), TransferError> {
        for report in reports {
            let amount = report
                .request
                .amount
                .map(|amount| amount.to_string())
                .unwrap_or_default();
            self.writer.write_record(&[
                report.request.sender.to_string(),
                report.request.recipient.to_string(),
                amount,
                report.status().to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), TransferError> {
        self.writer.flush()?;
        Ok(())
    }
}
