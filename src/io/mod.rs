//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, account and outcome output)
//! - `async_reader` - Asynchronous transfer reader with batch reading interface

pub mod async_reader;
pub mod csv_format;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_csv_account, convert_csv_transfer, read_accounts, read_accounts_file,
    write_accounts_csv, AccountSeed, CsvAccount, CsvTransfer, OutcomeWriter,
};
