//! End-to-end integration tests
//!
//! These tests validate the complete file pipeline using predefined CSV
//! fixtures. Each fixture directory under tests/fixtures/ holds:
//! - `accounts.csv` - account seeds, ids assigned in file order
//! - `transfers.csv` - transfer requests
//! - `expected.csv` - final account states
//! - `expected_outcomes.csv` (optional) - per-transfer statuses
//!
//! Fixtures run with one transfer per batch so the expected files do not
//! depend on scheduling, and each one runs under both concurrency strategies.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_transfer_engine::cli::StrategyType;
    use rust_transfer_engine::{BatchConfig, RetryPolicy, TransferPipeline};
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Run a fixture and compare the produced files with the expected ones
    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let accounts_path = format!("{}/accounts.csv", fixture_dir);
        let transfers_path = format!("{}/transfers.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);
        let expected_outcomes_path = format!("{}/expected_outcomes.csv", fixture_dir);

        for path in [&accounts_path, &transfers_path, &expected_path] {
            assert!(Path::new(path).exists(), "Fixture file not found: {}", path);
        }

        let pipeline = TransferPipeline::new(
            strategy_type,
            BatchConfig::new(1, 2),
            RetryPolicy::default(),
        );

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");
        let mut outcomes: Vec<u8> = Vec::new();

        pipeline
            .process(
                Path::new(&accounts_path),
                Path::new(&transfers_path),
                &mut temp_output,
                Some(&mut outcomes),
            )
            .unwrap_or_else(|e| panic!("Failed to process transfers: {}", e));

        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );

        if Path::new(&expected_outcomes_path).exists() {
            let actual_outcomes = String::from_utf8(outcomes).expect("outcomes are UTF-8");
            let expected_outcomes = fs::read_to_string(&expected_outcomes_path)
                .unwrap_or_else(|e| panic!("Failed to read {}: {}", expected_outcomes_path, e));
            assert_eq!(
                actual_outcomes, expected_outcomes,
                "\n\nOutcome mismatch for fixture: {} (strategy: {:?})\n",
                fixture_name, strategy_type
            );
        }
    }

    /// End-to-end test for all fixtures with both concurrency strategies
    #[rstest]
    #[case("happy_path")]
    #[case("rejections")]
    #[case("currency_aliases")]
    #[case("precision")]
    #[case("overdraft_chain")]
    #[case("malformed_data")]
    #[case("empty_transfers")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Lock, StrategyType::Optimistic)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy);
    }

    /// A large concurrent batch must conserve money and keep balances
    /// non-negative, whatever the interleaving.
    #[rstest]
    fn test_concurrent_batch_conserves_total(
        #[values(StrategyType::Lock, StrategyType::Optimistic)] strategy: StrategyType,
    ) {
        let mut accounts = NamedTempFile::new().unwrap();
        writeln!(accounts, "currency,balance,owner").unwrap();
        for i in 0..8 {
            writeln!(accounts, "USD,100,owner{}", i).unwrap();
        }
        accounts.flush().unwrap();

        let mut transfers = NamedTempFile::new().unwrap();
        writeln!(transfers, "sender,recipient,amount").unwrap();
        for i in 0..400u64 {
            let sender = i % 8 + 1;
            let recipient = (i * 3 + 1) % 8 + 1;
            writeln!(transfers, "{},{},{}", sender, recipient, i % 37 + 1).unwrap();
        }
        transfers.flush().unwrap();

        let pipeline = TransferPipeline::new(strategy, BatchConfig::new(100, 4), RetryPolicy::default());
        let mut output: Vec<u8> = Vec::new();
        let summary = pipeline
            .process(accounts.path(), transfers.path(), &mut output, None)
            .unwrap();

        assert_eq!(summary.outcomes.total(), 400);
        assert_eq!(summary.outcomes.count("FATAL_ERROR"), 0);

        let output = String::from_utf8(output).unwrap();
        let mut total = rust_decimal::Decimal::ZERO;
        for line in output.lines().skip(1) {
            let balance: rust_decimal::Decimal = line.split(',').nth(2).unwrap().parse().unwrap();
            assert!(balance >= rust_decimal::Decimal::ZERO, "negative balance in {}", line);
            total += balance;
        }
        assert_eq!(total, rust_decimal::Decimal::from(800));
    }
}
