//! Bank feed import service
//!
//! Ingests external transactions supplied by the excluded download layer as
//! `(account, external id, date, amount, description)` records, either
//! directly or parsed out of a feed CSV. Ingestion is idempotent: the
//! stable per-account external id makes a re-import replace the existing
//! record instead of duplicating it.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::{Reader, StringRecord};
use tracing::info;

use crate::error::PaycycleResult;
use crate::models::{AccountId, ExternalTransaction, Money};
use crate::storage::{Storage, UpsertOutcome};

/// One bank-feed record, as handed over by the import layer
#[derive(Debug, Clone)]
pub struct ExternalRecord {
    pub account_id: AccountId,
    pub external_id: String,
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
    pub memo: Option<String>,
}

/// Column layout of a feed CSV
#[derive(Debug, Clone)]
pub struct FeedColumns {
    /// Index of the stable external-id column
    pub external_id_column: usize,
    /// Index of the posted-date column
    pub date_column: usize,
    /// Index of the amount column
    pub amount_column: usize,
    /// Index of the description column
    pub description_column: usize,
    /// Index of the memo column, if the feed has one
    pub memo_column: Option<usize>,
    /// Date format string (e.g., "%Y-%m-%d", "%m/%d/%Y")
    pub date_format: String,
}

impl Default for FeedColumns {
    fn default() -> Self {
        Self {
            external_id_column: 0,
            date_column: 1,
            amount_column: 2,
            description_column: 3,
            memo_column: None,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

impl FeedColumns {
    /// Create the default column layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the date format
    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }
}

/// Result of a completed ingest
#[derive(Debug, Clone, Default)]
pub struct IngestResult {
    /// Number of new external transactions
    pub inserted: usize,
    /// Number of re-imported records replaced in place
    pub updated: usize,
    /// Number of records that failed validation or parsing
    pub errors: usize,
    /// Error messages by input position
    pub error_messages: HashMap<usize, String>,
}

/// Service for bank feed ingestion
pub struct ImportService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportService<'a> {
    /// Create a new import service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Ingest already-parsed feed records
    ///
    /// Each record upserts by its (account, external id) key, so importing
    /// the same feed twice leaves exactly one copy of each transaction.
    /// Records for unknown accounts are counted as errors and skipped; the
    /// rest of the batch still lands.
    pub fn ingest(&self, records: &[ExternalRecord]) -> PaycycleResult<IngestResult> {
        let mut result = IngestResult::default();

        for (idx, record) in records.iter().enumerate() {
            if self.storage.accounts.get(record.account_id)?.is_none() {
                result.errors += 1;
                result
                    .error_messages
                    .insert(idx, format!("Unknown account: {}", record.account_id));
                continue;
            }

            let mut txn = ExternalTransaction::new(
                record.account_id,
                record.external_id.clone(),
                record.date,
                record.amount,
                record.description.clone(),
            );
            if let Some(memo) = &record.memo {
                txn.memo = memo.clone();
            }
            if let Err(e) = txn.validate() {
                result.errors += 1;
                result.error_messages.insert(idx, e);
                continue;
            }

            match self.storage.externals.upsert(txn)? {
                UpsertOutcome::Inserted => result.inserted += 1,
                UpsertOutcome::Updated => result.updated += 1,
            }
        }

        self.storage.externals.save()?;

        info!(
            inserted = result.inserted,
            updated = result.updated,
            errors = result.errors,
            "ingested bank feed records"
        );
        Ok(result)
    }

    /// Parse a feed CSV into records for one account
    ///
    /// Returns per-row results so the caller can surface bad rows without
    /// losing the good ones.
    pub fn parse_csv_from_reader<R: std::io::Read>(
        &self,
        reader: &mut Reader<R>,
        account_id: AccountId,
        columns: &FeedColumns,
    ) -> PaycycleResult<Vec<Result<ExternalRecord, String>>> {
        let mut results = Vec::new();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    results.push(Err(format!("Error reading CSV record: {}", e)));
                    continue;
                }
            };
            results.push(parse_record(&record, account_id, columns));
        }
        Ok(results)
    }

    /// Parse a feed CSV and ingest its well-formed rows
    pub fn import_csv<R: std::io::Read>(
        &self,
        reader: &mut Reader<R>,
        account_id: AccountId,
        columns: &FeedColumns,
    ) -> PaycycleResult<IngestResult> {
        let parsed = self.parse_csv_from_reader(reader, account_id, columns)?;

        let mut records = Vec::new();
        let mut record_rows = Vec::new();
        let mut row_errors = Vec::new();
        for (row, parsed_row) in parsed.into_iter().enumerate() {
            match parsed_row {
                Ok(record) => {
                    records.push(record);
                    record_rows.push(row);
                }
                Err(e) => row_errors.push((row, e)),
            }
        }

        let ingested = self.ingest(&records)?;

        // Re-key ingest errors to the original CSV row numbers
        let mut result = IngestResult {
            inserted: ingested.inserted,
            updated: ingested.updated,
            errors: ingested.errors,
            error_messages: ingested
                .error_messages
                .into_iter()
                .map(|(idx, e)| (record_rows[idx], e))
                .collect(),
        };
        for (row, e) in row_errors {
            result.errors += 1;
            result.error_messages.insert(row, e);
        }
        Ok(result)
    }
}

/// Parse a single CSV record into an ExternalRecord
fn parse_record(
    record: &StringRecord,
    account_id: AccountId,
    columns: &FeedColumns,
) -> Result<ExternalRecord, String> {
    let external_id = record
        .get(columns.external_id_column)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing external id column".to_string())?
        .to_string();

    let date_str = record
        .get(columns.date_column)
        .ok_or_else(|| "Missing date column".to_string())?
        .trim();
    let date = NaiveDate::parse_from_str(date_str, &columns.date_format)
        .map_err(|_| format!("Could not parse date: '{}'", date_str))?;

    let amount_str = record
        .get(columns.amount_column)
        .ok_or_else(|| "Missing amount column".to_string())?
        .trim();
    let amount = parse_amount(amount_str)?;

    let description = record
        .get(columns.description_column)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let memo = columns
        .memo_column
        .and_then(|col| record.get(col))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(ExternalRecord {
        account_id,
        external_id,
        date,
        amount,
        description,
        memo,
    })
}

/// Parse an amount string, handling currency symbols, thousands separators,
/// and the accounting-negative parenthesis format
fn parse_amount(s: &str) -> Result<Money, String> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-' || *c == '(' || *c == ')')
        .collect();

    let (is_negative, value) = if cleaned.starts_with('(') && cleaned.ends_with(')') {
        (true, &cleaned[1..cleaned.len() - 1])
    } else if let Some(stripped) = cleaned.strip_prefix('-') {
        (true, stripped)
    } else {
        (false, cleaned.as_str())
    };

    Money::parse(value)
        .map(|m| if is_negative { -m } else { m })
        .map_err(|e| format!("Could not parse amount '{}': {}", s, e))
}
