//! Reading and writing transactions as CSV.
//!
//! The CSV layout has the header `id,date,payee,memo,amount,account,category,flag`.
//! Empty `id`, `category` and `flag` cells are read as missing values.

use std::io::{Read, Write};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::{Error, transaction::Transaction};

/// One row of a transaction CSV file.
#[derive(Debug, Serialize, Deserialize)]
struct TransactionRecord {
    #[serde(default)]
    id: String,
    date: String,
    #[serde(default)]
    payee: String,
    #[serde(default)]
    memo: String,
    amount: f64,
    #[serde(default)]
    account: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    flag: String,
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        let mut builder = Transaction::build(&record.payee, record.amount, &record.date)
            .memo(&record.memo)
            .account(&record.account)
            .category(non_empty(&record.category))
            .flag(non_empty(&record.flag));

        if let Some(id) = non_empty(&record.id) {
            builder = builder.id(id);
        }

        builder.finalise()
    }
}

impl From<&Transaction> for TransactionRecord {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id.clone().unwrap_or_default(),
            date: transaction.date.clone(),
            payee: transaction.payee.clone(),
            memo: transaction.memo.clone(),
            amount: transaction.amount,
            account: transaction.account.clone(),
            category: transaction.category.clone().unwrap_or_default(),
            flag: transaction.flag.clone().unwrap_or_default(),
        }
    }
}

fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() { None } else { Some(text) }
}

/// Read transactions from CSV data with a header row.
///
/// # Errors
/// Returns [Error::InvalidCSV] if a row is missing a required column or the
/// amount is not a number. The line number of the bad row is included in the
/// error message.
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<Transaction>, Error> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut transactions = Vec::new();

    for result in reader.deserialize::<TransactionRecord>() {
        let record = result?;
        transactions.push(Transaction::from(record));
    }

    tracing::debug!("Read {} transactions from CSV", transactions.len());

    Ok(transactions)
}

/// Write transactions as CSV data with a header row.
///
/// Fields that do not have a CSV column are not written.
///
/// # Errors
/// Returns [Error::InvalidCSV] if the CSV could not be written.
pub fn write_transactions_csv<W: Write>(
    writer: W,
    transactions: &[Transaction],
) -> Result<(), Error> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    for transaction in transactions {
        writer.serialize(TransactionRecord::from(transaction))?;
    }

    writer.flush()?;

    Ok(())
}
