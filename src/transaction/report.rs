//! The CSV transaction report.

use csv::{QuoteStyle, Writer, WriterBuilder};
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

use super::{TransactionRecord, TransactionType};

/// The title printed at the top of the report.
pub const REPORT_TITLE: &str = "Transaction Report";

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

const HEADERS: [&str; 7] = [
    "Unique ID",
    "Date",
    "Type",
    "Amount",
    "Property",
    "Payer/Payee",
    "Notes",
];

/// The sums over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    /// The sum of all `Income` amounts.
    pub income: f64,
    /// The sum of all `Expense` amounts.
    pub expenses: f64,
}

impl Totals {
    /// Sum the amounts of `records` by type.
    ///
    /// Records of other types or without a numeric amount are left out.
    pub fn of(records: &[TransactionRecord]) -> Self {
        records.iter().fold(Self::default(), |mut totals, record| {
            let amount = record.amount().unwrap_or_default();

            if record.transaction_type() == TransactionType::Income.as_str() {
                totals.income += amount;
            } else if record.transaction_type() == TransactionType::Expense.as_str() {
                totals.expenses += amount;
            }

            totals
        })
    }

    /// Income minus expenses.
    pub fn balance(&self) -> f64 {
        self.income - self.expenses
    }
}

/// Write `records` as a CSV report with a title block and summary rows.
///
/// Every value is quoted. `generated_at` should already be in the local timezone.
///
/// # Errors
/// Returns [Error::CsvError] if the report could not be written.
pub fn write_csv_report(
    records: &[TransactionRecord],
    company_name: &str,
    generated_at: OffsetDateTime,
) -> Result<Vec<u8>, Error> {
    let timestamp = generated_at
        .format(TIMESTAMP_FORMAT)
        .map_err(|error| Error::CsvError(error.to_string()))?;
    let totals = Totals::of(records);

    let mut writer = csv_writer(Vec::new());

    write_row(&mut writer, &[&format!("Company: {company_name}")])?;
    write_row(&mut writer, &[REPORT_TITLE])?;
    write_row(&mut writer, &[&format!("Date Generated: {timestamp}")])?;
    let mut writer = write_blank_line(writer)?;
    write_row(&mut writer, &HEADERS)?;

    for record in records {
        let amount = format!("{:.2}", record.amount().unwrap_or_default());

        write_row(
            &mut writer,
            &[
                record.unique_id(),
                record.tran_date(),
                record.transaction_type(),
                &amount,
                record.text("property"),
                record.text("payerPayee"),
                record.text("notes"),
            ],
        )?;
    }

    let mut writer = write_blank_line(writer)?;
    write_row(&mut writer, &["", "", "Total Income", &format!("{:.2}", totals.income)])?;
    write_row(&mut writer, &["", "", "Total Expenses", &format!("{:.2}", totals.expenses)])?;
    write_row(&mut writer, &["", "", "Balance", &format!("{:.2}", totals.balance())])?;

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

fn csv_writer(buffer: Vec<u8>) -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Always)
        .from_writer(buffer)
}

/// The csv writer always writes at least one field per record, so blank lines are
/// written to the buffer directly.
fn write_blank_line(writer: Writer<Vec<u8>>) -> Result<Writer<Vec<u8>>, Error> {
    let mut buffer = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;
    buffer.push(b'\n');

    Ok(csv_writer(buffer))
}

fn write_row(writer: &mut Writer<Vec<u8>>, row: &[&str]) -> Result<(), Error> {
    writer
        .write_record(row)
        .map_err(|error| Error::CsvError(error.to_string()))
}
