//! Narrows a list of transactions by search text, type, amount and date.

use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{ValidationError, coercion::parse_finite};

use super::TransactionRecord;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// The filter as given in a query string.
///
/// Empty values are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    /// Text to look for in the unique ID, payer/payee and property.
    pub search: Option<String>,
    /// `Income` or `Expense`, matched case-insensitively.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// The smallest amount to include.
    pub min_amount: Option<String>,
    /// The largest amount to include.
    pub max_amount: Option<String>,
    /// The earliest date to include, `YYYY-MM-DD`.
    pub date_from: Option<String>,
    /// The latest date to include, `YYYY-MM-DD`.
    pub date_to: Option<String>,
}

/// A set of predicates that a transaction must all satisfy.
///
/// The default filter matches every transaction.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    search: Option<String>,
    transaction_type: Option<String>,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    date_from: Option<Date>,
    date_to: Option<Date>,
}

impl TryFrom<TransactionQuery> for TransactionFilter {
    type Error = ValidationError;

    fn try_from(query: TransactionQuery) -> Result<Self, Self::Error> {
        let non_empty = |value: Option<String>| {
            value
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let amount = |value: Option<String>| {
            non_empty(value)
                .map(|value| parse_finite(&value).ok_or(ValidationError::InvalidAmount))
                .transpose()
        };
        let date = |value: Option<String>| {
            non_empty(value)
                .map(|value| Date::parse(&value, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate))
                .transpose()
        };

        Ok(Self {
            search: non_empty(query.search).map(|search| search.to_lowercase()),
            transaction_type: non_empty(query.transaction_type)
                .map(|transaction_type| transaction_type.to_lowercase()),
            min_amount: amount(query.min_amount)?,
            max_amount: amount(query.max_amount)?,
            date_from: date(query.date_from)?,
            date_to: date(query.date_to)?,
        })
    }
}

impl TransactionFilter {
    /// Only match transactions whose unique ID, payer/payee or property contains `text`.
    pub fn search(mut self, text: &str) -> Self {
        self.search = Some(text.to_lowercase());
        self
    }

    /// Only match transactions of `transaction_type`.
    pub fn transaction_type(mut self, transaction_type: &str) -> Self {
        self.transaction_type = Some(transaction_type.to_lowercase());
        self
    }

    /// Only match transactions with at least `min` and at most `max`.
    pub fn amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    /// Only match transactions dated within `from` and `to`, inclusive.
    pub fn date_range(mut self, from: Option<Date>, to: Option<Date>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Whether `record` satisfies every predicate.
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.matches_search(record)
            && self.matches_type(record)
            && self.matches_amount(record)
            && self.matches_date(record)
    }

    /// Keep the records that satisfy every predicate, in their original order.
    pub fn apply(&self, records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
        records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect()
    }

    fn matches_search(&self, record: &TransactionRecord) -> bool {
        let Some(search) = &self.search else {
            return true;
        };

        [record.unique_id(), record.text("payerPayee"), record.text("property")]
            .iter()
            .any(|text| text.to_lowercase().contains(search.as_str()))
    }

    fn matches_type(&self, record: &TransactionRecord) -> bool {
        self.transaction_type
            .as_ref()
            .is_none_or(|want| record.transaction_type().to_lowercase() == *want)
    }

    fn matches_amount(&self, record: &TransactionRecord) -> bool {
        if self.min_amount.is_none() && self.max_amount.is_none() {
            return true;
        }

        let Some(amount) = record.amount() else {
            return false;
        };

        self.min_amount.is_none_or(|min| amount >= min)
            && self.max_amount.is_none_or(|max| amount <= max)
    }

    fn matches_date(&self, record: &TransactionRecord) -> bool {
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }

        let Ok(date) = Date::parse(record.tran_date(), DATE_FORMAT) else {
            return false;
        };

        self.date_from.is_none_or(|from| date >= from) && self.date_to.is_none_or(|to| date <= to)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        ValidationError,
        content_store::{EntryId, FieldValue, Fields},
        transaction::{TransactionFilter, TransactionQuery, TransactionRecord},
    };

    fn record(id: &str, unique_id: &str, kind: &str, amount: f64, date: &str) -> TransactionRecord {
        let mut fields = Fields::new();
        fields.insert("uniqueId".to_owned(), unique_id.into());
        fields.insert("type".to_owned(), kind.into());
        fields.insert("amount".to_owned(), FieldValue::Number(amount));
        fields.insert("tranDate".to_owned(), date.into());
        fields.insert("payerPayee".to_owned(), "J. Doe".into());
        fields.insert("property".to_owned(), format!("Unit {id}").as_str().into());

        TransactionRecord {
            id: EntryId::new(id),
            fields,
        }
    }

    fn sample_records() -> Vec<TransactionRecord> {
        vec![
            record("A", "RENT-1", "Income", 1500.5, "2024-03-15"),
            record("B", "FIX-1", "Expense", 250.0, "2024-03-20"),
            record("C", "RENT-2", "Income", 80.0, "2024-04-01"),
            record("D", "FIX-2", "Expense", 100.0, "2024-04-02"),
        ]
    }

    fn ids(records: &[TransactionRecord]) -> Vec<&str> {
        records.iter().map(|record| record.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let records = sample_records();

        let got = TransactionFilter::default().apply(records.clone());

        assert_eq!(got, records);
    }

    #[test]
    fn type_and_min_amount_are_combined() {
        let filter = TransactionFilter::default()
            .transaction_type("Income")
            .amount_range(Some(100.0), None);

        let got = filter.apply(sample_records());

        assert_eq!(ids(&got), ["A"]);
    }

    #[test]
    fn type_matches_case_insensitively() {
        let got = TransactionFilter::default()
            .transaction_type("expense")
            .apply(sample_records());

        assert_eq!(ids(&got), ["B", "D"]);
    }

    #[test]
    fn search_looks_at_unique_id_payer_and_property() {
        let filter = TransactionFilter::default();

        assert_eq!(ids(&filter.clone().search("rent").apply(sample_records())), ["A", "C"]);
        assert_eq!(ids(&filter.clone().search("unit d").apply(sample_records())), ["D"]);
        assert_eq!(
            filter.search("j. doe").apply(sample_records()).len(),
            sample_records().len()
        );
    }

    #[test]
    fn amount_range_is_inclusive() {
        let got = TransactionFilter::default()
            .amount_range(Some(100.0), Some(250.0))
            .apply(sample_records());

        assert_eq!(ids(&got), ["B", "D"]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let got = TransactionFilter::default()
            .date_range(Some(date!(2024 - 03 - 20)), Some(date!(2024 - 04 - 01)))
            .apply(sample_records());

        assert_eq!(ids(&got), ["B", "C"]);
    }

    #[test]
    fn filtering_is_repeatable() {
        let filter = TransactionFilter::default().search("fix");

        assert_eq!(
            filter.apply(sample_records()),
            filter.apply(sample_records())
        );
    }

    #[test]
    fn query_with_empty_values_matches_everything() {
        let query = TransactionQuery {
            search: Some(String::new()),
            transaction_type: Some("  ".to_owned()),
            ..Default::default()
        };

        assert_eq!(
            TransactionFilter::try_from(query),
            Ok(TransactionFilter::default())
        );
    }

    #[test]
    fn query_is_parsed() {
        let query = TransactionQuery {
            transaction_type: Some("Income".to_owned()),
            min_amount: Some("100".to_owned()),
            date_to: Some("2024-03-31".to_owned()),
            ..Default::default()
        };

        let got = TransactionFilter::try_from(query).unwrap();

        assert_eq!(ids(&got.apply(sample_records())), ["A"]);
    }

    #[test]
    fn query_with_bad_values_is_rejected() {
        let query = TransactionQuery {
            min_amount: Some("lots".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            TransactionFilter::try_from(query),
            Err(ValidationError::InvalidAmount)
        );

        let query = TransactionQuery {
            date_from: Some("March".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            TransactionFilter::try_from(query),
            Err(ValidationError::InvalidDate)
        );
    }
}
