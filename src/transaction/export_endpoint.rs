//! Defines the endpoint that downloads the CSV transaction report.

use axum::{
    Extension,
    extract::{FromRef, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use time::OffsetDateTime;

use crate::{AppState, Error, identity::CallerId, timezone::get_local_offset};

use super::{TransactionFilter, TransactionQuery, TransactionService, report::write_csv_report};

/// The state needed to export the report.
#[derive(Clone)]
pub struct ExportState {
    /// Reads the transactions for the caller.
    pub service: TransactionService,
    /// Printed at the top of the report.
    pub company_name: String,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            service: TransactionService::from_ref(state),
            company_name: state.company_name.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler that responds with the CSV report for the transactions matching
/// the query string.
pub async fn export_transactions_endpoint(
    State(state): State<ExportState>,
    Extension(caller): Extension<CallerId>,
    Query(query): Query<TransactionQuery>,
) -> Result<Response, Error> {
    let filter = TransactionFilter::try_from(query)?;
    let records = state.service.list(&caller, &filter).await?;

    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        return Err(Error::InvalidTimezoneError(state.local_timezone));
    };
    let generated_at = OffsetDateTime::now_utc().to_offset(local_offset);

    let report = write_csv_report(&records, &state.company_name, generated_at)?;
    tracing::info!("{caller} exported {} transactions", records.len());

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                CONTENT_DISPOSITION,
                "attachment; filename=\"transactions_export.csv\"",
            ),
        ],
        report,
    )
        .into_response())
}
