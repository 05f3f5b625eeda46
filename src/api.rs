use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::domain::BalanceRecord;
use crate::store::{RecordStore, StorageError};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn RecordStore>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RangeParams {
    pub start_date: String,
    pub end_date: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidDate(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Storage(e) => {
                // Surfaced to the caller as a server error, details stay in the log.
                tracing::error!(error = %e, "balance query failed against the record store");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/balance", get(electrical_balance))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds and serves the query API until the process stops.
pub async fn serve(bind_addr: &str, state: ApiState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid api bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "query api listening");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// The one query operation: balance records for an inclusive date range,
/// ascending by timestamp. An unknown range is an empty list, not an error.
async fn electrical_balance(
    State(state): State<ApiState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<BalanceRecord>>, ApiError> {
    metrics::counter!("balance_queries_total").increment(1);

    let start = parse_range_bound(&params.start_date, Bound::Start)?;
    let end = parse_range_bound(&params.end_date, Bound::End)?;

    let records = state.store.query_range(start, end).await?;
    Ok(Json(records))
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 datetime. A bare date expands to the
/// start or the end of that day, keeping the range inclusive of the whole end
/// day.
fn parse_range_bound(input: &str, bound: Bound) -> Result<OffsetDateTime, ApiError> {
    if let Ok(dt) = OffsetDateTime::parse(input, &Rfc3339) {
        return Ok(dt.to_offset(UtcOffset::UTC));
    }

    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(input, &format).map_err(|_| {
        ApiError::InvalidDate(format!(
            "could not parse {input:?} as a date or RFC 3339 datetime"
        ))
    })?;

    let time = match bound {
        Bound::Start => Time::MIDNIGHT,
        Bound::End => time::macros::time!(23:59:59.999999999),
    };
    Ok(PrimitiveDateTime::new(date, time).assume_utc())
}
