use std::time::Duration;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::upstream::payload::RawBalancePayload;

/// Aggregation granularity requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncation {
    Day,
    Hour,
}

impl Truncation {
    pub fn as_param(self) -> &'static str {
        match self {
            Truncation::Day => "day",
            Truncation::Hour => "hour",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Http(reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("upstream payload could not be decoded: {0}")]
    Decode(reqwest::Error),
    #[error("could not format request range: {0}")]
    Format(#[from] time::error::Format),
}

/// Anything that can produce a balance payload for a range. The HTTP client
/// below is the production implementation; tests substitute their own.
#[async_trait::async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn fetch_balance(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        truncation: Truncation,
    ) -> Result<RawBalancePayload, UpstreamError>;
}

/// Thin client for the grid operator's statistics API.
pub struct BalanceClient {
    http: reqwest::Client,
    base_url: String,
}

impl BalanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait::async_trait]
impl BalanceProvider for BalanceClient {
    /// Single GET against the versioned balance endpoint. No internal retry;
    /// skipping a failed cycle is the refresh task's call.
    async fn fetch_balance(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        truncation: Truncation,
    ) -> Result<RawBalancePayload, UpstreamError> {
        let url = format!("{}/balance/electricity-balance", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("start_date", start.format(&Rfc3339)?),
                ("end_date", end.format(&Rfc3339)?),
                ("time_trunc", truncation.as_param().to_string()),
            ])
            .send()
            .await
            .map_err(UpstreamError::Http)?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        response
            .json::<RawBalancePayload>()
            .await
            .map_err(UpstreamError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{routing::get, Router};
    use time::macros::datetime;

    #[test]
    fn truncation_maps_to_query_param() {
        assert_eq!(Truncation::Day.as_param(), "day");
        assert_eq!(Truncation::Hour.as_param(), "hour");
    }

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });
        format!("http://{addr}")
    }

    fn range() -> (OffsetDateTime, OffsetDateTime) {
        (
            datetime!(2023-01-01 00:00:00 UTC),
            datetime!(2023-01-02 00:00:00 UTC),
        )
    }

    #[tokio::test]
    async fn well_formed_response_decodes() {
        let app = Router::new().route(
            "/balance/electricity-balance",
            get(|| async {
                axum::Json(serde_json::json!({
                    "included": [{
                        "groupId": "Renewable",
                        "attributes": {
                            "title": "Solar",
                            "values": [{"datetime": "2023-01-01T00:00:00Z", "value": 40.0}]
                        }
                    }]
                }))
            }),
        );
        let base = spawn_upstream(app).await;
        let client = BalanceClient::new(base, Duration::from_secs(5)).expect("client");

        let (start, end) = range();
        let payload = client
            .fetch_balance(start, end, Truncation::Day)
            .await
            .expect("fetch");
        assert_eq!(payload.included.len(), 1);
    }

    #[tokio::test]
    async fn non_2xx_maps_to_status_error() {
        let app = Router::new().route(
            "/balance/electricity-balance",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let base = spawn_upstream(app).await;
        let client = BalanceClient::new(base, Duration::from_secs(5)).expect("client");

        let (start, end) = range();
        let result = client.fetch_balance(start, end, Truncation::Hour).await;
        assert!(matches!(
            result,
            Err(UpstreamError::Status(code)) if code == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        ));
    }

    #[tokio::test]
    async fn non_json_body_maps_to_decode_error() {
        let app = Router::new().route(
            "/balance/electricity-balance",
            get(|| async { "<html>definitely not json</html>" }),
        );
        let base = spawn_upstream(app).await;
        let client = BalanceClient::new(base, Duration::from_secs(5)).expect("client");

        let (start, end) = range();
        let result = client.fetch_balance(start, end, Truncation::Day).await;
        assert!(matches!(result, Err(UpstreamError::Decode(_))));
    }
}
