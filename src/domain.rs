use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One leaf generation category's contribution to a period (e.g. solar, wind).
///
/// `percentage` is only present when the provider reports it; it is never
/// defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub percentage: Option<f64>,
}

/// Electricity balance for a single day or hour.
///
/// `ts` is the unique key: re-ingesting a period replaces the stored record
/// wholesale. `generation` is the sum of the renewable and non-renewable
/// composite totals, not a sum over `breakdown`. `imports` and `exports` are
/// magnitudes classified from the signed international balance, so at most one
/// of them is nonzero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BalanceRecord {
    #[serde(rename = "timestamp", with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub generation: f64,
    pub demand: f64,
    pub imports: f64,
    pub exports: f64,
    #[sqlx(json)]
    pub breakdown: Vec<BreakdownEntry>,
}

impl BalanceRecord {
    /// Zeroed record for a period; the normalizer fills it in field by field.
    pub fn empty(ts: OffsetDateTime) -> Self {
        Self {
            ts,
            generation: 0.0,
            demand: 0.0,
            imports: 0.0,
            exports: 0.0,
            breakdown: Vec::new(),
        }
    }
}
