use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub const GROUP_RENEWABLE: &str = "Renewable";
pub const GROUP_NON_RENEWABLE: &str = "Non-Renewable";
pub const GROUP_DEMAND: &str = "Demand at busbar";

pub const TITLE_INTERNATIONAL_BALANCE: &str = "International balance";
pub const TITLE_RENEWABLE_TOTAL: &str = "Renewable total";
pub const TITLE_NON_RENEWABLE_TOTAL: &str = "Non-renewable total";

/// Top-level upstream response. Everything outside `included` is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBalancePayload {
    #[serde(default)]
    pub included: Vec<RawCategory>,
}

/// One `included[]` entry exactly as the provider sends it. Fields are loose
/// on purpose; [`RawCategory::validate`] decides what survives.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCategory {
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
    pub attributes: Option<RawAttributes>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAttributes {
    pub title: Option<String>,
    #[serde(default)]
    pub composite: bool,
    pub values: Option<Value>,
}

/// A category that passed validation: named group, title, and a list of
/// well-formed observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub group_id: String,
    pub title: String,
    pub composite: bool,
    pub values: Vec<Observation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub datetime: OffsetDateTime,
    pub value: f64,
    pub percentage: Option<f64>,
}

impl RawBalancePayload {
    /// Typed view of the payload. A malformed category is dropped with a
    /// warning; it never fails the rest of the payload.
    pub fn validate(self) -> Vec<Category> {
        let mut categories = Vec::with_capacity(self.included.len());
        for raw in self.included {
            match raw.validate() {
                Some(category) => categories.push(category),
                None => {
                    metrics::counter!("categories_skipped_total").increment(1);
                }
            }
        }
        categories
    }
}

impl RawCategory {
    pub fn validate(self) -> Option<Category> {
        let Some(group_id) = self.group_id else {
            tracing::warn!("skipping category without a groupId");
            return None;
        };
        let Some(attributes) = self.attributes else {
            tracing::warn!(group = %group_id, "skipping category without attributes");
            return None;
        };
        let Some(title) = attributes.title else {
            tracing::warn!(group = %group_id, "skipping category without a title");
            return None;
        };
        let items = match attributes.values {
            Some(Value::Array(items)) => items,
            Some(_) => {
                tracing::warn!(group = %group_id, title = %title, "skipping category whose values is not an array");
                return None;
            }
            None => {
                tracing::warn!(group = %group_id, title = %title, "skipping category without values");
                return None;
            }
        };

        let mut values = Vec::with_capacity(items.len());
        for item in &items {
            match parse_observation(item) {
                Some(observation) => values.push(observation),
                None => {
                    tracing::warn!(group = %group_id, title = %title, "skipping malformed observation");
                }
            }
        }

        Some(Category {
            group_id,
            title,
            composite: attributes.composite,
            values,
        })
    }
}

fn parse_observation(item: &Value) -> Option<Observation> {
    let datetime = parse_instant(item.get("datetime")?.as_str()?)?;
    let value = item.get("value")?.as_f64()?;
    // Absent percentage stays absent; it must not collapse to 0.
    let percentage = item.get("percentage").and_then(Value::as_f64);
    Some(Observation {
        datetime,
        value,
        percentage,
    })
}

/// Parses a provider datetime into a canonical UTC instant, so two
/// representations of the same instant land in the same bucket. Strings
/// without an offset are taken as UTC.
pub fn parse_instant(input: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(input, &Rfc3339) {
        return Some(dt.to_offset(UtcOffset::UTC));
    }
    let bare = time::format_description::well_known::Iso8601::DEFAULT;
    PrimitiveDateTime::parse(input, &bare)
        .ok()
        .map(|dt| dt.assume_utc())
}
