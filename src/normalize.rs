use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::domain::{BalanceRecord, BreakdownEntry};
use crate::upstream::payload::{
    Category, GROUP_DEMAND, GROUP_NON_RENEWABLE, GROUP_RENEWABLE, TITLE_INTERNATIONAL_BALANCE,
    TITLE_NON_RENEWABLE_TOTAL, TITLE_RENEWABLE_TOTAL,
};

/// Reshapes validated upstream categories into per-period balance records,
/// keyed by canonical instant.
///
/// Leaf generation categories contribute one breakdown entry each; composite
/// aggregates are excluded from the breakdown and instead feed `generation`
/// (the sum of the renewable and non-renewable totals). Demand rows set
/// `demand`, and the international-balance row additionally classifies the
/// period as net importer or exporter by the sign of its value.
pub fn normalize(categories: &[Category]) -> BTreeMap<OffsetDateTime, BalanceRecord> {
    let mut buckets: BTreeMap<OffsetDateTime, BalanceRecord> = BTreeMap::new();

    for category in categories {
        for obs in &category.values {
            let bucket = buckets
                .entry(obs.datetime)
                .or_insert_with(|| BalanceRecord::empty(obs.datetime));

            match category.group_id.as_str() {
                GROUP_RENEWABLE | GROUP_NON_RENEWABLE if !category.composite => {
                    bucket.breakdown.push(BreakdownEntry {
                        kind: category.title.clone(),
                        value: obs.value,
                        percentage: obs.percentage,
                    });
                }
                GROUP_DEMAND => {
                    bucket.demand = obs.value;
                    if category.title == TITLE_INTERNATIONAL_BALANCE {
                        // Sign classifies the flow; at most one side is nonzero.
                        if obs.value < 0.0 {
                            bucket.imports = obs.value.abs();
                            bucket.exports = 0.0;
                        } else {
                            bucket.exports = obs.value;
                            bucket.imports = 0.0;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // Generation is the sum of the two composite totals. It is accumulated
    // here, independent of the breakdown entries above, so repeated matches
    // add up rather than deduplicate.
    for category in categories {
        if is_composite_total(category) {
            for obs in &category.values {
                let bucket = buckets
                    .entry(obs.datetime)
                    .or_insert_with(|| BalanceRecord::empty(obs.datetime));
                bucket.generation += obs.value;
            }
        }
    }

    buckets
}

fn is_composite_total(category: &Category) -> bool {
    (category.group_id == GROUP_RENEWABLE && category.title == TITLE_RENEWABLE_TOTAL)
        || (category.group_id == GROUP_NON_RENEWABLE && category.title == TITLE_NON_RENEWABLE_TOTAL)
}
