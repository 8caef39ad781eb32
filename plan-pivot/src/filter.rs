//! FILENAME: plan-pivot/src/filter.rs
//! Record filters applied before reshaping.

use log::debug;
use serde::{Deserialize, Serialize};
use rustc_hash::FxHashSet;
use plan_model::{AttrValue, Record};
use crate::error::{PivotError, PivotResult};

/// Keeps records whose `attribute` value is one of `allowed`.
/// An empty `allowed` list does not restrict anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub attribute: String,

    #[serde(default)]
    pub allowed: Vec<AttrValue>,
}

impl AttributeFilter {
    pub fn new<I>(attribute: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = AttrValue>,
    {
        AttributeFilter {
            attribute: attribute.into(),
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.allowed.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if !self.is_active() {
            return true;
        }
        let value = record.attr(&self.attribute).unwrap_or(&AttrValue::Empty);
        self.allowed.contains(value)
    }
}

/// Returns the records that pass every active filter, in input order.
pub fn apply_filters<'a>(
    records: &'a [Record],
    filters: &[AttributeFilter],
) -> PivotResult<Vec<&'a Record>> {
    for filter in filters.iter().filter(|f| f.is_active()) {
        let known = records.is_empty()
            || records.iter().any(|r| r.attr(&filter.attribute).is_some());
        if !known {
            return Err(PivotError::UnknownAttribute(filter.attribute.clone()));
        }
    }

    let kept: Vec<&Record> = records
        .iter()
        .filter(|record| filters.iter().all(|f| f.matches(record)))
        .collect();

    debug!(
        "apply_filters filters={} records={} kept={}",
        filters.iter().filter(|f| f.is_active()).count(),
        records.len(),
        kept.len()
    );
    Ok(kept)
}

/// Sorted distinct non-null values of `attribute`, for filter option lists.
pub fn distinct_values(records: &[Record], attribute: &str) -> PivotResult<Vec<AttrValue>> {
    let mut seen: FxHashSet<&AttrValue> = FxHashSet::default();
    let mut found = false;

    for record in records {
        if let Some(value) = record.attr(attribute) {
            found = true;
            if !matches!(value, AttrValue::Empty) {
                seen.insert(value);
            }
        }
    }

    if !found && !records.is_empty() {
        return Err(PivotError::UnknownAttribute(attribute.to_string()));
    }

    let mut values: Vec<AttrValue> = seen.into_iter().cloned().collect();
    values.sort();
    Ok(values)
}
