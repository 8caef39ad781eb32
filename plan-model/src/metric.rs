//! FILENAME: plan-model/src/metric.rs
//! PURPOSE: The ordered set of metric names known to the plan.

use serde::{Deserialize, Serialize};

pub const GROSS_SALES_UNITS: &str = "Gross Sales Units";
pub const RECEIPTS_UNITS: &str = "Receipts Units";
pub const BOP_UNITS: &str = "BOP Units";
pub const ON_ORDER_UNITS: &str = "On Order Units";

/// Index of a metric within its `MetricSet`.
pub type MetricIndex = usize;

/// Ordered list of metric names. Order is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet {
    names: Vec<String>,
}

impl MetricSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetricSet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The four merchandise-plan metrics.
    pub fn standard() -> Self {
        MetricSet::new([GROSS_SALES_UNITS, RECEIPTS_UNITS, BOP_UNITS, ON_ORDER_UNITS])
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: MetricIndex) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<MetricIndex> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Returns the first name that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.names
            .iter()
            .enumerate()
            .find(|(i, n)| self.names[..*i].contains(n))
            .map(|(_, n)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        MetricSet::standard()
    }
}
