//! FILENAME: plan-pivot/src/definition.rs
//! Plan Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a plan view:
//! which metrics exist, which attribute is pivoted into columns, how rows
//! are grouped and which records are filtered out. These structures are
//! designed to be:
//! - Serializable (a session layer may store them as JSON)
//! - Partially specified (every field has a default)
//! - Immutable snapshots of user intent

use serde::{Deserialize, Serialize};
use plan_model::{
    MetricSet, CHANNEL_FIELD, CHANNEL_GROUP_FIELD, SELLING_CHANNEL_FIELD, WEEK_FIELD,
};
use crate::error::PivotResult;
use crate::filter::AttributeFilter;

// ============================================================================
// TIME AXIS
// ============================================================================

/// Order of the time-bucket columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOrder {
    /// Sorted by bucket text (ISO week dates sort chronologically).
    #[default]
    Ascending,
    /// Order of first appearance in the input.
    FirstSeen,
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

fn default_time_field() -> String {
    WEEK_FIELD.to_string()
}

fn default_row_fields() -> Vec<String> {
    vec![
        CHANNEL_FIELD.to_string(),
        CHANNEL_GROUP_FIELD.to_string(),
        SELLING_CHANNEL_FIELD.to_string(),
    ]
}

/// The complete, serializable definition of a plan view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDefinition {
    /// Metric names in display order.
    #[serde(default)]
    pub metrics: MetricSet,

    /// Attribute pivoted into columns.
    #[serde(default = "default_time_field")]
    pub time_field: String,

    /// Grouping attributes, ordered from outer to inner.
    #[serde(default = "default_row_fields")]
    pub row_fields: Vec<String>,

    /// Record filters, combined with AND.
    #[serde(default)]
    pub filters: Vec<AttributeFilter>,

    #[serde(default)]
    pub time_order: TimeOrder,

    /// Version for change tracking by the caller.
    #[serde(default)]
    pub version: u64,
}

impl Default for PlanDefinition {
    fn default() -> Self {
        PlanDefinition {
            metrics: MetricSet::standard(),
            time_field: default_time_field(),
            row_fields: default_row_fields(),
            filters: Vec::new(),
            time_order: TimeOrder::default(),
            version: 0,
        }
    }
}

impl PlanDefinition {
    pub fn new(metrics: MetricSet, time_field: impl Into<String>) -> Self {
        PlanDefinition {
            metrics,
            time_field: time_field.into(),
            row_fields: Vec::new(),
            ..PlanDefinition::default()
        }
    }

    pub fn with_row_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.row_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, filter: AttributeFilter) -> Self {
        self.set_filter(filter);
        self
    }

    /// Replaces the filter on the same attribute, or appends a new one.
    pub fn set_filter(&mut self, filter: AttributeFilter) {
        match self.filters.iter_mut().find(|f| f.attribute == filter.attribute) {
            Some(existing) => *existing = filter,
            None => self.filters.push(filter),
        }
    }

    /// Increments the version.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn from_json(json: &str) -> PivotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> PivotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
