//! FILENAME: plan-pivot/src/view.rs
//! Plan View - Renderable output for the grid.
//!
//! This module holds the flattened rows the renderer shows top to bottom,
//! with the metadata it needs for:
//! - Tree hierarchy (indentation, expand/collapse arrows)
//! - Week columns (one value per time bucket on every row)

use serde::{Deserialize, Serialize};
use crate::node::NodeId;

// ============================================================================
// ROW TYPES
// ============================================================================

/// The type of a display row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    /// Top-level metric roll-up. Always shown.
    Metric,
    /// Roll-up for one attribute value below a metric.
    Group,
}

/// One row of the rendered hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub id: NodeId,

    /// 0 for metric rows.
    pub depth: usize,

    /// Metric name, attribute value, or `(blank)`.
    pub label: String,

    pub kind: RowKind,

    /// Grouping attribute this row's label belongs to (`None` for metric rows).
    pub attribute: Option<String>,

    /// Whether a deeper grouping level exists.
    pub is_expandable: bool,

    /// Whether this row's children follow it.
    pub is_expanded: bool,

    /// Subtree sums, one per time bucket (aligned with `PlanView::time_buckets`).
    pub values: Vec<u64>,

    /// Sum of `values`.
    pub total: u64,

    /// Index of the parent row in `PlanView::rows`.
    pub parent_index: Option<usize>,
}

// ============================================================================
// MAIN VIEW STRUCT
// ============================================================================

/// The complete rendered view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanView {
    /// Week column labels.
    pub time_buckets: Vec<String>,

    /// Grouping attributes, outer to inner.
    pub group_attributes: Vec<String>,

    /// Rows in pre-order.
    pub rows: Vec<DisplayRow>,

    /// Definition version this view was built from.
    pub version: u64,
}

impl PlanView {
    pub fn new(time_buckets: Vec<String>, group_attributes: Vec<String>) -> Self {
        PlanView {
            time_buckets,
            group_attributes,
            rows: Vec::new(),
            version: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.rows.iter().position(|r| &r.id == id)
    }

    pub fn find(&self, id: &NodeId) -> Option<&DisplayRow> {
        self.rows.iter().find(|r| &r.id == id)
    }

    /// Metric rows in display order.
    pub fn roots(&self) -> impl Iterator<Item = &DisplayRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Metric)
    }

    /// Indices of the rows directly below `index`.
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.parent_index == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Value of the row `id` for time bucket `bucket`.
    pub fn value(&self, id: &NodeId, bucket: &str) -> Option<u64> {
        let column = self.time_buckets.iter().position(|b| b == bucket)?;
        self.find(id).and_then(|r| r.values.get(column).copied())
    }

    /// (bucket, value) pairs of a row.
    pub fn bucket_values<'a>(&'a self, row: &'a DisplayRow) -> impl Iterator<Item = (&'a str, u64)> {
        self.time_buckets
            .iter()
            .map(String::as_str)
            .zip(row.values.iter().copied())
    }

    /// Grid header labels: metric column, one per grouping attribute, one per week.
    pub fn column_headers(&self) -> Vec<String> {
        std::iter::once("Metric".to_string())
            .chain(self.group_attributes.iter().cloned())
            .chain(self.time_buckets.iter().map(|w| format!("Week {}", w)))
            .collect()
    }
}
