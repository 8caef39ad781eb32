//! FILENAME: tests/common/mod.rs
//! Fixtures and assertion helpers for plan-pivot integration tests.

#![allow(dead_code)]

use plan_model::{Location, MetricSet, Record, WEEK_FIELD};
use plan_pivot::{DisplayRow, PlanView};

// ============================================================================
// FIXTURES
// ============================================================================

/// A small merchandise plan: five locations over three weeks.
pub struct MerchFixture;

impl MerchFixture {
    /// Weeks in generation order. Deliberately not sorted.
    pub fn weeks() -> Vec<&'static str> {
        vec!["2024-01-15", "2024-01-01", "2024-01-08"]
    }

    pub fn locations() -> Vec<Location> {
        let raw = [
            ("Store 1", "Retail", "Mall", "Stores", false, false),
            ("Store 2", "Retail", "Mall", "Stores", false, false),
            ("Outlet 1", "Retail", "Outlet", "Outlets", false, false),
            ("Web", "Online", "Digital", "Ecom", false, false),
            ("DC", "", "", "", true, true),
            // Unnamed rows are skipped by the generator
            ("  ", "Retail", "Mall", "Stores", false, false),
        ];
        raw.iter()
            .map(|(name, channel, group, selling, source, inventory)| {
                let mut location = Location::new(*name);
                location.channel = channel.to_string();
                location.channel_group = group.to_string();
                location.selling_channel = selling.to_string();
                location.source = *source;
                location.inventory = *inventory;
                location
            })
            .collect()
    }

    /// Deterministic value for a location and week.
    pub fn value(location_index: usize, week_index: usize) -> u64 {
        10 * (location_index as u64 + 1) + week_index as u64
    }

    /// One record per named location and week. Every record carries every
    /// standard metric; metrics the location kind does not populate are zero.
    pub fn records() -> Vec<Record> {
        let metrics = MetricSet::standard();
        let mut records = Vec::new();

        for (li, location) in Self::locations().iter().enumerate() {
            if !location.is_named() {
                continue;
            }
            let kind = location.kind();
            for (wi, week) in Self::weeks().iter().enumerate() {
                let mut record = Record::new().with_attr(WEEK_FIELD, *week);
                for (name, value) in location.dimensions() {
                    record.set_attr(name, value);
                }
                for metric in metrics.iter() {
                    let value = if kind.populates(metric) { Self::value(li, wi) } else { 0 };
                    record = record.with_metric(metric, value);
                }
                records.push(record);
            }
        }
        records
    }

    /// Sum of `metric` over every record.
    pub fn metric_total(records: &[Record], metric: &str) -> u64 {
        records.iter().filter_map(|r| r.metric(metric)).sum()
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Assert that every row has one value per time bucket.
pub fn assert_width(view: &PlanView) {
    for row in &view.rows {
        assert_eq!(
            row.values.len(),
            view.time_buckets.len(),
            "row '{}' has the wrong width",
            row.id
        );
    }
}

/// Assert that every expanded row equals the sum of its visible children.
pub fn assert_children_sum(view: &PlanView) {
    for (index, row) in view.rows.iter().enumerate() {
        if !row.is_expanded {
            continue;
        }
        let children: Vec<&DisplayRow> =
            view.children_of(index).into_iter().map(|i| &view.rows[i]).collect();
        assert!(!children.is_empty(), "expanded row '{}' has no children", row.id);

        for (column, expected) in row.values.iter().enumerate() {
            let sum: u64 = children.iter().map(|c| c.values[column]).sum();
            assert_eq!(sum, *expected, "row '{}' column {}", row.id, column);
        }
    }
}

/// Labels of the view's rows, top to bottom.
pub fn labels(view: &PlanView) -> Vec<&str> {
    view.rows.iter().map(|r| r.label.as_str()).collect()
}

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
