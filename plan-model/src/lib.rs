//! FILENAME: plan-model/src/lib.rs
//! PURPOSE: Shared input types for the merchandise-plan pivot.
//! CONTEXT: Re-exports public types for use by `plan-pivot` and callers.

pub mod location;
pub mod metric;
pub mod record;

// Re-export commonly used types at the crate root
pub use location::{
    Location, LocationKind, CHANNEL_FIELD, CHANNEL_GROUP_FIELD, LOCATION_FIELD,
    SELLING_CHANNEL_FIELD,
};
pub use metric::{
    MetricIndex, MetricSet, BOP_UNITS, GROSS_SALES_UNITS, ON_ORDER_UNITS, RECEIPTS_UNITS,
};
pub use record::{AttrValue, Record, BLANK_LABEL};

/// Default name of the time-bucket attribute.
pub const WEEK_FIELD: &str = "Week";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_records_from_locations() {
        let mut location = Location::new("Store 1");
        location.channel = "Retail".to_string();

        let mut record = Record::new().with_attr(WEEK_FIELD, "2024-01-01");
        for (name, value) in location.dimensions() {
            record.set_attr(name, value);
        }
        for metric in MetricSet::standard().iter() {
            let value = if location.kind().populates(metric) { 10 } else { 0 };
            record = record.with_metric(metric, value);
        }

        assert_eq!(record.attr(CHANNEL_FIELD), Some(&AttrValue::text("Retail")));
        assert_eq!(record.metric(GROSS_SALES_UNITS), Some(10));
        assert_eq!(record.metric(BOP_UNITS), Some(0));
    }
}
