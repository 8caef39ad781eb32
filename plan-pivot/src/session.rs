//! FILENAME: plan-pivot/src/session.rs
//! PURPOSE: Owned session state for one dashboard user.
//! CONTEXT: Holds the generated records, the user's definition (grouping and
//! filters) and the expansion state. Nothing here is global; the UI layer
//! keeps a `PlanSession` wherever it keeps per-user state. Every refresh
//! recomputes from scratch.

use log::info;
use plan_model::{AttrValue, Record};
use crate::cache::{reshape_with, WideTable};
use crate::definition::PlanDefinition;
use crate::engine::{build, collapse_subtree, expand_all};
use crate::error::{PivotError, PivotResult};
use crate::expansion::ExpansionState;
use crate::filter::{distinct_values, AttributeFilter};
use crate::node::NodeId;
use crate::view::PlanView;

#[derive(Debug, Clone, Default)]
pub struct PlanSession {
    definition: PlanDefinition,
    records: Vec<Record>,
    expansion: ExpansionState,
}

impl PlanSession {
    pub fn new(definition: PlanDefinition) -> Self {
        PlanSession {
            definition,
            records: Vec::new(),
            expansion: ExpansionState::new(),
        }
    }

    pub fn definition(&self) -> &PlanDefinition {
        &self.definition
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn has_data(&self) -> bool {
        !self.records.is_empty()
    }

    /// Replaces the data set. Expansion ids are kept; ids that no longer
    /// match a node are ignored by the next refresh.
    ///
    /// Grouping and filter attributes chosen before any data was loaded are
    /// checked here; on failure the previous data set stays in place.
    pub fn load_records(&mut self, records: Vec<Record>) -> PivotResult<()> {
        let attributes = self
            .definition
            .row_fields
            .iter()
            .chain(self.definition.filters.iter().map(|f| &f.attribute));
        for name in attributes {
            check_dimension(&self.definition, &records, name)?;
        }

        info!("load_records count={}", records.len());
        self.records = records;
        self.definition.bump_version();
        Ok(())
    }

    /// Without records every name is accepted; `load_records` checks it later.
    fn check_attribute(&self, name: &str) -> PivotResult<()> {
        check_dimension(&self.definition, &self.records, name)
    }

    pub fn set_group_by<I, S>(&mut self, fields: I) -> PivotResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        for field in &fields {
            self.check_attribute(field)?;
        }
        info!("set_group_by fields={:?}", fields);
        self.definition.row_fields = fields;
        self.definition.bump_version();
        Ok(())
    }

    pub fn set_filter(&mut self, filter: AttributeFilter) -> PivotResult<()> {
        self.check_attribute(&filter.attribute)?;
        info!(
            "set_filter attribute={} allowed={}",
            filter.attribute,
            filter.allowed.len()
        );
        self.definition.set_filter(filter);
        self.definition.bump_version();
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        info!("clear_filters count={}", self.definition.filters.len());
        self.definition.filters.clear();
        self.definition.bump_version();
    }

    /// Flips one node. Collapsing a node also collapses everything below it.
    /// Returns whether the node is now expanded.
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if self.expansion.contains(id) {
            self.collapse(id);
            false
        } else {
            self.expansion.insert(id.clone());
            info!("toggle node='{}' expanded=true", id);
            true
        }
    }

    /// Collapses `id` and everything below it.
    pub fn collapse(&mut self, id: &NodeId) {
        self.expansion = collapse_subtree(&self.expansion, id);
        info!("collapse node='{}' remaining={}", id, self.expansion.len());
    }

    pub fn expand_all(&mut self) -> PivotResult<()> {
        if !self.has_data() {
            return Ok(());
        }
        let table = self.table()?;
        self.expansion = expand_all(&table, &self.definition.row_fields)?;
        info!("expand_all ids={}", self.expansion.len());
        Ok(())
    }

    pub fn collapse_all(&mut self) {
        info!("collapse_all ids={}", self.expansion.len());
        self.expansion = ExpansionState::new();
    }

    /// Restores expansion state saved with `ExpansionState::to_keys`.
    pub fn restore_expansion<I, S>(&mut self, keys: I) -> PivotResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.expansion = ExpansionState::from_keys(keys)?;
        Ok(())
    }

    /// Filter choices for `attribute`, taken from the unfiltered data.
    pub fn filter_options(&self, attribute: &str) -> PivotResult<Vec<AttrValue>> {
        self.check_attribute(attribute)?;
        distinct_values(&self.records, attribute)
    }

    /// The filtered, reshaped table.
    pub fn table(&self) -> PivotResult<WideTable> {
        reshape_with(&self.records, &self.definition)
    }

    /// Recomputes the view. Without data the view is empty.
    pub fn refresh(&self) -> PivotResult<PlanView> {
        if !self.has_data() {
            let mut view = PlanView::new(Vec::new(), self.definition.row_fields.clone());
            view.version = self.definition.version;
            return Ok(view);
        }

        let table = self.table()?;
        let mut view = build(&table, &self.definition.row_fields, &self.expansion)?;
        view.version = self.definition.version;
        Ok(view)
    }
}

/// Checks that `name` is a dimension of `records` other than the time field or a metric.
fn check_dimension(definition: &PlanDefinition, records: &[Record], name: &str) -> PivotResult<()> {
    if records.is_empty() {
        return Ok(());
    }
    let is_dimension = name != definition.time_field
        && !definition.metrics.contains(name)
        && records.iter().all(|r| r.attr(name).is_some());
    if is_dimension {
        Ok(())
    } else {
        Err(PivotError::UnknownAttribute(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_model::{MetricSet, GROSS_SALES_UNITS};

    fn create_test_session() -> PlanSession {
        let definition = PlanDefinition::new(MetricSet::new([GROSS_SALES_UNITS]), "Week")
            .with_row_fields(["Channel", "Location"]);
        let mut session = PlanSession::new(definition);
        session.load_records(vec![
            Record::new()
                .with_attr("Week", "W1")
                .with_attr("Channel", "Retail")
                .with_attr("Location", "Store 1")
                .with_metric(GROSS_SALES_UNITS, 10),
            Record::new()
                .with_attr("Week", "W1")
                .with_attr("Channel", "Retail")
                .with_attr("Location", "Store 2")
                .with_metric(GROSS_SALES_UNITS, 20),
            Record::new()
                .with_attr("Week", "W2")
                .with_attr("Channel", "Online")
                .with_attr("Location", "Web")
                .with_metric(GROSS_SALES_UNITS, 5),
        ])
        .unwrap();
        session
    }

    fn sales() -> NodeId {
        NodeId::metric(GROSS_SALES_UNITS)
    }

    #[test]
    fn test_refresh_without_data() {
        let session = PlanSession::new(PlanDefinition::default());
        let view = session.refresh().unwrap();
        assert!(view.rows.is_empty());
        assert_eq!(view.group_attributes, PlanDefinition::default().row_fields);
    }

    #[test]
    fn test_toggle_collapses_descendants() {
        let mut session = create_test_session();
        let retail = sales().child(AttrValue::text("Retail"));

        assert!(session.toggle(&sales()));
        assert!(session.toggle(&retail));
        assert_eq!(session.refresh().unwrap().rows.len(), 5);

        assert!(!session.toggle(&sales()));
        assert!(session.expansion().is_empty());
        assert_eq!(session.refresh().unwrap().rows.len(), 1);
    }

    #[test]
    fn test_filter_changes_totals_not_options() {
        let mut session = create_test_session();
        session
            .set_filter(AttributeFilter::new("Channel", [AttrValue::text("Online")]))
            .unwrap();

        let view = session.refresh().unwrap();
        assert_eq!(view.rows[0].total, 5);
        assert_eq!(view.time_buckets, vec!["W2"]);
        assert_eq!(session.filter_options("Channel").unwrap().len(), 2);
    }

    #[test]
    fn test_filter_to_nothing_keeps_schema() {
        let mut session = create_test_session();
        session
            .set_filter(AttributeFilter::new("Channel", [AttrValue::text("Wholesale")]))
            .unwrap();
        let view = session.refresh().unwrap();
        assert!(view.rows.is_empty());
    }

    #[test]
    fn test_rejects_unknown_grouping() {
        let mut session = create_test_session();
        assert!(matches!(
            session.set_group_by(["Region"]),
            Err(PivotError::UnknownAttribute(_))
        ));
        assert!(session.set_group_by(["Week"]).is_err());
        assert_eq!(session.definition().row_fields, vec!["Channel", "Location"]);
    }

    #[test]
    fn test_collapse_keeps_siblings() {
        let mut session = create_test_session();
        session.expand_all().unwrap();
        let online = sales().child(AttrValue::text("Online"));
        session.collapse(&sales().child(AttrValue::text("Retail")));

        let view = session.refresh().unwrap();
        let labels: Vec<&str> = view.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec![GROSS_SALES_UNITS, "Retail", "Online", "Web"]);
        assert!(session.expansion().contains(&online));
    }

    #[test]
    fn test_grouping_chosen_before_data_is_checked_on_load() {
        let mut session = PlanSession::new(PlanDefinition::default());
        session.set_group_by(["Bogus"]).unwrap();

        let err = session.load_records(create_test_session().records().to_vec()).unwrap_err();
        assert!(matches!(err, PivotError::UnknownAttribute(ref a) if a == "Bogus"));
        assert!(!session.has_data());
    }

    #[test]
    fn test_attribute_must_be_on_every_record() {
        let mut session = create_test_session();
        let mut records = session.records().to_vec();
        records[2].set_attr("Region", "West");
        session.load_records(records).unwrap();

        assert!(session.set_group_by(["Region"]).is_err());
        assert!(session.filter_options("Region").is_err());
    }

    #[test]
    fn test_expand_all_then_collapse_all() {
        let mut session = create_test_session();
        session.expand_all().unwrap();
        // root + 2 channels + 3 locations
        assert_eq!(session.refresh().unwrap().rows.len(), 6);

        session.collapse_all();
        assert_eq!(session.refresh().unwrap().rows.len(), 1);
    }

    #[test]
    fn test_restore_expansion_from_keys() {
        let mut session = create_test_session();
        session.toggle(&sales());
        let keys = session.expansion().to_keys();

        let mut other = create_test_session();
        other.restore_expansion(&keys).unwrap();
        assert_eq!(other.refresh().unwrap(), session.refresh().unwrap());
    }

    #[test]
    fn test_version_tracks_changes() {
        let mut session = create_test_session();
        let before = session.refresh().unwrap().version;
        session.set_group_by(["Location"]).unwrap();
        assert_eq!(session.refresh().unwrap().version, before + 1);
    }
}
