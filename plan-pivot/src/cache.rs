//! FILENAME: plan-pivot/src/cache.rs
//! Wide Table - The reshaped, interned representation of plan records.
//!
//! `reshape` melts every record into one value per metric, groups the values
//! by (dimension combination, metric) and pivots the time field into columns.
//!
//! Architecture:
//! - Each unique dimension value is stored once per field and referenced by index
//! - Each WideRow stores its dimension combination as a vector of value ids
//! - Every WideRow has one column per time bucket seen anywhere in the input,
//!   zero where the combination has no data for that bucket

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use plan_model::{AttrValue, MetricIndex, MetricSet, Record};
use crate::definition::{PlanDefinition, TimeOrder};
use crate::error::{PivotError, PivotResult};
use crate::filter::apply_filters;

// ============================================================================
// VALUE INTERNING
// ============================================================================

/// A reference to an interned value within a field's unique value store.
pub type ValueId = u32;

/// Represents a null value in the cache.
pub const VALUE_ID_EMPTY: ValueId = u32::MAX;

static EMPTY_VALUE: AttrValue = AttrValue::Empty;

/// Unique-value store for one dimension attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldCache {
    /// Attribute name.
    pub name: String,

    /// Map from text to its unique ID (for deduplication during build).
    value_to_id: FxHashMap<String, ValueId>,

    /// Ordered list of unique values (indexed by ValueId), in first-seen order.
    id_to_value: Vec<AttrValue>,
}

impl FieldCache {
    pub fn new(name: String) -> Self {
        FieldCache {
            name,
            value_to_id: FxHashMap::default(),
            id_to_value: Vec::new(),
        }
    }

    /// Interns a value and returns its ValueId.
    /// If the value already exists, returns the existing ID.
    pub fn intern(&mut self, value: &AttrValue) -> ValueId {
        let text = match value {
            AttrValue::Empty => return VALUE_ID_EMPTY,
            AttrValue::Text(s) => s,
        };

        if let Some(&id) = self.value_to_id.get(text) {
            return id;
        }

        let id = self.id_to_value.len() as ValueId;
        self.id_to_value.push(value.clone());
        self.value_to_id.insert(text.clone(), id);
        id
    }

    /// Gets the value for a given ID.
    pub fn get_value(&self, id: ValueId) -> Option<&AttrValue> {
        if id == VALUE_ID_EMPTY {
            return Some(&EMPTY_VALUE);
        }
        self.id_to_value.get(id as usize)
    }

    /// Returns the number of unique values (excluding empty).
    pub fn unique_count(&self) -> usize {
        self.id_to_value.len()
    }
}

// ============================================================================
// WIDE ROWS
// ============================================================================

/// One (dimension combination, metric) row with a value per time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideRow {
    /// ValueIds for each dimension field, indexed like `WideTable::fields`.
    pub key: Vec<ValueId>,

    /// Index into the table's metric set.
    pub metric: MetricIndex,

    /// One value per time bucket, indexed like `WideTable::time_buckets`.
    pub values: Vec<u64>,
}

impl WideRow {
    /// Sum of `values`. `reshape` rejects tables where this could overflow.
    pub fn total(&self) -> u64 {
        self.values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Statistics about the reshape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_records: usize,
    pub combinations: usize,
    pub wide_rows: usize,
}

/// The reshaped table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WideTable {
    /// Metric names in display order.
    pub metrics: MetricSet,

    /// The attribute pivoted into columns.
    pub time_field: String,

    /// One store per dimension attribute, excluding the time field.
    pub fields: Vec<FieldCache>,

    /// Column labels, one per distinct time value.
    pub time_buckets: Vec<String>,

    /// Combinations in first-seen order, metrics in metric-set order within each.
    pub rows: Vec<WideRow>,

    pub stats: CacheStats,
}

impl WideTable {
    fn empty(metrics: MetricSet, time_field: String) -> Self {
        WideTable {
            metrics,
            time_field,
            fields: Vec::new(),
            time_buckets: Vec::new(),
            rows: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dimension attribute names in schema order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Resolves a grouping attribute to its field index.
    pub fn field_index(&self, name: &str) -> PivotResult<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| PivotError::UnknownAttribute(name.to_string()))
    }

    pub fn field(&self, index: usize) -> Option<&FieldCache> {
        self.fields.get(index)
    }

    /// The dimension value of `row` at field `field`.
    pub fn value_of(&self, row: &WideRow, field: usize) -> &AttrValue {
        row.key
            .get(field)
            .and_then(|&id| self.fields.get(field).and_then(|f| f.get_value(id)))
            .unwrap_or(&EMPTY_VALUE)
    }

    /// Per-bucket totals of a metric across every row. Saturates on tables
    /// built by hand; `reshape` never produces a table that needs it.
    pub fn bucket_totals(&self, metric: &str) -> Option<Vec<u64>> {
        let index = self.metrics.index_of(metric)?;
        let mut totals = vec![0u64; self.time_buckets.len()];
        for row in self.rows.iter().filter(|r| r.metric == index) {
            for (total, value) in totals.iter_mut().zip(&row.values) {
                *total = total.saturating_add(*value);
            }
        }
        Some(totals)
    }

    /// Grand total of a metric across every row and bucket.
    pub fn metric_total(&self, metric: &str) -> Option<u64> {
        self.bucket_totals(metric)
            .map(|totals| totals.iter().fold(0u64, |acc, v| acc.saturating_add(*v)))
    }
}

// ============================================================================
// RESHAPER
// ============================================================================

/// Melts records into (combination, metric, bucket) cells and pivots buckets into columns.
pub struct Reshaper<'a> {
    metrics: &'a MetricSet,
    time_field: &'a str,
    time_order: TimeOrder,

    /// Dimension names fixed up front instead of taken from the first record.
    schema: Option<Vec<String>>,
}

impl<'a> Reshaper<'a> {
    pub fn new(metrics: &'a MetricSet, time_field: &'a str) -> Self {
        Reshaper {
            metrics,
            time_field,
            time_order: TimeOrder::default(),
            schema: None,
        }
    }

    pub fn time_order(mut self, order: TimeOrder) -> Self {
        self.time_order = order;
        self
    }

    /// Takes the dimension schema from `record` rather than from the first input record.
    pub fn schema_from(mut self, record: &Record) -> Self {
        self.schema = Some(self.dimension_names(record));
        self
    }

    fn dimension_names(&self, record: &Record) -> Vec<String> {
        record
            .attribute_names()
            .filter(|n| *n != self.time_field)
            .map(str::to_string)
            .collect()
    }

    fn validate_metrics(&self) -> PivotResult<()> {
        if let Some(dup) = self.metrics.first_duplicate() {
            return Err(PivotError::invalid(format!("duplicate metric '{}'", dup)));
        }
        if self.metrics.contains(self.time_field) {
            return Err(PivotError::invalid(format!(
                "time field '{}' is also a metric",
                self.time_field
            )));
        }
        Ok(())
    }

    fn validate_schema(&self, schema: &[String]) -> PivotResult<()> {
        if let Some(name) = schema.iter().find(|n| self.metrics.contains(n)) {
            return Err(PivotError::invalid(format!(
                "attribute '{}' is also a metric",
                name
            )));
        }
        Ok(())
    }

    fn check_record(&self, index: usize, record: &Record, schema: &[String]) -> PivotResult<String> {
        // `Record::attr` and `Record::metric` only see the first entry of a name
        if let Some(name) = first_repeated(record.attribute_names()) {
            return Err(PivotError::invalid_record(
                index,
                format!("duplicate attribute '{}'", name),
            ));
        }
        if let Some(name) = first_repeated(record.metrics.iter().map(|(n, _)| n.as_str())) {
            return Err(PivotError::invalid_record(
                index,
                format!("duplicate metric '{}'", name),
            ));
        }

        let time_value = match record.attr(self.time_field) {
            Some(AttrValue::Text(s)) => s.clone(),
            Some(AttrValue::Empty) => {
                return Err(PivotError::invalid_record(
                    index,
                    format!("time field '{}' is empty", self.time_field),
                ))
            }
            None => {
                return Err(PivotError::invalid_record(
                    index,
                    format!("missing time field '{}'", self.time_field),
                ))
            }
        };

        let mut dimension_count = 0;
        for name in record.attribute_names().filter(|n| *n != self.time_field) {
            if !schema.iter().any(|s| s == name) {
                return Err(PivotError::invalid_record(
                    index,
                    format!("unexpected dimension '{}'", name),
                ));
            }
            dimension_count += 1;
        }
        if dimension_count == 0 {
            return Err(PivotError::invalid_record(index, "record has no dimension attributes"));
        }
        if let Some(missing) = schema.iter().find(|s| record.attr(s).is_none()) {
            return Err(PivotError::invalid_record(
                index,
                format!("missing dimension '{}'", missing),
            ));
        }

        if let Some((name, _)) = record.metrics.iter().find(|(n, _)| !self.metrics.contains(n)) {
            return Err(PivotError::invalid_record(index, format!("unknown metric '{}'", name)));
        }

        Ok(time_value)
    }

    /// Builds the wide table.
    pub fn run<'r, I>(self, records: I) -> PivotResult<WideTable>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        self.validate_metrics()?;

        let mut table = WideTable::empty(self.metrics.clone(), self.time_field.to_string());
        let metric_count = self.metrics.len();

        let mut schema: Option<Vec<String>> = self.schema.clone();
        if let Some(names) = &schema {
            self.validate_schema(names)?;
            table.fields = names.iter().map(|n| FieldCache::new(n.clone())).collect();
        }
        let mut combo_index: FxHashMap<Vec<ValueId>, usize> = FxHashMap::default();
        let mut combos: Vec<Vec<ValueId>> = Vec::new();
        let mut bucket_index: FxHashMap<String, usize> = FxHashMap::default();

        // First pass: intern every record and collect its cells.
        // (combination, metric, bucket, value)
        let mut updates: Vec<(usize, MetricIndex, usize, u64)> = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            table.stats.total_records += 1;

            if schema.is_none() {
                let names = self.dimension_names(record);
                self.validate_schema(&names)?;
                table.fields = names.iter().map(|n| FieldCache::new(n.clone())).collect();
                schema = Some(names);
            }
            let names = schema.as_deref().unwrap_or_default();

            let time_value = self.check_record(index, record, names).map_err(|e| {
                warn!("reshape rejected record {}: {}", index, e);
                e
            })?;

            let key: Vec<ValueId> = table
                .fields
                .iter_mut()
                .map(|field| {
                    let value = record.attr(&field.name).unwrap_or(&EMPTY_VALUE);
                    field.intern(value)
                })
                .collect();

            let combo = match combo_index.get(&key) {
                Some(&c) => c,
                None => {
                    let c = combos.len();
                    combos.push(key.clone());
                    combo_index.insert(key, c);
                    c
                }
            };

            let bucket = match bucket_index.get(&time_value) {
                Some(&b) => b,
                None => {
                    let b = table.time_buckets.len();
                    table.time_buckets.push(time_value.clone());
                    bucket_index.insert(time_value, b);
                    b
                }
            };

            for (metric, name) in self.metrics.iter().enumerate() {
                // Missing metrics count as zero
                let value = record.metric(name).unwrap_or(0);
                updates.push((combo, metric, bucket, value));
            }
        }

        // Column order: remap first-seen bucket positions to display positions.
        let bucket_position: Vec<usize> = match self.time_order {
            TimeOrder::FirstSeen => (0..table.time_buckets.len()).collect(),
            TimeOrder::Ascending => {
                let mut order: Vec<usize> = (0..table.time_buckets.len()).collect();
                order.sort_by(|&a, &b| table.time_buckets[a].cmp(&table.time_buckets[b]));
                let mut position = vec![0; order.len()];
                for (pos, &original) in order.iter().enumerate() {
                    position[original] = pos;
                }
                table.time_buckets = order.iter().map(|&i| table.time_buckets[i].clone()).collect();
                position
            }
        };

        let bucket_count = table.time_buckets.len();
        table.rows = combos
            .iter()
            .flat_map(|key| {
                (0..metric_count).map(move |metric| WideRow {
                    key: key.clone(),
                    metric,
                    values: vec![0; bucket_count],
                })
            })
            .collect();

        // Second pass: apply all updates
        for (combo, metric, bucket, value) in updates {
            let row = &mut table.rows[combo * metric_count + metric];
            let cell = &mut row.values[bucket_position[bucket]];
            *cell = cell.checked_add(value).ok_or_else(|| {
                PivotError::invalid(format!(
                    "sum of '{}' overflows",
                    self.metrics.name(metric).unwrap_or_default()
                ))
            })?;
        }

        // Every roll-up of a metric is bounded by its grand total
        for (metric, name) in self.metrics.iter().enumerate() {
            table
                .rows
                .iter()
                .filter(|r| r.metric == metric)
                .flat_map(|r| r.values.iter())
                .try_fold(0u64, |acc, v| acc.checked_add(*v))
                .ok_or_else(|| PivotError::invalid(format!("total of '{}' overflows", name)))?;
        }

        table.stats.combinations = combos.len();
        table.stats.wide_rows = table.rows.len();

        debug!(
            "reshape records={} combinations={} buckets={} rows={}",
            table.stats.total_records,
            table.stats.combinations,
            bucket_count,
            table.stats.wide_rows
        );

        Ok(table)
    }
}

/// First name that occurs more than once.
fn first_repeated<'n>(mut names: impl Iterator<Item = &'n str>) -> Option<&'n str> {
    let mut seen: FxHashSet<&'n str> = FxHashSet::default();
    names.find(|name| !seen.insert(*name))
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Reshapes records into a wide table with ascending time-bucket columns.
pub fn reshape<'r, I>(records: I, metrics: &MetricSet, time_field: &str) -> PivotResult<WideTable>
where
    I: IntoIterator<Item = &'r Record>,
{
    Reshaper::new(metrics, time_field).run(records)
}

/// Applies the definition's filters, then reshapes the surviving records.
///
/// The dimension schema comes from the first unfiltered record, so a filter
/// that removes every record still yields a table that knows its attributes.
pub fn reshape_with(records: &[Record], definition: &PlanDefinition) -> PivotResult<WideTable> {
    let kept = apply_filters(records, &definition.filters)?;

    let mut reshaper = Reshaper::new(&definition.metrics, &definition.time_field)
        .time_order(definition.time_order);
    if let Some(first) = records.first() {
        reshaper = reshaper.schema_from(first);
    }
    reshaper.run(kept)
}
