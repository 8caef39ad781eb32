//! FILENAME: plan-model/src/record.rs
//! PURPOSE: Defines the raw observation that feeds the pivot.
//! CONTEXT: A `Record` is one row of generated plan data: dimension attributes
//! (including the week) plus non-negative metric values. Records are built once
//! and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Label shown for a null or empty dimension value.
pub const BLANK_LABEL: &str = "(blank)";

/// The value of a single dimension attribute.
///
/// `Empty` (null) and `Text("")` are different grouping keys even though
/// both display as `(blank)`. Serialized as JSON `null` or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Empty,
    Text(String),
}

impl AttrValue {
    pub fn text(s: impl Into<String>) -> Self {
        AttrValue::Text(s.into())
    }

    /// Returns the text if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Empty => None,
            AttrValue::Text(s) => Some(s),
        }
    }

    /// True for null and for the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            AttrValue::Empty => true,
            AttrValue::Text(s) => s.is_empty(),
        }
    }

    /// Returns the display label of the value.
    pub fn display_label(&self) -> &str {
        match self {
            AttrValue::Text(s) if !s.is_empty() => s,
            _ => BLANK_LABEL,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttrValue::Empty, Into::into)
    }
}

/// One raw observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Dimension attributes in declaration order, including the time field.
    pub attributes: Vec<(String, AttrValue)>,

    /// Metric values keyed by metric name.
    pub metrics: Vec<(String, u64)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Adds (or replaces) a dimension attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Adds (or replaces) a metric value.
    pub fn with_metric(mut self, name: impl Into<String>, value: u64) -> Self {
        let name = name.into();
        match self.metrics.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.metrics.push((name, value)),
        }
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns the metric value, or `None` when the record omits it.
    pub fn metric(&self, name: &str) -> Option<u64> {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }
}
