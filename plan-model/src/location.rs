//! FILENAME: plan-model/src/location.rs
//! PURPOSE: Location configuration and which metrics a location populates.
//! CONTEXT: The data generator (outside this workspace) fills only the metrics
//! returned by `LocationKind::populated_metrics` and writes zero for the rest.

use serde::{Deserialize, Serialize};
use crate::metric::{BOP_UNITS, GROSS_SALES_UNITS, ON_ORDER_UNITS, RECEIPTS_UNITS};
use crate::record::AttrValue;

pub const LOCATION_FIELD: &str = "Location";
pub const CHANNEL_FIELD: &str = "Channel";
pub const CHANNEL_GROUP_FIELD: &str = "Channel Group";
pub const SELLING_CHANNEL_FIELD: &str = "Selling Channel";

/// What role a location plays in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Source,
    Inventory,
    Selling,
    Default,
}

impl LocationKind {
    /// Resolves type flags with precedence source > inventory > selling.
    pub fn from_flags(source: bool, inventory: bool, selling: bool) -> Self {
        if source {
            LocationKind::Source
        } else if inventory {
            LocationKind::Inventory
        } else if selling {
            LocationKind::Selling
        } else {
            LocationKind::Default
        }
    }

    /// Metrics that receive values for a location of this kind.
    pub fn populated_metrics(self) -> &'static [&'static str] {
        match self {
            LocationKind::Source => &[RECEIPTS_UNITS, BOP_UNITS, ON_ORDER_UNITS],
            LocationKind::Inventory => &[BOP_UNITS],
            LocationKind::Selling => &[GROSS_SALES_UNITS],
            // No type selected: the location only contributes zeros
            LocationKind::Default => &[],
        }
    }

    pub fn populates(self, metric: &str) -> bool {
        self.populated_metrics().contains(&metric)
    }
}

fn default_true() -> bool {
    true
}

/// A user-configured location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,

    #[serde(default)]
    pub channel: String,

    #[serde(default)]
    pub channel_group: String,

    #[serde(default)]
    pub selling_channel: String,

    #[serde(default)]
    pub source: bool,

    #[serde(default)]
    pub inventory: bool,

    /// New locations are selling locations.
    #[serde(default = "default_true")]
    pub selling: bool,
}

impl Location {
    pub fn new(name: impl Into<String>) -> Self {
        Location {
            name: name.into(),
            channel: String::new(),
            channel_group: String::new(),
            selling_channel: String::new(),
            source: false,
            inventory: false,
            selling: true,
        }
    }

    pub fn kind(&self) -> LocationKind {
        LocationKind::from_flags(self.source, self.inventory, self.selling)
    }

    /// Locations without a name are skipped when data is generated.
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// The location dimension attributes carried by every record of this location.
    pub fn dimensions(&self) -> Vec<(String, AttrValue)> {
        vec![
            (LOCATION_FIELD.to_string(), AttrValue::text(self.name.as_str())),
            (CHANNEL_FIELD.to_string(), AttrValue::text(self.channel.as_str())),
            (CHANNEL_GROUP_FIELD.to_string(), AttrValue::text(self.channel_group.as_str())),
            (SELLING_CHANNEL_FIELD.to_string(), AttrValue::text(self.selling_channel.as_str())),
        ]
    }
}
