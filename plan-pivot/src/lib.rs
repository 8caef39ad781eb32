//! FILENAME: plan-pivot/src/lib.rs
//! Hierarchical pivot subsystem for merchandise-plan data.
//!
//! Takes long-format plan records (one per location and week, one value per
//! metric), pivots weeks into columns and rolls the values up into a
//! Metric -> attribute -> ... tree the user expands and collapses.
//!
//! Layers:
//! - `definition`: Serializable configuration (metrics, grouping, filters)
//! - `cache`: Interned wide table (HOW we store the reshaped data)
//! - `engine`: Hierarchy building and expansion operations
//! - `view`: Renderable output for the grid (WHAT we display)
//! - `session`: Per-user state tying the layers together

pub mod cache;
pub mod definition;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod filter;
pub mod node;
pub mod session;
pub mod view;

pub use cache::{reshape, reshape_with, CacheStats, Reshaper, WideRow, WideTable};
pub use definition::*;
pub use engine::{
    build, build_tree, collapse_all, collapse_subtree, expand_all, toggle, GroupNode,
};
pub use error::{PivotError, PivotResult};
pub use expansion::ExpansionState;
pub use filter::{apply_filters, distinct_values, AttributeFilter};
pub use node::{NodeId, NodePath};
pub use session::PlanSession;
pub use view::*;
