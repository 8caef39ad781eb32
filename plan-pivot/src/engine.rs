//! FILENAME: plan-pivot/src/engine.rs
//! Hierarchy Engine - Turns the wide table into the rendered row tree.
//!
//! This module takes a WideTable (data), the grouping attributes and the
//! expansion state and produces a PlanView (rows ready for rendering).
//!
//! Algorithm:
//! 1. Partition WideRow indices by metric (one root per metric, metric-set order)
//! 2. Recursively partition each root's rows by the next grouping attribute,
//!    in first-seen order, descending only into expanded nodes
//! 3. Sum every node over all of its rows, so totals never depend on expansion
//! 4. Flatten the tree in pre-order into display rows
//!
//! Each level makes one pass over its parent's row indices, so a build costs
//! O(rows x depth).

use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use plan_model::AttrValue;
use crate::cache::{ValueId, WideTable};
use crate::error::{PivotError, PivotResult};
use crate::expansion::ExpansionState;
use crate::node::NodeId;
use crate::view::{DisplayRow, PlanView, RowKind};

// ============================================================================
// TREE STRUCTURES
// ============================================================================

/// A node in the row hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    pub id: NodeId,

    /// Depth in the tree (0 = metric level).
    pub depth: usize,

    /// Display label for this node.
    pub label: String,

    /// Grouping attribute of this level (`None` at the metric level).
    pub attribute: Option<String>,

    /// Per-bucket sums over every row below this node.
    pub values: Vec<u64>,

    pub is_expandable: bool,
    pub is_expanded: bool,

    /// Child nodes; only built for expanded nodes.
    pub children: Vec<GroupNode>,
}

impl GroupNode {
    /// Sum of `values`. The builder rejects nodes whose total does not fit a u64.
    pub fn total(&self) -> u64 {
        self.values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn kind(&self) -> RowKind {
        if self.depth == 0 {
            RowKind::Metric
        } else {
            RowKind::Group
        }
    }
}

/// Which nodes get their children built.
#[derive(Debug, Clone, Copy)]
enum ExpandPolicy<'s> {
    /// Every node with a deeper level (used to enumerate all ids).
    All,
    /// Only the nodes named in the state.
    State(&'s ExpansionState),
}

impl ExpandPolicy<'_> {
    fn is_expanded(&self, id: &NodeId) -> bool {
        match self {
            ExpandPolicy::All => true,
            ExpandPolicy::State(state) => state.contains(id),
        }
    }
}

// ============================================================================
// HIERARCHY BUILDER
// ============================================================================

struct HierarchyBuilder<'a> {
    table: &'a WideTable,

    /// Grouping attribute names, outer to inner.
    attributes: &'a [String],

    /// Field index in the table for each grouping level.
    levels: Vec<usize>,

    policy: ExpandPolicy<'a>,
}

impl<'a> HierarchyBuilder<'a> {
    fn new(
        table: &'a WideTable,
        attributes: &'a [String],
        policy: ExpandPolicy<'a>,
    ) -> PivotResult<Self> {
        let levels = attributes
            .iter()
            .map(|name| {
                if *name == table.time_field || table.metrics.contains(name) {
                    return Err(PivotError::UnknownAttribute(name.clone()));
                }
                table.field_index(name)
            })
            .collect::<PivotResult<Vec<usize>>>()?;

        Ok(HierarchyBuilder {
            table,
            attributes,
            levels,
            policy,
        })
    }

    /// Builds one root per metric that has rows, in metric-set order.
    /// Roots are always emitted; their children follow the policy like any other node.
    fn build_roots(&self) -> PivotResult<Vec<GroupNode>> {
        let mut per_metric: Vec<Vec<usize>> = vec![Vec::new(); self.table.metrics.len()];
        for (index, row) in self.table.rows.iter().enumerate() {
            if let Some(bucket) = per_metric.get_mut(row.metric) {
                bucket.push(index);
            }
        }

        let mut roots = Vec::new();
        for (metric, rows) in per_metric.iter().enumerate() {
            if rows.is_empty() {
                continue;
            }
            let name = self.table.metrics.name(metric).unwrap_or_default();
            let id = NodeId::metric(name);
            let is_expandable = !self.levels.is_empty();
            let is_expanded = is_expandable && self.policy.is_expanded(&id);
            let children = if is_expanded {
                self.build_level(rows, 0, &id)?
            } else {
                Vec::new()
            };

            roots.push(GroupNode {
                label: name.to_string(),
                depth: 0,
                attribute: None,
                values: self.sum_rows(rows, &id)?,
                is_expandable,
                is_expanded,
                children,
                id,
            });
        }
        Ok(roots)
    }

    /// Recursively builds the nodes of one grouping level below `parent`.
    fn build_level(
        &self,
        rows: &[usize],
        level: usize,
        parent: &NodeId,
    ) -> PivotResult<Vec<GroupNode>> {
        let field_index = self.levels[level];
        let Some(field) = self.table.field(field_index) else {
            return Ok(Vec::new());
        };

        // Partition in first-seen order
        let mut positions: FxHashMap<ValueId, usize> = FxHashMap::default();
        let mut groups: Vec<(ValueId, Vec<usize>)> = Vec::new();
        for &row in rows {
            let value_id = self.table.rows[row].key[field_index];
            match positions.get(&value_id) {
                Some(&pos) => groups[pos].1.push(row),
                None => {
                    positions.insert(value_id, groups.len());
                    groups.push((value_id, vec![row]));
                }
            }
        }

        let is_expandable = level + 1 < self.levels.len();
        let mut nodes = Vec::with_capacity(groups.len());

        for (value_id, members) in groups {
            let value = field.get_value(value_id).cloned().unwrap_or(AttrValue::Empty);
            let label = value.display_label().to_string();
            let id = parent.child(value);

            let is_expanded = is_expandable && self.policy.is_expanded(&id);
            let children = if is_expanded {
                self.build_level(&members, level + 1, &id)?
            } else {
                Vec::new()
            };

            nodes.push(GroupNode {
                depth: level + 1,
                label,
                attribute: Some(self.attributes[level].clone()),
                values: self.sum_rows(&members, &id)?,
                is_expandable,
                is_expanded,
                children,
                id,
            });
        }

        Ok(nodes)
    }

    /// Per-bucket sums of `rows`. Fails if a bucket or the node total overflows.
    fn sum_rows(&self, rows: &[usize], id: &NodeId) -> PivotResult<Vec<u64>> {
        let overflow = || PivotError::invalid(format!("roll-up of '{}' overflows", id));

        let mut sums = vec![0u64; self.table.time_buckets.len()];
        for &row in rows {
            for (sum, value) in sums.iter_mut().zip(&self.table.rows[row].values) {
                *sum = sum.checked_add(*value).ok_or_else(overflow)?;
            }
        }
        sums.iter()
            .try_fold(0u64, |acc, v| acc.checked_add(*v))
            .ok_or_else(overflow)?;
        Ok(sums)
    }
}

/// Recursively flattens nodes in pre-order.
fn flatten_nodes(nodes: &[GroupNode], rows: &mut Vec<DisplayRow>, parent_index: Option<usize>) {
    for node in nodes {
        let my_index = rows.len();
        rows.push(DisplayRow {
            id: node.id.clone(),
            depth: node.depth,
            label: node.label.clone(),
            kind: node.kind(),
            attribute: node.attribute.clone(),
            is_expandable: node.is_expandable,
            is_expanded: node.is_expanded,
            values: node.values.clone(),
            total: node.total(),
            parent_index,
        });

        if node.is_expanded {
            flatten_nodes(&node.children, rows, Some(my_index));
        }
    }
}

fn collect_ids(nodes: &[GroupNode], out: &mut ExpansionState) {
    for node in nodes {
        out.insert(node.id.clone());
        collect_ids(&node.children, out);
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Builds the row tree for the given grouping and expansion state.
pub fn build_tree(
    table: &WideTable,
    group_attributes: &[String],
    expanded: &ExpansionState,
) -> PivotResult<Vec<GroupNode>> {
    let builder = HierarchyBuilder::new(table, group_attributes, ExpandPolicy::State(expanded))?;
    builder.build_roots()
}

/// Builds the ordered display rows.
/// This is the main entry point for the hierarchy engine.
pub fn build(
    table: &WideTable,
    group_attributes: &[String],
    expanded: &ExpansionState,
) -> PivotResult<PlanView> {
    let tree = build_tree(table, group_attributes, expanded)?;

    let mut view = PlanView::new(table.time_buckets.clone(), group_attributes.to_vec());
    flatten_nodes(&tree, &mut view.rows, None);

    debug!(
        "build levels={} expanded={} rows={}",
        group_attributes.len(),
        expanded.len(),
        view.rows.len()
    );
    Ok(view)
}

/// Returns a copy of `expanded` with `id` flipped.
pub fn toggle(expanded: &ExpansionState, id: &NodeId) -> ExpansionState {
    expanded.toggled(id)
}

/// Returns an empty expansion state.
pub fn collapse_all(_expanded: &ExpansionState) -> ExpansionState {
    ExpansionState::new()
}

/// Returns a copy of `expanded` with `id` and all of its descendants collapsed.
pub fn collapse_subtree(expanded: &ExpansionState, id: &NodeId) -> ExpansionState {
    expanded.without_subtree(id)
}

/// Every node id `build` can produce for this table and grouping.
pub fn expand_all(table: &WideTable, group_attributes: &[String]) -> PivotResult<ExpansionState> {
    let builder = HierarchyBuilder::new(table, group_attributes, ExpandPolicy::All)?;
    let tree = builder.build_roots()?;

    let mut state = ExpansionState::new();
    collect_ids(&tree, &mut state);

    debug!("expand_all levels={} ids={}", group_attributes.len(), state.len());
    Ok(state)
}
