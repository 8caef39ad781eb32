//! FILENAME: plan-pivot/src/expansion.rs
//! The set of expanded hierarchy nodes.
//!
//! The caller owns this value and decides how long it lives; the engine only
//! reads it. Ids that no longer match a visible node are kept and ignored.

use serde::{Deserialize, Serialize};
use rustc_hash::FxHashSet;
use crate::error::PivotResult;
use crate::node::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionState {
    expanded: FxHashSet<NodeId>,
}

impl ExpansionState {
    pub fn new() -> Self {
        ExpansionState::default()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.expanded.contains(id)
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.expanded.iter()
    }

    pub fn insert(&mut self, id: NodeId) -> bool {
        self.expanded.insert(id)
    }

    pub fn remove(&mut self, id: &NodeId) -> bool {
        self.expanded.remove(id)
    }

    /// Flips `id` in place. Returns whether it is now expanded.
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        }
    }

    /// Returns a copy with `id` flipped.
    pub fn toggled(&self, id: &NodeId) -> Self {
        let mut next = self.clone();
        next.toggle(id);
        next
    }

    /// Returns a copy without `id` and without anything below it.
    pub fn without_subtree(&self, id: &NodeId) -> Self {
        ExpansionState {
            expanded: self
                .expanded
                .iter()
                .filter(|e| *e != id && !id.is_ancestor_of(e))
                .cloned()
                .collect(),
        }
    }

    /// Opaque keys, sorted so the output is stable.
    pub fn to_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.expanded.iter().map(NodeId::to_key).collect();
        keys.sort();
        keys
    }

    pub fn from_keys<I, S>(keys: I) -> PivotResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let expanded = keys
            .into_iter()
            .map(|k| NodeId::from_key(k.as_ref()))
            .collect::<PivotResult<FxHashSet<NodeId>>>()?;
        Ok(ExpansionState { expanded })
    }
}

impl FromIterator<NodeId> for ExpansionState {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        ExpansionState {
            expanded: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_model::AttrValue;

    fn id(parts: &[&str]) -> NodeId {
        NodeId::from_parts(parts[0], parts[1..].iter().map(|p| AttrValue::text(*p)))
    }

    #[test]
    fn test_toggle_pair_is_identity() {
        let state: ExpansionState = [id(&["Sales", "Retail"]), id(&["Sales", "Online"])]
            .into_iter()
            .collect();

        for target in [id(&["Sales", "Retail"]), id(&["Sales", "Ecom"])] {
            assert_eq!(state.toggled(&target).toggled(&target), state);
        }
    }

    #[test]
    fn test_toggled_leaves_original_untouched() {
        let state = ExpansionState::new();
        let next = state.toggled(&id(&["Sales", "Retail"]));
        assert!(state.is_empty());
        assert!(next.contains(&id(&["Sales", "Retail"])));
    }

    #[test]
    fn test_toggle_in_place_reports_state() {
        let mut state = ExpansionState::new();
        assert!(state.toggle(&id(&["Sales"])));
        assert!(!state.toggle(&id(&["Sales"])));
        assert!(state.is_empty());
    }

    #[test]
    fn test_without_subtree() {
        let state: ExpansionState = [
            id(&["Sales", "Retail"]),
            id(&["Sales", "Retail", "Stores"]),
            id(&["Sales", "Online"]),
            id(&["BOP", "Retail"]),
        ]
        .into_iter()
        .collect();

        let next = state.without_subtree(&id(&["Sales", "Retail"]));
        assert_eq!(next.len(), 2);
        assert!(next.contains(&id(&["Sales", "Online"])));
        assert!(next.contains(&id(&["BOP", "Retail"])));
    }

    #[test]
    fn test_keys_round_trip() {
        let state: ExpansionState = [id(&["Sales", "A|B"]), id(&["Sales"])].into_iter().collect();
        let keys = state.to_keys();
        assert_eq!(keys, vec!["5:Sales", "5:Sales|3:A|B"]);
        assert_eq!(ExpansionState::from_keys(&keys).unwrap(), state);
        assert!(ExpansionState::from_keys(["nonsense"]).is_err());
    }

    #[test]
    fn test_serializes_as_list() {
        let state: ExpansionState = [id(&["Sales"])].into_iter().collect();
        let json = serde_json::to_string(&state).unwrap();
        let back: ExpansionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
