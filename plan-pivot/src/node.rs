//! FILENAME: plan-pivot/src/node.rs
//! Node identifiers for the row hierarchy.
//!
//! A `NodeId` is the metric name plus the attribute values on the way down to
//! the node. It is compared structurally, so values containing separators can
//! never make two different nodes equal. `to_key` gives an opaque string for
//! session storage: each segment is `<byte length>:<text>`, or `~` for a null
//! value, and segments are joined with `|`.

use std::fmt;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use plan_model::AttrValue;
use crate::error::{PivotError, PivotResult};

/// Attribute values below the metric. Four levels cover the usual
/// Channel / Channel Group / Selling Channel / Location grouping without allocating.
pub type NodePath = SmallVec<[AttrValue; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    metric: String,
    path: NodePath,
}

impl NodeId {
    /// Identifier of a metric root.
    pub fn metric(name: impl Into<String>) -> Self {
        NodeId {
            metric: name.into(),
            path: SmallVec::new(),
        }
    }

    pub fn from_parts<I>(metric: impl Into<String>, path: I) -> Self
    where
        I: IntoIterator<Item = AttrValue>,
    {
        NodeId {
            metric: metric.into(),
            path: path.into_iter().collect(),
        }
    }

    /// Identifier of the child holding `value`.
    pub fn child(&self, value: AttrValue) -> Self {
        let mut path = self.path.clone();
        path.push(value);
        NodeId {
            metric: self.metric.clone(),
            path,
        }
    }

    pub fn metric_name(&self) -> &str {
        &self.metric
    }

    pub fn path(&self) -> &[AttrValue] {
        &self.path
    }

    /// 0 for a metric root.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn parent(&self) -> Option<NodeId> {
        if self.path.is_empty() {
            return None;
        }
        let mut path = self.path.clone();
        path.pop();
        Some(NodeId {
            metric: self.metric.clone(),
            path,
        })
    }

    /// True if `other` lies strictly below this node.
    pub fn is_ancestor_of(&self, other: &NodeId) -> bool {
        self.metric == other.metric
            && other.path.len() > self.path.len()
            && other.path.starts_with(&self.path)
    }

    /// Opaque, collision-free string form.
    pub fn to_key(&self) -> String {
        let mut key = String::new();
        push_segment(&mut key, Some(&self.metric));
        for value in &self.path {
            key.push('|');
            push_segment(&mut key, value.as_str());
        }
        key
    }

    /// Parses a string produced by `to_key`.
    pub fn from_key(key: &str) -> PivotResult<Self> {
        let bad = |why: &str| PivotError::InvalidNodeKey(format!("{} in '{}'", why, key));

        let mut segments: Vec<AttrValue> = Vec::new();
        let mut rest = key;
        loop {
            if let Some(after) = rest.strip_prefix('~') {
                segments.push(AttrValue::Empty);
                rest = after;
            } else {
                let colon = rest.find(':').ok_or_else(|| bad("missing length"))?;
                let digits = &rest[..colon];
                let canonical = !digits.is_empty()
                    && digits.bytes().all(|b| b.is_ascii_digit())
                    && !(digits.len() > 1 && digits.starts_with('0'));
                if !canonical {
                    return Err(bad("bad length"));
                }
                let len: usize = digits.parse().map_err(|_| bad("bad length"))?;
                let start = colon + 1;
                let end = start.checked_add(len).ok_or_else(|| bad("bad length"))?;
                let text = rest.get(start..end).ok_or_else(|| bad("truncated segment"))?;
                segments.push(AttrValue::text(text));
                rest = &rest[end..];
            }

            if rest.is_empty() {
                break;
            }
            rest = rest.strip_prefix('|').ok_or_else(|| bad("expected '|'"))?;
        }

        let mut segments = segments.into_iter();
        match segments.next() {
            Some(AttrValue::Text(metric)) => Ok(NodeId {
                metric,
                path: segments.collect(),
            }),
            _ => Err(bad("metric segment must be text")),
        }
    }
}

fn push_segment(key: &mut String, text: Option<&str>) {
    match text {
        Some(text) => {
            key.push_str(&text.len().to_string());
            key.push(':');
            key.push_str(text);
        }
        None => key.push('~'),
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.metric)?;
        for value in &self.path {
            write!(f, " / {}", value.display_label())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> NodeId {
        NodeId::metric("Gross Sales Units")
    }

    #[test]
    fn test_pipe_values_do_not_collide() {
        // "A|B" / "C" and "A" / "B|C" join to the same naive "|"-string
        let a = sales().child(AttrValue::text("A|B")).child(AttrValue::text("C"));
        let b = sales().child(AttrValue::text("A")).child(AttrValue::text("B|C"));

        assert_ne!(a, b);
        assert_ne!(a.to_key(), b.to_key());
        assert_eq!(NodeId::from_key(&a.to_key()).unwrap(), a);
        assert_eq!(NodeId::from_key(&b.to_key()).unwrap(), b);
    }

    #[test]
    fn test_key_format() {
        let id = sales().child(AttrValue::text("Retail")).child(AttrValue::Empty);
        assert_eq!(id.to_key(), "17:Gross Sales Units|6:Retail|~");
        assert_eq!(sales().to_key(), "17:Gross Sales Units");
    }

    #[test]
    fn test_null_and_empty_text_keys_differ() {
        let null = sales().child(AttrValue::Empty);
        let empty = sales().child(AttrValue::text(""));
        assert_ne!(null.to_key(), empty.to_key());
        assert_eq!(NodeId::from_key(&empty.to_key()).unwrap(), empty);
        assert_eq!(NodeId::from_key(&null.to_key()).unwrap(), null);
    }

    #[test]
    fn test_multibyte_values() {
        let id = sales().child(AttrValue::text("Café|Été"));
        assert_eq!(NodeId::from_key(&id.to_key()).unwrap(), id);
    }

    #[test]
    fn test_rejects_malformed_keys() {
        for key in ["", "~", "5:abc", "3:abc|", "3:abcx", "+3:abc", "03:abc", "x:abc", "3:abc|4"] {
            assert!(
                matches!(NodeId::from_key(key), Err(PivotError::InvalidNodeKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_ancestry() {
        let retail = sales().child(AttrValue::text("Retail"));
        let store = retail.child(AttrValue::text("Store 1"));
        let other = NodeId::metric("BOP Units").child(AttrValue::text("Retail"));

        assert!(sales().is_ancestor_of(&store));
        assert!(retail.is_ancestor_of(&store));
        assert!(!retail.is_ancestor_of(&retail));
        assert!(!sales().is_ancestor_of(&other));
        assert_eq!(store.parent(), Some(retail.clone()));
        assert_eq!(sales().parent(), None);
        assert_eq!(store.depth(), 2);
    }

    #[test]
    fn test_display_uses_labels() {
        let id = sales().child(AttrValue::text("Retail")).child(AttrValue::text(""));
        assert_eq!(id.to_string(), "Gross Sales Units / Retail / (blank)");
    }
}
