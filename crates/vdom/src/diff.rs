//! Change classification between two node descriptions.

use crate::node::{Element, VNode};
use core::fmt;

/// How a new description differs from the old one at the same position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    None,
    /// Leaf vs element, or text vs number leaf.
    TypeChanged,
    TextChanged,
    NodeNameChanged,
    ValueChanged,
    AttributesChanged,
}

impl ChangeKind {
    /// Whether the live node must be rebuilt from scratch.
    #[inline]
    #[must_use]
    pub const fn requires_replace(self) -> bool {
        matches!(
            self,
            Self::TypeChanged | Self::TextChanged | Self::NodeNameChanged
        )
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::TypeChanged => "type",
            Self::TextChanged => "text",
            Self::NodeNameChanged => "node-name",
            Self::ValueChanged => "value",
            Self::AttributesChanged => "attributes",
        };
        f.write_str(name)
    }
}

/// Classify the difference between `old` and `new`. First match wins:
/// kind, leaf value, tag name, `value` attribute, remaining literal attributes.
///
/// Event bindings never take part in the comparison.
#[must_use]
pub fn classify(old: &VNode, new: &VNode) -> ChangeKind {
    match (old, new) {
        (VNode::Leaf(old_leaf), VNode::Leaf(new_leaf)) => {
            if !old_leaf.same_kind(new_leaf) {
                ChangeKind::TypeChanged
            } else if old_leaf != new_leaf {
                ChangeKind::TextChanged
            } else {
                ChangeKind::None
            }
        }
        (VNode::Element(old_el), VNode::Element(new_el)) => classify_elements(old_el, new_el),
        _ => ChangeKind::TypeChanged,
    }
}

fn classify_elements(old: &Element, new: &Element) -> ChangeKind {
    if old.tag != new.tag {
        ChangeKind::NodeNameChanged
    } else if old.value() != new.value() {
        ChangeKind::ValueChanged
    } else if !plain_attributes_equal(old, new) {
        ChangeKind::AttributesChanged
    } else {
        ChangeKind::None
    }
}

/// Order-independent equality over literal, non-`value` attributes.
fn plain_attributes_equal(old: &Element, new: &Element) -> bool {
    // Both sides iterate in key order.
    old.plain_attributes().eq(new.plain_attributes())
}
