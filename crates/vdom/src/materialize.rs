//! Building fresh live subtrees from descriptions.

use crate::node::{Element, VNode};
use crate::patch::PatchStats;
use anyhow::Result;
use dom::{Host, NodeKey};

/// Create a detached live subtree for `node` and return its root key.
///
/// Event bindings become listeners under the event name; every other
/// attribute, `value` included, is set literally. Tag and attribute names
/// are handed to the host as-is.
///
/// # Errors
/// Propagates host errors.
pub fn materialize<H: Host + ?Sized>(host: &mut H, node: &VNode) -> Result<NodeKey> {
    let mut stats = PatchStats::default();
    materialize_counted(host, node, &mut stats)
}

pub(crate) fn materialize_counted<H: Host + ?Sized>(
    host: &mut H,
    node: &VNode,
    stats: &mut PatchStats,
) -> Result<NodeKey> {
    match node {
        VNode::Leaf(leaf) => {
            stats.created += 1;
            Ok(host.create_text(&leaf.to_text()))
        }
        VNode::Element(element) => materialize_element(host, element, stats),
    }
}

fn materialize_element<H: Host + ?Sized>(
    host: &mut H,
    element: &Element,
    stats: &mut PatchStats,
) -> Result<NodeKey> {
    let live = host.create_element(&element.tag);
    stats.created += 1;
    for (event, handler) in element.events() {
        host.add_event_listener(live, event, handler.clone())?;
        stats.listeners_added += 1;
    }
    for (name, value) in element
        .attributes
        .iter()
        .filter_map(|(name, value)| value.as_static().map(|literal| (name, literal)))
    {
        host.set_attribute(live, name, value)?;
        stats.attrs_set += 1;
    }
    for child in &element.children {
        let child_key = materialize_counted(host, child, stats)?;
        host.append_child(live, child_key)?;
    }
    Ok(live)
}
