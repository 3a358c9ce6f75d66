use crate::{DOMUpdate, EventContext, EventHandler, Host, NodeKey, Selector};
use anyhow::{Result, anyhow};
use indextree::{Arena, NodeId};
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Capacity of the mutation broadcast channel, in batches.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

/// Data stored per arena node.
#[derive(Debug, Clone, Default)]
pub struct DOMNode {
    pub key: NodeKey,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
    /// Live control value. `None` until written, in which case the `value`
    /// attribute provides the default.
    pub value: Option<String>,
}

impl DOMNode {
    /// Look up an attribute by name.
    #[inline]
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr_name, _)| attr_name == name)
            .map(|(_, value)| value.as_str())
    }
}

/// In-memory presentation tree.
///
/// Every mutation made through [`Host`] is recorded; [`Host::commit`] publishes
/// the pass as one batch to every receiver obtained from [`DOM::subscribe`].
pub struct DOM {
    pub(crate) dom: Arena<DOMNode>,
    pub(crate) root: NodeId,
    keys: HashMap<NodeKey, NodeId>,
    listeners: HashMap<NodeKey, Vec<(String, EventHandler)>>,
    next_key: u64,
    batch: Vec<DOMUpdate>,
    update_sender: broadcast::Sender<Vec<DOMUpdate>>,
}

impl DOM {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        let mut dom = Arena::new();
        let root = dom.new_node(DOMNode::default());
        let (update_sender, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            dom,
            root,
            keys: HashMap::from([(NodeKey::ROOT, root)]),
            listeners: HashMap::new(),
            next_key: 1,
            batch: Vec::new(),
            update_sender,
        }
    }

    /// Subscribe to committed mutation batches.
    #[inline]
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DOMUpdate>> {
        self.update_sender.subscribe()
    }

    /// Mutations recorded since the last commit.
    #[inline]
    #[must_use]
    pub fn pending_updates(&self) -> &[DOMUpdate] {
        &self.batch
    }

    /// Number of live nodes in the arena, including the document root and
    /// any created-but-detached nodes.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn id_of(&self, key: NodeKey) -> Result<NodeId> {
        self.keys
            .get(&key)
            .copied()
            .ok_or_else(|| anyhow!("Unknown node {key}"))
    }

    /// Borrow a node's data.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&DOMNode> {
        let id = self.keys.get(&key)?;
        self.dom.get(*id).map(indextree::Node::get)
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut DOMNode> {
        let id = self.id_of(key)?;
        self.dom
            .get_mut(id)
            .map(indextree::Node::get_mut)
            .ok_or_else(|| anyhow!("Node {key} was removed"))
    }

    fn element_mut(&mut self, key: NodeKey) -> Result<&mut DOMNode> {
        let node = self.node_mut(key)?;
        if matches!(node.kind, NodeKind::Element { .. }) {
            Ok(node)
        } else {
            Err(anyhow!("Node {key} is not an element"))
        }
    }

    /// Tag name of an element node.
    #[must_use]
    pub fn tag_of(&self, key: NodeKey) -> Option<&str> {
        match &self.node(key)?.kind {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    /// Text of a text node.
    #[must_use]
    pub fn text_of(&self, key: NodeKey) -> Option<&str> {
        match &self.node(key)?.kind {
            NodeKind::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Value of a presentation attribute.
    #[must_use]
    pub fn attribute(&self, key: NodeKey, name: &str) -> Option<&str> {
        self.node(key)?.attr(name)
    }

    /// The live value of a control, falling back to its `value` attribute.
    #[must_use]
    pub fn value_of(&self, key: NodeKey) -> Option<&str> {
        let node = self.node(key)?;
        node.value.as_deref().or_else(|| node.attr("value"))
    }

    /// Attached children of `key`, in order.
    #[must_use]
    pub fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.keys.get(&key) else {
            return Vec::new();
        };
        id.children(&self.dom)
            .filter_map(|child| self.dom.get(child).map(|node| node.get().key))
            .collect()
    }

    /// Parent of `key`, if attached.
    #[must_use]
    pub fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        let id = self.keys.get(&key)?;
        let parent = self.dom.get(*id)?.parent()?;
        self.dom.get(parent).map(|node| node.get().key)
    }

    /// Number of listeners registered on `key` for `event`.
    #[must_use]
    pub fn listener_count(&self, key: NodeKey, event: &str) -> usize {
        self.listeners.get(&key).map_or(0, |list| {
            list.iter().filter(|(name, _)| name == event).count()
        })
    }

    /// Simulate the user editing a control: the live value changes while the
    /// declared `value` attribute stays untouched. Not recorded as a mutation.
    ///
    /// # Errors
    /// Returns an error if `key` is unknown or not an element.
    pub fn set_user_value(&mut self, key: NodeKey, value: &str) -> Result<()> {
        self.element_mut(key)?.value = Some(value.to_owned());
        Ok(())
    }

    /// Fire `event` on `key`, invoking its listeners in registration order.
    /// Returns the number of listeners invoked.
    ///
    /// The event carries the node's live value, if any.
    pub fn dispatch_event(&self, key: NodeKey, event: &str) -> usize {
        let handlers: Vec<EventHandler> = self
            .listeners
            .get(&key)
            .map(|list| {
                list.iter()
                    .filter(|(name, _)| name == event)
                    .map(|(_, handler)| handler.clone())
                    .collect()
            })
            .unwrap_or_default();
        let mut ctx = EventContext::new(key, event);
        ctx.value = self.value_of(key).map(str::to_owned);
        trace!("Dispatching {event} on {key} to {} listener(s)", handlers.len());
        for handler in &handlers {
            handler.call(&ctx);
        }
        handlers.len()
    }

    fn mint(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.wrapping_add(1);
        let id = self.dom.new_node(DOMNode {
            key,
            kind,
            ..DOMNode::default()
        });
        self.keys.insert(key, id);
        key
    }

    fn ensure_child(&self, parent: NodeKey, child: NodeKey) -> Result<NodeId> {
        let child_id = self.id_of(child)?;
        if self.parent_of(child) == Some(parent) {
            Ok(child_id)
        } else {
            Err(anyhow!("Node {child} is not a child of {parent}"))
        }
    }

    /// Drop a detached subtree from the arena, forgetting its keys and listeners.
    fn discard_subtree(&mut self, id: NodeId) {
        let keys: Vec<NodeKey> = id
            .descendants(&self.dom)
            .filter_map(|node| self.dom.get(node).map(|data| data.get().key))
            .collect();
        for key in &keys {
            self.keys.remove(key);
            self.listeners.remove(key);
        }
        id.remove_subtree(&mut self.dom);
    }
}

impl Default for DOM {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for DOM {
    fn create_element(&mut self, tag: &str) -> NodeKey {
        let node = self.mint(NodeKind::Element {
            tag: tag.to_owned(),
        });
        self.batch.push(DOMUpdate::CreateElement {
            node,
            tag: tag.to_owned(),
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeKey {
        let node = self.mint(NodeKind::Text {
            text: text.to_owned(),
        });
        self.batch.push(DOMUpdate::CreateText {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) -> Result<()> {
        let data = self.element_mut(node)?;
        if let Some(slot) = data.attrs.iter_mut().find(|(attr, _)| attr == name) {
            value.clone_into(&mut slot.1);
        } else {
            data.attrs.push((name.to_owned(), value.to_owned()));
        }
        self.batch.push(DOMUpdate::SetAttr {
            node,
            name: name.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeKey, name: &str) -> Result<()> {
        let data = self.element_mut(node)?;
        let before = data.attrs.len();
        data.attrs.retain(|(attr, _)| attr != name);
        if data.attrs.len() != before {
            self.batch.push(DOMUpdate::RemoveAttr {
                node,
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn add_event_listener(
        &mut self,
        node: NodeKey,
        event: &str,
        handler: EventHandler,
    ) -> Result<()> {
        self.id_of(node)?;
        self.listeners
            .entry(node)
            .or_default()
            .push((event.to_owned(), handler));
        self.batch.push(DOMUpdate::AddListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn set_value(&mut self, node: NodeKey, value: &str) -> Result<()> {
        self.element_mut(node)?.value = Some(value.to_owned());
        self.batch.push(DOMUpdate::SetValue {
            node,
            value: value.to_owned(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        let parent_id = self.id_of(parent)?;
        let child_id = self.id_of(child)?;
        parent_id
            .checked_append(child_id, &mut self.dom)
            .map_err(|err| anyhow!("Cannot append {child} to {parent}: {err:?}"))?;
        self.batch.push(DOMUpdate::AppendChild {
            parent,
            node: child,
        });
        Ok(())
    }

    fn child_at(&self, parent: NodeKey, index: usize) -> Option<NodeKey> {
        let id = self.keys.get(&parent)?;
        let child = id.children(&self.dom).nth(index)?;
        self.dom.get(child).map(|node| node.get().key)
    }

    fn replace_child(
        &mut self,
        parent: NodeKey,
        new_child: NodeKey,
        old_child: NodeKey,
    ) -> Result<()> {
        let old_id = self.ensure_child(parent, old_child)?;
        let new_id = self.id_of(new_child)?;
        old_id
            .checked_insert_before(new_id, &mut self.dom)
            .map_err(|err| anyhow!("Cannot replace {old_child} with {new_child}: {err:?}"))?;
        self.discard_subtree(old_id);
        self.batch.push(DOMUpdate::ReplaceChild {
            parent,
            node: new_child,
            old: old_child,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        let child_id = self.ensure_child(parent, child)?;
        self.discard_subtree(child_id);
        self.batch.push(DOMUpdate::RemoveNode {
            parent,
            node: child,
        });
        Ok(())
    }

    fn query_selector(&self, selector: &str) -> Option<NodeKey> {
        let selector = Selector::parse(selector)?;
        self.root
            .descendants(&self.dom)
            .skip(1)
            .filter_map(|id| self.dom.get(id).map(indextree::Node::get))
            .find(|node| selector.matches(node))
            .map(|node| node.key)
    }

    fn commit(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let batch = core::mem::take(&mut self.batch);
        debug!("Committing {} DOM update(s)", batch.len());
        if self.update_sender.receiver_count() > 0 {
            self.update_sender
                .send(batch)
                .map_err(|_err| anyhow!("Mutation subscribers went away during commit"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;

    /// Build `<div id="app"><p>hi</p></div>` under the document root.
    fn sample(dom: &mut DOM) -> Result<(NodeKey, NodeKey, NodeKey)> {
        let div = dom.create_element("div");
        dom.set_attribute(div, "id", "app")?;
        let para = dom.create_element("p");
        let text = dom.create_text("hi");
        dom.append_child(para, text)?;
        dom.append_child(div, para)?;
        dom.append_child(NodeKey::ROOT, div)?;
        Ok((div, para, text))
    }

    #[test]
    fn builds_and_inspects_tree() -> Result<()> {
        let mut dom = DOM::new();
        let (div, para, text) = sample(&mut dom)?;
        assert_eq!(dom.children(NodeKey::ROOT), vec![div]);
        assert_eq!(dom.child_at(div, 0), Some(para));
        assert_eq!(dom.tag_of(para), Some("p"));
        assert_eq!(dom.text_of(text), Some("hi"));
        assert_eq!(dom.parent_of(text), Some(para));
        assert_eq!(dom.query_selector("#app"), Some(div));
        assert_eq!(dom.query_selector("p"), Some(para));
        assert_eq!(dom.query_selector("#missing"), None);
        Ok(())
    }

    #[test]
    fn replace_discards_old_subtree() -> Result<()> {
        let mut dom = DOM::new();
        let (div, para, text) = sample(&mut dom)?;
        let span = dom.create_element("span");
        dom.replace_child(div, span, para)?;
        assert_eq!(dom.children(div), vec![span]);
        assert!(dom.node(para).is_none());
        assert!(dom.node(text).is_none());
        Ok(())
    }

    #[test]
    fn remove_requires_parentage() -> Result<()> {
        let mut dom = DOM::new();
        let (div, para, text) = sample(&mut dom)?;
        assert!(dom.remove_child(div, text).is_err());
        dom.remove_child(div, para)?;
        assert!(dom.children(div).is_empty());
        Ok(())
    }

    #[test]
    fn live_value_is_separate_from_attribute() -> Result<()> {
        let mut dom = DOM::new();
        let input = dom.create_element("input");
        dom.set_attribute(input, "value", "a")?;
        assert_eq!(dom.value_of(input), Some("a"));
        dom.set_user_value(input, "typed")?;
        assert_eq!(dom.value_of(input), Some("typed"));
        assert_eq!(dom.attribute(input, "value"), Some("a"));
        Ok(())
    }

    #[test]
    fn dispatches_to_listeners_in_order() -> Result<()> {
        let mut dom = DOM::new();
        let button = dom.create_element("button");
        let hits = Rc::new(Cell::new(0_u32));
        for _ in 0..2 {
            let hits = Rc::clone(&hits);
            dom.add_event_listener(
                button,
                "click",
                EventHandler::new(move |_ctx| hits.set(hits.get() + 1)),
            )?;
        }
        assert_eq!(dom.dispatch_event(button, "click"), 2);
        assert_eq!(dom.dispatch_event(button, "input"), 0);
        assert_eq!(hits.get(), 2);
        Ok(())
    }

    #[test]
    fn commit_publishes_non_empty_batches() -> Result<()> {
        let mut dom = DOM::new();
        let mut receiver = dom.subscribe();
        dom.commit()?;
        assert!(receiver.try_recv().is_err());
        sample(&mut dom)?;
        dom.commit()?;
        let batch = receiver.try_recv()?;
        assert!(batch.contains(&DOMUpdate::AppendChild {
            parent: NodeKey::ROOT,
            node: NodeKey(1),
        }));
        assert!(dom.pending_updates().is_empty());
        Ok(())
    }
}
