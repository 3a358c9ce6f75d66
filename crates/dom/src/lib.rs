//! Host primitives shared by the virtual DOM core and its presentation backends.
//!
//! This crate centralizes the stable node key type, the mutation record that
//! backends publish to observers, the event plumbing, and the [`Host`] trait
//! the materializer and patch applier are written against. [`DOM`] is an
//! in-memory, arena-backed implementation of [`Host`].

use anyhow::Result;
use core::fmt;

/// Event context and handler types.
pub mod events;
pub use events::{EventContext, EventHandler};

mod printing;
mod selector;
pub use selector::Selector;

/// Arena-backed presentation tree.
pub mod tree;
pub use tree::{DOM, DOMNode, NodeKind};

// ============================
// Stable node keys
// ============================

/// A 64-bit stable key for live presentation nodes. The default is [`NodeKey::ROOT`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// The document root key (always present).
    pub const ROOT: Self = Self(0);
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================
// Mutation record
// ============================

/// A single mutation applied to a live tree, published to observers in batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    CreateElement { node: NodeKey, tag: String },
    CreateText { node: NodeKey, text: String },
    SetAttr { node: NodeKey, name: String, value: String },
    RemoveAttr { node: NodeKey, name: String },
    AddListener { node: NodeKey, event: String },
    SetValue { node: NodeKey, value: String },
    AppendChild { parent: NodeKey, node: NodeKey },
    ReplaceChild { parent: NodeKey, node: NodeKey, old: NodeKey },
    RemoveNode { parent: NodeKey, node: NodeKey },
}

impl DOMUpdate {
    /// True for updates that only create detached nodes.
    #[inline]
    #[must_use]
    pub const fn is_creation(&self) -> bool {
        matches!(self, Self::CreateElement { .. } | Self::CreateText { .. })
    }
}

// ============================
// Host trait
// ============================

/// The primitive operations a presentation backend offers to the reconciler.
///
/// Keys returned by the `create_*` methods refer to detached nodes until they
/// are attached with [`Host::append_child`] or [`Host::replace_child`].
/// Tag names and attribute names are passed through unvalidated.
pub trait Host {
    /// Create a detached element node.
    fn create_element(&mut self, tag: &str) -> NodeKey;
    /// Create a detached text node.
    fn create_text(&mut self, text: &str) -> NodeKey;
    /// Set a literal presentation attribute.
    ///
    /// # Errors
    /// Returns an error if `node` is unknown or is not an element.
    fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) -> Result<()>;
    /// Remove a presentation attribute; removing an absent attribute is a no-op.
    ///
    /// # Errors
    /// Returns an error if `node` is unknown or is not an element.
    fn remove_attribute(&mut self, node: NodeKey, name: &str) -> Result<()>;
    /// Register an event listener under `event`.
    ///
    /// # Errors
    /// Returns an error if `node` is unknown.
    fn add_event_listener(&mut self, node: NodeKey, event: &str, handler: EventHandler)
    -> Result<()>;
    /// Overwrite the live, user-editable value of a control.
    ///
    /// # Errors
    /// Returns an error if `node` is unknown or is not an element.
    fn set_value(&mut self, node: NodeKey, value: &str) -> Result<()>;
    /// Append `child` as the last child of `parent`.
    ///
    /// # Errors
    /// Returns an error if either key is unknown.
    fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()>;
    /// The live child of `parent` at `index`, if any.
    fn child_at(&self, parent: NodeKey, index: usize) -> Option<NodeKey>;
    /// Put `new_child` in the place of `old_child` and discard `old_child`'s subtree.
    ///
    /// # Errors
    /// Returns an error if a key is unknown or `old_child` is not a child of `parent`.
    fn replace_child(&mut self, parent: NodeKey, new_child: NodeKey, old_child: NodeKey)
    -> Result<()>;
    /// Detach and discard `child`'s subtree.
    ///
    /// # Errors
    /// Returns an error if a key is unknown or `child` is not a child of `parent`.
    fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()>;
    /// Resolve a selector to the first attached match in document order.
    fn query_selector(&self, selector: &str) -> Option<NodeKey>;
    /// Mark the end of one mutation pass.
    ///
    /// # Errors
    /// Returns an error if the backend fails to publish the pass.
    fn commit(&mut self) -> Result<()>;
}
