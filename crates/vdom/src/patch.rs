//! Patch application: mutate a live tree so it matches a new description.
//!
//! The [`Reconciler`] classifies each old/new pair and performs the smallest
//! mutation for that change kind. How two child lists are paired up is left
//! to a [`ChildStrategy`]; [`Positional`] pairs children by index only.

use crate::diff::{ChangeKind, classify};
use crate::materialize::materialize_counted;
use crate::node::{Element, VNode};
use anyhow::{Result, anyhow};
use core::ops::AddAssign;
use dom::{Host, NodeKey};
use log::trace;

/// Counters for one reconciliation pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Live nodes created, including replacements and appended children.
    pub created: usize,
    pub replaced: usize,
    pub removed: usize,
    pub attrs_set: usize,
    pub attrs_removed: usize,
    pub values_set: usize,
    pub listeners_added: usize,
}

impl PatchStats {
    /// True if the pass did not touch the live tree.
    #[inline]
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.created == 0
            && self.replaced == 0
            && self.removed == 0
            && self.attrs_set == 0
            && self.attrs_removed == 0
            && self.values_set == 0
            && self.listeners_added == 0
    }
}

impl AddAssign for PatchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.replaced += rhs.replaced;
        self.removed += rhs.removed;
        self.attrs_set += rhs.attrs_set;
        self.attrs_removed += rhs.attrs_removed;
        self.values_set += rhs.values_set;
        self.listeners_added += rhs.listeners_added;
    }
}

/// Pairs up the children of two compatible elements.
///
/// Implementations call back into [`Reconciler::patch`] for every pair they
/// decide on, passing the live index the pair occupies at that moment.
pub trait ChildStrategy: Sized {
    /// Reconcile `old` against `new` under the live node `parent`.
    ///
    /// # Errors
    /// Propagates host errors.
    fn reconcile_children<H: Host + ?Sized>(
        &self,
        reconciler: &Reconciler<Self>,
        host: &mut H,
        parent: NodeKey,
        old: &[VNode],
        new: &[VNode],
        stats: &mut PatchStats,
    ) -> Result<()>;
}

/// Index-only pairing: a child's position is its identity.
///
/// An insertion or removal in the middle of a list shifts every later
/// sibling, which then gets patched against whatever now sits at its index.
#[derive(Copy, Clone, Debug, Default)]
pub struct Positional;

impl ChildStrategy for Positional {
    fn reconcile_children<H: Host + ?Sized>(
        &self,
        reconciler: &Reconciler<Self>,
        host: &mut H,
        parent: NodeKey,
        old: &[VNode],
        new: &[VNode],
        stats: &mut PatchStats,
    ) -> Result<()> {
        let common = old.len().min(new.len());
        for (index, (old_child, new_child)) in old.iter().zip(new).enumerate() {
            reconciler.patch(host, parent, Some(old_child), Some(new_child), index, stats)?;
        }
        for (index, new_child) in new.iter().enumerate().skip(common) {
            reconciler.patch(host, parent, None, Some(new_child), index, stats)?;
        }
        // Highest index first so the remaining indices stay valid.
        for index in (common..old.len()).rev() {
            reconciler.patch(host, parent, old.get(index), None, index, stats)?;
        }
        Ok(())
    }
}

/// Classifies description pairs and applies the matching live mutation.
#[derive(Clone, Debug, Default)]
pub struct Reconciler<C = Positional> {
    children: C,
}

impl Reconciler<Positional> {
    /// A reconciler with positional child pairing.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            children: Positional,
        }
    }
}

impl<C: ChildStrategy> Reconciler<C> {
    /// A reconciler with a custom child pairing strategy.
    #[inline]
    #[must_use]
    pub const fn with_strategy(children: C) -> Self {
        Self { children }
    }

    /// Bring the live child of `parent` at `index` in line with `new`.
    ///
    /// `old` is the description that child was last rendered from. With no
    /// `old`, `new` is materialized and appended; with no `new`, the live child
    /// is removed.
    ///
    /// # Errors
    /// Returns an error if the live tree does not have the expected child, and
    /// propagates host errors.
    pub fn reconcile<H: Host + ?Sized>(
        &self,
        host: &mut H,
        parent: NodeKey,
        old: Option<&VNode>,
        new: Option<&VNode>,
        index: usize,
    ) -> Result<PatchStats> {
        let mut stats = PatchStats::default();
        self.patch(host, parent, old, new, index, &mut stats)?;
        Ok(stats)
    }

    /// [`Reconciler::reconcile`] accumulating into `stats`, for use by child strategies.
    ///
    /// # Errors
    /// See [`Reconciler::reconcile`].
    pub fn patch<H: Host + ?Sized>(
        &self,
        host: &mut H,
        parent: NodeKey,
        old: Option<&VNode>,
        new: Option<&VNode>,
        index: usize,
        stats: &mut PatchStats,
    ) -> Result<()> {
        let (old, new) = match (old, new) {
            (None, None) => return Ok(()),
            (None, Some(new)) => {
                let live = materialize_counted(host, new, stats)?;
                host.append_child(parent, live)?;
                trace!("Appended {live} under {parent}");
                return Ok(());
            }
            (Some(_), None) => {
                let target = live_child(host, parent, index)?;
                host.remove_child(parent, target)?;
                stats.removed += 1;
                trace!("Removed {target} at {index} under {parent}");
                return Ok(());
            }
            (Some(old), Some(new)) => (old, new),
        };

        let target = live_child(host, parent, index)?;
        let change = classify(old, new);
        if change.requires_replace() {
            let live = materialize_counted(host, new, stats)?;
            host.replace_child(parent, live, target)?;
            stats.replaced += 1;
            trace!("Replaced {target} with {live} ({change})");
            return Ok(());
        }
        match change {
            ChangeKind::ValueChanged => {
                let value = new.as_element().and_then(Element::value).unwrap_or_default();
                host.set_value(target, value)?;
                stats.values_set += 1;
                trace!("Set value of {target}");
                return Ok(());
            }
            ChangeKind::AttributesChanged => {
                if let (VNode::Element(old_el), VNode::Element(new_el)) = (old, new) {
                    update_attributes(host, target, old_el, new_el, stats)?;
                }
            }
            ChangeKind::None
            | ChangeKind::TypeChanged
            | ChangeKind::TextChanged
            | ChangeKind::NodeNameChanged => {}
        }

        if let (VNode::Element(old_el), VNode::Element(new_el)) = (old, new) {
            self.children.reconcile_children(
                self,
                host,
                target,
                &old_el.children,
                &new_el.children,
                stats,
            )?;
        }
        Ok(())
    }
}

fn live_child<H: Host + ?Sized>(host: &H, parent: NodeKey, index: usize) -> Result<NodeKey> {
    host.child_at(parent, index)
        .ok_or_else(|| anyhow!("Live tree out of sync: {parent} has no child at index {index}"))
}

/// Remove literal attributes that disappeared and set the ones that are new
/// or changed. Listeners and the `value` attribute are left alone.
fn update_attributes<H: Host + ?Sized>(
    host: &mut H,
    target: NodeKey,
    old: &Element,
    new: &Element,
    stats: &mut PatchStats,
) -> Result<()> {
    for (name, _) in old.plain_attributes() {
        if new.plain_attribute(name).is_none() {
            host.remove_attribute(target, name)?;
            stats.attrs_removed += 1;
        }
    }
    for (name, value) in new.plain_attributes() {
        if old.plain_attribute(name) != Some(value) {
            host.set_attribute(target, name, value)?;
            stats.attrs_set += 1;
        }
    }
    Ok(())
}
