//! A minimal virtual DOM renderer.
//!
//! A view function projects application state into an immutable [`VNode`]
//! tree. The [`Reconciler`] compares that tree with the previously rendered
//! one and patches a live tree behind the [`dom::Host`] trait with as few
//! mutations as the change kinds allow. The [`RenderScheduler`] coalesces
//! every change signal raised within one tick into a single render pass, and
//! [`App`] ties state, actions, view and scheduler together.

pub mod actions;
pub mod app;
pub mod config;
pub mod diff;
pub mod macros;
pub mod materialize;
pub mod node;
pub mod patch;
pub mod scheduler;

pub use actions::{ActionFn, Actions, Dispatcher};
pub use app::{App, AppParams, Mount, ViewFn};
pub use config::RenderConfig;
pub use diff::{ChangeKind, classify};
pub use materialize::materialize;
pub use node::{AttrValue, Attributes, EVENT_PREFIX, Element, Leaf, VALUE_ATTRIBUTE, VNode, h};
pub use patch::{ChildStrategy, PatchStats, Positional, Reconciler};
pub use scheduler::{
    FlushReport, ManualQueue, RenderScheduler, SchedulerState, Task, TaskQueue, TokioQueue,
};
