//! Render scheduling: coalesce change signals into one flush per tick.
//!
//! [`RenderScheduler`] is a two-state machine. The first signal in a tick
//! moves it from [`SchedulerState::Idle`] to [`SchedulerState::PendingFlush`]
//! and asks the caller to post a flush; later signals in the same tick only
//! replace the pending tree. The flush reconciles the pending tree against
//! the render history and returns to `Idle`.

use crate::config::RenderConfig;
use crate::materialize::materialize_counted;
use crate::node::VNode;
use crate::patch::{ChildStrategy, PatchStats, Positional, Reconciler};
use anyhow::Result;
use core::cell::RefCell;
use core::time::Duration;
use dom::{Host, NodeKey};
use log::{debug, error, warn};
use std::collections::VecDeque;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() -> Result<()>>;

/// The one scheduling primitive the renderer needs: run `task` on a later turn.
pub trait TaskQueue {
    /// Queue `task`. It must not run before `post` returns.
    fn post(&self, task: Task);
}

/// A deterministic FIFO queue drained explicitly, one tick per call.
#[derive(Default)]
pub struct ManualQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl ManualQueue {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run every task queued before this call. Tasks posted while running
    /// wait for the next call. Returns the number of tasks run.
    ///
    /// # Errors
    /// Returns the first task error; tasks not yet run stay queued.
    pub fn run_pending(&self) -> Result<usize> {
        let mut batch: VecDeque<Task> = self.tasks.borrow_mut().drain(..).collect();
        let mut ran = 0;
        while let Some(task) = batch.pop_front() {
            ran += 1;
            if let Err(err) = task() {
                let mut tasks = self.tasks.borrow_mut();
                while let Some(rest) = batch.pop_back() {
                    tasks.push_front(rest);
                }
                return Err(err);
            }
        }
        Ok(ran)
    }
}

impl TaskQueue for ManualQueue {
    fn post(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

/// Posts tasks onto the current tokio `LocalSet`.
///
/// Must be used from within a `LocalSet`; task errors are logged.
#[derive(Copy, Clone, Debug, Default)]
pub struct TokioQueue {
    delay: Option<Duration>,
}

impl TokioQueue {
    /// Run tasks on the next turn of the local task set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { delay: None }
    }

    /// Run tasks after `delay` (`None` means the next turn).
    #[inline]
    #[must_use]
    pub const fn with_delay(delay: Option<Duration>) -> Self {
        Self { delay }
    }

    /// Honour the configured flush delay.
    #[inline]
    #[must_use]
    pub const fn from_config(config: &RenderConfig) -> Self {
        Self::with_delay(config.flush_delay())
    }
}

impl TaskQueue for TokioQueue {
    fn post(&self, task: Task) {
        let delay = self.delay;
        tokio::task::spawn_local(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Err(err) = task() {
                error!("Deferred render task failed: {err:#}");
            }
        });
    }
}

/// Coalescing state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SchedulerState {
    #[default]
    Idle,
    PendingFlush,
}

/// Outcome of one flush.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Signals folded into this flush.
    pub signals: u64,
    /// True if the tree was built fresh rather than patched.
    pub mounted: bool,
    pub stats: PatchStats,
}

/// Holds the pending tree and the render history for one render root.
pub struct RenderScheduler<C = Positional> {
    state: SchedulerState,
    pending: Option<VNode>,
    history: Option<VNode>,
    signals: u64,
    reconciler: Reconciler<C>,
}

impl RenderScheduler<Positional> {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::with_reconciler(Reconciler::new())
    }
}

impl Default for RenderScheduler<Positional> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ChildStrategy> RenderScheduler<C> {
    #[inline]
    #[must_use]
    pub const fn with_reconciler(reconciler: Reconciler<C>) -> Self {
        Self {
            state: SchedulerState::Idle,
            pending: None,
            history: None,
            signals: 0,
            reconciler,
        }
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// The tree of the last completed flush.
    #[inline]
    #[must_use]
    pub const fn history(&self) -> Option<&VNode> {
        self.history.as_ref()
    }

    /// Record `tree` as the latest description. Returns `true` if the caller
    /// must post a flush, which happens only on the `Idle -> PendingFlush` edge.
    pub fn signal(&mut self, tree: VNode) -> bool {
        self.pending = Some(tree);
        self.signals += 1;
        match self.state {
            SchedulerState::Idle => {
                self.state = SchedulerState::PendingFlush;
                true
            }
            SchedulerState::PendingFlush => false,
        }
    }

    /// Apply the pending tree to the live children of `mount`.
    ///
    /// Patches against the render history when there is one and builds fresh
    /// otherwise, then commits the pass on `host`. The scheduler is `Idle`
    /// afterwards, even on error. Returns `None` if nothing was pending.
    ///
    /// A pass that fails partway leaves the live tree out of step with the
    /// history, so the rendered root is removed and the history cleared; the
    /// next flush mounts from scratch.
    ///
    /// # Errors
    /// Propagates host errors.
    pub fn flush<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        mount: NodeKey,
    ) -> Result<Option<FlushReport>> {
        self.state = SchedulerState::Idle;
        let signals = core::mem::take(&mut self.signals);
        let Some(new) = self.pending.take() else {
            return Ok(None);
        };

        let mut report = FlushReport {
            signals,
            ..FlushReport::default()
        };
        if let Err(err) = self.apply(host, mount, &new, &mut report) {
            self.unmount_after_error(host, mount, report.mounted);
            return Err(err);
        }
        debug!(
            "Flushed {} signal(s) into {mount}: {:?}",
            report.signals, report.stats
        );
        self.history = Some(new);
        Ok(Some(report))
    }

    fn apply<H: Host + ?Sized>(
        &self,
        host: &mut H,
        mount: NodeKey,
        new: &VNode,
        report: &mut FlushReport,
    ) -> Result<()> {
        if let Some(old) = &self.history {
            self.reconciler
                .patch(host, mount, Some(old), Some(new), 0, &mut report.stats)?;
        } else {
            let live = materialize_counted(host, new, &mut report.stats)?;
            host.append_child(mount, live)?;
            report.mounted = true;
        }
        host.commit()
    }

    fn unmount_after_error<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        mount: NodeKey,
        attached: bool,
    ) {
        if self.history.take().is_none() && !attached {
            return;
        }
        let cleared = match host.child_at(mount, 0) {
            Some(root) => host.remove_child(mount, root).and_then(|()| host.commit()),
            None => host.commit(),
        };
        match cleared {
            Ok(()) => warn!("Render into {mount} failed; the next flush remounts"),
            Err(err) => error!("Could not clear {mount} after a failed render: {err:#}"),
        }
    }
}
