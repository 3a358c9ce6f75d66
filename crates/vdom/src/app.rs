//! The application shell: state, view and a scheduled render root.
//!
//! An [`App`] owns the state and recomputes the view after every dispatched
//! action. Renders are deferred through a [`TaskQueue`] and coalesced, so any
//! number of actions fired in one tick lead to a single pass over the live tree.

use crate::actions::{ActionFn, ActionSink, Actions, Dispatcher};
use crate::config::RenderConfig;
use crate::node::VNode;
use crate::scheduler::{FlushReport, RenderScheduler, SchedulerState, Task, TaskQueue};
use anyhow::{Result, anyhow, bail};
use core::cell::{Ref, RefCell};
use dom::{Host, NodeKey};
use log::{debug, info};
use std::rc::{Rc, Weak};

/// A view function: project the state into a node description.
///
/// Views must not touch the live tree; they only describe it.
pub type ViewFn<S> = Box<dyn Fn(&S, &Dispatcher<S>) -> VNode>;

/// Where the application is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mount {
    /// A live container handle.
    Key(NodeKey),
    /// A selector resolved against the host at construction.
    Selector(String),
}

impl From<NodeKey> for Mount {
    fn from(key: NodeKey) -> Self {
        Self::Key(key)
    }
}

impl From<&str> for Mount {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_owned())
    }
}

/// Everything an application is built from.
pub struct AppParams<S> {
    pub mount: Mount,
    pub view: ViewFn<S>,
    pub state: S,
    pub actions: Actions<S>,
}

struct Runtime<S, H> {
    this: Weak<RefCell<Self>>,
    state: S,
    view: ViewFn<S>,
    dispatcher: Dispatcher<S>,
    scheduler: RenderScheduler,
    host: Rc<RefCell<H>>,
    mount: NodeKey,
    queue: Rc<dyn TaskQueue>,
    config: RenderConfig,
    renders: u64,
    last_report: Option<FlushReport>,
}

impl<S: 'static, H: Host + 'static> Runtime<S, H> {
    /// Recompute the view and record it; schedule a flush if none is pending.
    fn resolve_node(&mut self) {
        let tree = (self.view)(&self.state, &self.dispatcher);
        if self.scheduler.signal(tree) {
            self.post_flush();
        }
    }

    /// Queue a flush task. While the scheduler is `PendingFlush` exactly one
    /// such task is queued.
    fn post_flush(&self) {
        self.queue
            .post(flush_task(Weak::clone(&self.this), Rc::clone(&self.queue)));
    }

    fn render(&mut self) -> Result<()> {
        let Ok(mut host) = self.host.try_borrow_mut() else {
            self.post_flush();
            bail!("Host is borrowed; render into {} moved to the next turn", self.mount);
        };
        let Some(report) = self.scheduler.flush(&mut *host, self.mount)? else {
            return Ok(());
        };
        self.renders += 1;
        self.last_report = Some(report);
        if self.config.telemetry_enabled {
            let stats = report.stats;
            info!(
                "render #{}: signals={} mounted={} created={} replaced={} removed={} attrs_set={} attrs_removed={} values_set={}",
                self.renders,
                report.signals,
                report.mounted,
                stats.created,
                stats.replaced,
                stats.removed,
                stats.attrs_set,
                stats.attrs_removed,
                stats.values_set,
            );
        }
        Ok(())
    }
}

/// The deferred render for one application. If it cannot get at the runtime
/// it queues itself again, so a pending flush is never lost.
fn flush_task<S: 'static, H: Host + 'static>(
    this: Weak<RefCell<Runtime<S, H>>>,
    queue: Rc<dyn TaskQueue>,
) -> Task {
    Box::new(move || {
        let Some(shared) = this.upgrade() else {
            debug!("Application dropped before its render ran");
            return Ok(());
        };
        let Ok(mut runtime) = shared.try_borrow_mut() else {
            queue.post(flush_task(Weak::clone(&this), Rc::clone(&queue)));
            bail!("Render ran while the application was busy; moved to the next turn");
        };
        runtime.render()
    })
}

impl<S: 'static, H: Host + 'static> ActionSink<S> for Runtime<S, H> {
    fn run_action(&mut self, name: &str, action: &ActionFn<S>, payload: Option<&str>) {
        debug!("Running action '{name}'");
        action(&mut self.state, payload);
        self.resolve_node();
    }
}

/// A mounted application.
pub struct App<S, H> {
    runtime: Rc<RefCell<Runtime<S, H>>>,
    host: Rc<RefCell<H>>,
    dispatcher: Dispatcher<S>,
    mount: NodeKey,
}

impl<S: 'static, H: Host + 'static> App<S, H> {
    /// Resolve the mount point, compute the first tree and schedule the first render.
    ///
    /// # Errors
    /// Returns an error if the mount selector matches nothing or the host is
    /// already borrowed. Nothing is rendered in that case.
    pub fn new(
        params: AppParams<S>,
        host: Rc<RefCell<H>>,
        queue: Rc<dyn TaskQueue>,
        config: RenderConfig,
    ) -> Result<Self> {
        let AppParams {
            mount,
            view,
            state,
            actions,
        } = params;
        let mount = resolve_mount(&host, mount)?;
        info!("Mounting application at {mount}");

        let actions = Rc::new(actions);
        let runtime = Rc::new_cyclic(|this: &Weak<RefCell<Runtime<S, H>>>| {
            let sink: Weak<RefCell<dyn ActionSink<S>>> =
                Weak::<RefCell<Runtime<S, H>>>::clone(this);
            RefCell::new(Runtime {
                this: Weak::clone(this),
                state,
                view,
                dispatcher: Dispatcher::new(actions, sink),
                scheduler: RenderScheduler::new(),
                host: Rc::clone(&host),
                mount,
                queue,
                config,
                renders: 0,
                last_report: None,
            })
        });
        let dispatcher = runtime.borrow().dispatcher.clone();
        runtime.borrow_mut().resolve_node();

        Ok(Self {
            runtime,
            host,
            dispatcher,
            mount,
        })
    }

    /// Run an action and schedule a render.
    ///
    /// # Errors
    /// See [`Dispatcher::dispatch`].
    #[inline]
    pub fn dispatch(&self, name: &str, payload: Option<&str>) -> Result<()> {
        self.dispatcher.dispatch(name, payload)
    }

    #[inline]
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    #[inline]
    #[must_use]
    pub const fn host(&self) -> &Rc<RefCell<H>> {
        &self.host
    }

    /// The resolved mount container.
    #[inline]
    #[must_use]
    pub const fn mount(&self) -> NodeKey {
        self.mount
    }

    /// Borrow the application state.
    #[must_use]
    pub fn state(&self) -> Ref<'_, S> {
        Ref::map(self.runtime.borrow(), |runtime| &runtime.state)
    }

    #[must_use]
    pub fn scheduler_state(&self) -> SchedulerState {
        self.runtime.borrow().scheduler.state()
    }

    /// Number of completed render passes.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.runtime.borrow().renders
    }

    /// Report of the most recent render pass.
    #[must_use]
    pub fn last_report(&self) -> Option<FlushReport> {
        self.runtime.borrow().last_report
    }
}

fn resolve_mount<H: Host>(host: &RefCell<H>, mount: Mount) -> Result<NodeKey> {
    match mount {
        Mount::Key(key) => Ok(key),
        Mount::Selector(selector) => {
            let host = host
                .try_borrow()
                .map_err(|_err| anyhow!("Host is borrowed; cannot resolve {selector}"))?;
            host.query_selector(&selector)
                .ok_or_else(|| anyhow!("The mount target {selector} was not found."))
        }
    }
}
