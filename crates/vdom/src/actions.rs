//! Named state actions and the dispatcher that wraps them.
//!
//! Every dispatched action runs against the application state and is then
//! followed by a change signal, so the view is recomputed and a render is
//! scheduled without the action having to ask for it.

use anyhow::{Result, anyhow};
use core::cell::RefCell;
use dom::EventHandler;
use log::{trace, warn};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// An action: mutate the state, optionally using a payload such as an input value.
pub type ActionFn<S> = Rc<dyn Fn(&mut S, Option<&str>)>;

/// Registry of named actions.
pub struct Actions<S> {
    actions: HashMap<String, ActionFn<S>>,
}

impl<S> Actions<S> {
    /// Create an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register an action under `name`, replacing any previous one.
    #[inline]
    pub fn register<F>(&mut self, name: impl Into<String>, action: F)
    where
        F: Fn(&mut S, Option<&str>) + 'static,
    {
        self.actions.insert(name.into(), Rc::new(action));
    }

    /// Builder form of [`Actions::register`].
    #[inline]
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut S, Option<&str>) + 'static,
    {
        self.register(name, action);
        self
    }

    /// Get an action by name.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionFn<S>> {
        self.actions.get(name)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<S> Default for Actions<S> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Whatever owns the state: runs an action, then signals the change.
pub(crate) trait ActionSink<S> {
    fn run_action(&mut self, name: &str, action: &ActionFn<S>, payload: Option<&str>);
}

/// Handle passed to the view for dispatching actions and binding them to events.
pub struct Dispatcher<S> {
    actions: Rc<Actions<S>>,
    sink: Weak<RefCell<dyn ActionSink<S>>>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            actions: Rc::clone(&self.actions),
            sink: Weak::clone(&self.sink),
        }
    }
}

impl<S: 'static> Dispatcher<S> {
    pub(crate) fn new(actions: Rc<Actions<S>>, sink: Weak<RefCell<dyn ActionSink<S>>>) -> Self {
        Self { actions, sink }
    }

    /// Whether an action named `name` exists.
    #[inline]
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.actions.get(name).is_some()
    }

    /// Run the action `name` with `payload`, then signal a state change.
    ///
    /// # Errors
    /// Returns an error if no such action exists, if the application is gone,
    /// or if called while the application is rendering.
    pub fn dispatch(&self, name: &str, payload: Option<&str>) -> Result<()> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| anyhow!("Unknown action '{name}'"))?;
        let sink = self
            .sink
            .upgrade()
            .ok_or_else(|| anyhow!("Application for action '{name}' was dropped"))?;
        let mut sink = sink
            .try_borrow_mut()
            .map_err(|_err| anyhow!("Action '{name}' dispatched during a render"))?;
        trace!("Dispatching action '{name}'");
        sink.run_action(name, action, payload);
        Ok(())
    }

    /// An event handler that dispatches `name` with the event's value as payload.
    ///
    /// Failures are logged, since listeners cannot return errors.
    #[must_use]
    pub fn handler(&self, name: &str) -> EventHandler {
        let dispatcher = self.clone();
        let name = name.to_owned();
        EventHandler::new(move |ctx| {
            if let Err(err) = dispatcher.dispatch(&name, ctx.value.as_deref()) {
                warn!("Dropped {} event on {}: {err:#}", ctx.event_type, ctx.node);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::{EventContext, NodeKey};

    #[derive(Default)]
    struct Recorder {
        state: Vec<String>,
        signals: usize,
    }

    impl ActionSink<Vec<String>> for Recorder {
        fn run_action(&mut self, _name: &str, action: &ActionFn<Vec<String>>, payload: Option<&str>) {
            action(&mut self.state, payload);
            self.signals += 1;
        }
    }

    fn setup() -> (Rc<RefCell<Recorder>>, Dispatcher<Vec<String>>) {
        let actions = Actions::new()
            .with("push", |state: &mut Vec<String>, payload| {
                state.push(payload.unwrap_or("-").to_owned());
            })
            .with("clear", |state: &mut Vec<String>, _payload| state.clear());
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let weak = Rc::downgrade(&recorder);
        let sink: Weak<RefCell<dyn ActionSink<Vec<String>>>> = weak;
        (recorder, Dispatcher::new(Rc::new(actions), sink))
    }

    #[test]
    fn dispatch_runs_action_then_signals() -> Result<()> {
        let (recorder, dispatcher) = setup();
        dispatcher.dispatch("push", Some("a"))?;
        dispatcher.dispatch("push", None)?;
        let recorder = recorder.borrow();
        assert_eq!(recorder.state, vec!["a".to_owned(), "-".to_owned()]);
        assert_eq!(recorder.signals, 2);
        Ok(())
    }

    #[test]
    fn unknown_action_is_an_error() {
        let (recorder, dispatcher) = setup();
        assert!(!dispatcher.has("nope"));
        assert!(dispatcher.dispatch("nope", None).is_err());
        assert_eq!(recorder.borrow().signals, 0);
    }

    #[test]
    fn dropped_application_is_an_error() {
        let (recorder, dispatcher) = setup();
        drop(recorder);
        assert!(dispatcher.dispatch("clear", None).is_err());
    }

    #[test]
    fn handler_forwards_event_value() {
        let (recorder, dispatcher) = setup();
        let handler = dispatcher.handler("push");
        handler.call(&EventContext::new(NodeKey(4), "input").with_value("typed"));
        assert_eq!(recorder.borrow().state, vec!["typed".to_owned()]);
    }
}
