use crate::NodeKey;
use core::fmt;
use std::rc::Rc;

/// Context passed to event handlers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    /// The node that triggered the event
    pub node: NodeKey,
    /// The event type (e.g., "click", "input")
    pub event_type: String,
    /// Live value carried by the event, e.g. the text of an input control
    pub value: Option<String>,
}

impl EventContext {
    /// Create a context for `event_type` fired on `node`.
    #[inline]
    #[must_use]
    pub fn new(node: NodeKey, event_type: impl Into<String>) -> Self {
        Self {
            node,
            event_type: event_type.into(),
            value: None,
        }
    }

    /// Attach a value to the context.
    #[inline]
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Type-erased event handler.
///
/// Rendering is single-threaded, so handlers are reference counted without
/// `Send`/`Sync` bounds and may capture `Rc` state.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&EventContext)>);

impl EventHandler {
    /// Wrap a closure as an event handler.
    #[inline]
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&EventContext) + 'static,
    {
        Self(Rc::new(handler))
    }

    /// Invoke the handler.
    #[inline]
    pub fn call(&self, ctx: &EventContext) {
        (self.0)(ctx);
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}
