//! Node descriptions: the immutable tree a view function returns.
//!
//! A description holds no reference to any live node, so it can be built
//! anywhere and dropped after the reconciliation pass that consumes it.

use dom::EventHandler;
use core::mem;
use std::collections::BTreeMap;

/// Prefix marking an attribute key as an event binding (`onclick` -> `click`).
pub const EVENT_PREFIX: &str = "on";

/// Attribute carrying the live, user-editable value of a form control.
pub const VALUE_ATTRIBUTE: &str = "value";

/// A primitive leaf: text or a number.
///
/// Numbers compare by bit pattern, so a leaf always equals itself (`NaN`
/// included) and `0.0` differs from `-0.0`, matching their rendered text.
#[derive(Clone, Debug)]
pub enum Leaf {
    Text(String),
    Number(f64),
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(left), Self::Text(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left.to_bits() == right.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Leaf {}

impl Leaf {
    /// The text a live leaf node shows for this value.
    ///
    /// Numbers use `f64`'s `Display`: integral values drop the fraction, large
    /// values are written out in full and `-0.0` keeps its sign.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }

    /// Whether both leaves hold the same primitive kind.
    #[inline]
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// An attribute value, typed at construction.
#[derive(Clone, Debug)]
pub enum AttrValue {
    /// Rendered as a literal presentation attribute.
    Static(String),
    /// Registered as an event listener.
    Event(EventHandler),
}

impl AttrValue {
    /// The literal value, or `None` for event bindings.
    #[inline]
    #[must_use]
    pub fn as_static(&self) -> Option<&str> {
        match self {
            Self::Static(value) => Some(value),
            Self::Event(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Static(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

impl From<EventHandler> for AttrValue {
    fn from(handler: EventHandler) -> Self {
        Self::Event(handler)
    }
}

/// Attribute mapping of an element. Keys are unique; order carries no meaning.
pub type Attributes = BTreeMap<String, AttrValue>;

/// An interior node description.
#[derive(Clone, Debug)]
pub struct Element {
    pub tag: String,
    pub attributes: Attributes,
    pub children: Vec<VNode>,
}

impl Element {
    /// An element with no attributes and no children.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    /// Set a literal attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into(), AttrValue::Static(value.into()));
        self
    }

    /// Bind `handler` to `event` (stored under the `on` + event key).
    #[must_use]
    pub fn on(mut self, event: &str, handler: EventHandler) -> Self {
        self.attributes
            .insert(format!("{EVENT_PREFIX}{event}"), AttrValue::Event(handler));
        self
    }

    /// Append one child.
    #[must_use]
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// The declared `value` attribute, if it is a literal.
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.attributes
            .get(VALUE_ATTRIBUTE)
            .and_then(AttrValue::as_static)
    }

    /// Literal attributes other than `value`, in key order.
    pub fn plain_attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(name, value)| {
            let literal = value.as_static()?;
            (name != VALUE_ATTRIBUTE).then_some((name.as_str(), literal))
        })
    }

    /// The literal value of a non-`value` attribute.
    #[must_use]
    pub fn plain_attribute(&self, name: &str) -> Option<&str> {
        if name == VALUE_ATTRIBUTE {
            return None;
        }
        self.attributes.get(name).and_then(AttrValue::as_static)
    }

    /// Event bindings as `(event name, handler)`, in key order.
    pub fn events(&self) -> impl Iterator<Item = (&str, &EventHandler)> {
        self.attributes.iter().filter_map(|(name, value)| match value {
            AttrValue::Event(handler) => {
                Some((name.strip_prefix(EVENT_PREFIX).unwrap_or(name.as_str()), handler))
            }
            AttrValue::Static(_) => None,
        })
    }
}

/// A node description: a primitive leaf or an element.
#[derive(Clone, Debug)]
pub enum VNode {
    Leaf(Leaf),
    Element(Element),
}

impl VNode {
    /// The element, if this is one.
    #[inline]
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Leaf(_) => None,
        }
    }

    /// Number of nodes in this description, itself included.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Element(element) => 1 + element.children.iter().map(Self::len).sum::<usize>(),
        }
    }

    /// Descriptions always contain at least one node.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Build an element description.
///
/// A missing attribute mapping is treated as empty. Tag names are not validated.
#[must_use]
pub fn h(tag: &str, attributes: Option<Attributes>, children: Vec<VNode>) -> VNode {
    VNode::Element(Element {
        tag: tag.to_owned(),
        attributes: attributes.unwrap_or_default(),
        children,
    })
}

impl From<Element> for VNode {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Leaf> for VNode {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        Self::Leaf(Leaf::Text(text.to_owned()))
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        Self::Leaf(Leaf::Text(text))
    }
}

impl From<f64> for VNode {
    fn from(number: f64) -> Self {
        Self::Leaf(Leaf::Number(number))
    }
}

macro_rules! number_leaf {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for VNode {
                fn from(number: $ty) -> Self {
                    Self::Leaf(Leaf::Number(number as f64))
                }
            }
        )*
    };
}

number_leaf!(i32, i64, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_integers() {
        assert_eq!(Leaf::Number(2.0).to_text(), "2");
        assert_eq!(Leaf::Number(0.5).to_text(), "0.5");
        assert_eq!(Leaf::Text("x".into()).to_text(), "x");
        assert_eq!(Leaf::Number(-0.0).to_text(), "-0");
        assert_eq!(Leaf::Number(1e21).to_text(), "1000000000000000000000");
    }

    #[test]
    fn leaf_kinds() {
        let text = Leaf::Text("1".into());
        assert!(text.same_kind(&Leaf::Text("2".into())));
        assert!(!text.same_kind(&Leaf::Number(1.0)));
    }

    #[test]
    fn builder_splits_events_from_plain_attributes() {
        let element = Element::new("input")
            .attr("type", "text")
            .attr("value", "hello")
            .on("input", EventHandler::new(|_ctx| {}));

        assert_eq!(element.value(), Some("hello"));
        assert_eq!(element.plain_attributes().collect::<Vec<_>>(), vec![("type", "text")]);
        assert_eq!(element.plain_attribute("value"), None);
        let events: Vec<&str> = element.events().map(|(name, _)| name).collect();
        assert_eq!(events, vec!["input"]);
        assert!(element.attributes.contains_key("oninput"));
    }

    #[test]
    fn h_normalizes_children_and_defaults_attributes() {
        let node = h("ul", None, vec!["a".into(), 3i32.into(), Element::new("li").into()]);
        let Some(element) = node.as_element() else {
            panic!("expected element");
        };
        assert!(element.attributes.is_empty());
        assert!(matches!(element.children[1], VNode::Leaf(Leaf::Number(number)) if (number - 3.0).abs() < f64::EPSILON));
        assert_eq!(node.len(), 4);
    }
}
