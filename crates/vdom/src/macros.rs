//! Macros for building node descriptions

/// Build an [`Attributes`](crate::Attributes) mapping.
///
/// Values go through `AttrValue::from`, so string values become literal
/// attributes and [`EventHandler`](dom::EventHandler) values become event
/// bindings. Event keys use the `on` prefix.
///
/// # Examples
///
/// ```
/// use vdom::{attrs, h};
/// use dom::EventHandler;
///
/// let button = h(
///     "button",
///     Some(attrs! {
///         "type" => "button",
///         "onclick" => EventHandler::new(|_ctx| {}),
///     }),
///     vec!["count up".into()],
/// );
/// assert!(button.as_element().is_some());
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::Attributes::new();
        $(
            attributes.insert(
                ::std::string::String::from($name),
                $crate::AttrValue::from($value),
            );
        )+
        attributes
    }};
}
