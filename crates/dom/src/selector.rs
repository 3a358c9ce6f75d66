//! Minimal selector matching for mount point lookup.
//!
//! Only single simple selectors are understood: `#id`, `.class` and a bare
//! tag name. Anything else never matches.

use crate::tree::{DOMNode, NodeKind};

/// A parsed simple selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Class(String),
    Tag(String),
}

impl Selector {
    /// Parse a simple selector, returning `None` for empty or compound input.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() || input.contains(char::is_whitespace) {
            return None;
        }
        if let Some(id) = input.strip_prefix('#') {
            return (!id.is_empty()).then(|| Self::Id(id.to_owned()));
        }
        if let Some(class) = input.strip_prefix('.') {
            return (!class.is_empty()).then(|| Self::Class(class.to_owned()));
        }
        Some(Self::Tag(input.to_ascii_lowercase()))
    }

    /// Whether `node` matches this selector.
    #[must_use]
    pub fn matches(&self, node: &DOMNode) -> bool {
        let NodeKind::Element { tag } = &node.kind else {
            return false;
        };
        match self {
            Self::Tag(name) => tag.eq_ignore_ascii_case(name),
            Self::Id(id) => node.attr("id") == Some(id.as_str()),
            Self::Class(class) => node
                .attr("class")
                .is_some_and(|value| value.split_whitespace().any(|token| token == class)),
        }
    }
}
