use core::fmt;

use crate::tree::{DOM, DOMNode, NodeKind};
use crate::NodeKey;
use indextree::NodeId;

use serde_json::{Map, Value, json};

// -----------------------
// Module-scope helpers
// -----------------------

fn node_data(dom: &DOM, id: NodeId) -> Option<&DOMNode> {
    dom.dom.get(id).map(indextree::Node::get)
}

fn write_html(dom: &DOM, id: NodeId, out: &mut String) {
    let Some(DOMNode { kind, attrs, .. }) = node_data(dom, id) else {
        return;
    };
    match kind {
        NodeKind::Document => {
            for child in id.children(&dom.dom) {
                write_html(dom, child, out);
            }
        }
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(value);
                out.push('"');
            }
            out.push('>');
            for child in id.children(&dom.dom) {
                write_html(dom, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeKind::Text { text } => out.push_str(text),
    }
}

fn node_to_json(dom: &DOM, id: NodeId) -> Value {
    let Some(DOMNode {
        kind, attrs, value, ..
    }) = node_data(dom, id)
    else {
        return Value::Null;
    };
    let children: Vec<Value> = id
        .children(&dom.dom)
        .map(|child| node_to_json(dom, child))
        .collect();
    match kind {
        NodeKind::Document => json!({ "type": "document", "children": children }),
        NodeKind::Element { tag } => {
            // Sort by key for determinism
            let mut pairs: Vec<&(String, String)> = attrs.iter().collect();
            pairs.sort_by(|left, right| left.0.cmp(&right.0));
            let mut attrs_obj = Map::new();
            for (name, attr_value) in pairs {
                attrs_obj.insert(name.clone(), Value::String(attr_value.clone()));
            }
            let mut obj = json!({
                "type": "element",
                "tag": tag,
                "attrs": Value::Object(attrs_obj),
                "children": children,
            });
            if let (Some(live), Some(map)) = (value, obj.as_object_mut()) {
                map.insert("value".to_owned(), Value::String(live.clone()));
            }
            obj
        }
        NodeKind::Text { text } => json!({ "type": "text", "text": text }),
    }
}

impl DOM {
    /// Serialize the subtree rooted at `key` as markup.
    ///
    /// Attributes appear in the order they were set; text is written verbatim.
    #[must_use]
    pub fn to_html(&self, key: NodeKey) -> Option<String> {
        let id = self.id_of(key).ok()?;
        let mut out = String::new();
        write_html(self, id, &mut out);
        Some(out)
    }

    /// Deterministic JSON snapshot of the whole document.
    #[must_use]
    pub fn to_json(&self) -> Value {
        node_to_json(self, self.root)
    }
}

impl fmt::Debug for DOM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn fmt_node(dom: &DOM, id: NodeId, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            let Some(node) = node_data(dom, id) else {
                return Ok(());
            };
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            match &node.kind {
                NodeKind::Document => writeln!(f, "#document")?,
                NodeKind::Element { tag } => {
                    write!(f, "<{tag}")?;
                    for (name, value) in &node.attrs {
                        write!(f, " {name}={value:?}")?;
                    }
                    writeln!(f, "> {}", node.key)?;
                }
                NodeKind::Text { text } => writeln!(f, "{text:?} {}", node.key)?,
            }
            for child in id.children(&dom.dom) {
                fmt_node(dom, child, f, depth + 1)?;
            }
            Ok(())
        }

        writeln!(f, "DOM")?;
        fmt_node(self, self.root, f, 0)
    }
}
