//! Mutation payload tree
//!
//! Every `data: { ... }` payload is built as a [`Node`] tree and rendered by
//! one recursive serializer, whether it is a flat create or a deeply nested
//! composition update.

use std::fmt;

/// A value inside a mutation payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Already-formatted literal (`42`, `"Sales"`, `true`)
    Scalar(String),
    /// `{ field: value, ... }`, fields kept in insertion order
    Object(Vec<(String, Node)>),
    /// `[ value, ... ]`
    List(Vec<Node>),
}

impl Node {
    pub fn scalar(literal: impl Into<String>) -> Self {
        Node::Scalar(literal.into())
    }

    pub fn object() -> Self {
        Node::Object(Vec::new())
    }

    /// Builder-style field insertion; no-op on non-object nodes
    pub fn with(mut self, field: impl Into<String>, value: Node) -> Self {
        self.push(field, value);
        self
    }

    /// Append a field to an object node; no-op on non-object nodes
    pub fn push(&mut self, field: impl Into<String>, value: Node) {
        if let Node::Object(fields) = self {
            fields.push((field.into(), value));
        }
    }

    /// Whether this is an object without fields
    pub fn is_empty_object(&self) -> bool {
        matches!(self, Node::Object(fields) if fields.is_empty())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Node::Scalar(literal) => out.push_str(literal),
            Node::Object(fields) => {
                if fields.is_empty() {
                    out.push_str("{ }");
                    return;
                }
                out.push_str("{ ");
                for (idx, (field, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(field);
                    out.push_str(": ");
                    value.render_into(out);
                }
                out.push_str(" }");
            }
            Node::List(items) => {
                if items.is_empty() {
                    out.push_str("[ ]");
                    return;
                }
                out.push_str("[ ");
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(out);
                }
                out.push_str(" ]");
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
