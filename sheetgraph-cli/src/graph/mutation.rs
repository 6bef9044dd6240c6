//! Mutation requests
//!
//! A [`Mutation`] is built once and never changed afterwards. Its text is the
//! exact request sent to the API.

use serde::Serialize;

use super::types::Node;
use super::types::cell::{integral_literal, quote};
use super::types::header::ID_ATTRIBUTE;

/// What a mutation does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// `T___create`
    Create,
    /// `P___update` nesting creates of composition rows
    UpdateWithNestedCreate,
    /// `T___deleteBulk`
    DeleteBulk,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Create => write!(f, "create"),
            MutationKind::UpdateWithNestedCreate => write!(f, "update"),
            MutationKind::DeleteBulk => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mutation {
    pub kind: MutationKind,
    /// Entity type the mutation is addressed to
    pub entity: String,
    pub text: String,
}

impl Mutation {
    /// `mutation { T___create(data: { ... }) { _id } }`
    pub fn create(entity: impl Into<String>, data: Node) -> Self {
        let entity = entity.into();
        let text = format!(
            "mutation {{ {}___create(data: {}) {{ {} }} }}",
            entity,
            data.render(),
            ID_ATTRIBUTE
        );
        Self {
            kind: MutationKind::Create,
            entity,
            text,
        }
    }

    /// Update `entity` with id `parent_id`, creating `rows` under `role`
    pub fn nested_update(
        entity: impl Into<String>,
        parent_id: &str,
        role: impl Into<String>,
        rows: Vec<Node>,
    ) -> Self {
        let entity = entity.into();
        let data = Node::object()
            .with(ID_ATTRIBUTE, Node::scalar(id_literal(parent_id)))
            .with(role, nested_create(rows));
        let text = format!(
            "mutation {{ {}___update(data: {}) {{ {} }} }}",
            entity,
            data.render(),
            ID_ATTRIBUTE
        );
        Self {
            kind: MutationKind::UpdateWithNestedCreate,
            entity,
            text,
        }
    }

    /// `mutation { T___deleteBulk(options: { }) { deleted } }`
    pub fn delete_bulk(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        let text = format!(
            "mutation {{ {}___deleteBulk(options: {}) {{ deleted }} }}",
            entity,
            Node::object().render()
        );
        Self {
            kind: MutationKind::DeleteBulk,
            entity,
            text,
        }
    }
}

/// Identifier literal: bare when integral, quoted otherwise
pub fn id_literal(id: &str) -> String {
    integral_literal(id).unwrap_or_else(|| quote(id.trim()))
}

/// `{ create: { ... } }` for one row, `{ create: [ { ... }, ... ] }` for several
pub fn nested_create(mut rows: Vec<Node>) -> Node {
    let value = if rows.len() == 1 {
        rows.remove(0)
    } else {
        Node::List(rows)
    };
    Node::object().with("create", value)
}
