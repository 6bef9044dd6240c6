//! Multi-level composition assembly
//!
//! When a composition sheet's parent class is the role of another composition
//! sheet (`#Employee` under `Department`, `#Skill` under `Employee`), the whole
//! chain can be created in one request per root parent:
//!
//! ```text
//! Department___update(data: { _id: 7, Employee: { create: [
//!     { nome: "Alice", Skill: { create: { nome: "Rust" } } }
//! ] } })
//! ```
//!
//! A child row belongs to the parent row whose value in the column named by
//! the child's referenced attribute equals the child's first cell. Values are
//! compared raw (trimmed, numbers in canonical form), never formatted. A child
//! row whose value matches several parent rows is nested under each of them.

use std::collections::{HashMap, HashSet};

use crate::graph::compiler::{CompiledSheet, composition_fields, parent_id};
use crate::graph::error::{ImportError, RowIssue, RowIssueReason};
use crate::graph::mutation::{Mutation, nested_create};
use crate::graph::resolver::{ReferenceCache, cell_key};
use crate::graph::types::{Node, QuotingPlan, Row, Sheet};

/// Parent/child structure of the composition sheets of one workbook
#[derive(Debug)]
pub struct NestedAssembler<'a> {
    sheets: &'a [Sheet],
    plans: &'a [QuotingPlan],
    /// child sheet index -> parent sheet index
    parent_of: HashMap<usize, usize>,
    /// parent sheet index -> child sheet indexes, in sheet order
    children: HashMap<usize, Vec<usize>>,
}

impl<'a> NestedAssembler<'a> {
    /// Link composition sheets to their parent compositions
    ///
    /// Fails with [`ImportError::CompositionCycle`] when following parents
    /// loops back.
    pub fn new(sheets: &'a [Sheet], plans: &'a [QuotingPlan]) -> Result<Self, ImportError> {
        let roles: HashMap<&str, usize> = sheets
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_composition())
            .map(|(idx, s)| (s.role_name(), idx))
            .collect();

        let mut parent_of = HashMap::new();
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for (idx, sheet) in sheets.iter().enumerate() {
            let Some(parent) = sheet.parent_reference() else {
                continue;
            };
            if let Some(&parent_idx) = roles.get(parent.class_name.as_str()) {
                parent_of.insert(idx, parent_idx);
                children.entry(parent_idx).or_default().push(idx);
            }
        }

        for &start in parent_of.keys() {
            let mut chain = vec![start];
            let mut visited = HashSet::from([start]);
            let mut current = start;
            while let Some(&parent) = parent_of.get(&current) {
                chain.push(parent);
                if !visited.insert(parent) {
                    return Err(ImportError::CompositionCycle {
                        sheets: chain.iter().map(|&i| sheets[i].name().to_string()).collect(),
                    });
                }
                current = parent;
            }
        }

        Ok(Self {
            sheets,
            plans,
            parent_of,
            children,
        })
    }

    /// Composition whose parent is an ordinary entity
    pub fn is_root(&self, idx: usize) -> bool {
        self.sheets.get(idx).is_some_and(Sheet::is_composition) && !self.is_child(idx)
    }

    /// Composition nested inside another composition
    pub fn is_child(&self, idx: usize) -> bool {
        self.parent_of.contains_key(&idx)
    }

    /// `idx` followed by all its descendant sheets, breadth first
    pub fn subtree(&self, idx: usize) -> Vec<usize> {
        let mut out = vec![idx];
        let mut next = 0;
        while next < out.len() {
            if let Some(children) = self.children.get(&out[next]) {
                out.extend(children.iter().copied());
            }
            next += 1;
        }
        out
    }

    /// Build one mutation per distinct parent of root sheet `idx`
    ///
    /// Issues cover the whole subtree, including child rows that matched no
    /// parent row.
    pub fn assemble(&self, idx: usize, cache: &ReferenceCache) -> Result<CompiledSheet, ImportError> {
        let sheet = &self.sheets[idx];
        let Some(parent) = sheet.parent_reference() else {
            return Err(ImportError::InvalidSheet {
                sheet: sheet.name().to_string(),
                reason: "composition sheet has no parent reference".to_string(),
            });
        };

        let mut compiled = CompiledSheet::default();
        let mut attached: HashSet<(usize, usize)> = HashSet::new();
        let mut groups: Vec<(String, Vec<Node>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        for row in sheet.rows() {
            let id = match parent_id(sheet, cache, row) {
                Ok(id) => id.to_string(),
                Err(issue) => {
                    compiled.issues.push(issue);
                    continue;
                }
            };
            let node = match self.row_node(idx, row, cache, &mut attached, &mut compiled.issues) {
                Some(node) => node,
                None => continue,
            };
            let slot = *group_index.entry(id.clone()).or_insert_with(|| {
                groups.push((id.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(node);
        }

        for (id, rows) in groups {
            compiled.mutations.push(Mutation::nested_update(
                parent.class_name.as_str(),
                &id,
                sheet.role_name(),
                rows,
            ));
        }

        for child_idx in self.subtree(idx).into_iter().skip(1) {
            let child = &self.sheets[child_idx];
            for (row_idx, row) in child.rows().iter().enumerate() {
                if attached.contains(&(child_idx, row_idx)) {
                    continue;
                }
                compiled.issues.push(RowIssue {
                    sheet: child.name().to_string(),
                    row: row.number,
                    column: child.headers()[0].raw().to_string(),
                    value: row
                        .value(0)
                        .map(|c| c.text.trim().to_string())
                        .unwrap_or_default(),
                    reason: if row.value(0).is_some() {
                        RowIssueReason::UnresolvedParent
                    } else {
                        RowIssueReason::MissingParent
                    },
                });
            }
        }

        compiled.issues.sort_by(|a, b| (&a.sheet, a.row).cmp(&(&b.sheet, b.row)));
        compiled.issues.dedup();
        Ok(compiled)
    }

    /// Fields of one row plus its nested children, or `None` if the row is dropped
    fn row_node(
        &self,
        idx: usize,
        row: &Row,
        cache: &ReferenceCache,
        attached: &mut HashSet<(usize, usize)>,
        issues: &mut Vec<RowIssue>,
    ) -> Option<Node> {
        let sheet = &self.sheets[idx];
        let mut node = match composition_fields(sheet, &self.plans[idx], cache, row) {
            Ok(node) => node,
            Err(issue) => {
                issues.push(issue);
                return None;
            }
        };
        self.attach_children(idx, row, &mut node, cache, attached, issues);
        Some(node)
    }

    /// Nest the matching rows of every child sheet of `idx` under `node`
    ///
    /// Matching is by value, so the same child row may be attached to more
    /// than one parent row.
    fn attach_children(
        &self,
        idx: usize,
        row: &Row,
        node: &mut Node,
        cache: &ReferenceCache,
        attached: &mut HashSet<(usize, usize)>,
        issues: &mut Vec<RowIssue>,
    ) {
        let sheet = &self.sheets[idx];
        let Some(children) = self.children.get(&idx) else {
            return;
        };

        for &child_idx in children {
            let child = &self.sheets[child_idx];
            let Some(reference) = child.parent_reference() else {
                continue;
            };
            let Some(match_value) = sheet
                .attribute_column(&reference.attribute_name)
                .and_then(|col| row.value(col))
                .map(|cell| cell_key(&reference.attribute_name, cell))
            else {
                continue;
            };

            let mut nested = Vec::new();
            for (row_idx, child_row) in child.rows().iter().enumerate() {
                let matches = child_row
                    .value(0)
                    .is_some_and(|cell| cell_key(&reference.attribute_name, cell) == match_value);
                if !matches {
                    continue;
                }
                attached.insert((child_idx, row_idx));
                if let Some(child_node) = self.row_node(child_idx, child_row, cache, attached, issues) {
                    nested.push(child_node);
                }
            }

            if !nested.is_empty() {
                node.push(child.role_name(), nested_create(nested));
            }
        }
    }
}
