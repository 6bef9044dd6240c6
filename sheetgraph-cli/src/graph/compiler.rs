//! Sheet to mutation compilation
//!
//! Compilation runs after the sheet's references are resolved: every
//! reference value is read back from the [`ReferenceCache`].

use crate::graph::error::{ImportError, RowIssue, RowIssueReason};
use crate::graph::mutation::{Mutation, id_literal};
use crate::graph::resolver::{LookupValue, ReferenceCache, ReferenceResolver, cell_key};
use crate::graph::types::{Header, Node, QuotingPlan, RawCell, Reference, Row, Sheet};

/// Mutations and dropped rows produced for one sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSheet {
    pub mutations: Vec<Mutation>,
    pub issues: Vec<RowIssue>,
}

/// Values to look up for one `(class, attribute)` pair
#[derive(Debug, Clone, PartialEq)]
pub struct LookupGroup {
    pub class: String,
    pub attribute: String,
    pub values: Vec<LookupValue>,
}

/// Group the reference values of a sheet by `(class, attribute)`
///
/// Columns listed in `skip` are ignored. Groups keep first-appearance order;
/// values are deduplicated by key.
pub fn collect_lookups(sheet: &Sheet, plan: &QuotingPlan, skip: &[usize]) -> Vec<LookupGroup> {
    let mut groups: Vec<LookupGroup> = Vec::new();

    for (col, header) in sheet.headers().iter().enumerate() {
        if skip.contains(&col) {
            continue;
        }
        let Some(reference) = header.reference() else {
            continue;
        };

        let idx = match groups.iter().position(|g| {
            g.class == reference.class_name && g.attribute == reference.attribute_name
        }) {
            Some(idx) => idx,
            None => {
                groups.push(LookupGroup {
                    class: reference.class_name.clone(),
                    attribute: reference.attribute_name.clone(),
                    values: Vec::new(),
                });
                groups.len() - 1
            }
        };

        for row in sheet.rows() {
            let Some(cell) = row.value(col) else {
                continue;
            };
            let key = cell_key(&reference.attribute_name, cell);
            if groups[idx].values.iter().any(|v| v.key == key) {
                continue;
            }
            if let Some(literal) = plan.format(col, header, cell) {
                groups[idx].values.push(LookupValue::new(key, literal));
            }
        }
    }

    groups
}

/// Resolve every reference column of a sheet, except the columns in `skip`
pub async fn resolve_sheet_references(
    resolver: &mut ReferenceResolver<'_>,
    sheet: &Sheet,
    plan: &QuotingPlan,
    skip: &[usize],
) -> Result<(), ImportError> {
    for group in collect_lookups(sheet, plan, skip) {
        let resolved = resolver
            .resolve(&group.class, &group.attribute, &group.values)
            .await?;
        log::debug!(
            "Sheet '{}': {}/{} value(s) of {}.{} resolved",
            sheet.name(),
            resolved.len(),
            group.values.len(),
            group.class,
            group.attribute
        );
    }
    Ok(())
}

/// A reference cell without a resolved identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedCell {
    pub column: usize,
    pub value: String,
}

/// Build the attribute map of one row, starting at column `first_col`
///
/// Blank cells are omitted. Reference columns store the resolved identifier
/// under their role name.
pub fn row_fields(
    sheet: &Sheet,
    plan: &QuotingPlan,
    cache: &ReferenceCache,
    row: &Row,
    first_col: usize,
) -> Result<Node, UnresolvedCell> {
    let mut fields = Node::object();

    for (col, header) in sheet.headers().iter().enumerate().skip(first_col) {
        let Some(cell) = row.value(col) else {
            continue;
        };
        match header.reference() {
            Some(reference) => {
                let id = resolved_id(cache, reference, cell).ok_or_else(|| {
                    UnresolvedCell {
                        column: col,
                        value: cell.text.trim().to_string(),
                    }
                })?;
                fields.push(header.attribute_name(), Node::scalar(id_literal(id)));
            }
            None => {
                if let Some(literal) = plan.format(col, header, cell) {
                    fields.push(header.attribute_name(), Node::scalar(literal));
                }
            }
        }
    }

    Ok(fields)
}

fn resolved_id<'c>(
    cache: &'c ReferenceCache,
    reference: &Reference,
    cell: &RawCell,
) -> Option<&'c str> {
    cache.lookup(&reference.class_name, &reference.attribute_name, cell)
}

fn column_name(sheet: &Sheet, col: usize) -> String {
    sheet
        .headers()
        .get(col)
        .map(Header::raw)
        .unwrap_or_default()
        .to_string()
}

/// One `create` per row of an entity sheet
///
/// An unresolved reference is fatal. Rows without any value are skipped
/// (composition rows are not, see [`compile_composition`]).
pub fn compile_entity(
    sheet: &Sheet,
    plan: &QuotingPlan,
    cache: &ReferenceCache,
) -> Result<CompiledSheet, ImportError> {
    let mut compiled = CompiledSheet::default();

    for row in sheet.rows() {
        let fields = row_fields(sheet, plan, cache, row, 0).map_err(|unresolved| {
            ImportError::UnresolvedReference {
                sheet: sheet.name().to_string(),
                row: row.number,
                column: column_name(sheet, unresolved.column),
                value: unresolved.value,
            }
        })?;
        if fields.is_empty_object() {
            log::debug!("Sheet '{}', row {}: no values, skipped", sheet.name(), row.number);
            continue;
        }
        compiled
            .mutations
            .push(Mutation::create(sheet.entity_name(), fields));
    }

    Ok(compiled)
}

/// Resolve the parent identifier of a composition row, or explain why not
pub(crate) fn parent_id<'c>(
    sheet: &Sheet,
    cache: &'c ReferenceCache,
    row: &Row,
) -> Result<&'c str, RowIssue> {
    let issue = |reason, value: String| RowIssue {
        sheet: sheet.name().to_string(),
        row: row.number,
        column: column_name(sheet, 0),
        value,
        reason,
    };
    let Some(reference) = sheet.parent_reference() else {
        return Err(issue(RowIssueReason::MissingParent, String::new()));
    };
    let Some(cell) = row.value(0) else {
        return Err(issue(RowIssueReason::MissingParent, String::new()));
    };
    resolved_id(cache, reference, cell)
        .ok_or_else(|| issue(RowIssueReason::UnresolvedParent, cell.text.trim().to_string()))
}

/// Row fields of a composition row (all columns but the parent reference)
pub(crate) fn composition_fields(
    sheet: &Sheet,
    plan: &QuotingPlan,
    cache: &ReferenceCache,
    row: &Row,
) -> Result<Node, RowIssue> {
    row_fields(sheet, plan, cache, row, 1).map_err(|unresolved| RowIssue {
        sheet: sheet.name().to_string(),
        row: row.number,
        column: column_name(sheet, unresolved.column),
        value: unresolved.value,
        reason: RowIssueReason::UnresolvedReference,
    })
}

/// One `update` with a nested `create` per row of a composition sheet
///
/// Rows whose parent or another reference cannot be resolved are dropped and
/// reported as issues. Unlike entity rows, a row holding nothing but its
/// parent reference is still sent, as `Role: { create: { } }`: the nested
/// create alone brings a new part into existence.
pub fn compile_composition(
    sheet: &Sheet,
    plan: &QuotingPlan,
    cache: &ReferenceCache,
) -> Result<CompiledSheet, ImportError> {
    let Some(parent) = sheet.parent_reference() else {
        return Err(ImportError::InvalidSheet {
            sheet: sheet.name().to_string(),
            reason: "composition sheet has no parent reference".to_string(),
        });
    };
    let mut compiled = CompiledSheet::default();

    for row in sheet.rows() {
        let outcome = parent_id(sheet, cache, row).and_then(|id| {
            composition_fields(sheet, plan, cache, row).map(|fields| (id, fields))
        });
        match outcome {
            Ok((id, fields)) => compiled.mutations.push(Mutation::nested_update(
                parent.class_name.as_str(),
                id,
                sheet.role_name(),
                vec![fields],
            )),
            Err(issue) => compiled.issues.push(issue),
        }
    }

    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::events::MemorySink;
    use crate::graph::mutation::MutationKind;
    use crate::graph::testing::MockExecutor;
    use crate::graph::types::{RawCell, RawSheet};

    fn sheet(name: &str, headers: &[&str], rows: Vec<Vec<RawCell>>) -> Sheet {
        let raw = RawSheet::new(name, headers.iter().map(|h| h.to_string()).collect(), rows);
        Sheet::parse(&raw).unwrap()
    }

    async fn compile(
        executor: &MockExecutor,
        sheet: &Sheet,
    ) -> Result<CompiledSheet, ImportError> {
        let sink = MemorySink::new();
        let mut resolver = ReferenceResolver::new(executor, &sink, 100);
        let plan = QuotingPlan::scan(sheet);
        resolve_sheet_references(&mut resolver, sheet, &plan, &[]).await?;
        if sheet.is_composition() {
            compile_composition(sheet, &plan, resolver.cache())
        } else {
            compile_entity(sheet, &plan, resolver.cache())
        }
    }

    #[test]
    fn test_collect_lookups_groups_and_dedupes() {
        let sheet = sheet(
            "Employee",
            &["nome", "*Department.nome", "*Department[previous].nome", "*Sensor._id"],
            vec![
                vec![
                    RawCell::text("Alice"),
                    RawCell::text("Sales"),
                    RawCell::text("Ops"),
                    RawCell::number("12"),
                ],
                vec![
                    RawCell::text("Bob"),
                    RawCell::text(" Sales "),
                    RawCell::blank(),
                    RawCell::number("12.0"),
                ],
            ],
        );
        let plan = QuotingPlan::scan(&sheet);
        let groups = collect_lookups(&sheet, &plan, &[]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].class, "Department");
        assert_eq!(
            groups[0].values,
            vec![
                LookupValue::new("Sales", "\"Sales\""),
                LookupValue::new("Ops", "\"Ops\"")
            ]
        );
        assert_eq!(groups[1].class, "Sensor");
        assert_eq!(groups[1].values, vec![LookupValue::new("12", "12")]);

        assert_eq!(collect_lookups(&sheet, &plan, &[1, 2, 3]).len(), 0);
    }

    #[tokio::test]
    async fn test_entity_sheet_creates_one_mutation_per_row() {
        let executor = MockExecutor::new();
        let sheet = sheet("Department", &["nome"], vec![vec![RawCell::text("Sales")]]);
        let compiled = compile(&executor, &sheet).await.unwrap();

        assert_eq!(compiled.mutations.len(), 1);
        assert_eq!(compiled.mutations[0].kind, MutationKind::Create);
        assert_eq!(compiled.mutations[0].entity, "Department");
        assert_eq!(
            compiled.mutations[0].text,
            "mutation { Department___create(data: { nome: \"Sales\" }) { _id } }"
        );
        assert!(executor.requests().is_empty());
    }

    #[tokio::test]
    async fn test_entity_reference_uses_resolved_id() {
        let executor = MockExecutor::new()
            .with_records("Department", "nome", &[("Sales", "7"), ("Ops", "x-8")]);
        let sheet = sheet(
            "Employee",
            &["nome", "*Department.nome", "age"],
            vec![
                vec![RawCell::text("Alice"), RawCell::text("Sales"), RawCell::number("30")],
                vec![RawCell::text("Bob"), RawCell::text("Ops"), RawCell::blank()],
            ],
        );
        let compiled = compile(&executor, &sheet).await.unwrap();

        assert_eq!(
            compiled.mutations[0].text,
            "mutation { Employee___create(data: { nome: \"Alice\", department_: 7, age: 30 }) { _id } }"
        );
        assert_eq!(
            compiled.mutations[1].text,
            "mutation { Employee___create(data: { nome: \"Bob\", department_: \"x-8\" }) { _id } }"
        );
    }

    #[tokio::test]
    async fn test_entity_unresolved_reference_is_fatal() {
        let executor = MockExecutor::new();
        let sheet = sheet(
            "Employee",
            &["nome", "*Department.nome"],
            vec![vec![RawCell::text("Alice"), RawCell::text("Sales")]],
        );
        let err = compile(&executor, &sheet).await.unwrap_err();
        match err {
            ImportError::UnresolvedReference {
                sheet,
                row,
                column,
                value,
            } => {
                assert_eq!(sheet, "Employee");
                assert_eq!(row, 2);
                assert_eq!(column, "*Department.nome");
                assert_eq!(value, "Sales");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_csv_number_in_reference_column_resolves() {
        let executor = MockExecutor::new().with_records("Product", "codice", &[("42", "9")]);
        let sheet = sheet(
            "Order",
            &["*Product.codice", "qty"],
            vec![
                vec![RawCell::infer("42.0"), RawCell::infer("3")],
                vec![RawCell::infer("042"), RawCell::infer("1")],
            ],
        );
        let compiled = compile(&executor, &sheet).await.unwrap();

        assert_eq!(executor.lookup_requests().len(), 1);
        assert!(executor.lookup_requests()[0].contains("codice___in: [42]"));
        assert_eq!(
            compiled.mutations[0].text,
            "mutation { Order___create(data: { product_: 9, qty: 3 }) { _id } }"
        );
        assert_eq!(
            compiled.mutations[1].text,
            "mutation { Order___create(data: { product_: 9, qty: 1 }) { _id } }"
        );
    }

    #[tokio::test]
    async fn test_csv_number_as_composition_parent_resolves() {
        let executor = MockExecutor::new().with_records("Department", "code", &[("7", "70")]);
        let sheet = sheet(
            "#Employee",
            &["*Department.code", "nome"],
            vec![vec![RawCell::infer("7.00"), RawCell::infer("Alice")]],
        );
        let compiled = compile(&executor, &sheet).await.unwrap();

        assert!(compiled.issues.is_empty());
        assert_eq!(
            compiled.mutations[0].text,
            "mutation { Department___update(data: { _id: 70, Employee: { create: { nome: \"Alice\" } } }) { _id } }"
        );
    }

    #[test]
    fn test_entity_row_without_values_is_skipped() {
        let sheet = sheet(
            "Department",
            &["nome", "code"],
            vec![vec![RawCell::text("Sales")], vec![RawCell::blank(), RawCell::blank()]],
        );
        let plan = QuotingPlan::scan(&sheet);
        let compiled = compile_entity(&sheet, &plan, &ReferenceCache::new()).unwrap();
        assert_eq!(compiled.mutations.len(), 1);
    }

    #[tokio::test]
    async fn test_composition_row_nests_create_in_parent_update() {
        let executor = MockExecutor::new().with_records("Department", "nome", &[("Sales", "7")]);
        let sheet = sheet(
            "#Employee",
            &["*Department.nome", "nome"],
            vec![vec![RawCell::text("Sales"), RawCell::text("Alice")]],
        );
        let compiled = compile(&executor, &sheet).await.unwrap();

        assert_eq!(compiled.mutations.len(), 1);
        let mutation = &compiled.mutations[0];
        assert_eq!(mutation.kind, MutationKind::UpdateWithNestedCreate);
        assert_eq!(mutation.entity, "Department");
        assert_eq!(
            mutation.text,
            "mutation { Department___update(data: { _id: 7, Employee: { create: { nome: \"Alice\" } } }) { _id } }"
        );
    }

    #[tokio::test]
    async fn test_composition_bad_rows_are_skipped() {
        let executor = MockExecutor::new()
            .with_records("Department", "nome", &[("Sales", "7")])
            .with_records("Role", "nome", &[("Manager", "3")]);
        let sheet = sheet(
            "#Employee",
            &["*Department.nome", "nome", "*Role.nome"],
            vec![
                vec![RawCell::text("Sales"), RawCell::text("Alice"), RawCell::text("Manager")],
                vec![RawCell::text("Nowhere"), RawCell::text("Bob")],
                vec![RawCell::blank(), RawCell::text("Carol")],
                vec![RawCell::text("Sales"), RawCell::text("Dan"), RawCell::text("Intern")],
                vec![RawCell::text("Sales")],
            ],
        );
        let compiled = compile(&executor, &sheet).await.unwrap();

        assert_eq!(compiled.mutations.len(), 2);
        assert!(compiled.mutations[0].text.contains("Employee: { create: { nome: \"Alice\", role_: 3 } }"));
        assert!(compiled.mutations[1].text.contains("Employee: { create: { } }"));

        let reasons: Vec<_> = compiled.issues.iter().map(|i| (i.row, i.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (3, RowIssueReason::UnresolvedParent),
                (4, RowIssueReason::MissingParent),
                (5, RowIssueReason::UnresolvedReference),
            ]
        );
        assert_eq!(compiled.issues[2].column, "*Role.nome");
        assert_eq!(compiled.issues[2].value, "Intern");
    }
}
