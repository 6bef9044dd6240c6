//! Import orchestration
//!
//! A run goes through these steps:
//! 1. apply the `_mapping` sheet, if any
//! 2. parse every sheet's headers (a malformed header stops the run before
//!    anything is sent)
//! 3. walk the sheets in order: resolve references, compile, execute
//!
//! Delete runs walk the ordinary sheets in reverse order and emit one bulk
//! delete per entity type.

use std::sync::Arc;

use serde::Serialize;

use crate::api::Executor;
use crate::graph::compiler::{
    CompiledSheet, compile_composition, compile_entity, resolve_sheet_references,
};
use crate::graph::error::{ImportError, RowIssue};
use crate::graph::events::EventSink;
use crate::graph::mutation::Mutation;
use crate::graph::nested::NestedAssembler;
use crate::graph::resolver::{DEFAULT_BATCH_SIZE, ReferenceResolver};
use crate::graph::types::{QuotingPlan, RawSheet, Sheet, SheetKind, apply_sheet_mapping};

/// What a run does with the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Create,
    Delete,
}

/// Options for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Maximum values per lookup request
    pub batch_size: usize,
    /// Fold multi-level compositions into one mutation per root parent
    pub nested_compositions: bool,
    /// Compile and report mutations without sending them
    pub dry_run: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            nested_compositions: false,
            dry_run: false,
        }
    }
}

/// Outcome for one sheet
#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    pub kind: String,
    pub mutations: Vec<Mutation>,
    pub issues: Vec<RowIssue>,
    /// Mutations actually sent
    pub executed: usize,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub sheets: Vec<SheetReport>,
    /// Lookup requests sent
    pub lookups: usize,
    pub dry_run: bool,
}

impl RunReport {
    pub fn mutations(&self) -> impl Iterator<Item = &Mutation> {
        self.sheets.iter().flat_map(|s| s.mutations.iter())
    }

    pub fn issues(&self) -> impl Iterator<Item = &RowIssue> {
        self.sheets.iter().flat_map(|s| s.issues.iter())
    }

    pub fn total_mutations(&self) -> usize {
        self.sheets.iter().map(|s| s.mutations.len()).sum()
    }

    pub fn total_executed(&self) -> usize {
        self.sheets.iter().map(|s| s.executed).sum()
    }

    pub fn total_issues(&self) -> usize {
        self.sheets.iter().map(|s| s.issues.len()).sum()
    }
}

/// Drives resolution, compilation and execution over a workbook
pub struct Pipeline {
    executor: Arc<dyn Executor>,
    events: Arc<dyn EventSink>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        executor: Arc<dyn Executor>,
        events: Arc<dyn EventSink>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            executor,
            events,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the workbook in the given mode
    ///
    /// Any [`ImportError`] aborts the remaining sheets. Mutations already sent
    /// are not rolled back. Use [`run_into`](Self::run_into) to keep the
    /// partial report of a failed run.
    pub async fn run(&self, sheets: Vec<RawSheet>, mode: RunMode) -> Result<RunReport, ImportError> {
        let mut report = RunReport::default();
        self.run_into(sheets, mode, &mut report).await?;
        Ok(report)
    }

    /// Run the workbook, filling `report` as sheets are processed
    ///
    /// On error `report` holds every sheet that reached execution, the failing
    /// one included, with `executed` counting the mutations that were sent.
    pub async fn run_into(
        &self,
        sheets: Vec<RawSheet>,
        mode: RunMode,
        report: &mut RunReport,
    ) -> Result<(), ImportError> {
        report.dry_run = self.options.dry_run;
        let sheets = apply_sheet_mapping(sheets, self.events.as_ref())?;
        match mode {
            RunMode::Create => self.run_create(sheets, report).await,
            RunMode::Delete => self.run_delete(sheets, report).await,
        }
    }

    /// Headers of all sheets are parsed before the first request is sent.
    async fn run_create(&self, raw: Vec<RawSheet>, report: &mut RunReport) -> Result<(), ImportError> {
        let sheets = raw
            .iter()
            .map(Sheet::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let plans: Vec<QuotingPlan> = sheets.iter().map(QuotingPlan::scan).collect();
        let nested = if self.options.nested_compositions {
            Some(NestedAssembler::new(&sheets, &plans)?)
        } else {
            None
        };

        let mut resolver = ReferenceResolver::new(
            self.executor.as_ref(),
            self.events.as_ref(),
            self.options.batch_size,
        );
        let outcome = self
            .create_sheets(&sheets, &plans, nested.as_ref(), &mut resolver, report)
            .await;
        report.lookups = resolver.requests();
        outcome?;

        self.events.info(&format!(
            "Import finished: {} mutation(s), {} skipped row(s), {} lookup request(s)",
            report.total_mutations(),
            report.total_issues(),
            report.lookups
        ));
        Ok(())
    }

    async fn create_sheets(
        &self,
        sheets: &[Sheet],
        plans: &[QuotingPlan],
        nested: Option<&NestedAssembler<'_>>,
        resolver: &mut ReferenceResolver<'_>,
        report: &mut RunReport,
    ) -> Result<(), ImportError> {
        for (idx, sheet) in sheets.iter().enumerate() {
            self.events.info(&format!(
                "Processing sheet '{}' ({}, {} row(s))",
                sheet.name(),
                sheet.kind(),
                sheet.rows().len()
            ));
            let plan = &plans[idx];

            let compiled = match (sheet.kind(), nested) {
                (SheetKind::Entity, _) => {
                    resolve_sheet_references(resolver, sheet, plan, &[]).await?;
                    compile_entity(sheet, plan, resolver.cache())?
                }
                (SheetKind::Composition, Some(assembler)) if assembler.is_child(idx) => {
                    self.events.info(&format!(
                        "Sheet '{}' is nested into its parent composition",
                        sheet.name()
                    ));
                    CompiledSheet::default()
                }
                (SheetKind::Composition, Some(assembler)) => {
                    for member in assembler.subtree(idx) {
                        let skip: &[usize] = if assembler.is_child(member) { &[0] } else { &[] };
                        resolve_sheet_references(resolver, &sheets[member], &plans[member], skip)
                            .await?;
                    }
                    assembler.assemble(idx, resolver.cache())?
                }
                (SheetKind::Composition, None) => {
                    resolve_sheet_references(resolver, sheet, plan, &[]).await?;
                    compile_composition(sheet, plan, resolver.cache())?
                }
            };

            for issue in &compiled.issues {
                self.events.error(&issue.to_string());
            }
            let mut entry = SheetReport {
                sheet: sheet.name().to_string(),
                kind: sheet.kind().to_string(),
                mutations: compiled.mutations,
                issues: compiled.issues,
                executed: 0,
            };
            let outcome = self
                .execute_all(sheet.name(), &entry.mutations, &mut entry.executed)
                .await;
            report.sheets.push(entry);
            outcome?;
        }
        Ok(())
    }

    async fn run_delete(&self, raw: Vec<RawSheet>, report: &mut RunReport) -> Result<(), ImportError> {
        for sheet in raw.iter().rev() {
            if sheet.is_composition() {
                log::debug!("Skipping composition sheet '{}' in delete run", sheet.name);
                continue;
            }
            let entity = sheet.entity_name();
            self.events
                .info(&format!("Deleting all '{}' records", entity));
            let mut entry = SheetReport {
                sheet: entity.to_string(),
                kind: SheetKind::Entity.to_string(),
                mutations: vec![Mutation::delete_bulk(entity)],
                issues: Vec::new(),
                executed: 0,
            };
            let outcome = self
                .execute_all(entity, &entry.mutations, &mut entry.executed)
                .await;
            report.sheets.push(entry);
            outcome?;
        }
        Ok(())
    }

    /// Send mutations in order, counting each one sent into `executed`
    async fn execute_all(
        &self,
        sheet: &str,
        mutations: &[Mutation],
        executed: &mut usize,
    ) -> Result<(), ImportError> {
        if self.options.dry_run {
            log::debug!("Dry run: {} mutation(s) of '{}' not sent", mutations.len(), sheet);
            return Ok(());
        }
        for (n, mutation) in mutations.iter().enumerate() {
            log::debug!("Sheet '{}' mutation {}/{}", sheet, n + 1, mutations.len());
            self.executor
                .execute(&mutation.text)
                .await
                .map_err(|source| ImportError::Execution {
                    sheet: sheet.to_string(),
                    source,
                })?;
            *executed += 1;
        }
        Ok(())
    }
}
