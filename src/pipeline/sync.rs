// src/pipeline/sync.rs

//! Destination sync orchestrator.
//!
//! Phases run strictly in order: knowledge bases, categories (plus one retry
//! pass over categories whose parent did not exist yet), articles, and
//! optionally translations. Records are handled one at a time.

use futures::StreamExt;

use crate::destination::{DestinationApi, Reconciled, Reconciler};
use crate::error::{AppError, Result};
use crate::models::{Config, DestinationConfig, EntityKind, Record, SyncConfig, fields};
use crate::source::Source;
use crate::utils::log;

/// Run-level switches.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub retry_categories: bool,
    pub isolate_validation_errors: bool,
    pub translations: bool,
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            dry_run: false,
            retry_categories: config.retry_categories,
            isolate_validation_errors: config.isolate_validation_errors,
            translations: config.translations,
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

/// Counters for one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub kind: EntityKind,
    /// Records read from the source
    pub read: usize,
    pub imported: usize,
    pub skipped: usize,
    /// Records rejected by destination validation
    pub failed: usize,
    /// Categories still missing their parent after the retry pass
    pub deferred: usize,
}

impl PhaseReport {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            read: 0,
            imported: 0,
            skipped: 0,
            failed: 0,
            deferred: 0,
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub dry_run: bool,
    pub phases: Vec<PhaseReport>,
}

impl SyncReport {
    pub fn phase(&self, kind: EntityKind) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.kind == kind)
    }

    pub fn imported(&self) -> usize {
        self.phases.iter().map(|p| p.imported).sum()
    }

    pub fn failed(&self) -> usize {
        self.phases.iter().map(|p| p.failed).sum()
    }

    /// Process exit code for a finished run: rejected records exit like a
    /// validation error.
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 { 4 } else { 0 }
    }

    fn summary_items(&self) -> Vec<(&'static str, String)> {
        self.phases
            .iter()
            .map(|p| {
                let line = if self.dry_run {
                    format!("{} read, {} flagged skip", p.read, p.skipped)
                } else {
                    format!(
                        "{} imported, {} skipped, {} failed, {} unresolved",
                        p.imported, p.skipped, p.failed, p.deferred
                    )
                };
                (p.kind.label(), line)
            })
            .collect()
    }
}

/// Wires a source to the reconciler and drives the phases.
pub struct Engine {
    source: Source,
    reconciler: Reconciler,
    options: SyncOptions,
}

impl Engine {
    pub fn new(source: Source, reconciler: Reconciler, options: SyncOptions) -> Self {
        Self {
            source,
            reconciler,
            options,
        }
    }

    /// Build the source, the destination chain, and the reconciler once.
    pub fn from_config(config: &Config) -> Result<Self> {
        let DestinationConfig::Vanilla(vanilla) = &config.destination;
        let api = DestinationApi::from_config(vanilla, &config.http)?;
        let source = Source::from_config(&config.source, &config.http)?;
        Ok(Self::new(
            source,
            Reconciler::new(api),
            SyncOptions::from(&config.sync),
        ))
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.options.dry_run = dry_run;
        self
    }

    fn phases(&self) -> Vec<EntityKind> {
        let mut phases = vec![
            EntityKind::KnowledgeBase,
            EntityKind::Category,
            EntityKind::Article,
        ];
        if self.options.translations {
            phases.push(EntityKind::Translation);
        }
        phases
    }

    /// Run every phase in order.
    pub async fn run(&mut self) -> Result<SyncReport> {
        let mode = if self.options.dry_run { " (dry run)" } else { "" };
        log::header(&format!("Sync from {} source{}", self.source.name(), mode));

        let phases = self.phases();
        let mut report = SyncReport {
            dry_run: self.options.dry_run,
            phases: Vec::with_capacity(phases.len()),
        };

        for (index, kind) in phases.iter().enumerate() {
            log::step(index + 1, phases.len(), &format!("Importing {}s", kind.label()));
            let phase = self.run_phase(*kind).await?;
            log::sub_item(&format!(
                "{} read, {} imported, {} skipped",
                phase.read, phase.imported, phase.skipped
            ));
            report.phases.push(phase);
        }

        log::summary("Sync", &report.summary_items());
        if report.failed() == 0 {
            log::success(&format!("{} records imported", report.imported()));
        } else {
            ::log::warn!(
                "{} records imported, {} rejected by the destination",
                report.imported(),
                report.failed()
            );
        }
        Ok(report)
    }

    async fn run_phase(&mut self, kind: EntityKind) -> Result<PhaseReport> {
        let mut report = PhaseReport::new(kind);
        let mut deferred = Vec::new();

        let mut records = self.source.records(kind);
        while let Some(record) = records.next().await {
            let record = record?;
            report.read += 1;

            if self.options.dry_run {
                if record.flag(fields::SKIP) {
                    report.skipped += 1;
                }
                continue;
            }

            if let Some(record) =
                reconcile_one(&mut self.reconciler, &self.options, kind, record, &mut report)
                    .await?
            {
                deferred.push(record);
            }
        }
        drop(records);

        if deferred.is_empty() {
            return Ok(report);
        }

        if !self.options.retry_categories {
            ::log::warn!("{} {}s left without a parent", deferred.len(), kind.label());
            report.deferred = deferred.len();
            return Ok(report);
        }

        ::log::info!("Retrying {} deferred {}s", deferred.len(), kind.label());
        for record in deferred {
            if let Some(record) =
                reconcile_one(&mut self.reconciler, &self.options, kind, record, &mut report)
                    .await?
            {
                ::log::warn!(
                    "Parent of {} {} still missing after retry",
                    kind.label(),
                    describe(&record)
                );
                report.deferred += 1;
            }
        }
        Ok(report)
    }
}

/// Reconcile one record into the report. Returns the record when it has to
/// wait for its parent.
async fn reconcile_one(
    reconciler: &mut Reconciler,
    options: &SyncOptions,
    kind: EntityKind,
    record: Record,
    report: &mut PhaseReport,
) -> Result<Option<Record>> {
    let label = describe(&record);

    match reconciler.reconcile(kind, record).await {
        Ok(Reconciled::Imported(result)) => {
            report.imported += 1;
            let id = result
                .destination_id
                .map(|id| format!(" #{id}"))
                .unwrap_or_default();
            match kind {
                EntityKind::KnowledgeBase | EntityKind::Category => ::log::info!(
                    "{} {} '{}' {}{}",
                    kind.label(),
                    label,
                    result.name,
                    result.action,
                    id
                ),
                _ => ::log::debug!("{} {} {}{}", kind.label(), label, result.action, id),
            }
            Ok(None)
        }
        Ok(Reconciled::Skipped(reason)) => {
            report.skipped += 1;
            ::log::warn!("Skipped {} {}: {}", kind.label(), label, reason);
            Ok(None)
        }
        Ok(Reconciled::Deferred { record, reason }) => {
            ::log::debug!("Deferred {} {}: {}", kind.label(), label, reason);
            Ok(Some(record))
        }
        Err(e) if e.is_validation() && isolates(options, kind) => {
            report.failed += 1;
            log_rejection(kind, &label, &e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn isolates(options: &SyncOptions, kind: EntityKind) -> bool {
    options.isolate_validation_errors || kind == EntityKind::Translation
}

fn log_rejection(kind: EntityKind, label: &str, error: &AppError) {
    ::log::error!("Rejected {} {}: {}", kind.label(), label, error);
    if let AppError::Validation { fields, .. } = error {
        for field in fields {
            ::log::error!("    {}", field);
        }
    }
}

fn describe(record: &Record) -> String {
    record.foreign_id().unwrap_or_else(|| record.name())
}
