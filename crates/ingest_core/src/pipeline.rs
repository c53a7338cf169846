//! Pipeline driver.
//!
//! # Responsibility
//! - Run the filter chain over one submission strictly in order.
//! - On failure, release scratch resources and build one aggregated report
//!   carrying the provenance backlog.
//! - On success, flush object records and hand the package to the commit
//!   sink.
//!
//! # Invariants
//! - The first failing filter ends the run; later filters never execute.
//! - Provenance reaches durable storage only through one `CommitSink::commit`
//!   call, after every filter succeeded.
//! - State moves `Pending -> Running(i) -> Succeeded | Failed` per run.
//! - Path lookups cached by an earlier run are discarded at `Pending`.

use crate::config::{ConflictMode, PipelineConfig};
use crate::external::{CommitPackage, CommitSink, CommittedObject};
use crate::filter::container::ContainerCheck;
use crate::filter::crosswalk::DescriptiveCrosswalkFilter;
use crate::filter::deposit_record::SetOriginalDepositRecord;
use crate::filter::fixity::FixityCheck;
use crate::filter::identifier_log::LogIdentifierAssignment;
use crate::filter::path_check::{path_error_violation, PathConflictCheck};
use crate::filter::path_fix::PathConflictFix;
use crate::filter::requirements::RequirementsCheck;
use crate::filter::virus_scan::VirusScan;
use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, Violation};
use crate::model::object::ObjectRecord;
use crate::model::provenance::ProvenanceEvent;
use crate::model::submission::{CleanupSummary, Submission};
use crate::path::resolver::PathResolver;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const COMMIT_STAGE_NAME: &str = "commit";

/// Where a failed run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum FailedStage {
    Filter { index: usize, name: &'static str },
    Commit,
}

impl Display for FailedStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter { index, name } => write!(f, "filter #{index} `{name}`"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Running { filter_index: usize },
    Succeeded,
    Failed { stage: FailedStage },
}

/// Aggregated report of a failed run.
///
/// The provenance backlog is diagnostic context only; it was not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineFailure {
    pub submission_id: Uuid,
    pub stage: FailedStage,
    pub failure: FilterFailure,
    pub provenance_backlog: Vec<ProvenanceEvent>,
    pub cleanup: CleanupSummary,
}

impl PipelineFailure {
    pub fn kinds(&self) -> Vec<FailureKind> {
        self.failure.kinds().into_iter().collect()
    }

    pub fn is_retryable(&self) -> bool {
        self.failure.is_retryable()
    }

    /// Renders the report as pretty JSON for operators.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Display for PipelineFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "submission {} failed at {} with {} violation(s):",
            self.submission_id,
            self.stage,
            self.failure.violations.len()
        )?;
        for violation in &self.failure.violations {
            let subject = violation
                .subject
                .as_deref()
                .map(|subject| format!(" ({subject})"))
                .unwrap_or_default();
            if violation.object_ids.is_empty() {
                writeln!(
                    f,
                    "  - {}{subject}: {}",
                    violation.kind.as_str(),
                    violation.message
                )?;
                continue;
            }
            for id in &violation.object_ids {
                writeln!(
                    f,
                    "  - object {id} {}{subject}: {}",
                    violation.kind.as_str(),
                    violation.message
                )?;
            }
        }
        write!(
            f,
            "{} provenance event(s) were discarded",
            self.provenance_backlog.len()
        )
    }
}

impl Error for PipelineFailure {}

/// Result of a committed run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Submission after every filter ran; scratch objects were promoted.
    pub submission: Submission,
    /// Exactly what was handed to the commit sink.
    pub package: CommitPackage,
}

/// Ordered filter chain plus the state of its latest run.
pub struct Pipeline {
    filters: Vec<Box<dyn Filter>>,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self {
            filters,
            state: PipelineState::Pending,
        }
    }

    /// Default chain for `config`.
    ///
    /// Requirements, container, path conflict (fix or check), crosswalk,
    /// fixity (when enabled), virus scan, deposit record, identifier log.
    pub fn standard(config: &PipelineConfig) -> Self {
        let mut filters: Vec<Box<dyn Filter>> =
            vec![Box::new(RequirementsCheck), Box::new(ContainerCheck)];
        match config.conflict_mode {
            ConflictMode::Strict => filters.push(Box::new(PathConflictCheck)),
            ConflictMode::Lenient => filters.push(Box::new(PathConflictFix)),
        }
        filters.push(Box::new(DescriptiveCrosswalkFilter));
        if config.verify_fixity {
            filters.push(Box::new(FixityCheck));
        }
        filters.push(Box::new(VirusScan));
        filters.push(Box::new(SetOriginalDepositRecord));
        filters.push(Box::new(LogIdentifierAssignment));
        Self::new(filters)
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|filter| filter.name()).collect()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs every filter, then commits.
    ///
    /// # Errors
    /// - The first filter failure, with scratch resources released.
    /// - A commit sink error, reported as a `Collaborator` violation.
    pub fn run(
        &mut self,
        mut submission: Submission,
        ctx: &mut FilterContext<'_>,
        sink: &dyn CommitSink,
    ) -> Result<PipelineOutcome, PipelineFailure> {
        self.state = PipelineState::Pending;
        ctx.path_index.clear();
        info!(
            "event=pipeline_run module=pipeline status=start submission_id={} filters={} objects={}",
            submission.id(),
            self.filters.len(),
            submission.graph.len()
        );

        for (index, filter) in self.filters.iter().enumerate() {
            self.state = PipelineState::Running {
                filter_index: index,
            };
            debug!(
                "event=filter_run module=pipeline status=start submission_id={} index={} filter={}",
                submission.id(),
                index,
                filter.name()
            );
            if let Err(failure) = filter.apply(&mut submission, ctx) {
                let stage = FailedStage::Filter {
                    index,
                    name: filter.name(),
                };
                return Err(fail_run(&mut self.state, submission, stage, failure));
            }
        }

        let package = match build_package(&mut submission) {
            Ok(package) => package,
            Err(failure) => {
                return Err(fail_run(
                    &mut self.state,
                    submission,
                    FailedStage::Commit,
                    failure,
                ));
            }
        };
        if let Err(err) = sink.commit(&package) {
            error!(
                "event=pipeline_commit module=pipeline status=error submission_id={} error={}",
                submission.id(),
                err
            );
            let failure = FilterFailure::single(
                COMMIT_STAGE_NAME,
                Violation::subject(
                    FailureKind::Collaborator,
                    err.collaborator,
                    Vec::new(),
                    err.to_string(),
                ),
            );
            return Err(fail_run(
                &mut self.state,
                submission,
                FailedStage::Commit,
                failure,
            ));
        }

        let promoted = submission.promote_scratch_objects();
        let cleanup = submission.release_scratch();
        let (cache_hits, cache_misses) = ctx.path_index.stats();
        self.state = PipelineState::Succeeded;
        info!(
            "event=pipeline_commit module=pipeline status=ok submission_id={} objects={} events={} promoted={} scratch_files_removed={} path_cache_hits={} path_cache_misses={}",
            submission.id(),
            package.objects.len(),
            package.events.len(),
            promoted,
            cleanup.files_removed,
            cache_hits,
            cache_misses
        );
        Ok(PipelineOutcome {
            submission,
            package,
        })
    }
}

/// Marks the run failed, releases scratch resources and builds the report.
fn fail_run(
    state: &mut PipelineState,
    mut submission: Submission,
    stage: FailedStage,
    failure: FilterFailure,
) -> PipelineFailure {
    *state = PipelineState::Failed { stage };
    let provenance_backlog = submission.provenance.backlog();
    let cleanup = submission.release_scratch();
    warn!(
        "event=pipeline_cleanup module=pipeline status=ok submission_id={} files_removed={} objects_removed={} cleanup_errors={}",
        submission.id(),
        cleanup.files_removed,
        cleanup.objects_removed,
        cleanup.errors.len()
    );
    error!(
        "event=pipeline_run module=pipeline status=error submission_id={} stage={} violations={} retryable={}",
        submission.id(),
        stage,
        failure.violations.len(),
        failure.is_retryable()
    );
    PipelineFailure {
        submission_id: submission.id(),
        stage,
        failure,
        provenance_backlog,
        cleanup,
    }
}

/// Flushes dirty records and pairs every object with its canonical path.
///
/// Every non-deposit object must have a composable path; the ones that do
/// not are reported together and nothing is handed to the sink.
fn build_package(submission: &mut Submission) -> Result<CommitPackage, FilterFailure> {
    let mut flushed: HashMap<_, ObjectRecord> = submission
        .graph
        .flush()
        .into_iter()
        .map(|record| (record.id, record))
        .collect();

    let resolver = PathResolver::new(&submission.graph, &submission.placements);
    let mut objects = Vec::with_capacity(submission.graph.len());
    let mut violations = Vec::new();
    for object in submission.graph.objects() {
        let id = object.id();
        let record = match flushed.remove(&id) {
            Some(record) => record,
            None => match submission.graph.snapshot(id) {
                Ok(record) => record,
                Err(_) => continue,
            },
        };
        let canonical_path = if object.is_deposit_record() {
            None
        } else {
            match resolver.canonical_path(id) {
                Ok(path) => Some(path),
                Err(err) => {
                    violations.push(path_error_violation(id, &err));
                    continue;
                }
            }
        };
        objects.push(CommittedObject {
            record,
            canonical_path,
        });
    }
    FilterFailure::from_violations(COMMIT_STAGE_NAME, violations)?;

    Ok(CommitPackage {
        submission_id: submission.id(),
        objects,
        events: submission.provenance.backlog(),
    })
}
