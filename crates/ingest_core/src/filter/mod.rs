//! Filter chain contracts and the standard filters.
//!
//! # Responsibility
//! - Define the `Filter` trait every validation/transformation step implements.
//! - Carry collaborators and configuration to filters via `FilterContext`.
//!
//! # Invariants
//! - Every filter reads and writes the same `Submission` type.
//! - A filter either returns `Ok(())` or one aggregated `FilterFailure`.
//! - Filters may depend on side effects of filters placed ahead of them.

pub mod container;
pub mod crosswalk;
pub mod deposit_record;
mod failure;
pub mod fixity;
pub mod identifier_log;
pub mod path_check;
pub mod path_fix;
pub mod requirements;
pub mod virus_scan;

pub use failure::{FailureCategory, FailureKind, FilterFailure, FilterResult, Violation};

use crate::config::PipelineConfig;
use crate::external::{DescriptiveCrosswalk, ExternalPathIndex, VirusScanner};
use crate::model::provenance::LinkedAgent;
use crate::model::submission::Submission;
use crate::path::cache::CachedPathIndex;

/// Collaborators and settings available to every filter of one run.
pub struct FilterContext<'a> {
    pub config: &'a PipelineConfig,
    pub path_index: CachedPathIndex<'a>,
    pub crosswalk: &'a dyn DescriptiveCrosswalk,
    pub scanner: &'a dyn VirusScanner,
}

impl<'a> FilterContext<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        path_index: &'a dyn ExternalPathIndex,
        crosswalk: &'a dyn DescriptiveCrosswalk,
        scanner: &'a dyn VirusScanner,
    ) -> Self {
        Self {
            config,
            path_index: CachedPathIndex::new(path_index),
            crosswalk,
            scanner,
        }
    }

    /// Software agent recorded as executor of core-generated events.
    pub fn software_agent(&self) -> LinkedAgent {
        LinkedAgent::executor(self.config.agent_name.as_str())
    }
}

/// One step of the ingest filter chain.
pub trait Filter {
    /// Stable snake_case name used in logs and failure reports.
    fn name(&self) -> &'static str;
    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()>;
}
