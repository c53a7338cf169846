//! Structured filter failures.
//!
//! # Invariants
//! - A `FilterFailure` always carries at least one violation.
//! - Structural and conflict filters collect every violation of one pass
//!   before failing; safety filters fail on the first.

use crate::logging::sanitize_message;
use crate::model::object::ObjectId;
use log::warn;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_LOGGED_MESSAGE_CHARS: usize = 200;

/// Machine-readable failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingType,
    MissingOwner,
    MissingSlug,
    InvalidSlug,
    InvalidContainment,
    UnknownContainer,
    InvalidContainerType,
    DuplicatePath,
    PathCollision,
    RenameExhausted,
    FixityMismatch,
    FileUnreadable,
    VirusFound,
    ScanError,
    Collaborator,
}

/// Failure family used by the propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Structural,
    Conflict,
    Safety,
    Collaborator,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingType => "missing_type",
            Self::MissingOwner => "missing_owner",
            Self::MissingSlug => "missing_slug",
            Self::InvalidSlug => "invalid_slug",
            Self::InvalidContainment => "invalid_containment",
            Self::UnknownContainer => "unknown_container",
            Self::InvalidContainerType => "invalid_container_type",
            Self::DuplicatePath => "duplicate_path",
            Self::PathCollision => "path_collision",
            Self::RenameExhausted => "rename_exhausted",
            Self::FixityMismatch => "fixity_mismatch",
            Self::FileUnreadable => "file_unreadable",
            Self::VirusFound => "virus_found",
            Self::ScanError => "scan_error",
            Self::Collaborator => "collaborator",
        }
    }

    pub fn category(self) -> FailureCategory {
        match self {
            Self::MissingType
            | Self::MissingOwner
            | Self::MissingSlug
            | Self::InvalidSlug
            | Self::InvalidContainment
            | Self::UnknownContainer
            | Self::InvalidContainerType => FailureCategory::Structural,
            Self::DuplicatePath | Self::PathCollision | Self::RenameExhausted => {
                FailureCategory::Conflict
            }
            Self::FixityMismatch | Self::FileUnreadable | Self::VirusFound | Self::ScanError => {
                FailureCategory::Safety
            }
            Self::Collaborator => FailureCategory::Collaborator,
        }
    }

    /// Whether re-running the same input may succeed without operator action.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ScanError | Self::Collaborator)
    }
}

/// One offending object (or path) and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: FailureKind,
    pub object_ids: Vec<ObjectId>,
    /// Path or container the violation is about, when not object-specific.
    pub subject: Option<String>,
    pub message: String,
}

impl Violation {
    /// Violation about one object.
    pub fn object(kind: FailureKind, object_id: ObjectId, message: impl Into<String>) -> Self {
        Self {
            kind,
            object_ids: vec![object_id],
            subject: None,
            message: message.into(),
        }
    }

    /// Violation about a path shared by zero or more objects.
    pub fn subject(
        kind: FailureKind,
        subject: impl Into<String>,
        object_ids: Vec<ObjectId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            object_ids,
            subject: Some(subject.into()),
            message: message.into(),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.kind.as_str())?;
        if !self.object_ids.is_empty() {
            let ids: Vec<String> = self.object_ids.iter().map(ToString::to_string).collect();
            write!(f, " objects={}", ids.join(","))?;
        }
        if let Some(subject) = &self.subject {
            write!(f, " subject={subject}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Aggregated failure raised by one filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterFailure {
    pub filter: &'static str,
    pub violations: Vec<Violation>,
}

pub type FilterResult<T> = Result<T, FilterFailure>;

impl FilterFailure {
    pub fn single(filter: &'static str, violation: Violation) -> Self {
        Self {
            filter,
            violations: vec![violation],
        }
    }

    /// `Ok(())` when nothing was collected, otherwise one aggregated failure.
    ///
    /// Logs every violation at `warn` level.
    pub fn from_violations(filter: &'static str, violations: Vec<Violation>) -> FilterResult<()> {
        if violations.is_empty() {
            return Ok(());
        }
        for violation in &violations {
            warn!(
                "event=filter_violation module=filter status=error filter={} kind={} objects={} message={}",
                filter,
                violation.kind.as_str(),
                violation.object_ids.len(),
                sanitize_message(&violation.message, MAX_LOGGED_MESSAGE_CHARS)
            );
        }
        Err(Self { filter, violations })
    }

    pub fn kinds(&self) -> BTreeSet<FailureKind> {
        self.violations.iter().map(|violation| violation.kind).collect()
    }

    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.violations.iter().any(|violation| violation.kind == kind)
    }

    /// Violations of one kind.
    pub fn of_kind(&self, kind: FailureKind) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|violation| violation.kind == kind)
            .collect()
    }

    /// Distinct offending object ids in first-seen order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        for id in self.violations.iter().flat_map(|violation| &violation.object_ids) {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    /// Retryable only when every violation is.
    pub fn is_retryable(&self) -> bool {
        self.violations
            .iter()
            .all(|violation| violation.kind.is_retryable())
    }
}

impl Display for FilterFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed with {} violation(s)",
            self.filter,
            self.violations.len()
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {violation}")?;
        }
        Ok(())
    }
}

impl Error for FilterFailure {}

#[cfg(test)]
mod tests {
    use super::{FailureCategory, FailureKind, FilterFailure, Violation};
    use uuid::Uuid;

    #[test]
    fn empty_violations_pass() {
        assert!(FilterFailure::from_violations("requirements_check", vec![]).is_ok());
    }

    #[test]
    fn display_lists_every_violation() {
        let id = Uuid::new_v4();
        let failure = FilterFailure::from_violations(
            "requirements_check",
            vec![
                Violation::object(FailureKind::MissingOwner, id, "no owner"),
                Violation::object(FailureKind::MissingType, id, "no type"),
            ],
        )
        .unwrap_err();
        let rendered = failure.to_string();
        assert!(rendered.contains("2 violation(s)"));
        assert!(rendered.contains("[missing_owner]"));
        assert!(rendered.contains("[missing_type]"));
        assert_eq!(failure.object_ids(), vec![id]);
    }

    #[test]
    fn only_scan_and_collaborator_failures_are_retryable() {
        assert!(FailureKind::ScanError.is_retryable());
        assert!(!FailureKind::VirusFound.is_retryable());
        assert_eq!(FailureKind::VirusFound.category(), FailureCategory::Safety);
        assert_eq!(FailureKind::PathCollision.category(), FailureCategory::Conflict);
    }
}
