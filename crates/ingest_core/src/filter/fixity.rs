//! Fixity check filter.
//!
//! # Responsibility
//! - Compute SHA-256 digests of local file payloads.
//! - Compare against declared digests, or stamp the digest when none is
//!   declared.
//!
//! # Invariants
//! - Every mismatch and unreadable file is reported in one failure.
//! - Re-running against unchanged files is a no-op apart from new
//!   `FixityCheck` events.

use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
use crate::model::object::{predicate, ObjectId, PropertyValue};
use crate::model::provenance::{EventType, ProvenanceEvent};
use crate::model::submission::Submission;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const FILTER_NAME: &str = "fixity_check";
const READ_CHUNK_BYTES: usize = 1024 * 1024;

pub struct FixityCheck;

struct Verified {
    object_id: ObjectId,
    digest: String,
    declared: bool,
}

impl Filter for FixityCheck {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let mut violations = Vec::new();
        let mut verified = Vec::new();

        for object in submission.graph.objects() {
            let Some(location) = object.file_location() else {
                continue;
            };
            let id = object.id();
            let digest = match sha256_file(&location) {
                Ok(digest) => digest,
                Err(err) => {
                    violations.push(Violation::object(
                        FailureKind::FileUnreadable,
                        id,
                        format!("cannot read file payload `{}`: {err}", location.display()),
                    ));
                    continue;
                }
            };

            match object.first_literal(predicate::CHECKSUM_SHA256) {
                Some(declared) if !declared.eq_ignore_ascii_case(&digest) => {
                    violations.push(Violation::object(
                        FailureKind::FixityMismatch,
                        id,
                        format!("declared sha256 {declared} does not match computed {digest}"),
                    ));
                }
                Some(_) => verified.push(Verified {
                    object_id: id,
                    digest,
                    declared: true,
                }),
                None => verified.push(Verified {
                    object_id: id,
                    digest,
                    declared: false,
                }),
            }
        }

        FilterFailure::from_violations(FILTER_NAME, violations)?;

        let agent = ctx.software_agent();
        let checked = verified.len();
        for entry in verified {
            let detail = if entry.declared {
                format!("Verified declared sha256 checksum {}", entry.digest)
            } else {
                if let Some(object) = submission.graph.object_mut(entry.object_id) {
                    object.set_property(
                        predicate::CHECKSUM_SHA256,
                        PropertyValue::literal(entry.digest.as_str()),
                    );
                }
                format!("Computed sha256 checksum {}", entry.digest)
            };
            debug!(
                "event=fixity_verified module=filter status=ok object_id={} declared={}",
                entry.object_id, entry.declared
            );
            submission.provenance.append(
                ProvenanceEvent::new(entry.object_id, EventType::FixityCheck, detail)
                    .with_agent(agent.clone()),
            );
        }

        info!(
            "event=filter_run module=filter status=ok filter={} checked={}",
            FILTER_NAME, checked
        );
        Ok(())
    }
}

/// Lowercase hex SHA-256 of one file, read in chunks.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Local path of a file payload when it can be opened.
pub(crate) fn resolvable_file(location: Option<PathBuf>) -> Option<PathBuf> {
    location.filter(|path| path.is_file())
}
