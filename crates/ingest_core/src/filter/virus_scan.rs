//! Virus scan filter.
//!
//! # Responsibility
//! - Scan every local file payload with the external scanner.
//! - Record a `VirusCheck` event for each clean file.
//!
//! # Invariants
//! - The first infection or scanner error stops the filter; no further files
//!   are handed to the scanner and the failing object gets no event.
//! - With `scan_workers > 1` files are scanned on scoped worker threads that
//!   share one abort flag; events are appended under a lock.

use crate::external::{ScanVerdict, VirusScanner};
use crate::filter::fixity::resolvable_file;
use crate::filter::{FailureKind, Filter, FilterContext, FilterFailure, FilterResult, Violation};
use crate::model::object::ObjectId;
use crate::model::provenance::{EventType, LinkedAgent, ProvenanceEvent, ProvenanceLog};
use crate::model::submission::Submission;
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

const FILTER_NAME: &str = "virus_scan";

pub struct VirusScan;

struct ScanTarget {
    object_id: ObjectId,
    path: PathBuf,
}

impl Filter for VirusScan {
    fn name(&self) -> &'static str {
        FILTER_NAME
    }

    fn apply(&self, submission: &mut Submission, ctx: &mut FilterContext<'_>) -> FilterResult<()> {
        let targets: Vec<ScanTarget> = submission
            .graph
            .objects()
            .filter_map(|object| {
                resolvable_file(object.file_location()).map(|path| ScanTarget {
                    object_id: object.id(),
                    path,
                })
            })
            .collect();

        let scanner = ctx.scanner;
        let workers = ctx.config.scan_workers.min(targets.len()).max(1);
        let outcome = if workers == 1 {
            scan_sequential(scanner, &targets, &mut submission.provenance)
        } else {
            scan_parallel(scanner, &targets, workers, &mut submission.provenance)
        };

        if let Err(violation) = outcome {
            warn!(
                "event=virus_scan module=filter status=error kind={} subject={}",
                violation.kind.as_str(),
                violation.subject.as_deref().unwrap_or("-")
            );
            return Err(FilterFailure::single(FILTER_NAME, violation));
        }

        info!(
            "event=filter_run module=filter status=ok filter={} scanned={} workers={}",
            FILTER_NAME,
            targets.len(),
            workers
        );
        Ok(())
    }
}

fn scan_sequential(
    scanner: &dyn VirusScanner,
    targets: &[ScanTarget],
    log: &mut ProvenanceLog,
) -> Result<(), Violation> {
    let agent = LinkedAgent::executor(scanner.agent_name());
    for target in targets {
        scan_one(scanner, target)?;
        log.append(clean_event(target.object_id, &agent));
    }
    Ok(())
}

fn scan_parallel(
    scanner: &dyn VirusScanner,
    targets: &[ScanTarget],
    workers: usize,
    log: &mut ProvenanceLog,
) -> Result<(), Violation> {
    let agent = LinkedAgent::executor(scanner.agent_name());
    let next = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);
    let log = Mutex::new(log);
    let failure: Mutex<Option<(usize, Violation)>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                if abort.load(Ordering::SeqCst) {
                    break;
                }
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(target) = targets.get(index) else {
                    break;
                };
                match scan_one(scanner, target) {
                    Ok(()) => {
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        let mut guard = log.lock().unwrap_or_else(PoisonError::into_inner);
                        guard.append(clean_event(target.object_id, &agent));
                    }
                    Err(violation) => {
                        abort.store(true, Ordering::SeqCst);
                        let mut slot = failure.lock().unwrap_or_else(PoisonError::into_inner);
                        // Report the earliest failing object in submission order.
                        if slot.as_ref().map_or(true, |(seen, _)| index < *seen) {
                            *slot = Some((index, violation));
                        }
                        break;
                    }
                }
            });
        }
    });

    match failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
        Some((_, violation)) => Err(violation),
        None => Ok(()),
    }
}

fn scan_one(scanner: &dyn VirusScanner, target: &ScanTarget) -> Result<(), Violation> {
    let bytes = read_payload(&target.path).map_err(|err| {
        Violation::subject(
            FailureKind::ScanError,
            target.path.display().to_string(),
            vec![target.object_id],
            format!("file could not be read for scanning: {err}"),
        )
    })?;
    match scanner.scan(&bytes) {
        ScanVerdict::Clean => Ok(()),
        ScanVerdict::Infected { report } => Err(Violation::subject(
            FailureKind::VirusFound,
            target.path.display().to_string(),
            vec![target.object_id],
            format!("{} reported infection: {report}", scanner.agent_name()),
        )),
        ScanVerdict::ScanError { cause } => Err(Violation::subject(
            FailureKind::ScanError,
            target.path.display().to_string(),
            vec![target.object_id],
            format!("{} could not scan file: {cause}", scanner.agent_name()),
        )),
    }
}

fn read_payload(path: &Path) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}

fn clean_event(object_id: ObjectId, agent: &LinkedAgent) -> ProvenanceEvent {
    ProvenanceEvent::new(object_id, EventType::VirusCheck, "File passed virus scan")
        .with_agent(agent.clone())
}
