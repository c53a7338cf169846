//! Submission data model.
//!
//! # Responsibility
//! - Define the in-memory representation every filter reads and writes:
//!   candidate objects, their relationships, container placements and the
//!   provenance log.
//!
//! # Invariants
//! - Every candidate object is identified by a stable `ObjectId`.
//! - Properties and payload live on one record; serialized snapshots are
//!   only produced by `ObjectGraph::flush`.

pub mod graph;
pub mod object;
pub mod placement;
pub mod provenance;
pub mod submission;
