//! Canonical path composition and de-duplication helpers.
//!
//! # Responsibility
//! - Compose an object's repository path from its placement and slugs.
//! - Provide the deterministic slug increment used by lenient conflict fixing.
//! - Memoize live-repository lookups for the duration of one submission.
//!
//! # Invariants
//! - Paths are computed, never stored on objects.
//! - The separator is always `/`; container paths never produce `//`.

pub mod cache;
pub mod increment;
pub mod resolver;
