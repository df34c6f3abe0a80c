// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod assemble;
pub mod classify;
pub mod dates;
pub mod dedup;
pub mod digest;
pub mod fetch;
pub mod ingest;
pub mod normalize;
pub mod notify;
pub mod refine;
pub mod title;
pub mod vocab;

// ---- Re-exports for stable public API ----
pub use crate::assemble::{Assembler, Event, RunState};
pub use crate::dedup::{canonicalize, DedupStore};
pub use crate::ingest::{gather_fragments, run_once, RunReport};
pub use crate::ingest::types::{Fragment, FragmentSource, SourceKind};
pub use crate::notify::{DryRunPublisher, Publisher};
pub use crate::vocab::Vocab;
