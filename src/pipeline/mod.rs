//! Processing Pipeline Module
//!
//! ## Per-Cycle Stage Sequence
//!
//! ```text
//! PHASE 1: Generate   (simulator reading)
//! PHASE 2: Check      (threshold bounds)
//! PHASE 3: Classify   (ONLY if flagged)
//! PHASE 4: Diagnose   (ONLY if confirmed)
//! PHASE 5: Recommend  (ONLY if diagnosed)
//! PHASE 6: Summarize  (console report + history)
//! ```
//!
//! GUARANTEE: Phase 4 only runs for an assessment the classifier confirmed.

mod coordinator;
mod history;
pub mod report;
mod state;

pub use coordinator::CycleCoordinator;
pub use history::History;
pub use state::*;
