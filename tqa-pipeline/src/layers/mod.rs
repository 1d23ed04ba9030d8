//! Processing layer runners
//!
//! Each per-file runner follows the same shape: CAS-claim the file into
//! its processing state, do the work, replace the layer's finding set,
//! advance the file. On failure the file is rolled back (to `failed`,
//! or to the predecessor state for retriable errors) and the original
//! error is re-thrown. The consistency pass is batch-scoped and stands
//! outside the per-file state machine.

pub mod ai_pass;
pub mod consistency;
pub mod rule_pass;

pub use ai_pass::{AiPassRunner, AiPassSummary};
pub use consistency::ConsistencyPass;
pub use rule_pass::RulePassRunner;
