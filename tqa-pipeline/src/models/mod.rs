//! Domain models for the QA pipeline

pub mod file;
pub mod finding;
pub mod score;
pub mod segment;
pub mod trigger;

pub use file::{FileStatus, QaFile};
pub use finding::{Finding, FindingStatus, Layer, Severity};
pub use score::{PenaltyWeights, Score, ScoreStatus};
pub use segment::Segment;
pub use trigger::{FailureContext, ProcessingMode, TriggerEvent};
