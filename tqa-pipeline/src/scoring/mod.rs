//! Scoring: MQM calculation, penalty weights, auto-pass gating and the
//! score orchestrator

pub mod auto_pass;
pub mod mqm;
pub mod orchestrator;
pub mod weights;

pub use auto_pass::{evaluate_auto_pass, AutoPassDecision, AutoPassInput};
pub use mqm::{calculate_mqm_score, MqmResult};
pub use orchestrator::{ScoreOrchestrator, ScoreOutcome};
pub use weights::{resolve_weights, PenaltyWeightRow};
