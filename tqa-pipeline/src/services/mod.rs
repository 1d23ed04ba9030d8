//! External collaborator seams
//!
//! Each collaborator is a trait with a production implementation and
//! in-memory test doubles; swapping one in a test is substituting an
//! implementation, never intercepting queries.

pub mod limits;
pub mod llm;
pub mod notify;
pub mod rules;

pub use limits::{BudgetService, BudgetStatus, GovernorRateLimiter, RateLimiterService};
pub use llm::{AiCallError, AiFinding, ChunkReviewRequest, ChunkReviewResponse, TextGenerator, TokenUsage};
pub use notify::Notifier;
pub use rules::{CustomRule, GlossaryProvider, GlossaryTerm, RuleConfigProvider, RuleEngine, RuleFinding};
