//! Trigger condition subsystem.
//!
//! Conditions are boolean expressions over named queries. Each evaluation
//! cycle supplies the documents every query matched, and the compiled
//! expression reduces them to the documents that satisfy the trigger.

/// Trigger definitions, severities and run results.
pub mod definition;
/// Expression tree and evaluation.
pub mod expression;
mod lexer;
/// Per-cycle query match sets.
pub mod matches;
/// Condition parser.
pub mod parser;

pub use definition::{run_triggers, DocumentTrigger, Severity, TriggerId, TriggerRunResult, TriggerSpec};
pub use expression::TriggerExpression;
pub use matches::QueryMatchMap;
pub use parser::{parse, ExpressionParser, MAX_NESTING_DEPTH};
