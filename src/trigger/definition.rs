//! Document-level trigger definitions and run results.
//!
//! A trigger is compiled once from its condition source and then run every
//! evaluation cycle against that cycle's query match sets.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AlertingResult, ValidationError};

use super::expression::TriggerExpression;
use super::matches::QueryMatchMap;
use super::parser::ExpressionParser;

/// Unique identifier for a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(Uuid);

impl TriggerId {
    /// Create a new random trigger id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TriggerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alert severity, 1 (highest) through 5 (lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    /// Highest severity.
    pub const HIGHEST: Self = Self(1);
    /// Lowest severity.
    pub const LOWEST: Self = Self(5);

    /// Numeric level.
    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidSeverity { value })
        }
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializable trigger definition as stored with a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Trigger name.
    pub name: String,
    /// Alert severity.
    pub severity: Severity,
    /// Boolean condition over the monitor's query names.
    pub condition: String,
}

/// A trigger whose condition has been parsed.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentTrigger {
    pub id: TriggerId,
    pub name: String,
    pub severity: Severity,
    pub condition: String,
    pub expression: TriggerExpression,
}

impl DocumentTrigger {
    /// Parses `condition` against the monitor's declared queries.
    pub fn compile<I, S>(
        name: impl Into<String>,
        severity: Severity,
        condition: impl Into<String>,
        declared_queries: I,
    ) -> AlertingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField {
                field: "name".to_string(),
            }
            .into());
        }

        let condition = condition.into();
        let expression = ExpressionParser::new()
            .with_declared_queries(declared_queries)
            .parse(&condition)?;

        tracing::debug!(trigger = %name, %expression, "compiled trigger condition");

        Ok(Self {
            id: TriggerId::new(),
            name,
            severity,
            condition,
            expression,
        })
    }

    /// Compiles a stored definition.
    pub fn from_spec<I, S>(spec: TriggerSpec, declared_queries: I) -> AlertingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::compile(spec.name, spec.severity, spec.condition, declared_queries)
    }

    /// Definition view of this trigger.
    #[must_use]
    pub fn spec(&self) -> TriggerSpec {
        TriggerSpec {
            name: self.name.clone(),
            severity: self.severity,
            condition: self.condition.clone(),
        }
    }

    /// Evaluates the trigger for one cycle.
    #[must_use]
    pub fn run(&self, matches: &QueryMatchMap) -> TriggerRunResult {
        let triggered_docs = self.expression.evaluate(matches);
        tracing::debug!(
            trigger = %self.name,
            trigger_id = %self.id,
            matched = triggered_docs.len(),
            "trigger evaluated"
        );
        TriggerRunResult {
            run_id: Uuid::new_v4(),
            trigger_id: self.id,
            trigger_name: self.name.clone(),
            severity: self.severity,
            triggered_docs,
            evaluated_at: Utc::now(),
        }
    }
}

/// Outcome of running one trigger in one cycle.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRunResult {
    pub run_id: Uuid,
    pub trigger_id: TriggerId,
    pub trigger_name: String,
    pub severity: Severity,
    pub triggered_docs: BTreeSet<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl TriggerRunResult {
    /// True if any document satisfied the condition.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        !self.triggered_docs.is_empty()
    }
}

/// Runs every trigger against the same cycle's match sets.
#[must_use]
pub fn run_triggers(triggers: &[DocumentTrigger], matches: &QueryMatchMap) -> Vec<TriggerRunResult> {
    triggers.iter().map(|t| t.run(matches)).collect()
}
