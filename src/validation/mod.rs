//! Classification of observed object state against expected values.
//!
//! Every classified condition or value is counted once in the report
//! summary; a summary holding any Stale or Problem count fails validation.

use serde::{Deserialize, Serialize};

use crate::report::{Summary, SummaryKey};
use crate::resources::{ACTION_RELOCATE, ConditionView, PHASE_RELOCATING};

mod application;
mod clusters;

pub use application::{ApplicationStatus, validate_application};
pub use clusters::{ClustersStatus, validate_clusters};

pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";
pub const DATA_PROTECTED: &str = "DataProtected";
pub const UNUSED_REASON: &str = "Unused";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationState {
    Ok,
    Stale,
    Problem,
}

impl ValidationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Stale => "stale",
            Self::Problem => "problem",
        }
    }
}

impl SummaryKey for ValidationState {
    fn summary_key(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validated {
    pub state: ValidationState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Validated {
    pub fn ok() -> Self {
        Self {
            state: ValidationState::Ok,
            description: String::new(),
        }
    }

    pub fn problem(description: impl Into<String>) -> Self {
        Self {
            state: ValidationState::Problem,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub state: ValidationState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A plain observed value (phase, state, progression) with its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedValue {
    pub value: String,
    pub state: ValidationState,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Classifies one condition of an object at `generation`.
pub fn validate_condition(
    condition: &ConditionView,
    generation: i64,
    expected_status: &str,
) -> ValidatedCondition {
    let (state, description) = match condition.observed_generation {
        Some(observed) if observed != generation => (
            ValidationState::Stale,
            format!("Condition is stale (observedGeneration {observed}, generation {generation})"),
        ),
        _ if condition.status != expected_status => {
            let description = if condition.message.is_empty() {
                format!("Expected status {expected_status}, got {}", condition.status)
            } else {
                condition.message.clone()
            };
            (ValidationState::Problem, description)
        }
        _ => (ValidationState::Ok, String::new()),
    };

    ValidatedCondition {
        type_: condition.type_.clone(),
        state,
        description,
    }
}

/// Expected status of a VRG or protected PVC condition. `DataProtected`
/// is only expected during the final sync of a relocate.
pub fn expected_vrg_condition_status(condition_type: &str, action: &str, phase: &str) -> &'static str {
    if condition_type != DATA_PROTECTED {
        return CONDITION_TRUE;
    }
    if action == ACTION_RELOCATE && phase == PHASE_RELOCATING {
        CONDITION_TRUE
    } else {
        CONDITION_FALSE
    }
}

/// Classifies `conditions`, skipping inert `Unused` placeholders, and counts
/// each verdict in `summary`.
pub fn validate_conditions<'a, I, F>(
    conditions: I,
    generation: i64,
    expected_status: F,
    summary: &mut Summary,
) -> Vec<ValidatedCondition>
where
    I: IntoIterator<Item = ConditionView>,
    F: Fn(&str) -> &'a str,
{
    conditions
        .into_iter()
        .filter(|condition| condition.reason != UNUSED_REASON)
        .map(|condition| {
            let validated =
                validate_condition(&condition, generation, expected_status(&condition.type_));
            summary.add(validated.state);
            validated
        })
        .collect()
}

/// Classifies `value` as OK when it equals `expected`.
pub fn validate_value(value: &str, expected: &str, summary: &mut Summary) -> ValidatedValue {
    let validated = if value == expected {
        ValidatedValue {
            value: value.to_string(),
            state: ValidationState::Ok,
            description: String::new(),
        }
    } else {
        ValidatedValue {
            value: value.to_string(),
            state: ValidationState::Problem,
            description: format!("Expected \"{expected}\""),
        }
    };
    summary.add(validated.state);
    validated
}

/// Validation passes only when nothing was classified Stale or Problem.
pub fn has_issues(summary: &Summary) -> bool {
    summary.count(ValidationState::Stale) > 0 || summary.count(ValidationState::Problem) > 0
}
