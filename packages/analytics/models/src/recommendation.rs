//! Policy recommendation types.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Subject area of a recommendation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationTopic {
    ResourceAllocation,
    TemporalDeployment,
    ViolentCrimeFocus,
    FeatureMonitoring,
    ConditionalDependency,
    DataCollection,
    InvestigationImprovement,
    VictimProtection,
    PreventivePatrolling,
}

/// Time horizon for acting on a recommendation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Within 30 days.
    Immediate,
    /// One to six months.
    ShortTerm,
    /// Beyond six months.
    LongTerm,
}

/// One recommendation derived from the analysis artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecommendation {
    pub topic: RecommendationTopic,
    pub priority: Priority,
    /// The evidence that triggered the rule.
    pub rationale: String,
    pub action: String,
}
