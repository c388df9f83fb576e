//! Finding types shared by the insight rules

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a finding is about. Each kind has a fixed tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightType {
    /// Budget at or past 100% used
    Overspend,
    AlmostAtLimit,
    /// Category spend well above its rolling average
    Anomaly,
    Streak,
    SavingsOpportunity,
    /// Getting-started hint for a sparse ledger
    Tip,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overspend => "overspend",
            Self::AlmostAtLimit => "almost-at-limit",
            Self::Anomaly => "anomaly",
            Self::Streak => "streak",
            Self::SavingsOpportunity => "savings-opportunity",
            Self::Tip => "tip",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Overspend | Self::AlmostAtLimit | Self::Anomaly => Severity::Warning,
            Self::Streak => Severity::Success,
            Self::SavingsOpportunity | Self::Tip => Severity::Info,
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
}

/// One rule result, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub insight_type: InsightType,
    /// Stable across runs for the same subject, e.g. `budget:overspend:b1`
    pub key: String,
    pub severity: Severity,
    pub title: String,
    pub summary: String,
    /// Rule-specific numbers behind the text
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl Finding {
    pub fn new(
        insight_type: InsightType,
        key: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            insight_type,
            key: key.into(),
            severity: insight_type.severity(),
            title: title.into(),
            summary: summary.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_kind() {
        assert_eq!(InsightType::Overspend.severity(), Severity::Warning);
        assert_eq!(InsightType::Streak.severity(), Severity::Success);
        assert_eq!(InsightType::Tip.severity(), Severity::Info);
    }

    #[test]
    fn test_finding_json_shape() {
        let finding = Finding::new(
            InsightType::AlmostAtLimit,
            "budget:almost-at-limit:b1",
            "Groceries is almost at its limit",
            "92% of the monthly budget is used",
        );
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["insightType"], "almost-at-limit");
        assert_eq!(json["severity"], "warning");
        assert!(json.get("data").is_none());

        let with_data = finding.with_data(serde_json::json!({"pctUsed": 92.0}));
        assert_eq!(with_data.data["pctUsed"], 92.0);
    }
}
