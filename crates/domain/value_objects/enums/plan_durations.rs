use std::fmt::Display;

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanDuration {
    Monthly,
    Quarterly,
    Annual,
    Indefinite,
}

impl PlanDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanDuration::Monthly => "monthly",
            PlanDuration::Quarterly => "quarterly",
            PlanDuration::Annual => "annual",
            PlanDuration::Indefinite => "indefinite",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" => Some(PlanDuration::Monthly),
            "quarterly" => Some(PlanDuration::Quarterly),
            "annual" => Some(PlanDuration::Annual),
            "indefinite" => Some(PlanDuration::Indefinite),
            _ => None,
        }
    }

    pub fn is_indefinite(&self) -> bool {
        matches!(self, PlanDuration::Indefinite)
    }

    /// Length of one billing period; `None` for indefinite plans.
    pub fn renewal_period(&self) -> Option<Duration> {
        match self {
            PlanDuration::Monthly => Some(Duration::days(30)),
            PlanDuration::Quarterly => Some(Duration::days(90)),
            PlanDuration::Annual => Some(Duration::days(365)),
            PlanDuration::Indefinite => None,
        }
    }
}

impl Display for PlanDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
