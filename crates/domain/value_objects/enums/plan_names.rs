use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanName {
    Free,
    Basic,
    Pro,
    Premium,
}

impl PlanName {
    pub const ALL: [PlanName; 4] = [
        PlanName::Free,
        PlanName::Basic,
        PlanName::Pro,
        PlanName::Premium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanName::Free => "free",
            PlanName::Basic => "basic",
            PlanName::Pro => "pro",
            PlanName::Premium => "premium",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(PlanName::Free),
            "basic" => Some(PlanName::Basic),
            "pro" => Some(PlanName::Pro),
            "premium" => Some(PlanName::Premium),
            _ => None,
        }
    }

    /// The free tier is the only one allowed to carry no price.
    pub fn is_free_tier(&self) -> bool {
        matches!(self, PlanName::Free)
    }
}

impl Display for PlanName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
