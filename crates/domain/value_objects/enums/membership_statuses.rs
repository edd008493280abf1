use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Approved => "approved",
            MembershipStatus::Rejected => "rejected",
        };
        write!(f, "{}", status)
    }
}

impl MembershipStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "approved" => MembershipStatus::Approved,
            "rejected" => MembershipStatus::Rejected,
            _ => MembershipStatus::Pending,
        }
    }
}
