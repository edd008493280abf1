use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Teacher-owned resources whose creation is metered by a usage counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Group,
    LearningPath,
    Resource,
    Activity,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Group,
        ResourceKind::LearningPath,
        ResourceKind::Resource,
        ResourceKind::Activity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Group => "group",
            ResourceKind::LearningPath => "learning_path",
            ResourceKind::Resource => "resource",
            ResourceKind::Activity => "activity",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "group" | "groups" => Some(ResourceKind::Group),
            "learning_path" | "learning_paths" | "route" | "routes" => {
                Some(ResourceKind::LearningPath)
            }
            "resource" | "resources" => Some(ResourceKind::Resource),
            "activity" | "activities" => Some(ResourceKind::Activity),
            _ => None,
        }
    }

    /// Plural label used in refusal messages.
    pub fn plural_label(&self) -> &'static str {
        match self {
            ResourceKind::Group => "groups",
            ResourceKind::LearningPath => "learning paths",
            ResourceKind::Resource => "resources",
            ResourceKind::Activity => "activities",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
