use serde::{Deserialize, Serialize};

/// Task priority. Ordering follows urgency: `High < Medium < Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank as stored in the database (1 = high).
    pub fn rank(self) -> i64 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// Unknown ranks read back as `Medium`.
    pub fn from_rank(rank: i64) -> Self {
        match rank {
            1 => Priority::High,
            3 => Priority::Low,
            _ => Priority::Medium,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw == "done" {
            TaskStatus::Done
        } else {
            TaskStatus::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflectionStatus {
    Pending,
    Answered,
    Skipped,
}

impl ReflectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReflectionStatus::Pending => "pending",
            ReflectionStatus::Answered => "answered",
            ReflectionStatus::Skipped => "skipped",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "answered" => ReflectionStatus::Answered,
            "skipped" => ReflectionStatus::Skipped,
            _ => ReflectionStatus::Pending,
        }
    }
}

/// The household chores every user is seeded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoreKind {
    BedroomBathroom,
    CleanSheets,
    WaterPlants,
}

impl ChoreKind {
    pub const ALL: [ChoreKind; 3] = [
        ChoreKind::BedroomBathroom,
        ChoreKind::CleanSheets,
        ChoreKind::WaterPlants,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ChoreKind::BedroomBathroom => "bedroom_bathroom",
            ChoreKind::CleanSheets => "clean_sheets",
            ChoreKind::WaterPlants => "water_plants",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn name(self) -> &'static str {
        match self {
            ChoreKind::BedroomBathroom => "Clean bedroom and bathroom",
            ChoreKind::CleanSheets => "Clean sheets",
            ChoreKind::WaterPlants => "Water plants",
        }
    }

    pub fn default_interval_days(self) -> i64 {
        match self {
            ChoreKind::BedroomBathroom => 30,
            ChoreKind::CleanSheets => 21,
            ChoreKind::WaterPlants => 7,
        }
    }
}

/// Answer to a chore confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoreResponse {
    Done,
    NotDone,
    Passed,
}

/// A reply button rendered under a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// One outbound chat message with an optional inline keyboard (rows of buttons).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}
