use serde::{Deserialize, Serialize};

pub type TicketId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    New,
    InProgress,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::New, Status::InProgress, Status::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::InProgress => "in-progress",
            Status::Resolved => "resolved",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::New => "New",
            Status::InProgress => "In progress",
            Status::Resolved => "Resolved",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Status::New => 1,
            Status::InProgress => 2,
            Status::Resolved => 3,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Status::Resolved)
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "new" => Some(Status::New),
            "in-progress" | "in_progress" | "inprogress" => Some(Status::InProgress),
            "resolved" => Some(Status::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// A ticket as persisted. `id` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub number: String,
    pub description: String,
    pub creation_date: String,
    pub status: Status,
    pub priority: Priority,
    pub responsible_employee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
}

impl Ticket {
    pub fn comments(&self) -> &[String] {
        self.comments.as_deref().unwrap_or_default()
    }

    /// Applies a patch to the local copy, mirroring the store's shallow merge.
    pub fn apply(&mut self, patch: &TicketPatch) {
        if let Some(number) = &patch.number {
            self.number = number.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(creation_date) = &patch.creation_date {
            self.creation_date = creation_date.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(responsible) = &patch.responsible_employee {
            self.responsible_employee = responsible.clone();
        }
        if let Some(comments) = &patch.comments {
            self.comments = Some(comments.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub number: String,
    pub description: String,
    pub creation_date: String,
    pub status: Status,
    pub priority: Priority,
    pub responsible_employee: String,
}

/// Partial ticket for merge-updates; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_employee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
}

impl TicketPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn comments(comments: Vec<String>) -> Self {
        Self {
            comments: Some(comments),
            ..Self::default()
        }
    }
}
