use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    Overdue,
    DueSoon,
    /// Also used for finished tasks regardless of their due date.
    Upcoming,
}

impl TaskStatus {
    /// Higher is more urgent.
    pub fn severity(self) -> u8 {
        match self {
            TaskStatus::Overdue => 3,
            TaskStatus::DueSoon => 2,
            TaskStatus::Upcoming => 1,
            TaskStatus::Pending => 0,
        }
    }
}

pub fn classify(due_date: Option<DateTime<Utc>>, completed: f64, now: DateTime<Utc>) -> TaskStatus {
    let Some(due) = due_date else {
        return TaskStatus::Pending;
    };
    if completed >= 100.0 {
        TaskStatus::Upcoming
    } else if due < now {
        TaskStatus::Overdue
    } else {
        TaskStatus::DueSoon
    }
}

/// Most urgent status among `statuses`; `Pending` when there are none.
pub fn group_status(statuses: impl IntoIterator<Item = TaskStatus>) -> TaskStatus {
    statuses
        .into_iter()
        .max_by_key(|status| status.severity())
        .unwrap_or(TaskStatus::Pending)
}
