use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Column label used for tasks that arrive without a plan.
pub const NO_PLAN: &str = "No Plan";

/// Task record exactly as the upstream task API hands it over. Every field is
/// optional on the wire; `Task::try_from` decides what is usable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub due_date: Option<Value>,
    #[serde(default)]
    pub completed: Option<f64>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Body of a task listing response: `{ "value": [...] }`. Records stay as
/// plain JSON so one malformed entry cannot spoil the listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TaskResponse {
    pub value: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub plan: String,
    pub completed: f64,
    pub tags: Vec<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            due_date: None,
            plan: NO_PLAN.to_string(),
            completed: 0.0,
            tags: Vec::new(),
        }
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = (due_date.timestamp_millis() > 0).then_some(due_date);
        self
    }

    pub fn with_plan(mut self, plan: &str) -> Self {
        self.plan = normalize_plan(Some(plan));
        self
    }

    pub fn with_completed(mut self, completed: f64) -> Self {
        self.completed = clamp_completed(Some(completed));
        self
    }

    pub fn is_dated(&self) -> bool {
        self.due_date.is_some()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("task record has no id")]
    MissingId,
    #[error("malformed task record: {0}")]
    Malformed(String),
}

impl TryFrom<RawTask> for Task {
    type Error = RecordError;

    fn try_from(raw: RawTask) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(RecordError::MissingId)?;

        Ok(Self {
            id,
            title: raw.title.unwrap_or_default(),
            due_date: raw.due_date.as_ref().and_then(parse_due_date),
            plan: normalize_plan(raw.plan.as_deref()),
            completed: clamp_completed(raw.completed),
            tags: raw.tags.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub index: usize,
    pub reason: RecordError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingested {
    pub tasks: Vec<Task>,
    pub rejected: Vec<RejectedRecord>,
}

/// Converts a fetched batch into tasks, preserving input order. Malformed
/// records are dropped and reported; they never abort the batch.
pub fn ingest(records: Vec<Value>) -> Ingested {
    let mut ingested = Ingested::default();
    for (index, record) in records.into_iter().enumerate() {
        let converted = serde_json::from_value::<RawTask>(record)
            .map_err(|err| RecordError::Malformed(err.to_string()))
            .and_then(Task::try_from);
        match converted {
            Ok(task) => ingested.tasks.push(task),
            Err(reason) => {
                tracing::warn!(index, %reason, "rejecting task record");
                ingested.rejected.push(RejectedRecord { index, reason });
            }
        }
    }
    ingested
}

/// Parses an upstream due date. Anything that does not resolve to an instant
/// after the Unix epoch counts as "no deadline".
pub fn parse_due_date(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(raw) => parse_date_str(raw.trim()),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }?;
    (parsed.timestamp_millis() > 0).then_some(parsed)
}

fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn normalize_plan(plan: Option<&str>) -> String {
    match plan.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => NO_PLAN.to_string(),
    }
}

fn clamp_completed(completed: Option<f64>) -> f64 {
    match completed {
        Some(value) if !value.is_nan() => value.clamp(0.0, 100.0),
        _ => 0.0,
    }
}
