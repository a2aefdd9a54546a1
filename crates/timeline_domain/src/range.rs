use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Visible window of the timeline. `end` is never before `start`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Builds a range, raising `end` to `start` if it was given earlier.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::new(instant, instant)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration_ms(&self) -> i64 {
        self.end.timestamp_millis() - self.start.timestamp_millis()
    }

    pub fn is_degenerate(&self) -> bool {
        self.duration_ms() == 0
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Where the left edge of the timeline comes from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "at")]
pub enum RangeAnchor {
    #[default]
    EarliestTask,
    Fixed(DateTime<Utc>),
}

/// Resolves the visible window for `tasks`. The result always contains `now`.
pub fn resolve_range(tasks: &[Task], now: DateTime<Utc>, anchor: RangeAnchor) -> DateRange {
    let mut dated = tasks.iter().filter_map(|task| task.due_date);
    let Some(first) = dated.next() else {
        let start = match anchor {
            RangeAnchor::EarliestTask => now,
            RangeAnchor::Fixed(at) => at.min(now),
        };
        return DateRange::new(start, now);
    };

    let (earliest, latest) = dated.fold((first, first), |(lo, hi), due| {
        (lo.min(due), hi.max(due))
    });
    let start = match anchor {
        RangeAnchor::EarliestTask => earliest,
        RangeAnchor::Fixed(at) => at,
    };
    DateRange::new(start.min(now), latest.max(now))
}
