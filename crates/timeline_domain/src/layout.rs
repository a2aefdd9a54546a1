use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    columns::{organize_columns, VisiblePlans},
    grouping::{group_overlapping, DEFAULT_GROUP_THRESHOLD},
    position::{current_marker, position_of},
    range::{resolve_range, DateRange, RangeAnchor},
    status::{classify, group_status, TaskStatus},
    task::Task,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub visible_plans: VisiblePlans,
    pub group_threshold: f64,
    pub range_anchor: RangeAnchor,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            visible_plans: VisiblePlans::all(),
            group_threshold: DEFAULT_GROUP_THRESHOLD,
            range_anchor: RangeAnchor::EarliestTask,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlacedTask {
    pub task: Task,
    pub position: f64,
    pub status: TaskStatus,
}

impl PlacedTask {
    fn place(task: &Task, range: &DateRange, now: DateTime<Utc>) -> Self {
        Self {
            task: task.clone(),
            position: position_of(task.due_date, range),
            status: classify(task.due_date, task.completed, now),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupView {
    pub anchor: f64,
    pub status: TaskStatus,
    pub tasks: Vec<PlacedTask>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub tasks: Vec<PlacedTask>,
}

/// Everything a renderer needs for one frame of the timeline and the plan
/// columns.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineLayout {
    pub range: DateRange,
    pub current_position: f64,
    pub groups: Vec<GroupView>,
    pub columns: Vec<ColumnView>,
    /// Visible tasks without a usable due date.
    pub unplaced: usize,
}

/// Runs the whole layout pipeline. Visibility is applied before date
/// validity, and the window is resolved over visible tasks only.
pub fn build_layout(tasks: &[Task], now: DateTime<Utc>, config: &LayoutConfig) -> TimelineLayout {
    let visible: Vec<Task> = tasks
        .iter()
        .filter(|task| config.visible_plans.allows_task(task))
        .cloned()
        .collect();
    let range = resolve_range(&visible, now, config.range_anchor);

    let groups = group_overlapping(&visible, &range, config.group_threshold, &VisiblePlans::all())
        .into_iter()
        .map(|group| {
            let tasks: Vec<PlacedTask> = group
                .tasks
                .iter()
                .map(|task| PlacedTask::place(task, &range, now))
                .collect();
            GroupView {
                anchor: group.anchor,
                status: group_status(tasks.iter().map(|placed| placed.status)),
                tasks,
            }
        })
        .collect();

    let columns = organize_columns(&visible, &VisiblePlans::all())
        .into_iter()
        .map(|column| ColumnView {
            name: column.name,
            tasks: column
                .tasks
                .iter()
                .map(|task| PlacedTask::place(task, &range, now))
                .collect(),
        })
        .collect();

    TimelineLayout {
        range,
        current_position: current_marker(now, &range),
        groups,
        columns,
        unplaced: visible.iter().filter(|task| !task.is_dated()).count(),
    }
}
