use serde::Serialize;

use crate::columns::{compare_due_dates, VisiblePlans};
use crate::position::position;
use crate::range::DateRange;
use crate::task::Task;

/// Two markers closer than this many percentage points are drawn as one.
pub const DEFAULT_GROUP_THRESHOLD: f64 = 2.0;

/// Tasks drawn at effectively the same spot on the timeline. `anchor` is the
/// position of the first member.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderGroup {
    pub anchor: f64,
    pub tasks: Vec<Task>,
}

/// Dated, visible tasks in ascending due-date order; ties keep input order.
pub fn placeable_tasks<'a>(tasks: &'a [Task], visible: &VisiblePlans) -> Vec<&'a Task> {
    let mut placeable: Vec<&Task> = tasks
        .iter()
        .filter(|task| visible.allows_task(task))
        .filter(|task| task.is_dated())
        .collect();
    placeable.sort_by(|a, b| compare_due_dates(a, b));
    placeable
}

/// Greedy single pass: each task joins the first group whose anchor lies
/// within `threshold` points of it, otherwise it opens a new group.
pub fn group_overlapping(
    tasks: &[Task],
    range: &DateRange,
    threshold: f64,
    visible: &VisiblePlans,
) -> Vec<RenderGroup> {
    let threshold = if threshold.is_nan() { 0.0 } else { threshold.max(0.0) };
    let mut groups: Vec<RenderGroup> = Vec::new();

    for task in placeable_tasks(tasks, visible) {
        let Some(due) = task.due_date else {
            continue;
        };
        let at = position(due, range);
        match groups
            .iter_mut()
            .find(|group| (group.anchor - at).abs() <= threshold)
        {
            Some(group) => group.tasks.push(task.clone()),
            None => groups.push(RenderGroup {
                anchor: at,
                tasks: vec![task.clone()],
            }),
        }
    }

    tracing::debug!(group_count = groups.len(), threshold, "grouped timeline markers");
    groups
}
