use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::task::{normalize_plan, Task};

/// Allow-list of plan names. An empty list shows every plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct VisiblePlans(BTreeSet<String>);

impl VisiblePlans {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(plans: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            plans
                .into_iter()
                .map(|plan| normalize_plan(Some(plan.as_ref())))
                .collect(),
        )
    }

    pub fn is_unfiltered(&self) -> bool {
        self.0.is_empty()
    }

    pub fn allows(&self, plan: &str) -> bool {
        self.0.is_empty() || self.0.contains(plan)
    }

    pub fn allows_task(&self, task: &Task) -> bool {
        self.is_unfiltered() || self.allows(&normalize_plan(Some(&task.plan)))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub tasks: Vec<Task>,
}

/// Buckets visible tasks by plan. Columns appear in the order their plan is
/// first seen in `tasks`.
pub fn organize_columns(tasks: &[Task], visible: &VisiblePlans) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();

    for task in tasks {
        let name = normalize_plan(Some(&task.plan));
        if !visible.allows(&name) {
            continue;
        }
        match columns.iter_mut().find(|column| column.name == name) {
            Some(column) => column.tasks.push(task.clone()),
            None => columns.push(Column {
                name,
                tasks: vec![task.clone()],
            }),
        }
    }

    for column in &mut columns {
        column.tasks.sort_by(compare_due_dates);
    }
    columns
}

/// Ascending by due date with undated tasks last. Used with a stable sort so
/// equal keys keep their input order.
pub fn compare_due_dates(a: &Task, b: &Task) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
