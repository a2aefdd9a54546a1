use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use timeline_domain::{
    columns::VisiblePlans,
    credentials::MemoryTokenStore,
    grouping::DEFAULT_GROUP_THRESHOLD,
    layout::{LayoutConfig, PlacedTask, TimelineLayout},
    range::RangeAnchor,
    status::TaskStatus,
    TimelineService,
};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) visible_plans: Vec<String>,
    pub(crate) group_threshold: f64,
    pub(crate) range_start: Option<DateTime<Utc>>,
    pub(crate) token: Option<String>,
    pub(crate) output: OutputFormat,
    pub(crate) watch: bool,
}

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(root) = lookup("TIMELINE_ROOT") {
            config.push_root(PathBuf::from(root));
        }
        if let Some(list) = lookup("TIMELINE_ROOTS") {
            for path in std::env::split_paths(&list) {
                config.push_root(path);
            }
        }
        if let Some(plans) = lookup("TIMELINE_VISIBLE_PLANS") {
            config.visible_plans = plans
                .split(',')
                .map(str::trim)
                .filter(|plan| !plan.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(threshold) = lookup("TIMELINE_GROUP_THRESHOLD") {
            match threshold.trim().parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => config.group_threshold = value,
                _ => warn!(%threshold, "ignoring invalid group threshold"),
            }
        }
        if let Some(start) = lookup("TIMELINE_RANGE_START") {
            match DateTime::parse_from_rfc3339(start.trim()) {
                Ok(parsed) => config.range_start = Some(parsed.with_timezone(&Utc)),
                Err(err) => warn!(%start, error = %err, "ignoring invalid range start"),
            }
        }
        if let Some(token) = lookup("TIMELINE_TOKEN") {
            if !token.trim().is_empty() {
                config.token = Some(token);
            }
        }
        if let Some(output) = lookup("TIMELINE_OUTPUT") {
            match output.trim().to_ascii_lowercase().as_str() {
                "json" => config.output = OutputFormat::Json,
                "text" => config.output = OutputFormat::Text,
                other => warn!(output = other, "unknown output format, using text"),
            }
        }
        if let Some(watch) = lookup("TIMELINE_WATCH") {
            config.watch = matches!(
                watch.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(config)
    }

    pub(crate) fn push_root(&mut self, path: PathBuf) {
        if !self.roots.contains(&path) {
            info!(path = %path.display(), "registering task root");
            self.roots.push(path);
        }
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            visible_plans: VisiblePlans::only(&self.visible_plans),
            group_threshold: self.group_threshold,
            range_anchor: self
                .range_start
                .map(RangeAnchor::Fixed)
                .unwrap_or_default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            visible_plans: Vec::new(),
            group_threshold: DEFAULT_GROUP_THRESHOLD,
            range_start: None,
            token: None,
            output: OutputFormat::Text,
            watch: false,
        }
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let start = Instant::now();
    info!(root_count = config.roots.len(), "initializing timeline service");

    let mut builder = TimelineService::builder().with_config(config.layout_config());
    for root in &config.roots {
        builder = builder.add_root(root);
    }
    if let Some(token) = &config.token {
        builder = builder.with_token_store(Arc::new(MemoryTokenStore::with_token(token)));
    }
    let mut service = builder.build();

    let report = service.refresh().context("failed to load tasks")?;
    if !report.rejected.is_empty() {
        warn!(rejected = report.rejected.len(), "some task records were dropped");
    }
    emit(&service, config.output)?;
    info!(elapsed_ms = %start.elapsed().as_millis(), "initial layout rendered");

    if !config.watch {
        return Ok(());
    }
    service.watch().context("failed to watch task roots")?;
    info!("watching task roots for changes");
    loop {
        std::thread::sleep(WATCH_POLL_INTERVAL);
        match service.refresh_if_changed() {
            Ok(Some(report)) => {
                if !report.rejected.is_empty() {
                    warn!(rejected = report.rejected.len(), "some task records were dropped");
                }
                emit(&service, config.output)?;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %format!("{err:#}"), "reload failed, keeping previous tasks")
            }
        }
    }
}

fn emit(service: &TimelineService, output: OutputFormat) -> Result<()> {
    let layout = service.layout(Utc::now());
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string_pretty(&layout)?,
        OutputFormat::Text => render_text(&layout),
    };
    println!("{rendered}");
    info!(
        groups = layout.groups.len(),
        columns = layout.columns.len(),
        "layout rendered"
    );
    Ok(())
}

pub fn render_text(layout: &TimelineLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Timeline {} .. {} (today at {:.1}%)",
        layout.range.start().format("%Y-%m-%d"),
        layout.range.end().format("%Y-%m-%d"),
        layout.current_position
    );
    for group in &layout.groups {
        let titles: Vec<&str> = group.tasks.iter().map(|p| p.task.title.as_str()).collect();
        let _ = writeln!(
            out,
            "  {:>5.1}% {:<9} {}",
            group.anchor,
            status_label(group.status),
            titles.join(", ")
        );
    }
    if layout.unplaced > 0 {
        let _ = writeln!(out, "  ({} without due date)", layout.unplaced);
    }
    for column in &layout.columns {
        let _ = writeln!(out, "\n{}", column.name);
        for placed in &column.tasks {
            let _ = writeln!(out, "  - {}", describe(placed));
        }
    }
    out
}

fn describe(placed: &PlacedTask) -> String {
    match placed.task.due_date {
        Some(due) => format!(
            "{} (due {}, {})",
            placed.task.title,
            due.format("%Y-%m-%d"),
            status_label(placed.status)
        ),
        None => format!("{} ({})", placed.task.title, status_label(placed.status)),
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Overdue => "overdue",
        TaskStatus::DueSoon => "due soon",
        TaskStatus::Upcoming => "upcoming",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use timeline_domain::{build_layout, Task};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_configuration_from_environment() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TIMELINE_ROOT", "/tmp/tasks"),
            ("TIMELINE_VISIBLE_PLANS", "Plan A, ,Ops"),
            ("TIMELINE_GROUP_THRESHOLD", "3.5"),
            ("TIMELINE_RANGE_START", "2024-08-02T00:00:00Z"),
            ("TIMELINE_TOKEN", "abc"),
            ("TIMELINE_OUTPUT", "JSON"),
            ("TIMELINE_WATCH", "true"),
        ]))
        .expect("config");

        assert_eq!(config.roots, vec![PathBuf::from("/tmp/tasks")]);
        assert_eq!(config.visible_plans, vec!["Plan A", "Ops"]);
        assert_eq!(config.group_threshold, 3.5);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.watch);

        let layout = config.layout_config();
        assert!(layout.visible_plans.allows("Ops"));
        assert!(!layout.visible_plans.allows("No Plan"));
        assert_eq!(
            layout.range_anchor,
            RangeAnchor::Fixed(Utc.with_ymd_and_hms(2024, 8, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TIMELINE_GROUP_THRESHOLD", "-1"),
            ("TIMELINE_OUTPUT", "yaml"),
            ("TIMELINE_TOKEN", "  "),
            ("TIMELINE_WATCH", "sometimes"),
        ]))
        .expect("config");
        assert!(!config.watch);
        assert_eq!(config.group_threshold, DEFAULT_GROUP_THRESHOLD);
        assert_eq!(config.output, OutputFormat::Text);
        assert!(config.token.is_none());
        assert_eq!(config.layout_config().range_anchor, RangeAnchor::EarliestTask);
    }

    #[test]
    fn malformed_range_start_falls_back_to_earliest_task() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TIMELINE_RANGE_START", "yesterday"),
            ("TIMELINE_GROUP_THRESHOLD", "4"),
        ]))
        .expect("bad range start is not fatal");
        assert!(config.range_start.is_none());
        assert_eq!(config.layout_config().range_anchor, RangeAnchor::EarliestTask);
        assert_eq!(config.group_threshold, 4.0);
    }

    #[test]
    fn text_report_lists_markers_and_columns() {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let tasks = vec![
            Task::new("1", "Kickoff").with_due_date(day(1)).with_plan("Launch"),
            Task::new("2", "Wrap up").with_due_date(day(31)).with_plan("Launch"),
            Task::new("3", "Someday"),
        ];
        let layout = build_layout(&tasks, day(11), &LayoutConfig::default());
        let text = render_text(&layout);

        assert!(text.starts_with("Timeline 2024-01-01 .. 2024-01-31 (today at 33.3%)"));
        assert!(text.contains("  0.0% overdue   Kickoff"));
        assert!(text.contains("100.0% due soon  Wrap up"));
        assert!(text.contains("(1 without due date)"));
        assert!(text.contains("\nLaunch\n  - Kickoff (due 2024-01-01, overdue)"));
        assert!(text.contains("\nNo Plan\n  - Someday (pending)"));
    }
}
