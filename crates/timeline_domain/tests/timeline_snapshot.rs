use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::tempdir;
use timeline_domain::{
    columns::VisiblePlans, credentials::MemoryTokenStore, status::TaskStatus, TimelineService,
};

fn write_file(path: &PathBuf, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, contents).expect("write fixture");
}

#[test]
fn saved_listing_to_layout_round_trip() {
    let temp = tempdir().expect("tempdir");
    let root = temp.path();

    write_file(
        &root.join("planner/launch.json"),
        r#"{
            "value": [
                {"id": "k1", "title": "Kickoff", "dueDate": "2024-01-01T00:00:00Z", "completed": 0, "plan": "Plan A", "tags": []},
                {"id": "k2", "title": "Unplanned chore", "dueDate": "garbage", "completed": 0, "plan": ""},
                {"id": "k3", "title": "Review", "dueDate": "2024-01-10", "completed": 100, "plan": "Plan A"},
                {"title": "No id, dropped", "dueDate": "2024-02-01", "plan": "Plan A"}
            ]
        }"#,
    );
    write_file(
        &root.join("planner/ops.json"),
        r#"[{"id": "o1", "title": "Ship", "dueDate": "2024-06-01", "completed": 20, "plan": "Ops"}]"#,
    );

    let service = TimelineService::builder()
        .add_root(root)
        .with_token_store(Arc::new(MemoryTokenStore::with_token("token")))
        .build();
    let report = service.refresh().expect("refresh");
    assert_eq!(report.accepted, 4);
    assert_eq!(report.rejected.len(), 1);

    let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let layout = service.layout(now);

    let anchors: Vec<f64> = layout.groups.iter().map(|group| group.anchor).collect();
    assert_eq!(anchors.len(), 3);
    assert_eq!(anchors[0], 0.0);
    assert!((anchors[1] - 5.92).abs() < 0.01);
    assert_eq!(anchors[2], 100.0);
    assert_eq!(layout.groups[1].status, TaskStatus::Upcoming);
    assert_eq!(layout.groups[2].status, TaskStatus::DueSoon);
    assert_eq!(layout.unplaced, 1);

    let names: Vec<&str> = layout.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Plan A", "No Plan", "Ops"]);
    assert_eq!(layout.columns[0].tasks.len(), 2);

    service.set_visible_plans(VisiblePlans::only(["Plan A"]));
    let narrowed = service.layout(now);
    let names: Vec<&str> = narrowed.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Plan A"]);
    assert_eq!(narrowed.groups.len(), 2);
    assert_eq!(service.layout(now), narrowed);
}

#[test]
fn broken_listing_leaves_previous_snapshot() {
    let temp = tempdir().expect("tempdir");
    let listing = temp.path().join("tasks.json");
    write_file(&listing, r#"[{"id": "a", "title": "A", "dueDate": "2024-01-01"}]"#);

    let service = TimelineService::builder().add_root(temp.path()).build();
    service.refresh().expect("first refresh");
    assert_eq!(service.tasks().len(), 1);

    write_file(&listing, "[{\"id\": ");
    assert!(service.refresh().is_err());
    assert_eq!(service.tasks().len(), 1);
}

#[test]
fn upstream_error_body_leaves_previous_snapshot() {
    let temp = tempdir().expect("tempdir");
    let listing = temp.path().join("tasks.json");
    write_file(&listing, r#"{"value": [{"id": "a", "title": "A", "dueDate": "2024-01-01"}]}"#);

    let service = TimelineService::builder().add_root(temp.path()).build();
    service.refresh().expect("first refresh");
    let before = service.tasks();
    assert_eq!(before.len(), 1);

    write_file(&listing, r#"{"error": "No valid authorization header"}"#);
    let err = service.refresh().expect_err("error body must not refresh");
    assert!(format!("{err:#}").contains("No valid authorization header"));
    assert_eq!(service.tasks(), before);
}

#[test]
fn one_mistyped_record_keeps_the_rest_of_the_listing() {
    let temp = tempdir().expect("tempdir");
    write_file(
        &temp.path().join("tasks.json"),
        r#"{"value": [
            {"id": "x", "title": "X", "dueDate": "2024-01-01", "tags": null},
            {"id": "bad", "completed": "half"},
            {"id": "y", "title": "Y", "dueDate": "2024-01-05"}
        ]}"#,
    );

    let service = TimelineService::builder().add_root(temp.path()).build();
    let report = service.refresh().expect("refresh");
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].index, 1);
    let ids: Vec<String> = service.tasks().iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids, vec!["x".to_string(), "y".to_string()]);
}
