use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use taskflow_scheduler::{
    Bucket, PersistenceError, Priority, Resource, SchedulingInput, Task, TaskFieldMapping,
    export_write_back_csv, import_tasks_from_csv, load_input_from_json, load_report_from_json,
    plan, save_input_to_json, save_report_to_json, save_tasks_to_csv,
};
use tempfile::tempdir;

fn at(day: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn tracker_mapping() -> TaskFieldMapping {
    TaskFieldMapping {
        id: "Key".into(),
        name: "Title".into(),
        priority: "Prio".into(),
        duration: "Estimate".into(),
        deadline: "Due".into(),
        assignee: "Owner".into(),
        dependencies: "Blocked by".into(),
        include: "Schedule?".into(),
    }
}

#[test]
fn import_maps_external_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracker.csv");
    fs::write(
        &path,
        "Key,Title,Prio,Estimate,Due,Owner,Blocked by,Schedule?\n\
         T-1,Design,high,2h,2024-01-10 17:00,r1,,yes\n\
         T-2,Build,,1.5h,2024-01-12,,T-1,\n\
         T-3,Review,Critical,45m,,r2,T-1;T-2,true\n",
    )
    .unwrap();

    let tasks = import_tasks_from_csv(&path, &tracker_mapping(), 480).unwrap();

    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].id, "T-1");
    assert_eq!(tasks[0].name, "Design");
    assert_eq!(tasks[0].priority, Priority::High);
    assert_eq!(tasks[0].duration_minutes, 120);
    assert_eq!(tasks[0].deadline, Some(at(10, 17, 0)));
    assert_eq!(tasks[0].assignee.as_deref(), Some("r1"));

    assert_eq!(tasks[1].priority, Priority::Medium);
    assert_eq!(tasks[1].duration_minutes, 90);
    // A bare date means the end of that day
    assert_eq!(tasks[1].deadline, Some(at(13, 0, 0)));
    assert_eq!(tasks[1].dependencies, vec!["T-1"]);

    assert_eq!(tasks[2].dependencies, vec!["T-1", "T-2"]);
}

#[test]
fn excluded_rows_are_dropped_with_their_references() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tracker.csv");
    fs::write(
        &path,
        "Title,Estimate,Blocked by,Schedule?\n\
         Spike,1d,,no\n\
         Build,3h,Spike,yes\n\
         Ship,30,Build;Spike,\n",
    )
    .unwrap();
    let mapping = tracker_mapping();

    let tasks = import_tasks_from_csv(&path, &mapping, 480).unwrap();

    // Without an id column the title is the id
    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["Build", "Ship"]);
    assert!(tasks[0].dependencies.is_empty());
    assert_eq!(tasks[1].dependencies, vec!["Build"]);
    assert_eq!(tasks[1].duration_minutes, 30);
}

#[test]
fn import_rejects_bad_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");

    fs::write(&path, "name,duration,priority\nA,2h,urgent\n").unwrap();
    let err = import_tasks_from_csv(&path, &TaskFieldMapping::default(), 480).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(ref msg) if msg.contains("line 2")));

    fs::write(&path, "name,duration\nA,soon\n").unwrap();
    assert!(import_tasks_from_csv(&path, &TaskFieldMapping::default(), 480).is_err());

    fs::write(&path, "name,effort\nA,1h\n").unwrap();
    let err = import_tasks_from_csv(&path, &TaskFieldMapping::default(), 480).unwrap_err();
    assert!(err.to_string().contains("missing column 'duration'"));
}

#[test]
fn tasks_csv_reads_back_with_the_default_mapping() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tasks.csv");
    let tasks = vec![
        Task::new("a", "Alpha", 90)
            .with_priority(Priority::Critical)
            .with_deadline(at(9, 12, 0)),
        Task::new("b", "Beta", 30)
            .with_assignee("r1")
            .with_dependencies(["a"]),
    ];

    save_tasks_to_csv(&tasks, &path).unwrap();
    let loaded = import_tasks_from_csv(&path, &TaskFieldMapping::default(), 480).unwrap();

    assert_eq!(loaded, tasks);
}

fn sample_input() -> SchedulingInput {
    let mut input = SchedulingInput::new(at(8, 0, 0));
    input.buckets = vec![Bucket::new(
        "am",
        "Morning",
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
    )];
    input.resources = vec![Resource::new("r1", "Ito")];
    input.tasks = vec![
        Task::new("a", "Alpha", 60),
        Task::new("b", "Beta", 60).with_dependencies(["a"]),
    ];
    input
}

#[test]
fn input_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("input.json");
    let input = sample_input();

    save_input_to_json(&input, &path).unwrap();
    let loaded = load_input_from_json(&path).unwrap();

    assert_eq!(loaded, input);
}

#[test]
fn invalid_input_is_not_saved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("input.json");
    let mut input = sample_input();
    input.tasks[0].dependencies = vec!["b".into()];

    let err = save_input_to_json(&input, &path).unwrap_err();
    assert!(matches!(err, PersistenceError::Validation(_)));
    assert!(!path.exists());
}

#[test]
fn report_json_and_write_back_export() {
    let dir = tempdir().unwrap();
    let report = plan(&sample_input()).unwrap();

    let json_path = dir.path().join("report.json");
    save_report_to_json(&report, &json_path).unwrap();
    assert_eq!(load_report_from_json(&json_path).unwrap(), report);

    let csv_path = dir.path().join("write_back.csv");
    let rows = export_write_back_csv(&report, &csv_path).unwrap();
    assert_eq!(rows, 2);
    let contents = fs::read_to_string(&csv_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("task_id,task_name,resource_id,bucket_id,start,end,segments")
    );
    assert_eq!(
        lines.next(),
        Some("a,Alpha,r1,am,2024-01-08 09:00,2024-01-08 10:00,1")
    );
    assert_eq!(
        lines.next(),
        Some("b,Beta,r1,am,2024-01-08 10:00,2024-01-08 11:00,1")
    );
}
