use std::collections::HashMap;
use taskflow_scheduler::critical_path::analyze;
use taskflow_scheduler::{ErrorKind, Task};

/// Every source-to-sink chain of the dependency graph with its total duration.
fn all_paths(tasks: &[Task]) -> Vec<(Vec<String>, i64)> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in tasks {
        for dep in &task.dependencies {
            successors.entry(dep.as_str()).or_default().push(task.id.as_str());
        }
    }

    fn walk<'t>(
        id: &'t str,
        by_id: &HashMap<&'t str, &'t Task>,
        successors: &HashMap<&'t str, Vec<&'t str>>,
        prefix: &mut Vec<String>,
        paths: &mut Vec<(Vec<String>, i64)>,
    ) {
        prefix.push(id.to_string());
        match successors.get(id) {
            Some(next) => {
                for &succ in next {
                    walk(succ, by_id, successors, prefix, paths);
                }
            }
            None => {
                let total: i64 = prefix.iter().map(|p| by_id[p.as_str()].duration_minutes).sum();
                paths.push((prefix.clone(), total));
            }
        }
        prefix.pop();
    }

    let mut paths = Vec::new();
    for source in tasks.iter().filter(|t| t.dependencies.is_empty()) {
        walk(source.id.as_str(), &by_id, &successors, &mut Vec::new(), &mut paths);
    }
    paths
}

#[test]
fn fork_after_a_common_predecessor() {
    let tasks = vec![
        Task::new("A", "A", 2),
        Task::new("B", "B", 3).with_dependencies(["A"]),
        Task::new("C", "C", 1).with_dependencies(["A"]),
    ];

    let cp = analyze(&tasks).unwrap();

    assert_eq!(cp.total_minutes, 5);
    assert_eq!(cp.path, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(cp.slack("A"), Some(0));
    assert_eq!(cp.slack("B"), Some(0));
    assert_eq!(cp.slack("C"), Some(2));
    assert!(!cp.is_critical("C"));

    let c = cp.timing("C").unwrap();
    assert_eq!((c.earliest_start, c.earliest_finish), (2, 3));
    assert_eq!((c.latest_start, c.latest_finish), (4, 5));
}

#[test]
fn tied_paths_follow_the_lowest_task_id() {
    let tasks = vec![
        Task::new("start", "Start", 1),
        Task::new("right", "Right", 2).with_dependencies(["start"]),
        Task::new("left", "Left", 2).with_dependencies(["start"]),
        Task::new("merge", "Merge", 1).with_dependencies(["left", "right"]),
    ];

    let cp = analyze(&tasks).unwrap();

    assert_eq!(cp.total_minutes, 4);
    assert_eq!(cp.path, vec!["start", "left", "merge"]);
    assert!(cp.is_critical("right"));
}

#[test]
fn independent_chains_report_slack_on_the_shorter_one() {
    let tasks = vec![
        Task::new("y1", "Short", 3),
        Task::new("x1", "Long", 4),
        Task::new("x2", "Long tail", 1).with_dependencies(["x1"]),
    ];

    let cp = analyze(&tasks).unwrap();

    assert_eq!(cp.total_minutes, 5);
    assert_eq!(cp.path, vec!["x1", "x2"]);
    assert_eq!(cp.slack("y1"), Some(2));
    // Timings stay in input order
    let ids: Vec<&str> = cp.timings.iter().map(|t| t.task_id.as_str()).collect();
    assert_eq!(ids, vec!["y1", "x1", "x2"]);
}

#[test]
fn slack_is_never_negative() {
    let tasks = vec![
        Task::new("a", "A", 30),
        Task::new("b", "B", 10).with_dependencies(["a"]),
        Task::new("c", "C", 50),
        Task::new("d", "D", 5).with_dependencies(["b", "c"]),
        Task::new("e", "E", 1),
    ];

    let cp = analyze(&tasks).unwrap();

    assert_eq!(cp.total_minutes, 55);
    assert!(cp.timings.iter().all(|t| t.slack >= 0));
    assert_eq!(cp.path, vec!["c", "d"]);
    assert_eq!(cp.slack("a"), Some(10));
}

#[test]
fn empty_input_has_an_empty_path() {
    let cp = analyze(&[]).unwrap();
    assert_eq!(cp.total_minutes, 0);
    assert!(cp.path.is_empty());
    assert!(cp.timings.is_empty());
}

#[test]
fn cycles_are_reported() {
    let tasks = vec![
        Task::new("a", "A", 1).with_dependencies(["b"]),
        Task::new("b", "B", 1).with_dependencies(["a"]),
    ];
    let err = analyze(&tasks).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicDependency);
}

#[test]
fn critical_path_is_the_longest_chain() {
    let tasks = vec![
        Task::new("spec", "Write spec", 120),
        Task::new("api", "Build API", 180).with_dependencies(["spec"]),
        Task::new("ui", "Build UI", 150).with_dependencies(["spec"]),
        Task::new("db", "Schema", 45),
        Task::new("seed", "Seed data", 400).with_dependencies(["db"]),
        Task::new("wire", "Wire up", 60).with_dependencies(["api", "ui", "db"]),
        Task::new("docs", "Docs", 30),
        Task::new("qa", "QA", 90).with_dependencies(["wire", "seed"]),
        Task::new("demo", "Demo", 20).with_dependencies(["ui"]),
    ];

    let cp = analyze(&tasks).unwrap();
    let paths = all_paths(&tasks);

    assert_eq!(paths.len(), 6);
    for (path, minutes) in &paths {
        assert!(*minutes <= cp.total_minutes, "{path:?} takes {minutes}");
    }
    assert_eq!(paths.iter().map(|(_, m)| *m).max(), Some(cp.total_minutes));

    let on_path: i64 = cp
        .path
        .iter()
        .map(|id| tasks.iter().find(|t| &t.id == id).unwrap().duration_minutes)
        .sum();
    assert_eq!(on_path, cp.total_minutes);
    assert!(paths.iter().any(|(path, _)| *path == cp.path));
    assert_eq!(cp.path, vec!["db", "seed", "qa"]);
    assert_eq!(cp.total_minutes, 535);
}

#[test]
fn oversized_durations_are_rejected_instead_of_overflowing() {
    let tasks = vec![
        Task::new("a", "A", i64::MAX / 2 + 1),
        Task::new("b", "B", i64::MAX / 2 + 1).with_dependencies(["a"]),
    ];
    let err = analyze(&tasks).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTask);
}
