use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::df;
use polars::prelude::{AnyValue, DataFrame, PolarsResult};
use std::io::{self, Write};
use taskflow_scheduler::{
    Bucket, Priority, Resource, ScheduleReport, SchedulingInput, Task, TaskFieldMapping,
    critical_path, export_write_back_csv, import_tasks_from_csv, load_input_from_json,
    parse_duration_minutes, planner, report, save_input_to_json,
};
use tracing_subscriber::EnvFilter;

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn cell_text(value: PolarsResult<AnyValue<'_>>) -> String {
    match value {
        Ok(AnyValue::Null) | Err(_) => String::new(),
        Ok(AnyValue::Int64(v)) => v.to_string(),
        Ok(AnyValue::Boolean(true)) => "yes".to_string(),
        Ok(AnyValue::Boolean(false)) => String::new(),
        Ok(AnyValue::String(s)) => s.to_string(),
        Ok(av) => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let cells: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| columns.iter().map(|c| cell_text(c.get(row_idx))).collect())
        .collect();

    // Compute column widths
    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, s) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(s.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, s) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(s);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(s.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn tasks_frame(tasks: &[Task]) -> PolarsResult<DataFrame> {
    df!(
        "id" => tasks.iter().map(|t| t.id.clone()).collect::<Vec<_>>(),
        "name" => tasks.iter().map(|t| t.name.clone()).collect::<Vec<_>>(),
        "minutes" => tasks.iter().map(|t| t.duration_minutes).collect::<Vec<i64>>(),
        "priority" => tasks.iter().map(|t| t.priority.to_string()).collect::<Vec<_>>(),
        "deadline" => tasks.iter().map(|t| t.deadline.map(|d| d.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default()).collect::<Vec<_>>(),
        "assignee" => tasks.iter().map(|t| t.assignee.clone().unwrap_or_default()).collect::<Vec<_>>(),
        "depends_on" => tasks.iter().map(|t| t.dependencies.join(",")).collect::<Vec<_>>()
    )
}

fn print_tables(frame: PolarsResult<DataFrame>) {
    match frame {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error rendering table: {e}"),
    }
}

fn parse_instant(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = match time {
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M").ok()?,
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

fn print_help() {
    println!(
        "Commands:\n  help                                   Show this help\n  show                                   Show tasks, resources and buckets\n  add <id> <duration> [priority] [deps]  Upsert a task (duration like 90, 45m, 2h, 1d; deps like a,b)\n  deadline <id> <YYYY-MM-DD> [HH:MM]     Set a task deadline\n  assign <id> <resource>                 Set a task's assignee\n  delete <id>                            Delete a task and clean up dependencies\n  bucket <id> <HH:MM> <HH:MM> [percent]  Upsert a daily bucket\n  resource <id> [percent] [buckets]      Upsert a resource (buckets like am,pm)\n  horizon <YYYY-MM-DD> [HH:MM]           Set the horizon start\n  split <on|off>                         Allow splitting tasks across buckets\n  weight <name> <0-100>                  Set priority, deadline, resource or dependency weight\n  parallel <on|off>                      Run critical path analysis alongside the solve\n  load json <path>                       Load a scheduling input\n  save json <path>                       Save the scheduling input\n  import csv <path>                      Import tasks with the default column mapping\n  export csv <path>                      Export the last solve as write-back rows\n  solve                                  Solve and show the timeline\n  critical                               Show the critical path and slack\n  quit|exit                              Exit"
    );
}

struct Session {
    input: SchedulingInput,
    last_report: Option<ScheduleReport>,
}

impl Session {
    fn show(&self) {
        print_tables(tasks_frame(&self.input.tasks));
        for resource in &self.input.resources {
            let buckets = if resource.buckets.is_empty() {
                "all".to_string()
            } else {
                resource.buckets.join(",")
            };
            println!(
                "resource {} capacity={}% buckets={}",
                resource.id, resource.capacity_percent, buckets
            );
        }
        for bucket in &self.input.buckets {
            println!(
                "bucket {} {}-{} capacity={}%{}",
                bucket.id,
                bucket.start.format("%H:%M"),
                bucket.end.format("%H:%M"),
                bucket.capacity_percent,
                if bucket.enabled { "" } else { " (disabled)" }
            );
        }
        println!("horizon start {}", self.input.horizon_start.format("%Y-%m-%d %H:%M"));
        let weights = &self.input.config.weights;
        println!(
            "weights priority={} deadline={} resource={} dependency={}",
            weights.priority, weights.deadline, weights.resource, weights.dependency
        );
    }

    fn with_task(&mut self, id: &str, update: impl FnOnce(&mut Task)) {
        match self.input.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                update(task);
                println!("Updated task {id}.");
            }
            None => println!("Task {id} not found."),
        }
    }

    fn add(&mut self, args: &[&str]) {
        let (Some(id), Some(duration)) = (args.first(), args.get(1)) else {
            println!("Usage: add <id> <duration> [priority] [deps]");
            return;
        };
        let minutes = match parse_duration_minutes(duration, self.input.config.minutes_per_day) {
            Ok(m) => m,
            Err(e) => {
                println!("Error: {e}");
                return;
            }
        };
        let priority = match args.get(2).map(|p| p.parse::<Priority>()) {
            None => Priority::default(),
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                println!("Error: {e}");
                return;
            }
        };
        let deps = args.get(3).map(|d| split_csv(d)).unwrap_or_default();
        let mut task = Task::new(*id, *id, minutes)
            .with_priority(priority)
            .with_dependencies(deps);
        if let Some(existing) = self.input.task(id) {
            task.name = existing.name.clone();
            task.deadline = existing.deadline;
            task.assignee = existing.assignee.clone();
        }
        let replaced = self.input.upsert_task(task);
        println!("{} task {id}.", if replaced { "Updated" } else { "Added" });
    }

    fn solve(&mut self) {
        match planner::plan(&self.input) {
            Ok(report) => {
                println!("{}", report.to_cli_summary());
                print_tables(report.timeline_frame());
                for violation in &report.violations {
                    println!("violation: {violation}");
                }
                self.last_report = Some(report);
            }
            Err(e) => println!("Error solving: {e}"),
        }
    }

    fn critical(&self) {
        match critical_path::analyze(&self.input.tasks) {
            Ok(cp) => {
                println!(
                    "critical path ({} min): {}",
                    cp.total_minutes,
                    cp.path.join(" -> ")
                );
                print_tables(report::slack_frame(&cp.timings));
            }
            Err(e) => println!("Error: {e}"),
        }
    }

    /// Returns `false` when the session should end.
    fn dispatch(&mut self, line: &str) -> bool {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            return true;
        };

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => return false,
            "show" => self.show(),
            "add" => self.add(args),
            "deadline" => match args {
                [id, date, rest @ ..] => match parse_instant(date, rest.first().copied()) {
                    Some(deadline) => self.with_task(id, |t| t.deadline = Some(deadline)),
                    None => println!("Invalid date/time"),
                },
                _ => println!("Usage: deadline <id> <YYYY-MM-DD> [HH:MM]"),
            },
            "assign" => match args {
                [id, resource] => {
                    let resource = resource.to_string();
                    self.with_task(id, |t| t.assignee = Some(resource));
                }
                _ => println!("Usage: assign <id> <resource>"),
            },
            "delete" => match args {
                [id] => match self.input.remove_task(id) {
                    Some(_) => println!("Deleted task {id}."),
                    None => println!("Task {id} not found."),
                },
                _ => println!("Usage: delete <id>"),
            },
            "bucket" => match args {
                [id, start, end, rest @ ..] => match (parse_time(start), parse_time(end)) {
                    (Some(start), Some(end)) => {
                        let mut bucket = Bucket::new(*id, *id, start, end);
                        if let Some(p) = rest.first() {
                            match p.trim_end_matches('%').parse::<u8>() {
                                Ok(p) => bucket = bucket.with_capacity(p),
                                Err(_) => {
                                    println!("Invalid percent");
                                    return true;
                                }
                            }
                        }
                        self.input.upsert_bucket(bucket);
                        println!("Bucket {id} saved.");
                    }
                    _ => println!("Invalid time, expected HH:MM"),
                },
                _ => println!("Usage: bucket <id> <HH:MM> <HH:MM> [percent]"),
            },
            "resource" => match args {
                [id, rest @ ..] => {
                    let mut resource = Resource::new(*id, *id);
                    if let Some(p) = rest.first() {
                        match p.trim_end_matches('%').parse::<u8>() {
                            Ok(p) => resource = resource.with_capacity(p),
                            Err(_) => {
                                println!("Invalid percent");
                                return true;
                            }
                        }
                    }
                    if let Some(buckets) = rest.get(1) {
                        resource = resource.with_buckets(split_csv(buckets));
                    }
                    self.input.upsert_resource(resource);
                    println!("Resource {id} saved.");
                }
                _ => println!("Usage: resource <id> [percent] [buckets]"),
            },
            "horizon" => match args {
                [date, rest @ ..] => match parse_instant(date, rest.first().copied()) {
                    Some(start) => {
                        self.input.horizon_start = start;
                        println!("Horizon starts {}.", start.format("%Y-%m-%d %H:%M"));
                    }
                    None => println!("Invalid date/time"),
                },
                _ => println!("Usage: horizon <YYYY-MM-DD> [HH:MM]"),
            },
            "split" => match args {
                ["on"] => self.input.config.allow_split_across_buckets = true,
                ["off"] => self.input.config.allow_split_across_buckets = false,
                _ => println!("Usage: split <on|off>"),
            },
            "weight" => match args {
                [name, value] => match value.parse::<u32>() {
                    Ok(value) if value <= 100 => {
                        let weights = &mut self.input.config.weights;
                        let slot = match *name {
                            "priority" => &mut weights.priority,
                            "deadline" => &mut weights.deadline,
                            "resource" => &mut weights.resource,
                            "dependency" => &mut weights.dependency,
                            other => {
                                println!("Unknown weight '{other}'");
                                return true;
                            }
                        };
                        *slot = value;
                        println!("Weight {name} set to {value}.");
                    }
                    _ => println!("Invalid weight, expected 0-100"),
                },
                _ => println!("Usage: weight <priority|deadline|resource|dependency> <0-100>"),
            },
            "parallel" => match args {
                ["on"] => self.input.config.enable_parallelization = true,
                ["off"] => self.input.config.enable_parallelization = false,
                _ => println!("Usage: parallel <on|off>"),
            },
            "load" => match args {
                ["json", path] => match load_input_from_json(path) {
                    Ok(input) => {
                        self.input = input;
                        self.last_report = None;
                        println!("Loaded {} tasks from {path}.", self.input.tasks.len());
                    }
                    Err(e) => println!("Error loading: {e}"),
                },
                _ => println!("Usage: load json <path>"),
            },
            "save" => match args {
                ["json", path] => match save_input_to_json(&self.input, path) {
                    Ok(()) => println!("Saved to {path}."),
                    Err(e) => println!("Error saving: {e}"),
                },
                _ => println!("Usage: save json <path>"),
            },
            "import" => match args {
                ["csv", path] => match import_tasks_from_csv(
                    path,
                    &TaskFieldMapping::default(),
                    self.input.config.minutes_per_day,
                ) {
                    Ok(tasks) => {
                        println!("Imported {} tasks.", tasks.len());
                        self.input.tasks = tasks;
                    }
                    Err(e) => println!("Error importing: {e}"),
                },
                _ => println!("Usage: import csv <path>"),
            },
            "export" => match (args, &self.last_report) {
                (["csv", path], Some(report)) => match export_write_back_csv(report, path) {
                    Ok(rows) => println!("Exported {rows} rows to {path}."),
                    Err(e) => println!("Error exporting: {e}"),
                },
                (["csv", _], None) => println!("Nothing to export, run 'solve' first."),
                _ => println!("Usage: export csv <path>"),
            },
            "solve" => self.solve(),
            "critical" => self.critical(),
            other => println!("Unknown command '{other}'. Type 'help'."),
        }
        true
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let today = chrono::Local::now().date_naive().and_time(NaiveTime::MIN);
    let mut session = Session {
        input: SchedulingInput::new(today),
        last_report: None,
    };

    println!("Taskflow Scheduler (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if !session.dispatch(line.trim()) {
            break;
        }
    }
}
