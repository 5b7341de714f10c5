//! CLI interface for tasktally.
//!
//! Three commands:
//!
//! - `tally add` — put a new pending task on an employee's list.
//! - `tally list` — print the tasks in view and exit.
//! - `tally session` — an interactive tracking session on stdin. The clock
//!   only moves when a `tick` line arrives, so any external scheduler (a
//!   shell loop, a display refresh) can drive it.
//!
//! Task ids accept a full UUID or an unambiguous prefix.

mod format;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::actor::ConfiguredActor;
use crate::config::Config;
use crate::model::{ActionCode, Reconciliation, Task, TaskChange, TaskFilter};
use crate::policy;
use crate::store::Store;
use crate::sync::{ActorSource, Session, SessionError};

use format::{format_change, format_task_line, short_id};

type TallySession = Session<Store, Store, ConfiguredActor>;

/// tally — track time spent on tasks.
#[derive(Debug, Parser)]
#[command(name = "tally", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Act with a lower role than the configured one.
    #[arg(long, global = true)]
    role: Option<String>,

    /// Directory holding `tasks.json` and `journal.jsonl`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: tracking a task
  1. tally add --employee Dana --planned 30 Inventory
     → 3f2a91c0-...
  2. tally list --employee Dana
     → 3f2a91c0  [pending]  Dana  Inventory  0m / 30m planned
  3. tally session --employee Dana
     > start 3f2
     > tick 3f2 5
     > pause 3f2
     > complete 3f2 12
     > rate 3f2 4

Session lines:
  start|pause <id>          change status (needs TASK-Start / TASK-Pause)
  tick <id|all> [n]         advance running clocks by n minutes (default 1)
  complete <id> <minutes>   finish with the authoritative total
  rate <id> <1-5>           rate a completed task once
  confirm <id> <minutes> [finished]
                            apply a remote confirmation
  show | retry | resync | help | quit";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a pending task for an employee (needs TASK-Assign). Prints the task ID.
    Add {
        /// Who the task is assigned to.
        #[arg(long)]
        employee: String,

        /// Planned duration in minutes.
        #[arg(long, default_value_t = 0)]
        planned: u32,

        /// What the task is.
        task: String,
    },

    /// List tasks: your own with `--employee`, everyone's without (needs TASK-ViewAll).
    List {
        /// Only this employee's tasks.
        #[arg(long)]
        employee: Option<String>,
    },

    /// Start an interactive tracking session reading commands from stdin.
    Session {
        /// Only this employee's tasks.
        #[arg(long)]
        employee: Option<String>,
    },
}

/// One parsed line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionLine {
    Start(String),
    Pause(String),
    /// `None` ticks every running task.
    Tick { task: Option<String>, n: u32 },
    Complete { task: String, minutes: u32 },
    Rate { task: String, rating: u8 },
    Confirm {
        task: String,
        accumulated: u32,
        finished: Option<u32>,
    },
    Show,
    Retry,
    Resync,
    Help,
    Quit,
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();

    let root = cli
        .data_dir
        .or_else(|| config.data_dir.clone())
        .or_else(Store::default_root)
        .ok_or("could not determine home directory")?;

    let (employee, interactive) = match cli.command {
        Command::Add {
            employee,
            planned,
            task,
        } => return cmd_add(root, cli.role, employee, &task, planned),
        Command::List { employee } => (employee, false),
        Command::Session { employee } => (employee, true),
    };
    let filter = employee.map_or(TaskFilter::All, TaskFilter::Employee);

    let mut session = open_session(root, cli.role, filter)?;
    if interactive {
        cmd_session(&mut session)
    } else {
        cmd_list(&session)
    }
}

fn open_session(
    root: PathBuf,
    role: Option<String>,
    filter: TaskFilter,
) -> Result<TallySession, String> {
    let source = Store::new(&root).map_err(|e| format!("failed to open store: {e}"))?;
    let sink = Store::new(&root).map_err(|e| format!("failed to open store: {e}"))?;
    let actors = ConfiguredActor::from_default_path(role);
    Session::open(source, sink, actors, filter).map_err(|e| e.to_string())
}

fn cmd_add(
    root: PathBuf,
    role: Option<String>,
    employee: String,
    task_name: &str,
    planned: u32,
) -> Result<(), String> {
    let actor = ConfiguredActor::from_default_path(role).current_actor();
    policy::authorize(&actor, ActionCode::AssignTask).map_err(|e| format!("Not allowed: {e}"))?;

    let store = Store::new(root).map_err(|e| format!("failed to open store: {e}"))?;
    store
        .compact()
        .map_err(|e| format!("failed to compact journal: {e}"))?;
    let mut records = store
        .load_records()
        .map_err(|e| format!("failed to load tasks: {e}"))?;
    let task = Task::new(employee, task_name, planned);
    records.push(task.to_record());
    store
        .save_records(&records)
        .map_err(|e| format!("failed to save tasks: {e}"))?;

    println!("{}", task.id);
    Ok(())
}

fn cmd_list(session: &TallySession) -> Result<(), String> {
    let views = session.snapshot().map_err(|e| describe_error(&e))?;
    if views.is_empty() {
        println!("No tasks");
        return Ok(());
    }
    for view in &views {
        println!("{}", format_task_line(view));
    }
    Ok(())
}

fn cmd_session(session: &mut TallySession) -> Result<(), String> {
    let display = session.subscribe();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    prompt(&mut stdout)?;
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| format!("failed to read input: {e}"))?;
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(SessionLine::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = execute(session, command) {
                    eprintln!("{e}");
                }
                print_changes(&display);
            }
            Err(e) => eprintln!("{e}"),
        }
        prompt(&mut stdout)?;
    }

    let pending = session.registry().unconfirmed().len();
    if pending > 0 {
        eprintln!("{pending} task(s) changed locally and not confirmed");
    }
    Ok(())
}

fn prompt(stdout: &mut io::Stdout) -> Result<(), String> {
    print!("> ");
    stdout
        .flush()
        .map_err(|e| format!("failed to write prompt: {e}"))
}

fn execute(session: &mut TallySession, command: SessionLine) -> Result<(), String> {
    match command {
        SessionLine::Start(task) => {
            let id = resolve_task(session, &task)?;
            session.start(id).map_err(|e| describe_error(&e))?;
        }
        SessionLine::Pause(task) => {
            let id = resolve_task(session, &task)?;
            session.pause(id).map_err(|e| describe_error(&e))?;
        }
        SessionLine::Tick { task: None, n } => {
            let moved = session.tick_running(n);
            println!("{moved} running task(s) advanced by {n}");
        }
        SessionLine::Tick { task: Some(task), n } => {
            let id = resolve_task(session, &task)?;
            if !session.tick(id, n).map_err(|e| describe_error(&e))? {
                println!("{} is not running; tick ignored", short_id(id));
            }
        }
        SessionLine::Complete { task, minutes } => {
            let id = resolve_task(session, &task)?;
            session
                .complete(id, minutes)
                .map_err(|e| describe_error(&e))?;
        }
        SessionLine::Rate { task, rating } => {
            let id = resolve_task(session, &task)?;
            session.rate(id, rating).map_err(|e| describe_error(&e))?;
        }
        SessionLine::Confirm {
            task,
            accumulated,
            finished,
        } => {
            let id = resolve_task(session, &task)?;
            let report = Reconciliation {
                task_id: id,
                accumulated_minutes: accumulated,
                finished_in_minutes: finished,
            };
            if !session
                .reconcile(&report)
                .map_err(|e| describe_error(&e))?
            {
                println!("{} already matches; confirmed", short_id(id));
            }
        }
        SessionLine::Show => {
            let views = session.snapshot().map_err(|e| describe_error(&e))?;
            for view in &views {
                println!("{}", format_task_line(view));
            }
        }
        SessionLine::Retry => {
            let pushed = session
                .retry_unconfirmed()
                .map_err(|e| describe_error(&e))?;
            println!("{pushed} task(s) pushed");
        }
        SessionLine::Resync => {
            session.resync().map_err(|e| describe_error(&e))?;
            let count = session.registry().snapshot(&TaskFilter::All).len();
            println!("reloaded {count} task(s)");
        }
        SessionLine::Help => println!("{WORKFLOW_HELP}"),
        SessionLine::Quit => {}
    }
    Ok(())
}

fn print_changes(display: &mpsc::Receiver<TaskChange>) {
    while let Ok(change) = display.try_recv() {
        eprintln!("→ {}", format_change(&change));
    }
}

/// Permission failures are for the user; everything else hints at a stale view.
fn describe_error(err: &SessionError) -> String {
    match err {
        SessionError::Task(e) if e.is_user_facing() => format!("Not allowed: {e}"),
        SessionError::Task(e) if e.needs_resync() => {
            format!("{e} (your view may be stale; run `resync`)")
        }
        e => e.to_string(),
    }
}

fn parse_line(line: &str) -> Result<Option<SessionLine>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (verb, args) {
        ("start", [task]) => SessionLine::Start((*task).to_string()),
        ("pause", [task]) => SessionLine::Pause((*task).to_string()),
        ("tick", [task]) => SessionLine::Tick {
            task: tick_target(task),
            n: 1,
        },
        ("tick", [task, n]) => SessionLine::Tick {
            task: tick_target(task),
            n: parse_number(n, "tick count")?,
        },
        ("complete", [task, minutes]) => SessionLine::Complete {
            task: (*task).to_string(),
            minutes: parse_number(minutes, "minutes")?,
        },
        ("rate", [task, rating]) => SessionLine::Rate {
            task: (*task).to_string(),
            rating: parse_number(rating, "rating")?,
        },
        ("confirm", [task, accumulated]) => SessionLine::Confirm {
            task: (*task).to_string(),
            accumulated: parse_number(accumulated, "minutes")?,
            finished: None,
        },
        ("confirm", [task, accumulated, finished]) => SessionLine::Confirm {
            task: (*task).to_string(),
            accumulated: parse_number(accumulated, "minutes")?,
            finished: Some(parse_number(finished, "finished minutes")?),
        },
        ("show", []) => SessionLine::Show,
        ("retry", []) => SessionLine::Retry,
        ("resync", []) => SessionLine::Resync,
        ("help", []) => SessionLine::Help,
        ("quit" | "exit", []) => SessionLine::Quit,
        _ => return Err(format!("unrecognized command '{line}' (try `help`)")),
    };
    Ok(Some(command))
}

fn tick_target(word: &str) -> Option<String> {
    (word != "all").then(|| word.to_string())
}

fn parse_number<T: std::str::FromStr>(word: &str, what: &str) -> Result<T, String> {
    word.parse().map_err(|_| format!("invalid {what}: '{word}'"))
}

/// Resolve a task reference (full UUID or unambiguous prefix) to a task id.
fn resolve_task(session: &TallySession, reference: &str) -> Result<Uuid, String> {
    // Try full UUID first.
    if let Ok(id) = reference.parse::<Uuid>() {
        return Ok(id);
    }

    // Try as a prefix match against all tasks in view.
    let views = session.registry().snapshot(&TaskFilter::All);
    let matches: Vec<Uuid> = views
        .iter()
        .map(|v| v.task.id)
        .filter(|id| id.to_string().starts_with(reference))
        .collect();

    match matches.as_slice() {
        [] => Err(format!("no task matching '{reference}'")),
        [id] => Ok(*id),
        ids => {
            let shown: Vec<String> = ids.iter().map(|id| short_id(*id)).collect();
            Err(format!(
                "'{reference}' is ambiguous — matches {} tasks: {}",
                ids.len(),
                shown.join(", ")
            ))
        }
    }
}
