use std::fmt;
use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};

use crate::capture::TaskInput;
use crate::cli::{
    AddArgs, CliCommand, DeleteArgs, DragArgs, ListArgs, LoginArgs, PurgeArgs, ReorderArgs,
};
use crate::config::AppConfig;
use crate::core::{open_store, Auth, TaskBoard};
use crate::model::{Bucket, Category, DeleteResult, Task};

pub async fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    let auth = Auth::from_config(config);
    match command {
        CliCommand::Login(args) => handle_login(&auth, args, &mut writer),
        CliCommand::Logout => {
            auth.logout();
            writeln!(writer, "Logged out")?;
            Ok(())
        }
        command => {
            auth.require_session()?;
            let store = open_store(config.backend())?;
            let mut board = TaskBoard::new(store);
            board.load().await?;

            let outcome = run_on_board(&mut board, command, &mut writer).await;
            let report = board.flush_pending().await;
            if report.failed > 0 {
                tracing::warn!(failed = report.failed, "some reorder writes did not persist");
            }
            board.close();
            outcome
        }
    }
}

fn handle_login<W: Write>(auth: &Auth, args: LoginArgs, mut writer: W) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => {
            write!(writer, "Password: ")?;
            writer.flush()?;
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read password")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    let session = auth.login(&password)?;
    writeln!(
        writer,
        "Logged in until {}",
        session.expires_at.format("%Y-%m-%d %H:%M UTC")
    )?;
    Ok(())
}

async fn run_on_board<W: Write>(
    board: &mut TaskBoard,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    match command {
        CliCommand::Add(args) => handle_add(board, &args, &mut writer).await,
        CliCommand::List(args) => handle_list(board, &args, &mut writer),
        CliCommand::Toggle(args) => {
            match board.toggle_complete(&args.id).await {
                Some(true) => writeln!(writer, "Completed {}", args.id)?,
                Some(false) => writeln!(writer, "Reopened {}", args.id)?,
                None => writeln!(writer, "Not found: {}", args.id)?,
            }
            Ok(())
        }
        CliCommand::Edit(args) => {
            match board.edit_text(&args.id, &args.text.join(" ")).await? {
                Some(task) => writeln!(writer, "Updated {}: {}", task.id, task.text)?,
                None => writeln!(writer, "Not found: {}", args.id)?,
            }
            Ok(())
        }
        CliCommand::Priority(args) => {
            let moved = board.update_priority(&args.id, args.priority).await;
            write_moved(&mut writer, &args.id, moved.as_ref())
        }
        CliCommand::Move(args) => {
            let moved = board.move_to_category(&args.id, args.category).await;
            write_moved(&mut writer, &args.id, moved.as_ref())
        }
        CliCommand::Reorder(args) => handle_reorder(board, &args, &mut writer),
        CliCommand::Drag(args) => handle_drag(board, &args, &mut writer).await,
        CliCommand::Delete(args) => handle_delete(board, &args, &mut writer).await,
        CliCommand::ClearCompleted => {
            let cleared = board.clear_completed().await;
            writeln!(writer, "Cleared {}", CountLine::new(cleared, "completed task"))?;
            Ok(())
        }
        CliCommand::ResetChecklist => {
            let reset = board.reset_checklist().await;
            writeln!(writer, "Reset {}", CountLine::new(reset, "checklist item"))?;
            Ok(())
        }
        CliCommand::Purge(args) => handle_purge(board, &args, &mut writer).await,
        CliCommand::Login(_) | CliCommand::Logout => Err(anyhow!("session commands run without a board")),
    }
}

async fn handle_add<W: Write>(board: &mut TaskBoard, args: &AddArgs, mut writer: W) -> Result<()> {
    let input = TaskInput::from(args);
    let task = board.add(&input, Category::General).await?;
    writeln!(writer, "Added {}: {} [{}]", task.id, task.text, task.bucket())?;
    Ok(())
}

fn handle_list<W: Write>(board: &TaskBoard, args: &ListArgs, mut writer: W) -> Result<()> {
    let tasks = if args.archive {
        board.archive_view()
    } else {
        board.category_view(args.category)
    };

    if args.json {
        serde_json::to_writer_pretty(&mut writer, &tasks)?;
        writeln!(writer)?;
        return Ok(());
    }

    if tasks.is_empty() {
        writeln!(writer, "No tasks")?;
        return Ok(());
    }
    if args.archive {
        for task in &tasks {
            writeln!(writer, "{}", TaskLine { task, position: None })?;
        }
        return Ok(());
    }

    // Positions restart in every priority bucket; they are what `reorder`
    // and `drag` take.
    let mut position = 0;
    for (index, task) in tasks.iter().enumerate() {
        if index > 0 && tasks[index - 1].priority() != task.priority() {
            position = 0;
        }
        writeln!(
            writer,
            "{}",
            TaskLine {
                task,
                position: Some(position)
            }
        )?;
        position += 1;
    }
    Ok(())
}

fn handle_reorder<W: Write>(board: &mut TaskBoard, args: &ReorderArgs, mut writer: W) -> Result<()> {
    let writes = board.reorder(args.category, args.priority, args.from, args.to);
    if writes.is_empty() {
        writeln!(writer, "Nothing to reorder")?;
    } else {
        writeln!(writer, "Reordered {}", CountLine::new(writes.len(), "task"))?;
    }
    Ok(())
}

async fn handle_drag<W: Write>(board: &mut TaskBoard, args: &DragArgs, mut writer: W) -> Result<()> {
    let destination = Bucket::new(args.category, args.priority);
    let writes = board.drag_across(&args.id, destination, args.to).await;
    if writes.is_empty() {
        writeln!(writer, "Not moved: {}", args.id)?;
    } else {
        writeln!(writer, "Moved {} to {} at position {}", args.id, destination, args.to)?;
    }
    Ok(())
}

async fn handle_delete<W: Write>(board: &mut TaskBoard, args: &DeleteArgs, mut writer: W) -> Result<()> {
    let results = board.delete_many(&args.ids).await?;
    let summary = DeleteSummary::from_results(&results);
    summary.write_to(&mut writer)?;
    Ok(())
}

async fn handle_purge<W: Write>(board: &mut TaskBoard, args: &PurgeArgs, mut writer: W) -> Result<()> {
    if !args.yes {
        return Err(anyhow!("Refusing to delete every task without --yes"));
    }
    if board.delete_all().await? {
        writeln!(writer, "Deleted every task")?;
    } else {
        writeln!(writer, "Store refused to delete tasks")?;
    }
    Ok(())
}

fn write_moved<W: Write>(mut writer: W, id: &str, moved: Option<&Task>) -> Result<()> {
    match moved {
        Some(task) => writeln!(writer, "Moved {} to {}", task.id, task.bucket())?,
        None => writeln!(writer, "Not found: {id}")?,
    }
    Ok(())
}

struct TaskLine<'a> {
    task: &'a Task,
    position: Option<usize>,
}

impl fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.task;
        if let Some(position) = self.position {
            write!(f, "{:>2}. ", position)?;
        }
        let mark = if task.completed { "[x]" } else { "[ ]" };
        write!(f, "{} {:<6} {}", mark, task.priority().as_str(), task.text)?;
        if let Some(date) = task.date {
            write!(f, " (due {})", date)?;
        }
        write!(f, "  {}", task.id)
    }
}

struct CountLine<'a> {
    count: usize,
    noun: &'a str,
}

impl<'a> CountLine<'a> {
    fn new(count: usize, noun: &'a str) -> Self {
        Self { count, noun }
    }
}

impl fmt::Display for CountLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.count,
            self.noun,
            if self.count == 1 { "" } else { "s" }
        )
    }
}

struct DeleteSummary {
    deleted: usize,
    missing: Vec<String>,
}

impl DeleteSummary {
    fn from_results(results: &[DeleteResult]) -> Self {
        let mut deleted = 0usize;
        let mut missing = Vec::new();
        for result in results {
            if result.deleted {
                deleted += 1;
            } else {
                missing.push(result.id.clone());
            }
        }
        Self { deleted, missing }
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => write!(f, "Deleted {}", CountLine::new(*count, "task")),
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}
