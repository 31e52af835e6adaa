use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};

use crate::capture::TaskInput;
use crate::model::{Category, Priority};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "punchlist",
    version,
    about = "A shared to-do list with prioritized buckets and a daily checklist.",
    after_help = "Examples:\n  punchlist login\n  punchlist add Pay rent p:high due:fri\n  punchlist list --category daily\n  punchlist reorder --category general --priority high 3 0\n  punchlist delete 01HZ..."
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the tracing filter (e.g. "info", "debug", or full directives)
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Unlock the list for 24 hours with the shared password
    Login(LoginArgs),
    /// Forget the current session
    Logout,
    /// Add a task to the end of its bucket
    Add(AddArgs),
    /// Show one category, the daily checklist, or the archive
    List(ListArgs),
    /// Flip a task between open and completed
    Toggle(IdArg),
    /// Replace a task's text
    Edit(EditArgs),
    /// Change priority; the task moves to the end of the new bucket
    Priority(PriorityArgs),
    /// Change category; the task moves to the end of the new bucket
    Move(MoveArgs),
    /// Reorder inside one bucket by display position
    Reorder(ReorderArgs),
    /// Drop a task into another bucket at a display position
    Drag(DragArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Delete every completed task outside the daily checklist
    ClearCompleted,
    /// Untick every completed checklist item
    ResetChecklist,
    /// Delete every task
    Purge(PurgeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Password to check (prompted on stdin when omitted)
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task text with optional inline tokens (p:, due:)
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Category (general, daily, weekly); defaults to general
    #[arg(long, value_enum)]
    pub category: Option<Category>,

    /// Priority (high, medium, low); overrides an inline p: token
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Set date (ISO e.g. 2025-12-24, today, +3d, mon)
    #[arg(long = "due", value_name = "DATE")]
    pub date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Category to show; the daily checklist keeps completed items
    #[arg(long, value_enum, default_value_t = Category::General, conflicts_with = "archive")]
    pub category: Category,

    /// Show completed tasks instead
    #[arg(long)]
    pub archive: bool,

    /// Print tasks as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IdArg {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PriorityArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(value_name = "LEVEL", value_enum)]
    pub priority: Priority,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(value_name = "CATEGORY", value_enum)]
    pub category: Category,
}

#[derive(Args, Debug, Clone)]
pub struct ReorderArgs {
    #[arg(long, value_enum)]
    pub category: Category,

    #[arg(long, value_enum)]
    pub priority: Priority,

    /// Current position in the bucket (0-based)
    #[arg(value_name = "FROM", value_parser = value_parser!(usize))]
    pub from: usize,

    /// Target position in the bucket (0-based)
    #[arg(value_name = "TO", value_parser = value_parser!(usize))]
    pub to: usize,
}

#[derive(Args, Debug, Clone)]
pub struct DragArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// Destination category
    #[arg(long, value_enum)]
    pub category: Category,

    /// Destination priority
    #[arg(long, value_enum)]
    pub priority: Priority,

    /// Position in the destination bucket (0-based)
    #[arg(value_name = "TO", value_parser = value_parser!(usize))]
    pub to: usize,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete (shown by `punchlist list`)
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PurgeArgs {
    /// Confirm deleting every task
    #[arg(long)]
    pub yes: bool,
}

impl From<&AddArgs> for TaskInput {
    fn from(args: &AddArgs) -> Self {
        TaskInput {
            text: args.text.clone(),
            category: args.category,
            priority: args.priority,
            date: args.date.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reorder_positions() {
        let cli = Cli::try_parse_from([
            "punchlist",
            "reorder",
            "--category",
            "general",
            "--priority",
            "high",
            "3",
            "0",
        ])
        .expect("parse");
        match cli.command {
            CliCommand::Reorder(args) => {
                assert_eq!(args.category, Category::General);
                assert_eq!(args.priority, Priority::High);
                assert_eq!((args.from, args.to), (3, 0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn list_defaults_to_general() {
        let cli = Cli::try_parse_from(["punchlist", "list"]).expect("parse");
        match cli.command {
            CliCommand::List(args) => {
                assert_eq!(args.category, Category::General);
                assert!(!args.archive);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn add_args_carry_explicit_fields() {
        let cli = Cli::try_parse_from([
            "punchlist", "--data-dir", "/tmp/x", "add", "Stretch", "--category", "daily",
        ])
        .expect("parse");
        let CliCommand::Add(args) = cli.command else {
            panic!("expected add");
        };
        let input = TaskInput::from(&args);
        assert_eq!(input.text, vec!["Stretch".to_string()]);
        assert_eq!(input.category, Some(Category::Daily));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }
}
