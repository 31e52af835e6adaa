pub use punchlist_cli::cli;
pub use punchlist_cli::commands;
pub use punchlist_cli::config;
pub use punchlist_cli::logging;
pub use punchlist_cli::AppConfig;

pub use punchlist_core as core;
pub use punchlist_core::board;
pub use punchlist_core::capture;
pub use punchlist_core::model;
pub use punchlist_core::ordering;
pub use punchlist_core::store;
