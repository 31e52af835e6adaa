pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use punchlist_core as core;
pub use punchlist_core::capture;
pub use punchlist_core::model;

pub use punchlist_core::AppConfig;
