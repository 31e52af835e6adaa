pub mod auth;
pub mod board;
pub mod capture;
pub mod config;
pub mod debounce;
pub mod model;
pub mod ordering;
pub mod parser;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{Auth, AuthError, Session};
pub use board::TaskBoard;
pub use capture::TaskInput;
pub use config::{AppConfig, Backend};
pub use debounce::{FlushReport, ReorderDebouncer, REORDER_QUIET_PERIOD};
pub use model::*;
pub use store::{open_store, LocalStore, RemoteStore, StoreError, TaskStore};
