use std::fmt;

use crate::model::{Category, Priority};

/// Normalized input for adding a task from any front end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub text: Vec<String>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub date: Option<String>,
}

impl TaskInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.split_whitespace().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn require_text(&self) -> Result<(), CaptureError> {
        if self.text.iter().all(|word| word.trim().is_empty()) {
            return Err(CaptureError::EmptyText);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    EmptyText,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::EmptyText => write!(f, "Task text cannot be empty"),
        }
    }
}

impl std::error::Error for CaptureError {}
