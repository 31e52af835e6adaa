use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Daily,
    Weekly,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::General, Category::Daily, Category::Weekly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Daily => "daily",
            Category::Weekly => "weekly",
        }
    }

    /// The daily category is a checklist: its view keeps completed items and it can be reset.
    pub fn is_checklist(&self) -> bool {
        matches!(self, Category::Daily)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Ok(Category::General),
            "daily" | "checklist" => Ok(Category::Daily),
            "weekly" => Ok(Category::Weekly),
            other => Err(anyhow!(
                "Unknown category '{}': expected general|daily|weekly",
                other
            )),
        }
    }
}

impl ValueEnum for Category {
    fn value_variants<'a>() -> &'a [Self] {
        &Category::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Display rank: high sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    /// Priority given to records written before priorities existed.
    pub fn legacy_default() -> Self {
        Priority::Low
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" | "1" => Ok(Priority::High),
            "medium" | "med" | "2" => Ok(Priority::Medium),
            "low" | "3" => Ok(Priority::Low),
            other => Err(anyhow!(
                "Unknown priority '{}': expected high|medium|low (or 1|2|3)",
                other
            )),
        }
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        &Priority::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

/// A (category, priority) pair. `order` values are only compared within one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub category: Category,
    pub priority: Priority,
}

impl Bucket {
    pub fn new(category: Category, priority: Priority) -> Self {
        Self { category, priority }
    }

    pub fn contains(&self, task: &Task) -> bool {
        task.category == self.category && task.priority() == self.priority
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.priority)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Missing on records written before priorities existed.
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn priority(&self) -> Priority {
        self.priority.unwrap_or_else(Priority::legacy_default)
    }

    pub fn order(&self) -> i64 {
        self.order.unwrap_or(0)
    }

    pub fn bucket(&self) -> Bucket {
        Bucket::new(self.category, self.priority())
    }

    /// Apply a partial update in place. The id is never touched.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(priority) = patch.priority {
            self.priority = Some(priority);
        }
        if let Some(order) = patch.order {
            self.order = Some(order);
        }
    }
}

/// Fields supplied by a caller when creating a task; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    pub completed: bool,
    pub category: Category,
    pub date: Option<NaiveDate>,
    pub priority: Priority,
    pub order: i64,
}

impl NewTask {
    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Task {
        Task {
            id,
            text: self.text,
            completed: self.completed,
            category: self.category,
            date: self.date,
            priority: Some(self.priority),
            order: Some(self.order),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. `date` is doubly optional so a patch can clear it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<Category>,
    pub date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub order: Option<i64>,
}

impl TaskPatch {
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Self::default()
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A pending `order` write produced by the ordering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWrite {
    pub id: String,
    pub order: i64,
    pub bucket: Option<Bucket>,
}

impl OrderWrite {
    pub fn new(id: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            order,
            bucket: None,
        }
    }

    pub fn patch(&self) -> TaskPatch {
        let mut patch = TaskPatch::order(self.order);
        if let Some(bucket) = self.bucket {
            patch.category = Some(bucket.category);
            patch.priority = Some(bucket.priority);
        }
        patch
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub id: String,
    pub deleted: bool,
}
