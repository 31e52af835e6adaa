use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{StoreError, StoreResult, TaskStore};
use crate::model::{Category, NewTask, Priority, Task, TaskPatch};

const TABLE_PATH: &str = "rest/v1/todos";
/// PostgREST refuses an unfiltered DELETE; this id never exists.
const NIL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Hosted store: one row per task in a PostgREST `todos` table.
/// Ids and timestamps are assigned by the server.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    table_url: String,
}

#[derive(Debug, Deserialize)]
struct RemoteRow {
    id: String,
    text: String,
    #[serde(default)]
    completed: bool,
    category: Category,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    order: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RemoteRow> for Task {
    fn from(row: RemoteRow) -> Self {
        Task {
            id: row.id,
            text: row.text,
            completed: row.completed,
            category: row.category,
            date: row.date,
            priority: Some(row.priority.unwrap_or_else(Priority::legacy_default)),
            order: Some(row.order.unwrap_or(0)),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    text: &'a str,
    completed: bool,
    category: Category,
    date: Option<NaiveDate>,
    priority: Priority,
    order: i64,
}

impl RemoteStore {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).context("API key is not a valid header value")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("API key is not a valid header value")?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            table_url: format!("{}/{}", base_url.trim_end_matches('/'), TABLE_PATH),
        })
    }

    fn by_id(&self, builder: RequestBuilder, id: &str) -> RequestBuilder {
        builder.query(&[("id", format!("eq.{id}"))])
    }

    fn returning(builder: RequestBuilder) -> RequestBuilder {
        builder.header("Prefer", "return=representation")
    }
}

async fn rows(response: Response) -> StoreResult<Vec<RemoteRow>> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::Remote {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

fn patch_body(patch: &TaskPatch) -> Value {
    let mut body = Map::new();
    if let Some(text) = &patch.text {
        body.insert("text".into(), json!(text));
    }
    if let Some(completed) = patch.completed {
        body.insert("completed".into(), json!(completed));
    }
    if let Some(category) = patch.category {
        body.insert("category".into(), json!(category));
    }
    if let Some(date) = patch.date {
        body.insert("date".into(), json!(date));
    }
    if let Some(priority) = patch.priority {
        body.insert("priority".into(), json!(priority));
    }
    if let Some(order) = patch.order {
        body.insert("order".into(), json!(order));
    }
    body.insert("updated_at".into(), json!(Utc::now()));
    Value::Object(body)
}

#[async_trait]
impl TaskStore for RemoteStore {
    async fn list_all(&self) -> StoreResult<Vec<Task>> {
        let response = self
            .client
            .get(&self.table_url)
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        Ok(rows(response).await?.into_iter().map(Task::from).collect())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Option<Task>> {
        let request = self.client.get(&self.table_url).query(&[("select", "*")]);
        let response = self.by_id(request, id).send().await?;
        Ok(rows(response).await?.into_iter().next().map(Task::from))
    }

    async fn create(&self, task: NewTask) -> StoreResult<Task> {
        let row = InsertRow {
            text: &task.text,
            completed: task.completed,
            category: task.category,
            date: task.date,
            priority: task.priority,
            order: task.order,
        };
        let response = Self::returning(self.client.post(&self.table_url))
            .json(&[row])
            .send()
            .await?;
        let created = rows(response).await?.into_iter().next().ok_or_else(|| {
            StoreError::Remote {
                status: 200,
                message: "insert returned no rows".into(),
            }
        })?;
        tracing::debug!(id = created.id.as_str(), "remote store create");
        Ok(created.into())
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let request = Self::returning(self.client.patch(&self.table_url));
        let response = self
            .by_id(request, id)
            .json(&patch_body(&patch))
            .send()
            .await?;
        Ok(rows(response).await?.into_iter().next().map(Task::from))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let request = Self::returning(self.client.delete(&self.table_url));
        let response = self.by_id(request, id).send().await?;
        match rows(response).await {
            Ok(deleted) => Ok(!deleted.is_empty()),
            Err(StoreError::Remote { status, message }) => {
                tracing::warn!(id, status, message = message.as_str(), "remote delete failed");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn delete_all(&self) -> StoreResult<bool> {
        let response = self
            .client
            .delete(&self.table_url)
            .query(&[("id", format!("neq.{NIL_ID}"))])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), message = message.as_str(), "remote delete-all failed");
            return Ok(false);
        }
        Ok(true)
    }
}
