//! Board Models
//!
//! Data structures matching the backend tables.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A row type stored in one backend table
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Backend table holding rows of this type
    const TABLE: &'static str;

    /// Returns the row's unique identifier
    fn id(&self) -> &str;
}

/// Board data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// Column data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub board_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Task data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub column_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Subtask data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Board {
    const TABLE: &'static str = "boards";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Column {
    const TABLE: &'static str = "columns";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Task {
    const TABLE: &'static str = "tasks";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Subtask {
    const TABLE: &'static str = "subtasks";

    fn id(&self) -> &str {
        &self.id
    }
}

// ========================
// Insert Payloads
// ========================

#[derive(Debug, Serialize)]
pub struct NewBoard<'a> {
    pub title: &'a str,
    pub owner_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewColumn<'a> {
    pub title: &'a str,
    pub board_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NewTask<'a> {
    pub title: &'a str,
    pub column_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct NewSubtask<'a> {
    pub title: &'a str,
    pub task_id: &'a str,
    pub is_completed: bool,
}

// ========================
// Partial Updates
// ========================

/// Partial task patch; only the fields that are set are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
}

impl TaskUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_column(mut self, column_id: impl Into<String>) -> Self {
        self.column_id = Some(column_id.into());
        self
    }
}

/// Partial subtask patch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

// ========================
// Session
// ========================

/// Authenticated user as reported by the session provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Option<String>,
    pub access_token: Option<String>,
}

impl Session {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_row_with_nulls() {
        let row = json!({
            "id": "t1",
            "title": "Write docs",
            "description": null,
            "status": null,
            "column_id": "c1",
            "created_at": "2024-03-01T10:00:00.123456+00:00"
        });
        let task: Task = serde_json::from_value(row).unwrap();
        assert_eq!(task.column_id, "c1");
        assert!(task.description.is_none());
        assert!(task.created_at.is_some());
    }

    #[test]
    fn test_column_row_without_created_at() {
        let column: Column =
            serde_json::from_value(json!({"id": "c1", "title": "Todo", "board_id": "b1"})).unwrap();
        assert_eq!(column.created_at, None);
        assert_eq!(column.id(), "c1");
    }

    #[test]
    fn test_task_update_sends_only_set_fields() {
        let patch = serde_json::to_value(TaskUpdate::title("x").with_column("c2")).unwrap();
        assert_eq!(patch, json!({"title": "x", "column_id": "c2"}));
    }

    #[test]
    fn test_new_subtask_starts_incomplete() {
        let row = serde_json::to_value(NewSubtask {
            title: "Check",
            task_id: "t1",
            is_completed: false,
        })
        .unwrap();
        assert_eq!(row["is_completed"], json!(false));
    }

    #[test]
    fn test_session_authentication() {
        assert!(!Session::default().is_authenticated());
        assert!(Session::signed_in("user-1").is_authenticated());
    }
}
