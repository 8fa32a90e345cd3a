use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{default_limit, default_offset, FilterPage};

/// Lifecycle stage of a todo. Stored in the `state` column under the
/// `todostate` constraint using the same lowercase names as the JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TodoState {
    Draft,
    Todo,
    Doing,
    Done,
    Trash,
}

#[derive(Debug, Clone, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub state: TodoState,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TodoSchema {
    #[schema(example = "Buy milk")]
    pub title: String,
    pub description: String,
    pub state: TodoState,
}

/// Partial update, absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub state: Option<TodoState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TodoPublic {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub state: TodoState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoPublic {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            state: todo.state,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TodoList {
    pub todos: Vec<TodoPublic>,
}

/// Query string of the todo listing. Text filters match substrings,
/// `state` matches exactly.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TodoFilter {
    /// Only todos whose title contains this text
    pub title: Option<String>,
    /// Only todos whose description contains this text
    pub description: Option<String>,
    /// Only todos in this state
    pub state: Option<TodoState>,
    #[serde(default = "default_offset")]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl TodoFilter {
    pub fn page(&self) -> FilterPage {
        FilterPage {
            offset: self.offset,
            limit: self.limit,
        }
    }
}

impl Default for TodoFilter {
    fn default() -> Self {
        let page = FilterPage::default();
        Self {
            title: None,
            description: None,
            state: None,
            offset: page.offset,
            limit: page.limit,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_state_uses_lowercase_names() {
        let state: TodoState = serde_json::from_str(r#""doing""#).unwrap();
        assert_eq!(state, TodoState::Doing);
        assert_eq!(serde_json::to_string(&TodoState::Trash).unwrap(), r#""trash""#);

        assert!(serde_json::from_str::<TodoState>(r#""Doing""#).is_err());
        assert!(serde_json::from_str::<TodoState>(r#""invalid""#).is_err());
    }

    #[test]
    fn test_filter_defaults() {
        let filter: TodoFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.title.is_none());
        assert!(filter.state.is_none());
        assert_eq!(filter.page(), FilterPage::default());
        assert_eq!(filter.page().limit, 100);
    }

    #[test]
    fn test_update_only_carries_given_fields() {
        let update: TodoUpdate = serde_json::from_str(r#"{"title": "teste!"}"#).unwrap();
        assert_eq!(update.title.as_deref(), Some("teste!"));
        assert!(update.description.is_none());
        assert!(update.state.is_none());
    }
}
