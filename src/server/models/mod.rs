pub mod todo;
pub mod user;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub use todo::{Todo, TodoFilter, TodoList, TodoPublic, TodoSchema, TodoState, TodoUpdate};
pub use user::{NewUser, User, UserList, UserPublic, UserSchema};

pub const DEFAULT_OFFSET: u32 = 0;
pub const DEFAULT_LIMIT: u32 = 100;

pub(crate) fn default_offset() -> u32 {
    DEFAULT_OFFSET
}

pub(crate) fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Offset/limit pagination read from the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct FilterPage {
    /// Number of records to skip
    #[serde(default = "default_offset")]
    pub offset: u32,
    /// Maximum number of records to return
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for FilterPage {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}
