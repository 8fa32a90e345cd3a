pub mod sqlite;

use crate::server::models::{FilterPage, NewUser, Todo, TodoFilter, TodoSchema, TodoUpdate, User};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to execute query: {0}")]
    SqlError(sqlx::Error),

    #[error("failed to apply migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("username already registered")]
    UsernameTaken,

    #[error("email already registered")]
    EmailTaken,

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::Conflict(db_err.message().to_string())
            }
            err => Error::SqlError(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(async_fn_in_trait)]
pub trait DB: Send + Sync {
    // User methods
    async fn create_user(&self, user: &NewUser) -> Result<User>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self, page: &FilterPage) -> Result<Vec<User>>;
    async fn update_user(&self, id: i64, user: &NewUser) -> Result<User>;
    async fn delete_user(&self, id: i64) -> Result<bool>;

    // Todo methods, always scoped to the owning user
    async fn create_todo(&self, user_id: i64, todo: &TodoSchema) -> Result<Todo>;
    async fn list_todos(&self, user_id: i64, filter: &TodoFilter) -> Result<Vec<Todo>>;
    async fn update_todo(
        &self,
        user_id: i64,
        todo_id: i64,
        update: &TodoUpdate,
    ) -> Result<Option<Todo>>;
    async fn delete_todo(&self, user_id: i64, todo_id: i64) -> Result<bool>;
}
