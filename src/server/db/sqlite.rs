use std::{str::FromStr, time::Duration};

use chrono::Utc;
use sqlx::{
    migrate::Migrator,
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};

use super::{Error, Result, DB};
use crate::server::models::{FilterPage, NewUser, Todo, TodoFilter, TodoSchema, TodoUpdate, User};

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct SqlDB {
    pool: SqlitePool,
}

impl SqlDB {
    /// Open (creating if missing) the database at `database_url`.
    /// In-memory databases live as long as their single connection, so the
    /// pool is pinned to one connection that never expires.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_opts.connect_with(opts).await?;
        log::debug!("connected to database at {}", database_url);

        Ok(Self { pool })
    }

    /// Apply all pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        log::info!("Database schema is up to date");
        Ok(())
    }

    /// Revert every applied migration newer than `target`.
    pub async fn revert(&self, target: i64) -> Result<()> {
        MIGRATOR.undo(&self.pool, target).await?;
        log::info!("Database schema reverted to version {}", target);
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl DB for SqlDB {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let existing: Vec<User> = query_as("SELECT * FROM users WHERE username = ? OR email = ?")
            .bind(&user.username)
            .bind(&user.email)
            .fetch_all(&self.pool)
            .await?;

        if existing.iter().any(|u| u.username == user.username) {
            return Err(Error::UsernameTaken);
        }
        if !existing.is_empty() {
            return Err(Error::EmailTaken);
        }

        // a concurrent registration can still take the name between the
        // lookup and the insert, the unique index decides then
        let created = query_as(
            "INSERT INTO users (username, email, password, created_at) VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match Error::from(err) {
            Error::Conflict(msg) if msg.contains("users.username") => Error::UsernameTaken,
            Error::Conflict(msg) if msg.contains("users.email") => Error::EmailTaken,
            err => err,
        })?;

        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn list_users(&self, page: &FilterPage) -> Result<Vec<User>> {
        let users = query_as("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn update_user(&self, id: i64, user: &NewUser) -> Result<User> {
        let updated = query_as(
            "UPDATE users SET username = ?, email = ?, password = ? WHERE id = ? RETURNING *",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let result = query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_todo(&self, user_id: i64, todo: &TodoSchema) -> Result<Todo> {
        let now = Utc::now();
        let created = query_as(
            "INSERT INTO todos (title, description, state, user_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.state)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn list_todos(&self, user_id: i64, filter: &TodoFilter) -> Result<Vec<Todo>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM todos WHERE user_id = ");
        builder.push_bind(user_id);

        // instr keeps the match a plain, case sensitive substring test
        if let Some(title) = &filter.title {
            builder.push(" AND instr(title, ").push_bind(title.as_str()).push(") > 0");
        }
        if let Some(description) = &filter.description {
            builder
                .push(" AND instr(description, ")
                .push_bind(description.as_str())
                .push(") > 0");
        }
        if let Some(state) = filter.state {
            builder.push(" AND state = ").push_bind(state);
        }

        let page = filter.page();
        builder
            .push(" ORDER BY id LIMIT ")
            .push_bind(page.limit as i64)
            .push(" OFFSET ")
            .push_bind(page.offset as i64);

        let todos = builder
            .build_query_as::<Todo>()
            .fetch_all(&self.pool)
            .await?;

        Ok(todos)
    }

    async fn update_todo(
        &self,
        user_id: i64,
        todo_id: i64,
        update: &TodoUpdate,
    ) -> Result<Option<Todo>> {
        let updated = query_as(
            "UPDATE todos SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                state = COALESCE(?, state),
                updated_at = ?
             WHERE id = ? AND user_id = ? RETURNING *",
        )
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.state)
        .bind(Utc::now())
        .bind(todo_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_todo(&self, user_id: i64, todo_id: i64) -> Result<bool> {
        let result = query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(todo_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::server::models::TodoState;

    async fn memory_db() -> SqlDB {
        let db = SqlDB::new("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password: "hashed".into(),
        }
    }

    fn new_todo(title: &str, description: &str, state: TodoState) -> TodoSchema {
        TodoSchema {
            title: title.into(),
            description: description.into(),
            state,
        }
    }

    async fn table_exists(db: &SqlDB, name: &str) -> bool {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(db.pool())
                .await
                .unwrap();
        count > 0
    }

    #[tokio::test]
    async fn test_migrations_revert_and_reapply() {
        let db = memory_db().await;
        assert!(table_exists(&db, "users").await);
        assert!(table_exists(&db, "todos").await);

        db.revert(20250321000000).await.unwrap();
        assert!(table_exists(&db, "users").await);
        assert!(!table_exists(&db, "todos").await);

        db.revert(0).await.unwrap();
        assert!(!table_exists(&db, "users").await);

        db.migrate().await.unwrap();
        assert!(table_exists(&db, "todos").await);
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicates() {
        let db = memory_db().await;
        let alice = db.create_user(&new_user("alice", "alice@example.com")).await.unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(alice.username, "alice");

        let err = db
            .create_user(&new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UsernameTaken));

        let err = db
            .create_user(&new_user("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmailTaken));

        let found = db.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.email, "alice@example.com");
        assert!(db.get_user(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_registrations_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("todos.db").display());
        let db = SqlDB::new(&url, 8).await.unwrap();
        db.migrate().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..40 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.create_user(&new_user(&format!("user{i}"), &format!("user{i}@example.com")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let users = db
            .list_users(&FilterPage {
                offset: 0,
                limit: 100,
            })
            .await
            .unwrap();
        assert_eq!(users.len(), 40);

        // racing on the same username leaves exactly one winner
        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.create_user(&new_user("carol", &format!("carol{i}@example.com")))
                    .await
            }));
        }
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, Error::UsernameTaken), "{err}"),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_update_user_conflict_and_missing() {
        let db = memory_db().await;
        let alice = db.create_user(&new_user("alice", "alice@example.com")).await.unwrap();
        db.create_user(&new_user("bob", "bob@example.com")).await.unwrap();

        let err = db
            .update_user(alice.id, &new_user("alice", "bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = db
            .update_user(99, &new_user("carol", "carol@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));

        let updated = db
            .update_user(alice.id, &new_user("alice2", "alice2@example.com"))
            .await
            .unwrap();
        assert_eq!(updated.username, "alice2");
    }

    #[tokio::test]
    async fn test_list_users_pagination() {
        let db = memory_db().await;
        for i in 0..5 {
            db.create_user(&new_user(&format!("user{i}"), &format!("user{i}@example.com")))
                .await
                .unwrap();
        }

        let users = db
            .list_users(&FilterPage {
                offset: 1,
                limit: 2,
            })
            .await
            .unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["user1", "user2"]);
    }

    #[tokio::test]
    async fn test_list_todos_filters() {
        let db = memory_db().await;
        let alice = db.create_user(&new_user("alice", "alice@example.com")).await.unwrap();
        let bob = db.create_user(&new_user("bob", "bob@example.com")).await.unwrap();

        db.create_todo(alice.id, &new_todo("Test todo combined", "combined description", TodoState::Done))
            .await
            .unwrap();
        db.create_todo(alice.id, &new_todo("Other title", "combined description", TodoState::Todo))
            .await
            .unwrap();
        db.create_todo(alice.id, &new_todo("test lowercase", "other", TodoState::Done))
            .await
            .unwrap();
        db.create_todo(bob.id, &new_todo("Test todo combined", "combined description", TodoState::Done))
            .await
            .unwrap();

        let all = db.list_todos(alice.id, &TodoFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|t| t.user_id == alice.id));

        let filter = TodoFilter {
            title: Some("Test".into()),
            ..TodoFilter::default()
        };
        let todos = db.list_todos(alice.id, &filter).await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Test todo combined");

        let filter = TodoFilter {
            description: Some("combined".into()),
            state: Some(TodoState::Done),
            ..TodoFilter::default()
        };
        let todos = db.list_todos(alice.id, &filter).await.unwrap();
        assert_eq!(todos.len(), 1);

        let filter = TodoFilter {
            title: Some("%".into()),
            ..TodoFilter::default()
        };
        assert!(db.list_todos(alice.id, &filter).await.unwrap().is_empty());

        let filter = TodoFilter {
            offset: 1,
            limit: 1,
            ..TodoFilter::default()
        };
        let todos = db.list_todos(alice.id, &filter).await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Other title");
    }

    #[tokio::test]
    async fn test_update_and_delete_todo_are_scoped_to_owner() {
        let db = memory_db().await;
        let alice = db.create_user(&new_user("alice", "alice@example.com")).await.unwrap();
        let bob = db.create_user(&new_user("bob", "bob@example.com")).await.unwrap();
        let todo = db
            .create_todo(alice.id, &new_todo("title", "description", TodoState::Draft))
            .await
            .unwrap();

        let update = TodoUpdate {
            state: Some(TodoState::Doing),
            ..TodoUpdate::default()
        };
        assert!(db.update_todo(bob.id, todo.id, &update).await.unwrap().is_none());
        assert!(!db.delete_todo(bob.id, todo.id).await.unwrap());

        let updated = db.update_todo(alice.id, todo.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.state, TodoState::Doing);
        assert_eq!(updated.title, "title");
        assert_eq!(updated.description, "description");
        assert!(updated.updated_at >= todo.updated_at);

        assert!(db.delete_todo(alice.id, todo.id).await.unwrap());
        assert!(!db.delete_todo(alice.id, todo.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_user_removes_todos() {
        let db = memory_db().await;
        let alice = db.create_user(&new_user("alice", "alice@example.com")).await.unwrap();
        db.create_todo(alice.id, &new_todo("title", "description", TodoState::Todo))
            .await
            .unwrap();

        assert!(db.delete_user(alice.id).await.unwrap());
        assert!(!db.delete_user(alice.id).await.unwrap());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM todos")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
