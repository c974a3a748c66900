use std::sync::Arc;

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::manager::{Database, DatabaseError};
use super::models::{User, UserChanges, UserCredentials};

const USER_COLUMNS: &str = "u.id, u.company_id, u.email, u.full_name, u.role_id, u.department_id, \
     u.avatar_url, u.phone, u.is_active, u.created_at, u.updated_at, \
     r.name AS role_name, d.name AS department_name";

const USER_JOINS: &str = "FROM users u \
     JOIN roles r ON u.role_id = r.id \
     JOIN departments d ON u.department_id = d.id";

const RETURNING_USER: &str = "RETURNING id, company_id, email, full_name, role_id, department_id, \
     avatar_url, phone, is_active, created_at, updated_at";

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct UserInsert {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role_id: Uuid,
    pub department_id: Uuid,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// All users with role and department names, optionally filtered by a
    /// case-insensitive match on full name or email.
    pub async fn find_all(&self, search: Option<&str>) -> Result<Vec<User>, DatabaseError> {
        let pool = self.db.pool();
        let pattern = search.filter(|s| !s.is_empty()).map(|s| format!("%{}%", s));
        let pattern = pattern.as_deref();

        self.db
            .run("users.find_all", move || async move {
                let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} {}", USER_COLUMNS, USER_JOINS));
                if let Some(pattern) = pattern {
                    query
                        .push(" WHERE u.full_name ILIKE ")
                        .push_bind(pattern)
                        .push(" OR u.email ILIKE ")
                        .push_bind(pattern);
                }
                query.push(" ORDER BY u.created_at DESC");
                query.build_query_as::<User>().fetch_all(pool).await
            })
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let pool = self.db.pool();
        let sql = format!("SELECT {} {} WHERE u.id = $1", USER_COLUMNS, USER_JOINS);
        let sql = sql.as_str();

        self.db
            .run("users.find_by_id", move || async move {
                sqlx::query_as::<_, User>(sql).bind(id).fetch_optional(pool).await
            })
            .await
    }

    pub async fn find_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("users.find_credentials_by_email", move || async move {
                sqlx::query_as::<_, UserCredentials>(
                    "SELECT u.id, u.email, u.password_hash, u.full_name, u.phone, u.avatar_url, u.is_active, \
                     u.role_id, r.name AS role_name, u.company_id, c.name AS company_name, \
                     u.department_id, d.name AS department_name \
                     FROM users u \
                     JOIN roles r ON u.role_id = r.id \
                     JOIN companies c ON u.company_id = c.id \
                     JOIN departments d ON u.department_id = d.id \
                     WHERE u.email = $1",
                )
                .bind(email)
                .fetch_optional(pool)
                .await
            })
            .await
    }

    /// `Ok(None)` when the user does not exist, `Ok(Some(None))` when it has
    /// no password set.
    pub async fn find_password_hash(&self, id: Uuid) -> Result<Option<Option<String>>, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("users.find_password_hash", move || async move {
                sqlx::query_scalar::<_, Option<String>>("SELECT password_hash FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            })
            .await
    }

    pub async fn insert(&self, user: &UserInsert) -> Result<User, DatabaseError> {
        let pool = self.db.pool();
        let sql = format!(
            "INSERT INTO users (id, company_id, email, password_hash, full_name, role_id, department_id, \
             avatar_url, phone, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP) {}",
            RETURNING_USER
        );
        let sql = sql.as_str();

        self.db
            .run("users.insert", move || async move {
                sqlx::query_as::<_, User>(sql)
                    .bind(user.id)
                    .bind(user.company_id)
                    .bind(&user.email)
                    .bind(&user.password_hash)
                    .bind(&user.full_name)
                    .bind(user.role_id)
                    .bind(user.department_id)
                    .bind(&user.avatar_url)
                    .bind(&user.phone)
                    .bind(user.is_active)
                    .fetch_one(pool)
                    .await
            })
            .await
    }

    pub async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<Option<User>, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("users.update", move || async move {
                let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET ");
                let mut set = query.separated(", ");
                if let Some(company_id) = changes.company_id {
                    set.push("company_id = ").push_bind_unseparated(company_id);
                }
                if let Some(department_id) = changes.department_id {
                    set.push("department_id = ").push_bind_unseparated(department_id);
                }
                if let Some(email) = &changes.email {
                    set.push("email = ").push_bind_unseparated(email);
                }
                if let Some(full_name) = &changes.full_name {
                    set.push("full_name = ").push_bind_unseparated(full_name);
                }
                if let Some(phone) = &changes.phone {
                    set.push("phone = ").push_bind_unseparated(phone);
                }
                set.push("updated_at = CURRENT_TIMESTAMP");
                query.push(" WHERE id = ").push_bind(id).push(" ").push(RETURNING_USER);

                query.build_query_as::<User>().fetch_optional(pool).await
            })
            .await
    }

    pub async fn role_exists(&self, role_id: Uuid) -> Result<bool, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("roles.exists", move || async move {
                sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1)")
                    .bind(role_id)
                    .fetch_one(pool)
                    .await
            })
            .await
    }

    pub async fn update_role(&self, id: Uuid, role_id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.set_column("users.update_role", "role_id", id, role_id).await
    }

    pub async fn update_is_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>, DatabaseError> {
        self.set_column("users.update_is_active", "is_active", id, is_active).await
    }

    pub async fn update_avatar_url(&self, id: Uuid, avatar_url: &str) -> Result<Option<User>, DatabaseError> {
        self.set_column("users.update_avatar_url", "avatar_url", id, avatar_url.to_string())
            .await
    }

    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<Option<User>, DatabaseError> {
        self.set_column("users.update_password", "password_hash", id, password_hash.to_string())
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let pool = self.db.pool();

        let result = self
            .db
            .run("users.delete", move || async move {
                sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Single-column update. `column` is always one of the literals above.
    async fn set_column<V>(&self, label: &str, column: &'static str, id: Uuid, value: V) -> Result<Option<User>, DatabaseError>
    where
        V: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Clone + Send + Sync + 'static,
    {
        let pool = self.db.pool();
        let sql = format!(
            "UPDATE users SET {} = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1 {}",
            column, RETURNING_USER
        );
        let sql = sql.as_str();
        let value = &value;

        self.db
            .run(label, move || async move {
                sqlx::query_as::<_, User>(sql)
                    .bind(id)
                    .bind(value.clone())
                    .fetch_optional(pool)
                    .await
            })
            .await
    }
}
