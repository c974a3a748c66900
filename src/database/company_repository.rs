use std::sync::Arc;

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::manager::{Database, DatabaseError};
use super::models::{Company, CompanyChanges, NewCompany};

#[derive(Clone)]
pub struct CompanyRepository {
    db: Arc<Database>,
}

impl CompanyRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn find_all(&self, search: Option<&str>) -> Result<Vec<Company>, DatabaseError> {
        let pool = self.db.pool();
        let pattern = search.filter(|s| !s.is_empty()).map(|s| format!("%{}%", s));
        let pattern = pattern.as_deref();

        self.db
            .run("companies.find_all", move || async move {
                let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM companies");
                if let Some(pattern) = pattern {
                    query.push(" WHERE name ILIKE ").push_bind(pattern);
                }
                query.push(" ORDER BY name");
                query.build_query_as::<Company>().fetch_all(pool).await
            })
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("companies.find_by_id", move || async move {
                sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            })
            .await
    }

    pub async fn insert(&self, company: &NewCompany) -> Result<Company, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("companies.insert", move || async move {
                sqlx::query_as::<_, Company>(
                    "INSERT INTO companies (name, logo_url, timezone, subscription_tier, subscription_status, is_active) \
                     VALUES ($1, $2, $3, $4, $5, true) \
                     RETURNING *",
                )
                .bind(&company.name)
                .bind(&company.logo_url)
                .bind(&company.timezone)
                .bind(&company.subscription_tier)
                .bind(&company.subscription_status)
                .fetch_one(pool)
                .await
            })
            .await
    }

    pub async fn update(&self, id: Uuid, changes: &CompanyChanges) -> Result<Option<Company>, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("companies.update", move || async move {
                let mut query = QueryBuilder::<Postgres>::new("UPDATE companies SET ");
                let mut set = query.separated(", ");
                if let Some(name) = &changes.name {
                    set.push("name = ").push_bind_unseparated(name);
                }
                if let Some(logo_url) = &changes.logo_url {
                    set.push("logo_url = ").push_bind_unseparated(logo_url);
                }
                if let Some(timezone) = &changes.timezone {
                    set.push("timezone = ").push_bind_unseparated(timezone);
                }
                if let Some(tier) = &changes.subscription_tier {
                    set.push("subscription_tier = ").push_bind_unseparated(tier);
                }
                if let Some(status) = &changes.subscription_status {
                    set.push("subscription_status = ").push_bind_unseparated(status);
                }
                set.push("updated_at = CURRENT_TIMESTAMP");
                query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

                query.build_query_as::<Company>().fetch_optional(pool).await
            })
            .await
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<Company>, DatabaseError> {
        let pool = self.db.pool();

        self.db
            .run("companies.set_active", move || async move {
                sqlx::query_as::<_, Company>(
                    "UPDATE companies SET is_active = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
                )
                .bind(id)
                .bind(is_active)
                .fetch_optional(pool)
                .await
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let pool = self.db.pool();

        let result = self
            .db
            .run("companies.delete", move || async move {
                sqlx::query("DELETE FROM companies WHERE id = $1").bind(id).execute(pool).await
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
