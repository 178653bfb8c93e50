//! PostgreSQL store: catalog-driven SQL executed through a shared sqlx pool.

use super::{Row, Store, StoreError};
use crate::clock::format_timestamp;
use crate::config::{ColumnKind, Operation, ResolvedEntity};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn bind(q: &QueryBuf) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    async fn fetch_optional(&self, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Option<Row>, StoreError> {
        let row = Self::bind(q).fetch_optional(&self.pool).await.map_err(classify)?;
        row.map(|r| row_to_json(entity, &r)).transpose()
    }
}

/// Constraint violations keep the server's message; everything else stays a database error.
fn classify(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.constraint().is_some() {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Database(e)
}

fn row_to_json(entity: &ResolvedEntity, row: &PgRow) -> Result<Row, StoreError> {
    use sqlx::Row as _;
    let mut map = Row::new();
    for col in &entity.columns {
        let name = col.name.as_str();
        let value = match &col.kind {
            ColumnKind::Uuid => row
                .try_get::<Option<Uuid>, _>(name)?
                .map(|u| Value::String(u.to_string())),
            ColumnKind::Text | ColumnKind::Enum(_) => {
                row.try_get::<Option<String>, _>(name)?.map(Value::String)
            }
            ColumnKind::Integer => row.try_get::<Option<i32>, _>(name)?.map(Value::from),
            ColumnKind::Double => row.try_get::<Option<f64>, _>(name)?.map(Value::from),
            ColumnKind::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
            ColumnKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(|ts| Value::String(format_timestamp(&ts))),
        };
        map.insert(col.name.clone(), value.unwrap_or(Value::Null));
    }
    Ok(map)
}

#[async_trait]
impl Store for PgStore {
    async fn insert(&self, entity: &ResolvedEntity, row: Row) -> Result<Row, StoreError> {
        let q = sql::insert(entity, &self.schema, &row);
        self.fetch_optional(entity, &q)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn find_by_id(&self, entity: &ResolvedEntity, id: &str) -> Result<Option<Row>, StoreError> {
        if Uuid::try_parse(id).is_err() {
            return Ok(None);
        }
        let q = sql::select_by_id(entity, &self.schema, id);
        self.fetch_optional(entity, &q).await
    }

    async fn find_all(
        &self,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
    ) -> Result<Vec<Row>, StoreError> {
        let q = sql::select_list(entity, &self.schema, filters);
        let rows = Self::bind(&q).fetch_all(&self.pool).await.map_err(classify)?;
        rows.iter().map(|r| row_to_json(entity, r)).collect()
    }

    async fn update(&self, entity: &ResolvedEntity, id: &str, changes: Row) -> Result<Row, StoreError> {
        let not_found = StoreError::RecordNotFound {
            operation: Operation::Update,
        };
        if Uuid::try_parse(id).is_err() {
            return Err(not_found);
        }
        let q = sql::update(entity, &self.schema, id, &changes);
        self.fetch_optional(entity, &q).await?.ok_or(not_found)
    }

    async fn delete(&self, entity: &ResolvedEntity, id: &str) -> Result<(), StoreError> {
        let not_found = StoreError::RecordNotFound {
            operation: Operation::Delete,
        };
        if Uuid::try_parse(id).is_err() {
            return Err(not_found);
        }
        let q = sql::delete(entity, &self.schema, id);
        let deleted = Self::bind(&q).fetch_optional(&self.pool).await.map_err(classify)?;
        deleted.map(|_| ()).ok_or(not_found)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Create the target database when it does not exist yet (connects to the `postgres` admin database).
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let invalid = || sqlx::Error::Configuration("DATABASE_URL has no database path".into());
    let scheme_end = url.find("://").ok_or_else(invalid)? + 3;
    let path_start = url[scheme_end..].find('/').ok_or_else(invalid)? + scheme_end + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, query)) => (name, Some(query)),
        None => (path_and_query, None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(query) => format!("{}postgres?{}", base, query),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.trim().to_string()))
}
