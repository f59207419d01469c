use anyhow::Context;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder, Row};

use crate::model::{
    document_id, generate_id, value_as_key, Collection, Document, FilterCondition, FilterQuery,
    FindOptions, SortDirection, ID_FIELD,
};
use crate::store::traits::{DocumentStore, StoreError};

const UNIQUE_VIOLATION: &str = "23505";
/// Text that parses as a floating point number.
const NUMERIC_TEXT: &str = r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$";

/// Documents of every collection in one JSONB table.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the documents table and per-collection unique indexes if missing.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq BIGSERIAL PRIMARY KEY,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create documents table")?;

        for collection in Collection::ALL {
            for field in collection.unique_fields() {
                let statement = format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS documents_{coll}_{field}_key \
                     ON documents ((body->>'{field}')) WHERE collection = '{coll}'",
                    coll = collection.name(),
                    field = field,
                );
                sqlx::query(&statement)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Failed to create unique index on {collection}.{field}"))?;
            }
        }

        log::info!("documents table ready");
        Ok(())
    }

    /// Append every condition as a bound predicate. Equality matches the raw
    /// value as a string, number or boolean, and as an element of an array.
    /// Range bounds only hold for numbers and numeric strings.
    fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, conditions: &[FilterQuery]) {
        for query in conditions {
            for (field, condition) in query.iter() {
                let path = field_path(field);
                match condition {
                    FilterCondition::Equals(raw) => {
                        builder.push(" AND (");
                        for (i, candidate) in equality_candidates(raw).into_iter().enumerate() {
                            if i > 0 {
                                builder.push(" OR ");
                            }
                            builder.push("(body #> ");
                            builder.push_bind(path.clone());
                            builder.push(") @> ");
                            builder.push_bind(Json(candidate));
                        }
                        builder.push(")");
                    }
                    FilterCondition::Range(bounds) => {
                        for (op, bound) in bounds {
                            if bound.is_nan() {
                                builder.push(" AND FALSE");
                                continue;
                            }
                            // The cast only runs once the value is known to be numeric.
                            builder.push(" AND (CASE WHEN (CASE jsonb_typeof(body #> ");
                            builder.push_bind(path.clone());
                            builder.push(") WHEN 'number' THEN TRUE WHEN 'string' THEN (body #>> ");
                            builder.push_bind(path.clone());
                            builder.push(") ~ ");
                            builder.push_bind(NUMERIC_TEXT);
                            builder.push(" ELSE FALSE END) THEN (body #>> ");
                            builder.push_bind(path.clone());
                            builder.push(")::double precision ");
                            builder.push(op.sql_operator());
                            builder.push(" ");
                            builder.push_bind(*bound);
                            builder.push(" ELSE FALSE END)");
                        }
                    }
                }
            }
        }
    }

    fn duplicate_error(collection: Collection, document: &Document) -> StoreError {
        let field = collection.unique_fields().first().copied().unwrap_or(ID_FIELD);
        let value = document
            .get(field)
            .and_then(value_as_key)
            .unwrap_or_default();
        StoreError::Duplicate {
            field: field.to_string(),
            value,
        }
    }

    fn is_unique_violation(error: &sqlx::Error) -> bool {
        matches!(error, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
    }
}

fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

/// JSON values a raw `=` operand stands for: always the string itself, plus
/// the number or boolean it spells.
fn equality_candidates(raw: &str) -> Vec<Value> {
    let mut candidates = vec![Value::String(raw.to_string())];
    if let Some(number) = raw
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        candidates.push(Value::Number(number));
    }
    if let Ok(flag) = raw.parse::<bool>() {
        candidates.push(Value::Bool(flag));
    }
    candidates
}

fn body_of(row: &sqlx::postgres::PgRow, collection: Collection) -> Result<Document, StoreError> {
    let Json(body): Json<Value> = row.try_get("body").context("Failed to read document body")?;
    match body {
        Value::Object(document) => Ok(collection.redact(document)),
        other => Err(StoreError::Backend(anyhow::anyhow!(
            "Stored {collection} document is not an object: {other}"
        ))),
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresStore {
    async fn find(
        &self,
        collection: Collection,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE collection = ");
        builder.push_bind(collection.name());
        Self::push_conditions(&mut builder, &options.conditions);

        builder.push(" ORDER BY ");
        for key in &options.sort {
            builder.push("body #> ");
            builder.push_bind(field_path(&key.field));
            builder.push(match key.direction {
                SortDirection::Asc => " ASC NULLS FIRST, ",
                SortDirection::Desc => " DESC NULLS LAST, ",
            });
        }
        builder.push("seq");

        if let Some(limit) = options.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if options.skip > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(i64::try_from(options.skip).unwrap_or(i64::MAX));
        }

        log::debug!("{}: {}", collection, builder.sql());

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to query {collection}"))?;

        rows.iter().map(|row| body_of(row, collection)).collect()
    }

    async fn find_where_in(
        &self,
        collection: Collection,
        field: &str,
        values: &[String],
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            "SELECT body FROM documents WHERE collection = $1 AND body #>> $2 = ANY($3) ORDER BY seq",
        )
        .bind(collection.name())
        .bind(field_path(field))
        .bind(values)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to look up {collection} by {field}"))?;

        rows.iter().map(|row| body_of(row, collection)).collect()
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {collection} document"))?;

        row.map(|row| body_of(&row, collection)).transpose()
    }

    async fn estimated_count(
        &self,
        collection: Collection,
        conditions: &[FilterQuery],
    ) -> Result<u64, StoreError> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM documents WHERE collection = ");
        builder.push_bind(collection.name());
        Self::push_conditions(&mut builder, conditions);

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {collection}"))?;
        let total: i64 = row.try_get("total").context("Failed to read count")?;

        Ok(total.max(0) as u64)
    }

    async fn insert(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<Document, StoreError> {
        let id = document_id(&document)
            .map(str::to_string)
            .unwrap_or_else(generate_id);
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let result = sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) RETURNING body",
        )
        .bind(collection.name())
        .bind(&id)
        .bind(Json(Value::Object(document.clone())))
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => body_of(&row, collection),
            Err(error) if Self::is_unique_violation(&error) => {
                Err(Self::duplicate_error(collection, &document))
            }
            Err(error) => Err(anyhow::Error::new(error)
                .context(format!("Failed to insert {collection} document"))
                .into()),
        }
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET body = body || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            RETURNING body
            "#,
        )
        .bind(collection.name())
        .bind(id)
        .bind(Json(Value::Object(changes.clone())))
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row.map(|row| body_of(&row, collection)).transpose(),
            Err(error) if Self::is_unique_violation(&error) => {
                Err(Self::duplicate_error(collection, &changes))
            }
            Err(error) => Err(anyhow::Error::new(error)
                .context(format!("Failed to update {collection} document"))
                .into()),
        }
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING body")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {collection} document"))?;

        row.map(|row| body_of(&row, collection)).transpose()
    }
}
