//! PostgreSQL document backend. One `documents` table holds every collection;
//! `version` is bumped on each write and is the compare-and-swap token.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{Direction, DocumentStore, FieldUpdate, Filter, Query, StoreError, VersionedDocument};

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    version: i64,
    data: Value,
}

impl From<DocumentRow> for VersionedDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            version: row.version,
            data: row.data,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Plain names (`userId`, `timestamp`) are written into the SQL as literals
/// so predicates match the expression indexes in the migrations. Anything else
/// is bound as a parameter.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn push_name(qb: &mut QueryBuilder<'static, Postgres>, name: &str) {
    if is_plain_name(name) {
        qb.push(format!("'{name}'"));
    } else {
        qb.push_bind(name.to_string());
    }
}

fn push_operand(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter, cast: &str) {
    qb.push("(data ->> ");
    push_name(qb, &filter.field);
    qb.push(")").push(cast).push(filter.op.sql());
}

/// Appends one typed predicate: `(data ->> field)::cast <op> $n`.
fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) -> Result<(), StoreError> {
    match &filter.value {
        Value::String(s) => {
            push_operand(qb, filter, "");
            qb.push_bind(s.clone());
        }
        Value::Bool(b) => {
            push_operand(qb, filter, "::boolean");
            qb.push_bind(*b);
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                push_operand(qb, filter, "::bigint");
                qb.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                push_operand(qb, filter, "::double precision");
                qb.push_bind(f);
            } else {
                return Err(StoreError::UnsupportedFilter {
                    field: filter.field.clone(),
                    reason: format!("number {n} is out of range"),
                });
            }
        }
        other => {
            return Err(StoreError::UnsupportedFilter {
                field: filter.field.clone(),
                reason: format!("cannot compare against {other}"),
            })
        }
    }
    Ok(())
}

/// Builds the SELECT for a collection query. Rows with equal sort keys are
/// ordered by document id.
fn select_query(query: &Query) -> Result<QueryBuilder<'static, Postgres>, StoreError> {
    let mut qb = QueryBuilder::new("SELECT id, version, data FROM documents WHERE collection = ");
    push_name(&mut qb, &query.collection);

    for filter in &query.filters {
        qb.push(" AND ");
        push_filter(&mut qb, filter)?;
    }

    match &query.order_by {
        Some((field, direction)) => {
            let direction = match direction {
                Direction::Ascending => " ASC",
                Direction::Descending => " DESC",
            };
            // jsonb ordering compares numbers numerically and strings lexically.
            qb.push(" ORDER BY data -> ");
            push_name(&mut qb, field);
            qb.push(direction).push(", id").push(direction);
        }
        None => {
            qb.push(" ORDER BY id");
        }
    }
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    Ok(qb)
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDocument>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, version, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, version)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (collection, id) DO UPDATE
                SET data = EXCLUDED.data,
                    version = documents.version + 1,
                    updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, FieldUpdate>,
    ) -> Result<(), StoreError> {
        let mut sets = Map::new();
        let mut deletes = Vec::new();
        for (field, change) in fields {
            match change {
                FieldUpdate::Set(value) => {
                    sets.insert(field, value);
                }
                FieldUpdate::Delete => deletes.push(field),
            }
        }

        // jsonb `||` merges top-level keys, `- text[]` drops them.
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data, version)
            VALUES ($1, $2, $3::jsonb - $4::text[], 1)
            ON CONFLICT (collection, id) DO UPDATE
                SET data = (documents.data || $3::jsonb) - $4::text[],
                    version = documents.version + 1,
                    updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(sets))
        .bind(deletes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        collection: &str,
        id: &str,
        expected_version: Option<i64>,
        data: Value,
    ) -> Result<bool, StoreError> {
        let result = match expected_version {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, data, version)
                    VALUES ($1, $2, $3, 1)
                    ON CONFLICT (collection, id) DO NOTHING
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(&data)
                .execute(&self.pool)
                .await?
            }
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET data = $3, version = version + 1, updated_at = now()
                    WHERE collection = $1 AND id = $2 AND version = $4
                    "#,
                )
                .bind(collection)
                .bind(id)
                .bind(&data)
                .bind(version)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() == 1)
    }

    async fn query(&self, query: &Query) -> Result<Vec<VersionedDocument>, StoreError> {
        let mut qb = select_query(query)?;
        let rows: Vec<DocumentRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
