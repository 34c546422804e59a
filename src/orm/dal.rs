//! Data access layer: pooled statement execution with generic placeholders.

use crate::config::DbConfig;
use crate::error::AppError;
use crate::orm::value::{row_to_map, SqlValue};
use serde_json::{Map, Value};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

/// Row cap for `Dal::query` and the LIMIT shape for the finders. A window is
/// `(offset, count)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Window { offset: u64, count: u64 },
}

impl Limit {
    /// Accepts an integer or a two-integer array; any other shape is a
    /// validation error.
    pub fn from_value(v: &Value) -> Result<Self, AppError> {
        match v {
            Value::Number(n) => n
                .as_u64()
                .map(Limit::Count)
                .ok_or_else(|| AppError::Validation(format!("invalid limit value: {}", v))),
            Value::Array(items) if items.len() == 2 => {
                let offset = items[0].as_u64();
                let count = items[1].as_u64();
                match (offset, count) {
                    (Some(offset), Some(count)) => Ok(Limit::Window { offset, count }),
                    _ => Err(AppError::Validation(format!("invalid limit value: {}", v))),
                }
            }
            _ => Err(AppError::Validation(format!("invalid limit value: {}", v))),
        }
    }
}

/// Handle to the shared connection pool. Every operation checks out one
/// pooled connection for its own duration only.
#[derive(Clone)]
pub struct Dal {
    pool: MySqlPool,
}

impl Dal {
    pub async fn connect(cfg: &DbConfig) -> Result<Self, AppError> {
        tracing::info!(host = %cfg.host, database = %cfg.database, "creating database connection pool");
        let pool = MySqlPoolOptions::new()
            .max_connections(cfg.max_connections)
            .min_connections(cfg.min_connections)
            .connect(&cfg.url())
            .await?;
        Ok(Dal { pool })
    }

    /// Wrap an existing pool; keeps the layer testable against any pool.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Dal { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Run a SELECT; `fetch` caps or windows the returned rows.
    pub async fn query(
        &self,
        sql: &str,
        args: &[Value],
        fetch: Option<Limit>,
    ) -> Result<Vec<Map<String, Value>>, AppError> {
        let sql = native_sql(sql, args.len())?;
        tracing::debug!(sql = %sql, args = ?args, "query");
        let mut query = sqlx::query(&sql);
        for a in args {
            query = query.bind(SqlValue::from_json(a));
        }
        let rows = query.fetch_all(&self.pool).await?;
        tracing::debug!(rows = rows.len(), "rows returned");
        let mapped = rows.iter().map(row_to_map);
        Ok(match fetch {
            None => mapped.collect(),
            Some(Limit::Count(n)) => mapped.take(n as usize).collect(),
            Some(Limit::Window { offset, count }) => mapped
                .skip(offset as usize)
                .take(count as usize)
                .collect(),
        })
    }

    /// Run an INSERT/UPDATE/DELETE; returns the affected-row count. With
    /// `autocommit` off the statement runs inside a transaction that is
    /// rolled back on failure.
    pub async fn execute(&self, sql: &str, args: &[Value], autocommit: bool) -> Result<u64, AppError> {
        let sql = native_sql(sql, args.len())?;
        tracing::debug!(sql = %sql, "execute");
        if autocommit {
            let mut query = sqlx::query(&sql);
            for a in args {
                query = query.bind(SqlValue::from_json(a));
            }
            let done = query.execute(&self.pool).await?;
            return Ok(done.rows_affected());
        }
        let mut tx = self.pool.begin().await?;
        let mut query = sqlx::query(&sql);
        for a in args {
            query = query.bind(SqlValue::from_json(a));
        }
        match query.execute(&mut *tx).await {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e.into())
            }
        }
    }
}

/// Rewrite the generic `?` markers into the driver's positional syntax and
/// verify the argument count against the marker count. MySQL's prepared
/// statement marker is already `?`, so the text passes through unchanged;
/// the count check runs regardless, since a mismatch here silently shifts
/// every following argument by one.
fn native_sql(sql: &str, args: usize) -> Result<String, AppError> {
    let expected = placeholder_count(sql);
    if expected != args {
        return Err(AppError::Validation(format!(
            "statement expects {} arguments, got {}: {}",
            expected, args, sql
        )));
    }
    Ok(sql.to_string())
}

/// Count `?` markers outside single-quoted string literals.
pub(crate) fn placeholder_count(sql: &str) -> usize {
    let mut count = 0;
    let mut in_literal = false;
    for c in sql.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_markers_outside_literals() {
        assert_eq!(placeholder_count("SELECT 1"), 0);
        assert_eq!(placeholder_count("SELECT * FROM t WHERE a = ? AND b = ?"), 2);
        assert_eq!(
            placeholder_count("SELECT * FROM t WHERE a = ? AND b = 'c?d'"),
            1
        );
    }

    #[test]
    fn argument_count_mismatch_is_rejected() {
        let err = native_sql("DELETE FROM t WHERE id = ?", 2).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(native_sql("DELETE FROM t WHERE id = ?", 1).is_ok());
    }

    #[test]
    fn limit_from_integer() {
        assert_eq!(Limit::from_value(&json!(5)).unwrap(), Limit::Count(5));
    }

    #[test]
    fn limit_from_pair() {
        assert_eq!(
            Limit::from_value(&json!([10, 5])).unwrap(),
            Limit::Window { offset: 10, count: 5 }
        );
    }

    #[test]
    fn limit_rejects_other_shapes() {
        for bad in [json!("x"), json!(-1), json!([1]), json!([1, 2, 3]), json!(null)] {
            assert!(
                matches!(Limit::from_value(&bad), Err(AppError::Validation(_))),
                "expected validation error for {}",
                bad
            );
        }
    }
}
