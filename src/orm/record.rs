//! Entity instances and the finder API.

use crate::error::AppError;
use crate::orm::dal::{Dal, Limit};
use crate::orm::descriptor::{quoted, EntityDescriptor};
use crate::orm::field::{ColumnType, FieldDescriptor};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Optional clauses for `find_all`. The where/order-by text is trusted
/// application SQL; client-supplied values belong in `args`.
#[derive(Default)]
pub struct Find {
    pub where_clause: Option<String>,
    pub args: Vec<Value>,
    pub order_by: Option<String>,
    pub limit: Option<Limit>,
}

impl Find {
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compose the final SELECT text and argument list from a base template.
    fn into_query(self, base: &str) -> (String, Vec<Value>) {
        let mut sql = base.to_string();
        let mut args = self.args;
        if let Some(w) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(w);
        }
        if let Some(o) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(o);
        }
        match self.limit {
            None => {}
            Some(Limit::Count(n)) => {
                sql.push_str(" LIMIT ?");
                args.push(n.into());
            }
            Some(Limit::Window { offset, count }) => {
                sql.push_str(" LIMIT ?, ?");
                args.push(offset.into());
                args.push(count.into());
            }
        }
        (sql, args)
    }
}

/// A mutable attribute bag bound to one entity descriptor. Each read
/// produces a fresh instance; nothing is shared or cached across calls.
#[derive(Clone, Debug)]
pub struct Record {
    descriptor: Arc<EntityDescriptor>,
    values: Map<String, Value>,
}

impl Record {
    pub fn new(descriptor: Arc<EntityDescriptor>) -> Self {
        Record {
            descriptor,
            values: Map::new(),
        }
    }

    pub fn with_values(descriptor: Arc<EntityDescriptor>, values: Map<String, Value>) -> Self {
        Record { descriptor, values }
    }

    fn from_row(descriptor: Arc<EntityDescriptor>, mut row: Map<String, Value>) -> Self {
        let mut values = Map::new();
        let pk = &descriptor.primary_key;
        if let Some(v) = row.remove(&pk.name) {
            values.insert(pk.name.clone(), coerce_cell(v, pk.column_type));
        }
        for field in &descriptor.fields {
            if let Some(v) = row.remove(&field.name) {
                values.insert(field.name.clone(), coerce_cell(v, field.column_type));
            }
        }
        // aliased expressions and such pass through untouched
        for (name, v) in row {
            values.insert(name, v);
        }
        Record { descriptor, values }
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Current primary key value, NULL when unset.
    pub fn primary_key(&self) -> Value {
        self.value(&self.descriptor.primary_key.name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }

    fn value(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Null)
    }

    fn value_or_default(&mut self, field: &FieldDescriptor) -> Value {
        if let Some(v) = self.values.get(&field.name) {
            if !v.is_null() {
                return v.clone();
            }
        }
        if let Some(default) = &field.default {
            let v = default.resolve();
            tracing::debug!(field = %field.name, value = %v, "using default value");
            self.values.insert(field.name.clone(), v.clone());
            return v;
        }
        Value::Null
    }

    /// Arguments for the insert template: value-or-default per non-key field
    /// in declaration order, resolved primary key last. Resolved defaults are
    /// written back, so a factory runs at most once per record.
    fn insert_args(&mut self) -> Vec<Value> {
        let descriptor = self.descriptor.clone();
        let mut args: Vec<Value> = descriptor
            .fields
            .iter()
            .map(|f| self.value_or_default(f))
            .collect();
        args.push(self.value_or_default(&descriptor.primary_key));
        args
    }

    /// Arguments for the update template: current values only, primary key
    /// last. No default substitution; an unset field updates to NULL.
    fn update_args(&self) -> Vec<Value> {
        let mut args: Vec<Value> = self
            .descriptor
            .fields
            .iter()
            .map(|f| self.value(&f.name))
            .collect();
        args.push(self.primary_key());
        args
    }

    pub async fn save(&mut self, dal: &Dal) -> Result<(), AppError> {
        let args = self.insert_args();
        let rows = dal.execute(&self.descriptor.insert_sql, &args, true).await?;
        if rows != 1 {
            tracing::warn!(table = %self.descriptor.table, rows, "insert affected an unexpected row count");
        }
        Ok(())
    }

    pub async fn update(&self, dal: &Dal) -> Result<(), AppError> {
        let args = self.update_args();
        let rows = dal.execute(&self.descriptor.update_sql, &args, true).await?;
        if rows != 1 {
            tracing::warn!(table = %self.descriptor.table, rows, "update by primary key affected an unexpected row count");
        }
        Ok(())
    }

    pub async fn remove(&self, dal: &Dal) -> Result<(), AppError> {
        let args = vec![self.primary_key()];
        let rows = dal.execute(&self.descriptor.delete_sql, &args, true).await?;
        if rows != 1 {
            tracing::warn!(table = %self.descriptor.table, rows, "delete by primary key affected an unexpected row count");
        }
        Ok(())
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Value {
        r.into_value()
    }
}

impl EntityDescriptor {
    pub async fn find_all(
        self: &Arc<Self>,
        dal: &Dal,
        find: Find,
    ) -> Result<Vec<Record>, AppError> {
        let (sql, args) = find.into_query(&self.select_sql);
        let rows = dal.query(&sql, &args, None).await?;
        Ok(rows
            .into_iter()
            .map(|row| Record::from_row(self.clone(), row))
            .collect())
    }

    /// Absent rows are an empty result, not an error.
    pub async fn find_by_id(
        self: &Arc<Self>,
        dal: &Dal,
        pk: Value,
    ) -> Result<Option<Record>, AppError> {
        let sql = format!(
            "{} WHERE {} = ?",
            self.select_sql,
            quoted(&self.primary_key.name)
        );
        let rows = dal.query(&sql, &[pk], Some(Limit::Count(1))).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| Record::from_row(self.clone(), row)))
    }

    /// Scalar aggregate, e.g. `find_number(dal, "count(id)", None, &[])`.
    pub async fn find_number(
        self: &Arc<Self>,
        dal: &Dal,
        select_expr: &str,
        where_clause: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>, AppError> {
        let mut sql = format!(
            "SELECT {} AS _num_ FROM {}",
            select_expr,
            quoted(&self.table)
        );
        if let Some(w) = where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(w);
        }
        let rows = dal.query(&sql, args, Some(Limit::Count(1))).await?;
        Ok(rows.into_iter().next().and_then(|mut row| row.remove("_num_")))
    }
}

fn coerce_cell(v: Value, column_type: ColumnType) -> Value {
    match (column_type, v) {
        // MySQL hands booleans back as TINYINT numbers
        (ColumnType::Boolean, Value::Number(n)) => {
            Value::Bool(n.as_i64().map(|i| i != 0).unwrap_or(false))
        }
        (_, v) => v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::field::FieldDescriptor;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn users() -> Arc<EntityDescriptor> {
        Arc::new(
            EntityDescriptor::build(
                "users",
                vec![
                    FieldDescriptor::text("id").primary_key(),
                    FieldDescriptor::text("email"),
                    FieldDescriptor::boolean("admin").default_value(false),
                    FieldDescriptor::real("created_at"),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn insert_args_follow_field_order_with_pk_last() {
        let mut r = Record::new(users());
        r.set("id", "u1");
        r.set("email", "a@b.c");
        r.set("created_at", 1.0);
        assert_eq!(
            r.insert_args(),
            vec![json!("a@b.c"), json!(false), json!(1.0), json!("u1")]
        );
    }

    #[test]
    fn default_factory_resolves_exactly_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let descriptor = Arc::new(
            EntityDescriptor::build(
                "t",
                vec![
                    FieldDescriptor::text("id").primary_key().default_with(|| {
                        CALLS.fetch_add(1, Ordering::SeqCst);
                        json!("generated")
                    }),
                    FieldDescriptor::text("name"),
                ],
            )
            .unwrap(),
        );
        let mut r = Record::new(descriptor);
        r.set("name", "x");
        let first = r.insert_args();
        let second = r.insert_args();
        assert_eq!(first, second);
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(r.get("id"), Some(&json!("generated")));
    }

    #[test]
    fn update_args_send_nulls_for_unset_fields() {
        let mut r = Record::new(users());
        r.set("id", "u1");
        r.set("email", "a@b.c");
        // admin has a default but update must not apply it
        assert_eq!(
            r.update_args(),
            vec![json!("a@b.c"), Value::Null, Value::Null, json!("u1")]
        );
    }

    #[test]
    fn find_composes_limit_count() {
        let (sql, args) = Find::default()
            .limit(Limit::Count(5))
            .into_query("SELECT `id` FROM `t`");
        assert_eq!(sql, "SELECT `id` FROM `t` LIMIT ?");
        assert_eq!(args, vec![json!(5)]);
    }

    #[test]
    fn find_composes_limit_window() {
        let (sql, args) = Find::default()
            .where_clause("`name` = ?")
            .args(vec![json!("x")])
            .order_by("`created_at` DESC")
            .limit(Limit::Window { offset: 10, count: 5 })
            .into_query("SELECT `id` FROM `t`");
        assert_eq!(
            sql,
            "SELECT `id` FROM `t` WHERE `name` = ? ORDER BY `created_at` DESC LIMIT ?, ?"
        );
        assert_eq!(args, vec![json!("x"), json!(10), json!(5)]);
    }

    #[test]
    fn rows_decode_descriptor_directed() {
        let mut row = Map::new();
        row.insert("id".into(), json!("u1"));
        row.insert("admin".into(), json!(1));
        row.insert("created_at".into(), json!(1.5));
        let r = Record::from_row(users(), row);
        assert_eq!(r.get("admin"), Some(&json!(true)));
        assert_eq!(r.get("created_at"), Some(&json!(1.5)));
        assert_eq!(r.primary_key(), json!("u1"));
    }
}
