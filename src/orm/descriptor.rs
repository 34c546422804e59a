//! Immutable entity schema: table name, fields, and the four precomputed
//! query templates.

use crate::error::SchemaError;
use crate::orm::field::FieldDescriptor;
use std::collections::HashSet;

/// Quote an identifier so it cannot collide with a SQL keyword.
pub(crate) fn quoted(name: &str) -> String {
    format!("`{}`", name)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Built once per entity type, immutable afterwards. Templates use the
/// generic `?` placeholder; the data access layer owns the translation to
/// the driver's syntax.
#[derive(Clone, Debug)]
pub struct EntityDescriptor {
    pub table: String,
    pub primary_key: FieldDescriptor,
    /// Non-key fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    pub select_sql: String,
    pub insert_sql: String,
    pub update_sql: String,
    pub delete_sql: String,
}

impl EntityDescriptor {
    /// Validates the declaration (exactly one primary key, unique names) and
    /// precomputes the query templates. Field order in every template is
    /// declaration order with the primary key last in insert args and as the
    /// final WHERE clause of update/delete.
    pub fn build(
        table: impl Into<String>,
        declared: Vec<FieldDescriptor>,
    ) -> Result<Self, SchemaError> {
        let table = table.into();
        let mut primary: Option<FieldDescriptor> = None;
        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        for field in declared {
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateField {
                    table,
                    field: field.name,
                });
            }
            if field.primary_key {
                if primary.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        table,
                        field: field.name,
                    });
                }
                primary = Some(field);
            } else {
                fields.push(field);
            }
        }
        let primary = primary.ok_or_else(|| SchemaError::NoPrimaryKey {
            table: table.clone(),
        })?;
        tracing::info!(table = %table, primary_key = %primary.name, "registered entity");

        let pk = quoted(&primary.name);
        let field_cols: Vec<String> = fields.iter().map(|f| quoted(&f.name)).collect();

        let mut select_cols = vec![pk.clone()];
        select_cols.extend(field_cols.iter().cloned());
        let select_sql = format!(
            "SELECT {} FROM {}",
            select_cols.join(", "),
            quoted(&table)
        );

        let mut insert_cols = field_cols.clone();
        insert_cols.push(pk.clone());
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quoted(&table),
            insert_cols.join(", "),
            placeholders(insert_cols.len())
        );

        let set_clause: Vec<String> = field_cols.iter().map(|c| format!("{} = ?", c)).collect();
        let update_sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quoted(&table),
            set_clause.join(", "),
            pk
        );

        let delete_sql = format!("DELETE FROM {} WHERE {} = ?", quoted(&table), pk);

        Ok(EntityDescriptor {
            table,
            primary_key: primary,
            fields,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        })
    }
}
