//! Column descriptions for entity schemas.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Boolean,
    Integer,
    Real,
}

/// Default for a column: a literal value or a zero-arg factory. The factory
/// form covers generated ids and timestamps.
#[derive(Clone)]
pub enum FieldDefault {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    pub fn resolve(&self) -> Value {
        match self {
            FieldDefault::Value(v) => v.clone(),
            FieldDefault::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Value(v) => write!(f, "Value({})", v),
            FieldDefault::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// One column: name, storage type, key flag, optional default.
/// Immutable once handed to an entity descriptor.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub default: Option<FieldDefault>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        FieldDescriptor {
            name: name.into(),
            column_type,
            primary_key: false,
            default: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn real(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Real)
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    pub fn default_with(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(FieldDefault::Factory(Arc::new(factory)));
        self
    }
}
