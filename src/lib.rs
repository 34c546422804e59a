//! blogkit: the core of a tutorial blogging backend. Declarative route
//! registration with parameter binding, response coercion, and a minimal
//! single-table ORM over a pooled MySQL connection.

pub mod config;
pub mod error;
pub mod models;
pub mod orm;
pub mod state;
pub mod templates;
pub mod web;

pub use config::{Configs, DbConfig, ServerConfig};
pub use error::{ApiError, AppError, SchemaError};
pub use orm::{Dal, EntityDescriptor, FieldDescriptor, Find, Limit, Record};
pub use state::AppState;
pub use templates::Templates;
pub use web::{Bound, Reply, RequestInfo, RouteSpec, WebApp};
