//! Single-table CRUD mapper: field/entity descriptors, records, and the
//! data access layer over a pooled MySQL connection.

pub mod dal;
pub mod descriptor;
pub mod field;
pub mod record;
pub mod value;

pub use dal::{Dal, Limit};
pub use descriptor::EntityDescriptor;
pub use field::{ColumnType, FieldDefault, FieldDescriptor};
pub use record::{Find, Record};
pub use value::SqlValue;
