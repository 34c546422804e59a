//! Blog domain schema: users, blogs, comments.

use crate::orm::{EntityDescriptor, FieldDescriptor};
use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// 50-character id: a zero-padded millisecond timestamp followed by a uuid4
/// hex tail. Sorts by creation time.
pub fn next_id() -> String {
    format!(
        "{:015}{}000",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// Creation timestamps are stored as float seconds.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn id_field() -> FieldDescriptor {
    FieldDescriptor::text("id")
        .primary_key()
        .default_with(|| json!(next_id()))
}

fn created_at_field() -> FieldDescriptor {
    FieldDescriptor::real("created_at").default_with(|| json!(now_timestamp()))
}

pub fn users() -> Arc<EntityDescriptor> {
    static USERS: OnceLock<Arc<EntityDescriptor>> = OnceLock::new();
    USERS
        .get_or_init(|| {
            Arc::new(
                EntityDescriptor::build(
                    "users",
                    vec![
                        id_field(),
                        FieldDescriptor::text("email"),
                        FieldDescriptor::text("passwd"),
                        FieldDescriptor::boolean("admin").default_value(false),
                        FieldDescriptor::text("name"),
                        FieldDescriptor::text("image"),
                        created_at_field(),
                    ],
                )
                .expect("users schema is valid"),
            )
        })
        .clone()
}

pub fn blogs() -> Arc<EntityDescriptor> {
    static BLOGS: OnceLock<Arc<EntityDescriptor>> = OnceLock::new();
    BLOGS
        .get_or_init(|| {
            Arc::new(
                EntityDescriptor::build(
                    "blogs",
                    vec![
                        id_field(),
                        FieldDescriptor::text("user_id"),
                        FieldDescriptor::text("user_name"),
                        FieldDescriptor::text("user_image"),
                        FieldDescriptor::text("name"),
                        FieldDescriptor::text("summary"),
                        FieldDescriptor::text("content"),
                        created_at_field(),
                    ],
                )
                .expect("blogs schema is valid"),
            )
        })
        .clone()
}

pub fn comments() -> Arc<EntityDescriptor> {
    static COMMENTS: OnceLock<Arc<EntityDescriptor>> = OnceLock::new();
    COMMENTS
        .get_or_init(|| {
            Arc::new(
                EntityDescriptor::build(
                    "comments",
                    vec![
                        id_field(),
                        FieldDescriptor::text("blog_id"),
                        FieldDescriptor::text("user_id"),
                        FieldDescriptor::text("user_name"),
                        FieldDescriptor::text("user_image"),
                        FieldDescriptor::text("content"),
                        created_at_field(),
                    ],
                )
                .expect("comments schema is valid"),
            )
        })
        .clone()
}
