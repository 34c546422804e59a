//! Template rendering collaborator: a minijinja environment with a
//! filesystem loader and the blog's relative-time filter.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use minijinja::Environment;
use serde_json::Value;
use std::path::Path;

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Load templates from a directory. `.html` names get HTML auto-escaping.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        tracing::info!(path = %dir.as_ref().display(), "template directory");
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir));
        env.add_filter("datetime", relative_time);
        Templates { env }
    }

    /// An environment with no loader; templates come from `add_inline`.
    pub fn empty() -> Self {
        let mut env = Environment::new();
        env.add_filter("datetime", relative_time);
        Templates { env }
    }

    pub fn add_inline(&mut self, name: &str, source: &str) -> Result<(), AppError> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())?;
        Ok(())
    }

    /// Render a template with a flat keyword mapping.
    pub fn render(&self, name: &str, context: &Value) -> Result<String, AppError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(minijinja::Value::from_serialize(context))?)
    }
}

/// Float-seconds timestamp to a human phrase: "1 minute ago", "3 hours ago",
/// then a date once it's older than a week.
fn relative_time(ts: f64) -> String {
    let delta = Utc::now().timestamp() - ts as i64;
    if delta < 60 {
        "1 minute ago".to_string()
    } else if delta < 3600 {
        format!("{} minutes ago", delta / 60)
    } else if delta < 86400 {
        format!("{} hours ago", delta / 3600)
    } else if delta < 604800 {
        format!("{} days ago", delta / 86400)
    } else {
        DateTime::<Utc>::from_timestamp(ts as i64, 0)
            .map(|d| d.format("%b %d, %Y").to_string())
            .unwrap_or_default()
    }
}
