//! Declarative route parameter binding: each handler states its parameters
//! up front at registration; binding at request time is a table lookup, not
//! reflection.

use crate::error::{AppError, SchemaError};
use crate::web::request::RequestInfo;
use axum::http::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Immutable description of what a handler expects, computed once at
/// registration time.
#[derive(Clone, Debug)]
pub struct RouteBinding {
    pub method: Method,
    pub path: String,
    /// Handler wants the request abstraction alongside the arguments.
    pub accepts_request: bool,
    /// Handler takes arbitrary keyword arguments; disables narrowing.
    pub accepts_extra: bool,
    /// Declared parameter names, declaration order.
    pub named: Vec<String>,
    /// Subset of `named` without defaults, declaration order.
    pub required: Vec<String>,
}

impl RouteBinding {
    /// Whether request payloads should be parsed for this route at all.
    pub fn wants_params(&self) -> bool {
        self.accepts_extra || !self.named.is_empty()
    }
}

/// Builder for one route registration.
pub struct RouteSpec {
    method: Method,
    path: String,
    named: Vec<String>,
    required: Vec<String>,
    accepts_extra: bool,
    accepts_request: bool,
    late_param: Option<String>,
}

impl RouteSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RouteSpec {
            method,
            path: path.into(),
            named: Vec::new(),
            required: Vec::new(),
            accepts_extra: false,
            accepts_request: false,
            late_param: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Declare a parameter the handler cannot run without.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.note_order(&name);
        self.named.push(name.clone());
        self.required.push(name);
        self
    }

    /// Declare a parameter the handler can default internally.
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.note_order(&name);
        self.named.push(name);
        self
    }

    /// Accept arbitrary extra arguments instead of narrowing them away.
    pub fn catch_all(mut self) -> Self {
        self.accepts_extra = true;
        self
    }

    /// Hand the handler the request abstraction. Must come after every
    /// named parameter declaration.
    pub fn with_request(mut self) -> Self {
        self.accepts_request = true;
        self
    }

    fn note_order(&mut self, name: &str) {
        if self.accepts_request && self.late_param.is_none() {
            self.late_param = Some(name.to_string());
        }
    }

    pub fn build(self) -> Result<RouteBinding, SchemaError> {
        if let Some(param) = self.late_param {
            return Err(SchemaError::ParamAfterRequest {
                route: self.path,
                param,
            });
        }
        Ok(RouteBinding {
            method: self.method,
            path: self.path,
            accepts_request: self.accepts_request,
            accepts_extra: self.accepts_extra,
            named: self.named,
            required: self.required,
        })
    }
}

/// Everything a handler is invoked with.
pub struct Bound {
    pub args: Map<String, Value>,
    /// Present only on routes registered with `with_request`.
    pub request: Option<RequestInfo>,
}

impl Bound {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }
}

/// Combine the parsed payload (body or query, if any) with the matched path
/// variables into the handler's argument map.
///
/// Without a payload the path variables seed the map directly. With one,
/// handlers that declared names but no catch-all only see those names, so a
/// client cannot slip extra fields past a fixed-shape handler; path
/// variables then overwrite on collision.
pub fn merge_args(
    binding: &RouteBinding,
    payload: Option<Map<String, Value>>,
    path_vars: &HashMap<String, String>,
) -> Result<Map<String, Value>, AppError> {
    let args = match payload {
        None => path_vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
        Some(mut map) => {
            if !binding.accepts_extra && !binding.named.is_empty() {
                let mut narrowed = Map::new();
                for name in &binding.named {
                    if let Some(v) = map.remove(name) {
                        narrowed.insert(name.clone(), v);
                    }
                }
                map = narrowed;
            }
            for (k, v) in path_vars {
                if map.contains_key(k) {
                    tracing::warn!(param = %k, "path variable shadows a body/query argument");
                }
                map.insert(k.clone(), Value::String(v.clone()));
            }
            map
        }
    };
    for name in &binding.required {
        if !args.contains_key(name) {
            return Err(AppError::BadRequest(format!("missing argument: {}", name)));
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_vars() -> HashMap<String, String> {
        HashMap::new()
    }

    fn payload(pairs: &[(&str, Value)]) -> Option<Map<String, Value>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn narrows_to_declared_names_without_catch_all() {
        let binding = RouteSpec::post("/api/users")
            .optional("name")
            .build()
            .unwrap();
        let args = merge_args(
            &binding,
            payload(&[("name", json!("x")), ("extra", json!("y"))]),
            &no_vars(),
        )
        .unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args.get("name"), Some(&json!("x")));
    }

    #[test]
    fn catch_all_keeps_extras() {
        let binding = RouteSpec::post("/api/users")
            .optional("name")
            .catch_all()
            .build()
            .unwrap();
        let args = merge_args(
            &binding,
            payload(&[("name", json!("x")), ("extra", json!("y"))]),
            &no_vars(),
        )
        .unwrap();
        assert_eq!(args.get("extra"), Some(&json!("y")));
    }

    #[test]
    fn missing_required_param_names_the_field() {
        let binding = RouteSpec::post("/api/blogs").required("id").build().unwrap();
        let err = merge_args(&binding, payload(&[("name", json!("x"))]), &no_vars()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("id")));
    }

    #[test]
    fn first_missing_required_param_is_reported() {
        let binding = RouteSpec::post("/x")
            .required("a")
            .required("b")
            .build()
            .unwrap();
        let err = merge_args(&binding, payload(&[]), &no_vars()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.ends_with(": a")));
    }

    #[test]
    fn path_vars_seed_args_when_no_payload() {
        let binding = RouteSpec::get("/blog/:id").optional("id").build().unwrap();
        let vars: HashMap<_, _> = [("id".to_string(), "b1".to_string())].into_iter().collect();
        let args = merge_args(&binding, None, &vars).unwrap();
        assert_eq!(args.get("id"), Some(&json!("b1")));
    }

    #[test]
    fn path_vars_overwrite_payload_on_collision() {
        let binding = RouteSpec::post("/blog/:id")
            .required("id")
            .catch_all()
            .build()
            .unwrap();
        let vars: HashMap<_, _> = [("id".to_string(), "from-path".to_string())]
            .into_iter()
            .collect();
        let args = merge_args(&binding, payload(&[("id", json!("from-body"))]), &vars).unwrap();
        assert_eq!(args.get("id"), Some(&json!("from-path")));
    }

    #[test]
    fn required_param_satisfied_by_path_var() {
        let binding = RouteSpec::get("/blog/:id").required("id").build().unwrap();
        let vars: HashMap<_, _> = [("id".to_string(), "b1".to_string())].into_iter().collect();
        assert!(merge_args(&binding, None, &vars).is_ok());
    }

    #[test]
    fn param_after_request_is_a_registration_error() {
        let err = RouteSpec::get("/x")
            .optional("a")
            .with_request()
            .required("b")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::ParamAfterRequest {
                route: "/x".into(),
                param: "b".into()
            }
        );
    }

    #[test]
    fn request_after_params_is_fine() {
        let binding = RouteSpec::get("/x")
            .optional("a")
            .with_request()
            .build()
            .unwrap();
        assert!(binding.accepts_request);
        assert_eq!(binding.named, vec!["a"]);
    }
}
