//! Route registration and the per-route dispatch adapter.

use crate::error::{AppError, SchemaError};
use crate::state::AppState;
use crate::templates::Templates;
use crate::web::binder::{merge_args, Bound, RouteBinding, RouteSpec};
use crate::web::request::{is_body_method, parse_body, parse_urlencoded, RequestInfo};
use crate::web::respond::{coerce, Reply};
use axum::extract::{Path, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::Router;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, AppError>> + Send>>;
pub type RouteHandler = Arc<dyn Fn(Bound) -> HandlerFuture + Send + Sync>;

/// Largest accepted request body.
const BODY_LIMIT: usize = 1024 * 1024;

/// Collects route registrations and produces the final axum router.
pub struct WebApp {
    state: AppState,
    router: Router,
}

impl WebApp {
    pub fn new(state: AppState) -> Self {
        WebApp {
            state,
            router: Router::new(),
        }
    }

    /// Register one handler under its route spec. Declaration problems
    /// surface here, once, not per request.
    pub fn route<H, F>(mut self, spec: RouteSpec, handler: H) -> Result<Self, SchemaError>
    where
        H: Fn(AppState, Bound) -> F + Send + Sync + 'static,
        F: Future<Output = Result<Reply, AppError>> + Send + 'static,
    {
        let binding = Arc::new(spec.build()?);
        tracing::info!(method = %binding.method, path = %binding.path, "add route");
        let filter = MethodFilter::try_from(binding.method.clone()).map_err(|_| {
            SchemaError::UnsupportedMethod {
                route: binding.path.clone(),
                method: binding.method.to_string(),
            }
        })?;

        let state = self.state.clone();
        let templates = state.templates.clone();
        let route_handler: RouteHandler = Arc::new(move |bound| -> HandlerFuture {
            Box::pin(handler(state.clone(), bound))
        });

        let path = binding.path.clone();
        let adapter = move |Path(vars): Path<HashMap<String, String>>, req: Request| {
            let binding = binding.clone();
            let route_handler = route_handler.clone();
            let templates = templates.clone();
            async move { dispatch(&binding, vars, req, &route_handler, &templates).await }
        };
        self.router = self.router.route(&path, on(filter, adapter));
        Ok(self)
    }

    pub fn into_router(self) -> Router {
        self.router.layer(RequestBodyLimitLayer::new(BODY_LIMIT))
    }
}

async fn dispatch(
    binding: &RouteBinding,
    vars: HashMap<String, String>,
    req: Request,
    handler: &RouteHandler,
    templates: &Templates,
) -> Response {
    tracing::info!(method = %req.method(), path = %req.uri().path(), "request");
    let info = binding
        .accepts_request
        .then(|| RequestInfo::from_request(&req));
    let payload = match read_payload(binding, req).await {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };
    let args = match merge_args(binding, payload, &vars) {
        Ok(args) => args,
        Err(e) => return e.into_response(),
    };
    tracing::debug!(args = ?args, "bound arguments");
    let outcome = handler(Bound {
        args,
        request: info,
    })
    .await;
    coerce(outcome, templates)
}

/// Steps 1-2 of the binding algorithm: produce the flat payload mapping from
/// the body (body-carrying methods) or the query string, but only when the
/// binding declares an interest in parameters at all.
async fn read_payload(
    binding: &RouteBinding,
    req: Request,
) -> Result<Option<Map<String, Value>>, AppError> {
    if !binding.wants_params() {
        return Ok(None);
    }
    if is_body_method(req.method()) {
        return parse_body(req).await.map(Some);
    }
    match req.uri().query() {
        Some(qs) if !qs.is_empty() => Ok(Some(parse_urlencoded(qs.as_bytes()))),
        _ => Ok(None),
    }
}
