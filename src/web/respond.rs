//! Handler return values and their coercion to concrete HTTP responses.

use crate::error::AppError;
use crate::templates::Templates;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// A string reply starting with this prefix becomes a redirect to the rest.
pub const REDIRECT_MARKER: &str = "redirect:";

/// A data reply carrying this key renders the named template instead of
/// serializing to JSON.
pub const TEMPLATE_KEY: &str = "__template__";

/// Everything a handler may produce.
pub enum Reply {
    /// Passed through unchanged.
    Full(Response),
    /// Binary body, `application/octet-stream`.
    Bytes(Vec<u8>),
    /// HTML, unless prefixed with the redirect marker.
    Text(String),
    /// Template render when the template key is present, JSON otherwise.
    Data(Value),
    /// Empty response with the given status.
    Status(u16),
    /// Status plus a reason text.
    StatusReason(u16, String),
    /// Stringified fallback, plain text.
    Plain(String),
}

impl Reply {
    pub fn redirect(target: impl AsRef<str>) -> Reply {
        Reply::Text(format!("{}{}", REDIRECT_MARKER, target.as_ref()))
    }

    /// Data reply that renders `name` with the given context object.
    pub fn template(name: impl Into<String>, context: Value) -> Reply {
        let mut map = match context {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        map.insert(TEMPLATE_KEY.to_string(), Value::String(name.into()));
        Reply::Data(Value::Object(map))
    }
}

/// Map a handler's outcome to a concrete response. Handler-raised `ApiError`s
/// become a structured JSON body; every other error keeps its own HTTP
/// mapping.
pub fn coerce(result: Result<Reply, AppError>, templates: &Templates) -> Response {
    let reply = match result {
        Ok(reply) => reply,
        Err(AppError::Api(api)) => Reply::Data(serde_json::json!({
            "error": api.error,
            "data": api.data,
            "message": api.message,
        })),
        Err(e) => return e.into_response(),
    };
    match reply {
        Reply::Full(resp) => resp,
        Reply::Bytes(body) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            body,
        )
            .into_response(),
        Reply::Text(s) => match s.strip_prefix(REDIRECT_MARKER) {
            Some(target) => redirect(target),
            None => html(s),
        },
        Reply::Data(v) => data_response(v, templates),
        Reply::Status(code) => match checked_status(code) {
            Some(status) => status.into_response(),
            None => plain(code.to_string()),
        },
        Reply::StatusReason(code, reason) => match checked_status(code) {
            Some(status) => (status, reason).into_response(),
            None => plain(format!("({}, {})", code, reason)),
        },
        Reply::Plain(s) => plain(s),
    }
}

fn data_response(v: Value, templates: &Templates) -> Response {
    if let Value::Object(mut map) = v {
        let template = map
            .get(TEMPLATE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(name) = template {
            map.remove(TEMPLATE_KEY);
            return match templates.render(&name, &Value::Object(map)) {
                Ok(body) => html(body),
                Err(e) => e.into_response(),
            };
        }
        return json(Value::Object(map));
    }
    json(v)
}

fn redirect(target: &str) -> Response {
    match HeaderValue::from_str(target) {
        Ok(location) => {
            let mut resp = StatusCode::FOUND.into_response();
            resp.headers_mut().insert(header::LOCATION, location);
            resp
        }
        Err(_) => AppError::BadRequest("invalid redirect target".into()).into_response(),
    }
}

fn json(v: Value) -> Response {
    // serde_json never escapes non-ASCII, so unicode passes through intact
    (
        [(header::CONTENT_TYPE, "application/json;charset=utf-8")],
        v.to_string(),
    )
        .into_response()
}

fn html(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/html;charset=utf-8")],
        body,
    )
        .into_response()
}

fn plain(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain;charset=utf-8")],
        body,
    )
        .into_response()
}

fn checked_status(code: u16) -> Option<StatusCode> {
    if (100..600).contains(&code) {
        StatusCode::from_u16(code).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    fn templates() -> Templates {
        let mut t = Templates::empty();
        t.add_inline("x.html", "users: {{ users | length }}")
            .unwrap();
        t
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(resp: &Response) -> &str {
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn redirect_marker_becomes_a_302() {
        let resp = coerce(Ok(Reply::Text("redirect:/login".into())), &templates());
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
    }

    #[tokio::test]
    async fn plain_string_is_html() {
        let resp = coerce(Ok(Reply::Text("<h1>hi</h1>".into())), &templates());
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(content_type(&resp).starts_with("text/html"));
    }

    #[tokio::test]
    async fn template_key_renders_instead_of_json() {
        let resp = coerce(
            Ok(Reply::Data(json!({"__template__": "x.html", "users": []}))),
            &templates(),
        );
        assert!(content_type(&resp).starts_with("text/html"));
        assert_eq!(body_text(resp).await, "users: 0");
    }

    #[tokio::test]
    async fn data_without_template_key_is_json_with_unicode_intact() {
        let resp = coerce(Ok(Reply::Data(json!({"name": "中文"}))), &templates());
        assert!(content_type(&resp).starts_with("application/json"));
        assert!(body_text(resp).await.contains("中文"));
    }

    #[tokio::test]
    async fn status_reason_pair_sets_both() {
        let resp = coerce(
            Ok(Reply::StatusReason(404, "Not Found".into())),
            &templates(),
        );
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(resp).await, "Not Found");
    }

    #[tokio::test]
    async fn bare_status_in_range_is_empty() {
        let resp = coerce(Ok(Reply::Status(204)), &templates());
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn out_of_range_status_falls_back_to_plain_text() {
        let resp = coerce(Ok(Reply::Status(99)), &templates());
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(content_type(&resp).starts_with("text/plain"));
        assert_eq!(body_text(resp).await, "99");
    }

    #[tokio::test]
    async fn bytes_are_octet_stream() {
        let resp = coerce(Ok(Reply::Bytes(vec![1, 2, 3])), &templates());
        assert_eq!(content_type(&resp), "application/octet-stream");
    }

    #[tokio::test]
    async fn api_error_becomes_structured_json() {
        let resp = coerce(
            Err(AppError::Api(
                ApiError::new("value:invalid", "bad email").with_data(json!("email")),
            )),
            &templates(),
        );
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("value:invalid"));
        assert!(body.contains("bad email"));
    }

    #[tokio::test]
    async fn missing_template_is_a_server_error() {
        let resp = coerce(
            Ok(Reply::Data(json!({"__template__": "nope.html"}))),
            &templates(),
        );
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
