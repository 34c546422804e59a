//! Request abstraction and body/query parsing.

use crate::error::AppError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{header, HeaderMap, Method};
use serde_json::{Map, Value};

/// What a request-accepting handler sees. A read-only snapshot; body access
/// goes through the bound arguments instead.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

impl RequestInfo {
    pub fn from_request(req: &Request) -> Self {
        RequestInfo {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(str::to_string),
            headers: req.headers().clone(),
        }
    }
}

pub fn is_body_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Parse urlencoded input (query string or form body) into a flat mapping;
/// the first value wins per key.
pub fn parse_urlencoded(input: &[u8]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in form_urlencoded::parse(input) {
        map.entry(k.into_owned())
            .or_insert_with(|| Value::String(v.into_owned()));
    }
    map
}

/// Parse the body of a body-carrying request into a flat argument map, by
/// declared content type. Missing or unsupported content types are the
/// client's error.
pub async fn parse_body(req: Request) -> Result<Map<String, Value>, AppError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_ascii_lowercase());
    let Some(ct) = content_type else {
        return Err(AppError::BadRequest("missing content-type".into()));
    };
    if ct.starts_with("application/json") {
        let bytes = read_body(req).await?;
        let parsed: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::BadRequest(format!("malformed JSON body: {}", e)))?;
        match parsed {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::BadRequest("JSON body must be an object".into())),
        }
    } else if ct.starts_with("application/x-www-form-urlencoded") {
        let bytes = read_body(req).await?;
        Ok(parse_urlencoded(&bytes))
    } else if ct.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?;
        let mut map = Map::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let text = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?;
            map.entry(name).or_insert(Value::String(text));
        }
        Ok(map)
    } else {
        Err(AppError::BadRequest(format!(
            "unsupported content-type: {}",
            ct
        )))
    }
}

async fn read_body(req: Request) -> Result<axum::body::Bytes, AppError> {
    // the router applies the real size cap as a layer
    axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde_json::json;

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = Request::builder().method(Method::POST).uri("/x");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[test]
    fn urlencoded_first_value_wins() {
        let map = parse_urlencoded(b"name=a&name=b&page=2");
        assert_eq!(map.get("name"), Some(&json!("a")));
        assert_eq!(map.get("page"), Some(&json!("2")));
    }

    #[tokio::test]
    async fn json_object_body_binds() {
        let req = request(Some("application/json"), r#"{"name":"x","n":1}"#);
        let map = parse_body(req).await.unwrap();
        assert_eq!(map.get("name"), Some(&json!("x")));
        assert_eq!(map.get("n"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn non_object_json_is_a_bad_request() {
        let req = request(Some("application/json"), "[1,2]");
        let err = parse_body(req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn form_body_binds() {
        let req = request(
            Some("application/x-www-form-urlencoded"),
            "email=a%40b.c&passwd=secret",
        );
        let map = parse_body(req).await.unwrap();
        assert_eq!(map.get("email"), Some(&json!("a@b.c")));
        assert_eq!(map.get("passwd"), Some(&json!("secret")));
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let err = parse_body(request(None, "x")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("content-type")));
    }

    #[tokio::test]
    async fn unsupported_content_type_is_a_bad_request() {
        let err = parse_body(request(Some("text/csv"), "a,b"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("text/csv")));
    }
}
