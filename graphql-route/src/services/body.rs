//! Reading and decoding request bodies.

use std::sync::LazyLock;

use axum::body::Body;
use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use regex::Regex;
use serde_json::Map;
use serde_json::Value;

use crate::error::RouteError;

static JSON_CONTENT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^application/(graphql\+)?json").expect("valid regex"));

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Whether the declared content type is `application/json` or
/// `application/graphql+json`.
pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    JSON_CONTENT_TYPE.is_match(content_type(headers))
}

/// Buffer the whole body, failing past `limit` bytes.
pub(crate) async fn read(body: Body, limit: usize) -> Result<Bytes, RouteError> {
    axum::body::to_bytes(body, limit).await.map_err(|err| {
        tracing::debug!("failed to read request body: {err}");
        RouteError::InvalidBody(err.to_string())
    })
}

/// Read and decode a JSON request body.
pub(crate) async fn read_json(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Value, RouteError> {
    if !is_json(headers) {
        return Err(RouteError::InvalidBody(
            "Request body does not contain JSON".to_string(),
        ));
    }
    let bytes = read(body, limit).await?;
    serde_json::from_slice(&bytes)
        .map_err(|_| RouteError::InvalidBody("Request body contains invalid JSON".to_string()))
}

/// Read form fields as string variables.
///
/// This never fails: anything that is not a readable url-encoded form is
/// logged and yields no variables.
pub(crate) async fn read_form(headers: &HeaderMap, body: Body, limit: usize) -> Map<String, Value> {
    let content_type = content_type(headers);
    if !content_type.starts_with(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()) {
        tracing::warn!(
            "parsing variables from form data failed: unsupported content type '{content_type}'"
        );
        return Map::new();
    }
    let bytes = match read(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("parsing variables from form data failed: {err}");
            return Map::new();
        }
    };
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes) {
        Ok(fields) => fields
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
        Err(err) => {
            tracing::warn!("parsing variables from form data failed: {err}");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde_json::json;
    use test_log::test;

    use super::*;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn json_family_content_types() {
        assert!(is_json(&headers("application/json")));
        assert!(is_json(&headers("application/json; charset=utf-8")));
        assert!(is_json(&headers("application/graphql+json")));
        assert!(!is_json(&headers("application/graphql-response+json")));
        assert!(!is_json(&headers("text/plain")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[test(tokio::test)]
    async fn decodes_json() {
        let value = read_json(
            &headers("application/json"),
            Body::from(r#"{"query":"{ ping }"}"#),
            1024,
        )
        .await
        .unwrap();
        assert_eq!(value, json!({ "query": "{ ping }" }));
    }

    #[test(tokio::test)]
    async fn rejects_invalid_json() {
        assert_eq!(
            read_json(&headers("application/json"), Body::from("{"), 1024).await,
            Err(RouteError::InvalidBody(
                "Request body contains invalid JSON".to_string()
            ))
        );
    }

    #[test(tokio::test)]
    async fn rejects_non_json_content_type() {
        assert_eq!(
            read_json(&headers("text/plain"), Body::from("{}"), 1024).await,
            Err(RouteError::InvalidBody(
                "Request body does not contain JSON".to_string()
            ))
        );
    }

    #[test(tokio::test)]
    async fn rejects_oversized_bodies() {
        assert!(matches!(
            read_json(&headers("application/json"), Body::from("[1,2,3,4,5,6,7,8]"), 4).await,
            Err(RouteError::InvalidBody(_))
        ));
    }

    #[test(tokio::test)]
    async fn decodes_forms() {
        let variables = read_form(
            &headers("application/x-www-form-urlencoded"),
            Body::from("name=Knock+knock&content=Who%27s+there%3F"),
            1024,
        )
        .await;
        assert_eq!(
            Value::Object(variables),
            json!({ "name": "Knock knock", "content": "Who's there?" })
        );
    }

    #[test(tokio::test)]
    async fn unreadable_forms_yield_no_variables() {
        let variables = read_form(&headers("application/json"), Body::from("{}"), 1024).await;
        assert!(variables.is_empty());
    }
}
