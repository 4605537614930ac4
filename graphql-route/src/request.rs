use http::HeaderMap;
use http::Method;
use http::Uri;
use http::request::Parts;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;
use serde_json::Value;

/// One query string field: a single value, or all values of a repeated key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    /// The first value seen for this key.
    pub fn first(&self) -> &str {
        match self {
            QueryValue::Single(value) => value,
            QueryValue::Multiple(values) => values.first().map(String::as_str).unwrap_or_default(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => {
                *self = QueryValue::Multiple(vec![std::mem::take(first), value]);
            }
            QueryValue::Multiple(values) => values.push(value),
        }
    }
}

/// Decoded query string fields, in the order their keys were first seen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(IndexMap<String, QueryValue>);

impl QueryParams {
    /// Decode a raw (still url-encoded) query string.
    pub fn parse(query: &str) -> Self {
        let mut params: IndexMap<String, QueryValue> = IndexMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match params.entry(key.into_owned()) {
                Entry::Occupied(mut entry) => entry.get_mut().push(value.into_owned()),
                Entry::Vacant(entry) => {
                    entry.insert(QueryValue::Single(value.into_owned()));
                }
            }
        }
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.get(key)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(QueryValue::first)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The inbound HTTP request as seen by the engine and by resolvers.
///
/// The body, when present, has already been decoded from JSON.
#[derive(Clone, Debug)]
pub struct IncomingRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: QueryParams,
    body: Option<Value>,
}

#[buildstructor::buildstructor]
impl IncomingRequest {
    #[builder(visibility = "pub")]
    fn new(method: Method, uri: Uri, headers: Option<HeaderMap>, body: Option<Value>) -> Self {
        let query = uri.query().map(QueryParams::parse).unwrap_or_default();
        Self {
            method,
            uri,
            headers: headers.unwrap_or_default(),
            query,
            body,
        }
    }

    pub(crate) fn from_parts(parts: &Parts, body: Option<Value>) -> Self {
        Self::new(
            parts.method.clone(),
            parts.uri.clone(),
            Some(parts.headers.clone()),
            body,
        )
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether the GraphQL parameters come from the query string.
    pub(crate) fn is_read_only(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}
