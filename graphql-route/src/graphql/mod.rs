//! Types related to GraphQL requests, responses, etc.

mod request;
mod response;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

pub use request::Request;
pub use response::Response;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
/// The error location
pub struct Location {
    /// The line number
    pub line: u32,
    /// The column number
    pub column: u32,
}

/// The `extensions` of a GraphQL [`Error`].
///
/// `code` and `status` are typed so that a status deriver does not have to
/// probe the JSON shape; every other entry is kept untouched in `other`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorExtensions {
    /// The application error code.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,

    /// The HTTP status a resolver asked for.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<u16>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ErrorExtensions {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.status.is_none() && self.other.is_empty()
    }

    /// Split a raw extensions object into its typed parts.
    ///
    /// A `code` that is not a string or a `status` that does not fit an HTTP
    /// status code stays in `other`.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let code = match map.remove("code") {
            Some(Value::String(code)) => Some(code),
            Some(other) => {
                map.insert("code".to_string(), other);
                None
            }
            None => None,
        };
        let status = match map.remove("status") {
            Some(Value::Number(number)) => match number.as_u64().map(u16::try_from) {
                Some(Ok(status)) => Some(status),
                _ => {
                    map.insert("status".to_string(), Value::Number(number));
                    None
                }
            },
            Some(other) => {
                map.insert("status".to_string(), other);
                None
            }
            None => None,
        };
        Self {
            code,
            status,
            other: map,
        }
    }
}

/// A [GraphQL error](https://spec.graphql.org/October2021/#sec-Errors)
/// as may be found in the `errors` field of a GraphQL [`Response`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[non_exhaustive]
pub struct Error {
    /// The error message.
    pub message: String,

    /// The locations of the error in the GraphQL document of the originating request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,

    /// If this is a field error, the JSON path to that field in [`Response::data`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,

    /// The optional GraphQL extensions for this error.
    #[serde(skip_serializing_if = "ErrorExtensions::is_empty")]
    pub extensions: ErrorExtensions,
}

#[buildstructor::buildstructor]
impl Error {
    /// Returns a builder that builds a GraphQL [`Error`] from its components.
    ///
    /// `.message` is required, `.location` may be called multiple times,
    /// `.extension_code` and `.status` fill the typed extensions.
    #[builder(visibility = "pub")]
    fn new(
        message: String,
        locations: Vec<Location>,
        path: Option<Vec<Value>>,
        extension_code: Option<String>,
        status: Option<u16>,
    ) -> Self {
        Self {
            message,
            locations,
            path,
            extensions: ErrorExtensions {
                code: extension_code,
                status,
                other: Map::new(),
            },
        }
    }

    /// Extract the error code from [`Error::extensions`] if it is set.
    pub fn extension_code(&self) -> Option<String> {
        self.extensions.code.clone()
    }
}

impl From<async_graphql::ServerError> for Error {
    fn from(error: async_graphql::ServerError) -> Self {
        let extensions = error
            .extensions
            .as_ref()
            .and_then(|extensions| serde_json::to_value(extensions).ok())
            .and_then(|value| match value {
                Value::Object(map) => Some(ErrorExtensions::from_map(map)),
                _ => None,
            })
            .unwrap_or_default();
        let locations = error
            .locations
            .iter()
            .map(|pos| Location {
                line: pos.line as u32,
                column: pos.column as u32,
            })
            .collect();
        let path = (!error.path.is_empty()).then(|| {
            error
                .path
                .iter()
                .map(|segment| serde_json::to_value(segment).unwrap_or(Value::Null))
                .collect()
        });

        Self {
            message: error.message,
            locations,
            path,
            extensions,
        }
    }
}
