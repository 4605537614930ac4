use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::graphql::Error;

/// The payload of one executed GraphQL operation, as sent to the client.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional graphql extensions.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub extensions: Map<String, Value>,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>, extensions: Map<String, Value>) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }

    /// The `status` extension of every error that carries one.
    pub fn error_statuses(&self) -> impl Iterator<Item = u16> + '_ {
        self.errors.iter().filter_map(|error| error.extensions.status)
    }
}

impl From<async_graphql::Response> for Response {
    fn from(response: async_graphql::Response) -> Self {
        let data = match response.data.into_json() {
            Ok(Value::Null) => None,
            Ok(data) => Some(data),
            Err(err) => {
                tracing::error!("could not convert response data to JSON: {err}");
                None
            }
        };
        let extensions = response
            .extensions
            .into_iter()
            .filter_map(|(key, value)| value.into_json().ok().map(|value| (key, value)))
            .collect();

        Self {
            data,
            errors: response.errors.into_iter().map(Error::from).collect(),
            extensions,
        }
    }
}
