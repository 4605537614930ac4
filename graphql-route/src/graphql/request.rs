use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::RouteError;
use crate::request::QueryParams;

/// The GraphQL parameters extracted from an HTTP request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Request {
    /// The GraphQL operation (e.g., query, mutation) string.
    ///
    /// For historical purposes, the term "query" is commonly used to refer to
    /// *any* GraphQL operation which might be, e.g., a `mutation`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query: Option<String>,

    /// The (optional) GraphQL operation name.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    /// The (optional) GraphQL variables in the form of a JSON object.
    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub variables: Map<String, Value>,
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    fn new(
        query: Option<String>,
        operation_name: Option<String>,
        variables: Map<String, Value>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables,
        }
    }

    /// Read the parameters of a GET request from its query string fields.
    ///
    /// `variables` is a JSON document; when a field is repeated the first
    /// value wins.
    pub fn from_query_params(params: &QueryParams) -> Result<Request, RouteError> {
        let variables = params
            .first("variables")
            .map(|variables| parse_variables(&Value::String(variables.to_string())))
            .transpose()?
            .unwrap_or_default();

        Ok(Request {
            query: params.first("query").map(str::to_string),
            operation_name: params.first("operationName").map(str::to_string),
            variables,
        })
    }

    /// Read the parameters of a mutating request from its decoded JSON body.
    pub fn from_body(body: &Value) -> Result<Request, RouteError> {
        let object = body.as_object().ok_or_else(|| {
            RouteError::InvalidGraphQLRequest("Request body must be a JSON object".to_string())
        })?;

        let query = match object.get("query") {
            None | Some(Value::Null) => None,
            Some(Value::String(query)) => Some(query.clone()),
            Some(_) => {
                return Err(RouteError::InvalidGraphQLRequest(
                    "`query` must be a string".to_string(),
                ));
            }
        };
        let operation_name = match object.get("operationName") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(_) => {
                return Err(RouteError::InvalidGraphQLRequest(
                    "`operationName` must be a string".to_string(),
                ));
            }
        };
        let variables = object
            .get("variables")
            .map(parse_variables)
            .transpose()?
            .unwrap_or_default();

        Ok(Request {
            query,
            operation_name,
            variables,
        })
    }
}

// Variables may arrive as an object, as null, or as a string holding JSON.
fn parse_variables(value: &Value) -> Result<Map<String, Value>, RouteError> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(variables) => Ok(variables.clone()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(variables)) => Ok(variables),
            Ok(Value::Null) => Ok(Map::new()),
            _ => Err(RouteError::InvalidVariables),
        },
        _ => Err(RouteError::InvalidVariables),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_query_params_works() {
        let params = QueryParams::parse(
            "query=query+aTest%28%24arg1%3A+String%21%29+%7B+test%28who%3A+%24arg1%29+%7D&operationName=aTest&variables=%7B%22arg1%22%3A%22me%22%7D",
        );
        let request = Request::from_query_params(&params).unwrap();
        assert_eq!(
            request,
            Request::builder()
                .query("query aTest($arg1: String!) { test(who: $arg1) }")
                .operation_name("aTest")
                .variables(json!({ "arg1": "me" }).as_object().cloned().unwrap())
                .build()
        );
    }

    #[test]
    fn from_query_params_rejects_invalid_variables() {
        let params = QueryParams::parse("query=%7Bping%7D&variables=%7Bnope");
        assert_eq!(
            Request::from_query_params(&params),
            Err(RouteError::InvalidVariables)
        );
    }

    #[test]
    fn from_body_works() {
        let request = Request::from_body(&json!({
            "query": "{ ping }",
            "operationName": null,
            "variables": { "a": 1 }
        }))
        .unwrap();
        assert_eq!(request.query.as_deref(), Some("{ ping }"));
        assert_eq!(request.operation_name, None);
        assert_eq!(request.variables.get("a"), Some(&json!(1)));
    }

    #[test]
    // some clients send { "variables": null }
    fn from_body_accepts_null_variables() {
        let request = Request::from_body(&json!({ "query": "{ ping }", "variables": null })).unwrap();
        assert!(request.variables.is_empty());
    }

    #[test]
    fn from_body_accepts_stringified_variables() {
        let request =
            Request::from_body(&json!({ "query": "{ ping }", "variables": "{\"a\":true}" }))
                .unwrap();
        assert_eq!(request.variables.get("a"), Some(&json!(true)));
    }

    #[test]
    fn from_body_rejects_batches() {
        assert!(matches!(
            Request::from_body(&json!([{ "query": "{ ping }" }])),
            Err(RouteError::InvalidGraphQLRequest(_))
        ));
    }

    #[test]
    fn from_body_rejects_non_string_query() {
        assert!(matches!(
            Request::from_body(&json!({ "query": 3 })),
            Err(RouteError::InvalidGraphQLRequest(_))
        ));
    }
}
