//! Route errors.
use async_graphql::ErrorExtensions;
use displaydoc::Display;
use http::StatusCode;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
use crate::graphql;

/// Error types for requests that are answered before the engine runs.
///
/// These are not returned to the client as is, they are converted to a
/// [`graphql::Error`] and paired with [`RouteError::status`].
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RouteError {
    /// {0}
    InvalidBody(String),

    /// Variables are invalid JSON.
    InvalidVariables,

    /// {0}
    InvalidGraphQLRequest(String),

    /// Must provide query string.
    MissingQuery,

    /// {message}
    ParseFailed {
        message: String,
        locations: Vec<graphql::Location>,
    },

    /// Unknown operation named "{0}".
    UnknownOperation(String),

    /// Must provide operation name if query contains multiple operations.
    OperationNameRequired,

    /// GraphQL operation is not supported
    UnsupportedOperation,

    /// Mutations can only be sent over HTTP POST
    MutationForbidden,

    /// GraphQL only supports GET and POST requests.
    MethodNotAllowed,
}

impl RouteError {
    /// The HTTP status this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::MutationForbidden | RouteError::MethodNotAllowed => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Convert the route error to a GraphQL error.
    ///
    /// Body and transport failures carry only their message, the rest carry
    /// an extension code as well.
    pub fn to_graphql_error(&self) -> graphql::Error {
        let code = match self {
            RouteError::InvalidBody(_) | RouteError::UnsupportedOperation => None,
            RouteError::InvalidVariables | RouteError::InvalidGraphQLRequest(_) => {
                Some("INVALID_GRAPHQL_REQUEST")
            }
            RouteError::MissingQuery => Some("GRAPHQL_MISSING_QUERY"),
            RouteError::ParseFailed { .. } => Some("GRAPHQL_PARSE_FAILED"),
            RouteError::UnknownOperation(_) | RouteError::OperationNameRequired => {
                Some("GRAPHQL_UNKNOWN_OPERATION_NAME")
            }
            RouteError::MutationForbidden => Some("MUTATION_FORBIDDEN"),
            RouteError::MethodNotAllowed => Some("METHOD_NOT_ALLOWED"),
        };
        let locations = match self {
            RouteError::ParseFailed { locations, .. } => locations.clone(),
            _ => Vec::new(),
        };

        graphql::Error::builder()
            .message(self.to_string())
            .locations(locations)
            .and_extension_code(code.map(str::to_string))
            .build()
    }
}

/// Errors raised by the redirect side channel.
///
/// They abort the resolver that registered the redirect; sibling fields keep
/// resolving normally.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RedirectError {
    /// Tried to perform more than one redirect in one operation (already had {existing}, then tried to redirect to {requested})
    Conflicting { existing: String, requested: String },

    /// redirect location is not a valid header value: {0}
    InvalidLocation(String),

    /// redirect header is invalid: {0}
    InvalidHeader(String),
}

impl RedirectError {
    pub(crate) fn extension_code(&self) -> &'static str {
        match self {
            RedirectError::Conflicting { .. } => "CONFLICTING_REDIRECT",
            RedirectError::InvalidLocation(_) => "INVALID_REDIRECT_LOCATION",
            RedirectError::InvalidHeader(_) => "INVALID_REDIRECT_HEADER",
        }
    }
}

impl ErrorExtensions for RedirectError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.extension_code();
        async_graphql::Error::new(self.to_string()).extend_with(|_, extensions| {
            extensions.set("code", async_graphql::Value::String(code.to_string()))
        })
    }
}

/// Build a resolver error carrying an application `code` and an HTTP `status`
/// in its extensions, for use with [`crate::MaxErrorStatus`].
pub fn error_with_status(
    message: impl Into<String>,
    code: &str,
    status: StatusCode,
) -> async_graphql::Error {
    let code = code.to_string();
    async_graphql::Error::new(message).extend_with(move |_, extensions| {
        extensions.set("code", async_graphql::Value::String(code));
        extensions.set(
            "status",
            async_graphql::Value::Number(status.as_u16().into()),
        );
    })
}
