//! Classifying and executing an operation with the engine.

use async_graphql::Executor;
use async_graphql::Variables;
use async_graphql::parser::types::DocumentOperations;
use async_graphql::parser::types::OperationType;
use http::HeaderMap;
use http::Method;
use http::StatusCode;

use crate::context::RequestContext;
use crate::error::RouteError;
use crate::graphql;

/// What the engine returned for one operation.
pub(crate) struct Execution {
    pub(crate) payload: graphql::Response,
    pub(crate) status: StatusCode,
    /// Headers resolvers set through `async_graphql::Context`.
    pub(crate) headers: HeaderMap,
}

/// Find the operation `request` selects, rejecting what this transport
/// cannot execute.
///
/// `method` is the method the operation is treated as sent with, which is
/// what decides whether mutations are allowed.
pub(crate) fn classify(
    request: &graphql::Request,
    method: &Method,
) -> Result<OperationType, RouteError> {
    let query = request
        .query
        .as_deref()
        .filter(|query| !query.trim().is_empty())
        .ok_or(RouteError::MissingQuery)?;

    let document = async_graphql::parser::parse_query(query).map_err(|err| {
        let locations = err
            .positions()
            .map(|pos| graphql::Location {
                line: pos.line as u32,
                column: pos.column as u32,
            })
            .collect();
        RouteError::ParseFailed {
            message: err.to_string(),
            locations,
        }
    })?;

    let operation_type = match (&document.operations, request.operation_name.as_deref()) {
        (DocumentOperations::Single(operation), None) => operation.node.ty,
        (DocumentOperations::Single(_), Some(name)) => {
            return Err(RouteError::UnknownOperation(name.to_string()));
        }
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .iter()
            .find(|(operation_name, _)| operation_name.as_str() == name)
            .map(|(_, operation)| operation.node.ty)
            .ok_or_else(|| RouteError::UnknownOperation(name.to_string()))?,
        (DocumentOperations::Multiple(operations), None) => {
            let mut operations = operations.values();
            match (operations.next(), operations.next()) {
                (Some(operation), None) => operation.node.ty,
                _ => return Err(RouteError::OperationNameRequired),
            }
        }
    };

    match operation_type {
        OperationType::Subscription => Err(RouteError::UnsupportedOperation),
        OperationType::Mutation if method != Method::POST => Err(RouteError::MutationForbidden),
        operation_type => Ok(operation_type),
    }
}

/// Execute `request` against `schema` with `context` as request data.
pub(crate) async fn execute<E: Executor>(
    schema: &E,
    request: graphql::Request,
    context: RequestContext,
) -> Execution {
    let mut engine_request = async_graphql::Request::new(request.query.unwrap_or_default())
        .variables(Variables::from_json(serde_json::Value::Object(
            request.variables,
        )))
        .data(context);
    if let Some(operation_name) = request.operation_name {
        engine_request = engine_request.operation_name(operation_name);
    }

    let mut response = schema.execute(engine_request).await;
    let headers = std::mem::take(&mut response.http_headers);
    let payload = graphql::Response::from(response);

    Execution {
        status: default_status(&payload),
        payload,
        headers,
    }
}

/// 400 when the operation never ran: no data and only errors not tied to a
/// field, as validation and variable coercion failures are. 200 otherwise.
fn default_status(payload: &graphql::Response) -> StatusCode {
    let rejected = payload.data.is_none()
        && !payload.errors.is_empty()
        && payload.errors.iter().all(|error| error.path.is_none());
    if rejected {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    }
}
