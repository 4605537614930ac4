//! The request adapter: one HTTP request in, one engine execution, one HTTP
//! response out.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::Poll;

use async_graphql::Executor;
use axum::body::Body;
use futures::future::BoxFuture;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::StatusCode;
use http::header::ALLOW;
use http::header::CONTENT_TYPE;
use http::header::LOCATION;
use serde_json::Map;
use serde_json::Value;
use tower::Service;
use tracing::Instrument;

use super::APPLICATION_JSON_HEADER_VALUE;
use super::Response;
use super::TEXT_HTML_HEADER_VALUE;
use super::body;
use crate::configuration::Configuration;
use crate::configuration::ConfigurationError;
use crate::configuration::Explorer;
use crate::configuration::Limits;
use crate::context::ContextSeed;
use crate::context::RequestContext;
use crate::engine;
use crate::error::RouteError;
use crate::explorer::ExplorerPage;
use crate::graphql;
use crate::request::IncomingRequest;
use crate::status::DefaultStatus;
use crate::status::DeriveStatus;

static ALLOW_POST: HeaderValue = HeaderValue::from_static("POST");
static ALLOW_GET_POST: HeaderValue = HeaderValue::from_static("GET, POST");

/// Serves one GraphQL schema.
///
/// [`GraphQLRoute::loader`] and [`GraphQLRoute::action`] are the read-only and
/// the mutating entry points; the route is also a [`tower::Service`] that
/// dispatches on the request method, so it can be mounted with
/// `axum::Router::route_service`.
#[derive(Clone)]
pub struct GraphQLRoute<E> {
    schema: E,
    status_deriver: Arc<dyn DeriveStatus>,
    seed: Arc<ContextSeed>,
    explorer: ExplorerPage,
    limits: Limits,
}

impl<E: Executor> GraphQLRoute<E> {
    /// A route with the default status deriver, an empty context seed and
    /// the explorer pointing at `/graphql`.
    pub fn new(schema: E) -> Self {
        Self {
            schema,
            status_deriver: Arc::new(DefaultStatus),
            seed: Arc::new(ContextSeed::default()),
            explorer: ExplorerPage::new(&Explorer::default(), "/graphql"),
            limits: Limits::default(),
        }
    }

    /// A route set up from `configuration`.
    pub fn from_configuration(
        schema: E,
        configuration: &Configuration,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            schema,
            status_deriver: configuration.status.derivation.deriver(),
            seed: Arc::new(configuration.context_seed()?),
            explorer: ExplorerPage::new(
                &configuration.explorer,
                &configuration.server.graphql_path,
            ),
            limits: configuration.limits.clone(),
        })
    }

    pub fn with_status_deriver(mut self, status_deriver: impl DeriveStatus) -> Self {
        self.status_deriver = Arc::new(status_deriver);
        self
    }

    pub fn with_context(mut self, seed: ContextSeed) -> Self {
        self.seed = Arc::new(seed);
        self
    }

    pub fn with_explorer(mut self, explorer: &Explorer, endpoint: &str) -> Self {
        self.explorer = ExplorerPage::new(explorer, endpoint);
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn schema(&self) -> &E {
        &self.schema
    }

    /// Adapt an already decoded request.
    pub async fn handle(&self, incoming: IncomingRequest) -> Response {
        if let Some(page) = self.explorer.for_request(&incoming) {
            return http::Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, TEXT_HTML_HEADER_VALUE.clone())
                .body(Body::from(page))
                .unwrap_or_else(|err| internal_error(err.to_string()));
        }

        let params = if incoming.is_read_only() {
            graphql::Request::from_query_params(incoming.query())
        } else if incoming.method() == Method::POST {
            incoming
                .body()
                .map(graphql::Request::from_body)
                .unwrap_or_else(|| Ok(graphql::Request::default()))
        } else {
            Err(RouteError::MethodNotAllowed)
        };
        let params = match params {
            Ok(params) => params,
            Err(err) => return route_error(err),
        };

        let method = incoming.method().clone();
        self.run(incoming, params, &method).await
    }

    /// The read-only entry point: parameters come from the query string and
    /// the body is never read.
    pub async fn loader(&self, request: http::Request<Body>) -> Response {
        let (parts, _body) = request.into_parts();
        self.handle(IncomingRequest::from_parts(&parts, None)).await
    }

    /// The mutating entry point: parameters come from the JSON body.
    ///
    /// The body is checked before the method, so any method carrying a
    /// non-JSON body is an invalid body.
    pub async fn action(&self, request: http::Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        match body::read_json(&parts.headers, body, self.limits.http_max_request_bytes).await {
            Ok(body) => self.handle(IncomingRequest::from_parts(&parts, Some(body))).await,
            Err(err) => route_error(err),
        }
    }

    /// Execute a query fixed by the call site.
    ///
    /// Unless `variables` are given, they are the route parameters overlaid
    /// with the fields of a url-encoded form body. The operation is treated
    /// as sent over POST whatever the method, so forms can run mutations.
    pub async fn execute_with_query<P, K, V>(
        &self,
        request: http::Request<Body>,
        query: &str,
        variables: Option<Map<String, Value>>,
        route_params: P,
    ) -> Response
    where
        P: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (parts, body) = request.into_parts();
        let variables = match variables {
            Some(variables) => variables,
            None => {
                let mut variables: Map<String, Value> = route_params
                    .into_iter()
                    .map(|(key, value)| (key.into(), Value::String(value.into())))
                    .collect();
                if parts.method != Method::GET && parts.method != Method::HEAD {
                    variables.extend(
                        body::read_form(&parts.headers, body, self.limits.http_max_request_bytes)
                            .await,
                    );
                }
                variables
            }
        };

        let params = graphql::Request::builder()
            .query(query)
            .variables(variables)
            .build();
        self.run(IncomingRequest::from_parts(&parts, None), params, &Method::POST)
            .await
    }

    async fn run(
        &self,
        incoming: IncomingRequest,
        params: graphql::Request,
        method: &Method,
    ) -> Response {
        if let Err(err) = engine::classify(&params, method) {
            tracing::debug!("rejected GraphQL request: {err}");
            return route_error(err);
        }

        let context = RequestContext::new(Arc::new(incoming), self.seed.clone());
        let redirect = context.redirect_signal().clone();
        let execution = engine::execute(&self.schema, params, context).await;

        let mut status = self
            .status_deriver
            .derive_status(&execution.payload, execution.status);
        let mut headers = execution.headers;
        if let Some((target, extra_headers)) = redirect.take() {
            status = StatusCode::FOUND;
            for (name, value) in extra_headers.iter() {
                headers.append(name.clone(), value.clone());
            }
            match HeaderValue::from_str(&target) {
                Ok(location) => {
                    headers.insert(LOCATION, location);
                }
                Err(err) => return internal_error(err.to_string()),
            }
        }

        tracing::debug!(status = status.as_u16(), "GraphQL request executed");
        json_response(status, &execution.payload, headers)
    }
}

impl<E: Executor> Service<http::Request<Body>> for GraphQLRoute<E> {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Body>) -> Self::Future {
        let route = self.clone();
        let span = tracing::info_span!(
            "graphql_route",
            "http.method" = %request.method(),
            "http.path" = request.uri().path(),
        );
        Box::pin(
            async move {
                let response = match *request.method() {
                    Method::GET | Method::HEAD => route.loader(request).await,
                    _ => route.action(request).await,
                };
                Ok(response)
            }
            .instrument(span),
        )
    }
}

fn route_error(err: RouteError) -> Response {
    let status = err.status();
    let mut headers = HeaderMap::new();
    match err {
        RouteError::MutationForbidden => {
            headers.insert(ALLOW, ALLOW_POST.clone());
        }
        RouteError::MethodNotAllowed => {
            headers.insert(ALLOW, ALLOW_GET_POST.clone());
        }
        _ => {}
    }
    let payload = graphql::Response::builder()
        .error(err.to_graphql_error())
        .build();
    json_response(status, &payload, headers)
}

fn json_response(status: StatusCode, payload: &graphql::Response, headers: HeaderMap) -> Response {
    let body = match serde_json::to_vec(payload) {
        Ok(body) => body,
        Err(err) => return internal_error(err.to_string()),
    };
    let mut response = http::Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, APPLICATION_JSON_HEADER_VALUE.clone());
    response
}

fn internal_error(reason: String) -> Response {
    tracing::error!("failed to build GraphQL response: {reason}");
    let mut response = http::Response::new(Body::from(
        r#"{"errors":[{"message":"Internal server error"}]}"#,
    ));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, APPLICATION_JSON_HEADER_VALUE.clone());
    response
}
