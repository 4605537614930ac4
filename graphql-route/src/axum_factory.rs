//! Mounting a [`GraphQLRoute`] in an axum server.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_graphql::Executor;
use axum::Router;
use axum::body::Body;
use http::Request;
use http::Response;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::services::route::GraphQLRoute;

/// A router serving `route` at `path`, for both loaders and actions.
pub fn main_router<E: Executor>(route: GraphQLRoute<E>, path: &str) -> Router {
    Router::new().route_service(path, route)
}

/// Wrap `router` with request tracing.
pub fn with_tracing(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    "http.method" = %request.method(),
                    "http.route" = request.uri().path(),
                    "http.status_code" = tracing::field::Empty,
                )
            })
            .on_response(|response: &Response<_>, duration: Duration, span: &Span| {
                span.record("http.status_code", response.status().as_u16());
                tracing::debug!(latency_ms = duration.as_millis() as u64, "response sent");
            }),
    )
}

/// A running HTTP server.
#[derive(Debug)]
pub struct HttpServerHandle {
    shutdown_sender: oneshot::Sender<()>,
    server_future: JoinHandle<io::Result<()>>,
    listen_address: SocketAddr,
}

impl HttpServerHandle {
    /// The address the server actually listens on, useful when binding port 0.
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) -> io::Result<()> {
        // The receiver is gone if the server already stopped
        let _ = self.shutdown_sender.send(());
        self.server_future.await.map_err(io::Error::other)?
    }
}

/// Bind `listen` and serve `router` in the background.
pub async fn start(router: Router, listen: SocketAddr) -> io::Result<HttpServerHandle> {
    let listener = TcpListener::bind(listen).await?;
    let listen_address = listener.local_addr()?;
    let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

    let server_future = tokio::spawn(serve(listener, router, async {
        let _ = shutdown_receiver.await;
    }));
    tracing::info!("GraphQL endpoint exposed at http://{listen_address}");

    Ok(HttpServerHandle {
        shutdown_sender,
        server_future,
        listen_address,
    })
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use async_graphql::EmptyMutation;
    use async_graphql::EmptySubscription;
    use async_graphql::Object;
    use async_graphql::Schema;
    use tokio::io::AsyncReadExt;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    use super::*;

    struct Query;

    #[Object]
    impl Query {
        async fn ping(&self) -> &str {
            "pong"
        }
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let schema = Schema::build(Query, EmptyMutation, EmptySubscription).finish();
        let router = with_tracing(main_router(GraphQLRoute::new(schema), "/graphql"));
        let server = start(router, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let mut stream = TcpStream::connect(server.listen_address()).await.unwrap();
        stream
            .write_all(
                b"GET /graphql?query=%7Bping%7D HTTP/1.1\r\nhost: localhost\r\naccept: application/json\r\nconnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with(r#"{"data":{"ping":"pong"}}"#));

        server.shutdown().await.unwrap();
    }
}
