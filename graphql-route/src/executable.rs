//! Main entry point for binaries serving a schema.

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use async_graphql::Executor;
use axum::Router;
use clap::Parser;

use crate::axum_factory;
use crate::configuration::Configuration;
use crate::configuration::generate_config_schema;
use crate::services::route::GraphQLRoute;
use crate::subscriber;
use crate::subscriber::LogFormat;

/// Options for the server.
#[derive(Parser, Debug)]
#[clap(name = "graphql-route", about = "Serves a GraphQL schema over HTTP")]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace), or any `EnvFilter` directive.
    #[clap(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "GRAPHQL_ROUTE_LOG"
    )]
    log_level: String,

    /// Log line format.
    #[clap(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Configuration file location.
    #[clap(short, long = "config", env = "GRAPHQL_ROUTE_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Prints the configuration schema.
    #[clap(long)]
    schema: bool,

    /// Prints the SDL of the served GraphQL schema.
    #[clap(long)]
    sdl: bool,
}

type RoutesFn<E> = Box<dyn FnOnce(GraphQLRoute<E>) -> Router + Send>;

/// Entry point into creating a server executable.
///
/// ```ignore
/// Executable::new(schema.clone())
///     .sdl(schema.sdl())
///     .routes(|route| Router::new().route("/logout", post(move |req| async move {
///         route.execute_with_query(req, "mutation { logout }", None, std::iter::empty::<(String, String)>()).await
///     })))
///     .start()
///     .await
/// ```
pub struct Executable<E> {
    schema: E,
    sdl: Option<String>,
    configuration: Option<Configuration>,
    routes: Option<RoutesFn<E>>,
}

impl<E: Executor> Executable<E> {
    pub fn new(schema: E) -> Self {
        Self {
            schema,
            sdl: None,
            configuration: None,
            routes: None,
        }
    }

    /// The SDL printed by `--sdl`.
    pub fn sdl(mut self, sdl: impl Into<String>) -> Self {
        self.sdl = Some(sdl.into());
        self
    }

    /// The configuration used when no `--config` is given.
    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Extra routes served next to the GraphQL endpoint, built from the
    /// configured route.
    pub fn routes<F>(mut self, routes: F) -> Self
    where
        F: FnOnce(GraphQLRoute<E>) -> Router + Send + 'static,
    {
        self.routes = Some(Box::new(routes));
        self
    }

    /// Parse the command line, set up logging and serve until ctrl-c.
    pub async fn start(self) -> Result<()> {
        self.start_with(Opt::parse()).await
    }

    async fn start_with(self, opt: Opt) -> Result<()> {
        if opt.schema {
            let schema = generate_config_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        if opt.sdl {
            let sdl = self
                .sdl
                .as_deref()
                .ok_or_else(|| anyhow!("this executable was built without an SDL to print"))?;
            println!("{sdl}");
            return Ok(());
        }

        subscriber::init(&opt.log_level, opt.log_format)?;

        let (configuration, router) = self.configured(opt.config_path)?;

        let server = axum_factory::start(router, configuration.server.listen)
            .await
            .with_context(|| format!("could not listen on {}", configuration.server.listen))?;

        tokio::signal::ctrl_c()
            .await
            .context("could not listen for ctrl-c")?;
        tracing::info!("shutting down");
        server.shutdown().await?;
        Ok(())
    }

    /// The configuration from `config_path` (or the built-in one) and the
    /// router serving it.
    fn configured(mut self, config_path: Option<PathBuf>) -> Result<(Configuration, Router)> {
        let configuration = load_configuration(config_path, self.configuration.take())?;
        let router = self.router(&configuration)?;
        Ok((configuration, router))
    }

    fn router(self, configuration: &Configuration) -> Result<Router> {
        let route = GraphQLRoute::from_configuration(self.schema, configuration)?;
        let mut router = axum_factory::main_router(route.clone(), &configuration.server.graphql_path);
        if let Some(routes) = self.routes {
            router = router.merge(routes(route));
        }
        Ok(axum_factory::with_tracing(router))
    }
}

fn load_configuration(
    path: Option<PathBuf>,
    fallback: Option<Configuration>,
) -> Result<Configuration> {
    match path {
        Some(path) => {
            let path = if path.is_relative() {
                std::env::current_dir()?.join(path)
            } else {
                path
            };
            tracing::info!("loading configuration from {}", path.display());
            Ok(Configuration::from_file(&path)?)
        }
        None => Ok(fallback.unwrap_or_default()),
    }
}
