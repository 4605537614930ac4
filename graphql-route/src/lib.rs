//! Serves an [`async_graphql`] schema from loader/action style HTTP routes.
//!
//! A [`GraphQLRoute`] turns one inbound HTTP request into one execution of the
//! schema and the execution result back into an HTTP response. Resolvers can
//! ask for the response to become a redirect through the [`RequestContext`]
//! they find in their context data:
//!
//! ```ignore
//! #[Object]
//! impl Mutation {
//!     async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
//!         ctx.data::<RequestContext>()?.redirect_to("/login")?;
//!         Ok(true)
//!     }
//! }
//! ```

#![warn(unreachable_pub)]

pub mod axum_factory;
pub mod configuration;
mod context;
mod engine;
pub mod error;
mod executable;
mod explorer;
pub mod graphql;
mod request;
pub mod services;
mod status;
pub mod subscriber;

pub use configuration::Configuration;
pub use context::ContextSeed;
pub use context::Redirect;
pub use context::RequestContext;
pub use executable::Executable;
pub use request::IncomingRequest;
pub use request::QueryParams;
pub use request::QueryValue;
pub use services::route::GraphQLRoute;
pub use status::DefaultStatus;
pub use status::DeriveStatus;
pub use status::MaxErrorStatus;
