//! The jokes tutorial app: users log in, share jokes and delete their own,
//! with every page backed by one GraphQL operation.

use std::sync::Arc;

use graphql_route::Configuration;
use graphql_route::configuration::StatusDerivation;

pub mod routes;
pub mod schema;
pub mod session;
pub mod store;
pub mod validators;

pub use schema::JokesSchema;
pub use store::Store;

/// The schema over `store`.
pub fn schema(store: Store) -> JokesSchema {
    schema::build(Arc::new(store))
}

/// Defaults used without `--config`: errors carrying a status answer with it.
pub fn default_configuration() -> Configuration {
    let mut configuration = Configuration::default();
    configuration.status.derivation = StatusDerivation::MaxErrorStatus;
    configuration.explorer.title = "Remix Jokes".to_string();
    configuration
}
