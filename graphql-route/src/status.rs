//! Deriving the HTTP status of an executed operation.

use http::StatusCode;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::graphql;

/// Maps an execution payload and the engine's default status to the status
/// of the HTTP response.
///
/// Implemented for plain functions and closures with the same signature.
pub trait DeriveStatus: Send + Sync + 'static {
    fn derive_status(&self, payload: &graphql::Response, default: StatusCode) -> StatusCode;
}

impl<F> DeriveStatus for F
where
    F: Fn(&graphql::Response, StatusCode) -> StatusCode + Send + Sync + 'static,
{
    fn derive_status(&self, payload: &graphql::Response, default: StatusCode) -> StatusCode {
        self(payload, default)
    }
}

/// Keeps the engine's status.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultStatus;

impl DeriveStatus for DefaultStatus {
    fn derive_status(&self, _payload: &graphql::Response, default: StatusCode) -> StatusCode {
        default
    }
}

/// Uses the highest of the engine's status and every `extensions.status`
/// found on the payload errors, so that one authorization failure among
/// otherwise successful fields still answers 401/403.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxErrorStatus;

impl DeriveStatus for MaxErrorStatus {
    fn derive_status(&self, payload: &graphql::Response, default: StatusCode) -> StatusCode {
        payload
            .error_statuses()
            .filter_map(|status| StatusCode::from_u16(status).ok())
            .fold(default, std::cmp::max)
    }
}

/// Status derivation selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusDerivation {
    /// Keep the engine's status.
    #[default]
    Default,
    /// Promote to the highest status found in error extensions.
    MaxErrorStatus,
}

impl StatusDerivation {
    pub(crate) fn deriver(self) -> std::sync::Arc<dyn DeriveStatus> {
        match self {
            StatusDerivation::Default => std::sync::Arc::new(DefaultStatus),
            StatusDerivation::MaxErrorStatus => std::sync::Arc::new(MaxErrorStatus),
        }
    }
}
