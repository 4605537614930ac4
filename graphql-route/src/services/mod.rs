//! Implementation of the loader and action entry points.

use axum::body::Body;
use http::HeaderValue;

pub(crate) mod body;
pub mod route;

/// The HTTP response produced by a [`route::GraphQLRoute`].
pub type Response = http::Response<Body>;

pub(crate) static APPLICATION_JSON_HEADER_VALUE: HeaderValue =
    HeaderValue::from_static("application/json");
pub(crate) static TEXT_HTML_HEADER_VALUE: HeaderValue =
    HeaderValue::from_static("text/html; charset=utf-8");
