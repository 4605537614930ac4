//! Cookie sessions.

use std::sync::Arc;

use async_graphql::Context;
use cookie::Cookie;
use cookie::SameSite;
use cookie::time::Duration;
use graphql_route::IncomingRequest;
use graphql_route::RequestContext;
use graphql_route::error::error_with_status;
use http::StatusCode;
use http::header::COOKIE;

use crate::store::SESSION_TTL;
use crate::store::Store;

pub const SESSION_COOKIE: &str = "RJ_session";

pub(crate) const UNAUTHORIZED: &str = "UNAUTHORIZED";

/// The session id carried by the request cookies.
pub fn session_id(request: &IncomingRequest) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// The `Set-Cookie` value opening a session.
pub fn session_cookie(session_id: &str) -> String {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(SESSION_TTL.as_secs() as i64))
        .build()
        .to_string()
}

/// The `Set-Cookie` value clearing the session.
pub fn expired_cookie() -> String {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
        .to_string()
}

/// The logged in user, if any.
pub(crate) async fn user_id(ctx: &Context<'_>) -> async_graphql::Result<Option<String>> {
    let request = ctx.data::<RequestContext>()?.request();
    let Some(session_id) = session_id(request) else {
        return Ok(None);
    };
    Ok(ctx.data::<Arc<Store>>()?.session_user(&session_id).await)
}

/// The logged in user. Anonymous requests are sent to the login page and
/// fail with `UNAUTHORIZED`.
pub(crate) async fn require_user_id(ctx: &Context<'_>) -> async_graphql::Result<String> {
    if let Some(user_id) = user_id(ctx).await? {
        return Ok(user_id);
    }
    let context = ctx.data::<RequestContext>()?;
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("redirectTo", context.request().uri().path())
        .finish();
    context.redirect_to(&format!("/login?{query}"))?;
    Err(error_with_status(
        "You have to be logged in for that",
        UNAUTHORIZED,
        StatusCode::UNAUTHORIZED,
    ))
}
