use axum::Router;
use axum::body::Body;
use graphql_route::GraphQLRoute;
use graphql_route::axum_factory;
use http::Request;
use http::Response;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use http::header::COOKIE;
use http::header::LOCATION;
use http::header::SET_COOKIE;
use jokes::Store;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use test_log::test;
use tower::ServiceExt;

fn app(store: Store) -> Router {
    let route =
        GraphQLRoute::from_configuration(jokes::schema(store), &jokes::default_configuration())
            .unwrap();
    axum_factory::main_router(route.clone(), "/graphql").merge(jokes::routes::router(route))
}

fn form(uri: &str, body: &str, session: Option<&str>) -> Request<Body> {
    let mut request = Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(session) = session {
        request = request.header(COOKIE, session);
    }
    request.body(Body::from(body.to_string())).unwrap()
}

fn page(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut request = Request::get(uri);
    if let Some(session) = session {
        request = request.header(COOKIE, session);
    }
    request.body(Body::empty()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `name=value` pair of the session cookie set by `response`.
fn session_of(response: &Response<Body>) -> String {
    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn register(app: &Router, username: &str) -> String {
    let response = app
        .clone()
        .oneshot(form(
            "/login",
            &format!("loginType=register&username={username}&password=secret123&redirectTo="),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    session_of(&response)
}

async fn create_joke(app: &Router, session: &str) -> String {
    let response = app
        .clone()
        .oneshot(form(
            "/jokes/new",
            "name=Knock+knock&content=Who%27s+there%3F+Interrupting+cow.",
            Some(session),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
    location.strip_prefix("/jokes/").unwrap().to_string()
}

#[test(tokio::test)]
async fn login_redirects_with_a_session_cookie() {
    let app = app(Store::seeded());
    let response = app
        .clone()
        .oneshot(form(
            "/login",
            "loginType=login&username=kody&password=twixrox&redirectTo=%2Fjokes%2Fnew",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/jokes/new");
    let session = session_of(&response);
    assert!(session.starts_with("RJ_session="));

    let response = app.oneshot(page("/jokes/new", Some(&session))).await.unwrap();
    assert_eq!(
        body_json(response).await,
        json!({ "data": { "me": { "username": "kody" } } })
    );
}

#[test(tokio::test)]
async fn empty_redirect_target_falls_back_to_jokes() {
    let response = app(Store::seeded())
        .oneshot(form(
            "/login",
            "loginType=login&username=kody&password=twixrox&redirectTo=",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/jokes");
}

#[test(tokio::test)]
async fn wrong_password_is_a_form_error() {
    let response = app(Store::seeded())
        .oneshot(form(
            "/login",
            "loginType=login&username=kody&password=nottwixrox",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["login"]["formError"],
        json!("Username/Password combination is incorrect")
    );
}

#[test(tokio::test)]
async fn invalid_fields_are_reported() {
    let response = app(Store::new())
        .oneshot(form(
            "/login",
            "loginType=register&username=ab&password=123",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["login"]["fieldErrors"],
        json!({
            "username": "Usernames must be at least 3 characters long",
            "password": "Passwords must be at least 6 characters long",
        })
    );
    assert_eq!(body["data"]["login"]["fields"]["loginType"], json!("register"));
}

#[test(tokio::test)]
async fn registering_a_taken_username_fails() {
    let response = app(Store::seeded())
        .oneshot(form(
            "/login",
            "loginType=register&username=kody&password=twixrox",
            None,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["login"]["formError"],
        json!("User with username kody already exists")
    );
}

#[test(tokio::test)]
async fn anonymous_joke_creation_goes_to_login() {
    let response = app(Store::seeded())
        .oneshot(form(
            "/jokes/new",
            "name=Knock+knock&content=Who%27s+there%3F",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(LOCATION).unwrap(),
        "/login?redirectTo=%2Fjokes%2Fnew"
    );
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["extensions"]["code"], json!("UNAUTHORIZED"));
    assert_eq!(body["errors"][0]["extensions"]["status"], json!(401));
}

#[test(tokio::test)]
async fn short_jokes_are_rejected() {
    let app = app(Store::new());
    let session = register(&app, "alice").await;
    let response = app
        .oneshot(form("/jokes/new", "name=ab&content=short", Some(&session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["data"]["createJoke"]["fieldErrors"],
        json!({
            "name": "That joke's name is too short",
            "content": "That joke is too short",
        })
    );
    assert_eq!(body["data"]["createJoke"]["joke"], Value::Null);
}

#[test(tokio::test)]
async fn created_jokes_can_be_read_back() {
    let app = app(Store::new());
    let session = register(&app, "alice").await;
    let joke_id = create_joke(&app, &session).await;

    let response = app
        .oneshot(page(&format!("/jokes/{joke_id}"), Some(&session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["joke"]["name"], json!("Knock knock"));
    assert_eq!(body["data"]["joke"]["jokster"]["id"], body["data"]["me"]["id"]);
}

#[test(tokio::test)]
async fn owners_delete_their_jokes() {
    let app = app(Store::new());
    let session = register(&app, "alice").await;
    let joke_id = create_joke(&app, &session).await;

    let response = app
        .clone()
        .oneshot(form(
            &format!("/jokes/{joke_id}"),
            "_method=delete",
            Some(&session),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/jokes");

    let response = app
        .oneshot(page(&format!("/jokes/{joke_id}"), None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["data"]["joke"], Value::Null);
}

#[test(tokio::test)]
async fn deleting_someone_elses_joke_is_unauthorized() {
    let app = app(Store::new());
    let alice = register(&app, "alice").await;
    let bobby = register(&app, "bobby").await;
    let joke_id = create_joke(&app, &alice).await;

    let response = app
        .oneshot(form(
            &format!("/jokes/{joke_id}"),
            "_method=delete",
            Some(&bobby),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(LOCATION).is_none());
    let body = body_json(response).await;
    assert_eq!(
        body["errors"][0]["message"],
        json!("Pssh, nice try. That's not your joke")
    );
}

#[test(tokio::test)]
async fn deleting_a_missing_joke_is_not_found() {
    let app = app(Store::new());
    let session = register(&app, "alice").await;

    let response = app
        .oneshot(form("/jokes/nope", "_method=delete", Some(&session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["errors"][0]["extensions"]["code"],
        json!("NOT_FOUND")
    );
}

#[test(tokio::test)]
async fn graphql_endpoint_derives_statuses_too() {
    let app = app(Store::new());
    let session = register(&app, "alice").await;

    let request = Request::post("/graphql")
        .header(CONTENT_TYPE, "application/json")
        .header(COOKIE, &session)
        .body(Body::from(
            json!({ "query": "mutation { editJoke(method: delete, id: \"nope\") { id } }" })
                .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test(tokio::test)]
async fn logout_clears_the_session() {
    let app = app(Store::new());
    let session = register(&app, "alice").await;

    let response = app
        .clone()
        .oneshot(form("/logout", "", Some(&session)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
    assert!(
        response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    let response = app.oneshot(page("/jokes/new", Some(&session))).await.unwrap();
    assert_eq!(body_json(response).await, json!({ "data": { "me": null } }));
}

#[test(tokio::test)]
async fn logout_page_redirects() {
    let response = app(Store::new())
        .oneshot(page("/logout", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
}

#[test(tokio::test)]
async fn jokes_page_lists_the_newest_five() {
    let response = app(Store::seeded())
        .oneshot(page("/jokes", None))
        .await
        .unwrap();
    let body = body_json(response).await;
    let names: Vec<_> = body["data"]["jokes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|joke| joke["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["Elevator", "Dinner", "Hippos", "Skeletons", "Trees"]
    );
    assert_eq!(body["data"]["me"], Value::Null);
    assert!(body["data"]["randomJoke"]["content"].is_string());
}
