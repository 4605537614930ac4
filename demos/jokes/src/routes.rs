//! Page routes, each running one fixed operation.
//!
//! Route parameters and form fields become the operation variables, so
//! plain HTML forms drive the mutations.

use axum::Router;
use axum::extract::Path;
use axum::extract::Request;
use axum::extract::State;
use axum::routing::get;
use axum::routing::post;
use graphql_route::GraphQLRoute;
use graphql_route::services::Response;
use http::StatusCode;
use http::header::LOCATION;

use crate::schema::JokesSchema;

type Route = State<GraphQLRoute<JokesSchema>>;

const NO_PARAMS: [(&str, &str); 0] = [];

pub const JOKES_QUERY: &str = r#"
query Jokes {
  me {
    username
  }
  jokes(orderBy: createdAt, orderDirection: desc, take: 5) {
    id
    name
  }
  randomJoke {
    id
    name
    content
  }
}
"#;

pub const JOKE_QUERY: &str = r#"
query Joke($jokeId: ID!) {
  me {
    id
  }
  joke(id: $jokeId) {
    name
    content
    jokster {
      id
    }
  }
}
"#;

pub const CREATE_JOKE_USER_QUERY: &str = r#"
query CreateJokeUser {
  me {
    username
  }
}
"#;

pub const LOGIN_MUTATION: &str = r#"
mutation Login(
  $loginType: LoginType!
  $username: String!
  $password: String!
  $redirectTo: String
) {
  login(
    loginType: $loginType
    username: $username
    password: $password
    redirectTo: $redirectTo
  ) {
    fields {
      loginType
      username
      password
    }
    fieldErrors {
      username
      password
    }
    formError
  }
}
"#;

pub const LOGOUT_MUTATION: &str = r#"
mutation Logout {
  logout
}
"#;

pub const CREATE_JOKE_MUTATION: &str = r#"
mutation CreateJoke($name: String!, $content: String!) {
  createJoke(name: $name, content: $content) {
    fields {
      name
      content
    }
    fieldErrors {
      name
      content
    }
    joke {
      id
    }
  }
}
"#;

pub const DELETE_JOKE_MUTATION: &str = r#"
mutation DeleteJoke($_method: Method!, $jokeId: ID!) {
  editJoke(method: $_method, id: $jokeId) {
    id
  }
}
"#;

/// The page routes, served next to the GraphQL endpoint.
pub fn router(route: GraphQLRoute<JokesSchema>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout_page).post(logout))
        .route("/jokes", get(jokes))
        .route("/jokes/new", get(new_joke).post(create_joke))
        .route("/jokes/{joke_id}", get(joke).post(delete_joke))
        .with_state(route)
}

async fn login(State(route): Route, request: Request) -> Response {
    route
        .execute_with_query(request, LOGIN_MUTATION, None, NO_PARAMS)
        .await
}

async fn logout(State(route): Route, request: Request) -> Response {
    route
        .execute_with_query(request, LOGOUT_MUTATION, None, NO_PARAMS)
        .await
}

async fn logout_page() -> (StatusCode, [(http::HeaderName, &'static str); 1]) {
    (StatusCode::FOUND, [(LOCATION, "/login")])
}

async fn jokes(State(route): Route, request: Request) -> Response {
    route
        .execute_with_query(request, JOKES_QUERY, None, NO_PARAMS)
        .await
}

async fn new_joke(State(route): Route, request: Request) -> Response {
    route
        .execute_with_query(request, CREATE_JOKE_USER_QUERY, None, NO_PARAMS)
        .await
}

async fn create_joke(State(route): Route, request: Request) -> Response {
    route
        .execute_with_query(request, CREATE_JOKE_MUTATION, None, NO_PARAMS)
        .await
}

async fn joke(State(route): Route, Path(joke_id): Path<String>, request: Request) -> Response {
    route
        .execute_with_query(request, JOKE_QUERY, None, [("jokeId", joke_id)])
        .await
}

async fn delete_joke(
    State(route): Route,
    Path(joke_id): Path<String>,
    request: Request,
) -> Response {
    route
        .execute_with_query(request, DELETE_JOKE_MUTATION, None, [("jokeId", joke_id)])
        .await
}
